use std::env;

fn main() {
    /*Decides, once per build, whether streams are handed to the C library's own custom-stream primitive or rebuilt
    in rust from the four slots.  Everything downstream keys off the `fcookie_native` cfg rather than repeating this list.
     */
    println!("cargo:rustc-check-cfg=cfg(fcookie_native)");
    println!("cargo:rerun-if-changed=build.rs");
    if env::var_os("CARGO_FEATURE_NATIVE").is_none() {
        return;
    }
    let os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let target_env = env::var("CARGO_CFG_TARGET_ENV").unwrap_or_default();
    let has_primitive = match os.as_str() {
        //fopencookie is a glibc extension
        "linux" => target_env == "gnu",
        //funopen
        "macos" | "ios" | "freebsd" | "dragonfly" | "openbsd" => true,
        _ => false,
    };
    if has_primitive {
        println!("cargo:rustc-cfg=fcookie_native");
    }
}
