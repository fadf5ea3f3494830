/*!
Routes buffered stream operations to slots bound per stream.

A stream is a [Cookie]: some backing value plus a [Descriptor] saying how to read, write, seek and close it.  The
cookie is then handed to one of two buffering strategies:

* [native] (when built with the `native` feature on glibc, macOS or a BSD) gives it to the C library, producing a real
  `FILE *` for C code to use.
* [reconstructed] buffers it in rust, following stdio's rules, for platforms with no such primitive.

Both implement [Stream], and [File] is the one this build picked.

|                       | native                 | reconstructed   |
|-----------------------|------------------------|-----------------|
| produces a `FILE *`   | yes                    | no              |
| buffering             | libc's                 | ours            |
| available             | glibc, macOS, BSDs     | everywhere      |
*/
mod error;
mod close;
mod cookie;
mod stream;
pub mod backing;
pub mod reconstructed;
#[cfg(fcookie_native)]
pub mod native;


pub use error::{Error, Op, io_errno};
pub use close::Close;
pub use cookie::{Capabilities, Cookie, Descriptor, Dispatch, Transfer};
pub use stream::Stream;
pub use whence::{Offset, Whence};

///The stream type for this build.
#[cfg(fcookie_native)]
pub type File = native::CFile;
///The stream type for this build.
#[cfg(not(fcookie_native))]
pub type File = reconstructed::Buffered;

///Whether [File] is hosted by the C library.
pub const NATIVE: bool = cfg!(fcookie_native);

///Opens a cookie with this build's strategy.
pub fn open<D: Dispatch + 'static>(cookie: D) -> Result<File,Error> {
    #[cfg(fcookie_native)]
    {
        native::CFile::open(cookie)
    }
    #[cfg(not(fcookie_native))]
    {
        Ok(reconstructed::Buffered::open(cookie))
    }
}
