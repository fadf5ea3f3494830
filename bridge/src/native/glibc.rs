//! `fopencookie`, glibc's custom stream primitive.
use std::ffi::c_void;
use std::os::raw::{c_char, c_int};
use libc::{size_t, ssize_t, FILE};
use whence::Offset;
use crate::Capabilities;

type ReadFn = unsafe extern "C" fn(*mut c_void, *mut c_char, size_t) -> ssize_t;
type WriteFn = unsafe extern "C" fn(*mut c_void, *const c_char, size_t) -> ssize_t;
type SeekFn = unsafe extern "C" fn(*mut c_void, *mut Offset, c_int) -> c_int;
type CloseFn = unsafe extern "C" fn(*mut c_void) -> c_int;

///`cookie_io_functions_t`
#[repr(C)]
struct CookieIoFunctions {
    read: Option<ReadFn>,
    write: Option<WriteFn>,
    seek: Option<SeekFn>,
    close: Option<CloseFn>,
}

extern "C" {
    fn fopencookie(cookie: *mut c_void, mode: *const c_char, io_funcs: CookieIoFunctions) -> *mut FILE;
    fn fseeko64(stream: *mut FILE, offset: Offset, whence: c_int) -> c_int;
    fn ftello64(stream: *mut FILE) -> Offset;
}

unsafe extern "C" fn read_slot(cookie: *mut c_void, buf: *mut c_char, size: size_t) -> ssize_t {
    super::read(cookie, buf as *mut u8, size)
}

unsafe extern "C" fn write_slot(cookie: *mut c_void, buf: *const c_char, size: size_t) -> ssize_t {
    super::write(cookie, buf as *const u8, size)
}

///glibc passes the offset in and expects the new position back through the same pointer.
unsafe extern "C" fn seek_slot(cookie: *mut c_void, position: *mut Offset, whence: c_int) -> c_int {
    match super::seek(cookie, *position, whence) {
        Some(new_position) => {
            *position = new_position;
            0
        }
        None => -1
    }
}

unsafe extern "C" fn close_slot(cookie: *mut c_void) -> c_int {
    super::close(cookie)
}

///Every slot is installed even when the cookie lacks the capability, so that unsupported calls get our errno rather
/// than whatever glibc does with a null callback.
pub(super) unsafe fn open(cookie: *mut c_void, capabilities: Capabilities) -> *mut FILE {
    let functions = CookieIoFunctions {
        read: Some(read_slot),
        write: Some(write_slot),
        seek: Some(seek_slot),
        close: Some(close_slot),
    };
    fopencookie(cookie, capabilities.mode().as_ptr(), functions)
}

pub(super) unsafe fn seek(file: *mut FILE, offset: Offset, whence: c_int) -> c_int {
    fseeko64(file, offset, whence)
}

pub(super) unsafe fn tell(file: *mut FILE) -> Offset {
    ftello64(file)
}
