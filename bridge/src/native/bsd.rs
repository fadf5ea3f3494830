//! `funopen`, the custom stream primitive of macOS and the BSDs.
use std::ffi::c_void;
use std::os::raw::{c_char, c_int};
use libc::FILE;
use whence::Offset;
use crate::Capabilities;

type ReadFn = unsafe extern "C" fn(*mut c_void, *mut c_char, c_int) -> c_int;
type WriteFn = unsafe extern "C" fn(*mut c_void, *const c_char, c_int) -> c_int;
//fpos_t is off_t, 64 bits on every BSD we build for
type SeekFn = unsafe extern "C" fn(*mut c_void, Offset, c_int) -> Offset;
type CloseFn = unsafe extern "C" fn(*mut c_void) -> c_int;

extern "C" {
    fn funopen(cookie: *const c_void, readfn: Option<ReadFn>, writefn: Option<WriteFn>, seekfn: Option<SeekFn>, closefn: Option<CloseFn>) -> *mut FILE;
    fn fseeko(stream: *mut FILE, offset: Offset, whence: c_int) -> c_int;
    fn ftello(stream: *mut FILE) -> Offset;
}

unsafe extern "C" fn read_slot(cookie: *mut c_void, buf: *mut c_char, size: c_int) -> c_int {
    //the result never exceeds size, so it fits
    super::read(cookie, buf as *mut u8, size.max(0) as usize) as c_int
}

unsafe extern "C" fn write_slot(cookie: *mut c_void, buf: *const c_char, size: c_int) -> c_int {
    super::write(cookie, buf as *const u8, size.max(0) as usize) as c_int
}

unsafe extern "C" fn seek_slot(cookie: *mut c_void, offset: Offset, whence: c_int) -> Offset {
    super::seek(cookie, offset, whence).unwrap_or(-1)
}

unsafe extern "C" fn close_slot(cookie: *mut c_void) -> c_int {
    super::close(cookie)
}

///funopen decides readability and writability from which callbacks are non-null.  All four are installed, so the
/// stream is always read-write at the libc level and unsupported calls are refused by the cookie itself.
pub(super) unsafe fn open(cookie: *mut c_void, _capabilities: Capabilities) -> *mut FILE {
    funopen(cookie, Some(read_slot), Some(write_slot), Some(seek_slot), Some(close_slot))
}

pub(super) unsafe fn seek(file: *mut FILE, offset: Offset, whence: c_int) -> c_int {
    fseeko(file, offset, whence)
}

pub(super) unsafe fn tell(file: *mut FILE) -> Offset {
    ftello(file)
}
