/*!
Streams hosted by the C library itself.

glibc has `fopencookie` and the BSDs (macOS included) have `funopen`.  Either one takes an opaque pointer plus four
callbacks and returns a real `FILE *`, buffered by libc, that any C code can `fread`, `fprintf` or `fclose`.

The opaque pointer is a boxed [Dispatch], one per stream, so any number of streams can be open at once.  The callbacks
are plain functions that turn the pointer back into that object; nothing about a stream lives in a global.
*/
use std::ffi::c_void;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::raw::c_int;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr::NonNull;
use whence::{Offset, Whence};
use crate::{Capabilities, Dispatch, Error, Op, Stream};

#[cfg(target_os = "linux")]
mod glibc;
#[cfg(target_os = "linux")]
use glibc as platform;

#[cfg(not(target_os = "linux"))]
mod bsd;
#[cfg(not(target_os = "linux"))]
use bsd as platform;

///What the cookie pointer handed to C points at.
///
/// `Box<dyn Dispatch>` is a fat pointer, so it gets boxed once more to fit through a `void *`.
type Handle = Box<dyn Dispatch>;

fn set_errno(code: c_int) {
    unsafe {
        #[cfg(target_os = "linux")]
        { *libc::__errno_location() = code; }
        #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd", target_os = "dragonfly"))]
        { *libc::__error() = code; }
        #[cfg(target_os = "openbsd")]
        { *libc::__errno() = code; }
    }
}

///Runs one slot against the handle behind `cookie`, converting failures into an errno.
///
/// Panics are caught here; unwinding into C is undefined behavior.
unsafe fn dispatch<R>(cookie: *mut c_void, op: Op, f: impl FnOnce(&mut (dyn Dispatch + 'static)) -> Result<R,Error>) -> Option<R> {
    let handle = &mut *(cookie as *mut Handle);
    match catch_unwind(AssertUnwindSafe(|| f(handle.as_mut()))) {
        Ok(Ok(r)) => Some(r),
        Ok(Err(e)) => {
            log::trace!("{} slot failed: {}", op, e);
            set_errno(e.errno());
            None
        }
        Err(_) => {
            log::warn!("backing panicked during {}", op);
            set_errno(libc::EIO);
            None
        }
    }
}

///Read slot.  Returns bytes read, 0 at end-of-stream, -1 on failure.
unsafe fn read(cookie: *mut c_void, buf: *mut u8, size: usize) -> isize {
    log::trace!("native read slot, {} bytes", size);
    let slice: &mut [u8] = if size == 0 { &mut [] } else { std::slice::from_raw_parts_mut(buf, size) };
    match dispatch(cookie, Op::Read, |d| d.read(slice)) {
        Some(transfer) => transfer.len() as isize,
        None => -1,
    }
}

///Write slot.  Returns bytes accepted, -1 on failure.
unsafe fn write(cookie: *mut c_void, buf: *const u8, size: usize) -> isize {
    log::trace!("native write slot, {} bytes", size);
    let slice: &[u8] = if size == 0 { &[] } else { std::slice::from_raw_parts(buf, size) };
    match dispatch(cookie, Op::Write, |d| d.write(slice)) {
        Some(transfer) => transfer.len() as isize,
        None => -1,
    }
}

///Seek slot.  Returns the new absolute position, or None with errno set.
unsafe fn seek(cookie: *mut c_void, offset: Offset, whence: c_int) -> Option<Offset> {
    log::trace!("native seek slot, {} from {}", offset, whence);
    dispatch(cookie, Op::Seek, |d| {
        let whence = Whence::from_c(whence)?;
        d.seek(offset, whence)
    })
}

///Close slot.  Frees the handle whatever happens; libc never calls this twice for one stream.
unsafe fn close(cookie: *mut c_void) -> c_int {
    log::trace!("native close slot");
    let result = dispatch(cookie, Op::Close, |d| d.close());
    drop(Box::from_raw(cookie as *mut Handle));
    match result {
        Some(()) => 0,
        None => -1,
    }
}

///A `FILE *` whose reads, writes, seeks and close run through a cookie.
///
/// Closed with `fclose` on drop.  Use [CFile::as_ptr] to hand it to C code.
#[derive(Debug)]
pub struct CFile {
    file: NonNull<libc::FILE>,
    capabilities: Capabilities,
}
//The cookie is Send, and stdio locks the FILE for each call.
unsafe impl Send for CFile {}

impl CFile {
    pub fn open<D: Dispatch + 'static>(cookie: D) -> Result<CFile,Error> {
        CFile::from_boxed(Box::new(cookie))
    }
    pub fn from_boxed(dispatch: Box<dyn Dispatch>) -> Result<CFile,Error> {
        let capabilities = dispatch.capabilities();
        let handle: *mut Handle = Box::into_raw(Box::new(dispatch));
        match NonNull::new(unsafe{ platform::open(handle as *mut c_void, capabilities) }) {
            Some(file) => {
                log::debug!("opened native stream {:?} {:?}", file, capabilities);
                Ok(CFile { file, capabilities })
            }
            None => {
                let e = io::Error::last_os_error();
                //libc did not adopt the cookie, so it is still ours to free
                drop(unsafe{ Box::from_raw(handle) });
                Err(Error::Backing(e))
            }
        }
    }
    ///Takes ownership of a stream produced by [CFile::into_raw].
    ///
    /// # Safety
    /// `file` must have come from [CFile::into_raw] and must not have been closed.
    pub unsafe fn from_raw(file: NonNull<libc::FILE>, capabilities: Capabilities) -> CFile {
        CFile { file, capabilities }
    }
    pub fn as_ptr(&self) -> *mut libc::FILE {
        self.file.as_ptr()
    }
    ///Gives up ownership.  The caller becomes responsible for calling `fclose` exactly once.
    pub fn into_raw(self) -> NonNull<libc::FILE> {
        let file = self.file;
        std::mem::forget(self);
        file
    }
    ///Takes the stdio error left by a failed transfer, if there is one.
    fn take_error(&mut self) -> Option<io::Error> {
        let file = self.as_ptr();
        if unsafe{ libc::ferror(file) } != 0 {
            let e = io::Error::last_os_error();
            unsafe{ libc::clearerr(file) };
            Some(e)
        }
        else {
            None
        }
    }
}

impl Read for CFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = unsafe{ libc::fread(buf.as_mut_ptr() as *mut c_void, 1, buf.len(), self.as_ptr()) };
        //data that made it is reported first; the error indicator stays set for the caller to find
        if n == 0 {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
        }
        Ok(n)
    }
}

impl Write for CFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = unsafe{ libc::fwrite(buf.as_ptr() as *const c_void, 1, buf.len(), self.as_ptr()) };
        if n == 0 {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
        }
        Ok(n)
    }
    fn flush(&mut self) -> io::Result<()> {
        if unsafe{ libc::fflush(self.as_ptr()) } == 0 {
            Ok(())
        }
        else {
            Err(io::Error::last_os_error())
        }
    }
}

impl Seek for CFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (whence, offset) = whence::split(pos).map_err(|_| io::Error::from(Error::InvalidSeekTarget))?;
        if unsafe{ platform::seek(self.as_ptr(), offset, whence.as_c()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        let position = self.tell()?;
        u64::try_from(position).map_err(|_| Error::InvalidSeekTarget.into())
    }
}

impl Stream for CFile {
    fn tell(&mut self) -> Result<Offset,Error> {
        let position = unsafe{ platform::tell(self.as_ptr()) };
        if position < 0 {
            Err(Error::Backing(io::Error::last_os_error()))
        }
        else {
            Ok(position)
        }
    }
    fn is_eof(&self) -> bool {
        unsafe{ libc::feof(self.as_ptr()) != 0 }
    }
    fn has_error(&self) -> bool {
        unsafe{ libc::ferror(self.as_ptr()) != 0 }
    }
    fn clear_error(&mut self) {
        unsafe{ libc::clearerr(self.as_ptr()) }
    }
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
    fn close(self) -> Result<(),Error> {
        let file = self.into_raw();
        log::debug!("closing native stream {:?}", file);
        if unsafe{ libc::fclose(file.as_ptr()) } == 0 {
            Ok(())
        }
        else {
            Err(Error::Backing(io::Error::last_os_error()))
        }
    }
}

impl Drop for CFile {
    fn drop(&mut self) {
        if unsafe{ libc::fclose(self.as_ptr()) } != 0 {
            log::warn!("closing dropped stream failed: {}", io::Error::last_os_error());
        }
    }
}
