use std::fmt::Formatter;
use std::io;
use std::os::raw::c_int;

///The kind of operation a slot performs.
#[derive(Copy,Clone,Debug,PartialEq,Eq,Hash)]
pub enum Op {
    Read,
    Write,
    Seek,
    Close,
}
impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Op::Read => "read",
            Op::Write => "write",
            Op::Seek => "seek",
            Op::Close => "close",
        };
        f.write_str(name)
    }
}

///Failures that can come out of a slot.
///
/// Short transfers and end-of-stream are not in here; see [crate::Transfer].
#[derive(Debug,thiserror::Error)]
pub enum Error {
    ///No implementation was bound for this kind.  The only failure the bridge makes up on its own.
    #[error("{0} is not supported by this stream")]
    Unsupported(Op),
    ///The backing implementation failed.  Passed through untouched.
    #[error("backing failed: {0}")]
    Backing(#[from] io::Error),
    #[error("seek target is out of range")]
    InvalidSeekTarget,
    #[error("unknown whence code {0}")]
    InvalidWhence(c_int),
    #[error("stream is already closed")]
    AlreadyClosed,
}

impl Error {
    ///The errno reported to C callers for this error.
    pub fn errno(&self) -> c_int {
        match self {
            Error::Unsupported(Op::Seek) => libc::ESPIPE,
            Error::Unsupported(_) => libc::EBADF,
            Error::Backing(e) => io_errno(e),
            Error::InvalidSeekTarget | Error::InvalidWhence(_) => libc::EINVAL,
            Error::AlreadyClosed => libc::EBADF,
        }
    }
}

impl From<whence::Error> for Error {
    fn from(e: whence::Error) -> Self {
        match e {
            whence::Error::UnknownCode(code) => Error::InvalidWhence(code),
            whence::Error::NegativeStart(_) => Error::InvalidSeekTarget,
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Backing(e) => e,
            Error::Unsupported(_) => io::Error::new(io::ErrorKind::Unsupported, e),
            Error::InvalidSeekTarget | Error::InvalidWhence(_) => io::Error::new(io::ErrorKind::InvalidInput, e),
            Error::AlreadyClosed => io::Error::new(io::ErrorKind::Other, e),
        }
    }
}

///Picks an errno for an arbitrary io error.
///
/// Errors that came from the OS keep their code.  Errors made up in rust are classified by kind.
pub fn io_errno(e: &io::Error) -> c_int {
    if let Some(code) = e.raw_os_error() {
        return code;
    }
    use io::ErrorKind::*;
    match e.kind() {
        WouldBlock => libc::EAGAIN,
        Interrupted => libc::EINTR,
        BrokenPipe => libc::EPIPE,
        InvalidInput => libc::EINVAL,
        PermissionDenied => libc::EACCES,
        NotFound => libc::ENOENT,
        Unsupported => libc::ENOTSUP,
        _ => libc::EIO,
    }
}

#[cfg(test)] mod tests {
    use super::*;

    #[test] fn errno_per_kind() {
        assert_eq!(Error::Unsupported(Op::Read).errno(), libc::EBADF);
        assert_eq!(Error::Unsupported(Op::Write).errno(), libc::EBADF);
        assert_eq!(Error::Unsupported(Op::Seek).errno(), libc::ESPIPE);
        assert_eq!(Error::AlreadyClosed.errno(), libc::EBADF);
        assert_eq!(Error::InvalidSeekTarget.errno(), libc::EINVAL);
        assert_eq!(Error::InvalidWhence(99).errno(), libc::EINVAL);
    }

    #[test] fn backing_errno() {
        let os = io::Error::from_raw_os_error(libc::ECONNRESET);
        assert_eq!(Error::Backing(os).errno(), libc::ECONNRESET);
        assert_eq!(io_errno(&io::Error::new(io::ErrorKind::WouldBlock, "later")), libc::EAGAIN);
        assert_eq!(io_errno(&io::Error::new(io::ErrorKind::Interrupted, "signal")), libc::EINTR);
        assert_eq!(io_errno(&io::Error::new(io::ErrorKind::BrokenPipe, "gone")), libc::EPIPE);
        assert_eq!(io_errno(&io::Error::new(io::ErrorKind::Other, "?")), libc::EIO);
    }

    #[test] fn whence_errors() {
        assert!(matches!(Error::from(whence::Error::UnknownCode(7)), Error::InvalidWhence(7)));
        assert!(matches!(Error::from(whence::Error::NegativeStart(-1)), Error::InvalidSeekTarget));
    }

    #[test] fn into_io() {
        let e: io::Error = Error::Unsupported(Op::Write).into();
        assert_eq!(e.kind(), io::ErrorKind::Unsupported);
        let e: io::Error = Error::Backing(io::Error::new(io::ErrorKind::TimedOut, "slow")).into();
        assert_eq!(e.kind(), io::ErrorKind::TimedOut);
    }
}
