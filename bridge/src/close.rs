use std::io;

///A resource that can be released with an observable result.
///
/// Dropping a rust value releases it too, but any error is thrown away.  Types that implement [Close] can be bound
/// to a closer slot, and their failure reaches whoever calls `fclose`.
pub trait Close {
    fn close(self) -> io::Result<()>;
}

#[cfg(unix)]
fn close_fd(fd: std::os::unix::io::RawFd) -> io::Result<()> {
    //the fd is ours; it came out of into_raw_fd
    if unsafe{ libc::close(fd) } == 0 {
        Ok(())
    }
    else {
        Err(io::Error::last_os_error())
    }
}

macro_rules! close_via_fd {
    ($($ty:ty),*) => {
        $(
        #[cfg(unix)]
        impl Close for $ty {
            fn close(self) -> io::Result<()> {
                use std::os::unix::io::IntoRawFd;
                close_fd(self.into_raw_fd())
            }
        }
        )*
    }
}
close_via_fd!(std::fs::File, std::net::TcpStream, std::os::unix::net::UnixStream, std::process::ChildStdin, std::process::ChildStdout, std::process::ChildStderr);

#[cfg(not(unix))]
impl Close for std::fs::File {
    fn close(self) -> io::Result<()> {
        drop(self);
        Ok(())
    }
}

impl<T> Close for io::Cursor<T> {
    fn close(self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: Close> Close for Box<T> {
    fn close(self) -> io::Result<()> {
        (*self).close()
    }
}
