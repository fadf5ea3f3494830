/*!
Per-stream slot bindings.

A [Cookie] pairs one backing value with a [Descriptor] saying which of the four operations it supports, and how to
perform each one.  The pair is fixed when the cookie is built; there is no way to rebind a slot afterwards.

Both buffering strategies consume cookies only through the object-safe [Dispatch] trait, so neither needs to know the
backing's type.
*/
use std::io::{self, Read, Seek, SeekFrom, Write};
use whence::{Offset, Whence};
use crate::{Close, Error, Op};

///How many bytes a read or write actually moved.
#[derive(Copy,Clone,Debug,PartialEq,Eq)]
pub enum Transfer {
    ///Everything requested was moved.
    Complete(usize),
    ///Fewer bytes were moved than requested.  Not an error.
    Short{requested: usize, moved: usize},
    ///A read of at least one byte produced nothing.
    EndOfStream,
}
impl Transfer {
    fn read(requested: usize, moved: usize) -> Transfer {
        if moved == 0 && requested > 0 {
            Transfer::EndOfStream
        }
        else {
            Transfer::write(requested, moved)
        }
    }
    fn write(requested: usize, moved: usize) -> Transfer {
        if moved < requested {
            Transfer::Short{requested, moved}
        }
        else {
            Transfer::Complete(moved)
        }
    }
    ///Number of bytes moved.
    pub fn len(&self) -> usize {
        match self {
            Transfer::Complete(n) => *n,
            Transfer::Short{moved, ..} => *moved,
            Transfer::EndOfStream => 0
        }
    }
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Transfer::EndOfStream)
    }
}

///Which operations a stream supports.
#[derive(Copy,Clone,Debug,PartialEq,Eq,Default)]
pub struct Capabilities {
    pub read: bool,
    pub write: bool,
    pub seek: bool,
    ///Whether a closer is bound.  Closing always works; without a closer the backing is dropped.
    pub close: bool,
}
impl Capabilities {
    ///The stdio mode string matching these capabilities.
    pub fn mode(&self) -> &'static std::ffi::CStr {
        match (self.read, self.write) {
            (true, true) => c"r+",
            (false, true) => c"w",
            _ => c"r",
        }
    }
}

type ReadFn<T> = fn(&mut T, &mut [u8]) -> io::Result<usize>;
type WriteFn<T> = fn(&mut T, &[u8]) -> io::Result<usize>;
type SeekFn<T> = fn(&mut T, SeekFrom) -> io::Result<u64>;
type CloseFn<T> = fn(T) -> io::Result<()>;

///Maps each operation kind to its implementation for a backing of type `T`, or marks it unsupported.
///
/// Start from [Descriptor::new], which supports nothing, and bind the slots `T` can serve.
pub struct Descriptor<T> {
    read: Option<ReadFn<T>>,
    write: Option<WriteFn<T>>,
    seek: Option<SeekFn<T>>,
    close: Option<CloseFn<T>>,
}
//derive would require T: Clone
impl<T> Clone for Descriptor<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Descriptor<T> {}
impl<T> Default for Descriptor<T> {
    fn default() -> Self {
        Descriptor::new()
    }
}
impl<T> std::fmt::Debug for Descriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor").field("capabilities", &self.capabilities()).finish()
    }
}

impl<T> Descriptor<T> {
    ///A descriptor with every slot unsupported.
    pub const fn new() -> Self {
        Descriptor { read: None, write: None, seek: None, close: None }
    }
    pub fn with_read(mut self) -> Self where T: Read {
        self.read = Some(<T as Read>::read);
        self
    }
    pub fn with_write(mut self) -> Self where T: Write {
        self.write = Some(<T as Write>::write);
        self
    }
    pub fn with_seek(mut self) -> Self where T: Seek {
        self.seek = Some(<T as Seek>::seek);
        self
    }
    ///Binds the closer.  Without it, closing the stream just drops the backing.
    pub fn with_close(mut self) -> Self where T: Close {
        self.close = Some(<T as Close>::close);
        self
    }
    pub fn reader() -> Self where T: Read {
        Descriptor::new().with_read()
    }
    pub fn writer() -> Self where T: Write {
        Descriptor::new().with_write()
    }
    pub fn read_writer() -> Self where T: Read + Write {
        Descriptor::new().with_read().with_write()
    }
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            read: self.read.is_some(),
            write: self.write.is_some(),
            seek: self.seek.is_some(),
            close: self.close.is_some(),
        }
    }
}

///The four slots, as seen by a buffering layer.
///
/// Implementations must not retry, buffer, or reinterpret what the backing reports.
pub trait Dispatch: Send {
    ///Reads into `buf`.  May move fewer bytes than requested.
    fn read(&mut self, buf: &mut [u8]) -> Result<Transfer,Error>;
    ///Writes from `buf`.  May move fewer bytes than requested.
    fn write(&mut self, buf: &[u8]) -> Result<Transfer,Error>;
    ///Moves the backing's cursor and returns its new absolute position.
    fn seek(&mut self, offset: Offset, whence: Whence) -> Result<Offset,Error>;
    ///Releases the backing.  Afterwards every operation fails with [Error::AlreadyClosed], including close.
    fn close(&mut self) -> Result<(),Error>;
    fn capabilities(&self) -> Capabilities;
    fn is_closed(&self) -> bool;
}

///A backing value together with its slot bindings.
pub struct Cookie<T> {
    //None once closed
    value: Option<T>,
    descriptor: Descriptor<T>,
}

impl<T> Cookie<T> {
    pub fn new(value: T, descriptor: Descriptor<T>) -> Self {
        Cookie {
            value: Some(value),
            descriptor,
        }
    }
    ///Gives the backing back, if the cookie was never closed.
    pub fn into_inner(self) -> Option<T> {
        self.value
    }
    pub fn descriptor(&self) -> Descriptor<T> {
        self.descriptor
    }
    fn open_value(&mut self) -> Result<&mut T,Error> {
        self.value.as_mut().ok_or(Error::AlreadyClosed)
    }
}

impl<T> std::fmt::Debug for Cookie<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cookie")
            .field("descriptor", &self.descriptor)
            .field("closed", &self.value.is_none())
            .finish()
    }
}

fn overrun(op: Op, requested: usize, moved: usize) -> Error {
    Error::Backing(io::Error::new(io::ErrorKind::InvalidData, format!("backing {} reported {} bytes for a {} byte buffer", op, moved, requested)))
}

impl<T: Send> Dispatch for Cookie<T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<Transfer,Error> {
        let read = self.descriptor.read;
        let value = self.open_value()?;
        let read = read.ok_or(Error::Unsupported(Op::Read))?;
        let moved = read(value, buf)?;
        if moved > buf.len() {
            return Err(overrun(Op::Read, buf.len(), moved));
        }
        Ok(Transfer::read(buf.len(), moved))
    }

    fn write(&mut self, buf: &[u8]) -> Result<Transfer,Error> {
        let write = self.descriptor.write;
        let value = self.open_value()?;
        let write = write.ok_or(Error::Unsupported(Op::Write))?;
        let moved = write(value, buf)?;
        if moved > buf.len() {
            return Err(overrun(Op::Write, buf.len(), moved));
        }
        Ok(Transfer::write(buf.len(), moved))
    }

    fn seek(&mut self, offset: Offset, whence: Whence) -> Result<Offset,Error> {
        let seek = self.descriptor.seek;
        let value = self.open_value()?;
        let seek = seek.ok_or(Error::Unsupported(Op::Seek))?;
        let target = whence.seek_from(offset)?;
        match seek(value, target) {
            Ok(position) => Offset::try_from(position).map_err(|_| Error::InvalidSeekTarget),
            //std reports seeks before the start as InvalidInput
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Err(Error::InvalidSeekTarget),
            Err(e) => Err(Error::Backing(e)),
        }
    }

    fn close(&mut self) -> Result<(),Error> {
        let value = self.value.take().ok_or(Error::AlreadyClosed)?;
        match self.descriptor.close {
            Some(close) => close(value).map_err(Error::Backing),
            None => {
                drop(value);
                Ok(())
            }
        }
    }

    fn capabilities(&self) -> Capabilities {
        self.descriptor.capabilities()
    }

    fn is_closed(&self) -> bool {
        self.value.is_none()
    }
}
