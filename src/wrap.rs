/*!
One-call wrappers for common backings.

Each binds the slots its bounds allow.  The plain `wrap_` functions accept any backing and never close it: closing
the stream just drops the value, which suits slices, `Stdin`, a cloned [crate::backing::Memory] or anything else whose
release belongs to someone else.  The `_with_close` variants take a [Close] backing and run its closer when the stream
closes.  Either way the stream must still be closed (or dropped) to release the cookie.
*/
use std::io::{Read, Seek, Write};
use bridge::{Close, Cookie, Descriptor, Error, File};

fn wrap<T: Send + 'static>(value: T, descriptor: Descriptor<T>) -> Result<File,Error> {
    log::debug!("wrapping {} {:?}", std::any::type_name::<T>(), descriptor);
    bridge::open(Cookie::new(value, descriptor))
}

///Read-only stream.
pub fn wrap_reader<R: Read + Send + 'static>(reader: R) -> Result<File,Error> {
    wrap(reader, Descriptor::reader())
}

///Write-only stream.  Writes may sit in the stream's buffer until a flush or close.
pub fn wrap_writer<W: Write + Send + 'static>(writer: W) -> Result<File,Error> {
    wrap(writer, Descriptor::writer())
}

///Read-write stream without seeking.
pub fn wrap_read_writer<T: Read + Write + Send + 'static>(value: T) -> Result<File,Error> {
    wrap(value, Descriptor::read_writer())
}

///Read-only stream with seeking.
pub fn wrap_read_seeker<R: Read + Seek + Send + 'static>(reader: R) -> Result<File,Error> {
    wrap(reader, Descriptor::reader().with_seek())
}

///Stream with read, write and seek bound.
pub fn wrap_read_write_seeker<T: Read + Write + Seek + Send + 'static>(value: T) -> Result<File,Error> {
    wrap(value, Descriptor::read_writer().with_seek())
}

///[wrap_reader], closing the reader with the stream.
pub fn wrap_reader_with_close<R: Read + Close + Send + 'static>(reader: R) -> Result<File,Error> {
    wrap(reader, Descriptor::reader().with_close())
}

///[wrap_writer], closing the writer with the stream.
pub fn wrap_writer_with_close<W: Write + Close + Send + 'static>(writer: W) -> Result<File,Error> {
    wrap(writer, Descriptor::writer().with_close())
}

///[wrap_read_writer], closing the backing with the stream.
pub fn wrap_read_writer_with_close<T: Read + Write + Close + Send + 'static>(value: T) -> Result<File,Error> {
    wrap(value, Descriptor::read_writer().with_close())
}

///[wrap_read_seeker], closing the reader with the stream.
pub fn wrap_read_seeker_with_close<R: Read + Seek + Close + Send + 'static>(reader: R) -> Result<File,Error> {
    wrap(reader, Descriptor::reader().with_seek().with_close())
}

///All four slots bound.
pub fn wrap_read_write_seeker_with_close<T: Read + Write + Seek + Close + Send + 'static>(value: T) -> Result<File,Error> {
    wrap(value, Descriptor::read_writer().with_seek().with_close())
}
