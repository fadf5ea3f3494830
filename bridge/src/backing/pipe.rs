use std::io::{self, Read, Write};
use crossbeam_channel::{Receiver, Sender};
use crate::Close;

///Read end of an in-process pipe.
///
/// Reads block until a writer sends something, or until every [PipeWriter] is gone, which reads as end-of-stream.
#[derive(Debug)]
pub struct PipeReader {
    receiver: Receiver<Vec<u8>>,
    //remainder of the last chunk that did not fit the caller's buffer
    pending: Vec<u8>,
    offset: usize,
}

///Write end of an in-process pipe.  Clone it to have several writers.
#[derive(Debug,Clone)]
pub struct PipeWriter {
    sender: Sender<Vec<u8>>,
}

///Creates a pipe with no limit on buffered data.
pub fn pipe() -> (PipeReader, PipeWriter) {
    let (sender, receiver) = crossbeam_channel::unbounded();
    (PipeReader::new(receiver), PipeWriter { sender })
}

///Creates a pipe holding at most `chunks` unread writes.  Writers block while it is full.
pub fn bounded_pipe(chunks: usize) -> (PipeReader, PipeWriter) {
    let (sender, receiver) = crossbeam_channel::bounded(chunks);
    (PipeReader::new(receiver), PipeWriter { sender })
}

impl PipeReader {
    fn new(receiver: Receiver<Vec<u8>>) -> Self {
        PipeReader {
            receiver,
            pending: Vec::new(),
            offset: 0,
        }
    }
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.offset == self.pending.len() {
            match self.receiver.recv() {
                Ok(chunk) => {
                    self.pending = chunk;
                    self.offset = 0;
                }
                //all writers dropped
                Err(_) => return Ok(0),
            }
        }
        let available = &self.pending[self.offset..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.offset += n;
        Ok(n)
    }
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.sender.send(buf.to_vec()).map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader is gone"))?;
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Close for PipeReader {
    fn close(self) -> io::Result<()> {
        Ok(())
    }
}

impl Close for PipeWriter {
    ///Drops this writer.  The reader sees end-of-stream once the last writer is closed.
    fn close(self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)] mod tests {
    use super::*;
    use std::time::Duration;

    #[test] fn chunks_larger_than_buffer() {
        let (mut reader, mut writer) = pipe();
        writer.write_all(b"0123456789").unwrap();
        drop(writer);
        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"0123");
        assert_eq!(reader.read(&mut buf).unwrap(), 4);
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"89");
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test] fn multiple_passes() {
        //write in multiple pieces from another thread and ensure we get all of it
        let (mut reader, writer) = pipe();
        std::thread::spawn(move || {
            let mut writer = writer;
            for item in 0..10 {
                writer.write_all(format!("{}\n", item).as_bytes()).unwrap();
                std::thread::sleep(Duration::from_millis(5));
            }
            writer.close().unwrap();
        });
        let mut read = String::new();
        reader.read_to_string(&mut read).unwrap();
        let mut expected = String::new();
        for item in 0..10 {
            expected.push_str(&format!("{}\n", item));
        }
        assert_eq!(read, expected);
    }

    #[test] fn reader_gone() {
        let (reader, mut writer) = pipe();
        reader.close().unwrap();
        assert_eq!(writer.write(b"x").unwrap_err().kind(), io::ErrorKind::BrokenPipe);
    }

    #[test] fn last_writer_ends_stream() {
        let (mut reader, writer) = bounded_pipe(1);
        let mut second = writer.clone();
        drop(writer);
        second.write_all(b"a").unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(reader.read(&mut buf).unwrap(), 1);
        drop(second);
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }
}
