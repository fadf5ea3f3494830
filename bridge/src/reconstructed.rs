/*!
A buffered stream rebuilt in rust from the four slots.

This is what [crate::File] is on platforms whose C library cannot host a custom stream, and it is available everywhere
for callers that never need a `FILE *`.  It follows stdio's rules:

* Reads refill an internal buffer with a single read slot call, so a short read from the backing is seen as a short
  read by the caller, never as failure or end-of-stream.
* Writes collect in the buffer and go out when it fills, on flush, on seek and on close.  Partial writes from the
  backing are retried until the buffer drains or the backing accepts nothing.
* End-of-stream is sticky until the next seek or [Stream::clear_error].
* Position queries are forwarded to the seek slot and corrected by the number of bytes sitting in the buffer.
*/
use std::io::{self, BufRead, Read, Seek, SeekFrom, Write};
use whence::{Offset, Whence};
use crate::{Capabilities, Dispatch, Error, Op, Stream};

///Buffer size when none is given.  Matches glibc's `BUFSIZ`.
pub const DEFAULT_CAPACITY: usize = 8192;

#[derive(Copy,Clone,Debug,PartialEq,Eq)]
enum Mode {
    Idle,
    Reading,
    Writing,
}

pub struct Buffered {
    //None once closed
    dispatch: Option<Box<dyn Dispatch>>,
    buffer: Box<[u8]>,
    //Reading: unread bytes are buffer[start..end].  Writing: pending bytes are buffer[..end].
    start: usize,
    end: usize,
    mode: Mode,
    eof: bool,
    error: bool,
}

impl std::fmt::Debug for Buffered {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffered")
            .field("capacity", &self.buffer.len())
            .field("mode", &self.mode)
            .field("buffered", &(self.end - self.start))
            .field("eof", &self.eof)
            .field("error", &self.error)
            .field("closed", &self.dispatch.is_none())
            .finish()
    }
}

impl Buffered {
    pub fn open<D: Dispatch + 'static>(cookie: D) -> Buffered {
        Buffered::with_capacity(DEFAULT_CAPACITY, cookie)
    }
    ///Opens with a specific buffer size.  A capacity of 0 is treated as 1, which makes every read and write of at least
    /// one byte go straight to the backing.
    pub fn with_capacity<D: Dispatch + 'static>(capacity: usize, cookie: D) -> Buffered {
        Buffered::from_boxed(capacity, Box::new(cookie))
    }
    pub fn from_boxed(capacity: usize, dispatch: Box<dyn Dispatch>) -> Buffered {
        let capacity = capacity.max(1);
        log::debug!("opening reconstructed stream, capacity {} {:?}", capacity, dispatch.capabilities());
        Buffered {
            dispatch: Some(dispatch),
            buffer: vec![0; capacity].into_boxed_slice(),
            start: 0,
            end: 0,
            mode: Mode::Idle,
            eof: false,
            error: false,
        }
    }
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
    fn dispatch(&mut self) -> Result<&mut (dyn Dispatch + 'static),Error> {
        match self.dispatch.as_deref_mut() {
            Some(dispatch) => Ok(dispatch),
            None => Err(Error::AlreadyClosed),
        }
    }
    ///Records a failure in the error indicator and hands it back.
    fn fail<T>(&mut self, e: Error) -> Result<T,Error> {
        self.error = true;
        Err(e)
    }
    fn require(&mut self, op: Op) -> Result<(),Error> {
        let capabilities = self.dispatch()?.capabilities();
        let supported = match op {
            Op::Read => capabilities.read,
            Op::Write => capabilities.write,
            Op::Seek => capabilities.seek,
            Op::Close => true,
        };
        if supported {
            Ok(())
        }
        else {
            self.fail(Error::Unsupported(op))
        }
    }

    fn begin_reading(&mut self) -> Result<(),Error> {
        self.require(Op::Read)?;
        if self.mode == Mode::Writing {
            self.flush_buffer()?;
        }
        self.mode = Mode::Reading;
        self.start = 0;
        self.end = 0;
        Ok(())
    }

    fn begin_writing(&mut self) -> Result<(),Error> {
        self.require(Op::Write)?;
        if self.mode == Mode::Reading {
            let unread = self.end - self.start;
            if unread > 0 {
                //hand back what the backing gave us but nobody consumed, so the write lands at the logical position
                let dispatch = self.dispatch()?;
                if let Err(e) = dispatch.seek(-(unread as Offset), Whence::Current) {
                    return self.fail(e);
                }
            }
        }
        self.mode = Mode::Writing;
        self.start = 0;
        self.end = 0;
        Ok(())
    }

    ///One read slot call into `buf`, maintaining the indicators.
    fn read_slot(&mut self, into_buffer: bool, buf: &mut [u8]) -> Result<usize,Error> {
        let Some(dispatch) = self.dispatch.as_deref_mut() else {
            return Err(Error::AlreadyClosed);
        };
        let target = if into_buffer { &mut self.buffer[..] } else { buf };
        log::trace!("read slot, {} bytes", target.len());
        match dispatch.read(target) {
            Ok(transfer) => {
                if transfer.is_end_of_stream() {
                    self.eof = true;
                }
                Ok(transfer.len())
            }
            Err(e) => self.fail(e),
        }
    }

    fn fill(&mut self) -> Result<&[u8],Error> {
        if self.mode != Mode::Reading {
            self.begin_reading()?;
        }
        if self.start == self.end && !self.eof {
            let n = self.read_slot(true, &mut [])?;
            self.start = 0;
            self.end = n;
        }
        Ok(&self.buffer[self.start..self.end])
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize,Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.mode != Mode::Reading {
            self.begin_reading()?;
        }
        if self.start == self.end {
            if self.eof {
                return Ok(0);
            }
            if buf.len() >= self.buffer.len() {
                //large reads skip the buffer
                return self.read_slot(false, buf);
            }
        }
        let available = self.fill()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.start += n;
        Ok(n)
    }

    fn write_bytes(&mut self, buf: &[u8]) -> Result<usize,Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.mode != Mode::Writing {
            self.begin_writing()?;
        }
        if self.end + buf.len() > self.buffer.len() {
            self.flush_buffer()?;
        }
        if buf.len() >= self.buffer.len() {
            let dispatch = self.dispatch()?;
            log::trace!("write slot, {} bytes unbuffered", buf.len());
            return match dispatch.write(buf) {
                Ok(transfer) => Ok(transfer.len()),
                Err(e) => self.fail(e),
            };
        }
        self.buffer[self.end..self.end + buf.len()].copy_from_slice(buf);
        self.end += buf.len();
        Ok(buf.len())
    }

    ///Pushes pending bytes to the write slot until none are left.
    fn flush_buffer(&mut self) -> Result<(),Error> {
        if self.mode != Mode::Writing {
            return Ok(());
        }
        let Some(dispatch) = self.dispatch.as_deref_mut() else {
            return Err(Error::AlreadyClosed);
        };
        let mut written = 0;
        let result = loop {
            if written == self.end {
                break Ok(());
            }
            log::trace!("write slot, {} bytes", self.end - written);
            match dispatch.write(&self.buffer[written..self.end]) {
                Ok(transfer) if transfer.len() == 0 => {
                    break Err(Error::Backing(io::Error::new(io::ErrorKind::WriteZero, "backing accepted no bytes")));
                }
                Ok(transfer) => written += transfer.len(),
                Err(e) => break Err(e),
            }
        };
        //keep whatever did not make it
        self.buffer.copy_within(written..self.end, 0);
        self.end -= written;
        match result {
            Ok(()) => Ok(()),
            Err(e) => self.fail(e),
        }
    }

    ///Repositions the stream.  Pending writes are flushed first; buffered reads are discarded.
    pub fn seek_to(&mut self, offset: Offset, whence: Whence) -> Result<Offset,Error> {
        let mut offset = offset;
        match self.mode {
            Mode::Writing => self.flush_buffer()?,
            Mode::Reading if whence == Whence::Current => {
                //the caller means relative to what they have consumed, not to what we prefetched
                let unread = (self.end - self.start) as Offset;
                offset = offset.checked_sub(unread).ok_or(Error::InvalidSeekTarget)?;
            }
            _ => {}
        }
        let position = self.dispatch()?.seek(offset, whence)?;
        self.mode = Mode::Idle;
        self.start = 0;
        self.end = 0;
        self.eof = false;
        Ok(position)
    }

    fn shut(&mut self) -> Result<(),Error> {
        if self.dispatch.is_none() {
            return Err(Error::AlreadyClosed);
        }
        let flushed = self.flush_buffer();
        let closed = match self.dispatch.take() {
            Some(mut dispatch) => dispatch.close(),
            None => Err(Error::AlreadyClosed),
        };
        log::debug!("closed reconstructed stream, flush {:?}, close {:?}", flushed.is_ok(), closed.is_ok());
        flushed.and(closed)
    }
}

impl Stream for Buffered {
    fn tell(&mut self) -> Result<Offset,Error> {
        let unread = (self.end - self.start) as Offset;
        let pending = self.end as Offset;
        let mode = self.mode;
        let position = self.dispatch()?.seek(0, Whence::Current)?;
        Ok(match mode {
            Mode::Reading => position - unread,
            Mode::Writing => position + pending,
            Mode::Idle => position,
        })
    }
    fn is_eof(&self) -> bool {
        self.eof
    }
    fn has_error(&self) -> bool {
        self.error
    }
    fn clear_error(&mut self) {
        self.eof = false;
        self.error = false;
    }
    fn capabilities(&self) -> Capabilities {
        self.dispatch.as_ref().map(|d| d.capabilities()).unwrap_or_default()
    }
    fn close(mut self) -> Result<(),Error> {
        self.shut()
    }
}

impl Drop for Buffered {
    fn drop(&mut self) {
        if self.dispatch.is_some() {
            if let Err(e) = self.shut() {
                log::warn!("closing dropped stream failed: {}", e);
            }
        }
    }
}

impl Read for Buffered {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_bytes(buf)?)
    }
}

impl BufRead for Buffered {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        Ok(self.fill()?)
    }
    fn consume(&mut self, amt: usize) {
        self.start = (self.start + amt).min(self.end);
    }
}

impl Write for Buffered {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_bytes(buf)?)
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(self.flush_buffer()?)
    }
}

impl Seek for Buffered {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (whence, offset) = whence::split(pos).map_err(|_| io::Error::from(Error::InvalidSeekTarget))?;
        let position = self.seek_to(offset, whence)?;
        u64::try_from(position).map_err(|_| Error::InvalidSeekTarget.into())
    }
}

#[cfg(test)] mod tests {
    use super::*;
    use std::io::Cursor;
    use crate::backing::{Memory, pipe};
    use crate::test::{Counted, Script, Step, Trickle};
    use crate::{Cookie, Descriptor};

    #[test] fn memory_round_trip() {
        let memory = Memory::new();
        let mut stream = Buffered::open(memory.cookie());
        stream.write_all(&[1,2,3,4,5]).unwrap();
        assert_eq!(stream.seek(SeekFrom::Start(0)).unwrap(), 0);
        let mut out = [0u8; 5];
        stream.read_exact(&mut out).unwrap();
        assert_eq!(out, [1,2,3,4,5]);
        stream.close().unwrap();
        assert!(memory.is_closed());
        assert_eq!(memory.contents(), vec![1,2,3,4,5]);
    }

    #[test] fn short_read_is_seen_as_short() {
        let script = Script::new(vec![Step::Data(b"abc".to_vec()), Step::Data(b"defghij".to_vec())]);
        let mut stream = Buffered::with_capacity(16, Cookie::new(script, Descriptor::reader()));
        let mut buf = [0u8; 10];
        assert_eq!(stream.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
        assert!(!stream.is_eof());
        assert!(!stream.has_error());
        assert_eq!(stream.read(&mut buf).unwrap(), 7);
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
        assert!(stream.is_eof());
    }

    #[test] fn short_read_unbuffered() {
        //requests at least as large as the buffer go straight to the slot
        let script = Script::new(vec![Step::Data(b"abc".to_vec())]);
        let mut stream = Buffered::with_capacity(4, Cookie::new(script, Descriptor::reader()));
        let mut buf = [0u8; 10];
        assert_eq!(stream.read(&mut buf).unwrap(), 3);
    }

    #[test] fn eof_is_sticky_until_seek() {
        let memory = Memory::with_contents(b"xy".to_vec());
        let mut writer = memory.clone();
        let mut stream = Buffered::open(memory.cookie());
        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert!(stream.is_eof());
        //more data shows up behind the stream's back
        writer.seek(SeekFrom::End(0)).unwrap();
        writer.write_all(b"z").unwrap();
        assert_eq!(stream.read(&mut [0u8; 4]).unwrap(), 0);
        stream.seek(SeekFrom::Start(2)).unwrap();
        assert!(!stream.is_eof());
        assert_eq!(stream.read(&mut [0u8; 4]).unwrap(), 1);
    }

    #[test] fn failure_sets_error() {
        let script = Script::new(vec![Step::Fail(io::ErrorKind::ConnectionReset), Step::Data(b"ok".to_vec())]);
        let mut stream = Buffered::open(Cookie::new(script, Descriptor::reader()));
        let err = stream.read(&mut [0u8; 4]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert!(stream.has_error());
        stream.clear_error();
        assert!(!stream.has_error());
        //nothing was retried on our behalf; the next call reaches the backing again
        assert_eq!(stream.read(&mut [0u8; 4]).unwrap(), 2);
    }

    #[test] fn unsupported_is_immediate() {
        let mut stream = Buffered::open(Cookie::new(Cursor::new(b"data".to_vec()), Descriptor::reader()));
        let err = stream.write(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        let err = stream.seek(SeekFrom::Start(0)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        assert!(matches!(stream.tell(), Err(Error::Unsupported(Op::Seek))));
        let mut out = String::new();
        stream.read_to_string(&mut out).unwrap();
        assert_eq!(out, "data");
    }

    #[test] fn writes_are_batched() {
        let trickle = Trickle::new(usize::MAX);
        let mut stream = Buffered::with_capacity(64, Cookie::new(trickle.clone(), Descriptor::writer()));
        for byte in 0..100u8 {
            stream.write_all(&[byte]).unwrap();
        }
        stream.flush().unwrap();
        assert_eq!(trickle.calls(), 2);
        assert_eq!(trickle.contents(), (0..100u8).collect::<Vec<_>>());
    }

    #[test] fn partial_writes_are_drained() {
        let trickle = Trickle::new(3);
        let mut stream = Buffered::with_capacity(64, Cookie::new(trickle.clone(), Descriptor::writer()));
        stream.write_all(b"hello, world").unwrap();
        assert!(trickle.contents().is_empty());
        stream.close().unwrap();
        assert_eq!(trickle.contents(), b"hello, world");
        assert_eq!(trickle.calls(), 4);
    }

    #[test] fn zero_write_is_an_error() {
        let trickle = Trickle::new(0);
        let mut stream = Buffered::with_capacity(8, Cookie::new(trickle, Descriptor::writer()));
        stream.write_all(b"abc").unwrap();
        assert_eq!(stream.flush().unwrap_err().kind(), io::ErrorKind::WriteZero);
        assert!(stream.has_error());
    }

    #[test] fn tell_counts_buffered_bytes() {
        let memory = Memory::with_contents((0..100u8).collect());
        let mut stream = Buffered::with_capacity(64, memory.cookie());
        let mut buf = [0u8; 10];
        stream.read_exact(&mut buf).unwrap();
        //the backing has moved ahead by a whole buffer
        assert_eq!(memory.position(), 64);
        assert_eq!(stream.tell().unwrap(), 10);
        assert_eq!(stream.seek(SeekFrom::Current(-5)).unwrap(), 5);
        assert_eq!(memory.position(), 5);
        stream.read_exact(&mut buf[..1]).unwrap();
        assert_eq!(buf[0], 5);

        stream.seek(SeekFrom::End(0)).unwrap();
        stream.write_all(b"abc").unwrap();
        assert_eq!(memory.position(), 100);
        assert_eq!(stream.tell().unwrap(), 103);
    }

    #[test] fn seek_from_start_and_current() {
        let memory = Memory::with_contents(vec![0u8; 1000]);
        let mut stream = Buffered::open(memory.cookie());
        assert_eq!(stream.seek(SeekFrom::Start(123)).unwrap(), 123);
        assert_eq!(stream.seek(SeekFrom::Current(77)).unwrap(), 200);
        assert_eq!(stream.seek(SeekFrom::Current(-200)).unwrap(), 0);
        assert_eq!(stream.seek(SeekFrom::Current(-1)).unwrap_err().kind(), io::ErrorKind::InvalidInput);
        assert_eq!(stream.tell().unwrap(), 0);
    }

    #[test] fn write_after_read() {
        let memory = Memory::with_contents(b"abcdef".to_vec());
        let mut stream = Buffered::open(memory.cookie());
        let mut buf = [0u8; 2];
        stream.read_exact(&mut buf).unwrap();
        stream.write_all(b"XY").unwrap();
        stream.close().unwrap();
        assert_eq!(memory.contents(), b"abXYef");
    }

    #[test] fn read_after_write() {
        let memory = Memory::with_contents(b"abcdef".to_vec());
        let mut stream = Buffered::open(memory.cookie());
        stream.write_all(b"AB").unwrap();
        let mut buf = [0u8; 2];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"cd");
        assert_eq!(memory.contents(), b"ABcdef");
    }

    #[test] fn buf_read_lines() {
        let memory = Memory::with_contents(b"one\ntwo\nthree".to_vec());
        let stream = Buffered::with_capacity(4, memory.cookie());
        let lines: Vec<String> = stream.lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines, ["one", "two", "three"]);
    }

    #[test] fn closes_exactly_once() {
        let counted = Counted::new(Memory::new());
        let closes = counted.closes();
        let mut stream = Buffered::open(Cookie::new(counted, Descriptor::read_writer().with_close()));
        stream.write_all(b"bye").unwrap();
        stream.close().unwrap();
        assert_eq!(closes.get(), 1);
    }

    #[test] fn drop_closes() {
        let memory = Memory::new();
        let counted = Counted::new(memory.clone());
        let closes = counted.closes();
        {
            let mut stream = Buffered::open(Cookie::new(counted, Descriptor::read_writer().with_close()));
            stream.write_all(b"flushed on drop").unwrap();
        }
        assert_eq!(closes.get(), 1);
        assert_eq!(memory.contents(), b"flushed on drop");
        assert!(memory.is_closed());
    }

    #[test] fn close_failure_is_reported() {
        let counted = Counted::failing_close(Memory::new());
        let closes = counted.closes();
        let stream = Buffered::open(Cookie::new(counted, Descriptor::writer().with_close()));
        assert!(matches!(stream.close(), Err(Error::Backing(_))));
        assert_eq!(closes.get(), 1);
    }

    #[test] fn flush_failure_still_closes() {
        let counted = Counted::new(Memory::new());
        let closes = counted.closes();
        //a writer that accepts nothing
        struct Stuck(Counted<Memory>);
        impl Write for Stuck {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> { Err(io::Error::new(io::ErrorKind::Other, "stuck")) }
            fn flush(&mut self) -> io::Result<()> { Ok(()) }
        }
        impl crate::Close for Stuck {
            fn close(self) -> io::Result<()> { self.0.close() }
        }
        let mut stream = Buffered::open(Cookie::new(Stuck(counted), Descriptor::writer().with_close()));
        stream.write_all(b"lost").unwrap();
        assert!(matches!(stream.close(), Err(Error::Backing(_))));
        assert_eq!(closes.get(), 1);
    }

    #[test] fn blocking_pipe() {
        let (reader, writer) = pipe();
        let mut stream = Buffered::open(Cookie::new(reader, Descriptor::reader()));
        let handle = std::thread::spawn(move || {
            let mut writer = Buffered::with_capacity(4, Cookie::new(writer, Descriptor::writer()));
            for line in ["alpha\n", "beta\n", "gamma\n"] {
                writer.write_all(line.as_bytes()).unwrap();
                writer.flush().unwrap();
                std::thread::sleep(std::time::Duration::from_millis(5));
            }
            //dropping the writer is what ends the stream
        });
        let mut lines = String::new();
        stream.read_to_string(&mut lines).unwrap();
        handle.join().unwrap();
        assert_eq!(lines, "alpha\nbeta\ngamma\n");
    }

    #[test] fn random_ops_match_cursor() {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let memory = Memory::new();
        let mut stream = Buffered::with_capacity(16, memory.cookie());
        let mut model = Cursor::new(Vec::new());
        for _ in 0..2000 {
            match rng.gen_range(0..3) {
                0 => {
                    let data: Vec<u8> = (0..rng.gen_range(0..40)).map(|_| rng.gen()).collect();
                    stream.write_all(&data).unwrap();
                    model.write_all(&data).unwrap();
                }
                1 => {
                    let target = rng.gen_range(0..=model.get_ref().len() as u64);
                    assert_eq!(stream.seek(SeekFrom::Start(target)).unwrap(), model.seek(SeekFrom::Start(target)).unwrap());
                }
                _ => {
                    let remaining = model.get_ref().len() - model.position() as usize;
                    let mut ours = vec![0; rng.gen_range(0..=remaining)];
                    let mut theirs = ours.clone();
                    stream.read_exact(&mut ours).unwrap();
                    model.read_exact(&mut theirs).unwrap();
                    assert_eq!(ours, theirs);
                }
            }
            assert_eq!(stream.tell().unwrap() as u64, model.position());
        }
        stream.close().unwrap();
        assert_eq!(memory.contents(), model.into_inner());
    }
}
