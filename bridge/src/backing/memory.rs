use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use crate::{Close, Cookie, Descriptor};

#[derive(Debug,Default)]
struct State {
    bytes: Vec<u8>,
    position: u64,
    closed: bool,
}

///A growable in-memory byte buffer.
///
/// Clones share the buffer and the cursor.  Keep a clone around to look at what was written after the stream itself
/// has been closed.
#[derive(Debug,Clone,Default)]
pub struct Memory(Arc<Mutex<State>>);

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "memory buffer is closed")
}

impl Memory {
    pub fn new() -> Self {
        Memory::default()
    }
    ///A buffer holding `bytes`, with the cursor at the start.
    pub fn with_contents(bytes: Vec<u8>) -> Self {
        Memory(Arc::new(Mutex::new(State { bytes, position: 0, closed: false })))
    }
    fn state(&self) -> MutexGuard<'_, State> {
        //nothing in here can be left half-updated by a panic
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
    fn open_state(&self) -> io::Result<MutexGuard<'_, State>> {
        let state = self.state();
        if state.closed {
            Err(closed())
        }
        else {
            Ok(state)
        }
    }
    ///A copy of the buffer's contents.  Works after close.
    pub fn contents(&self) -> Vec<u8> {
        self.state().bytes.clone()
    }
    pub fn len(&self) -> usize {
        self.state().bytes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn position(&self) -> u64 {
        self.state().position
    }
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
    ///A cookie with all four slots bound to this buffer.
    pub fn cookie(&self) -> Cookie<Memory> {
        Cookie::new(self.clone(), Descriptor::read_writer().with_seek().with_close())
    }
}

impl Read for Memory {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.open_state()?;
        let len = state.bytes.len() as u64;
        let start = state.position.min(len) as usize;
        let n = (state.bytes.len() - start).min(buf.len());
        buf[..n].copy_from_slice(&state.bytes[start..start + n]);
        state.position += n as u64;
        Ok(n)
    }
}

impl Write for Memory {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.open_state()?;
        let start = usize::try_from(state.position).map_err(|_| io::Error::new(io::ErrorKind::OutOfMemory, "position exceeds address space"))?;
        let end = start.checked_add(buf.len()).ok_or_else(|| io::Error::new(io::ErrorKind::OutOfMemory, "write exceeds address space"))?;
        if state.bytes.len() < end {
            //writing past the end leaves a zero-filled gap, like a sparse file
            state.bytes.resize(end, 0);
        }
        state.bytes[start..end].copy_from_slice(buf);
        state.position = end as u64;
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        self.open_state().map(|_| ())
    }
}

impl Seek for Memory {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let mut state = self.open_state()?;
        let (base, delta) = match pos {
            SeekFrom::Start(n) => {
                state.position = n;
                return Ok(n);
            }
            SeekFrom::Current(delta) => (state.position, delta),
            SeekFrom::End(delta) => (state.bytes.len() as u64, delta),
        };
        match base.checked_add_signed(delta) {
            Some(n) => {
                state.position = n;
                Ok(n)
            }
            None => Err(io::Error::new(io::ErrorKind::InvalidInput, "invalid seek to a negative or overflowing position")),
        }
    }
}

impl Close for Memory {
    ///Marks the buffer closed.  Closing twice is harmless.
    fn close(self) -> io::Result<()> {
        self.state().closed = true;
        Ok(())
    }
}
