use std::io::{Read, Seek, Write};
use whence::Offset;
use crate::{Capabilities, Error};

///A buffered stream over a cookie.
///
/// Implemented by both strategies, [crate::reconstructed::Buffered] and (where the platform has one)
/// `native::CFile`; [crate::File] is whichever of the two this build uses.
pub trait Stream: Read + Write + Seek + Send {
    ///The position the next read or write will happen at, counting buffered bytes.
    fn tell(&mut self) -> Result<Offset,Error>;
    ///Whether a read has hit end-of-stream since the last seek or [Stream::clear_error].
    fn is_eof(&self) -> bool;
    ///Whether an operation has failed since the last [Stream::clear_error].
    fn has_error(&self) -> bool;
    fn clear_error(&mut self);
    fn capabilities(&self) -> Capabilities;
    ///Flushes, then runs the closer slot exactly once.
    ///
    /// The stream is gone afterwards whatever the result.  A flush failure is reported in preference to a close
    /// failure, since it happened first.
    fn close(self) -> Result<(),Error> where Self: Sized;
}
