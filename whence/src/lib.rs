/*!
The reference point of a seek.

Every layer that touches a seek speaks a slightly different dialect.  C callers hand us an `int` that is one of
`SEEK_SET`, `SEEK_CUR` or `SEEK_END` (whose values are up to the C library, not to us), plus a signed 64-bit offset.
Rust backings want a [SeekFrom], which folds the reference point and the offset together and refuses negative
start-relative offsets at the type level.

[Whence] is the neutral form that both sides convert through.  Getting one of these conversions wrong does not crash,
it silently reads the wrong bytes, so the conversions live here in one place and nowhere else.
*/
use std::io::SeekFrom;
use std::os::raw::c_int;

///Position type used at every seek boundary.
///
/// 64 bits regardless of pointer width, so that large streams can be addressed on 32-bit hosts too.
pub type Offset = i64;

///Models the reference point of a seek.
#[derive(Copy,Clone,Debug,PartialEq,Eq,Hash)]
pub enum Whence {
    ///Relative to the start of the stream.  `SEEK_SET`.
    Start,
    ///Relative to the current cursor.  `SEEK_CUR`.
    Current,
    ///Relative to the end of the stream.  `SEEK_END`.
    End,
}

#[derive(Debug,thiserror::Error,PartialEq,Eq)]
pub enum Error {
    #[error("unknown whence code {0}")]
    UnknownCode(c_int),
    #[error("start-relative offset {0} is negative")]
    NegativeStart(Offset),
}

impl Whence {
    ///Interprets a C whence code.
    ///
    /// Codes are compared against the host C library's own constants, never against literal numbers.
    pub fn from_c(code: c_int) -> Result<Whence,Error> {
        match code {
            libc::SEEK_SET => Ok(Whence::Start),
            libc::SEEK_CUR => Ok(Whence::Current),
            libc::SEEK_END => Ok(Whence::End),
            other => Err(Error::UnknownCode(other))
        }
    }
    ///The C whence code for this reference point.
    pub fn as_c(self) -> c_int {
        match self {
            Whence::Start => libc::SEEK_SET,
            Whence::Current => libc::SEEK_CUR,
            Whence::End => libc::SEEK_END,
        }
    }
    ///Combines this reference point with an offset, producing what a Rust backing expects.
    pub fn seek_from(self, offset: Offset) -> Result<SeekFrom,Error> {
        match self {
            Whence::Start => {
                if offset < 0 {
                    Err(Error::NegativeStart(offset))
                }
                else {
                    Ok(SeekFrom::Start(offset as u64))
                }
            }
            Whence::Current => Ok(SeekFrom::Current(offset)),
            Whence::End => Ok(SeekFrom::End(offset)),
        }
    }
}

///Splits a [SeekFrom] back into its reference point and offset.
///
/// Fails only for start-relative positions beyond [Offset::MAX].
pub fn split(seek_from: SeekFrom) -> Result<(Whence,Offset),std::num::TryFromIntError> {
    match seek_from {
        SeekFrom::Start(position) => Ok((Whence::Start, Offset::try_from(position)?)),
        SeekFrom::Current(delta) => Ok((Whence::Current, delta)),
        SeekFrom::End(delta) => Ok((Whence::End, delta)),
    }
}
