/*!
Custom-backed `FILE` streams.

fcookie lets rust code supply the read, write, seek and close logic behind a buffered file handle.  Hand the result to
C code that wants a `FILE *`, or use it from rust through [Stream].

The quickest way in is one of the `wrap_` functions:

```
use std::io::{Read, Seek, SeekFrom, Write};
use fcookie::backing::Memory;

let memory = Memory::new();
let mut file = fcookie::wrap_read_write_seeker_with_close(memory.clone()).unwrap();
file.write_all(b"hello").unwrap();
file.seek(SeekFrom::Start(0)).unwrap();
let mut out = String::new();
file.read_to_string(&mut out).unwrap();
assert_eq!(out, "hello");
```

For anything else, build a [Descriptor] by hand and [open] a [Cookie].

# Strategies

On glibc, macOS and the BSDs (with the default `native` feature), [File] is a real `FILE *` produced by
`fopencookie` or `funopen`.  Elsewhere it is a buffered stream rebuilt in rust from the same four slots.  Which one a build
uses is decided at compile time; see [NATIVE].  On native builds [File] has `as_ptr`, which is what C code wants.
*/
mod wrap;

pub use wrap::{wrap_reader, wrap_writer, wrap_read_writer, wrap_read_seeker, wrap_read_write_seeker};
pub use wrap::{wrap_reader_with_close, wrap_writer_with_close, wrap_read_writer_with_close, wrap_read_seeker_with_close, wrap_read_write_seeker_with_close};
pub use bridge::{open, File, NATIVE};
pub use bridge::{Capabilities, Close, Cookie, Descriptor, Dispatch, Error, Op, Stream, Transfer, io_errno};
pub use bridge::{backing, reconstructed};
pub use whence::{Offset, Whence};

#[cfg(any(test,feature="test"))]
pub use bridge::test;
