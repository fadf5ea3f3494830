/*!
Ready-made backings.

Any type with the right std traits can back a stream; these cover the two shapes that come up most.

|           | [Memory]             | [pipe]                          |
|-----------|----------------------|---------------------------------|
| read      | yes                  | yes ([PipeReader])              |
| write     | yes                  | yes ([PipeWriter])              |
| seek      | yes                  | no                              |
| blocks    | never                | reads block until data or EOF   |
*/
mod memory;
mod pipe;

pub use memory::Memory;
pub use pipe::{pipe, bounded_pipe, PipeReader, PipeWriter};
