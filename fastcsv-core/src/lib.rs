/*!
`fastcsv-core` provides the allocation free machinery underneath `fastcsv`:
a streaming CSV tokenizer and a field escaping engine.

Neither type performs any I/O. The [`Tokenizer`] is fed slices of input and
writes unescaped field data into caller provided buffers, while the
[`Escaper`] decides whether a field needs quotes and yields the pieces of
its escaped form as subslices of the original field.

# Example: counting records

```
use fastcsv_core::{ReadRecordResult, Tokenizer};

let data = "foo,bar\n\"multi\nline\",baz\n";
let mut tok = Tokenizer::default();
let (mut out, mut ends) = ([0u8; 64], [0usize; 8]);
let mut input = data.as_bytes();
let mut count = 0;
loop {
    let (res, nin, _, _) = tok.read_record(input, &mut out, &mut ends);
    input = &input[nin..];
    match res {
        ReadRecordResult::InputEmpty => {}
        ReadRecordResult::OutputFull | ReadRecordResult::OutputEndsFull => {
            panic!("buffers too small")
        }
        ReadRecordResult::Record => count += 1,
        ReadRecordResult::End => break,
    }
}
assert_eq!(count, 2);
```
*/

#![deny(missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]

pub use crate::dialect::{
    CommentMode, Dialect, DialectError, QuoteStyle, Terminator,
};
pub use crate::escaper::{Escape, Escaper};
pub use crate::tokenizer::{ReadRecordResult, Tokenizer};

mod dialect;
mod escaper;
mod tokenizer;
