/*!
The `fastcsv` crate provides a fast and lenient CSV reader and writer.

Records are read lazily from any `io::Read`, each one carrying the line on
which it started and whether it is a comment. Malformed quoting is never an
error: parsing always recovers and keeps going. Writing quotes fields only
when needed and goes through a buffer that large writes bypass.

# Brief overview

The primary types in this crate are
[`Reader`](struct.Reader.html)
and
[`Writer`](struct.Writer.html),
for reading and writing CSV data respectively.
Correspondingly, to support CSV data with custom field or record delimiters
(among many other things), you should use either a
[`ReaderBuilder`](struct.ReaderBuilder.html)
or a
[`WriterBuilder`](struct.WriterBuilder.html),
depending on whether you're reading or writing CSV data.

A reader yields [`Record`](struct.Record.html)s. The first data record can
also be turned into a [`Header`](struct.Header.html), through which fields
can be looked up by name with a [`NamedRecord`](struct.NamedRecord.html).

With the default `serde` feature, `Writer::serialize` writes any value that
implements Serde's `Serialize` trait as a record.

The tokenizer and escaping engine live in the `fastcsv-core` crate, which
does no I/O and no allocation.

# Example

This example shows how to read records from a string, and how a quoted field
may span lines without confusing line numbers.

```
use fastcsv::ReaderBuilder;

# fn main() -> fastcsv::Result<()> {
let data = "\
name,note
alice,\"two
lines\"
bob,one line
";
let mut rdr = ReaderBuilder::new().has_headers(true).from_string(data)?;
let header = rdr.headers()?.clone();
let mut lines = vec![];
for result in rdr.records() {
    let record = result?;
    let name = record.named(&header).get("name").unwrap_or("").to_string();
    lines.push((record.line(), name));
}
assert_eq!(lines, vec![(2, "alice".to_string()), (4, "bob".to_string())]);
# Ok(())
# }
```

# Example with comments

Comment lines can be handed over as records, skipped or treated as data.

```
use fastcsv::{CommentMode, ReaderBuilder};

# fn main() -> fastcsv::Result<()> {
let data = "#generated\na,b\n";
let mut rdr = ReaderBuilder::new()
    .comment_mode(CommentMode::Read)
    .from_string(data)?;

let comment = rdr.next_record()?;
assert!(comment.is_comment());
assert_eq!(&comment[0], "generated");

let record = rdr.next_record()?;
assert_eq!(record, vec!["a", "b"]);
# Ok(())
# }
```
*/

#![deny(missing_docs)]

pub use fastcsv_core::{
    CommentMode, Dialect, DialectError, QuoteStyle, Terminator,
};

pub use crate::buffered::{BufSink, BufSource};
pub use crate::decode::DecodeReader;
pub use crate::error::{Error, IntoInnerError, Result, Utf8Error};
pub use crate::header::{Header, NamedRecord};
pub use crate::reader::{IntoRecords, Reader, ReaderBuilder, Records};
pub use crate::record::{Record, RecordIter};
pub use crate::writer::{Writer, WriterBuilder};

mod buffered;
mod decode;
mod error;
mod header;
mod reader;
mod record;
#[cfg(feature = "serde")]
mod serializer;
mod writer;
