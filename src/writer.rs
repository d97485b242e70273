use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::result;

use bstr::ByteSlice;
use fastcsv_core::{CommentMode, Dialect, Escaper, QuoteStyle, Terminator};
use log::debug;
#[cfg(feature = "serde")]
use serde::Serialize;

use crate::buffered::{BufSink, DEFAULT_SINK_CAPACITY};
use crate::error::{Error, IntoInnerError, Result};
#[cfg(feature = "serde")]
use crate::serializer::serialize;

/// Builds a CSV writer with various configuration knobs.
///
/// This builder can be used to tweak the field delimiter, record terminator
/// and more. Once a CSV `Writer` is built, its configuration cannot be
/// changed.
#[derive(Debug)]
pub struct WriterBuilder {
    dialect: Dialect,
    style: QuoteStyle,
    term: Terminator,
    capacity: usize,
}

impl Default for WriterBuilder {
    fn default() -> WriterBuilder {
        WriterBuilder {
            dialect: Dialect::default(),
            style: QuoteStyle::default(),
            term: Terminator::default(),
            capacity: DEFAULT_SINK_CAPACITY,
        }
    }
}

impl WriterBuilder {
    /// Create a new builder for configuring CSV writing.
    ///
    /// To convert a builder into a writer, call one of the methods starting
    /// with `from_`.
    ///
    /// # Example
    ///
    /// ```
    /// use fastcsv::WriterBuilder;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut wtr = WriterBuilder::new().delimiter(b';').from_writer(vec![])?;
    /// wtr.write_record(&["a", "b;c"])?;
    ///
    /// let data = String::from_utf8(wtr.into_inner()?)?;
    /// assert_eq!(data, "a;\"b;c\"\r\n");
    /// # Ok(())
    /// # }
    /// ```
    pub fn new() -> WriterBuilder {
        WriterBuilder::default()
    }

    /// Build a CSV writer from this configuration that writes data to `wtr`.
    ///
    /// Note that the CSV writer is buffered automatically, so you should not
    /// wrap `wtr` in a buffered writer like `io::BufWriter`.
    pub fn from_writer<W: io::Write>(&self, wtr: W) -> Result<Writer<W>> {
        self.dialect.validate()?;
        Ok(Writer::new(self, wtr))
    }

    /// Build a CSV writer from this configuration that writes data to the
    /// given file path. The file is truncated if it already exists.
    ///
    /// If there was a problem opening the file at the given path, then this
    /// returns the corresponding error.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Writer<File>> {
        self.dialect.validate()?;
        Ok(Writer::new(self, File::create(path)?))
    }

    /// The field delimiter to use when writing CSV.
    ///
    /// The default is `b','`.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut WriterBuilder {
        self.dialect.delimiter = delimiter;
        self
    }

    /// The quote byte to use when writing CSV.
    ///
    /// The default is `b'"'`.
    pub fn quote(&mut self, quote: u8) -> &mut WriterBuilder {
        self.dialect.quote = quote;
        self
    }

    /// The comment byte to use when writing CSV.
    ///
    /// The default is `b'#'`.
    pub fn comment(&mut self, comment: u8) -> &mut WriterBuilder {
        self.dialect.comment = comment;
        self
    }

    /// Whether comments can be written.
    ///
    /// When this is anything but `CommentMode::None`, `Writer::write_comment`
    /// is available and a first field starting with the comment byte is
    /// quoted, so that it is not read back as a comment. `Read` and `Skip`
    /// behave the same when writing.
    pub fn comment_mode(&mut self, mode: CommentMode) -> &mut WriterBuilder {
        self.dialect.comment_mode = mode;
        self
    }

    /// The quoting style to use when writing CSV.
    ///
    /// By default, this is set to `QuoteStyle::Necessary`, which will only
    /// use quotes when they are necessary to preserve the integrity of data.
    pub fn quote_style(&mut self, style: QuoteStyle) -> &mut WriterBuilder {
        self.style = style;
        self
    }

    /// The record terminator to use when writing CSV.
    ///
    /// The default is `Terminator::CRLF`, which writes `\r\n`.
    pub fn terminator(&mut self, term: Terminator) -> &mut WriterBuilder {
        self.term = term;
        self
    }

    /// Set the capacity (in bytes) of the internal buffer used in the CSV
    /// writer.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut WriterBuilder {
        self.capacity = capacity;
        self
    }
}

/// A already configured CSV writer.
///
/// A CSV writer takes as input Rust values and writes those values in a
/// valid CSV format as output.
///
/// While CSV writing is considerably easier than parsing CSV, a proper writer
/// will do a number of things for you:
///
/// 1. Quote fields when necessary.
/// 2. Check that a first field is not mistaken for a comment.
/// 3. Write a record of one empty field as `""`, so that it is not read back
///    as a blank line.
///
/// All output goes through an internal buffer. The buffer is flushed when
/// the writer is closed or dropped; use `close` to find out whether that
/// flush succeeded. Once closed, every write fails.
#[derive(Debug)]
pub struct Writer<W: io::Write> {
    core: Escaper,
    sink: BufSink<W>,
    state: WriterState,
}

#[derive(Debug)]
struct WriterState {
    /// The number of fields written in the current record.
    fields: u64,
    /// Whether the only field of the current record so far is empty and
    /// was written without quotes.
    lone_empty: bool,
}

impl<W: io::Write> Writer<W> {
    /// Build a CSV writer with a default configuration that writes data to
    /// `wtr`.
    ///
    /// To customize the writer, use a `WriterBuilder`.
    ///
    /// # Example
    ///
    /// ```
    /// use fastcsv::Writer;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut wtr = Writer::from_writer(vec![]);
    /// wtr.write_record(&["a", "b", "c"])?;
    /// wtr.write_record(&["x", "y", "z"])?;
    ///
    /// let data = String::from_utf8(wtr.into_inner()?)?;
    /// assert_eq!(data, "a,b,c\r\nx,y,z\r\n");
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_writer(wtr: W) -> Writer<W> {
        Writer::new(&WriterBuilder::new(), wtr)
    }

    fn new(builder: &WriterBuilder, wtr: W) -> Writer<W> {
        debug!(
            "opening CSV writer ({:?}, {:?}, buffer: {}): {:?}",
            builder.style, builder.term, builder.capacity, builder.dialect
        );
        Writer {
            core: Escaper::new(builder.dialect, builder.style, builder.term),
            sink: BufSink::with_capacity(builder.capacity, wtr),
            state: WriterState { fields: 0, lone_empty: false },
        }
    }

    /// Write a single record.
    ///
    /// This method accepts something that can be turned into an iterator
    /// that yields elements that can be represented by a `&[u8]`.
    ///
    /// This may be called with an empty iterator, which will cause an empty
    /// line to be written. A reader skips such a line unless it keeps empty
    /// rows.
    ///
    /// # Example
    ///
    /// ```
    /// use fastcsv::Writer;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut wtr = Writer::from_writer(vec![]);
    /// wtr.write_record(&["a", "b,c", "d\"e"])?;
    /// wtr.write_record(&[""])?;
    ///
    /// let data = String::from_utf8(wtr.into_inner()?)?;
    /// assert_eq!(data, "a,\"b,c\",\"d\"\"e\"\r\n\"\"\r\n");
    /// # Ok(())
    /// # }
    /// ```
    pub fn write_record<I, T>(&mut self, record: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        for field in record.into_iter() {
            self.write_field(field)?;
        }
        self.write_terminator()
    }

    /// Write a single field.
    ///
    /// One should prefer using `write_record` over this method. It is
    /// provided for cases where writing a field at a time is more
    /// convenient than writing a record at a time.
    ///
    /// Note that if this API is used, `write_record` should be called with
    /// an empty iterator (or `write_terminator` called directly) to end the
    /// record.
    pub fn write_field<T: AsRef<[u8]>>(&mut self, field: T) -> Result<()> {
        let field = field.as_ref();
        let first = self.state.fields == 0;
        if !first {
            self.sink.write_all(&[self.core.dialect().delimiter])?;
        }
        let quoted = self.core.should_quote(field, first);
        if quoted {
            let quote = self.core.quote();
            self.sink.write_all(&[quote])?;
            for piece in self.core.escape(field) {
                self.sink.write_all(piece)?;
            }
            self.sink.write_all(&[quote])?;
        } else {
            self.sink.write_all(field)?;
        }
        self.state.fields += 1;
        self.state.lone_empty = first && !quoted && field.is_empty();
        Ok(())
    }

    /// Write a record terminator.
    ///
    /// If the current record consists of a single empty field, it is
    /// quoted first.
    pub fn write_terminator(&mut self) -> Result<()> {
        if self.state.fields == 1 && self.state.lone_empty {
            let quote = self.core.quote();
            self.sink.write_all(&[quote, quote])?;
        }
        self.sink.write_all(self.core.terminator())?;
        self.state.fields = 0;
        self.state.lone_empty = false;
        Ok(())
    }

    /// Write a comment line.
    ///
    /// The comment byte is written, followed by `comment` and a record
    /// terminator. Each `\r`, `\n` or `\r\n` in `comment` starts a new
    /// comment line. A record written field by field that is still open is
    /// terminated first.
    ///
    /// This fails with `Error::CommentsDisabled` if the writer was built
    /// with `CommentMode::None`.
    ///
    /// # Example
    ///
    /// ```
    /// use fastcsv::{CommentMode, WriterBuilder};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut wtr = WriterBuilder::new()
    ///     .comment_mode(CommentMode::Read)
    ///     .from_writer(vec![])?;
    /// wtr.write_comment("generated\nby hand")?;
    /// wtr.write_record(&["#a", "b"])?;
    ///
    /// let data = String::from_utf8(wtr.into_inner()?)?;
    /// assert_eq!(data, "#generated\r\n#by hand\r\n\"#a\",b\r\n");
    /// # Ok(())
    /// # }
    /// ```
    pub fn write_comment(&mut self, comment: &str) -> Result<()> {
        let dialect = *self.core.dialect();
        if !dialect.comment_mode.is_enabled() {
            return Err(Error::CommentsDisabled);
        }
        if self.state.fields > 0 {
            self.write_terminator()?;
        }
        let mut rest = comment.as_bytes();
        loop {
            let (line, next) = match rest.find_byteset(b"\r\n") {
                None => (rest, None),
                Some(i) => {
                    let crlf =
                        rest[i] == b'\r' && rest.get(i + 1) == Some(&b'\n');
                    let skip = if crlf { 2 } else { 1 };
                    (&rest[..i], Some(&rest[i + skip..]))
                }
            };
            self.sink.write_all(&[dialect.comment])?;
            self.sink.write_all(line)?;
            self.sink.write_all(self.core.terminator())?;
            match next {
                None => return Ok(()),
                Some(next) => rest = next,
            }
        }
    }

    /// Serialize a single record using Serde.
    ///
    /// The value is flattened into the fields of one record. Structs,
    /// tuples and sequences become one field per element, scalars become a
    /// single field and `None` becomes an empty field. Maps and enum
    /// variants with more than one value are not supported.
    ///
    /// # Example
    ///
    /// ```
    /// use fastcsv::Writer;
    /// use serde::Serialize;
    ///
    /// #[derive(Serialize)]
    /// struct Row<'a> {
    ///     city: &'a str,
    ///     pop: u64,
    ///     area: Option<f64>,
    /// }
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut wtr = Writer::from_writer(vec![]);
    /// let row = Row { city: "Boston", pop: 4628910, area: None };
    /// wtr.serialize_header(&row)?;
    /// wtr.serialize(&row)?;
    ///
    /// let data = String::from_utf8(wtr.into_inner()?)?;
    /// assert_eq!(data, "city,pop,area\r\nBoston,4628910,\r\n");
    /// # Ok(())
    /// # }
    /// ```
    #[cfg(feature = "serde")]
    pub fn serialize<S: Serialize>(&mut self, record: S) -> Result<()> {
        serialize(self, &record, false)?;
        self.write_terminator()
    }

    /// Write the field names of a struct as a record.
    ///
    /// This fails with `Error::Serialize` if `record` has no field names,
    /// for example because it is a tuple.
    #[cfg(feature = "serde")]
    pub fn serialize_header<S: Serialize>(&mut self, record: S) -> Result<()> {
        if !serialize(self, &record, true)? {
            return Err(Error::Serialize(
                "cannot write a header for a value without field names"
                    .to_string(),
            ));
        }
        self.write_terminator()
    }

    /// Flush the contents of the internal buffer to the underlying writer.
    ///
    /// If there was a problem writing to the underlying writer, then an error
    /// is returned.
    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }

    /// Flush the internal buffer and release the underlying writer.
    ///
    /// The underlying writer is dropped even if flushing fails. Closing more
    /// than once has no further effect.
    pub fn close(&mut self) -> Result<()> {
        if self.sink.is_closed() {
            return Ok(());
        }
        let res = self.sink.close();
        debug!("closed CSV writer");
        res.map_err(Error::Io)
    }

    /// Returns true once this writer has been closed.
    pub fn is_closed(&self) -> bool {
        self.sink.is_closed()
    }

    /// Flush the internal buffer and return the underlying writer.
    pub fn into_inner(
        mut self,
    ) -> result::Result<W, IntoInnerError<Writer<W>>> {
        match self.sink.take_inner() {
            Ok(wtr) => Ok(wtr),
            Err(err) => Err(IntoInnerError::new(self, err)),
        }
    }

    /// Gets a reference to the underlying writer, unless this writer has
    /// been closed.
    pub fn get_ref(&self) -> Option<&W> {
        self.sink.get_ref()
    }

    /// The dialect of this writer.
    pub fn dialect(&self) -> &Dialect {
        self.core.dialect()
    }
}
