use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead};
use std::iter::FusedIterator;
use std::path::Path;

use encoding_rs::Encoding;
use fastcsv_core::{CommentMode, Dialect, ReadRecordResult, Tokenizer};
use log::{debug, trace};

use crate::buffered::{BufSource, DEFAULT_SOURCE_CAPACITY};
use crate::decode::DecodeReader;
use crate::error::{Error, Result};
use crate::header::Header;
use crate::record::{RawRecord, Record};

/// Builds a CSV reader with various configuration knobs.
///
/// This builder can be used to tweak the field delimiter, quote byte,
/// comment handling and more. Once a CSV `Reader` is built, its
/// configuration cannot be changed.
///
/// Every `from_*` constructor checks the configuration first and fails
/// with `Error::Dialect` if the delimiter, quote and comment bytes cannot
/// be told apart.
#[derive(Debug)]
pub struct ReaderBuilder {
    dialect: Dialect,
    has_headers: bool,
    capacity: usize,
}

impl Default for ReaderBuilder {
    fn default() -> ReaderBuilder {
        ReaderBuilder {
            dialect: Dialect::default(),
            has_headers: false,
            capacity: DEFAULT_SOURCE_CAPACITY,
        }
    }
}

impl ReaderBuilder {
    /// Create a new builder for configuring CSV parsing.
    ///
    /// To convert a builder into a reader, call one of the methods starting
    /// with `from_`.
    ///
    /// # Example
    ///
    /// ```
    /// use fastcsv::ReaderBuilder;
    ///
    /// # fn main() -> fastcsv::Result<()> {
    /// let data = "\
    /// city,country,pop
    /// Boston,United States,4628910
    /// Concord,United States,42695
    /// ";
    /// let mut rdr = ReaderBuilder::new().has_headers(true).from_string(data)?;
    /// for result in rdr.records() {
    ///     let record = result?;
    ///     assert_eq!(record.len(), 3);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn new() -> ReaderBuilder {
        ReaderBuilder::default()
    }

    /// Build a CSV reader from this configuration that reads data from `rdr`.
    ///
    /// Note that the CSV reader is buffered automatically, so you should not
    /// wrap `rdr` in a buffered reader like `io::BufReader`.
    pub fn from_reader<R: io::Read>(&self, rdr: R) -> Result<Reader<R>> {
        self.dialect.validate()?;
        Ok(Reader::new(self, rdr))
    }

    /// Build a CSV reader from this configuration that reads data from an
    /// in-memory string.
    pub fn from_string<S: Into<String>>(
        &self,
        data: S,
    ) -> Result<Reader<io::Cursor<Vec<u8>>>> {
        self.from_reader(io::Cursor::new(data.into().into_bytes()))
    }

    /// Build a CSV reader from this configuration that reads data from the
    /// given file path.
    ///
    /// The encoding is detected from a byte order mark (UTF-8, UTF-16LE or
    /// UTF-16BE) and is UTF-8 otherwise. If there was a problem opening the
    /// file, then this returns the corresponding error.
    pub fn from_path<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<Reader<DecodeReader<File>>> {
        self.dialect.validate()?;
        let file = File::open(path)?;
        Ok(Reader::new(self, DecodeReader::new(file)))
    }

    /// Build a CSV reader from this configuration that reads data from the
    /// given file path, decoding it from `encoding`.
    pub fn from_path_with_encoding<P: AsRef<Path>>(
        &self,
        path: P,
        encoding: &'static Encoding,
    ) -> Result<Reader<DecodeReader<File>>> {
        self.dialect.validate()?;
        let file = File::open(path)?;
        Ok(Reader::new(self, DecodeReader::with_encoding(file, encoding)))
    }

    /// The field delimiter to use when parsing CSV.
    ///
    /// The default is `b','`.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut ReaderBuilder {
        self.dialect.delimiter = delimiter;
        self
    }

    /// The quote byte to use when parsing CSV.
    ///
    /// The default is `b'"'`.
    pub fn quote(&mut self, quote: u8) -> &mut ReaderBuilder {
        self.dialect.quote = quote;
        self
    }

    /// The comment byte to use when parsing CSV.
    ///
    /// It only has an effect when the comment mode is not
    /// `CommentMode::None`. The default is `b'#'`.
    pub fn comment(&mut self, comment: u8) -> &mut ReaderBuilder {
        self.dialect.comment = comment;
        self
    }

    /// How lines starting with the comment byte are handled.
    ///
    /// With `CommentMode::Read`, comment lines are returned as records for
    /// which `Record::is_comment` is true. With `CommentMode::Skip`, they
    /// are dropped. The default is `CommentMode::None`, which gives the
    /// comment byte no special meaning.
    pub fn comment_mode(&mut self, mode: CommentMode) -> &mut ReaderBuilder {
        self.dialect.comment_mode = mode;
        self
    }

    /// Whether blank lines are dropped.
    ///
    /// When disabled, each blank line is returned as a record with a single
    /// empty field. Such records are exempt from the field count check.
    ///
    /// This is enabled by default.
    pub fn skip_empty_rows(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.dialect.skip_empty_rows = yes;
        self
    }

    /// Whether the number of fields in records is allowed to change or not.
    ///
    /// When disabled (which is the default), parsing CSV data will return an
    /// error if a record is found with a number of fields different from the
    /// number of fields in the first data record. The bad record is skipped;
    /// reading can continue with the next one.
    ///
    /// When enabled, this error checking is turned off.
    pub fn flexible(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.dialect.flexible = yes;
        self
    }

    /// Whether to treat the first record as a header record.
    ///
    /// When enabled, the first data record is taken out of the record
    /// sequence and is only available through `Reader::headers`.
    ///
    /// When disabled (which is the default), the first data record is still
    /// used by `Reader::headers`, but it is also the first record returned.
    pub fn has_headers(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.has_headers = yes;
        self
    }

    /// Set the capacity (in bytes) of the buffer used in the CSV reader.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut ReaderBuilder {
        self.capacity = capacity;
        self
    }

    /// Replace every parsing option at once.
    pub fn dialect(&mut self, dialect: Dialect) -> &mut ReaderBuilder {
        self.dialect = dialect;
        self
    }
}

/// A already configured CSV reader.
///
/// A CSV reader takes as input CSV data and transforms that into standard
/// Rust values. Records can be consumed in three ways, all of which share
/// the same position in the data:
///
/// * pulling them one at a time with `has_next` and `next_record`,
/// * iterating with `records` or `into_records`,
/// * handing each to a closure with `for_each_record`.
///
/// A reader is closed by `close`, by `for_each_record` when it is done or by
/// being dropped. Closing drops the underlying `io::Read` exactly once; a
/// closed reader behaves as if it had no records left.
///
/// # Errors
///
/// An I/O error ends the record sequence. A record whose field count
/// differs from the first data record, or that is not valid UTF-8, is
/// reported as an error and skipped; the next pull reads the record after
/// it. Malformed quoting is never an error.
#[derive(Debug)]
pub struct Reader<R> {
    /// The underlying tokenizer.
    core: Box<Tokenizer>,
    /// The underlying buffered reader.
    src: BufSource<R>,
    /// Scratch space that records are parsed into.
    raw: RawRecord,
    /// Various book-keeping state.
    state: ReaderState,
}

#[derive(Debug)]
struct ReaderState {
    has_headers: bool,
    flexible: bool,
    comment_mode: CommentMode,
    /// Whether the header record has been looked for.
    header_read: bool,
    /// The header record, if there is any data.
    header_record: Option<Record>,
    /// The header built from `header_record`, once it has been asked for
    /// and found free of duplicates.
    header: Option<Header>,
    /// The field count of the first data record.
    first_field_count: Option<u64>,
    /// Records read ahead of the consumer while looking for the header.
    pending: VecDeque<Parsed>,
    /// A record read ahead by `has_next`.
    peeked: Option<Record>,
    /// Set when the input is exhausted, on an I/O error and on close.
    eof: bool,
}

/// A record fresh from the source, before the field count check.
#[derive(Debug)]
struct Parsed {
    record: Record,
    blank: bool,
}

impl Reader<io::Cursor<Vec<u8>>> {
    /// Create a new CSV reader with a default configuration for an in-memory
    /// string.
    pub fn from_string<S: Into<String>>(
        data: S,
    ) -> Reader<io::Cursor<Vec<u8>>> {
        Reader::from_reader(io::Cursor::new(data.into().into_bytes()))
    }
}

impl<R: io::Read> Reader<R> {
    /// Create a new CSV reader with a default configuration for the given
    /// reader.
    ///
    /// To customize CSV parsing, use a `ReaderBuilder`.
    pub fn from_reader(rdr: R) -> Reader<R> {
        Reader::new(&ReaderBuilder::new(), rdr)
    }

    fn new(builder: &ReaderBuilder, rdr: R) -> Reader<R> {
        debug!(
            "opening CSV reader (has_headers: {}, buffer: {}): {:?}",
            builder.has_headers, builder.capacity, builder.dialect
        );
        Reader {
            core: Box::new(Tokenizer::new(builder.dialect)),
            src: BufSource::with_capacity(builder.capacity, rdr),
            raw: RawRecord::default(),
            state: ReaderState {
                has_headers: builder.has_headers,
                flexible: builder.dialect.flexible,
                comment_mode: builder.dialect.comment_mode,
                header_read: false,
                header_record: None,
                header: None,
                first_field_count: None,
                pending: VecDeque::new(),
                peeked: None,
                eof: false,
            },
        }
    }

    /// Returns a borrowed iterator over all records.
    ///
    /// Each item yielded by this iterator is a `Result<Record, Error>`.
    /// The iterator stops for good at the end of the data and after an I/O
    /// error.
    ///
    /// If `has_headers` was enabled via a `ReaderBuilder`, then the header
    /// record is not yielded.
    pub fn records(&mut self) -> Records<R> {
        Records { rdr: self }
    }

    /// Returns an owned iterator over all records.
    ///
    /// This is mostly useful when you want to return a CSV iterator or store
    /// it somewhere.
    pub fn into_records(self) -> IntoRecords<R> {
        IntoRecords { rdr: self }
    }

    /// Call `f` with every remaining record, then close this reader.
    ///
    /// The reader is closed on every path, including when an error stops the
    /// iteration early.
    ///
    /// # Example
    ///
    /// ```
    /// use fastcsv::Reader;
    ///
    /// # fn main() -> fastcsv::Result<()> {
    /// let mut lines = vec![];
    /// Reader::from_string("a,b\nc,d\n")
    ///     .for_each_record(|rec| lines.push(rec.line()))?;
    /// assert_eq!(lines, vec![1, 2]);
    /// # Ok(())
    /// # }
    /// ```
    pub fn for_each_record<F>(mut self, mut f: F) -> Result<()>
    where
        F: FnMut(Record),
    {
        let res = loop {
            match self.next_inner() {
                Ok(Some(record)) => f(record),
                Ok(None) => break Ok(()),
                Err(err) => break Err(err),
            }
        };
        self.close();
        res
    }

    /// Returns true if there is at least one more record.
    ///
    /// This reads ahead one record. Errors found while doing so (including
    /// a record with the wrong number of fields) are returned here, and the
    /// offending record is skipped.
    pub fn has_next(&mut self) -> Result<bool> {
        if self.state.peeked.is_some() {
            return Ok(true);
        }
        match self.read_next()? {
            None => Ok(false),
            Some(record) => {
                self.state.peeked = Some(record);
                Ok(true)
            }
        }
    }

    /// Return the next record.
    ///
    /// If there are no records left, this fails with `Error::Exhausted`.
    pub fn next_record(&mut self) -> Result<Record> {
        match self.next_inner()? {
            Some(record) => Ok(record),
            None => Err(Error::Exhausted),
        }
    }

    /// Returns a reference to the header.
    ///
    /// The header is built from the first record that is not a comment and
    /// is cached after the first call. If there is no such record, the
    /// header is empty.
    ///
    /// If `has_headers` is enabled, that record is not part of the record
    /// sequence. Otherwise it is, and it is also subject to the field count
    /// check like every other data record.
    ///
    /// If the header record names the same column twice, this returns
    /// `Error::DuplicateHeader` on every call. Reading records is not
    /// affected.
    ///
    /// # Example
    ///
    /// ```
    /// use fastcsv::ReaderBuilder;
    ///
    /// # fn main() -> fastcsv::Result<()> {
    /// let mut rdr = ReaderBuilder::new()
    ///     .has_headers(true)
    ///     .from_string("city,country\nBoston,United States\n")?;
    /// assert_eq!(rdr.headers()?, &vec!["city", "country"]);
    ///
    /// let header = rdr.headers()?.clone();
    /// let record = rdr.next_record()?;
    /// assert_eq!(record.named(&header).get("city"), Some("Boston"));
    /// # Ok(())
    /// # }
    /// ```
    pub fn headers(&mut self) -> Result<&Header> {
        self.ensure_header_read()?;
        let header = match self.state.header.take() {
            Some(header) => header,
            None => match self.state.header_record {
                None => Header::default(),
                Some(ref record) => Header::from_record(record)?,
            },
        };
        Ok(self.state.header.get_or_insert(header))
    }

    /// Release the underlying reader.
    ///
    /// After this, the reader has no records left. Closing more than once
    /// has no further effect.
    pub fn close(&mut self) {
        self.state.eof = true;
        self.state.pending.clear();
        self.state.peeked = None;
        if self.src.release() {
            debug!("closed CSV reader at line {}", self.core.line());
        }
    }

    /// Returns true once this reader has been closed.
    pub fn is_closed(&self) -> bool {
        self.src.is_released()
    }

    /// The current line number of the parser.
    ///
    /// This is the line the parser has reached in the data, which may be
    /// past the start of the most recently returned record.
    pub fn line(&self) -> u64 {
        self.core.line()
    }

    /// Returns a reference to the underlying reader, unless the reader has
    /// been closed.
    pub fn get_ref(&self) -> Option<&R> {
        self.src.get_ref()
    }

    /// The parsing options of this reader.
    pub fn dialect(&self) -> &Dialect {
        self.core.dialect()
    }

    fn next_inner(&mut self) -> Result<Option<Record>> {
        match self.state.peeked.take() {
            Some(record) => Ok(Some(record)),
            None => self.read_next(),
        }
    }

    /// Advance to the next record that is handed to the consumer.
    fn read_next(&mut self) -> Result<Option<Record>> {
        self.ensure_header_read()?;
        let parsed = match self.state.pending.pop_front() {
            Some(parsed) => parsed,
            None => match self.read_from_source()? {
                None => return Ok(None),
                Some(parsed) => parsed,
            },
        };
        self.check_field_count(&parsed)?;
        Ok(Some(parsed.record))
    }

    fn check_field_count(&mut self, parsed: &Parsed) -> Result<()> {
        let record = &parsed.record;
        if self.state.flexible || record.is_comment() || parsed.blank {
            return Ok(());
        }
        let len = record.len() as u64;
        match self.state.first_field_count {
            None => {
                self.state.first_field_count = Some(len);
                Ok(())
            }
            Some(expected_len) if expected_len != len => {
                Err(Error::UnequalLengths {
                    line: record.line(),
                    expected_len,
                    len,
                })
            }
            Some(_) => Ok(()),
        }
    }

    /// Find the header record, keeping any comments in front of it.
    fn ensure_header_read(&mut self) -> Result<()> {
        while !self.state.header_read {
            let parsed = match self.read_from_source() {
                Ok(Some(parsed)) => parsed,
                Ok(None) => {
                    self.state.header_read = true;
                    return Ok(());
                }
                Err(err) => {
                    if !err.is_io_error() {
                        // The bad record was consumed; there is no header.
                        self.state.header_read = true;
                    }
                    return Err(err);
                }
            };
            if parsed.record.is_comment() {
                self.state.pending.push_back(parsed);
                continue;
            }
            self.state.header_read = true;
            if self.state.has_headers {
                trace!("header record on line {}", parsed.record.line());
                self.state.header_record = Some(parsed.record);
            } else {
                self.state.header_record = Some(parsed.record.clone());
                self.state.pending.push_back(parsed);
            }
        }
        Ok(())
    }

    /// Parse records from the source until one is found that is not a
    /// skipped comment.
    fn read_from_source(&mut self) -> Result<Option<Parsed>> {
        loop {
            if self.state.eof {
                return Ok(None);
            }
            match self.read_raw() {
                Err(err) => {
                    self.state.eof = true;
                    if self.src.release() {
                        debug!(
                            "released CSV source after I/O error at line {}",
                            self.core.line()
                        );
                    }
                    return Err(Error::Io(err));
                }
                Ok(false) => {
                    self.state.eof = true;
                    return Ok(None);
                }
                Ok(true) => {}
            }
            let line = self.core.record_line();
            let comment = self.core.is_comment();
            if comment && self.state.comment_mode == CommentMode::Skip {
                trace!("skipping comment on line {}", line);
                continue;
            }
            let record = self
                .raw
                .to_record(line, comment)
                .map_err(|err| Error::Utf8 { line, err })?;
            return Ok(Some(Parsed { record, blank: self.core.is_blank() }));
        }
    }

    /// Parse the next record into `self.raw`. Returns false at the end of
    /// the data.
    fn read_raw(&mut self) -> io::Result<bool> {
        self.raw.clear();
        loop {
            let (res, nin, nout, nend) = {
                let input = self.src.fill_buf()?;
                let (output, ends) = self.raw.spare();
                self.core.read_record(input, output, ends)
            };
            self.src.consume(nin);
            self.raw.advance(nout, nend);
            match res {
                ReadRecordResult::InputEmpty => continue,
                ReadRecordResult::OutputFull => self.raw.expand_fields(),
                ReadRecordResult::OutputEndsFull => self.raw.expand_ends(),
                ReadRecordResult::Record => return Ok(true),
                ReadRecordResult::End => return Ok(false),
            }
        }
    }
}

/// A borrowed iterator over records.
///
/// The lifetime parameter `'r` refers to the lifetime of the underlying CSV
/// `Reader`.
#[derive(Debug)]
pub struct Records<'r, R: 'r> {
    rdr: &'r mut Reader<R>,
}

impl<'r, R: io::Read> Records<'r, R> {
    /// Returns true if there is at least one more record.
    pub fn has_next(&mut self) -> Result<bool> {
        self.rdr.has_next()
    }

    /// Return the next record, failing with `Error::Exhausted` if there is
    /// none.
    pub fn next_record(&mut self) -> Result<Record> {
        self.rdr.next_record()
    }

    /// Return a reference to the underlying CSV reader.
    pub fn reader(&self) -> &Reader<R> {
        &self.rdr
    }

    /// Return a mutable reference to the underlying CSV reader.
    pub fn reader_mut(&mut self) -> &mut Reader<R> {
        &mut self.rdr
    }
}

impl<'r, R: io::Read> Iterator for Records<'r, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Result<Record>> {
        self.rdr.next_inner().transpose()
    }
}

impl<'r, R: io::Read> FusedIterator for Records<'r, R> {}

/// An owned iterator over records.
#[derive(Debug)]
pub struct IntoRecords<R> {
    rdr: Reader<R>,
}

impl<R: io::Read> IntoRecords<R> {
    /// Returns true if there is at least one more record.
    pub fn has_next(&mut self) -> Result<bool> {
        self.rdr.has_next()
    }

    /// Return the next record, failing with `Error::Exhausted` if there is
    /// none.
    pub fn next_record(&mut self) -> Result<Record> {
        self.rdr.next_record()
    }

    /// Release the underlying reader. See `Reader::close`.
    pub fn close(&mut self) {
        self.rdr.close()
    }

    /// Return a reference to the underlying CSV reader.
    pub fn reader(&self) -> &Reader<R> {
        &self.rdr
    }

    /// Drop this iterator and return the underlying CSV reader.
    pub fn into_reader(self) -> Reader<R> {
        self.rdr
    }
}

impl<R: io::Read> Iterator for IntoRecords<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Result<Record>> {
        self.rdr.next_inner().transpose()
    }
}

impl<R: io::Read> FusedIterator for IntoRecords<R> {}
