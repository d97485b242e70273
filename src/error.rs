use std::error;
use std::fmt;
use std::io;
use std::result;

use fastcsv_core::DialectError;

/// A type alias for `Result<T, fastcsv::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when processing CSV data.
///
/// This error can happen when writing or reading CSV data.
///
/// Note that malformed quoting is never an error. The reader recovers from
/// it by treating the rest of the field as unquoted text. Consequently, a
/// `flexible` reader on an in-memory string can only fail on a duplicate
/// header name or when pulled past its end.
#[derive(Debug)]
pub enum Error {
    /// An I/O error that occurred while reading or writing CSV data.
    ///
    /// An I/O error on the read side ends the record sequence.
    Io(io::Error),
    /// A UTF-8 decoding error that occured while reading CSV data into Rust
    /// `String`s.
    Utf8 {
        /// The line on which the offending record began.
        line: u64,
        /// The corresponding UTF-8 error.
        err: Utf8Error,
    },
    /// This error occurs when two records with an unequal number of fields
    /// are found. This error only occurs when the `flexible` option in a
    /// CSV reader is disabled.
    UnequalLengths {
        /// The line on which the offending record began.
        line: u64,
        /// The expected number of fields in a record. This is the number of
        /// fields in the first data record.
        expected_len: u64,
        /// The number of fields in the bad record.
        len: u64,
    },
    /// A header record contains the same name twice.
    DuplicateHeader {
        /// The repeated name.
        name: String,
        /// The index of its first occurrence.
        first: usize,
        /// The index of its second occurrence.
        second: usize,
    },
    /// A record was requested from a sequence that has no records left.
    Exhausted,
    /// The reader or writer was configured with special bytes that cannot
    /// be told apart.
    Dialect(DialectError),
    /// A comment was written with a writer whose comment mode is
    /// `CommentMode::None`.
    CommentsDisabled,
    /// A value could not be flattened into a single CSV record.
    Serialize(String),
}

impl Error {
    /// Returns true if this is an I/O error.
    ///
    /// If this is true, the underlying `io::Error` is available through
    /// `Error::Io`.
    pub fn is_io_error(&self) -> bool {
        match *self {
            Error::Io(_) => true,
            _ => false,
        }
    }

    /// The line on which the record that caused this error began, if this
    /// error is tied to a record.
    pub fn line(&self) -> Option<u64> {
        match *self {
            Error::Utf8 { line, .. } => Some(line),
            Error::UnequalLengths { line, .. } => Some(line),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<DialectError> for Error {
    fn from(err: DialectError) -> Error {
        Error::Dialect(err)
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            Error::Utf8 { ref err, .. } => Some(err),
            Error::Dialect(ref err) => Some(err),
            Error::UnequalLengths { .. }
            | Error::DuplicateHeader { .. }
            | Error::Exhausted
            | Error::CommentsDisabled
            | Error::Serialize(_) => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref err) => err.fmt(f),
            Error::Utf8 { line, ref err } => write!(
                f,
                "CSV parse error: record on line {} (field {}): {}",
                line,
                err.field(),
                err
            ),
            Error::UnequalLengths { line, expected_len, len } => write!(
                f,
                "CSV error: record on line {}: found record with {} fields, \
                 but the first record has {} fields",
                line, len, expected_len
            ),
            Error::DuplicateHeader { ref name, .. } => {
                write!(f, "Duplicate header field '{}' found", name)
            }
            Error::Exhausted => {
                write!(f, "CSV error: no more records available")
            }
            Error::Dialect(ref err) => write!(f, "CSV dialect error: {}", err),
            Error::CommentsDisabled => write!(
                f,
                "CSV error: comments cannot be written when the comment \
                 mode is None"
            ),
            Error::Serialize(ref msg) => {
                write!(f, "CSV serialize error: {}", msg)
            }
        }
    }
}

#[cfg(feature = "serde")]
impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Error {
        Error::Serialize(msg.to_string())
    }
}

/// A UTF-8 validation error that occurred when reading a record.
///
/// The error includes the index of the field that failed validation, and the
/// last byte at which valid UTF-8 was verified.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Utf8Error {
    /// The field index of a record in which UTF-8 validation failed.
    field: usize,
    /// The index into the given field up to which valid UTF-8 was verified.
    valid_up_to: usize,
}

/// Create a new UTF-8 error.
pub(crate) fn new_utf8_error(field: usize, valid_up_to: usize) -> Utf8Error {
    Utf8Error { field, valid_up_to }
}

impl Utf8Error {
    /// The field index of a record in which UTF-8 validation failed.
    pub fn field(&self) -> usize {
        self.field
    }
    /// The index into the given field up to which valid UTF-8 was verified.
    pub fn valid_up_to(&self) -> usize {
        self.valid_up_to
    }
}

impl error::Error for Utf8Error {}

impl fmt::Display for Utf8Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "invalid utf-8: invalid UTF-8 in field {} near byte index {}",
            self.field, self.valid_up_to
        )
    }
}

/// `IntoInnerError` occurs when consuming a `Writer` fails.
///
/// Consuming the `Writer` causes a flush to happen. If the flush fails, then
/// this error is returned, which contains both the original `Writer` and
/// the error that occurred.
///
/// The type parameter `W` is the unconsumed writer.
pub struct IntoInnerError<W> {
    wtr: W,
    err: io::Error,
}

impl<W> IntoInnerError<W> {
    /// Creates a new `IntoInnerError`.
    pub(crate) fn new(wtr: W, err: io::Error) -> IntoInnerError<W> {
        IntoInnerError { wtr, err }
    }

    /// Returns the error which caused the call to `into_inner` to fail.
    ///
    /// This error was returned when attempting to flush the internal buffer.
    pub fn error(&self) -> &io::Error {
        &self.err
    }

    /// Returns the underlying writer which generated the error.
    ///
    /// The returned value can be used for error recovery, such as
    /// re-inspecting the buffer.
    pub fn into_inner(self) -> W {
        self.wtr
    }
}

impl<W> error::Error for IntoInnerError<W> {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.err)
    }
}

impl<W> fmt::Display for IntoInnerError<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.err.fmt(f)
    }
}

impl<W> fmt::Debug for IntoInnerError<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.err.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;
    use std::io;

    use fastcsv_core::DialectError;

    use super::{new_utf8_error, Error};

    #[test]
    fn duplicate_header_message() {
        let err = Error::DuplicateHeader {
            name: "a".to_string(),
            first: 0,
            second: 2,
        };
        assert_eq!(err.to_string(), "Duplicate header field 'a' found");
        assert!(err.source().is_none());
    }

    #[test]
    fn unequal_lengths_message() {
        let err = Error::UnequalLengths { line: 3, expected_len: 2, len: 1 };
        assert_eq!(
            err.to_string(),
            "CSV error: record on line 3: found record with 1 fields, \
             but the first record has 2 fields"
        );
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn sources() {
        let err = Error::from(io::Error::new(io::ErrorKind::Other, "boom"));
        assert!(err.is_io_error());
        assert!(err.source().is_some());

        let err = Error::Utf8 { line: 1, err: new_utf8_error(0, 0) };
        assert!(err.source().is_some());
        assert_eq!(err.line(), Some(1));

        let err = Error::from(DialectError::NonAscii {
            name: "quote",
            byte: 0xFF,
        });
        assert!(!err.is_io_error());
        assert!(err.source().is_some());
    }
}
