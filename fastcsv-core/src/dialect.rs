use core::fmt;

/// How records starting with the comment byte are treated.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CommentMode {
    /// The comment byte has no special meaning. This is the default.
    None,
    /// Comment lines are recognized and handed to the consumer as records
    /// flagged as comments.
    Read,
    /// Comment lines are recognized and dropped.
    Skip,
}

impl CommentMode {
    /// Returns true if comment lines are recognized at all.
    pub fn is_enabled(&self) -> bool {
        match *self {
            CommentMode::None => false,
            CommentMode::Read | CommentMode::Skip => true,
        }
    }
}

impl Default for CommentMode {
    fn default() -> CommentMode {
        CommentMode::None
    }
}

/// A record terminator used when writing CSV data.
///
/// When reading, `\r`, `\n` and `\r\n` are always treated as a single record
/// terminator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Terminator {
    /// Writes `\r\n`. This is the default.
    CRLF,
    /// Writes the byte given.
    Any(u8),
}

impl Default for Terminator {
    fn default() -> Terminator {
        Terminator::CRLF
    }
}

/// The quoting style to use when writing CSV data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QuoteStyle {
    /// This puts quotes around every field. Always.
    Always,
    /// This puts quotes around fields only when necessary.
    ///
    /// They are necessary when fields contain a quote, delimiter or record
    /// terminator, when the first field of a record would otherwise be read
    /// back as a comment, and when a record consists of one empty field.
    ///
    /// This is the default.
    Necessary,
}

impl Default for QuoteStyle {
    fn default() -> QuoteStyle {
        QuoteStyle::Necessary
    }
}

/// The set of bytes and policies that define how CSV text is tokenized.
///
/// A `Dialect` is a plain value. Readers and writers copy it when they are
/// built, so changing it afterwards has no effect on them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Dialect {
    /// The field delimiter. The default is `b','`.
    pub delimiter: u8,
    /// The quote byte. The default is `b'"'`.
    pub quote: u8,
    /// The comment byte. The default is `b'#'`.
    ///
    /// It only has meaning when `comment_mode` is not `CommentMode::None`.
    pub comment: u8,
    /// How comment lines are handled. The default is `CommentMode::None`.
    pub comment_mode: CommentMode,
    /// Whether blank lines are dropped. The default is `true`.
    pub skip_empty_rows: bool,
    /// Whether records may have differing numbers of fields. The default
    /// is `false`, which makes readers report an error on the first record
    /// whose length differs from the first data record.
    pub flexible: bool,
}

impl Default for Dialect {
    fn default() -> Dialect {
        Dialect {
            delimiter: b',',
            quote: b'"',
            comment: b'#',
            comment_mode: CommentMode::None,
            skip_empty_rows: true,
            flexible: false,
        }
    }
}

impl Dialect {
    /// Check that the special bytes of this dialect can be told apart.
    ///
    /// The delimiter, quote and comment bytes must be pairwise distinct,
    /// ASCII and neither `\r` nor `\n`.
    pub fn validate(&self) -> Result<(), DialectError> {
        let specials = [
            ("delimiter", self.delimiter),
            ("quote", self.quote),
            ("comment", self.comment),
        ];
        for (i, &(name, b)) in specials.iter().enumerate() {
            if b > 0x7F {
                return Err(DialectError::NonAscii { name, byte: b });
            }
            if b == b'\r' || b == b'\n' {
                return Err(DialectError::Terminator { name, byte: b });
            }
            for &(other, c) in &specials[i + 1..] {
                if b == c {
                    return Err(DialectError::Duplicate {
                        first: name,
                        second: other,
                        byte: b,
                    });
                }
            }
        }
        Ok(())
    }
}

/// An error describing why a `Dialect` cannot be used.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DialectError {
    /// Two special bytes are the same.
    Duplicate {
        /// The name of the first setting.
        first: &'static str,
        /// The name of the second setting.
        second: &'static str,
        /// The shared byte.
        byte: u8,
    },
    /// A special byte is a line terminator.
    Terminator {
        /// The name of the setting.
        name: &'static str,
        /// The offending byte.
        byte: u8,
    },
    /// A special byte is outside the ASCII range.
    NonAscii {
        /// The name of the setting.
        name: &'static str,
        /// The offending byte.
        byte: u8,
    },
}

impl fmt::Display for DialectError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DialectError::Duplicate { first, second, byte } => write!(
                f,
                "{} and {} must differ, but both are {:?}",
                first, second, byte as char
            ),
            DialectError::Terminator { name, byte } => write!(
                f,
                "{} must not be a line terminator, got {:?}",
                name, byte as char
            ),
            DialectError::NonAscii { name, byte } => {
                write!(f, "{} must be ASCII, got byte 0x{:02X}", name, byte)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DialectError {}

#[cfg(test)]
mod tests {
    use super::{CommentMode, Dialect, DialectError};

    #[test]
    fn default_is_valid() {
        assert_eq!(Ok(()), Dialect::default().validate());
    }

    #[test]
    fn duplicate_delimiter_quote() {
        let d = Dialect { quote: b',', ..Dialect::default() };
        assert_eq!(
            Err(DialectError::Duplicate {
                first: "delimiter",
                second: "quote",
                byte: b',',
            }),
            d.validate()
        );
    }

    #[test]
    fn duplicate_comment_checked_when_disabled() {
        let d = Dialect {
            comment: b'"',
            comment_mode: CommentMode::None,
            ..Dialect::default()
        };
        assert!(d.validate().is_err());
    }

    #[test]
    fn terminator_rejected() {
        let d = Dialect { delimiter: b'\n', ..Dialect::default() };
        assert_eq!(
            Err(DialectError::Terminator { name: "delimiter", byte: b'\n' }),
            d.validate()
        );
    }

    #[test]
    fn non_ascii_rejected() {
        let d = Dialect { comment: 0xA7, ..Dialect::default() };
        assert_eq!(
            Err(DialectError::NonAscii { name: "comment", byte: 0xA7 }),
            d.validate()
        );
    }
}
