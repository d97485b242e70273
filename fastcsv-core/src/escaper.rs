use memchr::memchr;

use crate::dialect::{Dialect, QuoteStyle, Terminator};

/// Decides how fields are quoted and escaped when writing CSV data.
///
/// An `Escaper` holds no output buffer. Callers ask whether a field needs
/// quotes with [`Escaper::should_quote`] and, if it does, write the quote
/// byte, each piece yielded by [`Escaper::escape`] and the quote byte again.
///
/// ```
/// use fastcsv_core::Escaper;
///
/// let esc = Escaper::default();
/// assert!(esc.should_quote(b"a,b", false));
/// assert!(!esc.should_quote(b"ab", false));
///
/// let escaped: Vec<u8> =
///     esc.escape(b"say \"hi\"").flatten().copied().collect();
/// assert_eq!(escaped, b"say \"\"hi\"\"");
/// ```
#[derive(Clone)]
pub struct Escaper {
    dialect: Dialect,
    style: QuoteStyle,
    requires_quotes: [bool; 256],
    term: [u8; 2],
    term_len: usize,
}

impl core::fmt::Debug for Escaper {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("Escaper")
            .field("dialect", &self.dialect)
            .field("style", &self.style)
            .field("terminator", &self.terminator())
            .finish()
    }
}

impl Default for Escaper {
    fn default() -> Escaper {
        Escaper::new(
            Dialect::default(),
            QuoteStyle::default(),
            Terminator::default(),
        )
    }
}

impl Escaper {
    /// Create a new escaper.
    ///
    /// The dialect's delimiter and quote bytes, along with `\r`, `\n` and
    /// the terminator byte, force a field to be quoted under
    /// `QuoteStyle::Necessary`.
    pub fn new(
        dialect: Dialect,
        style: QuoteStyle,
        terminator: Terminator,
    ) -> Escaper {
        let mut requires_quotes = [false; 256];
        requires_quotes[dialect.delimiter as usize] = true;
        requires_quotes[dialect.quote as usize] = true;
        requires_quotes[b'\r' as usize] = true;
        requires_quotes[b'\n' as usize] = true;
        let (term, term_len) = match terminator {
            Terminator::CRLF => ([b'\r', b'\n'], 2),
            Terminator::Any(b) => {
                requires_quotes[b as usize] = true;
                ([b, 0], 1)
            }
        };
        Escaper { dialect, style, requires_quotes, term, term_len }
    }

    /// The dialect this escaper was built with.
    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// The quote byte.
    pub fn quote(&self) -> u8 {
        self.dialect.quote
    }

    /// The quoting style.
    pub fn style(&self) -> QuoteStyle {
        self.style
    }

    /// The bytes written at the end of every record.
    pub fn terminator(&self) -> &[u8] {
        &self.term[..self.term_len]
    }

    /// Returns true if `field` must be enclosed in quotes.
    ///
    /// `first` indicates that `field` is the first field of a record, in
    /// which case a leading comment byte also requires quoting when comments
    /// are enabled. An empty field never needs quotes here; the record
    /// writer quotes a record made of one empty field on its own.
    pub fn should_quote(&self, field: &[u8], first: bool) -> bool {
        if self.style == QuoteStyle::Always {
            return true;
        }
        if first
            && self.dialect.comment_mode.is_enabled()
            && field.first() == Some(&self.dialect.comment)
        {
            return true;
        }
        field.iter().any(|&b| self.requires_quotes[b as usize])
    }

    /// Return the escaped content of `field`, without the enclosing quotes.
    ///
    /// Every quote byte is doubled. The pieces yielded are subslices of
    /// `field`; concatenated, they form the escaped field.
    pub fn escape<'a>(&self, field: &'a [u8]) -> Escape<'a> {
        Escape {
            quote: self.dialect.quote,
            field,
            pos: 0,
            pending_quote: None,
        }
    }
}

/// An iterator over the pieces of an escaped field.
///
/// This is created by [`Escaper::escape`].
#[derive(Clone, Debug)]
pub struct Escape<'a> {
    quote: u8,
    field: &'a [u8],
    pos: usize,
    /// The offset of a quote that was just yielded and must be repeated.
    pending_quote: Option<usize>,
}

impl<'a> Iterator for Escape<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if let Some(i) = self.pending_quote.take() {
            return Some(&self.field[i..i + 1]);
        }
        let rest = &self.field[self.pos..];
        if rest.is_empty() {
            return None;
        }
        match memchr(self.quote, rest) {
            None => {
                self.pos = self.field.len();
                Some(rest)
            }
            Some(i) => {
                self.pending_quote = Some(self.pos + i);
                self.pos += i + 1;
                Some(&rest[..i + 1])
            }
        }
    }
}
