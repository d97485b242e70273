use core::cmp;

use memchr::{memchr2, memchr3};

use crate::dialect::Dialect;

/// The result of parsing at most one record from CSV data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReadRecordResult {
    /// The caller provided input was exhausted before the end of a record was
    /// found.
    InputEmpty,
    /// The caller provided output buffer was filled before an entire field
    /// could be written to it.
    OutputFull,
    /// The caller provided output buffer of field end positions was filled
    /// before the next field could be parsed.
    OutputEndsFull,
    /// The end of a record was found.
    Record,
    /// All CSV data has been read.
    ///
    /// This state can only be returned when an empty input buffer is provided
    /// by the caller.
    End,
}

impl ReadRecordResult {
    /// Returns true if this result marks the end of a record.
    pub fn is_record(&self) -> bool {
        *self == ReadRecordResult::Record
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    StartRecord,
    StartField,
    InField,
    InQuotedField,
    InQuoteInQuotedField,
    InComment,
    End,
}

/// A pull based CSV tokenizer.
///
/// The tokenizer is a hand written state machine. Callers feed it slices of
/// input and receive unescaped field data in an output buffer, along with the
/// end offset of every field in a second buffer. It never allocates and never
/// fails: malformed quoting is recovered from by treating the remainder of the
/// field as unquoted text, so `"a"b` is read as `ab`.
///
/// `\r`, `\n` and `\r\n` are each a single record terminator, including when
/// the two bytes of `\r\n` arrive in different calls. Line numbers start at
/// `1` and advance on every terminator, including terminators inside quoted
/// fields.
#[derive(Clone, Debug)]
pub struct Tokenizer {
    dialect: Dialect,
    state: State,
    /// The current line number.
    line: u64,
    /// The line on which the current (or most recent) record began.
    record_line: u64,
    /// Whether the last byte consumed was `\r`.
    last_cr: bool,
    /// Whether the current record is a comment.
    comment: bool,
    /// Whether the most recent record was a blank line.
    blank: bool,
    /// The number of field bytes written for the current record by previous
    /// calls.
    output_pos: usize,
}

impl Default for Tokenizer {
    fn default() -> Tokenizer {
        Tokenizer::new(Dialect::default())
    }
}

impl Tokenizer {
    /// Create a new tokenizer for the given dialect.
    ///
    /// The dialect is not validated here. Tokenizing with a dialect that
    /// fails `Dialect::validate` produces an unspecified (but memory safe)
    /// parse.
    pub fn new(dialect: Dialect) -> Tokenizer {
        Tokenizer {
            dialect,
            state: State::StartRecord,
            line: 1,
            record_line: 1,
            last_cr: false,
            comment: false,
            blank: false,
            output_pos: 0,
        }
    }

    /// The dialect this tokenizer was built with.
    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Reset the tokenizer such that it behaves as if it had never been used.
    pub fn reset(&mut self) {
        *self = Tokenizer::new(self.dialect);
    }

    /// Return the current line number.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Return the line on which the most recently completed record began.
    ///
    /// For a quoted field spanning several lines, this is the line of the
    /// opening of the record, not the line where it closed.
    pub fn record_line(&self) -> u64 {
        self.record_line
    }

    /// Returns true if the most recently completed record was a comment.
    ///
    /// A comment record has a single field holding the rest of the line after
    /// the comment byte.
    pub fn is_comment(&self) -> bool {
        self.comment
    }

    /// Returns true if the most recently completed record was a blank line.
    ///
    /// Blank lines are only reported as records when `skip_empty_rows` is
    /// disabled. They consist of a single empty field.
    pub fn is_blank(&self) -> bool {
        self.blank
    }

    /// Parse a single CSV record in `input` and copy field data to `output`.
    ///
    /// The end offset of each field, relative to the start of the record
    /// across all calls, is written to `ends`. Field data has its quotes
    /// removed and its doubled quotes unescaped.
    ///
    /// The return value reports what happened along with the number of bytes
    /// read from `input`, the number of bytes written to `output` and the
    /// number of ends written to `ends`. On `OutputFull` or `OutputEndsFull`
    /// the caller should provide more room and call again with the unread
    /// remainder of `input`.
    ///
    /// # Termination
    ///
    /// An empty `input` signals that there is no CSV data left. The caller
    /// should keep calling with an empty input until `ReadRecordResult::End`
    /// is returned. A record that is still open at that point (including an
    /// unterminated quoted field) is completed first.
    pub fn read_record(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        ends: &mut [usize],
    ) -> (ReadRecordResult, usize, usize, usize) {
        if self.state == State::End {
            return (ReadRecordResult::End, 0, 0, 0);
        }
        if input.is_empty() {
            return self.read_record_final(ends);
        }
        let (mut nin, mut nout, mut nend) = (0, 0, 0);
        let mut res = ReadRecordResult::InputEmpty;
        let (delim, quote) = (self.dialect.delimiter, self.dialect.quote);
        while nin < input.len() {
            let b = input[nin];
            match self.state {
                State::StartRecord => {
                    if b == b'\n' && self.last_cr {
                        // The second half of a `\r\n` terminator.
                        self.consume_term(b);
                        nin += 1;
                    } else if b == b'\r' || b == b'\n' {
                        if self.dialect.skip_empty_rows {
                            self.consume_term(b);
                            nin += 1;
                            continue;
                        }
                        if nend >= ends.len() {
                            res = ReadRecordResult::OutputEndsFull;
                            break;
                        }
                        self.begin_record();
                        self.blank = true;
                        self.consume_term(b);
                        nin += 1;
                        ends[nend] = self.output_pos + nout;
                        nend += 1;
                        res = ReadRecordResult::Record;
                        break;
                    } else {
                        self.begin_record();
                        if self.dialect.comment_mode.is_enabled()
                            && b == self.dialect.comment
                        {
                            self.comment = true;
                            self.last_cr = false;
                            nin += 1;
                            self.state = State::InComment;
                        } else {
                            self.state = State::StartField;
                        }
                    }
                }
                State::StartField => {
                    if b == quote {
                        self.last_cr = false;
                        nin += 1;
                        self.state = State::InQuotedField;
                    } else {
                        self.state = State::InField;
                    }
                }
                State::InField => {
                    let rest = &input[nin..];
                    let run = memchr3(delim, b'\r', b'\n', rest)
                        .unwrap_or(rest.len());
                    if run > 0 {
                        let n = cmp::min(run, output.len() - nout);
                        if n == 0 {
                            res = ReadRecordResult::OutputFull;
                            break;
                        }
                        output[nout..nout + n].copy_from_slice(&rest[..n]);
                        self.last_cr = false;
                        nin += n;
                        nout += n;
                        continue;
                    }
                    if nend >= ends.len() {
                        res = ReadRecordResult::OutputEndsFull;
                        break;
                    }
                    ends[nend] = self.output_pos + nout;
                    nend += 1;
                    nin += 1;
                    if b == delim {
                        self.last_cr = false;
                        self.state = State::StartField;
                    } else {
                        self.consume_term(b);
                        self.state = State::StartRecord;
                        res = ReadRecordResult::Record;
                        break;
                    }
                }
                State::InQuotedField => {
                    let rest = &input[nin..];
                    let run = memchr3(quote, b'\r', b'\n', rest)
                        .unwrap_or(rest.len());
                    if run > 0 {
                        let n = cmp::min(run, output.len() - nout);
                        if n == 0 {
                            res = ReadRecordResult::OutputFull;
                            break;
                        }
                        output[nout..nout + n].copy_from_slice(&rest[..n]);
                        self.last_cr = false;
                        nin += n;
                        nout += n;
                    } else if b == quote {
                        self.last_cr = false;
                        nin += 1;
                        self.state = State::InQuoteInQuotedField;
                    } else {
                        // Terminators inside quotes are field content.
                        if nout >= output.len() {
                            res = ReadRecordResult::OutputFull;
                            break;
                        }
                        output[nout] = b;
                        nout += 1;
                        nin += 1;
                        self.consume_term(b);
                    }
                }
                State::InQuoteInQuotedField => {
                    if b == quote {
                        if nout >= output.len() {
                            res = ReadRecordResult::OutputFull;
                            break;
                        }
                        output[nout] = b;
                        nout += 1;
                        nin += 1;
                        self.state = State::InQuotedField;
                    } else {
                        // A closing quote. A delimiter or terminator ends the
                        // field as usual; anything else is kept as unquoted
                        // text.
                        self.state = State::InField;
                    }
                }
                State::InComment => {
                    let rest = &input[nin..];
                    let run =
                        memchr2(b'\r', b'\n', rest).unwrap_or(rest.len());
                    if run > 0 {
                        let n = cmp::min(run, output.len() - nout);
                        if n == 0 {
                            res = ReadRecordResult::OutputFull;
                            break;
                        }
                        output[nout..nout + n].copy_from_slice(&rest[..n]);
                        self.last_cr = false;
                        nin += n;
                        nout += n;
                        continue;
                    }
                    if nend >= ends.len() {
                        res = ReadRecordResult::OutputEndsFull;
                        break;
                    }
                    ends[nend] = self.output_pos + nout;
                    nend += 1;
                    nin += 1;
                    self.consume_term(b);
                    self.state = State::StartRecord;
                    res = ReadRecordResult::Record;
                    break;
                }
                State::End => unreachable!(),
            }
        }
        if res.is_record() {
            self.output_pos = 0;
        } else {
            self.output_pos += nout;
        }
        (res, nin, nout, nend)
    }

    /// Handle the end of input: close any open record, then report `End`.
    fn read_record_final(
        &mut self,
        ends: &mut [usize],
    ) -> (ReadRecordResult, usize, usize, usize) {
        match self.state {
            State::StartRecord | State::End => {
                self.state = State::End;
                (ReadRecordResult::End, 0, 0, 0)
            }
            State::StartField
            | State::InField
            | State::InQuotedField
            | State::InQuoteInQuotedField
            | State::InComment => {
                if ends.is_empty() {
                    return (ReadRecordResult::OutputEndsFull, 0, 0, 0);
                }
                ends[0] = self.output_pos;
                self.output_pos = 0;
                self.state = State::StartRecord;
                (ReadRecordResult::Record, 0, 0, 1)
            }
        }
    }

    #[inline]
    fn begin_record(&mut self) {
        self.record_line = self.line;
        self.comment = false;
        self.blank = false;
    }

    /// Account for a consumed `\r` or `\n`. A `\n` directly after `\r` does
    /// not start a new line.
    #[inline]
    fn consume_term(&mut self, b: u8) {
        if b == b'\r' {
            self.line += 1;
            self.last_cr = true;
        } else {
            if !self.last_cr {
                self.line += 1;
            }
            self.last_cr = false;
        }
    }
}
