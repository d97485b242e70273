use std::cmp;
use std::fmt;
use std::ops;
use std::result;
use std::str;

use bstr::BStr;

use crate::error::{new_utf8_error, Utf8Error};
use crate::header::{Header, NamedRecord};

/// A single CSV record.
///
/// All fields are stored contiguously in one `String`, along with the end
/// offset of each field. A record also remembers the line on which it began
/// and whether it is a comment.
///
/// Records are produced by a [`Reader`](crate::Reader) and cannot be
/// modified afterwards. A record read from CSV data always has at least one
/// field: a blank line kept by a reader with `skip_empty_rows(false)` is a
/// record with a single empty field, and a comment is a record whose only
/// field is the text after the comment byte.
#[derive(Clone, Eq, PartialEq)]
pub struct Record {
    fields: String,
    ends: Vec<usize>,
    line: u64,
    comment: bool,
}

impl Record {
    /// Return the field at index `i`.
    ///
    /// If no field at index `i` exists, then this returns `None`.
    pub fn get(&self, i: usize) -> Option<&str> {
        let end = *self.ends.get(i)?;
        let start = match i.checked_sub(1) {
            None => 0,
            Some(prev) => self.ends[prev],
        };
        Some(&self.fields[start..end])
    }

    /// Returns true if and only if this record has no fields.
    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    /// Returns the number of fields in this record.
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    /// Returns an iterator over all fields in this record.
    pub fn iter(&self) -> RecordIter {
        RecordIter { rec: self, start: 0, i: 0 }
    }

    /// The line number on which this record began.
    ///
    /// Lines are numbered from `1`. For a record containing a quoted field
    /// that spans several lines, this is the line of the record's first
    /// byte.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Returns true if this record is a comment.
    pub fn is_comment(&self) -> bool {
        self.comment
    }

    /// Return all fields of this record concatenated, with no separators.
    pub fn as_slice(&self) -> &str {
        &self.fields
    }

    /// Copy every field into a new vector.
    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(|f| f.to_string()).collect()
    }

    /// View this record through `header`, looking fields up by name.
    pub fn named<'a>(&'a self, header: &'a Header) -> NamedRecord<'a> {
        NamedRecord::new(self, header)
    }
}

impl ops::Index<usize> for Record {
    type Output = str;
    fn index(&self, i: usize) -> &str {
        match self.get(i) {
            Some(field) => field,
            None => panic!(
                "field index {} out of range for record with {} fields",
                i,
                self.len()
            ),
        }
    }
}

impl<'a> IntoIterator for &'a Record {
    type IntoIter = RecordIter<'a>;
    type Item = &'a str;

    fn into_iter(self) -> RecordIter<'a> {
        self.iter()
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Record")
            .field("line", &self.line)
            .field("comment", &self.comment)
            .field("fields", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

impl<T: AsRef<str>> PartialEq<[T]> for Record {
    fn eq(&self, other: &[T]) -> bool {
        self.len() == other.len()
            && self.iter().zip(other).all(|(a, b)| a == b.as_ref())
    }
}

impl<T: AsRef<str>> PartialEq<Vec<T>> for Record {
    fn eq(&self, other: &Vec<T>) -> bool {
        *self == other[..]
    }
}

/// An iterator over the fields in a record.
///
/// The `'r` lifetime refers to the lifetime of the `Record` that is being
/// iterated over.
#[derive(Clone)]
pub struct RecordIter<'r> {
    rec: &'r Record,
    start: usize,
    i: usize,
}

impl<'r> Iterator for RecordIter<'r> {
    type Item = &'r str;

    fn next(&mut self) -> Option<&'r str> {
        let end = *self.rec.ends.get(self.i)?;
        let field = &self.rec.fields[self.start..end];
        self.start = end;
        self.i += 1;
        Some(field)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.rec.len() - self.i;
        (n, Some(n))
    }
}

impl<'r> ExactSizeIterator for RecordIter<'r> {}

/// The scratch space the reader parses into.
///
/// Fields arrive as raw bytes from the tokenizer. They become a `Record`
/// once every field has been checked to be valid UTF-8.
#[derive(Clone, Default)]
pub(crate) struct RawRecord {
    /// All field bytes of the current record, stored contiguously.
    fields: Vec<u8>,
    /// The ending index of each field.
    ends: Vec<usize>,
    /// The number of fields in the current record.
    len: usize,
    /// The number of bytes written to `fields`, including any partially
    /// parsed field.
    used: usize,
}

impl RawRecord {
    /// Forget the current record, keeping the allocations.
    pub fn clear(&mut self) {
        self.len = 0;
        self.used = 0;
    }

    /// The number of field bytes in the current record.
    pub fn end(&self) -> usize {
        match self.len {
            0 => 0,
            n => self.ends[n - 1],
        }
    }

    /// Returns the unused parts of the field and end buffers, for the
    /// tokenizer to write into.
    pub fn spare(&mut self) -> (&mut [u8], &mut [usize]) {
        (&mut self.fields[self.used..], &mut self.ends[self.len..])
    }

    /// Record that the tokenizer wrote `nout` field bytes and `nend` ends.
    ///
    /// The tokenizer reports ends relative to the start of the record, which
    /// is also where this buffer starts.
    pub fn advance(&mut self, nout: usize, nend: usize) {
        self.used += nout;
        self.len += nend;
    }

    /// Double the room for field bytes.
    pub fn expand_fields(&mut self) {
        let new_len = cmp::max(64, self.fields.len() * 2);
        self.fields.resize(new_len, 0);
    }

    /// Double the room for field ends.
    pub fn expand_ends(&mut self) {
        let new_len = cmp::max(8, self.ends.len() * 2);
        self.ends.resize(new_len, 0);
    }

    fn iter(&self) -> impl Iterator<Item = &[u8]> {
        let ends = &self.ends[..self.len];
        let fields = &self.fields;
        ends.iter().scan(0, move |start, &end| {
            let field = &fields[*start..end];
            *start = end;
            Some(field)
        })
    }

    /// Validate the current record as UTF-8 and copy it into a `Record`.
    pub fn to_record(
        &self,
        line: u64,
        comment: bool,
    ) -> result::Result<Record, Utf8Error> {
        let mut fields = String::with_capacity(self.end());
        for (i, field) in self.iter().enumerate() {
            match str::from_utf8(field) {
                Ok(field) => fields.push_str(field),
                Err(err) => return Err(new_utf8_error(i, err.valid_up_to())),
            }
        }
        Ok(Record {
            fields,
            ends: self.ends[..self.len].to_vec(),
            line,
            comment,
        })
    }
}

impl fmt::Debug for RawRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let fields: Vec<&BStr> = self.iter().map(BStr::new).collect();
        f.debug_struct("RawRecord").field("fields", &fields).finish()
    }
}

#[cfg(test)]
pub(crate) fn raw_from(fields: &[&[u8]]) -> RawRecord {
    let mut raw = RawRecord::default();
    for field in fields {
        while raw.used + field.len() > raw.fields.len() {
            raw.expand_fields();
        }
        if raw.len >= raw.ends.len() {
            raw.expand_ends();
        }
        let end = raw.used + field.len();
        let (out, ends) = raw.spare();
        out[..field.len()].copy_from_slice(field);
        ends[0] = end;
        raw.advance(field.len(), 1);
    }
    raw
}

#[cfg(test)]
pub(crate) fn record_from_fields(
    fields: &[&str],
    line: u64,
    comment: bool,
) -> Record {
    let fields: Vec<&[u8]> = fields.iter().map(|f| f.as_bytes()).collect();
    raw_from(&fields).to_record(line, comment).unwrap()
}
