use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::record::Record;

/// The names of the columns of CSV data.
///
/// A header is built from the first data record of a reader (see
/// [`Reader::headers`](crate::Reader::headers)). Names are compared case
/// sensitively and must be unique.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct Header {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Header {
    /// Build a header from the fields of `record`.
    ///
    /// This fails with `Error::DuplicateHeader` on the first name that
    /// appears twice.
    pub fn from_record(record: &Record) -> Result<Header> {
        let mut header = Header {
            names: Vec::with_capacity(record.len()),
            index: HashMap::with_capacity(record.len()),
        };
        for (i, name) in record.iter().enumerate() {
            if let Some(&first) = header.index.get(name) {
                return Err(Error::DuplicateHeader {
                    name: name.to_string(),
                    first,
                    second: i,
                });
            }
            header.index.insert(name.to_string(), i);
            header.names.push(name.to_string());
        }
        Ok(header)
    }

    /// Returns the number of names in this header.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if this header has no names.
    ///
    /// This is the header of empty CSV data.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Return the name at index `i`.
    pub fn get(&self, i: usize) -> Option<&str> {
        self.names.get(i).map(|name| name.as_str())
    }

    /// Return the column index of `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).cloned()
    }

    /// Returns an iterator over the names, in column order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &str> {
        self.names.iter().map(|name| name.as_str())
    }

    /// Returns all names, in column order.
    pub fn as_slice(&self) -> &[String] {
        &self.names
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Header").field(&self.names).finish()
    }
}

impl<T: AsRef<str>> PartialEq<Vec<T>> for Header {
    fn eq(&self, other: &Vec<T>) -> bool {
        self.len() == other.len()
            && self.iter().zip(other).all(|(a, b)| a == b.as_ref())
    }
}

/// A record viewed through a header, so that fields can be found by name.
///
/// This is created by [`Record::named`]. It borrows both the record and the
/// header, and computes every lookup on demand.
#[derive(Clone, Copy)]
pub struct NamedRecord<'a> {
    record: &'a Record,
    header: &'a Header,
}

impl<'a> NamedRecord<'a> {
    pub(crate) fn new(
        record: &'a Record,
        header: &'a Header,
    ) -> NamedRecord<'a> {
        NamedRecord { record, header }
    }

    /// Return the field in the column called `name`.
    ///
    /// This returns `None` when the header has no such name, and also when
    /// this record is too short to have a field in that column.
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.header.position(name).and_then(|i| self.record.get(i))
    }

    /// Returns an iterator of `(name, field)` pairs.
    ///
    /// Pairs stop at the end of the header or the end of the record,
    /// whichever comes first.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.header.iter().zip(self.record.iter())
    }

    /// Copy every `(name, field)` pair, in header order.
    pub fn to_vec(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(name, field)| (name.to_string(), field.to_string()))
            .collect()
    }

    /// The line number on which the record began.
    pub fn line(&self) -> u64 {
        self.record.line()
    }

    /// The underlying record.
    pub fn record(&self) -> &'a Record {
        self.record
    }

    /// The header used for lookups.
    pub fn header(&self) -> &'a Header {
        self.header
    }
}

impl<'a> fmt::Debug for NamedRecord<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("NamedRecord")
            .field("line", &self.line())
            .field("fields", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::record::record_from_fields;

    use super::Header;

    fn header(names: &[&str]) -> Header {
        Header::from_record(&record_from_fields(names, 1, false)).unwrap()
    }

    #[test]
    fn positions() {
        let h = header(&["foo", "bar", "Foo"]);
        assert_eq!(h.len(), 3);
        assert_eq!(h.position("foo"), Some(0));
        assert_eq!(h.position("Foo"), Some(2));
        assert_eq!(h.position("baz"), None);
        assert_eq!(h.get(1), Some("bar"));
        assert_eq!(h, vec!["foo", "bar", "Foo"]);
    }

    #[test]
    fn duplicate() {
        let rec = record_from_fields(&["a", "b", "a"], 1, false);
        match Header::from_record(&rec) {
            Err(Error::DuplicateHeader { ref name, first, second }) => {
                assert_eq!(name, "a");
                assert_eq!((first, second), (0, 2));
            }
            res => panic!("expected duplicate header error, got {:?}", res),
        }
    }

    #[test]
    fn empty_header() {
        let h = Header::default();
        assert!(h.is_empty());
        assert_eq!(h.iter().count(), 0);
    }

    #[test]
    fn named_lookup() {
        let h = header(&["name", "age", "city"]);
        let rec = record_from_fields(&["alice", "30"], 4, false);
        let named = rec.named(&h);
        assert_eq!(named.get("name"), Some("alice"));
        assert_eq!(named.get("age"), Some("30"));
        // Shorter record: the name exists, the field does not.
        assert_eq!(named.get("city"), None);
        assert_eq!(named.get("nope"), None);
        assert_eq!(named.line(), 4);

        let pairs: Vec<_> = named.iter().collect();
        assert_eq!(pairs, vec![("name", "alice"), ("age", "30")]);

        let owned = named.to_vec();
        assert_eq!(owned[0], ("name".to_string(), "alice".to_string()));
        assert_eq!(owned[1], ("age".to_string(), "30".to_string()));
    }

    #[test]
    fn named_longer_record() {
        let h = header(&["a"]);
        let rec = record_from_fields(&["1", "2"], 1, false);
        let pairs: Vec<_> = rec.named(&h).iter().collect();
        assert_eq!(pairs, vec![("a", "1")]);
    }
}
