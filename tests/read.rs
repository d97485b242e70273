use std::cell::Cell;
use std::io::{self, Read, Write};
use std::rc::Rc;

use fastcsv::{CommentMode, Error, Reader, ReaderBuilder, Record};

/// A reader over a byte string that counts how often it is dropped.
struct Tracked {
    data: io::Cursor<Vec<u8>>,
    drops: Rc<Cell<usize>>,
}

impl Tracked {
    fn new(data: &str) -> (Tracked, Rc<Cell<usize>>) {
        let drops = Rc::new(Cell::new(0));
        let rdr = Tracked {
            data: io::Cursor::new(data.as_bytes().to_vec()),
            drops: drops.clone(),
        };
        (rdr, drops)
    }
}

impl Read for Tracked {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.data.read(buf)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

/// Hands out `data`, then fails.
struct Failing {
    data: io::Cursor<Vec<u8>>,
}

impl Read for Failing {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.read(buf)? {
            0 => Err(io::Error::new(io::ErrorKind::Other, "boom")),
            n => Ok(n),
        }
    }
}

fn collect(rdr: &mut Reader<io::Cursor<Vec<u8>>>) -> Vec<Record> {
    rdr.records().map(|r| r.unwrap()).collect()
}

#[test]
fn line_numbers() {
    let data = "h1,h2\na,line 2\nb,line 3\rc,line 4\r\n\
                d,\"line 5\rwith\r\nand\n\"\ne,line 9";
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_string(data)
        .unwrap();
    assert_eq!(rdr.headers().unwrap(), &vec!["h1", "h2"]);

    let recs = collect(&mut rdr);
    let lines: Vec<u64> = recs.iter().map(|r| r.line()).collect();
    assert_eq!(lines, vec![2, 3, 4, 5, 9]);
    assert_eq!(&recs[3][1], "line 5\rwith\r\nand\n");
    assert_eq!(recs[4], vec!["e", "line 9"]);
}

#[test]
fn line_numbers_tiny_buffer() {
    let data = "a\r\n\"b\r\nc\"\r\nd";
    let mut rdr = ReaderBuilder::new()
        .buffer_capacity(1)
        .flexible(true)
        .from_string(data)
        .unwrap();
    let recs = collect(&mut rdr);
    let lines: Vec<u64> = recs.iter().map(|r| r.line()).collect();
    assert_eq!(lines, vec![1, 2, 4]);
    assert_eq!(&recs[1][0], "b\r\nc");
}

#[test]
fn empty_input_has_no_records() {
    let mut rdr = Reader::from_string("");
    assert!(rdr.records().next().is_none());
    match rdr.next_record() {
        Err(Error::Exhausted) => {}
        res => panic!("expected exhausted error, got {:?}", res),
    }
}

#[test]
fn only_blank_lines() {
    let mut rdr = Reader::from_string("\n\r\n\r\n");
    assert!(!rdr.has_next().unwrap());

    let mut rdr = ReaderBuilder::new()
        .skip_empty_rows(false)
        .from_string("\n\r\n")
        .unwrap();
    let recs = collect(&mut rdr);
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[0], vec![""]);
    assert_eq!(recs[1].line(), 2);
}

#[test]
fn quoted_empty_field_is_not_blank() {
    let mut rdr = Reader::from_string("\"\"\n\n");
    let recs = collect(&mut rdr);
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0], vec![""]);
}

#[test]
fn malformed_quotes_are_lenient() {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .from_string("a\"b,\"c\"d\n\"unterminated,e\nf")
        .unwrap();
    let recs = collect(&mut rdr);
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[0], vec!["a\"b", "cd"]);
    assert_eq!(recs[1], vec!["unterminated,e\nf"]);
}

#[test]
fn duplicate_header_is_reported_each_time() {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_string("a,b,a\n1,2,3\n")
        .unwrap();
    for _ in 0..2 {
        match rdr.headers() {
            Err(Error::DuplicateHeader { ref name, first: 0, second: 2 }) => {
                assert_eq!(name, "a");
            }
            res => panic!("expected duplicate header, got {:?}", res),
        }
    }
    // Records are still readable.
    assert_eq!(rdr.next_record().unwrap(), vec!["1", "2", "3"]);
}

#[test]
fn duplicate_header_message() {
    let mut rdr = Reader::from_string("a,a\n");
    let err = rdr.headers().unwrap_err();
    assert_eq!(err.to_string(), "Duplicate header field 'a' found");
}

#[test]
fn header_is_cached() {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_string("x,y\n1,2\n3,4\n")
        .unwrap();
    assert_eq!(rdr.next_record().unwrap(), vec!["1", "2"]);
    let first = rdr.headers().unwrap().clone();
    assert_eq!(rdr.headers().unwrap(), &first);
    assert_eq!(rdr.next_record().unwrap(), vec!["3", "4"]);
}

#[test]
fn named_records() {
    let data = "name,age\nalice,30\nbob\n";
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_string(data)
        .unwrap();
    let header = rdr.headers().unwrap().clone();

    let alice = rdr.next_record().unwrap();
    let named = alice.named(&header);
    assert_eq!(named.get("age"), Some("30"));
    let owned = named.to_vec();
    assert_eq!(owned[0], ("name".to_string(), "alice".to_string()));

    let bob = rdr.next_record().unwrap();
    assert_eq!(bob.named(&header).get("name"), Some("bob"));
    assert_eq!(bob.named(&header).get("age"), None);
}

#[test]
fn field_count_mismatch_then_continue() {
    let mut rdr = Reader::from_string("a,b\nc,d,e\nf,g\n");
    let results: Vec<_> = rdr.records().collect();
    assert_eq!(results.len(), 3);
    match results[1] {
        Err(Error::UnequalLengths { line, expected_len, len }) => {
            assert_eq!((line, expected_len, len), (2, 2, 3));
        }
        ref res => panic!("expected unequal lengths, got {:?}", res),
    }
    assert_eq!(*results[2].as_ref().unwrap(), vec!["f", "g"]);
}

#[test]
fn field_count_header_sets_expectation() {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_string("a,b,c\n1,2\n3,4\n")
        .unwrap();
    // The header is not a data record; the first data record decides.
    let recs = collect(&mut rdr);
    assert_eq!(recs.len(), 2);
}

#[test]
fn flexible_allows_any_length() {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .from_string("a\nb,c\nd,e,f\n")
        .unwrap();
    let lens: Vec<usize> = collect(&mut rdr).iter().map(|r| r.len()).collect();
    assert_eq!(lens, vec![1, 2, 3]);
}

#[test]
fn comments_read() {
    let mut rdr = ReaderBuilder::new()
        .comment_mode(CommentMode::Read)
        .comment(b';')
        .flexible(true)
        .from_string("h1\n#foo\n;bar\nbaz")
        .unwrap();
    let recs = collect(&mut rdr);
    assert_eq!(recs.len(), 4);
    assert_eq!(recs[1], vec!["#foo"]);
    assert!(!recs[1].is_comment());
    assert_eq!(recs[2], vec!["bar"]);
    assert!(recs[2].is_comment());
    assert_eq!(recs[2].line(), 3);
    assert_eq!(recs[3].line(), 4);
}

#[test]
fn comments_keep_delimiters_and_quotes() {
    let mut rdr = ReaderBuilder::new()
        .comment_mode(CommentMode::Read)
        .from_string("#a,\"b\nc,d\n")
        .unwrap();
    let recs = collect(&mut rdr);
    assert_eq!(recs[0], vec!["a,\"b"]);
    assert!(recs[0].is_comment());
    assert_eq!(recs[1], vec!["c", "d"]);
}

#[test]
fn comments_skipped() {
    let mut rdr = ReaderBuilder::new()
        .comment_mode(CommentMode::Skip)
        .from_string("#one\na,b\n#two\r\nc,d\n")
        .unwrap();
    let recs = collect(&mut rdr);
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[0].line(), 2);
    assert_eq!(recs[1].line(), 4);
}

#[test]
fn comment_byte_not_at_start_is_data() {
    let mut rdr = ReaderBuilder::new()
        .comment_mode(CommentMode::Skip)
        .from_string("a,#b\n")
        .unwrap();
    assert_eq!(rdr.next_record().unwrap(), vec!["a", "#b"]);
}

#[test]
fn comments_disabled_are_data() {
    let mut rdr = Reader::from_string("#a,b\n");
    let rec = rdr.next_record().unwrap();
    assert_eq!(rec, vec!["#a", "b"]);
    assert!(!rec.is_comment());
}

#[test]
fn custom_delimiter_and_quote() {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .quote(b'\'')
        .from_string("a;'b;''c'\n")
        .unwrap();
    assert_eq!(rdr.next_record().unwrap(), vec!["a", "b;'c"]);
}

#[test]
fn pull_iterate_and_push_agree() {
    let data = "a,1\nb,2\nc,3\n";

    let mut pulled = vec![];
    let mut rdr = Reader::from_string(data);
    while rdr.has_next().unwrap() {
        pulled.push(rdr.next_record().unwrap());
    }

    let iterated: Vec<Record> =
        Reader::from_string(data).into_records().map(|r| r.unwrap()).collect();

    let mut pushed = vec![];
    Reader::from_string(data).for_each_record(|r| pushed.push(r)).unwrap();

    assert_eq!(pulled, iterated);
    assert_eq!(iterated, pushed);
}

#[test]
fn for_each_record_releases_source() {
    let (src, drops) = Tracked::new("a\nb\n");
    let rdr = Reader::from_reader(src);
    let mut n = 0;
    rdr.for_each_record(|_| {
        assert_eq!(drops.get(), 0);
        n += 1;
    })
    .unwrap();
    assert_eq!(n, 2);
    assert_eq!(drops.get(), 1);
}

#[test]
fn for_each_record_releases_source_on_error() {
    let (src, drops) = Tracked::new("a\nb,c\n");
    let rdr = Reader::from_reader(src);
    let res = rdr.for_each_record(|_| {});
    match res {
        Err(Error::UnequalLengths { .. }) => {}
        res => panic!("expected unequal lengths, got {:?}", res),
    }
    assert_eq!(drops.get(), 1);
}

#[test]
fn close_releases_once() {
    let (src, drops) = Tracked::new("a\nb\n");
    let mut records = Reader::from_reader(src).into_records();
    assert_eq!(records.next_record().unwrap(), vec!["a"]);
    records.close();
    records.close();
    assert_eq!(drops.get(), 1);
    assert!(!records.has_next().unwrap());
    assert!(records.next().is_none());
    drop(records);
    assert_eq!(drops.get(), 1);
}

#[test]
fn drop_releases_unclosed_reader() {
    let (src, drops) = Tracked::new("a\n");
    {
        let mut rdr = Reader::from_reader(src);
        assert!(rdr.has_next().unwrap());
    }
    assert_eq!(drops.get(), 1);
}

#[test]
fn io_error_ends_sequence() {
    let src = Failing { data: io::Cursor::new(b"a\nb\n".to_vec()) };
    let mut records = Reader::from_reader(src).into_records();
    assert_eq!(records.next().unwrap().unwrap(), vec!["a"]);
    assert_eq!(records.next().unwrap().unwrap(), vec!["b"]);
    match records.next() {
        Some(Err(ref err)) if err.is_io_error() => {}
        res => panic!("expected I/O error, got {:?}", res),
    }
    assert!(records.reader().is_closed());
    assert!(records.next().is_none());
    assert!(!records.has_next().unwrap());
}

#[test]
fn utf8_error_reports_line() {
    let data = b"a,b\nc,\xFF\nd,e\n".to_vec();
    let mut rdr = Reader::from_reader(io::Cursor::new(data));
    assert_eq!(rdr.next_record().unwrap(), vec!["a", "b"]);
    let err = rdr.next_record().unwrap_err();
    assert_eq!(err.line(), Some(2));
    match err {
        Error::Utf8 { ref err, .. } => assert_eq!(err.field(), 1),
        err => panic!("expected utf8 error, got {:?}", err),
    }
    assert_eq!(rdr.next_record().unwrap(), vec!["d", "e"]);
}

#[test]
fn from_path_utf8() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"\xEF\xBB\xBFname,city\nalice,Z\xC3\xBCrich\n").unwrap();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(file.path())
        .unwrap();
    assert_eq!(rdr.headers().unwrap(), &vec!["name", "city"]);
    assert_eq!(rdr.next_record().unwrap(), vec!["alice", "Z\u{fc}rich"]);
}

#[test]
fn from_path_utf16_bom() {
    let mut bytes = vec![0xFF, 0xFE];
    for unit in "a,b\n\u{e9},\u{2603}\n".encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&bytes).unwrap();

    let mut rdr = ReaderBuilder::new().from_path(file.path()).unwrap();
    let recs: Vec<Record> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[1], vec!["\u{e9}", "\u{2603}"]);
}

#[test]
fn from_path_explicit_encoding() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"caf\xE9,1\n").unwrap();
    let mut rdr = ReaderBuilder::new()
        .from_path_with_encoding(file.path(), encoding_rs::WINDOWS_1252)
        .unwrap();
    assert_eq!(rdr.next_record().unwrap(), vec!["caf\u{e9}", "1"]);
}

#[test]
fn from_path_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let res = ReaderBuilder::new().from_path(dir.path().join("nope.csv"));
    match res {
        Err(ref err) if err.is_io_error() => {}
        Err(err) => panic!("expected I/O error, got {:?}", err),
        Ok(_) => panic!("expected I/O error, got a reader"),
    }
}
