// The buffered adapters between the CSV machinery and the caller's I/O.
//
// `BufSource` is a trimmed down `std::io::BufReader` that can let go of its
// reader early. `BufSink` is a `std::io::BufWriter` whose large writes skip
// the buffer, and which can be closed (flushed and dropped) exactly once
// while the CSV writer that owns it is still alive.
use std::cmp;
use std::fmt;
use std::io::{self, BufRead, Write};

use log::{trace, warn};

use crate::error::IntoInnerError;

/// The default capacity of a `BufSource`.
pub const DEFAULT_SOURCE_CAPACITY: usize = 64 * 1024;

/// The default capacity of a `BufSink`.
pub const DEFAULT_SINK_CAPACITY: usize = 8 * 1024;

/// Wraps a `Read` and buffers input from it in a fixed size buffer.
///
/// Bytes handed out by `fill_buf` stay where they were read; the buffer is
/// only refilled once all of them have been consumed.
pub struct BufSource<R> {
    inner: Option<R>,
    buf: Box<[u8]>,
    pos: usize,
    cap: usize,
}

impl<R: io::Read> BufSource<R> {
    /// Creates a new `BufSource` with a default buffer capacity.
    pub fn new(inner: R) -> BufSource<R> {
        BufSource::with_capacity(DEFAULT_SOURCE_CAPACITY, inner)
    }

    /// Creates a new `BufSource` with the specified buffer capacity.
    ///
    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize, inner: R) -> BufSource<R> {
        BufSource {
            inner: Some(inner),
            buf: vec![0; cmp::max(1, capacity)].into_boxed_slice(),
            pos: 0,
            cap: 0,
        }
    }
}

impl<R> BufSource<R> {
    /// Gets a reference to the underlying reader, unless it was released.
    pub fn get_ref(&self) -> Option<&R> {
        self.inner.as_ref()
    }

    /// Returns the capacity of the internal buffer.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Returns true once the underlying reader has been released.
    pub fn is_released(&self) -> bool {
        self.inner.is_none()
    }

    /// Drop the underlying reader along with any buffered data.
    ///
    /// This returns true if the reader was dropped by this call and false if
    /// it had already been released. A released source behaves as if it were
    /// at end of input.
    pub fn release(&mut self) -> bool {
        self.pos = 0;
        self.cap = 0;
        self.inner.take().is_some()
    }
}

impl<R: io::Read> io::Read for BufSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let nread = {
            let available = self.fill_buf()?;
            let n = cmp::min(available.len(), buf.len());
            buf[..n].copy_from_slice(&available[..n]);
            n
        };
        self.consume(nread);
        Ok(nread)
    }
}

impl<R: io::Read> io::BufRead for BufSource<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos >= self.cap {
            let inner = match self.inner {
                None => return Ok(&[]),
                Some(ref mut inner) => inner,
            };
            self.pos = 0;
            self.cap = 0;
            self.cap = loop {
                match inner.read(&mut self.buf) {
                    Ok(n) => break n,
                    Err(ref err)
                        if err.kind() == io::ErrorKind::Interrupted => {
                        continue
                    }
                    Err(err) => return Err(err),
                }
            };
        }
        Ok(&self.buf[self.pos..self.cap])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = cmp::min(self.pos + amt, self.cap);
    }
}

impl<R: fmt::Debug> fmt::Debug for BufSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BufSource")
            .field("reader", &self.inner)
            .field("buffer", &format_args!("{}/{}", self.pos, self.cap))
            .finish()
    }
}

/// Wraps a `Write` and buffers output to it in a fixed size buffer.
///
/// A write that is at least as large as the buffer does not go through the
/// buffer: pending bytes are flushed first and the write is then passed
/// straight to the underlying writer.
///
/// When a `BufSink` is dropped without being closed, its buffer is flushed
/// and any error is logged and otherwise ignored. Call `close` to observe
/// that error.
pub struct BufSink<W: io::Write> {
    inner: Option<W>,
    buf: Vec<u8>,
    capacity: usize,
}

impl<W: io::Write> BufSink<W> {
    /// Creates a new `BufSink` with a default buffer capacity.
    pub fn new(inner: W) -> BufSink<W> {
        BufSink::with_capacity(DEFAULT_SINK_CAPACITY, inner)
    }

    /// Creates a new `BufSink` with the specified buffer capacity.
    ///
    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize, inner: W) -> BufSink<W> {
        let capacity = cmp::max(1, capacity);
        BufSink {
            inner: Some(inner),
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Gets a reference to the underlying writer, unless it was closed.
    pub fn get_ref(&self) -> Option<&W> {
        self.inner.as_ref()
    }

    /// Returns the capacity of the internal buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the bytes waiting to be written to the underlying writer.
    pub fn buffer(&self) -> &[u8] {
        &self.buf
    }

    /// Returns true once this sink has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Flush the buffer and the underlying writer, then drop the writer.
    ///
    /// The writer is dropped even when flushing fails. Closing a sink that
    /// is already closed does nothing and succeeds.
    pub fn close(&mut self) -> io::Result<()> {
        if self.inner.is_none() {
            return Ok(());
        }
        let res = self.flush();
        self.buf.clear();
        self.inner = None;
        res
    }

    /// Flush the buffer and return the underlying writer.
    ///
    /// If flushing fails, the sink is handed back along with the error.
    pub fn into_inner(mut self) -> Result<W, IntoInnerError<BufSink<W>>> {
        match self.take_inner() {
            Ok(inner) => Ok(inner),
            Err(err) => Err(IntoInnerError::new(self, err)),
        }
    }

    /// Flush the buffer and move the underlying writer out, leaving this
    /// sink closed.
    pub(crate) fn take_inner(&mut self) -> io::Result<W> {
        self.flush_buf()?;
        self.inner.take().ok_or_else(closed)
    }

    fn flush_buf(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let inner = match self.inner {
            None => return Err(closed()),
            Some(ref mut inner) => inner,
        };
        // Only the bytes the writer accepted leave the buffer, so a failed
        // flush can be retried without losing or repeating output.
        let mut written = 0;
        let mut res = Ok(());
        while written < self.buf.len() {
            match inner.write(&self.buf[written..]) {
                Ok(0) => {
                    res = Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write buffered CSV data",
                    ));
                    break;
                }
                Ok(n) => written += n,
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    res = Err(err);
                    break;
                }
            }
        }
        self.buf.drain(..written);
        res
    }
}

impl<W: io::Write> io::Write for BufSink<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.write_all(data)?;
        Ok(data.len())
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        if self.inner.is_none() {
            return Err(closed());
        }
        if data.len() >= self.capacity {
            self.flush_buf()?;
            trace!("writing {} bytes past the sink buffer", data.len());
            return self.inner.as_mut().ok_or_else(closed)?.write_all(data);
        }
        if self.buf.len() + data.len() > self.capacity {
            self.flush_buf()?;
        }
        self.buf.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_buf()?;
        match self.inner {
            None => Err(closed()),
            Some(ref mut inner) => inner.flush(),
        }
    }
}

impl<W: io::Write> Drop for BufSink<W> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            if let Err(err) = self.close() {
                warn!("failed to flush CSV output on drop: {}", err);
            }
        }
    }
}

impl<W: io::Write + fmt::Debug> fmt::Debug for BufSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BufSink")
            .field("writer", &self.inner)
            .field(
                "buffer",
                &format_args!("{}/{}", self.buf.len(), self.capacity),
            )
            .finish()
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "sink already closed")
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::{self, BufRead, Read, Write};
    use std::rc::Rc;

    use super::{BufSink, BufSource};

    /// A writer that records every call made to it.
    #[derive(Clone, Default)]
    struct Spy {
        log: Rc<RefCell<Log>>,
    }

    #[derive(Default)]
    struct Log {
        data: Vec<u8>,
        writes: Vec<usize>,
        flushes: usize,
        drops: usize,
    }

    impl Write for Spy {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut log = self.log.borrow_mut();
            log.data.extend_from_slice(buf);
            log.writes.push(buf.len());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.log.borrow_mut().flushes += 1;
            Ok(())
        }
    }

    impl Drop for Spy {
        fn drop(&mut self) {
            self.log.borrow_mut().drops += 1;
        }
    }

    fn expected_ab() -> Vec<u8> {
        b"ab".repeat(8192)
    }

    #[test]
    fn sink_small_writes() {
        let spy = Spy::default();
        let mut sink = BufSink::new(spy.clone());
        for _ in 0..8192 {
            sink.write_all(b"a").unwrap();
            sink.write_all(b"b").unwrap();
        }
        sink.close().unwrap();
        let log = spy.log.borrow();
        assert_eq!(log.data, expected_ab());
        assert!(log.writes.iter().all(|&n| n <= 8192));
    }

    #[test]
    fn sink_pair_writes() {
        let spy = Spy::default();
        let mut sink = BufSink::new(spy.clone());
        for _ in 0..8192 {
            sink.write_all(b"ab").unwrap();
        }
        sink.close().unwrap();
        assert_eq!(spy.log.borrow().data, expected_ab());
    }

    #[test]
    fn sink_large_write_bypasses_buffer() {
        let spy = Spy::default();
        let mut sink = BufSink::new(spy.clone());
        sink.write_all(b"x").unwrap();
        let big = expected_ab();
        sink.write_all(&big).unwrap();
        assert!(sink.buffer().is_empty());
        {
            let log = spy.log.borrow();
            assert_eq!(log.writes, vec![1, big.len()]);
        }
        sink.close().unwrap();

        let mut want = b"x".to_vec();
        want.extend_from_slice(&big);
        assert_eq!(spy.log.borrow().data, want);
    }

    #[test]
    fn sink_capacity_boundaries() {
        for &len in &[15, 16, 17] {
            let spy = Spy::default();
            let mut sink = BufSink::with_capacity(16, spy.clone());
            let data: Vec<u8> =
                (0..len).map(|i| b'a' + (i % 26) as u8).collect();
            sink.write_all(b"<").unwrap();
            sink.write_all(&data).unwrap();
            sink.write_all(b">").unwrap();
            sink.close().unwrap();

            let mut want = b"<".to_vec();
            want.extend_from_slice(&data);
            want.push(b'>');
            assert_eq!(spy.log.borrow().data, want, "length {}", len);
        }
    }

    #[test]
    fn sink_close_once() {
        let spy = Spy::default();
        let mut sink = BufSink::new(spy.clone());
        sink.write_all(b"abc").unwrap();
        sink.close().unwrap();
        sink.close().unwrap();
        drop(sink);

        let log = spy.log.borrow();
        assert_eq!(log.data, b"abc");
        assert_eq!(log.flushes, 1);
        // One drop for the sink's clone; `spy` itself is still alive.
        assert_eq!(log.drops, 1);
    }

    #[test]
    fn sink_write_after_close() {
        let mut sink = BufSink::new(vec![]);
        sink.close().unwrap();
        let err = sink.write_all(b"a").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert!(sink.is_closed());
    }

    #[test]
    fn sink_drop_flushes() {
        let spy = Spy::default();
        {
            let mut sink = BufSink::new(spy.clone());
            sink.write_all(b"abc").unwrap();
        }
        let log = spy.log.borrow();
        assert_eq!(log.data, b"abc");
        assert_eq!(log.flushes, 1);
        assert_eq!(log.drops, 1);
    }

    /// A writer that rejects its first write.
    struct FailsOnce {
        failed: bool,
        data: Vec<u8>,
    }

    impl Write for FailsOnce {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if !self.failed {
                self.failed = true;
                return Err(io::Error::new(io::ErrorKind::Other, "busy"));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sink_keeps_buffer_when_flush_fails() {
        let inner = FailsOnce { failed: false, data: vec![] };
        let mut sink = BufSink::with_capacity(16, inner);
        sink.write_all(b"hello").unwrap();
        assert!(sink.flush().is_err());
        assert_eq!(sink.buffer(), b"hello");
        sink.flush().unwrap();
        assert!(sink.buffer().is_empty());
        sink.write_all(b"world").unwrap();
        let inner = sink.into_inner().unwrap();
        assert_eq!(inner.data, b"helloworld");
    }

    #[test]
    fn sink_into_inner() {
        let mut sink = BufSink::new(vec![]);
        sink.write_all(b"abc").unwrap();
        let inner = sink.into_inner().unwrap();
        assert_eq!(inner, b"abc");
    }

    #[test]
    fn source_reads_in_chunks() {
        let data = b"abcdefghij";
        let mut src = BufSource::with_capacity(4, &data[..]);
        assert_eq!(src.capacity(), 4);
        assert_eq!(src.fill_buf().unwrap(), b"abcd");
        src.consume(1);
        assert_eq!(src.fill_buf().unwrap(), b"bcd");
        src.consume(3);
        assert_eq!(src.fill_buf().unwrap(), b"efgh");

        let mut rest = String::new();
        src.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "efghij");
        assert_eq!(src.fill_buf().unwrap(), b"");
    }

    #[test]
    fn source_release() {
        let mut src = BufSource::new(&b"abc"[..]);
        assert_eq!(src.fill_buf().unwrap(), b"abc");
        assert!(src.release());
        assert!(!src.release());
        assert!(src.is_released());
        assert_eq!(src.fill_buf().unwrap(), b"");
    }
}
