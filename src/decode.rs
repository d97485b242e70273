use std::cmp;
use std::fmt;
use std::io;

use encoding_rs::{CoderResult, Decoder, Encoding, UTF_8};

/// The size of the raw input buffer.
const INPUT_CAPACITY: usize = 8 * 1024;

/// Reads smaller than this are decoded into a side buffer first, since a
/// decoder needs room for at least one whole character to make progress.
const SPILL_CAPACITY: usize = 16;

/// A reader that transcodes its input to UTF-8 as it is read.
///
/// Malformed input is replaced with U+FFFD. A byte order mark is never part
/// of the output.
pub struct DecodeReader<R> {
    inner: R,
    decoder: Decoder,
    buf: Box<[u8]>,
    pos: usize,
    len: usize,
    eof: bool,
    finished: bool,
    spill: [u8; SPILL_CAPACITY],
    spill_pos: usize,
    spill_len: usize,
}

impl<R: io::Read> DecodeReader<R> {
    /// Decode `inner`, detecting the encoding from a byte order mark.
    ///
    /// A UTF-8, UTF-16LE or UTF-16BE byte order mark selects that encoding.
    /// Without one, the input is read as UTF-8.
    pub fn new(inner: R) -> DecodeReader<R> {
        DecodeReader::with_decoder(inner, UTF_8.new_decoder())
    }

    /// Decode `inner` as `encoding`.
    ///
    /// A leading byte order mark for `encoding` is removed, but does not
    /// select another encoding.
    pub fn with_encoding(
        inner: R,
        encoding: &'static Encoding,
    ) -> DecodeReader<R> {
        DecodeReader::with_decoder(
            inner,
            encoding.new_decoder_with_bom_removal(),
        )
    }

    fn with_decoder(inner: R, decoder: Decoder) -> DecodeReader<R> {
        DecodeReader {
            inner,
            decoder,
            buf: vec![0; INPUT_CAPACITY].into_boxed_slice(),
            pos: 0,
            len: 0,
            eof: false,
            finished: false,
            spill: [0; SPILL_CAPACITY],
            spill_pos: 0,
            spill_len: 0,
        }
    }

    /// The encoding being decoded.
    ///
    /// Until a byte order mark has been seen or ruled out, this is the
    /// encoding the reader was created with.
    pub fn encoding(&self) -> &'static Encoding {
        self.decoder.encoding()
    }

    /// Gets a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    fn fill(&mut self) -> io::Result<()> {
        loop {
            match self.inner.read(&mut self.buf) {
                Ok(n) => {
                    self.pos = 0;
                    self.len = n;
                    self.eof = n == 0;
                    return Ok(());
                }
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
    }

    /// Decode into `dst`, which must have room for at least
    /// `SPILL_CAPACITY` bytes. Returns `0` only at the end of input.
    fn decode(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.finished {
                return Ok(0);
            }
            if self.pos >= self.len && !self.eof {
                self.fill()?;
            }
            let (res, nin, nout, _) = self.decoder.decode_to_utf8(
                &self.buf[self.pos..self.len],
                dst,
                self.eof,
            );
            self.pos += nin;
            if self.eof && res == CoderResult::InputEmpty {
                self.finished = true;
            }
            if nout > 0 {
                return Ok(nout);
            }
        }
    }
}

impl<R: io::Read> io::Read for DecodeReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.spill_pos >= self.spill_len && buf.len() >= SPILL_CAPACITY {
            return self.decode(buf);
        }
        if self.spill_pos >= self.spill_len {
            let mut spill = [0; SPILL_CAPACITY];
            self.spill_len = self.decode(&mut spill)?;
            self.spill_pos = 0;
            self.spill = spill;
        }
        let available = &self.spill[self.spill_pos..self.spill_len];
        let n = cmp::min(available.len(), buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.spill_pos += n;
        Ok(n)
    }
}

impl<R: fmt::Debug> fmt::Debug for DecodeReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DecodeReader")
            .field("inner", &self.inner)
            .field("encoding", &self.decoder.encoding().name())
            .finish()
    }
}
