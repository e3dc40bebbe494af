//! Seekable byte input for the stream reader.
//!
//! [`ByteCursor`] wraps any `Read + Seek` source in a buffer and keeps track of
//! the absolute offset, so that every outcome the reader produces can name the
//! exact [`ByteSpan`] it covers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, BufReader, Read, Seek, SeekFrom};

/// Buffer size used for the underlying reader. Large enough to hold the
/// biggest legal record (99999 bytes) in one fill.
const BUFFER_CAPACITY: usize = 128 * 1024;

/// A half-open byte range `[start, end)` in the underlying stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ByteSpan {
    /// First byte of the span.
    pub start: u64,
    /// One past the last byte of the span.
    pub end: u64,
}

impl ByteSpan {
    /// Create a span. `end` is clamped so it never precedes `start`.
    #[must_use]
    pub fn new(start: u64, end: u64) -> Self {
        ByteSpan {
            start,
            end: end.max(start),
        }
    }

    /// Number of bytes covered.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// True if the span covers no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True if `offset` falls inside the span.
    #[must_use]
    pub fn contains(&self, offset: u64) -> bool {
        offset >= self.start && offset < self.end
    }

    /// The first `max_len` bytes of the span, or all of it if shorter.
    #[must_use]
    pub fn truncated(self, max_len: u64) -> Self {
        ByteSpan::new(self.start, self.end.min(self.start.saturating_add(max_len)))
    }
}

impl fmt::Display for ByteSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Buffered, position-tracking view over a seekable source.
#[derive(Debug)]
pub struct ByteCursor<R> {
    inner: BufReader<R>,
    position: u64,
    len: u64,
}

impl<R: Read + Seek> ByteCursor<R> {
    /// Wrap a source, measuring its length and rewinding to offset 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be seeked.
    pub fn new(inner: R) -> io::Result<Self> {
        let mut inner = BufReader::with_capacity(BUFFER_CAPACITY, inner);
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(ByteCursor {
            inner,
            position: 0,
            len,
        })
    }

    /// Current absolute offset.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Total length of the stream, measured when the cursor was created.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// True if the stream holds no bytes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes left between the current offset and the end of the stream.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.position)
    }

    /// Move to an absolute offset. Short jumps reuse the read buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the offset does not fit a signed seek or the source
    /// refuses to seek.
    pub fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        if offset == self.position {
            return Ok(());
        }
        let target = to_i64(offset)?;
        let current = to_i64(self.position)?;
        self.inner.seek_relative(target - current)?;
        self.position = offset;
        Ok(())
    }

    /// Append up to `n` bytes to `buf`, returning how many were read.
    ///
    /// The count is short only when the stream ends first.
    ///
    /// # Errors
    ///
    /// Returns any I/O error other than an interrupted read.
    pub fn read_up_to(&mut self, buf: &mut Vec<u8>, n: usize) -> io::Result<usize> {
        let before = buf.len();
        (&mut self.inner).take(n as u64).read_to_end(buf)?;
        let read = buf.len() - before;
        self.position += read as u64;
        Ok(read)
    }

    /// Read exactly `n` bytes at `offset` into `buf` (cleared first),
    /// returning fewer only at end of stream. Leaves the cursor after the
    /// bytes read.
    ///
    /// # Errors
    ///
    /// Returns an error if seeking or reading fails.
    pub fn read_at(&mut self, offset: u64, n: usize, buf: &mut Vec<u8>) -> io::Result<usize> {
        buf.clear();
        self.seek_to(offset)?;
        self.read_up_to(buf, n)
    }

    /// Give back the wrapped source.
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

fn to_i64(offset: u64) -> io::Result<i64> {
    i64::try_from(offset).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("offset {offset} does not fit a seek"),
        )
    })
}

/// Read the raw bytes of a span from a seekable source, for manual inspection
/// of a region the reader could not turn into a record.
///
/// # Errors
///
/// Returns an error if the span lies outside the source or I/O fails.
pub fn read_span<R: Read + Seek>(source: &mut R, span: ByteSpan) -> io::Result<Vec<u8>> {
    let len = usize::try_from(span.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "span too large"))?;
    source.seek(SeekFrom::Start(span.start))?;
    let mut bytes = vec![0u8; len];
    source.read_exact(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_cursor_tracks_position() {
        let mut cursor = ByteCursor::new(Cursor::new(b"0123456789".to_vec())).unwrap();
        assert_eq!(cursor.len(), 10);

        let mut buf = Vec::new();
        assert_eq!(cursor.read_up_to(&mut buf, 4).unwrap(), 4);
        assert_eq!(buf, b"0123");
        assert_eq!(cursor.position(), 4);
        assert_eq!(cursor.remaining(), 6);
    }

    #[test]
    fn test_truncated_span_reads_prefix() {
        let span = ByteSpan::new(2, 9);
        assert_eq!(span.truncated(3), ByteSpan::new(2, 5));
        assert_eq!(span.truncated(100), span);

        let mut source = Cursor::new(b"0123456789".to_vec());
        assert_eq!(read_span(&mut source, span.truncated(3)).unwrap(), b"234");
    }

    #[test]
    fn test_short_read_at_end() {
        let mut cursor = ByteCursor::new(Cursor::new(b"abc".to_vec())).unwrap();
        let mut buf = Vec::new();
        assert_eq!(cursor.read_up_to(&mut buf, 10).unwrap(), 3);
        assert_eq!(cursor.position(), 3);
        assert_eq!(cursor.read_up_to(&mut buf, 10).unwrap(), 0);
    }

    #[test]
    fn test_seek_backwards_and_forwards() {
        let mut cursor = ByteCursor::new(Cursor::new(b"0123456789".to_vec())).unwrap();
        let mut buf = Vec::new();
        cursor.read_at(6, 2, &mut buf).unwrap();
        assert_eq!(buf, b"67");
        cursor.read_at(1, 3, &mut buf).unwrap();
        assert_eq!(buf, b"123");
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn test_read_span() {
        let mut source = Cursor::new(b"hello, world".to_vec());
        let bytes = read_span(&mut source, ByteSpan::new(7, 12)).unwrap();
        assert_eq!(bytes, b"world");
        assert!(read_span(&mut source, ByteSpan::new(7, 20)).is_err());
    }

    #[test]
    fn test_span_display_and_len() {
        let span = ByteSpan::new(10, 25);
        assert_eq!(span.to_string(), "[10, 25)");
        assert_eq!(span.len(), 15);
        assert!(span.contains(10));
        assert!(!span.contains(25));
        assert!(ByteSpan::new(5, 3).is_empty());
    }
}
