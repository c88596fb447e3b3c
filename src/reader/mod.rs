#![doc = r#"
Bounded reading of track data

All track payloads live in one contiguous buffer owned by the
[`SequenceFile`](crate::file::SequenceFile). A [`Reader`] is a short-lived
view over that buffer: it starts at a track's saved cursor, may never move
past the track's end bound, and hands its final position back so the
cursor can be stored again as a plain offset.
"#]

mod error;
pub use error::*;

mod vlq;
pub use vlq::*;

/// A cursor over a slice of the shared track buffer.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    position: usize,
    end: usize,
}

impl<'a> Reader<'a> {
    /// Create a reader over `buf[position..end]`.
    ///
    /// `end` is clamped to the buffer length and `position` to `end`.
    pub fn new(buf: &'a [u8], position: usize, end: usize) -> Self {
        let end = end.min(buf.len());
        Self {
            buf,
            position: position.min(end),
            end,
        }
    }

    /// Create a reader over the whole slice.
    pub fn from_byte_slice(buf: &'a [u8]) -> Self {
        Self::new(buf, 0, buf.len())
    }

    /// Current offset into the underlying buffer.
    #[inline]
    pub const fn buffer_position(&self) -> usize {
        self.position
    }

    /// Bytes left before the end bound.
    #[inline]
    pub const fn remaining(&self) -> usize {
        self.end - self.position
    }

    /// True once the cursor sits on the end bound.
    #[inline]
    pub const fn is_at_end(&self) -> bool {
        self.position >= self.end
    }

    /// Look at the next byte without consuming it.
    pub fn peek(&self) -> Option<u8> {
        if self.is_at_end() {
            return None;
        }
        Some(self.buf[self.position])
    }

    /// Consume one byte.
    pub fn read_u8(&mut self) -> ReadResult<u8> {
        let byte = self.peek().ok_or(ReaderError::oob(self.position))?;
        self.position += 1;
        Ok(byte)
    }

    /// Consume exactly `N` bytes.
    pub fn read_exact_size<const N: usize>(&mut self) -> ReadResult<[u8; N]> {
        if self.remaining() < N {
            return Err(ReaderError::oob(self.position));
        }
        let mut out = [0; N];
        out.copy_from_slice(&self.buf[self.position..self.position + N]);
        self.position += N;
        Ok(out)
    }

    /// Borrow the next `len` bytes without consuming them.
    pub fn peek_slice(&self, len: usize) -> ReadResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(ReaderError::oob(self.position));
        }
        Ok(&self.buf[self.position..self.position + len])
    }

    /// Advance by `len` bytes. Fails without moving if that would cross the bound.
    pub fn skip(&mut self, len: usize) -> ReadResult<()> {
        if self.remaining() < len {
            return Err(ReaderError::oob(self.position));
        }
        self.position += len;
        Ok(())
    }

    /// Decode a variable-length quantity, failing on truncation or overlong input.
    pub fn read_vlq(&mut self) -> ReadResult<u32> {
        let start = self.position;
        let mut value: u32 = 0;
        for _ in 0..VLQ_MAX_LEN {
            let byte = self.read_u8().map_err(|_| ReaderError::oob(start))?;
            value = (value << 7) | (byte & 0x7F) as u32;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(ReaderError::new(start, ReaderErrorKind::VlqOverflow))
    }

    /// Decode a delta-time, never failing.
    ///
    /// At the end bound the delta is zero; a quantity cut off by the bound
    /// yields the groups read so far.
    pub fn read_delta_time(&mut self) -> u32 {
        let mut value: u32 = 0;
        for _ in 0..VLQ_MAX_LEN {
            let Some(byte) = self.peek() else {
                break;
            };
            self.position += 1;
            value = (value << 7) | (byte & 0x7F) as u32;
            if byte & 0x80 == 0 {
                break;
            }
        }
        value
    }
}

#[test]
fn bounded_reads() {
    use pretty_assertions::assert_eq;

    let buf = [0x90, 0x3C, 0x64, 0xFF, 0xAA];
    let mut reader = Reader::new(&buf, 0, 3);
    assert_eq!(reader.read_u8(), Ok(0x90));
    assert_eq!(reader.read_exact_size::<2>(), Ok([0x3C, 0x64]));
    assert!(reader.is_at_end());
    assert_eq!(reader.peek(), None);
    assert_eq!(reader.read_u8(), Err(ReaderError::oob(3)));
}

#[test]
fn skip_past_bound_does_not_move() {
    let buf = [0u8; 8];
    let mut reader = Reader::new(&buf, 2, 6);
    assert!(reader.skip(5).unwrap_err().is_out_of_bounds());
    assert_eq!(reader.buffer_position(), 2);
    reader.skip(4).unwrap();
    assert!(reader.is_at_end());
}

#[test]
fn end_is_clamped_to_buffer() {
    let buf = [1u8, 2, 3];
    let reader = Reader::new(&buf, 10, 99);
    assert_eq!(reader.buffer_position(), 3);
    assert_eq!(reader.remaining(), 0);
}

#[test]
fn vlq_reads() {
    use pretty_assertions::assert_eq;

    let buf = [0x81, 0x00, 0x7F, 0x83];
    let mut reader = Reader::from_byte_slice(&buf);
    assert_eq!(reader.read_vlq(), Ok(0x80));
    assert_eq!(reader.read_vlq(), Ok(0x7F));
    assert_eq!(reader.read_vlq(), Err(ReaderError::oob(3)));

    let overlong = [0x80, 0x80, 0x80, 0x80, 0x01];
    let mut reader = Reader::from_byte_slice(&overlong);
    assert_eq!(
        reader.read_vlq(),
        Err(ReaderError::new(0, ReaderErrorKind::VlqOverflow))
    );
}

#[test]
fn delta_time_is_zero_at_end() {
    use pretty_assertions::assert_eq;

    let buf = [0x60, 0x81];
    let mut reader = Reader::from_byte_slice(&buf);
    assert_eq!(reader.read_delta_time(), 0x60);
    // truncated by the bound: keeps what was read
    assert_eq!(reader.read_delta_time(), 0x01);
    assert!(reader.is_at_end());
    assert_eq!(reader.read_delta_time(), 0);
}
