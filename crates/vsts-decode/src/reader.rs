//! Cursor-based reader for fully buffered binary data.

use crate::error::{DecodeError, DecodeResult};

/// Byte order used for multi-byte reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// Width of an in-file pointer used by [`ByteReader::read_string_ptr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerWidth {
    U16,
    U32,
    U64,
}

/// Generate a fixed-width integer/float read in the reader's byte order.
macro_rules! read_num {
    ($(#[$doc:meta])* $name:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name(&mut self) -> DecodeResult<$ty> {
            let bytes = self.read_array()?;
            Ok(match self.endian {
                Endian::Little => <$ty>::from_le_bytes(bytes),
                Endian::Big => <$ty>::from_be_bytes(bytes),
            })
        }
    };
}

/// A read cursor over an immutable byte slice.
///
/// Every read checks the remaining length first and fails with
/// [`DecodeError::UnexpectedEof`] instead of panicking, so truncated input
/// surfaces as an error at the offset where it was noticed.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> ByteReader<'a> {
    /// Create a little-endian reader positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            endian: Endian::Little,
        }
    }

    /// Use the given byte order for subsequent reads.
    #[must_use]
    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    #[must_use]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Current cursor offset from the start of the buffer.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total length of the underlying buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left between the cursor and the end of the buffer.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Move the cursor to an absolute offset. Seeking to the very end is allowed.
    pub fn seek(&mut self, pos: usize) -> DecodeResult<()> {
        if pos > self.data.len() {
            return Err(DecodeError::UnexpectedEof {
                offset: pos,
                requested: 0,
                len: self.data.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Advance the cursor by `count` bytes.
    pub fn skip(&mut self, count: usize) -> DecodeResult<()> {
        self.read_bytes(count).map(|_| ())
    }

    /// Advance the cursor to the next multiple of `alignment`.
    pub fn align(&mut self, alignment: usize) -> DecodeResult<()> {
        if alignment > 1 {
            let padding = (alignment - self.pos % alignment) % alignment;
            self.skip(padding)?;
        }
        Ok(())
    }

    /// Read `count` raw bytes, borrowing them from the underlying buffer.
    pub fn read_bytes(&mut self, count: usize) -> DecodeResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(count)
            .filter(|&end| end <= self.data.len())
            .ok_or(DecodeError::UnexpectedEof {
                offset: self.pos,
                requested: count,
                len: self.data.len(),
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// Read exactly `N` bytes into an array.
    pub fn read_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Read a 4-byte tag and check it against `expected`.
    pub fn expect_magic(&mut self, expected: &[u8; 4]) -> DecodeResult<()> {
        let offset = self.pos;
        let found = self.read_array::<4>()?;
        if &found != expected {
            return Err(DecodeError::InvalidMagic {
                offset,
                expected: *expected,
                found,
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> DecodeResult<i8> {
        Ok(i8::from_ne_bytes(self.read_array::<1>()?))
    }

    /// Read a single byte as a boolean (any non-zero value is `true`).
    pub fn read_bool(&mut self) -> DecodeResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    read_num!(read_u16, u16);
    read_num!(read_i16, i16);
    read_num!(read_u32, u32);
    read_num!(read_i32, i32);
    read_num!(read_u64, u64);
    read_num!(read_i64, i64);
    read_num!(read_f32, f32);
    read_num!(read_f64, f64);

    /// Read a 24-bit unsigned integer.
    ///
    /// The three bytes are padded with a zero byte on the unused end and
    /// decoded as a 32-bit value.
    pub fn read_u24(&mut self) -> DecodeResult<u32> {
        let [a, b, c] = self.read_array::<3>()?;
        Ok(match self.endian {
            Endian::Little => u32::from_le_bytes([a, b, c, 0]),
            Endian::Big => u32::from_be_bytes([0, a, b, c]),
        })
    }

    /// Read a 24-bit integer into an `i32`.
    ///
    /// Uses the same zero padding as [`Self::read_u24`], so the result is
    /// never sign-extended and always lies in `0..1 << 24`.
    pub fn read_i24(&mut self) -> DecodeResult<i32> {
        let [a, b, c] = self.read_array::<3>()?;
        Ok(match self.endian {
            Endian::Little => i32::from_le_bytes([a, b, c, 0]),
            Endian::Big => i32::from_be_bytes([0, a, b, c]),
        })
    }

    /// Skip padding up to `alignment`, then read an 8-byte pointer.
    pub fn read_ptr(&mut self, alignment: usize) -> DecodeResult<u64> {
        self.align(alignment)?;
        self.read_u64()
    }

    /// Read a null-terminated UTF-8 string at an absolute offset.
    ///
    /// The cursor is not moved.
    pub fn read_string_at(&self, offset: usize) -> DecodeResult<&'a str> {
        let tail = self
            .data
            .get(offset..)
            .ok_or(DecodeError::UnexpectedEof {
                offset,
                requested: 1,
                len: self.data.len(),
            })?;
        let end = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or(DecodeError::InvalidString { offset })?;
        std::str::from_utf8(&tail[..end]).map_err(|_| DecodeError::InvalidString { offset })
    }

    /// Read a pointer of the given width and the string it points to.
    ///
    /// The cursor is restored to where it was before the pointer, so the
    /// pointer field can be re-read by the caller if needed.
    pub fn read_string_ptr(&mut self, width: PointerWidth) -> DecodeResult<&'a str> {
        let start = self.pos;
        let target = match width {
            PointerWidth::U16 => u64::from(self.read_u16()?),
            PointerWidth::U32 => u64::from(self.read_u32()?),
            PointerWidth::U64 => self.read_u64()?,
        };
        self.pos = start;
        let offset = usize::try_from(target).map_err(|_| DecodeError::UnexpectedEof {
            offset: start,
            requested: 1,
            len: self.data.len(),
        })?;
        self.read_string_at(offset)
    }
}
