//! Fixed-width bit-packed records.

/// Width of a `surface_info` record (one per leaf voxel).
pub const SURFACE_INFO_BITS: u32 = 10;

/// Width of a `surface_info2` record (one per level-6 node).
pub const SURFACE_INFO2_BITS: u32 = 6;

/// A read-only view over records of `width` bits packed LSB-first.
///
/// Record `i` starts at bit `i * width` and may straddle a byte boundary.
/// The values are returned raw; their fields are not known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedRecords<'a> {
    data: &'a [u8],
    width: u32,
}

impl<'a> PackedRecords<'a> {
    /// # Panics
    ///
    /// Panics if `width` is zero or wider than 16 bits.
    #[must_use]
    pub fn new(data: &'a [u8], width: u32) -> Self {
        assert!((1..=16).contains(&width), "record width {width} out of range");
        Self { data, width }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of whole records that fit in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() * 8 / self.width as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw value of record `index`, or `None` past the end.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<u16> {
        if index >= self.len() {
            return None;
        }
        let bit = index * self.width as usize;
        let byte = bit / 8;

        // A record of up to 16 bits spans at most three bytes.
        let mut window = 0u32;
        for (i, b) in self.data[byte..].iter().take(3).enumerate() {
            window |= u32::from(*b) << (8 * i);
        }
        let mask = (1u32 << self.width) - 1;
        #[allow(clippy::cast_possible_truncation)]
        Some(((window >> (bit % 8)) & mask) as u16)
    }

    /// Iterate over all records in order.
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }
}
