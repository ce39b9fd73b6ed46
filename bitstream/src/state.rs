//! Size-pass accumulator and the buffer layout derived from it.

use crate::varint::varint_size;

/// Running totals collected by a dry-run size pass.
///
/// Header and data-bit counts are schema-fixed; only `data_bytes` depends on
/// the values being encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteState {
    header_bits: usize,
    data_bits: usize,
    data_bytes: usize,
}

impl WriteState {
    /// Creates an empty state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            header_bits: 0,
            data_bits: 0,
            data_bytes: 0,
        }
    }

    /// Reserves presence / change bits.
    pub fn register_header_bits(&mut self, bits: usize) -> &mut Self {
        self.header_bits += bits;
        self
    }

    /// Reserves packed data bits.
    pub fn register_bits(&mut self, bits: usize) -> &mut Self {
        self.data_bits += bits;
        self
    }

    /// Reserves payload bytes.
    pub fn register_bytes(&mut self, bytes: usize) -> &mut Self {
        self.data_bytes += bytes;
        self
    }

    /// Reserves the bytes needed to varint-encode `value`.
    pub fn register_varint(&mut self, value: u64) -> &mut Self {
        self.register_bytes(varint_size(value))
    }

    /// Adds every counter of `other` into `self`.
    pub fn merge(&mut self, other: &Self) -> &mut Self {
        self.header_bits += other.header_bits;
        self.data_bits += other.data_bits;
        self.data_bytes += other.data_bytes;
        self
    }

    /// Adds only the schema-fixed counters (header and data bits) of `other`.
    pub fn merge_bits(&mut self, other: &Self) -> &mut Self {
        self.header_bits += other.header_bits;
        self.data_bits += other.data_bits;
        self
    }

    #[must_use]
    pub const fn header_bits(&self) -> usize {
        self.header_bits
    }

    #[must_use]
    pub const fn data_bits(&self) -> usize {
        self.data_bits
    }

    #[must_use]
    pub const fn data_bytes(&self) -> usize {
        self.data_bytes
    }

    /// Lays the counted regions out from `base_bit`.
    #[must_use]
    pub fn geometry(&self, base_bit: usize) -> BufferGeometry {
        BufferGeometry::new(base_bit, self.header_bits, self.data_bits, self.data_bytes)
    }
}

/// Absolute positions of every region inside one sync buffer.
///
/// ```text
/// base_bit
/// | varint(byte_len) | header bits | data bits | pad to byte | byte_len bytes |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferGeometry {
    base_bit: usize,
    prefix_bits: usize,
    header_bits: usize,
    data_bits: usize,
    byte_len: usize,
}

impl BufferGeometry {
    /// Computes the layout for the given region sizes.
    #[must_use]
    pub const fn new(base_bit: usize, header_bits: usize, data_bits: usize, byte_len: usize) -> Self {
        Self {
            base_bit,
            prefix_bits: varint_size(byte_len as u64) * 8,
            header_bits,
            data_bits,
            byte_len,
        }
    }

    /// Same as [`new`](Self::new) but with an explicit prefix width, for
    /// prefixes read off the wire in a non-minimal encoding.
    #[must_use]
    pub const fn with_prefix_len(
        base_bit: usize,
        prefix_len: usize,
        header_bits: usize,
        data_bits: usize,
        byte_len: usize,
    ) -> Self {
        Self {
            base_bit,
            prefix_bits: prefix_len * 8,
            header_bits,
            data_bits,
            byte_len,
        }
    }

    #[must_use]
    pub const fn base_bit(&self) -> usize {
        self.base_bit
    }

    /// Width of the length prefix in bits.
    #[must_use]
    pub const fn prefix_bits(&self) -> usize {
        self.prefix_bits
    }

    #[must_use]
    pub const fn header_bits(&self) -> usize {
        self.header_bits
    }

    #[must_use]
    pub const fn data_bits(&self) -> usize {
        self.data_bits
    }

    /// Length of the byte region, as carried by the prefix.
    #[must_use]
    pub const fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// First absolute bit of the header region.
    #[must_use]
    pub const fn header_start(&self) -> usize {
        self.base_bit + self.prefix_bits
    }

    /// First absolute bit of the data-bit region.
    #[must_use]
    pub const fn data_bit_start(&self) -> usize {
        self.header_start() + self.header_bits
    }

    /// First absolute byte of the byte region.
    #[must_use]
    pub const fn byte_start(&self) -> usize {
        (self.data_bit_start() + self.data_bits).div_ceil(8)
    }

    /// Bytes the whole buffer spans, counted from byte zero of the backing slice.
    #[must_use]
    pub const fn total_len(&self) -> usize {
        self.byte_start() + self.byte_len
    }
}
