//! Bounded reader mirroring [`BitBufferWriter`](crate::BitBufferWriter).

use crate::bits::{get_bit, get_byte_at_bit};
use crate::error::{BitError, BitResult, Region};
use crate::state::BufferGeometry;
use crate::varint::{
    decode_varint, f32_from_raw, f64_from_raw, varint_len_from_header, zigzag_decode,
    MAX_VARINT_BYTES,
};
use crate::writer::ensure;

/// Reads the varint length prefix stored at `base_bit`.
///
/// Returns the prefix value and the number of bytes it occupies.
///
/// # Errors
///
/// Returns [`BitError::Truncated`] if `data` ends inside the prefix.
pub fn read_prefix(data: &[u8], base_bit: usize) -> BitResult<(u64, usize)> {
    let available = (data.len() * 8).saturating_sub(base_bit) / 8;
    if available == 0 {
        return Err(BitError::Truncated {
            needed: base_bit.div_ceil(8) + 1,
            available: data.len(),
        });
    }
    let header = get_byte_at_bit(data, base_bit);
    let len = varint_len_from_header(header);
    if available < len {
        return Err(BitError::Truncated {
            needed: (base_bit + len * 8).div_ceil(8),
            available: data.len(),
        });
    }
    let mut scratch = [0u8; MAX_VARINT_BYTES];
    scratch[0] = header;
    for (i, byte) in scratch.iter_mut().enumerate().take(len).skip(1) {
        *byte = get_byte_at_bit(data, base_bit + i * 8);
    }
    decode_varint(&scratch[..len])
}

/// Reads header bits, data bits and payload bytes through independent cursors.
#[derive(Debug)]
pub struct BitBufferReader<'a> {
    data: &'a [u8],
    geometry: BufferGeometry,
    header_pos: usize,
    bit_pos: usize,
    byte_pos: usize,
}

impl<'a> BitBufferReader<'a> {
    /// Opens a buffer at `base_bit` whose bit regions have the given sizes.
    ///
    /// The byte region length is taken from the prefix.
    ///
    /// # Errors
    ///
    /// Returns [`BitError::Truncated`] if `data` is shorter than the prefix
    /// claims, or [`BitError::PrefixOverflow`] if the prefix cannot be a length.
    pub fn open(
        data: &'a [u8],
        base_bit: usize,
        header_bits: usize,
        data_bits: usize,
    ) -> BitResult<Self> {
        let (raw_len, prefix_len) = read_prefix(data, base_bit)?;
        let byte_len =
            usize::try_from(raw_len).map_err(|_| BitError::PrefixOverflow { value: raw_len })?;
        if byte_len > data.len() {
            return Err(BitError::Truncated {
                needed: byte_len,
                available: data.len(),
            });
        }
        let geometry =
            BufferGeometry::with_prefix_len(base_bit, prefix_len, header_bits, data_bits, byte_len);
        Self::with_geometry(data, geometry)
    }

    /// Opens a buffer whose full layout is already known.
    ///
    /// # Errors
    ///
    /// Returns [`BitError::Truncated`] if `data` does not cover the layout.
    pub fn with_geometry(data: &'a [u8], geometry: BufferGeometry) -> BitResult<Self> {
        let needed = geometry.total_len();
        if data.len() < needed {
            return Err(BitError::Truncated {
                needed,
                available: data.len(),
            });
        }
        Ok(Self {
            data,
            geometry,
            header_pos: 0,
            bit_pos: 0,
            byte_pos: 0,
        })
    }

    #[must_use]
    pub const fn geometry(&self) -> &BufferGeometry {
        &self.geometry
    }

    #[must_use]
    pub const fn header_bits_read(&self) -> usize {
        self.header_pos
    }

    #[must_use]
    pub const fn bits_read(&self) -> usize {
        self.bit_pos
    }

    #[must_use]
    pub const fn bytes_read(&self) -> usize {
        self.byte_pos
    }

    /// Payload bytes not yet consumed.
    #[must_use]
    pub const fn bytes_remaining(&self) -> usize {
        self.geometry.byte_len() - self.byte_pos
    }

    pub fn read_header_bit(&mut self) -> BitResult<bool> {
        ensure(Region::Header, self.header_pos, 1, self.geometry.header_bits())?;
        let bit = get_bit(self.data, self.geometry.header_start() + self.header_pos);
        self.header_pos += 1;
        Ok(bit)
    }

    pub fn read_bit(&mut self) -> BitResult<bool> {
        ensure(Region::DataBits, self.bit_pos, 1, self.geometry.data_bits())?;
        let bit = get_bit(self.data, self.geometry.data_bit_start() + self.bit_pos);
        self.bit_pos += 1;
        Ok(bit)
    }

    /// Borrows the next `len` payload bytes.
    pub fn read_bytes(&mut self, len: usize) -> BitResult<&'a [u8]> {
        ensure(Region::DataBytes, self.byte_pos, len, self.geometry.byte_len())?;
        let start = self.geometry.byte_start() + self.byte_pos;
        self.byte_pos += len;
        Ok(&self.data[start..start + len])
    }

    /// Reads the next `N` payload bytes into an array.
    pub fn read_array<const N: usize>(&mut self) -> BitResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> BitResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> BitResult<i8> {
        Ok(i8::from_le_bytes(self.read_array()?))
    }

    pub fn read_u16(&mut self) -> BitResult<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> BitResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> BitResult<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> BitResult<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f64(&mut self) -> BitResult<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Reads an unsigned varint from the byte cursor.
    pub fn read_varint(&mut self) -> BitResult<u64> {
        ensure(Region::DataBytes, self.byte_pos, 1, self.geometry.byte_len())?;
        let header = self.data[self.geometry.byte_start() + self.byte_pos];
        let bytes = self.read_bytes(varint_len_from_header(header))?;
        decode_varint(bytes).map(|(value, _)| value)
    }

    pub fn read_packed_i16(&mut self, no_zigzag: bool) -> BitResult<i16> {
        Ok(self.read_packed_i64(no_zigzag)? as i16)
    }

    pub fn read_packed_i32(&mut self, no_zigzag: bool) -> BitResult<i32> {
        Ok(self.read_packed_i64(no_zigzag)? as i32)
    }

    pub fn read_packed_i64(&mut self, no_zigzag: bool) -> BitResult<i64> {
        let raw = self.read_varint()?;
        Ok(if no_zigzag {
            raw as i64
        } else {
            zigzag_decode(raw)
        })
    }

    pub fn read_packed_f32(&mut self, swap_endian: bool) -> BitResult<f32> {
        Ok(f32_from_raw(self.read_varint()?, swap_endian))
    }

    pub fn read_packed_f64(&mut self, swap_endian: bool) -> BitResult<f64> {
        Ok(f64_from_raw(self.read_varint()?, swap_endian))
    }

    /// Closes the reader, returning the bytes spanned from the slice start.
    ///
    /// # Errors
    ///
    /// Returns [`BitError::TrailingBytes`] if payload bytes were left unread.
    pub fn finish(self) -> BitResult<usize> {
        let remaining = self.bytes_remaining();
        if remaining != 0 {
            return Err(BitError::TrailingBytes { remaining });
        }
        Ok(self.geometry.total_len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BitBufferWriter;

    #[test]
    fn prefix_read_at_misaligned_base() {
        let geometry = BufferGeometry::new(5, 0, 0, 300);
        let mut buf = vec![0u8; geometry.total_len()];
        let mut writer = BitBufferWriter::new(&mut buf, geometry).unwrap();
        writer.write_bytes(&[9u8; 300]).unwrap();
        writer.finish().unwrap();
        assert_eq!(read_prefix(&buf, 5).unwrap(), (300, 2));
    }

    #[test]
    fn empty_input_is_truncated() {
        assert!(matches!(
            BitBufferReader::open(&[], 0, 0, 0),
            Err(BitError::Truncated { .. })
        ));
    }

    #[test]
    fn short_payload_is_truncated() {
        // Prefix claims 4 bytes, only 2 follow.
        let data = [4u8, 1, 2];
        assert!(matches!(
            BitBufferReader::open(&data, 0, 0, 0),
            Err(BitError::Truncated { available: 3, .. })
        ));
    }

    #[test]
    fn huge_prefix_does_not_overflow() {
        let data = [255u8, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        assert!(BitBufferReader::open(&data, 0, 0, 0).is_err());
    }

    #[test]
    fn trailing_bytes_detected() {
        let data = [2u8, 7, 8];
        let mut reader = BitBufferReader::open(&data, 0, 0, 0).unwrap();
        assert_eq!(reader.read_u8().unwrap(), 7);
        assert_eq!(
            reader.finish().unwrap_err(),
            BitError::TrailingBytes { remaining: 1 }
        );
    }

    #[test]
    fn reads_past_region_are_rejected() {
        let data = [0u8, 0b1];
        let mut reader = BitBufferReader::open(&data, 0, 1, 0).unwrap();
        assert!(reader.read_header_bit().unwrap());
        assert!(reader.read_header_bit().is_err());
        assert!(matches!(
            reader.read_bit(),
            Err(BitError::CapacityExceeded {
                region: Region::DataBits,
                ..
            })
        ));
        assert!(reader.read_u8().is_err());
    }
}
