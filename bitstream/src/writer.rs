//! Bounded writer over the three regions of a sync buffer.

use crate::bits::{put_bit, put_byte_at_bit};
use crate::error::{BitError, BitResult, Region};
use crate::state::BufferGeometry;
use crate::varint::{encode_varint, f32_to_raw, f64_to_raw, zigzag_encode, MAX_VARINT_BYTES};

/// Writes header bits, data bits and payload bytes through independent cursors.
///
/// Opening the writer stamps the varint length prefix at the geometry base and
/// zeroes the bit regions (bits outside the buffer's span are preserved, so
/// several buffers may share a byte at their seams). Every write is checked
/// against its region's reservation.
#[derive(Debug)]
pub struct BitBufferWriter<'a> {
    buf: &'a mut [u8],
    geometry: BufferGeometry,
    header_pos: usize,
    bit_pos: usize,
    byte_pos: usize,
}

impl<'a> BitBufferWriter<'a> {
    /// Opens `buf` for writing with the given layout.
    ///
    /// # Errors
    ///
    /// Returns [`BitError::BufferTooSmall`] if `buf` cannot hold the layout.
    pub fn new(buf: &'a mut [u8], geometry: BufferGeometry) -> BitResult<Self> {
        let needed = geometry.total_len();
        if buf.len() < needed {
            return Err(BitError::BufferTooSmall {
                needed,
                available: buf.len(),
            });
        }

        let mut prefix = [0u8; MAX_VARINT_BYTES];
        let len = encode_varint(geometry.byte_len() as u64, &mut prefix);
        for (i, byte) in prefix[..len].iter().enumerate() {
            put_byte_at_bit(buf, geometry.base_bit() + i * 8, *byte);
        }
        for bit in geometry.header_start()..geometry.byte_start() * 8 {
            put_bit(buf, bit, false);
        }

        Ok(Self {
            buf,
            geometry,
            header_pos: 0,
            bit_pos: 0,
            byte_pos: 0,
        })
    }

    /// Layout this writer was opened with.
    #[must_use]
    pub const fn geometry(&self) -> &BufferGeometry {
        &self.geometry
    }

    #[must_use]
    pub const fn header_bits_written(&self) -> usize {
        self.header_pos
    }

    #[must_use]
    pub const fn bits_written(&self) -> usize {
        self.bit_pos
    }

    #[must_use]
    pub const fn bytes_written(&self) -> usize {
        self.byte_pos
    }

    /// Writes one presence / change bit.
    pub fn write_header_bit(&mut self, value: bool) -> BitResult<()> {
        ensure(Region::Header, self.header_pos, 1, self.geometry.header_bits())?;
        put_bit(self.buf, self.geometry.header_start() + self.header_pos, value);
        self.header_pos += 1;
        Ok(())
    }

    /// Writes one packed data bit.
    pub fn write_bit(&mut self, value: bool) -> BitResult<()> {
        ensure(Region::DataBits, self.bit_pos, 1, self.geometry.data_bits())?;
        put_bit(self.buf, self.geometry.data_bit_start() + self.bit_pos, value);
        self.bit_pos += 1;
        Ok(())
    }

    /// Writes raw bytes at the byte cursor.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> BitResult<()> {
        ensure(
            Region::DataBytes,
            self.byte_pos,
            bytes.len(),
            self.geometry.byte_len(),
        )?;
        let start = self.geometry.byte_start() + self.byte_pos;
        self.buf[start..start + bytes.len()].copy_from_slice(bytes);
        self.byte_pos += bytes.len();
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> BitResult<()> {
        self.write_bytes(&[value])
    }

    pub fn write_i8(&mut self, value: i8) -> BitResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u16(&mut self, value: u16) -> BitResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> BitResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u64(&mut self, value: u64) -> BitResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_f32(&mut self, value: f32) -> BitResult<()> {
        self.write_bytes(&value.to_bits().to_le_bytes())
    }

    pub fn write_f64(&mut self, value: f64) -> BitResult<()> {
        self.write_bytes(&value.to_bits().to_le_bytes())
    }

    /// Writes an unsigned varint at the byte cursor.
    pub fn write_varint(&mut self, value: u64) -> BitResult<()> {
        let mut scratch = [0u8; MAX_VARINT_BYTES];
        let len = encode_varint(value, &mut scratch);
        self.write_bytes(&scratch[..len])
    }

    pub fn write_packed_i16(&mut self, value: i16, no_zigzag: bool) -> BitResult<()> {
        self.write_packed_i64(i64::from(value), no_zigzag)
    }

    pub fn write_packed_i32(&mut self, value: i32, no_zigzag: bool) -> BitResult<()> {
        self.write_packed_i64(i64::from(value), no_zigzag)
    }

    /// Writes a signed varint, zig-zag mapped unless `no_zigzag` is set.
    pub fn write_packed_i64(&mut self, value: i64, no_zigzag: bool) -> BitResult<()> {
        let raw = if no_zigzag {
            value as u64
        } else {
            zigzag_encode(value)
        };
        self.write_varint(raw)
    }

    /// Writes the IEEE bits of `value` as a varint.
    pub fn write_packed_f32(&mut self, value: f32, swap_endian: bool) -> BitResult<()> {
        self.write_varint(f32_to_raw(value, swap_endian))
    }

    /// Writes the IEEE bits of `value` as a varint.
    pub fn write_packed_f64(&mut self, value: f64, swap_endian: bool) -> BitResult<()> {
        self.write_varint(f64_to_raw(value, swap_endian))
    }

    /// Closes the writer, returning the bytes spanned from the slice start.
    ///
    /// # Errors
    ///
    /// Returns [`BitError::ByteRegionUnderrun`] if fewer payload bytes were
    /// written than the geometry reserved.
    pub fn finish(self) -> BitResult<usize> {
        if self.byte_pos != self.geometry.byte_len() {
            return Err(BitError::ByteRegionUnderrun {
                expected: self.geometry.byte_len(),
                written: self.byte_pos,
            });
        }
        Ok(self.geometry.total_len())
    }
}

pub(crate) const fn ensure(
    region: Region,
    pos: usize,
    requested: usize,
    reserved: usize,
) -> BitResult<()> {
    let available = reserved.saturating_sub(pos);
    if requested > available {
        return Err(BitError::CapacityExceeded {
            region,
            requested,
            available,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_header_bits_and_bytes_land_in_place() {
        let geometry = BufferGeometry::new(0, 2, 3, 2);
        let mut buf = [0u8; 8];
        let mut writer = BitBufferWriter::new(&mut buf, geometry).unwrap();
        writer.write_header_bit(true).unwrap();
        writer.write_header_bit(false).unwrap();
        writer.write_bit(true).unwrap();
        writer.write_bit(true).unwrap();
        writer.write_bit(false).unwrap();
        writer.write_u16(0xBEEF).unwrap();
        assert_eq!(writer.finish().unwrap(), 4);
        // prefix=2 | h:1,0 d:1,1,0 -> 0b0000_1101 | EF BE
        assert_eq!(&buf[..4], &[2, 0b0000_1101, 0xEF, 0xBE]);
    }

    #[test]
    fn header_overflow_is_capacity_exceeded() {
        let geometry = BufferGeometry::new(0, 1, 0, 0);
        let mut buf = [0u8; 2];
        let mut writer = BitBufferWriter::new(&mut buf, geometry).unwrap();
        writer.write_header_bit(true).unwrap();
        let err = writer.write_header_bit(true).unwrap_err();
        assert_eq!(
            err,
            BitError::CapacityExceeded {
                region: Region::Header,
                requested: 1,
                available: 0
            }
        );
    }

    #[test]
    fn byte_overflow_does_not_truncate() {
        let geometry = BufferGeometry::new(0, 0, 0, 3);
        let mut buf = [0u8; 8];
        let mut writer = BitBufferWriter::new(&mut buf, geometry).unwrap();
        writer.write_u16(1).unwrap();
        let err = writer.write_u16(2).unwrap_err();
        assert!(matches!(
            err,
            BitError::CapacityExceeded {
                region: Region::DataBytes,
                requested: 2,
                available: 1
            }
        ));
        assert_eq!(writer.bytes_written(), 2);
    }

    #[test]
    fn underrun_detected_on_finish() {
        let geometry = BufferGeometry::new(0, 0, 0, 2);
        let mut buf = [0u8; 4];
        let mut writer = BitBufferWriter::new(&mut buf, geometry).unwrap();
        writer.write_u8(1).unwrap();
        assert!(matches!(
            writer.finish(),
            Err(BitError::ByteRegionUnderrun {
                expected: 2,
                written: 1
            })
        ));
    }

    #[test]
    fn too_small_backing_slice() {
        let geometry = BufferGeometry::new(0, 0, 0, 4);
        let mut buf = [0u8; 3];
        assert!(matches!(
            BitBufferWriter::new(&mut buf, geometry),
            Err(BitError::BufferTooSmall {
                needed: 5,
                available: 3
            })
        ));
    }

    #[test]
    fn bits_before_base_are_preserved() {
        let geometry = BufferGeometry::new(3, 1, 0, 0);
        let mut buf = [0b0000_0101u8, 0xFF];
        let mut writer = BitBufferWriter::new(&mut buf, geometry).unwrap();
        writer.write_header_bit(true).unwrap();
        writer.finish().unwrap();
        assert_eq!(buf[0] & 0b111, 0b101);
    }

    #[test]
    fn stale_bits_in_regions_are_cleared() {
        let geometry = BufferGeometry::new(0, 4, 4, 0);
        let mut buf = [0xFFu8; 2];
        let writer = BitBufferWriter::new(&mut buf, geometry).unwrap();
        writer.finish().unwrap();
        assert_eq!(buf, [0, 0]);
    }

    #[test]
    fn packed_writes_use_varint_tiers() {
        let geometry = BufferGeometry::new(0, 0, 0, 1 + 1 + 3);
        let mut buf = [0u8; 8];
        let mut writer = BitBufferWriter::new(&mut buf, geometry).unwrap();
        writer.write_packed_i32(-1, false).unwrap();
        writer.write_packed_i16(7, true).unwrap();
        writer.write_packed_f32(100.0, true).unwrap();
        assert_eq!(writer.finish().unwrap(), 6);
        assert_eq!(&buf[..3], &[5, 1, 7]);
    }
}
