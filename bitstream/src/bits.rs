//! Absolute bit addressing, LSB-first within each byte.
//!
//! Callers bounds-check before calling in.

pub(crate) fn put_bit(buf: &mut [u8], index: usize, value: bool) {
    let mask = 1u8 << (index & 7);
    let byte = &mut buf[index >> 3];
    if value {
        *byte |= mask;
    } else {
        *byte &= !mask;
    }
}

pub(crate) fn get_bit(buf: &[u8], index: usize) -> bool {
    buf[index >> 3] & (1u8 << (index & 7)) != 0
}

pub(crate) fn put_byte_at_bit(buf: &mut [u8], bit: usize, value: u8) {
    if bit & 7 == 0 {
        buf[bit >> 3] = value;
        return;
    }
    for i in 0..8 {
        put_bit(buf, bit + i, (value >> i) & 1 == 1);
    }
}

pub(crate) fn get_byte_at_bit(buf: &[u8], bit: usize) -> u8 {
    if bit & 7 == 0 {
        return buf[bit >> 3];
    }
    (0..8).fold(0u8, |acc, i| acc | (u8::from(get_bit(buf, bit + i)) << i))
}
