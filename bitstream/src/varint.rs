//! Tiered variable-length integers, zig-zag mapping and float bit-casts.
//!
//! | value            | bytes | layout                                          |
//! |------------------|-------|-------------------------------------------------|
//! | `0..=240`        | 1     | `v`                                             |
//! | `241..=2287`     | 2     | `((v-240)>>8)+241`, `(v-240)&0xFF`              |
//! | `2288..=67823`   | 3     | `249`, `(v-2288)>>8`, `(v-2288)&0xFF`           |
//! | `>= 67824`       | 1+N   | `247+N`, then `N` little-endian bytes (N in 3..=8) |

use crate::error::{BitError, BitResult};

/// Largest encoded varint, in bytes.
pub const MAX_VARINT_BYTES: usize = 9;

const ONE_BYTE_MAX: u64 = 240;
const TWO_BYTE_MAX: u64 = 2287;
const THREE_BYTE_MAX: u64 = 67823;
const THREE_BYTE_MARKER: u8 = 249;
const WIDE_BASE: u8 = 247;

/// Returns the number of bytes `value` occupies once encoded.
#[must_use]
pub const fn varint_size(value: u64) -> usize {
    if value <= ONE_BYTE_MAX {
        1
    } else if value <= TWO_BYTE_MAX {
        2
    } else if value <= THREE_BYTE_MAX {
        3
    } else {
        1 + wide_len(value)
    }
}

/// Smallest `N` in `3..=8` with `value < 256^N`.
const fn wide_len(value: u64) -> usize {
    let significant = (64 - value.leading_zeros() as usize).div_ceil(8);
    if significant < 3 {
        3
    } else {
        significant
    }
}

/// Encodes `value` into `out`, returning the number of bytes used.
pub fn encode_varint(value: u64, out: &mut [u8; MAX_VARINT_BYTES]) -> usize {
    if value <= ONE_BYTE_MAX {
        out[0] = value as u8;
        1
    } else if value <= TWO_BYTE_MAX {
        let biased = value - 240;
        out[0] = ((biased >> 8) + 241) as u8;
        out[1] = (biased & 0xFF) as u8;
        2
    } else if value <= THREE_BYTE_MAX {
        let biased = value - 2288;
        out[0] = THREE_BYTE_MARKER;
        out[1] = ((biased >> 8) & 0xFF) as u8;
        out[2] = (biased & 0xFF) as u8;
        3
    } else {
        let len = wide_len(value);
        out[0] = WIDE_BASE + len as u8;
        let le = value.to_le_bytes();
        out[1..=len].copy_from_slice(&le[..len]);
        1 + len
    }
}

/// Encodes `value` into a freshly allocated vector.
#[must_use]
pub fn varint_to_vec(value: u64) -> Vec<u8> {
    let mut scratch = [0u8; MAX_VARINT_BYTES];
    let len = encode_varint(value, &mut scratch);
    scratch[..len].to_vec()
}

/// Total encoded length implied by a varint's first byte.
#[must_use]
pub const fn varint_len_from_header(header: u8) -> usize {
    match header {
        0..=240 => 1,
        241..=248 => 2,
        249 => 3,
        _ => 1 + (header - WIDE_BASE) as usize,
    }
}

/// Decodes a varint from the start of `bytes`, returning the value and its length.
///
/// # Errors
///
/// Returns [`BitError::Truncated`] if `bytes` ends before the encoding does.
pub fn decode_varint(bytes: &[u8]) -> BitResult<(u64, usize)> {
    let Some(&header) = bytes.first() else {
        return Err(BitError::Truncated {
            needed: 1,
            available: 0,
        });
    };
    let len = varint_len_from_header(header);
    if bytes.len() < len {
        return Err(BitError::Truncated {
            needed: len,
            available: bytes.len(),
        });
    }
    let value = match header {
        0..=240 => u64::from(header),
        241..=248 => 240 + (u64::from(header - 241) << 8) + u64::from(bytes[1]),
        249 => 2288 + (u64::from(bytes[1]) << 8) + u64::from(bytes[2]),
        _ => {
            let mut le = [0u8; 8];
            le[..len - 1].copy_from_slice(&bytes[1..len]);
            u64::from_le_bytes(le)
        }
    };
    Ok((value, len))
}

/// Maps a signed value onto the unsigned line so small magnitudes stay small.
#[must_use]
pub const fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag_encode`].
#[must_use]
pub const fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Reinterprets an `f32` as its IEEE-754 bits, optionally byte-swapped.
#[must_use]
pub fn f32_to_raw(value: f32, swap: bool) -> u64 {
    let bits = value.to_bits();
    (if swap { bits.swap_bytes() } else { bits }) as u64
}

/// Inverse of [`f32_to_raw`]. Bits above the low 32 are ignored.
#[must_use]
pub fn f32_from_raw(raw: u64, swap: bool) -> f32 {
    let bits = raw as u32;
    f32::from_bits(if swap { bits.swap_bytes() } else { bits })
}

/// Reinterprets an `f64` as its IEEE-754 bits, optionally byte-swapped.
#[must_use]
pub fn f64_to_raw(value: f64, swap: bool) -> u64 {
    let bits = value.to_bits();
    if swap {
        bits.swap_bytes()
    } else {
        bits
    }
}

/// Inverse of [`f64_to_raw`].
#[must_use]
pub fn f64_from_raw(raw: u64, swap: bool) -> f64 {
    f64::from_bits(if swap { raw.swap_bytes() } else { raw })
}
