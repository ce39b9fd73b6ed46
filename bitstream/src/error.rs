//! Error types for bit buffer operations.

use std::fmt;

use thiserror::Error;

/// Result type for bit buffer operations.
pub type BitResult<T> = Result<T, BitError>;

/// One of the independently bounded areas of a sync buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// Varint length prefix at the buffer base.
    Prefix,
    /// Presence / change bits.
    Header,
    /// Packed single-bit values.
    DataBits,
    /// Byte-aligned payload.
    DataBytes,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Prefix => "prefix",
            Self::Header => "header",
            Self::DataBits => "data-bit",
            Self::DataBytes => "data-byte",
        };
        f.write_str(name)
    }
}

/// Errors raised by the bit buffer and varint codec.
///
/// A [`BitError::CapacityExceeded`] always means the size pass and the
/// write/read pass disagreed about the schema; it is never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BitError {
    /// A cursor would move past the space reserved for its region.
    #[error("{region} region exhausted: requested {requested}, only {available} left")]
    CapacityExceeded {
        /// Region whose cursor overflowed.
        region: Region,
        /// Units (bits or bytes) requested by the call.
        requested: usize,
        /// Units still available in the region.
        available: usize,
    },

    /// The backing slice cannot hold the computed geometry.
    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Bytes required by the geometry.
        needed: usize,
        /// Bytes in the backing slice.
        available: usize,
    },

    /// Input ended before a value or region was complete.
    #[error("truncated input: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required.
        needed: usize,
        /// Bytes present.
        available: usize,
    },

    /// Fewer payload bytes were written than the size pass predicted.
    #[error("byte region underrun: predicted {expected} bytes, wrote {written}")]
    ByteRegionUnderrun {
        /// Bytes reserved by the size pass.
        expected: usize,
        /// Bytes actually written.
        written: usize,
    },

    /// Payload bytes were left unread after the last field.
    #[error("{remaining} trailing bytes left in the byte region")]
    TrailingBytes {
        /// Unread bytes.
        remaining: usize,
    },

    /// Length prefix does not fit in the address space.
    #[error("length prefix {value} is not addressable")]
    PrefixOverflow {
        /// Decoded prefix value.
        value: u64,
    },
}

impl BitError {
    /// Returns `true` for size-pass / access-pass divergence.
    #[must_use]
    pub const fn is_capacity_exceeded(&self) -> bool {
        matches!(
            self,
            Self::CapacityExceeded { .. }
                | Self::ByteRegionUnderrun { .. }
                | Self::TrailingBytes { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_display_names_region() {
        let err = BitError::CapacityExceeded {
            region: Region::Header,
            requested: 1,
            available: 0,
        };
        let msg = err.to_string();
        assert!(msg.contains("header"), "should mention region: {msg}");
        assert!(msg.contains("requested 1"));
    }

    #[test]
    fn truncated_display() {
        let err = BitError::Truncated {
            needed: 9,
            available: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains('9'));
        assert!(msg.contains('2'));
    }

    #[test]
    fn divergence_classification() {
        assert!(BitError::ByteRegionUnderrun {
            expected: 4,
            written: 3
        }
        .is_capacity_exceeded());
        assert!(!BitError::PrefixOverflow { value: u64::MAX }.is_capacity_exceeded());
    }

    #[test]
    fn error_is_std_error() {
        fn assert_error<E: std::error::Error + Send + Sync + 'static>() {}
        assert_error::<BitError>();
    }
}
