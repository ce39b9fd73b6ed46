//! Error types for codec operations.

use std::fmt;

use bitstream::BitError;
use schema::{SchemaError, ValueType};
use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while sizing, encoding or decoding sync targets.
///
/// None of these are transient: they describe schema or programming errors
/// and are never retried internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Bit buffer error; capacity overruns mean the size and write passes disagreed.
    #[error("bitstream error: {0}")]
    Bitstream(#[from] BitError),

    /// Flag or schema definition error.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// No registered serializer claims the type.
    #[error("no serializer registered for `{ty}`")]
    UnsupportedType { ty: ValueType },

    /// Mutually exclusive flags on one field.
    #[error("field `{field}` has conflicting flags {flags:?}")]
    FlagConflict {
        field: String,
        flags: Vec<&'static str>,
    },

    /// Peer digest differs from the local schema digest.
    #[error("schema digest mismatch: local {expected}, peer {found}")]
    SchemaMismatch { expected: String, found: String },

    /// The field's value is not the Rust type its descriptor declares.
    #[error("field `{field}` does not hold a `{expected}`")]
    TypeMismatch { field: String, expected: ValueType },

    /// A decoded array length cannot fit in what is left of the byte region,
    /// or a tracked array's resident slot count differs from its declared length.
    #[error("field `{field}` claims {claimed} elements, {available} available")]
    LengthMismatch {
        field: String,
        claimed: u64,
        available: usize,
    },

    /// A value cannot be represented under the field's encoding.
    #[error("field `{field}`: {reason}")]
    InvalidValue { field: String, reason: ValueReason },

    /// Encoded buffer would exceed the configured limit.
    #[error("payload of {size} bytes exceeds limit of {limit}")]
    PayloadTooLarge { size: usize, limit: usize },

    /// The process-wide registry was already set or already in use.
    #[error("global serializer registry already installed")]
    RegistryAlreadyInstalled,
}

impl CodecError {
    /// True when a region cursor overran its reservation.
    #[must_use]
    pub const fn is_capacity_exceeded(&self) -> bool {
        matches!(self, Self::Bitstream(err) if err.is_capacity_exceeded())
    }

    pub(crate) fn type_mismatch(field: &str, expected: &ValueType) -> Self {
        Self::TypeMismatch {
            field: field.to_owned(),
            expected: expected.clone(),
        }
    }

    pub(crate) fn invalid_value(field: &str, reason: ValueReason) -> Self {
        Self::InvalidValue {
            field: field.to_owned(),
            reason,
        }
    }
}

/// Details for [`CodecError::InvalidValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueReason {
    /// Decoded integer does not fit the field's type.
    OutOfRange { raw: u64 },
    /// Angle outside `0..=360` degrees under rotation compression.
    AngleOutOfRange,
    /// Quantized angle above what the compression tier can hold.
    QuantizedOutOfRange { value: u64, max: u64 },
}

impl fmt::Display for ValueReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { raw } => write!(f, "decoded value {raw} out of range"),
            Self::AngleOutOfRange => f.write_str("angle outside 0..=360 degrees"),
            Self::QuantizedOutOfRange { value, max } => {
                write!(f, "quantized angle {value} above {max}")
            }
        }
    }
}
