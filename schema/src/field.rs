//! Semantic value types and per-field metadata.

use std::fmt;

use crate::flag::FlagSet;

/// The semantic type a serializer is resolved by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ValueType {
    Bool,
    U8,
    I8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    /// Variable-length array of a primitive.
    Array(Box<ValueType>),
    /// A single diff-tracked value.
    Tracked(Box<ValueType>),
    /// Fixed-length array with one dirty bit per slot. The length is part of
    /// the schema and never sent.
    TrackedArray(Box<ValueType>, usize),
    /// A type handled by an extension serializer, identified by name.
    Custom(String),
}

impl ValueType {
    #[must_use]
    pub fn array(element: Self) -> Self {
        Self::Array(Box::new(element))
    }

    #[must_use]
    pub fn tracked(inner: Self) -> Self {
        Self::Tracked(Box::new(inner))
    }

    #[must_use]
    pub fn tracked_array(element: Self, len: usize) -> Self {
        Self::TrackedArray(Box::new(element), len)
    }

    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    /// True for the scalar primitives.
    #[must_use]
    pub const fn is_primitive(&self) -> bool {
        !matches!(
            self,
            Self::Array(_) | Self::Tracked(_) | Self::TrackedArray(..) | Self::Custom(_)
        )
    }

    /// Wrapped type of arrays and tracked wrappers.
    #[must_use]
    pub fn inner(&self) -> Option<&Self> {
        match self {
            Self::Array(inner) | Self::Tracked(inner) | Self::TrackedArray(inner, _) => Some(inner),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::U8 => f.write_str("u8"),
            Self::I8 => f.write_str("i8"),
            Self::I16 => f.write_str("i16"),
            Self::U16 => f.write_str("u16"),
            Self::I32 => f.write_str("i32"),
            Self::U32 => f.write_str("u32"),
            Self::I64 => f.write_str("i64"),
            Self::U64 => f.write_str("u64"),
            Self::F32 => f.write_str("f32"),
            Self::F64 => f.write_str("f64"),
            Self::Array(inner) => write!(f, "array<{inner}>"),
            Self::Tracked(inner) => write!(f, "tracked<{inner}>"),
            Self::TrackedArray(inner, len) => write!(f, "tracked_array<{inner};{len}>"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// Name, type and flags of one synchronized field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    pub ty: ValueType,
    pub flags: FlagSet,
}

impl FieldInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: ValueType, flags: FlagSet) -> Self {
        Self {
            name: name.into(),
            ty,
            flags,
        }
    }
}
