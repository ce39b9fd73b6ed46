//! Flags, value types and schema digests for the deltasync codec.
//!
//! This crate describes *what* is synchronized, not how it is encoded:
//! - Field flags and the process-wide flag table
//! - Semantic value types that serializers are resolved by
//! - Declarative target descriptions
//! - Canonical schema strings and their digests
//!
//! # Design Principles
//!
//! - **Explicit schemas** - Fields are described up front, no reflection.
//! - **Open flag set** - Built-in flags plus named flags registered at startup.
//! - **Deterministic hashing** - The digest is stable given the same definition,
//!   regardless of flag registration order.

mod error;
mod field;
mod flag;
mod hash;
mod schema;

pub use error::{SchemaError, SchemaResult};
pub use field::{FieldInfo, ValueType};
pub use flag::{Flag, FlagSet, MAX_FLAGS};
pub use hash::{canonical_string, schema_digest, CanonicalSchema, DigestMode, SchemaDigest};
pub use schema::{validate_targets, FieldSpec, TargetKind, TargetSpec};
