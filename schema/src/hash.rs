//! Canonical schema strings and digests.
//!
//! Each target contributes `[kind name]` and each of its fields
//! `{name type flag..}`, flags in lexical order. Permissive mode drops target
//! and field names so peers that only disagree on naming still match.

use std::fmt::{self, Write as _};

use crate::error::SchemaResult;
use crate::field::FieldInfo;
use crate::schema::{validate_targets, TargetKind, TargetSpec};

/// Which parts of a schema feed the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DigestMode {
    /// Names, types and flags.
    #[default]
    Strict,
    /// Types and flags only.
    Permissive,
}

/// Incrementally builds the canonical schema string.
#[derive(Debug, Clone, Default)]
pub struct CanonicalSchema {
    mode: DigestMode,
    text: String,
}

impl CanonicalSchema {
    #[must_use]
    pub const fn new(mode: DigestMode) -> Self {
        Self {
            mode,
            text: String::new(),
        }
    }

    /// Opens a new target; following fields belong to it.
    pub fn target(&mut self, kind: TargetKind, name: &str) -> &mut Self {
        self.text.push('[');
        self.text.push_str(kind.as_str());
        if self.mode == DigestMode::Strict {
            self.text.push(' ');
            self.text.push_str(name);
        }
        self.text.push(']');
        self
    }

    /// Appends one field of the current target.
    pub fn field(&mut self, field: &FieldInfo) -> &mut Self {
        self.text.push('{');
        if self.mode == DigestMode::Strict {
            self.text.push_str(&field.name);
            self.text.push(' ');
        }
        // Writing into a String cannot fail.
        let _ = write!(self.text, "{}", field.ty);
        for name in field.flags.names() {
            self.text.push(' ');
            self.text.push_str(name);
        }
        self.text.push('}');
        self
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub const fn mode(&self) -> DigestMode {
        self.mode
    }

    /// Hashes the canonical string.
    #[must_use]
    pub fn digest(&self) -> SchemaDigest {
        SchemaDigest::of(self.text.as_bytes())
    }
}

/// Fingerprint of a schema, exchanged by peers before any payload.
///
/// With the `blake3` feature this is a 32-byte BLAKE3 hash; without it the
/// canonical bytes themselves are used.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SchemaDigest(Vec<u8>);

impl SchemaDigest {
    #[cfg(feature = "blake3")]
    fn of(canonical: &[u8]) -> Self {
        Self(blake3::hash(canonical).as_bytes().to_vec())
    }

    #[cfg(not(feature = "blake3"))]
    fn of(canonical: &[u8]) -> Self {
        Self(canonical.to_vec())
    }

    /// Wraps digest bytes received from a peer.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Compares against a peer's digest bytes.
    #[must_use]
    pub fn matches(&self, other: &[u8]) -> bool {
        self.0 == other
    }

    /// Lower-case hex rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().fold(String::with_capacity(self.0.len() * 2), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        })
    }
}

impl fmt::Debug for SchemaDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchemaDigest({})", self.to_hex())
    }
}

impl AsRef<[u8]> for SchemaDigest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Canonical string for a set of declarative targets.
pub fn canonical_string(targets: &[TargetSpec], mode: DigestMode) -> SchemaResult<String> {
    validate_targets(targets)?;
    let mut canonical = CanonicalSchema::new(mode);
    for target in targets {
        canonical.target(target.kind, &target.name);
        for field in target.resolve()? {
            canonical.field(&field);
        }
    }
    Ok(canonical.text)
}

/// Digest for a set of declarative targets.
pub fn schema_digest(targets: &[TargetSpec], mode: DigestMode) -> SchemaResult<SchemaDigest> {
    canonical_string(targets, mode).map(|text| SchemaDigest::of(text.as_bytes()))
}
