//! Declarative target descriptions.
//!
//! These mirror what a codec target exposes at runtime, in a form that can be
//! written by hand or loaded from JSON (with the `serde` feature).

use std::collections::HashSet;

use crate::error::{SchemaError, SchemaResult};
use crate::field::{FieldInfo, ValueType};
use crate::flag::FlagSet;

/// Whether a target carries per-instance or type-level fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum TargetKind {
    #[default]
    Instance,
    Type,
}

impl TargetKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::Type => "type",
        }
    }
}

/// A field as written in a schema description; flags are still names.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldSpec {
    pub name: String,
    pub ty: ValueType,
    #[cfg_attr(feature = "serde", serde(default))]
    pub flags: Vec<String>,
}

impl FieldSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            ty,
            flags: Vec::new(),
        }
    }

    /// Adds a flag by name.
    #[must_use]
    pub fn flag(mut self, name: impl Into<String>) -> Self {
        self.flags.push(name.into());
        self
    }

    /// Resolves flag names against the flag table.
    pub fn resolve(&self) -> SchemaResult<FieldInfo> {
        Ok(FieldInfo::new(
            self.name.clone(),
            self.ty.clone(),
            FlagSet::parse(&self.flags)?,
        ))
    }
}

/// One sync target: a named type and its ordered fields.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetSpec {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub kind: TargetKind,
    pub fields: Vec<FieldSpec>,
}

impl TargetSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: TargetKind) -> Self {
        Self {
            name: name.into(),
            kind,
            fields: Vec::new(),
        }
    }

    /// Appends a field.
    #[must_use]
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Checks field names are unique and every flag resolves.
    pub fn validate(&self) -> SchemaResult<()> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    target: self.name.clone(),
                    field: field.name.clone(),
                });
            }
            FlagSet::parse(&field.flags)?;
        }
        Ok(())
    }

    /// Resolved field metadata, in declaration order.
    pub fn resolve(&self) -> SchemaResult<Vec<FieldInfo>> {
        self.validate()?;
        self.fields.iter().map(FieldSpec::resolve).collect()
    }
}

/// Validates a whole set of targets.
pub fn validate_targets(targets: &[TargetSpec]) -> SchemaResult<()> {
    let mut seen = HashSet::new();
    for target in targets {
        if !seen.insert((target.kind, target.name.as_str())) {
            return Err(SchemaError::DuplicateTarget {
                name: target.name.clone(),
            });
        }
        target.validate()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Flag;

    #[test]
    fn resolve_maps_flag_names() {
        let target = TargetSpec::new("Player", TargetKind::Instance)
            .field(FieldSpec::new("id", ValueType::U32).flag("NoCompress"))
            .field(FieldSpec::new("alive", ValueType::Bool));
        let fields = target.resolve().unwrap();
        assert_eq!(fields.len(), 2);
        assert!(fields[0].flags.contains(Flag::NO_COMPRESS));
        assert!(fields[1].flags.is_empty());
    }

    #[test]
    fn duplicate_field_rejected() {
        let target = TargetSpec::new("Player", TargetKind::Instance)
            .field(FieldSpec::new("id", ValueType::U32))
            .field(FieldSpec::new("id", ValueType::U8));
        assert_eq!(
            target.validate(),
            Err(SchemaError::DuplicateField {
                target: "Player".into(),
                field: "id".into()
            })
        );
    }

    #[test]
    fn unknown_flag_rejected() {
        let target = TargetSpec::new("Player", TargetKind::Type)
            .field(FieldSpec::new("id", ValueType::U32).flag("Nope"));
        assert!(matches!(
            target.resolve(),
            Err(SchemaError::UnknownFlag { .. })
        ));
    }

    #[test]
    fn same_name_different_kind_is_allowed() {
        let targets = [
            TargetSpec::new("Player", TargetKind::Instance),
            TargetSpec::new("Player", TargetKind::Type),
        ];
        assert!(validate_targets(&targets).is_ok());
        let dup = [
            TargetSpec::new("Player", TargetKind::Type),
            TargetSpec::new("Player", TargetKind::Type),
        ];
        assert!(validate_targets(&dup).is_err());
    }
}
