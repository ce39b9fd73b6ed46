//! Sync targets and their field descriptors.
//!
//! A type opts in to synchronization by implementing [`Synced`], returning a
//! [`TypeSchema`] that lists its fields in wire order. Field access goes
//! through plain function pointers built once per type.

use std::collections::HashSet;

use schema::{FieldInfo, FlagSet, SchemaError, SchemaResult, TargetKind, ValueType};

use crate::value::SyncValue;

/// Reads a field out of its owner.
pub type FieldGetter<O> = fn(&O) -> &dyn SyncValue;
/// Mutable access to a field for decoding.
pub type FieldGetterMut<O> = fn(&mut O) -> &mut dyn SyncValue;

/// Metadata plus accessors for one field of `O`.
pub struct FieldDescriptor<O> {
    info: FieldInfo,
    get: FieldGetter<O>,
    get_mut: FieldGetterMut<O>,
}

impl<O> FieldDescriptor<O> {
    #[must_use]
    pub fn new(info: FieldInfo, get: FieldGetter<O>, get_mut: FieldGetterMut<O>) -> Self {
        Self { info, get, get_mut }
    }

    #[must_use]
    pub const fn info(&self) -> &FieldInfo {
        &self.info
    }

    pub fn get<'o>(&self, owner: &'o O) -> &'o dyn SyncValue {
        (self.get)(owner)
    }

    pub fn get_mut<'o>(&self, owner: &'o mut O) -> &'o mut dyn SyncValue {
        (self.get_mut)(owner)
    }
}

impl<O> std::fmt::Debug for FieldDescriptor<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Ordered field list for one synchronized type.
#[derive(Debug)]
pub struct TypeSchema<O> {
    name: String,
    kind: TargetKind,
    fields: Vec<FieldDescriptor<O>>,
}

impl<O> TypeSchema<O> {
    /// Starts a schema for the type called `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>, kind: TargetKind) -> TypeSchemaBuilder<O> {
        TypeSchemaBuilder {
            schema: Self {
                name: name.into(),
                kind,
                fields: Vec::new(),
            },
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> TargetKind {
        self.kind
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor<O>] {
        &self.fields
    }

    /// Checks that field names are unique.
    pub fn validate(&self) -> SchemaResult<()> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.info.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    target: self.name.clone(),
                    field: field.info.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Builder for [`TypeSchema`].
#[derive(Debug)]
pub struct TypeSchemaBuilder<O> {
    schema: TypeSchema<O>,
}

impl<O> TypeSchemaBuilder<O> {
    /// Appends a field; wire order is declaration order.
    #[must_use]
    pub fn field(
        mut self,
        name: impl Into<String>,
        ty: ValueType,
        flags: FlagSet,
        get: FieldGetter<O>,
        get_mut: FieldGetterMut<O>,
    ) -> Self {
        self.schema
            .fields
            .push(FieldDescriptor::new(FieldInfo::new(name, ty, flags), get, get_mut));
        self
    }

    /// Builds the schema after validation.
    pub fn build(self) -> SchemaResult<TypeSchema<O>> {
        self.schema.validate()?;
        Ok(self.schema)
    }
}

/// A type whose fields are synchronized through a static [`TypeSchema`].
pub trait Synced: Send + Sized + 'static {
    fn schema() -> &'static TypeSchema<Self>;

    /// Starts the schema for this type, so accessor closures see `Self`.
    #[must_use]
    fn builder(name: impl Into<String>, kind: TargetKind) -> TypeSchemaBuilder<Self> {
        TypeSchema::builder(name, kind)
    }
}

/// Object-safe view of anything the coordinator can encode and decode.
pub trait SyncTarget: Send {
    fn kind(&self) -> TargetKind;

    fn type_name(&self) -> &str;

    fn field_count(&self) -> usize;

    fn field_info(&self, index: usize) -> Option<&FieldInfo>;

    fn field(&self, index: usize) -> Option<(&FieldInfo, &dyn SyncValue)>;

    fn field_mut(&mut self, index: usize) -> Option<(&FieldInfo, &mut dyn SyncValue)>;
}

impl<T: Synced> SyncTarget for T {
    fn kind(&self) -> TargetKind {
        T::schema().kind()
    }

    fn type_name(&self) -> &str {
        T::schema().name()
    }

    fn field_count(&self) -> usize {
        T::schema().fields.len()
    }

    fn field_info(&self, index: usize) -> Option<&FieldInfo> {
        T::schema().fields.get(index).map(FieldDescriptor::info)
    }

    fn field(&self, index: usize) -> Option<(&FieldInfo, &dyn SyncValue)> {
        let descriptor = T::schema().fields.get(index)?;
        Some((&descriptor.info, descriptor.get(self)))
    }

    fn field_mut(&mut self, index: usize) -> Option<(&FieldInfo, &mut dyn SyncValue)> {
        let descriptor = T::schema().fields.get(index)?;
        Some((&descriptor.info, descriptor.get_mut(self)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use schema::Flag;

    use super::*;
    use crate::Tracked;

    #[derive(Debug, Default)]
    struct Door {
        open: bool,
        angle: Tracked<f32>,
    }

    impl Synced for Door {
        fn schema() -> &'static TypeSchema<Self> {
            static SCHEMA: OnceLock<TypeSchema<Door>> = OnceLock::new();
            SCHEMA.get_or_init(|| {
                Self::builder("Door", TargetKind::Instance)
                    .field("open", ValueType::Bool, FlagSet::empty(), |d| &d.open, |d| &mut d.open)
                    .field(
                        "angle",
                        ValueType::tracked(ValueType::F32),
                        Flag::NO_COMPRESS.into(),
                        |d| &d.angle,
                        |d| &mut d.angle,
                    )
                    .build()
                    .unwrap()
            })
        }
    }

    #[test]
    fn blanket_target_walks_fields_in_order() {
        let mut door = Door::default();
        let target: &mut dyn SyncTarget = &mut door;
        assert_eq!(target.type_name(), "Door");
        assert_eq!(target.kind(), TargetKind::Instance);
        assert_eq!(target.field_count(), 2);
        assert_eq!(target.field_info(1).unwrap().name, "angle");
        assert!(target.field_info(2).is_none());

        let (info, value) = target.field_mut(0).unwrap();
        assert_eq!(info.ty, ValueType::Bool);
        *value.downcast_mut::<bool>().unwrap() = true;
        assert!(door.open);
    }

    #[test]
    fn duplicate_field_names_rejected() {
        let result = Door::builder("Door", TargetKind::Instance)
            .field("open", ValueType::Bool, FlagSet::empty(), |d| &d.open, |d| &mut d.open)
            .field("open", ValueType::Bool, FlagSet::empty(), |d| &d.open, |d| &mut d.open)
            .build();
        assert!(matches!(result, Err(SchemaError::DuplicateField { .. })));
    }
}
