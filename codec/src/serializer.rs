//! The three-phase serializer contract and the registry that dispatches it.

use std::fmt;
use std::sync::{Arc, OnceLock};

use bitstream::{BitBufferReader, BitBufferWriter, WriteState};
use schema::{FieldInfo, FlagSet, ValueType};
use tracing::trace;

use crate::array::ArraySerializer;
use crate::diff::TrackedSerializer;
use crate::error::{CodecError, CodecResult};
use crate::primitive::PrimitiveSerializer;
use crate::value::SyncValue;

/// Everything a serializer knows about the field it is handling.
///
/// Wrapping serializers derive a context for their inner value with
/// [`with_ty`](Self::with_ty); name and flags carry through unchanged.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    registry: &'a SerializerRegistry,
    name: &'a str,
    ty: &'a ValueType,
    flags: FlagSet,
}

impl<'a> FieldContext<'a> {
    #[must_use]
    pub fn new(registry: &'a SerializerRegistry, info: &'a FieldInfo) -> Self {
        Self {
            registry,
            name: &info.name,
            ty: &info.ty,
            flags: info.flags,
        }
    }

    /// Same field, viewed as `ty`.
    #[must_use]
    pub const fn with_ty<'b>(&self, ty: &'b ValueType) -> FieldContext<'b>
    where
        'a: 'b,
    {
        FieldContext {
            registry: self.registry,
            name: self.name,
            ty,
            flags: self.flags,
        }
    }

    /// Same field with a different flag set.
    #[must_use]
    pub const fn with_flags(&self, flags: FlagSet) -> Self {
        Self {
            registry: self.registry,
            name: self.name,
            ty: self.ty,
            flags,
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &'a SerializerRegistry {
        self.registry
    }

    #[must_use]
    pub const fn name(&self) -> &'a str {
        self.name
    }

    #[must_use]
    pub const fn ty(&self) -> &'a ValueType {
        self.ty
    }

    #[must_use]
    pub const fn flags(&self) -> FlagSet {
        self.flags
    }

    /// Downcasts `value` to the Rust type this field must hold.
    pub fn downcast<'v, T: SyncValue>(&self, value: &'v dyn SyncValue) -> CodecResult<&'v T> {
        value
            .downcast_ref()
            .ok_or_else(|| CodecError::type_mismatch(self.name, self.ty))
    }

    /// Mutable counterpart of [`downcast`](Self::downcast).
    pub fn downcast_mut<'v, T: SyncValue>(
        &self,
        value: &'v mut dyn SyncValue,
    ) -> CodecResult<&'v mut T> {
        value
            .downcast_mut()
            .ok_or_else(|| CodecError::type_mismatch(self.name, self.ty))
    }

    /// Sizes `value` with whichever serializer claims this field's type.
    pub fn size(&self, value: &dyn SyncValue, state: &mut WriteState) -> CodecResult<()> {
        let serializer = self.registry.resolve(self.ty)?;
        serializer.validate_flags(self)?;
        if serializer.can_serialize(self, value) {
            serializer.size(self, value, state)?;
        }
        Ok(())
    }

    /// Writes `value` with whichever serializer claims this field's type.
    pub fn write(&self, value: &mut dyn SyncValue, out: &mut BitBufferWriter<'_>) -> CodecResult<()> {
        let serializer = self.registry.resolve(self.ty)?;
        if serializer.can_serialize(self, value) {
            serializer.write(self, value, out)?;
        }
        Ok(())
    }

    /// Clears the change tracking a successful write pass consumed.
    pub fn commit(&self, value: &mut dyn SyncValue) -> CodecResult<()> {
        let serializer = self.registry.resolve(self.ty)?;
        if serializer.can_serialize(self, value) {
            serializer.commit(self, value)?;
        }
        Ok(())
    }

    /// Reads into `value` with whichever serializer claims this field's type.
    pub fn read(&self, value: &mut dyn SyncValue, input: &mut BitBufferReader<'_>) -> CodecResult<()> {
        let serializer = self.registry.resolve(self.ty)?;
        if serializer.can_deserialize(self, value) {
            serializer.read(self, value, input)?;
        }
        Ok(())
    }
}

/// Sizes, writes and reads values of the types it supports.
///
/// `write` must consume exactly what `size` reserved for the same value and
/// flags, and `read` must advance every cursor exactly as `write` did.
/// `size` runs on the receiver's resident values too, so it must not fail on
/// value contents; range checks belong in `write`. `write` leaves dirty
/// state alone and `commit` clears it once the whole pass has succeeded.
pub trait Serializer: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// True if this serializer handles `ty`.
    fn supports(&self, ty: &ValueType) -> bool;

    /// Rejects flag combinations the encoding cannot honour.
    fn validate_flags(&self, _field: &FieldContext<'_>) -> CodecResult<()> {
        Ok(())
    }

    /// Returning false skips the field entirely in the size and write passes.
    fn can_serialize(&self, _field: &FieldContext<'_>, _value: &dyn SyncValue) -> bool {
        true
    }

    /// Read-side counterpart of [`can_serialize`](Self::can_serialize).
    fn can_deserialize(&self, field: &FieldContext<'_>, value: &dyn SyncValue) -> bool {
        self.can_serialize(field, value)
    }

    fn size(
        &self,
        field: &FieldContext<'_>,
        value: &dyn SyncValue,
        state: &mut WriteState,
    ) -> CodecResult<()>;

    fn write(
        &self,
        field: &FieldContext<'_>,
        value: &mut dyn SyncValue,
        out: &mut BitBufferWriter<'_>,
    ) -> CodecResult<()>;

    fn read(
        &self,
        field: &FieldContext<'_>,
        value: &mut dyn SyncValue,
        input: &mut BitBufferReader<'_>,
    ) -> CodecResult<()>;

    /// Clears change tracking after every field was written.
    fn commit(&self, _field: &FieldContext<'_>, _value: &mut dyn SyncValue) -> CodecResult<()> {
        Ok(())
    }
}

/// Ordered list of serializers; the first one supporting a type wins.
#[derive(Debug)]
pub struct SerializerRegistry {
    serializers: Vec<Box<dyn Serializer>>,
}

static GLOBAL: OnceLock<Arc<SerializerRegistry>> = OnceLock::new();

impl SerializerRegistry {
    /// Starts an empty builder.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registry holding only the built-in serializers.
    #[must_use]
    pub fn with_builtins() -> Self {
        RegistryBuilder::with_builtins().build()
    }

    /// Process-wide registry, initialised with the built-ins on first use.
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::with_builtins())))
    }

    /// Replaces the process-wide registry. Must happen before first use.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::RegistryAlreadyInstalled`] if a registry was
    /// already installed or [`global`](Self::global) was already called.
    pub fn install(registry: Self) -> CodecResult<Arc<Self>> {
        let registry = Arc::new(registry);
        GLOBAL
            .set(Arc::clone(&registry))
            .map_err(|_| CodecError::RegistryAlreadyInstalled)?;
        Ok(registry)
    }

    /// First serializer supporting `ty`.
    pub fn resolve(&self, ty: &ValueType) -> CodecResult<&dyn Serializer> {
        let serializer = self
            .serializers
            .iter()
            .find(|s| s.supports(ty))
            .ok_or_else(|| CodecError::UnsupportedType { ty: ty.clone() })?;
        trace!(ty = %ty, serializer = serializer.name(), "resolved serializer");
        Ok(serializer.as_ref())
    }

    #[must_use]
    pub fn supports(&self, ty: &ValueType) -> bool {
        self.serializers.iter().any(|s| s.supports(ty))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.serializers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.serializers.is_empty()
    }

    /// Serializer names in priority order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.serializers.iter().map(|s| s.name())
    }
}

/// Builds a [`SerializerRegistry`]; registration order is priority order.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    serializers: Vec<Box<dyn Serializer>>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the primitive, array and diff-tracked serializers.
    #[must_use]
    pub fn with_builtins() -> Self {
        Self::new()
            .register(PrimitiveSerializer)
            .register(ArraySerializer)
            .register(TrackedSerializer)
    }

    /// Appends a serializer after those already registered.
    #[must_use]
    pub fn register(mut self, serializer: impl Serializer + 'static) -> Self {
        self.serializers.push(Box::new(serializer));
        self
    }

    /// Inserts a serializer ahead of all others.
    #[must_use]
    pub fn register_first(mut self, serializer: impl Serializer + 'static) -> Self {
        self.serializers.insert(0, Box::new(serializer));
        self
    }

    #[must_use]
    pub fn build(self) -> SerializerRegistry {
        SerializerRegistry {
            serializers: self.serializers,
        }
    }
}
