//! Built-in serializer for [`Tracked`](crate::Tracked) and
//! [`TrackedArray`](crate::TrackedArray).
//!
//! Header and data bits are reserved whether or not anything changed, so a
//! receiver can lay out the buffer from its own resident values. Only the
//! byte region shrinks for clean values.

use bitstream::{BitBufferReader, BitBufferWriter, WriteState};
use schema::ValueType;
use tracing::trace;

use crate::error::{CodecError, CodecResult};
use crate::serializer::{FieldContext, Serializer};
use crate::value::{DiffTrackedSlots, SyncValue};

/// Serializer for diff-tracked single values and arrays.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackedSerializer;

/// Sizes `value` into a scratch state, keeps its bits, and keeps its bytes
/// only when `dirty`.
fn size_slot(
    inner: &FieldContext<'_>,
    value: &dyn SyncValue,
    dirty: bool,
    state: &mut WriteState,
) -> CodecResult<()> {
    let mut scratch = WriteState::new();
    inner.size(value, &mut scratch)?;
    state.merge_bits(&scratch);
    if dirty {
        state.register_bytes(scratch.data_bytes());
    }
    Ok(())
}

/// Fails unless the resident array has exactly the declared slot count.
fn check_slot_count(
    field: &FieldContext<'_>,
    slots: &dyn DiffTrackedSlots,
    len: usize,
) -> CodecResult<()> {
    if slots.slot_count() == len {
        return Ok(());
    }
    Err(CodecError::LengthMismatch {
        field: field.name().to_owned(),
        claimed: len as u64,
        available: slots.slot_count(),
    })
}

impl TrackedSerializer {
    fn size_single(
        field: &FieldContext<'_>,
        inner_ty: &ValueType,
        value: &dyn SyncValue,
        state: &mut WriteState,
    ) -> CodecResult<()> {
        let tracked = value
            .as_tracked()
            .ok_or_else(|| CodecError::type_mismatch(field.name(), field.ty()))?;
        state.register_header_bits(1);
        size_slot(&field.with_ty(inner_ty), tracked.inner(), tracked.is_dirty(), state)
    }

    fn size_slots(
        field: &FieldContext<'_>,
        inner_ty: &ValueType,
        len: usize,
        value: &dyn SyncValue,
        state: &mut WriteState,
    ) -> CodecResult<()> {
        let slots = value
            .as_tracked_slots()
            .ok_or_else(|| CodecError::type_mismatch(field.name(), field.ty()))?;
        check_slot_count(field, slots, len)?;
        let inner = field.with_ty(inner_ty);
        state.register_header_bits(1 + slots.slot_count());
        for index in 0..slots.slot_count() {
            if let Some(slot) = slots.slot(index) {
                size_slot(&inner, slot, slots.is_slot_dirty(index), state)?;
            }
        }
        Ok(())
    }

    fn write_single(
        field: &FieldContext<'_>,
        inner_ty: &ValueType,
        value: &mut dyn SyncValue,
        out: &mut BitBufferWriter<'_>,
    ) -> CodecResult<()> {
        let tracked = value
            .as_tracked_mut()
            .ok_or_else(|| CodecError::type_mismatch(field.name(), field.ty()))?;
        let dirty = tracked.is_dirty();
        out.write_header_bit(dirty)?;
        if dirty {
            field.with_ty(inner_ty).write(tracked.inner_mut(), out)?;
        }
        Ok(())
    }

    fn write_slots(
        field: &FieldContext<'_>,
        inner_ty: &ValueType,
        len: usize,
        value: &mut dyn SyncValue,
        out: &mut BitBufferWriter<'_>,
    ) -> CodecResult<()> {
        let slots = value
            .as_tracked_slots_mut()
            .ok_or_else(|| CodecError::type_mismatch(field.name(), field.ty()))?;
        check_slot_count(field, slots, len)?;
        let inner = field.with_ty(inner_ty);
        let any = slots.any_dirty();
        out.write_header_bit(any)?;
        if any {
            for index in 0..slots.slot_count() {
                let dirty = slots.is_slot_dirty(index);
                out.write_header_bit(dirty)?;
                if let (true, Some(slot)) = (dirty, slots.slot_mut(index)) {
                    inner.write(slot, out)?;
                }
            }
        }
        trace!(field = field.name(), any_dirty = any, "wrote tracked array");
        Ok(())
    }

    fn commit_single(
        field: &FieldContext<'_>,
        inner_ty: &ValueType,
        value: &mut dyn SyncValue,
    ) -> CodecResult<()> {
        let tracked = value
            .as_tracked_mut()
            .ok_or_else(|| CodecError::type_mismatch(field.name(), field.ty()))?;
        if tracked.is_dirty() {
            field.with_ty(inner_ty).commit(tracked.inner_mut())?;
        }
        tracked.clear_dirty();
        Ok(())
    }

    fn commit_slots(
        field: &FieldContext<'_>,
        inner_ty: &ValueType,
        value: &mut dyn SyncValue,
    ) -> CodecResult<()> {
        let slots = value
            .as_tracked_slots_mut()
            .ok_or_else(|| CodecError::type_mismatch(field.name(), field.ty()))?;
        let inner = field.with_ty(inner_ty);
        for index in 0..slots.slot_count() {
            if !slots.is_slot_dirty(index) {
                continue;
            }
            if let Some(slot) = slots.slot_mut(index) {
                inner.commit(slot)?;
            }
        }
        slots.clear_dirty();
        Ok(())
    }

    fn read_single(
        field: &FieldContext<'_>,
        inner_ty: &ValueType,
        value: &mut dyn SyncValue,
        input: &mut BitBufferReader<'_>,
    ) -> CodecResult<()> {
        let tracked = value
            .as_tracked_mut()
            .ok_or_else(|| CodecError::type_mismatch(field.name(), field.ty()))?;
        if input.read_header_bit()? {
            field.with_ty(inner_ty).read(tracked.inner_mut(), input)?;
        }
        tracked.clear_dirty();
        Ok(())
    }

    fn read_slots(
        field: &FieldContext<'_>,
        inner_ty: &ValueType,
        len: usize,
        value: &mut dyn SyncValue,
        input: &mut BitBufferReader<'_>,
    ) -> CodecResult<()> {
        let slots = value
            .as_tracked_slots_mut()
            .ok_or_else(|| CodecError::type_mismatch(field.name(), field.ty()))?;
        check_slot_count(field, slots, len)?;
        let inner = field.with_ty(inner_ty);
        if input.read_header_bit()? {
            for index in 0..slots.slot_count() {
                if !input.read_header_bit()? {
                    continue;
                }
                if let Some(slot) = slots.slot_mut(index) {
                    inner.read(slot, input)?;
                }
            }
        }
        slots.clear_dirty();
        Ok(())
    }
}

impl Serializer for TrackedSerializer {
    fn name(&self) -> &'static str {
        "tracked"
    }

    fn supports(&self, ty: &ValueType) -> bool {
        matches!(ty, ValueType::Tracked(_) | ValueType::TrackedArray(..))
    }

    fn size(
        &self,
        field: &FieldContext<'_>,
        value: &dyn SyncValue,
        state: &mut WriteState,
    ) -> CodecResult<()> {
        match field.ty() {
            ValueType::Tracked(inner) => Self::size_single(field, inner, value, state),
            ValueType::TrackedArray(inner, len) => {
                Self::size_slots(field, inner, *len, value, state)
            }
            other => Err(CodecError::UnsupportedType { ty: other.clone() }),
        }
    }

    fn write(
        &self,
        field: &FieldContext<'_>,
        value: &mut dyn SyncValue,
        out: &mut BitBufferWriter<'_>,
    ) -> CodecResult<()> {
        match field.ty() {
            ValueType::Tracked(inner) => Self::write_single(field, inner, value, out),
            ValueType::TrackedArray(inner, len) => {
                Self::write_slots(field, inner, *len, value, out)
            }
            other => Err(CodecError::UnsupportedType { ty: other.clone() }),
        }
    }

    fn read(
        &self,
        field: &FieldContext<'_>,
        value: &mut dyn SyncValue,
        input: &mut BitBufferReader<'_>,
    ) -> CodecResult<()> {
        match field.ty() {
            ValueType::Tracked(inner) => Self::read_single(field, inner, value, input),
            ValueType::TrackedArray(inner, len) => {
                Self::read_slots(field, inner, *len, value, input)
            }
            other => Err(CodecError::UnsupportedType { ty: other.clone() }),
        }
    }

    fn commit(&self, field: &FieldContext<'_>, value: &mut dyn SyncValue) -> CodecResult<()> {
        match field.ty() {
            ValueType::Tracked(inner) => Self::commit_single(field, inner, value),
            ValueType::TrackedArray(inner, _) => Self::commit_slots(field, inner, value),
            other => Err(CodecError::UnsupportedType { ty: other.clone() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use schema::{FieldInfo, Flag, FlagSet};

    use super::*;
    use crate::{SerializerRegistry, Tracked, TrackedArray};

    fn size_of(field: &FieldContext<'_>, value: &dyn SyncValue) -> WriteState {
        let mut state = WriteState::new();
        field.size(value, &mut state).unwrap();
        state
    }

    #[test]
    fn clean_tracked_costs_one_header_bit() {
        let registry = SerializerRegistry::with_builtins();
        let info = FieldInfo::new("hp", ValueType::tracked(ValueType::I32), FlagSet::empty());
        let field = FieldContext::new(&registry, &info);

        let value = Tracked::new(1234i32);
        assert_eq!(size_of(&field, &value), *WriteState::new().register_header_bits(1));
    }

    #[test]
    fn dirty_tracked_adds_inner_bytes() {
        let registry = SerializerRegistry::with_builtins();
        let info = FieldInfo::new(
            "hp",
            ValueType::tracked(ValueType::U32),
            Flag::NO_COMPRESS.into(),
        );
        let field = FieldContext::new(&registry, &info);

        let mut value = Tracked::new(0u32);
        value.set(9);
        let state = size_of(&field, &value);
        assert_eq!(state.header_bits(), 1);
        assert_eq!(state.data_bytes(), 4);
    }

    #[test]
    fn tracked_bool_reserves_its_bit_even_when_clean() {
        let registry = SerializerRegistry::with_builtins();
        let info = FieldInfo::new("on", ValueType::tracked(ValueType::Bool), FlagSet::empty());
        let field = FieldContext::new(&registry, &info);

        let clean = size_of(&field, &Tracked::new(true));
        let mut dirty_value = Tracked::new(false);
        dirty_value.set(true);
        let dirty = size_of(&field, &dirty_value);
        assert_eq!(clean, dirty);
        assert_eq!(clean.data_bits(), 1);
    }

    #[test]
    fn array_reserves_container_and_slot_bits() {
        let registry = SerializerRegistry::with_builtins();
        let info = FieldInfo::new(
            "slots",
            ValueType::tracked_array(ValueType::U8, 8),
            FlagSet::empty(),
        );
        let field = FieldContext::new(&registry, &info);

        let mut array = TrackedArray::filled(0u8, 8);
        assert_eq!(size_of(&field, &array).header_bits(), 9);
        assert_eq!(size_of(&field, &array).data_bytes(), 0);

        array.set(2, 1);
        array.set(5, 1);
        assert_eq!(size_of(&field, &array).data_bytes(), 2);
    }

    #[test]
    fn resident_slot_count_must_match_declared_length() {
        let registry = SerializerRegistry::with_builtins();
        let info = FieldInfo::new(
            "cells",
            ValueType::tracked_array(ValueType::I32, 8),
            FlagSet::empty(),
        );
        let field = FieldContext::new(&registry, &info);
        let expected = Err(CodecError::LengthMismatch {
            field: "cells".into(),
            claimed: 8,
            available: 4,
        });

        let mut short = TrackedArray::filled(0i32, 4);
        let mut state = WriteState::new();
        assert_eq!(field.size(&short, &mut state), expected);

        let mut buf = [0u8; 4];
        let geometry = WriteState::new().register_header_bits(9).geometry(0);
        let mut writer = BitBufferWriter::new(&mut buf, geometry).unwrap();
        assert_eq!(field.write(&mut short, &mut writer), expected);

        let bytes = [0u8, 0, 0];
        let mut reader = BitBufferReader::open(&bytes, 0, 9, 0).unwrap();
        assert_eq!(field.read(&mut short, &mut reader), expected);
    }

    #[test]
    fn non_tracked_value_is_type_mismatch() {
        let registry = SerializerRegistry::with_builtins();
        let info = FieldInfo::new("hp", ValueType::tracked(ValueType::I32), FlagSet::empty());
        let field = FieldContext::new(&registry, &info);
        let mut state = WriteState::new();
        assert!(matches!(
            field.size(&5i32, &mut state),
            Err(CodecError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn inner_type_must_be_supported() {
        let registry = SerializerRegistry::with_builtins();
        let info = FieldInfo::new(
            "q",
            ValueType::tracked(ValueType::custom("Quaternion")),
            FlagSet::empty(),
        );
        let field = FieldContext::new(&registry, &info);
        let mut state = WriteState::new();
        assert!(matches!(
            field.size(&Tracked::new(0u8), &mut state),
            Err(CodecError::UnsupportedType { .. })
        ));
    }
}
