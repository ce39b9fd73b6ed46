//! Optional serializer for [`Vector3`], with quantised rotation encoding.
//!
//! Not part of the built-in registry; add it with
//! `RegistryBuilder::with_builtins().register(VectorSerializer::new()?)`.
//!
//! Each axis costs one header bit and is only sent when changed. Under one of
//! the `RotCompress1/2/3` flags an axis is treated as an angle in `0..=360`
//! degrees and quantised to 1, 2 or 3 bytes of precision before varint
//! encoding; otherwise it goes through the `f32` serializer.

use std::any::Any;

use bitstream::{BitBufferReader, BitBufferWriter, WriteState};
use schema::{Flag, FlagSet, SchemaResult, ValueType};

use crate::error::{CodecError, CodecResult, ValueReason};
use crate::serializer::{FieldContext, Serializer};
use crate::tracked::Tracked;
use crate::value::SyncValue;

/// Name of the value type handled by [`VectorSerializer`].
pub const VECTOR3_TYPE: &str = "Vector3";

/// Flag names for the three rotation precision tiers, in byte-width order.
pub const ROTATION_FLAG_NAMES: [&str; 3] = ["RotCompress1", "RotCompress2", "RotCompress3"];

static COMPONENT_TYPE: ValueType = ValueType::F32;

/// Three independently tracked `f32` components.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vector3 {
    x: Tracked<f32>,
    y: Tracked<f32>,
    z: Tracked<f32>,
}

impl Vector3 {
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x: Tracked::new(x),
            y: Tracked::new(y),
            z: Tracked::new(z),
        }
    }

    /// Semantic type to declare `Vector3` fields with.
    #[must_use]
    pub fn value_type() -> ValueType {
        ValueType::custom(VECTOR3_TYPE)
    }

    #[must_use]
    pub fn x(&self) -> f32 {
        *self.x
    }

    #[must_use]
    pub fn y(&self) -> f32 {
        *self.y
    }

    #[must_use]
    pub fn z(&self) -> f32 {
        *self.z
    }

    pub fn set_x(&mut self, value: f32) {
        self.x.set(value);
    }

    pub fn set_y(&mut self, value: f32) {
        self.y.set(value);
    }

    pub fn set_z(&mut self, value: f32) {
        self.z.set(value);
    }

    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.x.is_dirty() || self.y.is_dirty() || self.z.is_dirty()
    }

    pub fn clear_dirty(&mut self) {
        self.x.clear_dirty();
        self.y.clear_dirty();
        self.z.clear_dirty();
    }

    fn axes(&self) -> [&Tracked<f32>; 3] {
        [&self.x, &self.y, &self.z]
    }

    fn axes_mut(&mut self) -> [&mut Tracked<f32>; 3] {
        [&mut self.x, &mut self.y, &mut self.z]
    }
}

impl SyncValue for Vector3 {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Largest quantised value for a tier of `bytes` bytes.
const fn rotation_max(bytes: u32) -> u64 {
    (1u64 << (8 * bytes)) - 1
}

/// Quantises an angle in degrees to `bytes` bytes of precision.
fn encode_rotation(field: &FieldContext<'_>, degrees: f32, bytes: u32) -> CodecResult<u64> {
    if !(0.0..=360.0).contains(&degrees) {
        return Err(CodecError::invalid_value(
            field.name(),
            ValueReason::AngleOutOfRange,
        ));
    }
    let max = rotation_max(bytes);
    Ok((f64::from(degrees) / 360.0 * max as f64).round() as u64)
}

fn decode_rotation(field: &FieldContext<'_>, value: u64, bytes: u32) -> CodecResult<f32> {
    let max = rotation_max(bytes);
    if value > max {
        return Err(CodecError::invalid_value(
            field.name(),
            ValueReason::QuantizedOutOfRange { value, max },
        ));
    }
    Ok((value as f64 / max as f64 * 360.0) as f32)
}

/// Serializer for [`Vector3`] fields.
#[derive(Debug, Clone, Copy)]
pub struct VectorSerializer {
    rotation: [Flag; 3],
}

impl VectorSerializer {
    /// Registers the rotation flags and builds the serializer.
    pub fn new() -> SchemaResult<Self> {
        Ok(Self {
            rotation: [
                Flag::register(ROTATION_FLAG_NAMES[0])?,
                Flag::register(ROTATION_FLAG_NAMES[1])?,
                Flag::register(ROTATION_FLAG_NAMES[2])?,
            ],
        })
    }

    /// Rotation tier in bytes, if any rotation flag is set.
    fn rotation_bytes(&self, flags: FlagSet) -> Option<u32> {
        self.rotation
            .iter()
            .zip(1u32..)
            .find_map(|(flag, bytes)| flags.contains(*flag).then_some(bytes))
    }
}

impl Serializer for VectorSerializer {
    fn name(&self) -> &'static str {
        "vector"
    }

    fn supports(&self, ty: &ValueType) -> bool {
        matches!(ty, ValueType::Custom(name) if name == VECTOR3_TYPE)
    }

    fn validate_flags(&self, field: &FieldContext<'_>) -> CodecResult<()> {
        let set: Vec<_> = self
            .rotation
            .iter()
            .filter(|flag| field.flags().contains(**flag))
            .map(|flag| flag.name())
            .collect();
        if set.len() > 1 {
            return Err(CodecError::FlagConflict {
                field: field.name().to_owned(),
                flags: set,
            });
        }
        Ok(())
    }

    fn size(
        &self,
        field: &FieldContext<'_>,
        value: &dyn SyncValue,
        state: &mut WriteState,
    ) -> CodecResult<()> {
        let vector = field.downcast::<Vector3>(value)?;
        state.register_header_bits(3);
        match self.rotation_bytes(field.flags()) {
            Some(bytes) => {
                for axis in vector.axes().into_iter().filter(|a| a.is_dirty()) {
                    // Out-of-range angles are rejected by `write`.
                    let quantised = encode_rotation(field, *axis.get(), bytes)
                        .unwrap_or_else(|_| rotation_max(bytes));
                    state.register_varint(quantised);
                }
            }
            None => {
                let component = field.with_ty(&COMPONENT_TYPE);
                for axis in vector.axes() {
                    let mut scratch = WriteState::new();
                    component.size(axis.get(), &mut scratch)?;
                    state.merge_bits(&scratch);
                    if axis.is_dirty() {
                        state.register_bytes(scratch.data_bytes());
                    }
                }
            }
        }
        Ok(())
    }

    fn write(
        &self,
        field: &FieldContext<'_>,
        value: &mut dyn SyncValue,
        out: &mut BitBufferWriter<'_>,
    ) -> CodecResult<()> {
        let rotation = self.rotation_bytes(field.flags());
        let component = field.with_ty(&COMPONENT_TYPE);
        let vector = field.downcast_mut::<Vector3>(value)?;
        for axis in vector.axes_mut() {
            let dirty = axis.is_dirty();
            out.write_header_bit(dirty)?;
            if !dirty {
                continue;
            }
            match rotation {
                Some(bytes) => out.write_varint(encode_rotation(field, *axis.get(), bytes)?)?,
                None => {
                    let mut raw = *axis.get();
                    component.write(&mut raw, out)?;
                }
            }
        }
        Ok(())
    }

    fn commit(&self, field: &FieldContext<'_>, value: &mut dyn SyncValue) -> CodecResult<()> {
        field.downcast_mut::<Vector3>(value)?.clear_dirty();
        Ok(())
    }

    fn read(
        &self,
        field: &FieldContext<'_>,
        value: &mut dyn SyncValue,
        input: &mut BitBufferReader<'_>,
    ) -> CodecResult<()> {
        let rotation = self.rotation_bytes(field.flags());
        let component = field.with_ty(&COMPONENT_TYPE);
        let vector = field.downcast_mut::<Vector3>(value)?;
        for axis in vector.axes_mut() {
            if input.read_header_bit()? {
                let decoded = match rotation {
                    Some(bytes) => decode_rotation(field, input.read_varint()?, bytes)?,
                    None => {
                        let mut raw = 0.0f32;
                        component.read(&mut raw, input)?;
                        raw
                    }
                };
                axis.set(decoded);
            }
            axis.clear_dirty();
        }
        Ok(())
    }
}
