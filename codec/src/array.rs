//! Built-in serializer for `Vec` of primitives.
//!
//! The length is a varint in the byte region unless the field has
//! `KnownSize`, in which case the receiver's resident length is used.
//! `bool` elements go to the data-bit region under `KnownSize` and are packed
//! eight per byte otherwise, so the bit regions never depend on a length.

use bitstream::{BitBufferReader, BitBufferWriter, WriteState};
use schema::{Flag, ValueType};

use crate::error::{CodecError, CodecResult};
use crate::primitive::{dispatch_scalar, Scalar};
use crate::serializer::{FieldContext, Serializer};
use crate::value::SyncValue;

fn element_type<'a>(field: &FieldContext<'a>) -> CodecResult<&'a ValueType> {
    match field.ty() {
        ValueType::Array(inner) if inner.is_primitive() => Ok(inner),
        other => Err(CodecError::UnsupportedType { ty: other.clone() }),
    }
}

fn known_size(field: &FieldContext<'_>) -> bool {
    field.flags().contains(Flag::KNOWN_SIZE)
}

/// Reads a length prefix, rejecting lengths the remaining bytes cannot hold
/// at `per_byte` elements per byte.
fn read_length(
    field: &FieldContext<'_>,
    input: &mut BitBufferReader<'_>,
    per_byte: usize,
) -> CodecResult<usize> {
    let claimed = input.read_varint()?;
    let available = input.bytes_remaining().saturating_mul(per_byte);
    match usize::try_from(claimed) {
        Ok(len) if len <= available => Ok(len),
        _ => Err(CodecError::LengthMismatch {
            field: field.name().to_owned(),
            claimed,
            available,
        }),
    }
}

fn size_array<T: Scalar>(
    field: &FieldContext<'_>,
    value: &dyn SyncValue,
    state: &mut WriteState,
) -> CodecResult<()>
where
    Vec<T>: SyncValue,
{
    let values = field.downcast::<Vec<T>>(value)?;
    if !known_size(field) {
        state.register_varint(values.len() as u64);
    }
    for element in values {
        element.size_value(field.flags(), state);
    }
    Ok(())
}

fn write_array<T: Scalar>(
    field: &FieldContext<'_>,
    value: &dyn SyncValue,
    out: &mut BitBufferWriter<'_>,
) -> CodecResult<()>
where
    Vec<T>: SyncValue,
{
    let values = field.downcast::<Vec<T>>(value)?;
    if !known_size(field) {
        out.write_varint(values.len() as u64)?;
    }
    for element in values {
        element.write_value(field.flags(), out)?;
    }
    Ok(())
}

fn read_array<T: Scalar>(
    field: &FieldContext<'_>,
    value: &mut dyn SyncValue,
    input: &mut BitBufferReader<'_>,
) -> CodecResult<()>
where
    Vec<T>: SyncValue,
{
    let values = field.downcast_mut::<Vec<T>>(value)?;
    if !known_size(field) {
        // Every non-bool element takes at least one byte.
        let len = read_length(field, input, 1)?;
        values.resize(len, T::default());
    }
    for element in values.iter_mut() {
        *element = T::read_value(field, input)?;
    }
    Ok(())
}

fn size_bools(field: &FieldContext<'_>, value: &dyn SyncValue, state: &mut WriteState) -> CodecResult<()> {
    let values = field.downcast::<Vec<bool>>(value)?;
    if known_size(field) {
        state.register_bits(values.len());
    } else {
        state
            .register_varint(values.len() as u64)
            .register_bytes(values.len().div_ceil(8));
    }
    Ok(())
}

fn write_bools(
    field: &FieldContext<'_>,
    value: &dyn SyncValue,
    out: &mut BitBufferWriter<'_>,
) -> CodecResult<()> {
    let values = field.downcast::<Vec<bool>>(value)?;
    if known_size(field) {
        for bit in values {
            out.write_bit(*bit)?;
        }
        return Ok(());
    }
    out.write_varint(values.len() as u64)?;
    for chunk in values.chunks(8) {
        let byte = chunk
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, bit)| acc | (u8::from(*bit) << i));
        out.write_u8(byte)?;
    }
    Ok(())
}

fn read_bools(
    field: &FieldContext<'_>,
    value: &mut dyn SyncValue,
    input: &mut BitBufferReader<'_>,
) -> CodecResult<()> {
    let values = field.downcast_mut::<Vec<bool>>(value)?;
    if known_size(field) {
        for bit in values.iter_mut() {
            *bit = input.read_bit()?;
        }
        return Ok(());
    }
    let len = read_length(field, input, 8)?;
    let packed = input.read_bytes(len.div_ceil(8))?;
    values.clear();
    values.extend((0..len).map(|i| packed[i / 8] & (1 << (i % 8)) != 0));
    Ok(())
}

/// Serializer for `Vec<T>` with `T` any primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArraySerializer;

impl Serializer for ArraySerializer {
    fn name(&self) -> &'static str {
        "array"
    }

    fn supports(&self, ty: &ValueType) -> bool {
        matches!(ty, ValueType::Array(inner) if inner.is_primitive())
    }

    fn size(
        &self,
        field: &FieldContext<'_>,
        value: &dyn SyncValue,
        state: &mut WriteState,
    ) -> CodecResult<()> {
        match element_type(field)? {
            ValueType::Bool => size_bools(field, value, state),
            inner => dispatch_scalar!(inner, size_array(field, value, state)),
        }
    }

    fn write(
        &self,
        field: &FieldContext<'_>,
        value: &mut dyn SyncValue,
        out: &mut BitBufferWriter<'_>,
    ) -> CodecResult<()> {
        match element_type(field)? {
            ValueType::Bool => write_bools(field, value, out),
            inner => dispatch_scalar!(inner, write_array(field, value, out)),
        }
    }

    fn read(
        &self,
        field: &FieldContext<'_>,
        value: &mut dyn SyncValue,
        input: &mut BitBufferReader<'_>,
    ) -> CodecResult<()> {
        match element_type(field)? {
            ValueType::Bool => read_bools(field, value, input),
            inner => dispatch_scalar!(inner, read_array(field, value, input)),
        }
    }
}
