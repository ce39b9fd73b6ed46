//! Built-in serializer for scalar primitives.
//!
//! | type | default | `NoCompress` |
//! |---|---|---|
//! | `bool` | 1 data bit | same |
//! | `u8`, `i8` | 1 byte | same |
//! | `i16`/`i32`/`i64` | zig-zag varint (plain with `NonNegative`) | fixed LE |
//! | `u16`/`u32`/`u64` | varint | fixed LE |
//! | `f32`/`f64` | varint of IEEE bits (`FloatEndianSwap` byte-swaps) | fixed LE |

use bitstream::{
    f32_from_raw, f32_to_raw, f64_from_raw, f64_to_raw, zigzag_encode, BitBufferReader,
    BitBufferWriter, BitResult, WriteState,
};
use schema::{Flag, FlagSet, ValueType};

use crate::error::{CodecError, CodecResult, ValueReason};
use crate::serializer::{FieldContext, Serializer};
use crate::value::SyncValue;

/// Encoding of one primitive Rust type.
pub(crate) trait Scalar: SyncValue + Copy + Default {
    fn size_value(self, flags: FlagSet, state: &mut WriteState);

    fn write_value(self, flags: FlagSet, out: &mut BitBufferWriter<'_>) -> BitResult<()>;

    fn read_value(field: &FieldContext<'_>, input: &mut BitBufferReader<'_>) -> CodecResult<Self>;
}

impl Scalar for bool {
    fn size_value(self, _: FlagSet, state: &mut WriteState) {
        state.register_bits(1);
    }

    fn write_value(self, _: FlagSet, out: &mut BitBufferWriter<'_>) -> BitResult<()> {
        out.write_bit(self)
    }

    fn read_value(_: &FieldContext<'_>, input: &mut BitBufferReader<'_>) -> CodecResult<Self> {
        Ok(input.read_bit()?)
    }
}

impl Scalar for u8 {
    fn size_value(self, _: FlagSet, state: &mut WriteState) {
        state.register_bytes(1);
    }

    fn write_value(self, _: FlagSet, out: &mut BitBufferWriter<'_>) -> BitResult<()> {
        out.write_u8(self)
    }

    fn read_value(_: &FieldContext<'_>, input: &mut BitBufferReader<'_>) -> CodecResult<Self> {
        Ok(input.read_u8()?)
    }
}

impl Scalar for i8 {
    fn size_value(self, _: FlagSet, state: &mut WriteState) {
        state.register_bytes(1);
    }

    fn write_value(self, _: FlagSet, out: &mut BitBufferWriter<'_>) -> BitResult<()> {
        out.write_i8(self)
    }

    fn read_value(_: &FieldContext<'_>, input: &mut BitBufferReader<'_>) -> CodecResult<Self> {
        Ok(input.read_i8()?)
    }
}

const fn signed_raw(value: i64, non_negative: bool) -> u64 {
    if non_negative {
        value as u64
    } else {
        zigzag_encode(value)
    }
}

macro_rules! impl_signed {
    ($($t:ty),* $(,)?) => {
        $(
            impl Scalar for $t {
                fn size_value(self, flags: FlagSet, state: &mut WriteState) {
                    if flags.contains(Flag::NO_COMPRESS) {
                        state.register_bytes(std::mem::size_of::<$t>());
                    } else {
                        state.register_varint(signed_raw(
                            i64::from(self),
                            flags.contains(Flag::NON_NEGATIVE),
                        ));
                    }
                }

                fn write_value(self, flags: FlagSet, out: &mut BitBufferWriter<'_>) -> BitResult<()> {
                    if flags.contains(Flag::NO_COMPRESS) {
                        out.write_bytes(&self.to_le_bytes())
                    } else {
                        out.write_packed_i64(i64::from(self), flags.contains(Flag::NON_NEGATIVE))
                    }
                }

                fn read_value(
                    field: &FieldContext<'_>,
                    input: &mut BitBufferReader<'_>,
                ) -> CodecResult<Self> {
                    if field.flags().contains(Flag::NO_COMPRESS) {
                        return Ok(<$t>::from_le_bytes(input.read_array()?));
                    }
                    let wide = input.read_packed_i64(field.flags().contains(Flag::NON_NEGATIVE))?;
                    <$t>::try_from(wide).map_err(|_| {
                        CodecError::invalid_value(
                            field.name(),
                            ValueReason::OutOfRange { raw: wide as u64 },
                        )
                    })
                }
            }
        )*
    };
}

macro_rules! impl_unsigned {
    ($($t:ty),* $(,)?) => {
        $(
            impl Scalar for $t {
                fn size_value(self, flags: FlagSet, state: &mut WriteState) {
                    if flags.contains(Flag::NO_COMPRESS) {
                        state.register_bytes(std::mem::size_of::<$t>());
                    } else {
                        state.register_varint(u64::from(self));
                    }
                }

                fn write_value(self, flags: FlagSet, out: &mut BitBufferWriter<'_>) -> BitResult<()> {
                    if flags.contains(Flag::NO_COMPRESS) {
                        out.write_bytes(&self.to_le_bytes())
                    } else {
                        out.write_varint(u64::from(self))
                    }
                }

                fn read_value(
                    field: &FieldContext<'_>,
                    input: &mut BitBufferReader<'_>,
                ) -> CodecResult<Self> {
                    if field.flags().contains(Flag::NO_COMPRESS) {
                        return Ok(<$t>::from_le_bytes(input.read_array()?));
                    }
                    let raw = input.read_varint()?;
                    <$t>::try_from(raw).map_err(|_| {
                        CodecError::invalid_value(field.name(), ValueReason::OutOfRange { raw })
                    })
                }
            }
        )*
    };
}

impl_signed!(i16, i32, i64);
impl_unsigned!(u16, u32, u64);

impl Scalar for f32 {
    fn size_value(self, flags: FlagSet, state: &mut WriteState) {
        if flags.contains(Flag::NO_COMPRESS) {
            state.register_bytes(4);
        } else {
            state.register_varint(f32_to_raw(self, flags.contains(Flag::FLOAT_ENDIAN_SWAP)));
        }
    }

    fn write_value(self, flags: FlagSet, out: &mut BitBufferWriter<'_>) -> BitResult<()> {
        if flags.contains(Flag::NO_COMPRESS) {
            out.write_f32(self)
        } else {
            out.write_packed_f32(self, flags.contains(Flag::FLOAT_ENDIAN_SWAP))
        }
    }

    fn read_value(field: &FieldContext<'_>, input: &mut BitBufferReader<'_>) -> CodecResult<Self> {
        if field.flags().contains(Flag::NO_COMPRESS) {
            return Ok(input.read_f32()?);
        }
        let raw = input.read_varint()?;
        if raw > u64::from(u32::MAX) {
            return Err(CodecError::invalid_value(
                field.name(),
                ValueReason::OutOfRange { raw },
            ));
        }
        Ok(f32_from_raw(raw, field.flags().contains(Flag::FLOAT_ENDIAN_SWAP)))
    }
}

impl Scalar for f64 {
    fn size_value(self, flags: FlagSet, state: &mut WriteState) {
        if flags.contains(Flag::NO_COMPRESS) {
            state.register_bytes(8);
        } else {
            state.register_varint(f64_to_raw(self, flags.contains(Flag::FLOAT_ENDIAN_SWAP)));
        }
    }

    fn write_value(self, flags: FlagSet, out: &mut BitBufferWriter<'_>) -> BitResult<()> {
        if flags.contains(Flag::NO_COMPRESS) {
            out.write_f64(self)
        } else {
            out.write_packed_f64(self, flags.contains(Flag::FLOAT_ENDIAN_SWAP))
        }
    }

    fn read_value(field: &FieldContext<'_>, input: &mut BitBufferReader<'_>) -> CodecResult<Self> {
        if field.flags().contains(Flag::NO_COMPRESS) {
            return Ok(input.read_f64()?);
        }
        let raw = input.read_varint()?;
        Ok(f64_from_raw(raw, field.flags().contains(Flag::FLOAT_ENDIAN_SWAP)))
    }
}

/// Calls `$f::<T>($args..)` with `T` the Rust type for a primitive
/// [`ValueType`], or fails with `UnsupportedType`.
macro_rules! dispatch_scalar {
    ($ty:expr, $f:ident($($arg:expr),* $(,)?)) => {
        match $ty {
            ::schema::ValueType::Bool => $f::<bool>($($arg),*),
            ::schema::ValueType::U8 => $f::<u8>($($arg),*),
            ::schema::ValueType::I8 => $f::<i8>($($arg),*),
            ::schema::ValueType::I16 => $f::<i16>($($arg),*),
            ::schema::ValueType::U16 => $f::<u16>($($arg),*),
            ::schema::ValueType::I32 => $f::<i32>($($arg),*),
            ::schema::ValueType::U32 => $f::<u32>($($arg),*),
            ::schema::ValueType::I64 => $f::<i64>($($arg),*),
            ::schema::ValueType::U64 => $f::<u64>($($arg),*),
            ::schema::ValueType::F32 => $f::<f32>($($arg),*),
            ::schema::ValueType::F64 => $f::<f64>($($arg),*),
            other => Err($crate::error::CodecError::UnsupportedType { ty: other.clone() }),
        }
    };
}
pub(crate) use dispatch_scalar;

fn size_scalar<T: Scalar>(
    field: &FieldContext<'_>,
    value: &dyn SyncValue,
    state: &mut WriteState,
) -> CodecResult<()> {
    field.downcast::<T>(value)?.size_value(field.flags(), state);
    Ok(())
}

fn write_scalar<T: Scalar>(
    field: &FieldContext<'_>,
    value: &dyn SyncValue,
    out: &mut BitBufferWriter<'_>,
) -> CodecResult<()> {
    field.downcast::<T>(value)?.write_value(field.flags(), out)?;
    Ok(())
}

fn read_scalar<T: Scalar>(
    field: &FieldContext<'_>,
    value: &mut dyn SyncValue,
    input: &mut BitBufferReader<'_>,
) -> CodecResult<()> {
    let slot = field.downcast_mut::<T>(value)?;
    *slot = T::read_value(field, input)?;
    Ok(())
}

/// Serializer for `bool`, the integer types, `f32` and `f64`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimitiveSerializer;

impl Serializer for PrimitiveSerializer {
    fn name(&self) -> &'static str {
        "primitive"
    }

    fn supports(&self, ty: &ValueType) -> bool {
        ty.is_primitive()
    }

    fn size(
        &self,
        field: &FieldContext<'_>,
        value: &dyn SyncValue,
        state: &mut WriteState,
    ) -> CodecResult<()> {
        dispatch_scalar!(field.ty(), size_scalar(field, value, state))
    }

    fn write(
        &self,
        field: &FieldContext<'_>,
        value: &mut dyn SyncValue,
        out: &mut BitBufferWriter<'_>,
    ) -> CodecResult<()> {
        dispatch_scalar!(field.ty(), write_scalar(field, value, out))
    }

    fn read(
        &self,
        field: &FieldContext<'_>,
        value: &mut dyn SyncValue,
        input: &mut BitBufferReader<'_>,
    ) -> CodecResult<()> {
        dispatch_scalar!(field.ty(), read_scalar(field, value, input))
    }
}

#[cfg(test)]
mod tests {
    use schema::FieldInfo;

    use super::*;
    use crate::SerializerRegistry;

    trait Typed: Scalar + std::fmt::Debug + PartialEq {
        const TYPE: ValueType;
    }

    macro_rules! typed {
        ($($t:ty => $variant:ident),*) => {
            $(impl Typed for $t {
                const TYPE: ValueType = ValueType::$variant;
            })*
        };
    }

    typed!(bool => Bool, i16 => I16, i32 => I32, i64 => I64, u16 => U16, u32 => U32, f32 => F32, f64 => F64);

    fn roundtrip<T: Typed>(value: T, flags: FlagSet) -> (T, usize) {
        let registry = SerializerRegistry::with_builtins();
        let info = FieldInfo::new("f", T::TYPE, flags);
        let field = FieldContext::new(&registry, &info);

        let mut state = WriteState::new();
        field.size(&value, &mut state).unwrap();
        let geometry = state.geometry(0);
        let mut buf = vec![0u8; geometry.total_len()];
        let mut writer = BitBufferWriter::new(&mut buf, geometry).unwrap();
        let mut source = value;
        field.write(&mut source, &mut writer).unwrap();
        writer.finish().unwrap();

        let mut reader =
            BitBufferReader::open(&buf, 0, state.header_bits(), state.data_bits()).unwrap();
        let mut decoded = T::default();
        field.read(&mut decoded, &mut reader).unwrap();
        reader.finish().unwrap();
        (decoded, state.data_bytes())
    }

    #[test]
    fn integers_default_to_varints() {
        assert_eq!(roundtrip(-1i32, FlagSet::empty()), (-1, 1));
        assert_eq!(roundtrip(300u32, FlagSet::empty()), (300, 2));
        assert_eq!(roundtrip(i64::MIN, FlagSet::empty()), (i64::MIN, 9));
        assert_eq!(roundtrip(u16::MAX, FlagSet::empty()), (u16::MAX, 3));
    }

    #[test]
    fn no_compress_is_fixed_width() {
        let flags = Flag::NO_COMPRESS.into();
        assert_eq!(roundtrip(7u32, flags), (7, 4));
        assert_eq!(roundtrip(-7i16, flags), (-7, 2));
        assert_eq!(roundtrip(1.5f64, flags), (1.5, 8));
    }

    #[test]
    fn non_negative_skips_zigzag() {
        let flags = Flag::NON_NEGATIVE.into();
        assert_eq!(roundtrip(200i32, flags), (200, 1));
        assert_eq!(roundtrip(200i32, FlagSet::empty()), (200, 2));
        // Still lossless for negatives, at full width.
        assert_eq!(roundtrip(-1i16, flags), (-1, 9));
    }

    #[test]
    fn floats_roundtrip_bit_exact() {
        for flags in [FlagSet::empty(), Flag::FLOAT_ENDIAN_SWAP.into()] {
            for value in [0.0f32, -0.0, 100.0, f32::MIN_POSITIVE, f32::INFINITY] {
                let (decoded, _) = roundtrip(value, flags);
                assert_eq!(decoded.to_bits(), value.to_bits());
            }
            let (nan, _) = roundtrip(f64::NAN, flags);
            assert!(nan.is_nan());
        }
        assert_eq!(roundtrip(100.0f32, Flag::FLOAT_ENDIAN_SWAP.into()).1, 3);
    }

    #[test]
    fn bool_uses_a_data_bit() {
        assert_eq!(roundtrip(true, FlagSet::empty()), (true, 0));
    }

    #[test]
    fn wrong_rust_type_is_type_mismatch() {
        let registry = SerializerRegistry::with_builtins();
        let info = FieldInfo::new("hp", ValueType::U32, FlagSet::empty());
        let field = FieldContext::new(&registry, &info);
        let mut state = WriteState::new();
        assert_eq!(
            field.size(&5i32, &mut state),
            Err(CodecError::TypeMismatch {
                field: "hp".into(),
                expected: ValueType::U32
            })
        );
    }

    #[test]
    fn oversized_varint_is_rejected_on_read() {
        let registry = SerializerRegistry::with_builtins();
        let info = FieldInfo::new("small", ValueType::U16, FlagSet::empty());
        let field = FieldContext::new(&registry, &info);
        // Prefix 4, then varint 70000 in the wide tier.
        let bytes = [4u8, 250, 0x70, 0x11, 0x01];
        let mut reader = BitBufferReader::open(&bytes, 0, 0, 0).unwrap();
        let mut value = 0u16;
        assert!(matches!(
            field.read(&mut value, &mut reader),
            Err(CodecError::InvalidValue {
                reason: ValueReason::OutOfRange { raw: 70_000 },
                ..
            })
        ));
    }
}
