//! A serializer whose size pass disagrees with its write pass is caught.

use std::sync::{Arc, OnceLock};

use bitstream::{BitBufferReader, BitBufferWriter, BitError, Region, WriteState};
use codec::{
    shared, CodecError, CodecResult, FieldContext, RegistryBuilder, Serializer, SyncConfig,
    SyncHandler, SyncValue, Synced, Tracked, TypeSchema,
};
use schema::{FlagSet, TargetKind, ValueType};

/// Stores a `u16` as fixed bytes but reports a configurable size.
#[derive(Debug)]
struct Misreporting {
    reported: usize,
}

impl Serializer for Misreporting {
    fn name(&self) -> &'static str {
        "misreporting"
    }

    fn supports(&self, ty: &ValueType) -> bool {
        *ty == ValueType::custom("Word")
    }

    fn size(
        &self,
        _field: &FieldContext<'_>,
        _value: &dyn SyncValue,
        state: &mut WriteState,
    ) -> CodecResult<()> {
        state.register_bytes(self.reported);
        Ok(())
    }

    fn write(
        &self,
        field: &FieldContext<'_>,
        value: &mut dyn SyncValue,
        out: &mut BitBufferWriter<'_>,
    ) -> CodecResult<()> {
        let word = field.downcast::<u16>(value)?;
        out.write_u16(*word)?;
        Ok(())
    }

    fn read(
        &self,
        field: &FieldContext<'_>,
        value: &mut dyn SyncValue,
        input: &mut BitBufferReader<'_>,
    ) -> CodecResult<()> {
        *field.downcast_mut::<u16>(value)? = input.read_u16()?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Holder {
    word: u16,
}

impl Synced for Holder {
    fn schema() -> &'static TypeSchema<Self> {
        static SCHEMA: OnceLock<TypeSchema<Holder>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Self::builder("Holder", TargetKind::Instance)
                .field(
                    "word",
                    ValueType::custom("Word"),
                    FlagSet::empty(),
                    |h| &h.word,
                    |h| &mut h.word,
                )
                .build()
                .unwrap()
        })
    }
}

/// A tracked counter written before the misreported word.
#[derive(Debug, Default)]
struct Pair {
    count: Tracked<u32>,
    word: u16,
}

impl Synced for Pair {
    fn schema() -> &'static TypeSchema<Self> {
        static SCHEMA: OnceLock<TypeSchema<Pair>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Self::builder("Pair", TargetKind::Instance)
                .field(
                    "count",
                    ValueType::tracked(ValueType::U32),
                    FlagSet::empty(),
                    |p| &p.count,
                    |p| &mut p.count,
                )
                .field(
                    "word",
                    ValueType::custom("Word"),
                    FlagSet::empty(),
                    |p| &p.word,
                    |p| &mut p.word,
                )
                .build()
                .unwrap()
        })
    }
}

fn handler(reported: usize) -> SyncHandler {
    let registry = RegistryBuilder::with_builtins()
        .register(Misreporting { reported })
        .build();
    let mut sync = SyncHandler::with_registry(Arc::new(registry), SyncConfig::for_testing());
    sync.register(shared(Holder { word: 0xBEEF }));
    sync
}

#[test]
fn consistent_sizes_round_trip() {
    let payload = handler(2).serialize().unwrap();
    assert_eq!(payload, vec![2, 0xEF, 0xBE]);
}

#[test]
fn undersized_reservation_is_capacity_exceeded() {
    let err = handler(1).serialize().unwrap_err();
    assert!(err.is_capacity_exceeded());
    assert_eq!(
        err,
        CodecError::Bitstream(BitError::CapacityExceeded {
            region: Region::DataBytes,
            requested: 2,
            available: 1,
        })
    );
}

#[test]
fn failed_pass_keeps_pending_changes() {
    let registry = RegistryBuilder::with_builtins()
        .register(Misreporting { reported: 1 })
        .build();
    let mut sync = SyncHandler::with_registry(Arc::new(registry), SyncConfig::for_testing());
    let pair = shared(Pair::default());
    sync.register(pair.clone());
    pair.lock().count.set(7);

    assert!(sync.serialize().unwrap_err().is_capacity_exceeded());
    assert!(pair.lock().count.is_dirty());

    // With a correct reservation the retry carries the pending change.
    let registry = RegistryBuilder::with_builtins()
        .register(Misreporting { reported: 2 })
        .build();
    let mut retry = SyncHandler::with_registry(Arc::new(registry), SyncConfig::for_testing());
    retry.register(pair.clone());
    let payload = retry.serialize().unwrap();
    assert_eq!(payload, vec![3, 0b0000_0001, 7, 0, 0]);
    assert!(!pair.lock().count.is_dirty());
}

#[test]
fn oversized_reservation_is_underrun() {
    let err = handler(3).serialize().unwrap_err();
    assert_eq!(
        err,
        CodecError::Bitstream(BitError::ByteRegionUnderrun {
            expected: 3,
            written: 2,
        })
    );
}

#[test]
fn unknown_type_is_unsupported() {
    let mut sync = SyncHandler::with_registry(
        Arc::new(RegistryBuilder::with_builtins().build()),
        SyncConfig::for_testing(),
    );
    sync.register(shared(Holder::default()));
    assert_eq!(
        sync.serialize(),
        Err(CodecError::UnsupportedType {
            ty: ValueType::custom("Word"),
        })
    );
}
