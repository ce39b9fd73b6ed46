#![no_main]

use std::sync::{Arc, OnceLock};

use codec::{
    shared, SerializerRegistry, SyncConfig, SyncHandler, Synced, Tracked, TrackedArray, TypeSchema,
};
use libfuzzer_sys::fuzz_target;
use schema::{Flag, FlagSet, TargetKind, ValueType};

#[derive(Debug)]
struct Target {
    id: u32,
    health: Tracked<f32>,
    cells: TrackedArray<i16>,
    names: Vec<u8>,
    bits: Vec<bool>,
}

impl Default for Target {
    fn default() -> Self {
        Self {
            id: 0,
            health: Tracked::new(0.0),
            cells: TrackedArray::filled(0, 5),
            names: Vec::new(),
            bits: Vec::new(),
        }
    }
}

impl Synced for Target {
    fn schema() -> &'static TypeSchema<Self> {
        static SCHEMA: OnceLock<TypeSchema<Target>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Self::builder("Target", TargetKind::Instance)
                .field("id", ValueType::U32, Flag::NO_COMPRESS.into(), |t| &t.id, |t| &mut t.id)
                .field(
                    "health",
                    ValueType::tracked(ValueType::F32),
                    FlagSet::empty(),
                    |t| &t.health,
                    |t| &mut t.health,
                )
                .field(
                    "cells",
                    ValueType::tracked_array(ValueType::I16, 5),
                    FlagSet::empty(),
                    |t| &t.cells,
                    |t| &mut t.cells,
                )
                .field(
                    "names",
                    ValueType::array(ValueType::U8),
                    FlagSet::empty(),
                    |t| &t.names,
                    |t| &mut t.names,
                )
                .field(
                    "bits",
                    ValueType::array(ValueType::Bool),
                    FlagSet::empty(),
                    |t| &t.bits,
                    |t| &mut t.bits,
                )
                .build()
                .expect("fuzz schema")
        })
    }
}

fuzz_target!(|data: &[u8]| {
    let Some((&offset, payload)) = data.split_first() else {
        return;
    };
    let mut sync = SyncHandler::with_registry(
        Arc::new(SerializerRegistry::with_builtins()),
        SyncConfig::for_testing(),
    );
    sync.register(shared(Target::default()));
    let _ = sync.deserialize(payload, usize::from(offset % 8));
});
