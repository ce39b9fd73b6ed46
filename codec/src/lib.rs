//! Schema-driven delta sync encoding and decoding.
//!
//! This is the main codec crate. It ties the bit buffer from `bitstream` to
//! the field descriptions from `schema`:
//!
//! - Runtime values ([`SyncValue`]) and diff-tracked wrappers ([`Tracked`],
//!   [`TrackedArray`])
//! - Sync targets described by a static [`TypeSchema`]
//! - The three-phase [`Serializer`] contract and its [`SerializerRegistry`]
//! - The [`SyncHandler`] coordinator and its schema digest
//!
//! # Example
//!
//! ```
//! use std::sync::OnceLock;
//!
//! use codec::{shared, Synced, SyncHandler, Tracked, TypeSchema};
//! use schema::{Flag, FlagSet, TargetKind, ValueType};
//!
//! #[derive(Debug, Default)]
//! struct Player {
//!     id: u32,
//!     health: Tracked<f32>,
//! }
//!
//! impl Synced for Player {
//!     fn schema() -> &'static TypeSchema<Self> {
//!         static SCHEMA: OnceLock<TypeSchema<Player>> = OnceLock::new();
//!         SCHEMA.get_or_init(|| {
//!             Self::builder("Player", TargetKind::Instance)
//!                 .field("id", ValueType::U32, Flag::NO_COMPRESS.into(), |p| &p.id, |p| &mut p.id)
//!                 .field(
//!                     "health",
//!                     ValueType::tracked(ValueType::F32),
//!                     FlagSet::empty(),
//!                     |p| &p.health,
//!                     |p| &mut p.health,
//!                 )
//!                 .build()
//!                 .expect("valid schema")
//!         })
//!     }
//! }
//!
//! let server_player = shared(Player::default());
//! let mut server = SyncHandler::new();
//! server.register(server_player.clone());
//! {
//!     let mut player = server_player.lock();
//!     player.id = 7;
//!     player.health.set(100.0);
//! }
//! let payload = server.serialize().unwrap();
//!
//! let client_player = shared(Player::default());
//! let mut client = SyncHandler::new();
//! client.register(client_player.clone());
//! assert!(client.matches_schema(server.schema_digest().as_bytes()));
//! client.deserialize(&payload, 0).unwrap();
//!
//! let player = client_player.lock();
//! assert_eq!(player.id, 7);
//! assert_eq!(*player.health, 100.0);
//! ```
//!
//! # Design Principles
//!
//! - **Two passes** - Sizes are computed before anything is written; a write
//!   that outruns its reservation is an error, never a silent truncation.
//! - **Schema-fixed layout** - Header and data bit counts depend only on the
//!   schema, so both peers agree on them without sending them.
//! - **Explicit registration** - Serializers and flags are registered up
//!   front; nothing is discovered by reflection.

mod array;
mod config;
mod diff;
mod error;
mod primitive;
mod serializer;
mod sync;
mod target;
mod tracked;
mod value;
mod vector;

pub use array::ArraySerializer;
pub use config::SyncConfig;
pub use diff::TrackedSerializer;
pub use error::{CodecError, CodecResult, ValueReason};
pub use primitive::PrimitiveSerializer;
pub use serializer::{FieldContext, RegistryBuilder, Serializer, SerializerRegistry};
pub use sync::{shared, SharedTarget, SyncHandler};
pub use target::{
    FieldDescriptor, FieldGetter, FieldGetterMut, SyncTarget, Synced, TypeSchema,
    TypeSchemaBuilder,
};
pub use tracked::{Tracked, TrackedArray};
pub use value::{DiffTracked, DiffTrackedSlots, SyncValue};
pub use vector::{Vector3, VectorSerializer, ROTATION_FLAG_NAMES, VECTOR3_TYPE};

pub use bitstream::{BitError, Region, WriteState};
pub use schema::{DigestMode, FieldInfo, Flag, FlagSet, SchemaDigest, TargetKind, ValueType};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_api_exports() {
        let _ = SyncConfig::default();
        let _ = SyncHandler::with_registry(
            std::sync::Arc::new(SerializerRegistry::with_builtins()),
            SyncConfig::unlimited(),
        );
        let _ = RegistryBuilder::with_builtins().build();
        let _ = Tracked::new(1u8);
        let _ = TrackedArray::filled(0i32, 4);
        let _ = Vector3::new(0.0, 0.0, 0.0);
        let _ = WriteState::new();

        // Error types
        let _: CodecResult<()> = Ok(());
    }

    #[test]
    fn builtin_serializer_order() {
        let registry = SerializerRegistry::with_builtins();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["primitive", "array", "tracked"]
        );
    }
}
