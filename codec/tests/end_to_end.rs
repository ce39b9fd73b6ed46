//! Full encode/decode through the coordinator.

use std::sync::{Arc, OnceLock};

use codec::{
    shared, CodecError, SerializerRegistry, SyncConfig, SyncHandler, Synced, Tracked, TypeSchema,
};
use schema::{Flag, FlagSet, TargetKind, ValueType};

#[derive(Debug, Default, Clone, PartialEq)]
struct Player {
    id: u32,
    health: Tracked<f32>,
    flags: bool,
}

impl Synced for Player {
    fn schema() -> &'static TypeSchema<Self> {
        static SCHEMA: OnceLock<TypeSchema<Player>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Self::builder("Player", TargetKind::Instance)
                .field("id", ValueType::U32, Flag::NO_COMPRESS.into(), |p| &p.id, |p| &mut p.id)
                .field(
                    "health",
                    ValueType::tracked(ValueType::F32),
                    FlagSet::empty(),
                    |p| &p.health,
                    |p| &mut p.health,
                )
                .field("flags", ValueType::Bool, FlagSet::empty(), |p| &p.flags, |p| &mut p.flags)
                .build()
                .unwrap()
        })
    }
}

#[derive(Debug, Default)]
struct Score {
    points: i64,
}

impl Synced for Score {
    fn schema() -> &'static TypeSchema<Self> {
        static SCHEMA: OnceLock<TypeSchema<Score>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Self::builder("Score", TargetKind::Type)
                .field(
                    "points",
                    ValueType::I64,
                    FlagSet::empty(),
                    |s| &s.points,
                    |s| &mut s.points,
                )
                .build()
                .unwrap()
        })
    }
}

fn handler() -> SyncHandler {
    SyncHandler::with_registry(
        Arc::new(SerializerRegistry::with_builtins()),
        SyncConfig::for_testing(),
    )
}

#[test]
fn player_scenario() {
    let server_player = shared(Player::default());
    let mut server = handler();
    server.register(server_player.clone());
    {
        let mut player = server_player.lock();
        player.id = 7;
        player.health.set(100.0);
        player.flags = true;
    }
    let payload = server.serialize().unwrap();
    assert!(!server_player.lock().health.is_dirty());

    let client_player = shared(Player::default());
    let mut client = handler();
    client.register(client_player.clone());
    assert_eq!(client.deserialize(&payload, 0).unwrap(), payload.len());

    let player = client_player.lock();
    assert_eq!(player.id, 7);
    assert_eq!(*player.health, 100.0);
    assert!(player.flags);
    assert!(!player.health.is_dirty());
}

#[test]
fn player_golden_bytes() {
    let server_player = shared(Player::default());
    let mut server = handler();
    server.register(server_player.clone());
    {
        let mut player = server_player.lock();
        player.id = 7;
        player.health.set(100.0);
        player.flags = true;
    }
    let payload = server.serialize().unwrap();
    // 100.0f32 = 0x42C8_0000, a 4-byte wide varint.
    assert_eq!(
        payload,
        vec![9, 0b0000_0011, 7, 0, 0, 0, 251, 0x00, 0x00, 0xC8, 0x42]
    );
}

#[test]
fn clean_tracked_field_keeps_receiver_value() {
    let server_player = shared(Player::default());
    let mut server = handler();
    server.register(server_player.clone());
    server_player.lock().health.set(50.0);
    let first = server.serialize().unwrap();

    let client_player = shared(Player::default());
    let mut client = handler();
    client.register(client_player.clone());
    client.deserialize(&first, 0).unwrap();

    server_player.lock().id = 9;
    let second = server.serialize().unwrap();
    assert!(second.len() < first.len());

    client_player.lock().health.set(75.0);
    client.deserialize(&second, 0).unwrap();
    let player = client_player.lock();
    assert_eq!(player.id, 9);
    assert_eq!(*player.health, 75.0);
    assert!(!player.health.is_dirty());
}

#[test]
fn targets_are_encoded_in_registration_order() {
    let player = shared(Player {
        id: 1,
        ..Player::default()
    });
    let score = shared(Score { points: -3 });
    let mut server = handler();
    server.register(player.clone());
    server.register(score.clone());
    let payload = server.serialize().unwrap();

    let client_player = shared(Player::default());
    let client_score = shared(Score::default());
    let mut client = handler();
    client.register(client_player.clone());
    client.register(client_score.clone());
    client.deserialize(&payload, 0).unwrap();
    assert_eq!(client_player.lock().id, 1);
    assert_eq!(client_score.lock().points, -3);

    assert!(server
        .schema_string()
        .ends_with("[type Score]{points i64}"));
}

#[test]
fn misaligned_offset_preserves_leading_bits() {
    let server_player = shared(Player {
        id: 0xDEAD_BEEF,
        flags: true,
        ..Player::default()
    });
    let mut server = handler();
    server.register(server_player.clone());
    let needed = server.encoded_len().unwrap() + 1;
    let mut buf = vec![0u8; needed];
    buf[0] = 0b101;
    let written = server.serialize_into(&mut buf, 3).unwrap();
    assert_eq!(buf[0] & 0b111, 0b101);

    let client_player = shared(Player::default());
    let mut client = handler();
    client.register(client_player.clone());
    assert_eq!(client.deserialize(&buf[..written], 3).unwrap(), written);
    assert_eq!(client_player.lock().id, 0xDEAD_BEEF);
    assert!(client_player.lock().flags);
}

#[test]
fn truncated_payload_is_an_error() {
    let server_player = shared(Player {
        id: 5,
        ..Player::default()
    });
    let mut server = handler();
    server.register(server_player);
    let payload = server.serialize().unwrap();

    let mut client = handler();
    client.register(shared(Player::default()));
    for len in 0..payload.len() {
        let err = client.deserialize(&payload[..len], 0).unwrap_err();
        assert!(matches!(err, CodecError::Bitstream(_)), "len {len}: {err}");
    }
}

#[test]
fn output_buffer_too_small_is_rejected() {
    let mut server = handler();
    server.register(shared(Player::default()));
    let mut buf = [0u8; 2];
    assert!(matches!(
        server.serialize_into(&mut buf, 0),
        Err(CodecError::Bitstream(bitstream::BitError::BufferTooSmall { .. }))
    ));
}
