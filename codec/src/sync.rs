//! The sync coordinator.
//!
//! A [`SyncHandler`] owns an ordered set of registered targets and runs the
//! size, write and read passes over them. Every pass walks targets in
//! registration order and their fields in schema order, so the encoder and
//! decoder reserve the same header and data bits without exchanging layout.

use std::fmt;
use std::sync::Arc;

use bitstream::{read_prefix, BitBufferReader, BitBufferWriter, BufferGeometry, WriteState};
use parking_lot::{Mutex, MutexGuard};
use schema::{CanonicalSchema, SchemaDigest};
use tracing::{debug, trace, warn};

use crate::config::SyncConfig;
use crate::error::{CodecError, CodecResult};
use crate::serializer::{FieldContext, SerializerRegistry};
use crate::target::SyncTarget;

/// A registered target, shared with the code that mutates it.
pub type SharedTarget = Arc<Mutex<dyn SyncTarget>>;

/// Wraps `target` for registration while keeping a typed handle.
pub fn shared<T>(target: T) -> Arc<Mutex<T>> {
    Arc::new(Mutex::new(target))
}

type Guards<'a> = Vec<MutexGuard<'a, dyn SyncTarget>>;

/// Encodes and decodes the fields of every registered target.
pub struct SyncHandler {
    targets: Vec<SharedTarget>,
    registry: Arc<SerializerRegistry>,
    config: SyncConfig,
}

impl Default for SyncHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SyncHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncHandler")
            .field("targets", &self.targets.len())
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

impl SyncHandler {
    /// Handler using the global registry and the default config.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    #[must_use]
    pub fn with_config(config: SyncConfig) -> Self {
        Self::with_registry(SerializerRegistry::global(), config)
    }

    #[must_use]
    pub fn with_registry(registry: Arc<SerializerRegistry>, config: SyncConfig) -> Self {
        Self {
            targets: Vec::new(),
            registry,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &SerializerRegistry {
        &self.registry
    }

    /// Appends `target`; returns `false` if it is already registered.
    pub fn register(&mut self, target: SharedTarget) -> bool {
        if self.contains(&target) {
            return false;
        }
        self.targets.push(target);
        true
    }

    /// Removes `target`; returns `false` if it was not registered.
    pub fn unregister<T: SyncTarget + ?Sized>(&mut self, target: &Arc<Mutex<T>>) -> bool {
        let before = self.targets.len();
        self.targets
            .retain(|existing| !std::ptr::addr_eq(Arc::as_ptr(existing), Arc::as_ptr(target)));
        self.targets.len() != before
    }

    /// Whether `target` (by identity) is registered.
    pub fn contains<T: SyncTarget + ?Sized>(&self, target: &Arc<Mutex<T>>) -> bool {
        self.targets
            .iter()
            .any(|existing| std::ptr::addr_eq(Arc::as_ptr(existing), Arc::as_ptr(target)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Size of the buffer [`serialize`](Self::serialize) would produce right now.
    pub fn encoded_len(&self) -> CodecResult<usize> {
        let guards = self.lock_targets();
        Ok(self.size_pass(&guards)?.geometry(0).total_len())
    }

    /// Encodes all registered targets into a new buffer and clears their
    /// dirty flags.
    ///
    /// Dirty flags are only cleared once every field was written, so a
    /// failed pass leaves all pending changes in place for the next attempt.
    pub fn serialize(&self) -> CodecResult<Vec<u8>> {
        let mut guards = self.lock_targets();
        let geometry = self.plan(&guards, 0)?;
        let mut out = vec![0u8; geometry.total_len()];
        self.write_pass(&mut guards, &mut out, geometry)?;
        Ok(out)
    }

    /// Encodes into `out` starting at `bit_offset`, leaving earlier bits
    /// untouched. Returns the number of bytes of `out` spanned.
    pub fn serialize_into(&self, out: &mut [u8], bit_offset: usize) -> CodecResult<usize> {
        let mut guards = self.lock_targets();
        let geometry = self.plan(&guards, bit_offset)?;
        self.write_pass(&mut guards, out, geometry)
    }

    /// Decodes `bytes` (starting at `bit_offset`) into the registered targets.
    ///
    /// Returns the number of bytes of `bytes` spanned by the payload.
    pub fn deserialize(&self, bytes: &[u8], bit_offset: usize) -> CodecResult<usize> {
        let (byte_len, _) = read_prefix(bytes, bit_offset)?;
        let limit = self.config.max_payload_bytes;
        if usize::try_from(byte_len).map_or(true, |len| len > limit) {
            return Err(CodecError::PayloadTooLarge {
                size: usize::try_from(byte_len).unwrap_or(usize::MAX),
                limit,
            });
        }

        let mut guards = self.lock_targets();
        let state = self.size_pass(&guards)?;
        let mut input =
            BitBufferReader::open(bytes, bit_offset, state.header_bits(), state.data_bits())?;
        for target in &mut guards {
            let owner = target.type_name().to_owned();
            for index in 0..target.field_count() {
                let Some((info, value)) = target.field_mut(index) else {
                    continue;
                };
                trace!(owner = %owner, field = %info.name, ty = %info.ty, "read field");
                FieldContext::new(&self.registry, info).read(value, &mut input)?;
            }
        }
        let (header_bits, bytes_read) = (input.header_bits_read(), input.bytes_read());
        let total = input.finish()?;
        debug!(
            targets = guards.len(),
            header_bits,
            data_bits = state.data_bits(),
            data_bytes = bytes_read,
            total_bytes = total,
            "decoded sync payload"
        );
        Ok(total)
    }

    /// Checks `peer_digest` against the local schema, then decodes.
    pub fn deserialize_checked(
        &self,
        bytes: &[u8],
        bit_offset: usize,
        peer_digest: &[u8],
    ) -> CodecResult<usize> {
        let local = self.schema_digest();
        if !local.matches(peer_digest) {
            let found = SchemaDigest::from_bytes(peer_digest).to_hex();
            warn!(expected = %local.to_hex(), found = %found, "schema digest mismatch");
            return Err(CodecError::SchemaMismatch {
                expected: local.to_hex(),
                found,
            });
        }
        self.deserialize(bytes, bit_offset)
    }

    /// Canonical description of every registered field, as fed to the digest.
    #[must_use]
    pub fn schema_string(&self) -> String {
        self.canonical().as_str().to_owned()
    }

    #[must_use]
    pub fn schema_digest(&self) -> SchemaDigest {
        self.canonical().digest()
    }

    /// Whether a peer's digest equals ours.
    #[must_use]
    pub fn matches_schema(&self, digest: &[u8]) -> bool {
        self.schema_digest().matches(digest)
    }

    fn canonical(&self) -> CanonicalSchema {
        let mut canonical = CanonicalSchema::new(self.config.digest_mode);
        for target in &self.targets {
            let target = target.lock();
            canonical.target(target.kind(), target.type_name());
            for info in (0..target.field_count()).filter_map(|i| target.field_info(i)) {
                canonical.field(info);
            }
        }
        canonical
    }

    fn lock_targets(&self) -> Guards<'_> {
        self.targets.iter().map(|target| target.lock()).collect()
    }

    fn size_pass(&self, guards: &Guards<'_>) -> CodecResult<WriteState> {
        let mut state = WriteState::new();
        for target in guards {
            for index in 0..target.field_count() {
                let Some((info, value)) = target.field(index) else {
                    continue;
                };
                FieldContext::new(&self.registry, info).size(value, &mut state)?;
            }
        }
        Ok(state)
    }

    fn plan(&self, guards: &Guards<'_>, bit_offset: usize) -> CodecResult<BufferGeometry> {
        let geometry = self.size_pass(guards)?.geometry(bit_offset);
        let limit = self.config.max_payload_bytes;
        if geometry.total_len() > limit {
            return Err(CodecError::PayloadTooLarge {
                size: geometry.total_len(),
                limit,
            });
        }
        Ok(geometry)
    }

    fn write_pass(
        &self,
        guards: &mut Guards<'_>,
        out: &mut [u8],
        geometry: BufferGeometry,
    ) -> CodecResult<usize> {
        let mut writer = BitBufferWriter::new(out, geometry)?;
        for target in guards.iter_mut() {
            let owner = target.type_name().to_owned();
            for index in 0..target.field_count() {
                let Some((info, value)) = target.field_mut(index) else {
                    continue;
                };
                trace!(owner = %owner, field = %info.name, ty = %info.ty, "write field");
                FieldContext::new(&self.registry, info).write(value, &mut writer)?;
            }
        }
        let total = writer.finish()?;
        for target in guards.iter_mut() {
            for index in 0..target.field_count() {
                let Some((info, value)) = target.field_mut(index) else {
                    continue;
                };
                FieldContext::new(&self.registry, info).commit(value)?;
            }
        }
        debug!(
            targets = guards.len(),
            header_bits = geometry.header_bits(),
            data_bits = geometry.data_bits(),
            data_bytes = geometry.byte_len(),
            total_bytes = total,
            "encoded sync payload"
        );
        Ok(total)
    }
}
