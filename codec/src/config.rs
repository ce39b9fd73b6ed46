//! Configuration for the sync coordinator.

use schema::DigestMode;

/// Limits and options applied by [`SyncHandler`](crate::SyncHandler).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Largest buffer, in bytes, an encode may produce or a decode may accept.
    pub max_payload_bytes: usize,
    /// Which parts of the schema feed the digest.
    pub digest_mode: DigestMode,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: 64 * 1024,
            digest_mode: DigestMode::Strict,
        }
    }
}

impl SyncConfig {
    /// Creates a config suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_payload_bytes: 4096,
            digest_mode: DigestMode::Strict,
        }
    }

    /// Creates a config with no size restriction (use with caution).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_payload_bytes: usize::MAX,
            digest_mode: DigestMode::Strict,
        }
    }

    /// Returns a copy using `mode` for digests.
    #[must_use]
    pub const fn with_digest_mode(mut self, mode: DigestMode) -> Self {
        self.digest_mode = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_reasonable() {
        let config = SyncConfig::default();
        assert!(config.max_payload_bytes >= 1024);
        assert_eq!(config.digest_mode, DigestMode::Strict);
    }

    #[test]
    fn testing_config_smaller() {
        assert!(SyncConfig::for_testing().max_payload_bytes < SyncConfig::default().max_payload_bytes);
    }

    #[test]
    fn unlimited_is_max() {
        assert_eq!(SyncConfig::unlimited().max_payload_bytes, usize::MAX);
    }

    #[test]
    fn digest_mode_override() {
        let config = SyncConfig::default().with_digest_mode(DigestMode::Permissive);
        assert_eq!(config.digest_mode, DigestMode::Permissive);
    }
}
