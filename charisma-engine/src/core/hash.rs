//! Context Hashing
//!
//! Deterministic fingerprints of game context for:
//! - Detecting divergence between two sessions fed the same data
//! - Logging a compact summary of the world at turn boundaries

use sha2::{Sha256, Digest};

/// Hash output type (256 bits / 32 bytes)
pub type ContextHash = [u8; 32];

/// Deterministic hasher for game context.
///
/// Wraps SHA-256 with helpers for the primitive types used by the context.
/// Order of updates is critical for determinism.
pub struct ContextHasher {
    hasher: Sha256,
}

impl ContextHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for game context.
    pub fn for_game_context() -> Self {
        Self::new(b"CHARISMA_CONTEXT_V1")
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an i32 value (little-endian).
    #[inline]
    pub fn update_i32(&mut self, value: i32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Update with a length-prefixed string.
    ///
    /// The prefix keeps `("ab", "c")` and `("a", "bc")` apart.
    pub fn update_str(&mut self, value: &str) {
        self.update_u32(value.len() as u32);
        self.hasher.update(value.as_bytes());
    }

    /// Update with an optional string (presence flag, then contents).
    pub fn update_opt_str(&mut self, value: Option<&str>) {
        match value {
            Some(s) => {
                self.update_bool(true);
                self.update_str(s);
            }
            None => self.update_bool(false),
        }
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> ContextHash {
        self.hasher.finalize().into()
    }
}

/// Compute context hash.
///
/// Called by `GameContext::compute_hash()`. The turn is always hashed first;
/// the closure adds the remaining context data.
pub fn compute_context_hash<F>(turn: u32, add_state: F) -> ContextHash
where
    F: FnOnce(&mut ContextHasher),
{
    let mut hasher = ContextHasher::for_game_context();
    hasher.update_u32(turn);
    add_state(&mut hasher);
    hasher.finalize()
}
