//! Core primitives shared by the game layer.

pub mod clock;
pub mod hash;

// Re-export core types
pub use clock::FrameClock;
pub use hash::{compute_context_hash, ContextHash, ContextHasher};
