//! Project data loading and editing.
//!
//! Bridges the JSON files written by the authoring tools and the runtime
//! `GameContext`. The state machine itself never parses data.

pub mod project;

pub use project::{DataError, ProjectData};
