//! Machine Events
//!
//! Lifecycle events recorded by the state machine so embeddings (and tests)
//! can observe transitions without instrumenting every state.

use serde::{Serialize, Deserialize};

/// Event payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineEventData {
    /// `on_enter` completed and the state became active
    StateEntered { state: String },

    /// `on_exit` ran and the state stopped being active
    StateExited { state: String },

    /// A hook asked for a transition; applied at the top of the next tick
    TransitionQueued { state: String },

    /// A queued transition was dropped before it could be applied
    TransitionDiscarded { state: String },
}

/// An event with the tick it happened on.
///
/// Tick 0 means "before the first tick" (e.g. the initial `change_state`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineEvent {
    /// Tick when event occurred
    pub tick: u64,

    /// Event data
    pub data: MachineEventData,
}

impl MachineEvent {
    /// Create a new event.
    pub fn new(tick: u64, data: MachineEventData) -> Self {
        Self { tick, data }
    }

    /// Create state entered event.
    pub fn state_entered(tick: u64, state: &str) -> Self {
        Self::new(tick, MachineEventData::StateEntered { state: state.to_string() })
    }

    /// Create state exited event.
    pub fn state_exited(tick: u64, state: &str) -> Self {
        Self::new(tick, MachineEventData::StateExited { state: state.to_string() })
    }

    /// Create transition queued event.
    pub fn transition_queued(tick: u64, state: &str) -> Self {
        Self::new(tick, MachineEventData::TransitionQueued { state: state.to_string() })
    }

    /// Create transition discarded event.
    pub fn transition_discarded(tick: u64, state: &str) -> Self {
        Self::new(tick, MachineEventData::TransitionDiscarded { state: state.to_string() })
    }

    /// Name of the state this event is about.
    pub fn state(&self) -> &str {
        match &self.data {
            MachineEventData::StateEntered { state }
            | MachineEventData::StateExited { state }
            | MachineEventData::TransitionQueued { state }
            | MachineEventData::TransitionDiscarded { state } => state,
        }
    }
}
