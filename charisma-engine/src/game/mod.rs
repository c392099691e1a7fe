//! Game Logic Module
//!
//! ## Module Structure
//!
//! - `model`: Unit, faction, map tile and player records
//! - `context`: Shared mutable game data and integrity checks
//! - `state`: The `State` trait and hook contexts
//! - `machine`: State machine / game loop driver
//! - `events`: Lifecycle events recorded by the machine
//! - `menu`: Main menu state
//! - `turn`: Timed turn loop state

pub mod model;
pub mod context;
pub mod state;
pub mod machine;
pub mod events;
pub mod menu;
pub mod turn;

// Re-export key types
pub use model::{Unit, Faction, MapTile, Player, Terrain};
pub use context::{GameContext, IntegrityPolicy, IntegrityViolation, IntegrityError};
pub use state::{State, BoxedState, HookContext, DrawContext, HookResult};
pub use machine::{StateMachine, MachineError, TickResult, Hook, run_ticks};
pub use events::{MachineEvent, MachineEventData};
pub use menu::MainMenuState;
pub use turn::TurnState;
