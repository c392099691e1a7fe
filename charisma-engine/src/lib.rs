//! # Charisma Engine
//!
//! Game state machine and turn-based game context for the Charisma runtime.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CHARISMA ENGINE                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  ├── clock.rs    - Frame clock (wall time -> delta seconds)  │
//! │  └── hash.rs     - Context fingerprinting                    │
//! │                                                              │
//! │  game/           - Runtime                                   │
//! │  ├── model.rs    - Unit / faction / tile / player records    │
//! │  ├── context.rs  - Shared game data, integrity policy        │
//! │  ├── state.rs    - State trait and hook contexts             │
//! │  ├── machine.rs  - State machine / game loop driver          │
//! │  ├── events.rs   - Lifecycle events                          │
//! │  ├── menu.rs     - Main menu state                           │
//! │  └── turn.rs     - Timed turn loop state                     │
//! │                                                              │
//! │  data/           - Project JSON (authoring tools)            │
//! │  config.rs       - Engine configuration                      │
//! │  logging.rs      - tracing subscriber setup                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Execution Model
//!
//! Everything runs on one thread, one tick at a time:
//! - The embedding calls `StateMachine::tick(delta)` once per frame
//! - The active state gets `on_update(delta)` then `on_draw()`
//! - Transitions requested from inside a hook wait for the next tick
//!
//! ```no_run
//! use charisma::{GameContext, MainMenuState, StateMachine};
//!
//! let mut machine = StateMachine::new(GameContext::new());
//! machine.change_state(Box::new(MainMenuState))?;
//! machine.tick(1.0 / 60.0)?;
//! # Ok::<(), charisma::MachineError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod data;
pub mod game;
pub mod logging;

// Re-export commonly used types
pub use config::{ConfigError, EngineConfig};
pub use crate::core::clock::FrameClock;
pub use crate::core::hash::ContextHash;
pub use data::{DataError, ProjectData};
pub use game::context::{GameContext, IntegrityPolicy};
pub use game::machine::{MachineError, StateMachine, TickResult};
pub use game::menu::MainMenuState;
pub use game::state::{BoxedState, DrawContext, HookContext, HookResult, State};
pub use game::turn::TurnState;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tick rate (Hz)
pub const DEFAULT_TICK_RATE: u32 = 60;
