//! Turn State
//!
//! Plays turns on a timer: every `turn_duration` seconds of simulated time
//! the context's turn counter advances. After `max_turns` turns the state
//! hands control back to the main menu through the transition queue.

use tracing::{debug, info, warn};

use crate::config::{validate_turn_settings, ConfigError, EngineConfig};
use crate::game::menu::MainMenuState;
use crate::game::state::{DrawContext, HookContext, HookResult, State};

/// Most turns a single `on_update` may advance. Time beyond that is dropped.
pub const MAX_TURNS_PER_UPDATE: u32 = 64;

/// Timed turn loop.
#[derive(Debug, Clone)]
pub struct TurnState {
    turn_duration: f64,
    max_turns: Option<u32>,
    accumulated: f64,
    turns_played: u32,
    last_drawn_turn: Option<u32>,
}

impl TurnState {
    /// Create with an explicit turn length (seconds) and optional turn cap.
    ///
    /// The turn length must be finite and positive; a cap, if given, must
    /// be at least one turn.
    pub fn new(turn_duration: f64, max_turns: Option<u32>) -> Result<Self, ConfigError> {
        validate_turn_settings(turn_duration, max_turns)?;
        Ok(Self {
            turn_duration,
            max_turns,
            accumulated: 0.0,
            turns_played: 0,
            last_drawn_turn: None,
        })
    }

    /// Create from engine configuration.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        Self::new(config.turn_duration_seconds, config.max_turns)
    }

    /// Turns advanced by this state since it was entered.
    pub fn turns_played(&self) -> u32 {
        self.turns_played
    }

    fn finished(&self) -> bool {
        self.max_turns.is_some_and(|max| self.turns_played >= max)
    }
}

impl State for TurnState {
    fn name(&self) -> &'static str {
        "Turn"
    }

    fn on_enter(&mut self, ctx: &mut HookContext<'_>) -> HookResult {
        self.accumulated = 0.0;
        self.turns_played = 0;
        self.last_drawn_turn = None;
        info!(
            turn = ctx.game.current_turn(),
            units = ctx.game.units.len(),
            players = ctx.game.players.len(),
            "turn loop started"
        );
        Ok(())
    }

    fn on_exit(&mut self, ctx: &mut HookContext<'_>) -> HookResult {
        info!(turn = ctx.game.current_turn(), played = self.turns_played, "turn loop stopped");
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut HookContext<'_>, delta: f64) -> HookResult {
        if self.finished() {
            return Ok(());
        }

        self.accumulated += delta;
        let mut advanced = 0;
        while self.accumulated >= self.turn_duration {
            if advanced == MAX_TURNS_PER_UPDATE {
                warn!(dropped = self.accumulated, "turn backlog dropped");
                self.accumulated = 0.0;
                break;
            }
            self.accumulated -= self.turn_duration;
            advanced += 1;
            let turn = ctx.game.advance_turn();
            self.turns_played += 1;
            info!(turn, "turn begins");

            if self.finished() {
                ctx.change_state(MainMenuState::boxed());
                break;
            }
        }
        Ok(())
    }

    fn on_draw(&mut self, ctx: &mut DrawContext<'_>) -> HookResult {
        let turn = ctx.game.current_turn();
        if self.last_drawn_turn != Some(turn) {
            debug!(turn, tick = ctx.tick(), "turn summary redrawn");
            self.last_drawn_turn = Some(turn);
        }
        Ok(())
    }
}
