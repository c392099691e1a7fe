//! Main menu state.

use tracing::info;

use crate::game::state::{DrawContext, HookContext, HookResult, State};

/// Title screen. Only logs its lifecycle; menu input belongs to the embedding.
#[derive(Debug, Default, Clone, Copy)]
pub struct MainMenuState;

impl MainMenuState {
    /// Boxed, ready for `change_state`.
    pub fn boxed() -> Box<Self> {
        Box::new(Self)
    }
}

impl State for MainMenuState {
    fn name(&self) -> &'static str {
        "MainMenu"
    }

    fn on_enter(&mut self, ctx: &mut HookContext<'_>) -> HookResult {
        info!(turn = ctx.game.current_turn(), "entering main menu");
        Ok(())
    }

    fn on_exit(&mut self, _ctx: &mut HookContext<'_>) -> HookResult {
        info!("exiting main menu");
        Ok(())
    }

    fn on_update(&mut self, _ctx: &mut HookContext<'_>, _delta: f64) -> HookResult {
        Ok(())
    }

    fn on_draw(&mut self, _ctx: &mut DrawContext<'_>) -> HookResult {
        Ok(())
    }
}
