//! State Definitions
//!
//! The `State` trait every game mode implements, and the contexts handed to
//! its hooks. States never hold a reference back to the game: the machine
//! passes the context into each call.

use tracing::warn;

use crate::game::context::GameContext;
use crate::game::events::MachineEvent;

/// Owned, type-erased state as stored by the machine.
pub type BoxedState = Box<dyn State>;

/// Result type for state hooks.
pub type HookResult = anyhow::Result<()>;

// =============================================================================
// STATE
// =============================================================================

/// A unit of behavior active for a contiguous span of ticks.
///
/// Lifecycle guarantees provided by `StateMachine`:
/// - `on_enter` runs exactly once, before any other hook.
/// - `on_update` then `on_draw` run once per tick while active.
/// - `on_exit` runs exactly once, before the replacement's `on_enter`.
///   It also runs as teardown if `on_enter` fails, so it must tolerate a
///   partially entered state.
///
/// Errors returned from any hook propagate to the caller of `change_state`
/// or `tick`; the machine does not retry.
pub trait State {
    /// Name used in logs and events.
    fn name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// The state became active.
    fn on_enter(&mut self, ctx: &mut HookContext<'_>) -> HookResult;

    /// The state is being replaced.
    fn on_exit(&mut self, ctx: &mut HookContext<'_>) -> HookResult;

    /// Advance simulation by `delta` seconds (always finite and >= 0).
    fn on_update(&mut self, ctx: &mut HookContext<'_>, delta: f64) -> HookResult;

    /// Present the current context. Runs after `on_update` in the same tick.
    fn on_draw(&mut self, ctx: &mut DrawContext<'_>) -> HookResult;
}

// =============================================================================
// TRANSITION QUEUE
// =============================================================================

/// Transitions requested from inside hooks, plus the machine's event log.
///
/// At most one transition is pending; a later request replaces an earlier
/// one within the same tick.
#[derive(Default)]
pub struct Transitions {
    pending: Option<BoxedState>,
    events: Vec<MachineEvent>,
    tick: u64,
}

impl Transitions {
    /// Queue a transition for the top of the next tick.
    pub fn request(&mut self, next: BoxedState) {
        if let Some(replaced) = self.pending.take() {
            warn!(
                replaced = replaced.name(),
                next = next.name(),
                "pending transition replaced before it was applied"
            );
            self.push_event(MachineEvent::transition_discarded(self.tick, replaced.name()));
        }
        self.push_event(MachineEvent::transition_queued(self.tick, next.name()));
        self.pending = Some(next);
    }

    /// Is a transition waiting?
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Name of the waiting state, if any.
    pub fn pending_name(&self) -> Option<&'static str> {
        self.pending.as_ref().map(|s| s.name())
    }

    pub(crate) fn take_pending(&mut self) -> Option<BoxedState> {
        self.pending.take()
    }

    pub(crate) fn discard_pending(&mut self) {
        if let Some(dropped) = self.pending.take() {
            self.push_event(MachineEvent::transition_discarded(self.tick, dropped.name()));
        }
    }

    pub(crate) fn set_tick(&mut self, tick: u64) {
        self.tick = tick;
    }

    pub(crate) fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn push_event(&mut self, event: MachineEvent) {
        self.events.push(event);
    }

    pub(crate) fn take_events(&mut self) -> Vec<MachineEvent> {
        std::mem::take(&mut self.events)
    }
}

impl std::fmt::Debug for Transitions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transitions")
            .field("pending", &self.pending_name())
            .field("events", &self.events.len())
            .field("tick", &self.tick)
            .finish()
    }
}

// =============================================================================
// HOOK CONTEXTS
// =============================================================================

/// What `on_enter`, `on_exit` and `on_update` may touch.
pub struct HookContext<'a> {
    /// Shared game data
    pub game: &'a mut GameContext,
    transitions: &'a mut Transitions,
}

impl<'a> HookContext<'a> {
    pub(crate) fn new(game: &'a mut GameContext, transitions: &'a mut Transitions) -> Self {
        Self { game, transitions }
    }

    /// Ask the machine to switch to `next` at the top of the next tick.
    pub fn change_state(&mut self, next: BoxedState) {
        self.transitions.request(next);
    }

    /// Is a transition already waiting?
    pub fn has_pending_transition(&self) -> bool {
        self.transitions.has_pending()
    }

    /// Tick currently being processed (0 before the first tick).
    pub fn tick(&self) -> u64 {
        self.transitions.tick()
    }
}

/// What `on_draw` may touch: the game is read-only.
pub struct DrawContext<'a> {
    /// Shared game data
    pub game: &'a GameContext,
    transitions: &'a mut Transitions,
}

impl<'a> DrawContext<'a> {
    pub(crate) fn new(game: &'a GameContext, transitions: &'a mut Transitions) -> Self {
        Self { game, transitions }
    }

    /// Ask the machine to switch to `next` at the top of the next tick.
    pub fn change_state(&mut self, next: BoxedState) {
        self.transitions.request(next);
    }

    /// Tick currently being processed.
    pub fn tick(&self) -> u64 {
        self.transitions.tick()
    }
}
