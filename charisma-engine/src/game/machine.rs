//! State Machine / Game Loop Driver
//!
//! Owns the game context and the single active state. The embedding calls
//! `change_state` to switch modes and `tick` once per frame; everything else
//! happens through the state hooks.
//!
//! Transitions requested from inside a hook are never applied mid-hook.
//! They are queued and applied at the top of the next `tick`, before
//! `on_update`, so no hook ever observes the active state being swapped
//! underneath it.

use std::fmt;
use tracing::{debug, info, warn};

use crate::game::context::GameContext;
use crate::game::events::MachineEvent;
use crate::game::state::{BoxedState, DrawContext, HookContext, Transitions};

// =============================================================================
// ERRORS
// =============================================================================

/// Which hook failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hook {
    /// `on_enter`
    Enter,
    /// `on_exit`
    Exit,
    /// `on_update`
    Update,
    /// `on_draw`
    Draw,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Hook::Enter => "on_enter",
            Hook::Exit => "on_exit",
            Hook::Update => "on_update",
            Hook::Draw => "on_draw",
        };
        f.write_str(name)
    }
}

/// State machine errors.
#[derive(Debug, thiserror::Error)]
pub enum MachineError {
    /// `try_change_state` was given no state.
    #[error("invalid transition: no state given")]
    InvalidTransition,

    /// Delta time was negative, NaN or infinite.
    #[error("invalid delta time: {0}")]
    InvalidDelta(f64),

    /// A state hook returned an error.
    #[error("{state}::{hook} failed: {source}")]
    Hook {
        /// State whose hook failed
        state: String,
        /// Failing hook
        hook: Hook,
        /// Error returned by the hook
        #[source]
        source: anyhow::Error,
    },
}

impl MachineError {
    fn hook(state: &str, hook: Hook, source: anyhow::Error) -> Self {
        Self::Hook {
            state: state.to_string(),
            hook,
            source,
        }
    }
}

// =============================================================================
// TICK RESULT
// =============================================================================

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick (including any queued since the last drain)
    pub events: Vec<MachineEvent>,
    /// Whether a pending transition was applied at the top of this tick
    pub transitioned: bool,
    /// Whether update/draw ran (false when no state is active)
    pub ran_hooks: bool,
}

// =============================================================================
// STATE MACHINE
// =============================================================================

/// Finite-state controller driving per-tick hooks.
pub struct StateMachine {
    context: GameContext,
    current: Option<BoxedState>,
    transitions: Transitions,
    tick_count: u64,
    elapsed: f64,
    transition_count: u64,
}

impl StateMachine {
    /// Create a machine with no active state.
    pub fn new(context: GameContext) -> Self {
        Self {
            context,
            current: None,
            transitions: Transitions::default(),
            tick_count: 0,
            elapsed: 0.0,
            transition_count: 0,
        }
    }

    /// Shared game data.
    pub fn context(&self) -> &GameContext {
        &self.context
    }

    /// Shared game data, mutably (for loaders running between ticks).
    pub fn context_mut(&mut self) -> &mut GameContext {
        &mut self.context
    }

    /// Consume the machine, returning its context.
    pub fn into_context(self) -> GameContext {
        self.context
    }

    /// Name of the active state.
    pub fn current_state_name(&self) -> Option<&'static str> {
        self.current.as_ref().map(|s| s.name())
    }

    /// Is any state active?
    pub fn has_state(&self) -> bool {
        self.current.is_some()
    }

    /// Name of the transition waiting for the next tick.
    pub fn pending_state_name(&self) -> Option<&'static str> {
        self.transitions.pending_name()
    }

    /// Ticks processed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Sum of all deltas passed to `tick`, in seconds.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Completed transitions (enter succeeded).
    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    /// Drain recorded events.
    pub fn take_events(&mut self) -> Vec<MachineEvent> {
        self.transitions.take_events()
    }

    /// Switch to `next` immediately.
    ///
    /// Calls `on_exit` on the active state (if any), then `on_enter` on
    /// `next`. A transition queued by a hook earlier is discarded: the
    /// explicit call wins.
    ///
    /// On `on_exit` failure the old state is dropped, `next` is not entered
    /// and the machine is left with no active state. On `on_enter` failure
    /// `next` gets its `on_exit` for teardown, is dropped, and the machine is
    /// left with no active state. The hook error is returned in both cases.
    pub fn change_state(&mut self, next: BoxedState) -> Result<(), MachineError> {
        self.transitions.discard_pending();
        self.apply_transition(next)
    }

    /// Nullable variant of `change_state`.
    ///
    /// `None` is rejected with `MachineError::InvalidTransition` and the
    /// active state is left untouched.
    pub fn try_change_state(&mut self, next: Option<BoxedState>) -> Result<(), MachineError> {
        match next {
            Some(state) => self.change_state(state),
            None => {
                warn!(current = ?self.current_state_name(), "rejected transition without a state");
                Err(MachineError::InvalidTransition)
            }
        }
    }

    /// Run one tick.
    ///
    /// 1. Validate `delta` (finite, >= 0).
    /// 2. Apply a pending transition, if a hook queued one.
    /// 3. If a state is active, call `on_update(delta)` then `on_draw()`.
    ///
    /// With no active state this is a no-op that still counts the tick.
    pub fn tick(&mut self, delta: f64) -> Result<TickResult, MachineError> {
        if !delta.is_finite() || delta < 0.0 {
            return Err(MachineError::InvalidDelta(delta));
        }

        self.tick_count += 1;
        self.elapsed += delta;
        self.transitions.set_tick(self.tick_count);

        let mut result = TickResult::default();

        if let Some(next) = self.transitions.take_pending() {
            debug!(tick = self.tick_count, next = next.name(), "applying queued transition");
            self.apply_transition(next)?;
            result.transitioned = true;
        }

        if let Some(state) = self.current.as_mut() {
            state
                .on_update(&mut HookContext::new(&mut self.context, &mut self.transitions), delta)
                .map_err(|source| MachineError::hook(state.name(), Hook::Update, source))?;

            state
                .on_draw(&mut DrawContext::new(&self.context, &mut self.transitions))
                .map_err(|source| MachineError::hook(state.name(), Hook::Draw, source))?;

            result.ran_hooks = true;
        }

        result.events = self.transitions.take_events();
        Ok(result)
    }

    /// Exit the active state (if any) and enter `next`.
    fn apply_transition(&mut self, mut next: BoxedState) -> Result<(), MachineError> {
        let tick = self.tick_count;

        if let Some(mut old) = self.current.take() {
            let old_name = old.name();
            if let Err(source) = old.on_exit(&mut HookContext::new(&mut self.context, &mut self.transitions)) {
                warn!(state = old_name, tick, error = %source, "on_exit failed");
                // A failed state's requests die with it
                self.transitions.discard_pending();
                return Err(MachineError::hook(old_name, Hook::Exit, source));
            }
            self.transitions.push_event(MachineEvent::state_exited(tick, old_name));
            info!(state = old_name, tick, "exited state");
        }

        let next_name = next.name();
        if let Err(source) = next.on_enter(&mut HookContext::new(&mut self.context, &mut self.transitions)) {
            warn!(state = next_name, tick, error = %source, "on_enter failed, tearing down");
            if let Err(teardown) = next.on_exit(&mut HookContext::new(&mut self.context, &mut self.transitions)) {
                warn!(state = next_name, error = %teardown, "on_exit failed during teardown");
            }
            self.transitions.discard_pending();
            return Err(MachineError::hook(next_name, Hook::Enter, source));
        }

        self.transitions.push_event(MachineEvent::state_entered(tick, next_name));
        info!(state = next_name, tick, "entered state");
        self.current = Some(next);
        self.transition_count += 1;
        Ok(())
    }
}

impl fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("current", &self.current_state_name())
            .field("transitions", &self.transitions)
            .field("tick_count", &self.tick_count)
            .field("turn", &self.context.current_turn())
            .finish()
    }
}

/// Drive the machine through a fixed sequence of deltas.
///
/// Stops at the first error. Returns every event generated along the way.
pub fn run_ticks<I>(machine: &mut StateMachine, deltas: I) -> Result<Vec<MachineEvent>, MachineError>
where
    I: IntoIterator<Item = f64>,
{
    let mut all_events = machine.take_events();
    for delta in deltas {
        let result = machine.tick(delta)?;
        all_events.extend(result.events);
    }
    Ok(all_events)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use anyhow::bail;
    use proptest::prelude::*;

    use crate::game::events::MachineEventData;
    use crate::game::model::Unit;
    use crate::game::state::{HookResult, State};

    type Log = Rc<RefCell<Vec<String>>>;

    /// What a recording state should do besides logging.
    #[derive(Clone, Copy, Default)]
    struct Script {
        fail_enter: bool,
        fail_exit: bool,
        fail_update: bool,
        /// Queue a transition to `Recorder("next")` from this hook
        request_from: Option<Hook>,
    }

    struct Recorder {
        label: &'static str,
        log: Log,
        script: Script,
    }

    impl Recorder {
        fn boxed(label: &'static str, log: &Log) -> BoxedState {
            Self::scripted(label, log, Script::default())
        }

        fn scripted(label: &'static str, log: &Log, script: Script) -> BoxedState {
            Box::new(Self {
                label,
                log: Rc::clone(log),
                script,
            })
        }

        fn record(&self, what: String) {
            self.log.borrow_mut().push(format!("{}.{}", self.label, what));
        }

        fn maybe_request(&self, hook: Hook, request: impl FnOnce(BoxedState)) {
            if self.script.request_from == Some(hook) {
                request(Recorder::boxed("next", &self.log));
            }
        }
    }

    impl State for Recorder {
        fn name(&self) -> &'static str {
            self.label
        }

        fn on_enter(&mut self, ctx: &mut HookContext<'_>) -> HookResult {
            self.record("enter".into());
            self.maybe_request(Hook::Enter, |s| ctx.change_state(s));
            if self.script.fail_enter {
                bail!("enter refused");
            }
            Ok(())
        }

        fn on_exit(&mut self, ctx: &mut HookContext<'_>) -> HookResult {
            self.record("exit".into());
            self.maybe_request(Hook::Exit, |s| ctx.change_state(s));
            if self.script.fail_exit {
                bail!("exit refused");
            }
            Ok(())
        }

        fn on_update(&mut self, ctx: &mut HookContext<'_>, delta: f64) -> HookResult {
            self.record(format!("update({delta})"));
            ctx.game.advance_turn();
            self.maybe_request(Hook::Update, |s| ctx.change_state(s));
            if self.script.fail_update {
                bail!("update refused");
            }
            Ok(())
        }

        fn on_draw(&mut self, ctx: &mut DrawContext<'_>) -> HookResult {
            self.record("draw".into());
            self.maybe_request(Hook::Draw, |s| ctx.change_state(s));
            Ok(())
        }
    }

    fn new_log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn drain(log: &Log) -> Vec<String> {
        std::mem::take(&mut *log.borrow_mut())
    }

    #[test]
    fn test_lifecycle_scenario() {
        let log = new_log();
        let mut machine = StateMachine::new(GameContext::new());

        machine.change_state(Recorder::boxed("A", &log)).unwrap();
        assert_eq!(drain(&log), vec!["A.enter"]);

        machine.tick(0.016).unwrap();
        assert_eq!(drain(&log), vec!["A.update(0.016)", "A.draw"]);

        machine.change_state(Recorder::boxed("B", &log)).unwrap();
        assert_eq!(drain(&log), vec!["A.exit", "B.enter"]);

        machine.tick(0.033).unwrap();
        assert_eq!(drain(&log), vec!["B.update(0.033)", "B.draw"]);

        assert_eq!(machine.current_state_name(), Some("B"));
        assert_eq!(machine.transition_count(), 2);
    }

    #[test]
    fn test_tick_without_state_is_noop() {
        let mut machine = StateMachine::new(GameContext::new());

        let result = machine.tick(0.016).unwrap();

        assert!(!result.ran_hooks);
        assert!(!result.transitioned);
        assert!(result.events.is_empty());
        assert_eq!(machine.context().current_turn(), 0);
        assert_eq!(machine.tick_count(), 1);
    }

    #[test]
    fn test_update_mutates_context() {
        let log = new_log();
        let mut machine = StateMachine::new(GameContext::new());
        machine.change_state(Recorder::boxed("A", &log)).unwrap();

        run_ticks(&mut machine, [0.1, 0.1, 0.1]).unwrap();

        assert_eq!(machine.context().current_turn(), 3);
        assert!((machine.elapsed() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_none_transition_rejected() {
        let log = new_log();
        let mut machine = StateMachine::new(GameContext::new());
        machine.change_state(Recorder::boxed("A", &log)).unwrap();
        drain(&log);

        let err = machine.try_change_state(None).unwrap_err();

        assert!(matches!(err, MachineError::InvalidTransition));
        assert_eq!(machine.current_state_name(), Some("A"));
        assert!(drain(&log).is_empty());
    }

    #[test]
    fn test_try_change_state_some() {
        let log = new_log();
        let mut machine = StateMachine::new(GameContext::new());

        machine.try_change_state(Some(Recorder::boxed("A", &log))).unwrap();
        assert_eq!(machine.current_state_name(), Some("A"));
    }

    #[test]
    fn test_invalid_delta_rejected() {
        let log = new_log();
        let mut machine = StateMachine::new(GameContext::new());
        machine.change_state(Recorder::boxed("A", &log)).unwrap();
        drain(&log);

        for bad in [-0.001, f64::NAN, f64::INFINITY] {
            assert!(matches!(machine.tick(bad), Err(MachineError::InvalidDelta(_))));
        }
        assert!(drain(&log).is_empty());
        assert_eq!(machine.tick_count(), 0);

        assert!(machine.tick(0.0).unwrap().ran_hooks);
    }

    #[test]
    fn test_transition_from_update_is_deferred() {
        let log = new_log();
        let mut machine = StateMachine::new(GameContext::new());
        let script = Script {
            request_from: Some(Hook::Update),
            ..Script::default()
        };
        machine.change_state(Recorder::scripted("A", &log, script)).unwrap();
        drain(&log);

        let result = machine.tick(0.016).unwrap();
        // Draw still goes to A in the same tick
        assert_eq!(drain(&log), vec!["A.update(0.016)", "A.draw"]);
        assert!(!result.transitioned);
        assert_eq!(machine.pending_state_name(), Some("next"));

        let result = machine.tick(0.016).unwrap();
        assert_eq!(
            drain(&log),
            vec!["A.exit", "next.enter", "next.update(0.016)", "next.draw"]
        );
        assert!(result.transitioned);
        assert_eq!(machine.current_state_name(), Some("next"));
        assert_eq!(machine.pending_state_name(), None);
    }

    #[test]
    fn test_transition_from_draw_is_deferred() {
        let log = new_log();
        let mut machine = StateMachine::new(GameContext::new());
        let script = Script {
            request_from: Some(Hook::Draw),
            ..Script::default()
        };
        machine.change_state(Recorder::scripted("A", &log, script)).unwrap();
        machine.tick(0.016).unwrap();

        assert_eq!(machine.current_state_name(), Some("A"));
        machine.tick(0.016).unwrap();
        assert_eq!(machine.current_state_name(), Some("next"));
    }

    #[test]
    fn test_transition_from_enter_is_deferred() {
        let log = new_log();
        let mut machine = StateMachine::new(GameContext::new());
        let script = Script {
            request_from: Some(Hook::Enter),
            ..Script::default()
        };

        machine.change_state(Recorder::scripted("A", &log, script)).unwrap();
        assert_eq!(machine.current_state_name(), Some("A"));
        assert_eq!(drain(&log), vec!["A.enter"]);

        machine.tick(0.016).unwrap();
        assert_eq!(drain(&log), vec!["A.exit", "next.enter", "next.update(0.016)", "next.draw"]);
    }

    #[test]
    fn test_explicit_change_discards_pending() {
        let log = new_log();
        let mut machine = StateMachine::new(GameContext::new());
        let script = Script {
            request_from: Some(Hook::Update),
            ..Script::default()
        };
        machine.change_state(Recorder::scripted("A", &log, script)).unwrap();
        machine.tick(0.016).unwrap();
        assert!(machine.pending_state_name().is_some());

        machine.change_state(Recorder::boxed("B", &log)).unwrap();
        assert_eq!(machine.pending_state_name(), None);

        let events: Vec<_> = machine.take_events().into_iter().map(|e| e.data).collect();
        assert_eq!(
            events,
            vec![
                MachineEventData::TransitionDiscarded { state: "next".into() },
                MachineEventData::StateExited { state: "A".into() },
                MachineEventData::StateEntered { state: "B".into() },
            ]
        );

        drain(&log);
        machine.tick(0.016).unwrap();
        assert_eq!(drain(&log), vec!["B.update(0.016)", "B.draw"]);
    }

    #[test]
    fn test_events_record_transition_order() {
        let log = new_log();
        let mut machine = StateMachine::new(GameContext::new());

        machine.change_state(Recorder::boxed("A", &log)).unwrap();
        machine.change_state(Recorder::boxed("B", &log)).unwrap();

        let events: Vec<_> = machine.take_events().into_iter().map(|e| e.data).collect();
        assert_eq!(
            events,
            vec![
                MachineEventData::StateEntered { state: "A".into() },
                MachineEventData::StateExited { state: "A".into() },
                MachineEventData::StateEntered { state: "B".into() },
            ]
        );
    }

    #[test]
    fn test_enter_failure_tears_down() {
        let log = new_log();
        let mut machine = StateMachine::new(GameContext::new());
        machine.change_state(Recorder::boxed("A", &log)).unwrap();
        drain(&log);

        let script = Script {
            fail_enter: true,
            ..Script::default()
        };
        let err = machine.change_state(Recorder::scripted("B", &log, script)).unwrap_err();

        match err {
            MachineError::Hook { state, hook, .. } => {
                assert_eq!(state, "B");
                assert_eq!(hook, Hook::Enter);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(drain(&log), vec!["A.exit", "B.enter", "B.exit"]);
        assert!(!machine.has_state());

        // Ticking afterwards is a no-op
        assert!(!machine.tick(0.016).unwrap().ran_hooks);
    }

    #[test]
    fn test_exit_failure_leaves_no_state() {
        let log = new_log();
        let mut machine = StateMachine::new(GameContext::new());
        let script = Script {
            fail_exit: true,
            ..Script::default()
        };
        machine.change_state(Recorder::scripted("A", &log, script)).unwrap();
        drain(&log);

        let err = machine.change_state(Recorder::boxed("B", &log)).unwrap_err();

        assert!(matches!(err, MachineError::Hook { hook: Hook::Exit, .. }));
        assert_eq!(drain(&log), vec!["A.exit"]);
        assert!(!machine.has_state());

        // A never finished exiting, so no StateExited is recorded
        let events: Vec<_> = machine.take_events().into_iter().map(|e| e.data).collect();
        assert_eq!(events, vec![MachineEventData::StateEntered { state: "A".into() }]);
    }

    #[test]
    fn test_transition_from_exit_is_deferred() {
        let log = new_log();
        let mut machine = StateMachine::new(GameContext::new());
        let script = Script {
            request_from: Some(Hook::Exit),
            ..Script::default()
        };
        machine.change_state(Recorder::scripted("A", &log, script)).unwrap();

        machine.change_state(Recorder::boxed("B", &log)).unwrap();
        assert_eq!(machine.current_state_name(), Some("B"));
        assert_eq!(machine.pending_state_name(), Some("next"));
        drain(&log);

        let result = machine.tick(0.016).unwrap();
        assert!(result.transitioned);
        assert_eq!(drain(&log), vec!["B.exit", "next.enter", "next.update(0.016)", "next.draw"]);
        assert_eq!(machine.current_state_name(), Some("next"));
    }

    #[test]
    fn test_failed_enter_drops_its_request() {
        let log = new_log();
        let mut machine = StateMachine::new(GameContext::new());
        let script = Script {
            fail_enter: true,
            request_from: Some(Hook::Enter),
            ..Script::default()
        };

        assert!(machine.change_state(Recorder::scripted("A", &log, script)).is_err());
        assert!(!machine.has_state());
        assert_eq!(machine.pending_state_name(), None);

        let events: Vec<_> = machine.take_events().into_iter().map(|e| e.data).collect();
        assert_eq!(events, vec![MachineEventData::TransitionDiscarded { state: "next".into() }]);

        drain(&log);
        let result = machine.tick(0.016).unwrap();
        assert!(!result.transitioned);
        assert!(!result.ran_hooks);
        assert!(drain(&log).is_empty());
    }

    #[test]
    fn test_failed_exit_drops_its_request() {
        let log = new_log();
        let mut machine = StateMachine::new(GameContext::new());
        let script = Script {
            fail_exit: true,
            request_from: Some(Hook::Exit),
            ..Script::default()
        };
        machine.change_state(Recorder::scripted("A", &log, script)).unwrap();

        assert!(machine.change_state(Recorder::boxed("B", &log)).is_err());
        assert!(!machine.has_state());
        assert_eq!(machine.pending_state_name(), None);

        drain(&log);
        let result = machine.tick(0.016).unwrap();
        assert!(!result.transitioned);
        assert!(drain(&log).is_empty());
    }

    #[test]
    fn test_update_failure_propagates_and_skips_draw() {
        let log = new_log();
        let mut machine = StateMachine::new(GameContext::new());
        let script = Script {
            fail_update: true,
            ..Script::default()
        };
        machine.change_state(Recorder::scripted("A", &log, script)).unwrap();
        drain(&log);

        let err = machine.tick(0.016).unwrap_err();

        assert!(err.to_string().contains("A::on_update failed"));
        assert_eq!(drain(&log), vec!["A.update(0.016)"]);
        // The state stays active; recovery is the embedding's call
        assert_eq!(machine.current_state_name(), Some("A"));
    }

    #[test]
    fn test_machine_keeps_context() {
        let mut ctx = GameContext::new();
        ctx.insert_unit(Unit::new("u1", "Knight", "")).unwrap();
        let mut machine = StateMachine::new(ctx);

        machine.context_mut().advance_turn();
        let ctx = machine.into_context();

        assert!(ctx.unit("u1").is_some());
        assert_eq!(ctx.current_turn(), 1);
    }

    proptest! {
        #[test]
        fn prop_exit_count_matches_replacements(changes in 1usize..20, ticks_between in 0usize..3) {
            let log = new_log();
            let mut machine = StateMachine::new(GameContext::new());

            for _ in 0..changes {
                machine.change_state(Recorder::boxed("S", &log)).unwrap();
                for _ in 0..ticks_between {
                    machine.tick(0.016).unwrap();
                }
            }

            let entries = drain(&log);
            let enters = entries.iter().filter(|e| *e == "S.enter").count();
            let exits = entries.iter().filter(|e| *e == "S.exit").count();
            prop_assert_eq!(enters, changes);
            prop_assert_eq!(exits, changes - 1);

            // Every exit is immediately followed by the replacement's enter
            for (i, entry) in entries.iter().enumerate() {
                if entry == "S.exit" {
                    prop_assert_eq!(entries.get(i + 1).map(String::as_str), Some("S.enter"));
                }
            }

            // Each tick with a state contributes exactly update then draw
            let updates = entries.iter().filter(|e| e.starts_with("S.update")).count();
            let draws = entries.iter().filter(|e| *e == "S.draw").count();
            prop_assert_eq!(updates, changes * ticks_between);
            prop_assert_eq!(draws, updates);
        }
    }
}
