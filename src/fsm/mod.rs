//! Function-pointer finite state machine engine for the burglar alarm.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  StateTable                                                │
//! │  ┌───────────┬───────────┬──────────┬────────────────────┐ │
//! │  │ StateId   │ on_enter  │ on_exit  │ on_update          │ │
//! │  ├───────────┼───────────┼──────────┼────────────────────┤ │
//! │  │ Init      │ fn(ctx)   │ -        │ fn(ctx)->Transition│ │
//! │  │ Sleep     │ fn(ctx)   │ -        │ fn(ctx)->Transition│ │
//! │  │ Awake     │ fn(ctx)   │ -        │ fn(ctx)->Transition│ │
//! │  │ Alert     │ fn(ctx)   │ -        │ fn(ctx)->Transition│ │
//! │  │ Countdown │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Transition│ │
//! │  │ Siren     │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Transition│ │
//! │  └───────────┴───────────┴──────────┴────────────────────┘ │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! `Transition::Next` runs `on_exit` for the current state, then
//! `on_enter` for the next.  `Transition::Exit` runs `on_exit` and leaves
//! the machine finished; further ticks are no-ops.

pub mod context;
pub mod states;

use context::AlarmContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all alarm states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AlarmStateId {
    Init = 0,
    Sleep = 1,
    Awake = 2,
    Alert = 3,
    Countdown = 4,
    Siren = 5,
}

impl AlarmStateId {
    /// Total number of states; used to size the table array.
    pub const COUNT: usize = 6;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Init,
        Self::Sleep,
        Self::Awake,
        Self::Alert,
        Self::Countdown,
        Self::Siren,
    ];

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }
}

/// What `on_update` wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Stay,
    Next(AlarmStateId),
    /// Leave the machine (disarmed or cancelled).
    Exit,
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut AlarmContext);

/// Signature for the per-tick update handler.
pub type StateUpdateFn = fn(&mut AlarmContext) -> Transition;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
/// Stored in a fixed-size array; no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: AlarmStateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    /// Fixed-size table indexed by `AlarmStateId as usize`.
    table: [StateDescriptor; AlarmStateId::COUNT],
    /// Index of the active state; `None` once the machine has exited.
    current: Option<usize>,
    tick_count: u64,
    state_entry_tick: u64,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; AlarmStateId::COUNT], initial: AlarmStateId) -> Self {
        Self {
            table,
            current: Some(initial as usize),
            tick_count: 0,
            state_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter`.  Call once before the first `tick()`.
    pub fn start(&mut self, ctx: &mut AlarmContext) {
        let Some(idx) = self.current else { return };
        info!("ALARM starting in state: {}", self.table[idx].name);
        ctx.state_entered_ms = ctx.inputs.now_ms;
        ctx.ticks_in_state = 0;
        if let Some(enter) = self.table[idx].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one tick.
    pub fn tick(&mut self, ctx: &mut AlarmContext) {
        let Some(idx) = self.current else { return };
        self.tick_count += 1;
        ctx.ticks_in_state = self.tick_count - self.state_entry_tick;
        ctx.total_ticks = self.tick_count;

        match (self.table[idx].on_update)(ctx) {
            Transition::Stay => {}
            Transition::Next(next) => self.transition(Some(next), ctx),
            Transition::Exit => self.transition(None, ctx),
        }
    }

    /// Jump straight to `next`, running exit/enter actions.
    pub fn force_transition(&mut self, next: AlarmStateId, ctx: &mut AlarmContext) {
        if self.current != Some(next as usize) {
            self.transition(Some(next), ctx);
        }
    }

    /// `None` once the machine has exited.
    pub fn current_state(&self) -> Option<AlarmStateId> {
        self.current.map(|idx| self.table[idx].id)
    }

    pub fn is_finished(&self) -> bool {
        self.current.is_none()
    }

    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.state_entry_tick
    }

    pub fn state_name(&self, id: AlarmStateId) -> &'static str {
        self.table[id as usize].name
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next: Option<AlarmStateId>, ctx: &mut AlarmContext) {
        let Some(idx) = self.current else { return };

        info!(
            "ALARM transition: {} -> {}",
            self.table[idx].name,
            next.map_or("exit", |n| self.table[n as usize].name)
        );

        if let Some(exit) = self.table[idx].on_exit {
            exit(ctx);
        }

        self.current = next.map(|n| n as usize);
        self.state_entry_tick = self.tick_count;
        ctx.ticks_in_state = 0;
        ctx.state_entered_ms = ctx.inputs.now_ms;

        if let Some(n) = next
            && let Some(enter) = self.table[n as usize].on_enter
        {
            enter(ctx);
        }
    }
}
