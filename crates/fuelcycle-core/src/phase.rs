//! The reactor's phase state machine.
//!
//! Transitions are pure functions of the current [`PhaseState`], the time,
//! and a [`CoreSnapshot`]. They return the next state plus the buffer work
//! the caller must perform, so the machine can be driven and tested without
//! a live facility or scheduler.
//!
//! | Phase      | Tick                                                    | Tock   |
//! |------------|---------------------------------------------------------|--------|
//! | Initial    | core full: start cycle                                  | refuel |
//! | Processing | `time == start + duration`: discharge, enter Waiting    | --     |
//! | Waiting    | core full and `time >= discharge + refuel_delay`: start | refuel |

use crate::fixed::Ticks;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raised when a callback arrives at a phase/time combination the
/// transition table does not cover.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhaseError {
    #[error("unreachable phase: {phase} at time {time} ({detail})")]
    UnreachablePhase {
        phase: Phase,
        time: Ticks,
        detail: &'static str,
    },
}

/// Lifecycle phase of a batch reactor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Deployed, loading the first core.
    #[default]
    Initial,
    /// A full core is being processed.
    Processing,
    /// Discharged, waiting for fuel and for the refuel delay to pass.
    Waiting,
}

impl Phase {
    /// Human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            Phase::Initial => "initialization",
            Phase::Processing => "processing batch(es)",
            Phase::Waiting => "waiting for fuel",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cycle timing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleTiming {
    pub process_duration: Ticks,
    pub refuel_delay: Ticks,
}

/// The parts of the inventory the phase machine looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreSnapshot {
    pub core_batches: usize,
    pub batches_per_core: usize,
}

impl CoreSnapshot {
    pub fn is_full(&self) -> bool {
        self.core_batches == self.batches_per_core
    }
}

/// Phase plus the timing state carried alongside it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseState {
    pub phase: Phase,
    /// Time the most recent cycle started. Set on every entry to Processing.
    pub process_start: Option<Ticks>,
    /// Time of the most recent tick.
    pub last_tick: Option<Ticks>,
}

impl PhaseState {
    /// Time the current (or last) cycle ends, if one has started.
    pub fn end_time(&self, timing: &CycleTiming) -> Option<Ticks> {
        self.process_start
            .map(|start| start.saturating_add(timing.process_duration))
    }
}

/// Result of evaluating a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickTransition {
    pub next: PhaseState,
    /// Discharge the reload batches from core to storage.
    pub discharge: bool,
    /// Phases entered this tick, in order.
    pub entered: Vec<Phase>,
}

/// What a tock asks the facility to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TockAction {
    /// Move full batches from reserve into core until the core is full or
    /// the reserve runs out of full batches.
    Refuel,
    Idle,
}

/// Evaluate the tick row of the transition table.
pub fn plan_tick(
    state: &PhaseState,
    timing: &CycleTiming,
    core: CoreSnapshot,
    time: Ticks,
) -> Result<TickTransition, PhaseError> {
    if state.last_tick.is_some_and(|last| time < last) {
        return Err(PhaseError::UnreachablePhase {
            phase: state.phase,
            time,
            detail: "tick arrived earlier than the previous tick",
        });
    }

    let mut next = PhaseState {
        last_tick: Some(time),
        ..*state
    };
    let mut out = TickTransition {
        next,
        discharge: false,
        entered: Vec::new(),
    };

    match state.phase {
        Phase::Initial => {
            if core.is_full() {
                start_cycle(&mut next, &mut out, timing, time);
            }
        }
        Phase::Processing => {
            let end = state.end_time(timing).ok_or(PhaseError::UnreachablePhase {
                phase: Phase::Processing,
                time,
                detail: "processing without a recorded start time",
            })?;
            if time == end {
                next.phase = Phase::Waiting;
                out.discharge = true;
                out.entered.push(Phase::Waiting);
            } else if time > end {
                return Err(PhaseError::UnreachablePhase {
                    phase: Phase::Processing,
                    time,
                    detail: "cycle end time was skipped",
                });
            }
        }
        Phase::Waiting => {
            let discharged_at = state.end_time(timing).ok_or(PhaseError::UnreachablePhase {
                phase: Phase::Waiting,
                time,
                detail: "waiting without a completed cycle",
            })?;
            if core.is_full() && time >= discharged_at.saturating_add(timing.refuel_delay) {
                start_cycle(&mut next, &mut out, timing, time);
            }
        }
    }

    out.next = next;
    Ok(out)
}

/// Enter Processing. A zero-length cycle ends in the tick it starts.
fn start_cycle(next: &mut PhaseState, out: &mut TickTransition, timing: &CycleTiming, time: Ticks) {
    next.phase = Phase::Processing;
    next.process_start = Some(time);
    out.entered.push(Phase::Processing);
    if timing.process_duration == 0 {
        next.phase = Phase::Waiting;
        out.discharge = true;
        out.entered.push(Phase::Waiting);
    }
}

/// Evaluate the tock row of the transition table.
pub fn plan_tock(phase: Phase) -> TockAction {
    match phase {
        Phase::Initial | Phase::Waiting => TockAction::Refuel,
        Phase::Processing => TockAction::Idle,
    }
}
