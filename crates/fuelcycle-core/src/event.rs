//! Facility events.
//!
//! A reactor records what happened during each callback as [`ReactorEvent`]s
//! in an [`EventLog`]. The host drains the log once per timestep, typically
//! for reporting. Events never feed back into the phase machine.

use crate::fixed::{Quantity, Ticks};
use crate::id::{Commodity, Recipe};
use crate::phase::Phase;

/// Something observable that happened inside a reactor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactorEvent {
    Deployed {
        time: Ticks,
    },
    PhaseChanged {
        from: Phase,
        to: Phase,
        time: Ticks,
    },
    /// A full batch moved from reserve into the core.
    BatchLoaded {
        quantity: Quantity,
        time: Ticks,
    },
    /// A batch left the core, was transmuted, and entered storage.
    BatchDischarged {
        quantity: Quantity,
        recipe: Recipe,
        time: Ticks,
    },
    /// Accepted trades delivered fresh fuel into the reserve.
    FuelReceived {
        quantity: Quantity,
        time: Ticks,
    },
    /// Product left storage to fill an accepted trade.
    OrderShipped {
        commodity: Commodity,
        quantity: Quantity,
        time: Ticks,
    },
}

/// Discriminant tag for event types, used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactorEventKind {
    Deployed,
    PhaseChanged,
    BatchLoaded,
    BatchDischarged,
    FuelReceived,
    OrderShipped,
}

impl ReactorEvent {
    pub fn kind(&self) -> ReactorEventKind {
        match self {
            ReactorEvent::Deployed { .. } => ReactorEventKind::Deployed,
            ReactorEvent::PhaseChanged { .. } => ReactorEventKind::PhaseChanged,
            ReactorEvent::BatchLoaded { .. } => ReactorEventKind::BatchLoaded,
            ReactorEvent::BatchDischarged { .. } => ReactorEventKind::BatchDischarged,
            ReactorEvent::FuelReceived { .. } => ReactorEventKind::FuelReceived,
            ReactorEvent::OrderShipped { .. } => ReactorEventKind::OrderShipped,
        }
    }

    pub fn time(&self) -> Ticks {
        match self {
            ReactorEvent::Deployed { time }
            | ReactorEvent::PhaseChanged { time, .. }
            | ReactorEvent::BatchLoaded { time, .. }
            | ReactorEvent::BatchDischarged { time, .. }
            | ReactorEvent::FuelReceived { time, .. }
            | ReactorEvent::OrderShipped { time, .. } => *time,
        }
    }
}

/// Pending events, oldest first.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<ReactorEvent>,
    total_written: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: ReactorEvent) {
        self.events.push(event);
        self.total_written += 1;
    }

    /// Events recorded since the last drain.
    pub fn pending(&self) -> &[ReactorEvent] {
        &self.events
    }

    /// Take all pending events.
    pub fn drain(&mut self) -> Vec<ReactorEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events written since creation, including drained ones.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }
}
