//! Drives hosted reactors through the timestep protocol.
//!
//! Each [`Scheduler::step`] runs:
//! 1. **Tick** -- every facility evaluates its phase transitions.
//! 2. **Exchange** -- the host's [`Exchange`] collects requests and bids,
//!    matches them, and settles trades through the facility callbacks.
//! 3. **Tock** -- every facility refuels.
//! 4. **Bookkeeping** -- events are drained and time advances by one.
//!
//! Facilities share no state, so with the `parallel` feature the tick and
//! tock phases fan out across facilities with rayon. Phase order is kept.

use crate::error::ReactorError;
use crate::event::ReactorEvent;
use crate::fixed::Ticks;
use crate::id::FacilityId;
use crate::reactor::BatchReactor;
use slotmap::SlotMap;
use tracing::{debug, warn};

/// Facilities hosted by a scheduler.
pub type Facilities = SlotMap<FacilityId, BatchReactor>;

/// A failure in one hosted facility.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("facility {facility:?} failed at time {time}: {source}")]
    Facility {
        facility: FacilityId,
        time: Ticks,
        #[source]
        source: ReactorError,
    },
    #[error("exchange round failed at time {time}: {source}")]
    Exchange {
        time: Ticks,
        #[source]
        source: ReactorError,
    },
}

/// The market layer. Owns matching; calls back into facilities for
/// requests, bids, trades and deliveries.
pub trait Exchange {
    fn run_round(&mut self, time: Ticks, facilities: &mut Facilities) -> Result<(), ReactorError>;
}

/// An exchange that never trades.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExchange;

impl Exchange for NoExchange {
    fn run_round(&mut self, _time: Ticks, _facilities: &mut Facilities) -> Result<(), ReactorError> {
        Ok(())
    }
}

/// What happened during one step.
#[derive(Debug, Clone, Default)]
pub struct StepReport {
    pub time: Ticks,
    pub events: Vec<(FacilityId, ReactorEvent)>,
}

/// Owns independent facilities and advances them one timestep at a time.
#[derive(Debug, Default)]
pub struct Scheduler {
    facilities: Facilities,
    time: Ticks,
}

impl Scheduler {
    /// Create a scheduler whose first step runs at `start`.
    pub fn new(start: Ticks) -> Self {
        Self {
            facilities: SlotMap::with_key(),
            time: start,
        }
    }

    /// Time of the next step.
    pub fn time(&self) -> Ticks {
        self.time
    }

    /// Deploy a reactor at the current time and take ownership of it.
    pub fn deploy(&mut self, mut reactor: BatchReactor) -> Result<FacilityId, ReactorError> {
        reactor.deploy(self.time)?;
        let name = reactor.name().to_string();
        let id = self.facilities.insert(reactor);
        debug!(facility = ?id, reactor = %name, time = self.time, "facility deployed");
        Ok(id)
    }

    /// Remove a facility, returning it with its remaining inventory.
    pub fn decommission(&mut self, id: FacilityId) -> Option<BatchReactor> {
        let reactor = self.facilities.remove(id)?;
        debug!(
            facility = ?id,
            reactor = %reactor.name(),
            events_written = reactor.events().total_written(),
            inventory = %reactor.inventory_quantity(),
            "facility decommissioned"
        );
        Some(reactor)
    }

    pub fn get(&self, id: FacilityId) -> Option<&BatchReactor> {
        self.facilities.get(id)
    }

    pub fn get_mut(&mut self, id: FacilityId) -> Option<&mut BatchReactor> {
        self.facilities.get_mut(id)
    }

    pub fn facilities(&self) -> &Facilities {
        &self.facilities
    }

    pub fn len(&self) -> usize {
        self.facilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facilities.is_empty()
    }

    /// Run one full timestep.
    pub fn step(&mut self, exchange: &mut dyn Exchange) -> Result<StepReport, SchedulerError> {
        let time = self.time;

        self.for_each_facility(time, |r| r.on_tick(time))?;
        exchange
            .run_round(time, &mut self.facilities)
            .map_err(|source| {
                warn!(time, error = %source, "exchange round failed");
                SchedulerError::Exchange { time, source }
            })?;
        self.for_each_facility(time, |r| r.on_tock(time))?;

        let mut events = Vec::new();
        for (id, reactor) in self.facilities.iter_mut() {
            events.extend(reactor.drain_events().into_iter().map(|e| (id, e)));
        }

        self.time += 1;
        Ok(StepReport { time, events })
    }

    /// Run `steps` timesteps, concatenating their reports.
    pub fn run(
        &mut self,
        steps: u64,
        exchange: &mut dyn Exchange,
    ) -> Result<Vec<StepReport>, SchedulerError> {
        (0..steps).map(|_| self.step(&mut *exchange)).collect()
    }

    /// Apply `f` to every facility. Stops at the first failure in key order.
    #[cfg(not(feature = "parallel"))]
    fn for_each_facility<F>(&mut self, time: Ticks, f: F) -> Result<(), SchedulerError>
    where
        F: Fn(&mut BatchReactor) -> Result<(), ReactorError>,
    {
        for (facility, reactor) in self.facilities.iter_mut() {
            f(reactor).map_err(|source| facility_error(facility, time, source))?;
        }
        Ok(())
    }

    /// Apply `f` to every facility in parallel. Reports the first failure
    /// in key order so results do not depend on thread timing.
    #[cfg(feature = "parallel")]
    fn for_each_facility<F>(&mut self, time: Ticks, f: F) -> Result<(), SchedulerError>
    where
        F: Fn(&mut BatchReactor) -> Result<(), ReactorError> + Sync,
    {
        use rayon::prelude::*;

        let mut hosted: Vec<(FacilityId, &mut BatchReactor)> = self.facilities.iter_mut().collect();
        let results: Vec<(FacilityId, Result<(), ReactorError>)> = hosted
            .par_iter_mut()
            .map(|(facility, reactor)| (*facility, f(reactor)))
            .collect();
        for (facility, result) in results {
            result.map_err(|source| facility_error(facility, time, source))?;
        }
        Ok(())
    }
}

fn facility_error(facility: FacilityId, time: Ticks, source: ReactorError) -> SchedulerError {
    warn!(facility = ?facility, time, error = %source, "facility failed");
    SchedulerError::Facility {
        facility,
        time,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::Phase;
    use crate::test_utils::*;

    #[test]
    fn step_advances_time_and_drains_events() {
        let mut sched = Scheduler::new(0);
        let mut reactor = BatchReactor::new(config(10, 1, 2)).unwrap();
        reactor.stage_fuel(fuel(10)).unwrap();
        let id = sched.deploy(reactor).unwrap();

        let report = sched.step(&mut NoExchange).unwrap();
        assert_eq!(report.time, 0);
        assert_eq!(sched.time(), 1);
        assert!(report.events.iter().all(|(fid, _)| *fid == id));
        assert!(sched.get(id).unwrap().events().is_empty());
        assert_eq!(sched.get(id).unwrap().phase(), Phase::Processing);
    }

    #[test]
    fn facilities_run_independently() {
        let mut sched = Scheduler::new(0);
        let mut loaded = BatchReactor::new(config(10, 1, 2)).unwrap();
        loaded.stage_fuel(fuel(10)).unwrap();
        let a = sched.deploy(loaded).unwrap();
        let b = sched.deploy(BatchReactor::new(config(10, 1, 2)).unwrap()).unwrap();

        sched.run(3, &mut NoExchange).unwrap();
        assert_eq!(sched.get(a).unwrap().phase(), Phase::Waiting);
        assert_eq!(sched.get(b).unwrap().phase(), Phase::Initial);
    }

    #[test]
    fn supplier_exchange_fuels_empty_reactor() {
        let mut sched = Scheduler::new(0);
        let id = sched.deploy(BatchReactor::new(config(10, 3, 2)).unwrap()).unwrap();
        let mut exchange = TestMarket::supplier();

        // Step 0: request and receive fuel, tock loads the core.
        sched.step(&mut exchange).unwrap();
        assert_eq!(sched.get(id).unwrap().core().count(), 3);
        // Step 1: full core starts the cycle.
        sched.step(&mut exchange).unwrap();
        assert_eq!(sched.get(id).unwrap().phase(), Phase::Processing);
    }

    #[test]
    fn facility_failure_names_the_facility() {
        let mut sched = Scheduler::new(0);
        let id = sched.deploy(BatchReactor::new(config(10, 1, 2)).unwrap()).unwrap();
        // Drive the facility ahead of the scheduler clock.
        sched.get_mut(id).unwrap().on_tick(5).unwrap();
        let err = sched.step(&mut NoExchange).unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Facility { facility, time: 0, .. } if facility == id
        ));
    }

    #[test]
    fn exchange_failure_aborts_step() {
        struct Overdraw;
        impl Exchange for Overdraw {
            fn run_round(&mut self, _time: Ticks, facilities: &mut Facilities) -> Result<(), ReactorError> {
                for (_, reactor) in facilities.iter_mut() {
                    reactor.get_material_trades(&[spent_trade_of(1)])?;
                }
                Ok(())
            }
        }

        let mut sched = Scheduler::new(0);
        sched.deploy(BatchReactor::new(config(10, 1, 2)).unwrap()).unwrap();
        let err = sched.step(&mut Overdraw).unwrap_err();
        assert!(matches!(err, SchedulerError::Exchange { time: 0, .. }));
    }

    #[test]
    fn decommission_returns_inventory() {
        let mut sched = Scheduler::new(0);
        let mut reactor = BatchReactor::new(config(10, 1, 2)).unwrap();
        reactor.stage_fuel(fuel(15)).unwrap();
        let id = sched.deploy(reactor).unwrap();
        let back = sched.decommission(id).unwrap();
        assert_eq!(back.inventory_quantity(), qty(15));
        assert!(back.events().total_written() > 0);
        assert!(sched.is_empty());
    }
}
