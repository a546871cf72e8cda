//! Integration test: Data-driven fleet
//!
//! Loads reactor definitions from the data crate's fixtures, hosts them in
//! a scheduler, and runs them against a shared supplier. Checks the fleet
//! conserves material, each facility cycles on its own clock, and repeated
//! runs are identical (with or without the `parallel` feature on the core).

use fuelcycle_core::event::ReactorEvent;
use fuelcycle_core::id::FacilityId;
use fuelcycle_core::phase::Phase;
use fuelcycle_core::scheduler::{Scheduler, SchedulerError};
use fuelcycle_core::test_utils::*;
use fuelcycle_data::{load_reactor, load_reactors};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../fuelcycle-data/tests/data")
        .join(name)
}

fn fleet_scheduler() -> (Scheduler, Vec<FacilityId>) {
    let mut sched = Scheduler::new(0);
    let ids = load_reactors(&fixture("fleet.toml"))
        .unwrap()
        .into_iter()
        .map(|reactor| sched.deploy(reactor).unwrap())
        .collect();
    (sched, ids)
}

fn cycle_starts(events: &[(FacilityId, ReactorEvent)], id: FacilityId) -> Vec<u64> {
    events
        .iter()
        .filter(|(fid, _)| *fid == id)
        .filter_map(|(_, ev)| match ev {
            ReactorEvent::PhaseChanged {
                to: Phase::Processing,
                time,
                ..
            } => Some(*time),
            _ => None,
        })
        .collect()
}

#[test]
fn fleet_conserves_material() {
    init_tracing();
    let (mut sched, _) = fleet_scheduler();
    let mut market = TestMarket::supplier();

    for _ in 0..40 {
        sched.step(&mut market).unwrap();
        let held = sched
            .facilities()
            .values()
            .map(|r| r.inventory_quantity())
            .fold(qty(0), |acc, q| acc + q);
        assert_eq!(held, market.delivered);
    }
}

#[test]
fn facilities_cycle_on_their_own_clocks() {
    init_tracing();
    let (mut sched, ids) = fleet_scheduler();
    let mut market = TestMarket::supplier();

    let events: Vec<_> = sched
        .run(30, &mut market)
        .unwrap()
        .into_iter()
        .flat_map(|report| report.events)
        .collect();

    // unit_1: 4-step cycles, whole-core reload, no delay.
    assert_eq!(cycle_starts(&events, ids[0]), vec![1, 6, 11, 16, 21, 26]);
    // unit_2: 6-step cycles, half-core reload, 2-step refuel delay.
    assert_eq!(cycle_starts(&events, ids[1]), vec![1, 9, 17, 25]);
}

#[test]
fn repeated_runs_are_identical() {
    let run = || {
        let (mut sched, _) = fleet_scheduler();
        let mut market = TestMarket::supplier();
        let events: Vec<ReactorEvent> = sched
            .run(25, &mut market)
            .unwrap()
            .into_iter()
            .flat_map(|report| report.events.into_iter().map(|(_, ev)| ev))
            .collect();
        (events, market.delivered)
    };
    assert_eq!(run(), run());
}

#[test]
fn loaded_reactor_joins_running_scheduler() {
    let (mut sched, _) = fleet_scheduler();
    let mut market = TestMarket::supplier();
    sched.run(5, &mut market).unwrap();

    let late = sched.deploy(load_reactor(&fixture("lwr.json")).unwrap()).unwrap();
    assert_eq!(sched.len(), 3);
    assert_eq!(sched.get(late).unwrap().name(), "lwr");

    // The reserve holds one reload, so the core fills one batch per step.
    sched.run(3, &mut market).unwrap();
    let lwr = sched.get(late).unwrap();
    assert_eq!(lwr.phase(), Phase::Initial);
    assert_eq!(lwr.core().count(), 3);

    sched.step(&mut market).unwrap();
    let lwr = sched.get(late).unwrap();
    assert_eq!(lwr.phase(), Phase::Processing);
    assert_eq!(lwr.process_start(), Some(8));
}

#[test]
fn failing_facility_stops_the_fleet() {
    let (mut sched, ids) = fleet_scheduler();
    sched.get_mut(ids[1]).unwrap().on_tick(10).unwrap();

    match sched.step(&mut TestMarket::supplier()).unwrap_err() {
        SchedulerError::Facility { facility, time, .. } => {
            assert_eq!(facility, ids[1]);
            assert_eq!(time, 0);
        }
        other => panic!("expected Facility error, got {other:?}"),
    }
}
