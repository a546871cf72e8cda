//! The batch reactor facility.
//!
//! # Architecture
//!
//! A [`BatchReactor`] owns:
//! - Three [`ResourceBuffer`]s: `reserve` (fresh fuel staged for loading),
//!   `core` (batches being processed), `storage` (transmuted product).
//! - A [`PhaseState`] driven by the pure functions in [`crate::phase`].
//! - An [`EventLog`] the host drains.
//!
//! # Timestep protocol
//!
//! Each timestep the host calls, in order:
//! 1. [`BatchReactor::on_tick`] -- phase transitions, discharge at cycle end
//! 2. [`BatchReactor::get_material_requests`] / [`BatchReactor::get_material_bids`]
//! 3. [`BatchReactor::get_material_trades`] / [`BatchReactor::accept_material_trades`]
//! 4. [`BatchReactor::on_tock`] -- refuel the core from the reserve
//!
//! Every error returned from these callbacks means the inventory drifted
//! from what the phase machine expects and the run should stop.

use crate::batching::add_batches;
use crate::buffer::ResourceBuffer;
use crate::config::{ConfigError, ReactorConfig};
use crate::error::ReactorError;
use crate::event::{EventLog, ReactorEvent};
use crate::fixed::{Quantity, Ticks};
use crate::material::Material;
use crate::phase::{
    CoreSnapshot, CycleTiming, Phase, PhaseState, TockAction, plan_tick, plan_tock,
};
use crate::trade::{
    BidPortfolio, CommodityRequests, RequestPortfolio, Trade, bid_portfolio, merge_materials,
    order_size, request_portfolio,
};
use std::fmt;
use tracing::{debug, info};

/// A reactor that loads fuel in fixed-size batches, processes a full core
/// for a fixed duration, then discharges transmuted product.
#[derive(Debug, Clone)]
pub struct BatchReactor {
    name: String,
    config: ReactorConfig,
    state: PhaseState,
    reserve: ResourceBuffer,
    core: ResourceBuffer,
    storage: ResourceBuffer,
    /// Time of the most recent callback.
    now: Ticks,
    events: EventLog,
}

impl BatchReactor {
    /// Validate `config` and build an undeployed reactor with empty buffers.
    pub fn new(config: ReactorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let core = ResourceBuffer::new(config.core_loading());
        Ok(Self {
            name: String::from("batch_reactor"),
            config,
            state: PhaseState::default(),
            reserve: ResourceBuffer::unbounded(),
            core,
            storage: ResourceBuffer::unbounded(),
            now: 0,
            events: EventLog::new(),
        })
    }

    /// Set the name used in logs and the summary.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    // -----------------------------------------------------------------------
    // Deployment
    // -----------------------------------------------------------------------

    /// Place fuel in the reserve before the reactor enters the simulation.
    pub fn stage_fuel(&mut self, mat: Material) -> Result<(), ReactorError> {
        add_batches(&mut self.reserve, mat, self.config.batch_size)
    }

    /// Enter the simulation in the Initial phase.
    ///
    /// Staged fuel is loaded into the core here, so a reactor staged with a
    /// full core's worth of fuel starts processing at its first tick.
    pub fn deploy(&mut self, time: Ticks) -> Result<(), ReactorError> {
        self.state = PhaseState::default();
        self.now = time;
        self.events.push(ReactorEvent::Deployed { time });
        debug!(reactor = %self.name, time, summary = %self, "deployed");
        self.refuel()
    }

    // -----------------------------------------------------------------------
    // Scheduler callbacks
    // -----------------------------------------------------------------------

    /// Evaluate phase transitions; discharge the core at cycle end.
    pub fn on_tick(&mut self, time: Ticks) -> Result<(), ReactorError> {
        let snapshot = CoreSnapshot {
            core_batches: self.core.count(),
            batches_per_core: self.config.batches_per_core as usize,
        };
        let transition = plan_tick(&self.state, &self.timing(), snapshot, time)?;
        self.now = time;

        if transition.discharge {
            self.discharge()?;
        }

        let mut from = self.state.phase;
        for to in transition.entered {
            info!(
                reactor = %self.name,
                time,
                from = from.name(),
                to = to.name(),
                "phase change"
            );
            self.events.push(ReactorEvent::PhaseChanged { from, to, time });
            from = to;
        }
        self.state = transition.next;
        Ok(())
    }

    /// Refuel the core when idle.
    pub fn on_tock(&mut self, time: Ticks) -> Result<(), ReactorError> {
        self.now = time;
        match plan_tock(self.state.phase) {
            TockAction::Refuel => self.refuel(),
            TockAction::Idle => Ok(()),
        }
    }

    /// Move full batches from reserve into core until the core is full or
    /// no full batch is left. Partial batches stay in the reserve.
    fn refuel(&mut self) -> Result<(), ReactorError> {
        let batch_size = self.config.batch_size;
        while self.core.count() < self.config.batches_per_core as usize
            && self.reserve.has_full_batch(batch_size)
        {
            let batch = self.reserve.pop()?;
            let quantity = batch.quantity();
            self.core.push(batch)?;
            debug!(reactor = %self.name, time = self.now, %quantity, "batch loaded");
            self.events.push(ReactorEvent::BatchLoaded {
                quantity,
                time: self.now,
            });
        }
        Ok(())
    }

    /// Move the reload batches from core to storage, transmuting each.
    fn discharge(&mut self) -> Result<(), ReactorError> {
        for _ in 0..self.config.reload_batches() {
            let mut batch = self.core.pop()?;
            batch.transmute(self.config.fuel_output.recipe.clone());
            let quantity = batch.quantity();
            self.storage.push(batch)?;
            debug!(reactor = %self.name, time = self.now, %quantity, "batch discharged");
            self.events.push(ReactorEvent::BatchDischarged {
                quantity,
                recipe: self.config.fuel_output.recipe.clone(),
                time: self.now,
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Exchange callbacks
    // -----------------------------------------------------------------------

    /// Request enough fresh fuel to top the reserve up to its target.
    ///
    /// Empty when the gap is negligible or the order window for the
    /// current cycle has not opened yet. Does not change any state.
    pub fn get_material_requests(&self) -> Result<Vec<RequestPortfolio>, ReactorError> {
        if !self.order_window_open() {
            return Ok(Vec::new());
        }
        let Some(size) = order_size(self.config.reserve_target(), self.reserve.quantity()) else {
            return Ok(Vec::new());
        };
        Ok(vec![request_portfolio(&self.config.fuel_input, size)?])
    }

    /// Merge every delivered material and fold it into the reserve.
    pub fn accept_material_trades(
        &mut self,
        responses: Vec<(Trade, Material)>,
    ) -> Result<(), ReactorError> {
        let Some(delivery) = merge_materials(responses.into_iter().map(|(_, mat)| mat))? else {
            return Ok(());
        };
        let quantity = delivery.quantity();
        add_batches(&mut self.reserve, delivery, self.config.batch_size)?;
        debug!(reactor = %self.name, time = self.now, %quantity, "fuel received");
        self.events.push(ReactorEvent::FuelReceived {
            quantity,
            time: self.now,
        });
        Ok(())
    }

    /// Bid stored product against open requests on the output commodity.
    pub fn get_material_bids(
        &self,
        requests: &CommodityRequests,
    ) -> Result<Vec<BidPortfolio>, ReactorError> {
        let Some(open) = requests.get(&self.config.fuel_output.commodity) else {
            return Ok(Vec::new());
        };
        Ok(vec![bid_portfolio(
            open,
            &self.config.fuel_output,
            self.storage.quantity(),
        )?])
    }

    /// Pull exactly each traded amount out of storage.
    ///
    /// Fails with `InsufficientQuantity` if the exchange settled more than
    /// storage holds.
    pub fn get_material_trades(
        &mut self,
        trades: &[Trade],
    ) -> Result<Vec<(Trade, Material)>, ReactorError> {
        let mut responses = Vec::with_capacity(trades.len());
        for trade in trades {
            let manifest = self.storage.pop_quantity(trade.amount)?;
            let response = match merge_materials(manifest)? {
                Some(mat) => mat,
                None => Material::new(Quantity::ZERO, self.config.fuel_output.recipe.clone())?,
            };
            info!(
                reactor = %self.name,
                time = self.now,
                commodity = %trade.commodity,
                quantity = %trade.amount,
                "shipping order"
            );
            self.events.push(ReactorEvent::OrderShipped {
                commodity: trade.commodity.clone(),
                quantity: response.quantity(),
                time: self.now,
            });
            responses.push((trade.clone(), response));
        }
        Ok(responses)
    }

    // -----------------------------------------------------------------------
    // Timing
    // -----------------------------------------------------------------------

    fn timing(&self) -> CycleTiming {
        CycleTiming {
            process_duration: self.config.process_duration,
            refuel_delay: self.config.refuel_delay,
        }
    }

    /// End of the current (or last) cycle, if one has started.
    pub fn end_time(&self) -> Option<Ticks> {
        self.state.end_time(&self.timing())
    }

    /// Earliest time fuel for the next cycle may be ordered. `None` before
    /// the first cycle, when ordering is always allowed.
    pub fn order_time(&self) -> Option<Ticks> {
        self.end_time()
            .map(|end| end.saturating_sub(self.config.order_lookahead))
    }

    fn order_window_open(&self) -> bool {
        self.order_time().is_none_or(|t| t <= self.now)
    }

    // -----------------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ReactorConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn phase_state(&self) -> &PhaseState {
        &self.state
    }

    pub fn process_start(&self) -> Option<Ticks> {
        self.state.process_start
    }

    pub fn now(&self) -> Ticks {
        self.now
    }

    pub fn reserve(&self) -> &ResourceBuffer {
        &self.reserve
    }

    pub fn core(&self) -> &ResourceBuffer {
        &self.core
    }

    pub fn storage(&self) -> &ResourceBuffer {
        &self.storage
    }

    /// Material held across all three buffers.
    pub fn inventory_quantity(&self) -> Quantity {
        self.reserve
            .quantity()
            .saturating_add(self.core.quantity())
            .saturating_add(self.storage.quantity())
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Take every event recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<ReactorEvent> {
        self.events.drain()
    }
}

impl fmt::Display for BatchReactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cfg = &self.config;
        write!(
            f,
            "{} has facility parameters {{Process Time = {}, Refuel Time = {}, \
             Core Loading = {}, Batches Per Core = {}, converts commodity '{}' \
             into commodity '{}'}}",
            self.name,
            cfg.process_duration,
            cfg.refuel_delay,
            self.core.capacity(),
            cfg.batches_per_core,
            cfg.fuel_input.commodity,
            cfg.fuel_output.commodity,
        )
    }
}
