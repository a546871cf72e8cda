//! Shared test helpers for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::config::{MaterialStream, ProductionInfo, ReactorConfig};
use crate::error::ReactorError;
use crate::fixed::{Quantity, Ticks};
use crate::id::{Commodity, Recipe, RequestId};
use crate::material::Material;
use crate::reactor::BatchReactor;
use crate::scheduler::{Exchange, Facilities};
use crate::trade::{CommodityRequests, PostedRequest, Request, Trade};

// ===========================================================================
// Quantities and materials
// ===========================================================================

pub fn qty(v: i32) -> Quantity {
    Quantity::from_num(v)
}

pub fn fresh_fuel() -> MaterialStream {
    MaterialStream {
        commodity: Commodity::new("fresh_fuel"),
        recipe: Recipe::new("uox"),
    }
}

pub fn spent_fuel() -> MaterialStream {
    MaterialStream {
        commodity: Commodity::new("spent_fuel"),
        recipe: Recipe::new("spent_uox"),
    }
}

/// Fresh fuel of the test input recipe.
pub fn fuel(amount: i32) -> Material {
    Material::new(qty(amount), fresh_fuel().recipe).expect("non-negative test quantity")
}

// ===========================================================================
// Reactors
// ===========================================================================

/// A valid config with `n_reserve_batches == batches_per_core`, no refuel
/// delay and no order lookahead.
pub fn config(batch_size: i32, batches_per_core: u32, process_duration: Ticks) -> ReactorConfig {
    ReactorConfig {
        fuel_input: fresh_fuel(),
        fuel_output: spent_fuel(),
        batch_size: qty(batch_size),
        batches_per_core,
        batches_per_reload: None,
        process_duration,
        refuel_delay: 0,
        order_lookahead: 0,
        n_reserve_batches: batches_per_core,
        production: Some(ProductionInfo {
            commodity: Commodity::new("power"),
            capacity: 1000.0,
            cost: 1.0,
        }),
    }
}

/// Build, stage `staged` units of fuel, and deploy at time 0.
pub fn reactor_with_staged(cfg: ReactorConfig, staged: i32) -> BatchReactor {
    let mut reactor = BatchReactor::new(cfg).expect("valid test config");
    reactor.stage_fuel(fuel(staged)).expect("staging succeeds");
    reactor.deploy(0).expect("deploy succeeds");
    reactor
}

/// A deployed reactor holding `amount` of spent fuel as a single batch in
/// storage, produced by one zero-length cycle at time 0.
pub fn reactor_with_storage(amount: i32) -> BatchReactor {
    let mut reactor = reactor_with_staged(config(amount, 1, 0), amount);
    reactor.on_tick(0).expect("zero-length cycle discharges");
    reactor
}

// ===========================================================================
// Trades
// ===========================================================================

pub fn fresh_trade(amount: i32) -> Trade {
    Trade {
        request: RequestId(0),
        commodity: fresh_fuel().commodity,
        amount: qty(amount),
    }
}

pub fn spent_trade_of(amount: i32) -> Trade {
    Trade {
        request: RequestId(0),
        commodity: spent_fuel().commodity,
        amount: qty(amount),
    }
}

/// Open requests on the spent fuel commodity, ids assigned in order.
pub fn spent_requests(amounts: &[i32]) -> CommodityRequests {
    let posted = amounts
        .iter()
        .enumerate()
        .map(|(i, &amount)| PostedRequest {
            id: RequestId(i as u64),
            request: Request {
                commodity: spent_fuel().commodity,
                target: Material::new(qty(amount), spent_fuel().recipe)
                    .expect("non-negative test quantity"),
            },
        })
        .collect();
    let mut map = CommodityRequests::new();
    map.insert(spent_fuel().commodity, posted);
    map
}

// ===========================================================================
// Exchanges
// ===========================================================================

/// Fills every fuel request in full and optionally buys spent fuel.
///
/// Not a matching engine: it trusts each facility's own sizing.
#[derive(Debug, Default)]
pub struct TestMarket {
    /// Quantity of spent fuel requested from each facility per round.
    pub demand: Option<Quantity>,
    /// Total fresh fuel delivered.
    pub delivered: Quantity,
    /// Total spent fuel received.
    pub received: Quantity,
    next_id: u64,
}

impl TestMarket {
    pub fn supplier() -> Self {
        Self::default()
    }

    pub fn with_demand(demand: Quantity) -> Self {
        Self {
            demand: Some(demand),
            ..Self::default()
        }
    }

    fn next_request(&mut self) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Deliver exactly what the reactor requests.
    pub fn supply(&mut self, reactor: &mut BatchReactor) -> Result<(), ReactorError> {
        let mut responses = Vec::new();
        for port in reactor.get_material_requests()? {
            for req in port.requests {
                let amount = req.target.quantity();
                let trade = Trade {
                    request: self.next_request(),
                    commodity: req.commodity,
                    amount,
                };
                self.delivered += amount;
                responses.push((trade, req.target));
            }
        }
        reactor.accept_material_trades(responses)
    }

    /// Post one spent fuel request and take every bid within the
    /// portfolio's capacity.
    pub fn buy(&mut self, reactor: &mut BatchReactor) -> Result<(), ReactorError> {
        let Some(demand) = self.demand else {
            return Ok(());
        };
        let id = self.next_request();
        let mut requests = CommodityRequests::new();
        requests.insert(
            spent_fuel().commodity,
            vec![PostedRequest {
                id,
                request: Request {
                    commodity: spent_fuel().commodity,
                    target: Material::new(demand, spent_fuel().recipe)?,
                },
            }],
        );

        let mut trades = Vec::new();
        for port in reactor.get_material_bids(&requests)? {
            let mut remaining = port
                .constraints
                .iter()
                .map(|c| c.capacity)
                .min()
                .unwrap_or(Quantity::ZERO);
            for bid in port.bids {
                let amount = bid.offer.quantity().min(remaining);
                remaining -= amount;
                trades.push(Trade {
                    request: bid.request,
                    commodity: spent_fuel().commodity,
                    amount,
                });
            }
        }
        for (_, mat) in reactor.get_material_trades(&trades)? {
            self.received += mat.quantity();
        }
        Ok(())
    }
}

impl Exchange for TestMarket {
    fn run_round(&mut self, _time: Ticks, facilities: &mut Facilities) -> Result<(), ReactorError> {
        for (_, reactor) in facilities.iter_mut() {
            self.buy(reactor)?;
            self.supply(reactor)?;
        }
        Ok(())
    }
}

/// One full timestep on a single reactor: tick, trade, tock.
pub fn step_reactor(
    reactor: &mut BatchReactor,
    market: &mut TestMarket,
    time: Ticks,
) -> Result<(), ReactorError> {
    reactor.on_tick(time)?;
    market.buy(reactor)?;
    market.supply(reactor)?;
    reactor.on_tock(time)
}
