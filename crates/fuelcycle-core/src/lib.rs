//! Fuelcycle Core -- the batch reactor facility engine for discrete-time
//! fuel cycle simulations.
//!
//! A batch reactor loads fresh fuel in fixed-size batches, processes a full
//! core for a fixed number of timesteps, discharges the batches transmuted
//! into spent fuel, and trades with the outside world only through
//! request/bid descriptors.
//!
//! # Timestep Protocol
//!
//! Each timestep the host (or [`scheduler::Scheduler`]) runs:
//!
//! 1. **Tick** -- evaluate the phase machine; discharge at cycle end.
//! 2. **Requests/bids** -- size fuel requests from the reserve and product
//!    bids from storage.
//! 3. **Trades** -- ship product out of storage; fold delivered fuel into
//!    the reserve in batch-size units.
//! 4. **Tock** -- refuel the core from the reserve when idle.
//!
//! # Key Types
//!
//! - [`reactor::BatchReactor`] -- the facility: three buffers plus the phase
//!   machine.
//! - [`buffer::ResourceBuffer`] -- ordered, capacity-bounded material buffer.
//! - [`material::Material`] -- a quantity of uniform composition.
//! - [`batching::add_batches`] -- reslices deliveries into fixed-size batches.
//! - [`phase`] -- pure transition functions for Initial/Processing/Waiting.
//! - [`trade`] -- request, bid and trade descriptors.
//! - [`fixed::Quantity`] -- Q32.32 fixed-point type for deterministic math.

pub mod batching;
pub mod buffer;
pub mod config;
pub mod error;
pub mod event;
pub mod fixed;
pub mod id;
pub mod material;
pub mod phase;
pub mod reactor;
pub mod scheduler;
pub mod trade;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::ReactorError;
pub use reactor::BatchReactor;
