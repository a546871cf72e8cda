//! Serde data file structs for reactor definitions.
//!
//! These structs define the on-disk format. They are deserialized from RON,
//! JSON, or TOML files and then resolved into engine types by the loader.

use serde::Deserialize;

// ===========================================================================
// Reactors
// ===========================================================================

/// A batch reactor definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ReactorData {
    /// Name used in logs. Defaults to the file stem for single-reactor files.
    #[serde(default)]
    pub name: Option<String>,
    pub fuel_input: StreamData,
    pub fuel_output: StreamData,
    /// Timesteps a full core is processed for.
    pub process_time: u64,
    /// Minimum timesteps between discharge and the next cycle.
    #[serde(default)]
    pub refuel_time: u64,
    /// Timesteps before discharge that fresh fuel may be ordered.
    #[serde(default)]
    pub order_lookahead: u64,
    pub batch_size: f64,
    pub batches_per_core: u32,
    /// Batches discharged per cycle. Omit to discharge the whole core.
    #[serde(default)]
    pub reload_batches: Option<u32>,
    /// Batches the reserve is topped up to. Defaults to the reload count.
    #[serde(default)]
    pub reserve_batches: Option<u32>,
    #[serde(default)]
    pub commodity_production: Option<ProductionData>,
}

/// A commodity and the recipe of material traded on it.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamData {
    pub commodity: String,
    pub recipe: String,
}

/// Reporting-only production metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductionData {
    pub commodity: String,
    pub capacity: f64,
    #[serde(default)]
    pub cost: f64,
}
