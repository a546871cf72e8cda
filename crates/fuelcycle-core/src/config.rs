//! Facility parameters, validated once before a reactor enters the simulation.

use crate::fixed::{Quantity, Ticks};
use crate::id::{Commodity, Recipe};
use serde::{Deserialize, Serialize};

/// Raised when a configuration value is out of range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfiguration {
        field: &'static str,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }
}

/// A commodity a material flows through, paired with the composition of
/// material on that channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialStream {
    pub commodity: Commodity,
    pub recipe: Recipe,
}

/// Production metadata for reporting. Not read by the phase machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionInfo {
    pub commodity: Commodity,
    pub capacity: f64,
    pub cost: f64,
}

/// Parameters of a batch reactor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactorConfig {
    /// Fresh fuel input.
    pub fuel_input: MaterialStream,
    /// Transmuted output.
    pub fuel_output: MaterialStream,
    /// Quantity of one batch.
    pub batch_size: Quantity,
    /// Batches that make up a full core.
    pub batches_per_core: u32,
    /// Batches discharged at the end of each cycle. `None` means the whole core.
    #[serde(default)]
    pub batches_per_reload: Option<u32>,
    /// Timesteps a loaded core is processed for.
    pub process_duration: Ticks,
    /// Minimum timesteps between a discharge and the next cycle start.
    #[serde(default)]
    pub refuel_delay: Ticks,
    /// How many timesteps before a discharge fresh fuel may be ordered.
    #[serde(default)]
    pub order_lookahead: Ticks,
    /// Batches of fresh fuel the reserve is topped up to.
    pub n_reserve_batches: u32,
    pub production: Option<ProductionInfo>,
}

impl ReactorConfig {
    /// Check every parameter range. Called by `BatchReactor::new`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size <= Quantity::ZERO {
            return Err(ConfigError::invalid(
                "batch_size",
                format!("must be positive, got {}", self.batch_size),
            ));
        }
        if self.batches_per_core == 0 {
            return Err(ConfigError::invalid("batches_per_core", "must be at least 1"));
        }
        if let Some(reload) = self.batches_per_reload {
            if reload == 0 || reload > self.batches_per_core {
                return Err(ConfigError::invalid(
                    "batches_per_reload",
                    format!("must be in 1..={}, got {reload}", self.batches_per_core),
                ));
            }
        }
        if self.n_reserve_batches == 0 {
            return Err(ConfigError::invalid("n_reserve_batches", "must be at least 1"));
        }
        // Core loading and reserve target must be representable.
        let representable = |n: u32| {
            Quantity::checked_from_num(n)
                .and_then(|n| self.batch_size.checked_mul(n))
                .is_some()
        };
        if !representable(self.batches_per_core) {
            return Err(ConfigError::invalid(
                "batches_per_core",
                "core loading overflows the quantity range",
            ));
        }
        if !representable(self.n_reserve_batches) {
            return Err(ConfigError::invalid(
                "n_reserve_batches",
                "reserve target overflows the quantity range",
            ));
        }
        if let Some(production) = &self.production {
            let valid = |v: f64| v.is_finite() && v >= 0.0;
            if !valid(production.capacity) || !valid(production.cost) {
                return Err(ConfigError::invalid(
                    "production",
                    "capacity and cost must be finite and non-negative",
                ));
            }
        }
        Ok(())
    }

    /// Number of batches discharged per cycle.
    pub fn reload_batches(&self) -> u32 {
        self.batches_per_reload.unwrap_or(self.batches_per_core)
    }

    /// Quantity of a full core.
    pub fn core_loading(&self) -> Quantity {
        self.batch_size * Quantity::from_num(self.batches_per_core)
    }

    /// Quantity the reserve is topped up to.
    pub fn reserve_target(&self) -> Quantity {
        self.batch_size * Quantity::from_num(self.n_reserve_batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::config;

    #[test]
    fn default_test_config_is_valid() {
        assert!(config(10, 3, 3).validate().is_ok());
    }

    #[test]
    fn zero_batch_size_rejected() {
        let mut cfg = config(10, 3, 3);
        cfg.batch_size = Quantity::ZERO;
        let err = cfg.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidConfiguration { field: "batch_size", .. }
        ));
    }

    #[test]
    fn negative_batch_size_rejected() {
        let mut cfg = config(10, 3, 3);
        cfg.batch_size = Quantity::from_num(-1);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_batches_per_core_rejected() {
        let mut cfg = config(10, 3, 3);
        cfg.batches_per_core = 0;
        let err = cfg.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidConfiguration { field: "batches_per_core", .. }
        ));
    }

    #[test]
    fn reload_larger_than_core_rejected() {
        let mut cfg = config(10, 3, 3);
        cfg.batches_per_reload = Some(4);
        assert!(cfg.validate().is_err());
        cfg.batches_per_reload = Some(0);
        assert!(cfg.validate().is_err());
        cfg.batches_per_reload = Some(1);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_reserve_batches_rejected() {
        let mut cfg = config(10, 3, 3);
        cfg.n_reserve_batches = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn non_finite_production_rejected() {
        let mut cfg = config(10, 3, 3);
        if let Some(production) = cfg.production.as_mut() {
            production.capacity = f64::NAN;
        }
        assert!(cfg.validate().is_err());

        let mut cfg = config(10, 3, 3);
        if let Some(production) = cfg.production.as_mut() {
            production.cost = f64::INFINITY;
        }
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn derived_quantities() {
        let mut cfg = config(10, 3, 3);
        cfg.n_reserve_batches = 2;
        assert_eq!(cfg.core_loading(), Quantity::from_num(30));
        assert_eq!(cfg.reserve_target(), Quantity::from_num(20));
        assert_eq!(cfg.reload_batches(), 3);
        cfg.batches_per_reload = Some(1);
        assert_eq!(cfg.reload_batches(), 1);
    }
}
