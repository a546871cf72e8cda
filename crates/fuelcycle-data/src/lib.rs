//! Data-driven reactor definitions.
//!
//! Reactors are described in RON, TOML or JSON files using the schema in
//! [`schema`] and resolved into validated [`fuelcycle_core::config::ReactorConfig`]s
//! by [`loader`].

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, load_reactor, load_reactors};
