//! Reads reactor data files and resolves them into validated reactors.
//!
//! Provides format detection (RON/JSON/TOML), deserialization helpers, and
//! the resolution step from [`ReactorData`] into [`ReactorConfig`].

use crate::schema::{ProductionData, ReactorData, StreamData};
use fuelcycle_core::BatchReactor;
use fuelcycle_core::config::{ConfigError, MaterialStream, ProductionInfo, ReactorConfig};
use fuelcycle_core::fixed::Quantity;
use fuelcycle_core::id::{Commodity, Recipe};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Top-level key holding the reactor array in TOML list files.
pub const REACTORS_KEY: &str = "reactors";

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// Two reactors in one list file share a name.
    #[error("duplicate reactor name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The definition parsed but its parameters are out of range.
    #[error("invalid reactor in {file}: {source}")]
    Config {
        file: PathBuf,
        #[source]
        source: ConfigError,
    },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Deserialize `content` according to `format`. `path` is used for errors.
pub fn deserialize_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    path: &Path,
) -> Result<T, DataLoadError> {
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(content).map_err(|e| parse_error(path, e)),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format, path)
}

/// Deserialize a list from a file. TOML cannot hold a top-level array, so
/// the list is read from the array at `toml_key`. RON and JSON files are
/// deserialized directly as `Vec<T>`.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron | Format::Json => deserialize_str(&content, format, path),
        Format::Toml => {
            let mut table: toml::Table =
                toml::from_str(&content).map_err(|e| parse_error(path, e))?;
            let array = table
                .remove(toml_key)
                .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?;
            array
                .try_into()
                .map_err(|e: toml::de::Error| parse_error(path, e))
        }
    }
}

// ===========================================================================
// Resolution
// ===========================================================================

fn stream(data: StreamData) -> MaterialStream {
    MaterialStream {
        commodity: Commodity::new(data.commodity),
        recipe: Recipe::new(data.recipe),
    }
}

fn production(data: ProductionData) -> ProductionInfo {
    ProductionInfo {
        commodity: Commodity::new(data.commodity),
        capacity: data.capacity,
        cost: data.cost,
    }
}

/// Convert an on-disk definition into a validated [`ReactorConfig`].
///
/// `reserve_batches` defaults to the reload count, so a reactor keeps one
/// reload's worth of fuel on hand unless told otherwise.
pub fn resolve_config(data: ReactorData, file: &Path) -> Result<ReactorConfig, DataLoadError> {
    let invalid = |source: ConfigError| DataLoadError::Config {
        file: file.to_path_buf(),
        source,
    };

    let batch_size = Some(data.batch_size)
        .filter(|v| v.is_finite())
        .and_then(Quantity::checked_from_num)
        .ok_or_else(|| {
            invalid(ConfigError::InvalidConfiguration {
                field: "batch_size",
                reason: format!("{} is not a representable quantity", data.batch_size),
            })
        })?;

    let reload = data.reload_batches.unwrap_or(data.batches_per_core);
    let config = ReactorConfig {
        fuel_input: stream(data.fuel_input),
        fuel_output: stream(data.fuel_output),
        batch_size,
        batches_per_core: data.batches_per_core,
        batches_per_reload: data.reload_batches,
        process_duration: data.process_time,
        refuel_delay: data.refuel_time,
        order_lookahead: data.order_lookahead,
        n_reserve_batches: data.reserve_batches.unwrap_or(reload),
        production: data.commodity_production.map(production),
    };
    config.validate().map_err(invalid)?;
    Ok(config)
}

fn build(data: ReactorData, default_name: &str, file: &Path) -> Result<BatchReactor, DataLoadError> {
    let name = data.name.clone().unwrap_or_else(|| default_name.to_string());
    let config = resolve_config(data, file)?;
    let reactor = BatchReactor::new(config)
        .map_err(|source| DataLoadError::Config {
            file: file.to_path_buf(),
            source,
        })?
        .with_name(name);
    debug!(file = %file.display(), reactor = %reactor.name(), "reactor loaded");
    Ok(reactor)
}

/// Load one reactor from a file. Unnamed reactors take the file stem.
pub fn load_reactor(path: &Path) -> Result<BatchReactor, DataLoadError> {
    let data: ReactorData = deserialize_file(path)?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("batch_reactor");
    build(data, stem, path)
}

/// Load every reactor in a list file. Unnamed reactors are numbered by
/// position; names must be unique within the file.
pub fn load_reactors(path: &Path) -> Result<Vec<BatchReactor>, DataLoadError> {
    let list: Vec<ReactorData> = deserialize_list(path, REACTORS_KEY)?;
    let mut seen = HashSet::new();
    let mut reactors = Vec::with_capacity(list.len());
    for (i, data) in list.into_iter().enumerate() {
        let reactor = build(data, &format!("reactor_{i}"), path)?;
        if !seen.insert(reactor.name().to_string()) {
            return Err(DataLoadError::DuplicateName {
                file: path.to_path_buf(),
                name: reactor.name().to_string(),
            });
        }
        reactors.push(reactor);
    }
    Ok(reactors)
}
