//! Top-level error type for reactor operations.

use crate::buffer::BufferError;
use crate::config::ConfigError;
use crate::material::MaterialError;
use crate::phase::PhaseError;

/// Any failure inside a batch reactor.
///
/// Configuration errors surface from construction. The rest surface from
/// tick, tock and trade callbacks and mean the facility's inventory no
/// longer matches what the phase machine or trade sizing promised; the
/// host is expected to stop the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReactorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("material error: {0}")]
    Material(#[from] MaterialError),

    #[error(transparent)]
    Phase(#[from] PhaseError),
}
