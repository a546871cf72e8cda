//! Reslicing incoming material into fixed-size batches.
//!
//! Deliveries arrive in arbitrary amounts. [`add_batches`] folds a delivery
//! into a buffer so the buffer holds zero or more batches of exactly
//! `batch_size` followed by at most one smaller trailing batch.

use crate::buffer::ResourceBuffer;
use crate::config::ConfigError;
use crate::error::ReactorError;
use crate::fixed::{EPSILON, Quantity, approx_ge};
use crate::material::{Material, MaterialError};

/// Fold `mat` into `buffer` in `batch_size` units.
///
/// 1. A partial trailing batch is topped up first, possibly swallowing the
///    whole delivery.
/// 2. Whole batches are cut from what is left.
/// 3. A non-negligible remainder becomes the new trailing batch.
pub fn add_batches(
    buffer: &mut ResourceBuffer,
    mut mat: Material,
    batch_size: Quantity,
) -> Result<(), ReactorError> {
    if batch_size <= Quantity::ZERO {
        return Err(ConfigError::InvalidConfiguration {
            field: "batch_size",
            reason: format!("must be positive, got {batch_size}"),
        }
        .into());
    }

    let partial = buffer
        .back()
        .filter(|last| !approx_ge(last.quantity(), batch_size));
    if let Some(last) = partial {
        if last.recipe() != mat.recipe() {
            return Err(MaterialError::CompositionMismatch {
                existing: last.recipe().clone(),
                incoming: mat.recipe().clone(),
            }
            .into());
        }
        let mut last = buffer.pop_back()?;
        let gap = batch_size - last.quantity();
        if mat.quantity() <= gap {
            last.absorb(mat)?;
            buffer.push(last)?;
            return Ok(());
        }
        let top_up = mat.extract(gap)?;
        last.absorb(top_up)?;
        buffer.push(last)?;
    }

    while mat.quantity() > batch_size {
        let batch = mat.extract(batch_size)?;
        buffer.push(batch)?;
    }

    if mat.quantity() > EPSILON {
        buffer.push(mat)?;
    }
    Ok(())
}
