//! Ordered material buffers.
//!
//! A [`ResourceBuffer`] holds whole [`Material`] batches in insertion order.
//! The facility keeps three of them (reserve, core, storage); batches move
//! between them by value, so each batch lives in exactly one buffer.

use crate::fixed::{EPSILON, Quantity, approx_ge};
use crate::material::Material;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Errors raised by buffer operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("buffer is empty")]
    Empty,
    #[error("requested {requested} but buffer holds {available}")]
    InsufficientQuantity {
        requested: Quantity,
        available: Quantity,
    },
    #[error("pushing {incoming} onto {current} would exceed capacity {capacity}")]
    CapacityExceeded {
        incoming: Quantity,
        current: Quantity,
        capacity: Quantity,
    },
}

/// A FIFO sequence of material batches with a quantity ceiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceBuffer {
    batches: VecDeque<Material>,
    capacity: Quantity,
    /// Cached sum of batch quantities.
    quantity: Quantity,
}

impl Default for ResourceBuffer {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl ResourceBuffer {
    pub fn new(capacity: Quantity) -> Self {
        Self {
            batches: VecDeque::new(),
            capacity,
            quantity: Quantity::ZERO,
        }
    }

    /// A buffer whose ceiling is the largest representable quantity.
    pub fn unbounded() -> Self {
        Self::new(Quantity::MAX)
    }

    /// Append a batch at the back.
    pub fn push(&mut self, mat: Material) -> Result<(), BufferError> {
        if mat.quantity() > self.space() {
            return Err(BufferError::CapacityExceeded {
                incoming: mat.quantity(),
                current: self.quantity,
                capacity: self.capacity,
            });
        }
        // quantity + incoming <= capacity, so this cannot overflow.
        self.quantity += mat.quantity();
        self.batches.push_back(mat);
        Ok(())
    }

    /// Remove the oldest batch.
    pub fn pop(&mut self) -> Result<Material, BufferError> {
        let mat = self.batches.pop_front().ok_or(BufferError::Empty)?;
        self.quantity -= mat.quantity();
        Ok(mat)
    }

    /// Remove the most recently pushed batch.
    pub fn pop_back(&mut self) -> Result<Material, BufferError> {
        let mat = self.batches.pop_back().ok_or(BufferError::Empty)?;
        self.quantity -= mat.quantity();
        Ok(mat)
    }

    /// Remove exactly `amount` from the front, splitting the last batch
    /// touched if it holds more than is still needed.
    ///
    /// Returns the removed batches in order; a split fragment, if any, is
    /// last. The buffer is left untouched on error.
    pub fn pop_quantity(&mut self, amount: Quantity) -> Result<Vec<Material>, BufferError> {
        if amount > self.quantity.saturating_add(EPSILON) {
            return Err(BufferError::InsufficientQuantity {
                requested: amount,
                available: self.quantity,
            });
        }

        let mut out = Vec::new();
        let mut remaining = amount;
        while remaining > EPSILON {
            let Some(mut front) = self.batches.pop_front() else {
                break;
            };
            if front.quantity() <= remaining.saturating_add(EPSILON) {
                remaining = (remaining - front.quantity()).max(Quantity::ZERO);
                self.quantity -= front.quantity();
                out.push(front);
            } else {
                // front.quantity() > remaining, so the split cannot fail.
                let fragment = front.extract(remaining).map_err(|_| {
                    BufferError::InsufficientQuantity {
                        requested: remaining,
                        available: front.quantity(),
                    }
                })?;
                self.quantity -= fragment.quantity();
                self.batches.push_front(front);
                out.push(fragment);
                remaining = Quantity::ZERO;
            }
        }
        Ok(out)
    }

    /// Whether the front batch is a full batch of `batch_size`.
    pub fn has_full_batch(&self, batch_size: Quantity) -> bool {
        self.front()
            .is_some_and(|m| approx_ge(m.quantity(), batch_size))
    }

    pub fn front(&self) -> Option<&Material> {
        self.batches.front()
    }

    pub fn back(&self) -> Option<&Material> {
        self.batches.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.batches.iter()
    }

    /// Total quantity across all batches.
    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Number of batches held.
    pub fn count(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn capacity(&self) -> Quantity {
        self.capacity
    }

    /// Quantity that can still be pushed before hitting the ceiling.
    pub fn space(&self) -> Quantity {
        self.capacity.saturating_sub(self.quantity).max(Quantity::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Recipe;

    fn q(v: i32) -> Quantity {
        Quantity::from_num(v)
    }

    fn uox(v: i32) -> Material {
        Material::new(q(v), Recipe::new("uox")).unwrap()
    }

    fn quantities(buf: &ResourceBuffer) -> Vec<Quantity> {
        buf.iter().map(Material::quantity).collect()
    }

    #[test]
    fn push_and_pop_are_fifo() {
        let mut buf = ResourceBuffer::unbounded();
        buf.push(uox(1)).unwrap();
        buf.push(uox(2)).unwrap();
        buf.push(uox(3)).unwrap();
        assert_eq!(buf.count(), 3);
        assert_eq!(buf.quantity(), q(6));

        assert_eq!(buf.pop().unwrap().quantity(), q(1));
        assert_eq!(buf.pop_back().unwrap().quantity(), q(3));
        assert_eq!(quantities(&buf), vec![q(2)]);
        assert_eq!(buf.quantity(), q(2));
    }

    #[test]
    fn pop_from_empty_fails() {
        let mut buf = ResourceBuffer::unbounded();
        assert_eq!(buf.pop().unwrap_err(), BufferError::Empty);
        assert_eq!(buf.pop_back().unwrap_err(), BufferError::Empty);
        assert!(buf.is_empty());
    }

    #[test]
    fn push_beyond_capacity_fails() {
        let mut buf = ResourceBuffer::new(q(10));
        buf.push(uox(8)).unwrap();
        let err = buf.push(uox(3)).unwrap_err();
        assert!(matches!(err, BufferError::CapacityExceeded { .. }));
        assert_eq!(buf.quantity(), q(8));
        assert_eq!(buf.space(), q(2));
        buf.push(uox(2)).unwrap();
        assert_eq!(buf.space(), Quantity::ZERO);
    }

    #[test]
    fn unbounded_accepts_large_pushes() {
        let mut buf = ResourceBuffer::unbounded();
        buf.push(uox(1_000_000)).unwrap();
        buf.push(uox(1_000_000)).unwrap();
        assert_eq!(buf.quantity(), q(2_000_000));
    }

    #[test]
    fn pop_quantity_whole_batches() {
        let mut buf = ResourceBuffer::unbounded();
        buf.push(uox(10)).unwrap();
        buf.push(uox(10)).unwrap();
        buf.push(uox(5)).unwrap();

        let out = buf.pop_quantity(q(20)).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(quantities(&buf), vec![q(5)]);
        assert_eq!(buf.quantity(), q(5));
    }

    #[test]
    fn pop_quantity_splits_last_batch() {
        let mut buf = ResourceBuffer::unbounded();
        buf.push(uox(10)).unwrap();
        buf.push(uox(10)).unwrap();

        let out = buf.pop_quantity(q(13)).unwrap();
        let got: Vec<Quantity> = out.iter().map(Material::quantity).collect();
        assert_eq!(got, vec![q(10), q(3)]);
        assert_eq!(quantities(&buf), vec![q(7)]);
        assert_eq!(buf.quantity(), q(7));
    }

    #[test]
    fn pop_quantity_too_much_leaves_buffer_untouched() {
        let mut buf = ResourceBuffer::unbounded();
        buf.push(uox(4)).unwrap();
        let err = buf.pop_quantity(q(5)).unwrap_err();
        assert_eq!(
            err,
            BufferError::InsufficientQuantity {
                requested: q(5),
                available: q(4),
            }
        );
        assert_eq!(buf.quantity(), q(4));
        assert_eq!(buf.count(), 1);
    }

    #[test]
    fn pop_quantity_zero_returns_nothing() {
        let mut buf = ResourceBuffer::unbounded();
        buf.push(uox(4)).unwrap();
        assert!(buf.pop_quantity(Quantity::ZERO).unwrap().is_empty());
        assert_eq!(buf.count(), 1);
    }

    #[test]
    fn buffer_filled_to_range_ceiling_still_answers() {
        let mut buf = ResourceBuffer::unbounded();
        buf.push(Material::new(Quantity::MAX, Recipe::new("uox")).unwrap())
            .unwrap();
        assert_eq!(buf.space(), Quantity::ZERO);
        assert!(matches!(
            buf.push(uox(1)),
            Err(BufferError::CapacityExceeded { .. })
        ));
        assert!(buf.has_full_batch(Quantity::MAX));

        let out = buf.pop_quantity(q(1)).unwrap();
        assert_eq!(out[0].quantity(), q(1));
        assert_eq!(buf.quantity(), Quantity::MAX - q(1));

        assert!(matches!(
            buf.pop_quantity(Quantity::MAX),
            Err(BufferError::InsufficientQuantity { .. })
        ));
        assert_eq!(buf.quantity(), Quantity::MAX - q(1));
    }

    #[test]
    fn full_batch_detection_looks_at_front() {
        let mut buf = ResourceBuffer::unbounded();
        assert!(!buf.has_full_batch(q(10)));
        buf.push(uox(5)).unwrap();
        assert!(!buf.has_full_batch(q(10)));

        let mut buf = ResourceBuffer::unbounded();
        buf.push(uox(10)).unwrap();
        buf.push(uox(5)).unwrap();
        assert!(buf.has_full_batch(q(10)));
    }
}
