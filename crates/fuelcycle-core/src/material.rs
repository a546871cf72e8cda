//! A quantity of uniform material: the unit every buffer holds and every
//! trade moves.

use crate::fixed::{EPSILON, Quantity};
use crate::id::Recipe;
use serde::{Deserialize, Serialize};

/// Errors raised by material split and merge operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaterialError {
    #[error("material quantity must be non-negative, got {0}")]
    InvalidQuantity(Quantity),
    #[error("cannot extract {requested} from material holding {available}")]
    InsufficientQuantity {
        requested: Quantity,
        available: Quantity,
    },
    #[error("cannot merge recipe '{incoming}' into recipe '{existing}'")]
    CompositionMismatch { existing: Recipe, incoming: Recipe },
    #[error("merging {incoming} into {existing} overflows the quantity range")]
    QuantityOverflow {
        existing: Quantity,
        incoming: Quantity,
    },
}

/// A batch of material with a single composition.
///
/// The recipe only changes through [`Material::transmute`]. Quantity changes
/// through [`Material::extract`] and [`Material::absorb`], which move
/// quantity between materials without creating or destroying any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    quantity: Quantity,
    recipe: Recipe,
}

impl Material {
    pub fn new(quantity: Quantity, recipe: Recipe) -> Result<Self, MaterialError> {
        if quantity < Quantity::ZERO {
            return Err(MaterialError::InvalidQuantity(quantity));
        }
        Ok(Self { quantity, recipe })
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    /// Split `amount` off into a new material with the same recipe.
    ///
    /// Overshooting the held quantity by no more than [`EPSILON`] takes
    /// everything that is left.
    pub fn extract(&mut self, amount: Quantity) -> Result<Material, MaterialError> {
        if amount < Quantity::ZERO {
            return Err(MaterialError::InvalidQuantity(amount));
        }
        if amount > self.quantity.saturating_add(EPSILON) {
            return Err(MaterialError::InsufficientQuantity {
                requested: amount,
                available: self.quantity,
            });
        }
        let taken = amount.min(self.quantity);
        self.quantity -= taken;
        Ok(Material {
            quantity: taken,
            recipe: self.recipe.clone(),
        })
    }

    /// Merge `other` into this material. Recipes must match and the sum
    /// must be representable; on error `self` is unchanged.
    pub fn absorb(&mut self, other: Material) -> Result<(), MaterialError> {
        if other.recipe != self.recipe {
            return Err(MaterialError::CompositionMismatch {
                existing: self.recipe.clone(),
                incoming: other.recipe,
            });
        }
        self.quantity = self.quantity.checked_add(other.quantity).ok_or(
            MaterialError::QuantityOverflow {
                existing: self.quantity,
                incoming: other.quantity,
            },
        )?;
        Ok(())
    }

    /// Replace the composition. Quantity is preserved.
    pub fn transmute(&mut self, recipe: Recipe) {
        self.recipe = recipe;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(v: i32) -> Quantity {
        Quantity::from_num(v)
    }

    fn uox(v: i32) -> Material {
        Material::new(q(v), Recipe::new("uox")).unwrap()
    }

    #[test]
    fn negative_quantity_rejected() {
        let err = Material::new(q(-1), Recipe::new("uox")).unwrap_err();
        assert_eq!(err, MaterialError::InvalidQuantity(q(-1)));
    }

    #[test]
    fn extract_splits_quantity() {
        let mut mat = uox(25);
        let part = mat.extract(q(10)).unwrap();
        assert_eq!(part.quantity(), q(10));
        assert_eq!(mat.quantity(), q(15));
        assert_eq!(part.recipe(), mat.recipe());
    }

    #[test]
    fn extract_everything_leaves_empty_material() {
        let mut mat = uox(5);
        let part = mat.extract(q(5)).unwrap();
        assert_eq!(part.quantity(), q(5));
        assert_eq!(mat.quantity(), Quantity::ZERO);
    }

    #[test]
    fn extract_more_than_held_fails() {
        let mut mat = uox(5);
        let err = mat.extract(q(6)).unwrap_err();
        assert!(matches!(err, MaterialError::InsufficientQuantity { .. }));
        assert_eq!(mat.quantity(), q(5));
    }

    #[test]
    fn extract_within_epsilon_takes_remainder() {
        let mut mat = uox(5);
        let part = mat.extract(q(5) + Quantity::DELTA).unwrap();
        assert_eq!(part.quantity(), q(5));
        assert_eq!(mat.quantity(), Quantity::ZERO);
    }

    #[test]
    fn absorb_merges_quantity() {
        let mut a = uox(4);
        a.absorb(uox(6)).unwrap();
        assert_eq!(a.quantity(), q(10));
    }

    #[test]
    fn absorb_rejects_other_recipe() {
        let mut a = uox(4);
        let b = Material::new(q(1), Recipe::new("mox")).unwrap();
        let err = a.absorb(b).unwrap_err();
        assert!(matches!(err, MaterialError::CompositionMismatch { .. }));
        assert_eq!(a.quantity(), q(4));
    }

    #[test]
    fn absorb_past_quantity_range_fails() {
        let mut a = Material::new(Quantity::MAX, Recipe::new("uox")).unwrap();
        let err = a.absorb(uox(1)).unwrap_err();
        assert!(matches!(err, MaterialError::QuantityOverflow { .. }));
        assert_eq!(a.quantity(), Quantity::MAX);
    }

    #[test]
    fn extract_from_full_range_material() {
        let mut a = Material::new(Quantity::MAX, Recipe::new("uox")).unwrap();
        assert!(a.extract(Quantity::MAX).is_ok());
        assert_eq!(a.quantity(), Quantity::ZERO);
    }

    #[test]
    fn transmute_keeps_quantity() {
        let mut a = uox(10);
        a.transmute(Recipe::new("spent_uox"));
        assert_eq!(a.recipe(), &Recipe::new("spent_uox"));
        assert_eq!(a.quantity(), q(10));
    }
}
