use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Material quantities are fixed-point so buffer arithmetic is exact and
/// deterministic across platforms.
pub type Quantity = Fixed64;

/// Timesteps are the atomic unit of simulation time.
pub type Ticks = u64;

/// Negligible-quantity threshold, roughly 1e-6 (4295 / 2^32).
///
/// Order sizes, remainders and full-batch checks below this are treated as
/// zero.
pub const EPSILON: Quantity = Quantity::from_bits(4295);

/// Convert an f64 to a Quantity. Use only for configuration, never in the sim loop.
#[inline]
pub fn f64_to_quantity(v: f64) -> Quantity {
    Quantity::from_num(v)
}

/// Convert a Quantity to f64. Use only for display and reporting.
#[inline]
pub fn quantity_to_f64(v: Quantity) -> f64 {
    v.to_num::<f64>()
}

/// Whether `v` is within [`EPSILON`] of zero.
#[inline]
pub fn is_negligible(v: Quantity) -> bool {
    v.abs() <= EPSILON
}

/// `a >= b`, tolerating a shortfall of up to [`EPSILON`].
#[inline]
pub fn approx_ge(a: Quantity, b: Quantity) -> bool {
    a.saturating_add(EPSILON) >= b
}
