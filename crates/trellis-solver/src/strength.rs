//! Constraint strengths.
//!
//! A strength is a plain `f64` on a lexicographic scale: three bands of
//! 1000 each, so a single strong unit outweighs any finite amount of
//! medium error and so on down. [`REQUIRED`] sits above the whole scale
//! and marks constraints that must hold exactly.

/// Constraints at this strength must be satisfied exactly.
pub const REQUIRED: f64 = 1_001_001_000.0;

pub const STRONG: f64 = 1_000_000.0;

pub const MEDIUM: f64 = 1_000.0;

pub const WEAK: f64 = 1.0;

/// Mix a strength from per-band weights, each clamped to its band.
///
/// `create(1.0, 0.0, 0.0, 1.0)` is [`STRONG`]; the `weight` multiplier
/// scales all three bands, which is the usual way to order several
/// constraints inside one band.
#[must_use]
pub fn create(strong: f64, medium: f64, weak: f64, weight: f64) -> f64 {
    (strong * weight).clamp(0.0, 1000.0) * 1_000_000.0
        + (medium * weight).clamp(0.0, 1000.0) * 1_000.0
        + (weak * weight).clamp(0.0, 1000.0)
}

/// Clamp an arbitrary value onto the legal strength range.
#[must_use]
pub fn clip(strength: f64) -> f64 {
    strength.clamp(0.0, REQUIRED)
}
