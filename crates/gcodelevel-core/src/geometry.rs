//! Geometric primitives
//!
//! Point algebra is provided by `glam`'s double precision vectors
//! (`+`, `-`, scalar `*`, `length`, `dot`, `normalize_or_zero`). This module
//! adds the axis roll used to map a plane-relative computation onto the two
//! machine axes selected by the active plane, and decimal rounding.

pub use glam::{DVec2, DVec3};

/// Machine coordinate triple (X, Y, Z)
pub type Position = DVec3;

/// Largest supported number of decimal digits for [`round_to`]
pub const MAX_PRECISION: u32 = 10;

/// Extra operations on [`DVec3`] used by the motion code
pub trait VectorExt: Sized {
    /// Cyclically permute the components by `turns`.
    ///
    /// One turn maps `(x, y, z)` to `(y, z, x)`; negative turns rotate the
    /// other way, so `v.roll(n).roll(-n) == v`.
    fn roll(self, turns: i32) -> Self;

    /// Round every component to `digits` decimal places
    fn round_to(self, digits: u32) -> Self;
}

impl VectorExt for DVec3 {
    fn roll(self, turns: i32) -> Self {
        match turns.rem_euclid(3) {
            0 => self,
            1 => DVec3::new(self.y, self.z, self.x),
            _ => DVec3::new(self.z, self.x, self.y),
        }
    }

    fn round_to(self, digits: u32) -> Self {
        DVec3::new(
            round_to(self.x, digits),
            round_to(self.y, digits),
            round_to(self.z, digits),
        )
    }
}

/// Round a value to `digits` decimal places
pub fn round_to(value: f64, digits: u32) -> f64 {
    let multiplier = 10_f64.powi(digits as i32);
    (value * multiplier).round() / multiplier
}
