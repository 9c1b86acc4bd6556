//! Height correction
//!
//! The compensation pass only sees the [`HeightCorrection`] capability. A
//! probed [`GridHeightMap`] and an arbitrary closure ([`FnHeightCorrection`])
//! both provide it.

use serde::{Deserialize, Serialize};

use gcodelevel_core::GeometryError;

/// Z correction sampled over the XY work area
///
/// Implementations must be pure: the same `(x, y)` always gives the same
/// correction, and queries have no side effects.
pub trait HeightCorrection {
    /// Z offset to add at `(x, y)`
    fn interpolate_z(&self, x: f64, y: f64) -> f64;

    /// Distance between samples along X and Y
    fn grid_spacing(&self) -> (f64, f64);

    /// Default maximum segment length: the finer of the two grid spacings
    fn segment_length(&self) -> f64 {
        let (x, y) = self.grid_spacing();
        x.min(y)
    }
}

impl<T: HeightCorrection + ?Sized> HeightCorrection for &T {
    fn interpolate_z(&self, x: f64, y: f64) -> f64 {
        (**self).interpolate_z(x, y)
    }

    fn grid_spacing(&self) -> (f64, f64) {
        (**self).grid_spacing()
    }
}

/// Regular grid of probed heights
///
/// `points[row][column]` is the height at
/// `(min[0] + column * spacing_x, min[1] + row * spacing_y)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridHeightMap {
    /// Lower left corner (X, Y)
    pub min: [f64; 2],
    /// Upper right corner (X, Y)
    pub max: [f64; 2],
    /// Number of columns
    pub size_x: usize,
    /// Number of rows
    pub size_y: usize,
    /// Heights, one row per Y sample
    pub points: Vec<Vec<f64>>,
}

impl GridHeightMap {
    /// Create and validate a grid
    pub fn new(
        min: [f64; 2],
        max: [f64; 2],
        points: Vec<Vec<f64>>,
    ) -> Result<Self, GeometryError> {
        let map = Self {
            min,
            max,
            size_x: points.first().map_or(0, Vec::len),
            size_y: points.len(),
            points,
        };
        map.validate()?;
        Ok(map)
    }

    /// Parse a grid from JSON and validate it
    pub fn from_json(text: &str) -> Result<Self, GeometryError> {
        let map: Self = serde_json::from_str(text).map_err(|e| GeometryError::InvalidHeightMap {
            reason: e.to_string(),
        })?;
        map.validate()?;
        Ok(map)
    }

    /// Check grid dimensions and sample values
    pub fn validate(&self) -> Result<(), GeometryError> {
        let invalid = |reason: String| Err(GeometryError::InvalidHeightMap { reason });

        if self.size_x < 2 || self.size_y < 2 {
            return invalid(format!(
                "grid must have at least 2x2 points, got {}x{}",
                self.size_x, self.size_y
            ));
        }
        for axis in 0..2 {
            let (min, max) = (self.min[axis], self.max[axis]);
            if !(min.is_finite() && max.is_finite() && max > min) {
                return invalid(format!("empty extent on axis {}: {} to {}", axis, min, max));
            }
        }
        if self.points.len() != self.size_y {
            return invalid(format!(
                "expected {} rows, got {}",
                self.size_y,
                self.points.len()
            ));
        }
        for (row, values) in self.points.iter().enumerate() {
            if values.len() != self.size_x {
                return invalid(format!(
                    "row {} has {} points, expected {}",
                    row,
                    values.len(),
                    self.size_x
                ));
            }
            if let Some(value) = values.iter().find(|v| !v.is_finite()) {
                return invalid(format!("row {} contains non-finite height {}", row, value));
            }
        }
        Ok(())
    }

    fn sample(&self, column: usize, row: usize) -> f64 {
        self.points[row][column]
    }

    /// Cell index and fraction along one axis, clamped to the grid
    fn locate(&self, value: f64, axis: usize, size: usize, spacing: f64) -> (usize, f64) {
        let clamped = value.clamp(self.min[axis], self.max[axis]);
        let position = (clamped - self.min[axis]) / spacing;
        let cell = (position.floor() as usize).min(size - 2);
        (cell, position - cell as f64)
    }
}

impl HeightCorrection for GridHeightMap {
    /// Bilinear interpolation; points outside the grid use the nearest border
    fn interpolate_z(&self, x: f64, y: f64) -> f64 {
        let (spacing_x, spacing_y) = self.grid_spacing();
        let (column, tx) = self.locate(x, 0, self.size_x, spacing_x);
        let (row, ty) = self.locate(y, 1, self.size_y, spacing_y);

        let bottom = self.sample(column, row) * (1.0 - tx) + self.sample(column + 1, row) * tx;
        let top = self.sample(column, row + 1) * (1.0 - tx) + self.sample(column + 1, row + 1) * tx;
        bottom * (1.0 - ty) + top * ty
    }

    fn grid_spacing(&self) -> (f64, f64) {
        (
            (self.max[0] - self.min[0]) / (self.size_x - 1) as f64,
            (self.max[1] - self.min[1]) / (self.size_y - 1) as f64,
        )
    }
}

/// Correction computed by a closure
pub struct FnHeightCorrection<F> {
    f: F,
    spacing: (f64, f64),
}

impl<F: Fn(f64, f64) -> f64> FnHeightCorrection<F> {
    /// Wrap `f`, reporting `spacing` as the grid resolution
    pub fn new(f: F, spacing: (f64, f64)) -> Self {
        Self { f, spacing }
    }

    /// Wrap `f` with the same spacing on both axes
    pub fn uniform(f: F, spacing: f64) -> Self {
        Self::new(f, (spacing, spacing))
    }
}

impl<F: Fn(f64, f64) -> f64> HeightCorrection for FnHeightCorrection<F> {
    fn interpolate_z(&self, x: f64, y: f64) -> f64 {
        (self.f)(x, y)
    }

    fn grid_spacing(&self) -> (f64, f64) {
        self.spacing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tilted() -> GridHeightMap {
        // z = 0.1 * x + 0.01 * y sampled every 10 units in X, 5 in Y
        GridHeightMap::new(
            [0.0, 0.0],
            [20.0, 10.0],
            vec![
                vec![0.0, 1.0, 2.0],
                vec![0.05, 1.05, 2.05],
                vec![0.1, 1.1, 2.1],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_grid_spacing_and_segment_length() {
        let map = tilted();
        assert_eq!(map.grid_spacing(), (10.0, 5.0));
        assert_eq!(map.segment_length(), 5.0);
    }

    #[test]
    fn test_bilinear_exact_on_plane() {
        let map = tilted();
        for (x, y) in [(0.0, 0.0), (3.0, 7.5), (12.5, 2.0), (20.0, 10.0)] {
            let expected = 0.1 * x + 0.01 * y;
            assert!((map.interpolate_z(x, y) - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_outside_points_clamp_to_border() {
        let map = tilted();
        assert!((map.interpolate_z(-5.0, -5.0) - 0.0).abs() < 1e-12);
        assert!((map.interpolate_z(50.0, 20.0) - 2.1).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_ragged_grid() {
        let err = GridHeightMap::new([0.0, 0.0], [1.0, 1.0], vec![vec![0.0, 0.0], vec![0.0]])
            .unwrap_err();
        assert!(matches!(err, GeometryError::InvalidHeightMap { .. }));
    }

    #[test]
    fn test_rejects_degenerate_extent() {
        let err = GridHeightMap::new([0.0, 1.0], [1.0, 1.0], vec![vec![0.0; 2]; 2]).unwrap_err();
        assert!(matches!(err, GeometryError::InvalidHeightMap { .. }));
    }

    #[test]
    fn test_from_json() {
        let map = GridHeightMap::from_json(
            r#"{"min":[0,0],"max":[10,10],"size_x":2,"size_y":2,"points":[[0,0.1],[0.2,0.3]]}"#,
        )
        .unwrap();
        assert!((map.interpolate_z(5.0, 5.0) - 0.15).abs() < 1e-12);

        let err = GridHeightMap::from_json("{\"min\":[0,0]}").unwrap_err();
        assert!(matches!(err, GeometryError::InvalidHeightMap { .. }));
    }

    #[test]
    fn test_closure_correction() {
        let correction = FnHeightCorrection::uniform(|x, _| x * 0.01, 5.0);
        assert!((correction.interpolate_z(10.0, 3.0) - 0.1).abs() < 1e-15);
        assert_eq!(correction.segment_length(), 5.0);
    }
}
