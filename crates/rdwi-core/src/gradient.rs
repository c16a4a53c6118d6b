//! Gradient table with the b-value/direction normalization algorithms.
//!
//! Diffusion formats disagree on how gradient strength is encoded: the NRRD
//! convention stores one nominal b-value and scales each direction vector by
//! the square root of its relative diffusion weighting, while the FSL
//! convention stores unit-length directions and a separate b-value per
//! acquisition. Both normalizations live here as pure functions over the
//! table.

use crate::spatial::Vector;
use serde::{Deserialize, Serialize};
use tracing::debug;

type Vector3 = Vector<3>;

/// Relative tolerance under which a direction magnitude is snapped to
/// exactly one, avoiding compounded rounding for already-near-unit vectors.
pub const UNIT_MAGNITUDE_TOLERANCE: f64 = 0.01;

/// One diffusion-encoded acquisition: a b-value and a gradient direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientEntry {
    /// Diffusion sensitization for this acquisition (s/mm²), non-negative.
    pub b_value: f64,
    /// Diffusion-sensitizing gradient axis, unit or scaled.
    pub direction: Vector3,
}

/// Ordered table of gradient entries, one per acquisition.
///
/// Insertion order is semantically meaningful: entry k describes volume k of
/// the acquisition. Normalization operations return a new table rather than
/// mutating in place, so callers thread state explicitly.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GradientTable {
    entries: Vec<GradientEntry>,
}

impl GradientTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table from a list of entries.
    pub fn from_entries(entries: Vec<GradientEntry>) -> Self {
        Self { entries }
    }

    /// Append one acquisition.
    pub fn push(&mut self, b_value: f64, direction: Vector3) {
        self.entries.push(GradientEntry { b_value, direction });
    }

    /// Number of acquisitions in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no acquisitions.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entries in acquisition order.
    pub fn entries(&self) -> &[GradientEntry] {
        &self.entries
    }

    /// Iterate over the entries in acquisition order.
    pub fn iter(&self) -> impl Iterator<Item = &GradientEntry> {
        self.entries.iter()
    }

    /// The largest b-value in the table, or 0 for an empty table.
    pub fn max_b_value(&self) -> f64 {
        self.entries
            .iter()
            .fold(0.0, |max, e| if e.b_value > max { e.b_value } else { max })
    }

    /// Normalize to the single-nominal-b-value representation.
    ///
    /// Every entry's b-value becomes the table maximum and its direction is
    /// scaled by `sqrt(b / b_max)`, so the per-acquisition weighting is
    /// carried by the vector magnitude. When the maximum is zero (a
    /// non-diffusion-weighted acquisition) all directions collapse to zero
    /// with b-value 0.
    pub fn to_single_b_value_scaled(&self) -> GradientTable {
        let max_b_value = self.max_b_value();
        let entries = self
            .entries
            .iter()
            .enumerate()
            .map(|(k, entry)| {
                let scale = if max_b_value > 0.0 {
                    (entry.b_value / max_b_value).sqrt()
                } else {
                    0.0
                };
                debug!(
                    "scale factor for acquisition {}: sqrt({} / {}) = {}",
                    k, entry.b_value, max_b_value, scale
                );
                GradientEntry {
                    b_value: max_b_value,
                    direction: entry.direction * scale,
                }
            })
            .collect();
        GradientTable { entries }
    }

    /// Normalize to the unit-direction, per-acquisition-b-value representation.
    ///
    /// Each direction is rescaled to unit length (zero vectors stay zero) and
    /// its b-value becomes `round(b_max * |v|²)`, rounding half away from
    /// zero. Magnitudes within [`UNIT_MAGNITUDE_TOLERANCE`] of one are
    /// treated as exactly one.
    pub fn to_multiple_b_values_unit_scaled(&self) -> GradientTable {
        let max_b_value = self.max_b_value();
        let entries = self
            .entries
            .iter()
            .map(|entry| {
                let mut mag = entry.direction.norm();
                if (mag * mag - 1.0).abs() < UNIT_MAGNITUDE_TOLERANCE {
                    mag = 1.0;
                }
                GradientEntry {
                    // f64::round rounds half away from zero
                    b_value: (max_b_value * mag * mag).round(),
                    direction: entry.direction.normalized(),
                }
            })
            .collect();
        GradientTable { entries }
    }

    /// Build a new table with every direction replaced by `f(direction)`.
    ///
    /// b-values are preserved. Used by the measurement frame resolver.
    pub fn map_directions(&self, f: impl Fn(Vector3) -> Vector3) -> GradientTable {
        let entries = self
            .entries
            .iter()
            .map(|entry| GradientEntry {
                b_value: entry.b_value,
                direction: f(entry.direction),
            })
            .collect();
        GradientTable { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(f64, [f64; 3])]) -> GradientTable {
        let mut t = GradientTable::new();
        for (b, dir) in entries {
            t.push(*b, Vector3::new(*dir));
        }
        t
    }

    #[test]
    fn test_max_b_value() {
        let t = table(&[(0.0, [0.0; 3]), (500.0, [1.0, 0.0, 0.0]), (1000.0, [0.0, 1.0, 0.0])]);
        assert_eq!(t.max_b_value(), 1000.0);
        assert_eq!(GradientTable::new().max_b_value(), 0.0);
    }

    #[test]
    fn test_single_b_value_scaling() {
        let t = table(&[(0.0, [0.0; 3]), (250.0, [1.0, 0.0, 0.0]), (1000.0, [0.0, 1.0, 0.0])]);
        let scaled = t.to_single_b_value_scaled();

        for entry in scaled.iter() {
            assert_eq!(entry.b_value, 1000.0);
        }
        // sqrt(250 / 1000) = 0.5
        assert!((scaled.entries()[1].direction[0] - 0.5).abs() < 1e-12);
        assert_eq!(scaled.entries()[0].direction, Vector3::zeros());
        assert!((scaled.entries()[2].direction[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_b_value_all_zero_does_not_error() {
        let t = table(&[(0.0, [1.0, 0.0, 0.0]), (0.0, [0.0, 1.0, 0.0])]);
        let scaled = t.to_single_b_value_scaled();
        for entry in scaled.iter() {
            assert_eq!(entry.b_value, 0.0);
            assert_eq!(entry.direction, Vector3::zeros());
        }
    }

    #[test]
    fn test_unit_scaling_recovers_b_values() {
        let t = table(&[(0.0, [0.0; 3]), (250.0, [1.0, 0.0, 0.0]), (1000.0, [0.0, 1.0, 0.0])]);
        let unit = t.to_single_b_value_scaled().to_multiple_b_values_unit_scaled();

        assert_eq!(unit.entries()[0].b_value, 0.0);
        assert_eq!(unit.entries()[1].b_value, 250.0);
        assert_eq!(unit.entries()[2].b_value, 1000.0);
        assert!((unit.entries()[1].direction.norm() - 1.0).abs() < 1e-12);
        assert_eq!(unit.entries()[0].direction, Vector3::zeros());
    }

    #[test]
    fn test_unit_scaling_clamps_near_unit_magnitudes() {
        // |v|² = 1.004: inside the 1% clamp, so b stays at the maximum
        let mag = 1.004f64.sqrt();
        let t = table(&[(1000.0, [mag, 0.0, 0.0]), (1000.0, [0.0, 1.0, 0.0])]);
        let unit = t.to_multiple_b_values_unit_scaled();
        assert_eq!(unit.entries()[0].b_value, 1000.0);
    }

    #[test]
    fn test_unit_scaling_rounds_half_away_from_zero() {
        // |v|² = 0.5005 exactly: 1000 * 0.5005 = 500.5 rounds to 501
        let t = table(&[(1000.0, [0.5005f64.sqrt(), 0.0, 0.0]), (1000.0, [0.0, 1.0, 0.0])]);
        let unit = t.to_multiple_b_values_unit_scaled();
        assert_eq!(unit.entries()[0].b_value, 501.0);
    }

    #[test]
    fn test_single_b_value_idempotent() {
        let t = table(&[(250.0, [1.0, 0.0, 0.0]), (1000.0, [0.0, 1.0, 0.0])]);
        let once = t.to_single_b_value_scaled();
        let twice = once.to_single_b_value_scaled();
        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.b_value, b.b_value);
            assert!((a.direction - b.direction).norm() < 1e-12);
        }
    }

    #[test]
    fn test_map_directions_preserves_b_values() {
        let t = table(&[(500.0, [1.0, 0.0, 0.0])]);
        let negated = t.map_directions(|v| -v);
        assert_eq!(negated.entries()[0].b_value, 500.0);
        assert_eq!(negated.entries()[0].direction, Vector3::new([-1.0, 0.0, 0.0]));
    }
}
