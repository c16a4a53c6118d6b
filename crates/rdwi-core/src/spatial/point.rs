//! Point type for representing spatial coordinates.
//!
//! Points represent positions in physical space, such as image origins.

use super::Vector;
use nalgebra::Point as NaPoint;
use serde::{Deserialize, Serialize};

/// A point in D-dimensional space.
///
/// Points represent positions in physical coordinate systems.
/// Used for image origins and physical coordinates.
///
/// This is a thin wrapper around nalgebra's Point to provide
/// domain-specific functionality while maintaining all nalgebra operations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point<const D: usize>(pub NaPoint<f64, D>);

impl<const D: usize> Point<D> {
    /// Create a new point from coordinates.
    pub fn new(coords: [f64; D]) -> Self {
        Self(NaPoint::from(coords))
    }

    /// Create a point at the origin.
    pub fn origin() -> Self {
        Self(NaPoint::origin())
    }

    /// Convert point to a vector of coordinates.
    pub fn to_vec(&self) -> Vec<f64> {
        (0..D).map(|i| self.0[i]).collect()
    }

    /// Get the inner nalgebra point.
    pub fn inner(&self) -> &NaPoint<f64, D> {
        &self.0
    }
}

impl<const D: usize> std::ops::Index<usize> for Point<D> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::IndexMut<usize> for Point<D> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<const D: usize> std::ops::Add<Vector<D>> for Point<D> {
    type Output = Self;

    fn add(self, vector: Vector<D>) -> Self::Output {
        Self(self.0 + vector.0)
    }
}

impl<const D: usize> std::ops::Sub for Point<D> {
    type Output = Vector<D>;

    fn sub(self, other: Self) -> Self::Output {
        Vector(self.0 - other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Type aliases for testing
    type Point3 = Point<3>;
    type Vector3 = Vector<3>;

    #[test]
    fn test_point_creation() {
        let p = Point3::new([1.0, 2.0, 3.0]);
        assert_eq!(p[0], 1.0);
        assert_eq!(p[1], 2.0);
        assert_eq!(p[2], 3.0);
    }

    #[test]
    fn test_point_origin() {
        let p = Point3::origin();
        assert_eq!(p, Point3::new([0.0, 0.0, 0.0]));
    }

    #[test]
    fn test_point_vector_arithmetic() {
        let p = Point3::new([1.0, 2.0, 3.0]);
        let v = Vector3::new([0.5, 0.5, 0.5]);

        let moved = p + v;
        assert_eq!(moved, Point3::new([1.5, 2.5, 3.5]));

        let diff = moved - p;
        assert_eq!(diff, v);
    }
}
