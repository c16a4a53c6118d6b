//! Direction type for representing image orientation.
//!
//! Direction matrices represent orientation of image axes in physical space.

use super::Vector;
use nalgebra::SMatrix;
use serde::{Deserialize, Serialize};

/// Direction matrix representing image orientation.
///
/// The direction matrix is a D×D matrix where each column represents the
/// direction of the corresponding image axis in physical space.
/// Column i represents the direction of the i-th image axis.
///
/// This is a thin wrapper around nalgebra's SMatrix to provide
/// domain-specific functionality while maintaining all nalgebra operations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction<const D: usize>(pub SMatrix<f64, D, D>);

impl<const D: usize> Direction<D> {
    /// Create an identity direction matrix (no rotation).
    pub fn identity() -> Self {
        Self(SMatrix::identity())
    }

    /// Create a zero matrix.
    pub fn zeros() -> Self {
        Self(SMatrix::zeros())
    }

    /// Check if direction matrix is orthogonal (rotation matrix).
    pub fn is_orthogonal(&self) -> bool {
        let product = self.0 * self.0.transpose();
        let identity = Self::identity();
        (0..D).all(|i| (0..D).all(|j| (product[(i, j)] - identity.0[(i, j)]).abs() < 1e-6))
    }

    /// Sum of the diagonal elements.
    pub fn trace(&self) -> f64 {
        (0..D).map(|i| self.0[(i, i)]).sum()
    }

    /// Try to compute the inverse of the direction matrix.
    pub fn try_inverse(&self) -> Option<Self> {
        self.0.try_inverse().map(Self)
    }

    /// Get the i-th column as an axis direction vector.
    pub fn column(&self, i: usize) -> Vector<D> {
        let mut v = Vector::zeros();
        for j in 0..D {
            v[j] = self.0[(j, i)];
        }
        v
    }

    /// Get the inner nalgebra matrix.
    pub fn inner(&self) -> &SMatrix<f64, D, D> {
        &self.0
    }

    /// Get mutable reference to inner nalgebra matrix.
    pub fn inner_mut(&mut self) -> &mut SMatrix<f64, D, D> {
        &mut self.0
    }
}

impl<const D: usize> std::ops::Index<(usize, usize)> for Direction<D> {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::IndexMut<(usize, usize)> for Direction<D> {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<const D: usize> std::ops::Mul for Direction<D> {
    type Output = Self;

    fn mul(self, other: Self) -> Self::Output {
        Self(self.0 * other.0)
    }
}

impl<const D: usize> std::ops::Mul<Vector<D>> for Direction<D> {
    type Output = Vector<D>;

    fn mul(self, vector: Vector<D>) -> Self::Output {
        Vector(self.0 * vector.0)
    }
}
