//! Spacing type for representing physical distances between voxels.
//!
//! Spacing represents the physical distance between adjacent voxels
//! along each axis of an image.

use super::Vector;

/// Spacing between adjacent voxels along each axis.
///
/// Spacing is a vector where each component represents the physical distance
/// between adjacent voxels along that axis.
///
/// This is a type alias to Vector for semantic clarity.
pub type Spacing<const D: usize> = Vector<D>;

impl<const D: usize> Spacing<D> {
    /// Create uniform spacing (same value for all dimensions).
    pub fn uniform(value: f64) -> Self {
        let mut spacing = Vector::zeros();
        for i in 0..D {
            spacing[i] = value;
        }
        spacing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Type aliases for testing
    type Spacing3 = Spacing<3>;

    #[test]
    fn test_spacing_uniform() {
        let s = Spacing3::uniform(1.0);
        assert_eq!(s, Spacing3::new([1.0, 1.0, 1.0]));
    }
}
