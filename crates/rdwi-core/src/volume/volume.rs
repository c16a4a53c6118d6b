//! Volume type with physical metadata.
//!
//! This module provides the Volume struct which combines a 16-bit sample
//! buffer with physical space metadata (origin, spacing, direction).

use crate::spatial::{Direction, Point, Spacing};

/// The only sample type supported by this converter.
pub type PixelValue = i16;

/// Medical image volume with physical metadata.
///
/// The sample buffer is stored with the first axis fastest (x, then y, then
/// slices, then volumes for 4D), matching the layout the acquisition
/// reader produces and the raw serializers expect.
///
/// A `Volume<3>` is the "unwrapped" acquisition: its slice axis concatenates
/// the spatial slices of every diffusion-encoded volume. A `Volume<4>` is
/// the same buffer reinterpreted with an explicit volume axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume<const D: usize> {
    /// Number of samples along each axis.
    size: [usize; D],
    /// Physical coordinate of the first sample.
    origin: Point<D>,
    /// Physical distance between samples along each axis.
    spacing: Spacing<D>,
    /// Orientation of the image axes.
    direction: Direction<D>,
    /// The sample data, first axis fastest.
    data: Vec<PixelValue>,
}

impl<const D: usize> Volume<D> {
    /// Create a new volume with the given data and metadata.
    ///
    /// The buffer length must equal the product of the axis sizes.
    pub fn new(
        size: [usize; D],
        origin: Point<D>,
        spacing: Spacing<D>,
        direction: Direction<D>,
        data: Vec<PixelValue>,
    ) -> Self {
        let expected: usize = size.iter().product();
        assert!(
            data.len() == expected,
            "Sample buffer length {} does not match volume size {:?}",
            data.len(),
            size
        );
        Self {
            size,
            origin,
            spacing,
            direction,
            data,
        }
    }

    /// Get the axis sizes.
    pub fn size(&self) -> [usize; D] {
        self.size
    }

    /// Get the origin (physical coordinate of the first sample).
    pub fn origin(&self) -> &Point<D> {
        &self.origin
    }

    /// Get the spacing (physical distance between samples).
    pub fn spacing(&self) -> &Spacing<D> {
        &self.spacing
    }

    /// Get the direction (orientation matrix).
    pub fn direction(&self) -> &Direction<D> {
        &self.direction
    }

    /// Get the sample buffer.
    pub fn data(&self) -> &[PixelValue] {
        &self.data
    }

    /// Consume the volume, returning the sample buffer.
    pub fn into_data(self) -> Vec<PixelValue> {
        self.data
    }

    /// Total number of samples.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the volume holds no samples.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Direction cosines scaled by spacing: column i is the physical step
    /// taken by incrementing index i. This is the matrix serialized as the
    /// per-axis space-direction vectors.
    pub fn space_direction(&self) -> Direction<D> {
        let mut scaled = *self.direction();
        for i in 0..D {
            for j in 0..D {
                scaled[(j, i)] *= self.spacing[i];
            }
        }
        scaled
    }
}

/// The unwrapped 3D acquisition volume.
pub type Volume3 = Volume<3>;
/// The canonical 4D volume with an explicit volume axis.
pub type Volume4 = Volume<4>;

#[cfg(test)]
mod tests {
    use super::*;

    type Point3 = Point<3>;
    type Spacing3 = Spacing<3>;
    type Direction3 = Direction<3>;

    fn test_volume() -> Volume3 {
        Volume::new(
            [2, 2, 2],
            Point3::new([1.0, 2.0, 3.0]),
            Spacing3::new([1.0, 1.0, 2.5]),
            Direction3::identity(),
            (0..8).collect(),
        )
    }

    #[test]
    fn test_volume_creation() {
        let volume = test_volume();
        assert_eq!(volume.size(), [2, 2, 2]);
        assert_eq!(volume.len(), 8);
        assert_eq!(volume.origin(), &Point3::new([1.0, 2.0, 3.0]));
    }

    #[test]
    #[should_panic(expected = "does not match volume size")]
    fn test_volume_rejects_wrong_buffer_length() {
        Volume::new(
            [2, 2, 2],
            Point3::origin(),
            Spacing3::uniform(1.0),
            Direction3::identity(),
            vec![0; 7],
        );
    }

    #[test]
    fn test_space_direction_scales_columns() {
        let volume = test_volume();
        let sd = volume.space_direction();
        assert_eq!(sd[(0, 0)], 1.0);
        assert_eq!(sd[(1, 1)], 1.0);
        assert_eq!(sd[(2, 2)], 2.5);
        assert_eq!(sd[(0, 2)], 0.0);
    }
}
