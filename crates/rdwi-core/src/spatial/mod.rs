//! Spatial types for representing points, vectors, spacing, and direction matrices.
//!
//! This module provides the fundamental spatial types used throughout rdwi.
//! All types are based on nalgebra for efficient linear algebra operations.

pub mod direction;
pub mod point;
pub mod spacing;
pub mod vector;

pub use direction::Direction;
pub use point::Point;
pub use spacing::Spacing;
pub use vector::Vector;

// Common type aliases for 3D and 4D
pub type Point3 = Point<3>;
pub type Point4 = Point<4>;
pub type Vector3 = Vector<3>;
pub type Vector4 = Vector<4>;
pub type Spacing3 = Spacing<3>;
pub type Spacing4 = Spacing<4>;
pub type Direction3 = Direction<3>;
pub type Direction4 = Direction<4>;
