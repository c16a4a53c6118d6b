//! Volume type with physical metadata, plus the layout conversions between
//! the unwrapped 3D acquisition and the canonical 4D representation.

pub mod orient;
pub mod reshape;
#[allow(clippy::module_inception)]
pub mod volume;

pub use orient::orient_for_fsl_conventions;
pub use reshape::{to_four_d, to_three_d};
pub use volume::{PixelValue, Volume, Volume3, Volume4};
