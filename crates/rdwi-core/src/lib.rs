pub mod error;
pub mod frame;
pub mod gradient;
pub mod model;
pub mod spatial;
pub mod volume;

pub use error::{DwiError, Result};
pub use frame::MeasurementFrame;
pub use gradient::{GradientEntry, GradientTable};
pub use model::{DicomFieldMap, DwiModel};
pub use spatial::{Direction, Point, Spacing, Vector};
pub use volume::{PixelValue, Volume, Volume3, Volume4};
