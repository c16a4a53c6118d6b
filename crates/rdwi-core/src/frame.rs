//! Measurement frame relating gradient coordinates to the patient frame.
//!
//! Some scanners record gradient directions relative to a rotated
//! scanner-protocol frame rather than the patient (LPS) frame. The NRRD
//! convention carries that rotation in a dedicated header field; the FSL
//! convention has no such field, so the rotation must be resolved into the
//! directions themselves before FSL serialization.

use crate::error::{DwiError, Result};
use crate::gradient::GradientTable;
use crate::spatial::Direction;
use serde::{Deserialize, Serialize};

type Direction3 = Direction<3>;

/// Tolerance on the frame trace when deciding whether it is the identity.
pub const IDENTITY_TRACE_TOLERANCE: f64 = 1e-4;

/// 3×3 rotation relating gradient-direction coordinates to the patient
/// reference frame. Starts as the identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementFrame(Direction3);

impl MeasurementFrame {
    /// The identity frame: gradients are already in patient coordinates.
    pub fn identity() -> Self {
        Self(Direction3::identity())
    }

    /// Wrap an existing rotation matrix.
    pub fn new(matrix: Direction3) -> Self {
        Self(matrix)
    }

    /// The underlying rotation matrix.
    pub fn matrix(&self) -> &Direction3 {
        &self.0
    }

    /// Sum of the diagonal elements; 3.0 for the identity.
    pub fn trace(&self) -> f64 {
        self.0.trace()
    }

    /// Whether the frame is the identity within [`IDENTITY_TRACE_TOLERANCE`].
    pub fn is_identity(&self) -> bool {
        (self.trace() - 3.0).abs() <= IDENTITY_TRACE_TOLERANCE
    }

    /// Rotate every gradient direction into the patient frame and reset the
    /// frame to the identity.
    ///
    /// Each direction `v` is replaced with `F⁻¹·v`. Returns the rewritten
    /// table together with the identity frame; the inputs are left untouched
    /// so callers replace their state wholesale.
    pub fn resolve_to_identity(
        &self,
        gradients: &GradientTable,
    ) -> Result<(GradientTable, MeasurementFrame)> {
        let inverse = self
            .0
            .try_inverse()
            .ok_or(DwiError::SingularMeasurementFrame)?;
        let rotated = gradients.map_directions(|v| inverse * v);
        Ok((rotated, MeasurementFrame::identity()))
    }
}

impl Default for MeasurementFrame {
    fn default() -> Self {
        Self::identity()
    }
}
