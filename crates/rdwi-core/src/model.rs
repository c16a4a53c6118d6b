//! The conversion session model.
//!
//! A `DwiModel` owns everything one conversion session needs: the unwrapped
//! 3D volume, the gradient table, the measurement frame and the DICOM
//! passthrough fields. These pieces must be manipulated together to stay
//! consistent, so every transformation consumes the model and returns a new
//! one; no partial mutation is ever visible.

use crate::error::{DwiError, Result};
use crate::frame::MeasurementFrame;
use crate::gradient::GradientTable;
use crate::volume::{reshape, Volume3, Volume4};
use std::collections::BTreeMap;

/// DICOM fields copied verbatim into serialized output, keyed by the header
/// field name. A sorted map keeps the serialized order deterministic.
pub type DicomFieldMap = BTreeMap<String, String>;

/// One diffusion conversion session: the unwrapped volume plus the gradient
/// state that describes it.
///
/// The number of volumes is the gradient table length; the slice count of
/// the unwrapped volume must divide evenly by it.
#[derive(Debug, Clone)]
pub struct DwiModel {
    volume: Volume3,
    gradients: GradientTable,
    frame: MeasurementFrame,
    dicom_fields: DicomFieldMap,
}

impl DwiModel {
    /// Assemble a session from its parts, validating the cross-cutting
    /// invariants: the gradient table must be non-empty and the unwrapped
    /// slice count must divide evenly by the number of volumes.
    pub fn new(
        volume: Volume3,
        gradients: GradientTable,
        frame: MeasurementFrame,
        dicom_fields: DicomFieldMap,
    ) -> Result<Self> {
        if gradients.is_empty() {
            return Err(DwiError::configuration(
                "gradient table is empty: at least one acquisition is required",
            ));
        }
        let slices = volume.size()[2];
        let volumes = gradients.len();
        if slices % volumes != 0 {
            return Err(DwiError::NonDivisibleSlices {
                slices,
                volumes,
                remainder: slices % volumes,
            });
        }
        Ok(Self {
            volume,
            gradients,
            frame,
            dicom_fields,
        })
    }

    /// The unwrapped 3D acquisition volume.
    pub fn volume(&self) -> &Volume3 {
        &self.volume
    }

    /// The gradient table, one entry per volume.
    pub fn gradients(&self) -> &GradientTable {
        &self.gradients
    }

    /// The measurement frame for the gradient directions.
    pub fn frame(&self) -> &MeasurementFrame {
        &self.frame
    }

    /// The DICOM passthrough fields.
    pub fn dicom_fields(&self) -> &DicomFieldMap {
        &self.dicom_fields
    }

    /// Number of diffusion-encoded volumes.
    pub fn n_volumes(&self) -> usize {
        self.gradients.len()
    }

    /// Number of spatial slices per volume.
    pub fn slices_per_volume(&self) -> usize {
        self.volume.size()[2] / self.n_volumes()
    }

    /// The nominal (largest) b-value of the table.
    pub fn max_b_value(&self) -> f64 {
        self.gradients.max_b_value()
    }

    /// Replace the gradient table wholesale, e.g. with values read from
    /// external sidecar files. The replacement must describe the same number
    /// of volumes as the current table.
    pub fn with_gradients(self, gradients: GradientTable) -> Result<Self> {
        if gradients.len() != self.n_volumes() {
            return Err(DwiError::GradientCountMismatch {
                gradients: gradients.len(),
                volumes: self.n_volumes(),
            });
        }
        Ok(Self { gradients, ..self })
    }

    /// Apply the single-nominal-b-value normalization.
    pub fn with_single_b_value_scaled(self) -> Self {
        let gradients = self.gradients.to_single_b_value_scaled();
        Self { gradients, ..self }
    }

    /// Apply the unit-direction, per-acquisition-b-value normalization.
    pub fn with_unit_scaled_b_vectors(self) -> Self {
        let gradients = self.gradients.to_multiple_b_values_unit_scaled();
        Self { gradients, ..self }
    }

    /// Rotate the gradient directions into the patient frame and reset the
    /// measurement frame to the identity.
    pub fn with_identity_frame(self) -> Result<Self> {
        let (gradients, frame) = self.frame.resolve_to_identity(&self.gradients)?;
        Ok(Self {
            gradients,
            frame,
            ..self
        })
    }

    /// Reinterpret the unwrapped volume as 4D, one volume per gradient
    /// entry. The divisibility invariant is re-derived at reshape time.
    pub fn to_four_d(&self) -> Result<Volume4> {
        reshape::to_four_d(&self.volume, self.n_volumes())
    }
}
