//! Capability interface for acquisition sources.
//!
//! Scanner-vendor specifics (private tags, mosaic layouts, b-matrix
//! decoding) live behind this trait; the conversion core only ever sees the
//! assembled model.

use rdwi_core::{DicomFieldMap, DwiModel, GradientTable, MeasurementFrame, Result, Volume3};

/// A source that can supply the three ingredients of a conversion session.
pub trait DwiSource {
    /// Decode the unwrapped 3D volume with its spatial metadata.
    fn load_volume(&self) -> Result<Volume3>;

    /// Extract the per-acquisition gradient table and the measurement frame
    /// the directions were recorded in.
    fn extract_gradients(&self) -> Result<(GradientTable, MeasurementFrame)>;

    /// Collect passthrough metadata fields describing the acquisition.
    fn describe_acquisition(&self) -> Result<DicomFieldMap>;
}

/// Assemble a validated session model from a source.
pub fn build_model(source: &dyn DwiSource) -> Result<DwiModel> {
    let volume = source.load_volume()?;
    let (gradients, frame) = source.extract_gradients()?;
    let dicom_fields = source.describe_acquisition()?;
    DwiModel::new(volume, gradients, frame, dicom_fields)
}
