//! Error types for diffusion conversion operations.
//!
//! This module provides structured error types for conversion sessions,
//! separating configuration, consistency, and I/O failures so that callers
//! can decide how to abort.

use thiserror::Error;

/// Main error type for diffusion conversion operations.
#[derive(Error, Debug)]
pub enum DwiError {
    /// Invalid configuration supplied by the caller.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Output filename does not carry a recognized extension.
    #[error("Unrecognized output extension for '{path}': expected one of {expected}")]
    UnrecognizedExtension { path: String, expected: String },

    /// Gradient table length does not match the number of volumes.
    #[error("Gradient count mismatch: {gradients} gradient entries for {volumes} volumes")]
    GradientCountMismatch { gradients: usize, volumes: usize },

    /// b-value and b-vector sidecars disagree on acquisition count.
    #[error("Mismatch between count of b-vectors ({b_vectors}) and b-values ({b_values})")]
    SidecarCountMismatch { b_values: usize, b_vectors: usize },

    /// Unwrapped slice count is not evenly divisible by the volume count.
    #[error(
        "Number of slices in volume not evenly divisible by the number of volumes: \
         slices = {slices}, volumes = {volumes}, left-over slices = {remainder}"
    )]
    NonDivisibleSlices {
        slices: usize,
        volumes: usize,
        remainder: usize,
    },

    /// FSL output requires an identity measurement frame.
    #[error(
        "Only an identity measurement frame is allowed when writing FSL formatted files \
         (frame trace = {trace})"
    )]
    NonIdentityMeasurementFrame { trace: f64 },

    /// Measurement frame cannot be inverted.
    #[error("Measurement frame is singular and cannot be inverted")]
    SingularMeasurementFrame,

    /// A gradient sidecar file could not be parsed.
    #[error("Malformed gradient file '{path}': {reason}")]
    MalformedGradientFile { path: String, reason: String },

    /// The supplied input volume or series cannot be used.
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    /// The external bulk volume writer or reader failed.
    #[error("Bulk volume I/O failed for '{path}': {reason}")]
    BulkVolume { path: String, reason: String },

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for diffusion conversion operations.
pub type Result<T> = std::result::Result<T, DwiError>;

impl DwiError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an unsupported-input error.
    pub fn unsupported_input(msg: impl Into<String>) -> Self {
        Self::UnsupportedInput(msg.into())
    }

    /// Create a malformed gradient file error.
    pub fn malformed_gradient_file(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedGradientFile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a bulk volume I/O error.
    pub fn bulk_volume(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BulkVolume {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = DwiError::configuration("test error");
        assert!(matches!(err, DwiError::Configuration(_)));
    }

    #[test]
    fn test_error_display() {
        let err = DwiError::configuration("test error");
        assert_eq!(err.to_string(), "Invalid configuration: test error");
    }

    #[test]
    fn test_non_divisible_slices_names_remainder() {
        let err = DwiError::NonDivisibleSlices {
            slices: 9,
            volumes: 2,
            remainder: 1,
        };
        let err_str = err.to_string();
        assert!(err_str.contains("slices = 9"));
        assert!(err_str.contains("left-over slices = 1"));
    }
}
