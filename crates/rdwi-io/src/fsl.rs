//! FSL serializer: a 4D NIfTI volume plus `.bval`/`.bvec` sidecars.
//!
//! The FSL convention has no measurement frame field, so serialization
//! demands an identity frame up front; writing rotated directions without
//! their frame would silently corrupt downstream analysis. Artifacts are
//! written volume first, then b-values, then b-vectors; a failure part-way
//! leaves earlier files behind, which is an accepted and documented side
//! effect; the error itself always propagates.

use crate::gradient_io::{write_b_values, write_b_vectors};
use ndarray::ShapeBuilder;
use nifti::writer::WriterOptions;
use nifti::NiftiHeader;
use rdwi_core::{DwiError, DwiModel, Result, Volume4};
use std::path::Path;
use tracing::info;

/// Recognized FSL volume extensions, longest first.
pub const NIFTI_EXTENSIONS: &[&str] = &[".nii.gz", ".nii"];

/// Byte position of the NIfTI extension in `name`, if any.
pub fn nifti_extension_position(name: &str) -> Option<usize> {
    NIFTI_EXTENSIONS.iter().find_map(|ext| name.find(ext))
}

/// Write the FSL triplet for an already reshaped (and, if desired,
/// reoriented) 4D volume.
///
/// Sidecar paths default to the volume filename with `.bval`/`.bvec`
/// substituted for its NIfTI extension. The gradient table is expected in
/// the unit-direction representation; it is serialized as-is.
pub fn write_fsl_fileset(
    model: &DwiModel,
    img4: &Volume4,
    volume_path: &Path,
    b_values_path: Option<&Path>,
    b_vectors_path: Option<&Path>,
    horizontal_by_3_rows: bool,
) -> Result<()> {
    if !model.frame().is_identity() {
        return Err(DwiError::NonIdentityMeasurementFrame {
            trace: model.frame().trace(),
        });
    }

    let volume_name = volume_path.to_string_lossy().into_owned();
    let extension_pos =
        nifti_extension_position(&volume_name).ok_or_else(|| DwiError::UnrecognizedExtension {
            path: volume_name.clone(),
            expected: NIFTI_EXTENSIONS.join(", "),
        })?;

    let b_values_path = match b_values_path {
        Some(path) if !path.as_os_str().is_empty() => path.to_path_buf(),
        _ => format!("{}.bval", &volume_name[..extension_pos]).into(),
    };
    let b_vectors_path = match b_vectors_path {
        Some(path) if !path.as_os_str().is_empty() => path.to_path_buf(),
        _ => format!("{}.bvec", &volume_name[..extension_pos]).into(),
    };

    write_nifti_volume(img4, volume_path)?;

    let b_values: Vec<f64> = model.gradients().iter().map(|e| e.b_value).collect();
    write_b_values(&b_values, &b_values_path)?;
    write_b_vectors(model.gradients(), &b_vectors_path, horizontal_by_3_rows)?;

    info!(
        "wrote FSL file set: {} / {} / {}",
        volume_path.display(),
        b_values_path.display(),
        b_vectors_path.display()
    );
    Ok(())
}

/// Hand the 4D buffer to the NIfTI bulk writer, annotated with the
/// scanner-anatomical orientation.
fn write_nifti_volume(img4: &Volume4, path: &Path) -> Result<()> {
    let [nx, ny, nz, nv] = img4.size();
    // the buffer is x-fastest, i.e. Fortran order for (x, y, z, v)
    let array = ndarray::Array::from_shape_vec((nx, ny, nz, nv).f(), img4.data().to_vec())
        .map_err(|e| DwiError::bulk_volume(path.display().to_string(), e.to_string()))?;

    let header = scanner_anatomical_header(img4);
    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(&array)
        .map_err(|e| DwiError::bulk_volume(path.display().to_string(), e.to_string()))
}

/// Build a NIfTI header carrying the volume's spatial metadata with
/// `sform_code = NIFTI_XFORM_SCANNER_ANAT`. The model is LPS; NIfTI is RAS,
/// so the first two affine rows are negated.
fn scanner_anatomical_header(img4: &Volume4) -> NiftiHeader {
    let space_direction = img4.space_direction();
    let origin = img4.origin();
    let spacing = img4.spacing();

    let row = |i: usize, sign: f64| {
        [
            (sign * space_direction[(i, 0)]) as f32,
            (sign * space_direction[(i, 1)]) as f32,
            (sign * space_direction[(i, 2)]) as f32,
            (sign * origin[i]) as f32,
        ]
    };

    NiftiHeader {
        pixdim: [
            1.0,
            spacing[0] as f32,
            spacing[1] as f32,
            spacing[2] as f32,
            spacing[3] as f32,
            1.0,
            1.0,
            1.0,
        ],
        sform_code: 1, // NIFTI_XFORM_SCANNER_ANAT
        qform_code: 0,
        srow_x: row(0, -1.0),
        srow_y: row(1, -1.0),
        srow_z: row(2, 1.0),
        xyzt_units: 2, // millimetres
        ..NiftiHeader::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nifti_extension_position() {
        assert_eq!(nifti_extension_position("dwi.nii"), Some(3));
        assert_eq!(nifti_extension_position("dwi.nii.gz"), Some(3));
        assert_eq!(nifti_extension_position("out/dwi.nii.gz"), Some(7));
        assert_eq!(nifti_extension_position("dwi.nrrd"), None);
    }
}
