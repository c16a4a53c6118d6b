//! Generic DICOM directory source.
//!
//! Reads a directory holding exactly one DICOM series and assembles the
//! unwrapped 3D volume, the gradient table from the standard diffusion tags
//! (`DiffusionBValue` / `DiffusionGradientOrientation`), and the common
//! passthrough fields. Vendor-specific private-tag decoding is deliberately
//! not handled here; a vendor source implements [`DwiSource`] itself.

use crate::source::DwiSource;
use dicom::core::Tag;
use dicom::dictionary_std::tags;
use dicom::object::{open_file, FileDicomObject, InMemDicomObject};
use dicom::pixeldata::PixelDecoder;
use nalgebra::{Matrix3, Vector3 as NaVector3};
use rayon::prelude::*;
use rdwi_core::{
    DicomFieldMap, DwiError, GradientTable, MeasurementFrame, Result, Vector, Volume3,
};
use rdwi_core::spatial::{Direction, Point, Spacing};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

type DicomObject = FileDicomObject<InMemDicomObject>;

// Standard diffusion tags (enhanced MR); the dictionary carries no
// vendor-private fallbacks.
const DIFFUSION_B_VALUE: Tag = Tag(0x0018, 0x9087);
const DIFFUSION_GRADIENT_ORIENTATION: Tag = Tag(0x0018, 0x9089);

/// A single-series DICOM directory, opened and ordered by instance number.
///
/// Slices are expected volume-major: all spatial slices of acquisition 0,
/// then acquisition 1, and so on, the same concatenation the unwrapped 3D
/// volume uses.
pub struct DicomDirectorySource {
    slices: Vec<(PathBuf, DicomObject)>,
    slices_per_volume: usize,
    n_volumes: usize,
}

impl DicomDirectorySource {
    /// Scan `directory`, requiring exactly one series, and order its files.
    pub fn open(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref();
        let entries: Vec<PathBuf> = std::fs::read_dir(directory)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();

        // parallel header parse; non-DICOM files are skipped
        let mut slices: Vec<(PathBuf, DicomObject)> = entries
            .par_iter()
            .filter_map(|path| open_file(path).ok().map(|obj| (path.clone(), obj)))
            .collect();
        if slices.is_empty() {
            return Err(DwiError::unsupported_input(format!(
                "no DICOM files found in {}",
                directory.display()
            )));
        }

        let series_uids: BTreeSet<String> = slices
            .iter()
            .filter_map(|(_, obj)| get_string(obj, tags::SERIES_INSTANCE_UID))
            .collect();
        if series_uids.len() > 1 {
            return Err(DwiError::unsupported_input(format!(
                "{} DICOM series found in {}: directories must hold a single series",
                series_uids.len(),
                directory.display()
            )));
        }

        slices.sort_by_key(|(path, obj)| {
            (get_i64(obj, tags::INSTANCE_NUMBER).unwrap_or(0), path.clone())
        });

        let (slices_per_volume, n_volumes) = volume_partition(&slices)?;
        info!(
            "opened DICOM series: {} slices, {} per volume, {} volumes",
            slices.len(),
            slices_per_volume,
            n_volumes
        );
        Ok(Self {
            slices,
            slices_per_volume,
            n_volumes,
        })
    }
}

impl DwiSource for DicomDirectorySource {
    fn load_volume(&self) -> Result<Volume3> {
        let (_, first) = &self.slices[0];
        let rows = get_u32(first, tags::ROWS)
            .ok_or_else(|| DwiError::unsupported_input("missing Rows in first slice"))? as usize;
        let cols = get_u32(first, tags::COLUMNS)
            .ok_or_else(|| DwiError::unsupported_input("missing Columns in first slice"))?
            as usize;
        let pixel_spacing = get_f64_vec(first, tags::PIXEL_SPACING)
            .filter(|v| v.len() == 2)
            .ok_or_else(|| DwiError::unsupported_input("missing PixelSpacing in first slice"))?;
        // PixelSpacing is (row spacing, column spacing)
        let dy = pixel_spacing[0];
        let dx = pixel_spacing[1];

        let (dir_x, dir_y, dir_z) = slice_orientation(first)?;

        // all slices must share the series orientation
        for (path, obj) in &self.slices[1..] {
            let (ox, oy, _) = slice_orientation(obj)?;
            if (ox - dir_x).norm() > 1e-3 || (oy - dir_y).norm() > 1e-3 {
                return Err(DwiError::unsupported_input(format!(
                    "inconsistent ImageOrientationPatient in {}",
                    path.display()
                )));
            }
        }

        let origin = slice_position(first)
            .ok_or_else(|| DwiError::unsupported_input("missing ImagePositionPatient"))?;

        let dz = if self.slices_per_volume > 1 {
            let second = slice_position(&self.slices[1].1)
                .ok_or_else(|| DwiError::unsupported_input("missing ImagePositionPatient"))?;
            (second - origin).dot(&dir_z).abs()
        } else {
            get_f64(first, tags::SLICE_THICKNESS).unwrap_or(1.0)
        };

        let mut data = Vec::with_capacity(self.slices.len() * rows * cols);
        let decoded: Vec<Vec<i16>> = self
            .slices
            .par_iter()
            .map(|(path, obj)| {
                let pixels = obj
                    .decode_pixel_data()
                    .map_err(|e| {
                        DwiError::bulk_volume(path.display().to_string(), e.to_string())
                    })?
                    .to_vec::<i16>()
                    .map_err(|e| {
                        DwiError::bulk_volume(path.display().to_string(), e.to_string())
                    })?;
                if pixels.len() != rows * cols {
                    return Err(DwiError::unsupported_input(format!(
                        "slice {} holds {} samples, expected {}",
                        path.display(),
                        pixels.len(),
                        rows * cols
                    )));
                }
                Ok(pixels)
            })
            .collect::<Result<_>>()?;
        for slice in decoded {
            data.extend(slice);
        }

        let direction = Direction(Matrix3::from_columns(&[dir_x, dir_y, dir_z]));
        debug!("series direction cosines orthogonal: {}", direction.is_orthogonal());

        Ok(Volume3::new(
            [cols, rows, self.slices.len()],
            Point::new([origin.x, origin.y, origin.z]),
            Spacing::new([dx, dy, dz]),
            direction,
            data,
        ))
    }

    fn extract_gradients(&self) -> Result<(GradientTable, MeasurementFrame)> {
        let mut table = GradientTable::new();
        for volume in 0..self.n_volumes {
            let (_, obj) = &self.slices[volume * self.slices_per_volume];
            let b_value = get_f64(obj, DIFFUSION_B_VALUE).unwrap_or(0.0);
            let direction = get_f64_vec(obj, DIFFUSION_GRADIENT_ORIENTATION)
                .filter(|v| v.len() == 3)
                .map(|v| Vector::new([v[0], v[1], v[2]]))
                .unwrap_or_else(Vector::zeros);
            table.push(b_value, direction);
        }
        // standard tags record directions in the patient frame
        Ok((table, MeasurementFrame::identity()))
    }

    fn describe_acquisition(&self) -> Result<DicomFieldMap> {
        let (_, first) = &self.slices[0];
        let mut fields = DicomFieldMap::new();
        let passthrough = [
            ("DICOM_DeviceSerialNumber", tags::DEVICE_SERIAL_NUMBER),
            ("DICOM_Manufacturer", tags::MANUFACTURER),
            ("DICOM_ManufacturerModelName", tags::MANUFACTURER_MODEL_NAME),
            ("DICOM_SoftwareVersions", tags::SOFTWARE_VERSIONS),
        ];
        for (key, tag) in passthrough {
            if let Some(value) = get_string(first, tag) {
                fields.insert(key.to_string(), value);
            }
        }
        Ok(fields)
    }
}

/// Partition the ordered slices into volumes by counting distinct slice
/// positions along the stack normal.
fn volume_partition(slices: &[(PathBuf, DicomObject)]) -> Result<(usize, usize)> {
    let (_, first) = &slices[0];
    let (_, _, dir_z) = slice_orientation(first)?;

    let mut distinct = BTreeSet::new();
    for (_, obj) in slices {
        let position = slice_position(obj)
            .ok_or_else(|| DwiError::unsupported_input("missing ImagePositionPatient"))?;
        // quantized projection onto the stack normal, 1 µm resolution
        distinct.insert((position.coords.dot(&dir_z) * 1000.0).round() as i64);
    }

    let slices_per_volume = distinct.len();
    let total = slices.len();
    if total % slices_per_volume != 0 {
        return Err(DwiError::NonDivisibleSlices {
            slices: total,
            volumes: total / slices_per_volume,
            remainder: total % slices_per_volume,
        });
    }
    Ok((slices_per_volume, total / slices_per_volume))
}

fn slice_orientation(
    obj: &DicomObject,
) -> Result<(NaVector3<f64>, NaVector3<f64>, NaVector3<f64>)> {
    let orientation = get_f64_vec(obj, tags::IMAGE_ORIENTATION_PATIENT)
        .filter(|v| v.len() == 6)
        .ok_or_else(|| DwiError::unsupported_input("missing or invalid ImageOrientationPatient"))?;
    let dir_x = NaVector3::new(orientation[0], orientation[1], orientation[2]).normalize();
    let dir_y = NaVector3::new(orientation[3], orientation[4], orientation[5]).normalize();
    let dir_z = dir_x.cross(&dir_y).normalize();
    Ok((dir_x, dir_y, dir_z))
}

fn slice_position(obj: &DicomObject) -> Option<nalgebra::Point3<f64>> {
    let v = get_f64_vec(obj, tags::IMAGE_POSITION_PATIENT)?;
    if v.len() == 3 {
        Some(nalgebra::Point3::new(v[0], v[1], v[2]))
    } else {
        None
    }
}

// --- element helpers ---

fn get_string(obj: &DicomObject, tag: Tag) -> Option<String> {
    obj.element(tag)
        .ok()?
        .to_str()
        .ok()
        .map(|s| s.trim().to_string())
}

fn get_u32(obj: &DicomObject, tag: Tag) -> Option<u32> {
    obj.element(tag).ok()?.to_int::<u32>().ok()
}

fn get_i64(obj: &DicomObject, tag: Tag) -> Option<i64> {
    obj.element(tag).ok()?.to_int::<i64>().ok()
}

fn get_f64(obj: &DicomObject, tag: Tag) -> Option<f64> {
    obj.element(tag).ok()?.to_float64().ok()
}

fn get_f64_vec(obj: &DicomObject, tag: Tag) -> Option<Vec<f64>> {
    obj.element(tag).ok()?.to_multi_float64().ok()
}
