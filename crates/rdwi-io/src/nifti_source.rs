//! FSL-input source: a previously exported 4D NIfTI volume plus its
//! bval/bvec sidecars, unwrapped back into the 3D session model.

use crate::gradient_io::load_gradient_files;
use crate::source::DwiSource;
use nalgebra::SMatrix;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use rdwi_core::spatial::{Direction, Point, Spacing};
use rdwi_core::{DicomFieldMap, DwiError, GradientTable, MeasurementFrame, Result, Volume3};
use std::path::{Path, PathBuf};
use tracing::info;

/// Source for re-processing a previously exported FSL file set.
pub struct FslSource {
    volume_path: PathBuf,
    b_values_path: Option<PathBuf>,
    b_vectors_path: Option<PathBuf>,
}

impl FslSource {
    pub fn new(
        volume_path: impl Into<PathBuf>,
        b_values_path: Option<PathBuf>,
        b_vectors_path: Option<PathBuf>,
    ) -> Self {
        Self {
            volume_path: volume_path.into(),
            b_values_path,
            b_vectors_path,
        }
    }
}

impl DwiSource for FslSource {
    fn load_volume(&self) -> Result<Volume3> {
        let bulk_err = |e: String| DwiError::bulk_volume(self.volume_path.display().to_string(), e);

        let obj = ReaderOptions::new()
            .read_file(&self.volume_path)
            .map_err(|e| bulk_err(e.to_string()))?;
        let affine = lps_affine(obj.header());
        let (origin, spacing, direction) = decompose_affine(&affine);

        let array = obj
            .into_volume()
            .into_ndarray::<i16>()
            .map_err(|e| bulk_err(e.to_string()))?;
        let shape = array.shape().to_vec();
        if shape.len() != 4 {
            return Err(DwiError::unsupported_input(format!(
                "expected a 4D NIfTI volume, found {} dimensions in {}",
                shape.len(),
                self.volume_path.display()
            )));
        }
        let (nx, ny, nz, nv) = (shape[0], shape[1], shape[2], shape[3]);

        // unwrap volume-major: slices of acquisition 0 first, x fastest
        let mut data = Vec::with_capacity(nx * ny * nz * nv);
        for v in 0..nv {
            for z in 0..nz {
                for y in 0..ny {
                    for x in 0..nx {
                        data.push(array[[x, y, z, v]]);
                    }
                }
            }
        }

        info!(
            "read FSL volume {}: {}x{}x{} with {} acquisitions",
            self.volume_path.display(),
            nx,
            ny,
            nz,
            nv
        );
        Ok(Volume3::new(
            [nx, ny, nz * nv],
            origin,
            spacing,
            direction,
            data,
        ))
    }

    fn extract_gradients(&self) -> Result<(GradientTable, MeasurementFrame)> {
        let table = load_gradient_files(
            self.b_values_path.as_deref(),
            self.b_vectors_path.as_deref(),
            &self.volume_path,
        )?;

        // the sidecars must describe exactly the volumes the 4D file holds
        let header = NiftiHeader::from_file(&self.volume_path)
            .map_err(|e| DwiError::bulk_volume(self.volume_path.display().to_string(), e.to_string()))?;
        let volumes = if header.dim[0] >= 4 {
            header.dim[4] as usize
        } else {
            1
        };
        if table.len() != volumes {
            return Err(DwiError::GradientCountMismatch {
                gradients: table.len(),
                volumes,
            });
        }

        // FSL directions carry no frame: they are already patient-frame
        Ok((table, MeasurementFrame::identity()))
    }

    fn describe_acquisition(&self) -> Result<DicomFieldMap> {
        Ok(DicomFieldMap::new())
    }
}

/// Build the voxel-to-physical affine in LPS coordinates, preferring sform,
/// then qform, then plain pixdim scaling. NIfTI affines are RAS; the first
/// two rows are negated to match this converter's LPS model.
fn lps_affine(header: &NiftiHeader) -> [[f64; 4]; 4] {
    let mut affine = if header.sform_code > 0 {
        [
            to_f64_row(header.srow_x),
            to_f64_row(header.srow_y),
            to_f64_row(header.srow_z),
            [0.0, 0.0, 0.0, 1.0],
        ]
    } else if header.qform_code > 0 {
        let b = header.quatern_b as f64;
        let c = header.quatern_c as f64;
        let d = header.quatern_d as f64;
        let a = (1.0 - (b * b + c * c + d * d).min(1.0)).sqrt();
        let qfac = if header.pixdim[0] == 0.0 {
            1.0
        } else {
            header.pixdim[0] as f64
        };

        let dx = header.pixdim[1] as f64;
        let dy = header.pixdim[2] as f64;
        let dz = header.pixdim[3] as f64 * qfac;

        [
            [
                (a * a + b * b - c * c - d * d) * dx,
                (2.0 * b * c - 2.0 * a * d) * dy,
                (2.0 * b * d + 2.0 * a * c) * dz,
                header.quatern_x as f64,
            ],
            [
                (2.0 * b * c + 2.0 * a * d) * dx,
                (a * a + c * c - b * b - d * d) * dy,
                (2.0 * c * d - 2.0 * a * b) * dz,
                header.quatern_y as f64,
            ],
            [
                (2.0 * b * d - 2.0 * a * c) * dx,
                (2.0 * c * d + 2.0 * a * b) * dy,
                (a * a + d * d - c * c - b * b) * dz,
                header.quatern_z as f64,
            ],
            [0.0, 0.0, 0.0, 1.0],
        ]
    } else {
        [
            [header.pixdim[1] as f64, 0.0, 0.0, 0.0],
            [0.0, header.pixdim[2] as f64, 0.0, 0.0],
            [0.0, 0.0, header.pixdim[3] as f64, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]
    };

    // RAS -> LPS
    for row in affine.iter_mut().take(2) {
        for value in row.iter_mut() {
            *value = -*value;
        }
    }
    affine
}

fn to_f64_row(row: [f32; 4]) -> [f64; 4] {
    [row[0] as f64, row[1] as f64, row[2] as f64, row[3] as f64]
}

/// Split an affine into origin, per-axis spacing (column norms), and the
/// normalized direction-cosine matrix.
fn decompose_affine(affine: &[[f64; 4]; 4]) -> (Point<3>, Spacing<3>, Direction<3>) {
    let origin = Point::new([affine[0][3], affine[1][3], affine[2][3]]);

    let mut spacing = Spacing::uniform(1.0);
    let mut direction = SMatrix::<f64, 3, 3>::identity();
    for axis in 0..3 {
        let column = nalgebra::Vector3::new(affine[0][axis], affine[1][axis], affine[2][axis]);
        let norm = column.norm();
        spacing[axis] = norm;
        if norm > 1e-9 {
            direction.set_column(axis, &(column / norm));
        }
    }
    (origin, spacing, Direction(direction))
}
