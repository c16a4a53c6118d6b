//! Conversions between the unwrapped 3D layout and the canonical 4D layout.
//!
//! The acquisition is read as a single 3D volume whose slice axis
//! concatenates every diffusion-encoded volume; formats with an explicit
//! volume axis need the same buffer reinterpreted as 4D. No samples are
//! resampled or reordered: both conversions copy the linear buffer verbatim
//! and only rewrite the shape metadata.

use crate::error::{DwiError, Result};
use crate::spatial::{Direction, Point, Spacing};
use crate::volume::{Volume3, Volume4};

/// Reinterpret the unwrapped 3D volume as 4D with `n_volumes` volumes.
///
/// The slice count must divide evenly by `n_volumes`. Spatial metadata for
/// the first three axes is copied unchanged; the fourth axis is not a
/// physical spatial axis and gets identity direction, unit spacing and zero
/// origin.
pub fn to_four_d(img: &Volume3, n_volumes: usize) -> Result<Volume4> {
    let size3 = img.size();
    if n_volumes == 0 || size3[2] % n_volumes != 0 {
        return Err(DwiError::NonDivisibleSlices {
            slices: size3[2],
            volumes: n_volumes,
            remainder: if n_volumes == 0 {
                size3[2]
            } else {
                size3[2] % n_volumes
            },
        });
    }
    let size4 = [size3[0], size3[1], size3[2] / n_volumes, n_volumes];

    let mut direction4 = Direction::<4>::identity();
    let mut spacing4 = Spacing::<4>::uniform(1.0);
    let mut origin4 = Point::<4>::origin();
    for i in 0..3 {
        for j in 0..3 {
            direction4[(i, j)] = img.direction()[(i, j)];
        }
        spacing4[i] = img.spacing()[i];
        origin4[i] = img.origin()[i];
    }

    Ok(Volume4::new(
        size4,
        origin4,
        spacing4,
        direction4,
        img.data().to_vec(),
    ))
}

/// Reinterpret a 4D volume back into the unwrapped 3D layout.
///
/// Exact inverse of [`to_four_d`]: the slice axis of the result is
/// `slices_per_volume * n_volumes`, which is divisible by construction, and
/// the buffer is copied verbatim. Fourth-axis metadata is dropped; it never
/// carried volume-specific spatial meaning.
pub fn to_three_d(img4: &Volume4) -> Volume3 {
    let size4 = img4.size();
    let size3 = [size4[0], size4[1], size4[2] * size4[3]];

    let mut direction3 = Direction::<3>::identity();
    let mut spacing3 = Spacing::<3>::uniform(1.0);
    let mut origin3 = Point::<3>::origin();
    for i in 0..3 {
        for j in 0..3 {
            direction3[(i, j)] = img4.direction()[(i, j)];
        }
        spacing3[i] = img4.spacing()[i];
        origin3[i] = img4.origin()[i];
    }

    Volume3::new(size3, origin3, spacing3, direction3, img4.data().to_vec())
}
