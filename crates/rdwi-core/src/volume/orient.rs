//! Orientation conversion between the DICOM/LPS layout and the FSL display
//! convention.
//!
//! The two conventions differ by a fixed sign flip on the anterior-posterior
//! axis (axis 1):
//!
//! | convention | axis matrix              |
//! |------------|--------------------------|
//! | DICOM/LPS  | `[1 0 0; 0  1 0; 0 0 1]` |
//! | FSL        | `[1 0 0; 0 -1 0; 0 0 1]` |
//!
//! The mapping is data-independent and self-inverse: converting to the FSL
//! convention and back restores the original layout.

use crate::volume::Volume4;

/// Toggle a 4D volume between the DICOM/LPS convention and the FSL display
/// convention.
///
/// `to_fsl` selects the intended target; both directions apply the same
/// fixed axis toggle, so a `true` conversion followed by a `false` one
/// restores the original volume. The sample order along axis 1 is reversed,
/// the corresponding direction column is negated, and the origin moves to
/// the physical position of the former last row.
pub fn orient_for_fsl_conventions(img4: &Volume4, to_fsl: bool) -> Volume4 {
    // The toggle is an involution; the flag only documents intent.
    let _ = to_fsl;
    flip_anterior_posterior(img4)
}

fn flip_anterior_posterior(img4: &Volume4) -> Volume4 {
    let [nx, ny, nz, nv] = img4.size();
    let src = img4.data();
    let mut flipped = vec![0; src.len()];

    let row = nx;
    let slice = nx * ny;
    let volume = slice * nz;
    for v in 0..nv {
        for z in 0..nz {
            for y in 0..ny {
                let src_base = v * volume + z * slice + y * row;
                let dst_base = v * volume + z * slice + (ny - 1 - y) * row;
                flipped[dst_base..dst_base + row].copy_from_slice(&src[src_base..src_base + row]);
            }
        }
    }

    let mut direction = *img4.direction();
    let spacing = *img4.spacing();
    // Physical step of one row, before negation
    let mut origin = *img4.origin();
    if ny > 0 {
        let step = spacing[1] * (ny - 1) as f64;
        for j in 0..4 {
            origin[j] += direction[(j, 1)] * step;
        }
    }
    for j in 0..4 {
        direction[(j, 1)] = -direction[(j, 1)];
    }

    Volume4::new(img4.size(), origin, spacing, direction, flipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{Direction, Point, Spacing};
    use crate::volume::{reshape, Volume3};

    fn sample_volume() -> Volume4 {
        let data: Vec<i16> = (0..24).collect();
        let img3 = Volume3::new(
            [2, 3, 4],
            Point::new([1.0, 2.0, 3.0]),
            Spacing::new([1.0, 2.0, 1.0]),
            Direction::identity(),
            data,
        );
        reshape::to_four_d(&img3, 2).unwrap()
    }

    #[test]
    fn test_flip_reverses_rows_and_negates_column() {
        let img4 = sample_volume();
        let flipped = orient_for_fsl_conventions(&img4, true);

        // first row of the first slice becomes the last row
        assert_eq!(&flipped.data()[4..6], &img4.data()[0..2]);
        assert_eq!(flipped.direction()[(1, 1)], -1.0);
        // origin moved to the former last row: 2.0 + 2.0 * (3 - 1)
        assert_eq!(flipped.origin()[1], 6.0);
    }

    #[test]
    fn test_double_toggle_restores_exactly() {
        let img4 = sample_volume();
        let restored = orient_for_fsl_conventions(&orient_for_fsl_conventions(&img4, true), false);
        assert_eq!(restored, img4);
    }
}
