use proptest::prelude::*;
use rdwi_core::gradient::GradientTable;
use rdwi_core::spatial::{Direction, Point, Spacing, Vector};
use rdwi_core::volume::{reshape, Volume3};

fn make_rotation(angle_x: f64, angle_y: f64, angle_z: f64) -> Direction<3> {
    let cx = angle_x.cos();
    let sx = angle_x.sin();
    let cy = angle_y.cos();
    let sy = angle_y.sin();
    let cz = angle_z.cos();
    let sz = angle_z.sin();

    let rz = nalgebra::SMatrix::<f64, 3, 3>::new(cz, -sz, 0.0, sz, cz, 0.0, 0.0, 0.0, 1.0);
    let ry = nalgebra::SMatrix::<f64, 3, 3>::new(cy, 0.0, sy, 0.0, 1.0, 0.0, -sy, 0.0, cy);
    let rx = nalgebra::SMatrix::<f64, 3, 3>::new(1.0, 0.0, 0.0, 0.0, cx, -sx, 0.0, sx, cx);

    Direction(rx * ry * rz)
}

proptest! {
    #[test]
    fn test_reshape_roundtrip(
        nx in 1usize..6, ny in 1usize..6,
        slices_per_volume in 1usize..5, n_volumes in 1usize..5,
        ox in -100.0f64..100.0, oy in -100.0f64..100.0, oz in -100.0f64..100.0,
        sx in 0.1f64..5.0, sy in 0.1f64..5.0, sz in 0.1f64..5.0,
        ax in -3.14f64..3.14, ay in -3.14f64..3.14, az in -3.14f64..3.14,
    ) {
        let nz = slices_per_volume * n_volumes;
        let data: Vec<i16> = (0..(nx * ny * nz)).map(|i| (i % 4096) as i16).collect();
        let volume = Volume3::new(
            [nx, ny, nz],
            Point::new([ox, oy, oz]),
            Spacing::new([sx, sy, sz]),
            make_rotation(ax, ay, az),
            data,
        );

        let restored = reshape::to_three_d(&reshape::to_four_d(&volume, n_volumes).unwrap());
        prop_assert_eq!(restored, volume);
    }

    #[test]
    fn test_normalization_roundtrip(
        b1 in 0.0f64..3000.0, b2 in 1.0f64..3000.0,
        dx in -1.0f64..1.0, dy in -1.0f64..1.0, dz in -1.0f64..1.0,
    ) {
        // one baseline-ish entry plus one weighted entry with a unit direction
        let norm = (dx * dx + dy * dy + dz * dz).sqrt();
        prop_assume!(norm > 1e-3);
        let unit = Vector::new([dx / norm, dy / norm, dz / norm]);

        let mut table = GradientTable::new();
        table.push(b1.min(b2), unit);
        table.push(b1.max(b2), unit);

        let roundtripped = table
            .to_single_b_value_scaled()
            .to_multiple_b_values_unit_scaled();

        for (original, restored) in table.iter().zip(roundtripped.iter()) {
            // b-values come back within rounding plus the 1% magnitude clamp
            let tolerance = 0.5 + original.b_value * 0.011;
            prop_assert!(
                (original.b_value - restored.b_value).abs() <= tolerance,
                "b-value mismatch: {} vs {}", original.b_value, restored.b_value
            );
            if original.b_value > 0.0 {
                prop_assert!((restored.direction - unit).norm() < 1e-9);
            }
        }
    }

    #[test]
    fn test_frame_resolution_roundtrip(
        ax in -3.14f64..3.14, ay in -3.14f64..3.14, az in -3.14f64..3.14,
        dx in -1.0f64..1.0, dy in -1.0f64..1.0, dz in -1.0f64..1.0,
    ) {
        let frame = rdwi_core::MeasurementFrame::new(make_rotation(ax, ay, az));
        let mut table = GradientTable::new();
        table.push(1000.0, Vector::new([dx, dy, dz]));

        let (resolved, identity) = frame.resolve_to_identity(&table).unwrap();
        prop_assert!(identity.is_identity());

        let restored = resolved.map_directions(|v| *frame.matrix() * v);
        let original = table.entries()[0].direction;
        let recovered = restored.entries()[0].direction;
        prop_assert!(
            (original - recovered).norm() < 1e-9,
            "direction mismatch: {:?} vs {:?}", original, recovered
        );
    }
}
