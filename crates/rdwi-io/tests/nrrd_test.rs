use rdwi_core::spatial::{Direction, Point, Spacing, Vector};
use rdwi_core::{DicomFieldMap, DwiModel, GradientTable, MeasurementFrame, Volume3};
use rdwi_io::nrrd::{make_file_comment, write_nrrd, CommentOptions};
use tempfile::tempdir;

/// The fixed reference input: a 2x2x2 unwrapped volume holding 2 volumes,
/// b-values [0, 1000], directions [(0,0,0), (1,0,0)].
fn reference_model() -> DwiModel {
    let volume = Volume3::new(
        [2, 2, 2],
        Point::new([-1.0, -2.0, -3.0]),
        Spacing::new([1.0, 1.0, 2.0]),
        Direction::identity(),
        (0..8).collect(),
    );
    let mut gradients = GradientTable::new();
    gradients.push(0.0, Vector::zeros());
    gradients.push(1000.0, Vector::new([1.0, 0.0, 0.0]));

    let mut fields = DicomFieldMap::new();
    fields.insert("DICOM_Manufacturer".into(), "TESTSCANNER".into());

    DwiModel::new(volume, gradients, MeasurementFrame::identity(), fields)
        .unwrap()
        .with_single_b_value_scaled()
}

fn comment() -> String {
    make_file_comment(&CommentOptions {
        version: "0.1.0",
        conversion_mode: "DicomToNrrd",
        small_gradient_threshold: 0.2,
        use_identity_measurement_frame: false,
        use_b_matrix_gradient_directions: false,
    })
}

fn header_text(bytes: &[u8]) -> String {
    // header is everything before the blank line separating it from raw data
    let end = bytes
        .windows(2)
        .position(|w| w == b"\n\n")
        .map(|pos| pos + 1)
        .unwrap_or(bytes.len());
    String::from_utf8(bytes[..end].to_vec()).unwrap()
}

#[test]
fn test_single_file_header_is_byte_exact() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dwi.nrrd");
    write_nrrd(&reference_model(), &path, &comment()).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let header = header_text(&bytes);

    assert!(header.starts_with("NRRD0005\n"));
    assert!(header.contains("\ntype: short\n"));
    assert!(header.contains("\ndimension: 4\n"));
    assert!(header.contains("\nspace: left-posterior-superior\n"));
    assert!(header.contains("\nsizes: 2 2 1 2\n"));
    assert!(header.contains("\nDWMRI_b-value:=1.0000000000000000e+03\n"));
    assert!(header.contains("\nmodality:=DWMRI\n"));
    assert!(header.contains("\nDICOM_Manufacturer:=TESTSCANNER\n"));

    let gradient_0000: Vec<&str> = header
        .lines()
        .filter(|line| line.starts_with("DWMRI_gradient_0000:="))
        .collect();
    let gradient_0001: Vec<&str> = header
        .lines()
        .filter(|line| line.starts_with("DWMRI_gradient_0001:="))
        .collect();
    assert_eq!(gradient_0000.len(), 1);
    assert_eq!(gradient_0001.len(), 1);
    assert!(
        header.find("DWMRI_gradient_0000:=").unwrap()
            < header.find("DWMRI_gradient_0001:=").unwrap()
    );
    assert_eq!(
        gradient_0000[0],
        "DWMRI_gradient_0000:=0.0000000000000000e+00   0.0000000000000000e+00   0.0000000000000000e+00"
    );
    assert_eq!(
        gradient_0001[0],
        "DWMRI_gradient_0001:=1.0000000000000000e+00   0.0000000000000000e+00   0.0000000000000000e+00"
    );

    // thickness of the slice axis with the fixed formatter
    assert!(header.contains("\nthicknesses:  NaN  NaN 2.0000000000000000e+00 NaN\n"));
    // single-file mode has no detached data references
    assert!(!header.contains("data file:"));
    assert!(!header.contains("content: exists"));
}

#[test]
fn test_single_file_appends_little_endian_samples() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dwi.nrrd");
    write_nrrd(&reference_model(), &path, &comment()).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let data_start = bytes.windows(2).position(|w| w == b"\n\n").unwrap() + 2;
    let raw = &bytes[data_start..];
    assert_eq!(raw.len(), 8 * 2);
    // samples 0..8 as little-endian i16
    for (k, chunk) in raw.chunks(2).enumerate() {
        assert_eq!(i16::from_le_bytes([chunk[0], chunk[1]]), k as i16);
    }
}

#[test]
fn test_split_mode_writes_header_and_raw_sidecar() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dwi.nhdr");
    write_nrrd(&reference_model(), &path, &comment()).unwrap();

    let header = std::fs::read_to_string(&path).unwrap();
    assert!(header.contains("content: exists(dwi.raw,0)\n"));
    assert!(header.contains("\ndata file: dwi.raw\n"));

    let raw = std::fs::read(dir.path().join("dwi.raw")).unwrap();
    assert_eq!(raw.len(), 8 * 2);
    assert_eq!(i16::from_le_bytes([raw[14], raw[15]]), 7);
}

#[test]
fn test_measurement_frame_always_written() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dwi.nrrd");
    write_nrrd(&reference_model(), &path, &comment()).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let header = header_text(&bytes);
    assert!(header.contains(
        "measurement frame: (1.0000000000000000e+00,0.0000000000000000e+00,0.0000000000000000e+00) \
         (0.0000000000000000e+00,1.0000000000000000e+00,0.0000000000000000e+00) \
         (0.0000000000000000e+00,0.0000000000000000e+00,1.0000000000000000e+00)"
    ));
}
