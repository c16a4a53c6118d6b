//! NRRD serializer for diffusion-weighted volumes.
//!
//! Produces a versioned text header followed either by the raw sample bytes
//! in the same stream (`.nrrd`, single-file mode) or by a reference to a
//! detached `.raw` sidecar (`.nhdr`, split mode). The header assumes the
//! gradient table has already been normalized to a single nominal b-value;
//! it records the table maximum but does not enforce the normalization.

use crate::format::fmt_f64;
use byteorder::{LittleEndian, WriteBytesExt};
use rdwi_core::{DwiError, DwiModel, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Format version token written as the first header line.
pub const NRRD_MAGIC: &str = "NRRD0005";

/// The only space definition this converter emits.
pub const NRRD_SPACE_DEFINITION: &str = "left-posterior-superior";

/// Default small-gradient threshold; echoed in the header comment only when
/// the caller deviates from it.
pub const DEFAULT_SMALL_GRADIENT_THRESHOLD: f64 = 0.2;

/// Conversion parameters echoed into the header comment block.
pub struct CommentOptions<'a> {
    pub version: &'a str,
    pub conversion_mode: &'a str,
    pub small_gradient_threshold: f64,
    pub use_identity_measurement_frame: bool,
    pub use_b_matrix_gradient_directions: bool,
}

/// Build the free-text comment block stamped after the magic token.
pub fn make_file_comment(options: &CommentOptions) -> String {
    let mut comment = String::new();
    comment.push_str("#\n#\n");
    comment.push_str(&format!(
        "# This file was created by rdwi version {}\n",
        options.version
    ));
    comment.push_str("# Command line options:\n");
    comment.push_str(&format!(
        "# --conversion-mode {}\n",
        options.conversion_mode
    ));
    if (options.small_gradient_threshold - DEFAULT_SMALL_GRADIENT_THRESHOLD).abs() > 1e-4 {
        comment.push_str(&format!(
            "# --small-gradient-threshold {}\n",
            options.small_gradient_threshold
        ));
    }
    if options.use_identity_measurement_frame {
        comment.push_str("# --use-identity-measurement-frame\n");
    }
    if options.use_b_matrix_gradient_directions {
        comment.push_str("# --use-b-matrix-gradient-directions\n");
    }
    comment
}

/// Serialize the session to an NRRD header, in single-file or split mode.
///
/// A header filename carrying `.nhdr` selects split mode: the header
/// references a `.raw` sidecar next to it and the sample buffer goes to the
/// raw bulk writer in little-endian order. Any other name is single-file
/// mode and the samples follow the header in the same stream. Write failures
/// on either path propagate to the caller.
pub fn write_nrrd(model: &DwiModel, header_path: &Path, comment: &str) -> Result<()> {
    let header_name = header_path.to_string_lossy().into_owned();
    let data_path = header_name
        .find(".nhdr")
        .map(|pos| PathBuf::from(format!("{}.raw", &header_name[..pos])));

    let volume = model.volume();
    let size = volume.size();
    let space_direction = volume.space_direction();
    let measurement_frame = model.frame().matrix();
    let origin = volume.origin();
    let max_b_value = model.max_b_value();

    let file = File::create(header_path)?;
    let mut header = BufWriter::new(file);

    writeln!(header, "{NRRD_MAGIC}")?;
    header.write_all(comment.as_bytes())?;

    if let Some(ref data_path) = data_path {
        writeln!(header, "content: exists({},0)", file_name(data_path))?;
    }
    writeln!(header, "type: short")?;
    writeln!(header, "dimension: 4")?;
    writeln!(header, "space: {NRRD_SPACE_DEFINITION}")?;
    writeln!(
        header,
        "sizes: {} {} {} {}",
        size[0],
        size[1],
        model.slices_per_volume(),
        model.n_volumes()
    )?;
    writeln!(
        header,
        "thicknesses:  NaN  NaN {} NaN",
        fmt_f64(volume.spacing()[2])
    )?;
    writeln!(
        header,
        "space directions: ({},{},{}) ({},{},{}) ({},{},{}) none",
        fmt_f64(space_direction[(0, 0)]),
        fmt_f64(space_direction[(1, 0)]),
        fmt_f64(space_direction[(2, 0)]),
        fmt_f64(space_direction[(0, 1)]),
        fmt_f64(space_direction[(1, 1)]),
        fmt_f64(space_direction[(2, 1)]),
        fmt_f64(space_direction[(0, 2)]),
        fmt_f64(space_direction[(1, 2)]),
        fmt_f64(space_direction[(2, 2)]),
    )?;
    writeln!(header, "centerings: cell cell cell ???")?;
    writeln!(header, "kinds: space space space list")?;
    writeln!(header, "endian: little")?;
    writeln!(header, "encoding: raw")?;
    writeln!(header, "space units: \"mm\" \"mm\" \"mm\"")?;
    writeln!(
        header,
        "space origin: ({},{},{}) ",
        fmt_f64(origin[0]),
        fmt_f64(origin[1]),
        fmt_f64(origin[2]),
    )?;
    if let Some(ref data_path) = data_path {
        writeln!(header, "data file: {}", file_name(data_path))?;
    }
    writeln!(
        header,
        "measurement frame: ({},{},{}) ({},{},{}) ({},{},{})",
        fmt_f64(measurement_frame[(0, 0)]),
        fmt_f64(measurement_frame[(1, 0)]),
        fmt_f64(measurement_frame[(2, 0)]),
        fmt_f64(measurement_frame[(0, 1)]),
        fmt_f64(measurement_frame[(1, 1)]),
        fmt_f64(measurement_frame[(2, 1)]),
        fmt_f64(measurement_frame[(0, 2)]),
        fmt_f64(measurement_frame[(1, 2)]),
        fmt_f64(measurement_frame[(2, 2)]),
    )?;

    for (key, value) in model.dicom_fields() {
        writeln!(header, "{key}:={value}")?;
    }

    writeln!(header, "modality:=DWMRI")?;
    // the nominal b-value, i.e. the largest one
    writeln!(header, "DWMRI_b-value:={}", fmt_f64(max_b_value))?;
    for (k, entry) in model.gradients().iter().enumerate() {
        writeln!(
            header,
            "DWMRI_gradient_{k:04}:={}   {}   {}",
            fmt_f64(entry.direction[0]),
            fmt_f64(entry.direction[1]),
            fmt_f64(entry.direction[2]),
        )?;
    }
    writeln!(header)?;

    match data_path {
        None => {
            // single-file: raw samples follow the header with no delimiter
            for sample in volume.data() {
                header.write_i16::<LittleEndian>(*sample)?;
            }
            header.flush()?;
            info!("wrote NRRD volume to {}", header_path.display());
        }
        Some(data_path) => {
            header.flush()?;
            write_raw_volume(&data_path, volume.data())?;
            info!(
                "wrote NRRD header to {} with data file {}",
                header_path.display(),
                data_path.display()
            );
        }
    }
    Ok(())
}

/// Raw bulk writer for the split-mode sidecar: little-endian packed samples,
/// no header. Failures are reported, never swallowed.
fn write_raw_volume(path: &Path, samples: &[i16]) -> Result<()> {
    let map_err =
        |e: std::io::Error| DwiError::bulk_volume(path.display().to_string(), e.to_string());
    let file = File::create(path).map_err(map_err)?;
    let mut writer = BufWriter::new(file);
    for sample in samples {
        writer.write_i16::<LittleEndian>(*sample).map_err(map_err)?;
    }
    writer.flush().map_err(map_err)?;
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
