//! Reading and writing of FSL-style gradient sidecar files.
//!
//! `.bval` holds one space-separated list of b-values; `.bvec` holds the
//! direction vectors either as 3 rows of N columns or N rows of 3 columns.
//! Both layouts are accepted on input; output layout is the caller's choice.

use crate::format::fmt_f64;
use rdwi_core::{DwiError, GradientTable, Result, Vector};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

type Vector3 = Vector<3>;

/// Volume filename extensions from which sidecar paths can be derived.
pub const VOLUME_EXTENSIONS: &[&str] = &[".nii.gz", ".nii", ".nhdr", ".nrrd"];

/// Byte position of the first recognized volume extension in `name`.
pub fn volume_extension_position(name: &str) -> Option<usize> {
    VOLUME_EXTENSIONS.iter().find_map(|ext| name.find(ext))
}

/// Derive a sidecar path from a volume filename template by replacing its
/// recognized volume extension with `sidecar_extension`.
pub fn default_sidecar_path(volume_template: &Path, sidecar_extension: &str) -> PathBuf {
    let name = volume_template.to_string_lossy();
    match volume_extension_position(&name) {
        Some(pos) => PathBuf::from(format!("{}.{}", &name[..pos], sidecar_extension)),
        None => volume_template.with_extension(sidecar_extension),
    }
}

/// Override the gradient table with values read from external sidecar files.
///
/// Empty paths default to the volume template with `.bval`/`.bvec`
/// substituted for its extension. The b-value and b-vector counts must
/// agree; the caller is responsible for matching the result against its
/// volume count when installing it into a session.
pub fn load_gradient_files(
    b_values_path: Option<&Path>,
    b_vectors_path: Option<&Path>,
    volume_template: &Path,
) -> Result<GradientTable> {
    let b_values_path = resolve_sidecar_path(b_values_path, volume_template, "bval");
    let b_vectors_path = resolve_sidecar_path(b_vectors_path, volume_template, "bvec");

    let b_values = read_b_values(&b_values_path)?;
    let b_vectors = read_b_vectors(&b_vectors_path)?;
    if b_values.len() != b_vectors.len() {
        return Err(DwiError::SidecarCountMismatch {
            b_values: b_values.len(),
            b_vectors: b_vectors.len(),
        });
    }

    let mut table = GradientTable::new();
    for (b_value, direction) in b_values.into_iter().zip(b_vectors) {
        table.push(b_value, direction);
    }
    Ok(table)
}

fn resolve_sidecar_path(explicit: Option<&Path>, template: &Path, extension: &str) -> PathBuf {
    match explicit {
        Some(path) if !path.as_os_str().is_empty() => path.to_path_buf(),
        _ => {
            let derived = default_sidecar_path(template, extension);
            info!(
                "no .{} path given, defaulting to {} from template {}",
                extension,
                derived.display(),
                template.display()
            );
            derived
        }
    }
}

/// Read a `.bval` file: whitespace-separated reals, any line structure.
pub fn read_b_values(path: &Path) -> Result<Vec<f64>> {
    let contents = std::fs::read_to_string(path)?;
    contents
        .split_whitespace()
        .map(|token| parse_real(path, token))
        .collect()
}

/// Read a `.bvec` file in either layout.
///
/// Exactly three rows are interpreted as 3 rows of N columns (the FSL
/// default); otherwise every row must hold one 3-component vector.
pub fn read_b_vectors(path: &Path) -> Result<Vec<Vector3>> {
    let contents = std::fs::read_to_string(path)?;
    let rows: Vec<Vec<f64>> = contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            line.split_whitespace()
                .map(|token| parse_real(path, token))
                .collect()
        })
        .collect::<Result<_>>()?;

    if rows.len() == 3 {
        let columns = rows[0].len();
        if rows[1].len() != columns || rows[2].len() != columns {
            return Err(DwiError::malformed_gradient_file(
                path.display().to_string(),
                "rows of a 3-row b-vector file must have equal length",
            ));
        }
        Ok((0..columns)
            .map(|j| Vector3::new([rows[0][j], rows[1][j], rows[2][j]]))
            .collect())
    } else {
        rows.iter()
            .map(|row| {
                if row.len() != 3 {
                    return Err(DwiError::malformed_gradient_file(
                        path.display().to_string(),
                        format!("expected 3 components per row, found {}", row.len()),
                    ));
                }
                Ok(Vector3::new([row[0], row[1], row[2]]))
            })
            .collect()
    }
}

fn parse_real(path: &Path, token: &str) -> Result<f64> {
    token.parse().map_err(|_| {
        DwiError::malformed_gradient_file(
            path.display().to_string(),
            format!("'{token}' is not a number"),
        )
    })
}

/// Write a `.bval` sidecar: one line of space-separated values, table order.
pub fn write_b_values(values: &[f64], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let line = values.iter().map(|v| fmt_f64(*v)).collect::<Vec<_>>();
    writeln!(writer, "{}", line.join(" "))?;
    writer.flush()?;
    Ok(())
}

/// Write a `.bvec` sidecar in the requested layout: 3 rows of N columns
/// when `horizontal_by_3_rows`, N rows of 3 columns otherwise.
pub fn write_b_vectors(
    table: &GradientTable,
    path: &Path,
    horizontal_by_3_rows: bool,
) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    if horizontal_by_3_rows {
        for axis in 0..3 {
            let row = table
                .iter()
                .map(|entry| fmt_f64(entry.direction[axis]))
                .collect::<Vec<_>>();
            writeln!(writer, "{}", row.join(" "))?;
        }
    } else {
        for entry in table.iter() {
            writeln!(
                writer,
                "{} {} {}",
                fmt_f64(entry.direction[0]),
                fmt_f64(entry.direction[1]),
                fmt_f64(entry.direction[2]),
            )?;
        }
    }
    writer.flush()?;
    Ok(())
}
