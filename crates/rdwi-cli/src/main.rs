use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use rdwi_core::volume::orient::orient_for_fsl_conventions;
use rdwi_core::DwiModel;
use rdwi_io::nrrd::{make_file_comment, CommentOptions, DEFAULT_SMALL_GRADIENT_THRESHOLD};
use rdwi_io::{build_model, write_fsl_fileset, write_nrrd, DicomDirectorySource, FslSource};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ConversionMode {
    DicomToNrrd,
    DicomToFsl,
    FslToNrrd,
    FslToFsl,
}

impl ConversionMode {
    fn as_str(&self) -> &'static str {
        match self {
            Self::DicomToNrrd => "DicomToNrrd",
            Self::DicomToFsl => "DicomToFSL",
            Self::FslToNrrd => "FSLToNrrd",
            Self::FslToFsl => "FSLToFSL",
        }
    }

    fn writes_nrrd(&self) -> bool {
        matches!(self, Self::DicomToNrrd | Self::FslToNrrd)
    }
}

/// Convert diffusion-weighted MRI acquisitions between NRRD and FSL formats.
#[derive(Parser)]
#[command(name = "rdwi")]
#[command(about = "Diffusion-weighted MRI format converter", version)]
struct Cli {
    /// Conversion to perform
    #[arg(long, value_enum)]
    conversion_mode: ConversionMode,

    /// Directory holding the input DICOM series (DICOM modes)
    #[arg(long)]
    input_dicom_directory: Option<PathBuf>,

    /// Input volume file (FSL modes)
    #[arg(long)]
    input_volume: Option<PathBuf>,

    /// Output volume: .nrrd/.nhdr for NRRD modes, .nii/.nii.gz for FSL modes
    #[arg(long)]
    output_volume: PathBuf,

    /// Override for the input b-value sidecar (FSL modes)
    #[arg(long)]
    input_b_values: Option<PathBuf>,

    /// Override for the input b-vector sidecar (FSL modes)
    #[arg(long)]
    input_b_vectors: Option<PathBuf>,

    /// Override for the output b-value sidecar (FSL modes)
    #[arg(long)]
    output_b_values: Option<PathBuf>,

    /// Override for the output b-vector sidecar (FSL modes)
    #[arg(long)]
    output_b_vectors: Option<PathBuf>,

    /// Rotate gradients into the patient frame before NRRD output
    #[arg(long)]
    use_identity_measurement_frame: bool,

    /// Write b-vectors as N rows of 3 columns instead of 3 rows of N columns
    #[arg(long)]
    transpose_output_b_vectors: bool,

    /// Gradient magnitude below which a direction counts as a baseline
    #[arg(long, default_value_t = DEFAULT_SMALL_GRADIENT_THRESHOLD)]
    small_gradient_threshold: f64,

    /// Prefer b-matrix derived gradient directions where the vendor records them
    #[arg(long)]
    use_b_matrix_gradient_directions: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let model = load_input(&cli)?;

    if cli.conversion_mode.writes_nrrd() {
        convert_to_nrrd(&cli, model)
    } else {
        convert_to_fsl(&cli, model)
    }
}

fn load_input(cli: &Cli) -> Result<DwiModel> {
    match cli.conversion_mode {
        ConversionMode::DicomToNrrd | ConversionMode::DicomToFsl => {
            let directory = cli
                .input_dicom_directory
                .as_ref()
                .context("--input-dicom-directory is required for DICOM conversion modes")?;
            let source = DicomDirectorySource::open(directory)?;
            Ok(build_model(&source)?)
        }
        ConversionMode::FslToNrrd | ConversionMode::FslToFsl => {
            let volume = cli
                .input_volume
                .as_ref()
                .context("--input-volume is required for FSL conversion modes")?;
            let source = FslSource::new(
                volume.clone(),
                cli.input_b_values.clone(),
                cli.input_b_vectors.clone(),
            );
            Ok(build_model(&source)?)
        }
    }
}

fn convert_to_nrrd(cli: &Cli, model: DwiModel) -> Result<()> {
    let name = cli.output_volume.to_string_lossy();
    if !name.contains(".nhdr") && !name.contains(".nrrd") {
        bail!(
            "NRRD output requires a .nrrd or .nhdr extension, got '{}'",
            name
        );
    }

    let mut model = model.with_single_b_value_scaled();
    if cli.use_identity_measurement_frame {
        model = model.with_identity_frame()?;
    }

    let comment = make_file_comment(&CommentOptions {
        version: env!("CARGO_PKG_VERSION"),
        conversion_mode: cli.conversion_mode.as_str(),
        small_gradient_threshold: cli.small_gradient_threshold,
        use_identity_measurement_frame: cli.use_identity_measurement_frame,
        use_b_matrix_gradient_directions: cli.use_b_matrix_gradient_directions,
    });
    write_nrrd(&model, &cli.output_volume, &comment)?;
    info!("conversion complete: {}", cli.output_volume.display());
    Ok(())
}

fn convert_to_fsl(cli: &Cli, model: DwiModel) -> Result<()> {
    let model = model.with_identity_frame()?.with_unit_scaled_b_vectors();
    let img4 = model.to_four_d()?;
    let img4 = orient_for_fsl_conventions(&img4, true);

    write_fsl_fileset(
        &model,
        &img4,
        &cli.output_volume,
        cli.output_b_values.as_deref(),
        cli.output_b_vectors.as_deref(),
        !cli.transpose_output_b_vectors,
    )?;
    info!("conversion complete: {}", cli.output_volume.display());
    Ok(())
}
