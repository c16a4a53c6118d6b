pub mod dicom_source;
pub mod format;
pub mod fsl;
pub mod gradient_io;
pub mod nifti_source;
pub mod nrrd;
pub mod source;

pub use dicom_source::DicomDirectorySource;
pub use fsl::write_fsl_fileset;
pub use nifti_source::FslSource;
pub use nrrd::{make_file_comment, write_nrrd, CommentOptions};
pub use source::{build_model, DwiSource};
