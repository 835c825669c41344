use crate::catalog::{CatalogError, OperationId, UnknownOperation};
use crate::intake::IntakeError;
use crate::options::OptionError;
use crate::session::LifecycleState;
use crate::surface::SurfaceError;
use serde::Serialize;
use thiserror::Error;

/// User-facing error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    UnknownOperation,
    TooManyFiles,
    KindMismatch,
    MissingInput,
    AlreadyRunning,
    ProviderTransformFailure,
    UnsupportedOperation,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    UnknownOperation(#[from] UnknownOperation),

    #[error("{0} is coming soon and cannot be run yet")]
    UnsupportedOperation(OperationId),

    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error(transparent)]
    Options(#[from] OptionError),

    #[error("An operation is already running")]
    AlreadyRunning,

    #[error("Session is not ready to run (state: {0})")]
    NotReady(LifecycleState),

    #[error("No operation selected")]
    NoOperation,

    #[error("No file staged")]
    NoFiles,

    #[error("File index {index} out of bounds ({len} files staged)")]
    FileIndex { index: usize, len: usize },

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("{0} does not use the annotation surface")]
    SurfaceNotUsed(OperationId),

    #[error("No annotation surface configured")]
    NoSurface,

    #[error("Staged input changed while the surface was loading")]
    SurfaceStale,

    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl PipelineError {
    /// Category shown to the user, when the error falls in one.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::UnknownOperation(_) => Some(ErrorKind::UnknownOperation),
            Self::UnsupportedOperation(_) => Some(ErrorKind::UnsupportedOperation),
            Self::Intake(e) => Some(e.kind()),
            Self::Options(e) => Some(e.kind()),
            Self::AlreadyRunning => Some(ErrorKind::AlreadyRunning),
            Self::NoFiles => Some(ErrorKind::MissingInput),
            Self::NotReady(_)
            | Self::NoOperation
            | Self::FileIndex { .. }
            | Self::InvalidOrder(_)
            | Self::SurfaceNotUsed(_)
            | Self::NoSurface
            | Self::SurfaceStale
            | Self::Surface(_)
            | Self::Catalog(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FileKind;

    #[test]
    fn test_kind_mapping() {
        let unknown = PipelineError::from(UnknownOperation("x".into()));
        assert_eq!(unknown.kind(), Some(ErrorKind::UnknownOperation));

        let intake = PipelineError::from(IntakeError::KindMismatch {
            file_name: "a.txt".into(),
            expected: FileKind::PdfDocument,
        });
        assert_eq!(intake.kind(), Some(ErrorKind::KindMismatch));

        let options = PipelineError::from(OptionError::MissingInput { key: "markup" });
        assert_eq!(options.kind(), Some(ErrorKind::MissingInput));

        assert_eq!(PipelineError::AlreadyRunning.kind(), Some(ErrorKind::AlreadyRunning));
        assert_eq!(PipelineError::NotReady(LifecycleState::Idle).kind(), None);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            PipelineError::UnsupportedOperation(OperationId::OcrPdf).to_string(),
            "ocr-pdf is coming soon and cannot be run yet"
        );
        assert_eq!(
            PipelineError::NotReady(LifecycleState::AwaitingInput).to_string(),
            "Session is not ready to run (state: awaiting_input)"
        );
    }
}
