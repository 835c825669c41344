use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PdfDeskError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Failed to decode input: {0}")]
    DecodeError(String),

    #[error("Invalid page selection: {0}")]
    InvalidSelection(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Failed to encode output: {0}")]
    EncodeError(String),
}

impl PdfDeskError {
    /// True when the input bytes themselves could not be read, as opposed to
    /// a failure while transforming a readable document.
    pub fn is_unreadable_input(&self) -> bool {
        matches!(self, Self::ParseError(_) | Self::DecodeError(_))
    }
}
