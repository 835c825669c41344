//! File intake
//!
//! Candidate files are checked against the selected operation before they
//! are staged: cardinality first (a single-file operation never holds more
//! than one file), then file kind. The kind check is advisory unless strict
//! mode is configured.

use crate::catalog::{FileKind, OperationDescriptor, OperationId};
use crate::config::IntakeConfig;
use crate::error::ErrorKind;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// A file offered for staging.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingFile {
    pub name: String,
    pub content: Bytes,
    pub mime_hint: Option<String>,
}

impl IncomingFile {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            mime_hint: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime_hint = Some(mime.into());
        self
    }
}

/// A file accepted into a session. Its content never changes after intake.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedFile {
    pub name: String,
    pub content: Bytes,
    pub size: usize,
    pub mime_hint: Option<String>,
}

impl From<IncomingFile> for StagedFile {
    fn from(file: IncomingFile) -> Self {
        Self {
            size: file.content.len(),
            name: file.name,
            content: file.content,
            mime_hint: file.mime_hint,
        }
    }
}

/// Ordered staged files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileSet {
    files: Vec<StagedFile>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StagedFile> {
        self.files.iter()
    }

    pub fn get(&self, index: usize) -> Option<&StagedFile> {
        self.files.get(index)
    }

    pub fn first(&self) -> Option<&StagedFile> {
        self.files.first()
    }

    pub fn names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(|f| f.size).sum()
    }

    pub(crate) fn extend(&mut self, files: impl IntoIterator<Item = StagedFile>) {
        self.files.extend(files);
    }

    pub(crate) fn remove(&mut self, index: usize) -> Option<StagedFile> {
        (index < self.files.len()).then(|| self.files.remove(index))
    }

    /// Reorder by a permutation of the current indices. The caller checks
    /// the permutation first.
    pub(crate) fn reorder(&mut self, order: &[usize]) {
        let mut slots: Vec<Option<StagedFile>> = self.files.drain(..).map(Some).collect();
        self.files = order.iter().filter_map(|&i| slots[i].take()).collect();
    }

    pub(crate) fn clear(&mut self) {
        self.files.clear();
    }
}

impl FromIterator<StagedFile> for FileSet {
    fn from_iter<I: IntoIterator<Item = StagedFile>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<IncomingFile>> for FileSet {
    fn from(files: Vec<IncomingFile>) -> Self {
        files.into_iter().map(StagedFile::from).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeError {
    #[error("{operation} accepts at most {limit} file(s); {attempted} offered")]
    TooManyFiles {
        operation: OperationId,
        limit: usize,
        attempted: usize,
    },

    #[error("{file_name} is not a valid file for this operation (expected {expected:?})")]
    KindMismatch { file_name: String, expected: FileKind },
}

impl IntakeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TooManyFiles { .. } => ErrorKind::TooManyFiles,
            Self::KindMismatch { .. } => ErrorKind::KindMismatch,
        }
    }
}

/// A tolerated kind mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindWarning {
    pub file_name: String,
    pub expected: FileKind,
}

/// Files cleared for staging, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub accepted: Vec<StagedFile>,
    pub warnings: Vec<KindWarning>,
}

#[derive(Debug, Clone, Default)]
pub struct InputValidator {
    strict_kinds: bool,
}

impl InputValidator {
    pub fn new(config: &IntakeConfig) -> Self {
        Self {
            strict_kinds: config.strict_kinds,
        }
    }

    /// Check `candidates` against `descriptor`, given the files already in
    /// `current`. Pure: nothing is staged here, and the same inputs always
    /// give the same answer.
    pub fn validate(
        &self,
        descriptor: &OperationDescriptor,
        current: &FileSet,
        candidates: Vec<IncomingFile>,
    ) -> Result<Validated, IntakeError> {
        let limit = match (descriptor.accepted_kind, descriptor.accepts_multiple_files) {
            (FileKind::None, _) => Some(0),
            (_, false) => Some(1),
            (_, true) => None,
        };
        let attempted = current.len() + candidates.len();
        if let Some(limit) = limit.filter(|&limit| attempted > limit) {
            return Err(IntakeError::TooManyFiles {
                operation: descriptor.id,
                limit,
                attempted,
            });
        }

        let expected = descriptor.accepted_kind;
        let mut warnings = Vec::new();
        for file in &candidates {
            if expected.matches(&file.name, file.mime_hint.as_deref()) {
                continue;
            }
            if self.strict_kinds {
                return Err(IntakeError::KindMismatch {
                    file_name: file.name.clone(),
                    expected,
                });
            }
            warn!(
                operation = %descriptor.id,
                file = %file.name,
                ?expected,
                "Accepting file that does not look like the expected kind"
            );
            warnings.push(KindWarning {
                file_name: file.name.clone(),
                expected,
            });
        }

        let accepted: Vec<StagedFile> = candidates.into_iter().map(StagedFile::from).collect();
        debug!(
            operation = %descriptor.id,
            accepted = accepted.len(),
            bytes = accepted.iter().map(|f| f.size).sum::<usize>(),
            "Validated files"
        );
        Ok(Validated { accepted, warnings })
    }
}
