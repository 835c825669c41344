//! Per-run session state
//!
//! A session holds the selected operation, its staged files and options,
//! and where it is in the lifecycle. Sessions are plain values owned by the
//! host; the dispatcher mutates them through the methods here.

use crate::catalog::{FileKind, OperationDescriptor, OperationId};
use crate::dispatcher::RunFailure;
use crate::intake::FileSet;
use crate::options::{OptionValues, RawOptions};
use crate::surface::SurfaceHandle;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Where a session is in the run lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// No operation selected.
    Idle,
    AwaitingInput,
    Ready,
    Running,
    Succeeded,
    Failed,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingInput => "awaiting_input",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub(crate) struct SessionInner {
    pub operation: Option<Arc<OperationDescriptor>>,
    pub files: FileSet,
    pub raw_options: RawOptions,
    /// `None` until the raw options validate against the operation's schema.
    pub options: Option<OptionValues>,
    pub surface: Option<SurfaceHandle>,
    pub state: LifecycleState,
    pub last_failure: Option<RunFailure>,
}

impl SessionInner {
    fn new() -> Self {
        Self {
            operation: None,
            files: FileSet::new(),
            raw_options: RawOptions::new(),
            options: None,
            surface: None,
            state: LifecycleState::Idle,
            last_failure: None,
        }
    }

    /// Every precondition for a run holds.
    pub fn is_ready(&self) -> bool {
        let Some(op) = &self.operation else {
            return false;
        };
        let has_files = op.accepted_kind == FileKind::None || !self.files.is_empty();
        let has_options = op.options.is_none() || self.options.is_some();
        let has_surface = !op.requires_surface || self.surface.is_some();
        op.provider.is_some() && has_files && has_options && has_surface
    }

    /// Move between `AwaitingInput` and `Ready` to match the staged input.
    /// Other states are left alone.
    pub fn refresh_readiness(&mut self) {
        if matches!(self.state, LifecycleState::AwaitingInput | LifecycleState::Ready) {
            self.state = if self.is_ready() {
                LifecycleState::Ready
            } else {
                LifecycleState::AwaitingInput
            };
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// One run context. Create one per user flow and pass it to every
/// dispatcher call.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    inner: Mutex<SessionInner>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            inner: Mutex::new(SessionInner::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> LifecycleState {
        self.lock().state
    }

    pub fn operation(&self) -> Option<OperationId> {
        self.lock().operation.as_ref().map(|op| op.id)
    }

    pub fn file_names(&self) -> Vec<String> {
        self.lock().files.iter().map(|f| f.name.clone()).collect()
    }

    pub fn options(&self) -> Option<OptionValues> {
        self.lock().options.clone()
    }

    pub fn raw_options(&self) -> RawOptions {
        self.lock().raw_options.clone()
    }

    pub fn surface(&self) -> Option<SurfaceHandle> {
        self.lock().surface
    }

    pub fn last_failure(&self) -> Option<RunFailure> {
        self.lock().last_failure.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock();
        SessionSnapshot {
            id: self.id,
            operation: inner.operation.as_ref().map(|op| op.id),
            state: inner.state,
            files: inner
                .files
                .iter()
                .map(|f| FileSummary {
                    name: f.name.clone(),
                    size: f.size,
                })
                .collect(),
            options: inner.options.clone(),
            surface_loaded: inner.surface.is_some(),
            last_failure: inner.last_failure.clone(),
        }
    }

    /// The state lock. A panic while holding it cannot leave the session
    /// half-updated in a way later calls depend on, so poisoning is ignored.
    pub(crate) fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Serializable view of a session for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub operation: Option<OperationId>,
    pub state: LifecycleState,
    pub files: Vec<FileSummary>,
    pub options: Option<OptionValues>,
    pub surface_loaded: bool,
    pub last_failure: Option<RunFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    pub name: String,
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::OperationDescriptor;
    use crate::intake::IncomingFile;
    use crate::options::OptionSchemaId;
    use crate::testing::FixedProvider;

    fn inner_with(op: OperationDescriptor) -> SessionInner {
        let mut inner = SessionInner::new();
        inner.operation = Some(Arc::new(op));
        inner.state = LifecycleState::AwaitingInput;
        inner
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = Session::new();
        assert_eq!(session.state(), LifecycleState::Idle);
        assert_eq!(session.operation(), None);
        assert_ne!(session.id(), Session::new().id());
    }

    #[test]
    fn test_ready_needs_files() {
        let op = OperationDescriptor::new(OperationId::PdfToWord, "PDF to Word", "")
            .provider(Arc::new(FixedProvider::pdf("x.pdf")));
        let mut inner = inner_with(op);
        inner.refresh_readiness();
        assert_eq!(inner.state, LifecycleState::AwaitingInput);

        inner.files = vec![IncomingFile::new("a.pdf", "x")].into();
        inner.refresh_readiness();
        assert_eq!(inner.state, LifecycleState::Ready);
    }

    #[test]
    fn test_ready_needs_options_when_schema_exists() {
        let op = OperationDescriptor::new(OperationId::HtmlToPdf, "HTML to PDF", "")
            .kind(FileKind::None)
            .options(OptionSchemaId::Markup)
            .provider(Arc::new(FixedProvider::pdf("x.pdf")));
        let mut inner = inner_with(op);
        inner.refresh_readiness();
        assert_eq!(inner.state, LifecycleState::AwaitingInput);

        inner.options = Some(OptionValues::Markup {
            markup: "<p>hi</p>".into(),
        });
        inner.refresh_readiness();
        assert_eq!(inner.state, LifecycleState::Ready);
    }

    #[test]
    fn test_coming_soon_never_ready() {
        let op = OperationDescriptor::new(OperationId::OcrPdf, "OCR PDF", "");
        let mut inner = inner_with(op);
        inner.files = vec![IncomingFile::new("a.pdf", "x")].into();
        inner.refresh_readiness();
        assert_eq!(inner.state, LifecycleState::AwaitingInput);
    }

    #[test]
    fn test_refresh_leaves_terminal_states_alone() {
        let op = OperationDescriptor::new(OperationId::PdfToWord, "PDF to Word", "")
            .provider(Arc::new(FixedProvider::pdf("x.pdf")));
        let mut inner = inner_with(op);
        inner.files = vec![IncomingFile::new("a.pdf", "x")].into();
        inner.state = LifecycleState::Failed;
        inner.refresh_readiness();
        assert_eq!(inner.state, LifecycleState::Failed);
    }

    #[test]
    fn test_snapshot_serializes() {
        let session = Session::new();
        let json = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(json["state"], "idle");
        assert_eq!(json["files"], serde_json::json!([]));
    }
}
