//! Execution dispatcher
//!
//! Drives a [`Session`] through its lifecycle:
//!
//! ```text
//! Idle -> AwaitingInput <-> Ready -> Running -> Succeeded | Failed
//! ```
//!
//! Staging, option and surface calls return errors directly and never move
//! the session into `Failed`; only the transform itself (and exporting the
//! surface composite) can fail a run. The session lock is released before
//! any provider or surface future is awaited, so a second `run` on the same
//! session sees `Running` and is rejected.

use crate::catalog::{Catalog, FileKind, OperationDescriptor};
use crate::config::PipelineConfig;
use crate::error::{ErrorKind, PipelineError};
use crate::intake::{FileSet, IncomingFile, InputValidator, KindWarning, StagedFile};
use crate::options::{OptionCollector, OptionValues, RawOptions};
use crate::packager::{Artifact, ResultPackager};
use crate::provider::{ProviderError, ProviderErrorKind};
use crate::session::{LifecycleState, Session, SessionInner};
use crate::surface::{AnnotationSurface, SurfaceError, SurfaceHandle};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Result of a run that reached the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Success(Vec<Artifact>),
    Failure(RunFailure),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn artifacts(&self) -> &[Artifact] {
        match self {
            Self::Success(artifacts) => artifacts,
            Self::Failure(_) => &[],
        }
    }

    pub fn failure(&self) -> Option<&RunFailure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }
}

/// Why a run failed, in user-facing terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunFailure {
    pub kind: ErrorKind,
    pub message: String,
    /// The input could not be read at all; acknowledging drops the files.
    pub clears_input: bool,
}

impl RunFailure {
    fn transform(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::ProviderTransformFailure,
            message: message.into(),
            clears_input: false,
        }
    }
}

impl From<ProviderError> for RunFailure {
    fn from(err: ProviderError) -> Self {
        Self {
            kind: ErrorKind::ProviderTransformFailure,
            clears_input: err.kind == ProviderErrorKind::UnreadableInput,
            message: err.detail,
        }
    }
}

impl From<SurfaceError> for RunFailure {
    fn from(err: SurfaceError) -> Self {
        Self::transform(err.to_string())
    }
}

/// Fails a `Running` session whose `run` future is dropped before the
/// provider settles.
struct RunGuard<'a> {
    session: &'a Session,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.session.lock();
        if inner.state != LifecycleState::Running {
            return;
        }
        warn!(session = %self.session.id(), "Run cancelled before the provider finished");
        inner.state = LifecycleState::Failed;
        inner.last_failure = Some(RunFailure::transform("Run was cancelled"));
    }
}

/// What `stage_files` accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub accepted: usize,
    pub warnings: Vec<KindWarning>,
}

/// Stateless driver shared by every session.
pub struct Dispatcher {
    catalog: Arc<Catalog>,
    validator: InputValidator,
    collector: OptionCollector,
    packager: ResultPackager,
    surface: Option<Arc<dyn AnnotationSurface>>,
}

impl Dispatcher {
    pub fn new(catalog: Catalog, config: &PipelineConfig) -> Self {
        Self {
            catalog: Arc::new(catalog),
            validator: InputValidator::new(&config.intake),
            collector: OptionCollector::new(config.options.clone()),
            packager: ResultPackager::new(&config.packaging),
            surface: None,
        }
    }

    /// Attach the host's annotation surface. Without one, surface
    /// operations can be selected but never become ready.
    pub fn with_surface(mut self, surface: Arc<dyn AnnotationSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn collector(&self) -> &OptionCollector {
        &self.collector
    }

    /// Start a fresh flow for `operation_id`. Whatever the session held
    /// before is discarded.
    pub fn select(&self, session: &Session, operation_id: &str) -> Result<(), PipelineError> {
        let descriptor = self.catalog.lookup(operation_id)?;
        if descriptor.is_coming_soon() {
            return Err(PipelineError::UnsupportedOperation(descriptor.id));
        }

        let mut inner = session.lock();
        if inner.state == LifecycleState::Running {
            return Err(PipelineError::AlreadyRunning);
        }
        inner.reset();
        inner.operation = Some(Arc::clone(&descriptor));
        self.seed_options(&mut inner);
        inner.state = LifecycleState::AwaitingInput;
        inner.refresh_readiness();

        info!(session = %session.id(), operation = %descriptor.id, state = %inner.state, "Operation selected");
        Ok(())
    }

    /// Validate and append files. Nothing is staged when validation fails.
    pub fn stage_files(
        &self,
        session: &Session,
        files: Vec<IncomingFile>,
    ) -> Result<StageReport, PipelineError> {
        let mut inner = session.lock();
        let descriptor = self.editable(&mut inner)?;
        let validated = self.validator.validate(&descriptor, &inner.files, files)?;

        let accepted = validated.accepted.len();
        inner.files.extend(validated.accepted);
        inner.refresh_readiness();

        debug!(
            session = %session.id(),
            accepted,
            staged = inner.files.len(),
            state = %inner.state,
            "Files staged"
        );
        Ok(StageReport {
            accepted,
            warnings: validated.warnings,
        })
    }

    /// Drop one staged file. Removing the file a surface was loaded from
    /// also drops the surface.
    pub fn remove_file(&self, session: &Session, index: usize) -> Result<StagedFile, PipelineError> {
        let mut inner = session.lock();
        let descriptor = self.editable(&mut inner)?;
        let len = inner.files.len();
        let removed = inner
            .files
            .remove(index)
            .ok_or(PipelineError::FileIndex { index, len })?;
        if descriptor.requires_surface && index == 0 {
            inner.surface = None;
        }
        inner.refresh_readiness();
        debug!(session = %session.id(), file = %removed.name, "File removed");
        Ok(removed)
    }

    /// Reorder staged files. `order` must be a permutation of the current
    /// indices; `order[i]` is the index of the file that moves to slot `i`.
    pub fn reorder_files(&self, session: &Session, order: &[usize]) -> Result<(), PipelineError> {
        let mut inner = session.lock();
        let descriptor = self.editable(&mut inner)?;
        let len = inner.files.len();

        if order.len() != len {
            return Err(PipelineError::InvalidOrder(format!(
                "expected {} indices, got {}",
                len,
                order.len()
            )));
        }
        let mut seen = HashSet::with_capacity(len);
        for &index in order {
            if index >= len {
                return Err(PipelineError::InvalidOrder(format!(
                    "index {} out of bounds ({} files staged)",
                    index, len
                )));
            }
            if !seen.insert(index) {
                return Err(PipelineError::InvalidOrder(format!("duplicate index {}", index)));
            }
        }

        if descriptor.requires_surface && order.first().is_some_and(|&first| first != 0) {
            inner.surface = None;
        }
        inner.files.reorder(order);
        inner.refresh_readiness();
        Ok(())
    }

    /// Replace the raw option values and validate them. On error the session
    /// keeps the raw values but has no collected options, so it cannot be
    /// ready until they are fixed.
    pub fn set_options(&self, session: &Session, raw: RawOptions) -> Result<(), PipelineError> {
        let mut inner = session.lock();
        let descriptor = self.editable(&mut inner)?;
        inner.raw_options = raw;

        let result = match descriptor.options {
            Some(schema) => self
                .collector
                .collect(schema, &inner.raw_options)
                .map(Some),
            None => Ok(Some(OptionValues::None)),
        };
        let result = match result {
            Ok(values) => {
                inner.options = values;
                Ok(())
            }
            Err(e) => {
                inner.options = None;
                Err(PipelineError::from(e))
            }
        };
        inner.refresh_readiness();
        result
    }

    /// Load the first staged file as the annotation surface background.
    pub async fn load_surface(&self, session: &Session) -> Result<(), PipelineError> {
        let surface = self.surface.clone().ok_or(PipelineError::NoSurface)?;
        let (loading, document) = {
            let mut inner = session.lock();
            let descriptor = self.editable(&mut inner)?;
            if !descriptor.requires_surface {
                return Err(PipelineError::SurfaceNotUsed(descriptor.id));
            }
            let first = inner.files.first().ok_or(PipelineError::NoFiles)?;
            (descriptor, first.content.clone())
        };

        let handle = surface.load_background(document.clone()).await?;

        let mut inner = session.lock();
        let descriptor = self.editable(&mut inner)?;
        let same_source = inner
            .files
            .first()
            .is_some_and(|first| first.content == document);
        if !Arc::ptr_eq(&descriptor, &loading) || !same_source {
            warn!(session = %session.id(), ?handle, "Discarding surface loaded from stale input");
            return Err(PipelineError::SurfaceStale);
        }
        inner.surface = Some(handle);
        inner.refresh_readiness();
        debug!(session = %session.id(), ?handle, "Surface loaded");
        Ok(())
    }

    /// Run the selected operation.
    ///
    /// Returns `Err` only when the session cannot run at all. Once the
    /// provider has been reached the answer is an [`ExecutionOutcome`], and
    /// the session ends in `Succeeded` or `Failed`. Dropping the future
    /// before the provider finishes leaves the session `Failed` with its
    /// files kept.
    #[instrument(
        skip(self, session),
        fields(session = %session.id(), operation = tracing::field::Empty)
    )]
    pub async fn run(&self, session: &Session) -> Result<ExecutionOutcome, PipelineError> {
        let (descriptor, files, options, surface_handle) = {
            let mut inner = session.lock();
            match inner.state {
                LifecycleState::Running => return Err(PipelineError::AlreadyRunning),
                LifecycleState::Ready => {}
                other => return Err(PipelineError::NotReady(other)),
            }
            let descriptor = inner.operation.clone().ok_or(PipelineError::NoOperation)?;
            inner.state = LifecycleState::Running;
            inner.last_failure = None;
            (
                descriptor,
                inner.files.clone(),
                inner.options.clone().unwrap_or(OptionValues::None),
                inner.surface,
            )
        };
        tracing::Span::current().record("operation", descriptor.id.as_str());
        info!(files = files.len(), bytes = files.total_bytes(), "Run started");

        let started = Instant::now();
        let guard = RunGuard { session };
        let result = self.execute(&descriptor, files, &options, surface_handle).await;
        std::mem::forget(guard);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let mut inner = session.lock();
        let outcome = match result {
            Ok(artifacts) => {
                info!(
                    artifacts = artifacts.len(),
                    bytes = artifacts.iter().map(Artifact::len).sum::<usize>(),
                    elapsed_ms,
                    "Run succeeded"
                );
                inner.state = LifecycleState::Succeeded;
                ExecutionOutcome::Success(artifacts)
            }
            Err(failure) => {
                error!(
                    kind = ?failure.kind,
                    clears_input = failure.clears_input,
                    elapsed_ms,
                    "Run failed: {}",
                    failure.message
                );
                inner.state = LifecycleState::Failed;
                inner.last_failure = Some(failure.clone());
                ExecutionOutcome::Failure(failure)
            }
        };
        Ok(outcome)
    }

    async fn execute(
        &self,
        descriptor: &OperationDescriptor,
        files: FileSet,
        options: &OptionValues,
        surface_handle: Option<SurfaceHandle>,
    ) -> Result<Vec<Artifact>, RunFailure> {
        let provider = descriptor
            .provider
            .as_ref()
            .ok_or_else(|| RunFailure::transform(format!("{} has no provider", descriptor.id)))?;

        let files = if descriptor.requires_surface {
            self.composite_input(&files, surface_handle).await?
        } else {
            files
        };

        debug!(provider = provider.name(), "Invoking provider");
        let raw = provider.invoke(&files, options).await?;
        let artifacts = self
            .packager
            .package(raw)
            .map_err(|e| RunFailure::transform(e.to_string()))?;
        if artifacts.is_empty() {
            return Err(RunFailure::transform(format!(
                "{} produced no output",
                provider.name()
            )));
        }
        Ok(artifacts)
    }

    /// Replace the staged document with the exported surface composite.
    async fn composite_input(
        &self,
        files: &FileSet,
        handle: Option<SurfaceHandle>,
    ) -> Result<FileSet, RunFailure> {
        let surface = self
            .surface
            .as_ref()
            .ok_or_else(|| RunFailure::transform("No annotation surface configured"))?;
        let handle = handle.ok_or_else(|| RunFailure::transform("Surface not loaded"))?;

        let (content, mime_type) = surface.export_composite(handle).await?.into_bytes()?;
        if !FileKind::Image.matches("", Some(mime_type.as_str())) {
            warn!(%mime_type, "Surface exported a composite that is not an image type");
        }
        let stem = files
            .first()
            .and_then(|f| f.name.rsplit_once('.').map(|(stem, _)| stem.to_string()))
            .unwrap_or_else(|| "composite".to_string());
        let composite = IncomingFile::new(format!("{}_edited.png", stem), content).with_mime(mime_type);
        Ok(vec![composite].into())
    }

    /// Leave a finished run. After a failure the files stay (unless they
    /// could not be read); after a success the session starts over with the
    /// same operation.
    pub fn acknowledge(&self, session: &Session) -> Result<(), PipelineError> {
        let mut inner = session.lock();
        self.acknowledge_locked(&mut inner)?;
        info!(session = %session.id(), state = %inner.state, "Run acknowledged");
        Ok(())
    }

    /// Deselect the operation and clear everything.
    pub fn close(&self, session: &Session) -> Result<(), PipelineError> {
        let mut inner = session.lock();
        if inner.state == LifecycleState::Running {
            return Err(PipelineError::AlreadyRunning);
        }
        inner.reset();
        info!(session = %session.id(), "Session closed");
        Ok(())
    }

    fn acknowledge_locked(&self, inner: &mut SessionInner) -> Result<(), PipelineError> {
        match inner.state {
            LifecycleState::Running => return Err(PipelineError::AlreadyRunning),
            LifecycleState::Failed => {
                let clears_input = inner
                    .last_failure
                    .as_ref()
                    .is_some_and(|failure| failure.clears_input);
                if clears_input {
                    inner.files.clear();
                    inner.surface = None;
                }
            }
            LifecycleState::Succeeded => {
                inner.files.clear();
                inner.surface = None;
                self.seed_options(inner);
            }
            LifecycleState::Idle | LifecycleState::AwaitingInput | LifecycleState::Ready => {
                return Ok(())
            }
        }
        inner.last_failure = None;
        inner.state = LifecycleState::AwaitingInput;
        inner.refresh_readiness();
        Ok(())
    }

    /// Shared prelude of every input mutation: the session must have an
    /// operation and not be running. A finished run is acknowledged first.
    fn editable(&self, inner: &mut SessionInner) -> Result<Arc<OperationDescriptor>, PipelineError> {
        match inner.state {
            LifecycleState::Running => return Err(PipelineError::AlreadyRunning),
            LifecycleState::Idle => return Err(PipelineError::NoOperation),
            LifecycleState::Succeeded | LifecycleState::Failed => self.acknowledge_locked(inner)?,
            LifecycleState::AwaitingInput | LifecycleState::Ready => {}
        }
        inner.operation.clone().ok_or(PipelineError::NoOperation)
    }

    fn seed_options(&self, inner: &mut SessionInner) {
        let Some(schema) = inner.operation.as_ref().and_then(|op| op.options) else {
            inner.raw_options = RawOptions::new();
            inner.options = Some(OptionValues::None);
            return;
        };
        inner.raw_options = self.collector.defaults_for(schema);
        inner.options = self.collector.collect(schema, &inner.raw_options).ok();
    }
}
