//! Operation registry and execution pipeline for the pdfdesk toolbar
//!
//! The toolbar offers a fixed [`Catalog`] of document operations. A host
//! creates a [`Session`] per user flow and drives it through the
//! [`Dispatcher`]: select an operation, stage files, fill in options, run,
//! then hand the resulting [`Artifact`]s to the user.
//!
//! ```no_run
//! use pdfdesk_pipeline::{Backends, Catalog, Dispatcher, IncomingFile, PipelineConfig, Session};
//!
//! # async fn example(a: Vec<u8>, b: Vec<u8>) -> anyhow::Result<()> {
//! let config = PipelineConfig::default();
//! let dispatcher = Dispatcher::new(Catalog::standard(&config, Backends::default())?, &config);
//!
//! let session = Session::new();
//! dispatcher.select(&session, "merge-pdf")?;
//! dispatcher.stage_files(&session, vec![IncomingFile::new("a.pdf", a), IncomingFile::new("b.pdf", b)])?;
//! let outcome = dispatcher.run(&session).await?;
//! for artifact in outcome.artifacts() {
//!     println!("{} ({} bytes)", artifact.file_name(), artifact.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod intake;
pub mod options;
pub mod packager;
pub mod provider;
pub mod providers;
pub mod raster;
pub mod session;
pub mod surface;

pub use catalog::{
    Backends, Catalog, CatalogBuilder, CatalogError, FileKind, OperationDescriptor, OperationId,
    OperationSummary, UnknownOperation,
};
pub use config::PipelineConfig;
pub use dispatcher::{Dispatcher, ExecutionOutcome, RunFailure, StageReport};
pub use error::{ErrorKind, PipelineError};
pub use intake::{FileSet, IncomingFile, InputValidator, IntakeError, StagedFile};
pub use options::{OptionCollector, OptionError, OptionSchemaId, OptionValues, RawOptions};
pub use packager::{Artifact, BundlePolicy, ResultPackager};
pub use provider::{BinaryOutput, ProviderError, ProviderErrorKind, RawOutput, TransformProvider};
pub use raster::{PageRasterizer, RasterError};
#[cfg(feature = "pdfium")]
pub use raster::PdfiumRasterizer;
pub use session::{LifecycleState, Session, SessionSnapshot};
pub use surface::{AnnotationSurface, CompositeImage, SurfaceError, SurfaceHandle};
