//! Document transforms for the pdfdesk toolbar
//!
//! Synchronous byte-in, byte-out operations built on lopdf: page-level
//! edits (merge, split, rotate, watermark, compress) and format conversions
//! (images, Word documents and HTML markup to PDF, PDF to text, rendered
//! pages to a slide deck). Everything here is CPU-bound; callers that live
//! on an async runtime should move the work onto a blocking thread.

pub mod archive;
pub mod compress;
pub mod docx;
pub mod error;
pub mod images;
pub mod layout;
pub mod markup;
pub mod merge;
mod page;
pub mod ranges;
pub mod rotate;
pub mod slides;
pub mod split;
pub mod text;
pub mod watermark;

pub use archive::bundle;
pub use compress::{recompress, CompressionReport};
pub use docx::docx_paragraphs;
pub use error::PdfDeskError;
pub use images::{encode_jpeg, encode_png, images_to_pdf};
pub use layout::{layout_text, PageLayout};
pub use markup::markup_paragraphs;
pub use merge::merge_documents;
pub use ranges::{PageSelection, PageToken};
pub use rotate::rotate_pages;
pub use slides::{build_slide_deck, SlideImage};
pub use split::extract_pages;
pub use text::extract_text;
pub use watermark::{watermark, WatermarkStyle};
