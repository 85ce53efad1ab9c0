//! # foredge – fore-edge pattern generator
//!
//! This crate turns a picture into a printable pattern for fore-edge book
//! art: the image is cut into one thin strip per physical sheet of a book,
//! and the strips are laid out on numbered A4 pages together with a cover
//! page. The pipeline stages are:
//!
//! 1. **Validate** – check the request before any file is touched ([`validate`])
//! 2. **Slice** – resize the source and cut it into strips ([`slicer`])
//! 3. **Paginate** – fit strips into rows across pages ([`pagination`])
//! 4. **Layout** – place cover, strips, labels and ticks ([`layout`])
//! 5. **Render** – emit PDF bytes via printpdf ([`render`])
//!
//! [`pipeline::generate`] runs all of them inside a per-session
//! [`pipeline::Workspace`]. A C-compatible FFI surface is exposed via the
//! [`ffi`] module.

pub mod compose;
pub mod error;
pub mod ffi;
pub mod fonts;
pub mod geometry;
pub mod layout;
pub mod layout_config;
pub mod pagination;
pub mod pipeline;
pub mod preview;
pub mod progress;
pub mod render;
pub mod slicer;
pub mod validate;

// Re-exports for convenience
pub use compose::{compose, plan};
pub use error::{ForeEdgeError, Result};
pub use geometry::PageGeometry;
pub use layout::ComposeRequest;
pub use pipeline::{generate, Job, JobOutput, PipelineConfig, Workspace};
pub use progress::{LogProgress, NoProgress, Progress};
pub use slicer::{slice_image, SliceRequest, SliceSet};
pub use validate::PageCount;
