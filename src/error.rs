//! Error type shared by every pipeline stage.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForeEdgeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Could not load image '{}': {source}", path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Source column for slice {index} is {width} px wide; the image is too narrow for this many slices")]
    EmptyColumn { index: usize, width: i64 },

    #[error("Could not save slice {index}: {source}")]
    SliceWrite {
        index: usize,
        #[source]
        source: image::ImageError,
    },

    #[error("No PNG slices found in '{}'", .0.display())]
    NoSlicesFound(PathBuf),

    #[error(
        "Book height ({required_mm:.2} mm) does not fit on the page; \
         available content height is {available_mm:.2} mm"
    )]
    GeometryTooLarge { required_mm: f32, available_mm: f32 },

    #[error("Could not draw cover preview: {0}")]
    PreviewRender(String),

    #[error("Could not draw slice '{file}': {reason}")]
    SliceRender { file: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

pub type Result<T> = std::result::Result<T, ForeEdgeError>;
