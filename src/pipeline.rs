//! Pipeline – ties together validation, slicing, layout and rendering into a
//! single function call.

use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::compose::compose;
use crate::error::{ForeEdgeError, Result};
use crate::geometry::{PageGeometry, DEFAULT_DPI, NUMBER_STEP};
use crate::layout::{ComposeRequest, DEFAULT_AUTHOR, DEFAULT_WATERMARK};
use crate::pagination::Grid;
use crate::progress::Progress;
use crate::slicer::{slice_image, SliceRequest};
use crate::validate::{check_dimensions, check_session_id, check_source_name, PageCount};

/// Configuration for the fore-edge pipeline.
///
/// Resolution and numbering step are fixed at [`DEFAULT_DPI`] and
/// [`NUMBER_STEP`]; unknown fields in a config file are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Document title embedded in the PDF metadata.
    pub title: String,
    /// Name in the cover title line.
    pub author: String,
    /// Printed after every slice number.
    pub watermark: String,
    /// Directory that session workspaces are created under.
    pub work_root: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            title: "Fore-edge pattern".to_string(),
            author: DEFAULT_AUTHOR.to_string(),
            watermark: DEFAULT_WATERMARK.to_string(),
            work_root: std::env::temp_dir().join("foredge"),
        }
    }
}

impl PipelineConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.work_root.as_os_str().is_empty() {
            return Err(ForeEdgeError::InvalidInput(
                "work_root must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// A per-request working directory, `<work_root>/session_<id>/`.
///
/// The directory and everything in it is removed when the workspace is
/// dropped, whatever the outcome of the job, unless [`Workspace::keep`] was
/// called.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    keep: bool,
}

impl Workspace {
    /// Create a fresh workspace. Fails if the session directory already
    /// exists, so two requests can never share one.
    pub fn create(work_root: &Path, session_id: &str) -> Result<Self> {
        check_session_id(session_id)?;
        let root = work_root.join(format!("session_{session_id}"));
        if root.exists() {
            return Err(ForeEdgeError::InvalidInput(format!(
                "workspace '{}' already exists",
                root.display()
            )));
        }
        fs::create_dir_all(&root)?;
        log::debug!("Created workspace '{}'", root.display());
        Ok(Self { root, keep: false })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Where the slicer writes its files.
    pub fn slices_dir(&self) -> PathBuf {
        self.root.join("slices")
    }

    /// Leave the directory on disk and return its path.
    pub fn keep(mut self) -> PathBuf {
        self.keep = true;
        self.root.clone()
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match fs::remove_dir_all(&self.root) {
            Ok(()) => log::debug!("Removed workspace '{}'", self.root.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Could not remove workspace '{}': {e}", self.root.display()),
        }
    }
}

/// One source image to turn into a pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub source_image: PathBuf,
    pub output: PathBuf,
    pub height_mm: f32,
    pub slice_width_mm: f32,
    pub pages: PageCount,
    pub start_number: i64,
    /// Printed on the cover.
    pub created_on: NaiveDate,
}

impl Job {
    pub fn slice_request(&self) -> SliceRequest {
        SliceRequest {
            height_mm: self.height_mm,
            page_count: self.pages.total(),
            dpi: DEFAULT_DPI,
            slice_width_mm: self.slice_width_mm,
        }
    }

    pub fn compose_request(&self, config: &PipelineConfig, slice_dir: &Path) -> ComposeRequest {
        ComposeRequest {
            slice_dir: slice_dir.to_path_buf(),
            height_mm: self.height_mm,
            slice_width_mm: self.slice_width_mm,
            start_number: self.start_number,
            step: NUMBER_STEP,
            source_image: self.source_image.clone(),
            original_page_count: self.pages.total(),
            output: self.output.clone(),
            title: config.title.clone(),
            author: config.author.clone(),
            watermark: config.watermark.clone(),
            created_on: self.created_on,
        }
    }

    /// Input checks that need no file access.
    pub fn validate(&self, config: &PipelineConfig) -> Result<()> {
        check_source_name(&self.source_image)?;
        check_dimensions(self.height_mm, self.pages.total(), self.slice_width_mm)?;
        config.validate()
    }
}

/// What a successful job produced.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutput {
    pub document: PathBuf,
    pub slice_dir: PathBuf,
    pub slice_count: usize,
    pub total_pages: usize,
}

/// Full pipeline: source image → slices in `workspace` → PDF at `job.output`.
///
/// Panics raised while processing are caught, logged and returned as
/// [`ForeEdgeError::Unexpected`]. The caller owns cleanup of the workspace and
/// of a partially written output file.
pub fn generate(
    job: &Job,
    config: &PipelineConfig,
    workspace: &Workspace,
    progress: &dyn Progress,
) -> Result<JobOutput> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| run(job, config, workspace, progress)));
    match outcome {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("Pipeline panicked: {message}");
            Err(ForeEdgeError::Unexpected(message))
        }
    }
}

fn run(
    job: &Job,
    config: &PipelineConfig,
    workspace: &Workspace,
    progress: &dyn Progress,
) -> Result<JobOutput> {
    job.validate(config)?;
    let geometry = PageGeometry::a4();
    // Refuse a book that cannot be laid out before spending time slicing.
    geometry.check_height(job.height_mm)?;

    let slice_request = job.slice_request();
    let slices = slice_image(
        &job.source_image,
        &slice_request,
        &workspace.slices_dir(),
        progress,
    )?;

    let compose_request = job.compose_request(config, &slices.dir);
    let document = compose(&compose_request, &geometry, progress)?;
    let grid = Grid::new(&geometry, job.slice_width_mm, slices.len())?;

    Ok(JobOutput {
        document,
        slice_dir: slices.dir,
        slice_count: slices.files.len(),
        total_pages: grid.total_pages(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config = PipelineConfig::from_json(r#"{ "author": "Ada" }"#).unwrap();
        assert_eq!(config.author, "Ada");
        assert_eq!(config.watermark, DEFAULT_WATERMARK);
    }

    #[test]
    fn config_cannot_override_fixed_constants() {
        assert!(matches!(
            PipelineConfig::from_json(r#"{ "dpi": 150 }"#),
            Err(ForeEdgeError::Config(_))
        ));
        assert!(matches!(
            PipelineConfig::from_json(r#"{ "number_step": -2 }"#),
            Err(ForeEdgeError::Config(_))
        ));
        assert!(PipelineConfig::from_json(r#"{ "work_root": "" }"#).is_err());
        assert!(matches!(
            PipelineConfig::from_json("{ not json"),
            Err(ForeEdgeError::Config(_))
        ));
    }

    #[test]
    fn job_uses_fixed_resolution_and_step() {
        let job = Job {
            source_image: PathBuf::from("cover.png"),
            output: PathBuf::from("out.pdf"),
            height_mm: 200.0,
            slice_width_mm: 5.0,
            pages: PageCount::Direct(40),
            start_number: 1,
            created_on: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        };
        assert_eq!(job.slice_request().dpi, 300);
        let request = job.compose_request(&PipelineConfig::default(), Path::new("slices"));
        assert_eq!(request.step, 2);
    }

    #[test]
    fn workspace_is_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let ws = Workspace::create(root.path(), "abc123").unwrap();
            fs::create_dir_all(ws.slices_dir()).unwrap();
            fs::write(ws.slices_dir().join("slice_00001.png"), b"x").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn kept_workspace_survives() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::create(root.path(), "keep-me").unwrap();
        let path = ws.keep();
        assert!(path.is_dir());
        assert!(path.ends_with("session_keep-me"));
    }

    #[test]
    fn sessions_are_not_shared() {
        let root = tempfile::tempdir().unwrap();
        let _first = Workspace::create(root.path(), "same").unwrap();
        assert!(Workspace::create(root.path(), "same").is_err());
        assert!(Workspace::create(root.path(), "../escape").is_err());
    }

    #[test]
    fn invalid_job_fails_before_touching_files() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::create(root.path(), "s1").unwrap();
        let job = Job {
            source_image: root.path().join("cover.tiff"),
            output: root.path().join("out.pdf"),
            height_mm: 200.0,
            slice_width_mm: 5.0,
            pages: PageCount::Direct(40),
            start_number: 1,
            created_on: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        };
        let result = generate(&job, &PipelineConfig::default(), &ws, &crate::progress::NoProgress);
        assert!(matches!(result, Err(ForeEdgeError::InvalidInput(_))));
        assert!(!ws.slices_dir().exists());
    }
}
