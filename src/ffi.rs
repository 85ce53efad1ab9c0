//! C-compatible FFI API so the web front end can drive the pipeline.
//!
//! # ABI Contract
//!
//! All exported functions use `extern "C"` calling convention and `#[no_mangle]`
//! to ensure stable symbol names.
//!
//! ## Error handling
//! - Functions that can fail return a `c_int` (0 = success, non-zero = error).
//! - Error details can be retrieved via `foredge_last_error`.
//!
//! ## Thread safety
//! - `foredge_last_error` uses a thread-local, so it is safe to call from
//!   multiple threads. Concurrent jobs must use distinct session ids and
//!   output paths.
//!
//! ## Usage from Python (ctypes)
//! ```text
//! lib = ctypes.CDLL("libforedge.so")
//! job = ForeEdgeJob(b"cover.jpg", b"out.pdf", None, b"session_42",
//!                   200.0, 5.0, 40, 1, 0, 0, 0)
//! if lib.foredge_generate(ctypes.byref(job), ctypes.byref(pages)) != 0:
//!     raise RuntimeError(ctypes.string_at(lib.foredge_last_error()))
//! ```

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::path::PathBuf;
use std::ptr;

use chrono::{Local, NaiveDate};

use crate::pipeline::{generate, Job, PipelineConfig, Workspace};
use crate::preview::write_preview;
use crate::progress::LogProgress;
use crate::validate::{slice_count, PageCount};

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg.replace('\0', " ")).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
}

/// One pipeline job as passed across the C boundary.
///
/// `work_root` may be `NULL` to use the system temporary directory. A
/// `year` of `0` prints today's date on the cover.
#[repr(C)]
pub struct ForeEdgeJob {
    /// Null-terminated UTF-8 path of the source image.
    pub source_image: *const c_char,
    /// Null-terminated UTF-8 path the PDF is written to.
    pub output_pdf: *const c_char,
    /// Directory session workspaces are created in, or `NULL`.
    pub work_root: *const c_char,
    /// Unique id for this request; names the workspace directory.
    pub session_id: *const c_char,
    pub height_mm: f32,
    pub slice_width_mm: f32,
    pub page_count: u32,
    pub start_number: i64,
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// # Safety
/// `p` must be null or point to a valid null-terminated string.
unsafe fn path_arg(p: *const c_char, name: &str) -> Result<PathBuf, String> {
    if p.is_null() {
        return Err(format!("{name} is null"));
    }
    CStr::from_ptr(p)
        .to_str()
        .map(PathBuf::from)
        .map_err(|e| format!("{name} is not valid UTF-8: {e}"))
}

/// # Safety
/// Every non-null string pointer in `job` must be valid and null-terminated.
unsafe fn job_from_c(job: &ForeEdgeJob) -> Result<(Job, PipelineConfig, String), String> {
    let source_image = path_arg(job.source_image, "source_image")?;
    let output = path_arg(job.output_pdf, "output_pdf")?;
    let session_id = path_arg(job.session_id, "session_id")?
        .to_string_lossy()
        .into_owned();

    let mut config = PipelineConfig::default();
    if !job.work_root.is_null() {
        config.work_root = path_arg(job.work_root, "work_root")?;
    }

    let created_on = if job.year == 0 {
        Local::now().date_naive()
    } else {
        NaiveDate::from_ymd_opt(job.year, job.month, job.day)
            .ok_or_else(|| format!("invalid date {}-{}-{}", job.year, job.month, job.day))?
    };

    let job = Job {
        source_image,
        output,
        height_mm: job.height_mm,
        slice_width_mm: job.slice_width_mm,
        pages: PageCount::Direct(job.page_count),
        start_number: job.start_number,
        created_on,
    };
    Ok((job, config, session_id))
}

// ---------------------------------------------------------------------------
// Core API
// ---------------------------------------------------------------------------

/// Run the whole pipeline for `job`.
///
/// The session workspace is removed before returning, whatever the outcome.
/// On success `*out_total_pages` (if non-null) receives the page count of the
/// written PDF.
///
/// # Returns
/// `0` on success, `1` for a null `job`, `2` for unusable arguments, `3` when
/// the pipeline fails. On error, call `foredge_last_error`.
///
/// # Safety
/// - `job` must point to a valid `ForeEdgeJob` whose string fields are valid
///   null-terminated strings (or null where allowed).
/// - `out_total_pages` must be null or a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn foredge_generate(job: *const ForeEdgeJob, out_total_pages: *mut u32) -> c_int {
    clear_last_error();
    if job.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }

    let (job, config, session_id) = match job_from_c(&*job) {
        Ok(parts) => parts,
        Err(e) => {
            set_last_error(&e);
            return 2;
        }
    };

    let workspace = match Workspace::create(&config.work_root, &session_id) {
        Ok(ws) => ws,
        Err(e) => {
            set_last_error(&e.to_string());
            return 2;
        }
    };

    match generate(&job, &config, &workspace, &LogProgress) {
        Ok(output) => {
            if !out_total_pages.is_null() {
                *out_total_pages = output.total_pages as u32;
            }
            0
        }
        Err(e) => {
            set_last_error(&e.to_string());
            3
        }
    }
}

/// Write a PNG preview of `source` to `out`, no edge longer than
/// `max_edge_px`.
///
/// # Safety
/// `source` and `out` must be valid null-terminated UTF-8 strings.
#[no_mangle]
pub unsafe extern "C" fn foredge_write_preview(
    source: *const c_char,
    out: *const c_char,
    max_edge_px: u32,
) -> c_int {
    clear_last_error();
    let (source, out) = match (path_arg(source, "source"), path_arg(out, "out")) {
        (Ok(s), Ok(o)) => (s, o),
        (Err(e), _) | (_, Err(e)) => {
            set_last_error(&e);
            return 1;
        }
    };
    match write_preview(&source, &out, max_edge_px) {
        Ok(_) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            3
        }
    }
}

/// Number of slices (physical sheets) for `page_count` numbered pages.
#[no_mangle]
pub extern "C" fn foredge_slice_count(page_count: u32) -> u32 {
    slice_count(page_count) as u32
}

/// Retrieve the last error message. Returns a null-terminated string.
///
/// The returned pointer is valid until the next `foredge_*` call on the same
/// thread. The caller should **not** free this pointer – it is managed
/// internally.
///
/// Returns null if no error has occurred.
#[no_mangle]
pub extern "C" fn foredge_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        let borrow = e.borrow();
        match borrow.as_ref() {
            Some(cs) => cs.as_ptr(),
            None => ptr::null(),
        }
    })
}

/// Return the library version as a null-terminated string.
/// The caller must **not** free this pointer.
#[no_mangle]
pub extern "C" fn foredge_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn job_for(
        source: &CString,
        output: &CString,
        root: &CString,
        session: &CString,
    ) -> ForeEdgeJob {
        ForeEdgeJob {
            source_image: source.as_ptr(),
            output_pdf: output.as_ptr(),
            work_root: root.as_ptr(),
            session_id: session.as_ptr(),
            height_mm: 40.0,
            slice_width_mm: 5.0,
            page_count: 8,
            start_number: 1,
            year: 2026,
            month: 10,
            day: 19,
        }
    }

    #[test]
    fn ffi_generate_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("cover.png");
        RgbImage::from_fn(40, 60, |x, y| Rgb([x as u8 * 6, y as u8 * 4, 90]))
            .save(&source_path)
            .unwrap();
        let out_path = dir.path().join("out.pdf");

        let source = CString::new(source_path.to_str().unwrap()).unwrap();
        let output = CString::new(out_path.to_str().unwrap()).unwrap();
        let root = CString::new(dir.path().join("work").to_str().unwrap()).unwrap();
        let session = CString::new("ffi1").unwrap();
        let job = job_for(&source, &output, &root, &session);

        let mut pages: u32 = 0;
        let rc = unsafe { foredge_generate(&job, &mut pages) };
        assert_eq!(rc, 0, "Expected success");
        assert_eq!(pages, 2);
        assert!(foredge_last_error().is_null());

        let bytes = std::fs::read(&out_path).unwrap();
        assert_eq!(&bytes[0..5], b"%PDF-");
        // The workspace is cleaned up by the call.
        assert!(!dir.path().join("work").join("session_ffi1").exists());
    }

    #[test]
    fn ffi_reports_pipeline_errors() {
        let dir = tempfile::tempdir().unwrap();
        let source = CString::new(dir.path().join("missing.png").to_str().unwrap()).unwrap();
        let output = CString::new(dir.path().join("out.pdf").to_str().unwrap()).unwrap();
        let root = CString::new(dir.path().to_str().unwrap()).unwrap();
        let session = CString::new("ffi2").unwrap();
        let job = job_for(&source, &output, &root, &session);

        let rc = unsafe { foredge_generate(&job, ptr::null_mut()) };
        assert_eq!(rc, 3);
        let msg = unsafe { CStr::from_ptr(foredge_last_error()) }.to_str().unwrap();
        assert!(msg.contains("missing.png"), "{msg}");
    }

    #[test]
    fn ffi_null_input() {
        let rc = unsafe { foredge_generate(ptr::null(), ptr::null_mut()) };
        assert_ne!(rc, 0, "Should fail on null input");
        assert!(!foredge_last_error().is_null());
    }

    #[test]
    fn ffi_slice_count() {
        assert_eq!(foredge_slice_count(2), 1);
        assert_eq!(foredge_slice_count(41), 21);
    }

    #[test]
    fn ffi_version() {
        let v = foredge_version();
        let version = unsafe { CStr::from_ptr(v) }.to_str().unwrap();
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
    }
}
