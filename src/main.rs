//! foredge – command-line fore-edge pattern generator.
//!
//! Usage:
//!   foredge <image> <output.pdf> --height MM --width MM
//!           (--pages N | --last-page N [--before N] [--after N])
//!           [--start N] [--config file.json] [--session ID] [--keep-slices]
//!           [--preview out.png] [--layout-json out.json]

use std::{env, fs, path::PathBuf, process};

use chrono::Local;

use foredge::compose::plan;
use foredge::geometry::PageGeometry;
use foredge::pipeline::{generate, Job, PipelineConfig, Workspace};
use foredge::preview::{write_preview, DEFAULT_PREVIEW_EDGE_PX};
use foredge::progress::LogProgress;
use foredge::validate::PageCount;

#[derive(Default)]
struct Args {
    image: Option<PathBuf>,
    output: Option<PathBuf>,
    height_mm: Option<f32>,
    width_mm: Option<f32>,
    pages: Option<u32>,
    last_page: Option<u32>,
    before: u32,
    after: u32,
    start: i64,
    config: Option<PathBuf>,
    session: Option<String>,
    keep_slices: bool,
    preview: Option<PathBuf>,
    layout_json: Option<PathBuf>,
}

fn fail(prog: &str, msg: &str) -> ! {
    eprintln!("Error: {msg}");
    print_usage(prog);
    process::exit(1);
}

/// Value following `flag`, parsed as `T`.
fn value<T: std::str::FromStr>(
    prog: &str,
    flag: &str,
    iter: &mut impl Iterator<Item = String>,
) -> T {
    match iter.next().map(|v| v.parse::<T>()) {
        Some(Ok(v)) => v,
        Some(Err(_)) => fail(prog, &format!("invalid value for {flag}")),
        None => fail(prog, &format!("{flag} needs a value")),
    }
}

fn parse_args(prog: &str, raw: Vec<String>) -> Args {
    let mut args = Args {
        start: 1,
        ..Args::default()
    };
    let mut positional = 0usize;

    let mut iter = raw.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--height" => args.height_mm = Some(value(prog, &arg, &mut iter)),
            "--width" => args.width_mm = Some(value(prog, &arg, &mut iter)),
            "--pages" => args.pages = Some(value(prog, &arg, &mut iter)),
            "--last-page" => args.last_page = Some(value(prog, &arg, &mut iter)),
            "--before" => args.before = value(prog, &arg, &mut iter),
            "--after" => args.after = value(prog, &arg, &mut iter),
            "--start" => args.start = value(prog, &arg, &mut iter),
            "--config" => args.config = Some(value(prog, &arg, &mut iter)),
            "--session" => args.session = Some(value(prog, &arg, &mut iter)),
            "--preview" => args.preview = Some(value(prog, &arg, &mut iter)),
            "--layout-json" => args.layout_json = Some(value(prog, &arg, &mut iter)),
            "--keep-slices" => args.keep_slices = true,
            "--help" | "-h" => {
                print_usage(prog);
                process::exit(0);
            }
            other if other.starts_with('-') => fail(prog, &format!("unknown flag: {other}")),
            path => {
                match positional {
                    0 => args.image = Some(PathBuf::from(path)),
                    1 => args.output = Some(PathBuf::from(path)),
                    _ => fail(prog, &format!("unexpected argument: {path}")),
                }
                positional += 1;
            }
        }
    }
    args
}

fn main() {
    env_logger::init();

    let mut raw = env::args();
    let prog = raw.next().unwrap_or_else(|| "foredge".to_string());
    let args = parse_args(&prog, raw.collect());

    let Some(image) = args.image else {
        fail(&prog, "no source image specified.")
    };
    let Some(output) = args.output else {
        fail(&prog, "no output PDF specified.")
    };
    let (Some(height_mm), Some(width_mm)) = (args.height_mm, args.width_mm) else {
        fail(&prog, "--height and --width are required.")
    };
    let pages = match (args.pages, args.last_page) {
        (Some(n), None) => PageCount::Direct(n),
        (None, Some(last)) => PageCount::Derived {
            last_numbered: last,
            sheets_before: args.before,
            sheets_after: args.after,
        },
        _ => fail(&prog, "give exactly one of --pages or --last-page."),
    };

    let config = match &args.config {
        Some(path) => match PipelineConfig::from_json_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error reading '{}': {e}", path.display());
                process::exit(1);
            }
        },
        None => PipelineConfig::default(),
    };

    // Default session id: timestamp + pid, unique per invocation.
    let session = args.session.unwrap_or_else(|| {
        format!(
            "{}_{}",
            Local::now().format("%Y%m%d%H%M%S"),
            process::id()
        )
    });

    let job = Job {
        source_image: image,
        output,
        height_mm,
        slice_width_mm: width_mm,
        pages,
        start_number: args.start,
        created_on: Local::now().date_naive(),
    };

    if let Some(preview) = &args.preview {
        match write_preview(&job.source_image, preview, DEFAULT_PREVIEW_EDGE_PX) {
            Ok((w, h)) => eprintln!("Wrote preview '{}' ({w}x{h} px)", preview.display()),
            Err(e) => {
                eprintln!("Error writing preview: {e}");
                process::exit(1);
            }
        }
    }

    let workspace = match Workspace::create(&config.work_root, &session) {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("Error creating workspace: {e}");
            process::exit(1);
        }
    };

    let result = generate(&job, &config, &workspace, &LogProgress);
    let output = match result {
        Ok(output) => output,
        Err(e) => {
            eprintln!("Error generating PDF: {e}");
            // Exit skips Drop, so clean up first.
            drop(workspace);
            process::exit(1);
        }
    };

    if let Some(json_path) = &args.layout_json {
        let request = job.compose_request(&config, &output.slice_dir);
        let written = plan(&request, &PageGeometry::a4())
            .and_then(|layout| layout.to_json())
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(json_path, json).map_err(|e| e.to_string()));
        if let Err(e) = written {
            eprintln!("Error writing layout '{}': {e}", json_path.display());
            drop(workspace);
            process::exit(1);
        }
    }

    let pages = output.total_pages;
    eprintln!(
        "Wrote '{}' ({} slices, {} page{})",
        output.document.display(),
        output.slice_count,
        pages,
        if pages == 1 { "" } else { "s" }
    );

    if args.keep_slices {
        let kept = workspace.keep();
        eprintln!("Slices kept in '{}'", kept.display());
    }
}

fn print_usage(prog: &str) {
    eprintln!("foredge – fore-edge pattern generator");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <image> <output.pdf> --height MM --width MM (--pages N | --last-page N) [flags]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <image>         Source picture (png, jpg, jpeg, gif or bmp)");
    eprintln!("  <output.pdf>    Where the pattern is written");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --height MM     Book block height in millimetres");
    eprintln!("  --width MM      Width each slice is printed at");
    eprintln!("  --pages N       Total numbered pages in the book");
    eprintln!("  --last-page N   Last numbered page; use with --before / --after");
    eprintln!("  --before N      Blank sheets before page 1 (default: 0)");
    eprintln!("  --after N       Blank sheets after the last page (default: 0)");
    eprintln!("  --start N       First printed slice number (default: 1)");
    eprintln!("  --config FILE   JSON pipeline config (title, author, watermark, work_root)");
    eprintln!("  --session ID    Workspace session id (default: timestamp + pid)");
    eprintln!("  --keep-slices   Leave the slice images on disk");
    eprintln!("  --preview FILE  Also write a PNG preview of the source");
    eprintln!("  --layout-json FILE  Also write the page layout plan as JSON");
    eprintln!("  --help          Print this message");
}
