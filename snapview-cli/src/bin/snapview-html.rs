//! Generate self-contained HTML viewers for Squish XML snapshots.
//!
//! Exit codes: 0 success, 1 usage error or nothing to open, 2 input file
//! not found, 3 generation failed.  With several inputs the highest code
//! wins.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use log::{debug, warn};
use rayon::prelude::*;

use snapview_core::config::SessionConfig;
use snapview_core::errors::SnapViewError;
use snapview_core::html::generate_viewer;

const EXIT_USAGE: u8 = 1;
const EXIT_NOT_FOUND: u8 = 2;
const EXIT_FAILED: u8 = 3;

#[derive(Parser)]
#[command(
    name = "snapview-html",
    version,
    about = "Generate an HTML viewer for Squish XML snapshot files"
)]
struct Args {
    /// Snapshot XML file(s)
    inputs: Vec<PathBuf>,

    /// Output HTML path (only with a single input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory with viewer_template.html, viewer_styles.css and viewer_scripts.js
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Open the generated viewer in the default browser
    #[arg(long)]
    open: bool,

    /// Use the most recently opened snapshot when no input is given
    #[arg(long)]
    last: bool,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn exit_code(err: &SnapViewError) -> u8 {
    match err {
        SnapViewError::FileNotFound(_) => EXIT_NOT_FOUND,
        _ => EXIT_FAILED,
    }
}

fn generate_one(input: &Path, args: &Args) -> Result<PathBuf, SnapViewError> {
    debug!("generating viewer for {}", input.display());
    generate_viewer(input, args.output.as_deref(), args.assets.as_deref())
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(EXIT_USAGE),
            };
        }
    };
    init_logging(args.verbose);

    let mut session = SessionConfig::load();

    let inputs = if !args.inputs.is_empty() {
        args.inputs.clone()
    } else if args.last {
        match session.last_file() {
            Some(path) => vec![path.to_path_buf()],
            None => {
                eprintln!("Error: no previously opened snapshot recorded");
                return ExitCode::from(EXIT_USAGE);
            }
        }
    } else {
        eprintln!("Usage: snapview-html <file.xml>... [--output FILE] [--assets DIR] [--open]");
        return ExitCode::from(EXIT_USAGE);
    };

    if args.output.is_some() && inputs.len() > 1 {
        eprintln!("Error: --output needs exactly one input file");
        return ExitCode::from(EXIT_USAGE);
    }

    let results: Vec<(PathBuf, Result<PathBuf, SnapViewError>)> = inputs
        .par_iter()
        .map(|input| (input.clone(), generate_one(input, &args)))
        .collect();

    let mut code = 0u8;
    for (input, result) in results {
        match result {
            Ok(output) => {
                println!("Viewer written to: {}", output.display());
                session.record_open(&input);
                if args.open {
                    if let Err(e) = open::that(&output) {
                        warn!("could not open {} in a browser: {e}", output.display());
                    }
                }
            }
            Err(err) => {
                eprintln!("Error: {err}");
                code = code.max(exit_code(&err));
            }
        }
    }

    if let Err(e) = session.save() {
        warn!("session config not saved: {e}");
    }

    ExitCode::from(code)
}
