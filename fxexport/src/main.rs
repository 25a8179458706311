use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::exit;

use clap::error::ErrorKind;
use clap::Parser;
use thiserror::Error;
use tracy_trace::{TraceError, Worker};

use fxexport::{build_profile, write_profile};

#[derive(Debug, Parser)]
#[command(
    name = "fxexport",
    about = "Export a Tracy trace to Firefox Profiler JSON format"
)]
struct Opt {
    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to the trace file to export.
    trace_file: PathBuf,
}

#[derive(Debug, Error)]
enum ExportError {
    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error("could not write {0}: {1}")]
    Output(PathBuf, #[source] std::io::Error),
}

fn main() {
    env_logger::init();

    let opt = match Opt::try_parse() {
        Ok(opt) => opt,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            exit(code);
        }
    };

    if let Err(err) = run(&opt) {
        eprintln!("{err}");
        exit(1);
    }
}

fn run(opt: &Opt) -> Result<(), ExportError> {
    let worker = Worker::open(&opt.trace_file)?;
    let trace = worker.wait_until_ready()?;

    let profile = build_profile(trace);

    match &opt.output {
        Some(path) => {
            let file = File::create(path).map_err(|e| ExportError::Output(path.clone(), e))?;
            write_profile(&profile, BufWriter::new(file))
                .map_err(|e| ExportError::Output(path.clone(), e))?;
        }
        None => {
            let stdout = std::io::stdout();
            write_profile(&profile, stdout.lock())
                .map_err(|e| ExportError::Output(PathBuf::from("<stdout>"), e))?;
        }
    }

    Ok(())
}
