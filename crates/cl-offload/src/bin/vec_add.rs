// 2025 Thomas Bicanic – MIT License
//
// Vektoraddition c = a + b auf der ersten GPU, mit Prüfsumme.

use std::process::ExitCode;

use clap::Parser;
use cl_offload::{config::parse_problem_size, live_buffers, logging, pipeline, ClSession, OffloadError, VEC_ADD};
use tracing::{debug, warn};

/// Add two f64 vectors of length N on the first OpenCL GPU and check the sum
#[derive(Parser)]
#[command(name = "vec_add", version)]
struct Cli {
    /// Problem size N
    #[arg(value_name = "N", allow_negative_numbers = true)]
    n: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn run(cli: &Cli) -> Result<(), OffloadError> {
    let n = parse_problem_size(cli.n.as_deref())?;

    let session = ClSession::open(&VEC_ADD)?;
    debug!(
        platform = session.platform_name(),
        device = session.device_name(),
        kernel = session.kernel_name(),
        n,
        "running vec_add"
    );
    let report = pipeline::run(&session, n)?;

    println!("{report}");
    if !report.matches() {
        warn!(expected = report.expected, computed = report.computed, "checksum mismatch");
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = run(&cli);

    #[cfg(feature = "metrics")]
    cl_offload::summary();
    debug!(live = live_buffers(), "device buffers still alive");

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
