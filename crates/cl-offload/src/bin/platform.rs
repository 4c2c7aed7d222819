// 2025 Thomas Bicanic – MIT License
//
// Zählt OpenCL-Plattformen und die GPUs der ersten Plattform.

use std::process::ExitCode;

use clap::Parser;
use cl_offload::{logging, survey};

/// Report how many OpenCL platforms and GPU devices this host has
#[derive(Parser)]
#[command(name = "platform", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match survey() {
        Ok(inventory) => {
            println!("{inventory}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
