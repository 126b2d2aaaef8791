#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for pic-extract.
//!
//! `pic_extract run --input rows.xlsx --output images/` runs the pipeline
//! non-interactively. With no subcommand the user is prompted for the
//! spreadsheet and the output folder instead.
//!
//! Uses `indicatif-log-bridge` (via [`pic_extract_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and the progress bar never fight for the terminal.

mod interactive;
mod run;

use clap::{Parser, Subcommand};

use crate::run::RunArgs;

#[derive(Parser)]
#[command(
    name = "pic_extract",
    about = "Download the first .jpg of every page listed in a spreadsheet"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a spreadsheet of (URL, filename, date) rows
    Run(RunArgs),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let request = match cli.command {
        Some(Commands::Run(args)) => args.into_request(),
        None => interactive::prompt(),
    }
    .unwrap_or_else(|e| fail(&*e));

    let multi = pic_extract_cli_utils::init_logger(request.log_file.as_deref())?;

    if let Err(e) = run::execute(&multi, &request).await {
        fail(&*e);
    }

    Ok(())
}

fn fail(error: &dyn std::error::Error) -> ! {
    eprintln!("An error occurred: {error}");
    std::process::exit(1);
}
