//! Interactive mode.
//!
//! Asks for the spreadsheet and the output folder, the two things the
//! user has to choose, and runs with default settings otherwise.

use std::path::PathBuf;

use dialoguer::{Confirm, Input};
use pic_extract_models::PipelineConfig;

use crate::run::RunRequest;

/// Prompts for a run request.
pub fn prompt() -> Result<RunRequest, Box<dyn std::error::Error>> {
    println!("pic-extract");
    println!();

    let input: String = Input::new()
        .with_prompt("Spreadsheet (.csv, .xlsx, .xls, .ods)")
        .interact_text()?;
    let input = PathBuf::from(input.trim());
    if !input.is_file() {
        return Err(format!("{} is not a file", input.display()).into());
    }

    let output: String = Input::new()
        .with_prompt("Output folder")
        .default("images".to_string())
        .interact_text()?;

    let caption = Confirm::new()
        .with_prompt("Stamp each row's date onto its image?")
        .default(true)
        .interact()?;

    let log_file: String = Input::new()
        .with_prompt("Log file (empty to log to the terminal)")
        .allow_empty(true)
        .interact_text()?;
    let log_file = Some(log_file.trim())
        .filter(|path| !path.is_empty())
        .map(PathBuf::from);

    Ok(RunRequest {
        input,
        output: PathBuf::from(output.trim()),
        config: PipelineConfig {
            caption,
            ..PipelineConfig::default()
        },
        log_file,
    })
}
