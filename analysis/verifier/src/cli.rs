use std::path::PathBuf;

use clap::Parser;

/// Checks a consumption trace written by `demo --trace`
#[derive(Debug, Parser)]
pub struct Args {
    /// Trace CSV file
    pub trace: PathBuf,
}
