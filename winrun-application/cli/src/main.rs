//! winrun: `winrun <host> <plain|ssl> <cmd|ps> <command...>`

use std::process::ExitCode;

use anyhow::Result;
use winrun_cli::cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    winrun_cli::main_with(cli::parse_selectable(std::env::args_os())).await
}
