//! winrun-ssl: `winrun-ssl <host> <cmd|ps> <command> [arguments...]`
//!
//! 传输固定为 HTTPS 且不校验服务端证书。

use std::process::ExitCode;

use anyhow::Result;
use winrun_cli::cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    winrun_cli::main_with(cli::parse_ssl(std::env::args_os())).await
}
