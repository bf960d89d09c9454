//! winrun CLI
//!
//! 解析命令行与环境变量，通过 WinRM 在远程 Windows 主机上执行 cmd 或
//! PowerShell 命令，并把结果输出到 stdout。

pub mod cli;
pub mod commands;
pub mod config;

use std::io::Write;
use std::process::ExitCode;

use anyhow::Result;
use tracing::info;
use winrun_winrm_executor::{Credentials, SessionConnector, WinRmConnector};

use crate::cli::ParseOutcome;

/// 参数不足时的退出码
pub const USAGE_EXIT_CODE: u8 = 2;

/// 二进制入口共用的执行流程
pub async fn main_with(parsed: Result<ParseOutcome, clap::Error>) -> Result<ExitCode> {
    let outcome = match parsed {
        Ok(outcome) => outcome,
        Err(e) => e.exit(),
    };

    if let ParseOutcome::Run(command_line) = &outcome {
        config::init_logging(&command_line.log_level);
        info!("winrun 启动");
    }

    let mut stdout = std::io::stdout();
    run_with(outcome, config::credentials_from_env(), &WinRmConnector, &mut stdout).await
}

/// 按解析结果输出用法或执行远程命令，返回进程退出码
pub async fn run_with<W: Write>(
    outcome: ParseOutcome,
    credentials: Credentials,
    connector: &dyn SessionConnector,
    out: &mut W,
) -> Result<ExitCode> {
    let command_line = match outcome {
        ParseOutcome::Run(command_line) => command_line,
        ParseOutcome::Usage(usage) => {
            writeln!(out, "{}", usage)?;
            out.flush()?;
            return Ok(ExitCode::from(USAGE_EXIT_CODE));
        }
    };

    let outcome = commands::exec::run(&command_line.invocation, credentials, connector, out).await?;
    info!("执行完成: {:?}", outcome);

    Ok(ExitCode::SUCCESS)
}
