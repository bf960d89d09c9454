//! 执行结果输出
//!
//! 成功时原样输出远程标准输出；失败时在 stdout 上输出固定前缀加远程标准错误。

use std::io::Write;

use anyhow::{Context, Result};
use winrun_winrm_executor::ExecutionResult;

/// 失败输出前缀
pub const FAILURE_PREFIX: &str = "Action failed with:";

/// 输出执行结果
pub fn render<W: Write>(result: &ExecutionResult, out: &mut W) -> Result<()> {
    if result.is_success() {
        let text = result.stdout_utf8().context("无法解码远程标准输出")?;
        out.write_all(text.as_bytes())?;
    } else {
        writeln!(out, "{} {}", FAILURE_PREFIX, result.stderr_lossy())?;
    }
    out.flush()?;
    Ok(())
}
