//! 远程命令执行
//!
//! invocation → 会话配置 → 分派 → 输出，两个入口共用。

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use winrun_winrm_executor::{Credentials, SessionConnector, TransportSecurity, WinRmConfig};

use crate::cli::{Dispatch, Invocation};
use crate::commands::output;

/// 读取超时比 OperationTimeout 多留的余量
const READ_TIMEOUT_MARGIN: u64 = 10;

/// 执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 已输出远程结果
    Rendered { status_code: i64 },
    /// 模式无法识别，未发起远程调用
    Unsupported,
}

/// 构造会话配置
pub fn session_config(invocation: &Invocation, transport: TransportSecurity, credentials: Credentials) -> WinRmConfig {
    let mut config = WinRmConfig::new(invocation.host.clone(), transport, credentials);
    let options = &invocation.options;

    if let Some(port) = options.port {
        config = config.port(port);
    }
    if let Some(secs) = options.operation_timeout {
        config = config
            .operation_timeout(Duration::from_secs(secs))
            .read_timeout(Duration::from_secs(secs + READ_TIMEOUT_MARGIN));
    }
    if let Some(secs) = options.read_timeout {
        config = config.read_timeout(Duration::from_secs(secs));
    }

    config
}

/// 执行一次远程调用并输出结果
pub async fn run<W: Write>(
    invocation: &Invocation,
    credentials: Credentials,
    connector: &dyn SessionConnector,
    out: &mut W,
) -> Result<Outcome> {
    let Some(transport) = invocation.transport.security() else {
        warn!("不支持的传输模式: {}", invocation.transport);
        return Ok(Outcome::Unsupported);
    };

    let Some(dispatch) = invocation.dispatch() else {
        warn!("不支持的命令模式: {}", invocation.command_mode);
        return Ok(Outcome::Unsupported);
    };

    info!(
        "连接 {} (传输: {}, 模式: {})",
        invocation.host, invocation.transport, invocation.command_mode
    );

    let config = session_config(invocation, transport, credentials);
    let shell = connector
        .open_session(config)
        .await
        .with_context(|| format!("建立 WinRM 会话失败: {}", invocation.host))?;

    let result = match dispatch {
        Dispatch::Native { command, args } => {
            debug!("cmd: {} {:?}", command, args);
            shell.run_native_command(command, args).await
        }
        Dispatch::Script(script) => {
            debug!("ps: {}", script);
            shell.run_script_command(&script).await
        }
    }
    .with_context(|| format!("远程执行失败: {}", invocation.host))?;

    output::render(&result, out)?;

    Ok(Outcome::Rendered {
        status_code: result.status_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{CommandMode, SessionOptions, TransportMode};

    fn invocation(options: SessionOptions) -> Invocation {
        Invocation {
            host: "win01".to_string(),
            transport: TransportMode::Ssl,
            command_mode: CommandMode::Cmd,
            command_line: vec!["hostname".to_string()],
            options,
        }
    }

    #[test]
    fn test_session_config_defaults() {
        let inv = invocation(SessionOptions::default());
        let config = session_config(&inv, TransportSecurity::ssl_without_validation(), Credentials::default());
        assert_eq!(config.endpoint().unwrap(), "https://win01:5986/wsman");
        assert_eq!(config.operation_timeout, Duration::from_secs(20));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_session_config_operation_timeout_extends_read_timeout() {
        let inv = invocation(SessionOptions {
            port: Some(443),
            operation_timeout: Some(120),
            read_timeout: None,
        });
        let config = session_config(&inv, TransportSecurity::ssl_without_validation(), Credentials::default());
        assert_eq!(config.port, Some(443));
        assert_eq!(config.operation_timeout, Duration::from_secs(120));
        assert_eq!(config.read_timeout, Duration::from_secs(130));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_session_config_explicit_read_timeout_wins() {
        let inv = invocation(SessionOptions {
            port: None,
            operation_timeout: Some(60),
            read_timeout: Some(90),
        });
        let config = session_config(&inv, TransportSecurity::Plain, Credentials::default());
        assert_eq!(config.read_timeout, Duration::from_secs(90));
    }
}
