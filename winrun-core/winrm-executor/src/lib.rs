//! winrun WinRM 执行器
//!
//! 通过 WS-Management (WinRM) 协议在远程 Windows 主机上执行命令，支持：
//! - 明文 HTTP / HTTPS 传输（证书校验策略显式配置）
//! - Basic 认证
//! - cmd 原生命令与 PowerShell 脚本
//! - 标准输出 / 标准错误 / 退出码捕获
//!
//! # 示例
//!
//! ```ignore
//! use winrun_winrm_executor::{Credentials, TransportSecurity, WinRmConfig, WinRmSession};
//!
//! let config = WinRmConfig::new(
//!     "win01.example.com",
//!     TransportSecurity::ssl_without_validation(),
//!     Credentials::new("Administrator", "password"),
//! );
//! let session = WinRmSession::open(config)?;
//!
//! // cmd 命令
//! let result = session.run_cmd("ipconfig", &["/all".to_string()]).await?;
//! println!("{}", result.stdout_utf8()?);
//!
//! // PowerShell 脚本
//! let result = session.run_ps("Get-Process -Name explorer").await?;
//! ```

mod client;
mod config;
mod error;
pub mod powershell;
pub mod soap;
mod transport;

pub use client::{ExecutionResult, RemoteShell, SessionConnector, WinRmConnector, WinRmSession};
pub use config::{
    CertificateValidation, Credentials, TransportSecurity, WinRmConfig, DEFAULT_HTTPS_PORT,
    DEFAULT_HTTP_PORT,
};
pub use error::{Result, WinRmError};
pub use transport::HttpTransport;
