//! WinRM 错误定义

use thiserror::Error;

/// WinRM 操作结果类型
pub type Result<T> = std::result::Result<T, WinRmError>;

/// WinRM 错误类型
#[derive(Error, Debug)]
pub enum WinRmError {
    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// HTTP 层错误（连接拒绝、TLS 握手失败、读取超时等）
    #[error("HTTP 错误: {0}")]
    HttpError(String),

    /// 认证错误（HTTP 401）
    #[error("WinRM 认证失败: {0}")]
    AuthenticationError(String),

    /// 非 200 响应且无法解析出 SOAP Fault
    #[error("WinRM 传输错误 [HTTP {status}]: {body}")]
    TransportError { status: u16, body: String },

    /// 服务端返回的 SOAP Fault
    #[error("WinRM SOAP Fault [{code}]: {reason}")]
    SoapFault {
        /// 错误码（WSManFault Code 优先，其次为 SOAP Subcode）
        code: String,
        /// 错误描述
        reason: String,
    },

    /// 响应报文解析错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 输出流编码错误
    #[error("编码错误: {0}")]
    EncodingError(String),
}

impl WinRmError {
    /// 是否为 Receive 操作超时（命令仍在运行，应继续轮询）
    pub fn is_operation_timeout(&self) -> bool {
        matches!(self, WinRmError::SoapFault { code, .. } if code == crate::soap::OPERATION_TIMEOUT_CODE)
    }
}

impl From<reqwest::Error> for WinRmError {
    fn from(e: reqwest::Error) -> Self {
        WinRmError::HttpError(e.to_string())
    }
}

impl From<quick_xml::Error> for WinRmError {
    fn from(e: quick_xml::Error) -> Self {
        WinRmError::ParseError(e.to_string())
    }
}
