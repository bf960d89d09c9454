//! WinRM 配置

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::{Result, WinRmError};

/// WinRM HTTP 监听端口
pub const DEFAULT_HTTP_PORT: u16 = 5985;
/// WinRM HTTPS 监听端口
pub const DEFAULT_HTTPS_PORT: u16 = 5986;
/// WS-Management 服务路径
pub const WSMAN_PATH: &str = "/wsman";

/// 服务端证书校验策略
///
/// 关闭校验是显式的配置值，而不是隐藏开关。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateValidation {
    /// 校验服务端证书
    Validate,
    /// 忽略证书校验（自签名证书场景）
    Ignore,
}

/// 传输层安全模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportSecurity {
    /// 明文 HTTP
    Plain,
    /// HTTPS
    Ssl {
        certificate_validation: CertificateValidation,
    },
}

impl TransportSecurity {
    /// HTTPS 且不校验服务端证书
    pub fn ssl_without_validation() -> Self {
        TransportSecurity::Ssl {
            certificate_validation: CertificateValidation::Ignore,
        }
    }

    /// 默认 URL scheme
    pub fn scheme(&self) -> &'static str {
        match self {
            TransportSecurity::Plain => "http",
            TransportSecurity::Ssl { .. } => "https",
        }
    }

    /// 是否接受无效证书
    pub fn accepts_invalid_certs(&self) -> bool {
        matches!(
            self,
            TransportSecurity::Ssl {
                certificate_validation: CertificateValidation::Ignore
            }
        )
    }
}

/// 远程账户凭据
///
/// 用户名和密码允许为空，认证失败由服务端返回。
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// WinRM 会话配置
#[derive(Debug, Clone)]
pub struct WinRmConfig {
    /// 目标主机（主机名、host:port 或完整 URL）
    pub host: String,
    /// 传输层安全模式
    pub transport: TransportSecurity,
    /// 凭据
    pub credentials: Credentials,
    /// 端口（覆盖默认端口）
    pub port: Option<u16>,
    /// WS-Management OperationTimeout
    pub operation_timeout: Duration,
    /// HTTP 读取超时，必须大于 operation_timeout
    pub read_timeout: Duration,
    /// 连接超时
    pub connect_timeout: Duration,
    /// 远程 shell 代码页
    pub codepage: u32,
}

fn default_operation_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

impl WinRmConfig {
    /// 创建配置
    ///
    /// # Arguments
    /// * `host` - 目标主机
    /// * `transport` - 传输层安全模式
    /// * `credentials` - 凭据
    pub fn new(host: impl Into<String>, transport: TransportSecurity, credentials: Credentials) -> Self {
        Self {
            host: host.into(),
            transport,
            credentials,
            port: None,
            operation_timeout: default_operation_timeout(),
            read_timeout: default_read_timeout(),
            connect_timeout: default_connect_timeout(),
            codepage: 437,
        }
    }

    /// 设置端口
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// 设置 OperationTimeout
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// 设置 HTTP 读取超时
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// 设置连接超时
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// 设置代码页
    pub fn codepage(mut self, codepage: u32) -> Self {
        self.codepage = codepage;
        self
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(WinRmError::ConfigError("目标主机不能为空".to_string()));
        }
        if self.read_timeout <= self.operation_timeout {
            return Err(WinRmError::ConfigError(format!(
                "读取超时 ({}s) 必须大于 OperationTimeout ({}s)",
                self.read_timeout.as_secs(),
                self.operation_timeout.as_secs()
            )));
        }
        Ok(())
    }

    /// 解析 WS-Management 端点 URL
    ///
    /// 裸主机名按传输模式补全 scheme、默认端口和 `/wsman` 路径；
    /// 显式给出的 scheme、端口、路径保持不变。
    pub fn endpoint(&self) -> Result<String> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(WinRmError::ConfigError("目标主机不能为空".to_string()));
        }

        let raw = if host.contains("://") {
            host.to_string()
        } else {
            format!("{}://{}", self.transport.scheme(), host)
        };

        let mut url = Url::parse(&raw)
            .map_err(|e| WinRmError::ConfigError(format!("无效的主机地址 {}: {}", host, e)))?;

        let default_port = match url.scheme() {
            "https" => DEFAULT_HTTPS_PORT,
            "http" => DEFAULT_HTTP_PORT,
            other => {
                return Err(WinRmError::ConfigError(format!(
                    "不支持的 scheme: {}",
                    other
                )))
            }
        };

        let port = self.port.or_else(|| url.port()).unwrap_or(default_port);
        url.set_port(Some(port))
            .map_err(|_| WinRmError::ConfigError(format!("无法设置端口: {}", host)))?;

        if url.path().is_empty() || url.path() == "/" {
            url.set_path(WSMAN_PATH);
        }

        Ok(url.to_string())
    }
}
