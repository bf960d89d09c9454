//! WinRM HTTP(S) 传输层

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::config::{Credentials, WinRmConfig};
use crate::error::{Result, WinRmError};
use crate::soap;

const SOAP_CONTENT_TYPE: &str = "application/soap+xml;charset=UTF-8";
const CLIENT_USER_AGENT: &str = concat!("winrun/", env!("CARGO_PKG_VERSION"));

/// SOAP over HTTP 传输
pub struct HttpTransport {
    endpoint: String,
    credentials: Credentials,
    client: Client,
}

impl HttpTransport {
    /// 根据配置创建传输（不发起网络请求）
    pub fn new(config: &WinRmConfig) -> Result<Self> {
        let endpoint = config.endpoint()?;

        if config.transport.accepts_invalid_certs() {
            warn!("已关闭服务端证书校验: {}", endpoint);
        }

        let client = Client::builder()
            .timeout(config.read_timeout)
            .connect_timeout(config.connect_timeout)
            .danger_accept_invalid_certs(config.transport.accepts_invalid_certs())
            .build()
            .map_err(|e| WinRmError::HttpError(e.to_string()))?;

        Ok(Self {
            endpoint,
            credentials: config.credentials.clone(),
            client,
        })
    }

    /// 端点 URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 发送 SOAP 报文并返回响应报文
    pub async fn send_message(&self, message: String) -> Result<String> {
        debug!("WinRM 请求: {} ({} 字节)", self.endpoint, message.len());

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .body(message)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("WinRM 响应: HTTP {} ({} 字节)", status.as_u16(), body.len());

        match status {
            StatusCode::OK => Ok(body),
            StatusCode::UNAUTHORIZED => Err(WinRmError::AuthenticationError(format!(
                "{} 拒绝了提供的凭据 (HTTP 401)",
                self.endpoint
            ))),
            _ => Err(soap::parse_fault(&body).unwrap_or(WinRmError::TransportError {
                status: status.as_u16(),
                body,
            })),
        }
    }
}
