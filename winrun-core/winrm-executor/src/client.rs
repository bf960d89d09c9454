//! WinRM 会话实现
//!
//! 每次执行命令都会经历完整的 shell 生命周期：
//! Create → Command → Receive（循环至 Done）→ Signal → Delete。

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::WinRmConfig;
use crate::error::{Result, WinRmError};
use crate::powershell;
use crate::soap::{self, MessageBuilder};
use crate::transport::HttpTransport;

/// 命令执行结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// 远程进程退出码
    pub status_code: i64,
    /// 标准输出原始字节
    pub std_out: Vec<u8>,
    /// 标准错误原始字节
    pub std_err: Vec<u8>,
}

impl ExecutionResult {
    pub fn new(status_code: i64, std_out: impl Into<Vec<u8>>, std_err: impl Into<Vec<u8>>) -> Self {
        Self {
            status_code,
            std_out: std_out.into(),
            std_err: std_err.into(),
        }
    }

    /// 检查命令是否成功执行
    pub fn is_success(&self) -> bool {
        self.status_code == 0
    }

    /// 按 UTF-8 解码标准输出
    pub fn stdout_utf8(&self) -> Result<&str> {
        std::str::from_utf8(&self.std_out)
            .map_err(|e| WinRmError::EncodingError(format!("标准输出不是合法的 UTF-8: {}", e)))
    }

    /// 标准错误文本（非法字节按替换字符处理）
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.std_err).into_owned()
    }
}

/// 远程 shell 能力
#[async_trait]
pub trait RemoteShell: Send + Sync {
    /// 执行原生 cmd 命令
    async fn run_native_command(&self, command: &str, args: &[String]) -> Result<ExecutionResult>;

    /// 执行 PowerShell 脚本
    async fn run_script_command(&self, script: &str) -> Result<ExecutionResult>;
}

/// 会话工厂
#[async_trait]
pub trait SessionConnector: Send + Sync {
    /// 按配置建立会话
    async fn open_session(&self, config: WinRmConfig) -> Result<Box<dyn RemoteShell>>;
}

/// 基于 WS-Management 的会话工厂
#[derive(Debug, Clone, Copy, Default)]
pub struct WinRmConnector;

#[async_trait]
impl SessionConnector for WinRmConnector {
    async fn open_session(&self, config: WinRmConfig) -> Result<Box<dyn RemoteShell>> {
        Ok(Box::new(WinRmSession::open(config)?))
    }
}

/// WinRM 会话
pub struct WinRmSession {
    config: WinRmConfig,
    transport: HttpTransport,
    messages: MessageBuilder,
}

impl WinRmSession {
    /// 建立会话（仅准备传输，不发起网络请求）
    pub fn open(config: WinRmConfig) -> Result<Self> {
        config.validate()?;

        let transport = HttpTransport::new(&config)?;
        let messages = MessageBuilder::new(transport.endpoint(), config.operation_timeout);

        info!("WinRM 会话: {}", transport.endpoint());

        Ok(Self {
            config,
            transport,
            messages,
        })
    }

    /// 获取配置
    pub fn config(&self) -> &WinRmConfig {
        &self.config
    }

    /// 执行 cmd 命令
    pub async fn run_cmd(&self, command: &str, args: &[String]) -> Result<ExecutionResult> {
        debug!("执行命令: {} (参数 {} 个)", command, args.len());

        let shell_id = self.open_shell().await?;
        let result = self.run_in_shell(&shell_id, command, args).await;
        self.close_shell(&shell_id).await;

        let result = result?;
        info!("命令结束: 退出码 {}", result.status_code);
        Ok(result)
    }

    /// 执行 PowerShell 脚本
    pub async fn run_ps(&self, script: &str) -> Result<ExecutionResult> {
        let command_line = powershell::encoded_command_line(script);
        let mut result = self.run_cmd(&command_line, &[]).await?;

        if !result.std_err.is_empty() {
            result.std_err = powershell::clean_error_stream(&result.std_err);
        }
        Ok(result)
    }

    async fn open_shell(&self) -> Result<String> {
        let response = self
            .transport
            .send_message(self.messages.create_shell(self.config.codepage))
            .await?;
        let shell_id = soap::parse_shell_id(&response)?;
        debug!("已创建 shell: {}", shell_id);
        Ok(shell_id)
    }

    async fn run_in_shell(&self, shell_id: &str, command: &str, args: &[String]) -> Result<ExecutionResult> {
        let response = self
            .transport
            .send_message(self.messages.run_command(shell_id, command, args))
            .await?;
        let command_id = soap::parse_command_id(&response)?;
        debug!("已启动命令: {}", command_id);

        let result = self.receive_output(shell_id, &command_id).await;
        self.terminate_command(shell_id, &command_id).await;
        result
    }

    async fn receive_output(&self, shell_id: &str, command_id: &str) -> Result<ExecutionResult> {
        let mut result = ExecutionResult::default();

        loop {
            let response = match self
                .transport
                .send_message(self.messages.receive(shell_id, command_id))
                .await
            {
                Ok(response) => response,
                Err(e) if e.is_operation_timeout() => {
                    debug!("命令仍在执行，继续拉取输出");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let chunk = soap::parse_receive(&response)?;
            result.std_out.extend_from_slice(&chunk.stdout);
            result.std_err.extend_from_slice(&chunk.stderr);

            if chunk.done {
                result.status_code = chunk.exit_code.unwrap_or(0);
                return Ok(result);
            }
        }
    }

    async fn terminate_command(&self, shell_id: &str, command_id: &str) {
        if let Err(e) = self
            .transport
            .send_message(self.messages.signal_terminate(shell_id, command_id))
            .await
        {
            warn!("终止命令 {} 失败: {}", command_id, e);
        }
    }

    async fn close_shell(&self, shell_id: &str) {
        match self.transport.send_message(self.messages.delete_shell(shell_id)).await {
            Ok(_) => debug!("已删除 shell: {}", shell_id),
            Err(e) => warn!("删除 shell {} 失败: {}", shell_id, e),
        }
    }
}

#[async_trait]
impl RemoteShell for WinRmSession {
    async fn run_native_command(&self, command: &str, args: &[String]) -> Result<ExecutionResult> {
        self.run_cmd(command, args).await
    }

    async fn run_script_command(&self, script: &str) -> Result<ExecutionResult> {
        self.run_ps(script).await
    }
}
