//! CLI 运行配置
//!
//! 凭据来自环境变量，在进程启动时读取一次；缺失时按空字符串传递，
//! 认证是否通过由远端决定。

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use winrun_winrm_executor::Credentials;

/// 远程账户用户名
pub const USERNAME_ENV: &str = "WINRM_USERNAME";
/// 远程账户密码
pub const PASSWORD_ENV: &str = "WINRM_PASSWORD";

/// 从环境变量读取凭据
pub fn credentials_from_env() -> Credentials {
    credentials_from(|name| std::env::var(name).ok())
}

/// 通过给定的查找函数读取凭据
pub fn credentials_from<F>(lookup: F) -> Credentials
where
    F: Fn(&str) -> Option<String>,
{
    Credentials::new(
        lookup(USERNAME_ENV).unwrap_or_default(),
        lookup(PASSWORD_ENV).unwrap_or_default(),
    )
}

/// 初始化日志
///
/// 日志写入 stderr，stdout 只输出远程命令结果。`RUST_LOG` 优先于 `--log-level`。
pub fn init_logging(log_level: &str) {
    let level = log_level.to_lowercase();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    format!(
                        "winrun={0},winrun_ssl={0},winrun_cli={0},winrun_winrm_executor={0}",
                        level
                    )
                    .into()
                }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
