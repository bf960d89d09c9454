//! 命令行参数解析
//!
//! 两种入口共享同一个 [`Invocation`]：
//! - `winrun <host> <plain|ssl> <cmd|ps> <command...>`
//! - `winrun-ssl <host> <cmd|ps> <command> [arguments...]`（固定 SSL，不校验证书）

use std::ffi::OsString;
use std::fmt;
use std::path::Path;

use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser};
use winrun_winrm_executor::TransportSecurity;

/// 传输模式（大小写不敏感）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportMode {
    Plain,
    Ssl,
    /// 无法识别的取值，原样保留
    Unsupported(String),
}

impl TransportMode {
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("plain") {
            TransportMode::Plain
        } else if value.eq_ignore_ascii_case("ssl") {
            TransportMode::Ssl
        } else {
            TransportMode::Unsupported(value.to_string())
        }
    }

    /// 对应的传输层配置；SSL 总是关闭证书校验
    pub fn security(&self) -> Option<TransportSecurity> {
        match self {
            TransportMode::Plain => Some(TransportSecurity::Plain),
            TransportMode::Ssl => Some(TransportSecurity::ssl_without_validation()),
            TransportMode::Unsupported(_) => None,
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Plain => write!(f, "PLAIN"),
            TransportMode::Ssl => write!(f, "SSL"),
            TransportMode::Unsupported(value) => write!(f, "{}", value),
        }
    }
}

/// 命令模式（大小写不敏感）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandMode {
    /// cmd 原生命令
    Cmd,
    /// PowerShell
    Ps,
    /// 无法识别的取值，原样保留
    Unsupported(String),
}

impl CommandMode {
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("cmd") {
            CommandMode::Cmd
        } else if value.eq_ignore_ascii_case("ps") {
            CommandMode::Ps
        } else {
            CommandMode::Unsupported(value.to_string())
        }
    }
}

impl fmt::Display for CommandMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandMode::Cmd => write!(f, "CMD"),
            CommandMode::Ps => write!(f, "PS"),
            CommandMode::Unsupported(value) => write!(f, "{}", value),
        }
    }
}

/// 会话可选参数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOptions {
    pub port: Option<u16>,
    /// OperationTimeout（秒）
    pub operation_timeout: Option<u64>,
    /// HTTP 读取超时（秒）
    pub read_timeout: Option<u64>,
}

/// 一次远程执行请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub host: String,
    pub transport: TransportMode,
    pub command_mode: CommandMode,
    /// 命令及其参数
    pub command_line: Vec<String>,
    pub options: SessionOptions,
}

/// 分派到远程 shell 的操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch<'a> {
    /// `run_native_command(command, args)`
    Native { command: &'a str, args: &'a [String] },
    /// `run_script_command(script)`
    Script(String),
}

impl Invocation {
    /// 根据命令模式确定操作；模式无法识别或命令为空时返回 None
    pub fn dispatch(&self) -> Option<Dispatch<'_>> {
        match self.command_mode {
            CommandMode::Cmd => self
                .command_line
                .split_first()
                .map(|(command, args)| Dispatch::Native {
                    command: command.as_str(),
                    args,
                }),
            CommandMode::Ps if !self.command_line.is_empty() => {
                Some(Dispatch::Script(self.command_line.join(" ")))
            }
            _ => None,
        }
    }
}

/// 解析后的命令行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// 日志级别
    pub log_level: String,
    pub invocation: Invocation,
}

/// 解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Run(CommandLine),
    /// 参数不足，输出用法说明
    Usage(String),
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// 日志级别 (trace/debug/info/warn/error)，输出到 stderr
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// WinRM 端口（默认 HTTP 5985 / HTTPS 5986）
    #[arg(long)]
    port: Option<u16>,

    /// WS-Management OperationTimeout（秒）
    #[arg(long)]
    operation_timeout: Option<u64>,

    /// HTTP 读取超时（秒），必须大于 OperationTimeout
    #[arg(long)]
    read_timeout: Option<u64>,
}

impl GlobalArgs {
    fn session_options(&self) -> SessionOptions {
        SessionOptions {
            port: self.port,
            operation_timeout: self.operation_timeout,
            read_timeout: self.read_timeout,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "winrun")]
#[command(about = "通过 WinRM 在远程 Windows 主机上执行 cmd / PowerShell 命令", long_about = None)]
#[command(version)]
struct SelectableCli {
    #[command(flatten)]
    global: GlobalArgs,

    /// <主机> <plain|ssl> <cmd|ps> <命令及参数...>，主机之后的内容原样转发
    #[arg(value_name = "HOST PLAIN|SSL CMD|PS COMMAND", num_args = 0.., trailing_var_arg = true, allow_hyphen_values = true)]
    targets: Vec<String>,
}

#[derive(Parser, Debug)]
#[command(name = "winrun-ssl")]
#[command(about = "通过 WinRM over HTTPS（不校验证书）在远程 Windows 主机上执行 cmd / PowerShell 命令", long_about = None)]
#[command(version)]
struct SslCli {
    #[command(flatten)]
    global: GlobalArgs,

    /// <主机> <cmd|ps> <命令> [参数...]，主机之后的内容原样转发
    #[arg(value_name = "HOST CMD|PS COMMAND", num_args = 0.., trailing_var_arg = true, allow_hyphen_values = true)]
    targets: Vec<String>,
}

fn program_name(argv: &[OsString], fallback: &str) -> String {
    argv.first()
        .map(|arg| {
            Path::new(arg)
                .file_name()
                .unwrap_or(arg.as_os_str())
                .to_string_lossy()
                .into_owned()
        })
        .unwrap_or_else(|| fallback.to_string())
}

/// `winrun` 用法
pub fn selectable_usage(prog: &str) -> String {
    format!("{} hostname plain|ssl cmd|ps command_line ...", prog)
}

/// `winrun-ssl` 用法
pub fn ssl_usage(prog: &str) -> String {
    format!("{} hostname cmd|ps command arguments...", prog)
}

/// 选项只能出现在主机之前；主机位置上的未知选项按 clap 的方式报错
fn reject_unknown_option<C: CommandFactory>(targets: &[String]) -> Result<(), clap::Error> {
    match targets.first() {
        Some(first) if first.len() > 1 && first.starts_with('-') => Err(C::command().error(
            ErrorKind::UnknownArgument,
            format!("无法识别的参数 '{}'", first),
        )),
        _ => Ok(()),
    }
}

/// 解析 `winrun <host> <plain|ssl> <cmd|ps> <command...>`
pub fn parse_selectable<I, T>(args: I) -> Result<ParseOutcome, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let argv: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let prog = program_name(&argv, "winrun");

    let cli = SelectableCli::try_parse_from(&argv)?;
    reject_unknown_option::<SelectableCli>(&cli.targets)?;

    let invocation = match cli.targets.as_slice() {
        [host, transport, command_mode, command_line @ ..] if !command_line.is_empty() => Invocation {
            host: host.clone(),
            transport: TransportMode::parse(transport),
            command_mode: CommandMode::parse(command_mode),
            command_line: command_line.to_vec(),
            options: cli.global.session_options(),
        },
        _ => return Ok(ParseOutcome::Usage(selectable_usage(&prog))),
    };

    Ok(ParseOutcome::Run(CommandLine {
        invocation,
        log_level: cli.global.log_level,
    }))
}

/// 解析 `winrun-ssl <host> <cmd|ps> <command> [arguments...]`
pub fn parse_ssl<I, T>(args: I) -> Result<ParseOutcome, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let argv: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let prog = program_name(&argv, "winrun-ssl");

    let cli = SslCli::try_parse_from(&argv)?;
    reject_unknown_option::<SslCli>(&cli.targets)?;

    let invocation = match cli.targets.as_slice() {
        [host, command_mode, command_line @ ..] if !command_line.is_empty() => Invocation {
            host: host.clone(),
            transport: TransportMode::Ssl,
            command_mode: CommandMode::parse(command_mode),
            command_line: command_line.to_vec(),
            options: cli.global.session_options(),
        },
        _ => return Ok(ParseOutcome::Usage(ssl_usage(&prog))),
    };

    Ok(ParseOutcome::Run(CommandLine {
        invocation,
        log_level: cli.global.log_level,
    }))
}
