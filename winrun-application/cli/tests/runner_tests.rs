//! 执行流程测试
//!
//! 使用记录调用的会话工厂代替真实 WinRM 连接。

use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use winrun_cli::cli::{self, CommandMode, Invocation, ParseOutcome, SessionOptions, TransportMode};
use winrun_cli::commands::exec::{self, Outcome};
use winrun_winrm_executor::{
    Credentials, ExecutionResult, RemoteShell, SessionConnector, TransportSecurity, WinRmConfig, WinRmError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Open { endpoint: String, transport: TransportSecurity, credentials: Credentials },
    Native { command: String, args: Vec<String> },
    Script(String),
}

#[derive(Clone)]
struct RecordingConnector {
    calls: Arc<Mutex<Vec<Call>>>,
    result: ExecutionResult,
    fail_open: bool,
}

impl RecordingConnector {
    fn returning(result: ExecutionResult) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            result,
            fail_open: false,
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

struct RecordingShell {
    calls: Arc<Mutex<Vec<Call>>>,
    result: ExecutionResult,
}

#[async_trait]
impl RemoteShell for RecordingShell {
    async fn run_native_command(&self, command: &str, args: &[String]) -> winrun_winrm_executor::Result<ExecutionResult> {
        self.calls.lock().unwrap().push(Call::Native {
            command: command.to_string(),
            args: args.to_vec(),
        });
        Ok(self.result.clone())
    }

    async fn run_script_command(&self, script: &str) -> winrun_winrm_executor::Result<ExecutionResult> {
        self.calls.lock().unwrap().push(Call::Script(script.to_string()));
        Ok(self.result.clone())
    }
}

#[async_trait]
impl SessionConnector for RecordingConnector {
    async fn open_session(&self, config: WinRmConfig) -> winrun_winrm_executor::Result<Box<dyn RemoteShell>> {
        if self.fail_open {
            return Err(WinRmError::HttpError("connection refused".to_string()));
        }
        self.calls.lock().unwrap().push(Call::Open {
            endpoint: config.endpoint()?,
            transport: config.transport,
            credentials: config.credentials.clone(),
        });
        Ok(Box::new(RecordingShell {
            calls: self.calls.clone(),
            result: self.result.clone(),
        }))
    }
}

fn parse(args: &[&str]) -> Invocation {
    let outcome = if args[0] == "winrun-ssl" {
        cli::parse_ssl(args)
    } else {
        cli::parse_selectable(args)
    };
    match outcome.unwrap() {
        ParseOutcome::Run(command_line) => command_line.invocation,
        ParseOutcome::Usage(usage) => panic!("unexpected usage: {}", usage),
    }
}

async fn execute(invocation: &Invocation, connector: &RecordingConnector) -> (Outcome, String) {
    let mut out = Vec::new();
    let outcome = exec::run(invocation, Credentials::new("admin", "secret"), connector, &mut out)
        .await
        .unwrap();
    (outcome, String::from_utf8(out).unwrap())
}

#[tokio::test]
async fn test_all_transport_and_mode_combinations() {
    let cases = [
        ("PLAIN", "CMD", "http://win01:5985/wsman", TransportSecurity::Plain, true),
        ("plain", "ps", "http://win01:5985/wsman", TransportSecurity::Plain, false),
        ("Ssl", "Cmd", "https://win01:5986/wsman", TransportSecurity::ssl_without_validation(), true),
        ("ssl", "PS", "https://win01:5986/wsman", TransportSecurity::ssl_without_validation(), false),
    ];

    for (transport, mode, endpoint, security, native) in cases {
        let connector = RecordingConnector::returning(ExecutionResult::new(0, "done", ""));
        let invocation = parse(&["winrun", "win01", transport, mode, "whoami", "/all"]);

        let (outcome, printed) = execute(&invocation, &connector).await;
        assert_eq!(outcome, Outcome::Rendered { status_code: 0 });
        assert_eq!(printed, "done");

        let calls = connector.calls();
        assert_eq!(
            calls[0],
            Call::Open {
                endpoint: endpoint.to_string(),
                transport: security,
                credentials: Credentials::new("admin", "secret"),
            }
        );
        let expected = if native {
            Call::Native {
                command: "whoami".to_string(),
                args: vec!["/all".to_string()],
            }
        } else {
            Call::Script("whoami /all".to_string())
        };
        assert_eq!(calls[1], expected, "transport={} mode={}", transport, mode);
    }
}

#[tokio::test]
async fn test_cmd_passes_command_and_argument_list() {
    let connector = RecordingConnector::returning(ExecutionResult::new(0, "OK\n", ""));
    let invocation = parse(&["winrun-ssl", "win01", "cmd", "ipconfig", "/all"]);

    let (_, printed) = execute(&invocation, &connector).await;

    assert_eq!(printed, "OK\n");
    assert_eq!(
        connector.calls()[1],
        Call::Native {
            command: "ipconfig".to_string(),
            args: vec!["/all".to_string()],
        }
    );
}

#[tokio::test]
async fn test_ps_joins_command_line() {
    let connector = RecordingConnector::returning(ExecutionResult::new(0, "", ""));
    let invocation = parse(&["winrun-ssl", "win01", "PS", "Get-Process", "-Name", "explorer"]);

    execute(&invocation, &connector).await;

    assert_eq!(
        connector.calls()[1],
        Call::Script("Get-Process -Name explorer".to_string())
    );
}

#[tokio::test]
async fn test_failure_renders_stderr() {
    let connector = RecordingConnector::returning(ExecutionResult::new(1, "", "Access is denied."));
    let invocation = parse(&["winrun", "win01", "ssl", "cmd", "net", "session"]);

    let (outcome, printed) = execute(&invocation, &connector).await;

    assert_eq!(outcome, Outcome::Rendered { status_code: 1 });
    assert_eq!(printed, "Action failed with: Access is denied.\n");
}

#[tokio::test]
async fn test_unsupported_command_mode_is_silent_noop() {
    let connector = RecordingConnector::returning(ExecutionResult::new(0, "never", ""));
    let invocation = parse(&["winrun", "win01", "ssl", "BASH", "ls"]);

    let (outcome, printed) = execute(&invocation, &connector).await;

    assert_eq!(outcome, Outcome::Unsupported);
    assert!(printed.is_empty());
    assert!(connector.calls().is_empty());
}

#[tokio::test]
async fn test_unsupported_transport_is_silent_noop() {
    let connector = RecordingConnector::returning(ExecutionResult::new(0, "never", ""));
    let invocation = parse(&["winrun", "win01", "tls", "cmd", "dir"]);

    let (outcome, printed) = execute(&invocation, &connector).await;

    assert_eq!(outcome, Outcome::Unsupported);
    assert!(printed.is_empty());
    assert!(connector.calls().is_empty());
}

#[tokio::test]
async fn test_too_few_arguments_never_reach_connector() {
    for argv in [
        vec!["winrun", "win01", "ssl", "cmd"],
        vec!["winrun", "win01"],
    ] {
        assert!(matches!(cli::parse_selectable(argv).unwrap(), ParseOutcome::Usage(_)));
    }
    assert!(matches!(
        cli::parse_ssl(["winrun-ssl", "win01", "ps"]).unwrap(),
        ParseOutcome::Usage(_)
    ));
}

#[tokio::test]
async fn test_usage_exits_without_connecting() {
    let connector = RecordingConnector::returning(ExecutionResult::new(0, "never", ""));
    let outcome = cli::parse_ssl(["/opt/bin/winrun-ssl", "win01", "cmd"]).unwrap();

    let mut out = Vec::new();
    let code = winrun_cli::run_with(outcome, Credentials::default(), &connector, &mut out)
        .await
        .unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "winrun-ssl hostname cmd|ps command arguments...\n"
    );
    assert_eq!(
        format!("{:?}", code),
        format!("{:?}", ExitCode::from(winrun_cli::USAGE_EXIT_CODE))
    );
    assert!(connector.calls().is_empty());
}

#[tokio::test]
async fn test_run_with_renders_and_succeeds() {
    let connector = RecordingConnector::returning(ExecutionResult::new(0, "win01\r\n", ""));
    let outcome = cli::parse_selectable(["winrun", "win01", "plain", "cmd", "hostname"]).unwrap();

    let mut out = Vec::new();
    let code = winrun_cli::run_with(outcome, Credentials::new("admin", "secret"), &connector, &mut out)
        .await
        .unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), "win01\r\n");
    assert_eq!(format!("{:?}", code), format!("{:?}", ExitCode::SUCCESS));
    assert_eq!(connector.calls().len(), 2);
}

#[tokio::test]
async fn test_empty_credentials_are_passed_through() {
    let connector = RecordingConnector::returning(ExecutionResult::new(0, "", ""));
    let invocation = parse(&["winrun", "win01", "plain", "cmd", "hostname"]);

    let mut out = Vec::new();
    exec::run(&invocation, Credentials::default(), &connector, &mut out)
        .await
        .unwrap();

    match &connector.calls()[0] {
        Call::Open { credentials, .. } => assert_eq!(credentials, &Credentials::new("", "")),
        other => panic!("unexpected call: {:?}", other),
    }
}

#[tokio::test]
async fn test_session_errors_propagate() {
    let connector = RecordingConnector {
        fail_open: true,
        ..RecordingConnector::returning(ExecutionResult::default())
    };
    let invocation = Invocation {
        host: "win01".to_string(),
        transport: TransportMode::Ssl,
        command_mode: CommandMode::Cmd,
        command_line: vec!["hostname".to_string()],
        options: SessionOptions::default(),
    };

    let mut out = Vec::new();
    let err = exec::run(&invocation, Credentials::default(), &connector, &mut out)
        .await
        .unwrap_err();

    assert!(format!("{:#}", err).contains("connection refused"));
    assert!(out.is_empty());
}
