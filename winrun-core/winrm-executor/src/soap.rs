//! WS-Management SOAP 报文
//!
//! 构造远程 shell 生命周期所需的请求报文（Create / Command / Receive /
//! Signal / Delete），并解析服务端响应。

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use uuid::Uuid;

use crate::error::{Result, WinRmError};

/// cmd shell 资源 URI
pub const RESOURCE_URI_CMD: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/cmd";

pub const ACTION_CREATE: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Create";
pub const ACTION_DELETE: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Delete";
pub const ACTION_COMMAND: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Command";
pub const ACTION_RECEIVE: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Receive";
pub const ACTION_SIGNAL: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Signal";

const SIGNAL_TERMINATE: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/signal/terminate";
const COMMAND_STATE_DONE: &str = "CommandState/Done";
const ANONYMOUS_ADDRESS: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous";
const MAX_ENVELOPE_SIZE: u32 = 153600;

/// Receive 超时的 WSManFault 错误码（命令仍在执行）
pub const OPERATION_TIMEOUT_CODE: &str = "2150858793";

/// SOAP 报文构造器
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    endpoint: String,
    operation_timeout: Duration,
}

impl MessageBuilder {
    pub fn new(endpoint: impl Into<String>, operation_timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            operation_timeout,
        }
    }

    /// 创建 shell
    pub fn create_shell(&self, codepage: u32) -> String {
        let options = [
            ("WINRS_NOPROFILE", "FALSE".to_string()),
            ("WINRS_CODEPAGE", codepage.to_string()),
        ];
        let body = "<rsp:Shell>\
                    <rsp:InputStreams>stdin</rsp:InputStreams>\
                    <rsp:OutputStreams>stdout stderr</rsp:OutputStreams>\
                    </rsp:Shell>";
        self.envelope(ACTION_CREATE, None, &options, body)
    }

    /// 在 shell 中启动命令
    pub fn run_command(&self, shell_id: &str, command: &str, args: &[String]) -> String {
        let options = [
            ("WINRS_CONSOLEMODE_STDIN", "TRUE".to_string()),
            ("WINRS_SKIP_CMD_SHELL", "FALSE".to_string()),
        ];
        let mut body = format!("<rsp:CommandLine><rsp:Command>{}</rsp:Command>", escape(command));
        if !args.is_empty() {
            body.push_str(&format!("<rsp:Arguments>{}</rsp:Arguments>", escape(&args.join(" "))));
        }
        body.push_str("</rsp:CommandLine>");
        self.envelope(ACTION_COMMAND, Some(shell_id), &options, &body)
    }

    /// 拉取命令输出
    pub fn receive(&self, shell_id: &str, command_id: &str) -> String {
        let body = format!(
            "<rsp:Receive><rsp:DesiredStream CommandId=\"{}\">stdout stderr</rsp:DesiredStream></rsp:Receive>",
            escape(command_id)
        );
        self.envelope(ACTION_RECEIVE, Some(shell_id), &[], &body)
    }

    /// 终止命令
    pub fn signal_terminate(&self, shell_id: &str, command_id: &str) -> String {
        let body = format!(
            "<rsp:Signal CommandId=\"{}\"><rsp:Code>{}</rsp:Code></rsp:Signal>",
            escape(command_id),
            SIGNAL_TERMINATE
        );
        self.envelope(ACTION_SIGNAL, Some(shell_id), &[], &body)
    }

    /// 删除 shell
    pub fn delete_shell(&self, shell_id: &str) -> String {
        self.envelope(ACTION_DELETE, Some(shell_id), &[], "")
    }

    fn envelope(&self, action: &str, shell_id: Option<&str>, options: &[(&str, String)], body: &str) -> String {
        let mut header = String::new();
        header.push_str(&format!("<a:To>{}</a:To>", escape(&self.endpoint)));
        header.push_str(&format!(
            "<a:ReplyTo><a:Address mustUnderstand=\"true\">{}</a:Address></a:ReplyTo>",
            ANONYMOUS_ADDRESS
        ));
        header.push_str(&format!(
            "<w:MaxEnvelopeSize mustUnderstand=\"true\">{}</w:MaxEnvelopeSize>",
            MAX_ENVELOPE_SIZE
        ));
        header.push_str(&format!("<a:MessageID>uuid:{}</a:MessageID>", Uuid::new_v4().to_string().to_uppercase()));
        header.push_str("<w:Locale xml:lang=\"en-US\" mustUnderstand=\"false\"/>");
        header.push_str("<p:DataLocale xml:lang=\"en-US\" mustUnderstand=\"false\"/>");
        header.push_str(&format!(
            "<w:OperationTimeout>PT{}S</w:OperationTimeout>",
            self.operation_timeout.as_secs()
        ));
        header.push_str(&format!(
            "<w:ResourceURI mustUnderstand=\"true\">{}</w:ResourceURI>",
            RESOURCE_URI_CMD
        ));
        header.push_str(&format!("<a:Action mustUnderstand=\"true\">{}</a:Action>", action));

        if let Some(id) = shell_id {
            header.push_str(&format!(
                "<w:SelectorSet><w:Selector Name=\"ShellId\">{}</w:Selector></w:SelectorSet>",
                escape(id)
            ));
        }

        if !options.is_empty() {
            header.push_str("<w:OptionSet>");
            for (name, value) in options {
                header.push_str(&format!("<w:Option Name=\"{}\">{}</w:Option>", name, escape(value)));
            }
            header.push_str("</w:OptionSet>");
        }

        format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
             <env:Envelope xmlns:env=\"http://www.w3.org/2003/05/soap-envelope\" \
             xmlns:a=\"http://schemas.xmlsoap.org/ws/2004/08/addressing\" \
             xmlns:w=\"http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd\" \
             xmlns:p=\"http://schemas.microsoft.com/wbem/wsman/1/wsman.xsd\" \
             xmlns:rsp=\"http://schemas.microsoft.com/wbem/wsman/1/windows/shell\">\
             <env:Header>{}</env:Header><env:Body>{}</env:Body></env:Envelope>",
            header, body
        )
    }
}

/// 扁平化的 XML 元素（仅保留本地名）
#[derive(Debug, Clone, Default)]
pub(crate) struct Node {
    pub name: String,
    pub parent: Option<String>,
    pub attrs: Vec<(String, String)>,
    pub text: String,
}

impl Node {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// 按文档顺序解析所有元素
pub(crate) fn parse_nodes(xml: &str) -> Result<Vec<Node>> {
    let mut reader = Reader::from_str(xml);

    let mut nodes: Vec<Node> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let node = start_node(&e, &stack, &nodes)?;
                nodes.push(node);
                stack.push(nodes.len() - 1);
            }
            Event::Empty(e) => {
                let node = start_node(&e, &stack, &nodes)?;
                nodes.push(node);
            }
            Event::Text(t) => {
                if let Some(&idx) = stack.last() {
                    nodes[idx].text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(&idx) = stack.last() {
                    nodes[idx].text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(nodes)
}

fn start_node(e: &quick_xml::events::BytesStart<'_>, stack: &[usize], nodes: &[Node]) -> Result<Node> {
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }

    Ok(Node {
        name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
        parent: stack.last().map(|&idx| nodes[idx].name.clone()),
        attrs,
        text: String::new(),
    })
}

/// 从 Create 响应中提取 ShellId
pub fn parse_shell_id(xml: &str) -> Result<String> {
    let nodes = parse_nodes(xml)?;
    nodes
        .iter()
        .find(|n| n.name == "Selector" && n.attr("Name") == Some("ShellId"))
        .or_else(|| nodes.iter().find(|n| n.name == "ShellId"))
        .map(|n| n.text.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| WinRmError::ParseError("响应中缺少 ShellId".to_string()))
}

/// 从 Command 响应中提取 CommandId
pub fn parse_command_id(xml: &str) -> Result<String> {
    let nodes = parse_nodes(xml)?;
    nodes
        .iter()
        .find(|n| n.name == "CommandId")
        .map(|n| n.text.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| WinRmError::ParseError("响应中缺少 CommandId".to_string()))
}

/// 一次 Receive 的输出片段
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiveChunk {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// 命令是否已结束
    pub done: bool,
    /// 退出码（仅在 done 时出现）
    pub exit_code: Option<i64>,
}

/// 解析 Receive 响应
pub fn parse_receive(xml: &str) -> Result<ReceiveChunk> {
    let nodes = parse_nodes(xml)?;
    let mut chunk = ReceiveChunk::default();

    for node in &nodes {
        match node.name.as_str() {
            "Stream" => {
                let text = node.text.trim();
                if text.is_empty() {
                    continue;
                }
                let decoded = BASE64
                    .decode(text)
                    .map_err(|e| WinRmError::EncodingError(format!("输出流 base64 解码失败: {}", e)))?;
                match node.attr("Name") {
                    Some("stdout") => chunk.stdout.extend_from_slice(&decoded),
                    Some("stderr") => chunk.stderr.extend_from_slice(&decoded),
                    _ => {}
                }
            }
            "CommandState" => {
                if node.attr("State").is_some_and(|s| s.ends_with(COMMAND_STATE_DONE)) {
                    chunk.done = true;
                }
            }
            "ExitCode" => {
                let code = node
                    .text
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| WinRmError::ParseError(format!("无效的 ExitCode {}: {}", node.text, e)))?;
                chunk.exit_code = Some(code);
            }
            _ => {}
        }
    }

    Ok(chunk)
}

/// 解析 SOAP Fault，不是 Fault 报文时返回 None
pub fn parse_fault(xml: &str) -> Option<WinRmError> {
    let nodes = parse_nodes(xml).ok()?;
    if !nodes.iter().any(|n| n.name == "Fault") {
        return None;
    }

    let wsman_code = nodes
        .iter()
        .find(|n| n.name == "WSManFault")
        .and_then(|n| n.attr("Code"))
        .map(str::to_string);
    let subcode = nodes
        .iter()
        .find(|n| n.name == "Value" && n.parent.as_deref() == Some("Subcode"))
        .or_else(|| nodes.iter().find(|n| n.name == "Value" && n.parent.as_deref() == Some("Code")))
        .map(|n| n.text.trim().to_string());
    let code = wsman_code.or(subcode).unwrap_or_else(|| "unknown".to_string());

    let reason = nodes
        .iter()
        .find(|n| n.name == "Message" && !n.text.trim().is_empty())
        .or_else(|| nodes.iter().find(|n| n.name == "Text" && n.parent.as_deref() == Some("Reason")))
        .map(|n| n.text.trim().to_string())
        .unwrap_or_default();

    Some(WinRmError::SoapFault { code, reason })
}
