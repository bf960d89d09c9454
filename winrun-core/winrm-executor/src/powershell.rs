//! PowerShell 命令编码与 CLIXML 错误流清理

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::soap::parse_nodes;

const CLIXML_PREFIX: &[u8] = b"#< CLIXML\r\n";
const CLIXML_LINE_BREAK: &str = "_x000D__x000A_";

/// 将脚本编码为 `-EncodedCommand` 参数（UTF-16LE + base64）
pub fn encode_script(script: &str) -> String {
    let bytes: Vec<u8> = script
        .encode_utf16()
        .flat_map(|unit| unit.to_le_bytes())
        .collect();
    BASE64.encode(bytes)
}

/// 生成执行脚本的 powershell 命令行
pub fn encoded_command_line(script: &str) -> String {
    format!("powershell -encodedcommand {}", encode_script(script))
}

/// 将 CLIXML 序列化的错误流还原为纯文本
///
/// 非 CLIXML 内容或解析失败时原样返回。
pub fn clean_error_stream(stderr: &[u8]) -> Vec<u8> {
    let Some(xml) = stderr.strip_prefix(CLIXML_PREFIX) else {
        return stderr.to_vec();
    };

    let xml = String::from_utf8_lossy(xml);
    let nodes = match parse_nodes(&xml) {
        Ok(nodes) => nodes,
        Err(_) => return stderr.to_vec(),
    };

    let message: String = nodes
        .iter()
        .filter(|n| n.name == "S" && n.parent.as_deref() == Some("Objs"))
        .map(|n| n.text.replace(CLIXML_LINE_BREAK, "\n"))
        .collect();

    if message.trim().is_empty() {
        stderr.to_vec()
    } else {
        message.trim().as_bytes().to_vec()
    }
}
