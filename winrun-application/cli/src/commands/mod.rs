//! CLI 命令处理模块

pub mod exec; // 构造会话并分派命令
pub mod output; // 结果输出
