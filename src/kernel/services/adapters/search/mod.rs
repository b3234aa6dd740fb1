//! 结构化搜索服务模块
//!
//! - command: Query → 外部命令行
//! - decoder: NDJSON 流式解码，跨 chunk 拼接不完整行
//! - process: 单个外部进程的启动/取消/退出判定
//! - manager: 每个查询流最多一个进程，按 session id 打标

mod command;
mod decoder;
mod manager;
mod process;

pub use command::{build_command, is_glob, split_include_filter};
pub use decoder::LineDecoder;
pub use manager::SearchSessionManager;
pub use process::{ProcessEvent, ProcessEvents, ProcessFailure, ProcessHandle, ProcessSession};
