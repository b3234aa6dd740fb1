//! zsg - ast-grep 结构化搜索会话库
//!
//! 模块结构：
//! - kernel: 会话（进程管理 + 结果聚合）与服务层（ports + adapters）
//! - models: 纯数据算法（字节区间替换）

pub mod kernel;
pub mod models;
