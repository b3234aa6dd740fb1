//! 预览/提交：把匹配里的 replacement 应用到磁盘文件

mod patch;

pub use patch::{commit_file, preview_file, read_original};
