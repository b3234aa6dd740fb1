use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_executable")]
    pub executable: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
    #[serde(default)]
    pub display: DisplaySettings,
}

fn default_executable() -> String {
    "ast-grep".to_string()
}

/// 结果列表里单行匹配的截断窗口（按字符计）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// 高亮起点超过这个列数才在左侧省略
    pub elide_after: usize,
    pub context_before: usize,
    pub context_after: usize,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            elide_after: 30,
            context_before: 25,
            context_after: 50,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            log_filter: None,
            display: DisplaySettings::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings: {0}")]
    Parse(#[from] serde_json::Error),
}
