//! 结构化搜索的数据契约
//!
//! - Query: pattern 查询或 rule 查询（二选一）
//! - Match: 外部进程按行输出的一条 JSON 记录
//! - SearchMessage: 带 session id 的流式事件

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::path::PathBuf;
use std::str::FromStr;

/// ast-grep 默认 strictness，构建命令时省略。
pub const DEFAULT_STRICTNESS: Strictness = Strictness::Smart;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    Cst,
    #[default]
    Smart,
    Ast,
    Relaxed,
    Signature,
}

impl Strictness {
    pub fn as_str(self) -> &'static str {
        match self {
            Strictness::Cst => "cst",
            Strictness::Smart => "smart",
            Strictness::Ast => "ast",
            Strictness::Relaxed => "relaxed",
            Strictness::Signature => "signature",
        }
    }
}

impl FromStr for Strictness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cst" => Ok(Strictness::Cst),
            "smart" => Ok(Strictness::Smart),
            "ast" => Ok(Strictness::Ast),
            "relaxed" => Ok(Strictness::Relaxed),
            "signature" => Ok(Strictness::Signature),
            other => Err(format!("unknown strictness: {other}")),
        }
    }
}

impl fmt::Display for Strictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 文本字段为空表示未设置（与搜索面板输入框一致）。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PatternQuery {
    pub pattern: String,
    pub rewrite: String,
    pub strictness: Strictness,
    pub selector: String,
    #[serde(alias = "lang")]
    pub language: String,
    #[serde(alias = "includeFile")]
    pub include_filter: String,
}

impl PatternQuery {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Self::default()
        }
    }

    pub fn with_rewrite(mut self, rewrite: impl Into<String>) -> Self {
        self.rewrite = rewrite.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_include(mut self, include_filter: impl Into<String>) -> Self {
        self.include_filter = include_filter.into();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleQuery {
    #[serde(alias = "yaml")]
    pub rule_definition: String,
    #[serde(default, alias = "includeFile")]
    pub include_filter: String,
}

/// 有 rule 定义字段的是 rule 查询，否则是 pattern 查询。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Query {
    Rule(RuleQuery),
    Pattern(PatternQuery),
}

impl Query {
    pub fn pattern(pattern: impl Into<String>) -> Self {
        Query::Pattern(PatternQuery::new(pattern))
    }

    pub fn rule(rule_definition: impl Into<String>) -> Self {
        Query::Rule(RuleQuery {
            rule_definition: rule_definition.into(),
            include_filter: String::new(),
        })
    }

    /// pattern 或 rule 正文
    pub fn search_text(&self) -> &str {
        match self {
            Query::Pattern(q) => &q.pattern,
            Query::Rule(q) => &q.rule_definition,
        }
    }

    pub fn include_filter(&self) -> &str {
        match self {
            Query::Pattern(q) => &q.include_filter,
            Query::Rule(q) => &q.include_filter,
        }
    }

    pub fn has_rewrite(&self) -> bool {
        match self {
            Query::Pattern(q) => !q.rewrite.is_empty(),
            // rule 里的 fix 由引擎决定，replacement 字段是否出现以输出为准
            Query::Rule(_) => true,
        }
    }
}

impl From<PatternQuery> for Query {
    fn from(q: PatternQuery) -> Self {
        Query::Pattern(q)
    }
}

impl From<RuleQuery> for Query {
    fn from(q: RuleQuery) -> Self {
        Query::Rule(q)
    }
}

/// 零基行号；column 以 UTF-16 code unit 计。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// 把 UTF-16 column 换算成 `line` 内的字节下标（越界时截到行尾）。
    pub fn byte_in_line(&self, line: &str) -> usize {
        let mut units = 0usize;
        for (idx, ch) in line.char_indices() {
            if units >= self.column {
                return idx;
            }
            units += ch.len_utf16();
        }
        line.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteOffset {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeInfo {
    pub byte_offset: ByteOffset,
    pub start: Position,
    pub end: Position,
}

impl RangeInfo {
    pub fn new(bytes: Range<usize>, start: Position, end: Position) -> Self {
        Self {
            byte_offset: ByteOffset {
                start: bytes.start,
                end: bytes.end,
            },
            start,
            end,
        }
    }

    pub fn byte_range(&self) -> Range<usize> {
        self.byte_offset.start..self.byte_offset.end
    }

    pub fn is_multiline(&self) -> bool {
        self.end.line > self.start.line
    }
}

/// 外部进程 `--json=stream` 输出的一条记录（未知字段忽略）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub text: String,
    pub range: RangeInfo,
    #[serde(rename = "file")]
    pub file_path: String,
    #[serde(rename = "lines", default)]
    pub line_context: String,
    #[serde(default)]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
}

/// 单调递增、按 `SESSION_ID_MODULUS` 回绕的会话标识。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SessionId(u32);

pub const SESSION_ID_MODULUS: u32 = 1 << 31;

impl SessionId {
    pub fn new(raw: u32) -> Self {
        Self(raw % SESSION_ID_MODULUS)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn next(self) -> Self {
        Self((self.0 + 1) % SESSION_ID_MODULUS)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 要执行的外部命令（纯数据，不做 I/O）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// 参数里带了 include 路径/glob，必须在 workspace root 下执行
    pub path_scoped: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExitInfo {
    pub code: Option<i32>,
    pub signal: Option<i32>,
    pub stderr: Option<String>,
}

impl fmt::Display for ExitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (_, Some(signal)) => write!(f, "terminated by signal {signal}")?,
            (Some(code), None) => write!(f, "exited with code {code}")?,
            (None, None) => write!(f, "exited abnormally")?,
        }
        if let Some(stderr) = self.stderr.as_deref().filter(|s| !s.is_empty()) {
            write!(f, ": {stderr}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("failed to start {program}: {message}")]
    Spawn { program: String, message: String },
    #[error("search process {0}")]
    Exit(ExitInfo),
    #[error("no workspace root to resolve include filter")]
    NoWorkspaceRoot,
    #[error("IO error: {0}")]
    Io(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchMessage {
    Batch {
        session_id: SessionId,
        matches: Vec<Match>,
    },
    Complete {
        session_id: SessionId,
        total: usize,
    },
    Cancelled {
        session_id: SessionId,
    },
    Error {
        session_id: SessionId,
        error: SessionError,
    },
}

impl SearchMessage {
    pub fn session_id(&self) -> SessionId {
        match self {
            SearchMessage::Batch { session_id, .. }
            | SearchMessage::Complete { session_id, .. }
            | SearchMessage::Cancelled { session_id }
            | SearchMessage::Error { session_id, .. } => *session_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SearchMessage::Batch { .. })
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/ports/search.rs"]
mod tests;
