use crate::kernel::services::ports::{
    DisplaySettings, Match, Query, SearchMessage, SessionError, SessionId,
};
use std::ops::Range;

const ELLIPSIS: &str = "...";

/// 结果列表里一条匹配的紧凑展示；总是由 `Match` 重新计算得出。
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayMatch {
    pub source: Match,
    pub display_line: String,
    /// `display_line` 内的高亮字节区间
    pub highlight: Range<usize>,
}

impl DisplayMatch {
    pub fn project(source: Match, display: &DisplaySettings) -> Self {
        let (display_line, highlight) = display_line_for(&source, display);
        Self {
            source,
            display_line,
            highlight,
        }
    }

    pub fn file_path(&self) -> &str {
        &self.source.file_path
    }

    pub fn highlighted(&self) -> &str {
        &self.display_line[self.highlight.clone()]
    }
}

/// 多行匹配只展示首行；去掉行首空白；高亮起点太靠右时左侧省略，
/// 高亮之后太长时右侧截断。
fn display_line_for(m: &Match, display: &DisplaySettings) -> (String, Range<usize>) {
    let line = m
        .line_context
        .split('\n')
        .next()
        .unwrap_or_default()
        .trim_end_matches('\r');

    let mut start = m.range.start.byte_in_line(line);
    let mut end = if m.range.is_multiline() {
        line.len()
    } else {
        m.range.end.byte_in_line(line).max(start)
    };

    let mut text = line.trim_start();
    let lead = line.len() - text.len();
    start = start.saturating_sub(lead);
    end = end.saturating_sub(lead);

    let mut prefix = "";
    let start_chars = text[..start].chars().count();
    if start_chars > display.elide_after {
        let keep = display.context_before.min(start_chars);
        let cut = nth_char_boundary(text, start_chars - keep);
        text = &text[cut..];
        start -= cut;
        end -= cut;
        prefix = ELLIPSIS;
    }

    let mut suffix = "";
    let tail = &text[end..];
    if tail.chars().count() > display.context_after {
        let cut = end + nth_char_boundary(tail, display.context_after);
        text = &text[..cut];
        suffix = ELLIPSIS;
    }

    let mut out = String::with_capacity(prefix.len() + text.len() + suffix.len());
    out.push_str(prefix);
    out.push_str(text);
    out.push_str(suffix);
    let shift = prefix.len();
    (out, start + shift..end + shift)
}

fn nth_char_boundary(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileResults {
    pub path: String,
    pub matches: Vec<DisplayMatch>,
}

#[derive(Debug, Clone)]
pub struct SearchState {
    display: DisplaySettings,
    query: Option<Query>,
    session_id: Option<SessionId>,
    searching: bool,
    /// 新会话已提交但旧结果还在显示；第一批结果或终止事件到来时才清空
    stale: bool,
    files: Vec<FileResults>,
    total_matches: usize,
    last_error: Option<SessionError>,
}

pub struct SearchResultsSnapshot<'a> {
    pub query: Option<&'a Query>,
    pub session_id: Option<SessionId>,
    pub searching: bool,
    pub stale: bool,
    pub total_matches: usize,
    pub file_count: usize,
    pub files: &'a [FileResults],
    pub last_error: Option<&'a SessionError>,
}

impl Default for SearchState {
    fn default() -> Self {
        Self::new(DisplaySettings::default())
    }
}

impl SearchState {
    pub fn new(display: DisplaySettings) -> Self {
        Self {
            display,
            query: None,
            session_id: None,
            searching: false,
            stale: false,
            files: Vec::new(),
            total_matches: 0,
            last_error: None,
        }
    }

    pub fn snapshot(&self) -> SearchResultsSnapshot<'_> {
        SearchResultsSnapshot {
            query: self.query.as_ref(),
            session_id: self.session_id,
            searching: self.searching,
            stale: self.stale,
            total_matches: self.total_matches,
            file_count: self.files.len(),
            files: &self.files,
            last_error: self.last_error.as_ref(),
        }
    }

    pub fn files(&self) -> &[FileResults] {
        &self.files
    }

    pub fn file(&self, path: &str) -> Option<&FileResults> {
        self.position(path).ok().map(|idx| &self.files[idx])
    }

    pub fn is_searching(&self) -> bool {
        self.searching
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn total_matches(&self) -> usize {
        self.total_matches
    }

    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    /// 不立即清空，避免提交查询到首批结果之间闪一下空列表。
    pub fn begin_search(&mut self, session_id: SessionId, query: Query) {
        self.session_id = Some(session_id);
        self.query = Some(query);
        self.searching = true;
        self.stale = true;
    }

    /// 调用方负责 session id 过滤。
    pub fn apply_message(&mut self, msg: SearchMessage) -> bool {
        match msg {
            SearchMessage::Batch { matches, .. } => self.merge_batch(matches),
            SearchMessage::Complete { .. } | SearchMessage::Cancelled { .. } => {
                let changed = self.searching || self.stale;
                self.drop_stale();
                self.searching = false;
                changed
            }
            SearchMessage::Error { error, .. } => {
                self.drop_stale();
                self.searching = false;
                self.last_error = Some(error);
                true
            }
        }
    }

    /// 空 batch 不算“首批结果”，旧结果继续显示。
    pub fn merge_batch(&mut self, matches: Vec<Match>) -> bool {
        if matches.is_empty() {
            return false;
        }
        self.drop_stale();

        self.total_matches += matches.len();
        for m in matches {
            let dm = DisplayMatch::project(m, &self.display);
            match self.position(dm.file_path()) {
                Ok(idx) => self.files[idx].matches.push(dm),
                Err(idx) => self.files.insert(
                    idx,
                    FileResults {
                        path: dm.file_path().to_string(),
                        matches: vec![dm],
                    },
                ),
            }
        }
        true
    }

    /// 整体替换一个文件的匹配；列表为空则删除该文件。
    pub fn refresh_file(&mut self, path: &str, matches: Vec<Match>) -> bool {
        let projected: Vec<DisplayMatch> = matches
            .into_iter()
            .map(|m| DisplayMatch::project(m, &self.display))
            .collect();

        let changed = match (self.position(path), projected.is_empty()) {
            (Ok(idx), true) => {
                self.files.remove(idx);
                true
            }
            (Ok(idx), false) => {
                self.files[idx].matches = projected;
                true
            }
            (Err(_), true) => false,
            (Err(idx), false) => {
                self.files.insert(
                    idx,
                    FileResults {
                        path: path.to_string(),
                        matches: projected,
                    },
                );
                true
            }
        };
        self.recount();
        changed
    }

    pub fn dismiss_match(&mut self, path: &str, index: usize) -> Option<DisplayMatch> {
        let idx = self.position(path).ok()?;
        let file = &mut self.files[idx];
        if index >= file.matches.len() {
            return None;
        }
        let removed = file.matches.remove(index);
        if file.matches.is_empty() {
            self.files.remove(idx);
        }
        self.total_matches -= 1;
        Some(removed)
    }

    pub fn dismiss_file(&mut self, path: &str) -> Option<FileResults> {
        let idx = self.position(path).ok()?;
        let removed = self.files.remove(idx);
        self.total_matches -= removed.matches.len();
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.total_matches = 0;
        self.last_error = None;
        self.stale = false;
    }

    fn drop_stale(&mut self) {
        if self.stale {
            self.clear();
        }
    }

    fn recount(&mut self) {
        self.total_matches = self.files.iter().map(|f| f.matches.len()).sum();
    }

    /// `files` 始终按 path 字典序排列
    fn position(&self, path: &str) -> Result<usize, usize> {
        self.files
            .binary_search_by(|f| f.path.as_str().cmp(path))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/search.rs"]
mod tests;
