//! 一个查询流的完整会话：进程管理 + 结果聚合 + 预览/提交
//!
//! 事件都在持有 `SearchSession` 的线程上处理；“是否属于当前会话”只在
//! `handle_message` 里判断一次。

use crate::kernel::search::{FileResults, SearchState};
use crate::kernel::services::adapters::file::{commit_file, preview_file};
use crate::kernel::services::adapters::search::SearchSessionManager;
use crate::kernel::services::bus::{search_bus, SearchBusReceiver};
use crate::kernel::services::ports::file::{CommitSummary, PatchError};
use crate::kernel::services::ports::{Query, SearchMessage, SessionId, Settings};
use crate::models::{replacements_for, Replacement};
use std::path::{Path, PathBuf};
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

pub struct SearchSession {
    runtime: tokio::runtime::Handle,
    manager: SearchSessionManager,
    results: SearchState,
    rx: SearchBusReceiver,
}

impl SearchSession {
    pub fn new(
        runtime: tokio::runtime::Handle,
        settings: &Settings,
        workspace_root: Option<PathBuf>,
    ) -> Self {
        let (tx, rx) = search_bus();
        let manager = SearchSessionManager::new(
            runtime.clone(),
            settings.executable.clone(),
            workspace_root,
            tx,
        );
        Self {
            runtime,
            manager,
            results: SearchState::new(settings.display),
            rx,
        }
    }

    /// 返回的 id 就是这次查询的关联键：之后所有事件都带着它。
    pub fn submit(&mut self, query: Query) -> SessionId {
        let session_id = self.manager.submit(&query);
        self.results.begin_search(session_id, query);
        session_id
    }

    pub fn cancel(&mut self) {
        self.manager.cancel_current();
    }

    pub fn current_id(&self) -> SessionId {
        self.manager.current_id()
    }

    pub fn results(&self) -> &SearchState {
        &self.results
    }

    /// 被取代会话的迟到事件在这里丢弃。
    pub fn handle_message(&mut self, msg: SearchMessage) -> bool {
        let session_id = msg.session_id();
        if !self.manager.is_current(session_id) {
            tracing::trace!(%session_id, current = %self.manager.current_id(), "drop stale search event");
            return false;
        }
        if msg.is_terminal() {
            self.manager.finish(session_id);
        }
        self.results.apply_message(msg)
    }

    /// 处理所有已到达的事件，返回状态是否变化。
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        while let Ok(msg) = self.rx.try_recv() {
            changed |= self.handle_message(msg);
        }
        changed
    }

    /// 阻塞到当前会话结束或超时；返回是否已结束。
    pub fn wait_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.results.is_searching() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(msg) => {
                    self.handle_message(msg);
                }
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => return !self.results.is_searching(),
            }
        }
        true
    }

    /// 等待一个事件（不论是否属于当前会话）；超时返回 `None`。
    pub fn wait_message(&mut self, timeout: Duration) -> Option<bool> {
        match self.rx.recv_timeout(timeout) {
            Ok(msg) => Some(self.handle_message(msg)),
            Err(_) => None,
        }
    }

    pub fn preview_file(&self, path: &str) -> Result<Vec<u8>, PatchError> {
        let (abs, replacements) = self.replacements_for_file(path)?;
        self.runtime.block_on(preview_file(&abs, &replacements))
    }

    /// 写盘后该文件的结果被清掉：旧的字节偏移已经失效。
    pub fn commit_file(&mut self, path: &str) -> Result<CommitSummary, PatchError> {
        if self.results.is_searching() {
            return Err(PatchError::SearchInProgress);
        }
        let (abs, replacements) = self.replacements_for_file(path)?;
        let summary = self.runtime.block_on(commit_file(&abs, &replacements))?;
        self.results.refresh_file(path, Vec::new());
        Ok(summary)
    }

    pub fn commit_all(&mut self) -> Result<Vec<CommitSummary>, PatchError> {
        if self.results.is_searching() {
            return Err(PatchError::SearchInProgress);
        }
        let paths: Vec<String> = self
            .results
            .files()
            .iter()
            .filter(|f| f.matches.iter().any(|m| m.source.replacement.is_some()))
            .map(|f| f.path.clone())
            .collect();

        let mut summaries = Vec::with_capacity(paths.len());
        for path in paths {
            summaries.push(self.commit_file(&path)?);
        }
        Ok(summaries)
    }

    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        match self.manager.workspace_root() {
            Some(root) if p.is_relative() => root.join(p),
            _ => p.to_path_buf(),
        }
    }

    fn replacements_for_file(&self, path: &str) -> Result<(PathBuf, Vec<Replacement>), PatchError> {
        let file: &FileResults = self
            .results
            .file(path)
            .ok_or_else(|| PatchError::UnknownFile(path.to_string()))?;
        let replacements = replacements_for(file.matches.iter().map(|m| &m.source));
        Ok((self.resolve_path(path), replacements))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/session.rs"]
mod tests;
