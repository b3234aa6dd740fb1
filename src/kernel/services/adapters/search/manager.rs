//! 每个查询流最多一个外部进程
//!
//! 新查询到来时先取消旧进程（不等它退出），再用新的 session id 启动。
//! 旧进程迟到的事件仍带着旧 id，由 `SearchSession` 的 id 比较丢弃。

use super::command::build_command;
use super::process::{ProcessEvent, ProcessHandle, ProcessSession};
use crate::kernel::services::bus::SearchBusSender;
use crate::kernel::services::ports::search::{Query, SearchMessage, SessionError, SessionId};
use std::path::PathBuf;

pub struct SearchSessionManager {
    runtime: tokio::runtime::Handle,
    program: String,
    workspace_root: Option<PathBuf>,
    current_id: SessionId,
    current: Option<ProcessHandle>,
    tx: SearchBusSender,
}

impl SearchSessionManager {
    pub fn new(
        runtime: tokio::runtime::Handle,
        program: impl Into<String>,
        workspace_root: Option<PathBuf>,
        tx: SearchBusSender,
    ) -> Self {
        Self {
            runtime,
            program: program.into(),
            workspace_root,
            current_id: SessionId::default(),
            current: None,
            tx,
        }
    }

    pub fn current_id(&self) -> SessionId {
        self.current_id
    }

    pub fn is_current(&self, session_id: SessionId) -> bool {
        session_id == self.current_id
    }

    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    pub fn workspace_root(&self) -> Option<&PathBuf> {
        self.workspace_root.as_ref()
    }

    pub fn submit(&mut self, query: &Query) -> SessionId {
        self.cancel_current();

        self.current_id = self.current_id.next();
        let session_id = self.current_id;

        let Some(mut invocation) = build_command(&self.program, query) else {
            tracing::debug!(%session_id, "empty query, completing without process");
            self.emit(SearchMessage::Complete {
                session_id,
                total: 0,
            });
            return session_id;
        };

        match self.workspace_root.as_ref() {
            Some(root) => invocation.cwd = Some(root.clone()),
            None if invocation.path_scoped => {
                self.emit(SearchMessage::Error {
                    session_id,
                    error: SessionError::NoWorkspaceRoot,
                });
                return session_id;
            }
            None => {}
        }

        tracing::debug!(%session_id, args = ?invocation.args, "submit search");
        let (handle, mut events) = ProcessSession::start(&self.runtime, invocation);
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let mut total = 0usize;
            while let Some(event) = events.next().await {
                let msg = match event {
                    ProcessEvent::Batch(matches) => {
                        total += matches.len();
                        SearchMessage::Batch {
                            session_id,
                            matches,
                        }
                    }
                    ProcessEvent::Exit(Ok(())) => SearchMessage::Complete { session_id, total },
                    ProcessEvent::Exit(Err(failure)) if failure.is_cancelled() => {
                        SearchMessage::Cancelled { session_id }
                    }
                    ProcessEvent::Exit(Err(failure)) => SearchMessage::Error {
                        session_id,
                        error: failure.into(),
                    },
                };
                if tx.send(msg).is_err() {
                    break;
                }
            }
        });
        self.current = Some(handle);

        session_id
    }

    /// 只发信号，没有同步可见的效果。
    pub fn cancel_current(&mut self) {
        if let Some(mut handle) = self.current.take() {
            tracing::debug!(session_id = %self.current_id, "cancel search");
            handle.cancel();
        }
    }

    /// 当前会话已收到终止事件，释放 handle（进程已退出，不再需要取消）。
    pub fn finish(&mut self, session_id: SessionId) {
        if self.is_current(session_id) {
            self.current = None;
        }
    }

    fn emit(&self, msg: SearchMessage) {
        if self.tx.send(msg).is_err() {
            tracing::warn!("search bus closed");
        }
    }
}

impl Drop for SearchSessionManager {
    fn drop(&mut self) {
        self.cancel_current();
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/search/manager.rs"]
mod tests;
