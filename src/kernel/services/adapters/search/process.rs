//! 外部搜索进程的生命周期
//!
//! `start` 立刻返回 (handle, events)：进程在 runtime 上被拉起，stdout 每读到一个
//! chunk 就经 `LineDecoder` 解码并作为一个 batch 推出，最后推出唯一的 `Exit`。
//! `cancel` 只发终止信号，结果仍由进程自己的退出驱动。

use super::decoder::LineDecoder;
use crate::kernel::services::ports::search::{ExitInfo, Invocation, Match, SessionError};
use std::collections::VecDeque;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::{mpsc, oneshot};

const READ_CHUNK: usize = 8 * 1024;
const STDERR_TAIL_LINES: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    Batch(Vec<Match>),
    Exit(Result<(), ProcessFailure>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessFailure {
    #[error("failed to start {program}: {message}")]
    Spawn { program: String, message: String },
    #[error("search process cancelled ({0})")]
    Cancelled(ExitInfo),
    #[error("search process {0}")]
    Exit(ExitInfo),
    #[error("IO error: {0}")]
    Io(String),
}

impl ProcessFailure {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProcessFailure::Cancelled(_))
    }
}

impl From<ProcessFailure> for SessionError {
    fn from(failure: ProcessFailure) -> Self {
        match failure {
            ProcessFailure::Spawn { program, message } => SessionError::Spawn { program, message },
            ProcessFailure::Cancelled(info) | ProcessFailure::Exit(info) => SessionError::Exit(info),
            ProcessFailure::Io(message) => SessionError::Io(message),
        }
    }
}

/// 持有者丢弃 handle 等同于 cancel：取消通道关闭即终止进程。
#[derive(Debug)]
pub struct ProcessHandle {
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl ProcessHandle {
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }
}

pub struct ProcessEvents {
    rx: mpsc::UnboundedReceiver<ProcessEvent>,
}

impl ProcessEvents {
    /// `Exit` 之后返回 `None`。
    pub async fn next(&mut self) -> Option<ProcessEvent> {
        self.rx.recv().await
    }
}

#[cfg(test)]
impl ProcessEvents {
    /// 等到进程结束，收集全部匹配。
    async fn collect(mut self) -> Result<Vec<Match>, ProcessFailure> {
        let mut all = Vec::new();
        while let Some(event) = self.next().await {
            match event {
                ProcessEvent::Batch(matches) => all.extend(matches),
                ProcessEvent::Exit(result) => return result.map(|()| all),
            }
        }
        Err(ProcessFailure::Io("search process task ended without exit".to_string()))
    }
}

pub struct ProcessSession;

impl ProcessSession {
    pub fn start(
        runtime: &tokio::runtime::Handle,
        invocation: Invocation,
    ) -> (ProcessHandle, ProcessEvents) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();

        runtime.spawn(run_process(invocation, event_tx, cancel_rx));

        (
            ProcessHandle {
                cancel_tx: Some(cancel_tx),
            },
            ProcessEvents { rx: event_rx },
        )
    }
}

async fn run_process(
    invocation: Invocation,
    event_tx: mpsc::UnboundedSender<ProcessEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = invocation.cwd.as_ref() {
        cmd.current_dir(cwd);
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            tracing::error!(error = %e, program = %invocation.program, "spawn search process failed");
            let _ = event_tx.send(ProcessEvent::Exit(Err(ProcessFailure::Spawn {
                program: invocation.program.clone(),
                message: e.to_string(),
            })));
            return;
        }
    };
    tracing::debug!(pid = ?child.id(), program = %invocation.program, "search process started");

    let stderr_task = child.stderr.take().map(|s| tokio::spawn(stderr_loop(s)));
    let Some(mut stdout) = child.stdout.take() else {
        tracing::error!("search process stdout unavailable");
        terminate(&mut child);
        let _ = child.wait().await;
        let _ = event_tx.send(ProcessEvent::Exit(Err(ProcessFailure::Io(
            "stdout unavailable".to_string(),
        ))));
        return;
    };

    let mut decoder = LineDecoder::<Match>::new();
    let mut buf = vec![0u8; READ_CHUNK];
    let mut cancelled = false;
    let mut read_error = None;

    loop {
        tokio::select! {
            read = stdout.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => {
                    let records = decoder.feed(&buf[..n]);
                    if !records.is_empty() && event_tx.send(ProcessEvent::Batch(records)).is_err() {
                        // 消费者已经不在了
                        terminate(&mut child);
                        cancelled = true;
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "read search process stdout failed");
                    read_error = Some(e.to_string());
                    break;
                }
            },
            _ = &mut cancel_rx => {
                terminate(&mut child);
                cancelled = true;
                break;
            }
        }
    }

    if !cancelled {
        let tail = decoder.finish();
        if !tail.is_empty() {
            let _ = event_tx.send(ProcessEvent::Batch(tail));
        }
    }

    // stdout 关闭不代表进程已退出：等待期间仍要响应 cancel
    let status = if cancelled {
        child.wait().await
    } else {
        let waited = tokio::select! {
            status = child.wait() => Some(status),
            _ = &mut cancel_rx => None,
        };
        match waited {
            Some(status) => status,
            None => {
                terminate(&mut child);
                cancelled = true;
                child.wait().await
            }
        }
    };
    let stderr = match stderr_task {
        Some(task) => task.await.ok().flatten(),
        None => None,
    };

    let outcome = match status {
        Ok(status) => {
            tracing::debug!(%status, cancelled, "search process exited");
            resolve_exit(status, stderr, cancelled, read_error)
        }
        Err(e) => Err(ProcessFailure::Io(e.to_string())),
    };
    let _ = event_tx.send(ProcessEvent::Exit(outcome));
}

/// 只有“退出码为 0 且不是被信号终止”才算成功。
fn resolve_exit(
    status: ExitStatus,
    stderr: Option<String>,
    cancelled: bool,
    read_error: Option<String>,
) -> Result<(), ProcessFailure> {
    let info = ExitInfo {
        code: status.code(),
        signal: exit_signal(&status),
        stderr,
    };

    if cancelled {
        return Err(ProcessFailure::Cancelled(info));
    }
    if let Some(message) = read_error {
        return Err(ProcessFailure::Io(message));
    }
    if info.code == Some(0) && info.signal.is_none() {
        return Ok(());
    }
    Err(ProcessFailure::Exit(info))
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // pid 属于尚未被 wait 回收的子进程
        let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if ret == 0 {
            return;
        }
        tracing::warn!(pid, error = %std::io::Error::last_os_error(), "SIGTERM search process failed");
    }

    if let Err(e) = child.start_kill() {
        tracing::warn!(error = %e, "kill search process failed");
    }
}

async fn stderr_loop(stderr: ChildStderr) -> Option<String> {
    let mut lines = BufReader::new(stderr).lines();
    let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim_end().to_string();
        if line.is_empty() {
            continue;
        }
        tracing::info!("search stderr: {}", line);
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    if tail.is_empty() {
        None
    } else {
        Some(Vec::from(tail).join("\n"))
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/search/process.rs"]
mod tests;
