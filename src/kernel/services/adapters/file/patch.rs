//! 预览/提交的文件读写
//!
//! 读原始字节 → `splice` → 预览直接返回缓冲区，提交原样写回。

use crate::kernel::services::ports::file::{CommitSummary, PatchError, Result};
use crate::models::{splice, Replacement};
use std::path::Path;

pub async fn read_original(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| PatchError::io(path, e))
}

/// 只生成缓冲区，不落盘。
pub async fn preview_file(path: &Path, replacements: &[Replacement]) -> Result<Vec<u8>> {
    let original = read_original(path).await?;
    Ok(splice(&original, replacements).0)
}

pub async fn commit_file(path: &Path, replacements: &[Replacement]) -> Result<CommitSummary> {
    let original = read_original(path).await?;
    let (patched, applied) = splice(&original, replacements);
    let skipped = replacements.len() - applied;

    if applied > 0 {
        tokio::fs::write(path, &patched)
            .await
            .map_err(|e| PatchError::io(path, e))?;
    }
    tracing::info!(path = %path.display(), applied, skipped, "committed replacements");

    Ok(CommitSummary {
        path: path.to_path_buf(),
        applied,
        skipped,
    })
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/file/patch.rs"]
mod tests;
