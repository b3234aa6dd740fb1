//! NDJSON 流式解码
//!
//! 进程输出的 chunk 边界可能落在一行中间：不完整的尾行留在 `pending` 里，
//! 和下一个 chunk 拼起来再解析。

use serde::de::DeserializeOwned;
use std::marker::PhantomData;

const PREVIEW_LEN: usize = 120;

pub struct LineDecoder<T> {
    pending: Vec<u8>,
    dropped: usize,
    _record: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> LineDecoder<T> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            dropped: 0,
            _record: PhantomData,
        }
    }

    /// 返回这个 chunk 补齐后能解析出的全部记录，按输出顺序。
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<T> {
        self.pending.extend_from_slice(chunk);

        let mut records = Vec::new();
        let mut consumed = 0usize;
        for nl in memchr::memchr_iter(b'\n', &self.pending) {
            let line = trim_cr(&self.pending[consumed..nl]);
            match serde_json::from_slice::<T>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    if !is_blank(line) {
                        self.dropped += 1;
                        tracing::warn!(
                            error = %e,
                            line = %preview(line),
                            "dropping malformed search output line"
                        );
                    }
                }
            }
            consumed = nl + 1;
        }

        // 尾段：能解析就直接产出，否则当作被截断的一行留到下次
        let tail = &self.pending[consumed..];
        if !tail.is_empty() {
            if let Ok(record) = serde_json::from_slice::<T>(tail) {
                records.push(record);
                consumed = self.pending.len();
            }
        }

        self.pending.drain(..consumed);
        records
    }

    pub fn feed_str(&mut self, chunk: &str) -> Vec<T> {
        self.feed(chunk.as_bytes())
    }

    /// 输出流结束：最后再试一次尾行，仍失败则丢弃。
    pub fn finish(&mut self) -> Vec<T> {
        let tail = std::mem::take(&mut self.pending);
        let line = trim_cr(&tail);
        if is_blank(line) {
            return Vec::new();
        }
        match serde_json::from_slice::<T>(line) {
            Ok(record) => vec![record],
            Err(e) => {
                self.dropped += 1;
                tracing::warn!(
                    error = %e,
                    line = %preview(line),
                    "search output ended with a partial line"
                );
                Vec::new()
            }
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// 被丢弃的完整行数（不含仍在缓冲的尾行）
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl<T: DeserializeOwned> Default for LineDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

fn preview(line: &[u8]) -> String {
    let end = line.len().min(PREVIEW_LEN);
    String::from_utf8_lossy(&line[..end]).into_owned()
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/search/decoder.rs"]
mod tests;
