//! 按字节区间替换
//!
//! 预览和提交走同一个 `apply_replacements`，保证两者结果一致。
//! 未被替换的字节原样复制，不做任何编码解释。

use crate::kernel::services::ports::Match;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// 原始内容中的字节区间
    pub range: Range<usize>,
    pub text: String,
}

impl Replacement {
    pub fn new(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    /// 没有 replacement 的匹配不产生替换
    pub fn from_match(m: &Match) -> Option<Self> {
        let text = m.replacement.as_ref()?;
        Some(Self {
            range: m.range.byte_range(),
            text: text.clone(),
        })
    }
}

/// 从同一文件的匹配里收集替换，按起点升序。
pub fn replacements_for<'a>(matches: impl IntoIterator<Item = &'a Match>) -> Vec<Replacement> {
    let mut out: Vec<Replacement> = matches
        .into_iter()
        .filter_map(Replacement::from_match)
        .collect();
    out.sort_by_key(|r| r.range.start);
    out
}

/// `replacements` 须按 `range.start` 升序且互不重叠。起点落在已写游标之前
/// （重叠或乱序）或越界的替换被跳过，输出不会被破坏。
pub fn apply_replacements(original: &[u8], replacements: &[Replacement]) -> Vec<u8> {
    splice(original, replacements).0
}

/// 同 `apply_replacements`，另返回实际生效的替换数。
pub fn splice(original: &[u8], replacements: &[Replacement]) -> (Vec<u8>, usize) {
    let mut out = Vec::with_capacity(original.len());
    let mut cursor = 0usize;
    let mut applied = 0usize;

    for r in replacements {
        let (start, end) = (r.range.start, r.range.end);
        if start < cursor || start > end || end > original.len() {
            tracing::warn!(
                start,
                end,
                cursor,
                len = original.len(),
                "skipping overlapping or out-of-range replacement"
            );
            continue;
        }
        out.extend_from_slice(&original[cursor..start]);
        out.extend_from_slice(r.text.as_bytes());
        cursor = end;
        applied += 1;
    }

    out.extend_from_slice(&original[cursor..]);
    (out, applied)
}

#[cfg(test)]
#[path = "../../tests/unit/models/patch.rs"]
mod tests;
