//! Query → 外部命令行
//!
//! 纯函数，不做 I/O。include filter 要么全部作为 `--globs`，要么全部作为路径参数：
//! 引擎的 CLI 上这两种写法互斥。

use crate::kernel::services::ports::search::{
    Invocation, PatternQuery, Query, RuleQuery, DEFAULT_STRICTNESS,
};

const STREAM_FLAG: &str = "--json=stream";
const GLOB_CHARS: &[char] = &['*', '?', '[', '{'];

/// 查询正文为空时返回 `None`：不是错误，表示没有东西可跑。
pub fn build_command(program: &str, query: &Query) -> Option<Invocation> {
    if query.search_text().is_empty() {
        return None;
    }

    let mut args = match query {
        Query::Pattern(q) => pattern_args(q),
        Query::Rule(q) => rule_args(q),
    };

    let filters = split_include_filter(query.include_filter());
    let path_scoped = !filters.is_empty();
    push_include_args(&mut args, &filters);

    Some(Invocation {
        program: program.to_string(),
        args,
        cwd: None,
        path_scoped,
    })
}

fn pattern_args(q: &PatternQuery) -> Vec<String> {
    let mut args = vec!["run".to_string(), "--pattern".to_string(), q.pattern.clone()];
    if !q.rewrite.is_empty() {
        args.push("--rewrite".to_string());
        args.push(q.rewrite.clone());
    }
    if !q.selector.is_empty() {
        args.push("--selector".to_string());
        args.push(q.selector.clone());
    }
    if q.strictness != DEFAULT_STRICTNESS {
        args.push("--strictness".to_string());
        args.push(q.strictness.as_str().to_string());
    }
    if !q.language.is_empty() {
        args.push("--lang".to_string());
        args.push(q.language.clone());
    }
    args.push(STREAM_FLAG.to_string());
    args
}

fn rule_args(q: &RuleQuery) -> Vec<String> {
    vec![
        "scan".to_string(),
        "--inline-rules".to_string(),
        q.rule_definition.clone(),
        STREAM_FLAG.to_string(),
    ]
}

pub fn split_include_filter(filter: &str) -> Vec<&str> {
    filter
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn is_glob(token: &str) -> bool {
    token.contains(GLOB_CHARS)
}

fn push_include_args(args: &mut Vec<String>, filters: &[&str]) {
    if filters.iter().any(|f| is_glob(f)) {
        for f in filters {
            args.push("--globs".to_string());
            args.push((*f).to_string());
        }
    } else {
        args.extend(filters.iter().map(|f| (*f).to_string()));
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/search/command.rs"]
mod tests;
