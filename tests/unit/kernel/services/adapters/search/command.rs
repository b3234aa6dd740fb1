use super::*;
use crate::kernel::services::ports::search::Strictness;

fn args(invocation: &Invocation) -> Vec<&str> {
    invocation.args.iter().map(String::as_str).collect()
}

#[test]
fn test_empty_query_builds_nothing() {
    assert!(build_command("sg", &Query::pattern("")).is_none());
    assert!(build_command("sg", &Query::rule("")).is_none());
}

#[test]
fn test_pattern_minimal() {
    let inv = build_command("ast-grep", &Query::pattern("console.log($A)")).unwrap();
    assert_eq!(inv.program, "ast-grep");
    assert_eq!(
        args(&inv),
        vec!["run", "--pattern", "console.log($A)", "--json=stream"]
    );
    assert!(!inv.path_scoped);
    assert!(inv.cwd.is_none());
}

#[test]
fn test_pattern_all_flags() {
    let query = Query::Pattern(PatternQuery {
        pattern: "foo($A)".to_string(),
        rewrite: "bar($A)".to_string(),
        strictness: Strictness::Relaxed,
        selector: "call_expression".to_string(),
        language: "ts".to_string(),
        include_filter: String::new(),
    });
    let inv = build_command("sg", &query).unwrap();
    assert_eq!(
        args(&inv),
        vec![
            "run",
            "--pattern",
            "foo($A)",
            "--rewrite",
            "bar($A)",
            "--selector",
            "call_expression",
            "--strictness",
            "relaxed",
            "--lang",
            "ts",
            "--json=stream",
        ]
    );
}

#[test]
fn test_default_strictness_omitted() {
    let mut q = PatternQuery::new("x");
    q.strictness = Strictness::Smart;
    let inv = build_command("sg", &q.into()).unwrap();
    assert!(!inv.args.iter().any(|a| a == "--strictness"));
}

#[test]
fn test_plain_paths_when_no_glob() {
    let query = PatternQuery::new("x").with_include(" src, tests ,,lib.rs ");
    let inv = build_command("sg", &query.into()).unwrap();
    assert_eq!(
        args(&inv),
        vec!["run", "--pattern", "x", "--json=stream", "src", "tests", "lib.rs"]
    );
    assert!(inv.path_scoped);
}

#[test]
fn test_all_tokens_become_globs_when_any_is_glob() {
    let query = PatternQuery::new("x").with_include("src,**/*.ts");
    let inv = build_command("sg", &query.into()).unwrap();
    assert_eq!(
        args(&inv),
        vec![
            "run",
            "--pattern",
            "x",
            "--json=stream",
            "--globs",
            "src",
            "--globs",
            "**/*.ts",
        ]
    );
}

#[test]
fn test_rule_query_uses_inline_rules() {
    let rule = "id: no-console\nlanguage: js\nrule:\n  pattern: console.log($A)\n";
    let query = Query::Rule(RuleQuery {
        rule_definition: rule.to_string(),
        include_filter: "web".to_string(),
    });
    let inv = build_command("sg", &query).unwrap();
    assert_eq!(
        args(&inv),
        vec!["scan", "--inline-rules", rule, "--json=stream", "web"]
    );
}

#[test]
fn test_glob_detection() {
    assert!(is_glob("*.rs"));
    assert!(is_glob("src/{a,b}"));
    assert!(is_glob("file?.ts"));
    assert!(is_glob("[ab].js"));
    assert!(!is_glob("src/lib.rs"));
    assert!(split_include_filter(" , ").is_empty());
}
