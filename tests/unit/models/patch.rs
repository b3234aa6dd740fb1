use super::*;
use crate::kernel::services::ports::{Position, RangeInfo};
use proptest::prelude::*;

fn rep(range: Range<usize>, text: &str) -> Replacement {
    Replacement::new(range, text)
}

#[test]
fn test_rewrites_console_log_calls() {
    let original = b"console.log(1);\nconsole.log(2);\n";
    let reps = vec![rep(0..14, "logger.info(1)"), rep(16..30, "logger.info(2)")];
    let (out, applied) = splice(original, &reps);
    assert_eq!(out, b"logger.info(1);\nlogger.info(2);\n");
    assert_eq!(applied, 2);
}

#[test]
fn test_no_replacements_is_identity() {
    let original = "fn main() {}\n".as_bytes();
    assert_eq!(apply_replacements(original, &[]), original);
}

#[test]
fn test_overlapping_replacement_is_skipped() {
    let original = b"abcdefgh";
    let reps = vec![rep(0..4, "X"), rep(2..6, "Y")];
    let (out, applied) = splice(original, &reps);
    assert_eq!(out, apply_replacements(original, &reps[..1]));
    assert_eq!(out, b"Xefgh");
    assert_eq!(applied, 1);
}

#[test]
fn test_out_of_range_replacement_is_skipped() {
    let original = b"short";
    let reps = vec![rep(1..2, "H"), rep(3..99, "nope"), rep(4..3, "bad")];
    let (out, applied) = splice(original, &reps);
    assert_eq!(out, b"sHort");
    assert_eq!(applied, 1);
}

#[test]
fn test_insertion_and_deletion() {
    let original = b"let x = 1;";
    let reps = vec![rep(0..0, "// note\n"), rep(3..5, "")];
    assert_eq!(apply_replacements(original, &reps), b"// note\nlet = 1;");
}

#[test]
fn test_non_utf8_bytes_preserved() {
    let original = [0xffu8, b'a', b'b', 0xfe];
    let reps = vec![rep(1..3, "ok")];
    assert_eq!(apply_replacements(&original, &reps), vec![0xff, b'o', b'k', 0xfe]);
}

#[test]
fn test_replacements_for_sorts_and_skips_plain_matches() {
    let make = |start: usize, replacement: Option<&str>| Match {
        text: String::new(),
        range: RangeInfo::new(
            start..start + 1,
            Position::new(0, start),
            Position::new(0, start + 1),
        ),
        file_path: "a.rs".to_string(),
        line_context: String::new(),
        language: String::new(),
        replacement: replacement.map(str::to_string),
    };
    let matches = vec![make(8, Some("b")), make(4, None), make(1, Some("a"))];
    let reps = replacements_for(&matches);
    assert_eq!(reps, vec![rep(1..2, "a"), rep(8..9, "b")]);
}

/// (gap, len, text) 依次展开成互不重叠的替换
fn layout(original_len: usize, plan: &[(usize, usize, String)]) -> Vec<Replacement> {
    let mut cursor = 0;
    let mut out = Vec::new();
    for (gap, len, text) in plan {
        let start = cursor + gap;
        let end = start + len;
        if end > original_len {
            break;
        }
        out.push(Replacement::new(start..end, text.clone()));
        cursor = end;
    }
    out
}

proptest! {
    #[test]
    fn prop_disjoint_replacements_all_apply(
        original in proptest::collection::vec(any::<u8>(), 0..128),
        plan in proptest::collection::vec((0usize..8, 0usize..8, "[a-z]{0,6}"), 0..12),
    ) {
        let reps = layout(original.len(), &plan);
        let (out, applied) = splice(&original, &reps);
        prop_assert_eq!(applied, reps.len());

        let removed: usize = reps.iter().map(|r| r.range.len()).sum();
        let inserted: usize = reps.iter().map(|r| r.text.len()).sum();
        prop_assert_eq!(out.len(), original.len() - removed + inserted);

        // 每段原文和替换文本都落在按累计偏移平移后的位置
        let mut shift = 0isize;
        let mut prev = 0usize;
        for r in &reps {
            let kept = &original[prev..r.range.start];
            let kept_at = (prev as isize + shift) as usize;
            prop_assert_eq!(&out[kept_at..kept_at + kept.len()], kept);

            let text_at = (r.range.start as isize + shift) as usize;
            prop_assert_eq!(&out[text_at..text_at + r.text.len()], r.text.as_bytes());

            shift += r.text.len() as isize - r.range.len() as isize;
            prev = r.range.end;
        }
        let tail_at = (prev as isize + shift) as usize;
        prop_assert_eq!(&out[tail_at..], &original[prev..]);
    }

    #[test]
    fn prop_identity_replacements_preserve_content(
        original in "[a-z ]{0,64}",
        plan in proptest::collection::vec((0usize..6, 0usize..6), 0..10),
    ) {
        let plan: Vec<(usize, usize, String)> =
            plan.into_iter().map(|(gap, len)| (gap, len, String::new())).collect();
        let reps: Vec<Replacement> = layout(original.len(), &plan)
            .into_iter()
            .map(|r| {
                let text = original[r.range.clone()].to_string();
                Replacement::new(r.range, text)
            })
            .collect();
        prop_assert_eq!(apply_replacements(original.as_bytes(), &reps), original.as_bytes());
    }
}
