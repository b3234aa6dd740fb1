use super::*;
use proptest::prelude::*;
use serde_json::{json, Value};

#[test]
fn test_record_split_across_chunks() {
    let mut decoder = LineDecoder::<Value>::new();
    let first = decoder.feed_str("{\"file\":\"a\"}\n{\"fil");
    assert_eq!(first, vec![json!({"file": "a"})]);
    assert_eq!(decoder.pending_len(), 5);

    let second = decoder.feed_str("e\":\"b\"}\n");
    assert_eq!(second, vec![json!({"file": "b"})]);
    assert_eq!(decoder.pending_len(), 0);
    assert!(decoder.finish().is_empty());
}

#[test]
fn test_crlf_lines() {
    let mut decoder = LineDecoder::<Value>::new();
    let records = decoder.feed_str("{\"n\":1}\r\n{\"n\":2}\r\n");
    assert_eq!(records, vec![json!({"n": 1}), json!({"n": 2})]);
}

#[test]
fn test_unterminated_complete_tail_is_emitted_once() {
    let mut decoder = LineDecoder::<Value>::new();
    assert_eq!(decoder.feed_str("{\"n\":1}"), vec![json!({"n": 1})]);
    // 随后到来的换行只是一个空行
    assert!(decoder.feed_str("\n").is_empty());
    assert_eq!(decoder.dropped(), 0);
}

#[test]
fn test_malformed_complete_line_dropped() {
    let mut decoder = LineDecoder::<Value>::new();
    let records = decoder.feed_str("not json\n{\"n\":2}\n");
    assert_eq!(records, vec![json!({"n": 2})]);
    assert_eq!(decoder.dropped(), 1);
}

#[test]
fn test_multibyte_char_split_between_chunks() {
    let line = "{\"text\":\"héllo\"}\n".as_bytes();
    let split = line.iter().position(|b| *b == 0xC3).unwrap() + 1;
    let mut decoder = LineDecoder::<Value>::new();
    assert!(decoder.feed(&line[..split]).is_empty());
    assert_eq!(decoder.feed(&line[split..]), vec![json!({"text": "héllo"})]);
}

#[test]
fn test_finish_reports_dangling_partial() {
    let mut decoder = LineDecoder::<Value>::new();
    assert!(decoder.feed_str("{\"n\":").is_empty());
    assert!(decoder.finish().is_empty());
    assert_eq!(decoder.dropped(), 1);
    assert_eq!(decoder.pending_len(), 0);
}

fn stream_of(values: &[u32]) -> String {
    values
        .iter()
        .map(|n| format!("{{\"file\":\"f{n}\",\"n\":{n}}}\n"))
        .collect()
}

proptest! {
    #[test]
    fn prop_chunking_does_not_change_records(
        values in prop::collection::vec(0u32..10_000, 0..20),
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..12),
    ) {
        let stream = stream_of(&values);
        let bytes = stream.as_bytes();

        let mut whole = LineDecoder::<Value>::new();
        let expected = whole.feed(bytes);

        let mut points: Vec<usize> = cuts.iter().map(|i| i.index(bytes.len() + 1)).collect();
        points.sort_unstable();
        points.dedup();

        let mut chunked = LineDecoder::<Value>::new();
        let mut got = Vec::new();
        let mut prev = 0;
        for p in points.into_iter().chain(std::iter::once(bytes.len())) {
            got.extend(chunked.feed(&bytes[prev..p]));
            prev = p;
        }
        got.extend(chunked.finish());

        prop_assert_eq!(got.len(), values.len());
        prop_assert_eq!(got, expected);
    }
}
