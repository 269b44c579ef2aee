//! Entity grouping
//!
//! Turns the raw NER spans of a caption into place-name candidates. Only
//! short geographic spans survive filtering; spans that sit within a few
//! characters of each other ("Paris, France") are merged into a single
//! candidate by slicing the caption from the first span's start to the
//! last span's end.

use tracing::debug;

use crate::models::LabeledSpan;

/// Longest span, in whitespace-delimited words, still treated as a place
pub const MAX_SPAN_WORDS: usize = 5;

/// Largest gap, in characters, between two spans merged into one candidate
pub const MAX_GROUP_GAP: usize = 5;

/// Keep geographic spans that look like plain place names.
#[must_use]
pub fn filter_spans(spans: Vec<LabeledSpan>) -> Vec<LabeledSpan> {
    spans
        .into_iter()
        .filter(|span| {
            span.label.is_geographic()
                && span.start_char < span.end_char
                && span.word_count() <= MAX_SPAN_WORDS
                && !span.text.contains(['#', '|'])
        })
        .collect()
}

/// Group spans (already sorted by start) whose gap to the previous span is
/// at most [`MAX_GROUP_GAP`]. Overlapping spans count as a zero gap.
#[must_use]
pub fn group_spans(spans: &[LabeledSpan]) -> Vec<Vec<&LabeledSpan>> {
    let mut groups: Vec<Vec<&LabeledSpan>> = Vec::new();

    for span in spans {
        match groups.last_mut() {
            Some(group) => {
                let prev = group[group.len() - 1];
                if span.start_char.saturating_sub(prev.end_char) <= MAX_GROUP_GAP {
                    group.push(span);
                } else {
                    groups.push(vec![span]);
                }
            }
            None => groups.push(vec![span]),
        }
    }

    groups
}

/// Extract ordered, unique place-name candidates from a caption.
#[must_use]
pub fn extract_place_candidates(text: &str, spans: Vec<LabeledSpan>) -> Vec<String> {
    let mut spans = filter_spans(spans);
    spans.sort_by_key(|span| span.start_char);
    debug!(
        "Detected entities: {:?}",
        spans.iter().map(|s| s.text.as_str()).collect::<Vec<_>>()
    );

    let mut candidates: Vec<String> = Vec::new();
    for group in group_spans(&spans) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };

        let Some(raw) = slice_chars(text, first.start_char, last.end_char) else {
            debug!(
                start = first.start_char,
                end = last.end_char,
                "Span offsets fall outside the caption, skipping"
            );
            continue;
        };

        let candidate = raw.trim().trim_end_matches(',');
        if !candidate.is_empty() && !candidates.iter().any(|c| c == candidate) {
            candidates.push(candidate.to_string());
        }
    }

    debug!("Place candidates: {:?}", candidates);
    candidates
}

/// Slice `text` by character offsets `[start, end)`.
fn slice_chars(text: &str, start: usize, end: usize) -> Option<&str> {
    if start > end {
        return None;
    }

    let mut byte_start = None;
    let mut byte_end = None;
    for (char_idx, (byte_idx, _)) in text.char_indices().enumerate() {
        if char_idx == start {
            byte_start = Some(byte_idx);
        }
        if char_idx == end {
            byte_end = Some(byte_idx);
            break;
        }
    }

    let char_count = text.chars().count();
    if start == char_count {
        byte_start = Some(text.len());
    }
    if end == char_count {
        byte_end = Some(text.len());
    }

    Some(&text[byte_start?..byte_end?])
}
