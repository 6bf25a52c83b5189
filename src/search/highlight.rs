//! Excerpt extraction and match highlighting.

use serde::{Deserialize, Serialize};

/// How excerpts are cut and marked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightOptions {
    /// Target length of an excerpt in bytes, markup excluded.
    pub excerpt_length: usize,
    /// Maximum number of excerpts.
    pub num_excerpts: usize,
    pub pre_tag: String,
    pub post_tag: String,
    /// Marks text cut off at either end of an excerpt.
    pub ellipsis: String,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        HighlightOptions {
            excerpt_length: 150,
            num_excerpts: 2,
            pre_tag: "<b>".to_string(),
            post_tag: "</b>".to_string(),
            ellipsis: "...".to_string(),
        }
    }
}

fn floor_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

/// Cut excerpts of `text` around the byte ranges in `matches` and wrap every
/// match in the markup tags. Windows holding the most matches are chosen,
/// then emitted in text order. Without matches the leading excerpt is
/// returned.
pub(crate) fn excerpts(text: &str, matches: &[(usize, usize)], options: &HighlightOptions) -> Vec<String> {
    let length = options.excerpt_length.max(1);
    let mut matches: Vec<(usize, usize)> = matches
        .iter()
        .copied()
        .filter(|&(start, end)| start < end && end <= text.len())
        .collect();
    matches.sort_unstable();
    matches.dedup();
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(matches.len());
    for (start, end) in matches {
        match merged.last_mut() {
            Some(last) if start < last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }

    if merged.is_empty() {
        let end = floor_boundary(text, length);
        return vec![render(text, 0, end, &[], options)];
    }

    // Candidate windows start at each match; count the matches they hold.
    let mut candidates: Vec<(usize, usize, usize)> = (0..merged.len())
        .map(|first| {
            let limit = merged[first].0 + length;
            let last = merged[first..].iter().take_while(|m| m.1 <= limit).count().max(1) + first - 1;
            (first, last, last - first + 1)
        })
        .collect();
    candidates.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));

    let mut chosen: Vec<(usize, usize)> = Vec::new();
    for (first, last, _) in candidates {
        if chosen.len() >= options.num_excerpts {
            break;
        }
        if chosen.iter().all(|&(f, l)| last < f || first > l) {
            chosen.push((first, last));
        }
    }
    chosen.sort_unstable();

    let mut out = Vec::with_capacity(chosen.len());
    let mut floor = 0;
    for (first, last) in chosen {
        let covered = merged[last].1 - merged[first].0;
        let slack = length.saturating_sub(covered);
        let mut start = floor_boundary(
            text,
            merged[first].0.saturating_sub(slack / 2).max(floor).min(merged[first].0),
        );
        let mut end = ceil_boundary(text, (start + length).max(merged[last].1));
        if end == text.len() {
            start = floor_boundary(text, end.saturating_sub(length).max(floor).min(merged[first].0));
        }
        // Prefer to cut on whitespace.
        if start > 0
            && let Some(space) = text[start..merged[first].0].find(char::is_whitespace)
        {
            start += space + 1;
        }
        if end < text.len()
            && let Some(space) = text[merged[last].1..end].rfind(char::is_whitespace)
        {
            end = merged[last].1 + space;
        }
        let inside: Vec<(usize, usize)> = merged.iter().copied().filter(|m| m.0 >= start && m.1 <= end).collect();
        out.push(render(text, start, end, &inside, options));
        floor = end;
    }
    out
}

fn render(text: &str, start: usize, end: usize, matches: &[(usize, usize)], options: &HighlightOptions) -> String {
    let mut out = String::new();
    if start > 0 {
        out.push_str(&options.ellipsis);
    }
    let mut at = start;
    for &(m_start, m_end) in matches {
        out.push_str(&text[at..m_start]);
        out.push_str(&options.pre_tag);
        out.push_str(&text[m_start..m_end]);
        out.push_str(&options.post_tag);
        at = m_end;
    }
    out.push_str(&text[at..end]);
    if end < text.len() {
        out.push_str(&options.ellipsis);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(excerpt_length: usize, num_excerpts: usize) -> HighlightOptions {
        HighlightOptions {
            excerpt_length,
            num_excerpts,
            ..Default::default()
        }
    }

    #[test]
    fn test_whole_text_fits() {
        let text = "the quick brown fox";
        let out = excerpts(text, &[(16, 19)], &HighlightOptions::default());
        assert_eq!(out, vec!["the quick brown <b>fox</b>".to_string()]);
    }

    #[test]
    fn test_excerpts_are_cut_with_ellipsis() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        // "delta" at 17..22, "kappa" at 51..56
        let out = excerpts(text, &[(17, 22), (51, 56)], &options(12, 2));
        assert_eq!(out.len(), 2);
        assert!(out[0].starts_with("..."));
        assert!(out[0].contains("<b>delta</b>"));
        assert!(out[0].ends_with("..."));
        assert!(out[1].contains("<b>kappa</b>"));
        assert!(!out[1].ends_with("..."));
    }

    #[test]
    fn test_best_window_wins() {
        let text = "cat dog dog dog bird cat";
        let out = excerpts(text, &[(0, 3), (4, 7), (8, 11), (12, 15), (21, 24)], &options(15, 1));
        assert_eq!(out.len(), 1);
        assert!(out[0].contains("<b>dog</b> <b>dog</b> <b>dog</b>"));
    }

    #[test]
    fn test_no_matches_gives_leading_excerpt() {
        let out = excerpts("one two three four", &[], &options(7, 2));
        assert_eq!(out, vec!["one two...".to_string()]);
    }
}
