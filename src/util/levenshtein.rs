//! Edit distance helpers used by fuzzy term expansion.

use std::cmp::min;

/// Levenshtein distance between two character slices.
pub fn levenshtein_distance(s1: &[char], s2: &[char]) -> usize {
    levenshtein_distance_threshold(s1, s2, usize::MAX).unwrap_or(usize::MAX)
}

/// Levenshtein distance with early termination once every cell of a row
/// exceeds `threshold`. Returns `None` when the distance is larger.
#[allow(clippy::needless_range_loop)]
pub fn levenshtein_distance_threshold(
    s1: &[char],
    s2: &[char],
    threshold: usize,
) -> Option<usize> {
    let len1 = s1.len();
    let len2 = s2.len();

    if len1.abs_diff(len2) > threshold {
        return None;
    }
    if len1 == 0 || len2 == 0 {
        let d = len1.max(len2);
        return (d <= threshold).then_some(d);
    }

    let mut prev_row: Vec<usize> = (0..=len2).collect();
    let mut curr_row = vec![0; len2 + 1];

    for i in 1..=len1 {
        curr_row[0] = i;
        let mut min_in_row = i;

        for j in 1..=len2 {
            let cost = usize::from(s1[i - 1] != s2[j - 1]);
            curr_row[j] = min(
                min(prev_row[j] + 1, curr_row[j - 1] + 1),
                prev_row[j - 1] + cost,
            );
            min_in_row = min(min_in_row, curr_row[j]);
        }

        if min_in_row > threshold {
            return None;
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    let distance = prev_row[len2];
    (distance <= threshold).then_some(distance)
}

/// Similarity between a query term and a candidate that share a prefix of
/// `prefix_len` characters. Only the suffixes are compared; the prefix
/// length counts toward the normalizing length.
///
/// Returns a value in `[0, 1]`, or `None` when the candidate cannot reach
/// `min_similarity`.
pub fn fuzzy_similarity(
    query_suffix: &[char],
    candidate_suffix: &[char],
    prefix_len: usize,
    min_similarity: f32,
) -> Option<f32> {
    let shortest = min(query_suffix.len(), candidate_suffix.len()) + prefix_len;
    if shortest == 0 {
        return (query_suffix.len() == candidate_suffix.len()).then_some(1.0);
    }
    let max_distance = ((1.0 - min_similarity) * shortest as f32).floor() as usize;
    let distance = levenshtein_distance_threshold(query_suffix, candidate_suffix, max_distance)?;
    let similarity = 1.0 - distance as f32 / shortest as f32;
    (similarity >= min_similarity).then_some(similarity)
}
