//! Choosing which segments to merge after a flush.

use std::fmt::Debug;
use std::ops::Range;

use crate::index::segment_infos::SegmentInfo;

/// Trait for merge policies.
pub trait MergePolicy: Debug + Send + Sync {
    /// Select a contiguous run of segments to merge, or `None` if the
    /// index is in shape. Only contiguous runs keep global document order.
    fn find_merge(&self, segments: &[SegmentInfo]) -> Option<Range<usize>>;
}

/// Classic size-tiered merging.
///
/// A segment's level is the number of times its document count can be
/// divided by `merge_factor`. Whenever `merge_factor` or more adjacent
/// segments share a level they are merged into one segment of a higher
/// level, as long as the result stays within `max_merge_docs`. Lower levels
/// are merged first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TieredMergePolicy {
    pub merge_factor: u32,
    pub max_merge_docs: u32,
}

impl TieredMergePolicy {
    pub fn new(merge_factor: u32, max_merge_docs: u32) -> Self {
        TieredMergePolicy {
            merge_factor,
            max_merge_docs,
        }
    }

    fn level(&self, doc_count: u32) -> u32 {
        let factor = self.merge_factor.max(2);
        let mut docs = doc_count;
        let mut level = 0;
        while docs >= factor {
            docs /= factor;
            level += 1;
        }
        level
    }
}

impl Default for TieredMergePolicy {
    fn default() -> Self {
        Self::new(10, u32::MAX)
    }
}

impl MergePolicy for TieredMergePolicy {
    fn find_merge(&self, segments: &[SegmentInfo]) -> Option<Range<usize>> {
        let merge_factor = self.merge_factor.max(2) as usize;
        let mut best: Option<(u32, Range<usize>)> = None;
        let mut start = 0;
        while start < segments.len() {
            let level = self.level(segments[start].doc_count);
            let mut end = start + 1;
            while end < segments.len() && self.level(segments[end].doc_count) == level {
                end += 1;
            }
            let docs: u64 = segments[start..end].iter().map(|s| s.doc_count as u64).sum();
            if end - start >= merge_factor
                && docs <= self.max_merge_docs as u64
                && best.as_ref().is_none_or(|(l, _)| level <= *l)
            {
                best = Some((level, start..end));
            }
            start = end;
        }
        let (level, run) = best?;
        log::debug!("merging {} segments at level {level}", run.len());
        Some(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(sizes: &[u32]) -> Vec<SegmentInfo> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, &n)| SegmentInfo::new(format!("_{i}"), n, false))
            .collect()
    }

    #[test]
    fn test_small_segments_merge() {
        let policy = TieredMergePolicy::new(3, u32::MAX);
        assert_eq!(policy.find_merge(&segments(&[1, 1])), None);
        assert_eq!(policy.find_merge(&segments(&[1, 1, 1])), Some(0..3));
        assert_eq!(policy.find_merge(&segments(&[50, 1, 2, 1])), Some(1..4));
    }

    #[test]
    fn test_higher_tiers() {
        let policy = TieredMergePolicy::new(3, u32::MAX);
        assert_eq!(policy.find_merge(&segments(&[100, 5, 4, 1])), None);
        assert_eq!(policy.find_merge(&segments(&[100, 5, 4, 3])), Some(1..4));
        assert_eq!(policy.find_merge(&segments(&[5, 4, 3, 1])), Some(0..3));
        assert_eq!(policy.find_merge(&segments(&[5, 4, 3, 1, 1, 2])), Some(3..6));
    }

    #[test]
    fn test_max_merge_docs() {
        let policy = TieredMergePolicy::new(2, 5);
        assert_eq!(policy.find_merge(&segments(&[1, 1])), Some(0..2));
        assert_eq!(policy.find_merge(&segments(&[3, 3])), None);
    }
}
