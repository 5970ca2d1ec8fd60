//! Pagination of ordered result sets into size-bounded segments.
//!
//! A listing is enumerated once, completely, and then cut into consecutive
//! pages of at most `page_limit` records. Every segment records the index of
//! the last segment, so the first segment a consumer fetches already tells
//! it how many more to ask for. An empty listing still yields one (empty,
//! final) segment so every query has a terminating response.

use serde::{Deserialize, Serialize};

/// Default maximum number of records per segment.
pub const PAGE_LIMIT: usize = 100;

/// One page of an ordered result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment<R> {
    /// Zero-based position of this segment.
    pub index: u64,
    /// Index of the final segment of the same listing.
    pub last_index: u64,
    pub records: Vec<R>,
}

impl<R> Segment<R> {
    /// True for the highest-indexed segment of the listing.
    pub fn is_final(&self) -> bool {
        self.index == self.last_index
    }
}

/// Number of segments `len` records produce at `page_limit` per segment.
pub fn segment_count(len: usize, page_limit: usize) -> u64 {
    let page_limit = page_limit.max(1);
    if len == 0 {
        1
    } else {
        len.div_ceil(page_limit) as u64
    }
}

/// Partition `records` into ordered segments, preserving input order.
///
/// A `page_limit` of zero is treated as one.
pub fn encode<R>(records: Vec<R>, page_limit: usize) -> Vec<Segment<R>> {
    let page_limit = page_limit.max(1);
    let last_index = segment_count(records.len(), page_limit) - 1;

    if records.is_empty() {
        return vec![Segment {
            index: 0,
            last_index,
            records,
        }];
    }

    let mut segments = Vec::with_capacity(last_index as usize + 1);
    let mut iter = records.into_iter().peekable();
    let mut index = 0u64;
    while iter.peek().is_some() {
        let chunk: Vec<R> = iter.by_ref().take(page_limit).collect();
        segments.push(Segment {
            index,
            last_index,
            records: chunk,
        });
        index += 1;
    }
    segments
}

/// Cut out a single segment without materializing the others.
///
/// Returns `None` when `index` is past the last segment.
pub fn segment_at<R: Clone>(records: &[R], page_limit: usize, index: u64) -> Option<Segment<R>> {
    let page_limit = page_limit.max(1);
    let last_index = segment_count(records.len(), page_limit) - 1;
    if index > last_index {
        return None;
    }
    let start = (index as usize).saturating_mul(page_limit).min(records.len());
    let end = start.saturating_add(page_limit).min(records.len());
    Some(Segment {
        index,
        last_index,
        records: records[start..end].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_yields_single_final_segment() {
        let segments = encode::<u32>(vec![], PAGE_LIMIT);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].index, 0);
        assert!(segments[0].records.is_empty());
        assert!(segments[0].is_final());
    }

    #[test]
    fn test_exact_multiple_of_page_limit() {
        let segments = encode((0..200).collect::<Vec<u32>>(), 100);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].records.len(), 100);
        assert!(!segments[0].is_final());
        assert!(segments[1].is_final());
    }

    #[test]
    fn test_250_records() {
        let segments = encode((0..250).collect::<Vec<u32>>(), PAGE_LIMIT);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].last_index, 2);
        assert_eq!(segments[0].records.len(), 100);
        assert_eq!(segments[2].records.len(), 50);
        assert_eq!(segments[2].records[0], 200);
        assert!(segments[2].is_final());
    }

    #[test]
    fn test_zero_page_limit_treated_as_one() {
        let segments = encode(vec!['a', 'b'], 0);
        assert_eq!(segments.len(), 2);
        assert_eq!(segment_count(2, 0), 2);
    }

    #[test]
    fn test_segment_at_matches_encode() {
        let records: Vec<u32> = (0..250).collect();
        let all = encode(records.clone(), PAGE_LIMIT);
        for seg in &all {
            assert_eq!(segment_at(&records, PAGE_LIMIT, seg.index).as_ref(), Some(seg));
        }
        assert!(segment_at(&records, PAGE_LIMIT, 3).is_none());
        assert_eq!(segment_at::<u32>(&[], PAGE_LIMIT, 0).unwrap().last_index, 0);
    }

    proptest! {
        #[test]
        fn test_segmentation_properties(len in 0usize..1000, page_limit in 1usize..150) {
            let records: Vec<usize> = (0..len).collect();
            let segments = encode(records.clone(), page_limit);

            let expected = if len == 0 { 1 } else { len.div_ceil(page_limit) };
            prop_assert_eq!(segments.len(), expected);

            for (i, seg) in segments.iter().enumerate() {
                prop_assert_eq!(seg.index, i as u64);
                prop_assert!(seg.records.len() <= page_limit);
                prop_assert_eq!(seg.last_index, expected as u64 - 1);
                prop_assert_eq!(seg.is_final(), i == expected - 1);
                if i + 1 < expected {
                    prop_assert_eq!(seg.records.len(), page_limit);
                }
            }

            let flat: Vec<usize> = segments.into_iter().flat_map(|s| s.records).collect();
            prop_assert_eq!(flat, records);
        }
    }
}
