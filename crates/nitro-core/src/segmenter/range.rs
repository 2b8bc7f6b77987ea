//! Segment type and range planning.

use crate::error::DownloadError;

/// One segment of a download: `len` bytes starting at `start`.
///
/// `len == None` means the resource length is unknown and the segment runs
/// to end of stream. `len == Some(0)` is a trivially complete segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentPlan {
    pub index: u8,
    /// First byte (inclusive).
    pub start: u64,
    pub len: Option<u64>,
}

impl SegmentPlan {
    /// Expected byte count, or `None` when unbounded.
    pub fn expected_len(&self) -> Option<u64> {
        self.len
    }

    /// Last byte (inclusive), or `None` when unbounded or empty.
    pub fn last_byte(&self) -> Option<u64> {
        match self.len {
            Some(n) if n > 0 => Some(self.start + n - 1),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len == Some(0)
    }

    /// curl `CURLOPT_RANGE` value: `start-last` (inclusive, no unit prefix).
    pub fn curl_range(&self) -> Option<String> {
        self.last_byte().map(|last| format!("{}-{}", self.start, last))
    }

    /// HTTP Range header value: `bytes=start-last`.
    pub fn range_header_value(&self) -> Option<String> {
        self.curl_range().map(|r| format!("bytes={}", r))
    }
}

/// Ceiling of `total_size / segment_count`; the nominal length of every segment
/// but possibly the last.
pub fn partial_size(total_size: u64, segment_count: u8) -> Result<u64, DownloadError> {
    if segment_count == 0 {
        return Err(DownloadError::InvalidArgument(
            "segment count must be greater than zero".into(),
        ));
    }
    Ok(total_size.div_ceil(u64::from(segment_count)))
}

/// Builds the segment plan for `total_size` bytes split `segment_count` ways.
///
/// Every segment is `ceil(total / count)` bytes except the last non-empty one,
/// which is clamped to end at `total_size - 1`. When `segment_count` exceeds
/// what the ceiling needs, the trailing segments are emitted with length 0
/// (start clamped to `total_size`). A `total_size` of 0 means unknown length
/// and yields a single unbounded segment.
pub fn plan_segments(total_size: u64, segment_count: u8) -> Result<Vec<SegmentPlan>, DownloadError> {
    let partial = partial_size(total_size, segment_count)?;

    if total_size == 0 {
        return Ok(vec![SegmentPlan {
            index: 0,
            start: 0,
            len: None,
        }]);
    }

    let last = total_size - 1;
    let mut out = Vec::with_capacity(usize::from(segment_count));
    for index in 0..segment_count {
        let nominal_start = partial * u64::from(index);
        let plan = if nominal_start > last {
            SegmentPlan {
                index,
                start: total_size,
                len: Some(0),
            }
        } else {
            let end = nominal_start.saturating_add(partial - 1).min(last);
            SegmentPlan {
                index,
                start: nominal_start,
                len: Some(end - nominal_start + 1),
            }
        };
        out.push(plan);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(plans: &[SegmentPlan]) -> Vec<(u64, Option<u64>)> {
        plans.iter().map(|p| (p.start, p.last_byte())).collect()
    }

    #[test]
    fn ceiling_division_clamps_last() {
        let plans = plan_segments(10, 3).unwrap();
        assert_eq!(partial_size(10, 3).unwrap(), 4);
        assert_eq!(
            bounds(&plans),
            vec![(0, Some(3)), (4, Some(7)), (8, Some(9))]
        );
        assert_eq!(plans[2].expected_len(), Some(2));
    }

    #[test]
    fn even_split_of_one_million() {
        let plans = plan_segments(1_000_000, 4).unwrap();
        assert_eq!(
            bounds(&plans),
            vec![
                (0, Some(249_999)),
                (250_000, Some(499_999)),
                (500_000, Some(749_999)),
                (750_000, Some(999_999)),
            ]
        );
    }

    #[test]
    fn zero_segments_is_invalid() {
        let err = plan_segments(100, 0).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn unknown_length_is_one_unbounded_segment() {
        let plans = plan_segments(0, 8).unwrap();
        assert_eq!(plans.len(), 1);
        assert!(plans[0].len.is_none());
        assert_eq!(plans[0].range_header_value(), None);
    }

    #[test]
    fn more_segments_than_bytes_emits_empty_tail() {
        // ceil(5/4) = 2: [0,1] [2,3] [4,4] and an empty fourth.
        let plans = plan_segments(5, 4).unwrap();
        assert_eq!(plans.len(), 4);
        assert_eq!(plans[2].last_byte(), Some(4));
        assert!(plans[3].is_empty());
        assert_eq!(plans[3].start, 5);

        let plans = plan_segments(3, 8).unwrap();
        assert_eq!(plans.len(), 8);
        assert_eq!(plans.iter().filter(|p| !p.is_empty()).count(), 3);
    }

    #[test]
    fn tiling_invariant_holds() {
        let sizes = [1u64, 2, 3, 7, 10, 255, 256, 1000, 65_537, 1_000_003];
        for &total in &sizes {
            for count in 1..=255u8 {
                let plans = plan_segments(total, count).unwrap();
                assert_eq!(plans.len(), usize::from(count));
                let mut next = 0u64;
                for (i, p) in plans.iter().enumerate() {
                    assert_eq!(usize::from(p.index), i);
                    assert_eq!(p.start, next, "gap or overlap at {total}/{count}");
                    next = p.start + p.len.unwrap();
                }
                assert_eq!(next, total);
                let sum: u64 = plans.iter().map(|p| p.len.unwrap()).sum();
                assert_eq!(sum, total);
            }
        }
    }

    #[test]
    fn largest_length_does_not_overflow() {
        // ceil(MAX / 7) * 7 exceeds u64::MAX, so the last nominal end must saturate.
        let plans = plan_segments(u64::MAX, 7).unwrap();
        assert_eq!(plans.len(), 7);
        assert_eq!(plans[6].last_byte(), Some(u64::MAX - 1));
        let sum: u64 = plans.iter().map(|p| p.len.unwrap()).sum();
        assert_eq!(sum, u64::MAX);
        for pair in plans.windows(2) {
            assert_eq!(pair[0].start + pair[0].len.unwrap(), pair[1].start);
        }
    }

    #[test]
    fn range_header_values() {
        let p = SegmentPlan { index: 0, start: 0, len: Some(99) };
        assert_eq!(p.range_header_value().as_deref(), Some("bytes=0-98"));
        assert_eq!(p.curl_range().as_deref(), Some("0-98"));
        let single = SegmentPlan { index: 1, start: 42, len: Some(1) };
        assert_eq!(single.range_header_value().as_deref(), Some("bytes=42-42"));
    }
}
