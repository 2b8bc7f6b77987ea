//! Progress reporting for downloads (per-segment bytes, rate, ETA).
//!
//! Segment writers call `ProgressSink::on_chunk` after every chunk they write.
//! Sinks are invoked concurrently from all segment threads and sit on the hot
//! write path, so implementations must be cheap and must not block.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::downloader::SegmentOutcome;
use crate::segmenter::SegmentPlan;

/// Observer of download progress.
pub trait ProgressSink: Send + Sync {
    /// `bytes` more bytes of segment `segment` reached the output file.
    fn on_chunk(&self, segment: u8, bytes: u64);

    /// A segment pipeline is about to open its stream.
    fn on_segment_started(&self, _plan: &SegmentPlan) {}

    /// A segment pipeline settled (successfully or not).
    fn on_segment_finished(&self, _outcome: &SegmentOutcome) {}
}

impl<F> ProgressSink for F
where
    F: Fn(u8, u64) + Send + Sync,
{
    fn on_chunk(&self, segment: u8, bytes: u64) {
        self(segment, bytes)
    }
}

/// Sink that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn on_chunk(&self, _segment: u8, _bytes: u64) {}
}

/// Lock-free per-segment byte counters, readable while the download runs.
#[derive(Debug)]
pub struct SegmentProgress {
    done: Vec<AtomicU64>,
    targets: Vec<Option<u64>>,
    finished: AtomicU64,
    started: Instant,
}

impl SegmentProgress {
    pub fn new(plans: &[SegmentPlan]) -> Self {
        Self {
            done: plans.iter().map(|_| AtomicU64::new(0)).collect(),
            targets: plans.iter().map(|p| p.expected_len()).collect(),
            finished: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn segment_count(&self) -> usize {
        self.done.len()
    }

    /// Bytes written so far for one segment (0 for an unknown index).
    pub fn segment_bytes(&self, segment: usize) -> u64 {
        self.done
            .get(segment)
            .map(|a| a.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Expected length of one segment, `None` when unbounded.
    pub fn segment_target(&self, segment: usize) -> Option<u64> {
        self.targets.get(segment).copied().flatten()
    }

    pub fn bytes_done(&self) -> u64 {
        self.done.iter().map(|a| a.load(Ordering::Relaxed)).sum()
    }

    /// Point-in-time view for display.
    pub fn snapshot(&self) -> ProgressStats {
        let total_bytes = self
            .targets
            .iter()
            .try_fold(0u64, |acc, t| t.map(|n| acc + n));
        ProgressStats {
            bytes_done: self.bytes_done(),
            total_bytes,
            elapsed_secs: self.started.elapsed().as_secs_f64(),
            segments_done: self.finished.load(Ordering::Relaxed) as usize,
            segment_count: self.segment_count(),
        }
    }
}

impl ProgressSink for SegmentProgress {
    fn on_chunk(&self, segment: u8, bytes: u64) {
        if let Some(a) = self.done.get(usize::from(segment)) {
            a.fetch_add(bytes, Ordering::Relaxed);
        }
    }

    fn on_segment_finished(&self, _outcome: &SegmentOutcome) {
        self.finished.fetch_add(1, Ordering::Relaxed);
    }
}

/// Snapshot of download progress (CLI-friendly).
#[derive(Debug, Clone)]
pub struct ProgressStats {
    /// Bytes written so far across all segments.
    pub bytes_done: u64,
    /// Total file size, `None` when unknown.
    pub total_bytes: Option<u64>,
    /// Elapsed time since the tracker was created (seconds).
    pub elapsed_secs: f64,
    /// Number of segment pipelines that have settled.
    pub segments_done: usize,
    pub segment_count: usize,
}

impl ProgressStats {
    /// Download rate in bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if size unknown or rate is 0).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total_bytes?.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0]; `None` when the size is unknown.
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes? {
            0 => Some(1.0),
            total => Some((self.bytes_done as f64 / total as f64).min(1.0)),
        }
    }
}
