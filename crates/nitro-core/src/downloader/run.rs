//! Fan-out/fan-in of segment pipelines.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;
use std::thread;

use crate::error::DownloadError;
use crate::progress::ProgressSink;
use crate::segmenter::SegmentPlan;
use crate::storage::OutputTarget;
use crate::transport::SegmentTransport;

use super::writer::SegmentWriter;
use super::SegmentOutcome;

/// Run one pipeline per plan on its own thread and return every outcome,
/// ordered by segment index. Returns only after all threads have finished;
/// a failing segment never cancels its siblings.
pub(super) fn run_segments(
    transport: &dyn SegmentTransport,
    progress: &dyn ProgressSink,
    locator: &str,
    plans: &[SegmentPlan],
    target: &dyn OutputTarget,
    chunk_size: usize,
) -> Vec<SegmentOutcome> {
    let outcomes: Mutex<Vec<SegmentOutcome>> = Mutex::new(Vec::with_capacity(plans.len()));

    thread::scope(|scope| {
        for plan in plans {
            let outcomes = &outcomes;
            scope.spawn(move || {
                let outcome = run_pipeline(transport, progress, locator, plan, target, chunk_size);
                progress.on_segment_finished(&outcome);
                outcomes
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .push(outcome);
            });
        }
    });

    let mut outcomes = outcomes
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    outcomes.sort_by_key(|o| o.index);
    outcomes
}

/// One segment: open the stream, drain it into the file, settle an outcome.
fn run_pipeline(
    transport: &dyn SegmentTransport,
    progress: &dyn ProgressSink,
    locator: &str,
    plan: &SegmentPlan,
    target: &dyn OutputTarget,
    chunk_size: usize,
) -> SegmentOutcome {
    if plan.is_empty() {
        tracing::debug!(segment = plan.index, "empty segment, nothing to fetch");
        return SegmentOutcome {
            index: plan.index,
            bytes_written: 0,
            error: None,
        };
    }

    progress.on_segment_started(plan);
    tracing::debug!(
        segment = plan.index,
        start = plan.start,
        len = ?plan.len,
        "segment started"
    );

    let mut writer =
        SegmentWriter::new(plan, transport.termination(), target, progress).with_chunk_size(chunk_size);
    let fetched = panic::catch_unwind(AssertUnwindSafe(|| {
        transport.fetch(locator, plan, &mut writer)
    }));
    let error = match fetched {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e),
        Err(_) => Some(DownloadError::WorkerPanicked),
    };

    match &error {
        None => tracing::debug!(
            segment = plan.index,
            bytes = writer.bytes_written(),
            "segment finished"
        ),
        Some(e) => tracing::warn!(
            segment = plan.index,
            bytes = writer.bytes_written(),
            kind = ?e.kind(),
            "segment failed: {}",
            e
        ),
    }

    SegmentOutcome {
        index: plan.index,
        bytes_written: writer.bytes_written(),
        error,
    }
}
