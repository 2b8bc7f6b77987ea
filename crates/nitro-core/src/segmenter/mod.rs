//! Range math and segment planning.
//!
//! Splits a download into N contiguous byte ranges and renders the HTTP Range
//! header bounds for each one.

mod range;

pub use range::{partial_size, plan_segments, SegmentPlan};
