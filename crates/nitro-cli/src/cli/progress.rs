//! Terminal progress line for `nitro get`.

use nitro_core::{ProgressStats, SegmentProgress};

const MIB: f64 = 1_048_576.0;

/// Human-readable size with binary units.
pub fn format_bytes(n: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = n as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// One status line: totals, rate, ETA, then per-segment percentages.
pub fn render_progress(stats: &ProgressStats, segments: &SegmentProgress) -> String {
    let done_mib = stats.bytes_done as f64 / MIB;
    let total = match (stats.total_bytes, stats.fraction()) {
        (Some(total), Some(f)) => format!(" / {:.1} MiB ({:.1}%)", total as f64 / MIB, f * 100.0),
        _ => String::new(),
    };
    let eta = stats
        .eta_secs()
        .map(|s| format!("{:.0}s", s))
        .unwrap_or_else(|| "?".to_string());

    let mut line = format!(
        "  {:.1} MiB{}  {:.2} MiB/s  ETA {}",
        done_mib,
        total,
        stats.bytes_per_sec() / MIB,
        eta
    );
    if segments.segment_count() > 1 {
        let parts: Vec<String> = (0..segments.segment_count())
            .map(|i| match segments.segment_target(i) {
                Some(0) | None => "-".to_string(),
                Some(t) => format!("{:.0}%", segments.segment_bytes(i) as f64 * 100.0 / t as f64),
            })
            .collect();
        line.push_str(&format!("  [{}]", parts.join(" ")));
    }
    line.push_str("  ");
    line
}
