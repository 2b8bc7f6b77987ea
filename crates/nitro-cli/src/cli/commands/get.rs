//! `nitro get <url>` – probe, then download with parallel segments.

use anyhow::{Context, Result};
use nitro_core::config::NitroConfig;
use nitro_core::{download, probe, SegmentProgress, Source};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::cli::progress::{format_bytes, render_progress};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

pub async fn run_get(
    cfg: &NitroConfig,
    url: &str,
    parallel: Option<u8>,
    output: Option<PathBuf>,
) -> Result<()> {
    let source = Source::parse(url)?;
    let options = cfg.download_options(parallel);

    eprintln!("Fetching metadata...");
    let curl = options.curl.clone();
    let metadata = tokio::task::spawn_blocking(move || probe(&source, &curl))
        .await
        .context("probe task panicked")??;
    match metadata.total_size {
        Some(n) => eprintln!("File size: {} ({} bytes)", format_bytes(n), n),
        None => eprintln!("File size: unknown"),
    }

    let destination = resolve_destination(output.as_deref(), &metadata.filename);
    let spec = metadata.to_spec(options.segment_count);
    let plans = spec.plan()?;
    if plans.len() < usize::from(options.segment_count) {
        eprintln!("Server does not allow parallel ranges; using 1 segment.");
    }
    eprintln!("Saving to {} with {} segment(s)", destination.display(), plans.len());

    let progress = Arc::new(SegmentProgress::new(&plans));
    let sink = Arc::clone(&progress);
    let dest = destination.clone();
    let mut task =
        tokio::task::spawn_blocking(move || download(&metadata, &dest, &options, sink));

    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    let result = loop {
        tokio::select! {
            joined = &mut task => break joined.context("download task panicked")?,
            _ = ticker.tick() => eprint!("\r{}", render_progress(&progress.snapshot(), &progress)),
        }
    };
    eprintln!("\r{}", render_progress(&progress.snapshot(), &progress));

    let bytes = result
        .into_result()
        .with_context(|| format!("download of {} failed", url))?;
    eprintln!("Done: {} written to {}", format_bytes(bytes), destination.display());
    Ok(())
}

/// `-o` may name a file or an existing directory; without it, use the derived name.
fn resolve_destination(output: Option<&Path>, filename: &str) -> PathBuf {
    match output {
        Some(p) if p.is_dir() => p.join(filename),
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(filename),
    }
}
