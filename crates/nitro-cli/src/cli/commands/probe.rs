//! `nitro probe <url>` – show what a download would fetch.

use anyhow::{Context, Result};
use nitro_core::config::NitroConfig;
use nitro_core::{probe, Source};

use crate::cli::progress::format_bytes;

pub async fn run_probe(cfg: &NitroConfig, url: &str) -> Result<()> {
    let source = Source::parse(url)?;
    let curl = cfg.curl_options();
    let metadata = tokio::task::spawn_blocking(move || probe(&source, &curl))
        .await
        .context("probe task panicked")??;

    println!("URL:      {}", metadata.source.locator());
    println!("Filename: {}", metadata.filename);
    match metadata.total_size {
        Some(n) => println!("Size:     {} ({} bytes)", format_bytes(n), n),
        None => println!("Size:     unknown"),
    }
    println!(
        "Ranges:   {}",
        if metadata.supports_ranges { "yes" } else { "no (single segment)" }
    );
    if let Some(c) = metadata.credentials().filter(|c| !c.is_anonymous()) {
        println!("Login:    {}", c.username);
    }
    Ok(())
}
