//! `fetch` command: a GET through the authenticated pipeline.

use anyhow::Context;
use keyway_auth::HttpPipeline;
use std::io::Write;

/// Fetch a URL, printing the status to stderr and the body to stdout.
pub async fn handle_fetch(pipeline: &HttpPipeline, url: &str) -> anyhow::Result<()> {
    let response = pipeline
        .get(url)
        .await
        .with_context(|| format!("Request to {url} failed"))?;

    let status = response.status();
    eprintln!("{status}");

    let body = response
        .bytes()
        .await
        .with_context(|| format!("Failed to read response from {url}"))?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&body)?;
    stdout.flush()?;

    if !status.is_success() {
        anyhow::bail!("Server returned {status}");
    }
    Ok(())
}
