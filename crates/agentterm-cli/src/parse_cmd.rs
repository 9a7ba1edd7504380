//! `agentterm parse`: replay a captured transcript through an adapter.
//!
//! Each input line is fed to the adapter as one raw fragment, the way a PTY
//! would deliver a line-buffered screen update. Events are printed as JSON
//! lines.

use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use futures::StreamExt;

use agentterm_core::adapter::{Adapter, AgentEvent, RawStream};

/// Split a transcript into raw fragments, keeping each line terminator.
pub fn fragments(transcript: &str) -> Vec<String> {
    transcript.split_inclusive('\n').map(str::to_string).collect()
}

/// Run `transcript` through `adapter` and collect the events.
pub async fn parse_transcript(adapter: &dyn Adapter, transcript: &str) -> Vec<AgentEvent> {
    let raw: RawStream = Box::pin(futures::stream::iter(fragments(transcript)));
    adapter.parse(raw).collect().await
}

/// Execute `agentterm parse`.
pub async fn run_parse(adapter: &dyn Adapter, file: Option<&Path>) -> Result<()> {
    let transcript = match file {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("failed to read transcript {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("failed to read transcript from stdin")?;
            buf
        }
    };
    let transcript = String::from_utf8_lossy(&transcript);

    let events = parse_transcript(adapter, &transcript).await;
    tracing::debug!(agent = %adapter.agent(), events = events.len(), "transcript parsed");

    let mut out = std::io::stdout().lock();
    for event in &events {
        let line = serde_json::to_string(event).context("failed to serialize event")?;
        writeln!(out, "{line}")?;
    }
    Ok(())
}
