//! The `Adapter` trait -- the per-agent strategy for invocation and output
//! parsing.
//!
//! Each concrete adapter (Claude, Codex) implements this trait. The trait is
//! object-safe so adapters can be stored as `Arc<dyn Adapter>` in the
//! [`super::AdapterRegistry`] and shared by every session of that agent.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};

use super::ansi::strip_ansi;
use super::types::{AgentEvent, AgentKind, AgentMode, SpawnOptions};

/// Raw text fragments, in arrival order.
pub type RawStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Structured events, in the order their raw fragments arrived.
pub type EventStream = Pin<Box<dyn Stream<Item = AgentEvent> + Send>>;

/// Invocation and output-parsing strategy for one agent CLI.
///
/// Adapters hold no per-session state. Anything a parser needs to remember
/// between fragments lives inside the stream returned by [`Adapter::parse`].
pub trait Adapter: Send + Sync {
    /// The agent this adapter serves.
    fn agent(&self) -> AgentKind;

    /// Program to execute (looked up on `$PATH` by the PTY host).
    fn build_command(&self) -> String;

    /// Ordered argument list for the given options.
    fn build_args(&self, options: &SpawnOptions) -> Vec<String>;

    /// Environment overrides merged on top of the inherited environment.
    fn build_env(&self) -> HashMap<String, String>;

    /// Whether the prompt must be typed into the running session instead of
    /// being passed on the command line.
    fn interactive_prompt(&self) -> bool {
        false
    }

    /// Turn raw text fragments into structured events.
    ///
    /// The default wraps every fragment in a single [`AgentEvent::Output`].
    fn parse(&self, raw: RawStream) -> EventStream {
        Box::pin(raw.map(AgentEvent::output))
    }
}

// Compile-time assertion: Adapter must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn Adapter) {}
};

/// Per-stream memory for a [`ChunkScanner`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanState {
    /// Name of the most recent tool call, used to attribute tool results
    /// and permission prompts.
    pub last_tool: Option<String>,
    /// Last working mode reported by a status line, if any.
    pub mode: Option<AgentMode>,
}

/// Line-oriented marker recognition shared by the built-in adapters.
pub trait ChunkScanner: Send + Sync + 'static {
    /// Interpret one ANSI-stripped line. Returns `None` when the line
    /// carries no marker and should fall through to plain output.
    fn scan_line(&self, state: &mut ScanState, line: &str) -> Option<Vec<AgentEvent>>;

    /// Interpret one raw fragment.
    ///
    /// Lines that match no marker are coalesced into one
    /// [`AgentEvent::Output`] per run, emitted in place so ordering with
    /// the recognized events is preserved.
    fn scan_chunk(&self, state: &mut ScanState, chunk: &str) -> Vec<AgentEvent> {
        let clean = strip_ansi(chunk);
        let mut events = Vec::new();
        let mut plain: Vec<&str> = Vec::new();

        for line in clean.split('\n') {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match self.scan_line(state, trimmed) {
                Some(found) => {
                    flush_plain(&mut plain, &mut events);
                    events.extend(found);
                }
                None => plain.push(trimmed),
            }
        }
        flush_plain(&mut plain, &mut events);
        events
    }
}

fn flush_plain(plain: &mut Vec<&str>, events: &mut Vec<AgentEvent>) {
    if !plain.is_empty() {
        events.push(AgentEvent::output(plain.join("\n")));
        plain.clear();
    }
}

/// Build an event stream that runs `scanner` over every fragment of `raw`.
pub fn scan_stream<S: ChunkScanner>(scanner: Arc<S>, raw: RawStream) -> EventStream {
    let stream = async_stream::stream! {
        let mut state = ScanState::default();
        let mut raw = raw;
        while let Some(chunk) = raw.next().await {
            let events = scanner.scan_chunk(&mut state, &chunk);
            if events.is_empty() && !chunk.trim().is_empty() {
                tracing::debug!(bytes = chunk.len(), "fragment carried no text after escape stripping, ignored");
            }
            for event in events {
                yield event;
            }
        }
    };
    Box::pin(stream)
}
