//! Prompt delivery for agents that read their initial prompt interactively.
//!
//! A delivery is a small state machine:
//!
//! ```text
//! pending --(first Ready event | ready timeout)--> delivering --> done
//!    |                                                 |
//!    +--(teardown / stream ended)--> cancelled         +--(teardown / write error)--> abandoned
//! ```
//!
//! While pending, a ready watcher and a timer race; the first to resolve
//! wins and the other is dropped with the `select!`. Delivery then writes
//! the prompt in fixed-size chunks separated by a short delay, followed by a
//! single newline to submit it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapter::AgentEvent;

/// Timing and sizing of interactive prompt delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryConfig {
    /// How long to wait for a `Ready` event before delivering anyway.
    pub ready_timeout: Duration,
    /// Maximum characters per write.
    pub chunk_size: usize,
    /// Pause between two consecutive chunks.
    pub chunk_delay: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_secs(15),
            chunk_size: 1024,
            chunk_delay: Duration::from_millis(10),
        }
    }
}

/// What ended the pending phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryTrigger {
    Ready,
    Timeout,
}

impl fmt::Display for DeliveryTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeliveryTrigger::Ready => "ready",
            DeliveryTrigger::Timeout => "timeout",
        })
    }
}

/// Terminal state of one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Every chunk and the submitting newline were written.
    Delivered {
        trigger: DeliveryTrigger,
        chunks: usize,
    },
    /// The session was torn down while the delivery was pending.
    Cancelled,
    /// The event stream closed (process exit) while pending.
    StreamEnded,
    /// Delivery started but stopped early after `sent` chunks, because the
    /// session was torn down or a write failed.
    Abandoned { sent: usize },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Where prompt text is written. Implemented by
/// [`AgentSession`](crate::session::AgentSession).
#[async_trait]
pub trait PromptSink: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

/// Split `prompt` into chunks of at most `chunk_size` characters.
///
/// Splits on `char` boundaries, so multi-byte characters are never cut.
pub fn chunk_prompt(prompt: &str, chunk_size: usize) -> Vec<String> {
    let chars: Vec<char> = prompt.chars().collect();
    chars
        .chunks(chunk_size.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// One scheduled prompt delivery.
pub struct PromptDelivery {
    pub prompt: String,
    pub config: DeliveryConfig,
    /// Cancelled by teardown while pending.
    pub pending: CancellationToken,
    /// Cancelled by teardown at any time; checked before every write.
    pub lifetime: CancellationToken,
}

impl PromptDelivery {
    /// Run the delivery to completion.
    ///
    /// `events` must be subscribed before the session's producer starts,
    /// or an early `Ready` can be missed. `on_start` runs once, when the
    /// pending phase is won and before the first write.
    pub async fn run<F>(
        self,
        sink: Arc<dyn PromptSink>,
        mut events: broadcast::Receiver<AgentEvent>,
        on_start: F,
    ) -> DeliveryOutcome
    where
        F: FnOnce() + Send,
    {
        let trigger = tokio::select! {
            biased;
            _ = self.pending.cancelled() => return DeliveryOutcome::Cancelled,
            ready = wait_for_ready(&mut events) => {
                if !ready {
                    return DeliveryOutcome::StreamEnded;
                }
                DeliveryTrigger::Ready
            }
            _ = tokio::time::sleep(self.config.ready_timeout) => DeliveryTrigger::Timeout,
        };
        drop(events);
        on_start();
        info!(trigger = %trigger, chars = self.prompt.chars().count(), "delivering prompt");

        self.deliver(sink.as_ref(), trigger).await
    }

    async fn deliver(&self, sink: &dyn PromptSink, trigger: DeliveryTrigger) -> DeliveryOutcome {
        let chunks = chunk_prompt(&self.prompt, self.config.chunk_size);
        let total = chunks.len();

        for (index, chunk) in chunks.iter().enumerate() {
            if self.lifetime.is_cancelled() {
                return DeliveryOutcome::Abandoned { sent: index };
            }
            if let Err(e) = sink.send(chunk).await {
                warn!(error = %e, sent = index, "prompt chunk write failed, abandoning delivery");
                return DeliveryOutcome::Abandoned { sent: index };
            }
            if index + 1 < total {
                tokio::select! {
                    biased;
                    _ = self.lifetime.cancelled() => {
                        return DeliveryOutcome::Abandoned { sent: index + 1 };
                    }
                    _ = tokio::time::sleep(self.config.chunk_delay) => {}
                }
            }
        }

        if self.lifetime.is_cancelled() {
            return DeliveryOutcome::Abandoned { sent: total };
        }
        if let Err(e) = sink.send("\n").await {
            warn!(error = %e, "prompt submit failed, abandoning delivery");
            return DeliveryOutcome::Abandoned { sent: total };
        }
        DeliveryOutcome::Delivered {
            trigger,
            chunks: total,
        }
    }
}

/// Resolve `true` on the first `Ready` event, `false` once the stream closes.
async fn wait_for_ready(events: &mut broadcast::Receiver<AgentEvent>) -> bool {
    loop {
        match events.recv().await {
            Ok(event) if event.is_ready() => return true,
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "ready watcher lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return false,
        }
    }
}
