//! Agent sessions: one adapter bound to one PTY process.
//!
//! A session owns a single producer task that reads the PTY output once and
//! fans it out on two broadcast channels: decoded raw text and parsed
//! [`AgentEvent`]s. Any number of subscribers observe the same emissions;
//! the adapter's parser runs exactly once per fragment.

mod decoder;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::sync::{broadcast, oneshot, watch};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::adapter::{Adapter, AgentEvent, AgentKind, RawStream};
use crate::delivery::PromptSink;
use crate::pty::{PtyHandle, SessionState};
use crate::terminal::SessionRegistry;

pub use decoder::Utf8Decoder;

/// The ETX control byte most CLIs treat as Ctrl-C.
pub const INTERRUPT: &str = "\x03";

/// Why a session was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    Killed,
    Exited,
}

impl fmt::Display for TeardownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TeardownReason::Killed => "killed",
            TeardownReason::Exited => "exited",
        })
    }
}

/// Sending halves of a session's broadcast channels.
///
/// Taken (and dropped) by the producer when the process exits, which closes
/// the channels for every subscriber.
struct SessionStreams {
    events: broadcast::Sender<AgentEvent>,
    raw: broadcast::Sender<String>,
}

type SharedStreams = Arc<Mutex<Option<SessionStreams>>>;

/// Receivers opened when the session is wired, before any output is read.
///
/// The first subscriber of each stream takes one over and so receives
/// everything published before it attached, up to the stream capacity.
/// Later subscribers only see what follows their subscription.
struct Backlog {
    events: Option<broadcast::Receiver<AgentEvent>>,
    raw: Option<broadcast::Receiver<String>>,
}

/// A running agent: one adapter composed with one PTY process.
///
/// Created by [`crate::terminal::AgentTerminal::spawn`] and owned by the
/// terminal's registry until it is killed or its process exits.
pub struct AgentSession {
    id: String,
    agent: AgentKind,
    pty: Arc<dyn PtyHandle>,
    streams: SharedStreams,
    backlog: Mutex<Backlog>,
    /// Cancelled exactly once, when the session is torn down.
    lifetime: CancellationToken,
    torn_down: AtomicBool,
    registry: Weak<SessionRegistry>,
}

impl AgentSession {
    /// Wire a session around `pty` and start its producer task.
    ///
    /// The producer holds its PTY output subscription from this point on but
    /// does not read it until the returned sender fires (or is dropped), so
    /// internal watchers attach before the first event is published.
    pub(crate) fn wire(
        pty: Arc<dyn PtyHandle>,
        adapter: Arc<dyn Adapter>,
        stream_capacity: usize,
        registry: Weak<SessionRegistry>,
    ) -> (Arc<Self>, oneshot::Sender<()>) {
        let (events_tx, events_backlog) = broadcast::channel(stream_capacity);
        let (raw_tx, raw_backlog) = broadcast::channel(stream_capacity);
        let streams: SharedStreams = Arc::new(Mutex::new(Some(SessionStreams {
            events: events_tx.clone(),
            raw: raw_tx.clone(),
        })));

        let session = Arc::new(Self {
            id: pty.id().to_string(),
            agent: adapter.agent(),
            pty: Arc::clone(&pty),
            streams: Arc::clone(&streams),
            backlog: Mutex::new(Backlog {
                events: Some(events_backlog),
                raw: Some(raw_backlog),
            }),
            lifetime: CancellationToken::new(),
            torn_down: AtomicBool::new(false),
            registry,
        });

        let (release_tx, release_rx) = oneshot::channel();
        let producer = Producer {
            session_id: session.id.clone(),
            output: pty.subscribe_output(),
            pty,
            adapter,
            events: events_tx,
            raw: raw_tx,
            streams,
        };
        tokio::spawn(producer.run(release_rx));

        (session, release_tx)
    }

    /// Identifier assigned by the PTY host.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn agent(&self) -> AgentKind {
        self.agent
    }

    /// Subscribe to structured events. The receiver closes after the
    /// final [`AgentEvent::Exit`].
    ///
    /// The first call receives every event published since the session was
    /// wired, so subscribing right after spawn misses nothing.
    pub fn subscribe_events(&self) -> broadcast::Receiver<AgentEvent> {
        if let Some(backlog) = lock(&self.backlog).events.take() {
            return backlog;
        }
        self.subscribe_events_live()
    }

    /// Subscribe to events published from now on, leaving the backlog for
    /// the first external subscriber.
    pub(crate) fn subscribe_events_live(&self) -> broadcast::Receiver<AgentEvent> {
        match lock(&self.streams).as_ref() {
            Some(streams) => streams.events.subscribe(),
            None => closed_receiver(),
        }
    }

    /// Structured events as a stream. Lagged emissions are skipped.
    pub fn events(&self) -> impl Stream<Item = AgentEvent> + Send + 'static {
        lossy_stream(self.subscribe_events(), self.id.clone())
    }

    /// Subscribe to decoded raw text, exactly as the PTY emitted it. The
    /// first call receives the backlog, like [`Self::subscribe_events`].
    pub fn subscribe_raw(&self) -> broadcast::Receiver<String> {
        if let Some(backlog) = lock(&self.backlog).raw.take() {
            return backlog;
        }
        match lock(&self.streams).as_ref() {
            Some(streams) => streams.raw.subscribe(),
            None => closed_receiver(),
        }
    }

    pub fn raw(&self) -> impl Stream<Item = String> + Send + 'static {
        lossy_stream(self.subscribe_raw(), self.id.clone())
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.pty.subscribe_state()
    }

    /// Current lifecycle state of the underlying process.
    pub fn state(&self) -> SessionState {
        *self.pty.subscribe_state().borrow()
    }

    /// `true` until the session is torn down or its process exits.
    pub fn is_alive(&self) -> bool {
        !self.torn_down.load(Ordering::SeqCst) && !self.state().is_exited()
    }

    /// Token cancelled when the session is torn down.
    pub fn lifetime(&self) -> CancellationToken {
        self.lifetime.clone()
    }

    /// Write text to the agent's terminal input.
    pub async fn send(&self, text: &str) -> Result<()> {
        self.pty
            .write(text.as_bytes())
            .await
            .with_context(|| format!("failed to write to session {}", self.id))
    }

    /// Send Ctrl-C.
    pub async fn interrupt(&self) -> Result<()> {
        self.send(INTERRUPT).await
    }

    /// Cancel any pending prompt delivery, terminate the process and remove
    /// the session from its terminal.
    ///
    /// Idempotent, and a no-op when the process already exited. Failures to
    /// kill an already-dead process are logged, not returned.
    pub async fn kill(&self) {
        if !self.teardown(TeardownReason::Killed) {
            return;
        }
        if let Err(e) = self.pty.kill().await {
            debug!(session_id = %self.id, error = %e, "kill failed, process likely already gone");
        }
    }

    /// Release everything the session holds in its terminal. Returns `false`
    /// when another path already did.
    pub(crate) fn teardown(&self, reason: TeardownReason) -> bool {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.lifetime.cancel();
        if let Some(registry) = self.registry.upgrade() {
            registry.release(&self.id);
        }
        tracing::info!(session_id = %self.id, agent = %self.agent, reason = %reason, "session torn down");
        true
    }
}

#[async_trait]
impl PromptSink for AgentSession {
    async fn send(&self, text: &str) -> Result<()> {
        AgentSession::send(self, text).await
    }
}

impl fmt::Debug for AgentSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentSession")
            .field("id", &self.id)
            .field("agent", &self.agent)
            .field("torn_down", &self.torn_down.load(Ordering::SeqCst))
            .finish()
    }
}

/// The single reader of a session's PTY output.
struct Producer {
    session_id: String,
    output: broadcast::Receiver<Vec<u8>>,
    pty: Arc<dyn PtyHandle>,
    adapter: Arc<dyn Adapter>,
    events: broadcast::Sender<AgentEvent>,
    raw: broadcast::Sender<String>,
    streams: SharedStreams,
}

impl Producer {
    async fn run(self, release: oneshot::Receiver<()>) {
        // A dropped sender releases the producer too.
        let _ = release.await;

        let Producer {
            session_id,
            output,
            pty,
            adapter,
            events,
            raw,
            streams,
        } = self;

        let mut parsed = adapter.parse(raw_text(output, raw, session_id.clone()));
        while let Some(event) = parsed.next().await {
            // No subscribers is fine; the emission is simply unobserved.
            let _ = events.send(event);
        }

        let code = pty.wait_exit().await;
        debug!(session_id = %session_id, code = ?code, "pty output closed");
        let _ = events.send(AgentEvent::Exit { code });

        // Dropping every sender closes the channels for all subscribers.
        lock(&streams).take();
    }
}

/// Decode PTY output into text, publishing each fragment on `raw` before the
/// parser sees it.
fn raw_text(
    mut output: broadcast::Receiver<Vec<u8>>,
    raw: broadcast::Sender<String>,
    session_id: String,
) -> RawStream {
    let stream = async_stream::stream! {
        let mut decoder = Utf8Decoder::default();
        loop {
            match output.recv().await {
                Ok(bytes) => {
                    let text = decoder.decode(&bytes);
                    if text.is_empty() {
                        continue;
                    }
                    let _ = raw.send(text.clone());
                    yield text;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(session_id = %session_id, skipped, "pty output lagged, fragments dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        let tail = decoder.finish();
        if !tail.is_empty() {
            let _ = raw.send(tail.clone());
            yield tail;
        }
    };
    Box::pin(stream)
}

fn lossy_stream<T: Clone + Send + 'static>(
    rx: broadcast::Receiver<T>,
    session_id: String,
) -> impl Stream<Item = T> + Send + 'static {
    tokio_stream::StreamExt::filter_map(BroadcastStream::new(rx), move |item| match item {
        Ok(value) => Some(value),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            warn!(session_id = %session_id, skipped, "subscriber lagged, emissions skipped");
            None
        }
    })
}

fn closed_receiver<T: Clone>() -> broadcast::Receiver<T> {
    broadcast::channel(1).1
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
