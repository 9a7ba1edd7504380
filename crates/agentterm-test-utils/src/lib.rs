//! Shared test utilities for agentterm integration tests.
//!
//! Provides an in-memory [`PtyHost`] whose processes never run anything:
//! tests script their output and exit, and inspect what the terminal wrote
//! to them.
//!
//! Writes are stamped with `tokio::time::Instant`, so tests running on a
//! paused clock (`#[tokio::test(start_paused = true)]`) can assert exact
//! delivery timing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use agentterm_core::pty::{PtyHandle, PtyHost, PtySpawnRequest, SessionState};
use anyhow::{Result, bail};
use async_trait::async_trait;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use uuid::Uuid;

/// Output channel capacity of a fake process.
const OUTPUT_CAPACITY: usize = 256;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One write the terminal made to a fake process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub at: Instant,
    pub text: String,
}

/// A scripted pseudo-terminal process.
pub struct FakePty {
    id: String,
    request: PtySpawnRequest,
    /// `None` once the process has exited, which closes every receiver.
    output: Mutex<Option<broadcast::Sender<Vec<u8>>>>,
    state: watch::Sender<SessionState>,
    /// `Some(code)` once exited.
    exit: watch::Sender<Option<Option<i32>>>,
    writes: Mutex<Vec<RecordedWrite>>,
    kills: AtomicUsize,
    /// Printed as soon as the first reader attaches.
    banner: Mutex<Option<String>>,
}

impl FakePty {
    fn new(request: PtySpawnRequest, banner: Option<String>) -> Self {
        let (output, _) = broadcast::channel(OUTPUT_CAPACITY);
        Self {
            id: format!("pty-{}", Uuid::new_v4()),
            request,
            output: Mutex::new(Some(output)),
            state: watch::Sender::new(SessionState::Running),
            exit: watch::Sender::new(None),
            writes: Mutex::new(Vec::new()),
            kills: AtomicUsize::new(0),
            banner: Mutex::new(banner),
        }
    }

    /// The request this process was created with.
    pub fn request(&self) -> &PtySpawnRequest {
        &self.request
    }

    /// Emit text as if the process printed it.
    pub fn emit(&self, text: &str) {
        self.emit_bytes(text.as_bytes());
    }

    /// Emit raw bytes. Ignored after exit.
    pub fn emit_bytes(&self, bytes: &[u8]) {
        if let Some(output) = lock(&self.output).as_ref() {
            let _ = output.send(bytes.to_vec());
        }
    }

    pub fn set_state(&self, state: SessionState) {
        self.state.send_replace(state);
    }

    /// Terminate the process with `code`: close its output, move to
    /// `Exited` and resolve every `wait_exit` caller. Repeated calls are
    /// ignored.
    pub fn exit(&self, code: Option<i32>) {
        if self.is_exited() {
            return;
        }
        lock(&self.output).take();
        self.state.send_replace(SessionState::Exited);
        self.exit.send_replace(Some(code));
    }

    pub fn is_exited(&self) -> bool {
        self.exit.borrow().is_some()
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        lock(&self.writes).clone()
    }

    /// Everything written so far, concatenated.
    pub fn written(&self) -> String {
        lock(&self.writes).iter().map(|w| w.text.as_str()).collect()
    }

    pub fn kill_count(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PtyHandle for FakePty {
    fn id(&self) -> &str {
        &self.id
    }

    fn subscribe_output(&self) -> broadcast::Receiver<Vec<u8>> {
        let rx = match lock(&self.output).as_ref() {
            Some(output) => output.subscribe(),
            None => broadcast::channel(1).1,
        };
        if let Some(banner) = lock(&self.banner).take() {
            self.emit(&banner);
        }
        rx
    }

    fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    async fn wait_exit(&self) -> Option<i32> {
        let mut exit = self.exit.subscribe();
        match exit.wait_for(Option::is_some).await {
            Ok(code) => (*code).flatten(),
            Err(_) => None,
        }
    }

    async fn write(&self, data: &[u8]) -> Result<()> {
        if self.is_exited() {
            bail!("pty {} has exited", self.id);
        }
        lock(&self.writes).push(RecordedWrite {
            at: Instant::now(),
            text: String::from_utf8_lossy(data).into_owned(),
        });
        Ok(())
    }

    async fn kill(&self) -> Result<()> {
        if self.is_exited() {
            bail!("pty {} has already exited", self.id);
        }
        self.kills.fetch_add(1, Ordering::SeqCst);
        self.exit(None);
        Ok(())
    }
}

/// In-memory [`PtyHost`] that hands out [`FakePty`] processes.
#[derive(Default)]
pub struct FakePtyHost {
    ptys: Mutex<Vec<Arc<FakePty>>>,
    fail_next: Mutex<Option<String>>,
    banner: Mutex<Option<String>>,
}

impl FakePtyHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next `create` call fail with `message`.
    pub fn fail_next(&self, message: impl Into<String>) {
        *lock(&self.fail_next) = Some(message.into());
    }

    /// Make every process created from now on print `text` the moment its
    /// output is first subscribed, the way a real agent prints its banner
    /// while the terminal is still wiring the session.
    pub fn set_banner(&self, text: impl Into<String>) {
        *lock(&self.banner) = Some(text.into());
    }

    /// Every process created so far, in creation order.
    pub fn ptys(&self) -> Vec<Arc<FakePty>> {
        lock(&self.ptys).clone()
    }

    pub fn last(&self) -> Option<Arc<FakePty>> {
        lock(&self.ptys).last().cloned()
    }

    pub fn pty(&self, id: &str) -> Option<Arc<FakePty>> {
        lock(&self.ptys).iter().find(|p| p.id == id).cloned()
    }

    pub fn requests(&self) -> Vec<PtySpawnRequest> {
        lock(&self.ptys).iter().map(|p| p.request.clone()).collect()
    }
}

#[async_trait]
impl PtyHost for FakePtyHost {
    async fn create(&self, request: PtySpawnRequest) -> Result<Arc<dyn PtyHandle>> {
        if let Some(message) = lock(&self.fail_next).take() {
            bail!("{message}");
        }
        let banner = lock(&self.banner).clone();
        let pty = Arc::new(FakePty::new(request, banner));
        lock(&self.ptys).push(Arc::clone(&pty));
        Ok(pty)
    }
}
