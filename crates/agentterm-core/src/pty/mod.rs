//! Pseudo-terminal contract.
//!
//! The terminal does not allocate PTYs or spawn processes itself. It asks a
//! [`PtyHost`] for a [`PtyHandle`] and drives the process through it. The
//! desktop shell supplies the real host; tests use an in-memory one.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};

/// Lifecycle of a pseudo-terminal process.
///
/// Transitions are monotonic: `Idle -> Running -> Exited`, never out of
/// `Exited`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Running,
    Exited,
}

impl SessionState {
    pub fn is_exited(&self) -> bool {
        matches!(self, SessionState::Exited)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Exited => "exited",
        })
    }
}

/// Parameters for creating one PTY process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtySpawnRequest {
    pub command: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Overrides merged on top of the inherited environment by the host.
    pub env: HashMap<String, String>,
}

/// Creates PTY processes.
#[async_trait]
pub trait PtyHost: Send + Sync {
    async fn create(&self, request: PtySpawnRequest) -> Result<Arc<dyn PtyHandle>>;
}

/// One live (or exited) PTY process.
///
/// Contract:
/// - `subscribe_output` receivers see every fragment emitted after the
///   subscription, in order. The channel closes once the process has
///   exited and its remaining output was sent.
/// - `wait_exit` resolves once with the exit code (`None` when killed by a
///   signal or unknown), for any number of callers, including callers that
///   arrive after the exit.
/// - `write` and `kill` on an exited process return an error; they never
///   panic.
#[async_trait]
pub trait PtyHandle: Send + Sync {
    /// Stable identifier assigned by the host.
    fn id(&self) -> &str;

    fn subscribe_output(&self) -> broadcast::Receiver<Vec<u8>>;

    fn subscribe_state(&self) -> watch::Receiver<SessionState>;

    async fn wait_exit(&self) -> Option<i32>;

    async fn write(&self, data: &[u8]) -> Result<()>;

    async fn kill(&self) -> Result<()>;
}

// Compile-time assertion: both traits must be usable as trait objects.
const _: () = {
    fn _assert_object_safe(_: &dyn PtyHost, _: &dyn PtyHandle) {}
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_state_display_and_serde_agree() {
        for state in [SessionState::Idle, SessionState::Running, SessionState::Exited] {
            let json = serde_json::to_value(state).unwrap();
            assert_eq!(json, serde_json::Value::String(state.to_string()));
        }
        assert!(SessionState::Exited.is_exited());
        assert!(!SessionState::Running.is_exited());
    }
}
