//! Core of agentterm: supervise interactive AI coding agent CLIs running in
//! pseudo-terminals.
//!
//! An [`AgentTerminal`] spawns agents through a [`PtyHost`], normalizes each
//! agent's raw terminal output into [`AgentEvent`]s with a per-agent
//! [`Adapter`], and delivers the initial prompt to agents that only read it
//! interactively.

pub mod adapter;
pub mod config;
pub mod delivery;
pub mod error;
pub mod pty;
pub mod session;
pub mod terminal;

pub use adapter::{Adapter, AdapterRegistry, AgentEvent, AgentKind, SpawnOptions};
pub use config::TerminalConfig;
pub use delivery::{DeliveryConfig, DeliveryOutcome};
pub use error::TerminalError;
pub use pty::{PtyHandle, PtyHost, PtySpawnRequest, SessionState};
pub use session::AgentSession;
pub use terminal::AgentTerminal;
