//! Agent adapters: per-agent command construction and output parsing.
//!
//! This module defines the [`Adapter`] trait that every agent adapter
//! implements, the shared types ([`AgentKind`], [`SpawnOptions`],
//! [`AgentEvent`]) and the [`AdapterRegistry`] used for lookup at spawn
//! time.
//!
//! # Architecture
//!
//! ```text
//! AgentTerminal::spawn(options)
//!     |
//!     v
//! AdapterRegistry --get(options.agent)--> Arc<dyn Adapter>
//!     |                                        |
//!     |   build_command() / build_args() / build_env()
//!     |        |
//!     |        v
//!     |   PtyHost::create(..) --> raw text fragments
//!     |                                |
//!     |   parse(raw) ------------------+--> Stream<AgentEvent>
//! ```

pub mod ansi;
pub mod claude;
pub mod codex;
pub mod registry;
pub mod trait_def;
pub mod types;

// Re-export the primary public API at the module level.
pub use claude::ClaudeAdapter;
pub use codex::CodexAdapter;
pub use registry::AdapterRegistry;
pub use trait_def::{Adapter, ChunkScanner, EventStream, RawStream, ScanState};
pub use types::{AgentEvent, AgentKind, AgentMode, FileAction, ParseAgentKindError, SpawnOptions};
