//! Errors surfaced by [`AgentTerminal::spawn`](crate::terminal::AgentTerminal::spawn).
//!
//! Everything after a successful spawn (process death, delivery timeouts,
//! abandoned deliveries) is absorbed by the session and observed through its
//! state and event streams instead.

use crate::adapter::AgentKind;

#[derive(Debug, thiserror::Error)]
pub enum TerminalError {
    /// No adapter is registered for the requested agent.
    #[error("unknown agent: {0}")]
    UnknownAgent(AgentKind),

    /// The PTY host failed to create the process.
    #[error("failed to start {agent} in a pseudo-terminal")]
    Pty {
        agent: AgentKind,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn unknown_agent_message_names_the_agent() {
        let err = TerminalError::UnknownAgent(AgentKind::Codex);
        assert_eq!(err.to_string(), "unknown agent: codex");
        assert!(err.source().is_none());
    }

    #[test]
    fn pty_error_keeps_its_source() {
        let err = TerminalError::Pty {
            agent: AgentKind::Claude,
            source: anyhow::anyhow!("no such file or directory"),
        };
        assert_eq!(err.to_string(), "failed to start claude in a pseudo-terminal");
        assert_eq!(err.source().unwrap().to_string(), "no such file or directory");
    }
}
