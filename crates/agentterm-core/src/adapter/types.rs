//! Types shared by every adapter: agent identities, spawn options, and the
//! normalized [`AgentEvent`] vocabulary.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identity of a supported agent CLI.
///
/// The set is closed: supporting a new agent means adding a variant here
/// and an adapter for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Claude,
    Codex,
}

impl AgentKind {
    /// Every known agent, in a stable order.
    pub const ALL: [AgentKind; 2] = [AgentKind::Claude, AgentKind::Codex];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Claude => "claude",
            AgentKind::Codex => "codex",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known agent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown agent {0:?} (expected claude or codex)")]
pub struct ParseAgentKindError(pub String);

impl FromStr for AgentKind {
    type Err = ParseAgentKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" => Ok(AgentKind::Claude),
            "codex" => Ok(AgentKind::Codex),
            other => Err(ParseAgentKindError(other.to_string())),
        }
    }
}

/// Everything needed to spawn one agent session.
///
/// Consumed by [`crate::terminal::AgentTerminal::spawn`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnOptions {
    /// Which agent CLI to launch.
    pub agent: AgentKind,
    /// Working directory for the agent process.
    pub cwd: PathBuf,
    /// Initial prompt, delivered either as a CLI flag or typed into the
    /// session once it is ready, depending on the adapter.
    pub prompt: Option<String>,
    /// Extra CLI arguments appended after the adapter's own flags.
    pub args: Vec<String>,
    /// Tool names the agent may use without asking.
    pub allowed_tools: Vec<String>,
}

impl SpawnOptions {
    pub fn new(agent: AgentKind, cwd: impl Into<PathBuf>) -> Self {
        Self {
            agent,
            cwd: cwd.into(),
            prompt: None,
            args: Vec::new(),
            allowed_tools: Vec::new(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_allowed_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    /// The prompt, if one was supplied and it is not blank.
    pub fn non_empty_prompt(&self) -> Option<&str> {
        self.prompt.as_deref().filter(|p| !p.trim().is_empty())
    }
}

/// Working mode reported by an agent's status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    Plan,
    Execute,
    Idle,
}

/// What happened to a file in a [`AgentEvent::FileEdit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    Create,
    Edit,
    Write,
    Delete,
}

/// A structured event derived from an agent's raw terminal output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AgentEvent {
    /// Text that matched no other rule.
    Output { text: String },
    /// The agent reported an error.
    Error { message: String },
    /// The process exited. Always the last event of a session.
    Exit { code: Option<i32> },
    /// The agent is working (spinner / "esc to interrupt").
    Thinking,
    /// An assistant message.
    Message { content: String },
    ToolStart { tool: String, input: String },
    ToolEnd { tool: String, output: String },
    ModeChange { mode: AgentMode },
    FileEdit { path: String, action: FileAction },
    CommandRun { command: String },
    /// The agent asked the user a question.
    Question { text: String },
    /// The agent is waiting for approval to use a tool.
    PermissionRequest { tool: String, details: String },
    /// The agent's input box is idle and accepting input.
    Ready,
    TaskComplete,
}

impl AgentEvent {
    pub fn output(text: impl Into<String>) -> Self {
        AgentEvent::Output { text: text.into() }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, AgentEvent::Ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_kind_round_trips_through_strings() {
        for kind in AgentKind::ALL {
            assert_eq!(kind.to_string().parse::<AgentKind>().unwrap(), kind);
        }
        assert_eq!(" Claude ".parse::<AgentKind>().unwrap(), AgentKind::Claude);
    }

    #[test]
    fn agent_kind_rejects_unknown_names() {
        let err = "gemini".parse::<AgentKind>().unwrap_err();
        assert_eq!(err, ParseAgentKindError("gemini".to_string()));
        assert!(err.to_string().contains("gemini"));
    }

    #[test]
    fn non_empty_prompt_ignores_blank_text() {
        let opts = SpawnOptions::new(AgentKind::Claude, "/tmp").with_prompt("   ");
        assert_eq!(opts.non_empty_prompt(), None);

        let opts = SpawnOptions::new(AgentKind::Claude, "/tmp").with_prompt("fix the bug");
        assert_eq!(opts.non_empty_prompt(), Some("fix the bug"));
    }

    #[test]
    fn events_serialize_with_kebab_case_tags() {
        let json = serde_json::to_value(AgentEvent::ToolStart {
            tool: "Bash".to_string(),
            input: "ls".to_string(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"type": "tool-start", "tool": "Bash", "input": "ls"}));

        let json = serde_json::to_value(AgentEvent::ModeChange { mode: AgentMode::Plan }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "mode-change", "mode": "plan"}));

        let json = serde_json::to_value(AgentEvent::TaskComplete).unwrap();
        assert_eq!(json, serde_json::json!({"type": "task-complete"}));
    }
}
