//! Configuration for the terminal, prompt delivery, and per-agent overrides.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration. Loading the file from disk is the binary's job.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::adapter::AgentKind;
use crate::delivery::DeliveryConfig;

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub terminal: TerminalSection,
    pub delivery: DeliverySection,
    pub agents: AgentsSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalSection {
    /// Buffered emissions per broadcast stream before slow subscribers lag.
    pub stream_capacity: usize,
}

impl Default for TerminalSection {
    fn default() -> Self {
        Self {
            stream_capacity: 1024,
        }
    }
}

/// Prompt delivery timing, in plain integers for the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverySection {
    pub ready_timeout_ms: u64,
    pub chunk_size: usize,
    pub chunk_delay_ms: u64,
}

impl Default for DeliverySection {
    fn default() -> Self {
        let defaults = DeliveryConfig::default();
        Self {
            ready_timeout_ms: defaults.ready_timeout.as_millis() as u64,
            chunk_size: defaults.chunk_size,
            chunk_delay_ms: defaults.chunk_delay.as_millis() as u64,
        }
    }
}

impl DeliverySection {
    pub fn to_delivery_config(&self) -> DeliveryConfig {
        DeliveryConfig {
            ready_timeout: Duration::from_millis(self.ready_timeout_ms),
            chunk_size: self.chunk_size,
            chunk_delay: Duration::from_millis(self.chunk_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsSection {
    pub claude: AgentConfig,
    pub codex: AgentConfig,
}

impl AgentsSection {
    pub fn get(&self, agent: AgentKind) -> &AgentConfig {
        match agent {
            AgentKind::Claude => &self.claude,
            AgentKind::Codex => &self.codex,
        }
    }
}

/// Per-agent invocation overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Executable to run instead of the agent's default program name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,
    /// Arguments placed before the adapter's own flags.
    pub args: Vec<String>,
    /// Environment overrides for every session of this agent.
    pub env: BTreeMap<String, String>,
}

impl TerminalConfig {
    /// Reject values that would make sessions unusable.
    pub fn validate(&self) -> Result<()> {
        if self.terminal.stream_capacity == 0 {
            bail!("terminal.stream_capacity must be at least 1");
        }
        if self.delivery.chunk_size == 0 {
            bail!("delivery.chunk_size must be at least 1");
        }
        for agent in AgentKind::ALL {
            if let Some(binary) = &self.agents.get(agent).binary {
                if binary.trim().is_empty() {
                    bail!("agents.{agent}.binary must not be empty");
                }
            }
        }
        Ok(())
    }
}
