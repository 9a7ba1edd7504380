//! Adapter registry -- the lookup table from agent identity to adapter.
//!
//! The terminal resolves an adapter once per spawn. Adapters are shared
//! (`Arc`) by every session of the same agent.

use std::collections::HashMap;
use std::sync::Arc;

use super::claude::ClaudeAdapter;
use super::codex::CodexAdapter;
use super::trait_def::Adapter;
use super::types::AgentKind;
use crate::config::TerminalConfig;

/// A collection of registered [`Adapter`] implementations, keyed by agent.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<AgentKind, Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in adapters, configured from `config`.
    pub fn with_defaults(config: &TerminalConfig) -> Self {
        let mut registry = Self::new();
        registry.register(ClaudeAdapter::from_config(&config.agents.claude));
        registry.register(CodexAdapter::from_config(&config.agents.codex));
        registry
    }

    /// Register an adapter under the agent it reports via [`Adapter::agent`].
    ///
    /// Replaces and returns any adapter already registered for that agent.
    pub fn register(&mut self, adapter: impl Adapter + 'static) -> Option<Arc<dyn Adapter>> {
        self.register_arc(Arc::new(adapter))
    }

    pub fn register_arc(&mut self, adapter: Arc<dyn Adapter>) -> Option<Arc<dyn Adapter>> {
        self.adapters.insert(adapter.agent(), adapter)
    }

    /// Look up the adapter for an agent.
    pub fn get(&self, agent: AgentKind) -> Option<Arc<dyn Adapter>> {
        self.adapters.get(&agent).cloned()
    }

    /// Registered agents, sorted.
    pub fn list(&self) -> Vec<AgentKind> {
        let mut agents: Vec<AgentKind> = self.adapters.keys().copied().collect();
        agents.sort();
        agents
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapters", &self.list())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::SpawnOptions;

    #[test]
    fn registry_starts_empty() {
        let registry = AdapterRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.list().is_empty());
        assert!(registry.get(AgentKind::Claude).is_none());
    }

    #[test]
    fn defaults_register_every_agent() {
        let registry = AdapterRegistry::with_defaults(&TerminalConfig::default());
        assert_eq!(registry.list(), AgentKind::ALL.to_vec());
        for agent in AgentKind::ALL {
            assert_eq!(registry.get(agent).unwrap().agent(), agent);
        }
    }

    #[test]
    fn defaults_honor_binary_overrides() {
        let mut config = TerminalConfig::default();
        config.agents.codex.binary = Some("/opt/codex".to_string());
        let registry = AdapterRegistry::with_defaults(&config);
        assert_eq!(registry.get(AgentKind::Codex).unwrap().build_command(), "/opt/codex");
        assert_eq!(registry.get(AgentKind::Claude).unwrap().build_command(), "claude");
    }

    #[test]
    fn register_replaces_existing() {
        let mut registry = AdapterRegistry::new();
        assert!(registry.register(ClaudeAdapter::new()).is_none());
        let old = registry.register(ClaudeAdapter::with_binary("claude-next"));
        assert_eq!(old.unwrap().build_command(), "claude");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(AgentKind::Claude).unwrap().build_command(), "claude-next");
    }

    #[test]
    fn shared_adapter_is_the_same_instance() {
        let registry = AdapterRegistry::with_defaults(&TerminalConfig::default());
        let a = registry.get(AgentKind::Claude).unwrap();
        let b = registry.get(AgentKind::Claude).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let opts = SpawnOptions::new(AgentKind::Claude, "/tmp").with_allowed_tools(["Read"]);
        assert_eq!(a.build_args(&opts), b.build_args(&opts));
    }

    #[test]
    fn registry_debug_shows_agents() {
        let registry = AdapterRegistry::with_defaults(&TerminalConfig::default());
        let debug = format!("{registry:?}");
        assert!(debug.contains("Claude"));
        assert!(debug.contains("Codex"));
    }
}
