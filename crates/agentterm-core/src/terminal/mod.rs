//! The agent terminal: spawns sessions and owns the live registry.
//!
//! ```text
//! spawn(options)
//!   -> adapter lookup (UnknownAgent)
//!   -> PtyHost::create(command, args, cwd, env) (Pty)
//!   -> AgentSession::wire        producer held back
//!   -> registry insert
//!   -> exit watcher              teardown(Exited) on process exit
//!   -> prompt delivery           only for interactive-prompt adapters
//!   -> release producer
//! ```

mod registry;

use std::sync::Arc;

use futures::future::join_all;
use tracing::{Instrument, debug, info, info_span};

use crate::adapter::{AdapterRegistry, SpawnOptions};
use crate::config::TerminalConfig;
use crate::delivery::{DeliveryConfig, PromptDelivery, PromptSink};
use crate::error::TerminalError;
use crate::pty::{PtyHost, PtySpawnRequest};
use crate::session::{AgentSession, TeardownReason};

pub(crate) use registry::SessionRegistry;

/// Registry and factory of live agent sessions.
pub struct AgentTerminal {
    adapters: AdapterRegistry,
    host: Arc<dyn PtyHost>,
    delivery: DeliveryConfig,
    stream_capacity: usize,
    registry: Arc<SessionRegistry>,
}

impl AgentTerminal {
    pub fn new(host: Arc<dyn PtyHost>, adapters: AdapterRegistry, config: &TerminalConfig) -> Self {
        Self {
            adapters,
            host,
            delivery: config.delivery.to_delivery_config(),
            stream_capacity: config.terminal.stream_capacity.max(1),
            registry: Arc::new(SessionRegistry::default()),
        }
    }

    /// Terminal with the built-in adapters, configured from `config`.
    pub fn with_defaults(host: Arc<dyn PtyHost>, config: &TerminalConfig) -> Self {
        Self::new(host, AdapterRegistry::with_defaults(config), config)
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    pub fn delivery_config(&self) -> DeliveryConfig {
        self.delivery
    }

    /// Start an agent in a new pseudo-terminal.
    ///
    /// When this returns, the session is registered and its streams are
    /// wired. The first subscriber of each stream receives everything
    /// published since wiring, so subscribing right away misses nothing on
    /// any runtime flavor.
    pub async fn spawn(&self, options: SpawnOptions) -> Result<Arc<AgentSession>, TerminalError> {
        let agent = options.agent;
        let adapter = self
            .adapters
            .get(agent)
            .ok_or(TerminalError::UnknownAgent(agent))?;

        let request = PtySpawnRequest {
            command: adapter.build_command(),
            args: adapter.build_args(&options),
            cwd: options.cwd.clone(),
            env: adapter.build_env(),
        };
        let command = request.command.clone();
        let pty = self
            .host
            .create(request)
            .await
            .map_err(|source| TerminalError::Pty { agent, source })?;

        let (session, release) = AgentSession::wire(
            Arc::clone(&pty),
            Arc::clone(&adapter),
            self.stream_capacity,
            Arc::downgrade(&self.registry),
        );
        self.registry.insert(Arc::clone(&session));

        let lifetime = session.lifetime();
        tokio::spawn({
            let session = Arc::clone(&session);
            async move {
                tokio::select! {
                    biased;
                    _ = lifetime.cancelled() => {}
                    code = pty.wait_exit() => {
                        debug!(session_id = %session.id(), code = ?code, "process exited");
                        session.teardown(TeardownReason::Exited);
                    }
                }
            }
        });

        if adapter.interactive_prompt() {
            if let Some(prompt) = options.non_empty_prompt() {
                self.schedule_delivery(&session, prompt.to_string());
            }
        }

        // Dropping the sender would release the producer as well.
        let _ = release.send(());

        info!(
            session_id = %session.id(),
            agent = %agent,
            command = %command,
            "session spawned"
        );
        Ok(session)
    }

    /// Arm a prompt delivery for `session`. Must run before the producer is
    /// released so the ready watcher sees the first event.
    fn schedule_delivery(&self, session: &Arc<AgentSession>, prompt: String) {
        let id = session.id().to_string();
        let lifetime = session.lifetime();
        let pending = lifetime.child_token();
        self.registry.arm(&id, pending.clone());

        let delivery = PromptDelivery {
            prompt,
            config: self.delivery,
            pending,
            lifetime,
        };
        let events = session.subscribe_events_live();
        let sink: Arc<dyn PromptSink> = Arc::clone(session) as Arc<dyn PromptSink>;
        let registry = Arc::downgrade(&self.registry);
        let span = info_span!("prompt_delivery", session_id = %id);

        tokio::spawn(
            async move {
                let on_start = {
                    let id = id.clone();
                    move || {
                        if let Some(registry) = registry.upgrade() {
                            registry.disarm(&id);
                        }
                    }
                };
                let outcome = delivery.run(sink, events, on_start).await;
                info!(outcome = ?outcome, "prompt delivery finished");
            }
            .instrument(span),
        );
    }

    /// Look up a live session.
    pub fn get(&self, id: &str) -> Option<Arc<AgentSession>> {
        self.registry.get(id)
    }

    /// Every live session, ordered by id.
    pub fn get_all(&self) -> Vec<Arc<AgentSession>> {
        self.registry.all()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of sessions still waiting for their prompt delivery to start.
    pub fn pending_deliveries(&self) -> usize {
        self.registry.pending_len()
    }

    /// Kill one session. Unknown ids are ignored.
    pub async fn kill(&self, id: &str) {
        if let Some(session) = self.registry.get(id) {
            session.kill().await;
        }
    }

    /// Kill every live session and clear the registry.
    pub async fn kill_all(&self) {
        let sessions = self.registry.drain();
        join_all(sessions.iter().map(|session| session.kill())).await;
    }

    /// Shutdown hook. Safe to call when some or all sessions already exited,
    /// and safe to call more than once.
    pub async fn dispose(&self) {
        let live = self.len();
        self.kill_all().await;
        info!(sessions = live, "terminal disposed");
    }
}

impl std::fmt::Debug for AgentTerminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentTerminal")
            .field("adapters", &self.adapters)
            .field("sessions", &self.len())
            .field("delivery", &self.delivery)
            .finish()
    }
}
