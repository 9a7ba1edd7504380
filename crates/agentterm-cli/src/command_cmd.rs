//! `agentterm command`: show how an agent would be spawned.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use agentterm_core::adapter::{Adapter, AdapterRegistry, AgentKind, SpawnOptions};
use agentterm_core::delivery::{DeliveryConfig, chunk_prompt};

/// How the initial prompt reaches the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum PromptDeliveryPlan {
    /// No prompt was given.
    None,
    /// Passed on the command line.
    Argument,
    /// Typed into the session once it reports ready.
    Interactive {
        ready_timeout_ms: u64,
        chunks: usize,
        chunk_delay_ms: u64,
    },
}

/// Everything the PTY host would be asked to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpawnPlan {
    pub agent: AgentKind,
    pub command: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
    pub prompt: PromptDeliveryPlan,
}

pub fn spawn_plan(adapter: &dyn Adapter, options: &SpawnOptions, delivery: &DeliveryConfig) -> SpawnPlan {
    let prompt = match options.non_empty_prompt() {
        None => PromptDeliveryPlan::None,
        Some(prompt) if adapter.interactive_prompt() => PromptDeliveryPlan::Interactive {
            ready_timeout_ms: delivery.ready_timeout.as_millis() as u64,
            chunks: chunk_prompt(prompt, delivery.chunk_size).len(),
            chunk_delay_ms: delivery.chunk_delay.as_millis() as u64,
        },
        Some(_) => PromptDeliveryPlan::Argument,
    };

    SpawnPlan {
        agent: adapter.agent(),
        command: adapter.build_command(),
        args: adapter.build_args(options),
        cwd: options.cwd.clone(),
        env: adapter.build_env().into_iter().collect(),
        prompt,
    }
}

/// Execute `agentterm command`.
pub fn run_command(
    adapters: &AdapterRegistry,
    delivery: &DeliveryConfig,
    options: SpawnOptions,
    json: bool,
) -> Result<()> {
    let adapter = adapters
        .get(options.agent)
        .with_context(|| format!("no adapter registered for {}", options.agent))?;
    let plan = spawn_plan(adapter.as_ref(), &options, delivery);

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("agent:   {}", plan.agent);
    println!("command: {}", plan.command);
    println!("args:    {}", format_args_list(&plan.args));
    println!("cwd:     {}", plan.cwd.display());
    if plan.env.is_empty() {
        println!("env:     (inherited)");
    } else {
        println!("env:");
        for (key, value) in &plan.env {
            println!("  {key}={value}");
        }
    }
    match &plan.prompt {
        PromptDeliveryPlan::None => println!("prompt:  none"),
        PromptDeliveryPlan::Argument => println!("prompt:  passed as argument"),
        PromptDeliveryPlan::Interactive {
            ready_timeout_ms,
            chunks,
            chunk_delay_ms,
        } => println!(
            "prompt:  typed after ready (timeout {ready_timeout_ms}ms), {chunks} chunk(s) {chunk_delay_ms}ms apart"
        ),
    }
    Ok(())
}

/// Render arguments the way a shell would need them.
fn format_args_list(args: &[String]) -> String {
    if args.is_empty() {
        return "(none)".to_string();
    }
    args.iter()
        .map(|arg| {
            if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '\'' || c == '"') {
                format!("'{}'", arg.replace('\'', r"'\''"))
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentterm_core::adapter::{ClaudeAdapter, CodexAdapter};

    #[test]
    fn codex_prompt_goes_on_the_command_line() {
        let options = SpawnOptions::new(AgentKind::Codex, "/repo").with_prompt("add tests");
        let plan = spawn_plan(&CodexAdapter::new(), &options, &DeliveryConfig::default());
        assert_eq!(plan.command, "codex");
        assert_eq!(plan.args, vec!["--prompt", "add tests"]);
        assert_eq!(plan.prompt, PromptDeliveryPlan::Argument);
        assert!(plan.env.is_empty());
    }

    #[test]
    fn claude_prompt_is_scheduled() {
        let options = SpawnOptions::new(AgentKind::Claude, "/repo").with_prompt("x".repeat(2500));
        let plan = spawn_plan(&ClaudeAdapter::new(), &options, &DeliveryConfig::default());
        assert!(plan.args.is_empty());
        assert_eq!(
            plan.prompt,
            PromptDeliveryPlan::Interactive {
                ready_timeout_ms: 15_000,
                chunks: 3,
                chunk_delay_ms: 10,
            }
        );
    }

    #[test]
    fn blank_prompt_means_no_delivery() {
        let options = SpawnOptions::new(AgentKind::Claude, "/repo").with_prompt("  ");
        let plan = spawn_plan(&ClaudeAdapter::new(), &options, &DeliveryConfig::default());
        assert_eq!(plan.prompt, PromptDeliveryPlan::None);
    }

    #[test]
    fn plan_serializes_with_tagged_prompt_mode() {
        let options = SpawnOptions::new(AgentKind::Codex, "/repo");
        let plan = spawn_plan(&CodexAdapter::new(), &options, &DeliveryConfig::default());
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["agent"], "codex");
        assert_eq!(json["prompt"]["mode"], "none");
    }

    #[test]
    fn args_with_spaces_are_quoted() {
        let args = vec!["--prompt".to_string(), "it's broken".to_string(), String::new()];
        assert_eq!(format_args_list(&args), r"--prompt 'it'\''s broken' ''");
        assert_eq!(format_args_list(&[]), "(none)");
    }
}
