mod command_cmd;
mod config;
mod parse_cmd;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use agentterm_core::adapter::{AdapterRegistry, AgentKind, SpawnOptions};
use agentterm_core::config::TerminalConfig;

use config::ResolvedConfig;

#[derive(Parser)]
#[command(name = "agentterm", about = "Supervise interactive AI coding agents in pseudo-terminals")]
struct Cli {
    /// Config file (overrides AGENTTERM_CONFIG env var)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// List registered agents
    Agents,
    /// Show the command, arguments and environment an agent would be spawned with
    Command {
        /// Agent to spawn (claude or codex)
        agent: AgentKind,
        /// Working directory (defaults to the current directory)
        #[arg(long)]
        cwd: Option<PathBuf>,
        /// Initial prompt
        #[arg(long)]
        prompt: Option<String>,
        /// Tool the agent may use without asking (repeatable)
        #[arg(long = "allowed-tool")]
        allowed_tools: Vec<String>,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
        /// Extra arguments passed to the agent after `--`
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Replay a captured transcript through an agent's parser, printing events as JSON lines
    Parse {
        /// Agent whose parser to use (claude or codex)
        agent: AgentKind,
        /// Transcript file (defaults to stdin)
        file: Option<PathBuf>,
    },
}

/// Execute the `agentterm init` command: write the default config file.
fn cmd_init(path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(config::config_path);

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = TerminalConfig::default();
    config::save_config(&path, &cfg)?;

    println!("Config written to {}", path.display());
    println!("  delivery.ready_timeout_ms = {}", cfg.delivery.ready_timeout_ms);
    println!("  delivery.chunk_size = {}", cfg.delivery.chunk_size);
    println!("  delivery.chunk_delay_ms = {}", cfg.delivery.chunk_delay_ms);

    Ok(())
}

/// Resolve the configuration and build the adapter registry from it.
fn load_adapters(path: Option<&Path>) -> anyhow::Result<(ResolvedConfig, AdapterRegistry)> {
    let resolved = ResolvedConfig::resolve(path)?;
    let adapters = AdapterRegistry::with_defaults(&resolved.config);
    Ok((resolved, adapters))
}

/// Execute the `agentterm agents` command.
fn cmd_agents(adapters: &AdapterRegistry) {
    println!("{:<8} {:<24} PROMPT", "AGENT", "COMMAND");
    for agent in adapters.list() {
        let Some(adapter) = adapters.get(agent) else {
            continue;
        };
        let delivery = if adapter.interactive_prompt() {
            "interactive"
        } else {
            "argument"
        };
        println!("{:<8} {:<24} {delivery}", agent.as_str(), adapter.build_command());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => {
            let path = cli
                .config
                .or_else(|| std::env::var_os(config::CONFIG_ENV).map(PathBuf::from));
            cmd_init(path, force)?;
        }
        Commands::Agents => {
            let (_, adapters) = load_adapters(cli.config.as_deref())?;
            cmd_agents(&adapters);
        }
        Commands::Command {
            agent,
            cwd,
            prompt,
            allowed_tools,
            json,
            args,
        } => {
            let (resolved, adapters) = load_adapters(cli.config.as_deref())?;
            let cwd = match cwd {
                Some(cwd) => cwd,
                None => std::env::current_dir().context("failed to read current directory")?,
            };
            let mut options = SpawnOptions::new(agent, cwd)
                .with_args(args)
                .with_allowed_tools(allowed_tools);
            options.prompt = prompt;
            command_cmd::run_command(
                &adapters,
                &resolved.config.delivery.to_delivery_config(),
                options,
                json,
            )?;
        }
        Commands::Parse { agent, file } => {
            let (_, adapters) = load_adapters(cli.config.as_deref())?;
            let adapter = adapters
                .get(agent)
                .with_context(|| format!("no adapter registered for {agent}"))?;
            parse_cmd::run_parse(adapter.as_ref(), file.as_deref()).await?;
        }
    }

    Ok(())
}
