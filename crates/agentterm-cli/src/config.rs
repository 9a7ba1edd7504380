//! Configuration file management for agentterm.
//!
//! Provides a TOML config file at `~/.config/agentterm/config.toml` and a
//! resolution chain: `--config` flag > `AGENTTERM_CONFIG` env var > config
//! file > built-in defaults.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use agentterm_core::config::TerminalConfig;

/// Env var naming an explicit config file.
pub const CONFIG_ENV: &str = "AGENTTERM_CONFIG";

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the agentterm config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/agentterm` or
/// `~/.config/agentterm`, also on macOS.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("agentterm");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("agentterm")
}

/// Return the path to the default config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load, parse and validate a config file.
pub fn load_config(path: &Path) -> Result<TerminalConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: TerminalConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config file at {}", path.display()))?;
    Ok(config)
}

/// Serialize and write a config file, creating parent dirs as needed.
pub fn save_config(path: &Path, config: &TerminalConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }
    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;
    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Flag(PathBuf),
    Env(PathBuf),
    File(PathBuf),
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Flag(path) => write!(f, "{} (--config)", path.display()),
            ConfigSource::Env(path) => write!(f, "{} ({CONFIG_ENV})", path.display()),
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Defaults => f.write_str("built-in defaults"),
        }
    }
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub config: TerminalConfig,
    pub source: ConfigSource,
}

impl ResolvedConfig {
    /// Resolve using the process environment and the default config path.
    pub fn resolve(cli_path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::resolve_from(cli_path, env_path, config_path())
    }

    /// Resolve with the chain: CLI flag > env var > default file (only if it
    /// exists) > built-in defaults.
    ///
    /// An explicitly named file (flag or env) must exist; the default file
    /// is optional.
    pub fn resolve_from(
        cli_path: Option<&Path>,
        env_path: Option<PathBuf>,
        default_path: PathBuf,
    ) -> Result<Self> {
        let source = if let Some(path) = cli_path {
            ConfigSource::Flag(path.to_path_buf())
        } else if let Some(path) = env_path.filter(|p| !p.as_os_str().is_empty()) {
            ConfigSource::Env(path)
        } else if default_path.exists() {
            ConfigSource::File(default_path)
        } else {
            ConfigSource::Defaults
        };

        let config = match &source {
            ConfigSource::Flag(path) | ConfigSource::Env(path) | ConfigSource::File(path) => {
                load_config(path)?
            }
            ConfigSource::Defaults => TerminalConfig::default(),
        };
        tracing::debug!(source = %source, "configuration resolved");

        Ok(Self { config, source })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn save_and_load_config_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.toml");

        let mut original = TerminalConfig::default();
        original.delivery.ready_timeout_ms = 5000;
        original.agents.codex.binary = Some("/usr/local/bin/codex".to_string());
        original
            .agents
            .claude
            .env
            .insert("CLAUDE_CONFIG_DIR".to_string(), "/tmp/c".to_string());

        save_config(&path, &original).unwrap();
        assert_eq!(load_config(&path).unwrap(), original);
    }

    #[test]
    fn load_config_rejects_invalid_values() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write(tmp.path(), "bad.toml", "[delivery]\nchunk_size = 0\n");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("invalid config file"), "unexpected error: {err:#}");
    }

    #[test]
    fn load_config_reports_parse_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write(tmp.path(), "broken.toml", "[delivery\n");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse config file"));
    }

    #[test]
    fn resolve_with_cli_flag_overrides_all() {
        let tmp = tempfile::TempDir::new().unwrap();
        let flag = write(tmp.path(), "flag.toml", "[delivery]\nchunk_size = 7\n");
        let env = write(tmp.path(), "env.toml", "[delivery]\nchunk_size = 8\n");
        let file = write(tmp.path(), "config.toml", "[delivery]\nchunk_size = 9\n");

        let resolved = ResolvedConfig::resolve_from(Some(&flag), Some(env), file).unwrap();
        assert_eq!(resolved.source, ConfigSource::Flag(flag));
        assert_eq!(resolved.config.delivery.chunk_size, 7);
    }

    #[test]
    fn resolve_with_env_var_overrides_config_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let env = write(tmp.path(), "env.toml", "[delivery]\nchunk_size = 8\n");
        let file = write(tmp.path(), "config.toml", "[delivery]\nchunk_size = 9\n");

        let resolved = ResolvedConfig::resolve_from(None, Some(env.clone()), file).unwrap();
        assert_eq!(resolved.source, ConfigSource::Env(env));
        assert_eq!(resolved.config.delivery.chunk_size, 8);
    }

    #[test]
    fn resolve_uses_default_file_when_present() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = write(tmp.path(), "config.toml", "[terminal]\nstream_capacity = 64\n");

        let resolved = ResolvedConfig::resolve_from(None, Some(PathBuf::new()), file.clone()).unwrap();
        assert_eq!(resolved.source, ConfigSource::File(file));
        assert_eq!(resolved.config.terminal.stream_capacity, 64);
    }

    #[test]
    fn resolve_defaults_when_nothing_set() {
        let tmp = tempfile::TempDir::new().unwrap();
        let missing = tmp.path().join("config.toml");

        let resolved = ResolvedConfig::resolve_from(None, None, missing).unwrap();
        assert_eq!(resolved.source, ConfigSource::Defaults);
        assert_eq!(resolved.config, TerminalConfig::default());
    }

    #[test]
    fn resolve_errors_when_named_file_is_missing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let missing = tmp.path().join("nope.toml");

        let result = ResolvedConfig::resolve_from(Some(&missing), None, tmp.path().join("config.toml"));
        let msg = format!("{:#}", result.unwrap_err());
        assert!(msg.contains("failed to read config file"), "unexpected error: {msg}");
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("agentterm/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
