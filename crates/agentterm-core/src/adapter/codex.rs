//! Codex CLI adapter.
//!
//! Codex accepts the initial prompt as a flag, so no interactive delivery is
//! needed. Its TUI prints activity as bullet lines:
//!
//! ```text
//! ▌ Ask Codex to do anything
//! • Working (4s • esc to interrupt)
//! • Ran cargo build
//!   └ Finished `dev` profile in 2.31s
//! • Edited src/main.rs (+3 -1)
//! Allow command? [y/n]
//! • Task complete
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use super::trait_def::{Adapter, ChunkScanner, EventStream, RawStream, ScanState, scan_stream};
use super::types::{AgentEvent, AgentKind, FileAction, SpawnOptions};
use crate::config::AgentConfig;

/// Tool name used for shell commands, which Codex does not label.
const SHELL_TOOL: &str = "shell";

/// Adapter for the OpenAI Codex CLI.
#[derive(Debug, Clone)]
pub struct CodexAdapter {
    binary: String,
    base_args: Vec<String>,
    env: HashMap<String, String>,
    scanner: Arc<CodexScanner>,
}

impl CodexAdapter {
    pub const DEFAULT_BINARY: &str = "codex";

    pub fn new() -> Self {
        Self::from_config(&AgentConfig::default())
    }

    pub fn with_binary(path: impl Into<String>) -> Self {
        Self {
            binary: path.into(),
            ..Self::new()
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            binary: config
                .binary
                .clone()
                .unwrap_or_else(|| Self::DEFAULT_BINARY.to_string()),
            base_args: config.args.clone(),
            env: config.env.clone().into_iter().collect(),
            scanner: Arc::new(CodexScanner::new()),
        }
    }
}

impl Default for CodexAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for CodexAdapter {
    fn agent(&self) -> AgentKind {
        AgentKind::Codex
    }

    fn build_command(&self) -> String {
        self.binary.clone()
    }

    fn build_args(&self, options: &SpawnOptions) -> Vec<String> {
        let mut args = self.base_args.clone();
        args.extend(options.args.iter().cloned());
        if let Some(prompt) = options.non_empty_prompt() {
            args.push("--prompt".to_string());
            args.push(prompt.to_string());
        }
        args
    }

    fn build_env(&self) -> HashMap<String, String> {
        self.env.clone()
    }

    fn parse(&self, raw: RawStream) -> EventStream {
        scan_stream(Arc::clone(&self.scanner), raw)
    }
}

/// Marker recognition for the Codex TUI.
#[derive(Debug)]
pub struct CodexScanner {
    re_error: Regex,
    re_ran: Regex,
    re_file: Regex,
    re_called: Regex,
    re_tool_result: Regex,
    re_approval: Regex,
    re_complete: Regex,
    re_thinking: Regex,
    re_ready: Regex,
    re_bullet: Regex,
}

impl CodexScanner {
    pub fn new() -> Self {
        Self {
            re_error: Regex::new(r"^(?:■\s*)?(?:[Ee]rror|stream error)\b:?").expect("hardcoded regex"),
            re_ran: Regex::new(r"^•\s*Ran\s+(.+)$").expect("hardcoded regex"),
            re_file: Regex::new(r"^•\s*(Edited|Added|Deleted)\s+(\S+)").expect("hardcoded regex"),
            re_called: Regex::new(r"^•\s*Called\s+([\w.:-]+)\s*(?:\((.*)\))?$")
                .expect("hardcoded regex"),
            re_tool_result: Regex::new(r"^└\s*(.*)$").expect("hardcoded regex"),
            re_approval: Regex::new(
                r"(?i)^(?:shell command:?|would you like to run the following command\?|.*(?:allow|proceed|approve|accept)\b.*\?\s*[\[(]y)",
            )
            .expect("hardcoded regex"),
            re_complete: Regex::new(r"(?i)^(?:•\s*)?(?:task complete|worked for \d)")
                .expect("hardcoded regex"),
            re_thinking: Regex::new(r"(?i)esc to interrupt|^(?:•\s*)?working\b")
                .expect("hardcoded regex"),
            re_ready: Regex::new(r"(?i)^▌|send\s*⏎|^\?\s*for shortcuts").expect("hardcoded regex"),
            re_bullet: Regex::new(r"^•\s*(.+)$").expect("hardcoded regex"),
        }
    }
}

impl Default for CodexScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkScanner for CodexScanner {
    fn scan_line(&self, state: &mut ScanState, line: &str) -> Option<Vec<AgentEvent>> {
        if self.re_error.is_match(line) {
            let message = line.trim_start_matches('■').trim().to_string();
            return Some(vec![AgentEvent::Error { message }]);
        }

        if let Some(caps) = self.re_ran.captures(line) {
            let command = caps[1].trim().to_string();
            state.last_tool = Some(SHELL_TOOL.to_string());
            return Some(vec![
                AgentEvent::ToolStart {
                    tool: SHELL_TOOL.to_string(),
                    input: command.clone(),
                },
                AgentEvent::CommandRun { command },
            ]);
        }

        if let Some(caps) = self.re_file.captures(line) {
            let action = match &caps[1] {
                "Added" => FileAction::Create,
                "Deleted" => FileAction::Delete,
                _ => FileAction::Edit,
            };
            return Some(vec![AgentEvent::FileEdit {
                path: caps[2].to_string(),
                action,
            }]);
        }

        if let Some(caps) = self.re_called.captures(line) {
            let tool = caps[1].to_string();
            let input = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("").to_string();
            state.last_tool = Some(tool.clone());
            return Some(vec![AgentEvent::ToolStart { tool, input }]);
        }

        if let Some(caps) = self.re_tool_result.captures(line) {
            return Some(vec![AgentEvent::ToolEnd {
                tool: state.last_tool.clone().unwrap_or_else(|| "unknown".to_string()),
                output: caps[1].trim().to_string(),
            }]);
        }

        if self.re_approval.is_match(line) {
            return Some(vec![AgentEvent::PermissionRequest {
                tool: state.last_tool.clone().unwrap_or_else(|| SHELL_TOOL.to_string()),
                details: line.to_string(),
            }]);
        }

        if self.re_complete.is_match(line) {
            return Some(vec![AgentEvent::TaskComplete]);
        }

        if self.re_thinking.is_match(line) {
            return Some(vec![AgentEvent::Thinking]);
        }

        if self.re_ready.is_match(line) {
            return Some(vec![AgentEvent::Ready]);
        }

        if let Some(caps) = self.re_bullet.captures(line) {
            let text = caps[1].trim().to_string();
            let event = if text.ends_with('?') {
                AgentEvent::Question { text }
            } else {
                AgentEvent::Message { content: text }
            };
            return Some(vec![event]);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scan(lines: &str) -> Vec<AgentEvent> {
        CodexScanner::new().scan_chunk(&mut ScanState::default(), lines)
    }

    fn options() -> SpawnOptions {
        SpawnOptions::new(AgentKind::Codex, PathBuf::from("/work"))
    }

    #[test]
    fn default_command_is_codex() {
        let adapter = CodexAdapter::new();
        assert_eq!(adapter.build_command(), "codex");
        assert_eq!(adapter.agent(), AgentKind::Codex);
        assert!(!adapter.interactive_prompt());
        assert!(adapter.build_env().is_empty());
    }

    #[test]
    fn prompt_is_appended_as_flag() {
        let adapter = CodexAdapter::new();
        let args = adapter.build_args(&options().with_args(["--model", "o4"]).with_prompt("add tests"));
        assert_eq!(args, vec!["--model", "o4", "--prompt", "add tests"]);
    }

    #[test]
    fn no_prompt_no_flag() {
        let adapter = CodexAdapter::new();
        assert!(adapter.build_args(&options()).is_empty());
        assert!(adapter.build_args(&options().with_prompt("")).is_empty());
    }

    #[test]
    fn build_is_deterministic() {
        let adapter = CodexAdapter::with_binary("/opt/bin/codex");
        let opts = options().with_prompt("x").with_args(["-a"]);
        assert_eq!(adapter.build_command(), "/opt/bin/codex");
        assert_eq!(adapter.build_args(&opts), adapter.build_args(&opts));
    }

    #[test]
    fn ran_emits_tool_start_and_command() {
        assert_eq!(
            scan("• Ran cargo build"),
            vec![
                AgentEvent::ToolStart {
                    tool: "shell".to_string(),
                    input: "cargo build".to_string(),
                },
                AgentEvent::CommandRun {
                    command: "cargo build".to_string(),
                },
            ]
        );
    }

    #[test]
    fn command_output_closes_the_tool() {
        let events = scan("• Ran ls\n  └ Cargo.toml");
        assert_eq!(
            events.last(),
            Some(&AgentEvent::ToolEnd {
                tool: "shell".to_string(),
                output: "Cargo.toml".to_string(),
            })
        );
    }

    #[test]
    fn file_changes() {
        assert_eq!(
            scan("• Edited src/main.rs (+3 -1)\n• Added README.md\n• Deleted old.rs"),
            vec![
                AgentEvent::FileEdit {
                    path: "src/main.rs".to_string(),
                    action: FileAction::Edit,
                },
                AgentEvent::FileEdit {
                    path: "README.md".to_string(),
                    action: FileAction::Create,
                },
                AgentEvent::FileEdit {
                    path: "old.rs".to_string(),
                    action: FileAction::Delete,
                },
            ]
        );
    }

    #[test]
    fn mcp_calls_are_tools() {
        assert_eq!(
            scan("• Called github.search_issues({\"q\":\"panic\"})"),
            vec![AgentEvent::ToolStart {
                tool: "github.search_issues".to_string(),
                input: "{\"q\":\"panic\"}".to_string(),
            }]
        );
    }

    #[test]
    fn approval_prompts() {
        let events = scan("Allow command? [y/n]");
        assert_eq!(
            events,
            vec![AgentEvent::PermissionRequest {
                tool: "shell".to_string(),
                details: "Allow command? [y/n]".to_string(),
            }]
        );
        assert!(matches!(
            scan("Do you want to proceed? [y/n]").as_slice(),
            [AgentEvent::PermissionRequest { .. }]
        ));
    }

    #[test]
    fn status_lines() {
        assert_eq!(scan("• Working (4s • esc to interrupt)"), vec![AgentEvent::Thinking]);
        assert_eq!(scan("▌ Ask Codex to do anything"), vec![AgentEvent::Ready]);
        assert_eq!(scan("  send ⏎   newline ⌃J"), vec![AgentEvent::Ready]);
        assert_eq!(scan("• Task complete"), vec![AgentEvent::TaskComplete]);
    }

    #[test]
    fn repainted_status_line_still_reports_ready() {
        assert_eq!(
            scan("• Working (3s • esc to interrupt)\r▌ Ask Codex to do anything"),
            vec![AgentEvent::Thinking, AgentEvent::Ready]
        );
    }

    #[test]
    fn errors_and_messages() {
        assert_eq!(
            scan("■ stream error: disconnected"),
            vec![AgentEvent::Error {
                message: "stream error: disconnected".to_string(),
            }]
        );
        assert_eq!(
            scan("• I'll update the parser."),
            vec![AgentEvent::Message {
                content: "I'll update the parser.".to_string(),
            }]
        );
        assert_eq!(
            scan("• Which branch should I target?"),
            vec![AgentEvent::Question {
                text: "Which branch should I target?".to_string(),
            }]
        );
    }
}
