//! Claude Code adapter.
//!
//! Launches the interactive `claude` TUI. The TUI ignores prompts passed on
//! the command line in interactive mode, so the prompt is typed into the
//! session once it reports ready (see [`crate::delivery`]).
//!
//! Typical screen fragments after ANSI stripping:
//!
//! ```text
//! ⏺ I'll look at the failing test first.
//! ⏺ Bash(cargo test -p core)
//!   ⎿  test result: FAILED. 3 passed; 1 failed
//! ⏺ Update(src/lib.rs)
//! │ Do you want to make this edit to lib.rs?
//! ✻ Pondering… (12s · esc to interrupt)
//! ⏸ plan mode on (shift+tab to cycle)
//! >
//!   ? for shortcuts
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use super::trait_def::{Adapter, ChunkScanner, EventStream, RawStream, ScanState, scan_stream};
use super::types::{AgentEvent, AgentKind, AgentMode, FileAction, SpawnOptions};
use crate::config::AgentConfig;

/// Adapter for [Claude Code](https://docs.anthropic.com/en/docs/claude-code).
#[derive(Debug, Clone)]
pub struct ClaudeAdapter {
    /// Executable; defaults to `"claude"` (found via `$PATH`).
    binary: String,
    /// Arguments placed before the adapter's own flags.
    base_args: Vec<String>,
    env: HashMap<String, String>,
    scanner: Arc<ClaudeScanner>,
}

impl ClaudeAdapter {
    pub const DEFAULT_BINARY: &str = "claude";

    pub fn new() -> Self {
        Self::from_config(&AgentConfig::default())
    }

    /// Create an adapter that runs a custom executable.
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
            scanner: Arc::new(ClaudeScanner::new()),
        }
    }
}

impl Default for ClaudeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for ClaudeAdapter {
    fn agent(&self) -> AgentKind {
        AgentKind::Claude
    }

    fn build_command(&self) -> String {
        self.binary.clone()
    }

    fn build_args(&self, options: &SpawnOptions) -> Vec<String> {
        let mut args = self.base_args.clone();
        if !options.allowed_tools.is_empty() {
            args.push("--allowedTools".to_string());
            args.push(options.allowed_tools.join(","));
        }
        args.extend(options.args.iter().cloned());
        args
    }

    fn build_env(&self) -> HashMap<String, String> {
        self.env.clone()
    }

    fn interactive_prompt(&self) -> bool {
        true
    }

    fn parse(&self, raw: RawStream) -> EventStream {
        scan_stream(Arc::clone(&self.scanner), raw)
    }
}

/// Marker recognition for the Claude Code TUI.
#[derive(Debug)]
pub struct ClaudeScanner {
    re_error: Regex,
    re_tool: Regex,
    re_tool_result: Regex,
    re_permission: Regex,
    re_complete: Regex,
    re_thinking: Regex,
    re_plan_mode: Regex,
    re_execute_mode: Regex,
    re_footer: Regex,
    re_input_box: Regex,
    re_bullet: Regex,
}

impl ClaudeScanner {
    pub fn new() -> Self {
        Self {
            re_error: Regex::new(r"^(?:⏺\s*)?(?:API Error\b|Error:)").expect("hardcoded regex"),
            re_tool: Regex::new(r"^⏺\s*([A-Za-z][\w-]*)\((.*)\)$").expect("hardcoded regex"),
            re_tool_result: Regex::new(r"^⎿\s*(.*)$").expect("hardcoded regex"),
            re_permission: Regex::new(r"(?i)^(?:│\s*)?Do you want to .+\?").expect("hardcoded regex"),
            re_complete: Regex::new(
                r"(?i)^(?:[✻✽✶✳✢*·]\s*)?(?:worked|cooked|baked|brewed|churned|crunched|sautéed) for \d",
            )
            .expect("hardcoded regex"),
            re_thinking: Regex::new(r"(?i)esc to interrupt|^[✻✽✶✳✢·]\s*\w+…")
                .expect("hardcoded regex"),
            re_plan_mode: Regex::new(r"(?i)plan mode on").expect("hardcoded regex"),
            re_execute_mode: Regex::new(r"(?i)(?:accept edits|bypass permissions) on")
                .expect("hardcoded regex"),
            re_footer: Regex::new(r"(?i)^\?\s*for shortcuts").expect("hardcoded regex"),
            re_input_box: Regex::new(r"^│?\s*>\s*│?$").expect("hardcoded regex"),
            re_bullet: Regex::new(r"^⏺\s*(.+)$").expect("hardcoded regex"),
        }
    }

    fn tool_events(tool: &str, input: &str) -> Vec<AgentEvent> {
        let mut events = vec![AgentEvent::ToolStart {
            tool: tool.to_string(),
            input: input.to_string(),
        }];
        match tool {
            "Bash" => events.push(AgentEvent::CommandRun {
                command: input.to_string(),
            }),
            "Edit" | "Update" | "MultiEdit" => events.push(AgentEvent::FileEdit {
                path: input.to_string(),
                action: FileAction::Edit,
            }),
            "Write" => events.push(AgentEvent::FileEdit {
                path: input.to_string(),
                action: FileAction::Write,
            }),
            _ => {}
        }
        events
    }
}

impl Default for ClaudeScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkScanner for ClaudeScanner {
    fn scan_line(&self, state: &mut ScanState, line: &str) -> Option<Vec<AgentEvent>> {
        if self.re_error.is_match(line) {
            let message = line.trim_start_matches('⏺').trim().to_string();
            return Some(vec![AgentEvent::Error { message }]);
        }

        if let Some(caps) = self.re_tool.captures(line) {
            let tool = caps[1].to_string();
            let events = Self::tool_events(&tool, caps[2].trim());
            state.last_tool = Some(tool);
            return Some(events);
        }

        if let Some(caps) = self.re_tool_result.captures(line) {
            return Some(vec![AgentEvent::ToolEnd {
                tool: state.last_tool.clone().unwrap_or_else(|| "unknown".to_string()),
                output: caps[1].trim().to_string(),
            }]);
        }

        if self.re_permission.is_match(line) {
            return Some(vec![AgentEvent::PermissionRequest {
                tool: state.last_tool.clone().unwrap_or_else(|| "unknown".to_string()),
                details: line.trim_start_matches('│').trim().to_string(),
            }]);
        }

        if self.re_complete.is_match(line) {
            return Some(vec![AgentEvent::TaskComplete]);
        }

        if self.re_thinking.is_match(line) {
            return Some(vec![AgentEvent::Thinking]);
        }

        if self.re_plan_mode.is_match(line) {
            state.mode = Some(AgentMode::Plan);
            return Some(vec![AgentEvent::ModeChange {
                mode: AgentMode::Plan,
            }]);
        }

        if self.re_execute_mode.is_match(line) {
            state.mode = Some(AgentMode::Execute);
            return Some(vec![AgentEvent::ModeChange {
                mode: AgentMode::Execute,
            }]);
        }

        // The bare shortcuts footer only shows in the default mode.
        if self.re_footer.is_match(line) {
            let mut events = vec![AgentEvent::Ready];
            if matches!(state.mode, Some(AgentMode::Plan | AgentMode::Execute)) {
                events.push(AgentEvent::ModeChange {
                    mode: AgentMode::Idle,
                });
            }
            state.mode = Some(AgentMode::Idle);
            return Some(events);
        }

        if self.re_input_box.is_match(line) {
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
