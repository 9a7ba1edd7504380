//! ANSI escape sequence stripping.
//!
//! Agent TUIs paint their screens with colors, cursor movement and title
//! updates. Adapters match markers against clean text, so every raw
//! fragment goes through [`strip_ansi`] first.

/// Strip ANSI escape sequences from already-decoded text.
///
/// Handles:
/// - CSI sequences: `ESC [ ... <final byte>`
/// - OSC sequences: `ESC ] ... ST` (where ST is `ESC \` or BEL)
/// - Simple two-character escapes: `ESC <char>`
/// - C1 CSI (`U+009B`) sequences
///
/// A `\r\n` pair becomes `\n`. A lone `\r` also becomes `\n`: the TUI
/// uses it to repaint a line, and the repainted text is a new line to the
/// scanners.
pub fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\u{1b}' => match chars.next() {
                Some('[') => skip_csi(&mut chars),
                Some(']') => {
                    while let Some(c) = chars.next() {
                        if c == '\u{07}' {
                            break;
                        }
                        if c == '\u{1b}' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                // ESC M, ESC 7, ESC 8, ... or a truncated escape.
                Some(_) | None => {}
            },
            '\u{9b}' => skip_csi(&mut chars),
            '\r' => {
                if chars.peek() != Some(&'\n') {
                    out.push('\n');
                }
            }
            c => out.push(c),
        }
    }

    out
}

/// Skip CSI parameter/intermediate characters and the final character.
fn skip_csi(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while matches!(chars.peek(), Some(c) if ('\u{20}'..='\u{3f}').contains(c)) {
        chars.next();
    }
    if matches!(chars.peek(), Some(c) if ('\u{40}'..='\u{7e}').contains(c)) {
        chars.next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_unchanged() {
        assert_eq!(strip_ansi("hello world"), "hello world");
    }

    #[test]
    fn strips_color_codes() {
        assert_eq!(strip_ansi("\x1b[1;31merror\x1b[0m"), "error");
    }

    #[test]
    fn strips_cursor_movement() {
        assert_eq!(strip_ansi("\x1b[2A\x1b[2Khello"), "hello");
    }

    #[test]
    fn strips_private_modes() {
        assert_eq!(strip_ansi("\x1b[?25l\x1b[?2004hready"), "ready");
    }

    #[test]
    fn strips_osc_with_bel() {
        assert_eq!(strip_ansi("\x1b]0;claude\x07rest"), "rest");
    }

    #[test]
    fn strips_osc_with_st() {
        assert_eq!(strip_ansi("\x1b]0;title\x1b\\rest"), "rest");
    }

    #[test]
    fn strips_carriage_return() {
        assert_eq!(strip_ansi("line\r\n"), "line\n");
    }

    #[test]
    fn lone_carriage_return_breaks_the_line() {
        assert_eq!(
            strip_ansi("✻ Working… (3s)\r▌ Ask Codex"),
            "✻ Working… (3s)\n▌ Ask Codex"
        );
        assert_eq!(strip_ansi("a\r\r\nb"), "a\n\nb");
    }

    #[test]
    fn handles_c1_csi() {
        assert_eq!(strip_ansi("\u{9b}31mred\u{9b}0m"), "red");
    }

    #[test]
    fn handles_truncated_escape() {
        assert_eq!(strip_ansi("text\x1b"), "text");
    }

    #[test]
    fn keeps_multibyte_glyphs() {
        let stripped = strip_ansi("\x1b[38;5;174m⏺\x1b[39m Bash(ls -la)\n  ⎿  Cargo.toml");
        assert_eq!(stripped, "⏺ Bash(ls -la)\n  ⎿  Cargo.toml");
    }
}
