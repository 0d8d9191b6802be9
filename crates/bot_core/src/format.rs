use crate::commands::COMMANDS;

/// Longest command output excerpt kept in a chat message.
const MAX_OUTPUT_CHARS: usize = 3000;

/// Telegram rejects callback answers longer than this.
pub const MAX_ACK_CHARS: usize = 200;

/// Escapes the characters legacy Telegram Markdown treats as markup.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Tail of `output` wrapped in a code block, or an empty string when there
/// is nothing to show.
pub fn output_block(output: &[u8]) -> String {
    let text = String::from_utf8_lossy(output);
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }

    let char_count = text.chars().count();
    let tail: String = if char_count > MAX_OUTPUT_CHARS {
        let skipped: String = text.chars().skip(char_count - MAX_OUTPUT_CHARS).collect();
        format!("…{skipped}")
    } else {
        text.to_string()
    };
    format!("\n```\n{}\n```", tail.replace("```", "'''"))
}

/// Comma-separated tool names without any markup, for plain-text surfaces.
pub fn plain_tool_list(tools: &[String]) -> String {
    if tools.is_empty() {
        "(empty)".into()
    } else {
        tools.join(", ")
    }
}

pub fn tool_list(tools: &[String]) -> String {
    escape_markdown(&plain_tool_list(tools))
}

/// At most `max` characters of `text`; a cut is marked with a trailing `…`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

pub fn help_text() -> String {
    let mut lines = vec!["*Host Bot Commands*".to_string()];
    for spec in COMMANDS {
        lines.push(format!(
            "{} - {}",
            escape_markdown(spec.command()),
            spec.description
        ));
    }
    lines.join("\n")
}
