//! Output helpers: color decisions, JSON rendering and feed lines.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;

use poslink_api::{ChannelState, NotificationKind};

use crate::cli::ColorMode;
use crate::error::CliError;
use crate::feed::FeedEntry;

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

/// Pretty-printed JSON.
pub fn render_json<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(data)?)
}

/// Single-line JSON, for streaming output.
pub fn render_json_line<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string(data)?)
}

pub fn print_output(output: &str) {
    if output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Feed rendering ───────────────────────────────────────────────────

/// One feed entry as a terminal line, with the unread badge appended.
pub fn render_entry(entry: &FeedEntry, badge: Option<&str>, color: bool) -> String {
    let time = entry.timestamp.with_timezone(&chrono::Local).format("%H:%M:%S");
    let badge = badge.map(|b| format!(" [{b}]")).unwrap_or_default();

    if !color {
        return format!("{time}  {}: {}{badge}", entry.title, entry.message);
    }

    let title = match entry.kind {
        NotificationKind::NewSale => entry.title.green().bold().to_string(),
        NotificationKind::LowStockAlert => entry.title.yellow().bold().to_string(),
        NotificationKind::InventoryUpdate => entry.title.cyan().bold().to_string(),
        NotificationKind::ConnectionError => entry.title.red().bold().to_string(),
    };
    format!("{}  {title}: {}{}", time.dimmed(), entry.message, badge.dimmed())
}

pub fn render_state(state: ChannelState, color: bool) -> String {
    let line = match state {
        ChannelState::Reconnecting { attempt } => format!("-- reconnecting (attempt {attempt})"),
        other => format!("-- {other}"),
    };
    if !color {
        return line;
    }
    match state {
        ChannelState::Connected => line.green().to_string(),
        ChannelState::GaveUp => line.red().to_string(),
        _ => line.dimmed().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn entry() -> FeedEntry {
        FeedEntry {
            id: Uuid::new_v4(),
            kind: NotificationKind::NewSale,
            title: "New Sale".into(),
            message: "Sale completed: ฿120 (2 items)".into(),
            timestamp: Utc::now(),
            read: false,
        }
    }

    #[test]
    fn plain_entry_has_no_escape_codes() {
        let line = render_entry(&entry(), Some("3"), false);
        assert!(line.ends_with("New Sale: Sale completed: ฿120 (2 items) [3]"));
        assert!(!line.contains('\u{1b}'));
    }

    #[test]
    fn colored_entry_keeps_the_text() {
        let line = render_entry(&entry(), None, true);
        assert!(line.contains('\u{1b}'));
        assert!(line.contains("Sale completed: ฿120 (2 items)"));
    }

    #[test]
    fn state_lines() {
        assert_eq!(
            render_state(ChannelState::Reconnecting { attempt: 2 }, false),
            "-- reconnecting (attempt 2)"
        );
        assert_eq!(render_state(ChannelState::GaveUp, false), "-- gave-up");
    }
}
