//! Live notification feed over the event channel.
//!
//! Lines typed on stdin steer the feed: an empty line asks the channel to
//! reconnect now, `list` prints the feed, `read [n]` marks entries read and
//! `clear` empties it.

use tokio::io::{AsyncBufReadExt, BufReader};

use poslink_api::{ApiClient, EventChannel, NotificationBus, SessionToken};
use poslink_config::Config;

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::feed::NotificationFeed;
use crate::output;

pub async fn handle(
    client: &ApiClient,
    cfg: &Config,
    args: &WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let auth = if args.anonymous {
        SessionToken::default()
    } else {
        client.session_token()
    };
    let channel_config = cfg.channel_config(auth)?;
    let url = channel_config.url.clone();

    let bus = NotificationBus::new();
    let mut notifications = bus.subscribe_all();
    let channel = EventChannel::new(channel_config, bus)?;
    let mut state = channel.state();
    channel.start();

    let color = output::should_color(global.color);
    let mut feed = NotificationFeed::new();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    eprintln!("Watching {url} (Enter reconnects, `list`, `read [n]`, `clear`; Ctrl-C quits)");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            biased;

            _ = &mut ctrl_c => {
                tracing::debug!("interrupted");
                break;
            }

            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *state.borrow_and_update();
                eprintln!("{}", output::render_state(current, color));
            }

            Some(notification) = notifications.recv() => {
                if args.json {
                    output::print_output(&output::render_json_line(&*notification)?);
                } else if let Some(entry) = feed.apply(&notification).cloned() {
                    let badge = feed.badge();
                    output::print_output(&output::render_entry(&entry, badge.as_deref(), color));
                } else {
                    tracing::debug!(kind = %notification.kind, "notification filtered from feed");
                }
            }

            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => run_command(&parse_command(&line), &mut feed, &channel, color),
                Ok(None) | Err(_) => stdin_open = false,
            },
        }
    }

    channel.shutdown();
    Ok(())
}

// ── Interactive commands ─────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum FeedCommand {
    Reconnect,
    List,
    /// 1-based position, or every entry.
    Read(Option<usize>),
    Clear,
    Unknown(String),
}

fn parse_command(line: &str) -> FeedCommand {
    let mut words = line.split_whitespace();
    match (words.next(), words.next()) {
        (None, _) => FeedCommand::Reconnect,
        (Some("list" | "ls"), None) => FeedCommand::List,
        (Some("read"), None) => FeedCommand::Read(None),
        (Some("read"), Some(n)) => match n.parse() {
            Ok(n) if n > 0 => FeedCommand::Read(Some(n)),
            _ => FeedCommand::Unknown(line.trim().to_owned()),
        },
        (Some("clear"), None) => FeedCommand::Clear,
        _ => FeedCommand::Unknown(line.trim().to_owned()),
    }
}

fn run_command(command: &FeedCommand, feed: &mut NotificationFeed, channel: &EventChannel, color: bool) {
    match command {
        FeedCommand::Reconnect => channel.network_online(),
        FeedCommand::List => {
            if feed.is_empty() {
                eprintln!("(no notifications)");
                return;
            }
            eprintln!("{} notifications, {} unread", feed.len(), feed.unread_count());
            for (i, entry) in feed.entries().enumerate() {
                let marker = if entry.read { ' ' } else { '*' };
                let line = output::render_entry(entry, None, color);
                output::print_output(&format!("{marker}{:>2}. {line}", i + 1));
            }
        }
        FeedCommand::Read(None) => feed.mark_all_read(),
        FeedCommand::Read(Some(n)) => {
            let id = feed.entries().nth(n - 1).map(|e| e.id);
            if !id.is_some_and(|id| feed.mark_read(id)) {
                eprintln!("no notification #{n}");
            }
        }
        FeedCommand::Clear => feed.clear(),
        FeedCommand::Unknown(input) => eprintln!("unknown command: {input}"),
    }
}
