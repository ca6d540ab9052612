//! Notification feed: the bounded, newest-first list of user-facing
//! notifications derived from bus events.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use poslink_api::{Notification, NotificationKind};

pub const FEED_CAPACITY: usize = 10;

/// `inventory-update` events only surface at or below this stock level.
pub const INVENTORY_ALERT_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntry {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug)]
pub struct NotificationFeed {
    entries: VecDeque<FeedEntry>,
    capacity: usize,
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::with_capacity(FEED_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Turn a bus notification into a feed entry. Returns the new entry, or
    /// `None` when the notification is not worth showing.
    pub fn apply(&mut self, notification: &Notification) -> Option<&FeedEntry> {
        let (title, message) = describe(notification)?;
        self.entries.push_front(FeedEntry {
            id: Uuid::new_v4(),
            kind: notification.kind,
            title: title.to_owned(),
            message,
            timestamp: Utc::now(),
            read: false,
        });
        self.entries.truncate(self.capacity);
        self.entries.front()
    }

    /// Newest first.
    pub fn entries(&self) -> impl Iterator<Item = &FeedEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `false` if no entry has this id.
    pub fn mark_read(&mut self, id: Uuid) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.read = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_read(&mut self) {
        for entry in &mut self.entries {
            entry.read = true;
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn unread_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.read).count()
    }

    /// Unread badge text: `None` when nothing is unread, `"9+"` above nine.
    pub fn badge(&self) -> Option<String> {
        match self.unread_count() {
            0 => None,
            n if n > 9 => Some("9+".to_owned()),
            n => Some(n.to_string()),
        }
    }
}

// ── Event → text ─────────────────────────────────────────────────────

fn describe(notification: &Notification) -> Option<(&'static str, String)> {
    let p = &notification.payload;
    match notification.kind {
        NotificationKind::LowStockAlert => Some((
            "Low Stock Alert",
            format!(
                "{} is running low ({} left)",
                plain(&p["productName"]),
                plain(&p["currentStock"])
            ),
        )),
        NotificationKind::NewSale => {
            let items = p["items"].as_array().map_or(0, Vec::len);
            Some((
                "New Sale",
                format!(
                    "Sale completed: ฿{} ({items} items)",
                    format_amount(&p["total"])
                ),
            ))
        }
        NotificationKind::InventoryUpdate => {
            let stock = number(&p["newStock"])?;
            (stock <= INVENTORY_ALERT_THRESHOLD).then(|| {
                (
                    "Inventory Update",
                    format!("Product stock updated: {} remaining", plain(&p["newStock"])),
                )
            })
        }
        NotificationKind::ConnectionError => Some((
            "Connection Lost",
            p["message"]
                .as_str()
                .unwrap_or("Lost connection to the server.")
                .to_owned(),
        )),
    }
}

/// A JSON number, or a string holding one.
fn number(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str()?.trim().parse().ok())
}

/// A JSON value as display text: strings unquoted, absent values as `?`.
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "?".to_owned(),
        other => other.to_string(),
    }
}

/// Money with thousands separators and at most three decimals.
fn format_amount(value: &Value) -> String {
    let Some(n) = value.as_f64() else {
        return plain(value);
    };
    let fixed = format!("{:.3}", n.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if n < 0.0 { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac_part}")
    }
}
