use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::api::{ApiError, TicketList};

pub const LOADING_MESSAGE: &str = "Loading tickets...";
pub const EMPTY_MESSAGE: &str = "No tickets found. Create one by chatting!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    #[default]
    P2,
    P3,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Priority::P0 => "P0",
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
            Priority::Unknown => "P?",
        };
        f.write_str(label)
    }
}

/// A ticket as the backend reports it. Read-only on this side.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable_priority")]
    pub priority: Priority,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub created_by: Option<String>,
    /// `None` when the backend sent nothing we can read as a time.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default, deserialize_with = "tag_list")]
    pub tags: Vec<String>,
}

fn default_status() -> String {
    "open".to_string()
}

impl Ticket {
    pub fn assignee_label(&self) -> &str {
        match self.assignee.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => "Unassigned",
        }
    }

    pub fn created_label(&self) -> String {
        self.created_at
            .as_ref()
            .map(format_date)
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Formatted due date, "Not set" when absent, or the raw value when it
    /// is not a date we understand.
    pub fn due_label(&self) -> String {
        match self.due_date.as_deref().map(str::trim) {
            None | Some("") => "Not set".to_string(),
            Some(raw) => parse_timestamp(raw)
                .map(|ts| format_date(&ts))
                .unwrap_or_else(|| raw.to_string()),
        }
    }

    pub fn tags_label(&self) -> String {
        if self.tags.is_empty() {
            "None".to_string()
        } else {
            self.tags.join(", ")
        }
    }
}

/// Parse the timestamp shapes the backend emits: RFC 3339, Python's naive
/// `isoformat()` and bare dates.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

pub fn format_date(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%d").to_string()
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn nullable_priority<'de, D>(deserializer: D) -> Result<Priority, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Priority>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagsRepr {
    List(Vec<String>),
    Joined(String),
}

/// Tags arrive as a list, a comma-joined string (how the backend stores
/// them), or null.
fn tag_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let tags = match Option::<TagsRepr>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(TagsRepr::List(tags)) => tags,
        Some(TagsRepr::Joined(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect(),
    };
    Ok(tags)
}

/// Newest first, unreadable timestamps last. Stable, so equal timestamps
/// keep the backend's order.
pub fn sort_newest_first(tickets: &mut [Ticket]) {
    // `None` orders below every `Some`, so the reversed compare puts it last
    tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// What the ticket pane currently shows. Every load replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TicketPanel {
    #[default]
    Loading,
    Empty,
    Loaded { tickets: Vec<Ticket>, total: usize },
    Failed(String),
}

impl TicketPanel {
    pub fn from_result(result: Result<TicketList, ApiError>) -> Self {
        match result {
            Ok(list) if list.tickets.is_empty() => TicketPanel::Empty,
            Ok(list) => {
                let total = list.total.unwrap_or(list.tickets.len());
                let mut tickets = list.tickets;
                sort_newest_first(&mut tickets);
                TicketPanel::Loaded { tickets, total }
            }
            Err(err) => TicketPanel::Failed(err.to_string()),
        }
    }

    pub fn title(&self) -> String {
        match self {
            TicketPanel::Loaded { total, .. } => format!(" Tickets ({}) ", total),
            _ => " Tickets ".to_string(),
        }
    }
}

/// One field row of a ticket card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardField {
    pub label: &'static str,
    pub value: String,
}

/// The labelled rows shown under a ticket's id/priority/summary header.
pub fn card_fields(ticket: &Ticket) -> Vec<CardField> {
    vec![
        CardField {
            label: "Assignee",
            value: ticket.assignee_label().to_string(),
        },
        CardField {
            label: "Status",
            value: ticket.status.clone(),
        },
        CardField {
            label: "Created",
            value: ticket.created_label(),
        },
        CardField {
            label: "Due",
            value: ticket.due_label(),
        },
        CardField {
            label: "Tags",
            value: ticket.tags_label(),
        },
    ]
}
