//! On-disk shape of the tracker state.
//!
//! Durations are stored as whole milliseconds and days as `YYYY-MM-DD` keys.

use crate::domain::{Status, Ticket, TimeAccount, TodoItem};
use chrono::{DateTime, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Index value persisted when nothing is selected
pub const NO_SELECTION: i64 = -1;

fn no_selection() -> i64 {
    NO_SELECTION
}

fn default_status() -> Status {
    Status::New
}

/// Full persisted state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDocument {
    /// Work time accumulated on `current_date`, in milliseconds
    #[serde(default)]
    pub day_elapsed_time: u64,
    #[serde(default)]
    pub current_date: Option<NaiveDate>,
    #[serde(default = "no_selection")]
    pub selected_ticket_index: i64,
    #[serde(default = "no_selection")]
    pub selected_todo_index: i64,
    #[serde(default)]
    pub tickets: Vec<TicketDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDocument {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_status")]
    pub status: Status,
    #[serde(default)]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default)]
    pub elapsed_time: u64,
    #[serde(default)]
    pub daily_time_spent: BTreeMap<NaiveDate, u64>,
    #[serde(default)]
    pub todos: Vec<TodoDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoDocument {
    #[serde(default = "default_status")]
    pub status: Status,
    pub title: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub elapsed_time: u64,
    #[serde(default)]
    pub daily_time_spent: BTreeMap<NaiveDate, u64>,
}

pub fn to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.num_milliseconds()).unwrap_or(0)
}

pub fn from_millis(millis: u64) -> Duration {
    Duration::milliseconds(i64::try_from(millis).unwrap_or(i64::MAX))
}

/// Account totals as if stopped at `now`; the live account is untouched
fn capture_account(account: &TimeAccount, now: DateTime<Local>) -> (u64, BTreeMap<NaiveDate, u64>) {
    let (total, daily) = account.snapshot(now);
    let daily = daily
        .into_iter()
        .map(|(date, duration)| (date, to_millis(duration)))
        .collect();
    (to_millis(total), daily)
}

fn restore_account(elapsed: u64, daily: &BTreeMap<NaiveDate, u64>) -> TimeAccount {
    let daily = daily
        .iter()
        .map(|(date, millis)| (*date, from_millis(*millis)))
        .collect();
    TimeAccount::restore(from_millis(elapsed), daily)
}

impl TicketDocument {
    pub fn capture(ticket: &Ticket, now: DateTime<Local>) -> Self {
        let (elapsed_time, daily_time_spent) = capture_account(&ticket.account, now);
        Self {
            id: ticket.id.clone(),
            url: ticket.link.clone(),
            status: ticket.status,
            comment: ticket.comment.clone(),
            order: ticket.order,
            elapsed_time,
            daily_time_spent,
            todos: ticket
                .todos
                .iter()
                .map(|todo| TodoDocument::capture(todo, now))
                .collect(),
        }
    }

    /// Rebuild a stopped ticket
    pub fn into_ticket(self) -> Ticket {
        let mut ticket = Ticket::new(self.id, self.url, self.comment, self.status);
        ticket.order = self.order;
        ticket.account = restore_account(self.elapsed_time, &self.daily_time_spent);
        ticket.todos = self.todos.into_iter().map(TodoDocument::into_todo).collect();
        ticket
    }
}

impl TodoDocument {
    pub fn capture(todo: &TodoItem, now: DateTime<Local>) -> Self {
        let (elapsed_time, daily_time_spent) = capture_account(&todo.account, now);
        Self {
            status: todo.status,
            title: todo.title.clone(),
            comment: todo.comment.clone(),
            elapsed_time,
            daily_time_spent,
        }
    }

    /// Rebuild a stopped todo with a fresh runtime id
    pub fn into_todo(self) -> TodoItem {
        let mut todo = TodoItem::new(self.title, self.status);
        todo.comment = self.comment;
        todo.account = restore_account(self.elapsed_time, &self.daily_time_spent);
        todo
    }
}

/// Convert a persisted index into an optional position
pub fn index_hint(value: i64) -> Option<usize> {
    usize::try_from(value).ok()
}

/// Convert an optional position into a persisted index
pub fn index_value(position: Option<usize>) -> i64 {
    position
        .and_then(|p| i64::try_from(p).ok())
        .unwrap_or(NO_SELECTION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::local;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_document_layout() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let doc = StateDocument {
            day_elapsed_time: 1500,
            current_date: Some(date),
            selected_ticket_index: 0,
            selected_todo_index: NO_SELECTION,
            tickets: vec![TicketDocument {
                id: "JIRA-1".to_string(),
                url: None,
                status: Status::InProgress,
                comment: "c".to_string(),
                order: None,
                elapsed_time: 1500,
                daily_time_spent: BTreeMap::from([(date, 1500)]),
                todos: vec![TodoDocument {
                    status: Status::New,
                    title: "t".to_string(),
                    comment: String::new(),
                    elapsed_time: 0,
                    daily_time_spent: BTreeMap::new(),
                }],
            }],
        };

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "dayElapsedTime": 1500,
                "currentDate": "2024-01-02",
                "selectedTicketIndex": 0,
                "selectedTodoIndex": -1,
                "tickets": [{
                    "id": "JIRA-1",
                    "url": null,
                    "status": "In_Progress",
                    "comment": "c",
                    "elapsedTime": 1500,
                    "dailyTimeSpent": { "2024-01-02": 1500 },
                    "todos": [{
                        "status": "New",
                        "title": "t",
                        "comment": "",
                        "elapsedTime": 0,
                        "dailyTimeSpent": {}
                    }]
                }]
            })
        );
    }

    #[test]
    fn test_sparse_document_defaults() {
        let doc: StateDocument =
            serde_json::from_str(r#"{ "tickets": [ { "id": "A", "todos": [ { "title": "x" } ] } ] }"#)
                .unwrap();
        assert_eq!(doc.current_date, None);
        assert_eq!(doc.selected_ticket_index, NO_SELECTION);
        assert_eq!(doc.tickets[0].status, Status::New);
        assert_eq!(doc.tickets[0].todos[0].elapsed_time, 0);
    }

    #[test]
    fn test_capture_running_ticket_leaves_it_running() {
        let mut ticket = Ticket::new("A".to_string(), None, String::new(), Status::New);
        ticket.todos.push(TodoItem::new("t".to_string(), Status::New));
        let t0 = local(2024, 1, 2, 10, 0, 0);
        ticket.account.start(t0).unwrap();

        let doc = TicketDocument::capture(&ticket, t0 + Duration::seconds(30));
        assert_eq!(doc.elapsed_time, 30_000);
        assert_eq!(doc.daily_time_spent.values().sum::<u64>(), 30_000);
        assert!(ticket.is_running());
        assert_eq!(ticket.account.elapsed(), Duration::zero());

        let restored = doc.into_ticket();
        assert!(!restored.is_running());
        assert_eq!(restored.account.elapsed(), Duration::seconds(30));
        assert_eq!(restored.todos.len(), 1);
        assert_ne!(restored.todos[0].id, ticket.todos[0].id);
    }

    #[test]
    fn test_index_conversion() {
        assert_eq!(index_hint(-1), None);
        assert_eq!(index_hint(3), Some(3));
        assert_eq!(index_value(None), -1);
        assert_eq!(index_value(Some(2)), 2);
    }

    #[test]
    fn test_millis_conversion() {
        assert_eq!(to_millis(Duration::seconds(-3)), 0);
        assert_eq!(to_millis(Duration::milliseconds(1234)), 1234);
        assert_eq!(from_millis(65_000), Duration::seconds(65));
    }
}
