use super::account::TimeAccount;
use super::enums::Status;
use crate::error::TrackerError;
use chrono::{DateTime, Local};
use uuid::Uuid;

/// A sub-task owned by exactly one ticket
#[derive(Debug, Clone)]
pub struct TodoItem {
    /// Runtime identity (not persisted, fresh on every load)
    pub id: Uuid,
    pub title: String,
    pub comment: String,
    pub status: Status,
    pub account: TimeAccount,
}

impl TodoItem {
    pub fn new(title: String, status: Status) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            comment: String::new(),
            status,
            account: TimeAccount::new(),
        }
    }
}

/// A top-level trackable work item
#[derive(Debug, Clone)]
pub struct Ticket {
    /// External reference, unique in the registry
    pub id: String,
    /// Full URL when the ticket was added from a link
    pub link: Option<String>,
    pub status: Status,
    pub comment: String,
    /// Manual sort key
    pub order: Option<i64>,
    pub account: TimeAccount,
    pub todos: Vec<TodoItem>,
}

impl Ticket {
    pub fn new(id: String, link: Option<String>, comment: String, status: Status) -> Self {
        Self {
            id,
            link,
            status,
            comment,
            order: None,
            account: TimeAccount::new(),
            todos: Vec::new(),
        }
    }

    /// Stop this ticket's timer and every todo timer under it
    pub fn stop_all(&mut self, now: DateTime<Local>) {
        self.account.stop(now);
        for todo in &mut self.todos {
            todo.account.stop(now);
        }
    }

    pub fn is_running(&self) -> bool {
        self.account.is_running()
    }

    pub fn todo_index(&self, id: Uuid) -> Option<usize> {
        self.todos.iter().position(|todo| todo.id == id)
    }

    pub fn todo_by_id(&self, id: Uuid) -> Option<&TodoItem> {
        self.todos.iter().find(|todo| todo.id == id)
    }

    pub fn todo_by_id_mut(&mut self, id: Uuid) -> Option<&mut TodoItem> {
        self.todos.iter_mut().find(|todo| todo.id == id)
    }

    /// Todos with their backing index, optionally hiding done ones
    pub fn visible_todos(
        &self,
        exclude_done: bool,
    ) -> impl Iterator<Item = (usize, &TodoItem)> + Clone + '_ {
        self.todos
            .iter()
            .enumerate()
            .filter(move |(_, todo)| !(exclude_done && todo.status.is_done()))
    }
}

/// Split raw user input into a ticket id and an optional link.
///
/// Input starting with `http` is a URL whose last path segment is the id.
pub fn parse_ticket_ref(raw: &str) -> Result<(String, Option<String>), TrackerError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(TrackerError::InvalidId(raw.to_string()));
    }
    if !raw.starts_with("http") {
        return Ok((raw.to_string(), None));
    }

    let segment = raw
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    if segment.is_empty() || segment.contains(':') {
        return Err(TrackerError::InvalidId(raw.to_string()));
    }
    Ok((segment.to_string(), Some(raw.to_string())))
}
