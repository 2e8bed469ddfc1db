use super::enums::Status;
use super::item::Ticket;
use super::registry::Registry;
use chrono::{DateTime, Duration, Local};

/// A ticket row for rendering the ticket list
#[derive(Debug, Clone, PartialEq)]
pub struct TicketRow {
    /// Index in the registry (stable while the row is shown)
    pub index: usize,
    pub id: String,
    pub link: Option<String>,
    pub status: Status,
    pub comment: String,
    pub order: Option<i64>,
    /// Elapsed time formatted as HH:MM:SS
    pub elapsed: String,
    pub running: bool,
}

/// A todo row for rendering the todo list of one ticket
#[derive(Debug, Clone, PartialEq)]
pub struct TodoRow {
    /// Index in the ticket's todo list
    pub index: usize,
    pub title: String,
    pub status: Status,
    pub comment: String,
    pub elapsed: String,
    pub running: bool,
    /// Whether this is the last shown todo of its ticket
    pub is_last: bool,
}

/// Rows for every shown ticket, in display order
pub fn ticket_rows(registry: &Registry, exclude_done: bool, now: DateTime<Local>) -> Vec<TicketRow> {
    registry
        .visible_tickets(exclude_done)
        .map(|(index, ticket)| TicketRow {
            index,
            id: ticket.id.clone(),
            link: ticket.link.clone(),
            status: ticket.status,
            comment: ticket.comment.clone(),
            order: ticket.order,
            elapsed: format_hms(ticket.account.elapsed_now(now)),
            running: ticket.is_running(),
        })
        .collect()
}

/// Rows for the shown todos of a ticket
pub fn todo_rows(ticket: &Ticket, exclude_done: bool, now: DateTime<Local>) -> Vec<TodoRow> {
    let shown = ticket.visible_todos(exclude_done).count();
    ticket
        .visible_todos(exclude_done)
        .enumerate()
        .map(|(position, (index, todo))| TodoRow {
            index,
            title: todo.title.clone(),
            status: todo.status,
            comment: todo.comment.clone(),
            elapsed: format_hms(todo.account.elapsed_now(now)),
            running: todo.account.is_running(),
            is_last: position + 1 == shown,
        })
        .collect()
}

/// Format a duration as "HH:MM:SS" (hours keep growing past 99)
pub fn format_hms(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Format a duration as "Xh Ym" (omits 0 values)
pub fn format_short(duration: Duration) -> String {
    let total_minutes = duration.num_minutes();
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours > 0 && minutes > 0 {
        format!("{}h {}m", hours, minutes)
    } else if hours > 0 {
        format!("{}h", hours)
    } else {
        format!("{}m", minutes)
    }
}

/// Marker shown in front of a row whose timer runs
pub fn run_badge(running: bool) -> &'static str {
    if running {
        "▶"
    } else {
        " "
    }
}

/// Get tree connector for todos
pub fn tree_connector(is_last: bool) -> &'static str {
    if is_last {
        "└─"
    } else {
        "├─"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::local;
    use crate::domain::item::TodoItem;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(Duration::zero()), "00:00:00");
        assert_eq!(format_hms(Duration::seconds(65)), "00:01:05");
        assert_eq!(format_hms(Duration::seconds(3600 * 27 + 61)), "27:01:01");
        assert_eq!(format_hms(Duration::seconds(3600 * 123)), "123:00:00");
        assert_eq!(format_hms(Duration::seconds(-5)), "00:00:00");
    }

    #[test]
    fn test_format_short() {
        assert_eq!(format_short(Duration::minutes(90)), "1h 30m");
        assert_eq!(format_short(Duration::hours(2)), "2h");
        assert_eq!(format_short(Duration::minutes(45)), "45m");
    }

    #[test]
    fn test_ticket_rows() {
        let mut registry = Registry::new();
        registry.add_ticket("A", "first", Status::New).unwrap();
        registry.add_ticket("http://x/B", "", Status::Done).unwrap();
        let t0 = local(2024, 4, 1, 9, 0, 0);
        registry.get_mut("A").unwrap().account.start(t0).unwrap();

        let rows = ticket_rows(&registry, true, t0 + Duration::seconds(61));
        assert_eq!(
            rows,
            vec![TicketRow {
                index: 0,
                id: "A".to_string(),
                link: None,
                status: Status::New,
                comment: "first".to_string(),
                order: None,
                elapsed: "00:01:01".to_string(),
                running: true,
            }]
        );

        let all = ticket_rows(&registry, false, t0);
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].link.as_deref(), Some("http://x/B"));
    }

    #[test]
    fn test_todo_rows() {
        let mut ticket = Ticket::new("A".to_string(), None, String::new(), Status::New);
        ticket.todos.push(TodoItem::new("a".to_string(), Status::New));
        ticket.todos.push(TodoItem::new("b".to_string(), Status::Done));
        ticket.todos.push(TodoItem::new("c".to_string(), Status::InProgress));

        let rows = todo_rows(&ticket, true, local(2024, 4, 1, 9, 0, 0));
        let indices: Vec<usize> = rows.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 2]);
        assert!(!rows[0].is_last);
        assert!(rows[1].is_last);
        assert_eq!(rows[1].elapsed, "00:00:00");
    }

    #[test]
    fn test_tree_connector() {
        assert_eq!(tree_connector(false), "├─");
        assert_eq!(tree_connector(true), "└─");
    }

    #[test]
    fn test_run_badge() {
        assert_eq!(run_badge(true), "▶");
        assert_eq!(run_badge(false), " ");
    }
}
