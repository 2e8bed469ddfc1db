use crate::clock::Clock;
use crate::domain::{format_hms, run_badge, tree_connector};
use crate::input::command::{parse_command, Command, ParseError, HELP};
use crate::persistence::Store;
use crate::report::calculate_daily_totals;
use crate::tracker::Tracker;
use anyhow::Result;
use std::io::Write;

/// Parse and run one input line. Returns true when the session should end.
pub fn handle_line<C: Clock, W: Write>(
    tracker: &mut Tracker<C>,
    store: &Store,
    line: &str,
    out: &mut W,
) -> Result<bool> {
    match parse_command(line) {
        Ok(command) => handle_command(tracker, store, command, out),
        Err(ParseError::Empty) => Ok(false),
        Err(err) => {
            writeln!(out, "{}", err)?;
            Ok(false)
        }
    }
}

/// Run a parsed command against the tracker
pub fn handle_command<C: Clock, W: Write>(
    tracker: &mut Tracker<C>,
    store: &Store,
    command: Command,
    out: &mut W,
) -> Result<bool> {
    match command {
        Command::AddTicket { reference, comment } => {
            match tracker.add_ticket(&reference, &comment) {
                Ok(id) => writeln!(out, "Added ticket {}", id)?,
                Err(err) => writeln!(out, "{}", err)?,
            }
        }
        Command::AddTodo { title } => {
            let Some(ticket_id) = selected_id(tracker) else {
                writeln!(out, "Select a ticket first")?;
                return Ok(false);
            };
            if tracker.add_todo(&ticket_id, &title).is_some() {
                writeln!(out, "Added todo to {}", ticket_id)?;
            }
        }
        Command::Select(id) => {
            if tracker.registry().contains(&id) {
                tracker.select_ticket(Some(&id));
                writeln!(out, "Selected {}", id)?;
            } else {
                writeln!(out, "No ticket {}", id)?;
            }
        }
        Command::Unselect => tracker.select_ticket(None),
        Command::Pick(index) => {
            let Some(ticket) = tracker.selected_ticket() else {
                writeln!(out, "Select a ticket first")?;
                return Ok(false);
            };
            if index >= ticket.todos.len() {
                writeln!(out, "No todo {}", index + 1)?;
                return Ok(false);
            }
            tracker.select_todo(Some(index));
        }
        Command::Drop => tracker.select_todo(None),
        Command::Pause if tracker.is_paused() => writeln!(out, "Already paused")?,
        Command::Pause => {
            tracker.pause_all();
            writeln!(out, "Paused")?;
        }
        Command::Resume if !tracker.is_paused() => writeln!(out, "Not paused")?,
        Command::Resume => {
            tracker.resume_all();
            writeln!(out, "Resumed")?;
        }
        Command::TogglePause => {
            tracker.toggle_pause();
            writeln!(out, "{}", tracker.global_state().label())?;
        }
        Command::SetStatus { id, status } => {
            if !tracker.scheme().offers(status) {
                writeln!(out, "Status {} is not offered", status.label())?;
            } else if !tracker.set_ticket_status(&id, status) {
                writeln!(out, "No ticket {}", id)?;
            }
        }
        Command::SetComment { id, text } => {
            if !tracker.set_ticket_comment(&id, &text) {
                writeln!(out, "No ticket {}", id)?;
            }
        }
        Command::SetOrder { id, order } => {
            if !tracker.set_ticket_order(&id, order) {
                writeln!(out, "No ticket {}", id)?;
            }
        }
        Command::Rename { id, new_id } => {
            if let Err(err) = tracker.rename_ticket(&id, &new_id) {
                writeln!(out, "{}", err)?;
            }
        }
        Command::SetTodoStatus { index, status } => {
            let Some(ticket_id) = selected_id(tracker) else {
                writeln!(out, "Select a ticket first")?;
                return Ok(false);
            };
            if !tracker.scheme().offers(status) {
                writeln!(out, "Status {} is not offered", status.label())?;
            } else if !tracker.set_todo_status(&ticket_id, index, status) {
                writeln!(out, "No todo {}", index + 1)?;
            }
        }
        Command::SetTodoComment { index, text } => {
            let Some(ticket_id) = selected_id(tracker) else {
                writeln!(out, "Select a ticket first")?;
                return Ok(false);
            };
            if !tracker.set_todo_comment(&ticket_id, index, &text) {
                writeln!(out, "No todo {}", index + 1)?;
            }
        }
        Command::Remove(id) => match tracker.remove_ticket(&id) {
            Some(ticket) => writeln!(
                out,
                "Removed {} ({})",
                ticket.id,
                format_hms(ticket.account.elapsed())
            )?,
            None => writeln!(out, "No ticket {}", id)?,
        },
        Command::RemoveTodo(index) => {
            let Some(ticket_id) = selected_id(tracker) else {
                writeln!(out, "Select a ticket first")?;
                return Ok(false);
            };
            match tracker.remove_todo(&ticket_id, index) {
                Some(todo) => writeln!(out, "Removed todo {}", todo.title)?,
                None => writeln!(out, "No todo {}", index + 1)?,
            }
        }
        Command::HideDone(hide) => {
            tracker.set_hide_done(hide);
            let shown = if tracker.hide_done() { "hidden" } else { "shown" };
            writeln!(out, "Done items {}", shown)?;
        }
        Command::List => write!(out, "{}", render_listing(tracker))?,
        Command::Days => write!(out, "{}", render_days(tracker))?,
        Command::Save => match tracker.save(store) {
            Ok(_) => writeln!(out, "Saved to {}", store.state_path().display())?,
            Err(err) => writeln!(out, "Save failed: {}", err)?,
        },
        Command::Help => writeln!(out, "{}", HELP)?,
        Command::Quit => return Ok(true),
    }
    Ok(false)
}

fn selected_id<C: Clock>(tracker: &Tracker<C>) -> Option<String> {
    tracker.selected_ticket().map(|t| t.id.clone())
}

/// Ticket list with the todos of the selected ticket nested below it
pub fn render_listing<C: Clock>(tracker: &Tracker<C>) -> String {
    let mut text = format!(
        "[{}] work day {}  {}\n",
        tracker.global_state().label(),
        tracker.work_day_date(),
        tracker.work_day_hms()
    );

    let rows = tracker.ticket_rows();
    if tracker.registry().is_empty() {
        text.push_str("  (no tickets)\n");
        return text;
    }
    if rows.is_empty() {
        text.push_str("  (all tickets done; 'hide off' shows them)\n");
        return text;
    }

    let selected = selected_id(tracker);
    for row in rows {
        let marker = if selected.as_deref() == Some(row.id.as_str()) {
            '*'
        } else {
            ' '
        };
        text.push_str(&format!(
            "{}{} {:<16} {:<12} {}  {}\n",
            marker,
            run_badge(row.running),
            row.id,
            row.status.label(),
            row.elapsed,
            row.comment
        ));

        if marker == '*' {
            for todo in tracker.todo_rows() {
                text.push_str(&format!(
                    "   {} {}{} {:>2}. {:<24} {:<12} {}  {}\n",
                    tree_connector(todo.is_last),
                    if tracker.selected_todo_index() == Some(todo.index) { '*' } else { ' ' },
                    run_badge(todo.running),
                    todo.index + 1,
                    todo.title,
                    todo.status.label(),
                    todo.elapsed,
                    todo.comment
                ));
            }
        }
    }
    text
}

/// Per-day totals of the selected ticket and todo, or of all tickets
pub fn render_days<C: Clock>(tracker: &Tracker<C>) -> String {
    let Some(ticket) = tracker.selected_ticket() else {
        let mut text = String::from("All tickets\n");
        for (date, elapsed) in calculate_daily_totals(tracker.registry().tickets(), tracker.now()) {
            text.push_str(&format!("  {}  {}\n", date, format_hms(elapsed)));
        }
        return text;
    };

    let mut text = format!("{}\n", ticket.id);
    for (date, elapsed) in tracker.ticket_breakdown() {
        text.push_str(&format!("  {}  {}\n", date, format_hms(elapsed)));
    }
    if let Some(todo) = tracker.selected_todo() {
        text.push_str(&format!("{}\n", todo.title));
        for (date, elapsed) in tracker.todo_breakdown() {
            text.push_str(&format!("  {}  {}\n", date, format_hms(elapsed)));
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::Config;
    use crate::domain::{Status, StatusScheme};
    use chrono::Duration;
    use tempfile::tempdir;

    fn run(
        tracker: &mut Tracker<ManualClock>,
        store: &Store,
        line: &str,
    ) -> (bool, String) {
        let mut out = Vec::new();
        let quit = handle_line(tracker, store, line, &mut out).unwrap();
        (quit, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_session_flow() {
        let temp_dir = tempdir().unwrap();
        let store = Store::new(temp_dir.path(), &Config::default());
        let clock = ManualClock::at(2024, 6, 3, 9, 0, 0);
        let mut tracker = Tracker::new(clock.clone(), StatusScheme::Classic);

        let (_, out) = run(&mut tracker, &store, "ticket https://jira/browse/JIRA-1 login");
        assert_eq!(out, "Added ticket JIRA-1\n");
        let (_, out) = run(&mut tracker, &store, "todo write tests");
        assert_eq!(out, "Select a ticket first\n");

        run(&mut tracker, &store, "select JIRA-1");
        run(&mut tracker, &store, "todo write tests");
        run(&mut tracker, &store, "pick 1");
        clock.advance(Duration::seconds(65));

        let (_, out) = run(&mut tracker, &store, "ls");
        assert!(out.starts_with("[running] work day 2024-06-03  00:01:05\n"));
        assert!(out.contains("*▶ JIRA-1"));
        assert!(out.contains("└─ *▶  1. write tests"));

        let (_, out) = run(&mut tracker, &store, "days");
        assert_eq!(out, "JIRA-1\n  2024-06-03  00:01:05\nwrite tests\n  2024-06-03  00:01:05\n");

        run(&mut tracker, &store, "pause");
        assert!(tracker.is_paused());
        let (_, out) = run(&mut tracker, &store, "pause");
        assert_eq!(out, "Already paused\n");
        let (_, out) = run(&mut tracker, &store, "p");
        assert_eq!(out, "running\n");
        let (_, out) = run(&mut tracker, &store, "p");
        assert_eq!(out, "paused\n");
        let (_, out) = run(&mut tracker, &store, "save");
        assert!(out.starts_with("Saved to "));
        assert!(store.state_path().exists());

        let (quit, _) = run(&mut tracker, &store, "quit");
        assert!(quit);
    }

    #[test]
    fn test_status_must_be_offered() {
        let temp_dir = tempdir().unwrap();
        let store = Store::new(temp_dir.path(), &Config::default());
        let clock = ManualClock::at(2024, 6, 3, 9, 0, 0);
        let mut tracker = Tracker::new(clock, StatusScheme::Classic);
        run(&mut tracker, &store, "ticket A");

        let (_, out) = run(&mut tracker, &store, "status A blocked");
        assert_eq!(out, "Status Blocked is not offered\n");
        run(&mut tracker, &store, "status A on-hold");
        assert_eq!(tracker.registry().get("A").unwrap().status, Status::OnHold);

        let (_, out) = run(&mut tracker, &store, "status B done");
        assert_eq!(out, "No ticket B\n");
    }

    #[test]
    fn test_errors_are_reported_not_fatal() {
        let temp_dir = tempdir().unwrap();
        let store = Store::new(temp_dir.path(), &Config::default());
        let clock = ManualClock::at(2024, 6, 3, 9, 0, 0);
        let mut tracker = Tracker::new(clock, StatusScheme::Classic);

        run(&mut tracker, &store, "ticket A");
        let (quit, out) = run(&mut tracker, &store, "ticket A");
        assert!(!quit);
        assert_eq!(out, "ticket with id A already exists\n");

        let (_, out) = run(&mut tracker, &store, "bogus");
        assert_eq!(out, "unknown command 'bogus' (try 'help')\n");
        let (_, out) = run(&mut tracker, &store, "");
        assert_eq!(out, "");
        let (_, out) = run(&mut tracker, &store, "rm B");
        assert_eq!(out, "No ticket B\n");
        let (_, out) = run(&mut tracker, &store, "days");
        assert_eq!(out, "All tickets\n");
    }

    #[test]
    fn test_hidden_done_tickets_not_listed() {
        let temp_dir = tempdir().unwrap();
        let store = Store::new(temp_dir.path(), &Config::default());
        let clock = ManualClock::at(2024, 6, 3, 9, 0, 0);
        let mut tracker = Tracker::new(clock, StatusScheme::Classic);
        run(&mut tracker, &store, "ticket A");
        run(&mut tracker, &store, "ticket B");
        run(&mut tracker, &store, "status A done");

        let (_, out) = run(&mut tracker, &store, "ls");
        assert!(!out.contains(" A "));
        let (_, out) = run(&mut tracker, &store, "hide off");
        assert_eq!(out, "Done items shown\n");
        let (_, out) = run(&mut tracker, &store, "ls");
        assert!(out.contains(" A "));

        run(&mut tracker, &store, "status B done");
        let (_, out) = run(&mut tracker, &store, "hide on");
        assert_eq!(out, "Done items hidden\n");
        let (_, out) = run(&mut tracker, &store, "ls");
        assert!(out.ends_with("  (all tickets done; 'hide off' shows them)\n"));
    }

    #[test]
    fn test_empty_listing() {
        let clock = ManualClock::at(2024, 6, 3, 9, 0, 0);
        let tracker = Tracker::new(clock, StatusScheme::Classic);
        assert_eq!(
            render_listing(&tracker),
            "[idle] work day 2024-06-03  00:00:00\n  (no tickets)\n"
        );
    }

    #[test]
    fn test_remove_todo_of_selected_ticket() {
        let temp_dir = tempdir().unwrap();
        let store = Store::new(temp_dir.path(), &Config::default());
        let clock = ManualClock::at(2024, 6, 3, 9, 0, 0);
        let mut tracker = Tracker::new(clock, StatusScheme::Classic);
        run(&mut tracker, &store, "ticket A");
        run(&mut tracker, &store, "select A");
        run(&mut tracker, &store, "todo one");
        run(&mut tracker, &store, "todo two");

        let (_, out) = run(&mut tracker, &store, "rm-todo 1");
        assert_eq!(out, "Removed todo one\n");
        let (_, out) = run(&mut tracker, &store, "rm-todo 5");
        assert_eq!(out, "No todo 5\n");
        assert_eq!(tracker.registry().get("A").unwrap().todos.len(), 1);
    }
}
