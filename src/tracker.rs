//! Tracking coordinator.
//!
//! Two exclusivity groups exist at once: the tickets of the registry, and the
//! todos of the selected ticket. At most one member of each group accrues time.
//! The selected ticket and the selected todo are exactly the accounts that run
//! while the tracker is not paused, so a global pause only needs to remember
//! the selection to resume the same items.
//!
//! All calls are expected on one owner thread; nothing here is synchronized.

use crate::clock::Clock;
use crate::domain::{
    ticket_rows, todo_rows, format_hms, GlobalState, Registry, Status, StatusScheme, Ticket,
    TicketRow, TimeAccount, TodoItem, TodoRow, WorkDay,
};
use crate::error::{PersistenceError, TrackerError};
use crate::persistence::document::{from_millis, index_hint, index_value, to_millis};
use crate::persistence::{StateDocument, Store, TicketDocument};
use chrono::{DateTime, Duration, Local, NaiveDate};
use std::path::PathBuf;
use uuid::Uuid;

/// Persisted selection, offered to the UI to restore after a restart
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionHint {
    pub ticket: Option<usize>,
    pub todo: Option<usize>,
}

pub struct Tracker<C: Clock> {
    clock: C,
    registry: Registry,
    scheme: StatusScheme,
    selected_ticket: Option<String>,
    selected_todo: Option<Uuid>,
    paused: bool,
    work_day: WorkDay,
    hide_done: bool,
    hint: SelectionHint,
    needs_save: bool,
    /// Day finished by a rollover outside `tick`, reported by the next `tick`
    pending_rollover: Option<NaiveDate>,
    last_seen: DateTime<Local>,
}

/// Start an account, absorbing a double start as a logged no-op
fn start_account(account: &mut TimeAccount, now: DateTime<Local>, what: &str) {
    if let Err(err) = account.start(now) {
        log::warn!("Ignoring start of {}: {}", what, err);
    }
}

impl<C: Clock> Tracker<C> {
    pub fn new(clock: C, scheme: StatusScheme) -> Self {
        let now = clock.now();
        let today = now.date_naive();
        Self {
            clock,
            registry: Registry::new(),
            scheme,
            selected_ticket: None,
            selected_todo: None,
            paused: false,
            work_day: WorkDay::new(today),
            hide_done: true,
            hint: SelectionHint::default(),
            needs_save: false,
            pending_rollover: None,
            last_seen: now,
        }
    }

    /// Rebuild from a persisted document. Nothing is selected and nothing runs.
    pub fn from_document(clock: C, scheme: StatusScheme, doc: StateDocument) -> Self {
        let mut tracker = Self::new(clock, scheme);
        let today = tracker.work_day.date();

        if let Some(date) = doc.current_date {
            if date != today {
                log::info!("New work day {} (last saved on {})", today, date);
            }
            tracker.work_day = WorkDay::restore(date, from_millis(doc.day_elapsed_time), today);
        }

        let mut tickets: Vec<Ticket> = Vec::with_capacity(doc.tickets.len());
        for ticket_doc in doc.tickets {
            if tickets.iter().any(|t| t.id == ticket_doc.id) {
                log::warn!("Dropping duplicate ticket {} from saved state", ticket_doc.id);
                continue;
            }
            tickets.push(ticket_doc.into_ticket());
        }
        tracker.registry = Registry::from_tickets(tickets);
        log::debug!("Restored {} tickets", tracker.registry.len());

        tracker.hint = SelectionHint {
            ticket: index_hint(doc.selected_ticket_index),
            todo: index_hint(doc.selected_todo_index),
        };
        tracker
    }

    /// Load through the store, starting empty when the state is missing or unreadable
    pub fn load(clock: C, scheme: StatusScheme, store: &Store) -> Self {
        let now = clock.now();
        match store.load_or_recover(now) {
            Some(doc) => Self::from_document(clock, scheme, doc),
            None => Self::new(clock, scheme),
        }
    }

    /// Load through the store for read-only use. An unreadable file is an
    /// error and is left exactly where it is.
    pub fn open(clock: C, scheme: StatusScheme, store: &Store) -> Result<Self, PersistenceError> {
        Ok(match store.load()? {
            Some(doc) => Self::from_document(clock, scheme, doc),
            None => Self::new(clock, scheme),
        })
    }

    pub fn now(&self) -> DateTime<Local> {
        self.clock.now()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn scheme(&self) -> StatusScheme {
        self.scheme
    }

    pub fn needs_save(&self) -> bool {
        self.needs_save
    }

    // ---- selection -------------------------------------------------------

    fn start_selection(&mut self, now: DateTime<Local>) {
        let Some(ticket_id) = self.selected_ticket.as_deref() else {
            return;
        };
        let Some(ticket) = self.registry.get_mut(ticket_id) else {
            return;
        };
        start_account(&mut ticket.account, now, &format!("ticket {}", ticket.id));
        if let Some(todo) = self.selected_todo.and_then(|id| ticket.todo_by_id_mut(id)) {
            start_account(&mut todo.account, now, &format!("todo {}", todo.title));
        }
        self.work_day.start(now);
    }

    fn stop_selection(&mut self, now: DateTime<Local>) {
        if let Some(ticket) = self
            .selected_ticket
            .as_deref()
            .and_then(|id| self.registry.get_mut(id))
        {
            ticket.stop_all(now);
        }
        self.work_day.stop(now);
    }

    /// Make `id` the selected ticket (or clear the selection).
    /// The previous ticket and its todos stop; the new ticket starts unless paused.
    pub fn select_ticket(&mut self, id: Option<&str>) {
        if let Some(id) = id {
            if !self.registry.contains(id) {
                log::debug!("select_ticket: unknown ticket {}", id);
                return;
            }
        }

        let now = self.observe_clock();
        self.stop_selection(now);
        self.selected_ticket = id.map(str::to_string);
        self.selected_todo = None;
        if !self.paused {
            self.start_selection(now);
        }
        self.needs_save = true;
    }

    /// Select the todo at `index` of the selected ticket (or clear it).
    /// No-op when no ticket is selected.
    pub fn select_todo(&mut self, index: Option<usize>) {
        let Some(ticket) = self.selected_ticket() else {
            log::debug!("select_todo: no ticket selected");
            return;
        };
        let todo_id = match index {
            Some(i) => match ticket.todos.get(i) {
                Some(todo) => Some(todo.id),
                None => {
                    log::debug!("select_todo: no todo {} in ticket {}", i, ticket.id);
                    return;
                }
            },
            None => None,
        };
        self.select_todo_by_id(todo_id);
    }

    pub fn select_todo_by_id(&mut self, todo_id: Option<Uuid>) {
        let now = self.observe_clock();
        let paused = self.paused;
        let Some(ticket) = self
            .selected_ticket
            .as_deref()
            .and_then(|id| self.registry.get_mut(id))
        else {
            log::debug!("select_todo: no ticket selected");
            return;
        };
        if let Some(id) = todo_id {
            if ticket.todo_by_id(id).is_none() {
                log::debug!("select_todo: todo {} not in ticket {}", id, ticket.id);
                return;
            }
        }

        if let Some(previous) = self.selected_todo.and_then(|id| ticket.todo_by_id_mut(id)) {
            previous.account.stop(now);
        }
        self.selected_todo = todo_id;
        if !paused {
            if let Some(todo) = todo_id.and_then(|id| ticket.todo_by_id_mut(id)) {
                start_account(&mut todo.account, now, &format!("todo {}", todo.title));
            }
        }
        self.needs_save = true;
    }

    /// Select the ticket and todo remembered from the last session
    pub fn restore_selection(&mut self) {
        let hint = self.hint;
        let Some(ticket_id) = hint
            .ticket
            .and_then(|i| self.registry.tickets().get(i))
            .map(|t| t.id.clone())
        else {
            return;
        };
        self.select_ticket(Some(&ticket_id));
        if hint.todo.is_some() {
            self.select_todo(hint.todo);
        }
    }

    pub fn selection_hint(&self) -> SelectionHint {
        self.hint
    }

    pub fn selected_ticket(&self) -> Option<&Ticket> {
        self.selected_ticket
            .as_deref()
            .and_then(|id| self.registry.get(id))
    }

    pub fn selected_todo(&self) -> Option<&TodoItem> {
        let id = self.selected_todo?;
        self.selected_ticket()?.todo_by_id(id)
    }

    pub fn selected_todo_index(&self) -> Option<usize> {
        let id = self.selected_todo?;
        self.selected_ticket()?.todo_index(id)
    }

    // ---- pause / resume / tick ------------------------------------------

    /// Stop every running account, keeping the selection for `resume_all`
    pub fn pause_all(&mut self) {
        if self.paused {
            return;
        }
        let now = self.observe_clock();
        self.registry.stop_all(now);
        self.work_day.stop(now);
        self.paused = true;
        self.needs_save = true;
    }

    /// Restart the selected ticket and todo
    pub fn resume_all(&mut self) {
        if !self.paused {
            return;
        }
        let now = self.observe_clock();
        if let Some(finished) = self.roll_day(now) {
            self.pending_rollover = Some(finished);
        }
        self.paused = false;
        self.start_selection(now);
        self.needs_save = true;
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume_all();
        } else {
            self.pause_all();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn global_state(&self) -> GlobalState {
        if self.paused {
            GlobalState::Paused
        } else if self.work_day.is_running() {
            GlobalState::Running
        } else {
            GlobalState::Idle
        }
    }

    /// Periodic refresh. Displayed values are computed on demand, so the only
    /// work is day rollover; returns the finished date when one happened,
    /// including a rollover first seen by `resume_all`.
    pub fn tick(&mut self) -> Option<NaiveDate> {
        let now = self.observe_clock();
        if let Some(finished) = self.pending_rollover.take() {
            return Some(finished);
        }
        self.roll_day(now)
    }

    /// Read the clock for an operation that starts or stops timers
    fn observe_clock(&mut self) -> DateTime<Local> {
        let now = self.clock.now();
        if now < self.last_seen {
            self.rewind(now);
        }
        self.last_seen = now;
        now
    }

    /// The clock moved back: book running intervals up to the last observed
    /// time and let them continue from `now`.
    fn rewind(&mut self, now: DateTime<Local>) {
        let until = self.last_seen;
        log::warn!(
            "Clock moved back from {} to {}; running timers continue from the new time",
            until.format("%Y-%m-%d %H:%M:%S"),
            now.format("%Y-%m-%d %H:%M:%S")
        );
        for ticket in self.registry.tickets_mut() {
            ticket.account.rebase(until, now);
            for todo in &mut ticket.todos {
                todo.account.rebase(until, now);
            }
        }
        self.work_day.rebase(until, now);
        self.needs_save = true;
    }

    /// On a date change, book running intervals so later time accrues to the
    /// new date, and restart the work-day accumulator at zero.
    /// An earlier date leaves the current work day alone.
    fn roll_day(&mut self, now: DateTime<Local>) -> Option<NaiveDate> {
        if now.date_naive() <= self.work_day.date() {
            return None;
        }
        for ticket in self.registry.tickets_mut() {
            ticket.account.checkpoint(now);
            for todo in &mut ticket.todos {
                todo.account.checkpoint(now);
            }
        }
        let finished = self.work_day.roll(now)?;
        log::info!("Work day {} finished; new day {}", finished, self.work_day.date());
        self.needs_save = true;
        Some(finished)
    }

    pub fn work_day_elapsed(&self) -> Duration {
        self.work_day.elapsed_now(self.clock.now())
    }

    pub fn work_day_hms(&self) -> String {
        format_hms(self.work_day_elapsed())
    }

    pub fn work_day_date(&self) -> NaiveDate {
        self.work_day.date()
    }

    // ---- registry mutation ----------------------------------------------

    /// Add a ticket from a raw id or URL; returns the id it was stored under
    pub fn add_ticket(&mut self, raw: &str, comment: &str) -> Result<String, TrackerError> {
        let initial = self.scheme.initial();
        let id = self.registry.add_ticket(raw, comment, initial)?.id.clone();
        self.needs_save = true;
        Ok(id)
    }

    pub fn add_todo(&mut self, ticket_id: &str, title: &str) -> Option<Uuid> {
        let initial = self.scheme.initial();
        match self.registry.add_todo(ticket_id, title, initial) {
            Ok(id) => {
                self.needs_save = true;
                Some(id)
            }
            Err(err) => {
                log::debug!("add_todo: {}", err);
                None
            }
        }
    }

    /// Stop and remove a ticket. Returns the removed ticket with its final totals.
    pub fn remove_ticket(&mut self, id: &str) -> Option<Ticket> {
        let now = self.observe_clock();
        if self.selected_ticket.as_deref() == Some(id) {
            self.stop_selection(now);
            self.selected_ticket = None;
            self.selected_todo = None;
        }
        let removed = self.registry.remove_ticket(id, now);
        match &removed {
            Some(_) => self.needs_save = true,
            None => log::debug!("remove_ticket: unknown ticket {}", id),
        }
        removed
    }

    /// Stop and remove the todo at `index` of a ticket's full todo list
    pub fn remove_todo(&mut self, ticket_id: &str, index: usize) -> Option<TodoItem> {
        let now = self.observe_clock();
        let removed = self.registry.remove_todo(ticket_id, index, now);
        match &removed {
            Some(todo) => {
                if self.selected_todo == Some(todo.id) {
                    self.selected_todo = None;
                }
                self.needs_save = true;
            }
            None => log::debug!("remove_todo: no todo {} in ticket {}", index, ticket_id),
        }
        removed
    }

    pub fn rename_ticket(&mut self, id: &str, new_id: &str) -> Result<(), TrackerError> {
        self.registry.rename_ticket(id, new_id)?;
        if self.selected_ticket.as_deref() == Some(id) {
            self.selected_ticket = Some(new_id.trim().to_string());
        }
        self.needs_save = true;
        Ok(())
    }

    fn absorb(&mut self, what: &str, result: Result<(), TrackerError>) -> bool {
        match result {
            Ok(()) => {
                self.needs_save = true;
                true
            }
            Err(err) => {
                log::debug!("{}: {}", what, err);
                false
            }
        }
    }

    pub fn set_ticket_status(&mut self, id: &str, status: Status) -> bool {
        let result = self.registry.set_status(id, status);
        self.absorb("set_ticket_status", result)
    }

    pub fn set_ticket_comment(&mut self, id: &str, comment: &str) -> bool {
        let result = self.registry.set_comment(id, comment);
        self.absorb("set_ticket_comment", result)
    }

    pub fn set_ticket_order(&mut self, id: &str, order: Option<i64>) -> bool {
        let result = self.registry.set_order(id, order);
        self.absorb("set_ticket_order", result)
    }

    pub fn set_todo_status(&mut self, ticket_id: &str, index: usize, status: Status) -> bool {
        let result = self.registry.set_todo_status(ticket_id, index, status);
        self.absorb("set_todo_status", result)
    }

    pub fn set_todo_comment(&mut self, ticket_id: &str, index: usize, comment: &str) -> bool {
        let result = self.registry.set_todo_comment(ticket_id, index, comment);
        self.absorb("set_todo_comment", result)
    }

    /// Display-only filter; mutation never goes through it
    pub fn set_hide_done(&mut self, hide: bool) {
        self.hide_done = hide;
    }

    pub fn hide_done(&self) -> bool {
        self.hide_done
    }

    // ---- display queries -------------------------------------------------

    pub fn ticket_rows(&self) -> Vec<TicketRow> {
        ticket_rows(&self.registry, self.hide_done, self.clock.now())
    }

    /// Todo rows of the selected ticket
    pub fn todo_rows(&self) -> Vec<TodoRow> {
        self.selected_ticket()
            .map(|ticket| todo_rows(ticket, self.hide_done, self.clock.now()))
            .unwrap_or_default()
    }

    pub fn ticket_breakdown(&self) -> Vec<(NaiveDate, Duration)> {
        self.selected_ticket()
            .map(|ticket| ticket.account.daily_breakdown(self.clock.now()))
            .unwrap_or_default()
    }

    pub fn todo_breakdown(&self) -> Vec<(NaiveDate, Duration)> {
        self.selected_todo()
            .map(|todo| todo.account.daily_breakdown(self.clock.now()))
            .unwrap_or_default()
    }

    // ---- persistence -----------------------------------------------------

    /// Pure snapshot: running intervals are included as if stopped now
    pub fn snapshot(&self) -> StateDocument {
        let now = self.clock.now();
        let ticket_index = self
            .selected_ticket
            .as_deref()
            .and_then(|id| self.registry.position(id));
        StateDocument {
            day_elapsed_time: to_millis(self.work_day.elapsed_now(now)),
            current_date: Some(self.work_day.date()),
            selected_ticket_index: index_value(ticket_index),
            selected_todo_index: index_value(self.selected_todo_index()),
            tickets: self
                .registry
                .tickets()
                .iter()
                .map(|ticket| TicketDocument::capture(ticket, now))
                .collect(),
        }
    }

    /// Write a snapshot. On failure the state stays dirty so the next autosave retries.
    pub fn save(&mut self, store: &Store) -> Result<Option<PathBuf>, PersistenceError> {
        let doc = self.snapshot();
        let backup = store.save(&doc, self.clock.now().date_naive())?;
        self.needs_save = false;
        Ok(backup)
    }

    /// Stop everything and write the final state
    pub fn shutdown(&mut self, store: &Store) -> Result<(), TrackerError> {
        self.pause_all();
        self.save(store)?;
        Ok(())
    }
}
