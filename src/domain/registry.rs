use super::enums::Status;
use super::item::{parse_ticket_ref, Ticket, TodoItem};
use crate::error::TrackerError;
use chrono::{DateTime, Local};
use uuid::Uuid;

/// Ordered collection of tickets with unique ids
#[derive(Debug, Clone, Default)]
pub struct Registry {
    tickets: Vec<Ticket>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tickets(tickets: Vec<Ticket>) -> Self {
        Self { tickets }
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    pub fn tickets_mut(&mut self) -> impl Iterator<Item = &mut Ticket> {
        self.tickets.iter_mut()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.tickets.iter().position(|ticket| ticket.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Ticket> {
        self.tickets.iter().find(|ticket| ticket.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Ticket> {
        self.tickets.iter_mut().find(|ticket| ticket.id == id)
    }

    fn require_mut(&mut self, id: &str) -> Result<&mut Ticket, TrackerError> {
        self.get_mut(id)
            .ok_or_else(|| TrackerError::NotFound(format!("ticket {}", id)))
    }

    /// Append a ticket parsed from a raw id or URL
    pub fn add_ticket(
        &mut self,
        raw: &str,
        comment: &str,
        status: Status,
    ) -> Result<&mut Ticket, TrackerError> {
        let (id, link) = parse_ticket_ref(raw)?;
        if self.contains(&id) {
            return Err(TrackerError::DuplicateId(id));
        }
        self.tickets
            .push(Ticket::new(id, link, comment.trim().to_string(), status));
        let last = self.tickets.len() - 1;
        Ok(&mut self.tickets[last])
    }

    /// Stop every timer of the ticket, then remove it. Unknown ids are ignored.
    pub fn remove_ticket(&mut self, id: &str, now: DateTime<Local>) -> Option<Ticket> {
        let index = self.position(id)?;
        self.tickets[index].stop_all(now);
        Some(self.tickets.remove(index))
    }

    /// Change a ticket id, keeping ids unique
    pub fn rename_ticket(&mut self, id: &str, new_id: &str) -> Result<(), TrackerError> {
        let new_id = new_id.trim();
        if new_id.is_empty() {
            return Err(TrackerError::InvalidId(new_id.to_string()));
        }
        if new_id != id && self.contains(new_id) {
            return Err(TrackerError::DuplicateId(new_id.to_string()));
        }
        self.require_mut(id)?.id = new_id.to_string();
        Ok(())
    }

    pub fn add_todo(
        &mut self,
        ticket_id: &str,
        title: &str,
        status: Status,
    ) -> Result<Uuid, TrackerError> {
        let ticket = self.require_mut(ticket_id)?;
        let todo = TodoItem::new(title.trim().to_string(), status);
        let id = todo.id;
        ticket.todos.push(todo);
        Ok(id)
    }

    /// Stop the todo's timer, then remove it from its ticket
    pub fn remove_todo(
        &mut self,
        ticket_id: &str,
        index: usize,
        now: DateTime<Local>,
    ) -> Option<TodoItem> {
        let ticket = self.get_mut(ticket_id)?;
        if index >= ticket.todos.len() {
            return None;
        }
        ticket.todos[index].account.stop(now);
        Some(ticket.todos.remove(index))
    }

    pub fn set_status(&mut self, id: &str, status: Status) -> Result<(), TrackerError> {
        self.require_mut(id)?.status = status;
        Ok(())
    }

    pub fn set_comment(&mut self, id: &str, comment: &str) -> Result<(), TrackerError> {
        self.require_mut(id)?.comment = comment.to_string();
        Ok(())
    }

    pub fn set_order(&mut self, id: &str, order: Option<i64>) -> Result<(), TrackerError> {
        self.require_mut(id)?.order = order;
        Ok(())
    }

    fn todo_mut(&mut self, ticket_id: &str, index: usize) -> Result<&mut TodoItem, TrackerError> {
        self.require_mut(ticket_id)?
            .todos
            .get_mut(index)
            .ok_or_else(|| TrackerError::NotFound(format!("todo {} of {}", index, ticket_id)))
    }

    pub fn set_todo_status(
        &mut self,
        ticket_id: &str,
        index: usize,
        status: Status,
    ) -> Result<(), TrackerError> {
        self.todo_mut(ticket_id, index)?.status = status;
        Ok(())
    }

    pub fn set_todo_comment(
        &mut self,
        ticket_id: &str,
        index: usize,
        comment: &str,
    ) -> Result<(), TrackerError> {
        self.todo_mut(ticket_id, index)?.comment = comment.to_string();
        Ok(())
    }

    /// Stop every running timer in the registry
    pub fn stop_all(&mut self, now: DateTime<Local>) {
        for ticket in &mut self.tickets {
            ticket.stop_all(now);
        }
    }

    /// Tickets in display order with their backing index, optionally hiding done ones.
    ///
    /// Tickets with a manual order come first, ascending; the rest keep insertion order.
    pub fn visible_tickets(
        &self,
        exclude_done: bool,
    ) -> impl Iterator<Item = (usize, &Ticket)> + Clone + '_ {
        let mut indices: Vec<usize> = (0..self.tickets.len()).collect();
        indices.sort_by_key(|&i| match self.tickets[i].order {
            Some(order) => (0, order),
            None => (1, 0),
        });
        indices
            .into_iter()
            .map(move |i| (i, &self.tickets[i]))
            .filter(move |(_, ticket)| !(exclude_done && ticket.status.is_done()))
    }
}
