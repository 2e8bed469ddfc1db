use crate::domain::{Status, Ticket};
use chrono::{DateTime, Duration, Local, NaiveDate};
use std::collections::BTreeMap;

/// Time spent on one todo during the report date
#[derive(Debug, Clone, PartialEq)]
pub struct TodoDay {
    pub title: String,
    pub status: Status,
    pub elapsed: Duration,
}

/// Time spent on one ticket during the report date
#[derive(Debug, Clone, PartialEq)]
pub struct TicketDay {
    pub id: String,
    pub status: Status,
    pub comment: String,
    pub elapsed: Duration,
    pub todos: Vec<TodoDay>,
}

/// Statistics for one calendar day
#[derive(Debug, Clone, PartialEq)]
pub struct DayStats {
    pub date: NaiveDate,
    /// Sum of ticket entries for the date
    pub total: Duration,
    /// Tickets with time on the date, in registry order
    pub tickets: Vec<TicketDay>,
}

impl DayStats {
    /// Ticket with the most time on the date
    pub fn busiest(&self) -> Option<&TicketDay> {
        self.tickets.iter().max_by_key(|t| t.elapsed)
    }

    pub fn done_count(&self) -> usize {
        self.tickets.iter().filter(|t| t.status.is_done()).count()
    }
}

/// Collect every ticket and todo with time on `date`.
/// Running accounts contribute their in-flight interval.
pub fn calculate_day_stats(tickets: &[Ticket], date: NaiveDate, now: DateTime<Local>) -> DayStats {
    let mut total = Duration::zero();
    let mut days = Vec::new();

    for ticket in tickets {
        let elapsed = ticket.account.elapsed_on_now(date, now);
        let todos: Vec<TodoDay> = ticket
            .todos
            .iter()
            .filter_map(|todo| {
                let elapsed = todo.account.elapsed_on_now(date, now);
                (elapsed > Duration::zero()).then(|| TodoDay {
                    title: todo.title.clone(),
                    status: todo.status,
                    elapsed,
                })
            })
            .collect();

        if elapsed == Duration::zero() && todos.is_empty() {
            continue;
        }

        total = total + elapsed;
        days.push(TicketDay {
            id: ticket.id.clone(),
            status: ticket.status,
            comment: ticket.comment.clone(),
            elapsed,
            todos,
        });
    }

    DayStats {
        date,
        total,
        tickets: days,
    }
}

/// Total booked time per date across all tickets, ascending
pub fn calculate_daily_totals(tickets: &[Ticket], now: DateTime<Local>) -> BTreeMap<NaiveDate, Duration> {
    let mut totals: BTreeMap<NaiveDate, Duration> = BTreeMap::new();
    for ticket in tickets {
        for (date, elapsed) in ticket.account.daily_breakdown(now) {
            let entry = totals.entry(date).or_insert_with(Duration::zero);
            *entry = *entry + elapsed;
        }
    }
    totals
}
