pub mod account;
pub mod enums;
pub mod item;
pub mod registry;
pub mod views;

pub use account::{TimeAccount, WorkDay};
pub use enums::{GlobalState, Status, StatusScheme};
pub use item::{Ticket, TodoItem};
pub use registry::Registry;
pub use views::{
    format_hms, format_short, run_badge, ticket_rows, todo_rows, tree_connector, TicketRow,
    TodoRow,
};
