pub mod command;
pub mod handler;

pub use handler::{handle_line, render_listing};
