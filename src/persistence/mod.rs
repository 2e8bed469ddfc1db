pub mod document;
pub mod files;
pub mod store;

pub use document::{StateDocument, TicketDocument};
pub use files::{
    atomic_write, ensure_dir, init_local_dir, report_file, resolve_data_dir,
};
pub use store::Store;
