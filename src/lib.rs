// tasklist - Single-list task manager over a durable key-value store

pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod storage;
pub mod store;
pub mod view;

// Re-export main types for convenience
pub use config::Config;
pub use error::TaskError;
pub use filter::{FilterMode, SortMode};
pub use models::Task;
pub use storage::{FileStorage, MemoryStorage, SqliteStorage, Storage};
pub use store::{Renderer, TaskStore};
pub use view::{Stats, TaskRow};
