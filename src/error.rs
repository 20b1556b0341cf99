// User-facing errors raised by the task store

use thiserror::Error;

/// Errors a caller is expected to surface to the user as a notice.
///
/// These travel inside `eyre::Report`; use `downcast_ref::<TaskError>()`
/// to tell them apart from storage failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TaskError {
    /// Task name was empty or whitespace-only
    #[error("Please enter a task name.")]
    Validation,

    /// Delete-all was requested with nothing stored
    #[error("No tasks to delete.")]
    EmptyCollection,
}
