// View modes: completion filter and sort order

use crate::models::Task;

/// Which completion-status subset of tasks to display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterMode {
    #[default]
    All,
    Pending,
    Completed,
}

impl FilterMode {
    /// Parse a mode name; anything unrecognized means `All`
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "pending" => FilterMode::Pending,
            "completed" => FilterMode::Completed,
            _ => FilterMode::All,
        }
    }

    pub fn matches(self, task: &Task) -> bool {
        match self {
            FilterMode::All => true,
            FilterMode::Pending => !task.completed,
            FilterMode::Completed => task.completed,
        }
    }
}

impl std::fmt::Display for FilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterMode::All => write!(f, "all"),
            FilterMode::Pending => write!(f, "pending"),
            FilterMode::Completed => write!(f, "completed"),
        }
    }
}

/// Ordering applied to the derived view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortMode {
    #[default]
    None,
    Name,
    Date,
}

impl SortMode {
    /// Parse a mode name; anything unrecognized means `None`
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "name" => SortMode::Name,
            "date" => SortMode::Date,
            _ => SortMode::None,
        }
    }

    /// Whether selecting this mode rewrites the task slot
    pub fn persists(self) -> bool {
        matches!(self, SortMode::Name | SortMode::Date)
    }
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortMode::None => write!(f, "none"),
            SortMode::Name => write!(f, "name"),
            SortMode::Date => write!(f, "date"),
        }
    }
}
