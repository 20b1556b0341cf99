// Derived views: filter -> search -> sort, display rows and statistics

use crate::filter::{FilterMode, SortMode};
use crate::models::{DATE_FORMAT, Task};
use chrono::NaiveDate;
use feruca::{Collator, Locale, Tailoring};
use std::cmp::Ordering;
use std::fmt::Write;

/// Shown instead of rows when the derived view is empty
pub const EMPTY_VIEW_PLACEHOLDER: &str = "No Tasks Found";

/// Shown in the date column for tasks without a date
pub const NO_DATE_PLACEHOLDER: &str = "-";

/// Default display format, matching the en-US short date (`1/15/2024`)
pub const DEFAULT_DISPLAY_DATE_FORMAT: &str = "%-m/%-d/%Y";

/// One display-ready line of the task table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub id: String,
    pub name: String,
    /// Formatted date, or `-` when the task has none
    pub date: String,
    pub completed: bool,
    pub status_label: &'static str,
}

/// Counts over the whole collection, independent of filter and search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub percent_complete: u32,
}

/// Project the collection through filter, search and sort
///
/// Stored order is never touched; the returned references are in view order.
pub fn derive_view<'a>(tasks: &'a [Task], filter: FilterMode, search: &str, sort: SortMode) -> Vec<&'a Task> {
    let query = search.trim().to_lowercase();

    let mut view: Vec<&Task> = tasks
        .iter()
        .filter(|task| filter.matches(task))
        .filter(|task| query.is_empty() || task.name.to_lowercase().contains(&query))
        .collect();

    match sort {
        SortMode::None => {}
        SortMode::Name => {
            let mut collator = name_collator();
            view.sort_by(|a, b| collator.collate(&a.name, &b.name));
        }
        SortMode::Date => view.sort_by(|a, b| compare_dates(a.date, b.date)),
    }

    view
}

/// Unicode collation (CLDR root) with punctuation significant, as `localeCompare` does
fn name_collator() -> Collator {
    Collator::new(Tailoring::Cldr(Locale::Root), false, false)
}

/// Locale-aware name order: accents and case are secondary to the base letters,
/// lowercase sorts first on ties
pub fn compare_names(a: &str, b: &str) -> Ordering {
    name_collator().collate(a, b)
}

/// Chronological order with missing dates last
pub fn compare_dates(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn compute_stats(tasks: &[Task]) -> Stats {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.completed).count();

    // round(100 * completed / total), halves rounding up
    let percent_complete = if total == 0 {
        0
    } else {
        ((200 * completed + total) / (2 * total)) as u32
    };

    Stats {
        total,
        pending: total - completed,
        completed,
        percent_complete,
    }
}

/// Format a date for display; an unusable format falls back to ISO
pub fn format_date(date: Option<NaiveDate>, format: &str) -> String {
    let Some(date) = date else {
        return NO_DATE_PLACEHOLDER.to_string();
    };

    let mut out = String::new();
    if write!(out, "{}", date.format(format)).is_err() {
        return date.format(DATE_FORMAT).to_string();
    }
    out
}

/// Turn a derived view into display rows
pub fn render_rows(view: &[&Task], date_format: &str) -> Vec<TaskRow> {
    view.iter()
        .map(|task| TaskRow {
            id: task.id.clone(),
            name: task.name.clone(),
            date: format_date(task.date, date_format),
            completed: task.completed,
            status_label: task.status_label(),
        })
        .collect()
}
