// Data models for the task list

use chrono::NaiveDate;
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Date layout used both in storage and on input
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single to-do item
///
/// Serialized as `{"id", "name", "date", "completed"}` with `date` written
/// as an empty string when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Task {
    pub id: String,
    pub name: String,
    #[serde(with = "date_field")]
    pub date: Option<NaiveDate>,
    pub completed: bool,
}

impl Task {
    /// Build a pending task. `name` must already be trimmed and non-empty.
    pub(crate) fn new(id: String, name: String, date: Option<NaiveDate>) -> Self {
        Self {
            id,
            name,
            date,
            completed: false,
        }
    }

    /// Label shown in the status column
    pub fn status_label(&self) -> &'static str {
        if self.completed { "Completed" } else { "Pending" }
    }
}

/// Generate a fresh task identifier
///
/// UUID v7: millisecond timestamp followed by random bits, so ids never
/// need coordination with anything else.
pub fn new_task_id() -> String {
    Uuid::now_v7().to_string()
}

/// Parse a user-supplied date; blank input means "no date"
pub fn parse_date_input(raw: &str) -> Result<Option<NaiveDate>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map(Some)
        .with_context(|| format!("Invalid date '{}' (expected YYYY-MM-DD)", raw))
}

/// Encode the collection for the storage slot
pub fn encode_tasks(tasks: &[Task]) -> Result<String> {
    serde_json::to_string(tasks).context("Failed to serialize tasks")
}

/// Decode a storage slot, rejecting anything that breaks the collection invariants
pub fn decode_tasks(text: &str) -> Result<Vec<Task>> {
    let tasks: Vec<Task> = serde_json::from_str(text).context("Stored tasks are not a valid task array")?;

    let mut seen = HashSet::with_capacity(tasks.len());
    for task in &tasks {
        if task.id.trim().is_empty() {
            return Err(eyre!("Stored task has an empty id"));
        }
        if task.name.trim().is_empty() {
            return Err(eyre!("Stored task {} has an empty name", task.id));
        }
        if !seen.insert(task.id.as_str()) {
            return Err(eyre!("Duplicate task id in storage: {}", task.id));
        }
    }

    Ok(tasks)
}

mod date_field {
    use super::DATE_FORMAT;
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => serializer.serialize_str(&d.format(DATE_FORMAT).to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(&raw, DATE_FORMAT)
            .map(Some)
            .map_err(D::Error::custom)
    }
}
