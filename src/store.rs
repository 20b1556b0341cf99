// Task store: the authoritative collection plus view state

use crate::error::TaskError;
use crate::filter::{FilterMode, SortMode};
use crate::models::{self, Task};
use crate::storage::Storage;
use crate::view::{self, DEFAULT_DISPLAY_DATE_FORMAT, Stats, TaskRow};
use chrono::NaiveDate;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

/// Default storage slot for the task collection
pub const DEFAULT_KEY: &str = "tasks";

/// Receives a fresh rendering whenever the store or its view state changes
pub trait Renderer {
    fn render(&mut self, rows: &[TaskRow], stats: &Stats);
}

impl<F> Renderer for F
where
    F: FnMut(&[TaskRow], &Stats),
{
    fn render(&mut self, rows: &[TaskRow], stats: &Stats) {
        self(rows, stats)
    }
}

/// Owns the task collection and persists it on every mutation
pub struct TaskStore {
    storage: Box<dyn Storage>,
    key: String,
    tasks: Vec<Task>,
    filter: FilterMode,
    sort: SortMode,
    search: String,
    date_format: String,
    renderers: Vec<Box<dyn Renderer>>,
}

impl TaskStore {
    /// Open a store over `storage` using the default slot
    pub fn open<S: Storage + 'static>(storage: S) -> Result<Self> {
        Self::open_with_key(storage, DEFAULT_KEY)
    }

    /// Open a store over `storage`, reading the collection from `key`
    ///
    /// A slot that is missing or fails to decode yields an empty collection.
    /// Only a failing backend read is an error.
    pub fn open_with_key<S: Storage + 'static>(storage: S, key: &str) -> Result<Self> {
        let text = storage.load(key).context("Failed to load tasks from storage")?;

        let tasks = match text {
            None => {
                info!(key, "No stored tasks, starting empty");
                Vec::new()
            }
            Some(text) => match models::decode_tasks(&text) {
                Ok(tasks) => {
                    info!(key, count = tasks.len(), "Loaded tasks from storage");
                    tasks
                }
                Err(e) => {
                    warn!(key, error = ?e, "Discarding unreadable stored tasks, starting empty");
                    Vec::new()
                }
            },
        };

        Ok(Self {
            storage: Box::new(storage),
            key: key.to_string(),
            tasks,
            filter: FilterMode::default(),
            sort: SortMode::default(),
            search: String::new(),
            date_format: DEFAULT_DISPLAY_DATE_FORMAT.to_string(),
            renderers: Vec::new(),
        })
    }

    /// Set the chrono format used for the date column of rendered rows
    pub fn set_date_format(&mut self, format: &str) {
        self.date_format = format.to_string();
    }

    /// Register a renderer; it is called immediately and after every change
    pub fn subscribe<R: Renderer + 'static>(&mut self, renderer: R) {
        self.renderers.push(Box::new(renderer));
        self.notify();
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// All tasks in insertion order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn filter(&self) -> FilterMode {
        self.filter
    }

    pub fn sort(&self) -> SortMode {
        self.sort
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// Resolve a full id, or a fragment that is a prefix or suffix of exactly one id
    pub fn resolve_id(&self, fragment: &str) -> Option<&str> {
        if let Some(task) = self.get(fragment) {
            return Some(&task.id);
        }
        if fragment.is_empty() {
            return None;
        }

        let mut matches = self
            .tasks
            .iter()
            .filter(|t| t.id.starts_with(fragment) || t.id.ends_with(fragment));
        match (matches.next(), matches.next()) {
            (Some(task), None) => Some(&task.id),
            _ => None,
        }
    }

    /// Filtered, searched and sorted view of the collection
    pub fn derive_view(&self) -> Vec<&Task> {
        view::derive_view(&self.tasks, self.filter, &self.search, self.sort)
    }

    /// Display rows for the current view
    pub fn render_rows(&self) -> Vec<TaskRow> {
        view::render_rows(&self.derive_view(), &self.date_format)
    }

    /// Counts over the full collection
    pub fn compute_stats(&self) -> Stats {
        view::compute_stats(&self.tasks)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Add a task, returning its id
    pub fn create(&mut self, name: &str, date: Option<NaiveDate>) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TaskError::Validation.into());
        }

        let mut id = models::new_task_id();
        while self.get(&id).is_some() {
            id = models::new_task_id();
        }

        let mut next = self.tasks.clone();
        next.push(Task::new(id.clone(), name.to_string(), date));
        self.commit(next)?;

        debug!(id = %id, name, "create: added task");
        self.notify();
        Ok(id)
    }

    /// Rename a task; returns false when the id is unknown or the name is blank
    pub fn rename(&mut self, id: &str, new_name: &str) -> Result<bool> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };

        let new_name = new_name.trim();
        if new_name.is_empty() {
            debug!(id, "rename: blank name, keeping existing name");
            return Ok(false);
        }

        let mut next = self.tasks.clone();
        next[index].name = new_name.to_string();
        self.commit(next)?;

        debug!(id, name = new_name, "rename: renamed task");
        self.notify();
        Ok(true)
    }

    /// Flip the completed flag; returns false when the id is unknown
    pub fn toggle_complete(&mut self, id: &str) -> Result<bool> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };

        let mut next = self.tasks.clone();
        next[index].completed = !next[index].completed;
        let completed = next[index].completed;
        self.commit(next)?;

        debug!(id, completed, "toggle_complete: toggled task");
        self.notify();
        Ok(true)
    }

    /// Remove a task; returns false when the id is unknown
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };

        let mut next = self.tasks.clone();
        next.remove(index);
        self.commit(next)?;

        debug!(id, "delete: removed task");
        self.notify();
        Ok(true)
    }

    /// Remove every task, returning how many were removed
    pub fn delete_all(&mut self) -> Result<usize> {
        if self.tasks.is_empty() {
            return Err(TaskError::EmptyCollection.into());
        }

        let count = self.tasks.len();
        self.commit(Vec::new())?;

        debug!(count, "delete_all: cleared tasks");
        self.notify();
        Ok(count)
    }

    // ========================================================================
    // View state
    // ========================================================================

    /// Select the completion filter; session-only
    pub fn set_filter(&mut self, mode: &str) {
        self.filter = FilterMode::parse(mode);
        self.notify();
    }

    /// Set the free-text search query; session-only
    pub fn set_search(&mut self, query: &str) {
        self.search = query.to_string();
        self.notify();
    }

    /// Select the sort order
    ///
    /// `name` and `date` rewrite the task slot; `none` writes nothing. The
    /// mode itself is not stored and resets to `none` on reopen.
    pub fn set_sort(&mut self, mode: &str) -> Result<()> {
        let sort = SortMode::parse(mode);
        if sort.persists() {
            write_slot(self.storage.as_mut(), &self.key, &self.tasks)?;
        }
        self.sort = sort;
        self.notify();
        Ok(())
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    fn position(&self, id: &str) -> Option<usize> {
        let index = self.tasks.iter().position(|t| t.id == id);
        if index.is_none() {
            debug!(id, "Task not found, ignoring");
        }
        index
    }

    /// Persist `next`, then make it the live collection
    fn commit(&mut self, next: Vec<Task>) -> Result<()> {
        write_slot(self.storage.as_mut(), &self.key, &next)?;
        self.tasks = next;
        Ok(())
    }

    fn notify(&mut self) {
        if self.renderers.is_empty() {
            return;
        }
        let rows = self.render_rows();
        let stats = self.compute_stats();
        for renderer in &mut self.renderers {
            renderer.render(&rows, &stats);
        }
    }
}

fn write_slot(storage: &mut dyn Storage, key: &str, tasks: &[Task]) -> Result<()> {
    let text = models::encode_tasks(tasks)?;
    storage.save(key, &text).context("Failed to save tasks to storage")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use eyre::eyre;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;

    /// Storage handle the test keeps a second reference to
    #[derive(Clone, Default)]
    struct SharedStorage {
        inner: Rc<RefCell<MemoryStorage>>,
        saves: Rc<RefCell<usize>>,
        fail_saves: Rc<RefCell<bool>>,
    }

    impl SharedStorage {
        fn slot(&self) -> Option<String> {
            self.inner.borrow().load(DEFAULT_KEY).unwrap()
        }

        fn save_count(&self) -> usize {
            *self.saves.borrow()
        }
    }

    impl Storage for SharedStorage {
        fn load(&self, key: &str) -> Result<Option<String>> {
            self.inner.borrow().load(key)
        }

        fn save(&mut self, key: &str, text: &str) -> Result<()> {
            if *self.fail_saves.borrow() {
                return Err(eyre!("disk full"));
            }
            *self.saves.borrow_mut() += 1;
            self.inner.borrow_mut().save(key, text)
        }
    }

    struct FailingLoad;

    impl Storage for FailingLoad {
        fn load(&self, _key: &str) -> Result<Option<String>> {
            Err(eyre!("permission denied"))
        }

        fn save(&mut self, _key: &str, _text: &str) -> Result<()> {
            Ok(())
        }
    }

    fn empty_store() -> TaskStore {
        TaskStore::open(MemoryStorage::new()).unwrap()
    }

    fn task_error(report: &eyre::Report) -> Option<TaskError> {
        report.downcast_ref::<TaskError>().copied()
    }

    #[test]
    fn test_create_task() {
        let mut store = empty_store();
        let id = store.create("Buy milk", None).unwrap();

        assert_eq!(store.len(), 1);
        let task = store.get(&id).unwrap();
        assert_eq!(task.name, "Buy milk");
        assert_eq!(task.date, None);
        assert!(!task.completed);
    }

    #[test]
    fn test_create_trims_name_and_keeps_date() {
        let mut store = empty_store();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1);
        let id = store.create("  Pay rent  ", date).unwrap();
        let task = store.get(&id).unwrap();
        assert_eq!(task.name, "Pay rent");
        assert_eq!(task.date, date);
    }

    #[test]
    fn test_create_empty_name_fails() {
        let storage = SharedStorage::default();
        let mut store = TaskStore::open(storage.clone()).unwrap();

        let err = store.create("", NaiveDate::from_ymd_opt(2024, 1, 1)).unwrap_err();
        assert_eq!(task_error(&err), Some(TaskError::Validation));
        let err = store.create("   \t", None).unwrap_err();
        assert_eq!(task_error(&err), Some(TaskError::Validation));

        assert!(store.is_empty());
        assert_eq!(storage.save_count(), 0);
    }

    #[test]
    fn test_ids_are_distinct() {
        let mut store = empty_store();
        for i in 0..200 {
            store.create(&format!("Task {}", i), None).unwrap();
        }
        let ids: HashSet<&str> = store.tasks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn test_pending_filter_scenario() {
        let mut store = empty_store();
        let a = store.create("A", None).unwrap();
        store.create("B", None).unwrap();
        assert!(store.toggle_complete(&a).unwrap());

        store.set_filter("pending");
        let view = store.derive_view();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].name, "B");

        store.set_filter("completed");
        let view = store.derive_view();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].name, "A");
    }

    #[test]
    fn test_unknown_filter_normalizes_to_all() {
        let mut store = empty_store();
        store.create("A", None).unwrap();
        store.set_filter("pending");
        store.set_filter("whatever");
        assert_eq!(store.filter(), FilterMode::All);
        assert_eq!(store.derive_view().len(), 1);
    }

    #[test]
    fn test_toggle_twice_restores() {
        let mut store = empty_store();
        let id = store.create("A", None).unwrap();
        store.toggle_complete(&id).unwrap();
        assert!(store.get(&id).unwrap().completed);
        store.toggle_complete(&id).unwrap();
        assert!(!store.get(&id).unwrap().completed);
    }

    #[test]
    fn test_rename() {
        let mut store = empty_store();
        let id = store.create("Old", None).unwrap();
        assert!(store.rename(&id, "  New name ").unwrap());
        assert_eq!(store.get(&id).unwrap().name, "New name");
    }

    #[test]
    fn test_rename_blank_is_rejected() {
        let storage = SharedStorage::default();
        let mut store = TaskStore::open(storage.clone()).unwrap();
        let id = store.create("Keep me", None).unwrap();
        let saves = storage.save_count();

        assert!(!store.rename(&id, "   ").unwrap());
        assert_eq!(store.get(&id).unwrap().name, "Keep me");
        assert_eq!(storage.save_count(), saves);
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let storage = SharedStorage::default();
        let mut store = TaskStore::open(storage.clone()).unwrap();
        store.create("A", None).unwrap();
        let saves = storage.save_count();

        assert!(!store.rename("missing", "B").unwrap());
        assert!(!store.toggle_complete("missing").unwrap());
        assert!(!store.delete("missing").unwrap());
        assert_eq!(store.len(), 1);
        assert_eq!(storage.save_count(), saves);
    }

    #[test]
    fn test_delete() {
        let mut store = empty_store();
        let a = store.create("A", None).unwrap();
        let b = store.create("B", None).unwrap();
        assert!(store.delete(&a).unwrap());
        assert_eq!(store.len(), 1);
        assert!(store.get(&a).is_none());
        assert!(store.get(&b).is_some());
    }

    #[test]
    fn test_delete_all() {
        let storage = SharedStorage::default();
        let mut store = TaskStore::open(storage.clone()).unwrap();
        store.create("A", None).unwrap();
        store.create("B", None).unwrap();

        assert_eq!(store.delete_all().unwrap(), 2);
        assert!(store.is_empty());
        assert_eq!(storage.slot().as_deref(), Some("[]"));
    }

    #[test]
    fn test_delete_all_on_empty_fails() {
        let storage = SharedStorage::default();
        let mut store = TaskStore::open(storage.clone()).unwrap();

        let err = store.delete_all().unwrap_err();
        assert_eq!(task_error(&err), Some(TaskError::EmptyCollection));
        assert!(store.is_empty());
        assert_eq!(storage.save_count(), 0);
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let storage = SharedStorage::default();
        let mut store = TaskStore::open(storage.clone()).unwrap();

        let id = store.create("A", None).unwrap();
        let stored = models::decode_tasks(&storage.slot().unwrap()).unwrap();
        assert_eq!(stored, store.tasks());

        store.toggle_complete(&id).unwrap();
        let stored = models::decode_tasks(&storage.slot().unwrap()).unwrap();
        assert!(stored[0].completed);

        store.rename(&id, "A2").unwrap();
        let stored = models::decode_tasks(&storage.slot().unwrap()).unwrap();
        assert_eq!(stored[0].name, "A2");

        store.delete(&id).unwrap();
        assert_eq!(storage.slot().as_deref(), Some("[]"));
    }

    #[test]
    fn test_failed_save_leaves_collection_unchanged() {
        let storage = SharedStorage::default();
        let mut store = TaskStore::open(storage.clone()).unwrap();
        let id = store.create("A", None).unwrap();

        *storage.fail_saves.borrow_mut() = true;
        assert!(store.create("B", None).is_err());
        assert!(store.toggle_complete(&id).is_err());
        assert!(store.delete_all().is_err());

        assert_eq!(store.len(), 1);
        assert!(!store.get(&id).unwrap().completed);
        assert_eq!(models::decode_tasks(&storage.slot().unwrap()).unwrap(), store.tasks());
    }

    #[test]
    fn test_reopen_restores_collection() {
        let storage = SharedStorage::default();
        let mut store = TaskStore::open(storage.clone()).unwrap();
        let a = store.create("A", NaiveDate::from_ymd_opt(2024, 6, 1)).unwrap();
        store.create("B", None).unwrap();
        store.toggle_complete(&a).unwrap();
        let before = store.tasks().to_vec();
        drop(store);

        let reopened = TaskStore::open(storage).unwrap();
        assert_eq!(reopened.tasks(), before.as_slice());
    }

    #[test]
    fn test_corrupt_slot_starts_empty() {
        let storage = MemoryStorage::new().with_slot(DEFAULT_KEY, "{not json");
        let store = TaskStore::open(storage).unwrap();
        assert!(store.is_empty());

        let storage = MemoryStorage::new().with_slot(DEFAULT_KEY, r#"[{"id":1,"name":"x"}]"#);
        let store = TaskStore::open(storage).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_failing_backend_read_is_an_error() {
        assert!(TaskStore::open(FailingLoad).is_err());
    }

    #[test]
    fn test_custom_key() {
        let storage = MemoryStorage::new()
            .with_slot("work", r#"[{"id":"w1","name":"Ship it","date":"","completed":false}]"#);
        let store = TaskStore::open_with_key(storage, "work").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("w1").unwrap().name, "Ship it");
    }

    #[test]
    fn test_set_sort_persistence_asymmetry() {
        let storage = SharedStorage::default();
        let mut store = TaskStore::open(storage.clone()).unwrap();
        store.create("A", None).unwrap();
        let saves = storage.save_count();

        store.set_filter("completed");
        store.set_search("a");
        store.set_sort("none").unwrap();
        assert_eq!(storage.save_count(), saves);

        store.set_sort("name").unwrap();
        assert_eq!(storage.save_count(), saves + 1);
        store.set_sort("date").unwrap();
        assert_eq!(storage.save_count(), saves + 2);

        // Sort does not change stored order
        assert_eq!(models::decode_tasks(&storage.slot().unwrap()).unwrap(), store.tasks());

        let reopened = TaskStore::open(storage).unwrap();
        assert_eq!(reopened.sort(), SortMode::None);
        assert_eq!(reopened.filter(), FilterMode::All);
        assert_eq!(reopened.search(), "");
    }

    #[test]
    fn test_set_sort_failed_write_keeps_previous_mode() {
        let storage = SharedStorage::default();
        let mut store = TaskStore::open(storage.clone()).unwrap();
        store.create("A", None).unwrap();
        store.set_sort("date").unwrap();

        *storage.fail_saves.borrow_mut() = true;
        assert!(store.set_sort("name").is_err());
        assert_eq!(store.sort(), SortMode::Date);

        // `none` never writes, so it still applies
        store.set_sort("none").unwrap();
        assert_eq!(store.sort(), SortMode::None);
    }

    #[test]
    fn test_derive_view_is_idempotent() {
        let mut store = empty_store();
        store.create("banana", None).unwrap();
        store.create("Apple", NaiveDate::from_ymd_opt(2024, 2, 1)).unwrap();
        store.create("cherry", NaiveDate::from_ymd_opt(2024, 1, 1)).unwrap();
        store.set_sort("name").unwrap();
        store.set_search("a");

        let first: Vec<String> = store.derive_view().iter().map(|t| t.id.clone()).collect();
        let second: Vec<String> = store.derive_view().iter().map(|t| t.id.clone()).collect();
        assert_eq!(first, second);
        assert_eq!(store.tasks()[0].name, "banana");
    }

    #[test]
    fn test_sort_by_date_dateless_last() {
        let mut store = empty_store();
        store.create("No date", None).unwrap();
        store.create("Later", NaiveDate::from_ymd_opt(2024, 5, 1)).unwrap();
        store.create("Sooner", NaiveDate::from_ymd_opt(2024, 4, 1)).unwrap();
        store.set_sort("date").unwrap();

        let names: Vec<&str> = store.derive_view().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Sooner", "Later", "No date"]);
    }

    #[test]
    fn test_stats_ignore_filter_and_search() {
        let mut store = empty_store();
        let ids: Vec<String> = ["a", "b", "c", "d"]
            .iter()
            .map(|n| store.create(n, None).unwrap())
            .collect();
        store.toggle_complete(&ids[0]).unwrap();
        store.set_filter("completed");
        store.set_search("zzz");

        let stats = store.compute_stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.pending, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.percent_complete, 25);
    }

    #[test]
    fn test_resolve_id() {
        let storage = MemoryStorage::new().with_slot(
            DEFAULT_KEY,
            r#"[{"id":"abc1","name":"x","date":"","completed":false},{"id":"abc2","name":"y","date":"","completed":false},{"id":"xyz","name":"z","date":"","completed":false}]"#,
        );
        let store = TaskStore::open(storage).unwrap();

        assert_eq!(store.resolve_id("abc1"), Some("abc1"));
        assert_eq!(store.resolve_id("x"), Some("xyz"));
        assert_eq!(store.resolve_id("c2"), Some("abc2"));
        assert_eq!(store.resolve_id("abc"), None);
        assert_eq!(store.resolve_id("nope"), None);
        assert_eq!(store.resolve_id(""), None);
    }

    #[test]
    fn test_renderer_notified_on_changes() {
        let seen: Rc<RefCell<Vec<(usize, Stats)>>> = Rc::default();
        let sink = Rc::clone(&seen);

        let mut store = empty_store();
        store.subscribe(move |rows: &[TaskRow], stats: &Stats| {
            sink.borrow_mut().push((rows.len(), *stats));
        });
        let id = store.create("A", None).unwrap();
        store.toggle_complete(&id).unwrap();
        store.set_filter("pending");

        let seen = seen.borrow();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0].0, 0);
        assert_eq!(seen[1].0, 1);
        assert_eq!(seen[2].1.completed, 1);
        assert_eq!(seen[3].0, 0);
    }

    #[test]
    fn test_rendered_rows_use_date_format() {
        let mut store = empty_store();
        store.create("Dated", NaiveDate::from_ymd_opt(2024, 12, 25)).unwrap();
        store.create("Undated", None).unwrap();

        let rows = store.render_rows();
        assert_eq!(rows[0].date, "12/25/2024");
        assert_eq!(rows[1].date, "-");
        assert_eq!(rows[1].status_label, "Pending");

        store.set_date_format("%Y/%m/%d");
        assert_eq!(store.render_rows()[0].date, "2024/12/25");
    }
}
