use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::category::{Category, default_categories};
use crate::preferences::{
    CURRENT_SORT_KEY, CURRENT_VIEW_KEY, DARK_MODE_KEY, Preferences, VIEW_MODE_KEY, ViewMode,
};
use crate::storage::{FileStore, KeyValueStore, MemoryStore};
use crate::task::{Priority, Task, TaskDraft};
use crate::view::{SortKey, ViewSelector};

pub const TASKS_KEY: &str = "tasks";
pub const CATEGORIES_KEY: &str = "categories";

pub const WELCOME_TASK_NAME: &str = "Welcome to Task Manager";
const WELCOME_TASK_DESCRIPTION: &str = "This is a sample task to help you get started. \
     List your tasks, open one to see its details, or create a new one with `add`.";

/// Single entry point for everything that touches the key-value store.
#[derive(Debug, Clone)]
pub struct Gateway {
    kv: Arc<dyn KeyValueStore>,
}

impl Gateway {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn open_dir(data_dir: &Path) -> anyhow::Result<Self> {
        let store = FileStore::open(data_dir)?;
        Ok(Self::new(Arc::new(store)))
    }

    pub fn kv(&self) -> &dyn KeyValueStore {
        self.kv.as_ref()
    }

    /// Falls back to the seeded welcome task when nothing usable is stored.
    #[tracing::instrument(skip(self, now))]
    pub fn load_tasks(&self, now: DateTime<Utc>, today: NaiveDate) -> anyhow::Result<Vec<Task>> {
        if let Some(tasks) = self.read_collection::<Task>(TASKS_KEY) {
            debug!(count = tasks.len(), "loaded tasks");
            return Ok(tasks);
        }

        let tasks = vec![welcome_task(now, today)];
        info!("seeding welcome task");
        self.save_tasks(&tasks)?;
        Ok(tasks)
    }

    /// Falls back to the four default categories when nothing usable is stored.
    #[tracing::instrument(skip(self))]
    pub fn load_categories(&self) -> anyhow::Result<Vec<Category>> {
        if let Some(categories) = self.read_collection::<Category>(CATEGORIES_KEY) {
            debug!(count = categories.len(), "loaded categories");
            return Ok(categories);
        }

        let categories = default_categories();
        info!(count = categories.len(), "seeding default categories");
        self.save_categories(&categories)?;
        Ok(categories)
    }

    #[tracing::instrument(skip(self, tasks), fields(count = tasks.len()))]
    pub fn save_tasks(&self, tasks: &[Task]) -> anyhow::Result<()> {
        self.write_collection(TASKS_KEY, tasks)
            .context("failed to save tasks")
    }

    #[tracing::instrument(skip(self, categories), fields(count = categories.len()))]
    pub fn save_categories(&self, categories: &[Category]) -> anyhow::Result<()> {
        self.write_collection(CATEGORIES_KEY, categories)
            .context("failed to save categories")
    }

    #[tracing::instrument(skip(self))]
    pub fn load_preferences(&self) -> Preferences {
        let defaults = Preferences::default();
        Preferences {
            view_mode: self
                .read_scalar(VIEW_MODE_KEY)
                .map(|raw| ViewMode::parse(&raw))
                .unwrap_or(defaults.view_mode),
            current_sort: self
                .read_scalar(CURRENT_SORT_KEY)
                .map(|raw| SortKey::parse(&raw))
                .unwrap_or(defaults.current_sort),
            current_view: self
                .read_scalar(CURRENT_VIEW_KEY)
                .map(|raw| ViewSelector::parse(&raw))
                .unwrap_or(defaults.current_view),
            dark_mode: self
                .read_scalar(DARK_MODE_KEY)
                .map(|raw| raw.trim() == "true")
                .unwrap_or(defaults.dark_mode),
        }
    }

    #[tracing::instrument(skip(self, prefs))]
    pub fn save_preferences(&self, prefs: &Preferences) -> anyhow::Result<()> {
        self.kv.set(VIEW_MODE_KEY, prefs.view_mode.as_str())?;
        self.kv.set(CURRENT_SORT_KEY, prefs.current_sort.as_str())?;
        self.kv
            .set(CURRENT_VIEW_KEY, &prefs.current_view.to_string())?;
        self.kv
            .set(DARK_MODE_KEY, if prefs.dark_mode { "true" } else { "false" })?;
        Ok(())
    }

    fn read_collection<T: DeserializeOwned>(&self, key: &str) -> Option<Vec<T>> {
        let raw = match self.kv.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key, "no stored value");
                return None;
            }
            Err(err) => {
                warn!(key, error = %format!("{err:#}"), "failed reading stored value; using defaults");
                return None;
            }
        };

        match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(items) => Some(items),
            Err(err) => {
                warn!(key, error = %err, "stored value is malformed; using defaults");
                None
            }
        }
    }

    fn write_collection<T: Serialize>(&self, key: &str, items: &[T]) -> anyhow::Result<()> {
        let payload = serde_json::to_string(items)?;
        self.kv.set(key, &payload)
    }

    fn read_scalar(&self, key: &str) -> Option<String> {
        match self.kv.get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %format!("{err:#}"), "failed reading preference");
                None
            }
        }
    }
}

fn welcome_task(now: DateTime<Utc>, today: NaiveDate) -> Task {
    let mut draft = TaskDraft::new(WELCOME_TASK_NAME);
    draft.description = WELCOME_TASK_DESCRIPTION.to_string();
    draft.due_date = Some(today);
    draft.due_time = NaiveTime::from_hms_opt(12, 0, 0);
    draft.priority = Priority::Medium;
    Task::from_draft(draft, now)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::{CATEGORIES_KEY, Gateway, TASKS_KEY, WELCOME_TASK_NAME};
    use crate::category::{Category, CategoryDraft};
    use crate::preferences::{Preferences, ViewMode};
    use crate::view::{SortKey, ViewSelector};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
    }

    #[test]
    fn first_run_seeds_and_persists_defaults() {
        let gateway = Gateway::in_memory();
        let tasks = gateway.load_tasks(Utc::now(), today()).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name, WELCOME_TASK_NAME);
        assert_eq!(tasks[0].due_date, Some(today()));
        assert!(gateway.kv().get(TASKS_KEY).unwrap().is_some());

        let categories = gateway.load_categories().unwrap();
        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Work", "Personal", "Shopping", "Health"]);
        assert_eq!(categories[0].color, "#4f46e5");

        let again = gateway.load_categories().unwrap();
        assert_eq!(again, categories);
    }

    #[test]
    fn malformed_data_is_treated_as_absent() {
        let gateway = Gateway::in_memory();
        gateway.kv().set(TASKS_KEY, "{not json").unwrap();
        gateway.kv().set(CATEGORIES_KEY, "[{\"id\": 3}]").unwrap();

        let tasks = gateway.load_tasks(Utc::now(), today()).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name, WELCOME_TASK_NAME);
        assert_eq!(gateway.load_categories().unwrap().len(), 4);
    }

    #[test]
    fn stored_empty_collection_is_kept() {
        let gateway = Gateway::in_memory();
        gateway.save_tasks(&[]).unwrap();
        assert!(gateway.load_tasks(Utc::now(), today()).unwrap().is_empty());
    }

    #[test]
    fn saved_collections_replace_previous_state() {
        let gateway = Gateway::in_memory();
        let one = Category::from_draft(CategoryDraft::new("One", "#000000"));
        gateway.save_categories(&[one.clone()]).unwrap();
        assert_eq!(gateway.load_categories().unwrap(), vec![one]);
    }

    #[test]
    fn preferences_round_trip_and_default() {
        let gateway = Gateway::in_memory();
        assert_eq!(gateway.load_preferences(), Preferences::default());

        let prefs = Preferences {
            view_mode: ViewMode::List,
            current_sort: SortKey::NameAsc,
            current_view: ViewSelector::Category("abc".into()),
            dark_mode: true,
        };
        gateway.save_preferences(&prefs).unwrap();
        assert_eq!(gateway.load_preferences(), prefs);
    }

    #[test]
    fn legacy_category_view_preference_is_understood() {
        let gateway = Gateway::in_memory();
        gateway.kv().set("currentView", "category-m5x9").unwrap();
        assert_eq!(
            gateway.load_preferences().current_view,
            ViewSelector::Category("m5x9".into())
        );
    }
}
