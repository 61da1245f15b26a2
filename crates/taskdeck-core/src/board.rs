use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use crate::category::{Category, CategoryDraft};
use crate::category_store::CategoryStore;
use crate::codec;
use crate::gateway::Gateway;
use crate::id::{CategoryId, TaskId};
use crate::task::{Task, TaskDraft};
use crate::task_store::TaskStore;
use crate::view::{self, DerivedView, ViewQuery};

/// One task store and one category store sharing a gateway. Every
/// operation that spans both collections goes through here, so a task never
/// points at a category that is not in the collection.
#[derive(Debug)]
pub struct Board {
    gateway: Gateway,
    tasks: TaskStore,
    categories: CategoryStore,
}

impl Board {
    #[tracing::instrument(skip(gateway, now))]
    pub fn open(gateway: Gateway, now: DateTime<Utc>, today: NaiveDate) -> anyhow::Result<Self> {
        let categories = CategoryStore::load(gateway.clone())?;
        let mut tasks = TaskStore::load(gateway.clone(), now, today)?;

        let dangling: Vec<CategoryId> = tasks
            .tasks()
            .iter()
            .filter_map(|task| task.category.clone())
            .filter(|id| !categories.contains(id))
            .collect();
        for id in &dangling {
            warn!(category = %id, "stored task references a missing category; clearing");
            tasks.clear_category(id)?;
        }

        info!(
            tasks = tasks.tasks().len(),
            categories = categories.categories().len(),
            "opened board"
        );
        Ok(Self {
            gateway,
            tasks,
            categories,
        })
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn tasks(&self) -> &[Task] {
        self.tasks.tasks()
    }

    pub fn categories(&self) -> &[Category] {
        self.categories.categories()
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn category(&self, id: &CategoryId) -> Option<&Category> {
        self.categories.get(id)
    }

    pub fn add_task(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> anyhow::Result<TaskId> {
        let draft = self.checked_draft(draft);
        Ok(self.tasks.add_task(draft, now)?.id.clone())
    }

    pub fn update_task(&mut self, id: &TaskId, draft: TaskDraft) -> anyhow::Result<()> {
        let draft = self.checked_draft(draft);
        self.tasks.update_task(id, draft)
    }

    pub fn delete_task(&mut self, id: &TaskId) -> anyhow::Result<()> {
        self.tasks.delete_task(id)
    }

    pub fn toggle_completion(&mut self, id: &TaskId) -> anyhow::Result<()> {
        self.tasks.toggle_completion(id)
    }

    pub fn add_category(&mut self, draft: CategoryDraft) -> anyhow::Result<CategoryId> {
        Ok(self.categories.add_category(draft)?.id.clone())
    }

    pub fn update_category(&mut self, id: &CategoryId, draft: CategoryDraft) -> anyhow::Result<()> {
        self.categories.update_category(id, draft)
    }

    pub fn delete_category(&mut self, id: &CategoryId) -> anyhow::Result<()> {
        self.categories.delete_category(id, &mut self.tasks)
    }

    pub fn view(&self, query: &ViewQuery, today: NaiveDate) -> DerivedView<'_> {
        view::derive(self.tasks(), self.categories(), query, today)
    }

    pub fn export_tasks_csv(&self) -> Option<String> {
        codec::export_tasks(self.tasks())
    }

    pub fn export_categories_csv(&self) -> Option<String> {
        codec::export_categories(self.categories())
    }

    /// Appends parsed rows to the existing tasks. Returns how many were
    /// imported.
    #[tracing::instrument(skip(self, text, now))]
    pub fn import_tasks_csv(&mut self, text: &str, now: DateTime<Utc>) -> anyhow::Result<usize> {
        let imported: Vec<Task> = codec::import_tasks(text, now)
            .into_iter()
            .map(|mut task| {
                task.category = self.known_category(task.category.take());
                task
            })
            .collect();
        self.tasks.append(imported)
    }

    #[tracing::instrument(skip(self, text))]
    pub fn import_categories_csv(&mut self, text: &str) -> anyhow::Result<usize> {
        self.categories.append(codec::import_categories(text))
    }

    /// Ids of tasks whose category is not in the collection. Always empty
    /// for a board driven only through its own operations.
    pub fn dangling_references(&self) -> Vec<TaskId> {
        self.tasks()
            .iter()
            .filter(|task| {
                task.category
                    .as_ref()
                    .is_some_and(|id| !self.categories.contains(id))
            })
            .map(|task| task.id.clone())
            .collect()
    }

    fn checked_draft(&self, mut draft: TaskDraft) -> TaskDraft {
        draft.category = self.known_category(draft.category.take());
        draft
    }

    fn known_category(&self, category: Option<CategoryId>) -> Option<CategoryId> {
        match category {
            Some(id) if !self.categories.contains(&id) => {
                warn!(category = %id, "unknown category; storing task as uncategorized");
                None
            }
            other => other,
        }
    }
}
