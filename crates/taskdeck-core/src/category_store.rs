use tracing::{debug, info};

use crate::category::{Category, CategoryDraft};
use crate::gateway::Gateway;
use crate::id::CategoryId;
use crate::task_store::TaskStore;

#[derive(Debug)]
pub struct CategoryStore {
    categories: Vec<Category>,
    gateway: Gateway,
}

impl CategoryStore {
    pub fn load(gateway: Gateway) -> anyhow::Result<Self> {
        let categories = gateway.load_categories()?;
        Ok(Self {
            categories,
            gateway,
        })
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn get(&self, id: &CategoryId) -> Option<&Category> {
        self.categories.iter().find(|category| &category.id == id)
    }

    pub fn contains(&self, id: &CategoryId) -> bool {
        self.get(id).is_some()
    }

    #[tracing::instrument(skip(self, draft), fields(name = %draft.name))]
    pub fn add_category(&mut self, draft: CategoryDraft) -> anyhow::Result<&Category> {
        draft.validate()?;
        let category = Category::from_draft(draft);
        info!(id = %category.id, "adding category");
        self.categories.push(category);
        self.persist()?;
        let idx = self.categories.len() - 1;
        Ok(&self.categories[idx])
    }

    #[tracing::instrument(skip(self, draft), fields(id = %id))]
    pub fn update_category(&mut self, id: &CategoryId, draft: CategoryDraft) -> anyhow::Result<()> {
        let Some(category) = self
            .categories
            .iter_mut()
            .find(|category| &category.id == id)
        else {
            debug!("update target not found; ignoring");
            return Ok(());
        };
        draft.validate()?;
        category.apply_draft(draft);
        self.persist()
    }

    /// Clears the reference on every affected task (and persists them)
    /// before the category itself is removed.
    #[tracing::instrument(skip(self, tasks), fields(id = %id))]
    pub fn delete_category(&mut self, id: &CategoryId, tasks: &mut TaskStore) -> anyhow::Result<()> {
        let cleared = tasks.clear_category(id)?;

        let before = self.categories.len();
        self.categories.retain(|category| &category.id != id);
        if self.categories.len() == before {
            debug!(cleared, "delete target not found; ignoring");
            return Ok(());
        }

        info!(cleared, "deleted category");
        self.persist()
    }

    pub(crate) fn append(&mut self, imported: Vec<Category>) -> anyhow::Result<usize> {
        let count = imported.len();
        if count == 0 {
            return Ok(0);
        }
        self.categories.extend(imported);
        self.persist()?;
        Ok(count)
    }

    fn persist(&self) -> anyhow::Result<()> {
        self.gateway.save_categories(&self.categories)
    }
}
