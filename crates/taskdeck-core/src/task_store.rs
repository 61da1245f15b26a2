use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};

use crate::gateway::Gateway;
use crate::id::{CategoryId, TaskId};
use crate::task::{Task, TaskDraft};

/// Owns the task collection. Every mutation is written through the gateway
/// before it returns. Unknown ids are silent no-ops so that stale references
/// held by a caller never turn into errors.
#[derive(Debug)]
pub struct TaskStore {
    tasks: Vec<Task>,
    gateway: Gateway,
}

impl TaskStore {
    pub fn load(gateway: Gateway, now: DateTime<Utc>, today: NaiveDate) -> anyhow::Result<Self> {
        let tasks = gateway.load_tasks(now, today)?;
        Ok(Self { tasks, gateway })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    #[tracing::instrument(skip(self, draft, now), fields(name = %draft.name))]
    pub fn add_task(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> anyhow::Result<&Task> {
        draft.validate()?;
        let task = Task::from_draft(draft, now);
        info!(id = %task.id, "adding task");
        self.tasks.push(task);
        self.persist()?;
        let idx = self.tasks.len() - 1;
        Ok(&self.tasks[idx])
    }

    /// Overwrites the mutable fields; id, completion and creation time stay.
    #[tracing::instrument(skip(self, draft), fields(id = %id))]
    pub fn update_task(&mut self, id: &TaskId, draft: TaskDraft) -> anyhow::Result<()> {
        let Some(task) = self.tasks.iter_mut().find(|task| &task.id == id) else {
            debug!("update target not found; ignoring");
            return Ok(());
        };
        draft.validate()?;
        task.apply_draft(draft);
        self.persist()
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn delete_task(&mut self, id: &TaskId) -> anyhow::Result<()> {
        let before = self.tasks.len();
        self.tasks.retain(|task| &task.id != id);
        if self.tasks.len() == before {
            debug!("delete target not found; ignoring");
            return Ok(());
        }
        info!(removed = before - self.tasks.len(), "deleted task");
        self.persist()
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn toggle_completion(&mut self, id: &TaskId) -> anyhow::Result<()> {
        let Some(task) = self.tasks.iter_mut().find(|task| &task.id == id) else {
            debug!("toggle target not found; ignoring");
            return Ok(());
        };
        task.completed = !task.completed;
        debug!(completed = task.completed, "toggled completion");
        self.persist()
    }

    /// Drops the category reference from every task pointing at `category`.
    /// Returns how many tasks changed.
    #[tracing::instrument(skip(self), fields(category = %category))]
    pub(crate) fn clear_category(&mut self, category: &CategoryId) -> anyhow::Result<usize> {
        let mut cleared = 0_usize;
        for task in &mut self.tasks {
            if task.category.as_ref() == Some(category) {
                task.category = None;
                cleared += 1;
            }
        }
        if cleared > 0 {
            debug!(cleared, "cleared category references");
            self.persist()?;
        }
        Ok(cleared)
    }

    /// Appends without de-duplicating ids.
    #[tracing::instrument(skip(self, imported), fields(count = imported.len()))]
    pub(crate) fn append(&mut self, imported: Vec<Task>) -> anyhow::Result<usize> {
        let count = imported.len();
        if count == 0 {
            return Ok(0);
        }
        self.tasks.extend(imported);
        self.persist()?;
        Ok(count)
    }

    fn persist(&self) -> anyhow::Result<()> {
        self.gateway.save_tasks(&self.tasks)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::TaskStore;
    use crate::gateway::Gateway;
    use crate::id::TaskId;
    use crate::task::{Priority, TaskDraft};

    fn empty_store() -> (TaskStore, Gateway) {
        let gateway = Gateway::in_memory();
        gateway.save_tasks(&[]).unwrap();
        let store = TaskStore::load(
            gateway.clone(),
            Utc::now(),
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
        )
        .unwrap();
        (store, gateway)
    }

    fn reload(gateway: &Gateway) -> Vec<crate::task::Task> {
        gateway
            .load_tasks(Utc::now(), NaiveDate::from_ymd_opt(2025, 1, 10).unwrap())
            .unwrap()
    }

    #[test]
    fn add_assigns_identity_and_persists() {
        let (mut store, gateway) = empty_store();
        let now = Utc.with_ymd_and_hms(2025, 1, 9, 8, 0, 0).unwrap();
        let task = store.add_task(TaskDraft::new("Report"), now).unwrap().clone();

        assert!(!task.completed);
        assert_eq!(task.created_at, now);
        assert!(!task.id.as_str().is_empty());
        assert_eq!(reload(&gateway), vec![task]);
    }

    #[test]
    fn added_task_equals_its_reload_at_wall_clock_time() {
        let (mut store, gateway) = empty_store();
        let task = store
            .add_task(TaskDraft::new("Report"), Utc::now())
            .unwrap()
            .clone();
        assert_eq!(reload(&gateway), vec![task]);
    }

    #[test]
    fn add_rejects_blank_name() {
        let (mut store, gateway) = empty_store();
        assert!(store.add_task(TaskDraft::new(" "), Utc::now()).is_err());
        assert!(store.tasks().is_empty());
        assert!(reload(&gateway).is_empty());
    }

    #[test]
    fn update_overwrites_mutable_fields_only() {
        let (mut store, gateway) = empty_store();
        let id = store
            .add_task(TaskDraft::new("Draft"), Utc::now())
            .unwrap()
            .id
            .clone();
        store.toggle_completion(&id).unwrap();
        let before = store.get(&id).unwrap().clone();

        let mut draft = TaskDraft::new("Final");
        draft.priority = Priority::High;
        draft.due_date = NaiveDate::from_ymd_opt(2025, 2, 1);
        store.update_task(&id, draft).unwrap();

        let after = store.get(&id).unwrap();
        assert_eq!(after.name, "Final");
        assert_eq!(after.priority, Priority::High);
        assert_eq!(after.id, before.id);
        assert_eq!(after.completed, before.completed);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(reload(&gateway)[0].name, "Final");
    }

    #[test]
    fn unknown_ids_are_silent_no_ops() {
        let (mut store, _gateway) = empty_store();
        store.add_task(TaskDraft::new("keep"), Utc::now()).unwrap();
        let snapshot = store.tasks().to_vec();
        let ghost = TaskId::from("ghost");

        store.update_task(&ghost, TaskDraft::new("x")).unwrap();
        store.delete_task(&ghost).unwrap();
        store.toggle_completion(&ghost).unwrap();

        assert_eq!(store.tasks(), snapshot.as_slice());
    }

    #[test]
    fn toggle_flips_back_and_forth() {
        let (mut store, _gateway) = empty_store();
        let id = store
            .add_task(TaskDraft::new("t"), Utc::now())
            .unwrap()
            .id
            .clone();
        store.toggle_completion(&id).unwrap();
        assert!(store.get(&id).unwrap().completed);
        store.toggle_completion(&id).unwrap();
        assert!(!store.get(&id).unwrap().completed);
    }

    #[test]
    fn delete_removes_and_persists() {
        let (mut store, gateway) = empty_store();
        let id = store
            .add_task(TaskDraft::new("gone"), Utc::now())
            .unwrap()
            .id
            .clone();
        store.add_task(TaskDraft::new("stays"), Utc::now()).unwrap();
        store.delete_task(&id).unwrap();

        assert!(store.get(&id).is_none());
        let names: Vec<String> = reload(&gateway).into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["stays"]);
    }
}
