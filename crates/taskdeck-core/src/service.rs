use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use tracing::instrument;

use crate::board::Board;
use crate::category::{Category, CategoryDraft};
use crate::gateway::Gateway;
use crate::id::{CategoryId, TaskId};
use crate::task::{Task, TaskDraft};
use crate::view::{ViewCounts, ViewQuery};

/// A board shared between callers. Each operation holds the lock for its
/// whole duration, so a category delete and its task cascade are never
/// interleaved with another writer.
#[derive(Debug, Clone)]
pub struct SharedBoard {
    board: Arc<Mutex<Board>>,
}

impl SharedBoard {
    pub fn new(board: Board) -> Self {
        Self {
            board: Arc::new(Mutex::new(board)),
        }
    }

    pub fn open(gateway: Gateway, now: DateTime<Utc>, today: NaiveDate) -> anyhow::Result<Self> {
        Ok(Self::new(Board::open(gateway, now, today)?))
    }

    /// Runs `f` with exclusive access for multi-step work.
    pub fn with<R>(&self, f: impl FnOnce(&mut Board) -> R) -> R {
        let mut board = self.board.lock();
        f(&mut board)
    }

    #[instrument(skip(self, draft))]
    pub fn add_task(&self, draft: TaskDraft) -> anyhow::Result<TaskId> {
        self.board.lock().add_task(draft, Utc::now())
    }

    #[instrument(skip(self, draft))]
    pub fn update_task(&self, id: &TaskId, draft: TaskDraft) -> anyhow::Result<()> {
        self.board.lock().update_task(id, draft)
    }

    #[instrument(skip(self))]
    pub fn delete_task(&self, id: &TaskId) -> anyhow::Result<()> {
        self.board.lock().delete_task(id)
    }

    #[instrument(skip(self))]
    pub fn toggle_completion(&self, id: &TaskId) -> anyhow::Result<()> {
        self.board.lock().toggle_completion(id)
    }

    #[instrument(skip(self, draft))]
    pub fn add_category(&self, draft: CategoryDraft) -> anyhow::Result<CategoryId> {
        self.board.lock().add_category(draft)
    }

    #[instrument(skip(self, draft))]
    pub fn update_category(&self, id: &CategoryId, draft: CategoryDraft) -> anyhow::Result<()> {
        self.board.lock().update_category(id, draft)
    }

    #[instrument(skip(self))]
    pub fn delete_category(&self, id: &CategoryId) -> anyhow::Result<()> {
        self.board.lock().delete_category(id)
    }

    pub fn categories(&self) -> Vec<Category> {
        self.board.lock().categories().to_vec()
    }

    /// Owned copies of the displayed rows, computed under the lock.
    pub fn view(&self, query: &ViewQuery, today: NaiveDate) -> (Vec<Task>, ViewCounts) {
        let board = self.board.lock();
        let derived = board.view(query, today);
        let rows = derived.rows.into_iter().cloned().collect();
        (rows, derived.counts)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use chrono::{NaiveDate, Utc};

    use super::SharedBoard;
    use crate::category::CategoryDraft;
    use crate::gateway::Gateway;
    use crate::task::TaskDraft;
    use crate::view::ViewQuery;

    #[test]
    fn concurrent_writers_keep_references_valid() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let shared = SharedBoard::open(Gateway::in_memory(), Utc::now(), today).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for round in 0..25 {
                        let category = shared
                            .add_category(CategoryDraft::new(
                                format!("c{worker}-{round}"),
                                "#123456",
                            ))
                            .unwrap();
                        let mut draft = TaskDraft::new(format!("t{worker}-{round}"));
                        draft.category = Some(category.clone());
                        shared.add_task(draft).unwrap();
                        if round % 2 == 0 {
                            shared.delete_category(&category).unwrap();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        shared.with(|board| assert!(board.dangling_references().is_empty()));
        let (rows, counts) = shared.view(&ViewQuery::default(), today);
        assert_eq!(rows.len(), 101);
        assert_eq!(counts.total, 101);
        assert_eq!(shared.categories().len(), 4 + 4 * 12);
    }
}
