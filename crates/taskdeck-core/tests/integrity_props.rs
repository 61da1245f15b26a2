use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use proptest::test_runner::Config;
use taskdeck_core::board::Board;
use taskdeck_core::category::CategoryDraft;
use taskdeck_core::gateway::Gateway;
use taskdeck_core::id::{CategoryId, TaskId};
use taskdeck_core::task::TaskDraft;
use taskdeck_core::view::{SortKey, ViewQuery, ViewSelector};

#[derive(Debug, Clone)]
enum Op {
    AddCategory,
    DeleteCategory(usize),
    RenameCategory(usize),
    AddTask(Option<usize>),
    RetagTask(usize, Option<usize>),
    DeleteTask(usize),
    ToggleTask(usize),
    AddTaskWithUnknownCategory,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::AddCategory),
        any::<usize>().prop_map(Op::DeleteCategory),
        any::<usize>().prop_map(Op::RenameCategory),
        proptest::option::of(any::<usize>()).prop_map(Op::AddTask),
        (any::<usize>(), proptest::option::of(any::<usize>()))
            .prop_map(|(task, category)| Op::RetagTask(task, category)),
        any::<usize>().prop_map(Op::DeleteTask),
        any::<usize>().prop_map(Op::ToggleTask),
        Just(Op::AddTaskWithUnknownCategory),
    ]
}

fn pick_category(board: &Board, idx: usize) -> Option<CategoryId> {
    let categories = board.categories();
    (!categories.is_empty()).then(|| categories[idx % categories.len()].id.clone())
}

fn pick_task(board: &Board, idx: usize) -> Option<TaskId> {
    let tasks = board.tasks();
    (!tasks.is_empty()).then(|| tasks[idx % tasks.len()].id.clone())
}

fn apply(board: &mut Board, op: Op) {
    match op {
        Op::AddCategory => {
            board
                .add_category(CategoryDraft::new("Generated", "#000000"))
                .expect("add category");
        }
        Op::DeleteCategory(idx) => {
            if let Some(id) = pick_category(board, idx) {
                board.delete_category(&id).expect("delete category");
            }
        }
        Op::RenameCategory(idx) => {
            if let Some(id) = pick_category(board, idx) {
                board
                    .update_category(&id, CategoryDraft::new("Renamed", "#ffffff"))
                    .expect("update category");
            }
        }
        Op::AddTask(category) => {
            let mut draft = TaskDraft::new("task");
            draft.category = category.and_then(|idx| pick_category(board, idx));
            board.add_task(draft, Utc::now()).expect("add task");
        }
        Op::RetagTask(task, category) => {
            if let Some(id) = pick_task(board, task) {
                let mut draft = board.task(&id).expect("picked task exists").to_draft();
                draft.category = category.and_then(|idx| pick_category(board, idx));
                board.update_task(&id, draft).expect("update task");
            }
        }
        Op::DeleteTask(idx) => {
            if let Some(id) = pick_task(board, idx) {
                board.delete_task(&id).expect("delete task");
            }
        }
        Op::ToggleTask(idx) => {
            if let Some(id) = pick_task(board, idx) {
                board.toggle_completion(&id).expect("toggle task");
            }
        }
        Op::AddTaskWithUnknownCategory => {
            let mut draft = TaskDraft::new("stray");
            draft.category = Some(CategoryId::from("no-such-category"));
            board.add_task(draft, Utc::now()).expect("add task");
        }
    }
}

proptest! {
    #![proptest_config(Config::with_cases(64))]
    #[test]
    fn category_references_never_dangle(ops in proptest::collection::vec(op(), 1..40)) {
        let today = NaiveDate::from_ymd_opt(2025, 1, 10).expect("valid date");
        let mut board = Board::open(Gateway::in_memory(), Utc::now(), today).expect("open board");

        for op in ops {
            apply(&mut board, op);
            prop_assert!(board.dangling_references().is_empty());
        }

        let counts = board.view(&ViewQuery::default(), today).counts;
        let categorized: usize = counts.per_category.iter().map(|(_, n)| n).sum();
        let uncategorized = board.tasks().iter().filter(|t| t.category.is_none()).count();
        prop_assert_eq!(categorized + uncategorized, counts.total);
    }

    #[test]
    fn every_sort_returns_the_same_rows(
        names in proptest::collection::vec("[a-zA-Z][a-zA-Z ]{0,11}", 0..20),
        day_offsets in proptest::collection::vec(proptest::option::of(0_u64..30), 20),
    ) {
        let today = NaiveDate::from_ymd_opt(2025, 1, 10).expect("valid date");
        let mut board = Board::open(Gateway::in_memory(), Utc::now(), today).expect("open board");
        for (name, offset) in names.iter().zip(day_offsets) {
            let mut draft = TaskDraft::new(name.clone());
            draft.due_date = offset.and_then(|days| today.checked_add_days(chrono::Days::new(days)));
            board.add_task(draft, Utc::now()).expect("add task");
        }

        let mut baseline: Vec<TaskId> = board
            .view(&ViewQuery::new(ViewSelector::All, "", SortKey::DateDesc), today)
            .rows
            .iter()
            .map(|t| t.id.clone())
            .collect();
        baseline.sort();

        for sort in [
            SortKey::DateAsc,
            SortKey::PriorityHigh,
            SortKey::PriorityLow,
            SortKey::NameAsc,
            SortKey::NameDesc,
            SortKey::Newest,
        ] {
            let mut ids: Vec<TaskId> = board
                .view(&ViewQuery::new(ViewSelector::All, "", sort), today)
                .rows
                .iter()
                .map(|t| t.id.clone())
                .collect();
            ids.sort();
            prop_assert_eq!(&ids, &baseline);
        }
    }
}
