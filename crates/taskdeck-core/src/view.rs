use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;
use deunicode::deunicode;
use tracing::trace;

use crate::category::Category;
use crate::id::CategoryId;
use crate::task::{
  Priority,
  Task
};

#[derive(
  Debug, Clone, PartialEq, Eq, Default,
)]
pub enum ViewSelector {
  #[default]
  All,
  Today,
  Upcoming,
  Completed,
  Category(CategoryId)
}

impl ViewSelector {
  /// Unknown selectors fall back to
  /// `All`. Accepts `category:<id>` and
  /// the stored `category-<id>` form.
  pub fn parse(raw: &str) -> Self {
    let trimmed = raw.trim();
    match trimmed {
      | "today" => Self::Today,
      | "upcoming" => Self::Upcoming,
      | "completed" => Self::Completed,
      | "all" | "" => Self::All,
      | other => {
        let id = other
          .strip_prefix("category:")
          .or_else(|| {
            other
              .strip_prefix("category-")
          })
          .filter(|id| !id.is_empty());
        match id {
          | Some(id) => {
            Self::Category(
              CategoryId::from(id)
            )
          }
          | None => {
            trace!(selector = %other, "unknown view selector; using all");
            Self::All
          }
        }
      }
    }
  }

  pub fn matches(
    &self,
    task: &Task,
    today: NaiveDate
  ) -> bool {
    match self {
      | Self::All => true,
      | Self::Today => {
        task.due_date == Some(today)
      }
      | Self::Upcoming => {
        is_upcoming(task, today)
      }
      | Self::Completed => {
        task.completed
      }
      | Self::Category(id) => {
        task.category.as_ref()
          == Some(id)
      }
    }
  }
}

impl fmt::Display for ViewSelector {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | Self::All => f.write_str("all"),
      | Self::Today => {
        f.write_str("today")
      }
      | Self::Upcoming => {
        f.write_str("upcoming")
      }
      | Self::Completed => {
        f.write_str("completed")
      }
      | Self::Category(id) => {
        write!(f, "category:{id}")
      }
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
)]
pub enum SortKey {
  DateAsc,
  #[default]
  DateDesc,
  PriorityHigh,
  PriorityLow,
  NameAsc,
  NameDesc,
  Newest
}

impl SortKey {
  /// Unrecognized keys sort newest
  /// first.
  pub fn parse(raw: &str) -> Self {
    match raw.trim() {
      | "date-asc" => Self::DateAsc,
      | "date-desc" => Self::DateDesc,
      | "priority-high" => {
        Self::PriorityHigh
      }
      | "priority-low" => {
        Self::PriorityLow
      }
      | "name-asc" => Self::NameAsc,
      | "name-desc" => Self::NameDesc,
      | _ => Self::Newest
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      | Self::DateAsc => "date-asc",
      | Self::DateDesc => "date-desc",
      | Self::PriorityHigh => {
        "priority-high"
      }
      | Self::PriorityLow => {
        "priority-low"
      }
      | Self::NameAsc => "name-asc",
      | Self::NameDesc => "name-desc",
      | Self::Newest => "newest"
    }
  }

  pub fn compare(
    self,
    a: &Task,
    b: &Task
  ) -> Ordering {
    match self {
      | Self::DateAsc => {
        a.due_date
          .unwrap_or(NaiveDate::MAX)
          .cmp(
            &b.due_date
              .unwrap_or(NaiveDate::MAX)
          )
      }
      | Self::DateDesc => {
        b.due_date
          .unwrap_or(NaiveDate::MIN)
          .cmp(
            &a.due_date
              .unwrap_or(NaiveDate::MIN)
          )
      }
      | Self::PriorityHigh => {
        a.priority
          .urgency_rank()
          .cmp(
            &b.priority.urgency_rank()
          )
      }
      | Self::PriorityLow => {
        rank_low_first(a.priority)
          .cmp(&rank_low_first(
            b.priority
          ))
      }
      | Self::NameAsc => {
        compare_names(&a.name, &b.name)
      }
      | Self::NameDesc => {
        compare_names(&b.name, &a.name)
      }
      | Self::Newest => {
        b.created_at.cmp(&a.created_at)
      }
    }
  }
}

impl fmt::Display for SortKey {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct ViewQuery {
  pub selector: ViewSelector,
  pub search:   String,
  pub sort:     SortKey
}

impl ViewQuery {
  pub fn new(
    selector: ViewSelector,
    search: impl Into<String>,
    sort: SortKey
  ) -> Self {
    Self {
      selector,
      search: search.into(),
      sort
    }
  }
}

#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct ViewCounts {
  pub total:        usize,
  pub today:        usize,
  pub upcoming:     usize,
  pub completed:    usize,
  pub per_category:
    Vec<(CategoryId, usize)>
}

impl ViewCounts {
  pub fn for_category(
    &self,
    id: &CategoryId
  ) -> usize {
    self
      .per_category
      .iter()
      .find(|(cid, _)| cid == id)
      .map(|(_, count)| *count)
      .unwrap_or(0)
  }
}

/// Displayed rows plus sidebar counts.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedView<'a> {
  pub rows:   Vec<&'a Task>,
  pub counts: ViewCounts
}

/// Filter by selector, then search,
/// then a stable sort. Pure: `today`
/// is supplied by the caller.
#[tracing::instrument(skip(
  tasks, query
), fields(selector = %query.selector, sort = %query.sort))]
pub fn compute_view<'a>(
  tasks: &'a [Task],
  query: &ViewQuery,
  today: NaiveDate
) -> Vec<&'a Task> {
  let needle =
    query.search.to_lowercase();

  let mut rows: Vec<&Task> = tasks
    .iter()
    .filter(|task| {
      query
        .selector
        .matches(task, today)
    })
    .filter(|task| {
      matches_search(task, &needle)
    })
    .collect();

  // slice::sort_by is stable
  rows.sort_by(|a, b| {
    query.sort.compare(a, b)
  });

  trace!(
    total = tasks.len(),
    shown = rows.len(),
    "computed view"
  );
  rows
}

pub fn derive<'a>(
  tasks: &'a [Task],
  categories: &[Category],
  query: &ViewQuery,
  today: NaiveDate
) -> DerivedView<'a> {
  DerivedView {
    rows:   compute_view(
      tasks, query, today
    ),
    counts: counts(
      tasks, categories, today
    )
  }
}

/// Always over the full collection,
/// independent of the active query.
pub fn counts(
  tasks: &[Task],
  categories: &[Category],
  today: NaiveDate
) -> ViewCounts {
  let per_category = categories
    .iter()
    .map(|category| {
      let count = tasks
        .iter()
        .filter(|task| {
          task.category.as_ref()
            == Some(&category.id)
        })
        .count();
      (category.id.clone(), count)
    })
    .collect();

  ViewCounts {
    total: tasks.len(),
    today: tasks
      .iter()
      .filter(|task| {
        task.due_date == Some(today)
      })
      .count(),
    upcoming: tasks
      .iter()
      .filter(|task| {
        is_upcoming(task, today)
      })
      .count(),
    completed: tasks
      .iter()
      .filter(|task| task.completed)
      .count(),
    per_category
  }
}

/// Date-only: a task due today is not
/// upcoming even if its time is later.
fn is_upcoming(
  task: &Task,
  today: NaiveDate
) -> bool {
  !task.completed
    && task
      .due_date
      .is_some_and(|due| due > today)
}

fn matches_search(
  task: &Task,
  needle: &str
) -> bool {
  if needle.is_empty() {
    return true;
  }
  task
    .name
    .to_lowercase()
    .contains(needle)
    || task
      .description
      .to_lowercase()
      .contains(needle)
}

fn rank_low_first(
  priority: Priority
) -> u8 {
  2 - priority.urgency_rank()
}

fn collation_key(name: &str) -> String {
  deunicode(name).to_lowercase()
}

fn compare_names(
  a: &str,
  b: &str
) -> Ordering {
  collation_key(a)
    .cmp(&collation_key(b))
    .then_with(|| a.cmp(b))
}
