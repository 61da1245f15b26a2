use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::datetime::{date_serde, time_serde, timestamp_serde};
use crate::id::{CategoryId, TaskId};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// 0 for high, 2 for low.
    pub fn urgency_rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(anyhow!("invalid priority: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, with = "date_serde")]
    pub due_date: Option<NaiveDate>,

    #[serde(default, with = "time_serde")]
    pub due_time: Option<NaiveTime>,

    #[serde(default, deserialize_with = "blank_category")]
    pub category: Option<CategoryId>,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub completed: bool,

    #[serde(with = "timestamp_serde")]
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied fields of a task. Id, completion and creation time are
/// assigned by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub name: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub category: Option<CategoryId>,
    pub priority: Priority,
}

impl TaskDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow!("task name cannot be empty"));
        }
        Ok(())
    }
}

impl Task {
    /// `created_at` is kept at millisecond precision, the precision it is
    /// stored and exported with.
    pub fn from_draft(draft: TaskDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: TaskId::generate(),
            name: draft.name,
            description: draft.description,
            due_date: draft.due_date,
            due_time: draft.due_time,
            category: draft.category,
            priority: draft.priority,
            completed: false,
            created_at: now.trunc_subsecs(3),
        }
    }

    pub fn apply_draft(&mut self, draft: TaskDraft) {
        self.name = draft.name;
        self.description = draft.description;
        self.due_date = draft.due_date;
        self.due_time = draft.due_time;
        self.category = draft.category;
        self.priority = draft.priority;
    }

    pub fn to_draft(&self) -> TaskDraft {
        TaskDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            due_date: self.due_date,
            due_time: self.due_time,
            category: self.category.clone(),
            priority: self.priority,
        }
    }

    pub fn due_at(&self) -> Option<NaiveDateTime> {
        self.due_date
            .map(|date| date.and_time(self.due_time.unwrap_or(NaiveTime::MIN)))
    }

    /// Full date-time comparison, unlike the date-only `upcoming` view.
    pub fn is_overdue(&self, now_local: NaiveDateTime) -> bool {
        !self.completed && self.due_at().is_some_and(|due| due < now_local)
    }
}

fn blank_category<'de, D>(deserializer: D) -> Result<Option<CategoryId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty() && value != "null")
        .map(CategoryId::from))
}
