use chrono::{DateTime, SubsecRound, Utc};
use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info};

use crate::category::Category;
use crate::datetime::{DATE_FORMAT, TIME_FORMAT, format_timestamp, parse_date, parse_time, parse_timestamp};
use crate::id::{CategoryId, TaskId};
use crate::task::{Priority, Task};

pub const TASK_HEADER: &str =
    "ID,Name,Description,Due Date,Due Time,Category,Priority,Completed,Created At";
pub const CATEGORY_HEADER: &str = "ID,Name,Color";

const TASK_COLUMNS: usize = 9;
const CATEGORY_COLUMNS: usize = 3;

/// `None` when there is nothing to export.
pub fn export_tasks(tasks: &[Task]) -> Option<String> {
    if tasks.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(TASK_HEADER.len() + tasks.len() * 96);
    out.push_str(TASK_HEADER);
    out.push('\n');

    for task in tasks {
        let row = [
            plain(task.id.as_str()),
            quoted(&task.name),
            quoted(&task.description),
            task.due_date
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
            task.due_time
                .map(|t| t.format(TIME_FORMAT).to_string())
                .unwrap_or_default(),
            task.category
                .as_ref()
                .map(|c| plain(c.as_str()))
                .unwrap_or_default(),
            task.priority.to_string(),
            task.completed.to_string(),
            format_timestamp(&task.created_at),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }

    debug!(rows = tasks.len(), "exported tasks");
    Some(out)
}

pub fn export_categories(categories: &[Category]) -> Option<String> {
    if categories.is_empty() {
        return None;
    }

    let mut out = String::from(CATEGORY_HEADER);
    out.push('\n');
    for category in categories {
        let row = [
            plain(category.id.as_str()),
            quoted(&category.name),
            quoted(&category.color),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }

    debug!(rows = categories.len(), "exported categories");
    Some(out)
}

/// The first line is always treated as a header. Rows with fewer than nine
/// columns, or without a name, are skipped.
#[tracing::instrument(skip(text, now), fields(bytes = text.len()))]
pub fn import_tasks(text: &str, now: DateTime<Utc>) -> Vec<Task> {
    let rows = read_rows(text, TASK_COLUMNS);
    let tasks: Vec<Task> = rows
        .iter()
        .filter_map(|(line, record)| {
            let task = task_from_record(record, now);
            if task.is_none() {
                debug!(line, "skipping task row without a name");
            }
            task
        })
        .collect();

    info!(imported = tasks.len(), "parsed task csv");
    tasks
}

#[tracing::instrument(skip(text), fields(bytes = text.len()))]
pub fn import_categories(text: &str) -> Vec<Category> {
    let rows = read_rows(text, CATEGORY_COLUMNS);
    let categories: Vec<Category> = rows
        .iter()
        .filter_map(|(line, record)| {
            let category = category_from_record(record);
            if category.is_none() {
                debug!(line, "skipping category row without a name");
            }
            category
        })
        .collect();

    info!(imported = categories.len(), "parsed category csv");
    categories
}

fn read_rows(text: &str, min_columns: usize) -> Vec<(u64, StringRecord)> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                debug!(error = %err, "skipping unreadable csv row");
                continue;
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        if record.len() < min_columns {
            debug!(line, columns = record.len(), min_columns, "skipping short csv row");
            continue;
        }
        rows.push((line, record));
    }
    rows
}

/// Name, description and color are taken verbatim; every other column is
/// trimmed.
fn task_from_record(record: &StringRecord, now: DateTime<Utc>) -> Option<Task> {
    let raw = |idx: usize| record.get(idx).unwrap_or_default();
    let field = |idx: usize| raw(idx).trim();

    let name = raw(1);
    if name.trim().is_empty() {
        return None;
    }

    let id = match field(0) {
        "" => TaskId::generate(),
        id => TaskId::from(id),
    };
    let category = match field(5) {
        "" | "null" | "undefined" => None,
        id => Some(CategoryId::from(id)),
    };

    Some(Task {
        id,
        name: name.to_string(),
        description: raw(2).to_string(),
        due_date: parse_date(field(3)),
        due_time: parse_time(field(4)),
        category,
        priority: field(6).parse::<Priority>().unwrap_or_default(),
        completed: field(7).eq_ignore_ascii_case("true"),
        created_at: parse_timestamp(field(8)).unwrap_or_else(|| now.trunc_subsecs(3)),
    })
}

fn category_from_record(record: &StringRecord) -> Option<Category> {
    let raw = |idx: usize| record.get(idx).unwrap_or_default();

    let name = raw(1);
    if name.trim().is_empty() {
        return None;
    }

    let id = match raw(0).trim() {
        "" => CategoryId::generate(),
        id => CategoryId::from(id),
    };

    Some(Category {
        id,
        name: name.to_string(),
        color: raw(2).to_string(),
    })
}

/// Always quoted; newlines collapse to a single space, quotes are doubled.
fn quoted(value: &str) -> String {
    let flattened = value.replace("\r\n", " ").replace(['\n', '\r'], " ");
    format!("\"{}\"", flattened.replace('"', "\"\""))
}

/// Quoted only when the value would otherwise break the row.
fn plain(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        quoted(value)
    } else {
        value.to_string()
    }
}
