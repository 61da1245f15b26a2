use std::io::{self, IsTerminal, Write};

use chrono::NaiveDateTime;
use unicode_width::UnicodeWidthStr;

use crate::category::Category;
use crate::config::Config;
use crate::datetime::{DATE_FORMAT, TIME_FORMAT, format_timestamp};
use crate::task::{Priority, Task};
use crate::view::ViewCounts;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    /// `color` is validated when the config is loaded.
    pub fn new(cfg: &Config) -> Self {
        Self {
            color: cfg.get_bool("color").unwrap_or(true),
        }
    }

    #[tracing::instrument(skip_all, fields(rows = tasks.len()))]
    pub fn print_task_table(
        &mut self,
        tasks: &[&Task],
        categories: &[Category],
        now_local: NaiveDateTime,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        if tasks.is_empty() {
            writeln!(out, "No tasks found.")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Done".to_string(),
            "Due".to_string(),
            "Pri".to_string(),
            "Category".to_string(),
            "Name".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());
        for task in tasks {
            let id = self.paint(short_id(task.id.as_str()), "33");
            let done = if task.completed { "x" } else { "" }.to_string();

            let due = format_due(task);
            let due = if task.is_overdue(now_local) {
                self.paint(&due, "31")
            } else {
                due
            };

            let priority = match task.priority {
                Priority::High => self.paint("high", "1"),
                other => other.to_string(),
            };

            let category = category_name(task, categories);
            rows.push(vec![id, done, due, priority, category, task.name.clone()]);
        }

        write_table(&mut out, headers, rows)?;
        writeln!(out)?;
        writeln!(out, "{} task(s)", tasks.len())?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn print_task_info(&mut self, task: &Task, categories: &[Category]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id          {}", task.id)?;
        writeln!(out, "name        {}", task.name)?;
        writeln!(out, "description {}", task.description)?;
        writeln!(out, "due         {}", format_due(task))?;
        writeln!(out, "category    {}", category_name(task, categories))?;
        writeln!(out, "priority    {}", task.priority)?;
        writeln!(out, "completed   {}", task.completed)?;
        writeln!(out, "created     {}", format_timestamp(&task.created_at))?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn print_categories(
        &mut self,
        categories: &[Category],
        counts: &ViewCounts,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let headers = vec![
            "ID".to_string(),
            "Name".to_string(),
            "Color".to_string(),
            "Tasks".to_string(),
        ];
        let rows = categories
            .iter()
            .map(|category| {
                vec![
                    self.paint(short_id(category.id.as_str()), "33"),
                    category.name.clone(),
                    category.color.clone(),
                    counts.for_category(&category.id).to_string(),
                ]
            })
            .collect();
        write_table(&mut out, headers, rows)
    }

    #[tracing::instrument(skip_all)]
    pub fn print_summary(&mut self, counts: &ViewCounts, categories: &[Category]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "all        {}", counts.total)?;
        writeln!(out, "today      {}", counts.today)?;
        writeln!(out, "upcoming   {}", counts.upcoming)?;
        writeln!(out, "completed  {}", counts.completed)?;
        for category in categories {
            writeln!(
                out,
                "  {:<9}{}",
                category.name,
                counts.for_category(&category.id)
            )?;
        }
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

const SHORT_ID_LEN: usize = 8;

fn short_id(id: &str) -> &str {
    id.char_indices()
        .nth(SHORT_ID_LEN)
        .map(|(idx, _)| &id[..idx])
        .unwrap_or(id)
}

fn format_due(task: &Task) -> String {
    match (task.due_date, task.due_time) {
        (Some(date), Some(time)) => format!(
            "{} {}",
            date.format(DATE_FORMAT),
            time.format(TIME_FORMAT)
        ),
        (Some(date), None) => date.format(DATE_FORMAT).to_string(),
        (None, _) => String::new(),
    }
}

fn category_name(task: &Task, categories: &[Category]) -> String {
    task.category
        .as_ref()
        .and_then(|id| categories.iter().find(|c| &c.id == id))
        .map(|c| c.name.clone())
        .unwrap_or_default()
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
