use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow};
use chrono::{Days, NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};

use crate::board::Board;
use crate::category::CategoryDraft;
use crate::cli::{AddArgs, CategoryCommand, Collection, Command, EditArgs, ListArgs, PrefsArgs};
use crate::config::Config;
use crate::datetime::{Zone, parse_date, parse_time};
use crate::id::{CategoryId, TaskId};
use crate::preferences::{CURRENT_SORT_KEY, CURRENT_VIEW_KEY, ViewMode};
use crate::render::Renderer;
use crate::task::TaskDraft;
use crate::view::{SortKey, ViewQuery, ViewSelector};

/// Everything a command needs besides the board itself.
#[derive(Debug)]
pub struct CommandContext<'a> {
    pub cfg: &'a Config,
    pub renderer: &'a mut Renderer,
    pub zone: Zone,
}

#[instrument(skip(board, ctx, command))]
pub fn dispatch(board: &mut Board, ctx: &mut CommandContext<'_>, command: Command) -> anyhow::Result<()> {
    debug!(?command, "dispatching command");

    match command {
        Command::Add(args) => cmd_add(board, ctx, args),
        Command::Edit(args) => cmd_edit(board, ctx, args),
        Command::Done { id } => cmd_done(board, &id),
        Command::Delete { id } => cmd_delete(board, &id),
        Command::List(args) => cmd_list(board, ctx, args),
        Command::Info { id } => cmd_info(board, ctx, &id),
        Command::Summary => cmd_summary(board, ctx),
        Command::Category(action) => cmd_category(board, ctx, action),
        Command::Export { what, output } => cmd_export(board, what, output.as_deref()),
        Command::Import { what, file } => cmd_import(board, what, &file),
        Command::Prefs(args) => cmd_prefs(board, args),
        Command::Show => cmd_show(ctx.cfg),
    }
}

#[instrument(skip(board, ctx, args))]
fn cmd_add(board: &mut Board, ctx: &mut CommandContext<'_>, args: AddArgs) -> anyhow::Result<()> {
    info!("command add");
    let today = ctx.zone.today(Utc::now());

    let mut draft = TaskDraft::new(args.name.join(" "));
    draft.description = args.description.unwrap_or_default();
    draft.due_date = args
        .due
        .as_deref()
        .map(|raw| parse_due(raw, today))
        .transpose()?;
    draft.due_time = args.time.as_deref().map(parse_clock).transpose()?;
    draft.category = args
        .category
        .as_deref()
        .map(|raw| resolve_category(board, raw))
        .transpose()?;
    draft.priority = args.priority.unwrap_or_default();

    let id = board.add_task(draft, Utc::now())?;
    println!("Created task {id}.");
    Ok(())
}

#[instrument(skip(board, ctx, args))]
fn cmd_edit(board: &mut Board, ctx: &mut CommandContext<'_>, args: EditArgs) -> anyhow::Result<()> {
    info!("command edit");
    let Some(id) = resolve_task(board, &args.id)? else {
        println!("No task matches {}.", args.id);
        return Ok(());
    };
    let Some(existing) = board.task(&id) else {
        return Ok(());
    };
    let today = ctx.zone.today(Utc::now());

    let mut draft = existing.to_draft();
    if let Some(name) = args.name {
        draft.name = name;
    }
    if let Some(description) = args.description {
        draft.description = description;
    }
    if args.clear_due {
        draft.due_date = None;
        draft.due_time = None;
    }
    if let Some(raw) = args.due.as_deref() {
        draft.due_date = Some(parse_due(raw, today)?);
    }
    if let Some(raw) = args.time.as_deref() {
        draft.due_time = Some(parse_clock(raw)?);
    }
    if args.no_category {
        draft.category = None;
    }
    if let Some(raw) = args.category.as_deref() {
        draft.category = Some(resolve_category(board, raw)?);
    }
    if let Some(priority) = args.priority {
        draft.priority = priority;
    }

    board.update_task(&id, draft)?;
    println!("Updated task {id}.");
    Ok(())
}

#[instrument(skip(board))]
fn cmd_done(board: &mut Board, raw: &str) -> anyhow::Result<()> {
    info!("command done");
    let Some(id) = resolve_task(board, raw)? else {
        println!("No task matches {raw}.");
        return Ok(());
    };
    board.toggle_completion(&id)?;
    let completed = board.task(&id).is_some_and(|task| task.completed);
    if completed {
        println!("Completed task {id}.");
    } else {
        println!("Reopened task {id}.");
    }
    Ok(())
}

#[instrument(skip(board))]
fn cmd_delete(board: &mut Board, raw: &str) -> anyhow::Result<()> {
    info!("command delete");
    let Some(id) = resolve_task(board, raw)? else {
        println!("No task matches {raw}.");
        return Ok(());
    };
    board.delete_task(&id)?;
    println!("Deleted task {id}.");
    Ok(())
}

#[instrument(skip(board, ctx, args))]
fn cmd_list(board: &mut Board, ctx: &mut CommandContext<'_>, args: ListArgs) -> anyhow::Result<()> {
    info!("command list");
    let now = Utc::now();
    let mut prefs = board.gateway().load_preferences();

    let selector = match args.view.as_deref() {
        Some(raw) => resolve_selector(board, raw)?,
        None => prefs.current_view.clone(),
    };
    let sort = args
        .sort
        .as_deref()
        .map(SortKey::parse)
        .unwrap_or(prefs.current_sort);
    let query = ViewQuery::new(selector, args.search.unwrap_or_default(), sort);

    if prefs.current_view != query.selector || prefs.current_sort != query.sort {
        prefs.current_view = query.selector.clone();
        prefs.current_sort = query.sort;
        board.gateway().save_preferences(&prefs)?;
    }

    let today = ctx.zone.today(now);
    let derived = board.view(&query, today);
    debug!(
        selector = %query.selector,
        sort = %query.sort,
        rows = derived.rows.len(),
        "rendering view"
    );
    ctx.renderer
        .print_task_table(&derived.rows, board.categories(), ctx.zone.now_local(now))
}

#[instrument(skip(board, ctx))]
fn cmd_info(board: &mut Board, ctx: &mut CommandContext<'_>, raw: &str) -> anyhow::Result<()> {
    info!("command info");
    let task = resolve_task(board, raw)?.and_then(|id| board.task(&id));
    match task {
        Some(task) => ctx.renderer.print_task_info(task, board.categories()),
        None => {
            println!("No task matches {raw}.");
            Ok(())
        }
    }
}

#[instrument(skip(board, ctx))]
fn cmd_summary(board: &mut Board, ctx: &mut CommandContext<'_>) -> anyhow::Result<()> {
    info!("command summary");
    let today = ctx.zone.today(Utc::now());
    let derived = board.view(&ViewQuery::default(), today);
    ctx.renderer
        .print_summary(&derived.counts, board.categories())
}

#[instrument(skip(board, ctx, action))]
fn cmd_category(
    board: &mut Board,
    ctx: &mut CommandContext<'_>,
    action: CategoryCommand,
) -> anyhow::Result<()> {
    match action {
        CategoryCommand::Add { name, color } => {
            info!("command category add");
            let id = board.add_category(CategoryDraft::new(name, color))?;
            println!("Created category {id}.");
        }
        CategoryCommand::Edit { id, name, color } => {
            info!("command category edit");
            let id = resolve_category(board, &id)?;
            let Some(existing) = board.category(&id) else {
                return Ok(());
            };
            let draft = CategoryDraft::new(
                name.unwrap_or_else(|| existing.name.clone()),
                color.unwrap_or_else(|| existing.color.clone()),
            );
            board.update_category(&id, draft)?;
            println!("Updated category {id}.");
        }
        CategoryCommand::Delete { id } => {
            info!("command category delete");
            let id = resolve_category(board, &id)?;
            board.delete_category(&id)?;
            println!("Deleted category {id}.");
        }
        CategoryCommand::List => {
            let today = ctx.zone.today(Utc::now());
            let derived = board.view(&ViewQuery::default(), today);
            ctx.renderer
                .print_categories(board.categories(), &derived.counts)?;
        }
    }
    Ok(())
}

#[instrument(skip(board))]
fn cmd_export(board: &Board, what: Collection, output: Option<&Path>) -> anyhow::Result<()> {
    info!("command export");
    let (csv, empty_message) = match what {
        Collection::Tasks => (board.export_tasks_csv(), "No tasks available to export."),
        Collection::Categories => (board.export_categories_csv(), "No categories to export."),
    };

    let Some(csv) = csv else {
        println!("{empty_message}");
        return Ok(());
    };

    match output {
        Some(path) => {
            fs::write(path, &csv)
                .with_context(|| format!("failed writing {}", path.display()))?;
            println!("Exported to {}.", path.display());
        }
        None => print!("{csv}"),
    }
    Ok(())
}

#[instrument(skip(board))]
fn cmd_import(board: &mut Board, what: Collection, file: &Path) -> anyhow::Result<()> {
    info!("command import");
    let text = fs::read_to_string(file)
        .with_context(|| format!("failed reading {}", file.display()))?;

    let count = match what {
        Collection::Tasks => board.import_tasks_csv(&text, Utc::now())?,
        Collection::Categories => board.import_categories_csv(&text)?,
    };
    let noun = match what {
        Collection::Tasks => "task",
        Collection::Categories => "category",
    };
    println!("Imported {count} {noun} row(s).");
    Ok(())
}

#[instrument(skip(board, args))]
fn cmd_prefs(board: &mut Board, args: PrefsArgs) -> anyhow::Result<()> {
    let mut prefs = board.gateway().load_preferences();
    let changed = args.view_mode.is_some() || args.dark_mode.is_some();
    if let Some(mode) = args.view_mode.as_deref() {
        prefs.view_mode = ViewMode::parse(mode);
    }
    if let Some(dark) = args.dark_mode {
        prefs.dark_mode = dark;
    }
    if changed {
        board.gateway().save_preferences(&prefs)?;
    }

    println!("viewMode     {}", prefs.view_mode);
    println!("currentSort  {}", prefs.current_sort);
    println!("currentView  {}", prefs.current_view);
    println!("darkMode     {}", prefs.dark_mode);
    Ok(())
}

fn cmd_show(cfg: &Config) -> anyhow::Result<()> {
    for path in &cfg.loaded_files {
        println!("# {}", path.display());
    }
    for (key, value) in cfg.entries() {
        println!("{key}={value}");
    }
    Ok(())
}

/// Seeds `currentView` / `currentSort` from `default.view` / `default.sort`
/// when no preference has been saved yet.
#[instrument(skip(board, cfg))]
pub fn seed_preferences(board: &Board, cfg: &Config) -> anyhow::Result<()> {
    let kv = board.gateway().kv();
    let view_missing = kv.get(CURRENT_VIEW_KEY)?.is_none();
    let sort_missing = kv.get(CURRENT_SORT_KEY)?.is_none();
    if !view_missing && !sort_missing {
        return Ok(());
    }

    let mut prefs = board.gateway().load_preferences();
    if view_missing && let Some(view) = cfg.get("default.view") {
        prefs.current_view = resolve_selector(board, &view).unwrap_or_else(|err| {
            warn!(view = %view, error = %err, "default.view does not resolve; using all");
            ViewSelector::All
        });
    }
    if sort_missing && let Some(sort) = cfg.get("default.sort") {
        prefs.current_sort = SortKey::parse(&sort);
    }
    debug!(view = %prefs.current_view, sort = %prefs.current_sort, "seeding preferences from config");
    board.gateway().save_preferences(&prefs)
}

fn parse_due(raw: &str, today: NaiveDate) -> anyhow::Result<NaiveDate> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "today" => Ok(today),
        "tomorrow" => today
            .checked_add_days(Days::new(1))
            .ok_or_else(|| anyhow!("date out of range")),
        other => parse_date(other).ok_or_else(|| anyhow!("invalid due date: {raw} (expected YYYY-MM-DD)")),
    }
}

fn parse_clock(raw: &str) -> anyhow::Result<chrono::NaiveTime> {
    parse_time(raw).ok_or_else(|| anyhow!("invalid time: {raw} (expected HH:MM)"))
}

/// Exact id, then unique id prefix. `None` when nothing matches.
pub fn resolve_task(board: &Board, raw: &str) -> anyhow::Result<Option<TaskId>> {
    let raw = raw.trim();
    if let Some(task) = board.tasks().iter().find(|task| task.id.as_str() == raw) {
        return Ok(Some(task.id.clone()));
    }

    let matches: Vec<&TaskId> = board
        .tasks()
        .iter()
        .map(|task| &task.id)
        .filter(|id| !raw.is_empty() && id.as_str().starts_with(raw))
        .collect();
    match matches.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some((*only).clone())),
        _ => Err(anyhow!("ambiguous task id prefix: {raw}")),
    }
}

/// Exact id, unique id prefix, or case-insensitive name.
pub fn resolve_category(board: &Board, raw: &str) -> anyhow::Result<CategoryId> {
    let raw = raw.trim();
    let categories = board.categories();

    if let Some(category) = categories.iter().find(|c| c.id.as_str() == raw) {
        return Ok(category.id.clone());
    }

    let by_name: Vec<&CategoryId> = categories
        .iter()
        .filter(|c| c.name.eq_ignore_ascii_case(raw))
        .map(|c| &c.id)
        .collect();
    if let [only] = by_name.as_slice() {
        return Ok((*only).clone());
    }

    let by_prefix: Vec<&CategoryId> = categories
        .iter()
        .filter(|c| !raw.is_empty() && c.id.as_str().starts_with(raw))
        .map(|c| &c.id)
        .collect();
    match by_prefix.as_slice() {
        [only] => Ok((*only).clone()),
        [] if by_name.is_empty() => Err(anyhow!("unknown category: {raw}")),
        _ => Err(anyhow!("ambiguous category: {raw}")),
    }
}

/// Like [`ViewSelector::parse`], but `category:` may name the category.
fn resolve_selector(board: &Board, raw: &str) -> anyhow::Result<ViewSelector> {
    match ViewSelector::parse(raw) {
        ViewSelector::Category(id) => {
            let id = resolve_category(board, id.as_str())?;
            Ok(ViewSelector::Category(id))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::{parse_due, resolve_category, resolve_selector, resolve_task, seed_preferences};
    use crate::board::Board;
    use crate::config::Config;
    use crate::gateway::Gateway;
    use crate::task::TaskDraft;
    use crate::view::{SortKey, ViewSelector};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
    }

    fn board() -> Board {
        Board::open(Gateway::in_memory(), Utc::now(), today()).unwrap()
    }

    #[test]
    fn due_keywords_resolve_against_today() {
        assert_eq!(parse_due("today", today()).unwrap(), today());
        assert_eq!(
            parse_due("Tomorrow", today()).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 11).unwrap()
        );
        assert!(parse_due("next week", today()).is_err());
    }

    #[test]
    fn task_ids_resolve_by_prefix() {
        let mut board = board();
        let id = board.add_task(TaskDraft::new("x"), Utc::now()).unwrap();
        let prefix = &id.as_str()[..id.as_str().len() - 2];
        assert_eq!(resolve_task(&board, id.as_str()).unwrap(), Some(id.clone()));
        assert_eq!(resolve_task(&board, prefix).unwrap(), Some(id));
        assert_eq!(resolve_task(&board, "zzzz-nothing").unwrap(), None);
    }

    #[test]
    fn categories_resolve_by_name() {
        let board = board();
        let work = board.categories()[0].id.clone();
        assert_eq!(resolve_category(&board, "work").unwrap(), work);
        assert!(resolve_category(&board, "Gardening").is_err());
        assert_eq!(
            resolve_selector(&board, "category:Work").unwrap(),
            ViewSelector::Category(work)
        );
    }

    #[test]
    fn config_defaults_seed_missing_preferences_only() {
        let board = board();
        let mut cfg = Config::default();
        cfg.apply_overrides([
            ("default.view".to_string(), "today".to_string()),
            ("default.sort".to_string(), "name-asc".to_string()),
        ])
        .unwrap();
        seed_preferences(&board, &cfg).unwrap();
        let prefs = board.gateway().load_preferences();
        assert_eq!(prefs.current_view, ViewSelector::Today);
        assert_eq!(prefs.current_sort, SortKey::NameAsc);

        cfg.apply_overrides([("default.sort".to_string(), "priority-low".to_string())])
            .unwrap();
        seed_preferences(&board, &cfg).unwrap();
        assert_eq!(board.gateway().load_preferences().current_sort, SortKey::NameAsc);
    }
}
