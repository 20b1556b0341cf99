// Command-line front end: argument parsing, confirmation prompts, table output

use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Result, eyre};
use std::io::{self, Write};
use std::path::PathBuf;
use tasklist::models::parse_date_input;
use tasklist::view::EMPTY_VIEW_PLACEHOLDER;
use tasklist::{Config, Renderer, Stats, TaskError, TaskRow, TaskStore};

/// Characters of the id shown in tables
const SHORT_ID_LEN: usize = 8;

#[derive(Parser)]
#[command(name = "tasklist")]
#[command(about = "tasklist - add, complete, filter, sort and search your tasks")]
#[command(version = env!("GIT_DESCRIBE"))]
pub struct Cli {
    /// Path to the config file (default: <config dir>/tasklist/tasklist.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the task data (overrides the config)
    #[arg(short, long, global = true)]
    pub store_path: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a task
    Add {
        name: String,

        /// Due date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Show tasks with statistics
    List {
        /// all, pending or completed
        #[arg(short, long, default_value = "all")]
        filter: String,

        /// Only show tasks whose name contains this text
        #[arg(short = 'q', long)]
        search: Option<String>,

        /// none, name or date
        #[arg(short = 'o', long)]
        sort: Option<String>,
    },

    /// Toggle a task between pending and completed
    Done { id: String },

    /// Rename a task
    Rename { id: String, name: String },

    /// Delete a task
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete all tasks
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show task counts and progress
    Stats,
}

pub fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(path) = cli.store_path {
        config.storage.path = Some(path);
    }
    if cli.no_color || !config.display.color {
        colored::control::set_override(false);
    }

    let mut store = config.open_store()?;

    match cli.command {
        Commands::Add { name, date } => {
            let date = parse_date_input(date.as_deref().unwrap_or(""))?;
            let id = store.create(&name, date)?;
            println!("Added {} {}", short_id(&id).dimmed(), name.trim());
        }
        Commands::List { filter, search, sort } => {
            store.set_filter(&filter);
            if let Some(query) = search {
                store.set_search(&query);
            }
            if let Some(mode) = sort {
                store.set_sort(&mode)?;
            }
            TerminalRenderer.render(&store.render_rows(), &store.compute_stats());
        }
        Commands::Done { id } => {
            let id = resolve(&store, &id)?;
            store.toggle_complete(&id)?;
            if let Some(task) = store.get(&id) {
                println!("{} {}", task.name, status_label(task.status_label(), task.completed));
            }
        }
        Commands::Rename { id, name } => {
            let id = resolve(&store, &id)?;
            if store.rename(&id, &name)? {
                println!("Renamed {} to {}", short_id(&id).dimmed(), name.trim());
            } else {
                println!("Task name unchanged");
            }
        }
        Commands::Delete { id, yes } => {
            let id = resolve(&store, &id)?;
            if yes || confirm("Delete this task?")? {
                store.delete(&id)?;
                println!("Deleted {}", short_id(&id).dimmed());
            } else {
                println!("Cancelled");
            }
        }
        Commands::Clear { yes } => {
            if store.is_empty() {
                return Err(TaskError::EmptyCollection.into());
            }
            if yes || confirm("Delete ALL tasks? This cannot be undone.")? {
                let count = store.delete_all()?;
                println!("Deleted {} task(s)", count);
            } else {
                println!("Cancelled");
            }
        }
        Commands::Stats => {
            for line in format_stats(&store.compute_stats()) {
                println!("{}", line);
            }
        }
    }

    Ok(())
}

/// Prints the task table and statistics to stdout
struct TerminalRenderer;

impl Renderer for TerminalRenderer {
    fn render(&mut self, rows: &[TaskRow], stats: &Stats) {
        for line in format_table(rows) {
            println!("{}", line);
        }
        println!();
        for line in format_stats(stats) {
            println!("{}", line);
        }
    }
}

fn format_table(rows: &[TaskRow]) -> Vec<String> {
    if rows.is_empty() {
        return vec![EMPTY_VIEW_PLACEHOLDER.dimmed().to_string()];
    }

    let name_width = rows.iter().map(|r| r.name.chars().count()).max().unwrap_or(0).max(4);
    let date_width = rows.iter().map(|r| r.date.chars().count()).max().unwrap_or(0).max(4);

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        format!(
            "{:<id_w$}  {:<name_w$}  {:<date_w$}  STATUS",
            "ID",
            "NAME",
            "DATE",
            id_w = SHORT_ID_LEN,
            name_w = name_width,
            date_w = date_width
        )
        .bold()
        .to_string(),
    );

    for row in rows {
        let name = format!("{:<width$}", row.name, width = name_width);
        let name = if row.completed { name.strikethrough().to_string() } else { name };
        let id = format!("{:<width$}", short_id(&row.id), width = SHORT_ID_LEN);
        lines.push(format!(
            "{}  {}  {:<date_w$}  {}",
            id.dimmed(),
            name,
            row.date,
            status_label(row.status_label, row.completed),
            date_w = date_width
        ));
    }

    lines
}

fn format_stats(stats: &Stats) -> Vec<String> {
    vec![
        format!("Total:     {}", stats.total),
        format!("Pending:   {}", stats.pending),
        format!("Completed: {}", stats.completed),
        format!("Progress:  {}%", stats.percent_complete),
    ]
}

fn status_label(label: &str, completed: bool) -> String {
    if completed {
        label.green().to_string()
    } else {
        label.yellow().to_string()
    }
}

/// Trailing characters of an id; the leading ones are a timestamp shared by nearby tasks
fn short_id(id: &str) -> &str {
    let start = id.len().saturating_sub(SHORT_ID_LEN);
    id.get(start..).unwrap_or(id)
}

fn resolve(store: &TaskStore, fragment: &str) -> Result<String> {
    store
        .resolve_id(fragment)
        .map(str::to_string)
        .ok_or_else(|| eyre!("No single task matches id '{}'", fragment))
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
