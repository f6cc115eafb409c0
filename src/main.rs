use clap::{Args, Parser, Subcommand};
use colored::{ColoredString, Colorize};
use eyre::{Result, eyre};
use std::path::PathBuf;
use taskboard::form::validate_subtask_title;
use taskboard::query::{is_due_soon, is_overdue};
use taskboard::{
    Backend, Config, LogLevel, NewAttachment, Priority, Task, TaskFilter, TaskForm, TaskStatus, TaskStore,
};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload};

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(about = "Taskboard CLI - track tasks across To Do / In Progress / Completed")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to a YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the board data (overrides the config)
    #[arg(short, long)]
    store_path: Option<PathBuf>,

    /// Storage backend: file, sqlite or memory (overrides the config)
    #[arg(long)]
    backend: Option<String>,

    /// Log level: error, warn, info, debug or trace (overrides the config)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a task
    Add {
        title: String,
        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Change fields of a task
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Delete a task with its subtasks, comments and attachments
    Delete { id: String },

    /// Move a task to another column (todo, in-progress, completed)
    Move { id: String, status: String },

    /// Manage subtasks
    #[command(subcommand)]
    Subtask(SubtaskCommand),

    /// Comment on a task
    Comment {
        id: String,
        content: String,
        #[arg(short, long, default_value = "anonymous")]
        author: String,
    },

    /// Attach a link to a task
    Attach {
        id: String,
        name: String,
        url: String,
        /// Attachment type, e.g. a MIME type
        #[arg(short = 'k', long = "type", default_value = "link")]
        kind: String,
    },

    /// Show one task in full
    Show { id: String },

    /// List tasks, optionally filtered
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(short, long)]
        priority: Option<String>,
        #[arg(short, long)]
        assignee: Option<String>,
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// Show the three board columns
    Board,

    /// Completion rate and due-date counts
    Stats,

    /// Open tasks past their due date
    Overdue,

    /// Open tasks due within the next three days
    DueSoon,

    /// Per-day activity heatmap
    Activity {
        #[arg(short, long, default_value_t = 30)]
        days: u32,
    },
}

#[derive(Subcommand)]
enum SubtaskCommand {
    /// Add a subtask
    Add { task_id: String, title: String },
    /// Flip a subtask between done and pending
    Toggle { task_id: String, subtask_id: String },
}

/// Task fields shared by `add` and `edit`
#[derive(Args)]
struct FieldArgs {
    #[arg(short, long)]
    description: Option<String>,
    #[arg(long)]
    status: Option<String>,
    #[arg(short, long)]
    priority: Option<String>,
    /// Due date as YYYY-MM-DD
    #[arg(long)]
    due: Option<String>,
    /// Required when creating a task
    #[arg(short, long)]
    assignee: Option<String>,
    /// Tag (repeatable)
    #[arg(short, long = "tag")]
    tags: Vec<String>,
    /// Estimated effort in minutes
    #[arg(long)]
    estimate: Option<u32>,
    /// Spent effort in minutes
    #[arg(long)]
    spent: Option<u32>,
}

impl FieldArgs {
    fn into_form(self, title: Option<String>) -> TaskForm {
        TaskForm {
            title,
            description: self.description,
            status: self.status,
            priority: self.priority,
            due_date: self.due,
            assignee: self.assignee,
            tags: if self.tags.is_empty() { None } else { Some(self.tags) },
            estimated_minutes: self.estimate,
            spent_minutes: self.spent,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cli_level = cli.log_level.as_deref().map(str::parse::<LogLevel>).transpose()?;

    // Setup tracing before loading config; the level is settled once the config is read
    let initial = cli_level.unwrap_or_default();
    let (filter, level_handle) = reload::Layer::new(LevelFilter::from_level(initial.into()));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(level) = cli_level {
        config.log_level = level;
    }
    if let Some(path) = cli.store_path {
        config.data_dir = Some(path);
    }
    if let Some(backend) = cli.backend.as_deref() {
        config.backend = backend.parse::<Backend>()?;
    }
    level_handle.modify(|filter| *filter = LevelFilter::from_level(config.log_level.into()))?;

    let mut store = config.open_store()?;

    match cli.command {
        Commands::Add { title, fields } => {
            let new = fields.into_form(Some(title)).into_new_task(store.today())?;
            let id = store.add_task(new);
            println!("Created task {}", id.bold());
        }
        Commands::Edit { id, title, fields } => {
            let id = resolve_id(&store, &id)?;
            let current = store.get_task(&id).and_then(|t| t.time_tracking);
            let update = fields.into_form(title).into_update(current)?;
            if update.is_empty() {
                return Err(eyre!("Nothing to change"));
            }
            store.update_task(&id, update);
            println!("Updated task {}", id.bold());
        }
        Commands::Delete { id } => {
            let id = resolve_id(&store, &id)?;
            store.delete_task(&id);
            println!("Deleted task {}", id.bold());
        }
        Commands::Move { id, status } => {
            let id = resolve_id(&store, &id)?;
            let status: TaskStatus = status.parse()?;
            store.move_task(&id, status);
            println!("Moved task {} to {}", id.bold(), status.label());
        }
        Commands::Subtask(SubtaskCommand::Add { task_id, title }) => {
            let task_id = resolve_id(&store, &task_id)?;
            let title = validate_subtask_title(&title)?;
            store.add_subtask(&task_id, title);
            println!("Added subtask to {}", task_id.bold());
        }
        Commands::Subtask(SubtaskCommand::Toggle { task_id, subtask_id }) => {
            let task_id = resolve_id(&store, &task_id)?;
            let known = store
                .get_task(&task_id)
                .is_some_and(|t| t.subtasks.iter().any(|s| s.id == subtask_id));
            if !known {
                return Err(eyre!("Subtask not found: {}", subtask_id));
            }
            store.toggle_subtask(&task_id, &subtask_id);
            println!("Toggled subtask {}", subtask_id.bold());
        }
        Commands::Comment { id, content, author } => {
            let id = resolve_id(&store, &id)?;
            store.add_comment(&id, content.trim(), author.trim());
            println!("Commented on {}", id.bold());
        }
        Commands::Attach { id, name, url, kind } => {
            let id = resolve_id(&store, &id)?;
            store.add_attachment(&id, NewAttachment { name, url, kind });
            println!("Attached to {}", id.bold());
        }
        Commands::Show { id } => {
            let id = resolve_id(&store, &id)?;
            if let Some(task) = store.get_task(&id) {
                print_details(&store, task);
            }
        }
        Commands::List {
            status,
            priority,
            assignee,
            tag,
        } => {
            let filter = TaskFilter {
                status: status.as_deref().map(str::parse).transpose()?,
                priority: priority.as_deref().map(str::parse).transpose()?,
                assignee,
                tag,
            };
            print_list(&store, store.filter(&filter));
        }
        Commands::Board => {
            for status in TaskStatus::ALL {
                let column = store.tasks_by_status(status);
                println!("{} ({})", status.label().bold().underline(), column.len());
                for task in column {
                    print_line(&store, task);
                }
                println!();
            }
        }
        Commands::Stats => {
            let completed = store.tasks_by_status(TaskStatus::Completed).len();
            println!("Completion rate: {}", format!("{:.1}%", store.task_completion()).green());
            println!("Overdue tasks:   {}", store.overdue_tasks().len().to_string().red());
            println!("Due soon:        {}", store.due_soon_tasks().len().to_string().yellow());
            println!("Completed:       {}", completed.to_string().green());
            println!("Total:           {}", store.tasks().len());
        }
        Commands::Overdue => print_list(&store, store.overdue_tasks()),
        Commands::DueSoon => print_list(&store, store.due_soon_tasks()),
        Commands::Activity { days } => {
            for cell in store.activity(days) {
                let bar = "■".repeat(cell.count.min(40));
                println!("{}  {:>3}  {}", cell.date, cell.count, bar.green());
            }
        }
    }

    Ok(())
}

/// Accept a full id or an unambiguous prefix of one
fn resolve_id(store: &TaskStore, input: &str) -> Result<String> {
    let input = input.trim();
    if store.get_task(input).is_some() {
        return Ok(input.to_string());
    }
    let matches: Vec<&Task> = store.tasks().iter().filter(|t| t.id.starts_with(input)).collect();
    match matches.as_slice() {
        [task] => Ok(task.id.clone()),
        [] => Err(eyre!("Task not found: {}", input)),
        _ => Err(eyre!("Ambiguous task id {} ({} matches)", input, matches.len())),
    }
}

fn priority_badge(priority: Priority) -> ColoredString {
    match priority {
        Priority::High => priority.as_str().red(),
        Priority::Medium => priority.as_str().yellow(),
        Priority::Low => priority.as_str().green(),
    }
}

fn due_label(store: &TaskStore, task: &Task) -> ColoredString {
    let due = task.due_date.to_string();
    if is_overdue(task, store.today()) {
        format!("{} (overdue)", due).red()
    } else if is_due_soon(task, store.today()) {
        format!("{} (due soon)", due).yellow()
    } else {
        due.normal()
    }
}

fn print_line(store: &TaskStore, task: &Task) {
    let title = if task.is_completed() {
        task.title.dimmed().strikethrough()
    } else {
        task.title.bold()
    };
    let mut line = format!(
        "  {}  {} [{}] due {}",
        task.id.dimmed(),
        title,
        priority_badge(task.priority),
        due_label(store, task)
    );
    if !task.assignee.is_empty() {
        line.push_str(&format!(" @{}", task.assignee.cyan()));
    }
    for tag in task.tags.iter() {
        line.push_str(&format!(" #{}", tag.blue()));
    }
    if !task.subtasks.is_empty() {
        line.push_str(&format!(" ({}/{})", task.completed_subtasks(), task.subtasks.len()));
    }
    println!("{}", line);
}

fn print_list(store: &TaskStore, tasks: Vec<&Task>) {
    if tasks.is_empty() {
        println!("{}", "No tasks".dimmed());
        return;
    }
    for task in tasks {
        print_line(store, task);
    }
}

fn print_details(store: &TaskStore, task: &Task) {
    println!("{}", task.title.bold().underline());
    println!("  id:        {}", task.id);
    println!("  status:    {}", task.status.label());
    println!("  priority:  {}", priority_badge(task.priority));
    println!("  due:       {}", due_label(store, task));
    if !task.assignee.is_empty() {
        println!("  assignee:  {}", task.assignee);
    }
    if !task.tags.is_empty() {
        println!("  tags:      {}", task.tags.iter().collect::<Vec<_>>().join(", "));
    }
    if let Some(tracking) = task.time_tracking {
        println!("  time:      {}m spent of {}m estimated", tracking.spent, tracking.estimated);
    }
    println!("  created:   {}", task.created_at.to_rfc3339());
    println!("  updated:   {}", task.updated_at.to_rfc3339());
    if !task.description.is_empty() {
        println!("\n{}", task.description);
    }

    if !task.subtasks.is_empty() {
        println!(
            "\n{} ({:.0}% done)",
            "Subtasks".bold(),
            task.subtask_progress()
        );
        for subtask in &task.subtasks {
            let mark = if subtask.completed { "[x]".green() } else { "[ ]".normal() };
            println!("  {} {}  {}", mark, subtask.title, subtask.id.dimmed());
        }
    }

    if !task.comments.is_empty() {
        println!("\n{}", "Comments".bold());
        for comment in &task.comments {
            println!(
                "  {} {}: {}",
                comment.created_at.format("%b %-d, %H:%M").to_string().dimmed(),
                comment.author.cyan(),
                comment.content
            );
        }
    }

    if !task.attachments.is_empty() {
        println!("\n{}", "Attachments".bold());
        for attachment in &task.attachments {
            println!("  {} <{}> ({})", attachment.name, attachment.url, attachment.kind);
        }
    }
}
