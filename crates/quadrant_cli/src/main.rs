//! `quadrant` command-line driver.
//!
//! # Responsibility
//! - Load `CoreConfig`, apply flag overrides, and start logging.
//! - Run one repository intent per invocation and print the matrix.
//!
//! Failed intents print the user-facing message and exit non-zero.

use clap::{Parser, Subcommand};
use log::info;
use quadrant_core::{
    init_logging_from_config, CoreConfig, MatrixViewModel, MatrixViewState, NewTodo, Priority,
    Quadrant, SqliteTodoStore, Todo, TodoError, TodoId, TodoRepository,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

const VIEW_SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(name = "quadrant", version, about = "Eisenhower-matrix todo list")]
struct Cli {
    /// SQLite database file; overrides the config value.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// JSON config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Absolute directory for rolling log files.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prints core linkage info.
    Ping,
    /// Adds a todo.
    Add {
        title: String,
        /// Quadrant name or label, e.g. `urgent-important` or `"Do First"`.
        #[arg(long, short, default_value = "urgent-important")]
        quadrant: String,
        #[arg(long, short, default_value = "")]
        description: String,
        /// Due date in Unix epoch milliseconds.
        #[arg(long)]
        due: Option<i64>,
        /// 1 (low) to 3 (high).
        #[arg(long)]
        priority: Option<i64>,
    },
    /// Prints the matrix.
    List {
        #[arg(long, default_value = "")]
        query: String,
        #[arg(long)]
        hide_completed: bool,
    },
    Toggle {
        id: String,
    },
    Move {
        id: String,
        quadrant: String,
    },
    Delete {
        id: String,
    },
    ClearCompleted,
    /// Case-sensitive search over titles and descriptions.
    Search {
        text: String,
    },
    /// Todos due after now, soonest first.
    Upcoming,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<TodoError>() {
                Some(todo_err) => eprintln!("error: {}", todo_err.user_message()),
                None => eprintln!("error: {err}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Command::Ping = cli.command {
        println!("quadrant_core ping={}", quadrant_core::ping());
        println!("quadrant_core version={}", quadrant_core::core_version());
        return Ok(());
    }

    let config = load_config(&cli)?;
    if init_logging_from_config(&config)? {
        info!(
            "event=cli_start module=cli status=ok db_path={}",
            config.db_path.display()
        );
    }

    let store = SqliteTodoStore::open(&config.db_path)?;
    let repo = Arc::new(TodoRepository::new(store));
    let view = MatrixViewModel::new(Arc::clone(&repo), config.idle_grace())?;

    match cli.command {
        Command::Ping => {}
        Command::Add {
            title,
            quadrant,
            description,
            due,
            priority,
        } => {
            let mut request = NewTodo::new(title, quadrant.parse::<Quadrant>()?)
                .description(description)
                .due_date(due);
            if let Some(value) = priority {
                request = request.priority(parse_priority(value)?);
            }
            let todo = view.add_task(request).await?;
            println!("added {}", todo.id);
            print_matrix(&view).await?;
        }
        Command::List {
            query,
            hide_completed,
        } => {
            view.set_search_query(query);
            if hide_completed {
                view.toggle_show_completed();
            }
            print_matrix(&view).await?;
        }
        Command::Toggle { id } => {
            let todo = view.toggle_completion(parse_id(&id)?).await?;
            println!("{}", format_todo(&todo));
        }
        Command::Move { id, quadrant } => {
            let todo = view
                .move_to_quadrant(parse_id(&id)?, quadrant.parse::<Quadrant>()?)
                .await?;
            println!("moved {} to {}", todo.id, todo.quadrant);
            print_matrix(&view).await?;
        }
        Command::Delete { id } => {
            let id = parse_id(&id)?;
            view.delete_task(id).await?;
            println!("deleted {id}");
        }
        Command::ClearCompleted => {
            let removed = view.clear_completed().await?;
            println!("removed {removed} completed todo(s)");
        }
        Command::Search { text } => {
            let hits = repo.search_tasks(text).snapshot().await?;
            print_list(&hits);
        }
        Command::Upcoming => {
            let upcoming = repo.upcoming().snapshot().await?;
            print_list(&upcoming);
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<CoreConfig, Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => CoreConfig::from_json_file(path)?,
        None => CoreConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir = Some(dir.clone());
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    Ok(config)
}

fn parse_id(raw: &str) -> Result<TodoId, Box<dyn Error>> {
    TodoId::parse_str(raw.trim()).map_err(|err| format!("invalid todo id `{raw}`: {err}").into())
}

fn parse_priority(value: i64) -> Result<Priority, Box<dyn Error>> {
    Priority::from_value(value).ok_or_else(|| format!("priority must be 1..=3, got {value}").into())
}

async fn print_matrix(view: &MatrixViewModel<SqliteTodoStore>) -> Result<(), Box<dyn Error>> {
    let mut subscription = view.subscribe();
    let state = tokio::time::timeout(
        VIEW_SETTLE_TIMEOUT,
        subscription.wait_for(|state| !state.is_loading),
    )
    .await
    .map_err(|_| "timed out waiting for the matrix")?
    .ok_or("matrix view closed")?;
    print!("{}", render_matrix(&state));
    Ok(())
}

fn print_list(todos: &[Todo]) {
    if todos.is_empty() {
        println!("(none)");
    }
    for todo in todos {
        println!("{}", format_todo(todo));
    }
}

fn render_matrix(state: &MatrixViewState) -> String {
    let mut out = String::new();
    for bucket in &state.quadrants {
        out.push_str(&format!(
            "== {} ({}) ==\n",
            bucket.title,
            bucket.quadrant.as_name()
        ));
        if bucket.todos.is_empty() {
            out.push_str("  (empty)\n");
        }
        for todo in &bucket.todos {
            out.push_str(&format!("  {}\n", format_todo(todo)));
        }
    }
    if let Some(error) = &state.error {
        out.push_str(&format!("! {error}\n"));
    }
    out
}

fn format_todo(todo: &Todo) -> String {
    let mark = if todo.is_completed { 'x' } else { ' ' };
    let mut line = format!(
        "[{mark}] {} {} (p{})",
        todo.id,
        todo.title,
        todo.priority.value()
    );
    if let Some(due) = todo.due_date {
        line.push_str(&format!(" due={due}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::{format_todo, render_matrix, Cli, Command};
    use clap::Parser;
    use quadrant_core::{MatrixViewState, Quadrant, QuadrantState, Todo};

    #[test]
    fn parses_add_with_global_flags() {
        let cli = Cli::try_parse_from([
            "quadrant",
            "--db",
            "/tmp/todos.sqlite3",
            "add",
            "Write report",
            "--quadrant",
            "schedule",
            "--due",
            "1000",
        ])
        .unwrap();
        assert_eq!(cli.db.unwrap().to_str(), Some("/tmp/todos.sqlite3"));
        match cli.command {
            Command::Add {
                title,
                quadrant,
                due,
                priority,
                ..
            } => {
                assert_eq!(title, "Write report");
                assert_eq!(quadrant.parse::<Quadrant>().unwrap(), Quadrant::NotUrgentImportant);
                assert_eq!(due, Some(1000));
                assert_eq!(priority, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_kebab_case_subcommand() {
        let cli = Cli::try_parse_from(["quadrant", "clear-completed"]).unwrap();
        assert!(matches!(cli.command, Command::ClearCompleted));
    }

    #[test]
    fn renders_every_bucket_and_error() {
        let mut todo = Todo::create("Write report", "", Quadrant::UrgentImportant, 1).unwrap();
        todo.is_completed = true;
        todo.due_date = Some(42);

        let mut state = MatrixViewState::loading();
        state.quadrants[0] = QuadrantState::new(Quadrant::UrgentImportant, vec![todo.clone()]);
        state.error = Some("Todo not found".to_string());

        let rendered = render_matrix(&state);
        assert!(rendered.contains("== Do First (URGENT_IMPORTANT) =="));
        assert_eq!(rendered.matches("(empty)").count(), 3);
        assert!(rendered.contains(&format_todo(&todo)));
        assert!(format_todo(&todo).starts_with("[x] "));
        assert!(format_todo(&todo).ends_with("due=42"));
        assert!(rendered.ends_with("! Todo not found\n"));
    }
}
