//! EBS CLI - evidence-based scheduling from the terminal.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use ebs_core::{CoreError, Task, TaskUpdate};
use ebs_progress::{ErrorKind, Report, TaskTracker, TrackerError};
use ebs_storage::{JsonStorage, DEFAULT_DATA_FILE};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ebs")]
#[command(about = "Evidence-based scheduling: learn from past estimates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Snapshot file holding all tasks
    #[arg(short, long, env = "EBS_DATA_FILE", default_value = DEFAULT_DATA_FILE, global = true)]
    data_file: PathBuf,

    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a new task
    Add {
        /// Task name
        name: String,
        /// Estimated hours
        hours: String,
    },
    /// Record hours worked on a task
    Record {
        /// Task name
        name: String,
        /// Hours worked
        hours: String,
    },
    /// Mark a task as completed
    Finish {
        /// Task name
        name: String,
        /// Finish even if no time was recorded
        #[arg(long)]
        force: bool,
    },
    /// Rename a task or change its estimate
    Modify {
        /// Task name
        name: String,
        /// New task name
        #[arg(long = "name", value_name = "NEW_NAME")]
        new_name: Option<String>,
        /// New estimated hours
        #[arg(long)]
        estimate: Option<String>,
    },
    /// Delete a task and all of its recorded time
    Delete {
        /// Task name
        name: String,
    },
    /// Delete one recorded time segment
    DeleteSegment {
        /// Task name
        name: String,
        /// Segment number as shown by `show` (starting at 1)
        position: usize,
    },
    /// List tasks
    List {
        /// Only tasks whose name contains this text (case-insensitive)
        #[arg(long)]
        search: Option<String>,
        /// Only tasks that are not completed
        #[arg(long)]
        unfinished: bool,
    },
    /// Show a task and its recorded time
    Show {
        /// Task name
        name: String,
    },
    /// Predict how long an estimate will actually take
    Predict {
        /// Total estimated hours
        hours: String,
    },
    /// Show velocity, completion rate and estimation errors
    Analyze {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            exit_code(&err)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    debug!("Using snapshot {}", cli.data_file.display());
    let storage = JsonStorage::new(&cli.data_file);
    let mut tracker = TaskTracker::load(storage)
        .await
        .with_context(|| format!("Failed to load {}", cli.data_file.display()))?;

    match cli.command {
        Commands::Add { name, hours } => {
            let task = tracker.add_task(&name, parse_hours(&hours)?).await?;
            println!("Added task '{}' ({:.2} h estimated)", task.name(), task.estimated_hours());
        }
        Commands::Record { name, hours } => {
            let segment = tracker.add_segment(&name, parse_hours(&hours)?).await?;
            println!("Recorded {:.2} h on '{}'", segment.hours, name.trim());
        }
        Commands::Finish { name, force } => {
            let task = tracker.task(&name).ok_or_else(|| not_found(&name))?;
            if task.segments().is_empty() && !force {
                bail!(
                    "Task '{}' has no recorded time; use --force to finish it anyway",
                    task.name()
                );
            }
            let task = tracker.finish_task(&name).await?;
            println!(
                "Finished '{}' ({:.2} h recorded)",
                task.name(),
                task.total_hours()
            );
            println!("Velocity is now {:.2}", tracker.velocity());
        }
        Commands::Modify {
            name,
            new_name,
            estimate,
        } => {
            let update = TaskUpdate {
                new_name,
                estimated_hours: estimate.as_deref().map(parse_hours).transpose()?,
            };
            if update.is_empty() {
                bail!("Nothing to change; pass --name and/or --estimate");
            }
            tracker.modify_task(&name, &update).await?;
            println!("Task '{}' updated", name.trim());
        }
        Commands::Delete { name } => {
            let task = tracker.delete_task(&name).await?;
            println!(
                "Deleted '{}' and {} time segment(s)",
                task.name(),
                task.segments().len()
            );
        }
        Commands::DeleteSegment { name, position } => {
            let index = position
                .checked_sub(1)
                .ok_or_else(|| anyhow!("Segment numbers start at 1"))?;
            let segment = tracker.delete_segment(&name, index).await?;
            println!(
                "Deleted segment {} ({:.2} h) from '{}'",
                position,
                segment.hours,
                name.trim()
            );
        }
        Commands::List { search, unfinished } => {
            let store = tracker.store();
            let tasks: Vec<&Task> = match &search {
                Some(pattern) => store
                    .search(pattern)
                    .filter(|t| !unfinished || !t.is_completed())
                    .collect(),
                None if unfinished => store.unfinished().collect(),
                None => store.tasks().iter().collect(),
            };

            println!("Tasks ({})", tasks.len());
            for task in tasks {
                println!("  {}", format_task_line(task));
            }
        }
        Commands::Show { name } => {
            let task = tracker.task(&name).ok_or_else(|| not_found(&name))?;
            print_task(task);
        }
        Commands::Predict { hours } => {
            let predicted = tracker.predict(parse_hours(&hours)?)?;
            println!("Predicted time to complete: {predicted:.2} h (velocity {:.2})", tracker.velocity());
        }
        Commands::Analyze { json } => {
            let report = tracker.analyze();
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
    }

    Ok(())
}

/// Parse a raw hour argument. Range checks belong to the engine.
fn parse_hours(raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| anyhow!("Hours must be a number, got '{raw}'"))
}

fn not_found(name: &str) -> TrackerError {
    CoreError::TaskNotFound(name.trim().to_string()).into()
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<TrackerError>().map(TrackerError::kind) {
        Some(ErrorKind::Validation) => ExitCode::from(2),
        Some(ErrorKind::NotFound) => ExitCode::from(3),
        Some(ErrorKind::Io) => ExitCode::from(4),
        None => ExitCode::FAILURE,
    }
}

fn format_status(task: &Task) -> &'static str {
    if task.is_completed() {
        "DONE"
    } else if task.segments().is_empty() {
        "NEW"
    } else {
        "ACTIVE"
    }
}

fn format_task_line(task: &Task) -> String {
    let actual = match task.actual_hours() {
        Some(hours) => format!("{hours:.2}"),
        None => "-".to_string(),
    };
    format!(
        "{:<6} | est {:>7.2} h | spent {:>7} h | {}",
        format_status(task),
        task.estimated_hours(),
        actual,
        task.name()
    )
}

fn print_task(task: &Task) {
    println!("Task: {}", task.name());
    println!("  Status: {}", format_status(task));
    println!("  Estimated: {:.2} h", task.estimated_hours());
    println!("  Started: {}", task.start_time().with_timezone(&Local).format("%Y-%m-%d %H:%M"));
    if let Some(end) = task.end_time() {
        println!("  Last activity: {}", end.with_timezone(&Local).format("%Y-%m-%d %H:%M"));
    }
    if task.segments().is_empty() {
        println!("  No time recorded");
        return;
    }
    println!("  Total: {:.2} h", task.total_hours());
    for (i, segment) in task.segments().iter().enumerate() {
        println!(
            "  {}. {:.2} h ({})",
            i + 1,
            segment.hours,
            segment.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        );
    }
}

fn print_report(report: &Report<'_>) {
    println!("Average velocity: {:.2}", report.avg_velocity);
    println!("Completion rate: {:.2}%", report.completion_rate);
    println!(
        "Tasks: {} (completed: {}, pending: {})",
        report.total_tasks, report.completed_tasks, report.pending_tasks
    );

    if report.errors.is_empty() {
        println!("No completed tasks with recorded time yet");
        return;
    }

    println!("Estimation error:");
    for error in &report.errors {
        println!(
            "  {:>+8.2}% | est {:>7.2} h | actual {:>7.2} h | {}",
            error.error_pct, error.estimated, error.actual, error.name
        );
    }

    let trend: Vec<String> = report
        .velocity_trend
        .clone()
        .map(|v| format!("{v:.2}"))
        .collect();
    println!("Velocity trend: {}", trend.join(" -> "));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hours() {
        assert_eq!(parse_hours("2.5").unwrap(), 2.5);
        assert_eq!(parse_hours(" 3 ").unwrap(), 3.0);
        assert!(parse_hours("two").is_err());
        // Sign is the engine's business.
        assert_eq!(parse_hours("-1").unwrap(), -1.0);
    }

    #[test]
    fn test_cli_parses_modify() {
        let cli = Cli::try_parse_from([
            "ebs", "--data-file", "x.json", "modify", "Old", "--name", "New", "--estimate", "4",
        ])
        .unwrap();
        assert_eq!(cli.data_file, PathBuf::from("x.json"));
        match cli.command {
            Commands::Modify {
                name,
                new_name,
                estimate,
            } => {
                assert_eq!(name, "Old");
                assert_eq!(new_name.as_deref(), Some("New"));
                assert_eq!(estimate.as_deref(), Some("4"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_delete_segment() {
        let cli = Cli::try_parse_from(["ebs", "delete-segment", "Task", "2", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::DeleteSegment { position: 2, .. }
        ));
    }

    #[test]
    fn test_exit_codes_follow_error_kind() {
        let err: anyhow::Error = not_found("x").into();
        assert_eq!(exit_code(&err), ExitCode::from(3));

        let err = anyhow!("plain failure");
        assert_eq!(exit_code(&err), ExitCode::FAILURE);
    }

    #[test]
    fn test_task_line_shows_dash_without_time() {
        let task = Task::new("Sketch", 2.0, chrono::Utc::now()).unwrap();
        let line = format_task_line(&task);
        assert!(line.starts_with("NEW"));
        assert!(line.contains("spent       - h"));
        assert!(line.ends_with("Sketch"));
    }
}
