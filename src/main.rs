use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use student_analytics::config::Config;
use student_analytics::latest::{latest_summary, level_analysis, second_latest_summary};
use student_analytics::report;
use student_analytics::search::{parse_date_arg, search, SearchCriteria};
use student_analytics::stats::student_stats;
use student_analytics::tools::ToolRegistry;
use student_analytics::StudentDataset;

#[derive(Parser)]
#[command(name = "student-analytics")]
#[command(about = "Weak subject, topic and level analysis over student test results", long_about = None)]
struct Cli {
    /// CSV of per-question results (overrides STUDENT_DATA_PATH)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search results by partial student id, date range, subject or class
    Search {
        #[arg(long)]
        student_id: Option<String>,
        #[arg(long)]
        from_date: Option<String>,
        #[arg(long)]
        to_date: Option<String>,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        class: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Wrong-answer statistics for one student
    Stats {
        #[arg(long)]
        student_id: String,
    },
    /// Latest test of every subject
    Latest {
        #[arg(long)]
        student_id: Option<String>,
    },
    /// Second most recent test of every subject
    SecondLatest {
        #[arg(long)]
        student_id: Option<String>,
    },
    /// One cognitive level across the latest tests
    Level {
        #[arg(long)]
        student_id: String,
        #[arg(long)]
        level: String,
    },
    /// Generate a markdown weak-area report
    Report {
        #[arg(long)]
        student_id: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Invoke an agent tool with JSON arguments
    Tool {
        name: String,
        #[arg(default_value = "{}")]
        args: String,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.rust_log))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let data_path = cli.data.unwrap_or(config.data_path);
    let dataset = StudentDataset::new(data_path);

    match cli.command {
        Commands::Search {
            student_id,
            from_date,
            to_date,
            subject,
            class,
            limit,
        } => {
            let criteria = SearchCriteria {
                student_id,
                from_date: from_date.as_deref().map(parse_date_arg).transpose()?,
                to_date: to_date.as_deref().map(parse_date_arg).transpose()?,
                subject,
                student_class: class,
                limit: Some(limit),
            };
            print_json(&search(&dataset, &criteria)?)?;
        }
        Commands::Stats { student_id } => {
            print_json(&student_stats(&dataset, &student_id)?)?;
        }
        Commands::Latest { student_id } => {
            print_json(&latest_summary(&dataset, student_id.as_deref())?)?;
        }
        Commands::SecondLatest { student_id } => {
            print_json(&second_latest_summary(&dataset, student_id.as_deref())?)?;
        }
        Commands::Level { student_id, level } => {
            print_json(&level_analysis(&dataset, &student_id, &level)?)?;
        }
        Commands::Report { student_id, out } => {
            let latest = latest_summary(&dataset, student_id.as_deref())?;
            let previous = second_latest_summary(&dataset, student_id.as_deref())?;
            let report = report::build_report(&latest, &previous);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write report to {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Tool { name, args } => {
            let args: serde_json::Value =
                serde_json::from_str(&args).context("tool arguments must be a JSON object")?;
            let output = ToolRegistry::with_defaults().call(&dataset, &name, args)?;
            print_json(&output)?;
        }
    }

    Ok(())
}
