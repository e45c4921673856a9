//! Peanut - an autonomous task agent that works for peanuts

use clap::{Parser, Subcommand};
use tracing::error;

mod commands;

use commands::{
    init_command, jobs_add_command, jobs_list_command, jobs_remove_command, run_command,
    status_command,
};

/// Peanut - task in, peanut out
#[derive(Parser)]
#[command(name = "peanut")]
#[command(about = "An autonomous task agent that works for peanuts")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config and workspace
    Init,
    /// Run a task to completion
    Run {
        /// The task to perform
        task: String,
    },
    /// Show agent status
    Status,
    /// Manage scheduled jobs
    Jobs {
        #[command(subcommand)]
        command: JobCommands,
    },
}

#[derive(Subcommand)]
enum JobCommands {
    /// List scheduled jobs
    List,
    /// Add a scheduled job
    Add {
        /// The task to schedule
        #[arg(short, long)]
        task: String,
        /// Interval in seconds
        #[arg(short, long)]
        every: Option<u64>,
        /// Cron expression (five fields)
        #[arg(short, long)]
        cron: Option<String>,
    },
    /// Remove a job
    Remove { id: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt().with_env_filter("debug").init();
    } else {
        tracing_subscriber::fmt::init();
    }

    match cli.command {
        Commands::Init => {
            if let Err(e) = init_command().await {
                error!("Init failed: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Run { task } => match run_command(task).await {
            Ok(success) => {
                if !success {
                    std::process::exit(1);
                }
            }
            Err(e) => {
                error!("Run failed: {}", e);
                std::process::exit(1);
            }
        },
        Commands::Status => {
            if let Err(e) = status_command().await {
                error!("Status failed: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Jobs { command } => match command {
            JobCommands::List => {
                if let Err(e) = jobs_list_command().await {
                    error!("Jobs list failed: {}", e);
                    std::process::exit(1);
                }
            }
            JobCommands::Add { task, every, cron } => {
                if let Err(e) = jobs_add_command(task, every, cron).await {
                    error!("Jobs add failed: {}", e);
                    std::process::exit(1);
                }
            }
            JobCommands::Remove { id } => {
                if let Err(e) = jobs_remove_command(id).await {
                    error!("Jobs remove failed: {}", e);
                    std::process::exit(1);
                }
            }
        },
    }
}
