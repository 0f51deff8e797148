//! CLI entry point for the nodeweave demo.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use nodeweave_graph::GraphClient;

use nodeweave_demo::config::load_config;
use nodeweave_demo::models::Models;
use nodeweave_demo::populate::populate;
use nodeweave_demo::report::run_queries;

#[derive(Parser)]
#[command(name = "nodeweave-demo")]
#[command(about = "Populate and query the Users/Movies graph")]
struct Cli {
    /// Config file prefix (default: nodeweave).
    #[arg(short, long, default_value = "nodeweave")]
    config: String,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Clear the database and create the demo users, movies, and likes.
    Populate,
    /// Print what the demo queries find.
    Query,
    /// Populate, then query (default).
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let logs = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if cli.log_json {
        logs.json().init();
    } else {
        logs.init();
    }

    let command = cli.command.unwrap_or(Command::Run);
    let config = load_config(&cli.config)?;

    let client = GraphClient::connect(&config.neo4j).await?;
    let models = Models::new(Arc::new(client))?;

    if matches!(command, Command::Populate | Command::Run) {
        let summary = populate(&models, &config.demo).await?;
        if let Some(age) = summary.barry_age_before {
            println!("Barry's age is {age}");
        }
    }

    if matches!(command, Command::Query | Command::Run) {
        for line in run_queries(&models).await? {
            println!("{line}");
        }
    }

    Ok(())
}
