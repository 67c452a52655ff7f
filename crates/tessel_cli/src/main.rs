//! Tessel CLI
//!
//! Command-line tools for exploring a Tessel database snapshot.
//!
//! # Commands
//!
//! - `inspect` - Display collections, indexes and record counts
//! - `query` - Run a query and print matching records as JSON lines
//! - `count` - Count matching records

mod commands;

use clap::{Parser, Subcommand};
use commands::query::QueryArgs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Tessel command-line query tools.
#[derive(Parser)]
#[command(name = "tessel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a JSON database dump
    #[arg(global = true, short, long)]
    data: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display collections, indexes and record counts
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run a query and print matching records
    Query {
        /// Collection to query
        collection: String,

        /// Index to scan instead of the primary key
        #[arg(short, long)]
        index: Option<String>,

        /// Condition as JSON, e.g. '{"gte": 10, "lt": 20}' or a bare key
        #[arg(short = 'w', long = "where")]
        condition: Option<String>,

        /// Result order (asc, desc)
        #[arg(short, long, default_value = "asc")]
        order: String,

        /// Maximum number of records
        #[arg(short, long)]
        limit: Option<u32>,

        /// Number of records to skip
        #[arg(long, default_value = "0")]
        offset: u32,

        /// Print the resolved plan before the results
        #[arg(short, long)]
        explain: bool,
    },

    /// Count matching records
    Count {
        /// Collection to count
        collection: String,

        /// Index to scan instead of the primary key
        #[arg(short, long)]
        index: Option<String>,

        /// Condition as JSON
        #[arg(short = 'w', long = "where")]
        condition: Option<String>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut out = std::io::stdout().lock();
    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.data.ok_or("Dump path required for inspect")?;
            let engine = commands::load(&path)?;
            commands::inspect::run(&engine, &format, &mut out)?;
        }
        Commands::Query {
            collection,
            index,
            condition,
            order,
            limit,
            offset,
            explain,
        } => {
            let path = cli.data.ok_or("Dump path required for query")?;
            let db = commands::open(&path)?;
            let args = QueryArgs {
                collection,
                index,
                filter: commands::parse_condition(condition.as_deref())?,
                order: order.parse()?,
                limit,
                offset,
                explain,
            };
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(commands::query::run(&db, &args, &mut out))?;
        }
        Commands::Count {
            collection,
            index,
            condition,
        } => {
            let path = cli.data.ok_or("Dump path required for count")?;
            let db = commands::open(&path)?;
            let filter = commands::parse_condition(condition.as_deref())?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(commands::count::run(
                &db,
                &collection,
                index.as_deref(),
                filter,
                &mut out,
            ))?;
        }
        Commands::Version => {
            println!("Tessel CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Tessel Core v{}", tessel_core::VERSION);
        }
    }

    Ok(())
}
