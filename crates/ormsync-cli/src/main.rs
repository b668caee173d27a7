//! ORMSYNC Command-Line Client
//!
//! Generates, applies and rolls back schema migrations from entity descriptors.

mod executor;
mod formatter;

use clap::{Parser, Subcommand};
use formatter::OutputFormat;
use ormsync_core::MigrationConfig;
use std::path::PathBuf;

/// ORMSYNC Command-Line Client
#[derive(Parser, Debug)]
#[command(name = "ormsync")]
#[command(version, about = "Schema migrations from entity descriptors")]
pub struct Args {
    /// Database URL (sqlite://path, a file path, or mysql://...)
    #[arg(short = 'd', long, env = "ORMSYNC_DATABASE_URL", default_value = "sqlite://ormsync.db")]
    pub database: String,

    /// Directory holding migration scripts
    #[arg(long, env = "ORMSYNC_MIGRATIONS_DIR", default_value = "./migrations")]
    pub migrations_dir: PathBuf,

    /// Name of the migration history table
    #[arg(long, env = "ORMSYNC_HISTORY_TABLE", default_value = "migrations")]
    pub history_table: String,

    /// Run scripts outside a transaction
    #[arg(long, env = "ORMSYNC_NO_TRANSACTION")]
    pub no_transaction: bool,

    /// Output format
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Diff entity descriptors against the database and write a migration
    Generate {
        /// JSON file of entity descriptors
        #[arg(short = 'e', long, env = "ORMSYNC_ENTITIES")]
        entities: Option<PathBuf>,

        /// Restrict generation to these entities (repeatable)
        #[arg(long = "entity")]
        entity: Vec<String>,

        /// Print the SQL instead of writing a migration
        #[arg(long)]
        dry_run: bool,
    },

    /// Apply pending migrations
    Migrate {
        /// List pending migrations without applying them
        #[arg(long)]
        dry_run: bool,
    },

    /// Roll back the most recent migrations
    Rollback {
        /// Number of migrations to roll back
        #[arg(long, default_value_t = 1)]
        steps: usize,
    },

    /// Show applied, rolled-back and pending migrations
    Status,
}

impl Args {
    /// Build the migration configuration.
    pub fn into_config(&self) -> MigrationConfig {
        MigrationConfig::new()
            .with_migrations_dir(self.migrations_dir.clone())
            .with_history_table(self.history_table.clone())
            .with_transaction(!self.no_transaction)
    }
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ormsync=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.into_config();
    let conn = ormsync_core::connection::open(&args.database)?;
    tracing::debug!(driver = %conn.driver(), "connected");

    let formatter = formatter::create_formatter(args.format);
    let output = executor::execute(&*conn, config, &args.command, &*formatter)?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}
