//! glyph: compile symbolic field tokens into table schemas.
//!
//! # Usage
//!
//! ```bash
//! # One table
//! glyph create table posts title:text! body author_id->users --stamps
//!
//! # Show the SQL only
//! glyph create table posts title:text! --dry-run
//!
//! # Many tables from a JSON document
//! glyph from-json schema.json --dir db/schemas
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::*;
use glyph::cli::{self, CreateArgs, FromJsonArgs};
use glyph::settings::Settings;
use glyph::writer::{FORCE_ENV, Force};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "glyph")]
#[command(version)]
#[command(about = "Symbolic table definitions compiled to SQLite DDL", long_about = None)]
#[command(after_help = "EXAMPLES:
    glyph create table users email:text!+ name
    glyph create table posts title:text! 'author_id->users,ondelete=cascade' --stamps
    glyph from-json schema.json
    glyph explain 'price:decimal(10,2)!,default=0'

ENVIRONMENT:
    GLYPH_FORCE=1    overwrite existing tables, same as --force")]
struct Cli {
    /// Print the JSON Schema of the batch document and exit
    #[arg(long)]
    print_json_schema: bool,

    /// Verbose logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a schema artifact
    Create {
        #[command(subcommand)]
        what: CreateCommands,
    },
    /// Create every table in a JSON batch document
    FromJson {
        /// Path to the batch document
        config: PathBuf,

        /// Output directory (overrides the document's outDir)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Overwrite existing tables
        #[arg(short, long)]
        force: bool,

        /// Do not index foreign-key columns
        #[arg(long)]
        no_fk_index: bool,
    },
    /// Show how a single field token is parsed
    Explain {
        /// The field token to explain
        token: String,
    },
    /// Show the flag and attribute reference
    Symbols,
}

#[derive(Subcommand)]
enum CreateCommands {
    /// Create one table from field tokens
    Table {
        /// Table name
        name: String,

        /// Field tokens, e.g. email:text!+ or author_id->users
        fields: Vec<String>,

        /// Output directory
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Append created_at, updated_at and deleted_at
        #[arg(long)]
        stamps: bool,

        /// ON DELETE action for references that do not set one
        #[arg(long = "onDelete", alias = "on-delete", value_name = "ACTION")]
        on_delete: Option<String>,

        /// ON UPDATE action for references that do not set one
        #[arg(long = "onUpdate", alias = "on-update", value_name = "ACTION")]
        on_update: Option<String>,

        /// Overwrite an existing table
        #[arg(short, long)]
        force: bool,

        /// Do not index foreign-key columns
        #[arg(long)]
        no_fk_index: bool,

        /// Print the SQL without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Version recorded in the artifact
        #[arg(long, value_name = "N")]
        schema_version: Option<u32>,
    },
}

fn main() {
    // Resolved before clap sees argv so the variable cannot shift positionals.
    let env_force = Force::from_env();
    let cli = Cli::parse();

    init_tracing(cli.verbose);
    tracing::debug!(env = FORCE_ENV, set = env_force.env, "force override");

    if let Err(e) = run(cli, env_force) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "glyph=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli, env_force: Force) -> anyhow::Result<()> {
    if cli.print_json_schema {
        return cli::print_json_schema();
    }

    match cli.command {
        Some(Commands::Create {
            what:
                CreateCommands::Table {
                    name,
                    fields,
                    dir,
                    stamps,
                    on_delete,
                    on_update,
                    force,
                    no_fk_index,
                    dry_run,
                    schema_version,
                },
        }) => {
            let settings = Settings::load()?;
            let args = CreateArgs {
                name,
                tokens: fields,
                dir,
                stamps,
                on_delete,
                on_update,
                force: env_force.with_flag(force),
                no_fk_index,
                dry_run,
                schema_version,
            };
            cli::run_create(&args, &settings)
        }
        Some(Commands::FromJson {
            config,
            dir,
            force,
            no_fk_index,
        }) => {
            let settings = Settings::load()?;
            let args = FromJsonArgs {
                config,
                dir,
                force: env_force.with_flag(force),
                no_fk_index,
            };
            cli::run_from_json(&args, &settings)
        }
        Some(Commands::Explain { token }) => cli::explain(&token),
        Some(Commands::Symbols) => {
            cli::show_symbols();
            Ok(())
        }
        None => {
            println!("{}", "glyph: symbolic table definitions".cyan().bold());
            println!();
            println!("Usage: glyph create table <NAME> [FIELDS]...");
            println!();
            println!("Try: glyph --help");
            Ok(())
        }
    }
}
