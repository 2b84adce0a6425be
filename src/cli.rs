//! Command runners behind the `glyph` binary.
//!
//! Each runner takes already-parsed arguments, merges them with [`Settings`]
//! and prints results to stdout. Errors bubble up as `anyhow::Error`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::*;

use crate::ast::{FieldSpec, TableSpec};
use crate::batch::{self, BatchDocument};
use crate::compiler::{self, CompileOptions, Generated};
use crate::parser::{self, flags};
use crate::settings::{Settings, parse_action};
use crate::transpiler::{ToSql, index_sql};
use crate::writer::{ArtifactStore, Force, WriteOutcome};

/// `glyph create table <name> [tokens...]`.
#[derive(Debug, Clone, Default)]
pub struct CreateArgs {
    pub name: String,
    pub tokens: Vec<String>,
    pub dir: Option<PathBuf>,
    pub stamps: bool,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
    pub force: Force,
    pub no_fk_index: bool,
    pub dry_run: bool,
    pub schema_version: Option<u32>,
}

/// `glyph from-json <config>`.
#[derive(Debug, Clone, Default)]
pub struct FromJsonArgs {
    pub config: PathBuf,
    pub dir: Option<PathBuf>,
    pub force: Force,
    pub no_fk_index: bool,
}

pub fn run_create(args: &CreateArgs, settings: &Settings) -> Result<()> {
    let opts = CompileOptions {
        version: args.schema_version.unwrap_or(1),
        stamps: args.stamps,
        on_delete: parse_action("--onDelete", args.on_delete.as_deref())?
            .or(settings.default_on_delete()?),
        on_update: parse_action("--onUpdate", args.on_update.as_deref())?
            .or(settings.default_on_update()?),
        fk_index: settings.fk_index && !args.no_fk_index,
    };

    if args.dry_run {
        let table = compiler::build_table(&args.name, &args.tokens, &opts)?;
        print_table_sql(&table);
        return Ok(());
    }

    let dir = args.dir.clone().unwrap_or_else(|| settings.out_dir.clone());
    let store = ArtifactStore::new(dir);
    let generated = compiler::generate(
        &store,
        &args.name,
        &args.tokens,
        &opts,
        args.force,
        &Default::default(),
    )?;
    report(&generated);
    Ok(())
}

pub fn run_from_json(args: &FromJsonArgs, settings: &Settings) -> Result<()> {
    let doc = BatchDocument::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    let dir = args
        .dir
        .clone()
        .or_else(|| doc.out_dir.clone())
        .unwrap_or_else(|| settings.out_dir.clone());
    let store = ArtifactStore::new(dir);

    let base = CompileOptions {
        on_delete: settings.default_on_delete()?,
        on_update: settings.default_on_update()?,
        fk_index: settings.fk_index && !args.no_fk_index,
        ..Default::default()
    };

    let generated = doc.run(&store, &base, args.force)?;
    for g in &generated {
        report(g);
    }
    println!(
        "{} {} table(s) written to {}",
        "✓".green(),
        generated.len().to_string().cyan(),
        store.dir().display()
    );
    Ok(())
}

pub fn print_json_schema() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&batch::json_schema())?);
    Ok(())
}

fn report(g: &Generated) {
    let verb = match g.outcome {
        WriteOutcome::Created => "Created",
        WriteOutcome::Replaced => "Replaced",
        WriteOutcome::Kept => "Kept",
    };
    println!(
        "{} {} {} → {}",
        "✓".green(),
        verb,
        g.artifact.table.cyan().bold(),
        g.path.display()
    );
    for stub in &g.stubs.created {
        println!("  {} stub {}", "+".yellow(), stub.display());
    }
}

fn print_table_sql(table: &TableSpec) {
    println!("{}", "Generated SQL:".green().bold());
    println!("{}", table.to_sql().white());
    for stmt in &table.extra_indexes {
        println!("{}", stmt.white());
    }
}

/// Show how a single field token is read.
pub fn explain(token: &str) -> Result<()> {
    println!("{} {}", "Token:".dimmed(), token.yellow());
    println!();

    match parser::parse_field(token)? {
        FieldSpec::IndexOnly { column } => {
            println!("{}", "Index directive".green().bold());
            println!("  {} {}", "Column:".dimmed(), column.white());
            println!();
            println!("  {}", index_sql("<table>", &column).white());
        }
        FieldSpec::Column(col) => {
            println!("{}", "Column".green().bold());
            println!("  {} {}", "Name:".dimmed(), col.name.white());
            println!("  {} {}", "Type:".dimmed(), col.storage.to_string().cyan());

            let c = &col.constraints;
            let set: Vec<&str> = [
                (c.primary_key, "primary key"),
                (c.auto_increment, "autoincrement"),
                (c.unique, "unique"),
                (c.not_null, "not null"),
                (c.index, "index"),
            ]
            .into_iter()
            .filter_map(|(on, label)| on.then_some(label))
            .collect();
            if !set.is_empty() {
                println!("  {} {}", "Flags:".dimmed(), set.join(", ").yellow());
            }
            if let Some(default) = &c.default {
                println!("  {} {}", "Default:".dimmed(), default.yellow());
            }
            if let Some(fk) = &col.fk {
                println!("  {} {}", "References:".dimmed(), fk.to_sql().cyan());
            }

            println!();
            println!("{}", "Column clause:".green().bold());
            println!("  {}", col.to_sql().white());
        }
    }
    Ok(())
}

pub fn show_symbols() {
    println!("{}", "Short flags".cyan().bold());
    println!(
        "{:8} {:15} {}",
        "Symbol".white().bold(),
        "Name".white().bold(),
        "SQL".white().bold()
    );
    println!("{}", "─".repeat(48).dimmed());
    for (symbol, name, sql) in flags::SHORT_FLAGS {
        println!(
            "{:8} {:15} {}",
            symbol.to_string().cyan().bold(),
            name.yellow(),
            sql.dimmed()
        );
    }

    println!();
    println!("{}", "Long attributes".cyan().bold());
    println!("{}", "─".repeat(48).dimmed());
    for (attr, meaning) in flags::LONG_ATTRIBUTES {
        println!("{:24} {}", attr.cyan(), meaning.white());
    }

    println!();
    println!("{}", "References".cyan().bold());
    println!("{}", "─".repeat(48).dimmed());
    println!("{:24} {}", "col->table".cyan(), "REFERENCES table(id)".white());
    println!("{:24} {}", "col>table(c)".cyan(), "REFERENCES table(c)".white());
    println!("{:24} {}", "col:fk(table.c)".cyan(), "INTEGER REFERENCES table(c)".white());
    println!("{:24} {}", "^col".cyan(), "CREATE INDEX on col".white());
}
