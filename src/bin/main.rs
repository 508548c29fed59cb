//! querygen CLI - render query documents
//!
//! Usage:
//!   querygen render <query.json> [--dialect <dialect>] [--config <file>]
//!   querygen capabilities [--dialect <dialect>]
//!
//! Examples:
//!   querygen render documents.json --dialect eclipselink
//!   RUST_LOG=querygen=debug querygen render documents.json
//!   querygen capabilities

use clap::{Parser, Subcommand};
use querygen::config::{Settings, SettingsError};
use querygen::dialect::CapabilityProvider;
use querygen::{Dialect, QueryVariant, RenderContext, Statement};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "querygen")]
#[command(about = "querygen - render entity queries for a persistence provider dialect")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a JSON query document
    Render {
        /// Path to the JSON document (a serialized statement)
        file: PathBuf,

        /// Dialect to render for (overrides the config file)
        #[arg(short, long)]
        dialect: Option<Dialect>,

        /// Config file (defaults to the standard lookup)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Do not inline select aliases
        #[arg(long)]
        no_alias_inlining: bool,

        /// Print parameters and limits as well
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show what each dialect supports
    Capabilities {
        /// Only show this dialect
        #[arg(short, long)]
        dialect: Option<Dialect>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            file,
            dialect,
            config,
            no_alias_inlining,
            verbose,
        } => cmd_render(file, dialect, config, no_alias_inlining, verbose),
        Commands::Capabilities { dialect } => cmd_capabilities(dialect),
    }
}

fn load_settings(config: Option<PathBuf>) -> Result<Settings, SettingsError> {
    match config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    }
}

fn cmd_render(
    file: PathBuf,
    dialect: Option<Dialect>,
    config: Option<PathBuf>,
    no_alias_inlining: bool,
    verbose: bool,
) -> ExitCode {
    let settings = match load_settings(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let dialect = match dialect {
        Some(d) => d,
        None => match settings.generator.dialect() {
            Ok(d) => d,
            Err(e) => {
                eprintln!("Config error: {}", e);
                return ExitCode::FAILURE;
            }
        },
    };

    let source = match fs::read_to_string(&file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let statement: Statement = match serde_json::from_str(&source) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Invalid query document '{}': {}", file.display(), e);
            return ExitCode::FAILURE;
        }
    };
    debug!(kind = statement.kind(), %dialect, "loaded query document");

    let mut options = settings.generator.to_options();
    if no_alias_inlining {
        options.resolve_select_aliases = false;
    }
    let functions = settings.generator.function_registry();
    let ctx = RenderContext::new(dialect.provider(), &functions).with_options(options);

    match statement.render(&ctx) {
        Ok(rendered) => {
            if verbose {
                println!("-- Dialect: {}", dialect);
                if !rendered.parameters.is_empty() {
                    println!("-- Parameters: {}", rendered.parameters.join(", "));
                }
                if let Some(first) = rendered.first_result {
                    println!("-- First result: {}", first);
                }
                if let Some(max) = rendered.max_results {
                    println!("-- Max results: {}", max);
                }
                if !rendered.returning.is_empty() {
                    println!("-- Returning: {}", rendered.returning.join(", "));
                }
            }
            println!("{}", rendered.text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Render error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_capabilities(dialect: Option<Dialect>) -> ExitCode {
    let dialects: Vec<Dialect> = match dialect {
        Some(d) => vec![d],
        None => Dialect::ALL.to_vec(),
    };

    for d in dialects {
        let p = d.provider();
        println!("{}:", d);
        println!("  boolean literal:        {}", p.boolean_expression(true));
        println!("  boolean condition:      {}", p.boolean_conditional_expression(true));
        println!("  null value:             {}", p.null_expression());
        println!(
            "  map value function:     {}",
            p.collection_value_function().unwrap_or("-")
        );
        println!("  join condition keyword: {}", p.on_clause_keyword());
        println!("  FUNCTION(...) syntax:   {}", yes_no(p.supports_generic_function_syntax()));
        println!("  list parameter parens:  {}", yes_no(p.needs_brackets_for_list_parameter()));
        println!("  native COUNT(*):        {}", yes_no(p.supports_count_star()));
        println!("  entity joins:           {}", yes_no(p.supports_entity_join()));
        println!("  native set operations:  {}", yes_no(p.supports_native_set_operations()));
        println!("  WITH clause:            {}", yes_no(p.supports_with_clause()));
        println!("  collection DML:         {}", yes_no(p.supports_collection_dml()));
        println!("  RETURNING:              {}", yes_no(p.supports_returning()));
        println!();
    }
    ExitCode::SUCCESS
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}
