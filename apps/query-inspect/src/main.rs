use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use query_core::{encode, FilterExpression};
use querykit_db::{compile_with_limits, SqlFragment};
use runtime::{AppConfig, CliArgs};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Inspect how list queries normalize, re-encode and compile
#[derive(Parser)]
#[command(name = "query-inspect")]
#[command(about = "Inspect how list queries normalize, re-encode and compile")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a query string (or a JSON body with --json) and print the expression
    Normalize {
        input: String,
        /// Treat the input as a structured JSON map instead of a query string
        #[arg(long)]
        json: bool,
    },
    /// Encode a JSON filter expression into its canonical query string
    Encode { json: String },
    /// Compile a query string against a configured field policy
    Compile {
        query: String,
        /// Policy name from the `policies` config section
        #[arg(short, long)]
        policy: String,
    },
}

#[derive(Serialize)]
struct Compiled {
    query: String,
    expression: FilterExpression,
    sql: SqlFragment,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.clone().unwrap_or_default();
    let log_dir = config.log_dir.as_deref().unwrap_or(".");
    runtime::init_logging_from_config(&logging_config, Path::new(log_dir));
    tracing::debug!(policies = config.policies.len(), "configuration loaded");

    if args.print_config {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Normalize { input, json } => {
            let expr = if json {
                let value: serde_json::Value =
                    serde_json::from_str(&input).context("input is not valid JSON")?;
                FilterExpression::from_value(value)
            } else {
                FilterExpression::from_query_string(&input)
            };
            print_json(&expr)
        }
        Commands::Encode { json } => {
            let value: serde_json::Value =
                serde_json::from_str(&json).context("input is not valid JSON")?;
            println!("{}", encode(&FilterExpression::from_value(value)));
            Ok(())
        }
        Commands::Compile { query, policy } => {
            let field_policy = config.policy(&policy)?;
            let expr = FilterExpression::from_query_string(&query);
            let mut namer = config.query.param_names.namer();
            let compiled =
                compile_with_limits(&expr, &field_policy, config.query.limits(), namer.as_mut());
            tracing::info!(policy = %policy, predicates = compiled.predicates.len(), "compiled");
            print_json(&Compiled {
                query: encode(&expr),
                sql: compiled.to_sql(),
                expression: expr,
            })
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", out);
    Ok(())
}
