//! Attribute Validation CLI
//!
//! Validates JSON records against an attribute schema, either as whole
//! records or as change sets applied to a base record.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use attr_validations::config::{OutputFormat, ValidationsConfig};
use attr_validations::{HostSpec, RuleRegistry, Schema, ValidationErrors, Validator};
use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "attr-validate")]
#[command(about = "Validate JSON records against attribute rules")]
struct Cli {
    /// Configuration file (on top of validations.toml and VALIDATIONS__*)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate record files or directories of records
    Check {
        /// Schema file (JSON or TOML)
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Host type name the schema is compiled for
        #[arg(short = 't', long = "type", default_value = "Record")]
        host_type: String,

        /// Treat each record as a change set against this base record
        #[arg(short, long)]
        base: Option<PathBuf>,

        /// Treat each record as a change set (against `--base`, or an empty record)
        #[arg(short, long)]
        delta: bool,

        /// Output format, overriding the configuration
        #[arg(short, long, value_enum)]
        format: Option<Format>,

        /// Only print invalid records
        #[arg(short, long)]
        quiet: bool,

        /// Record files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// List the available rule types
    Rules,

    /// Show the effective configuration
    Config {
        /// Write it to this file instead
        #[arg(long)]
        save: Option<String>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Format {
    Pretty,
    Compact,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Pretty => OutputFormat::Pretty,
            Format::Compact => OutputFormat::Compact,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

/// Returns whether every checked record was valid
fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut config = ValidationsConfig::load_from(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Check {
            schema,
            host_type,
            base,
            delta,
            format,
            quiet,
            paths,
        } => {
            if let Some(format) = format {
                config.output.format = format.into();
            }
            config.output.quiet |= quiet;

            let schema_path = match schema.or_else(|| config.input.schema.clone()) {
                Some(path) => path,
                None => bail!("no schema given (use --schema or [input] schema)"),
            };
            let schema = Schema::load(&schema_path)
                .with_context(|| format!("loading schema {}", schema_path.display()))?;
            let validator = Validator::compile_with(
                &schema,
                RuleRegistry::global(),
                &HostSpec::new(host_type),
                config.engine.compile_options(),
            )
            .with_context(|| format!("compiling schema {}", schema_path.display()))?;

            let base = match &base {
                Some(path) => Some(read_record(path)?),
                None => None,
            };
            let delta = delta || base.is_some();
            let base = base.unwrap_or_default();

            let files = collect_records(&paths, &config)?;
            let mut invalid = 0;
            for file in &files {
                let record = read_record(file)?;
                let result = if delta {
                    validator.validate(&base, Some(&record))
                } else {
                    validator.validate(&record, None)
                };
                if result.is_err() {
                    invalid += 1;
                }
                print_result(file, result.err().as_ref(), &config)?;
            }

            if config.output.format == OutputFormat::Pretty {
                println!();
                if invalid == 0 {
                    println!("✅ {} record(s) valid", files.len());
                } else {
                    println!("❌ {} of {} record(s) invalid", invalid, files.len());
                }
            }
            Ok(invalid == 0)
        }

        Commands::Rules => {
            let registry = RuleRegistry::global();
            println!("Built-in rules:");
            for name in registry.builtin_names() {
                println!("  {}", name);
            }
            println!("  type (alias: dispatches to the rule named by its description)");

            let custom = registry.custom_names();
            if !custom.is_empty() {
                println!();
                println!("Registered rules:");
                for name in custom {
                    println!("  {}", name);
                }
            }
            Ok(true)
        }

        Commands::Config { save } => {
            match save {
                Some(path) => {
                    config.save(&path)?;
                    println!("✅ Configuration written to {}", path);
                }
                None => print!("{}", toml::to_string_pretty(&config)?),
            }
            Ok(true)
        }
    }
}

/// Expand directories into the record files they contain
fn collect_records(paths: &[PathBuf], config: &ValidationsConfig) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = walkdir::WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && config.input.accepts(e.path()))
                .map(|e| e.into_path())
                .collect();
            found.sort();
            files.extend(found);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            bail!("no such file or directory: {}", path.display());
        }
    }
    Ok(files)
}

fn read_record(path: &Path) -> anyhow::Result<Map<String, Value>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    match value {
        Value::Object(record) => Ok(record),
        _ => bail!("{} is not a JSON object", path.display()),
    }
}

fn print_result(path: &Path, errors: Option<&ValidationErrors>, config: &ValidationsConfig) -> anyhow::Result<()> {
    if errors.is_none() && config.output.quiet {
        return Ok(());
    }

    match config.output.format {
        OutputFormat::Compact => {
            let line = json!({
                "file": path.display().to_string(),
                "valid": errors.is_none(),
                "errors": errors.map(ValidationErrors::to_json).unwrap_or_else(|| json!({})),
            });
            println!("{}", serde_json::to_string(&line)?);
        }
        OutputFormat::Pretty => match errors {
            None => println!("✅ {}", path.display()),
            Some(errors) => {
                println!("❌ {}", path.display());
                for (attribute, codes) in errors.iter() {
                    println!("   └─ {}: {}", attribute, codes.join(", "));
                }
            }
        },
    }
    Ok(())
}
