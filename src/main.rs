//! isakit CLI - ISA-Tab / ISA-JSON toolkit

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use isakit::errors::{Finding, Severity};
use isakit::isatab::{self, Table};
use isakit::{isajson, sampletab};
use isakit::{BatchReport, FixSuggestion, InputFormat, Investigation, IsaError, Settings, ValidationReport, Validator};

#[derive(Parser)]
#[command(name = "isakit")]
#[command(about = "isakit - ISA-Tab and ISA-JSON toolkit")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to $ISAKIT_SETTINGS)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Tab,
    Json,
}

impl From<Format> for InputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Tab => InputFormat::Tab,
            Format::Json => InputFormat::Json,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SampleTabTarget {
    Isatab,
    Json,
    Sampletab,
}

#[derive(clap::Args)]
struct ValidationArgs {
    /// Assay configuration directory (defaults to the embedded set)
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Skip configuration-driven checks
    #[arg(long, conflicts_with = "config_dir")]
    no_config: bool,

    /// Treat unused declarations and missing configurations as errors
    #[arg(long)]
    strict: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an ISA-Tab directory or ISA-JSON file
    Validate {
        path: PathBuf,

        /// Input format (detected from the path when omitted)
        #[arg(long, value_enum)]
        format: Option<Format>,

        #[command(flatten)]
        args: ValidationArgs,
    },

    /// Validate several inputs, searching directories for ISA documents
    BatchValidate {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        args: ValidationArgs,
    },

    /// Convert between ISA-Tab and ISA-JSON
    Convert {
        input: PathBuf,
        output: PathBuf,

        #[arg(long, value_enum)]
        to: Format,
    },

    /// Join a study table with one of its assay tables
    Merge {
        study: PathBuf,
        assay: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert SampleTab to ISA, or ISA back to SampleTab
    Sampletab {
        input: PathBuf,
        output: PathBuf,

        #[arg(long, value_enum)]
        to: SampleTabTarget,
    },
}

fn main() {
    let cli = Cli::parse();

    let settings = match Settings::load(cli.settings.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Validate { path, format, args } => validate(&settings, &path, format, &args),
        Commands::BatchValidate { paths, args } => batch_validate(&settings, &paths, &args),
        Commands::Convert { input, output, to } => convert(&settings, &input, &output, to).map(|_| true),
        Commands::Merge { study, assay, output } => merge(&settings, &study, &assay, output.as_deref()).map(|_| true),
        Commands::Sampletab { input, output, to } => convert_sampletab(&settings, &input, &output, to).map(|_| true),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            if let Some(suggestion) = e.downcast_ref::<IsaError>().and_then(|e| e.fix_suggestion()) {
                eprintln!("  {} {}", "Fix:".yellow(), suggestion);
            }
            std::process::exit(1);
        }
    }
}

fn validator(settings: &Settings, args: &ValidationArgs) -> Result<Validator> {
    let validator = if args.no_config {
        Validator::without_configs()
    } else if let Some(dir) = args.config_dir.as_ref().or(settings.config_dir.as_ref()) {
        Validator::from_config_dir(dir)
    } else {
        Validator::embedded()?
    };
    Ok(validator.with_tab_options(settings.tab.clone()).strict(args.strict))
}

/// Validate one input; `Ok(false)` when the report has errors
fn validate(settings: &Settings, path: &Path, format: Option<Format>, args: &ValidationArgs) -> Result<bool> {
    let report = validator(settings, args)?.validate_path(path, format.map(InputFormat::from));
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(report.is_valid())
}

fn batch_validate(settings: &Settings, paths: &[PathBuf], args: &ValidationArgs) -> Result<bool> {
    let batch = validator(settings, args)?.batch(paths);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&batch)?);
    } else {
        print_batch(&batch);
    }
    Ok(batch.is_valid())
}

fn render_finding(finding: &Finding) -> String {
    let tag = match finding.severity {
        Severity::Error => "error".red().bold(),
        Severity::Warning => "warning".yellow().bold(),
        Severity::Info => "info".cyan(),
    };
    format!("  {} {}", tag, finding)
}

fn print_report(report: &ValidationReport) {
    for finding in report.all() {
        println!("{}", render_finding(finding));
    }
    if report.is_valid() {
        println!(
            "{} '{}' is valid ({} warnings)",
            "✓".green(),
            report.file,
            report.warnings.len()
        );
    } else {
        println!(
            "{} '{}' has {} errors and {} warnings",
            "✗".red(),
            report.file,
            report.errors.len(),
            report.warnings.len()
        );
    }
}

fn print_batch(batch: &BatchReport) {
    for report in &batch.reports {
        println!("{}", report.file.as_str().bold());
        print_report(report);
    }
    println!(
        "{} {} documents, {} errors, {} warnings",
        "→".cyan(),
        batch.reports.len(),
        batch.error_count(),
        batch.warning_count()
    );
}

/// Read an ISA-Tab directory or ISA-JSON file, printing reader findings
fn read_isa(settings: &Settings, input: &Path) -> Result<Investigation> {
    let (investigation, report) = match InputFormat::detect(input) {
        Some(InputFormat::Tab) => {
            let loaded = isatab::load(input, &settings.tab)?;
            (loaded.investigation, loaded.report)
        }
        Some(InputFormat::Json) => isajson::load(input, &settings.json)?,
        None => anyhow::bail!("{} is neither an ISA-Tab directory nor a *.json file", input.display()),
    };
    for finding in report.all() {
        eprintln!("{}", render_finding(finding));
    }
    Ok(investigation)
}

fn write_isatab(settings: &Settings, investigation: &Investigation, output: &Path) -> Result<()> {
    std::fs::create_dir_all(output).with_context(|| format!("Failed to create {:?}", output))?;
    isatab::dump(investigation, output, &settings.tab)?;
    Ok(())
}

fn convert(settings: &Settings, input: &Path, output: &Path, to: Format) -> Result<()> {
    let investigation = read_isa(settings, input)?;
    match to {
        Format::Tab => write_isatab(settings, &investigation, output)?,
        Format::Json => isajson::dump(&investigation, output)?,
    }
    println!("{} Wrote {}", "✓".green(), output.display());
    Ok(())
}

fn merge(settings: &Settings, study: &Path, assay: &Path, output: Option<&Path>) -> Result<()> {
    let keep_quotes = settings.tab.keep_cell_quotes;
    let study = Table::read(study, keep_quotes)?;
    let assay = Table::read(assay, keep_quotes)?;
    let merged = isatab::merge_study_with_assay(&study, &assay);
    match output {
        Some(path) => merged.write(path, settings.tab.write_cell_quotes)?,
        None => print!("{}", merged.to_tsv(settings.tab.write_cell_quotes)),
    }
    Ok(())
}

fn convert_sampletab(settings: &Settings, input: &Path, output: &Path, to: SampleTabTarget) -> Result<()> {
    match to {
        SampleTabTarget::Isatab => write_isatab(settings, &sampletab::load(input)?, output)?,
        SampleTabTarget::Json => isajson::dump(&sampletab::load(input)?, output)?,
        SampleTabTarget::Sampletab => sampletab::dump(&read_isa(settings, input)?, output)?,
    }
    println!("{} Wrote {}", "✓".green(), output.display());
    Ok(())
}
