use anyhow::Result;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod project;
mod render;

/// sqld - Resolve annotated SQL queries against a DDL schema
#[derive(Parser)]
#[command(name = "sqld")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project directory containing sqld.json
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Output format written to stdout
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Also write the JSON report to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Coloured summary
    Text,
    /// Versioned JSON report
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if cli.verbose {
        eprintln!("{} {}", "Checking project:".cyan(), cli.dir.display());
    }

    let report = project::check_project(&cli.dir)?;

    if let Some(output) = &cli.output {
        report.save_to_file(output)?;
        if cli.verbose {
            eprintln!("{} {}", "Report saved to:".green(), output.display());
        }
    }

    match cli.format {
        Format::Json => println!("{}", report.to_json()?),
        Format::Text if report.has_errors() => print!("{}", render::render_diagnostics(&report)),
        Format::Text => print!("{}", render::render_report(&report)),
    }

    // Exit with error code if there are errors
    if report.has_errors() {
        std::process::exit(1);
    }

    Ok(())
}
