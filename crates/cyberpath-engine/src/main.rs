//! CLI entry point for the cyberpath attack tree scorer.
//!
//! Reads an attack tree (YAML or JSON) from a file or stdin. Results go to
//! stdout or the output directory; logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use cyberpath_core::AttackNodeRecord;
use cyberpath_engine::load::{self, InputFormat};
use cyberpath_engine::{report, AttackTreeEngine, RunLedger};

#[derive(Parser)]
#[command(name = "cyberpath")]
#[command(about = "Score attack trees and rank attack chains for pentest reports")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: cyberpath).
    #[arg(short, long, default_value = "cyberpath", global = true)]
    config: String,

    /// Input encoding; detected from the file extension when omitted.
    #[arg(long, value_enum, global = true)]
    format: Option<InputFormat>,

    /// Directory of the run ledger. Runs are not recorded when omitted.
    #[arg(long, global = true)]
    ledger_dir: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Score the tree and print the full JSON result.
    Score {
        /// Input file (stdin when omitted).
        input: Option<PathBuf>,
    },
    /// Write the PlantUML diagram and Markdown report.
    Report {
        /// Input file (stdin when omitted).
        input: Option<PathBuf>,
        /// Output directory.
        #[arg(long, default_value = "output")]
        out_dir: PathBuf,
        /// Diagram image to link from the report, relative to the report.
        #[arg(long)]
        image: Option<String>,
    },
    /// Print the highest ranked chains.
    Chains {
        /// Input file (stdin when omitted).
        input: Option<PathBuf>,
        /// Number of chains to print.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Check the hashes and links of a run ledger.
    Verify {
        /// Ledger directory.
        dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if cli.log_json {
        fmt()
            .with_env_filter(filter)
            .json()
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    }

    let scoring = cyberpath_core::config::load_scoring_config(&cli.config)
        .with_context(|| format!("loading scoring config '{}'", cli.config))?;
    let mut engine = AttackTreeEngine::new(scoring)?;
    if let Some(dir) = &cli.ledger_dir {
        engine = engine.with_ledger_dir(dir.clone());
    }

    match &cli.command {
        Command::Score { input } => {
            let records = read_input(input.as_deref(), cli.format)?;
            let result = engine.analyze(&records)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Report {
            input,
            out_dir,
            image,
        } => {
            let records = read_input(input.as_deref(), cli.format)?;
            let analysis = engine.analyze_detailed(&records)?;
            let (tree, evaluation) = (&analysis.tree, &analysis.evaluation);

            std::fs::create_dir_all(out_dir)
                .with_context(|| format!("creating {}", out_dir.display()))?;
            let uml_path = out_dir.join("attack_paths.puml");
            let report_path = out_dir.join("pentest_report.md");

            std::fs::write(&uml_path, report::plantuml(tree, &evaluation.walk))?;
            std::fs::write(
                &report_path,
                report::markdown_report(
                    tree,
                    &evaluation.walk,
                    &evaluation.chains,
                    image.as_deref(),
                ),
            )?;

            tracing::info!(
                diagram = %uml_path.display(),
                report = %report_path.display(),
                "Report written"
            );
            eprintln!("Wrote {} and {}", uml_path.display(), report_path.display());
        }
        Command::Chains { input, top } => {
            let records = read_input(input.as_deref(), cli.format)?;
            let result = engine.analyze(&records)?;
            for chain in result.chains.iter().take(*top) {
                println!(
                    "{:>3}. {:.2}  {}",
                    chain.rank,
                    chain.cumulative_score,
                    chain.names.join(" → ")
                );
            }
        }
        Command::Verify { dir } => {
            let ledger = RunLedger::open(dir)?;
            let entries = ledger
                .verify()
                .with_context(|| format!("verifying {}", ledger.path().display()))?;
            println!("{entries} entries verified in {}", ledger.path().display());
        }
    }

    Ok(())
}

fn read_input(path: Option<&Path>, format: Option<InputFormat>) -> anyhow::Result<Vec<AttackNodeRecord>> {
    match path {
        Some(path) => load::load_file(path, format)
            .with_context(|| format!("reading attack tree from {}", path.display())),
        None => {
            let text = std::io::read_to_string(std::io::stdin())?;
            Ok(load::parse_document(&text, format.unwrap_or(InputFormat::Yaml))?)
        }
    }
}
