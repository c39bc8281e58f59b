//! Mica - Microbial Community Analysis
//!
//! Command line front end for the in-silico PCR and T-RFLP tools.

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mimalloc::MiMalloc;

use mica::tools::run_tool;
use mica::{convert_fasta_file, convert_genbank_file, ProgressUpdate, RunConfig, ThreadCount, ToolKind};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "mica")]
#[command(version)]
#[command(about = "In-silico PCR and terminal restriction fragment analysis", long_about = None)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Digest amplified records with several enzymes
    Ispar(ToolArgs),

    /// Plausible community from forward and reverse T-RFLP profiles
    Aplaus(ToolArgs),

    /// Phylogenetic assignment from a forward T-RFLP profile
    Pat(ToolArgs),

    /// Primer pair prevalence
    Pspa(ToolArgs),

    /// Enzyme resolving power
    Erpa(ToolArgs),

    /// Convert a FASTA or GenBank file to the database line format
    Convert {
        input: PathBuf,
        output: PathBuf,

        /// Read GenBank flat file records instead of FASTA
        #[arg(long)]
        genbank: bool,
    },
}

#[derive(Args)]
struct ToolArgs {
    /// Parameter file
    params: PathBuf,

    /// Worker threads, a number or "auto"
    #[arg(short, long)]
    threads: Option<String>,

    /// Report file prefix
    #[arg(short, long)]
    output: Option<String>,

    /// Sequence database, overriding the parameter file
    #[arg(short, long)]
    database: Option<PathBuf>,
}

impl ToolArgs {
    fn load(self) -> Result<RunConfig> {
        let mut config = RunConfig::from_file(&self.params)
            .with_context(|| format!("failed to read parameters from {}", self.params.display()))?;
        if let Some(threads) = self.threads {
            config.threads =
                ThreadCount::parse(&threads).with_context(|| format!("invalid thread count '{}'", threads))?;
        }
        if let Some(output) = self.output {
            config.filename = output;
        }
        if let Some(database) = self.database {
            config.database = Some(database);
        }
        Ok(config)
    }
}

fn run(tool: ToolKind, args: ToolArgs) -> Result<()> {
    let config = args.load()?;

    let (progress_tx, progress_rx) = mpsc::channel::<ProgressUpdate>();
    let reporter = thread::spawn(move || {
        for update in progress_rx {
            log::info!(
                "{} ({} scanned, {} amplified)",
                update.message,
                update.records_scanned,
                update.records_amplified
            );
        }
    });

    let outcome = run_tool(tool, &config, Some(progress_tx));
    // the sender is dropped with the run, which ends the reporter
    let _ = reporter.join();
    let outcome = outcome.with_context(|| format!("{} failed", tool.name()))?;

    println!(
        "{}: {} of {} records amplified, {} rows",
        tool.name(),
        outcome.summary.records_amplified,
        outcome.summary.records_scanned,
        outcome.rows
    );
    for file in &outcome.files {
        println!("  {}", file.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Ispar(args) => run(ToolKind::Ispar, args),
        Commands::Aplaus(args) => run(ToolKind::Aplaus, args),
        Commands::Pat(args) => run(ToolKind::Pat, args),
        Commands::Pspa(args) => run(ToolKind::Pspa, args),
        Commands::Erpa(args) => run(ToolKind::Erpa, args),
        Commands::Convert { input, output, genbank } => {
            let records = if genbank {
                convert_genbank_file(&input, &output)
            } else {
                convert_fasta_file(&input, &output)
            }
            .with_context(|| format!("failed to convert {}", input.display()))?;
            println!("{} records written to {}", records, output.display());
            Ok(())
        }
    }
}
