//! cotlog - clean up and analyse Cursor on Target event logs
//!
//! ```text
//! cotlog dedup feed.txt --yes
//! cotlog shift feed.txt 2024-09-16T17:13:48Z
//! cotlog chunk feed.txt 25
//! cotlog extract ./logs --output-dir ./report
//! cotlog callsigns feed.txt
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cotlog_core::{AppConfig, LogFormat, Session, TracingProgress};
use cotlog_pipeline::{
    CallsignLister, ChunkExporter, ChunkLimit, Deduplicator, FieldExtractor, TimeShifter,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Configuration file picked up from the working directory when present
const DEFAULT_CONFIG: &str = "cotlog.yaml";

/// Deduplicate, re-time, split and tabulate CoT event logs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "COTLOG_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Remove duplicate events, writing NoDuplicates_<name>
    Dedup {
        /// Log file
        path: PathBuf,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Shift all event times so the first event lands on TARGET
    Shift {
        /// Log file
        path: PathBuf,

        /// New time of the first event (YYYY-MM-DDTHH:MM:SSZ or YYYY-MM-DDTHH:MM:SS)
        target: String,
    },

    /// Split a log into segments of at most SIZE MiB
    Chunk {
        /// Log file
        path: PathBuf,

        /// Maximum segment size in MiB (1-100)
        #[arg(allow_negative_numbers = true)]
        size: i64,
    },

    /// Export detail fields of every event to CSV tables
    Extract {
        /// Log file, or folder of log files
        path: PathBuf,

        /// Directory receiving CoT_Data/ (defaults to the log's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// List distinct UIDs and device callsigns
    Callsigns {
        /// Log file
        path: PathBuf,
    },
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    init_logging(&config, args.verbose)?;
    debug!("Configuration: {:?}", config);

    let processing = &config.processing;
    let mut progress = TracingProgress;

    match args.command {
        Command::Dedup { path, yes } => {
            let mut session = Session::load(&path)?;
            if !yes && !confirm(&format!(
                "Remove duplicates from {}? This action cannot be undone. [y/N] ",
                path.display()
            ))? {
                info!("Operation canceled by the user.");
                return Ok(());
            }
            let report = Deduplicator::new(processing).run(&mut session, &mut progress)?;
            println!("{}", report.output.display());
        }
        Command::Shift { path, target } => {
            let mut session = Session::load(&path)?;
            let report = TimeShifter::new(processing).run(&mut session, &target, &mut progress)?;
            println!("{}", report.output.display());
        }
        Command::Chunk { path, size } => {
            let limit = ChunkLimit::from_mib(size, processing.max_chunk_mib)?;
            let session = Session::load(&path)?;
            let report = ChunkExporter::new(processing).run(&session, limit, &mut progress)?;
            for segment in &report.segments {
                println!("{}", segment.display());
            }
        }
        Command::Extract { path, output_dir } => {
            let session = Session::load(&path)?;
            let report = FieldExtractor::new(processing).run(
                &session,
                output_dir.as_deref(),
                &mut progress,
            )?;
            for table in &report.tables {
                println!("{}", table.display());
            }
        }
        Command::Callsigns { path } => {
            let session = Session::load(&path)?;
            let report = CallsignLister::new(processing).run(&session, &mut progress)?;
            println!("{}", report.listing.display());
            if let Some(error_log) = report.error_log {
                println!("{}", error_log.display());
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = path.or_else(|| {
        let default = Path::new(DEFAULT_CONFIG);
        default.is_file().then_some(default)
    });

    let config = AppConfig::from_config_builder(path)
        .with_context(|| match path {
            Some(p) => format!("Failed to load configuration from {}", p.display()),
            None => "Failed to load configuration from environment".to_string(),
        })?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn init_logging(config: &AppConfig, verbose: bool) -> Result<()> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        config.logging.parse_level()?
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);

    match config.logging.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().flatten_event(true).init(),
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    let mut stderr = io::stderr();
    stderr.write_all(prompt.as_bytes())?;
    stderr.flush()?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
