//! boltlog CLI
//!
//! Inspect a log directory and append records to it by hand.

use std::path::PathBuf;
use std::process::ExitCode;

use boltlog::wal::{LogReader, LogWriter, Operation, WalRecovery};
use boltlog::{LogConfig, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// boltlog CLI
#[derive(Parser, Debug)]
#[command(name = "boltlog")]
#[command(about = "Inspect and append to a segmented write-ahead log")]
#[command(version)]
struct Args {
    /// Log directory
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Segment file name prefix
    #[arg(short, long, default_value = "boltbin")]
    base_name: String,

    /// Maximum segment size in bytes before rotation
    #[arg(short, long, default_value = "1048576")]
    max_segment_size: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List segment files in replay order
    Segments,

    /// Print every record
    Dump,

    /// Check every frame and report where the valid log ends
    Verify,

    /// Append a put record
    Put {
        /// The key to put
        key: String,

        /// The value to put
        value: String,
    },

    /// Append a delete record
    Delete {
        /// The key to delete
        key: String,
    },
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,boltlog=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    match &args.command {
        Commands::Segments => {
            let reader = LogReader::open(&args.dir, &args.base_name)?;
            for info in reader.segments() {
                let first = info
                    .first_lsn
                    .map_or_else(|| "-".to_string(), |lsn| lsn.to_string());
                println!("{}\t{} bytes\tfirst_lsn={}", info.path.display(), info.size, first);
            }
        }
        Commands::Dump => {
            let reader = LogReader::open(&args.dir, &args.base_name)?;
            let mut replay = reader.records();
            for record in replay.by_ref() {
                let record = record?;
                match &record.operation {
                    Operation::Put { key, value } => println!(
                        "{}\t{}\tPUT\t{}\t{}",
                        record.lsn,
                        record.timestamp,
                        String::from_utf8_lossy(key),
                        String::from_utf8_lossy(value)
                    ),
                    Operation::Delete { key } => println!(
                        "{}\t{}\tDEL\t{}",
                        record.lsn,
                        record.timestamp,
                        String::from_utf8_lossy(key)
                    ),
                }
            }
            if let Some(reason) = replay.stop_reason() {
                if !reason.is_clean() {
                    eprintln!("stopped early: {:?}", reason);
                }
            }
        }
        Commands::Verify => {
            let result = WalRecovery::verify(&args.dir, &args.base_name)?;
            println!("segments:  {}", result.segments_scanned);
            println!("records:   {}", result.records_recovered);
            println!("last lsn:  {}", result.last_lsn);
            println!("stop:      {:?}", result.stop);
        }
        Commands::Put { key, value } => {
            append_one(&args, Operation::put(key.as_str(), value.as_str()))?;
        }
        Commands::Delete { key } => {
            append_one(&args, Operation::delete(key.as_str()))?;
        }
    }
    Ok(())
}

/// Append a single record, close the log and print the assigned LSN
fn append_one(args: &Args, operation: Operation) -> Result<()> {
    let config = LogConfig::builder()
        .dir(&args.dir)
        .base_name(&args.base_name)
        .max_segment_size(args.max_segment_size)
        .build();

    let mut writer = LogWriter::open(config)?;
    let lsn = writer.append(operation)?;
    writer.close()?;

    println!("{}", lsn);
    Ok(())
}
