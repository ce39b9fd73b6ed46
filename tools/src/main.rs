use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use deltasync_tools::{digest_from_json, format_inspect_pretty, inspect_payload};
use schema::DigestMode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "deltasync-tools",
    version,
    about = "deltasync payload inspection and schema digest tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lay out the regions of an encoded payload.
    Inspect {
        /// Path to the payload bytes.
        payload: PathBuf,
        /// Header bits reserved by the schema.
        #[arg(long)]
        header_bits: usize,
        /// Data bits reserved by the schema.
        #[arg(long)]
        data_bits: usize,
        /// Bit offset of the payload inside the file.
        #[arg(long, default_value_t = 0)]
        bit_offset: usize,
        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },
    /// Print the schema digest of a JSON schema description.
    Digest {
        /// Path to the schema JSON.
        schema: PathBuf,
        /// Ignore target and field names.
        #[arg(long)]
        permissive: bool,
        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Inspect {
            payload,
            header_bits,
            data_bits,
            bit_offset,
            format,
        } => {
            let bytes =
                fs::read(&payload).with_context(|| format!("read payload {}", payload.display()))?;
            let report = inspect_payload(&bytes, bit_offset, header_bits, data_bits)?;
            match format {
                OutputFormat::Json => {
                    let json = serde_json::to_string_pretty(&report).context("serialize json")?;
                    println!("{json}");
                }
                OutputFormat::Pretty => println!("{}", format_inspect_pretty(&report)),
            }
        }
        Command::Digest {
            schema,
            permissive,
            format,
        } => {
            let text = fs::read_to_string(&schema)
                .with_context(|| format!("read schema {}", schema.display()))?;
            let mode = if permissive {
                DigestMode::Permissive
            } else {
                DigestMode::Strict
            };
            let report = digest_from_json(&text, mode)?;
            match format {
                OutputFormat::Json => {
                    let json = serde_json::to_string_pretty(&report).context("serialize json")?;
                    println!("{json}");
                }
                OutputFormat::Pretty => {
                    println!("{}", report.digest);
                    println!("{}", report.canonical);
                }
            }
        }
    }
    Ok(())
}
