use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use georange::{BulkIngestPipeline, CsvSource, GeoRangeStore, MemoryDocumentStore};
use serde_json::json;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Index name used for one-shot CLI runs
const SCRATCH_INDEX: &str = ".geo-range-data.cli.1";

/// Timeout applied to in-process store calls
const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "georange")]
#[command(about = "IP-range geolocation lookups over CSV data sources", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a CSV source and resolve one or more IP addresses against it
    Lookup {
        /// CSV source file (first column is the range key; .gz supported)
        #[arg(value_name = "SOURCE")]
        source: PathBuf,

        /// IP addresses to resolve
        #[arg(value_name = "IP", required = true)]
        ips: Vec<String>,

        /// Output results as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Load a CSV source and report ingestion statistics
    Load {
        /// CSV source file (first column is the range key; .gz supported)
        #[arg(value_name = "SOURCE")]
        source: PathBuf,

        /// Output statistics as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the header and record count of a CSV source without loading it
    Inspect {
        /// CSV source file (.gz supported)
        #[arg(value_name = "SOURCE")]
        source: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Lookup { source, ips, json } => lookup(source, ips, json),
        Commands::Load { source, json } => load(source, json),
        Commands::Inspect { source } => inspect(source),
    }
}

fn ingest(source: &Path, store: &GeoRangeStore<MemoryDocumentStore>) -> Result<usize> {
    let csv = CsvSource::from_path(source)
        .with_context(|| format!("failed to read {}", source.display()))?;
    let pipeline = BulkIngestPipeline::new(store);
    let summary = pipeline
        .run(SCRATCH_INDEX, csv, || {})
        .with_context(|| format!("failed to load {}", source.display()))?;
    Ok(summary.records)
}

fn lookup(source: PathBuf, ips: Vec<String>, json: bool) -> Result<()> {
    let store = GeoRangeStore::new(MemoryDocumentStore::new(), TIMEOUT);
    ingest(&source, &store)?;

    let addrs: Vec<IpAddr> = ips
        .iter()
        .map(|ip| {
            ip.parse()
                .with_context(|| format!("invalid IP address: {}", ip))
        })
        .collect::<Result<_>>()?;
    let results = store.multi_point_lookup(SCRATCH_INDEX, &addrs)?;

    for addr in &addrs {
        let attrs = &results[addr];
        if json {
            println!(
                "{}",
                json!({
                    "ip": addr.to_string(),
                    "found": !attrs.is_empty(),
                    "attributes": attrs,
                })
            );
        } else if attrs.is_empty() {
            println!("{}: no match", addr);
        } else {
            let mut pairs: Vec<String> =
                attrs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            pairs.sort();
            println!("{}: {}", addr, pairs.join(", "));
        }
    }
    Ok(())
}

fn load(source: PathBuf, json: bool) -> Result<()> {
    let store = GeoRangeStore::new(MemoryDocumentStore::new(), TIMEOUT);
    let records = ingest(&source, &store)?;
    let frozen = store.backing().is_write_blocked(SCRATCH_INDEX);

    if json {
        println!(
            "{}",
            json!({
                "source": source.display().to_string(),
                "records": records,
                "frozen": frozen,
            })
        );
    } else {
        println!("Loaded {} records from {}", records, source.display());
        println!("Index frozen: {}", frozen);
    }
    Ok(())
}

fn inspect(source: PathBuf) -> Result<()> {
    let csv = CsvSource::from_path(&source)
        .with_context(|| format!("failed to read {}", source.display()))?;
    let field_names = csv.field_names().to_vec();

    let mut records = 0usize;
    for record in csv.records() {
        record?;
        records += 1;
    }

    println!("Source:  {}", source.display());
    println!("Fields:  {}", field_names.join(", "));
    println!("Records: {}", records);
    Ok(())
}
