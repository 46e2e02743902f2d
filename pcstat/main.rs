//! pcstat: page cache status of files
//!
//! Reports how many pages of each file are resident in the Linux page
//! cache, as a table, a terse CSV listing, or JSON.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use log::{debug, error, warn};
use pcstat_rs::{PcStatus, PcstatError, Strategy};

// Table column widths
const SIZE_W: usize = 14;
const PAGES_W: usize = 10;
const CACHED_W: usize = 10;
const PERCENT_W: usize = 8;
const SEP: &str = "  ";

/// pcstat CLI arguments
#[derive(Parser, Debug)]
#[command(name = "pcstat")]
#[command(about = "Show how much of each file is in the page cache")]
#[command(version)]
struct Cli {
    /// Files to inspect
    files: Vec<String>,
    /// Also inspect every file mapped by this process
    #[arg(long)]
    pid: Option<u32>,
    /// Use cachestat(2) instead of mincore(2)
    #[arg(long)]
    cachestat: bool,
    /// Print JSON
    #[arg(long, conflicts_with = "terse")]
    json: bool,
    /// Include per-page status in JSON output
    #[arg(long)]
    pps: bool,
    /// Print terse CSV output
    #[arg(long)]
    terse: bool,
    /// Omit the header line
    #[arg(long)]
    nohdr: bool,
    /// Print only the base name of each file
    #[arg(long)]
    bname: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("warn"));

    let cli = Cli::parse();

    let mut files = cli.files;
    if let Some(pid) = cli.pid {
        let mapped = pcstat_rs::mapped_files(pid)
            .with_context(|| format!("Failed to list files mapped by process {pid}"))?;
        debug!("process {pid} contributes {} files", mapped.len());
        files.extend(mapped);
    }
    if files.is_empty() {
        anyhow::bail!("No files given. Pass file paths or --pid.");
    }

    let strategy = Strategy::from(cli.cachestat);
    let mut failed = false;
    let mut stats = Vec::with_capacity(files.len());
    for name in &files {
        match PcStatus::query(name, strategy) {
            Ok(mut status) => {
                if cli.bname {
                    status.name = basename(&status.name);
                }
                if !cli.pps {
                    status.per_page = None;
                }
                stats.push(status);
            }
            Err(err) => {
                error!("skipping {name}: {err}");
                if let Some(hint) = hint_for(&err) {
                    warn!("{hint}");
                }
                failed = true;
            }
        }
    }

    if cli.json {
        print_json(&stats)?;
    } else if cli.terse {
        print_terse(&stats, !cli.nohdr);
    } else {
        print_table(&stats, !cli.nohdr);
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn basename(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|base| base.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

fn hint_for(err: &PcstatError) -> Option<&'static str> {
    err.is_unsupported()
        .then_some("this kernel lacks cachestat(2) (needs Linux 6.5+); rerun without --cachestat")
}

fn format_percent(status: &PcStatus, precision: usize) -> String {
    match status.percent_cached() {
        Some(percent) => format!("{percent:.precision$}"),
        None => "-".to_string(),
    }
}

fn print_json(stats: &[PcStatus]) -> anyhow::Result<()> {
    let json = serde_json::to_string(stats).with_context(|| "Failed to serialize status")?;
    println!("{json}");
    Ok(())
}

fn print_terse(stats: &[PcStatus], header: bool) {
    if header {
        println!("name,size,timestamp,mtime,pages,cached,percent");
    }
    for status in stats {
        println!(
            "{},{},{},{},{},{},{}",
            status.name,
            status.size,
            status.timestamp.timestamp(),
            status.mtime.timestamp(),
            status.pages,
            status.cached,
            format_percent(status, 3)
        );
    }
}

/// Width of a full table row when the name column is `name_width` wide
const fn rule_width(name_width: usize) -> usize {
    name_width + SIZE_W + PAGES_W + CACHED_W + PERCENT_W + 4 * SEP.len()
}

fn print_table(stats: &[PcStatus], header: bool) {
    let width = stats
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(0)
        .max("Name".len());

    if header {
        println!(
            "{:<width$}{SEP}{:>SIZE_W$}{SEP}{:>PAGES_W$}{SEP}{:>CACHED_W$}{SEP}{:>PERCENT_W$}",
            "Name", "Size (bytes)", "Pages", "Cached", "Percent"
        );
        println!("{:-<1$}", "", rule_width(width));
    }
    for status in stats {
        println!(
            "{:<width$}{SEP}{:>SIZE_W$}{SEP}{:>PAGES_W$}{SEP}{:>CACHED_W$}{SEP}{:>PERCENT_W$}",
            status.name,
            status.size,
            status.pages,
            status.cached,
            format_percent(status, 2)
        );
    }
}
