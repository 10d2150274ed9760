use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use cdncia::prelude::*;
use clap::Parser;
use log::{info, LevelFilter};

/// Packs the contents of a 3DS CDN title directory into a CIA
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Directory holding `cetk`, `tmd` and the content files
    cdn_dir: PathBuf,
    /// Where to write the CIA
    output_file: PathBuf,
    /// Log every section and content as it is written
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
    /// Only report warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();

    let mut output = File::create(&args.output_file)
        .map(BufWriter::new)
        .with_context(|| format!("Failed to create {}", args.output_file.display()))?;

    let mut cdn = CdnDirectory::new(&args.cdn_dir);
    let ticket = cdn.open_ticket().context("Failed to open cetk")?;
    let mut tik = TicketContext::parse(BufReader::new(ticket)).context("Failed to parse cetk")?;
    let tmd = cdn.open_tmd().context("Failed to open tmd")?;
    let mut tmd = TmdContext::parse(BufReader::new(tmd)).context("Failed to parse tmd")?;

    // reported, not fatal
    if let Some(mismatch) = check_title_ids(&tik, &tmd) {
        eprintln!("warning: {mismatch}");
    }

    let mut copier = ChunkCopier::new()?;
    let header = write_cia(&mut tik, &mut tmd, &mut cdn, &mut output, &mut copier)
        .with_context(|| format!("Failed to write {}", args.output_file.display()))?;
    output
        .flush()
        .with_context(|| format!("Failed to write {}", args.output_file.display()))?;

    info!(
        "wrote {} ({} v{}, {} contents, {:#x} bytes)",
        args.output_file.display(),
        tmd.title_id(),
        tmd.title_version(),
        tmd.content_chunks().len(),
        header.layout().end()
    );
    Ok(())
}
