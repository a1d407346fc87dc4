//! textract-query - Query a saved document-analysis result by rectangle
//!
//! Loads a document-analysis JSON response (an object with a `Blocks` array),
//! builds the spatial index, and prints the text blocks overlapping a
//! rectangle, the blocks nearest to a point, or per-type block counts.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use textract_index_core::{QueryParams, QueryRect, QueryResult, SpatialIndex};

/// Output format for query results.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable listing (default)
    #[default]
    Text,
    /// JSON array of results
    Json,
}

/// Query the text of a document-analysis result by normalized coordinates.
#[derive(Parser, Debug)]
#[command(name = "textract-query")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the document-analysis JSON file
    file: PathBuf,

    /// Query rectangle as x,y,width,height in 0..1 page coordinates
    #[arg(short = 'r', long, conflicts_with = "nearest")]
    rect: Option<QueryRect>,

    /// Minimum fraction of a block's area that must fall inside the rectangle
    #[arg(short = 'o', long = "overlap-ratio", default_value = "0.5")]
    overlap_ratio: f64,

    /// Only return blocks on this page (1-indexed)
    #[arg(short = 'p', long)]
    page: Option<u32>,

    /// Find the blocks nearest to a point given as x,y
    #[arg(short = 'n', long, value_parser = parse_point)]
    nearest: Option<(f64, f64)>,

    /// Number of blocks returned by --nearest
    #[arg(short = 'k', long, default_value = "5")]
    k: usize,

    /// Print block counts per type instead of querying
    #[arg(short = 'c', long, action = ArgAction::SetTrue)]
    counts: bool,

    /// Maximum number of results to print in text mode (0 = no limit)
    #[arg(short = 'l', long, default_value = "0")]
    limit: usize,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Path to file where output is written, or "-" for stdout
    #[arg(long, default_value = "-")]
    outfile: String,

    /// Use debug logging level
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    debug: bool,
}

/// Parse an "x,y" point.
fn parse_point(s: &str) -> std::result::Result<(f64, f64), String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(format!("expected x,y but got {:?}", s));
    }
    let x = parts[0]
        .parse::<f64>()
        .map_err(|_| format!("invalid float value: {}", parts[0]))?;
    let y = parts[1]
        .parse::<f64>()
        .map_err(|_| format!("invalid float value: {}", parts[1]))?;
    Ok((x, y))
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Write results the way a person skimming them wants to read them.
fn write_text<W: Write>(writer: &mut W, results: &[QueryResult], limit: usize) -> Result<()> {
    writeln!(writer, "Found {} text blocks", results.len())?;
    let shown = if limit == 0 {
        results.len()
    } else {
        limit.min(results.len())
    };

    for (i, result) in results.iter().take(shown).enumerate() {
        let text = if result.text.is_empty() {
            "(No text)"
        } else {
            result.text.as_str()
        };
        let page = result
            .page
            .map_or_else(|| "-".to_string(), |p| p.to_string());
        let bbox = &result.bounding_box;
        writeln!(writer, "[{}] Text: {:?}", i + 1, text)?;
        writeln!(
            writer,
            "    Type: {}, Page: {}, Overlap: {:.1}%",
            result.block_type,
            page,
            result.overlap_percentage * 100.0
        )?;
        writeln!(
            writer,
            "    BoundingBox: ({:.2}, {:.2}) - {:.2}x{:.2}",
            bbox.left, bbox.top, bbox.width, bbox.height
        )?;
    }

    if results.len() > shown {
        writeln!(writer, "... and {} more results", results.len() - shown)?;
    }
    Ok(())
}

fn run<W: Write>(args: &Args, writer: &mut W) -> Result<()> {
    let json = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let index = SpatialIndex::from_json_str(&json)
        .with_context(|| format!("failed to index {}", args.file.display()))?;
    tracing::info!(entries = index.len(), "index ready");

    if args.counts {
        for (block_type, count) in index.graph()?.type_counts() {
            writeln!(writer, "{block_type}\t{count}")?;
        }
        return Ok(());
    }

    let results = if let Some((x, y)) = args.nearest {
        index.nearest(x, y, args.k, args.page)?
    } else {
        let rect = args.rect.unwrap_or_else(QueryRect::full_page);
        let params = QueryParams::new(args.overlap_ratio, args.page);
        index.query_with(&rect, &params)?
    };

    match args.format {
        OutputFormat::Text => write_text(writer, &results, args.limit)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, &results)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    if !args.file.exists() {
        bail!("file not found: {}", args.file.display());
    }

    let mut output: Box<dyn Write> = if args.outfile == "-" {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        let file = File::create(&args.outfile)
            .with_context(|| format!("failed to create output file {}", args.outfile))?;
        Box::new(BufWriter::new(file))
    };

    run(&args, &mut output)?;
    output.flush()?;
    Ok(())
}
