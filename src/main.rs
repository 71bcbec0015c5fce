use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::time::Instant;

use eggtab::annotation::{parse_category, CategorySelection};
use eggtab::pipeline::{run, RunConfig};

/// Parse a consensus threshold, which must lie in [0, 1]
fn parse_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("Invalid number: {e}"))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("Threshold {value} is outside [0, 1]"));
    }
    Ok(value)
}

/// eggtab - per-contig summary and feature count tables from eggNOG-mapper
///
/// Groups gene annotations by contig, filters contigs on length, coverage and
/// an exclusion list, and writes one summary table plus count tables per
/// annotation category.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// eggNOG-mapper annotation table (tab-delimited, optionally gzip/bgzip)
    #[clap(short = 'i', long = "input")]
    input: PathBuf,

    /// Contig FASTA used to obtain contig lengths
    #[clap(long = "input-contig-fasta")]
    contig_fasta: Option<PathBuf>,

    /// Two-column contig coverage table (contig id, mean coverage)
    #[clap(long = "input-cov")]
    coverage: Option<PathBuf>,

    /// Minimum contig length
    #[clap(long = "min-contig-length", default_value = "2000")]
    min_contig_length: u64,

    /// Minimum contig coverage
    #[clap(long = "min-contig-coverage", default_value = "5")]
    min_contig_coverage: f64,

    /// File of contig ids (one per line) to exclude from all outputs
    #[clap(long = "contig-filter")]
    contig_filter: Option<PathBuf>,

    /// Annotation category, or ALL_CATEGORIES
    #[clap(long = "eggnog-category", default_value = "GO", value_parser = parse_category)]
    category: CategorySelection,

    /// Weight feature counts by contig coverage
    #[clap(long = "use-cov")]
    use_cov: bool,

    /// Presence/absence count tables (disables coverage weighting)
    #[clap(long = "binary")]
    binary: bool,

    /// Minimum fraction of genes sharing a taxonomic label for consensus
    #[clap(long = "contig-taxa-threshold", default_value = "0.5", value_parser = parse_threshold)]
    taxa_threshold: f64,

    /// Skip the GO cross-reference tables
    #[clap(long = "no-go-xref")]
    no_go_xref: bool,

    /// Directory holding the `<namespace>.clean` GO cross-reference tables
    #[clap(long = "go-xref-dir", default_value = "GO_xref")]
    go_xref_dir: PathBuf,

    /// Output directory
    #[clap(short = 'o', long = "output-dir", default_value = ".")]
    output_dir: PathBuf,

    /// Number of threads (categories are processed in parallel)
    #[clap(short = 't', long = "threads", default_value = "1")]
    threads: usize,

    /// Only report how the inputs overlap; write no tables
    #[clap(long = "summary-only")]
    summary_only: bool,

    /// Data summary output path (default: <prefix>_data_summary.tsv)
    #[clap(long = "summary-file")]
    summary_file: Option<PathBuf>,

    /// Only log warnings and errors
    #[clap(short = 'q', long = "quiet", conflicts_with = "verbose")]
    quiet: bool,

    /// Log debug messages, including progress
    #[clap(short = 'v', long = "verbose")]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> RunConfig {
        RunConfig {
            input_annotation: self.input,
            contig_fasta: self.contig_fasta,
            coverage: self.coverage,
            min_contig_length: self.min_contig_length,
            min_contig_coverage: self.min_contig_coverage,
            contig_filter: self.contig_filter,
            categories: self.category,
            use_coverage: self.use_cov,
            binary_output: self.binary,
            taxonomy_threshold: self.taxa_threshold,
            make_go_xref: !self.no_go_xref,
            go_xref_dir: self.go_xref_dir,
            output_dir: self.output_dir,
            summary_only: self.summary_only,
            summary_file: self.summary_file,
        }
    }
}

fn init_logger(quiet: bool, verbose: bool) {
    let level = if quiet {
        log::LevelFilter::Warn
    } else if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // RUST_LOG, when set, overrides the flags
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_secs()
        .target(env_logger::Target::Stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.quiet, args.verbose);
    let start = Instant::now();

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads.max(1))
        .build_global()?;

    let report = run(args.into_config())?;
    for path in &report.outputs {
        info!("Wrote {}", path.display());
    }
    info!(
        "Done: {} allowed contigs, {} files written in {:.2}s",
        report.allowed_contigs,
        report.outputs.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
