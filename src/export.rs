/// Writers (and a reader) for the delimited output tables
use anyhow::{Context, Result};
use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::aggregate::{ContigSummary, Weighting};
use crate::consensus::round2;
use crate::counts::FeatureCounts;

/// Written for unknown lengths and absent consensus values
const NA: &str = "NA";

/// Format a count: integral values print without a fractional part
pub fn format_count(value: f64) -> String {
    format!("{value}")
}

/// Format a frequency rounded to 2 decimals, always with a fractional part
pub fn format_frequency(value: f64) -> String {
    let rounded = round2(value);
    if rounded.fract() == 0.0 {
        format!("{rounded:.1}")
    } else {
        format!("{rounded}")
    }
}

/// Write `term,count` lines (no header); ids containing a comma are quoted
pub fn write_count_table<P: AsRef<Path>>(path: P, counts: &FeatureCounts) -> Result<()> {
    let path = path.as_ref();
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    for (term, count) in counts.iter() {
        writer.write_record([term, format_count(count).as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a table written by `write_count_table`
pub fn read_count_table<P: AsRef<Path>>(path: P) -> Result<FeatureCounts> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut counts = FeatureCounts::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Failed to read {}", path.display()))?;
        let term = record.get(0).unwrap_or_default();
        let raw = record.get(1).unwrap_or_default();
        let count: f64 = raw
            .parse()
            .with_context(|| format!("{}: invalid count '{raw}' for {term}", path.display()))?;
        counts.add(term, count);
    }
    Ok(counts)
}

/// Header of the per-contig summary table
pub fn summary_columns(weighting: Weighting) -> Vec<&'static str> {
    let mut cols = vec![
        "contig_id",
        "contig_length",
        "feature_hit_freq",
        "consensus_taxonomy",
        "consensus_taxonomy_frequency",
    ];
    if weighting == Weighting::Weighted {
        cols.insert(2, "avg_contig_coverage");
    }
    cols
}

/// Write the per-contig summary table (tab-delimited, with header)
pub fn write_summary_table<P: AsRef<Path>>(
    path: P,
    weighting: Weighting,
    summaries: &[ContigSummary],
) -> Result<()> {
    let path = path.as_ref();
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "{}", summary_columns(weighting).join("\t"))?;
    for summary in summaries {
        let length = summary
            .contig_length
            .map(|l| l.to_string())
            .unwrap_or_else(|| NA.to_string());
        let consensus_frequency = summary
            .consensus
            .frequency()
            .map(format_frequency)
            .unwrap_or_else(|| NA.to_string());

        write!(writer, "{}\t{}\t", summary.contig_id, length)?;
        if weighting == Weighting::Weighted {
            let coverage = summary.coverage.map(format_count).unwrap_or_default();
            write!(writer, "{coverage}\t")?;
        }
        writeln!(
            writer,
            "{}\t{}\t{}",
            format_frequency(summary.feature_hit_freq),
            summary.consensus.label(),
            consensus_frequency
        )?;
    }
    writer.flush()?;
    Ok(())
}
