/// Contig length, coverage and exclusion sources, and the resolver that
/// turns them into the set of contigs eligible for output.
use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use log::warn;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use crate::input::open_input;

/// contig id -> sequence length
pub type ContigLengths = HashMap<String, u64>;

/// contig id -> average coverage
pub type Coverages = HashMap<String, f64>;

/// Contig ids eligible for output
pub type AllowedContigs = HashSet<String>;

/// Read a FASTA file into contig lengths and write a `id<TAB>length`
/// audit report (in FASTA order) to `report_path`.
///
/// The contig id is the header text up to the first whitespace.
pub fn summarize_contig_lengths<P: AsRef<Path>, Q: AsRef<Path>>(
    fasta_path: P,
    report_path: Q,
) -> Result<ContigLengths> {
    let fasta_path = fasta_path.as_ref();
    let report_path = report_path.as_ref();
    let reader = open_input(fasta_path)?;

    let mut ordered: Vec<(String, u64)> = Vec::new();
    let mut current: Option<(String, u64)> = None;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", fasta_path.display()))?;
        let trimmed = line.trim();

        if let Some(header) = trimmed.strip_prefix('>') {
            if let Some(done) = current.take() {
                ordered.push(done);
            }
            let name = header.split_whitespace().next().unwrap_or("").to_string();
            current = Some((name, 0));
        } else if !trimmed.is_empty() {
            match current.as_mut() {
                Some((_, len)) => *len += trimmed.len() as u64,
                None => bail!(
                    "{}:{}: sequence data before the first FASTA header",
                    fasta_path.display(),
                    line_no + 1
                ),
            }
        }
    }
    if let Some(done) = current {
        ordered.push(done);
    }

    let file = File::create(report_path)
        .with_context(|| format!("Failed to create {}", report_path.display()))?;
    let mut writer = BufWriter::new(file);
    for (name, len) in &ordered {
        writeln!(writer, "{name}\t{len}")?;
    }
    writer.flush()?;

    Ok(ordered.into_iter().collect())
}

/// Contig ids shorter than `min_contig_length`
pub fn filter_contig_lengths(lengths: &ContigLengths, min_contig_length: u64) -> HashSet<String> {
    lengths
        .iter()
        .filter(|(_, len)| **len < min_contig_length)
        .map(|(id, _)| id.clone())
        .collect()
}

/// Load a two-column `contig_id<TAB>coverage` table
pub fn load_contig_coverage<P: AsRef<Path>>(path: P) -> Result<Coverages> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(open_input(path)?);

    let mut coverages = Coverages::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Failed to read {}", path.display()))?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let id = record.get(0).unwrap_or("").trim();
        if id.is_empty() {
            continue;
        }
        let raw = record
            .get(1)
            .with_context(|| format!("{}:{line}: missing coverage for {id}", path.display()))?;
        let coverage: f64 = raw.trim().parse().with_context(|| {
            format!("{}:{line}: invalid coverage '{raw}' for {id}", path.display())
        })?;
        coverages.insert(id.to_string(), coverage);
    }
    Ok(coverages)
}

/// Load contig ids to exclude, one per line
pub fn load_contig_filter<P: AsRef<Path>>(path: P) -> Result<HashSet<String>> {
    let path = path.as_ref();
    let mut excluded = HashSet::new();
    for line in open_input(path)?.lines() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        let id = line.trim();
        if !id.is_empty() {
            excluded.insert(id.to_string());
        }
    }
    Ok(excluded)
}

/// Contigs known by only one of the two measurements, sorted:
/// (length but no coverage, coverage but no length)
pub fn measurement_mismatch(lengths: &ContigLengths, coverages: &Coverages) -> (Vec<String>, Vec<String>) {
    let length_only: BTreeSet<&String> = lengths.keys().filter(|k| !coverages.contains_key(*k)).collect();
    let coverage_only: BTreeSet<&String> = coverages.keys().filter(|k| !lengths.contains_key(*k)).collect();
    (
        length_only.into_iter().cloned().collect(),
        coverage_only.into_iter().cloned().collect(),
    )
}

/// Decide which contigs may appear in the output.
///
/// A contig qualifies when it is known by length or coverage, is not
/// excluded, its length (or `min_length` when unknown) is at least
/// `min_length`, and its coverage (or `min_coverage` when unknown) is
/// nonzero. A missing measurement therefore never disqualifies a contig,
/// except that an unknown coverage fails when `min_coverage` is itself 0.
pub fn resolve_allowed_contigs(
    lengths: &ContigLengths,
    coverages: &Coverages,
    excluded: &HashSet<String>,
    min_length: u64,
    min_coverage: f64,
) -> AllowedContigs {
    let (length_only, coverage_only) = measurement_mismatch(lengths, coverages);
    if !length_only.is_empty() || !coverage_only.is_empty() {
        warn!(
            "Contigs with known length and contigs with coverage data differ; \
             ignoring the missing requirement for those contigs"
        );
        warn!("Contigs with length and not coverage: {}", length_only.len());
        for id in &length_only {
            warn!("  {id}");
        }
        warn!("Contigs with coverage and not length: {}", coverage_only.len());
        for id in &coverage_only {
            warn!("  {id}");
        }
    }

    lengths
        .keys()
        .chain(coverages.keys())
        .filter(|id| {
            let length_ok = lengths.get(*id).copied().unwrap_or(min_length) >= min_length;
            let coverage_ok = coverages.get(*id).copied().unwrap_or(min_coverage) != 0.0;
            length_ok && coverage_ok && !excluded.contains(*id)
        })
        .cloned()
        .collect()
}
