/// Data summary: how the annotation, length and coverage inputs overlap,
/// reported without running any aggregation.
use anyhow::{Context, Result};
use log::info;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::annotation::AnnotationTable;
use crate::contigs::{filter_contig_lengths, AllowedContigs, ContigLengths, Coverages};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataInventory {
    pub annotation_rows: usize,
    pub annotated_contigs: usize,
    pub contigs_with_length: usize,
    pub contigs_with_coverage: usize,
    pub annotated_without_length: usize,
    pub annotated_without_coverage: usize,
    pub short_contigs: usize,
    pub allowed_contigs: usize,
    pub annotated_allowed_contigs: usize,
}

impl DataInventory {
    pub fn build(
        table: &AnnotationTable,
        lengths: &ContigLengths,
        coverages: &Coverages,
        allowed: &AllowedContigs,
        min_contig_length: u64,
    ) -> Self {
        let annotated: HashSet<&str> = table.contig_ids().into_iter().collect();

        DataInventory {
            annotation_rows: table.len(),
            annotated_contigs: annotated.len(),
            contigs_with_length: lengths.len(),
            contigs_with_coverage: coverages.len(),
            annotated_without_length: annotated.iter().filter(|c| !lengths.contains_key(**c)).count(),
            annotated_without_coverage: annotated.iter().filter(|c| !coverages.contains_key(**c)).count(),
            short_contigs: filter_contig_lengths(lengths, min_contig_length).len(),
            allowed_contigs: allowed.len(),
            annotated_allowed_contigs: annotated.iter().filter(|c| allowed.contains(**c)).count(),
        }
    }

    pub fn entries(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("annotation_rows", self.annotation_rows),
            ("annotated_contigs", self.annotated_contigs),
            ("contigs_with_length", self.contigs_with_length),
            ("contigs_with_coverage", self.contigs_with_coverage),
            ("annotated_without_length", self.annotated_without_length),
            ("annotated_without_coverage", self.annotated_without_coverage),
            ("short_contigs", self.short_contigs),
            ("allowed_contigs", self.allowed_contigs),
            ("annotated_allowed_contigs", self.annotated_allowed_contigs),
        ]
    }

    pub fn log(&self) {
        for (key, value) in self.entries() {
            info!("    {key}: {value}");
        }
    }

    /// Write `key<TAB>value` lines
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        for (key, value) in self.entries() {
            writeln!(writer, "{key}\t{value}")?;
        }
        writer.flush()?;
        Ok(())
    }
}
