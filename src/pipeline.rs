/// One invocation: load inputs, resolve allowed contigs, and produce the
/// summary and count tables for every selected category.
use anyhow::{bail, Context, Result};
use log::{info, warn};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::aggregate::{aggregate_contigs, AggregationParams, Weighting};
use crate::annotation::{AnnotationTable, Category, CategorySelection, TokenPolicy};
use crate::contigs::{
    load_contig_coverage, load_contig_filter, resolve_allowed_contigs, summarize_contig_lengths,
    AllowedContigs, ContigLengths, Coverages,
};
use crate::export::{write_count_table, write_summary_table};
use crate::input::file_prefix;
use crate::inventory::DataInventory;
use crate::xref::{translate_all, GoXrefs};

/// Run configuration
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input_annotation: PathBuf,
    pub contig_fasta: Option<PathBuf>,
    pub coverage: Option<PathBuf>,
    pub min_contig_length: u64,
    pub min_contig_coverage: f64,
    pub contig_filter: Option<PathBuf>,
    pub categories: CategorySelection,
    pub use_coverage: bool,
    pub binary_output: bool,
    pub taxonomy_threshold: f64,
    pub make_go_xref: bool,
    pub go_xref_dir: PathBuf,
    pub output_dir: PathBuf,
    pub summary_only: bool,
    pub summary_file: Option<PathBuf>,
}

impl RunConfig {
    /// Config with the tool's defaults for everything but the input
    pub fn new<P: Into<PathBuf>>(input_annotation: P) -> Self {
        RunConfig {
            input_annotation: input_annotation.into(),
            contig_fasta: None,
            coverage: None,
            min_contig_length: 2000,
            min_contig_coverage: 5.0,
            contig_filter: None,
            categories: CategorySelection::Single(Category::Go),
            use_coverage: false,
            binary_output: false,
            taxonomy_threshold: 0.5,
            make_go_xref: true,
            go_xref_dir: PathBuf::from("GO_xref"),
            output_dir: PathBuf::from("."),
            summary_only: false,
            summary_file: None,
        }
    }

    /// Binary output only records presence, so weighting is switched off
    pub fn normalized(mut self) -> Self {
        if self.binary_output && self.use_coverage {
            info!("Binary output is selected, not using coverage for weighting");
            self.use_coverage = false;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.taxonomy_threshold) {
            bail!(
                "Taxonomy consensus threshold must be within [0, 1], got {}",
                self.taxonomy_threshold
            );
        }
        if self.min_contig_coverage < 0.0 {
            bail!("Minimum contig coverage cannot be negative, got {}", self.min_contig_coverage);
        }
        if self.use_coverage && self.coverage.is_none() {
            bail!("Coverage weighting requested but no coverage file given (--input-cov)");
        }
        Ok(())
    }

    pub fn weighting(&self) -> Weighting {
        if self.use_coverage {
            Weighting::Weighted
        } else {
            Weighting::Unweighted
        }
    }

    /// Label used in count table names: weighting mode, or "binary"
    pub fn count_mode(&self) -> &'static str {
        if self.binary_output {
            "binary"
        } else {
            self.weighting().as_str()
        }
    }

    fn needs_coverage(&self) -> bool {
        self.use_coverage || self.min_contig_coverage > 0.0
    }

    fn needs_xrefs(&self) -> bool {
        self.make_go_xref && !self.summary_only && self.categories.includes(Category::Go)
    }

    /// `<prefix>_len<L>_cov<C>`
    pub fn output_stem(&self) -> String {
        format!(
            "{}_len{}_cov{}",
            file_prefix(&self.input_annotation),
            self.min_contig_length,
            self.min_contig_coverage
        )
    }

    pub fn summary_path(&self, category: Category) -> PathBuf {
        self.output_dir.join(format!(
            "{}_{}_{}_summary.tsv",
            self.output_stem(),
            category,
            self.weighting()
        ))
    }

    pub fn direct_count_path(&self, category: Category) -> PathBuf {
        self.output_dir.join(format!(
            "{}_{}_{}_direct_count_table.csv",
            self.output_stem(),
            category,
            self.count_mode()
        ))
    }

    pub fn xref_count_path(&self, category: Category, namespace: &str) -> PathBuf {
        self.output_dir.join(format!(
            "{}_{}_{}_{}_count_table.csv",
            self.output_stem(),
            category,
            self.count_mode(),
            namespace
        ))
    }

    pub fn data_summary_path(&self) -> PathBuf {
        self.summary_file.clone().unwrap_or_else(|| {
            self.output_dir
                .join(format!("{}_data_summary.tsv", file_prefix(&self.input_annotation)))
        })
    }

    fn log_parameters(&self) {
        let show = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "None".to_string())
        };
        info!("Parameters used to run eggtab:");
        info!("    Input annotation: {}", self.input_annotation.display());
        info!("    Input coverage: {}", show(&self.coverage));
        info!("    Input contig_fasta: {}", show(&self.contig_fasta));
        info!("    Input min contig length: {}", self.min_contig_length);
        info!("    Input min contig coverage: {}", self.min_contig_coverage);
        info!("    Input contig filter: {}", show(&self.contig_filter));
        info!("    Input eggnog mapper category: {}", self.categories);
        info!("    Use contig coverage: {}", self.use_coverage);
        info!("    Binary output: {}", self.binary_output);
        info!("    Contig taxonomy consensus threshold: {}", self.taxonomy_threshold);
        info!("    Make GO cross-ref tables: {}", self.make_go_xref);
        info!("    Output directory: {}", self.output_dir.display());
    }
}

/// Files written by a run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub allowed_contigs: usize,
    pub outputs: Vec<PathBuf>,
    pub inventory: Option<DataInventory>,
}

/// Inputs shared read-only by every category pass
struct LoadedInputs {
    table: AnnotationTable,
    lengths: ContigLengths,
    coverages: Coverages,
    allowed: AllowedContigs,
}

fn load_inputs(config: &RunConfig) -> Result<LoadedInputs> {
    let lengths = match &config.contig_fasta {
        Some(fasta) => {
            let report = config
                .output_dir
                .join(format!("{}_contig_length_summary.tsv", file_prefix(fasta)));
            let lengths = summarize_contig_lengths(fasta, &report)?;
            info!("Read lengths of {} contigs from {}", lengths.len(), fasta.display());
            lengths
        }
        None => ContigLengths::new(),
    };

    let table = AnnotationTable::load(&config.input_annotation)?;
    info!(
        "Loaded {} annotation rows from {}",
        table.len(),
        config.input_annotation.display()
    );

    let coverages = match (&config.coverage, config.needs_coverage()) {
        (Some(path), true) => load_contig_coverage(path)?,
        (None, true) => {
            warn!("No coverage file given; contigs are not filtered on coverage data");
            Coverages::new()
        }
        (_, false) => Coverages::new(),
    };

    let excluded = match &config.contig_filter {
        Some(path) => load_contig_filter(path)?,
        None => HashSet::new(),
    };

    let allowed = resolve_allowed_contigs(
        &lengths,
        &coverages,
        &excluded,
        config.min_contig_length,
        config.min_contig_coverage,
    );
    info!("{} contigs pass the length/coverage/exclusion filters", allowed.len());
    if allowed.is_empty() {
        warn!("No contigs are eligible for output; tables will be empty");
    }

    Ok(LoadedInputs {
        table,
        lengths,
        coverages,
        allowed,
    })
}

fn run_category(
    config: &RunConfig,
    inputs: &LoadedInputs,
    category: Category,
    xrefs: Option<&GoXrefs>,
    policy: &TokenPolicy,
) -> Result<Vec<PathBuf>> {
    info!("Generating {category} table(s) from eggNOG-mapper data");
    let weighting = config.weighting();
    let params = AggregationParams {
        category,
        weighting,
        coverages: &inputs.coverages,
        allowed: &inputs.allowed,
        lengths: &inputs.lengths,
        taxonomy_threshold: config.taxonomy_threshold,
        policy,
    };

    let aggregation = aggregate_contigs(inputs.table.rows(), &params);
    let mut outputs = Vec::new();

    let summary_path = config.summary_path(category);
    write_summary_table(&summary_path, weighting, &aggregation.summaries)?;
    outputs.push(summary_path);

    let direct = if config.binary_output {
        aggregation.counts.to_binary()
    } else {
        aggregation.counts.clone()
    };
    let direct_path = config.direct_count_path(category);
    write_count_table(&direct_path, &direct)?;
    outputs.push(direct_path);
    info!(
        "{category}: {} contigs summarized, {} distinct terms",
        aggregation.summaries.len(),
        direct.len()
    );

    if let (Category::Go, Some(xrefs)) = (category, xrefs) {
        info!("GO count table production complete - converting GO to other name spaces using translation tables");
        for (namespace, counts) in translate_all(&aggregation.counts, xrefs, config.binary_output) {
            let path = config.xref_count_path(category, &namespace);
            write_count_table(&path, &counts)?;
            outputs.push(path);
        }
    }

    Ok(outputs)
}

/// Run the whole pipeline for `config`
pub fn run(config: RunConfig) -> Result<RunReport> {
    let config = config.normalized();
    config.validate()?;
    config.log_parameters();
    prepare_output_dir(&config.output_dir)?;

    // Load cross-references up front so a missing table fails before any work
    let xrefs = if config.needs_xrefs() {
        Some(GoXrefs::load(&config.go_xref_dir)?)
    } else {
        None
    };

    let inputs = load_inputs(&config)?;

    if config.summary_only {
        let inventory = DataInventory::build(
            &inputs.table,
            &inputs.lengths,
            &inputs.coverages,
            &inputs.allowed,
            config.min_contig_length,
        );
        inventory.log();
        let path = config.data_summary_path();
        inventory.write(&path)?;
        return Ok(RunReport {
            allowed_contigs: inputs.allowed.len(),
            outputs: vec![path],
            inventory: Some(inventory),
        });
    }

    let policy = TokenPolicy::default();
    let per_category: Vec<Vec<PathBuf>> = config
        .categories
        .categories()
        .into_par_iter()
        .map(|category| run_category(&config, &inputs, category, xrefs.as_ref(), &policy))
        .collect::<Result<_>>()?;

    Ok(RunReport {
        allowed_contigs: inputs.allowed.len(),
        outputs: per_category.into_iter().flatten().collect(),
        inventory: None,
    })
}

/// Create the output directory when missing
pub fn prepare_output_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_forces_unweighted() {
        let mut config = RunConfig::new("sample_annotations.tsv");
        config.binary_output = true;
        config.use_coverage = true;
        let config = config.normalized();
        assert!(!config.use_coverage);
        assert_eq!(config.count_mode(), "binary");
        assert_eq!(config.weighting(), Weighting::Unweighted);
    }

    #[test]
    fn test_validate() {
        let mut config = RunConfig::new("a.tsv");
        assert!(config.validate().is_ok());
        config.taxonomy_threshold = 1.5;
        assert!(config.validate().is_err());
        config.taxonomy_threshold = 0.5;
        config.use_coverage = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_output_names() {
        let mut config = RunConfig::new("/data/1145081_M_70.annotations");
        config.output_dir = PathBuf::from("out");
        config.use_coverage = true;
        assert_eq!(
            config.summary_path(Category::Go),
            PathBuf::from("out/1145081_len2000_cov5_GO_weighted_summary.tsv")
        );
        assert_eq!(
            config.direct_count_path(Category::KeggKo),
            PathBuf::from("out/1145081_len2000_cov5_KEGG_ko_weighted_direct_count_table.csv")
        );
        assert_eq!(
            config.xref_count_path(Category::Go, "ec2go"),
            PathBuf::from("out/1145081_len2000_cov5_GO_weighted_ec2go_count_table.csv")
        );
        assert_eq!(
            config.data_summary_path(),
            PathBuf::from("out/1145081_data_summary.tsv")
        );
    }
}
