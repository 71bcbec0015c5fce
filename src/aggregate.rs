/// Contig grouping and aggregation
///
/// Walks annotation rows in file order, collecting the genes of one contig at
/// a time. A contig ends at the row whose successor carries a different
/// contig id (or at the last row). At that point the contig is either
/// finalized into a summary row plus a contribution to the run-wide feature
/// counts, or dropped when it is not an allowed contig.
use log::debug;
use std::fmt;

use crate::annotation::{AnnotationRow, Category, TokenPolicy};
use crate::consensus::{consensus_taxonomy, Consensus};
use crate::contigs::{AllowedContigs, ContigLengths, Coverages};
use crate::counts::FeatureCounts;

const PROGRESS_INTERVAL: usize = 1000;

/// How per-contig feature counts enter the global table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weighting {
    /// Counts multiplied by contig coverage
    Weighted,
    /// Raw gene-level counts
    Unweighted,
}

impl Weighting {
    pub fn as_str(&self) -> &'static str {
        match self {
            Weighting::Weighted => "weighted",
            Weighting::Unweighted => "unweighted",
        }
    }
}

impl fmt::Display for Weighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One output row of the per-contig summary table
#[derive(Debug, Clone, PartialEq)]
pub struct ContigSummary {
    pub contig_id: String,
    pub contig_length: Option<u64>,
    /// Present in weighted mode only
    pub coverage: Option<f64>,
    /// Fraction of genes with at least one value in the category (unrounded)
    pub feature_hit_freq: f64,
    pub consensus: Consensus,
}

/// Running state of the contig currently being read
#[derive(Debug, Default)]
pub struct ContigState {
    terms: Vec<String>,
    non_hits: usize,
    genes: usize,
    labels: Vec<String>,
}

impl ContigState {
    /// Fold one gene into the state
    pub fn observe(&mut self, row: &AnnotationRow, category: Category, policy: &TokenPolicy) {
        self.genes += 1;
        match row.value(category) {
            None => self.non_hits += 1,
            Some(value) => self
                .terms
                .extend(policy.tokens(category, value).map(str::to_string)),
        }
        self.labels.push(row.taxonomic_scope().to_string());
    }

    pub fn genes(&self) -> usize {
        self.genes
    }

    pub fn non_hits(&self) -> usize {
        self.non_hits
    }

    pub fn feature_hit_freq(&self) -> f64 {
        if self.genes == 0 {
            return 0.0;
        }
        1.0 - self.non_hits as f64 / self.genes as f64
    }

    /// Term occurrences of this contig tallied into counts
    pub fn term_counts(&self) -> FeatureCounts {
        FeatureCounts::from_terms(&self.terms)
    }
}

/// Everything the aggregation pass needs besides the rows themselves
#[derive(Debug, Clone, Copy)]
pub struct AggregationParams<'a> {
    pub category: Category,
    pub weighting: Weighting,
    pub coverages: &'a Coverages,
    pub allowed: &'a AllowedContigs,
    pub lengths: &'a ContigLengths,
    pub taxonomy_threshold: f64,
    pub policy: &'a TokenPolicy,
}

/// Result of one aggregation pass
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub summaries: Vec<ContigSummary>,
    pub counts: FeatureCounts,
}

/// True when row `i` is the last row of its contig
pub fn is_contig_end<K: AsRef<str>>(keys: &[K], i: usize) -> bool {
    match keys.get(i + 1) {
        None => true,
        Some(next) => next.as_ref() != keys[i].as_ref(),
    }
}

/// Indices of the last row of every contig run
pub fn contig_boundaries<K: AsRef<str>>(keys: &[K]) -> Vec<usize> {
    (0..keys.len()).filter(|&i| is_contig_end(keys, i)).collect()
}

/// Close one contig.
///
/// Takes the global counts and hands them back with this contig's
/// contribution merged in. Returns no summary when the contig cannot be
/// reported: weighted mode needs a known coverage.
pub fn finalize_contig(
    contig_id: &str,
    state: ContigState,
    params: &AggregationParams,
    mut counts: FeatureCounts,
) -> (Option<ContigSummary>, FeatureCounts) {
    let contig_counts = state.term_counts();
    let coverage = match params.weighting {
        Weighting::Weighted => match params.coverages.get(contig_id) {
            Some(&coverage) => Some(coverage),
            None => {
                debug!("Skipping {contig_id}: no coverage for weighted output");
                return (None, counts);
            }
        },
        Weighting::Unweighted => None,
    };

    counts.merge_scaled(&contig_counts, coverage.unwrap_or(1.0));

    let summary = ContigSummary {
        contig_id: contig_id.to_string(),
        contig_length: params.lengths.get(contig_id).copied(),
        coverage,
        feature_hit_freq: state.feature_hit_freq(),
        consensus: consensus_taxonomy(&state.labels, state.genes, params.taxonomy_threshold),
    };
    (Some(summary), counts)
}

/// Group rows into contigs and aggregate them.
///
/// Rows of one contig must be contiguous; a contig id that reappears later
/// starts a new, separate run.
pub fn aggregate_contigs(rows: &[AnnotationRow], params: &AggregationParams) -> Aggregation {
    let keys: Vec<&str> = rows.iter().map(|r| r.contig_id.as_str()).collect();
    let total = rows.len();

    let mut result = Aggregation::default();
    let mut state = ContigState::default();

    for (i, row) in rows.iter().enumerate() {
        if i % PROGRESS_INTERVAL == 0 {
            let percent = ((i + 1) as f64 * 100.0 / total as f64 * 10.0).round() / 10.0;
            debug!("-----> Processing record {} of {}.....{percent} % complete", i + 1, total);
        }

        state.observe(row, params.category, params.policy);

        if !is_contig_end(&keys, i) {
            continue;
        }

        let finished = std::mem::take(&mut state);
        if !params.allowed.contains(&row.contig_id) {
            continue;
        }

        let counts = std::mem::take(&mut result.counts);
        let (summary, counts) = finalize_contig(&row.contig_id, finished, params, counts);
        result.counts = counts;
        result.summaries.extend(summary);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::ANNOTATION_COLUMNS;
    use std::collections::HashMap;

    fn row(query: &str, go: &str, tax: &str) -> AnnotationRow {
        let mut cells = vec![String::new(); ANNOTATION_COLUMNS.len()];
        cells[0] = query.to_string();
        cells[Category::Go.column()] = go.to_string();
        cells[17] = tax.to_string();
        AnnotationRow::from_cells(&cells).unwrap()
    }

    fn allowed(ids: &[&str]) -> AllowedContigs {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_boundaries_use_lookahead() {
        let keys = ["A", "A", "B", "B", "B", "C"];
        assert_eq!(contig_boundaries(&keys), vec![1, 4, 5]);
        assert!(!is_contig_end(&keys, 0));
        assert!(is_contig_end(&keys, 5));
        let empty: [&str; 0] = [];
        assert!(contig_boundaries(&empty).is_empty());
    }

    #[test]
    fn test_state_counts() {
        let policy = TokenPolicy::default();
        let mut state = ContigState::default();
        for r in [
            row("c_1", "GO:1,GO:2", "x"),
            row("c_2", "", "x"),
            row("c_3", "GO:1", "x"),
            row("c_4", "GO:3", "y"),
        ] {
            state.observe(&r, Category::Go, &policy);
        }
        assert_eq!(state.genes(), 4);
        assert_eq!(state.non_hits(), 1);
        assert_eq!(state.feature_hit_freq(), 0.75);
        assert_eq!(state.term_counts().get("GO:1"), Some(2.0));
    }

    #[test]
    fn test_unweighted_pass() {
        let rows = vec![
            row("a_1", "GO:1,GO:2", "x"),
            row("a_2", "GO:1", "x"),
            row("b_1", "GO:9", "y"),
            row("c_1", "", "z"),
        ];
        let coverages = Coverages::new();
        let lengths: ContigLengths = HashMap::from([("a".to_string(), 2500)]);
        let allowed = allowed(&["a", "c"]);
        let policy = TokenPolicy::default();
        let params = AggregationParams {
            category: Category::Go,
            weighting: Weighting::Unweighted,
            coverages: &coverages,
            allowed: &allowed,
            lengths: &lengths,
            taxonomy_threshold: 0.5,
            policy: &policy,
        };

        let result = aggregate_contigs(&rows, &params);
        assert_eq!(result.summaries.len(), 2);
        assert_eq!(result.summaries[0].contig_id, "a");
        assert_eq!(result.summaries[0].contig_length, Some(2500));
        assert_eq!(result.summaries[0].coverage, None);
        assert_eq!(result.summaries[1].contig_id, "c");
        assert_eq!(result.summaries[1].feature_hit_freq, 0.0);
        assert_eq!(result.summaries[1].contig_length, None);

        assert_eq!(result.counts.get("GO:1"), Some(2.0));
        assert_eq!(result.counts.get("GO:2"), Some(1.0));
        assert_eq!(result.counts.get("GO:9"), None);
    }

    #[test]
    fn test_weighted_skips_unknown_coverage() {
        let rows = vec![row("a_1", "GO:1,GO:1,GO:2", "x"), row("b_1", "GO:1", "x")];
        let coverages: Coverages = HashMap::from([("a".to_string(), 10.0)]);
        let lengths = ContigLengths::new();
        let allowed = allowed(&["a", "b"]);
        let policy = TokenPolicy::default();
        let params = AggregationParams {
            category: Category::Go,
            weighting: Weighting::Weighted,
            coverages: &coverages,
            allowed: &allowed,
            lengths: &lengths,
            taxonomy_threshold: 0.5,
            policy: &policy,
        };

        let result = aggregate_contigs(&rows, &params);
        assert_eq!(result.summaries.len(), 1);
        assert_eq!(result.summaries[0].coverage, Some(10.0));
        assert_eq!(result.counts.get("GO:1"), Some(20.0));
        assert_eq!(result.counts.get("GO:2"), Some(10.0));
    }

    #[test]
    fn test_finalize_returns_accumulator() {
        let policy = TokenPolicy::default();
        let mut state = ContigState::default();
        state.observe(&row("a_1", "GO:1", "x"), Category::Go, &policy);
        let coverages = Coverages::new();
        let lengths = ContigLengths::new();
        let allowed = allowed(&["a"]);
        let params = AggregationParams {
            category: Category::Go,
            weighting: Weighting::Unweighted,
            coverages: &coverages,
            allowed: &allowed,
            lengths: &lengths,
            taxonomy_threshold: 0.5,
            policy: &policy,
        };
        let prior = FeatureCounts::from_terms(["GO:1", "GO:5"]);
        let (summary, counts) = finalize_contig("a", state, &params, prior);
        assert_eq!(summary.unwrap().consensus.label(), "x");
        assert_eq!(counts.get("GO:1"), Some(2.0));
        assert_eq!(counts.get("GO:5"), Some(1.0));
    }
}
