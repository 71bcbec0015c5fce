/// Majority-vote taxonomy for one contig
use indexmap::IndexMap;

/// Placeholder written for both fields when no label clears the threshold
pub const NO_CONSENSUS: &str = "NA";

/// Consensus taxonomy of a contig
#[derive(Debug, Clone, PartialEq)]
pub enum Consensus {
    Agreed { label: String, frequency: f64 },
    NoConsensus,
}

impl Consensus {
    pub fn label(&self) -> &str {
        match self {
            Consensus::Agreed { label, .. } => label,
            Consensus::NoConsensus => NO_CONSENSUS,
        }
    }

    /// Frequency rounded to 2 decimals, `None` without consensus
    pub fn frequency(&self) -> Option<f64> {
        match self {
            Consensus::Agreed { frequency, .. } => Some(*frequency),
            Consensus::NoConsensus => None,
        }
    }
}

/// Round to 2 decimals on the exact binary value, ties to the even digit:
/// 0.625 -> 0.62, 0.125 -> 0.12, 2/3 -> 0.67
pub fn round2(value: f64) -> f64 {
    format!("{value:.2}").parse().unwrap_or(value)
}

/// Pick the first label (in first-seen order) whose share of the contig's
/// genes reaches `threshold`.
///
/// Ties are settled by first appearance in `labels`, never by frequency rank
/// or name, so `[y, x, x, y]` at 0.5 yields `y`.
pub fn consensus_taxonomy<S: AsRef<str>>(labels: &[S], gene_count: usize, threshold: f64) -> Consensus {
    if gene_count == 0 {
        return Consensus::NoConsensus;
    }

    let mut tally: IndexMap<&str, usize> = IndexMap::new();
    for label in labels {
        *tally.entry(label.as_ref()).or_insert(0) += 1;
    }

    tally
        .into_iter()
        .find_map(|(label, count)| {
            let frequency = count as f64 / gene_count as f64;
            (frequency >= threshold).then(|| Consensus::Agreed {
                label: label.to_string(),
                frequency: round2(frequency),
            })
        })
        .unwrap_or(Consensus::NoConsensus)
}
