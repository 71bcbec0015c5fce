/// Term -> count accumulator shared by the aggregation, translation and
/// export stages.
use indexmap::IndexMap;

/// Feature count table keyed by term id, in first-seen term order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCounts {
    counts: IndexMap<String, f64>,
}

impl FeatureCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tally raw term occurrences
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut counts = Self::new();
        for term in terms {
            counts.add(term.as_ref(), 1.0);
        }
        counts
    }

    pub fn add(&mut self, term: &str, value: f64) {
        if let Some(count) = self.counts.get_mut(term) {
            *count += value;
        } else {
            self.counts.insert(term.to_string(), value);
        }
    }

    /// Add every count of `other`, multiplied by `scale`.
    ///
    /// Terms whose scaled contribution is not positive are left out, so a
    /// table never gains zero-count entries from a merge.
    pub fn merge_scaled(&mut self, other: &FeatureCounts, scale: f64) {
        for (term, count) in &other.counts {
            let value = count * scale;
            if value > 0.0 {
                self.add(term, value);
            }
        }
    }

    pub fn merge(&mut self, other: &FeatureCounts) {
        self.merge_scaled(other, 1.0);
    }

    /// Presence/absence view: every nonzero count becomes exactly 1
    pub fn to_binary(&self) -> FeatureCounts {
        let counts = self
            .counts
            .iter()
            .map(|(term, &count)| (term.clone(), if count != 0.0 { 1.0 } else { count }))
            .collect();
        FeatureCounts { counts }
    }

    pub fn get(&self, term: &str) -> Option<f64> {
        self.counts.get(term).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts
    pub fn total(&self) -> f64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.counts.iter().map(|(term, &count)| (term.as_str(), count))
    }
}

impl FromIterator<(String, f64)> for FeatureCounts {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        let mut counts = FeatureCounts::new();
        for (term, value) in iter {
            counts.add(&term, value);
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_terms() {
        let counts = FeatureCounts::from_terms(["t1", "t2", "t1"]);
        assert_eq!(counts.get("t1"), Some(2.0));
        assert_eq!(counts.get("t2"), Some(1.0));
        assert_eq!(counts.len(), 2);
        let order: Vec<&str> = counts.iter().map(|(t, _)| t).collect();
        assert_eq!(order, vec!["t1", "t2"]);
    }

    #[test]
    fn test_merge_scaled() {
        let contig = FeatureCounts::from_terms(["t1", "t1", "t2"]);
        let mut global = FeatureCounts::from_terms(["t2"]);
        global.merge_scaled(&contig, 10.0);
        assert_eq!(global.get("t1"), Some(20.0));
        assert_eq!(global.get("t2"), Some(11.0));
    }

    #[test]
    fn test_merge_drops_zero_contributions() {
        let contig = FeatureCounts::from_terms(["t1"]);
        let mut global = FeatureCounts::new();
        global.merge_scaled(&contig, 0.0);
        assert!(global.is_empty());
    }

    #[test]
    fn test_binary() {
        let counts: FeatureCounts = vec![("a".to_string(), 7.0), ("b".to_string(), 0.5)]
            .into_iter()
            .collect();
        let binary = counts.to_binary();
        assert_eq!(binary.get("a"), Some(1.0));
        assert_eq!(binary.get("b"), Some(1.0));
        assert_eq!(binary.to_binary(), binary);
        assert_eq!(counts.total(), 7.5);
    }
}
