/// eggNOG-mapper annotation table model
///
/// The annotation output is a headerless, tab-delimited table with one gene
/// per row. Rows are kept in file order: the aggregation pass relies on all
/// genes of one contig being contiguous.
use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::input::open_input;

/// Column layout of eggNOG-mapper annotation output
pub const ANNOTATION_COLUMNS: [&str; 22] = [
    "query_name",
    "seed_eggNOG_ortholog",
    "seed_ortholog_evalue",
    "seed_ortholog_score",
    "best_tax_level",
    "Preferred_name",
    "GO",
    "EC",
    "KEGG_ko",
    "KEGG_Pathway",
    "KEGG_Module",
    "KEGG_Reaction",
    "KEGG_rclass",
    "BRITE",
    "KEGG_TC",
    "CAZy",
    "BiGG_Reaction",
    "taxonomic_scope",
    "eggNOG_OGs",
    "best_eggNOG_OG",
    "COG",
    "eggNOG_free_text_desc",
];

const QUERY_COLUMN: usize = 0;
const TAXONOMIC_SCOPE_COLUMN: usize = 17;

/// Label used for a gene whose taxonomic scope is missing
pub const MISSING_LABEL: &str = "NA";

/// Cell values treated as missing (the pandas default NA strings)
const NULL_MARKERS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_null_value(value: &str) -> bool {
    NULL_MARKERS.contains(&value)
}

/// Annotation categories that can be turned into feature tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Go,
    Ec,
    KeggKo,
    Cog,
    KeggModule,
    KeggReaction,
    KeggRclass,
    Brite,
    KeggTc,
    Cazy,
    BiggReaction,
    EggnogOgs,
}

impl Category {
    /// Processing order of an ALL_CATEGORIES run
    pub const ALL: [Category; 12] = [
        Category::Go,
        Category::Ec,
        Category::KeggKo,
        Category::Cog,
        Category::KeggModule,
        Category::KeggReaction,
        Category::KeggRclass,
        Category::Brite,
        Category::KeggTc,
        Category::Cazy,
        Category::BiggReaction,
        Category::EggnogOgs,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Go => "GO",
            Category::Ec => "EC",
            Category::KeggKo => "KEGG_ko",
            Category::Cog => "COG",
            Category::KeggModule => "KEGG_Module",
            Category::KeggReaction => "KEGG_Reaction",
            Category::KeggRclass => "KEGG_rclass",
            Category::Brite => "BRITE",
            Category::KeggTc => "KEGG_TC",
            Category::Cazy => "CAZy",
            Category::BiggReaction => "BiGG_Reaction",
            Category::EggnogOgs => "eggNOG_OGs",
        }
    }

    /// Position of this category in `ANNOTATION_COLUMNS`
    pub fn column(&self) -> usize {
        match self {
            Category::Go => 6,
            Category::Ec => 7,
            Category::KeggKo => 8,
            Category::KeggModule => 10,
            Category::KeggReaction => 11,
            Category::KeggRclass => 12,
            Category::Brite => 13,
            Category::KeggTc => 14,
            Category::Cazy => 15,
            Category::BiggReaction => 16,
            Category::EggnogOgs => 18,
            Category::Cog => 20,
        }
    }

    pub fn from_name(name: &str) -> Option<Category> {
        Category::ALL.iter().copied().find(|c| c.name() == name)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which categories one invocation processes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategorySelection {
    All,
    Single(Category),
}

impl CategorySelection {
    pub const ALL_SENTINEL: &'static str = "ALL_CATEGORIES";

    pub fn categories(&self) -> Vec<Category> {
        match self {
            CategorySelection::All => Category::ALL.to_vec(),
            CategorySelection::Single(category) => vec![*category],
        }
    }

    pub fn includes(&self, category: Category) -> bool {
        match self {
            CategorySelection::All => true,
            CategorySelection::Single(c) => *c == category,
        }
    }
}

impl fmt::Display for CategorySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategorySelection::All => f.write_str(Self::ALL_SENTINEL),
            CategorySelection::Single(category) => category.fmt(f),
        }
    }
}

/// Parse a category option (used as a clap value parser)
pub fn parse_category(s: &str) -> Result<CategorySelection, String> {
    if s == CategorySelection::ALL_SENTINEL {
        return Ok(CategorySelection::All);
    }
    Category::from_name(s)
        .map(CategorySelection::Single)
        .ok_or_else(|| {
            let options: Vec<&str> = Category::ALL.iter().map(|c| c.name()).collect();
            format!(
                "Bad category selection '{s}' (options: {}, {})",
                CategorySelection::ALL_SENTINEL,
                options.join(", ")
            )
        })
}

/// Parent contig of a gene: the query id without its final `_<suffix>`.
///
/// "1059893_contig_1_1" -> "1059893_contig_1"
pub fn contig_key(query_id: &str) -> Option<&str> {
    query_id.rsplit_once('_').map(|(contig, _gene)| contig)
}

/// One gene-level annotation
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRow {
    pub query_id: String,
    pub contig_id: String,
    /// Every column after the query id, `None` where the cell is missing
    columns: Vec<Option<String>>,
}

impl AnnotationRow {
    /// Build a row from raw cells (cell 0 is the query id)
    pub fn from_cells<S: AsRef<str>>(cells: &[S]) -> Result<Self> {
        let query_id = cells
            .get(QUERY_COLUMN)
            .map(|c| c.as_ref().trim())
            .filter(|q| !q.is_empty())
            .context("Annotation row has an empty query id")?;

        let Some(contig_id) = contig_key(query_id) else {
            bail!("Query id '{query_id}' has no '_<gene>' suffix to derive a contig id from");
        };

        let columns = (0..ANNOTATION_COLUMNS.len())
            .map(|i| {
                cells
                    .get(i)
                    .map(|c| c.as_ref())
                    .filter(|c| !is_null_value(c))
                    .map(str::to_string)
            })
            .collect();

        Ok(AnnotationRow {
            query_id: query_id.to_string(),
            contig_id: contig_id.to_string(),
            columns,
        })
    }

    /// Raw value of a category, `None` when missing
    pub fn value(&self, category: Category) -> Option<&str> {
        self.columns
            .get(category.column())
            .and_then(|v| v.as_deref())
    }

    /// Taxonomic scope label; missing labels read as "NA"
    pub fn taxonomic_scope(&self) -> &str {
        self.columns
            .get(TAXONOMIC_SCOPE_COLUMN)
            .and_then(|v| v.as_deref())
            .unwrap_or(MISSING_LABEL)
    }
}

/// The whole annotation table, materialized in file order
#[derive(Debug, Default, Clone)]
pub struct AnnotationTable {
    rows: Vec<AnnotationRow>,
}

impl AnnotationTable {
    pub fn new(rows: Vec<AnnotationRow>) -> Self {
        Self { rows }
    }

    /// Load a headerless annotation TSV (plain, .gz or .bgz).
    ///
    /// Lines starting with '#' are eggNOG-mapper metadata and are skipped.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .comment(Some(b'#'))
            .from_reader(open_input(path)?);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.with_context(|| format!("Failed to read {}", path.display()))?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let cells: Vec<&str> = record.iter().collect();
            let row = AnnotationRow::from_cells(&cells)
                .with_context(|| format!("{}:{line}", path.display()))?;
            rows.push(row);
        }

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[AnnotationRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct contig ids in first-seen order
    pub fn contig_ids(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.rows
            .iter()
            .map(|r| r.contig_id.as_str())
            .filter(|c| seen.insert(*c))
            .collect()
    }
}

/// Predicate deciding whether a split token counts as a feature
pub type TokenFilter = fn(&str) -> bool;

/// Per-category token cleaning rules.
///
/// Categories without a registered filter keep every token.
#[derive(Debug, Clone)]
pub struct TokenPolicy {
    filters: HashMap<Category, TokenFilter>,
}

impl TokenPolicy {
    /// Policy with no cleaning at all
    pub fn empty() -> Self {
        Self {
            filters: HashMap::new(),
        }
    }

    pub fn register(&mut self, category: Category, filter: TokenFilter) {
        self.filters.insert(category, filter);
    }

    pub fn keeps(&self, category: Category, token: &str) -> bool {
        self.filters.get(&category).map_or(true, |f| f(token))
    }

    /// Split a category value on commas, dropping tokens the policy rejects
    pub fn tokens<'a>(&'a self, category: Category, value: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        value.split(',').filter(move |t| self.keeps(category, t))
    }
}

impl Default for TokenPolicy {
    fn default() -> Self {
        let mut policy = Self::empty();
        // COG letters arrive as noise fragments; single letters and blanks are dropped.
        policy.register(Category::Cog, |token| token.chars().count() > 1);
        policy
    }
}
