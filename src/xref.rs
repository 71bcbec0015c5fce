/// Gene Ontology cross-reference tables and count translation
///
/// Each table maps a GO id to the ids of one sibling namespace (EC, Pfam,
/// InterPro, ...). Tables are read from `<dir>/<namespace>.clean`, a
/// tab-delimited file of `namespace_id, GO description, GO id` rows.
use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use log::info;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use crate::counts::FeatureCounts;
use crate::input::open_input;

/// Namespaces with a GO cross-reference table, in output order
pub const XREF_NAMESPACES: [&str; 18] = [
    "ec2go",
    "hamap2go",
    "interpro2go",
    "kegg_reaction2go",
    "metacyc2go",
    "pfam2go",
    "pirsf2go",
    "prosite2go",
    "reactome2go",
    "rfam2go",
    "rhea2go",
    "smart2go",
    "um-bbd_enzymeid2go",
    "um-bbd_pathwayid2go",
    "um-bbd_reactionid2go",
    "uniprotkb_kw2go",
    "uniprotkb_sl2go",
    "unirule2go",
];

/// GO id -> ordered list of ids in one namespace
pub type XrefTable = HashMap<String, Vec<String>>;

/// Read one `.clean` table
pub fn read_xref_table<P: AsRef<Path>>(path: P) -> Result<XrefTable> {
    let path = path.as_ref();
    let mut table = XrefTable::new();

    for (line_no, line) in open_input(path)?.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 3 {
            bail!(
                "{}:{}: expected 3 tab-separated columns, found {}",
                path.display(),
                line_no + 1,
                fields.len()
            );
        }
        table
            .entry(fields[2].to_string())
            .or_default()
            .push(fields[0].to_string());
    }

    Ok(table)
}

/// All cross-reference tables, keyed by namespace
#[derive(Debug, Clone, Default)]
pub struct GoXrefs {
    tables: IndexMap<String, XrefTable>,
}

impl GoXrefs {
    /// Load every namespace in `XREF_NAMESPACES` from `dir`
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut tables = IndexMap::new();
        for namespace in XREF_NAMESPACES {
            let path = dir.join(format!("{namespace}.clean"));
            let table = read_xref_table(&path)
                .with_context(|| format!("Failed to load GO cross-reference table {namespace}"))?;
            tables.insert(namespace.to_string(), table);
        }
        Ok(Self { tables })
    }

    pub fn from_tables(tables: IndexMap<String, XrefTable>) -> Self {
        Self { tables }
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|k| k.as_str())
    }

    pub fn get(&self, namespace: &str) -> Option<&XrefTable> {
        self.tables.get(namespace)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &XrefTable)> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Fan GO counts out into one namespace.
///
/// Every mapped target receives the full source count: a GO term mapping to
/// two ids contributes twice its count to the output total. Unmapped and
/// zero-count terms contribute nothing.
pub fn translate_counts(counts: &FeatureCounts, table: &XrefTable) -> FeatureCounts {
    let mut translated = FeatureCounts::new();
    for (term, count) in counts.iter() {
        if count == 0.0 {
            continue;
        }
        for target in table.get(term).into_iter().flatten() {
            translated.add(target, count);
        }
    }
    translated
}

/// Translate counts into every namespace, coercing to presence/absence when
/// `binary` is set
pub fn translate_all(counts: &FeatureCounts, xrefs: &GoXrefs, binary: bool) -> IndexMap<String, FeatureCounts> {
    xrefs
        .iter()
        .map(|(namespace, table)| {
            info!("Converting...{namespace}...");
            let translated = translate_counts(counts, table);
            let translated = if binary { translated.to_binary() } else { translated };
            (namespace.to_string(), translated)
        })
        .collect()
}
