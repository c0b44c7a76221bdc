//! TMCF + CSV template expansion.
//!
//! A TMCF template is an MCF document whose value regions may contain two
//! placeholder forms, resolved once per CSV row:
//!
//! - entity references `E:<dataset>-><label>`, rewritten to the row-scoped
//!   local id `<dataset>_<label>_R<row>` (1-based row index), and
//! - column references `C:<dataset>-><column>`, replaced by the row's value
//!   for that column.
//!
//! Expansion produces one plain-MCF document per row; the concatenation is
//! fed through [`crate::mcf::McfParser`] with a joint `tmcf&csv` provenance.

use crate::mcf::{should_read_line, McfParser, ParseResult};
use mcfb_graph::Graph;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

/// One CSV row, keyed by column header.
pub type CsvRow = HashMap<String, String>;

/// Structural template errors. Unlike MCF syntax errors these abort the
/// expansion of the file: the output would be ill-defined otherwise.
#[derive(Debug, Error)]
pub enum TmcfError {
    #[error("cannot have multiple ids for Node declaration: {line:?}")]
    MultipleNodeIds { line: String },
    #[error("failed to read csv: {0}")]
    Csv(#[from] csv::Error),
}

fn entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("E:(.*)->(.*)").expect("static regex"))
}

fn column_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("C:(.*)->(.*)").expect("static regex"))
}

/// The entity reference contained in `text`, if any.
pub fn entity_id(text: &str) -> Option<&str> {
    entity_re().find(text).map(|m| m.as_str())
}

/// The column reference contained in `text`, if any.
pub fn column_id(text: &str) -> Option<&str> {
    column_re().find(text).map(|m| m.as_str())
}

/// Per-row template filler. `csv_index` is the 1-based index of the row
/// currently being expanded; entity ids generated for different rows never
/// collide because the index is baked into the local id.
pub struct TmcfExpander {
    pub csv_index: usize,
}

impl Default for TmcfExpander {
    fn default() -> Self {
        Self::new()
    }
}

impl TmcfExpander {
    pub fn new() -> Self {
        TmcfExpander { csv_index: 0 }
    }

    /// Row-scoped local id for an entity reference.
    /// Ex: `E:SomeDataset->E1` => `SomeDataset_E1_R7` while on row 7.
    pub fn local_id_from_entity_id(&self, entity_id: &str) -> String {
        let base = entity_id.replacen("E:", "", 1).replacen("->", "_", 1);
        format!("{base}_R{}", self.csv_index)
    }

    /// Rewrites one value region: entity references become `l:` local ids,
    /// column references become the row's literal value (missing columns
    /// substitute the empty string), everything else passes through. Template
    /// value regions split on every comma.
    pub fn fill_prop_values(&self, prop_values: &str, csv_row: &CsvRow) -> String {
        let mut filled = Vec::new();
        for piece in prop_values.split(',') {
            if let Some(entity) = entity_id(piece) {
                let local_id = format!("l:{}", self.local_id_from_entity_id(entity));
                filled.push(piece.replacen(entity, &local_id, 1));
            } else if let Some(col) = column_id(piece) {
                // The column name is the first `->`-delimited segment after
                // the dataset, even in degenerate references with more arrows.
                let col_name = col.split("->").nth(1).unwrap_or("");
                let value = csv_row.get(col_name).cloned().unwrap_or_default();
                filled.push(piece.replacen(col, &value, 1));
            } else {
                filled.push(piece.to_string());
            }
        }
        filled.join(",")
    }

    /// Expands the whole template against one CSV row. Comment and blank
    /// template lines are preserved as blank output lines so that error line
    /// numbers in the generated MCF track the template.
    pub fn fill_template_from_row(
        &self,
        template: &str,
        csv_row: &CsvRow,
    ) -> Result<String, TmcfError> {
        let mut filled = Vec::new();
        for line in template.split('\n') {
            let trimmed = line.trim();
            if !should_read_line(trimmed) {
                filled.push(String::new());
                continue;
            }

            let (label, region) = match trimmed.split_once(':') {
                Some((label, rest)) => (label.trim(), rest.trim()),
                None => (trimmed, trimmed),
            };

            if label == "Node" {
                if region.contains(',') {
                    return Err(TmcfError::MultipleNodeIds {
                        line: trimmed.to_string(),
                    });
                }
                if let Some(entity) = entity_id(region) {
                    filled.push(format!("Node: {}", self.local_id_from_entity_id(entity)));
                } else {
                    filled.push(format!("Node: {region}"));
                }
            } else {
                filled.push(format!("{label}: {}", self.fill_prop_values(region, csv_row)));
            }
        }
        Ok(filled.join("\n"))
    }

    /// Expands the template once per CSV row (rows are 1-indexed) and
    /// concatenates the per-row documents into one MCF string.
    pub fn csv_to_mcf(&mut self, template: &str, csv_rows: &[CsvRow]) -> Result<String, TmcfError> {
        self.csv_index = 1;
        let mut documents = Vec::new();
        for row in csv_rows {
            documents.push(self.fill_template_from_row(template, row)?);
            self.csv_index += 1;
        }
        debug!(rows = csv_rows.len(), "expanded tmcf template");
        Ok(documents.join("\n"))
    }
}

/// Reads CSV text into header-keyed rows.
pub fn read_csv_rows(data: &str) -> Result<Vec<CsvRow>, TmcfError> {
    let mut reader = csv::Reader::from_reader(data.as_bytes());
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: CsvRow = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Expands a TMCF template against CSV text and parses the generated MCF
/// into `graph`, with the joint provenance `<tmcf_name>&<csv_name>`.
pub fn expand_and_parse(
    graph: &mut Graph,
    template: &str,
    csv_data: &str,
    tmcf_name: &str,
    csv_name: &str,
) -> Result<ParseResult, TmcfError> {
    let rows = read_csv_rows(csv_data)?;
    let mcf = TmcfExpander::new().csv_to_mcf(template, &rows)?;
    let parser = McfParser::new(graph, &format!("{tmcf_name}&{csv_name}"));
    Ok(parser.parse_mcf_str(&mcf))
}
