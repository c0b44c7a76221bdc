//! Batch loading of MCF, TMCF and CSV files into one session graph.
//!
//! Files are processed in the order given. Plain `.mcf` files parse
//! directly; a `.tmcf` template is held until the next file that is neither
//! `.mcf` nor `.tmcf`, which is read as its CSV data. A template that never
//! meets a data file is dropped, as is a data file with no template ahead
//! of it.

use anyhow::{Context, Result};
use mcfb_graph::Graph;
use mcfb_ingest::mcf::{McfParser, ParseError};
use mcfb_ingest::series::{csv_to_datapoints, merge_datapoints, TimeData};
use mcfb_ingest::tmcf::{expand_and_parse, read_csv_rows};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The parse outcome of one file (or one template + data pair).
#[derive(Debug, Serialize)]
pub struct FileReport {
    pub file_name: String,
    pub local_nodes: Vec<String>,
    pub errors: Vec<ParseError>,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|ext| ext.to_str()).unwrap_or("")
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// One unit of parse work after template/data pairing.
#[derive(Debug, PartialEq, Eq)]
enum FileTask {
    Mcf(PathBuf),
    Pair { template: PathBuf, data: PathBuf },
}

/// Orders the batch into parse tasks. At most one template is pending at a
/// time: when several `.tmcf` files precede one data file, the later
/// template replaces the earlier (last wins) and the shadowed one is
/// dropped, the same way a trailing template with no data file is.
fn plan(paths: &[PathBuf]) -> Vec<FileTask> {
    let mut tasks = Vec::new();
    let mut pending_template: Option<PathBuf> = None;
    for path in paths {
        match extension(path) {
            "mcf" => tasks.push(FileTask::Mcf(path.clone())),
            "tmcf" => {
                if let Some(dropped) = pending_template.replace(path.clone()) {
                    debug!(template = %dropped.display(), "template had no data file");
                }
            }
            _ => {
                if let Some(template) = pending_template.take() {
                    tasks.push(FileTask::Pair {
                        template,
                        data: path.clone(),
                    });
                } else {
                    debug!(data = %path.display(), "data file had no template");
                }
            }
        }
    }
    if let Some(dropped) = pending_template {
        debug!(template = %dropped.display(), "template had no data file");
    }
    tasks
}

/// Parses every file into `graph`, returning one report per parsed unit.
/// Syntax errors land in the reports; structural template errors and I/O
/// failures abort the batch.
pub fn parse_files(graph: &mut Graph, paths: &[PathBuf]) -> Result<Vec<FileReport>> {
    let mut reports = Vec::new();
    for task in plan(paths) {
        match task {
            FileTask::Mcf(path) => {
                let text = read(&path)?;
                let name = file_name(&path);
                let result = McfParser::new(graph, &name).parse_mcf_str(&text);
                reports.push(FileReport {
                    file_name: name,
                    local_nodes: result.local_nodes,
                    errors: result.errors,
                });
            }
            FileTask::Pair { template, data } => {
                let template_text = read(&template)?;
                let data_text = read(&data)?;
                let template_name = file_name(&template);
                let data_name = file_name(&data);
                let result = expand_and_parse(
                    graph,
                    &template_text,
                    &data_text,
                    &template_name,
                    &data_name,
                )
                .with_context(|| format!("failed to expand {template_name}"))?;
                reports.push(FileReport {
                    file_name: format!("{template_name}&{data_name}"),
                    local_nodes: result.local_nodes,
                    errors: result.errors,
                });
            }
        }
    }
    Ok(reports)
}

/// Extracts StatVarObservation datapoints from every template + data pair,
/// merged across pairs per facet.
pub fn extract_datapoints(paths: &[PathBuf]) -> Result<TimeData> {
    let mut datapoints = TimeData::new();
    for task in plan(paths) {
        let FileTask::Pair { template, data } = task else {
            continue;
        };
        let template_text = read(&template)?;
        let rows = read_csv_rows(&read(&data)?)
            .with_context(|| format!("failed to read {}", data.display()))?;
        let pair_data = csv_to_datapoints(&template_text, &rows)
            .with_context(|| format!("failed to expand {}", template.display()))?;
        merge_datapoints(&mut datapoints, pair_data);
    }
    Ok(datapoints)
}
