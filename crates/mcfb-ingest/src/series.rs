//! StatVarObservation time-series extraction from TMCF + CSV pairs.
//!
//! Instead of going through the graph, each entity block of the template is
//! filled per CSV row and kept only when it declares
//! `typeOf: dcs:StatVarObservation`. The observation's facet (everything that
//! identifies the series except the date) becomes a string key; dates map to
//! numeric values.

use crate::mcf::should_read_line;
use crate::tmcf::{entity_id, CsvRow, TmcfError, TmcfExpander};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Facet id → (observation date → value). Dates stay ordered for display.
pub type TimeData = HashMap<String, BTreeMap<String, Option<f64>>>;

/// The identifying components of one time series. Empty strings stand for
/// absent components so the id round-trips.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Facet {
    pub variable_measured: String,
    pub observation_about: String,
    pub provenance: String,
    pub measurement_method: String,
    pub observation_period: String,
    pub unit: String,
    pub scaling_factor: Option<f64>,
}

impl Facet {
    /// Comma-joined id. The scaling factor defaults to `1`.
    pub fn to_id(&self) -> String {
        let scaling = self
            .scaling_factor
            .map(|f| f.to_string())
            .unwrap_or_else(|| "1".to_string());
        [
            self.variable_measured.as_str(),
            self.observation_about.as_str(),
            self.provenance.as_str(),
            self.measurement_method.as_str(),
            self.observation_period.as_str(),
            self.unit.as_str(),
            &scaling,
        ]
        .join(",")
    }

    pub fn from_id(id: &str) -> Facet {
        let parts: Vec<&str> = id.split(',').collect();
        let get = |i: usize| parts.get(i).copied().unwrap_or("").to_string();
        Facet {
            variable_measured: get(0),
            observation_about: get(1),
            provenance: get(2),
            measurement_method: get(3),
            observation_period: get(4),
            unit: get(5),
            scaling_factor: parts.get(6).and_then(|s| s.parse().ok()),
        }
    }
}

/// A materialized series: its facet plus date-ordered points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub facet: Facet,
    /// `(date, value)` pairs in date order.
    pub points: Vec<(String, f64)>,
}

/// Splits a TMCF template into one sub-template per `Node:` block.
pub fn entity_templates(template: &str) -> Vec<String> {
    let mut templates = Vec::new();
    let mut current = String::new();
    for line in template.lines() {
        let line = line.trim();
        if line.starts_with("Node") && !current.is_empty() {
            templates.push(std::mem::take(&mut current));
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.is_empty() {
        templates.push(current);
    }
    templates
}

/// Fills one entity template against one row and, when the entity is a
/// StatVarObservation, returns `(facet id, date, value)`.
fn facet_and_value(
    expander: &TmcfExpander,
    entity_template: &str,
    row: &CsvRow,
) -> Result<Option<(String, String, String)>, TmcfError> {
    let mut properties: HashMap<String, String> = HashMap::new();
    for line in entity_template.split('\n') {
        let trimmed = line.trim();
        if !should_read_line(trimmed) {
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
            let id = match entity_id(region) {
                Some(entity) => expander.local_id_from_entity_id(entity),
                None => region.to_string(),
            };
            properties.insert(label.to_string(), id);
        } else {
            properties.insert(label.to_string(), expander.fill_prop_values(region, row));
        }
    }

    // Ignore anything that is not a statistical observation.
    if properties.get("typeOf").map(String::as_str) != Some("dcs:StatVarObservation") {
        return Ok(None);
    }

    let get = |key: &str| properties.get(key).cloned().unwrap_or_default();
    let facet = Facet {
        variable_measured: get("variableMeasured"),
        observation_about: get("observationAbout"),
        provenance: get("provenance"),
        measurement_method: get("measurementMethod"),
        observation_period: get("observationPeriod"),
        unit: get("unit"),
        scaling_factor: properties.get("scalingFactor").and_then(|s| s.parse().ok()),
    };
    Ok(Some((facet.to_id(), get("observationDate"), get("value"))))
}

/// Walks every row × entity template and collects datapoints per facet.
pub fn csv_to_datapoints(template: &str, csv_rows: &[CsvRow]) -> Result<TimeData, TmcfError> {
    let mut expander = TmcfExpander::new();
    expander.csv_index = 1;

    let mut datapoints = TimeData::new();
    let templates = entity_templates(template);
    for row in csv_rows {
        for entity_template in &templates {
            if let Some((facet, date, value)) = facet_and_value(&expander, entity_template, row)? {
                let parsed = if value.is_empty() { None } else { value.parse().ok() };
                datapoints.entry(facet).or_default().insert(date, parsed);
            }
        }
        expander.csv_index += 1;
    }
    Ok(datapoints)
}

/// Unions `new_data` into `datapoints`, newer dates overriding per facet.
pub fn merge_datapoints(datapoints: &mut TimeData, new_data: TimeData) {
    for (facet, points) in new_data {
        datapoints.entry(facet).or_default().extend(points);
    }
}

/// Materializes every facet of `datapoints` as a [`Series`]. Facets missing
/// the variable or the observed entity are reported as error messages
/// instead.
pub fn series_from_datapoints(datapoints: &TimeData) -> (Vec<Series>, Vec<String>) {
    let mut series = Vec::new();
    let mut errors = Vec::new();

    for (facet_id, values) in datapoints {
        let facet = Facet::from_id(facet_id);
        if facet.variable_measured.is_empty() || facet.observation_about.is_empty() {
            let message = if facet.variable_measured.is_empty() && facet.observation_about.is_empty()
            {
                "data point is missing variableMeasured and observationAbout"
            } else if facet.variable_measured.is_empty() {
                "data point is missing variableMeasured"
            } else {
                "data point is missing observationAbout"
            };
            errors.push(format!("{facet_id}: {message}"));
            continue;
        }

        let points = values
            .iter()
            .filter_map(|(date, value)| value.map(|v| (date.clone(), v)))
            .collect();
        series.push(Series { facet, points });
    }

    (series, errors)
}
