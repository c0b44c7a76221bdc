//! Line-oriented MCF parser.
//!
//! One line is one parsing decision. A malformed line records a
//! [`ParseError`] and parsing continues with the next line; errors never
//! abort the document. The property label drives an implicit state machine:
//! `Node:` establishes the current subject, `dcid:` binds its knowledge-graph
//! id, anything else creates one assertion per parsed value.

use mcfb_graph::{Graph, NodeId, Target, DCID_NS, LOCAL_NS};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Recognized value-region namespaces. `schema:`, `dcs:` and `dcid:` are all
/// aliases for the dcid namespace; `l:` is the local namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Namespace {
    L,
    Schema,
    Dcs,
    Dcid,
}

impl Namespace {
    pub fn from_alias(alias: &str) -> Option<Self> {
        match alias {
            "l" => Some(Namespace::L),
            "schema" => Some(Namespace::Schema),
            "dcs" => Some(Namespace::Dcs),
            "dcid" => Some(Namespace::Dcid),
            _ => None,
        }
    }

    /// The registry prefix this alias resolves to.
    pub fn resolved_prefix(self) -> &'static str {
        match self {
            Namespace::L => LOCAL_NS,
            Namespace::Schema | Namespace::Dcs | Namespace::Dcid => DCID_NS,
        }
    }

    pub fn is_remote(self) -> bool {
        self.resolved_prefix() == DCID_NS
    }
}

/// One parsed element of a line's comma-separated value region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ParsedValue {
    /// `namespace:reference` with a recognized namespace.
    Ref { ns: Namespace, reference: String },
    /// Anything else, with wrapping quotes and whitespace stripped.
    Literal(String),
}

/// Fixed vocabulary of MCF syntax errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum ParseErrorKind {
    #[error("error in declaring node")]
    InvalidNodeDeclaration,
    #[error("invalid namespace in node declaration")]
    InvalidNodeNamespace,
    #[error("unrecognized namespace")]
    UnrecognizedNamespace,
    #[error("current node must be set before setting dcid")]
    DcidBeforeNode,
    #[error("a node can only have one dcid")]
    MultipleDcids,
    #[error("dcid property must be a string, not a node reference")]
    DcidNodeRef,
    #[error("cannot set dcid for current node; check if dcid is already set")]
    DcidConflict,
    #[error("current node must be set before declaring properties")]
    PropertyBeforeNode,
    #[error("missing ':', incorrect mcf triple format")]
    MissingColon,
    #[error("missing property label")]
    MissingLabel,
}

/// A recorded syntax error: where it happened and which kind it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseError {
    /// 1-based line number, or -1 when no line context exists.
    pub line_num: i64,
    /// The raw offending line.
    pub line: String,
    pub kind: ParseErrorKind,
}

/// Outcome of scanning one MCF document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseResult {
    /// Subject ids declared across the session so far, in declaration order.
    pub local_nodes: Vec<String>,
    pub errors: Vec<ParseError>,
}

/// False for blank lines and `//` / `#` comments.
pub fn should_read_line(line: &str) -> bool {
    !(line.is_empty() || line.starts_with("//") || line.starts_with('#'))
}

/// Splits a value region on commas that are not inside double-quoted
/// substrings. Unbalanced quotes are unsupported.
pub fn split_prop_values(region: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in region.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => pieces.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    pieces.push(current);
    pieces
}

/// Strips any leading/trailing run of spaces and double quotes.
fn strip_literal(piece: &str) -> String {
    piece.trim_matches(|c| c == ' ' || c == '"').to_string()
}

/// Single-pass MCF parser over a session [`Graph`].
pub struct McfParser<'g> {
    graph: &'g mut Graph,
    /// Provenance recorded on every assertion, normally the file name.
    prov: String,
    cur_node: Option<NodeId>,
    line_num: i64,
    line: String,
    errors: Vec<ParseError>,
}

impl<'g> McfParser<'g> {
    pub fn new(graph: &'g mut Graph, file_name: &str) -> Self {
        McfParser {
            graph,
            prov: file_name.to_string(),
            cur_node: None,
            line_num: -1,
            line: String::new(),
            errors: Vec::new(),
        }
    }

    /// Scans the whole document, accumulating errors, and returns them along
    /// with the session's subject-id list.
    pub fn parse_mcf_str(mut self, text: &str) -> ParseResult {
        self.line_num = 1;
        for raw in text.split('\n') {
            self.line = raw.to_string();
            self.parse_line(raw);
            self.line_num += 1;
        }
        debug!(
            prov = %self.prov,
            errors = self.errors.len(),
            subjects = self.graph.subject_ids().len(),
            "parsed mcf document"
        );
        ParseResult {
            local_nodes: self.graph.subject_ids().to_vec(),
            errors: self.errors,
        }
    }

    fn record(&mut self, kind: ParseErrorKind) {
        self.errors.push(ParseError {
            line_num: self.line_num,
            line: self.line.clone(),
            kind,
        });
    }

    /// Parses one line: comment/blank handling, label/value split, then the
    /// label-driven dispatch.
    pub fn parse_line(&mut self, raw: &str) {
        let line = raw.trim();
        if !should_read_line(line) {
            return; // not an error
        }

        let Some((label, rest)) = line.split_once(':') else {
            self.record(ParseErrorKind::MissingColon);
            return;
        };
        let label = label.trim();
        let region = rest.trim();

        if label.is_empty() {
            self.record(ParseErrorKind::MissingLabel);
            return;
        }
        if region.is_empty() {
            // A missing property value is tolerated silently.
            return;
        }

        let values = self.parse_prop_values(region);
        match label {
            "Node" => self.set_cur_node(&values),
            "dcid" => self.set_cur_node_dcid(&values),
            _ => self.create_assertions(label, values),
        }
    }

    /// Classifies each comma-separated value as a namespaced reference or a
    /// literal. An unrecognized namespace voids the whole value list.
    pub fn parse_prop_values(&mut self, region: &str) -> Vec<ParsedValue> {
        let mut values = Vec::new();
        for piece in split_prop_values(region) {
            let alias = piece.split(':').next().unwrap_or("").trim();
            if let Some(ns) = Namespace::from_alias(alias) {
                let reference = match piece.find(':') {
                    Some(i) => piece[i + 1..].trim(),
                    None => piece.trim(),
                };
                values.push(ParsedValue::Ref {
                    ns,
                    reference: reference.to_string(),
                });
            } else if piece.contains(':') && !alias.starts_with('"') {
                self.record(ParseErrorKind::UnrecognizedNamespace);
                return Vec::new();
            } else {
                values.push(ParsedValue::Literal(strip_literal(&piece)));
            }
        }
        values
    }

    /// Handles a `Node:` line. The single value is either a bare local
    /// reference or a `dcid:` reference; a `dcid:` namespace binds the dcid
    /// immediately. Registers the subject for display.
    fn set_cur_node(&mut self, values: &[ParsedValue]) {
        if values.len() != 1 {
            self.record(ParseErrorKind::InvalidNodeDeclaration);
            return;
        }
        match &values[0] {
            ParsedValue::Ref { ns, reference } => {
                // Only the literal `dcid:` alias may declare a node id.
                if *ns != Namespace::Dcid {
                    self.record(ParseErrorKind::InvalidNodeNamespace);
                    return;
                }
                let id = format!("{LOCAL_NS}{DCID_NS}{reference}");
                let node = self.graph.get_or_create(&id);
                self.cur_node = Some(node);
                if !self.graph.set_dcid(node, reference) {
                    self.record(ParseErrorKind::DcidConflict);
                    return;
                }
                self.graph.register_subject(&format!("{DCID_NS}{reference}"), node);
            }
            ParsedValue::Literal(local_ref) => {
                let id = format!("{LOCAL_NS}{local_ref}");
                let node = self.graph.get_or_create(&id);
                self.cur_node = Some(node);
                self.graph.register_subject(&id, node);
            }
        }
    }

    /// Handles a `dcid:` line: exactly one literal value, bound to the
    /// current subject.
    fn set_cur_node_dcid(&mut self, values: &[ParsedValue]) {
        let Some(cur) = self.cur_node else {
            self.record(ParseErrorKind::DcidBeforeNode);
            return;
        };
        if values.len() != 1 {
            self.record(ParseErrorKind::MultipleDcids);
            return;
        }
        match &values[0] {
            ParsedValue::Literal(dcid) => {
                if !self.graph.set_dcid(cur, dcid) {
                    self.record(ParseErrorKind::DcidConflict);
                }
            }
            ParsedValue::Ref { .. } => self.record(ParseErrorKind::DcidNodeRef),
        }
    }

    /// Creates one assertion per value with the current subject as source.
    /// Node references through a dcid alias get the dcid bound on the target.
    fn create_assertions(&mut self, label: &str, values: Vec<ParsedValue>) {
        let Some(cur) = self.cur_node else {
            self.record(ParseErrorKind::PropertyBeforeNode);
            return;
        };
        for value in values {
            let target = match value {
                ParsedValue::Ref { ns, reference } => {
                    let id = format!("{}{}", ns.resolved_prefix(), reference);
                    let node = self.graph.get_or_create(&id);
                    if ns.is_remote() && !self.graph.set_dcid(node, &reference) {
                        self.record(ParseErrorKind::DcidConflict);
                    }
                    Target::Node(node)
                }
                ParsedValue::Literal(text) => Target::Literal(text),
            };
            self.graph.add_assertion(cur, label, target, self.prov.clone());
        }
    }

    /// The most recently declared subject, if any.
    pub fn cur_node(&self) -> Option<NodeId> {
        self.cur_node
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }
}
