//! Remote knowledge-graph facade.
//!
//! The core only depends on the request/response contract of the Data
//! Commons REST API, expressed here as the [`KgClient`] trait: property
//! labels for a dcid, property values for a dcid + label + direction, and an
//! existence probe. [`client::DataCommonsClient`] is the HTTP-backed
//! implementation; tests substitute their own.
//!
//! Enrichment operations live here rather than on the graph because they
//! need both a client and mutable access to the session arena. Each is
//! individually idempotent (guarded by the node's set-once flags) and safe
//! to invoke repeatedly; failures propagate to the caller without retry.

pub mod client;

use async_trait::async_trait;
use mcfb_graph::{Graph, NodeId, Target, DCID_NS};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Direction of a property label relative to the queried node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Out,
    In,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Out => "out",
            Direction::In => "in",
        }
    }
}

/// Outgoing and incoming property labels of one dcid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyLabels {
    pub out_labels: Vec<String>,
    pub in_labels: Vec<String>,
}

/// One value descriptor returned for a dcid + label + direction query:
/// either a node (`dcid`) or a literal (`value`), with its provenance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PropertyValue {
    pub dcid: Option<String>,
    pub value: Option<String>,
    #[serde(rename = "provenanceId", default)]
    pub provenance_id: String,
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("no property values for dcid: {dcid} label: {label}")]
    NoValues { dcid: String, label: String },
    #[error("value descriptor has neither \"dcid\" nor \"value\" field")]
    MissingField,
    #[error("cannot create assertion with a literal source")]
    LiteralInverseSubject,
}

/// Contract of the remote knowledge graph.
#[async_trait]
pub trait KgClient: Send + Sync {
    /// All property labels of `dcid`, both directions.
    async fn property_labels(&self, dcid: &str) -> Result<PropertyLabels, RemoteError>;

    /// All values for `dcid` + `label` in `direction`.
    async fn property_values(
        &self,
        dcid: &str,
        label: &str,
        direction: Direction,
    ) -> Result<Vec<PropertyValue>, RemoteError>;

    /// Whether `dcid` appears in any remote triple.
    async fn exists_in_kg(&self, dcid: &str) -> Result<bool, RemoteError>;

    /// Human-readable name of `dcid`, falling back to the dcid itself.
    async fn name_of(&self, dcid: &str) -> Result<String, RemoteError>;
}

/// Resolves one value descriptor to an assertion target. Node values are
/// registered under their dcid and marked as existing remotely.
fn value_to_target(graph: &mut Graph, value: &PropertyValue) -> Result<Target, RemoteError> {
    if let Some(dcid) = &value.dcid {
        let node = graph.get_or_create(&format!("{DCID_NS}{dcid}"));
        graph.set_dcid(node, dcid);
        graph.mark_exists_in_kg(node);
        return Ok(Target::Node(node));
    }
    match &value.value {
        Some(text) => Ok(Target::Literal(text.clone())),
        None => Err(RemoteError::MissingField),
    }
}

/// Creates one assertion per returned value for every label in `labels`.
async fn create_assertions_from_labels(
    graph: &mut Graph,
    node: NodeId,
    dcid: &str,
    client: &dyn KgClient,
    labels: &[String],
    direction: Direction,
) -> Result<(), RemoteError> {
    for label in labels {
        let values = client.property_values(dcid, label, direction).await?;
        for value in &values {
            let resolved = value_to_target(graph, value)?;
            // A value node that has itself been fetched already carries this
            // assertion on both sides; creating it again would duplicate it.
            if let Target::Node(other) = resolved {
                if graph.node(other).already_fetched {
                    continue;
                }
            }
            match direction {
                Direction::Out => {
                    graph.add_assertion(node, label.clone(), resolved, value.provenance_id.clone());
                }
                Direction::In => {
                    let Target::Node(src) = resolved else {
                        return Err(RemoteError::LiteralInverseSubject);
                    };
                    graph.add_assertion(
                        src,
                        label.clone(),
                        Target::Node(node),
                        value.provenance_id.clone(),
                    );
                }
            }
        }
    }
    Ok(())
}

/// Fetches all remote triples of `node` and stores them as assertions.
/// No-ops when the node has no dcid or was already fetched.
pub async fn fetch_remote_data(
    graph: &mut Graph,
    node: NodeId,
    client: &dyn KgClient,
) -> Result<(), RemoteError> {
    if graph.node(node).already_fetched {
        return Ok(());
    }
    let Some(dcid) = graph.node(node).dcid.clone() else {
        return Ok(());
    };

    let labels = client.property_labels(&dcid).await?;
    debug!(
        dcid = %dcid,
        out = labels.out_labels.len(),
        inl = labels.in_labels.len(),
        "fetched remote property labels"
    );
    create_assertions_from_labels(graph, node, &dcid, client, &labels.out_labels, Direction::Out)
        .await?;
    create_assertions_from_labels(graph, node, &dcid, client, &labels.in_labels, Direction::In)
        .await?;
    graph.mark_fetched(node);
    Ok(())
}

/// Probes the remote graph for `node`'s dcid and records the result.
/// No-ops when the node has no dcid or existence is already established.
pub async fn set_exists_in_kg(
    graph: &mut Graph,
    node: NodeId,
    client: &dyn KgClient,
) -> Result<(), RemoteError> {
    if graph.node(node).exists_in_kg {
        return Ok(());
    }
    let Some(dcid) = graph.node(node).dcid.clone() else {
        return Ok(());
    };
    if client.exists_in_kg(&dcid).await? {
        graph.mark_exists_in_kg(node);
    }
    Ok(())
}
