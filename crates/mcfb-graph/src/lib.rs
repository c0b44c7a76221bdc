//! In-memory triple store for the MCF browser.
//!
//! A parse session owns a single [`Graph`] arena. Nodes are identified by
//! arena indices ([`NodeId`]) and looked up through a string registry that
//! holds every id a node is known under:
//!
//! - `l:<localRef>` for ids declared in local files, and
//! - `dcid:<dcid>` for ids bound to the remote knowledge graph.
//!
//! A node may be known under both kinds of key at once (a local declaration
//! that later binds a dcid). When a dcid binding discovers that a separate
//! node is already registered under that dcid, the two nodes are merged and
//! every assertion of the absorbed node is re-pointed at the survivor.


use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Registry prefix for locally-scoped ids.
pub const LOCAL_NS: &str = "l:";
/// Registry prefix for knowledge-graph ids.
pub const DCID_NS: &str = "dcid:";

/// Arena index of a node within a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId(u32);

/// Arena index of an assertion within a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AssertionId(u32);

/// The object position of a triple: another node or a literal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Target {
    Node(NodeId),
    Literal(String),
}

impl Target {
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Target::Node(id) => Some(*id),
            Target::Literal(_) => None,
        }
    }
}

/// One triple: `(src, property, target)` plus the file or remote dataset it
/// came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assertion {
    pub src: NodeId,
    pub property: String,
    pub provenance: String,
    pub target: Target,
}

/// A single entity in the session graph.
///
/// `exists_in_kg` and `already_fetched` are set-once flags: they only ever
/// transition away from `false`, which is what makes repeated remote
/// enrichment of the same node harmless.
#[derive(Debug)]
pub struct Node {
    pub local_id: Option<String>,
    pub dcid: Option<String>,
    pub exists_in_kg: bool,
    pub already_fetched: bool,
    assertions: Vec<AssertionId>,
    inv_assertions: Vec<AssertionId>,
    merged_into: Option<NodeId>,
}

impl Node {
    fn new(id: &str) -> Self {
        Node {
            local_id: id.starts_with(LOCAL_NS).then(|| id.to_string()),
            dcid: None,
            exists_in_kg: false,
            already_fetched: false,
            assertions: Vec::new(),
            inv_assertions: Vec::new(),
            merged_into: None,
        }
    }

    /// Reference shown for this node: the dcid if bound, with the local id
    /// in brackets when it adds information. Ex: `country/IND [l:IndiaNode]`.
    pub fn display_ref(&self) -> String {
        let dcid_ref = self.dcid.as_deref().unwrap_or("");
        let local_ref = match &self.local_id {
            Some(local) if !local.contains("dcid") => format!("[{local}]"),
            _ => String::new(),
        };
        format!("{dcid_ref} {local_ref}").trim().to_string()
    }
}

/// Session arena owning all nodes and assertions created by parsing and
/// remote enrichment.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    assertions: Vec<Assertion>,
    registry: HashMap<String, NodeId>,
    /// Subject ids declared by parsed files, in declaration order.
    subjects: Vec<String>,
    subject_index: HashMap<String, NodeId>,
}

impl Graph {
    pub fn new() -> Self {
        Graph::default()
    }

    /// Drops every node, assertion and registry entry ("clear files").
    pub fn reset(&mut self) {
        *self = Graph::default();
    }

    /// Returns the node registered under `id`, creating and registering one
    /// when `create` is set. The registry covers both `l:` and `dcid:` keys,
    /// so a `dcid:` reference resolves to a node that earlier bound that
    /// dcid from a local declaration, and vice versa.
    pub fn get_node(&mut self, id: &str, create: bool) -> Option<NodeId> {
        if let Some(&existing) = self.registry.get(id) {
            return Some(existing);
        }
        if !create {
            return None;
        }
        Some(self.create_node(id))
    }

    /// Infallible variant of [`Graph::get_node`] with `create` set.
    pub fn get_or_create(&mut self, id: &str) -> NodeId {
        match self.registry.get(id) {
            Some(&existing) => existing,
            None => self.create_node(id),
        }
    }

    fn create_node(&mut self, id: &str) -> NodeId {
        let node_id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(id));
        self.registry.insert(id.to_string(), node_id);
        node_id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    /// Binds `dcid` to `node`. Returns false when the node already carries a
    /// different dcid (the original binding is retained). If a separate node
    /// is registered under that dcid the two are merged, `node` surviving.
    pub fn set_dcid(&mut self, node: NodeId, dcid: &str) -> bool {
        if let Some(existing) = &self.node(node).dcid {
            if existing != dcid {
                warn!(
                    existing = %existing,
                    rejected = %dcid,
                    "rejected dcid rebinding"
                );
                return false;
            }
        }

        let dcid_key = format!("{DCID_NS}{dcid}");
        if let Some(&other) = self.registry.get(&dcid_key) {
            if other != node {
                self.merge(node, other);
            }
        }
        self.node_mut(node).dcid = Some(dcid.to_string());
        self.registry.insert(dcid_key, node);
        true
    }

    /// Moves all assertions and inverse assertions of `absorbed` onto
    /// `survivor`, rewriting their endpoints, and re-points every registry
    /// key of `absorbed`. The absorbed arena slot stays behind as an
    /// unreachable tombstone.
    fn merge(&mut self, survivor: NodeId, absorbed: NodeId) {
        debug!(?survivor, ?absorbed, "merging nodes");

        let out = std::mem::take(&mut self.node_mut(absorbed).assertions);
        for aid in out {
            self.assertions[aid.0 as usize].src = survivor;
            self.node_mut(survivor).assertions.push(aid);
        }

        let inv = std::mem::take(&mut self.node_mut(absorbed).inv_assertions);
        for aid in inv {
            self.assertions[aid.0 as usize].target = Target::Node(survivor);
            self.node_mut(survivor).inv_assertions.push(aid);
        }

        for id in self.registry.values_mut() {
            if *id == absorbed {
                *id = survivor;
            }
        }
        for id in self.subject_index.values_mut() {
            if *id == absorbed {
                *id = survivor;
            }
        }
        self.node_mut(absorbed).merged_into = Some(survivor);
    }

    /// Records one triple. Assertions are kept in declaration order on both
    /// the source's outgoing set and, for node targets, the target's
    /// incoming set.
    pub fn add_assertion(
        &mut self,
        src: NodeId,
        property: impl Into<String>,
        target: Target,
        provenance: impl Into<String>,
    ) -> AssertionId {
        let aid = AssertionId(self.assertions.len() as u32);
        let assertion = Assertion {
            src,
            property: property.into(),
            provenance: provenance.into(),
            target,
        };
        if let Target::Node(t) = assertion.target {
            self.node_mut(t).inv_assertions.push(aid);
        }
        self.node_mut(src).assertions.push(aid);
        self.assertions.push(assertion);
        aid
    }

    pub fn assertion(&self, id: AssertionId) -> &Assertion {
        &self.assertions[id.0 as usize]
    }

    /// Outgoing triples of `node`, in declaration order.
    pub fn assertions_of(&self, node: NodeId) -> impl Iterator<Item = &Assertion> {
        self.nodes[node.0 as usize]
            .assertions
            .iter()
            .map(|aid| &self.assertions[aid.0 as usize])
    }

    /// Incoming triples of `node`, in declaration order.
    pub fn inv_assertions_of(&self, node: NodeId) -> impl Iterator<Item = &Assertion> {
        self.nodes[node.0 as usize]
            .inv_assertions
            .iter()
            .map(|aid| &self.assertions[aid.0 as usize])
    }

    /// Registers a subject id declared by a parsed file, keeping declaration
    /// order and ignoring repeats.
    pub fn register_subject(&mut self, id: &str, node: NodeId) {
        if self.subject_index.insert(id.to_string(), node).is_none() {
            self.subjects.push(id.to_string());
        }
    }

    /// Subject ids declared across the session, in declaration order.
    pub fn subject_ids(&self) -> &[String] {
        &self.subjects
    }

    pub fn subject_node(&self, id: &str) -> Option<NodeId> {
        self.subject_index.get(id).copied()
    }

    /// Looks an id up without creating, following the same registry as
    /// [`Graph::get_node`].
    pub fn lookup(&self, id: &str) -> Option<NodeId> {
        self.registry.get(id).copied()
    }

    pub fn mark_fetched(&mut self, node: NodeId) {
        self.node_mut(node).already_fetched = true;
    }

    pub fn mark_exists_in_kg(&mut self, node: NodeId) {
        self.node_mut(node).exists_in_kg = true;
    }

    /// Number of live (unmerged) nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.merged_into.is_none()).count()
    }

    pub fn assertion_count(&self) -> usize {
        self.assertions.len()
    }
}
