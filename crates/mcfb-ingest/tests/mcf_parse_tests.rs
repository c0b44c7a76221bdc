use mcfb_graph::{Graph, Target};
use mcfb_ingest::mcf::{McfParser, Namespace, ParseErrorKind, ParsedValue};

fn literal(s: &str) -> ParsedValue {
    ParsedValue::Literal(s.to_string())
}

fn reference(ns: Namespace, r: &str) -> ParsedValue {
    ParsedValue::Ref {
        ns,
        reference: r.to_string(),
    }
}

#[test]
fn parse_prop_values_classifies_each_value() {
    let mut graph = Graph::new();
    let mut parser = McfParser::new(&mut graph, "fileName");
    let raw = "val1, l:localNodeId, \"GO:BioIdTextVal\",schema:remoteNodeId, \"A, B\", \"B, C,D\"";
    assert_eq!(
        parser.parse_prop_values(raw),
        vec![
            literal("val1"),
            reference(Namespace::L, "localNodeId"),
            literal("GO:BioIdTextVal"),
            reference(Namespace::Schema, "remoteNodeId"),
            literal("A, B"),
            literal("B, C,D"),
        ]
    );
    assert!(parser.errors().is_empty());
}

#[test]
fn unrecognized_namespace_voids_the_value_list() {
    let mut graph = Graph::new();
    let mut parser = McfParser::new(&mut graph, "fileName");
    assert_eq!(parser.parse_prop_values("val1, bogus:ref"), vec![]);
    assert_eq!(parser.errors().len(), 1);
    assert_eq!(parser.errors()[0].kind, ParseErrorKind::UnrecognizedNamespace);
}

#[test]
fn parse_line_walks_the_node_state_machine() {
    let mut graph = Graph::new();
    let mut parser = McfParser::new(&mut graph, "file_name");

    parser.parse_line("// Node: commentId");
    assert_eq!(parser.cur_node(), None);

    parser.parse_line("Node: localSubjId");
    let cur = parser.cur_node().expect("subject set");

    parser.parse_line("dcid: remoteId");
    assert!(parser.errors().is_empty());

    assert_eq!(graph.node(cur).local_id.as_deref(), Some("l:localSubjId"));
    assert_eq!(graph.node(cur).dcid.as_deref(), Some("remoteId"));
}

#[test]
fn string_values_become_literal_assertions() {
    let mut graph = Graph::new();
    let result = McfParser::new(&mut graph, "fileName.mcf").parse_mcf_str(
        "Node: testId\ndcid: remoteSrcId\nstringVal: val1, \"GO:bioTextId\"",
    );
    assert!(result.errors.is_empty());

    let src = graph.lookup("l:testId").unwrap();
    let asserts: Vec<_> = graph.assertions_of(src).collect();
    assert_eq!(asserts.len(), 2);
    for a in &asserts {
        assert_eq!(a.property, "stringVal");
        assert_eq!(a.provenance, "fileName.mcf");
        assert_eq!(a.src, src);
    }
    assert_eq!(asserts[0].target, Target::Literal("val1".into()));
    assert_eq!(asserts[1].target, Target::Literal("GO:bioTextId".into()));
}

#[test]
fn node_values_create_inverse_assertions() {
    let mut graph = Graph::new();
    let result = McfParser::new(&mut graph, "fileName.mcf")
        .parse_mcf_str("Node: localSrcId\nnodeVal: l:localId, dcs:remoteId");
    assert!(result.errors.is_empty());

    let src = graph.lookup("l:localSrcId").unwrap();
    let asserts: Vec<_> = graph.assertions_of(src).collect();
    assert_eq!(asserts.len(), 2);

    let local_target = asserts[0].target.as_node().unwrap();
    assert_eq!(graph.node(local_target).local_id.as_deref(), Some("l:localId"));
    assert_eq!(graph.node(local_target).dcid, None);
    assert_eq!(graph.inv_assertions_of(local_target).count(), 1);

    let remote_target = asserts[1].target.as_node().unwrap();
    assert_eq!(graph.node(remote_target).local_id, None);
    assert_eq!(graph.node(remote_target).dcid.as_deref(), Some("remoteId"));
    assert_eq!(graph.inv_assertions_of(remote_target).count(), 1);
}

const MCF_STR: &str = "
Node: LocalObsNode
remoteNodeProp: dcs:StatVarObservation
localNodeProp: l:LocalIndiaNode
stringProp: \"2020-08-01\"
numProp: 10000
// comment
bioID: \"GO:bioTextId\"

Node: LocalIndiaNode
dcid: \"country/IND\"
";

#[test]
fn parse_mcf_str_end_to_end() {
    let mut graph = Graph::new();
    let result = McfParser::new(&mut graph, "fileName.mcf").parse_mcf_str(MCF_STR);

    assert!(result.errors.is_empty());
    assert_eq!(
        result.local_nodes,
        vec!["l:LocalObsNode".to_string(), "l:LocalIndiaNode".to_string()]
    );

    let obs = graph.subject_node("l:LocalObsNode").unwrap();
    assert_eq!(graph.node(obs).local_id.as_deref(), Some("l:LocalObsNode"));
    assert_eq!(graph.node(obs).dcid, None);
    assert_eq!(graph.inv_assertions_of(obs).count(), 0);

    let obs_asserts: Vec<_> = graph.assertions_of(obs).collect();
    assert_eq!(obs_asserts.len(), 5);
    for a in &obs_asserts {
        assert_eq!(a.provenance, "fileName.mcf");
        match a.property.as_str() {
            "remoteNodeProp" => {
                let t = a.target.as_node().unwrap();
                assert_eq!(graph.node(t).dcid.as_deref(), Some("StatVarObservation"));
                assert_eq!(graph.node(t).local_id, None);
            }
            "localNodeProp" => {
                let t = a.target.as_node().unwrap();
                assert_eq!(graph.node(t).local_id.as_deref(), Some("l:LocalIndiaNode"));
                assert_eq!(graph.node(t).dcid.as_deref(), Some("country/IND"));
            }
            "stringProp" => assert_eq!(a.target, Target::Literal("2020-08-01".into())),
            "numProp" => assert_eq!(a.target, Target::Literal("10000".into())),
            "bioID" => assert_eq!(a.target, Target::Literal("GO:bioTextId".into())),
            other => panic!("unexpected assertion property: {other}"),
        }
    }

    let india = graph.subject_node("l:LocalIndiaNode").unwrap();
    assert_eq!(graph.node(india).dcid.as_deref(), Some("country/IND"));
    assert_eq!(graph.assertions_of(india).count(), 0);

    let inv: Vec<_> = graph.inv_assertions_of(india).collect();
    assert_eq!(inv.len(), 1);
    assert_eq!(inv[0].src, obs);
    assert_eq!(inv[0].property, "localNodeProp");
    assert_eq!(inv[0].target, Target::Node(india));
}

#[test]
fn reparsing_identical_text_yields_isomorphic_graph() {
    let mut first = Graph::new();
    let r1 = McfParser::new(&mut first, "f.mcf").parse_mcf_str(MCF_STR);
    let mut second = Graph::new();
    let r2 = McfParser::new(&mut second, "f.mcf").parse_mcf_str(MCF_STR);

    assert_eq!(r1.local_nodes, r2.local_nodes);
    assert_eq!(r1.errors, r2.errors);
    assert_eq!(first.assertion_count(), second.assertion_count());
    for id in r1.local_nodes {
        let a = first.subject_node(&id).unwrap();
        let b = second.subject_node(&id).unwrap();
        let props_a: Vec<_> = first.assertions_of(a).map(|x| x.property.clone()).collect();
        let props_b: Vec<_> = second.assertions_of(b).map(|x| x.property.clone()).collect();
        assert_eq!(props_a, props_b);
    }
}

#[test]
fn multi_valued_node_line_is_one_error_and_leaves_subject_unset() {
    let mut graph = Graph::new();
    let mut parser = McfParser::new(&mut graph, "fileName.mcf");
    parser.parse_line("Node: id1, id2");
    assert_eq!(parser.cur_node(), None);
    assert_eq!(parser.errors().len(), 1);
    assert_eq!(parser.errors()[0].kind, ParseErrorKind::InvalidNodeDeclaration);
}

#[test]
fn error_vocabulary_is_recorded_in_order() {
    let mut graph = Graph::new();
    let mut parser = McfParser::new(&mut graph, "fileName.mcf");

    parser.parse_line("prop: val"); // before any Node
    parser.parse_line("dcid: d0"); // before any Node
    parser.parse_line("Node: schema:foo"); // wrong namespace for a declaration
    parser.parse_line("Node: localId1");
    parser.parse_line("dcid: dcid1, dcid2");
    parser.parse_line("dcid: dcid:remote");
    parser.parse_line("dcid: dcid1");
    parser.parse_line("dcid: dcid2"); // rebind conflict
    parser.parse_line("prop"); // no colon
    parser.parse_line(":val"); // no label
    parser.parse_line("val:"); // empty value region: tolerated

    let kinds: Vec<_> = parser.errors().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ParseErrorKind::PropertyBeforeNode,
            ParseErrorKind::DcidBeforeNode,
            ParseErrorKind::InvalidNodeNamespace,
            ParseErrorKind::MultipleDcids,
            ParseErrorKind::DcidNodeRef,
            ParseErrorKind::DcidConflict,
            ParseErrorKind::MissingColon,
            ParseErrorKind::MissingLabel,
        ]
    );
}

#[test]
fn node_declared_with_dcid_namespace_binds_immediately() {
    let mut graph = Graph::new();
    let result = McfParser::new(&mut graph, "f.mcf").parse_mcf_str("Node: dcid:country/USA");
    assert!(result.errors.is_empty());
    assert_eq!(result.local_nodes, vec!["dcid:country/USA".to_string()]);

    let n = graph.subject_node("dcid:country/USA").unwrap();
    assert_eq!(graph.node(n).dcid.as_deref(), Some("country/USA"));
    assert_eq!(graph.node(n).local_id.as_deref(), Some("l:dcid:country/USA"));
}

#[test]
fn local_binding_example_from_two_lines() {
    let mut graph = Graph::new();
    let result = McfParser::new(&mut graph, "f.mcf")
        .parse_mcf_str("Node: LocalIndiaNode\ndcid: \"country/IND\"");
    assert!(result.errors.is_empty());
    assert_eq!(result.local_nodes, vec!["l:LocalIndiaNode".to_string()]);

    let n = graph.subject_node("l:LocalIndiaNode").unwrap();
    assert_eq!(graph.node(n).local_id.as_deref(), Some("l:LocalIndiaNode"));
    assert_eq!(graph.node(n).dcid.as_deref(), Some("country/IND"));
}

#[test]
fn error_lines_carry_position_and_raw_text() {
    let mut graph = Graph::new();
    let result =
        McfParser::new(&mut graph, "f.mcf").parse_mcf_str("Node: ok\n\nbad line\nprop: v");
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].line_num, 3);
    assert_eq!(result.errors[0].line, "bad line");
    assert_eq!(result.errors[0].kind, ParseErrorKind::MissingColon);
}

#[test]
fn subject_list_accumulates_across_files_in_one_session() {
    let mut graph = Graph::new();
    let r1 = McfParser::new(&mut graph, "a.mcf").parse_mcf_str("Node: first");
    assert_eq!(r1.local_nodes, vec!["l:first".to_string()]);
    let r2 = McfParser::new(&mut graph, "b.mcf").parse_mcf_str("Node: second");
    assert_eq!(
        r2.local_nodes,
        vec!["l:first".to_string(), "l:second".to_string()]
    );
}

#[test]
fn two_local_references_merging_on_one_dcid() {
    let text = "
Node: NodeA
propA: 1
dcid: shared/X

Node: NodeB
propB: 2
dcid: shared/X
";
    let mut graph = Graph::new();
    let result = McfParser::new(&mut graph, "f.mcf").parse_mcf_str(text);
    assert!(result.errors.is_empty());

    // NodeB's binding absorbed NodeA's node: one node carries the union.
    let merged = graph.lookup("dcid:shared/X").unwrap();
    let props: Vec<_> = graph.assertions_of(merged).map(|a| a.property.clone()).collect();
    assert_eq!(props, vec!["propB".to_string(), "propA".to_string()]);
    for a in graph.assertions_of(merged) {
        assert_eq!(a.src, merged);
    }
}
