use orgchart_graph::{
    ChartGraph, Directory, Entitlement, Filter, GraphError, Identity, InMemoryDirectory,
    OrgChartSettings, OwnedRole, PolicyViolation, Result, TreeAssembler,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};

fn person(id: &str, manager: Option<&str>) -> Identity {
    Identity {
        id: id.into(),
        name: id.to_lowercase(),
        display_name: Some(format!("Person {id}")),
        manager_id: manager.map(Into::into),
        identity_type: Some("employee".into()),
        ..Default::default()
    }
}

fn group(id: &str, owner: &str) -> Identity {
    Identity {
        id: id.into(),
        name: id.to_lowercase(),
        is_group: true,
        owner_id: Some(owner.into()),
        ..Default::default()
    }
}

/// CEO <- VP <- {M1, M2}; M1 <- {P1, P2}, owns G1; M2 <- P3
fn org() -> InMemoryDirectory {
    InMemoryDirectory::new()
        .with_identity(person("CEO", None))
        .with_identity(person("VP", Some("CEO")))
        .with_identity(person("M1", Some("VP")))
        .with_identity(person("M2", Some("VP")))
        .with_identity(person("P1", Some("M1")))
        .with_identity(person("P2", Some("M1")))
        .with_identity(person("P3", Some("M2")))
        .with_identity(group("G1", "M1"))
}

fn ids(tree: &orgchart_graph::OrgTree) -> Vec<String> {
    tree.nodes.iter().map(|node| node.id().to_string()).collect()
}

#[test]
fn tree_unions_children_ancestors_and_siblings() {
    let directory = org();
    let settings = OrgChartSettings::default();
    let tree = TreeAssembler::new(&directory, &settings)
        .build_tree("M1")
        .unwrap();

    // children first, then ancestors nearest-first, then the remaining siblings
    assert_eq!(ids(&tree), vec!["P1", "P2", "G1", "VP", "CEO", "M1", "M2"]);
    assert_eq!(tree.root_id, "CEO");
    assert!(!tree.is_partial());
}

#[test]
fn tree_ids_are_unique() {
    let directory = org();
    let settings = OrgChartSettings::default();
    for start in ["CEO", "VP", "M1", "M2", "P1", "P3", "G1"] {
        let tree = TreeAssembler::new(&directory, &settings)
            .build_tree(start)
            .unwrap();
        let all = ids(&tree);
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(all.len(), unique.len(), "duplicates for {start}: {all:?}");
    }
}

#[test]
fn root_parent_pointer_is_null_even_with_a_manager() {
    let directory = org();
    let settings = OrgChartSettings {
        levels: 1,
        ..Default::default()
    };
    let tree = TreeAssembler::new(&directory, &settings)
        .build_tree("P1")
        .unwrap();

    assert_eq!(tree.root_id, "M1");
    let root = tree.node("M1").unwrap();
    assert_eq!(root.parent_id(), None);
    assert_eq!(tree.node("P1").unwrap().parent_id(), Some("M1"));

    let wire = serde_json::to_value(root).unwrap();
    assert_eq!(wire["parentId"], Value::Null);
}

#[test]
fn zero_levels_makes_start_the_root() {
    let directory = org();
    let settings = OrgChartSettings {
        levels: 0,
        ..Default::default()
    };
    let tree = TreeAssembler::new(&directory, &settings)
        .build_tree("M1")
        .unwrap();

    assert_eq!(tree.root_id, "M1");
    assert_eq!(tree.node("M1").unwrap().parent_id(), None);
    assert!(tree.node("VP").is_none());
    // siblings still come along
    assert!(tree.node("M2").is_some());
}

#[test]
fn group_start_uses_owner_relation() {
    let directory = org();
    let settings = OrgChartSettings::default();
    let tree = TreeAssembler::new(&directory, &settings)
        .build_tree("G1")
        .unwrap();

    assert_eq!(ids(&tree), vec!["M1", "VP", "CEO", "P1", "P2", "G1"]);
    let g1 = tree.node("G1").unwrap();
    assert!(g1.is_group());
    assert_eq!(g1.parent_id(), Some("M1"));
}

#[test]
fn missing_start_record_is_not_found() {
    let directory = org();
    let settings = OrgChartSettings::default();
    let err = TreeAssembler::new(&directory, &settings)
        .build_tree("nobody")
        .unwrap_err();
    assert!(matches!(err, GraphError::NotFound(ref id) if id == "nobody"));
    assert_eq!(err.to_string(), "Can not find identity object: nobody");
}

/// Directory whose lookups fail for selected ids
struct FlakyDirectory {
    inner: InMemoryDirectory,
    broken: HashSet<String>,
    missing: HashSet<String>,
}

impl Directory for FlakyDirectory {
    fn get_by_id(&self, id: &str) -> Result<Option<Identity>> {
        if self.broken.contains(id) {
            return Err(GraphError::upstream(format!("timeout reading {id}")));
        }
        if self.missing.contains(id) {
            return Ok(None);
        }
        self.inner.get_by_id(id)
    }

    fn get_by_name(&self, name: &str) -> Result<Option<Identity>> {
        self.inner.get_by_name(name)
    }

    fn search(&self, filter: &Filter) -> Result<Vec<String>> {
        self.inner.search(filter)
    }

    fn policy_violations(&self, id: &str) -> Result<Vec<PolicyViolation>> {
        if self.broken.contains(id) {
            return Err(GraphError::upstream("policy store offline"));
        }
        self.inner.policy_violations(id)
    }

    fn owned_entitlements(&self, id: &str) -> Result<Vec<Entitlement>> {
        self.inner.owned_entitlements(id)
    }

    fn owned_roles(&self, id: &str) -> Result<Vec<OwnedRole>> {
        self.inner.owned_roles(id)
    }
}

#[test]
fn unresolvable_secondary_ids_are_skipped() {
    let directory = FlakyDirectory {
        inner: org(),
        broken: HashSet::from(["P2".to_string()]),
        missing: HashSet::from(["G1".to_string()]),
    };
    let settings = OrgChartSettings::default();
    let tree = TreeAssembler::new(&directory, &settings)
        .build_tree("M1")
        .unwrap();

    assert_eq!(ids(&tree), vec!["P1", "VP", "CEO", "M1", "M2"]);
    assert_eq!(tree.skipped, vec!["P2", "G1"]);
    assert!(tree.is_partial());
}

#[test]
fn failing_search_is_fatal() {
    struct DownDirectory;

    impl Directory for DownDirectory {
        fn get_by_id(&self, id: &str) -> Result<Option<Identity>> {
            Ok(Some(person(id, None)))
        }
        fn get_by_name(&self, _name: &str) -> Result<Option<Identity>> {
            Ok(None)
        }
        fn search(&self, _filter: &Filter) -> Result<Vec<String>> {
            Err(GraphError::upstream("index unavailable"))
        }
        fn policy_violations(&self, _id: &str) -> Result<Vec<PolicyViolation>> {
            Ok(Vec::new())
        }
        fn owned_entitlements(&self, _id: &str) -> Result<Vec<Entitlement>> {
            Ok(Vec::new())
        }
        fn owned_roles(&self, _id: &str) -> Result<Vec<OwnedRole>> {
            Ok(Vec::new())
        }
    }

    let settings = OrgChartSettings::default();
    let err = TreeAssembler::new(&DownDirectory, &settings)
        .build_tree("X")
        .unwrap_err();
    assert!(matches!(err, GraphError::UpstreamFailure(_)));
}

#[test]
fn children_nodes_keep_real_parents() {
    let directory = org();
    let settings = OrgChartSettings::default();
    let (nodes, skipped) = TreeAssembler::new(&directory, &settings)
        .build_children("M1")
        .unwrap();

    let parents: Vec<_> = nodes.iter().map(|n| n.parent_id()).collect();
    assert_eq!(parents, vec![Some("M1"); 3]);
    assert!(skipped.is_empty());
}

#[test]
fn children_report_unresolvable_ids() {
    let directory = FlakyDirectory {
        inner: org(),
        broken: HashSet::from(["P1".to_string()]),
        missing: HashSet::from(["G1".to_string()]),
    };
    let settings = OrgChartSettings::default();
    let (nodes, skipped) = TreeAssembler::new(&directory, &settings)
        .build_children("M1")
        .unwrap();

    let ids: Vec<_> = nodes.iter().map(|n| n.id()).collect();
    assert_eq!(ids, vec!["P2"]);
    assert_eq!(skipped, vec!["P1", "G1"]);
}

#[test]
fn dangling_manager_leaves_start_as_root() {
    let directory = InMemoryDirectory::new()
        .with_identity(person("P1", Some("ghost")))
        .with_identity(person("P2", Some("ghost")));
    let settings = OrgChartSettings::default();
    let tree = TreeAssembler::new(&directory, &settings)
        .build_tree("P1")
        .unwrap();

    assert_eq!(tree.root_id, "P1");
    assert!(tree.skipped.is_empty());
    assert_eq!(tree.node("P1").unwrap().parent_id(), None);
    assert_eq!(tree.node("P2").unwrap().parent_id(), Some("ghost"));
    assert!(tree.nodes.iter().any(|n| n.parent_id().is_none()));
}

#[test]
fn unreadable_root_falls_back_to_nearest_resolved_record() {
    let directory = FlakyDirectory {
        inner: org(),
        broken: HashSet::from(["VP".to_string()]),
        missing: HashSet::new(),
    };
    let settings = OrgChartSettings::default();
    let tree = TreeAssembler::new(&directory, &settings)
        .build_tree("M1")
        .unwrap();

    assert_eq!(tree.skipped, vec!["VP"]);
    assert_eq!(tree.root_id, "M1");
    assert_eq!(tree.node("M1").unwrap().parent_id(), None);
    let roots: Vec<_> = tree
        .nodes
        .iter()
        .filter(|n| n.parent_id().is_none())
        .map(|n| n.id())
        .collect();
    assert_eq!(roots, vec!["M1"]);
}

#[test]
fn enriched_tree_matches_card_settings() {
    let mut directory = org();
    directory.insert(Identity {
        attributes: BTreeMap::from([
            ("dept".to_string(), json!("Ops")),
            ("title".to_string(), json!("Lead")),
            ("location".to_string(), json!("Berlin")),
            ("extra".to_string(), json!("n/a")),
        ]),
        identity_type: Some("contractor".into()),
        ..person("P1", Some("M1"))
    });
    let settings = OrgChartSettings {
        identity_card_attributes: "dept,title,location,extra".into(),
        color_codes: r##"{"default":"#000", "employee":"#FAF"}"##.into(),
        ..Default::default()
    };
    let tree = TreeAssembler::new(&directory, &settings)
        .build_tree("P1")
        .unwrap();

    let p1 = serde_json::to_value(tree.node("P1").unwrap()).unwrap();
    assert_eq!(p1["colorCode"], "#000");
    assert_eq!(p1["dept"], "Ops");
    assert_eq!(p1["location"], "Berlin");
    assert!(p1.get("extra").is_none());
    assert_eq!(p1["attributes"], json!(["dept", "title", "location"]));

    let m1 = serde_json::to_value(tree.node("M1").unwrap()).unwrap();
    assert_eq!(m1["colorCode"], "#FAF");
    assert_eq!(m1["managesCount"], 3);
}

#[test]
fn chart_graph_lays_out_assembled_tree() {
    let directory = org();
    let settings = OrgChartSettings::default();
    let tree = TreeAssembler::new(&directory, &settings)
        .build_tree("M1")
        .unwrap();

    let chart = ChartGraph::new(&tree.nodes);
    let roots: Vec<_> = chart.roots().iter().map(|n| n.id().to_string()).collect();
    assert_eq!(roots, vec!["CEO"]);
    assert_eq!(chart.walk().len(), tree.nodes.len());
}
