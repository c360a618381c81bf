use docgraph::{
    EntityId, GraphConfig, GraphError, GraphManager, GraphSchema, Node, PropertyHolder,
    PropertyValue, Relationship,
};
use tempfile::TempDir;

fn open(dir: &TempDir) -> GraphManager {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    GraphManager::open(&GraphConfig::with_data_dir(dir.path()), "").unwrap()
}

fn id(n: u64) -> EntityId {
    EntityId::from(n)
}

#[test]
fn test_ingest_assigns_sequential_ids_and_counts_types() {
    let temp_dir = TempDir::new().unwrap();
    let graph = open(&temp_dir);

    let mut nodes = vec![
        Node::new("person").with_property("name", "Alice"),
        Node::new("person").with_property("name", "Bob"),
        Node::new("company").with_property("name", "Acme"),
    ];
    graph.ingest_nodes(&mut nodes).unwrap();

    let ids: Vec<u64> = nodes.iter().map(|n| n.long_id().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(graph.node_types().unwrap(), vec!["company", "person"]);
    assert_eq!(graph.count_nodes("person").unwrap(), 2);
    assert_eq!(graph.count_nodes("company").unwrap(), 1);

    let counts = graph.node_counts_by_type().unwrap();
    assert_eq!(counts.get("person"), Some(&2));
    assert_eq!(counts.get("company"), Some(&1));
}

#[test]
fn test_ids_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    {
        let graph = open(&temp_dir);
        let mut nodes = vec![Node::new("person"), Node::new("person")];
        graph.ingest_nodes(&mut nodes).unwrap();
    }

    let graph = open(&temp_dir);
    assert_eq!(graph.last_allocated_id(), 2);
    let mut node = Node::new("person");
    graph.save_node(&mut node).unwrap();
    assert_eq!(node.long_id(), Some(3));
    assert_eq!(graph.count_nodes("person").unwrap(), 3);
}

#[test]
fn test_find_nodes_by_analyzed_text() {
    let temp_dir = TempDir::new().unwrap();
    let graph = open(&temp_dir);

    let mut nodes = vec![
        Node::new("person").with_property("name", "Alice Smith"),
        Node::new("person").with_property("name", "Alice Jones"),
        Node::new("company").with_property("name", "Smith & Co"),
    ];
    graph.ingest_nodes(&mut nodes).unwrap();

    let found = graph.find_nodes("name", "alice smith").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get_string("name"), Some("Alice Smith".to_string()));

    let smiths = graph.find_nodes("name", "SMITH").unwrap();
    assert_eq!(smiths.len(), 2);

    let people = graph
        .find_nodes_by_type(Some("person"), Some("name"), Some("smith".into()), 0)
        .unwrap();
    assert_eq!(people.len(), 1);

    let capped = graph.find_nodes_by_type(Some("person"), None, None, 1).unwrap();
    assert_eq!(capped.len(), 1);
    assert_eq!(capped[0].long_id(), Some(1));
}

#[test]
fn test_typed_property_lookup() {
    let temp_dir = TempDir::new().unwrap();
    let graph = open(&temp_dir);

    let mut node = Node::new("sensor")
        .with_property("reading", 21.5)
        .with_property("floor", 3i64)
        .with_property("active", true)
        .with_property("tags", vec!["north", "roof"]);
    graph.save_node(&mut node).unwrap();

    assert_eq!(graph.find_nodes("reading", 21.5).unwrap().len(), 1);
    assert_eq!(graph.find_nodes("floor", 3i64).unwrap().len(), 1);
    assert_eq!(graph.find_nodes("floor", 4i64).unwrap().len(), 0);
    assert_eq!(graph.find_nodes("active", true).unwrap().len(), 1);
    assert_eq!(graph.find_nodes("tags", "roof").unwrap().len(), 1);

    let stored = graph.get_node(node.id().unwrap()).unwrap().unwrap();
    assert_eq!(stored.get_double("reading"), Some(21.5));
    assert_eq!(stored.get_long("floor"), Some(3));
    assert_eq!(stored.get_boolean("active"), Some(true));
    assert_eq!(
        stored.get_property("tags"),
        Some(&PropertyValue::Array(vec!["north".into(), "roof".into()]))
    );
}

#[test]
fn test_delete_node_cascades_to_relationships() {
    let temp_dir = TempDir::new().unwrap();
    let graph = open(&temp_dir);

    let mut nodes = vec![
        Node::new("person").with_property("name", "Alice"),
        Node::new("person").with_property("name", "Bob"),
        Node::new("person").with_property("name", "Carol"),
    ];
    graph.ingest_nodes(&mut nodes).unwrap();

    let mut rels = vec![
        Relationship::new(nodes[0].clone(), nodes[1].clone(), "knows"),
        Relationship::new(nodes[1].clone(), nodes[2].clone(), "knows"),
        Relationship::new(nodes[2].clone(), nodes[0].clone(), "knows"),
    ];
    graph.ingest_relationships(&mut rels).unwrap();
    assert_eq!(graph.count_relationships("knows").unwrap(), 3);

    graph.delete_node(&id(1)).unwrap();

    assert!(graph.get_node(&id(1)).unwrap().is_none());
    assert_eq!(graph.count_nodes("person").unwrap(), 2);
    assert_eq!(graph.count_relationships("knows").unwrap(), 1);
    let left = graph.find_related_nodes(&id(2)).unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].node2_id(), Some(&id(3)));
    assert!(graph.find_related_nodes(&id(1)).unwrap().is_empty());
}

#[test]
fn test_related_nodes_are_hydrated() {
    let temp_dir = TempDir::new().unwrap();
    let graph = open(&temp_dir);

    let mut alice = Node::new("person").with_property("name", "Alice");
    let mut acme = Node::new("company").with_property("name", "Acme");
    graph.save_node(&mut alice).unwrap();
    graph.save_node(&mut acme).unwrap();

    let mut works = Relationship::new(alice.clone(), acme.clone(), "works_at")
        .with_property("since", 2019i64);
    graph.save_relationship(&mut works).unwrap();

    let related = graph.find_related_nodes(alice.id().unwrap()).unwrap();
    assert_eq!(related.len(), 1);
    let rel = &related[0];
    assert_eq!(rel.get_long("since"), Some(2019));
    assert_eq!(
        rel.node1().unwrap().get_string("name"),
        Some("Alice".to_string())
    );
    assert_eq!(
        rel.node2().unwrap().get_string("name"),
        Some("Acme".to_string())
    );

    let light = graph
        .get_relationship(works.id().unwrap(), false)
        .unwrap()
        .unwrap();
    assert_eq!(light.node1_id(), alice.id());
    assert_eq!(light.node2_type(), Some("company"));
    assert_eq!(light.node1().unwrap().property_count(), 0);

    let full = graph
        .get_relationship(works.id().unwrap(), true)
        .unwrap()
        .unwrap();
    assert_eq!(full.node1().unwrap(), &graph.get_node(alice.id().unwrap()).unwrap().unwrap());
}

#[test]
fn test_hydration_keeps_light_endpoint_for_missing_node() {
    let temp_dir = TempDir::new().unwrap();
    let graph = open(&temp_dir);

    let mut alice = Node::new("person").with_property("name", "Alice");
    graph.save_node(&mut alice).unwrap();
    let mut rel = Relationship::new(alice.clone(), Node::light("404", None), "knows");
    graph.save_relationship(&mut rel).unwrap();

    let rels = graph.find_relationships_by_type(Some("knows"), None, None, true, 0).unwrap();
    assert_eq!(rels.len(), 1);
    assert_eq!(rels[0].node1().unwrap().get_string("name"), Some("Alice".to_string()));
    assert_eq!(rels[0].node2_id(), Some(&EntityId::from("404")));
    assert_eq!(rels[0].node2().unwrap().property_count(), 0);
}

#[test]
fn test_save_replaces_existing_documents() {
    let temp_dir = TempDir::new().unwrap();
    let graph = open(&temp_dir);

    let mut nodes = vec![
        Node::new("person").with_property("name", "Alice"),
        Node::new("person").with_property("name", "Bob"),
    ];
    graph.ingest_nodes(&mut nodes).unwrap();

    nodes[0].set_property("name", "Alicia");
    nodes.push(Node::new("person").with_property("name", "Carol"));
    graph.save_nodes(&mut nodes).unwrap();

    assert_eq!(nodes[2].long_id(), Some(3));
    assert_eq!(graph.count_nodes("person").unwrap(), 3);
    assert!(graph.find_nodes("name", "alice").unwrap().is_empty());
    assert_eq!(graph.find_nodes("name", "alicia").unwrap().len(), 1);

    let mut rels = vec![Relationship::new(nodes[0].clone(), nodes[1].clone(), "knows")];
    graph.save_relationships(&mut rels).unwrap();
    rels[0].set_property("weight", 0.5);
    graph.save_relationships(&mut rels).unwrap();

    let found = graph.find_relationships("weight", 0.5, false).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), rels[0].id());
    assert_eq!(graph.count_relationships("knows").unwrap(), 1);
    assert_eq!(graph.count_nodes("person").unwrap(), 3);
}

#[test]
fn test_delete_relationships() {
    let temp_dir = TempDir::new().unwrap();
    let graph = open(&temp_dir);

    let mut rels = vec![
        Relationship::light("1", "2", "knows"),
        Relationship::light("2", "3", "knows"),
        Relationship::light("3", "1", "likes"),
    ];
    graph.ingest_relationships(&mut rels).unwrap();
    assert_eq!(graph.relationship_types().unwrap(), vec!["knows", "likes"]);

    graph.delete_relationships(&rels[..2]).unwrap();
    assert_eq!(graph.count_relationships("knows").unwrap(), 0);
    graph.delete_relationship(rels[2].id().unwrap()).unwrap();
    assert!(graph.relationship_types().unwrap().is_empty());
}

#[test]
fn test_delete_relationship_keeps_both_nodes() {
    let temp_dir = TempDir::new().unwrap();
    let graph = open(&temp_dir);

    let mut alice = Node::new("person").with_property("name", "Alice");
    let mut bob = Node::new("person").with_property("name", "Bob");
    graph.save_node(&mut alice).unwrap();
    graph.save_node(&mut bob).unwrap();
    let mut knows = Relationship::new(alice.clone(), bob.clone(), "knows");
    graph.save_relationship(&mut knows).unwrap();

    graph.delete_relationship(knows.id().unwrap()).unwrap();

    assert_eq!(graph.count_relationships("knows").unwrap(), 0);
    assert_eq!(graph.count_nodes("person").unwrap(), 2);
    assert!(graph.get_node(alice.id().unwrap()).unwrap().is_some());
    assert!(graph.get_node(bob.id().unwrap()).unwrap().is_some());
    assert!(graph.find_related_nodes(alice.id().unwrap()).unwrap().is_empty());
}

#[test]
fn test_ids_differing_in_case_are_distinct() {
    let temp_dir = TempDir::new().unwrap();
    let graph = open(&temp_dir);

    let mut upper = Node::with_id("Bob", "person").with_property("name", "Upper");
    let mut lower = Node::with_id("bob", "person").with_property("name", "Lower");
    graph.save_node(&mut upper).unwrap();
    graph.save_node(&mut lower).unwrap();
    assert_eq!(graph.count_nodes("person").unwrap(), 2);

    let mut rels = vec![
        Relationship::new(upper.clone(), lower.clone(), "knows"),
        Relationship::new(lower.clone(), lower.clone(), "knows"),
    ];
    graph.ingest_relationships(&mut rels).unwrap();
    assert_eq!(graph.find_related_nodes(&EntityId::from("Bob")).unwrap().len(), 1);

    graph.delete_node(&EntityId::from("Bob")).unwrap();
    let left = graph.get_node(&EntityId::from("bob")).unwrap().unwrap();
    assert_eq!(left.get_string("name"), Some("Lower".to_string()));
    assert!(graph.get_node(&EntityId::from("Bob")).unwrap().is_none());
    assert_eq!(graph.count_nodes("person").unwrap(), 1);
    assert_eq!(graph.count_relationships("knows").unwrap(), 1);
}

#[test]
fn test_schema_tracks_saves_and_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let graph = open(&temp_dir);

    let mut node = Node::new("person")
        .with_property("name", "Alice")
        .with_property("age", 30i64);
    graph.save_node(&mut node).unwrap();
    let first = graph.schema();

    graph.save_node(&mut node).unwrap();
    assert_eq!(graph.schema(), first);
    assert_eq!(
        graph.property_names_for_node_type("person"),
        vec!["age".to_string(), "name".to_string()]
    );

    let mut rel = Relationship::new(node.clone(), node.clone(), "knows").with_property("since", 2020i64);
    graph.save_relationship(&mut rel).unwrap();
    assert_eq!(
        graph.property_names_for_relationship_type("knows"),
        vec!["since".to_string()]
    );

    let by_type = graph.property_names_by_node_type().unwrap();
    assert_eq!(by_type["person"], vec!["age".to_string(), "name".to_string()]);
    let by_rel_type = graph.property_names_by_relationship_type().unwrap();
    assert_eq!(by_rel_type["knows"], vec!["since".to_string()]);
}

#[test]
fn test_schema_rebuild_from_sample() {
    let temp_dir = TempDir::new().unwrap();
    let graph = open(&temp_dir);

    let mut nodes: Vec<Node> = (0..20)
        .map(|i| Node::new("item").with_property("rank", i as i64))
        .collect();
    nodes[7].set_property("rare", "yes");
    graph.ingest_nodes(&mut nodes).unwrap();
    assert!(!graph.property_names_for_node_type("item").contains(&"rare".to_string()));

    // Only the property every document carries is certain to be drawn
    let rebuilt = graph.generate_schema_from_sample(1.0).unwrap();
    assert!(rebuilt.node_property_names(Some("item")).contains("rank"));

    graph.replace_schema(GraphSchema::new()).unwrap();
    assert_eq!(graph.schema(), GraphSchema::new());

    graph.replace_schema(rebuilt.clone()).unwrap();
    drop(graph);
    let graph = open(&temp_dir);
    assert_eq!(graph.schema(), rebuilt);

    // Fractions above one are capped at the size of the index
    for fraction in [2.0, 1e12, f64::INFINITY] {
        let oversampled = graph.generate_schema_from_sample(fraction).unwrap();
        assert!(oversampled.node_property_names(Some("item")).contains("rank"));
    }
}

#[test]
fn test_repair_dangling_relationships() {
    let temp_dir = TempDir::new().unwrap();
    let graph = open(&temp_dir);

    let mut nodes = vec![Node::new("person"), Node::new("person")];
    graph.ingest_nodes(&mut nodes).unwrap();
    let mut rels = vec![
        Relationship::new(nodes[0].clone(), nodes[1].clone(), "knows"),
        Relationship::new(nodes[0].clone(), Node::light("77", None), "knows"),
    ];
    graph.ingest_relationships(&mut rels).unwrap();

    assert_eq!(graph.repair_dangling_relationships().unwrap(), 1);
    assert_eq!(graph.count_relationships("knows").unwrap(), 1);
    assert_eq!(graph.repair_dangling_relationships().unwrap(), 0);
}

#[test]
fn test_read_only_graph_refuses_writes() {
    let temp_dir = TempDir::new().unwrap();
    {
        let graph = open(&temp_dir);
        let mut node = Node::new("person").with_property("name", "Alice");
        graph.save_node(&mut node).unwrap();
    }

    let mut config = GraphConfig::with_data_dir(temp_dir.path());
    config.read_only = true;
    let graph = GraphManager::open(&config, "").unwrap();
    assert!(graph.is_read_only());

    assert_eq!(graph.find_nodes("name", "alice").unwrap().len(), 1);

    let mut node = Node::new("person");
    let err = graph.save_node(&mut node).unwrap_err();
    assert!(err.is_read_only());
    assert!(node.id.is_none());
    assert_eq!(graph.last_allocated_id(), 1);

    assert!(graph.delete_node(&id(1)).unwrap_err().is_read_only());
    assert!(graph
        .ingest_nodes(&mut [Node::new("person")])
        .unwrap_err()
        .is_read_only());
    assert!(matches!(
        graph.repair_dangling_relationships(),
        Err(GraphError::Storage { .. })
    ));
    assert_eq!(graph.count_nodes("person").unwrap(), 1);
}

#[test]
fn test_null_lookup_returns_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let graph = open(&temp_dir);
    let mut node = Node::new("person").with_property("name", "Alice");
    graph.save_node(&mut node).unwrap();

    assert!(graph.find_nodes("name", PropertyValue::Null).unwrap().is_empty());
    assert!(matches!(
        graph.find_relationships_by_type(None, None, None, false, 0),
        Err(GraphError::Validation(_))
    ));
}
