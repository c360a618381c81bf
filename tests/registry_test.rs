use docgraph::{GraphConfig, GraphRegistry, Node};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

#[test]
fn test_concurrent_get_returns_one_instance() {
    let temp_dir = TempDir::new().unwrap();
    let registry = Arc::new(GraphRegistry::new(GraphConfig::with_data_dir(temp_dir.path())));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.get("shared").unwrap())
        })
        .collect();
    let graphs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for graph in &graphs[1..] {
        assert!(Arc::ptr_eq(&graphs[0], graph));
    }
    assert_eq!(registry.open_graphs(), vec!["shared".to_string()]);
}

#[test]
fn test_graphs_are_isolated() {
    let temp_dir = TempDir::new().unwrap();
    let registry = GraphRegistry::new(GraphConfig::with_data_dir(temp_dir.path()));

    let left = registry.get("left").unwrap();
    let right = registry.get("right").unwrap();

    let mut node = Node::new("person").with_property("name", "Alice");
    left.save_node(&mut node).unwrap();

    assert_eq!(left.count_nodes("person").unwrap(), 1);
    assert_eq!(right.count_nodes("person").unwrap(), 0);
    assert_eq!(right.last_allocated_id(), 0);
}

#[test]
fn test_yaml_config_drives_layout() {
    let temp_dir = TempDir::new().unwrap();
    let yaml = format!(
        "data_dir: {}\ndefault_max_hits: 2\ngraphs:\n  archive:\n    read_only: true\n",
        temp_dir.path().display()
    );
    let config_path = temp_dir.path().join("docgraph.yaml");
    std::fs::write(&config_path, yaml).unwrap();

    let registry = GraphRegistry::new(GraphConfig::load(&config_path).unwrap());

    let graph = registry.default_graph().unwrap();
    let mut nodes: Vec<Node> = (0..5).map(|_| Node::new("item")).collect();
    graph.ingest_nodes(&mut nodes).unwrap();
    assert!(temp_dir.path().join("nodes").exists());
    assert!(temp_dir.path().join("meta").join("id.store").exists());

    // The configured default caps uncapped searches
    let found = graph.find_nodes_by_type(Some("item"), None, None, 0).unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(graph.count_nodes("item").unwrap(), 5);

    let archive = registry.get("archive").unwrap();
    assert!(archive.is_read_only());
    let mut node = Node::new("item");
    assert!(archive.save_node(&mut node).unwrap_err().is_read_only());
}
