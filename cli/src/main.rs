//! Docgraph CLI for graphs on local disk

use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use docgraph::{
    EntityId, GraphConfig, GraphManager, GraphRegistry, Node, PropertyHolder, PropertyMap,
    PropertyValue, Relationship,
};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "docgraph", version, about = "Docgraph CLI")]
struct Cli {
    /// YAML config file
    #[arg(long, global = true, env = "DOCGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory, when no config file is given
    #[arg(long, global = true, default_value = "graphdata")]
    data_dir: PathBuf,

    /// Graph name
    #[arg(long, global = true, default_value = "default")]
    graph: String,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Entity types and their counts
    Types,
    /// Tracked property names and types
    Schema,
    /// Find nodes or relationships by type and/or key=value
    Find {
        /// Entity type
        #[arg(long = "type")]
        entity_type: Option<String>,

        /// Property key
        #[arg(long)]
        key: Option<String>,

        /// Property value; numbers are matched as numbers
        #[arg(long)]
        value: Option<String>,

        /// Search relationships instead of nodes
        #[arg(long)]
        relationships: bool,

        /// Load endpoint nodes of relationship results
        #[arg(long)]
        fetch_nodes: bool,

        /// Result cap; 0 means the configured default
        #[arg(long, default_value_t = 0)]
        max: i32,
    },
    /// Relationships touching a node
    Related {
        /// Node ID
        id: String,
    },
    /// Load entities from a JSON-lines file
    Ingest {
        file: PathBuf,

        /// Lines are relationships with node1/node2 fields
        #[arg(long)]
        relationships: bool,
    },
    /// Delete a node and its relationships
    DeleteNode {
        /// Node ID
        id: String,
    },
    /// Rebuild the schema from a random sample of the indexes
    RebuildSchema {
        /// Fraction of documents to sample
        #[arg(long, default_value_t = 0.1)]
        fraction: f64,
    },
    /// Remove relationships pointing at deleted nodes
    Repair,
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> CliResult<()> {
    let config = match &cli.config {
        Some(path) => GraphConfig::load(path)?,
        None => GraphConfig::with_data_dir(&cli.data_dir),
    };
    let registry = GraphRegistry::new(config);
    let graph = registry.get(&cli.graph)?;

    match &cli.command {
        Commands::Types => run_types(&graph, &cli.format),
        Commands::Schema => run_schema(&graph, &cli.format),
        Commands::Find {
            entity_type,
            key,
            value,
            relationships,
            fetch_nodes,
            max,
        } => {
            let value = value.as_deref().map(parse_value);
            if *relationships {
                let rels = graph.find_relationships_by_type(
                    entity_type.as_deref(),
                    key.as_deref(),
                    value,
                    *fetch_nodes,
                    *max,
                )?;
                print_relationships(&rels, &cli.format)
            } else {
                let nodes =
                    graph.find_nodes_by_type(entity_type.as_deref(), key.as_deref(), value, *max)?;
                print_nodes(&nodes, &cli.format)
            }
        }
        Commands::Related { id } => {
            let rels = graph.find_related_nodes(&EntityId::from(id.as_str()))?;
            print_relationships(&rels, &cli.format)
        }
        Commands::Ingest {
            file,
            relationships,
        } => run_ingest(&graph, file, *relationships),
        Commands::DeleteNode { id } => {
            graph.delete_node(&EntityId::from(id.as_str()))?;
            println!("Deleted node {}", id);
            Ok(())
        }
        Commands::RebuildSchema { fraction } => {
            let schema = graph.generate_schema_from_sample(*fraction)?;
            graph.replace_schema(schema)?;
            run_schema(&graph, &cli.format)
        }
        Commands::Repair => {
            let removed = graph.repair_dangling_relationships()?;
            println!("Removed {} dangling relationship(s)", removed);
            Ok(())
        }
    }
}

fn run_types(graph: &GraphManager, format: &OutputFormat) -> CliResult<()> {
    let nodes = graph.node_counts_by_type()?;
    let rels = graph.relationship_counts_by_type()?;

    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({ "nodes": nodes, "relationships": rels });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Table => {
            let mut table = new_table(&["kind", "type", "count"]);
            for (t, count) in &nodes {
                table.add_row(vec!["node".to_string(), t.clone(), count.to_string()]);
            }
            for (t, count) in &rels {
                table.add_row(vec!["relationship".to_string(), t.clone(), count.to_string()]);
            }
            println!("{}", table);
        }
    }
    Ok(())
}

fn run_schema(graph: &GraphManager, format: &OutputFormat) -> CliResult<()> {
    let schema = graph.schema();

    match format {
        OutputFormat::Json => println!("{}", schema.to_json()?),
        OutputFormat::Table => {
            let mut table = new_table(&["kind", "type", "property", "value type"]);
            let sections = [("node", &schema.nodes), ("relationship", &schema.rels)];
            for (kind, types) in sections {
                for (entity_type, props) in types {
                    for (name, tag) in props {
                        table.add_row(vec![
                            kind.to_string(),
                            entity_type.clone(),
                            name.clone(),
                            tag.as_str().to_string(),
                        ]);
                    }
                }
            }
            println!("{}", table);
        }
    }
    Ok(())
}

fn run_ingest(graph: &GraphManager, file: &Path, relationships: bool) -> CliResult<()> {
    let reader = BufReader::new(std::fs::File::open(file)?);
    let mut nodes = Vec::new();
    let mut rels = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let object = match serde_json::from_str::<serde_json::Value>(&line)? {
            serde_json::Value::Object(map) => map,
            _ => {
                warn!("Skipping line {}: not a JSON object", line_no + 1);
                continue;
            }
        };
        let mut props = PropertyMap::new();
        let mut id = None;
        let mut entity_type = None;
        let mut node1 = None;
        let mut node2 = None;
        for (key, value) in object {
            match key.as_str() {
                "id" => id = json_text(&value),
                "type" => entity_type = json_text(&value),
                "node1" if relationships => node1 = json_text(&value),
                "node2" if relationships => node2 = json_text(&value),
                _ => {
                    props.insert(key, json_to_property(&value));
                }
            }
        }

        if relationships {
            rels.push(Relationship {
                id: id.map(EntityId::from),
                rel_type: entity_type,
                node1: node1.map(|n| Node::light(n, None)),
                node2: node2.map(|n| Node::light(n, None)),
                properties: props,
            });
        } else {
            nodes.push(Node {
                id: id.map(EntityId::from),
                node_type: entity_type,
                properties: props,
            });
        }
    }

    if relationships {
        graph.save_relationships(&mut rels)?;
        info!("Loaded {} relationships from {}", rels.len(), file.display());
        println!("Saved {} relationship(s)", rels.len());
    } else {
        graph.save_nodes(&mut nodes)?;
        info!("Loaded {} nodes from {}", nodes.len(), file.display());
        println!("Saved {} node(s)", nodes.len());
    }
    Ok(())
}

fn parse_value(raw: &str) -> PropertyValue {
    if let Ok(i) = raw.parse::<i64>() {
        PropertyValue::Integer(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        PropertyValue::Float(f)
    } else {
        PropertyValue::String(raw.to_string())
    }
}

fn json_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_to_property(value: &serde_json::Value) -> PropertyValue {
    match value {
        serde_json::Value::Null => PropertyValue::Null,
        serde_json::Value::Bool(b) => PropertyValue::Boolean(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => PropertyValue::Integer(i),
            None => PropertyValue::Float(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => PropertyValue::String(s.clone()),
        serde_json::Value::Array(items) => {
            PropertyValue::Array(items.iter().map(json_to_property).collect())
        }
        serde_json::Value::Object(_) => PropertyValue::String(value.to_string()),
    }
}

fn property_to_json(value: &PropertyValue) -> serde_json::Value {
    match value {
        PropertyValue::String(s) => serde_json::Value::from(s.as_str()),
        PropertyValue::Integer(i) | PropertyValue::DateTime(i) => serde_json::Value::from(*i),
        PropertyValue::Float(f) => serde_json::Value::from(*f),
        PropertyValue::Boolean(b) => serde_json::Value::from(*b),
        PropertyValue::Array(items) => items.iter().map(property_to_json).collect(),
        PropertyValue::Null => serde_json::Value::Null,
    }
}

fn properties_json(props: &PropertyMap) -> serde_json::Value {
    let mut keys: Vec<&String> = props.keys().collect();
    keys.sort();
    keys.into_iter()
        .map(|k| (k.clone(), property_to_json(&props[k])))
        .collect::<serde_json::Map<_, _>>()
        .into()
}

fn node_json(node: &Node) -> serde_json::Value {
    serde_json::json!({
        "id": node.id().map(EntityId::as_str),
        "type": node.node_type(),
        "properties": properties_json(&node.properties),
    })
}

fn print_nodes(nodes: &[Node], format: &OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let out: Vec<_> = nodes.iter().map(node_json).collect();
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Table => {
            let mut table = new_table(&["id", "type", "properties"]);
            for node in nodes {
                table.add_row(vec![
                    node.id().map(ToString::to_string).unwrap_or_default(),
                    node.node_type().unwrap_or_default().to_string(),
                    properties_json(&node.properties).to_string(),
                ]);
            }
            println!("{}", table);
            println!("{} node(s)", nodes.len());
        }
    }
    Ok(())
}

fn print_relationships(rels: &[Relationship], format: &OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let out: Vec<_> = rels
                .iter()
                .map(|rel| {
                    serde_json::json!({
                        "id": rel.id().map(EntityId::as_str),
                        "type": rel.rel_type(),
                        "node1": rel.node1().map(node_json),
                        "node2": rel.node2().map(node_json),
                        "properties": properties_json(&rel.properties),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Table => {
            let mut table = new_table(&["id", "type", "node1", "node2", "properties"]);
            for rel in rels {
                table.add_row(vec![
                    rel.id().map(ToString::to_string).unwrap_or_default(),
                    rel.rel_type().unwrap_or_default().to_string(),
                    endpoint_label(rel.node1()),
                    endpoint_label(rel.node2()),
                    properties_json(&rel.properties).to_string(),
                ]);
            }
            println!("{}", table);
            println!("{} relationship(s)", rels.len());
        }
    }
    Ok(())
}

fn endpoint_label(node: Option<&Node>) -> String {
    match node {
        Some(node) => {
            let id = node.id().map(ToString::to_string).unwrap_or_default();
            match (node.node_type(), node.get_string("name")) {
                (_, Some(name)) => format!("({}:{})", id, name),
                (Some(t), None) => format!("({}:{})", id, t),
                (None, None) => format!("({})", id),
            }
        }
        None => String::new(),
    }
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header.to_vec());
    table
}
