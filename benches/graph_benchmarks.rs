use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use docgraph::compiler::compile;
use docgraph::codec::entity_analyzer;
use docgraph::{Criterion as Predicate, GraphConfig, GraphManager, GraphQuery, Node, Relationship};
use tempfile::TempDir;

fn people(size: usize) -> Vec<Node> {
    (0..size)
        .map(|i| {
            Node::new("person")
                .with_property("name", format!("Person{}", i))
                .with_property("age", (i % 100) as i64)
        })
        .collect()
}

fn open(dir: &TempDir) -> GraphManager {
    GraphManager::open(&GraphConfig::with_data_dir(dir.path()), "bench").unwrap()
}

/// Benchmark bulk node ingest throughput
fn bench_node_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("node_ingest");
    group.sample_size(10);

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter_with_setup(
                || (TempDir::new().unwrap(), people(size)),
                |(dir, mut nodes)| {
                    let graph = open(&dir);
                    graph.ingest_nodes(&mut nodes).unwrap();
                },
            );
        });
    }
    group.finish();
}

/// Benchmark criterion search over a populated graph
fn bench_criterion_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("criterion_search");

    for size in [1000, 10_000].iter() {
        let dir = TempDir::new().unwrap();
        let graph = open(&dir);
        graph.ingest_nodes(&mut people(*size)).unwrap();

        let query = GraphQuery::new(Predicate::and(vec![
            Predicate::equals("type", "person"),
            Predicate::range_inclusive("age", 18i64, 65i64),
        ]));

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| graph.find_nodes_query(&query).unwrap());
        });
    }
    group.finish();
}

/// Benchmark related-node lookup with endpoint hydration
fn bench_related_nodes(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let graph = open(&dir);
    let mut nodes = people(200);
    graph.ingest_nodes(&mut nodes).unwrap();

    let hub = nodes[0].clone();
    let mut rels: Vec<Relationship> = nodes[1..]
        .iter()
        .map(|n| Relationship::new(hub.clone(), n.clone(), "knows"))
        .collect();
    graph.ingest_relationships(&mut rels).unwrap();

    let hub_id = hub.id.unwrap();
    c.bench_function("related_nodes_hub", |b| {
        b.iter(|| graph.find_related_nodes(&hub_id).unwrap());
    });
}

/// Benchmark criterion compilation alone
fn bench_compile(c: &mut Criterion) {
    let analyzer = entity_analyzer();
    let predicate = Predicate::and(vec![
        Predicate::equals("type", "person"),
        Predicate::equals("name", "Alice Smith"),
        Predicate::or(vec![
            Predicate::range_inclusive("age", 18i64, 65i64),
            Predicate::range("score", 0.5, 1.0),
        ]),
    ]);

    c.bench_function("compile_criterion", |b| {
        b.iter(|| compile(&predicate, &analyzer).unwrap());
    });
}

criterion_group!(
    benches,
    bench_node_ingest,
    bench_criterion_search,
    bench_related_nodes,
    bench_compile
);
criterion_main!(benches);
