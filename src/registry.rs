//! Process-wide registry of open graphs
//!
//! Each name maps to at most one [`GraphManager`] for the life of the
//! registry. Blank names resolve to the default graph.

use crate::config::{normalize_name, GraphConfig};
use crate::error::GraphResult;
use crate::manager::GraphManager;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

/// Registry of graph managers keyed by name
pub struct GraphRegistry {
    config: GraphConfig,
    /// Graphs opened so far
    graphs: RwLock<HashMap<String, Arc<GraphManager>>>,
}

impl GraphRegistry {
    pub fn new(config: GraphConfig) -> Self {
        info!(
            "Graph registry initialized with data dir {}",
            config.data_dir.display()
        );
        Self {
            config,
            graphs: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// The manager for `name`, opening it on first use.
    ///
    /// Concurrent callers asking for the same name all receive the same
    /// instance.
    pub fn get(&self, name: &str) -> GraphResult<Arc<GraphManager>> {
        let name = normalize_name(name);

        if let Some(graph) = self
            .graphs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&name)
        {
            return Ok(Arc::clone(graph));
        }

        let mut graphs = self.graphs.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(graph) = graphs.get(&name) {
            return Ok(Arc::clone(graph));
        }

        let graph = Arc::new(GraphManager::open(&self.config, &name)?);
        graphs.insert(name.clone(), Arc::clone(&graph));
        info!("Registered graph: {}", name);
        Ok(graph)
    }

    /// Shortcut for the default graph
    pub fn default_graph(&self) -> GraphResult<Arc<GraphManager>> {
        self.get("")
    }

    /// Names of the graphs opened so far, sorted
    pub fn open_graphs(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .graphs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.graphs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&normalize_name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_blank_name_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let registry = GraphRegistry::new(GraphConfig::with_data_dir(temp_dir.path()));

        let a = registry.get("").unwrap();
        let b = registry.get("default").unwrap();
        let c = registry.default_graph().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));
        assert_eq!(a.name(), "default");
        assert_eq!(registry.open_graphs(), vec!["default".to_string()]);
    }

    #[test]
    fn test_named_graphs_are_separate() {
        let temp_dir = TempDir::new().unwrap();
        let registry = GraphRegistry::new(GraphConfig::with_data_dir(temp_dir.path()));

        let a = registry.get("alpha").unwrap();
        let b = registry.get("beta").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(registry.is_open(" alpha "));
        assert!(!registry.is_open("gamma"));
        assert!(temp_dir.path().join("alpha").join("nodes").exists());
    }
}
