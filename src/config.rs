//! Graph configuration
//!
//! Loaded from YAML, e.g.
//!
//! ```yaml
//! data_dir: /var/lib/docgraph
//! default_max_hits: 50000
//! graphs:
//!   archive:
//!     read_only: true
//! ```

use crate::error::{GraphError, GraphResult};
use crate::index::rocks::DEFAULT_MAX_HITS;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Name used for blank graph names
pub const DEFAULT_GRAPH_NAME: &str = "default";

/// Process-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Root under which graph directories are created
    pub data_dir: PathBuf,
    /// Hit cap for searches that ask for no limit
    pub default_max_hits: usize,
    /// Open every graph read-only
    pub read_only: bool,
    /// Per-graph overrides
    pub graphs: HashMap<String, GraphSettings>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("graphdata"),
            default_max_hits: DEFAULT_MAX_HITS,
            read_only: false,
            graphs: HashMap::new(),
        }
    }
}

/// Overrides for one named graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    pub node_dir: Option<PathBuf>,
    pub rel_dir: Option<PathBuf>,
    pub meta_dir: Option<PathBuf>,
    pub read_only: Option<bool>,
    pub default_max_hits: Option<usize>,
}

/// Fully resolved settings for opening one graph
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGraph {
    pub name: String,
    pub node_dir: PathBuf,
    pub rel_dir: PathBuf,
    pub meta_dir: PathBuf,
    pub read_only: bool,
    pub default_max_hits: usize,
}

/// Map blank names to the default graph
pub fn normalize_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        DEFAULT_GRAPH_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

impl GraphConfig {
    /// Config rooted at `data_dir` with everything else defaulted
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn from_yaml(yaml: &str) -> GraphResult<Self> {
        let config: GraphConfig = serde_yaml::from_str(yaml)
            .map_err(|e| GraphError::Config(format!("invalid YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> GraphResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| GraphError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_yaml(&yaml)
    }

    pub fn validate(&self) -> GraphResult<()> {
        if self.default_max_hits == 0 {
            return Err(GraphError::Config("default_max_hits must be positive".into()));
        }
        for (name, settings) in &self.graphs {
            if settings.default_max_hits == Some(0) {
                return Err(GraphError::Config(format!(
                    "graph {}: default_max_hits must be positive",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Directories and flags for the graph called `name`
    pub fn resolve(&self, name: &str) -> ResolvedGraph {
        let name = normalize_name(name);
        let settings = self.graphs.get(&name).cloned().unwrap_or_default();
        let root = if name == DEFAULT_GRAPH_NAME {
            self.data_dir.clone()
        } else {
            self.data_dir.join(&name)
        };

        ResolvedGraph {
            node_dir: settings.node_dir.unwrap_or_else(|| root.join("nodes")),
            rel_dir: settings.rel_dir.unwrap_or_else(|| root.join("rels")),
            meta_dir: settings.meta_dir.unwrap_or_else(|| root.join("meta")),
            read_only: settings.read_only.unwrap_or(self.read_only),
            default_max_hits: settings.default_max_hits.unwrap_or(self.default_max_hits),
            name,
        }
    }
}
