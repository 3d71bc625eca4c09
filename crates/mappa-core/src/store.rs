use std::fs;
use std::path::{Path, PathBuf};

use crate::model::ConceptNode;
use crate::navigator::{count_leaves, count_nodes};

pub const DEFAULT_MAP_FILE: &str = "concept_map.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("concept map '{}' not found; make sure it exists next to the app or pass --map", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read concept map '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("concept map '{}' is not valid: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The loaded concept map. Read-only for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct ConceptMap {
    root: ConceptNode,
    source: Option<PathBuf>,
}

impl ConceptMap {
    pub fn new(root: ConceptNode) -> Self {
        Self { root, source: None }
    }

    pub fn root(&self) -> &ConceptNode {
        &self.root
    }

    /// File the map was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw).map(Self::new)
    }
}

/// Read the concept map from disk.
pub fn load_concept_map(path: impl AsRef<Path>) -> Result<ConceptMap, StoreError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound(path.to_path_buf())
        } else {
            StoreError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let mut map = ConceptMap::from_json_str(&raw).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    map.source = Some(path.to_path_buf());

    tracing::info!(
        path = %path.display(),
        nodes = count_nodes(map.root()),
        leaves = count_leaves(map.root()),
        "loaded concept map"
    );
    Ok(map)
}
