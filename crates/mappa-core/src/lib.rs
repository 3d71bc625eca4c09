pub mod model;
pub mod navigator;
pub mod session;
pub mod settings;
pub mod store;

pub use model::{Children, ConceptNode, NodeKind};
pub use navigator::{
    breadcrumb, children_of, collect_leaves, count_leaves, count_nodes, display_title, is_leaf,
    resolve, search_leaves, stats, LeafEntry, MapStats, SearchResults, DEFAULT_LEAF_TITLE,
    SEARCH_RESULT_LIMIT,
};
pub use session::{ChildEntry, NodeView, Session, ViewBody, Viewed};
pub use settings::{read_settings, AiSettings, RelaySettings, Settings};
pub use store::{load_concept_map, ConceptMap, StoreError, DEFAULT_MAP_FILE};
