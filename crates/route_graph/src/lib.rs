//! The route graph: building it from a dataset, holding the published copy,
//! and searching it.

pub mod builder;
pub mod path;
pub mod store;

pub use builder::{build_graph, BuildError};
pub use path::{find_all_paths, shortest_path, PathResult};
pub use store::GraphStore;
