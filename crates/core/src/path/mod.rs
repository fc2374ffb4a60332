//! Search-path discovery.

pub mod live;
pub mod scanner;

pub use live::LiveIndex;
pub use scanner::{PathScanner, search_path_from_env, split_search_path};
