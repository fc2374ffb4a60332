pub mod error;
pub mod logging;

pub mod cache;
pub mod config;
pub mod extract;
pub mod model;
pub mod path;
pub mod registry;
pub mod runtime;

pub use error::{ManscopeError, Result};
