mod build;
mod environment;

pub use build::*;
pub use environment::*;

/// Ordered, schema-less key/value payload (options, credentials, mapping).
pub type Map = indexmap::IndexMap<String, serde_json::Value>;
