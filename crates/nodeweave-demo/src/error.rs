//! Error types for the nodeweave-demo crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DemoError {
    #[error("Graph error: {0}")]
    Graph(#[from] nodeweave_graph::GraphError),

    #[error("Schema error: {0}")]
    Schema(#[from] nodeweave_core::SchemaError),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Expected {label} {name} to exist")]
    MissingNode { label: String, name: String },
}

pub type Result<T> = std::result::Result<T, DemoError>;
