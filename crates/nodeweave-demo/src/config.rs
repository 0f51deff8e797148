//! Configuration for the nodeweave demo.

use serde::Deserialize;

use nodeweave_graph::GraphConfig;

use crate::error::Result;

/// Top-level demo configuration.
///
/// Loaded from `nodeweave.toml` (`[neo4j]` and `[demo]` sections) or
/// `NODEWEAVE__` environment variables, e.g. `NODEWEAVE__NEO4J__URL`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub neo4j: GraphConfig,

    #[serde(default)]
    pub demo: DemoConfig,
}

/// Behaviour of the `populate` step.
#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    /// Detach-delete every node before populating (default: true).
    #[serde(default = "default_true")]
    pub clear_database: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            clear_database: default_true(),
        }
    }
}

/// Load configuration from `file_prefix` (any format the `config` crate
/// recognises, optional) overlaid with `NODEWEAVE__*` environment variables.
pub fn load_config(file_prefix: &str) -> Result<AppConfig> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("NODEWEAVE")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(cfg.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let config = load_config("/nonexistent/nodeweave-demo-config").unwrap();
        assert_eq!(config.neo4j.url, "bolt://localhost:7687");
        assert_eq!(config.neo4j.username, "neo4j");
        assert!(config.demo.clear_database);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodeweave.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[neo4j]\nurl = \"neo4j://graph.internal:7687\"\nencrypted = true\ndatabase = \"movies\"\n\n[demo]\nclear_database = false"
        )
        .unwrap();

        let config = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.neo4j.effective_url(), "neo4j+s://graph.internal:7687");
        assert_eq!(config.neo4j.database.as_deref(), Some("movies"));
        assert_eq!(config.neo4j.password, "neo4j");
        assert!(!config.demo.clear_database);
    }
}
