//! Resolution options.
//!
//! All configuration is passed in as an explicit value at invocation time;
//! there is no shared mutable context. The CLI can populate the options from
//! a small TOML file:
//!
//! ```toml
//! [resolution]
//! granularity = "document"
//! workers = 4
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::graph::Granularity;

/// Options for one resolution pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Node granularity of the dependency graph.
    #[serde(default)]
    pub granularity: Granularity,

    /// Size of the parse worker pool. Bounded by the input count at run
    /// time; resolution itself is always single-threaded.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_workers() -> usize {
    4
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            granularity: Granularity::default(),
            workers: default_workers(),
        }
    }
}

/// On-disk shape of the options file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct OptionsFile {
    #[serde(default)]
    resolution: ResolveOptions,
}

impl ResolveOptions {
    /// Load options from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let file: OptionsFile = toml::from_str(&text)?;
        Ok(file.resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_document_granularity() {
        let options = ResolveOptions::default();
        assert_eq!(options.granularity, Granularity::Document);
        assert_eq!(options.workers, 4);
    }

    #[test]
    fn parses_options_file() {
        let file: OptionsFile = toml::from_str(
            r#"
            [resolution]
            granularity = "type"
            workers = 2
            "#,
        )
        .unwrap();
        assert_eq!(file.resolution.granularity, Granularity::Type);
        assert_eq!(file.resolution.workers, 2);
    }

    #[test]
    fn missing_table_falls_back_to_defaults() {
        let file: OptionsFile = toml::from_str("").unwrap();
        assert_eq!(file.resolution.granularity, Granularity::Document);
    }
}
