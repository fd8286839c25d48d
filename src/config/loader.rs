// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::config::Options;
use crate::errors::ConfigError;

/// Graph-wide configuration.
///
/// Only the defaults every vertex inherits live here; topology is assembled
/// in code.
///
/// # Example
/// ```yaml
/// defaults:
///   trace: true
///   metrics: true
///   debug: false
///   isolation_copy: false
///   serial_dispatch: true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub defaults: Options,
}

/// Load a graph config from a YAML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GraphConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

pub fn parse_config(yaml: &str) -> Result<GraphConfig, ConfigError> {
    Ok(serde_yaml::from_str(yaml)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_basic_config() {
        let yaml = r#"
defaults:
  trace: false
  serial_dispatch: true
"#;

        let cfg = parse_config(yaml).unwrap();
        assert_eq!(cfg.defaults.trace, Some(false));
        assert_eq!(cfg.defaults.serial_dispatch, Some(true));
        assert_eq!(cfg.defaults.metrics, None);
    }

    #[test]
    fn test_missing_defaults_section() {
        let cfg = parse_config("{}").unwrap();
        assert_eq!(cfg.defaults, Options::default());
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let result = parse_config("defaults:\n  trace: maybe\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "defaults:\n  debug: true").unwrap();

        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.defaults.debug, Some(true));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("/definitely/not/here.yaml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
