//! Loading gate configuration from files

use crate::config::GateConfig;
use brgate_core::{Error, Result};
use regex::Regex;
use std::env;
use std::fs;
use std::path::Path;

/// Configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format
    Yaml,
    /// TOML format
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::config("Unable to detect config format"))?;

        match ext {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            "json" => Ok(ConfigFormat::Json),
            _ => Err(Error::config(format!("Unsupported config format: {ext}"))),
        }
    }
}

/// Load gate configuration from a file
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<GateConfig> {
    let path = path.as_ref();

    let format = ConfigFormat::from_path(path)?;
    let content = fs::read_to_string(path)?;

    load_from_str(&content, format)
}

/// Load gate configuration from a string
///
/// `${VAR}` and `${VAR:-default}` references are expanded before parsing,
/// and the result is validated.
pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<GateConfig> {
    let expanded = expand_env_vars(content)?;

    let config: GateConfig = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(&expanded)
            .map_err(|e| Error::config(format!("Failed to parse YAML: {e}")))?,
        ConfigFormat::Toml => toml::from_str(&expanded)
            .map_err(|e| Error::config(format!("Failed to parse TOML: {e}")))?,
        ConfigFormat::Json => serde_json::from_str(&expanded)
            .map_err(|e| Error::config(format!("Failed to parse JSON: {e}")))?,
    };

    config.validate()?;

    Ok(config)
}

fn expand_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(:-([^}]*))?\}")
        .map_err(|e| Error::config(format!("Invalid regex: {e}")))?;

    let mut result = String::with_capacity(content.len());
    let mut last_match = 0;

    for cap in re.captures_iter(content) {
        let (Some(full), Some(name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };

        let value = match (env::var(name.as_str()), cap.get(3)) {
            (Ok(value), _) => value,
            (Err(_), Some(default)) => default.as_str().to_string(),
            (Err(_), None) => {
                return Err(Error::config(format!(
                    "Environment variable '{}' not set and no default provided",
                    name.as_str()
                )));
            }
        };

        result.push_str(&content[last_match..full.start()]);
        result.push_str(&value);
        last_match = full.end();
    }

    result.push_str(&content[last_match..]);

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn test_detect_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(&PathBuf::from("gate.yml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(&PathBuf::from("gate.toml")).unwrap(),
            ConfigFormat::Toml
        );
        assert_eq!(
            ConfigFormat::from_path(&PathBuf::from("gate.json")).unwrap(),
            ConfigFormat::Json
        );
        assert!(ConfigFormat::from_path(&PathBuf::from("gate.ini")).is_err());
        assert!(ConfigFormat::from_path(&PathBuf::from("gate")).is_err());
    }

    #[test]
    fn test_load_yaml() {
        let yaml = r#"
content_types:
  - text/html
  - application/json
min_size: 512
quality: 9
window_bits: 20
"#;
        let config = load_from_str(yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.content_types, vec!["text/html", "application/json"]);
        assert_eq!(config.min_size, 512);
        assert_eq!(config.quality, 9);
        assert_eq!(config.window_bits, 20);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = load_from_str("min_size = 2048\n", ConfigFormat::Toml).unwrap();
        assert_eq!(config.min_size, 2048);
        assert_eq!(config.quality, GateConfig::default().quality);
        assert_eq!(config.content_types, GateConfig::default().content_types);
    }

    #[test]
    fn test_load_json() {
        let config = load_from_str(r#"{"quality": 4, "content_types": []}"#, ConfigFormat::Json)
            .unwrap();
        assert_eq!(config.quality, 4);
        assert!(config.content_types.is_empty());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let result = load_from_str("quality: 12\n", ConfigFormat::Yaml);
        assert!(matches!(result, Err(Error::Config(_))));

        let result = load_from_str("window_bits = 30\n", ConfigFormat::Toml);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_yaml() {
        let result = load_from_str("min_size: [yaml", ConfigFormat::Yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_env_var_substitution() {
        env::set_var("BRGATE_TEST_MIN_SIZE", "4096");

        let yaml = "min_size: ${BRGATE_TEST_MIN_SIZE}\nquality: ${BRGATE_TEST_UNSET_QUALITY:-3}\n";
        let config = load_from_str(yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.min_size, 4096);
        assert_eq!(config.quality, 3);
    }

    #[test]
    fn test_missing_env_var_without_default() {
        let result = load_from_str(
            "min_size: ${BRGATE_TEST_DEFINITELY_UNSET}\n",
            ConfigFormat::Yaml,
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("BRGATE_TEST_DEFINITELY_UNSET"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "min_size = 100").unwrap();
        writeln!(file, "quality = 11").unwrap();

        let config = load_from_file(file.path()).unwrap();
        assert_eq!(config.min_size, 100);
        assert_eq!(config.quality, 11);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_from_file("/nonexistent/brgate.yaml");
        match result {
            Err(Error::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected I/O error, got {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_extension_is_rejected_before_reading() {
        let result = load_from_file("/nonexistent/brgate.ini");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
