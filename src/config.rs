use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context as _, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::ast::Context;

/// User settings read from `<config dir>/universql/config.toml`.
///
/// ```toml
/// default_adapter = "json"
///
/// [context]
/// limit = 10
/// field = "name"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Adapter used when none is named.
    pub default_adapter: Option<String>,
    /// Default placeholder values.
    pub context: Context,
}

impl Config {
    pub fn get_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("universql")
            .join("config.toml")
    }

    /// Load the default config file, or defaults when there is none.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply a `KEY=VALUE` override to the context. VALUE is taken as JSON
    /// when it parses, as a plain string otherwise.
    pub fn set(&mut self, assignment: &str) -> Result<()> {
        let (key, raw) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected KEY=VALUE, got {:?}", assignment))?;
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("Missing key in {:?}", assignment);
        }
        let value =
            serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        self.context.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_toml(
            r#"
default_adapter = "sql"

[context]
limit = 10
field = "name"
flags = [1, 2]
"#,
        )
        .unwrap();
        assert_eq!(config.default_adapter.as_deref(), Some("sql"));
        assert_eq!(config.context.get("limit"), Some(&json!(10)));
        assert_eq!(config.context.get("field"), Some(&json!("name")));
        assert_eq!(config.context.get("flags"), Some(&json!([1, 2])));
    }

    #[test]
    fn test_empty_config() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_config() {
        assert!(Config::from_toml("default_adapter = 3").is_err());
    }

    #[test]
    fn test_missing_file_is_default() {
        let path = std::env::temp_dir().join("universql-no-such-dir/config.toml");
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_set_overrides() {
        let mut config = Config::from_toml("[context]\nlimit = 10").unwrap();
        config.set("limit=3").unwrap();
        config.set("name=Bob").unwrap();
        config.set("flag=true").unwrap();
        config.set("quoted=\"5\"").unwrap();
        config.set("expr=a=b").unwrap();
        assert_eq!(config.context.get("limit"), Some(&json!(3)));
        assert_eq!(config.context.get("name"), Some(&json!("Bob")));
        assert_eq!(config.context.get("flag"), Some(&json!(true)));
        assert_eq!(config.context.get("quoted"), Some(&json!("5")));
        assert_eq!(config.context.get("expr"), Some(&json!("a=b")));
    }

    #[test]
    fn test_set_rejects_malformed() {
        let mut config = Config::default();
        assert!(config.set("novalue").is_err());
        assert!(config.set("=3").is_err());
    }
}
