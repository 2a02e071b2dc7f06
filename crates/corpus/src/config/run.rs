//! Run configuration: which backends to build and how to initialise them.
//!
//! On disk this is a map from backend identifier to a display name and an
//! opaque argument bundle:
//!
//! ```json
//! {
//!     "short_stories": {
//!         "name": "Korte verhalen",
//!         "call_arguments": { "base_url": "https://example.nl/", "amount": 12 }
//!     }
//! }
//! ```

use std::fmt;
use std::path::Path;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use super::{parse_by_extension, read_config_file, ConfigError};
use crate::backend::InitArgs;

#[derive(Debug, Deserialize)]
struct RawEntry {
    name: String,
    call_arguments: serde_json::Value,
}

/// Ordered mapping from backend identifier to its initialisation pair.
///
/// Entries keep document order where the source format preserves it.
/// A repeated identifier keeps its first position and takes the later value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfiguration {
    entries: Vec<(String, InitArgs)>,
}

impl RunConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry for `identifier`, returning the one it replaced.
    pub fn insert(&mut self, identifier: impl Into<String>, args: InitArgs) -> Option<InitArgs> {
        let identifier = identifier.into();
        match self.entries.iter_mut().find(|(id, _)| *id == identifier) {
            Some((_, existing)) => Some(std::mem::replace(existing, args)),
            None => {
                self.entries.push((identifier, args));
                None
            }
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_backend(
        mut self,
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        self.insert(identifier, InitArgs::new(display_name, arguments));
        self
    }

    pub fn get(&self, identifier: &str) -> Option<&InitArgs> {
        self.entries
            .iter()
            .find(|(id, _)| id == identifier)
            .map(|(_, args)| args)
    }

    /// Entries in configuration order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &InitArgs)> {
        self.entries.iter().map(|(id, args)| (id.as_str(), args))
    }

    pub fn identifiers(&self) -> Vec<&str> {
        self.entries.iter().map(|(id, _)| id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load from a file, choosing the parser by extension (JSON by default).
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = read_config_file(path).await?;
        let config: Self = parse_by_extension(path, &contents)?;
        tracing::debug!(
            "Loaded run configuration with {} backend(s) from {}",
            config.len(),
            path.display()
        );
        Ok(config)
    }
}

impl FromIterator<(String, InitArgs)> for RunConfiguration {
    fn from_iter<I: IntoIterator<Item = (String, InitArgs)>>(iter: I) -> Self {
        let mut config = Self::new();
        for (identifier, args) in iter {
            config.insert(identifier, args);
        }
        config
    }
}

struct EntriesVisitor;

impl<'de> Visitor<'de> for EntriesVisitor {
    type Value = RunConfiguration;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of backend identifiers to { name, call_arguments }")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut config = RunConfiguration::new();
        while let Some((identifier, entry)) = map.next_entry::<String, RawEntry>()? {
            let arguments =
                serde_json::to_string(&entry.call_arguments).map_err(de::Error::custom)?;
            config.insert(identifier, InitArgs::new(entry.name, arguments));
        }
        Ok(config)
    }
}

impl<'de> Deserialize<'de> for RunConfiguration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(EntriesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "short_stories": {
            "name": "Korte verhalen",
            "call_arguments": {"base_url": "https://example.nl/", "amount": 12}
        },
        "genius": {
            "name": "Genius",
            "call_arguments": {"genius_token": "t", "max_songs_pr_artists": 3, "sort": "popularity"}
        }
    }"#;

    #[test]
    fn test_json_preserves_document_order() {
        let config = RunConfiguration::from_json_str(SAMPLE).unwrap();
        assert_eq!(config.identifiers(), vec!["short_stories", "genius"]);

        let args = config.get("short_stories").unwrap();
        assert_eq!(args.display_name, "Korte verhalen");
        let blob: serde_json::Value = serde_json::from_str(&args.arguments).unwrap();
        assert_eq!(blob["amount"], 12);
    }

    #[test]
    fn test_yaml_config() {
        let yaml = "
genius:
  name: Genius
  call_arguments:
    genius_token: abc
    artists: [Froukje]
1001_stories:
  name: Verhalen
  call_arguments:
    amount: 5
";
        let config = RunConfiguration::from_yaml_str(yaml).unwrap();
        assert_eq!(config.identifiers(), vec!["genius", "1001_stories"]);
        let blob: serde_json::Value =
            serde_json::from_str(&config.get("genius").unwrap().arguments).unwrap();
        assert_eq!(blob["artists"][0], "Froukje");
    }

    #[test]
    fn test_toml_config() {
        let toml = r#"
[short_stories]
name = "Korte verhalen"

[short_stories.call_arguments]
amount = 3
"#;
        let config = RunConfiguration::from_toml_str(toml).unwrap();
        assert_eq!(config.len(), 1);
        assert_eq!(config.get("short_stories").unwrap().arguments, r#"{"amount":3}"#);
    }

    #[test]
    fn test_missing_fields_rejected() {
        let missing_name = r#"{"genius": {"call_arguments": {}}}"#;
        assert!(matches!(
            RunConfiguration::from_json_str(missing_name),
            Err(ConfigError::Json(_))
        ));

        let missing_args = r#"{"genius": {"name": "Genius"}}"#;
        assert!(RunConfiguration::from_json_str(missing_args).is_err());

        let not_an_object = r#"{"genius": 5}"#;
        assert!(matches!(
            RunConfiguration::from_json_str(not_an_object),
            Err(ConfigError::Json(_))
        ));

        assert!(RunConfiguration::from_json_str("[1, 2]").is_err());
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut config = RunConfiguration::new()
            .with_backend("a", "A", "{}")
            .with_backend("b", "B", "{}");
        let previous = config.insert("a", InitArgs::new("A2", "{}"));
        assert_eq!(previous.unwrap().display_name, "A");
        assert_eq!(config.identifiers(), vec!["a", "b"]);
        assert_eq!(config.get("a").unwrap().display_name, "A2");
    }

    #[tokio::test]
    async fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        tokio::fs::write(&path, SAMPLE).await.unwrap();

        let config = RunConfiguration::load_from_path(&path).await.unwrap();
        assert_eq!(config.len(), 2);

        let missing = dir.path().join("missing.json");
        assert!(matches!(
            RunConfiguration::load_from_path(&missing).await,
            Err(ConfigError::NotFound(_))
        ));
    }
}
