use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::ConfigError;
use crate::model::{Config, ConfigDocument};

const CONFIG_YAML: &str = "prototool.yaml";
const CONFIG_JSON: &str = "prototool.json";

/// Resolves the governing config for directories, memoizing the
/// upward walk so that a large tree only parses each config once.
pub struct ConfigResolver {
    /// Set when config data was supplied inline; overrides any
    /// on-disk file for every path.
    inline: Option<Arc<Config>>,
    /// `None` records that no config file governs the directory, so
    /// the upward walk is not repeated for siblings.
    cache: HashMap<PathBuf, Option<Arc<Config>>>,
}

impl ConfigResolver {
    /// `base` is the directory inline config data is anchored to.
    pub fn new(config_data: Option<&str>, base: &Path) -> Result<Self, ConfigError> {
        let inline = match config_data {
            Some(data) => {
                let doc: ConfigDocument = serde_yaml::from_str(data)
                    .map_err(|e| ConfigError::InvalidInline(e.to_string()))?;
                Some(Arc::new(Config::from_document(
                    doc,
                    base,
                    Path::new("--config-data"),
                )?))
            }
            None => None,
        };
        Ok(Self {
            inline,
            cache: HashMap::new(),
        })
    }

    /// The governing config for `dir`: the nearest ancestor holding a
    /// `prototool.yaml` or `prototool.json`, or the defaults anchored
    /// at `dir` when no ancestor has one.
    pub fn for_dir(&mut self, dir: &Path) -> Result<Arc<Config>, ConfigError> {
        if let Some(inline) = &self.inline {
            return Ok(inline.clone());
        }

        let mut walked: Vec<PathBuf> = Vec::new();
        let mut current = dir.to_path_buf();
        let found: Option<Arc<Config>> = loop {
            if let Some(hit) = self.cache.get(&current) {
                break hit.clone();
            }
            if let Some(path) = config_file_in(&current) {
                debug!(config = %path.display(), dir = %dir.display(), "resolved config");
                let config = Arc::new(load_config_file(&path, &current)?);
                self.cache.insert(current.clone(), Some(config.clone()));
                break Some(config);
            }
            walked.push(current.clone());
            if !current.pop() {
                break None;
            }
        };

        for d in walked {
            self.cache.insert(d, found.clone());
        }
        Ok(found.unwrap_or_else(|| Arc::new(Config::default_for(dir))))
    }
}

fn config_file_in(dir: &Path) -> Option<PathBuf> {
    for name in [CONFIG_YAML, CONFIG_JSON] {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

fn load_config_file(path: &Path, dir: &Path) -> Result<Config, ConfigError> {
    let data = std::fs::read_to_string(path)?;
    let doc: ConfigDocument = if data.trim().is_empty() {
        ConfigDocument::default()
    } else if path.extension().is_some_and(|e| e == "json") {
        serde_json::from_str(&data).map_err(|e| ConfigError::invalid(path, e.to_string()))?
    } else {
        serde_yaml::from_str(&data).map_err(|e| ConfigError::invalid(path, e.to_string()))?
    };
    Config::from_document(doc, dir, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_ancestor_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("a/b/c")).unwrap();
        std::fs::write(root.join("prototool.yaml"), "lint:\n  group: google\n").unwrap();
        std::fs::write(root.join("a/b/prototool.yaml"), "lint:\n  group: uber2\n").unwrap();

        let mut resolver = ConfigResolver::new(None, root).unwrap();
        let deep = resolver.for_dir(&root.join("a/b/c")).unwrap();
        assert_eq!(deep.lint_group(), "uber2");
        let shallow = resolver.for_dir(&root.join("a")).unwrap();
        assert_eq!(shallow.lint_group(), "google");
    }

    #[test]
    fn defaults_when_no_config_found() {
        let tmp = tempfile::tempdir().unwrap();
        let mut resolver = ConfigResolver::new(None, tmp.path()).unwrap();
        let config = resolver.for_dir(tmp.path()).unwrap();
        assert_eq!(config.lint_group(), "uber1");
        assert!(config.excludes.is_empty());
    }

    #[test]
    fn inline_data_overrides_disk() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("prototool.yaml"), "lint:\n  group: google\n").unwrap();

        let mut resolver =
            ConfigResolver::new(Some("lint:\n  group: uber2\n"), tmp.path()).unwrap();
        let config = resolver.for_dir(tmp.path()).unwrap();
        assert_eq!(config.lint_group(), "uber2");
    }

    #[test]
    fn json_config_is_accepted() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("prototool.json"),
            r#"{"lint": {"group": "uber2"}}"#,
        )
        .unwrap();
        let mut resolver = ConfigResolver::new(None, tmp.path()).unwrap();
        let config = resolver.for_dir(tmp.path()).unwrap();
        assert_eq!(config.lint_group(), "uber2");
    }
}
