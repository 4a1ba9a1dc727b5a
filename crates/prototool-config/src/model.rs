use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Version of protoc assumed when no config pins one.
pub const DEFAULT_PROTOC_VERSION: &str = "3.11.4";

/// Lint group assumed when no config selects one.
pub const DEFAULT_LINT_GROUP: &str = "uber1";

/// On-disk document shape for `prototool.yaml` / `prototool.json`.
/// Unknown keys are rejected so that typos surface as config errors
/// instead of silently changing behavior.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ConfigDocument {
    pub excludes: Vec<String>,
    pub protoc: ProtocDocument,
    pub create: CreateDocument,
    pub lint: LintDocument,
    pub generate: GenerateDocument,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ProtocDocument {
    pub version: Option<String>,
    pub includes: Vec<String>,
    pub allow_unused_imports: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CreateDocument {
    pub packages: Vec<CreatePackageDocument>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePackageDocument {
    pub directory: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LintDocument {
    pub group: Option<String>,
    pub ignores: Vec<LintIgnoreDocument>,
    pub rules: LintRulesDocument,
    pub file_header: Option<FileHeaderDocument>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LintIgnoreDocument {
    pub id: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LintRulesDocument {
    pub no_default: bool,
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileHeaderDocument {
    pub path: String,
    #[serde(default)]
    pub is_commented: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GenerateDocument {
    pub go_options: GoOptionsDocument,
    pub plugins: Vec<PluginDocument>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GoOptionsDocument {
    pub import_path: Option<String>,
    pub extra_modifiers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginDocument {
    pub name: String,
    #[serde(default, rename = "type")]
    pub plugin_type: PluginType,
    #[serde(default)]
    pub flags: Option<String>,
    pub output: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub file_suffix: Option<String>,
    #[serde(default)]
    pub include_imports: bool,
    #[serde(default)]
    pub include_source_info: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginType {
    Go,
    Gogo,
    #[default]
    None,
}

/// A validated config governing one directory subtree. Paths are
/// absolutized against the directory the config file lives in.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the config file lives in (the input directory when
    /// no config file exists).
    pub dir: PathBuf,
    pub excludes: Vec<PathBuf>,
    pub protoc: ProtocConfig,
    pub create_packages: Vec<CreatePackage>,
    pub lint: LintConfig,
    pub generate: GenerateConfig,
}

#[derive(Debug, Clone)]
pub struct ProtocConfig {
    pub version: String,
    pub includes: Vec<PathBuf>,
    pub allow_unused_imports: bool,
}

#[derive(Debug, Clone)]
pub struct CreatePackage {
    pub directory: String,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct LintConfig {
    pub group: Option<String>,
    pub ignores: Vec<LintIgnore>,
    pub no_default: bool,
    pub add: Vec<String>,
    pub remove: Vec<String>,
    pub file_header: Option<FileHeader>,
}

#[derive(Debug, Clone)]
pub struct LintIgnore {
    pub id: String,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct FileHeader {
    pub path: PathBuf,
    pub is_commented: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateConfig {
    pub go_import_path: Option<String>,
    pub go_extra_modifiers: BTreeMap<String, String>,
    pub plugins: Vec<Plugin>,
}

#[derive(Debug, Clone)]
pub struct Plugin {
    pub name: String,
    pub plugin_type: PluginType,
    pub flags: Option<String>,
    pub output: PathBuf,
    pub path: Option<PathBuf>,
    pub file_suffix: Option<String>,
    pub include_imports: bool,
    pub include_source_info: bool,
}

impl Plugin {
    /// The plugin that writes a `FileDescriptorSet` instead of
    /// delegating to a `protoc-gen-*` binary.
    pub fn is_descriptor_set(&self) -> bool {
        self.name == "descriptor_set"
    }
}

impl Config {
    /// The defaults used when no config file governs a directory.
    pub fn default_for(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            excludes: Vec::new(),
            protoc: ProtocConfig {
                version: DEFAULT_PROTOC_VERSION.to_string(),
                includes: Vec::new(),
                allow_unused_imports: false,
            },
            create_packages: Vec::new(),
            lint: LintConfig::default(),
            generate: GenerateConfig::default(),
        }
    }

    /// Validate a parsed document and absolutize its paths against
    /// `dir`. `source` names the config file for error messages.
    pub fn from_document(
        doc: ConfigDocument,
        dir: &Path,
        source: &Path,
    ) -> Result<Self, ConfigError> {
        let version = match doc.protoc.version {
            Some(v) => {
                if !is_valid_protoc_version(&v) {
                    return Err(ConfigError::invalid(
                        source,
                        format!("protoc.version {v:?} is not a MAJOR.MINOR.PATCH version"),
                    ));
                }
                v
            }
            None => DEFAULT_PROTOC_VERSION.to_string(),
        };

        let mut descriptor_set_seen = false;
        let mut plugins = Vec::with_capacity(doc.generate.plugins.len());
        for p in doc.generate.plugins {
            let output = PathBuf::from(&p.output);
            if output.is_absolute() {
                return Err(ConfigError::invalid(
                    source,
                    format!("plugin {} output must be a relative path", p.name),
                ));
            }
            let is_descriptor_set = p.name == "descriptor_set";
            if is_descriptor_set {
                if descriptor_set_seen {
                    return Err(ConfigError::invalid(
                        source,
                        "at most one plugin may be named descriptor_set",
                    ));
                }
                descriptor_set_seen = true;
                if p.file_suffix.is_none() {
                    return Err(ConfigError::invalid(
                        source,
                        "plugin descriptor_set requires file_suffix",
                    ));
                }
            } else if p.include_imports || p.include_source_info {
                return Err(ConfigError::invalid(
                    source,
                    format!(
                        "plugin {}: include_imports/include_source_info are only valid for descriptor_set",
                        p.name
                    ),
                ));
            }
            plugins.push(Plugin {
                name: p.name,
                plugin_type: p.plugin_type,
                flags: p.flags,
                output,
                path: p.path.map(PathBuf::from),
                file_suffix: p.file_suffix,
                include_imports: p.include_imports,
                include_source_info: p.include_source_info,
            });
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            excludes: doc.excludes.iter().map(|e| absolutize(dir, e)).collect(),
            protoc: ProtocConfig {
                version,
                includes: doc.protoc.includes.iter().map(|i| absolutize(dir, i)).collect(),
                allow_unused_imports: doc.protoc.allow_unused_imports,
            },
            create_packages: doc
                .create
                .packages
                .into_iter()
                .map(|p| CreatePackage {
                    directory: p.directory,
                    name: p.name,
                })
                .collect(),
            lint: LintConfig {
                group: doc.lint.group,
                ignores: doc
                    .lint
                    .ignores
                    .into_iter()
                    .map(|i| LintIgnore {
                        id: i.id,
                        files: i.files.iter().map(|f| absolutize(dir, f)).collect(),
                    })
                    .collect(),
                no_default: doc.lint.rules.no_default,
                add: doc.lint.rules.add,
                remove: doc.lint.rules.remove,
                file_header: doc.lint.file_header.map(|h| FileHeader {
                    path: absolutize(dir, &h.path),
                    is_commented: h.is_commented,
                }),
            },
            generate: GenerateConfig {
                go_import_path: doc.generate.go_options.import_path,
                go_extra_modifiers: doc.generate.go_options.extra_modifiers,
                plugins,
            },
        })
    }

    /// Whether `path` falls under one of the configured excludes.
    /// Excludes match as path prefixes on absolute paths.
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.excludes.iter().any(|e| path.starts_with(e))
    }

    /// The effective lint group name.
    pub fn lint_group(&self) -> &str {
        self.lint.group.as_deref().unwrap_or(DEFAULT_LINT_GROUP)
    }
}

fn absolutize(dir: &Path, rel: &str) -> PathBuf {
    let p = Path::new(rel);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        dir.join(p)
    }
}

fn is_valid_protoc_version(v: &str) -> bool {
    let parts: Vec<&str> = v.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<Config, ConfigError> {
        let doc: ConfigDocument = serde_yaml::from_str(yaml)
            .map_err(|e| ConfigError::invalid("test.yaml", e.to_string()))?;
        Config::from_document(doc, Path::new("/work"), Path::new("/work/prototool.yaml"))
    }

    #[test]
    fn version_must_be_three_part() {
        assert!(parse("protoc:\n  version: 3.11.4\n").is_ok());
        assert!(parse("protoc:\n  version: 3.11\n").is_err());
        assert!(parse("protoc:\n  version: v3.11.4\n").is_err());
    }

    #[test]
    fn unknown_top_level_key_rejected() {
        let doc: Result<ConfigDocument, _> = serde_yaml::from_str("lintt:\n  group: uber1\n");
        assert!(doc.is_err());
    }

    #[test]
    fn excludes_are_absolutized_and_prefix_matched() {
        let config = parse("excludes:\n  - vendor\n  - /abs/path\n").unwrap();
        assert!(config.is_excluded(Path::new("/work/vendor/foo.proto")));
        assert!(config.is_excluded(Path::new("/abs/path/deep/bar.proto")));
        assert!(!config.is_excluded(Path::new("/work/src/foo.proto")));
    }

    #[test]
    fn descriptor_set_plugin_invariants() {
        let ok = parse(
            "generate:\n  plugins:\n    - name: descriptor_set\n      output: out\n      file_suffix: bin\n      include_imports: true\n",
        );
        assert!(ok.is_ok());

        let missing_suffix = parse(
            "generate:\n  plugins:\n    - name: descriptor_set\n      output: out\n",
        );
        assert!(missing_suffix.is_err());

        let bad_includes = parse(
            "generate:\n  plugins:\n    - name: go\n      type: go\n      output: out\n      include_imports: true\n",
        );
        assert!(bad_includes.is_err());

        let absolute_output = parse(
            "generate:\n  plugins:\n    - name: go\n      type: go\n      output: /abs\n",
        );
        assert!(absolute_output.is_err());
    }

    #[test]
    fn lint_group_defaults_to_uber1() {
        let config = parse("{}").unwrap();
        assert_eq!(config.lint_group(), "uber1");
        let config = parse("lint:\n  group: google\n").unwrap();
        assert_eq!(config.lint_group(), "google");
    }
}
