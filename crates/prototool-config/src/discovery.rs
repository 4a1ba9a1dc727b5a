use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::ConfigError;
use crate::model::Config;
use crate::resolve::ConfigResolver;

/// A discovered `.proto` file together with its governing config.
#[derive(Debug, Clone)]
pub struct FileRef {
    pub path: PathBuf,
    pub config: Arc<Config>,
}

/// Files sharing a governing config; compiled as one protoc
/// invocation.
#[derive(Debug, Clone)]
pub struct FileGroup {
    pub config: Arc<Config>,
    pub files: Vec<PathBuf>,
}

/// Resolve `input` (file or directory) to the ordered, deduplicated
/// set of `.proto` files it denotes, honoring config excludes.
pub fn discover(input: &Path, resolver: &mut ConfigResolver) -> Result<Vec<FileRef>, ConfigError> {
    let input = input
        .canonicalize()
        .map_err(|_| ConfigError::NotFound(input.to_path_buf()))?;

    if input.is_file() {
        if input.extension().is_some_and(|e| e == "proto") {
            let dir = input.parent().unwrap_or(Path::new("/")).to_path_buf();
            let config = resolver.for_dir(&dir)?;
            return Ok(vec![FileRef {
                path: input,
                config,
            }]);
        }
        return Err(ConfigError::NotFound(input));
    }

    let mut refs = Vec::new();
    walk_dir(&input, resolver, &mut refs)?;
    refs.sort_by(|a, b| a.path.cmp(&b.path));
    refs.dedup_by(|a, b| a.path == b.path);
    debug!(input = %input.display(), count = refs.len(), "discovered proto files");
    Ok(refs)
}

fn walk_dir(
    dir: &Path,
    resolver: &mut ConfigResolver,
    out: &mut Vec<FileRef>,
) -> Result<(), ConfigError> {
    let config = resolver.for_dir(dir)?;
    if config.is_excluded(dir) {
        return Ok(());
    }

    let mut entries: Vec<_> = std::fs::read_dir(dir)?
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk_dir(&path, resolver, out)?;
        } else if file_type.is_file() && path.extension().is_some_and(|e| e == "proto") {
            let file_config = resolver.for_dir(dir)?;
            if !file_config.is_excluded(&path) {
                out.push(FileRef {
                    path,
                    config: file_config,
                });
            }
        }
    }
    Ok(())
}

/// Group discovered files by governing config directory. Groups and
/// their files come back sorted so runs are deterministic.
pub fn group_by_config(refs: Vec<FileRef>) -> Vec<FileGroup> {
    let mut by_dir: BTreeMap<PathBuf, FileGroup> = BTreeMap::new();
    for r in refs {
        by_dir
            .entry(r.config.dir.clone())
            .or_insert_with(|| FileGroup {
                config: r.config.clone(),
                files: Vec::new(),
            })
            .files
            .push(r.path);
    }
    let mut groups: Vec<FileGroup> = by_dir.into_values().collect();
    for g in &mut groups {
        g.files.sort();
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "syntax = \"proto3\";\n").unwrap();
    }

    #[test]
    fn discovery_is_ordered_and_recursive() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("b.proto"));
        touch(&root.join("a/z.proto"));
        touch(&root.join("a/a.proto"));
        touch(&root.join("a/readme.txt"));

        let mut resolver = ConfigResolver::new(None, root).unwrap();
        let refs = discover(root, &mut resolver).unwrap();
        let names: Vec<String> = refs
            .iter()
            .map(|r| {
                r.path
                    .strip_prefix(root.canonicalize().unwrap())
                    .unwrap()
                    .display()
                    .to_string()
            })
            .collect();
        assert_eq!(names, vec!["a/a.proto", "a/z.proto", "b.proto"]);
    }

    #[test]
    fn single_file_input() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("one.proto");
        touch(&file);
        let mut resolver = ConfigResolver::new(None, tmp.path()).unwrap();
        let refs = discover(&file, &mut resolver).unwrap();
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn non_proto_file_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("one.txt");
        touch(&file);
        let mut resolver = ConfigResolver::new(None, tmp.path()).unwrap();
        assert!(discover(&file, &mut resolver).is_err());
    }

    #[test]
    fn excludes_prune_files_and_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::write(
            root.join("prototool.yaml"),
            "excludes:\n  - vendor\n  - skip.proto\n",
        )
        .unwrap();
        touch(&root.join("keep.proto"));
        touch(&root.join("skip.proto"));
        touch(&root.join("vendor/dep.proto"));

        let mut resolver = ConfigResolver::new(None, root).unwrap();
        let refs = discover(root, &mut resolver).unwrap();
        assert_eq!(refs.len(), 1);
        assert!(refs[0].path.ends_with("keep.proto"));
    }

    #[test]
    fn grouping_by_governing_config() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::write(root.join("prototool.yaml"), "").unwrap();
        touch(&root.join("top.proto"));
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::write(root.join("sub/prototool.yaml"), "lint:\n  group: uber2\n").unwrap();
        touch(&root.join("sub/inner.proto"));

        let mut resolver = ConfigResolver::new(None, root).unwrap();
        let refs = discover(root, &mut resolver).unwrap();
        let groups = group_by_config(refs);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].files.len(), 1);
        assert_eq!(groups[1].files.len(), 1);
    }
}
