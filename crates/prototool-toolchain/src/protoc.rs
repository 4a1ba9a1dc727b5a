use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use prost::Message;
use prost_types::FileDescriptorSet;
use prototool_config::{FileGroup, Plugin, PluginType};
use prototool_core::Failure;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::cache::ToolchainEntry;
use crate::error::ToolchainError;

/// Drives a single protoc binary against file groups.
#[derive(Debug, Clone)]
pub struct ProtocRunner {
    bin: PathBuf,
    wkt_include: PathBuf,
}

#[derive(Debug, Default)]
pub struct CompileResult {
    /// Present when protoc exited successfully.
    pub descriptor_set: Option<FileDescriptorSet>,
    pub failures: Vec<Failure>,
}

impl ProtocRunner {
    pub fn new(bin: PathBuf, wkt_include: PathBuf) -> Self {
        Self { bin, wkt_include }
    }

    pub fn from_entry(entry: &ToolchainEntry) -> Self {
        Self::new(entry.binary_path.clone(), entry.wkt_include_path.clone())
    }

    /// Include roots for a group: configured includes, then the
    /// config directory, then the cached well-known types.
    fn include_roots(&self, group: &FileGroup) -> Vec<PathBuf> {
        let mut seen = BTreeSet::new();
        let mut roots = Vec::new();
        for root in group
            .config
            .protoc
            .includes
            .iter()
            .chain(std::iter::once(&group.config.dir))
            .chain(std::iter::once(&self.wkt_include))
        {
            if seen.insert(root.clone()) {
                roots.push(root.clone());
            }
        }
        roots
    }

    /// Argv for a compile invocation, excluding the binary itself.
    pub fn compile_argv(&self, group: &FileGroup, descriptor_out: &Path) -> Vec<String> {
        let mut argv: Vec<String> = self
            .include_roots(group)
            .iter()
            .map(|r| format!("-I{}", r.display()))
            .collect();
        argv.push(format!("--descriptor_set_out={}", descriptor_out.display()));
        argv.push("--include_imports".to_string());
        argv.push("--include_source_info".to_string());
        argv.extend(group.files.iter().map(|f| f.display().to_string()));
        argv
    }

    /// Compile a group into a `FileDescriptorSet`, parsing protoc
    /// stderr into failures. The descriptor-set temp file is removed
    /// on every exit path.
    pub async fn compile(&self, group: &FileGroup) -> Result<CompileResult, ToolchainError> {
        if !self.bin.is_file() {
            return Err(ToolchainError::ProtocNotFound(self.bin.clone()));
        }
        let tmp = tempfile::Builder::new()
            .prefix("prototool-fds-")
            .tempfile()?;
        let argv = self.compile_argv(group, tmp.path());
        debug!(protoc = %self.bin.display(), ?argv, "invoking protoc");

        let output = tokio::process::Command::new(&self.bin)
            .args(&argv)
            .output()
            .await
            .map_err(|e| ToolchainError::ProtocSpawn(e.to_string()))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut failures = parse_stderr(&stderr, group.config.protoc.allow_unused_imports);

        if !output.status.success() {
            if failures.is_empty() {
                failures.push(Failure::new(
                    "",
                    1,
                    1,
                    format!("protoc: unknown failure ({})", output.status),
                ));
            }
            return Ok(CompileResult {
                descriptor_set: None,
                failures,
            });
        }

        let bytes = std::fs::read(tmp.path())?;
        let descriptor_set = FileDescriptorSet::decode(bytes.as_slice())
            .map_err(|e| ToolchainError::Descriptor(e.to_string()))?;
        Ok(CompileResult {
            descriptor_set: Some(descriptor_set),
            failures,
        })
    }

    /// Argv for a generate invocation over the configured plugins.
    pub fn generate_argv(&self, group: &FileGroup) -> Vec<String> {
        let mut argv: Vec<String> = self
            .include_roots(group)
            .iter()
            .map(|r| format!("-I{}", r.display()))
            .collect();

        for plugin in &group.config.generate.plugins {
            let out_dir = group.config.dir.join(&plugin.output);
            if plugin.is_descriptor_set() {
                let file = out_dir.join(plugin.file_suffix.as_deref().unwrap_or("bin"));
                argv.push(format!("--descriptor_set_out={}", file.display()));
                if plugin.include_imports {
                    argv.push("--include_imports".to_string());
                }
                if plugin.include_source_info {
                    argv.push("--include_source_info".to_string());
                }
                continue;
            }
            if let Some(path) = &plugin.path {
                argv.push(format!(
                    "--plugin=protoc-gen-{}={}",
                    plugin.name,
                    path.display()
                ));
            }
            let flags = self.plugin_flags(group, plugin);
            if flags.is_empty() {
                argv.push(format!("--{}_out={}", plugin.name, out_dir.display()));
            } else {
                argv.push(format!(
                    "--{}_out={}:{}",
                    plugin.name,
                    flags,
                    out_dir.display()
                ));
            }
        }

        argv.extend(group.files.iter().map(|f| f.display().to_string()));
        argv
    }

    /// Flags for one plugin: configured flags, plus `M` import-path
    /// modifiers for go-family plugins.
    fn plugin_flags(&self, group: &FileGroup, plugin: &Plugin) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(flags) = &plugin.flags {
            if !flags.is_empty() {
                parts.push(flags.clone());
            }
        }
        if matches!(plugin.plugin_type, PluginType::Go | PluginType::Gogo) {
            if let Some(import_path) = &group.config.generate.go_import_path {
                for file in &group.files {
                    let rel = file.strip_prefix(&group.config.dir).unwrap_or(file);
                    let rel_dir = rel.parent().unwrap_or(Path::new(""));
                    let target = if rel_dir.as_os_str().is_empty() {
                        import_path.clone()
                    } else {
                        format!("{}/{}", import_path, rel_dir.display())
                    };
                    parts.push(format!("M{}={}", rel.display(), target));
                }
            }
            for (path, target) in &group.config.generate.go_extra_modifiers {
                parts.push(format!("M{path}={target}"));
            }
        }
        parts.join(",")
    }

    /// Run code generation. Output directories are created first;
    /// protoc requires them to exist.
    pub async fn generate(&self, group: &FileGroup) -> Result<Vec<Failure>, ToolchainError> {
        if !self.bin.is_file() {
            return Err(ToolchainError::ProtocNotFound(self.bin.clone()));
        }
        for plugin in &group.config.generate.plugins {
            std::fs::create_dir_all(group.config.dir.join(&plugin.output))?;
        }
        let argv = self.generate_argv(group);
        debug!(protoc = %self.bin.display(), ?argv, "invoking protoc for generate");

        let output = tokio::process::Command::new(&self.bin)
            .args(&argv)
            .output()
            .await
            .map_err(|e| ToolchainError::ProtocSpawn(e.to_string()))?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut failures = parse_stderr(&stderr, group.config.protoc.allow_unused_imports);
        if !output.status.success() && failures.is_empty() {
            failures.push(Failure::new(
                "",
                1,
                1,
                format!("protoc: unknown failure ({})", output.status),
            ));
        }
        Ok(failures)
    }
}

/// Compile many (runner, group) pairs in parallel, bounded by CPU
/// count, collecting into a shared mutex-guarded accumulator.
/// Results come back in input order.
pub async fn compile_all(
    jobs: Vec<(ProtocRunner, FileGroup)>,
) -> Result<Vec<CompileResult>, ToolchainError> {
    let permits = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let semaphore = Arc::new(Semaphore::new(permits));
    let results: Arc<Mutex<Vec<Option<CompileResult>>>> =
        Arc::new(Mutex::new((0..jobs.len()).map(|_| None).collect()));

    let mut tasks = tokio::task::JoinSet::new();
    for (index, (runner, group)) in jobs.into_iter().enumerate() {
        let semaphore = semaphore.clone();
        let results = results.clone();
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            let result = runner.compile(&group).await;
            match result {
                Ok(r) => {
                    results.lock().expect("collector poisoned")[index] = Some(r);
                    Ok(())
                }
                Err(e) => Err(e),
            }
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.map_err(|e| ToolchainError::ProtocSpawn(e.to_string()))??;
    }

    let collected = Arc::try_unwrap(results)
        .expect("collector still shared")
        .into_inner()
        .expect("collector poisoned");
    Ok(collected.into_iter().map(|r| r.unwrap_or_default()).collect())
}

/// Parse protoc stderr into failures. protoc reports
/// `path:line:col: message` for positioned diagnostics and
/// `path: message` for file-level notes; anything else is kept
/// verbatim with an unknown position.
pub fn parse_stderr(stderr: &str, allow_unused_imports: bool) -> Vec<Failure> {
    let mut failures = Vec::new();
    for line in stderr.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if allow_unused_imports && line.contains("warning: Import") && line.contains("is unused") {
            continue;
        }
        failures.push(parse_stderr_line(line));
    }
    failures
}

fn parse_stderr_line(line: &str) -> Failure {
    if let Some(failure) = parse_positioned(line) {
        return failure;
    }
    if let Some((path, message)) = line.split_once(": ") {
        if path.ends_with(".proto") {
            return Failure::new(path, 1, 1, message);
        }
    }
    Failure::new("", 1, 1, line)
}

fn parse_positioned(line: &str) -> Option<Failure> {
    let mut parts = line.splitn(4, ':');
    let path = parts.next()?;
    let line_no: usize = parts.next()?.parse().ok()?;
    let column: usize = parts.next()?.parse().ok()?;
    let message = parts.next()?.trim_start();
    if path.is_empty() || message.is_empty() {
        return None;
    }
    Some(Failure::new(path, line_no, column, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use prototool_config::Config;
    use std::sync::Arc as StdArc;

    fn group_in(dir: &Path, files: Vec<PathBuf>) -> FileGroup {
        FileGroup {
            config: StdArc::new(Config::default_for(dir)),
            files,
        }
    }

    #[test]
    fn stderr_positioned_lines() {
        let failures = parse_stderr(
            "foo.proto:3:12: \"Bar\" is not defined.\ngarbage output\n",
            false,
        );
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].file, "foo.proto");
        assert_eq!(failures[0].line, 3);
        assert_eq!(failures[0].column, 12);
        assert_eq!(failures[0].message, "\"Bar\" is not defined.");
        assert_eq!(failures[1].file, "");
        assert_eq!(failures[1].message, "garbage output");
    }

    #[test]
    fn stderr_file_level_notes() {
        let failures = parse_stderr("foo.proto: warning: Import bar.proto is unused.\n", false);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].file, "foo.proto");
        assert_eq!(failures[0].line, 1);

        let suppressed = parse_stderr("foo.proto: warning: Import bar.proto is unused.\n", true);
        assert!(suppressed.is_empty());
    }

    #[test]
    fn compile_argv_shape() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        let runner = ProtocRunner::new(dir.join("bin/protoc"), dir.join("include"));
        let group = group_in(&dir, vec![dir.join("a.proto")]);
        let argv = runner.compile_argv(&group, Path::new("/tmp/out.fds"));
        assert!(argv[0].starts_with("-I"));
        assert!(argv.contains(&"--include_imports".to_string()));
        assert!(argv.contains(&"--include_source_info".to_string()));
        assert!(argv
            .iter()
            .any(|a| a.starts_with("--descriptor_set_out=")));
        assert_eq!(argv.last().unwrap(), &dir.join("a.proto").display().to_string());
    }
}
