use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rand::Rng;
use tracing::{debug, info};

use crate::download::{self, DEFAULT_URL_TEMPLATE};
use crate::error::ToolchainError;

/// An installed toolchain, keyed by `(version, platform)`. Never
/// mutated after creation; the install is made visible by a single
/// atomic rename.
#[derive(Debug, Clone)]
pub struct ToolchainEntry {
    pub version: String,
    pub platform: String,
    pub binary_path: PathBuf,
    pub wkt_include_path: PathBuf,
    pub fetched_at: SystemTime,
}

#[derive(Debug, Clone)]
pub struct ToolchainCache {
    root: PathBuf,
    url_template: String,
}

impl ToolchainCache {
    /// `cache_path` overrides the default root; `url_template`
    /// overrides the release download location.
    pub fn new(
        cache_path: Option<PathBuf>,
        url_template: Option<String>,
    ) -> Result<Self, ToolchainError> {
        let root = match cache_path {
            Some(p) => p,
            None => default_root()?,
        };
        Ok(Self {
            root,
            url_template: url_template.unwrap_or_else(|| DEFAULT_URL_TEMPLATE.to_string()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the entry for `(version, platform)`, downloading and
    /// installing it on first use. Idempotent, and safe to race from
    /// multiple processes: installs stage into a temp directory and
    /// become visible via rename, so the loser of a race simply
    /// observes the winner's directory.
    pub async fn ensure(
        &self,
        version: &str,
        platform: &str,
    ) -> Result<ToolchainEntry, ToolchainError> {
        let final_dir = self.root.join(version).join(platform);
        if let Some(entry) = self.existing_entry(&final_dir, version, platform)? {
            debug!(version, platform, "toolchain cache hit");
            return Ok(entry);
        }

        let url = download::archive_url(&self.url_template, version, platform);
        info!(version, platform, url = url.as_str(), "installing protoc");
        let bytes = download::fetch_archive(&url).await?;

        let parent = self.root.join(version);
        std::fs::create_dir_all(&parent)?;
        let staging = parent.join(format!(
            "{platform}.tmp-{:08x}",
            rand::thread_rng().gen::<u32>()
        ));
        std::fs::create_dir_all(&staging)?;
        let staged = (|| -> Result<(), ToolchainError> {
            download::unpack_archive(&bytes, &staging, version)?;
            if !staging.join("bin/protoc").is_file() {
                return Err(ToolchainError::Corrupt {
                    version: version.to_string(),
                    reason: "archive is missing bin/protoc".to_string(),
                });
            }
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(
                    staging.join("bin/protoc"),
                    std::fs::Permissions::from_mode(0o755),
                )?;
            }
            Ok(())
        })();
        if let Err(e) = staged {
            let _ = std::fs::remove_dir_all(&staging);
            return Err(e);
        }

        match std::fs::rename(&staging, &final_dir) {
            Ok(()) => {}
            Err(rename_err) => {
                // Rename contention: if a concurrent ensure won, its
                // directory is the result and our staging is discarded.
                let _ = std::fs::remove_dir_all(&staging);
                if !final_dir.join("bin/protoc").is_file() {
                    return Err(ToolchainError::Io(rename_err));
                }
            }
        }

        self.existing_entry(&final_dir, version, platform)?
            .ok_or_else(|| ToolchainError::Corrupt {
                version: version.to_string(),
                reason: "install did not produce bin/protoc".to_string(),
            })
    }

    fn existing_entry(
        &self,
        dir: &Path,
        version: &str,
        platform: &str,
    ) -> Result<Option<ToolchainEntry>, ToolchainError> {
        let binary_path = dir.join("bin/protoc");
        if !binary_path.is_file() {
            return Ok(None);
        }
        let fetched_at = std::fs::metadata(&binary_path)?
            .modified()
            .unwrap_or(SystemTime::UNIX_EPOCH);
        Ok(Some(ToolchainEntry {
            version: version.to_string(),
            platform: platform.to_string(),
            binary_path,
            wkt_include_path: dir.join("include"),
            fetched_at,
        }))
    }
}

/// The default cache root: `$XDG_CACHE_HOME/prototool`, then the
/// platform cache directory under `$HOME`.
pub fn default_root() -> Result<PathBuf, ToolchainError> {
    if let Some(xdg) = std::env::var_os("XDG_CACHE_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(xdg).join("prototool"));
    }
    let home = std::env::var_os("HOME")
        .filter(|v| !v.is_empty())
        .ok_or(ToolchainError::NoCacheRoot)?;
    let home = PathBuf::from(home);
    if cfg!(target_os = "macos") {
        Ok(home.join("Library/Caches/prototool"))
    } else {
        Ok(home.join(".cache/prototool"))
    }
}

/// Remove the default cache root. A user-specified `--cache-path` is
/// deliberately not deleted.
pub fn delete_default_cache() -> Result<PathBuf, ToolchainError> {
    let root = default_root()?;
    if root.exists() {
        std::fs::remove_dir_all(&root)?;
    }
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_install_is_a_cache_hit() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("3.11.4/linux-x86_64");
        std::fs::create_dir_all(dir.join("bin")).unwrap();
        std::fs::create_dir_all(dir.join("include")).unwrap();
        std::fs::write(dir.join("bin/protoc"), b"#!/bin/true\n").unwrap();

        let cache =
            ToolchainCache::new(Some(tmp.path().to_path_buf()), None).unwrap();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let entry = rt
            .block_on(cache.ensure("3.11.4", "linux-x86_64"))
            .unwrap();
        assert_eq!(entry.binary_path, dir.join("bin/protoc"));
        assert_eq!(entry.wkt_include_path, dir.join("include"));
    }

    #[test]
    fn layout_follows_version_and_platform() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ToolchainCache::new(Some(tmp.path().to_path_buf()), None).unwrap();
        assert_eq!(cache.root(), tmp.path());
    }
}
