use std::io::{Cursor, Read};
use std::path::Path;

use tracing::debug;

use crate::error::ToolchainError;

/// Default URL template for protoc release archives. `{version}` and
/// `{platform}` are substituted before fetching.
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://github.com/protocolbuffers/protobuf/releases/download/v{version}/protoc-{version}-{platform}.zip";

pub fn archive_url(template: &str, version: &str, platform: &str) -> String {
    template
        .replace("{version}", version)
        .replace("{platform}", platform)
}

/// Fetch the archive bytes, following redirects (GitHub release
/// assets redirect to object storage).
pub async fn fetch_archive(url: &str) -> Result<Vec<u8>, ToolchainError> {
    debug!(url, "fetching protoc archive");
    let response = reqwest::get(url).await.map_err(|e| ToolchainError::Network {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if !response.status().is_success() {
        return Err(ToolchainError::Network {
            url: url.to_string(),
            reason: format!("unexpected status {}", response.status()),
        });
    }
    let bytes = response.bytes().await.map_err(|e| ToolchainError::Network {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    Ok(bytes.to_vec())
}

/// Unpack a protoc release zip into `dest`. Entries escaping the
/// destination are rejected; unix modes are preserved so that
/// `bin/protoc` stays executable.
pub fn unpack_archive(bytes: &[u8], dest: &Path, version: &str) -> Result<(), ToolchainError> {
    let corrupt = |reason: String| ToolchainError::Corrupt {
        version: version.to_string(),
        reason,
    };

    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| corrupt(e.to_string()))?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| corrupt(e.to_string()))?;
        let Some(rel) = entry.enclosed_name() else {
            return Err(corrupt(format!("unsafe archive path {:?}", entry.name())));
        };
        let out_path = dest.join(rel);
        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut data)
            .map_err(|e| corrupt(e.to_string()))?;
        std::fs::write(&out_path, data)?;
        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_template_substitution() {
        let url = archive_url(DEFAULT_URL_TEMPLATE, "3.11.4", "linux-x86_64");
        assert_eq!(
            url,
            "https://github.com/protocolbuffers/protobuf/releases/download/v3.11.4/protoc-3.11.4-linux-x86_64.zip"
        );
    }

    #[test]
    fn bad_archive_bytes_are_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let err = unpack_archive(b"not a zip", tmp.path(), "3.11.4").unwrap_err();
        assert!(matches!(err, ToolchainError::Corrupt { .. }));
    }
}
