use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("network error fetching {url}: {reason}")]
    Network { url: String, reason: String },
    #[error("corrupt toolchain for protoc {version}: {reason}")]
    Corrupt { version: String, reason: String },
    #[error("unsupported platform {os}/{arch}: no protoc release artifact")]
    UnsupportedPlatform { os: String, arch: String },
    #[error("cannot resolve a cache root: set --cache-path, XDG_CACHE_HOME, or HOME")]
    NoCacheRoot,
    #[error("protoc binary not found at {0}")]
    ProtocNotFound(PathBuf),
    #[error("failed to run protoc: {0}")]
    ProtocSpawn(String),
    #[error("failed to decode descriptor set: {0}")]
    Descriptor(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
