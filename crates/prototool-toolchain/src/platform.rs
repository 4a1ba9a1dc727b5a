use crate::error::ToolchainError;

/// The platform component of protoc release artifact names, e.g.
/// `protoc-3.11.4-linux-x86_64.zip`.
pub fn protoc_platform() -> Result<&'static str, ToolchainError> {
    if cfg!(all(target_os = "linux", target_arch = "x86_64")) {
        Ok("linux-x86_64")
    } else if cfg!(all(target_os = "linux", target_arch = "aarch64")) {
        Ok("linux-aarch_64")
    } else if cfg!(all(target_os = "macos", target_arch = "x86_64")) {
        Ok("osx-x86_64")
    } else if cfg!(all(target_os = "macos", target_arch = "aarch64")) {
        Ok("osx-aarch_64")
    } else {
        Err(ToolchainError::UnsupportedPlatform {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        })
    }
}
