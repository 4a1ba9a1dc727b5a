use std::path::Path;

/// Render a path relative to the working directory when possible;
/// diagnostics stay short and stable across machines.
pub fn display_path(path: &Path) -> String {
    match std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(&cwd).ok())
    {
        Some(rel) => rel.display().to_string(),
        None => path.display().to_string(),
    }
}
