use thiserror::Error;

#[derive(Debug, Error)]
pub enum BreakError {
    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },
    #[error("not inside a git repository: {0}")]
    NotARepository(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
