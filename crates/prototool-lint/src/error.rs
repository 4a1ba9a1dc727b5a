use thiserror::Error;

#[derive(Debug, Error)]
pub enum LintError {
    #[error("unknown lint rule id {0:?}")]
    UnknownRule(String),
    #[error("unknown lint group {0:?}")]
    UnknownGroup(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
