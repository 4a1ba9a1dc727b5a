use prototool_core::Failure;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("{file}:{line}:{column}: {message}")]
    Syntax {
        file: String,
        line: usize,
        column: usize,
        message: String,
    },
}

impl ParseError {
    pub fn syntax(
        file: impl Into<String>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        ParseError::Syntax {
            file: file.into(),
            line,
            column,
            message: message.into(),
        }
    }

    pub fn to_failure(&self) -> Failure {
        match self {
            ParseError::Syntax {
                file,
                line,
                column,
                message,
            } => Failure::new(file.clone(), *line, *column, message.clone()),
        }
    }
}
