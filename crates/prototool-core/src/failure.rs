use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A position within a source file. Lines and columns are 1-based;
/// `offset` is the byte offset from the start of the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Location {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single diagnostic, attributable to a position in a file and
/// optionally to the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub file: String,
    pub line: usize,
    pub column: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    pub message: String,
    pub severity: Severity,
}

impl Failure {
    pub fn new(file: impl Into<String>, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            rule_id: None,
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn with_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Stable ordering: (file, line, column, rule_id, message).
    pub fn sort_key_cmp(&self, other: &Self) -> Ordering {
        self.file
            .cmp(&other.file)
            .then_with(|| self.line.cmp(&other.line))
            .then_with(|| self.column.cmp(&other.column))
            .then_with(|| self.rule_id.cmp(&other.rule_id))
            .then_with(|| self.message.cmp(&other.message))
    }

    /// Render in the requested output format. JSON renders as a single
    /// line so that one failure maps to one stdout line.
    pub fn render(&self, format: ErrorFormat) -> String {
        match format {
            ErrorFormat::Default => match &self.rule_id {
                Some(id) => format!(
                    "{}:{}:{}:{}: {}",
                    self.file, self.line, self.column, id, self.message
                ),
                None => format!("{}:{}:{}: {}", self.file, self.line, self.column, self.message),
            },
            ErrorFormat::Json => {
                serde_json::to_string(self).unwrap_or_else(|_| self.message.clone())
            }
        }
    }
}

/// Sort failures in place by the stable key.
pub fn sort_failures(failures: &mut [Failure]) {
    failures.sort_by(|a, b| a.sort_key_cmp(b));
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorFormat {
    #[default]
    Default,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_default_with_rule() {
        let f = Failure::new("foo.proto", 3, 7, "enum names must be CamelCase")
            .with_rule("ENUM_NAMES_CAMEL_CASE");
        assert_eq!(
            f.render(ErrorFormat::Default),
            "foo.proto:3:7:ENUM_NAMES_CAMEL_CASE: enum names must be CamelCase"
        );
    }

    #[test]
    fn render_default_without_rule() {
        let f = Failure::new("foo.proto", 1, 1, "unexpected token");
        assert_eq!(f.render(ErrorFormat::Default), "foo.proto:1:1: unexpected token");
    }

    #[test]
    fn render_json_is_single_line() {
        let f = Failure::new("foo.proto", 1, 1, "message").with_rule("SYNTAX_PROTO3");
        let line = f.render(ErrorFormat::Json);
        assert!(!line.contains('\n'));
        let back: Failure = serde_json::from_str(&line).unwrap();
        assert_eq!(back, f);
    }

    #[test]
    fn sort_is_stable_by_key() {
        let mut failures = vec![
            Failure::new("b.proto", 1, 1, "z"),
            Failure::new("a.proto", 2, 1, "y"),
            Failure::new("a.proto", 1, 5, "x"),
            Failure::new("a.proto", 1, 5, "w").with_rule("A_RULE"),
        ];
        sort_failures(&mut failures);
        assert_eq!(failures[0].file, "a.proto");
        assert_eq!(failures[0].line, 1);
        // No rule sorts before a rule at the same position.
        assert_eq!(failures[0].rule_id, None);
        assert_eq!(failures[1].rule_id.as_deref(), Some("A_RULE"));
        assert_eq!(failures[3].file, "b.proto");
    }
}
