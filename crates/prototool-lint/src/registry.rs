use std::sync::OnceLock;

use prost_types::FileDescriptorSet;
use prototool_core::{Failure, Severity};
use prototool_lang::{File, TokenStream};

use crate::error::LintError;
use crate::fix::Edit;
use crate::rules;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    Google,
    Uber1,
    Uber2,
}

impl Group {
    pub const ALL: [Group; 3] = [Group::Google, Group::Uber1, Group::Uber2];

    pub fn name(self) -> &'static str {
        match self {
            Group::Google => "google",
            Group::Uber1 => "uber1",
            Group::Uber2 => "uber2",
        }
    }

    pub fn from_name(name: &str) -> Option<Group> {
        match name {
            "google" => Some(Group::Google),
            "uber1" => Some(Group::Uber1),
            "uber2" => Some(Group::Uber2),
            _ => None,
        }
    }
}

/// State handed to rule evaluators for one file.
pub struct CheckContext<'a> {
    /// Display path used in failures.
    pub path: &'a str,
    pub stream: &'a TokenStream,
    /// Contents of the configured file header, when one is set.
    pub file_header: Option<&'a str>,
    rule_id: &'static str,
    failures: Vec<Failure>,
}

impl<'a> CheckContext<'a> {
    pub fn new(path: &'a str, stream: &'a TokenStream, file_header: Option<&'a str>) -> Self {
        Self {
            path,
            stream,
            file_header,
            rule_id: "",
            failures: Vec::new(),
        }
    }

    pub(crate) fn set_rule(&mut self, rule_id: &'static str) {
        self.rule_id = rule_id;
    }

    pub(crate) fn take_failures(&mut self) -> Vec<Failure> {
        std::mem::take(&mut self.failures)
    }

    /// Record a failure at a raw token index.
    pub fn fail_at_token(&mut self, raw: usize, message: impl Into<String>) {
        let location = self
            .stream
            .tokens()
            .get(raw)
            .map(|t| t.location)
            .unwrap_or_default();
        self.fail(location.line.max(1), location.column.max(1), message);
    }

    pub fn fail(&mut self, line: usize, column: usize, message: impl Into<String>) {
        self.failures.push(
            Failure::new(self.path, line, column, message)
                .with_rule(self.rule_id)
                .with_severity(Severity::Error),
        );
    }
}

/// Inputs for autofixers.
pub struct FixContext<'a> {
    pub file: &'a File,
    pub stream: &'a TokenStream,
    pub source: &'a str,
    pub file_header: Option<&'a str>,
}

/// A named lint rule. Evaluators are plain function pointers so the
/// registry is a flat, ordered table.
pub struct Rule {
    pub id: &'static str,
    pub purpose: &'static str,
    pub groups: &'static [Group],
    pub check_ast: Option<fn(&mut CheckContext<'_>, &File)>,
    pub check_descriptors: Option<fn(&mut CheckContext<'_>, &File, &FileDescriptorSet)>,
    pub fix: Option<fn(&FixContext<'_>) -> Vec<Edit>>,
}

impl Rule {
    pub fn in_group(&self, group: Group) -> bool {
        self.groups.contains(&group)
    }

    pub fn has_fix(&self) -> bool {
        self.fix.is_some()
    }
}

/// All known rules, ordered by id.
pub struct Registry {
    rules: Vec<Rule>,
}

impl Registry {
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn group(&self, name: &str) -> Result<Vec<&Rule>, LintError> {
        let group =
            Group::from_name(name).ok_or_else(|| LintError::UnknownGroup(name.to_string()))?;
        Ok(self.rules.iter().filter(|r| r.in_group(group)).collect())
    }
}

/// The process-wide rule registry.
pub fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut rules = rules::all();
        rules.sort_by_key(|r| r.id);
        debug_assert!(rules.windows(2).all(|w| w[0].id != w[1].id));
        Registry { rules }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_ids_are_upper_snake_and_unique() {
        let registry = registry();
        let mut seen = std::collections::HashSet::new();
        for rule in registry.rules() {
            assert!(
                rule.id
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'),
                "bad rule id {}",
                rule.id
            );
            assert!(seen.insert(rule.id), "duplicate rule id {}", rule.id);
            assert!(!rule.purpose.is_empty());
            assert!(rule.check_ast.is_some() || rule.check_descriptors.is_some());
        }
    }

    #[test]
    fn groups_are_nested_google_uber1_uber2() {
        let registry = registry();
        let google = registry.group("google").unwrap();
        let uber1 = registry.group("uber1").unwrap();
        let uber2 = registry.group("uber2").unwrap();
        assert!(!google.is_empty());
        assert!(google.len() < uber1.len());
        assert!(uber1.len() < uber2.len());
        for rule in google {
            assert!(rule.in_group(Group::Uber1), "{} not in uber1", rule.id);
        }
        for rule in uber1 {
            assert!(rule.in_group(Group::Uber2), "{} not in uber2", rule.id);
        }
    }

    #[test]
    fn unknown_group_is_an_error() {
        assert!(registry().group("uber3").is_err());
    }
}
