use std::path::{Path, PathBuf};

use prost_types::FileDescriptorSet;
use prototool_config::{Config, LintConfig};
use prototool_core::{sort_failures, Failure};
use prototool_lang::{File, TokenStream};
use tracing::debug;

use crate::error::LintError;
use crate::fix::apply_edits;
use crate::registry::{registry, CheckContext, FixContext, Rule};

/// Default group applied when the config selects nothing.
const DEFAULT_GROUP: &str = "uber1";

/// One file to lint.
pub struct LintInput<'a> {
    /// Path used in failure output.
    pub display_path: String,
    /// Absolute path, used to match config ignores.
    pub abs_path: PathBuf,
    pub file: &'a File,
    pub stream: &'a TokenStream,
    pub descriptors: Option<&'a FileDescriptorSet>,
    pub config: &'a Config,
}

/// The effective rule set for a lint config, before per-file
/// ignores. Deterministic: a pure function of
/// (group, no_default, add, remove).
pub fn effective_rules(lint: &LintConfig) -> Result<Vec<&'static Rule>, LintError> {
    let registry = registry();

    let mut selected: Vec<&'static str> = match &lint.group {
        Some(group) => registry.group(group)?.iter().map(|r| r.id).collect(),
        None if lint.no_default => Vec::new(),
        None => registry
            .group(DEFAULT_GROUP)
            .expect("default group exists")
            .iter()
            .map(|r| r.id)
            .collect(),
    };

    for id in &lint.add {
        let rule = registry
            .get(id)
            .ok_or_else(|| LintError::UnknownRule(id.clone()))?;
        if !selected.contains(&rule.id) {
            selected.push(rule.id);
        }
    }
    for id in &lint.remove {
        let rule = registry
            .get(id)
            .ok_or_else(|| LintError::UnknownRule(id.clone()))?;
        selected.retain(|&s| s != rule.id);
    }

    // Registry order keeps evaluation and listings deterministic.
    Ok(registry
        .rules()
        .iter()
        .filter(|r| selected.contains(&r.id))
        .collect())
}

fn is_ignored(config: &Config, rule_id: &str, abs_path: &Path) -> bool {
    config
        .lint
        .ignores
        .iter()
        .any(|ig| ig.id == rule_id && ig.files.iter().any(|f| f == abs_path))
}

/// The configured file header in its commented form, ready for
/// comparison against file contents.
pub fn load_file_header(config: &Config) -> Result<Option<String>, LintError> {
    let Some(header) = &config.lint.file_header else {
        return Ok(None);
    };
    let raw = std::fs::read_to_string(&header.path)?;
    if header.is_commented {
        return Ok(Some(raw));
    }
    let mut out = String::with_capacity(raw.len() + 64);
    for line in raw.lines() {
        if line.is_empty() {
            out.push_str("//\n");
        } else {
            out.push_str("// ");
            out.push_str(line);
            out.push('\n');
        }
    }
    Ok(Some(out))
}

/// Lint a batch of files, returning failures in stable order.
pub fn run(inputs: &[LintInput<'_>]) -> Result<Vec<Failure>, LintError> {
    let mut failures = Vec::new();
    for input in inputs {
        let rules = effective_rules(&input.config.lint)?;
        let header = load_file_header(input.config)?;
        debug!(file = %input.display_path, rules = rules.len(), "linting");

        let mut ctx = CheckContext::new(&input.display_path, input.stream, header.as_deref());
        for rule in rules {
            if is_ignored(input.config, rule.id, &input.abs_path) {
                continue;
            }
            ctx.set_rule(rule.id);
            if let Some(check) = rule.check_ast {
                check(&mut ctx, input.file);
            }
            if let (Some(check), Some(descriptors)) = (rule.check_descriptors, input.descriptors) {
                check(&mut ctx, input.file, descriptors);
            }
        }
        failures.extend(ctx.take_failures());
    }
    sort_failures(&mut failures);
    Ok(failures)
}

/// Apply every autofix the effective rules offer. Returns the fixed
/// source and any fix-conflict failures.
pub fn run_fix(input: &LintInput<'_>, source: &str) -> Result<(String, Vec<Failure>), LintError> {
    let rules = effective_rules(&input.config.lint)?;
    let header = load_file_header(input.config)?;
    let ctx = FixContext {
        file: input.file,
        stream: input.stream,
        source,
        file_header: header.as_deref(),
    };

    let mut edits = Vec::new();
    for rule in rules {
        if is_ignored(input.config, rule.id, &input.abs_path) {
            continue;
        }
        if let Some(fix) = rule.fix {
            edits.extend(fix(&ctx));
        }
    }
    Ok(apply_edits(&input.display_path, source, edits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use prototool_lang::{lex, parse};

    fn lint_source(src: &str, config: &Config) -> Vec<Failure> {
        let stream = lex("test.proto", src).unwrap();
        let file = parse("test.proto", &stream).unwrap();
        let input = LintInput {
            display_path: "test.proto".to_string(),
            abs_path: PathBuf::from("/work/test.proto"),
            file: &file,
            stream: &stream,
            descriptors: None,
            config,
        };
        run(&[input]).unwrap()
    }

    #[test]
    fn lowercase_enum_fails_capitalization_at_name_site() {
        let config = Config::default_for(Path::new("/work"));
        let failures = lint_source("enum foo { A = 0; }\n", &config);
        let failure = failures
            .iter()
            .find(|f| f.rule_id.as_deref() == Some("ENUM_NAMES_CAPITALIZED"))
            .expect("ENUM_NAMES_CAPITALIZED fires");
        assert_eq!((failure.line, failure.column), (1, 6));
    }

    #[test]
    fn effective_set_group_overrides_no_default() {
        let mut lint = LintConfig::default();
        lint.group = Some("google".to_string());
        lint.no_default = true;
        let rules = effective_rules(&lint).unwrap();
        assert!(!rules.is_empty());
        let google = registry().group("google").unwrap();
        assert_eq!(rules.len(), google.len());
    }

    #[test]
    fn effective_set_add_remove() {
        let mut lint = LintConfig::default();
        lint.no_default = true;
        lint.add = vec![
            "SYNTAX_PROTO3".to_string(),
            "ENUM_NAMES_CAPITALIZED".to_string(),
        ];
        let rules = effective_rules(&lint).unwrap();
        assert_eq!(rules.len(), 2);

        lint.remove = vec!["SYNTAX_PROTO3".to_string()];
        let rules = effective_rules(&lint).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, "ENUM_NAMES_CAPITALIZED");
    }

    #[test]
    fn effective_set_is_deterministic() {
        let mut lint = LintConfig::default();
        lint.add = vec!["FILE_HEADER".to_string()];
        let a: Vec<&str> = effective_rules(&lint).unwrap().iter().map(|r| r.id).collect();
        let b: Vec<&str> = effective_rules(&lint).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(a, b);
        let mut sorted = a.clone();
        sorted.sort();
        assert_eq!(a, sorted);
    }

    #[test]
    fn unknown_rule_in_add_is_an_error() {
        let mut lint = LintConfig::default();
        lint.add = vec!["NOT_A_RULE".to_string()];
        assert!(matches!(
            effective_rules(&lint),
            Err(LintError::UnknownRule(_))
        ));
    }

    #[test]
    fn ignores_suppress_matching_file() {
        let mut config = Config::default_for(Path::new("/work"));
        config.lint.ignores = vec![prototool_config::model::LintIgnore {
            id: "ENUM_NAMES_CAPITALIZED".to_string(),
            files: vec![PathBuf::from("/work/test.proto")],
        }];
        let failures = lint_source("enum foo { A = 0; }\n", &config);
        assert!(failures
            .iter()
            .all(|f| f.rule_id.as_deref() != Some("ENUM_NAMES_CAPITALIZED")));
    }

    #[test]
    fn fix_rewrites_block_comments() {
        let config = Config::default_for(Path::new("/work"));
        let src = "syntax = \"proto3\";\n/* bad comment */\nmessage M {}\n";
        let stream = lex("test.proto", src).unwrap();
        let file = parse("test.proto", &stream).unwrap();
        let input = LintInput {
            display_path: "test.proto".to_string(),
            abs_path: PathBuf::from("/work/test.proto"),
            file: &file,
            stream: &stream,
            descriptors: None,
            config: &config,
        };
        let (fixed, conflicts) = run_fix(&input, src).unwrap();
        assert!(conflicts.is_empty());
        assert!(fixed.contains("// bad comment"));
        assert!(!fixed.contains("/*"));
    }

    #[test]
    fn failures_are_sorted() {
        let config = Config::default_for(Path::new("/work"));
        let failures = lint_source("enum foo { A = 0; }\nenum bar { B = 0; }\n", &config);
        for pair in failures.windows(2) {
            assert!(pair[0].sort_key_cmp(&pair[1]) != std::cmp::Ordering::Greater);
        }
    }
}
