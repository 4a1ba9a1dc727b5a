use prototool_core::Failure;

/// A byte-range replacement produced by an autofix-capable rule.
#[derive(Debug, Clone)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
    /// Rule that produced the edit, for conflict reporting.
    pub rule_id: &'static str,
    pub line: usize,
    pub column: usize,
}

/// Apply edits to `source`. Edits are sorted by start offset; an
/// edit overlapping an already-applied one is dropped and reported
/// as a fix conflict.
pub fn apply_edits(
    path: &str,
    source: &str,
    mut edits: Vec<Edit>,
) -> (String, Vec<Failure>) {
    edits.sort_by_key(|e| (e.start, e.end));

    let mut out = String::with_capacity(source.len());
    let mut conflicts = Vec::new();
    let mut cursor = 0usize;
    for edit in edits {
        if edit.start < cursor || edit.end > source.len() || edit.start > edit.end {
            conflicts.push(
                Failure::new(
                    path,
                    edit.line,
                    edit.column,
                    format!("overlapping fix from {} dropped", edit.rule_id),
                )
                .with_rule("FIX_CONFLICT"),
            );
            continue;
        }
        out.push_str(&source[cursor..edit.start]);
        out.push_str(&edit.replacement);
        cursor = edit.end;
    }
    out.push_str(&source[cursor..]);
    (out, conflicts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(start: usize, end: usize, replacement: &str) -> Edit {
        Edit {
            start,
            end,
            replacement: replacement.to_string(),
            rule_id: "TEST_RULE",
            line: 1,
            column: 1,
        }
    }

    #[test]
    fn disjoint_edits_apply_in_order() {
        let (out, conflicts) =
            apply_edits("f.proto", "abcdef", vec![edit(4, 5, "E"), edit(0, 1, "A")]);
        assert_eq!(out, "AbcdEf");
        assert!(conflicts.is_empty());
    }

    #[test]
    fn overlapping_edit_is_dropped_and_reported() {
        let (out, conflicts) =
            apply_edits("f.proto", "abcdef", vec![edit(0, 3, "X"), edit(2, 4, "Y")]);
        assert_eq!(out, "Xdef");
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].rule_id.as_deref(), Some("FIX_CONFLICT"));
    }
}
