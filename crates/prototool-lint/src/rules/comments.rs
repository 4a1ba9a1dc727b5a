use prototool_lang::ast::{File, NodeKind};
use prototool_lang::token::TokenKind;

use crate::fix::Edit;
use crate::registry::{CheckContext, FixContext, Group, Rule};

const UBER_UP: &[Group] = &[Group::Uber1, Group::Uber2];
const UBER2_ONLY: &[Group] = &[Group::Uber2];
const NO_GROUP: &[Group] = &[];

pub fn rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "COMMENTS_NO_C_STYLE",
            purpose: "C-style block comments are not allowed; use line comments.",
            groups: UBER_UP,
            check_ast: Some(comments_no_c_style),
            check_descriptors: None,
            fix: Some(fix_c_style_comments),
        },
        Rule {
            id: "MESSAGES_HAVE_COMMENTS",
            purpose: "Messages must have a leading comment.",
            groups: UBER2_ONLY,
            check_ast: Some(messages_have_comments),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "ENUMS_HAVE_COMMENTS",
            purpose: "Enums must have a leading comment.",
            groups: UBER2_ONLY,
            check_ast: Some(enums_have_comments),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "SERVICES_HAVE_COMMENTS",
            purpose: "Services must have a leading comment.",
            groups: UBER2_ONLY,
            check_ast: Some(services_have_comments),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "RPCS_HAVE_COMMENTS",
            purpose: "RPCs must have a leading comment.",
            groups: UBER2_ONLY,
            check_ast: Some(rpcs_have_comments),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "FILE_HEADER",
            purpose: "Files must begin with the configured file header.",
            groups: NO_GROUP,
            check_ast: Some(file_header),
            check_descriptors: None,
            fix: Some(fix_file_header),
        },
    ]
}

fn comments_no_c_style(ctx: &mut CheckContext<'_>, _file: &File) {
    let block_comments: Vec<usize> = ctx
        .stream
        .tokens()
        .iter()
        .enumerate()
        .filter(|(_, t)| t.kind == TokenKind::BlockComment)
        .map(|(i, _)| i)
        .collect();
    for raw in block_comments {
        ctx.fail_at_token(raw, "C-style block comment; use // line comments");
    }
}

/// Rewrite each `/* ... */` into `//` lines, preserving the comment's
/// starting column for continuation lines.
fn fix_c_style_comments(ctx: &FixContext<'_>) -> Vec<Edit> {
    let mut edits = Vec::new();
    for token in ctx.stream.tokens() {
        if token.kind != TokenKind::BlockComment {
            continue;
        }
        let inner = token
            .text
            .trim_start_matches("/*")
            .trim_end_matches("*/");
        let indent = " ".repeat(token.location.column.saturating_sub(1));
        let lines: Vec<&str> = inner.lines().collect();
        let mut replacement = String::new();
        let mut first = true;
        for line in &lines {
            let cleaned = line.trim().trim_start_matches('*').trim();
            if cleaned.is_empty() && lines.len() > 1 {
                continue;
            }
            if !first {
                replacement.push('\n');
                replacement.push_str(&indent);
            }
            replacement.push_str("//");
            if !cleaned.is_empty() {
                replacement.push(' ');
                replacement.push_str(cleaned);
            }
            first = false;
        }
        if first {
            replacement.push_str("//");
        }
        edits.push(Edit {
            start: token.location.offset,
            end: token.end_offset(),
            replacement,
            rule_id: "COMMENTS_NO_C_STYLE",
            line: token.location.line,
            column: token.location.column,
        });
    }
    edits
}

fn has_leading_comment(ctx: &CheckContext<'_>, span_start_raw: usize) -> bool {
    ctx.stream
        .significant_position(span_start_raw)
        .map(|pos| !ctx.stream.leading_comments(pos).is_empty())
        .unwrap_or(true)
}

fn messages_have_comments(ctx: &mut CheckContext<'_>, file: &File) {
    for (_, node) in file.arena.iter() {
        if let NodeKind::Message(m) = &node.kind {
            // Group bodies share the group field's declaration.
            if node
                .parent
                .is_some_and(|p| matches!(file.arena.get(p).kind, NodeKind::Field(_)))
            {
                continue;
            }
            if !has_leading_comment(ctx, node.span.start) {
                ctx.fail_at_token(m.name_token, format!("message {:?} has no comment", m.name));
            }
        }
    }
}

fn enums_have_comments(ctx: &mut CheckContext<'_>, file: &File) {
    for (_, node) in file.arena.iter() {
        if let NodeKind::Enum(e) = &node.kind {
            if !has_leading_comment(ctx, node.span.start) {
                ctx.fail_at_token(e.name_token, format!("enum {:?} has no comment", e.name));
            }
        }
    }
}

fn services_have_comments(ctx: &mut CheckContext<'_>, file: &File) {
    for (_, node) in file.arena.iter() {
        if let NodeKind::Service(s) = &node.kind {
            if !has_leading_comment(ctx, node.span.start) {
                ctx.fail_at_token(s.name_token, format!("service {:?} has no comment", s.name));
            }
        }
    }
}

fn rpcs_have_comments(ctx: &mut CheckContext<'_>, file: &File) {
    for (_, node) in file.arena.iter() {
        if let NodeKind::Rpc(r) = &node.kind {
            if !has_leading_comment(ctx, node.span.start) {
                ctx.fail_at_token(r.name_token, format!("rpc {:?} has no comment", r.name));
            }
        }
    }
}

/// Active only when the config sets `lint.file_header`; the engine
/// passes the already-commented header text.
fn file_header(ctx: &mut CheckContext<'_>, _file: &File) {
    let Some(header) = ctx.file_header else {
        return;
    };
    if !ctx.stream.source().starts_with(header) {
        ctx.fail(1, 1, "file does not begin with the configured file header");
    }
}

/// Replace everything before the syntax declaration with the header.
fn fix_file_header(ctx: &FixContext<'_>) -> Vec<Edit> {
    let Some(header) = ctx.file_header else {
        return Vec::new();
    };
    let syntax_offset = ctx
        .file
        .syntax_span
        .as_ref()
        .and_then(|span| ctx.stream.tokens().get(span.start))
        .map(|t| t.location.offset)
        .unwrap_or(0);
    let mut replacement = header.to_string();
    if !replacement.ends_with('\n') {
        replacement.push('\n');
    }
    replacement.push('\n');
    if ctx.source[..syntax_offset] == replacement {
        return Vec::new();
    }
    vec![Edit {
        start: 0,
        end: syntax_offset,
        replacement,
        rule_id: "FILE_HEADER",
        line: 1,
        column: 1,
    }]
}
