//! Canonical printer over the AST and its token stream.
//!
//! Layout rules: two-space indents, exactly one blank line between
//! top-level declarations (consecutive imports and file options stay
//! contiguous), a single trailing newline, single-space option and
//! field spacing. Comments travel with the declaration they precede;
//! blank-line grouping inside bodies is preserved. Every rule depends
//! only on the AST and stable token-stream queries, which makes the
//! printer idempotent.

use prototool_lang::ast::*;
use prototool_lang::token::{Token, TokenKind, TokenStream};

#[derive(Debug, Clone, Default)]
pub struct PrintOptions<'a> {
    /// When set, everything before the syntax declaration is
    /// replaced by this header (already in commented form).
    pub file_header: Option<&'a str>,
}

pub fn print(file: &File, stream: &TokenStream) -> String {
    print_with(file, stream, &PrintOptions::default())
}

pub fn print_with(file: &File, stream: &TokenStream, options: &PrintOptions<'_>) -> String {
    let mut printer = Printer {
        file,
        stream,
        out: String::with_capacity(stream.source().len()),
        indent: 0,
        cursor: 0,
    };
    printer.print_file(options);
    printer.out
}

enum GapItem<'a> {
    Blank,
    Comment(&'a Token),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TopKind {
    Syntax,
    Package,
    Import,
    Option,
    Node,
}

struct Printer<'a> {
    file: &'a File,
    stream: &'a TokenStream,
    out: String,
    indent: usize,
    /// Raw token index: everything before it has been emitted or
    /// deliberately replaced.
    cursor: usize,
}

impl<'a> Printer<'a> {
    fn print_file(&mut self, options: &PrintOptions<'_>) {
        let mut items: Vec<(usize, TopKind, usize)> = Vec::new();
        if let Some(span) = &self.file.syntax_span {
            items.push((span.start, TopKind::Syntax, 0));
        }
        if let Some(package) = &self.file.package {
            items.push((package.span.start, TopKind::Package, 0));
        }
        for (i, import) in self.file.imports.iter().enumerate() {
            items.push((import.span.start, TopKind::Import, i));
        }
        for (i, option) in self.file.options.iter().enumerate() {
            items.push((option.span.start, TopKind::Option, i));
        }
        for (i, &id) in self.file.top_level.iter().enumerate() {
            items.push((self.file.arena.get(id).span.start, TopKind::Node, i));
        }
        items.sort_by_key(|&(start, _, _)| start);

        let mut prev_kind: Option<TopKind> = None;
        for (index, &(start, kind, payload)) in items.iter().enumerate() {
            let gap = self.gather_gap(self.cursor, start);
            if index == 0 {
                if let Some(header) = options.file_header {
                    for line in header.lines() {
                        self.push_line(line.trim_end());
                    }
                    self.out.push('\n');
                } else {
                    self.emit_gap(&gap, false);
                }
            } else {
                let contiguous = matches!(
                    (prev_kind, kind),
                    (Some(TopKind::Import), TopKind::Import)
                        | (Some(TopKind::Option), TopKind::Option)
                );
                let has_blank = gap.iter().any(|g| matches!(g, GapItem::Blank));
                let has_comment = gap.iter().any(|g| matches!(g, GapItem::Comment(_)));
                if !contiguous || has_blank || has_comment {
                    self.out.push('\n');
                }
                self.emit_gap(&gap, false);
            }

            match kind {
                TopKind::Syntax => self.print_syntax(),
                TopKind::Package => self.print_package(),
                TopKind::Import => self.print_import(payload),
                TopKind::Option => self.print_option_line(&self.file.options[payload]),
                TopKind::Node => self.print_node(self.file.top_level[payload]),
            }
            prev_kind = Some(kind);
        }

        // Comments after the last declaration.
        let tail = self.gather_gap(self.cursor, self.stream.tokens().len());
        if tail.iter().any(|g| matches!(g, GapItem::Comment(_))) {
            if !self.out.is_empty() {
                self.out.push('\n');
            }
            self.emit_gap(&tail, false);
        }

        while self.out.ends_with("\n\n") {
            self.out.pop();
        }
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn print_syntax(&mut self) {
        let span = self.file.syntax_span.expect("syntax item implies span");
        self.push_indent();
        self.out
            .push_str(&format!("syntax = \"{}\";", self.file.syntax.as_str()));
        self.finish_line(span.end);
    }

    fn print_package(&mut self) {
        let package = self.file.package.as_ref().expect("package item");
        self.push_indent();
        self.out.push_str(&format!("package {};", package.name));
        self.finish_line(package.span.end);
    }

    fn print_import(&mut self, index: usize) {
        let import = &self.file.imports[index];
        let modifier = match import.kind {
            ImportKind::Plain => "",
            ImportKind::Public => "public ",
            ImportKind::Weak => "weak ",
        };
        self.push_indent();
        self.out
            .push_str(&format!("import {modifier}\"{}\";", import.path));
        self.finish_line(import.span.end);
    }

    fn print_option_line(&mut self, decl: &OptionDecl) {
        self.push_indent();
        self.out
            .push_str(&format!("option {} = {};", decl.name, value_str(&decl.value)));
        self.finish_line(decl.span.end);
    }

    fn print_node(&mut self, id: NodeId) {
        match &self.file.arena.get(id).kind {
            NodeKind::Message(_) => self.print_message(id),
            NodeKind::Enum(_) => self.print_enum(id),
            NodeKind::Service(_) => self.print_service(id),
            NodeKind::Extend(_) => self.print_extend(id),
            NodeKind::Field(_) => self.print_field(id),
            NodeKind::Oneof(_) => self.print_oneof(id),
            NodeKind::Rpc(_) => self.print_rpc(id),
        }
    }

    fn print_message(&mut self, id: NodeId) {
        let message = self.file.arena.message(id).expect("message node");
        let span = self.file.arena.get(id).span;
        self.push_indent();
        self.out.push_str(&format!("message {} ", message.name));
        self.print_braced_body(span, message.name_token, |p| {
            p.print_message_elements(message);
        });
    }

    fn print_message_elements(&mut self, message: &'a Message) {
        for (index, element) in message.elements.iter().enumerate() {
            let start = self.element_start(element);
            self.emit_body_gap(start, index == 0);
            match element {
                MessageElement::Field(fid) => self.print_field(*fid),
                MessageElement::Oneof(oid) => self.print_oneof(*oid),
                MessageElement::Message(mid) => self.print_message(*mid),
                MessageElement::Enum(eid) => self.print_enum(*eid),
                MessageElement::Extend(xid) => self.print_extend(*xid),
                MessageElement::Option(decl) => self.print_option_line(decl),
                MessageElement::Reserved(decl) => self.print_reserved(decl),
                MessageElement::Extensions(decl) => self.print_extensions(decl),
            }
        }
    }

    fn element_start(&self, element: &MessageElement) -> usize {
        match element {
            MessageElement::Field(id)
            | MessageElement::Oneof(id)
            | MessageElement::Message(id)
            | MessageElement::Enum(id)
            | MessageElement::Extend(id) => self.file.arena.get(*id).span.start,
            MessageElement::Option(o) => o.span.start,
            MessageElement::Reserved(r) => r.span.start,
            MessageElement::Extensions(x) => x.span.start,
        }
    }

    fn print_field(&mut self, id: NodeId) {
        let field = self.file.arena.field(id).expect("field node");
        let span = self.file.arena.get(id).span;

        let label = match field.label {
            FieldLabel::None => "",
            FieldLabel::Optional => "optional ",
            FieldLabel::Required => "required ",
            FieldLabel::Repeated => "repeated ",
        };

        if let Some(body_id) = field.group {
            let body = self.file.arena.message(body_id).expect("group body");
            self.push_indent();
            self.out
                .push_str(&format!("{label}group {} = {} ", field.name, field.number));
            self.print_braced_body(span, field.name_token, |p| {
                p.print_message_elements(body);
            });
            return;
        }

        let type_str = match &field.field_type {
            FieldType::Named(name) => name.clone(),
            FieldType::Map { key, value } => format!("map<{key}, {value}>"),
        };
        self.push_indent();
        self.out
            .push_str(&format!("{label}{type_str} {} = {}", field.name, field.number));
        if !field.options.is_empty() {
            self.out.push_str(&bracket_options(&field.options));
        }
        self.out.push(';');
        self.finish_line(span.end);
    }

    fn print_oneof(&mut self, id: NodeId) {
        let oneof = self.file.arena.oneof(id).expect("oneof node");
        let span = self.file.arena.get(id).span;

        let mut parts: Vec<(usize, OneofPart<'a>)> = oneof
            .fields
            .iter()
            .map(|&fid| (self.file.arena.get(fid).span.start, OneofPart::Field(fid)))
            .collect();
        parts.extend(
            oneof
                .options
                .iter()
                .map(|o| (o.span.start, OneofPart::Option(o))),
        );
        parts.sort_by_key(|&(start, _)| start);

        self.push_indent();
        self.out.push_str(&format!("oneof {} ", oneof.name));
        self.print_braced_body(span, oneof.name_token, |p| {
            for (index, (start, part)) in parts.iter().enumerate() {
                p.emit_body_gap(*start, index == 0);
                match part {
                    OneofPart::Field(fid) => p.print_field(*fid),
                    OneofPart::Option(decl) => p.print_option_line(decl),
                }
            }
        });
    }

    fn print_enum(&mut self, id: NodeId) {
        let decl = self.file.arena.enum_decl(id).expect("enum node");
        let span = self.file.arena.get(id).span;

        self.push_indent();
        self.out.push_str(&format!("enum {} ", decl.name));
        self.print_braced_body(span, decl.name_token, |p| {
            for (index, element) in decl.elements.iter().enumerate() {
                let start = match element {
                    EnumElement::Value(v) => v.span.start,
                    EnumElement::Option(o) => o.span.start,
                    EnumElement::Reserved(r) => r.span.start,
                };
                p.emit_body_gap(start, index == 0);
                match element {
                    EnumElement::Value(value) => p.print_enum_value(value),
                    EnumElement::Option(decl) => p.print_option_line(decl),
                    EnumElement::Reserved(decl) => p.print_reserved(decl),
                }
            }
        });
    }

    fn print_enum_value(&mut self, value: &EnumValue) {
        self.push_indent();
        self.out
            .push_str(&format!("{} = {}", value.name, value.number));
        if !value.options.is_empty() {
            self.out.push_str(&bracket_options(&value.options));
        }
        self.out.push(';');
        self.finish_line(value.span.end);
    }

    fn print_service(&mut self, id: NodeId) {
        let service = self.file.arena.service(id).expect("service node");
        let span = self.file.arena.get(id).span;

        self.push_indent();
        self.out.push_str(&format!("service {} ", service.name));
        self.print_braced_body(span, service.name_token, |p| {
            for (index, element) in service.elements.iter().enumerate() {
                let start = match element {
                    ServiceElement::Rpc(rid) => p.file.arena.get(*rid).span.start,
                    ServiceElement::Option(o) => o.span.start,
                };
                p.emit_body_gap(start, index == 0);
                match element {
                    ServiceElement::Rpc(rid) => p.print_rpc(*rid),
                    ServiceElement::Option(decl) => p.print_option_line(decl),
                }
            }
        });
    }

    fn print_rpc(&mut self, id: NodeId) {
        let rpc = self.file.arena.rpc(id).expect("rpc node");
        let span = self.file.arena.get(id).span;

        let req_stream = if rpc.request_streaming { "stream " } else { "" };
        let resp_stream = if rpc.response_streaming { "stream " } else { "" };
        self.push_indent();
        self.out.push_str(&format!(
            "rpc {}({req_stream}{}) returns ({resp_stream}{})",
            rpc.name, rpc.request_type, rpc.response_type
        ));

        if rpc.options.is_empty() {
            self.out.push(';');
            self.finish_line(span.end);
            return;
        }

        self.out.push(' ');
        self.print_braced_body(span, rpc.name_token, |p| {
            for (index, decl) in rpc.options.iter().enumerate() {
                p.emit_body_gap(decl.span.start, index == 0);
                p.print_option_line(decl);
            }
        });
    }

    fn print_extend(&mut self, id: NodeId) {
        let node = self.file.arena.get(id);
        let extend = match &node.kind {
            NodeKind::Extend(e) => e,
            _ => unreachable!("extend node"),
        };

        self.push_indent();
        self.out.push_str(&format!("extend {} ", extend.extendee));
        self.print_braced_body(node.span, node.span.start, |p| {
            for (index, &fid) in extend.fields.iter().enumerate() {
                let start = p.file.arena.get(fid).span.start;
                p.emit_body_gap(start, index == 0);
                p.print_field(fid);
            }
        });
    }

    fn print_reserved(&mut self, decl: &ReservedDecl) {
        let body = if decl.names.is_empty() {
            decl.ranges
                .iter()
                .map(range_str)
                .collect::<Vec<_>>()
                .join(", ")
        } else {
            decl.names
                .iter()
                .map(|n| format!("\"{n}\""))
                .collect::<Vec<_>>()
                .join(", ")
        };
        self.push_indent();
        self.out.push_str(&format!("reserved {body};"));
        self.finish_line(decl.span.end);
    }

    fn print_extensions(&mut self, decl: &ExtensionsDecl) {
        let body = decl
            .ranges
            .iter()
            .map(range_str)
            .collect::<Vec<_>>()
            .join(", ");
        self.push_indent();
        self.out.push_str(&format!("extensions {body};"));
        self.finish_line(decl.span.end);
    }

    /// Emit `{`, the body via `body_fn` at one deeper indent, then
    /// `}`. The cursor moves past the opening brace so body gaps pick
    /// up interior comments; `{}` collapses when the body holds no
    /// declarations or comments.
    fn print_braced_body(
        &mut self,
        span: Span,
        header_token: usize,
        body_fn: impl FnOnce(&mut Self),
    ) {
        let open_raw = self.find_open_brace(header_token, span.end);
        let close_raw = span.end.saturating_sub(1);
        self.cursor = open_raw + 1;

        let before = self.out.len();
        self.out.push_str("{\n");
        self.indent += 1;
        body_fn(self);
        let tail = self.gather_gap(self.cursor, close_raw);
        if tail.iter().any(|g| matches!(g, GapItem::Comment(_))) {
            self.emit_gap(&tail, true);
        }
        self.indent -= 1;

        if self.out.len() == before + 2 {
            self.out.truncate(before);
            self.out.push_str("{}");
        } else {
            self.push_indent();
            self.out.push('}');
        }
        self.finish_line(span.end);
    }

    fn find_open_brace(&self, from_raw: usize, limit: usize) -> usize {
        let tokens = self.stream.tokens();
        for raw in from_raw..limit.min(tokens.len()) {
            if tokens[raw].is_symbol('{') {
                return raw;
            }
        }
        from_raw
    }

    /// Gap handling before a body element: the element's comments in
    /// source order, preserving a single blank line of grouping.
    fn emit_body_gap(&mut self, element_start: usize, first: bool) {
        let gap = self.gather_gap(self.cursor, element_start);
        self.emit_gap(&gap, !first);
    }

    /// Comments and blank markers between raw token indices, with
    /// consecutive blanks collapsed.
    fn gather_gap(&self, lo: usize, hi: usize) -> Vec<GapItem<'a>> {
        let mut items = Vec::new();
        let tokens = self.stream.tokens();
        for raw in lo..hi.min(tokens.len()) {
            let token = &tokens[raw];
            match token.kind {
                TokenKind::Whitespace => {
                    if token.text.matches('\n').count() >= 2
                        && !matches!(items.last(), Some(GapItem::Blank))
                    {
                        items.push(GapItem::Blank);
                    }
                }
                TokenKind::LineComment | TokenKind::BlockComment => {
                    items.push(GapItem::Comment(token));
                }
                _ => {}
            }
        }
        items
    }

    /// Emit gap items in source order. A leading blank is dropped
    /// unless `allow_leading_blank` (separation between declarations
    /// is the caller's decision).
    fn emit_gap(&mut self, gap: &[GapItem<'a>], allow_leading_blank: bool) {
        for (i, item) in gap.iter().enumerate() {
            match item {
                GapItem::Blank => {
                    if i > 0 || allow_leading_blank {
                        self.out.push('\n');
                    }
                }
                GapItem::Comment(token) => self.emit_comment(token),
            }
        }
    }

    fn emit_comment(&mut self, token: &Token) {
        let mut lines = token.text.lines();
        if let Some(first) = lines.next() {
            self.push_line(first.trim_end());
        }
        for line in lines {
            self.push_indent();
            self.out.push(' ');
            self.out.push_str(line.trim());
            self.out.push('\n');
        }
    }

    /// Append the declaration's trailing comment, if any, then end
    /// the line and advance the cursor past everything consumed.
    fn finish_line(&mut self, decl_end_raw: usize) {
        self.cursor = decl_end_raw;
        let tokens = self.stream.tokens();
        let Some(last) = decl_end_raw.checked_sub(1).and_then(|i| tokens.get(i)) else {
            self.out.push('\n');
            return;
        };
        let line = last.location.line;
        let mut raw = decl_end_raw;
        while let Some(token) = tokens.get(raw) {
            match token.kind {
                TokenKind::Whitespace => {
                    if token.text.contains('\n') {
                        break;
                    }
                    raw += 1;
                }
                TokenKind::LineComment | TokenKind::BlockComment => {
                    if token.location.line == line {
                        self.out.push(' ');
                        self.out.push_str(token.text.trim_end());
                        self.cursor = raw + 1;
                    }
                    break;
                }
                _ => break,
            }
        }
        self.out.push('\n');
    }

    fn push_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    fn push_line(&mut self, text: &str) {
        self.push_indent();
        self.out.push_str(text);
        self.out.push('\n');
    }
}

enum OneofPart<'a> {
    Field(NodeId),
    Option(&'a OptionDecl),
}

fn range_str(range: &TagRange) -> String {
    if range.end == i64::MAX {
        format!("{} to max", range.start)
    } else if range.start == range.end {
        format!("{}", range.start)
    } else {
        format!("{} to {}", range.start, range.end)
    }
}

fn bracket_options(options: &[OptionDecl]) -> String {
    let parts: Vec<String> = options
        .iter()
        .map(|o| format!("{} = {}", o.name, value_str(&o.value)))
        .collect();
    format!(" [{}]", parts.join(", "))
}

fn value_str(value: &OptionValue) -> String {
    match value {
        OptionValue::Str(raw) => raw.clone(),
        OptionValue::Ident(ident) => ident.clone(),
        OptionValue::Int(n) => n.to_string(),
        OptionValue::Float(raw) => raw.clone(),
        OptionValue::Aggregate(raw) => raw.clone(),
    }
}
