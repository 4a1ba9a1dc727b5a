use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::str_lit_value;
use crate::token::{Token, TokenKind, TokenStream};

/// Parse a token stream into a [`File`]. The parser is fail-fast:
/// sources are expected to already compile under protoc, so the
/// first syntax error aborts with its location.
pub fn parse(file_name: &str, stream: &TokenStream) -> Result<File, ParseError> {
    Parser {
        file: file_name,
        stream,
        pos: 0,
        last_raw: 0,
        arena: Arena::default(),
    }
    .parse_file()
}

struct Parser<'a> {
    file: &'a str,
    stream: &'a TokenStream,
    /// Index into the significant-token list.
    pos: usize,
    /// Raw index of the most recently consumed token.
    last_raw: usize,
    arena: Arena,
}

impl<'a> Parser<'a> {
    fn parse_file(mut self) -> Result<File, ParseError> {
        let mut syntax = Syntax::Proto2;
        let mut syntax_span = None;

        if self.peek_ident("syntax") {
            let start = self.raw_pos();
            self.bump();
            self.expect_symbol('=')?;
            let tok = self.expect_kind(TokenKind::StrLit, "string literal")?;
            let value = str_lit_value(&tok);
            syntax = match value.as_str() {
                "proto2" => Syntax::Proto2,
                "proto3" => Syntax::Proto3,
                other => {
                    return Err(self.err_at(&tok, format!("unknown syntax {other:?}")));
                }
            };
            self.expect_symbol(';')?;
            syntax_span = Some(self.span_from(start));
        }

        let mut package = None;
        let mut imports = Vec::new();
        let mut options = Vec::new();
        let mut top_level = Vec::new();

        while let Some(tok) = self.peek() {
            if tok.is_symbol(';') {
                self.bump();
                continue;
            }
            if tok.kind != TokenKind::Ident {
                return Err(self.err_at(tok, format!("unexpected token {:?}", tok.text)));
            }
            match tok.text.as_str() {
                "package" => {
                    let start = self.raw_pos();
                    self.bump();
                    let name = self.parse_full_ident()?;
                    self.expect_symbol(';')?;
                    if package.is_some() {
                        return Err(self.err_here("duplicate package declaration"));
                    }
                    package = Some(PackageDecl {
                        name,
                        span: self.span_from(start),
                    });
                }
                "import" => {
                    let start = self.raw_pos();
                    self.bump();
                    let kind = if self.peek_ident("public") {
                        self.bump();
                        ImportKind::Public
                    } else if self.peek_ident("weak") {
                        self.bump();
                        ImportKind::Weak
                    } else {
                        ImportKind::Plain
                    };
                    let tok = self.expect_kind(TokenKind::StrLit, "import path")?;
                    let path = str_lit_value(&tok);
                    self.expect_symbol(';')?;
                    imports.push(ImportDecl {
                        path,
                        kind,
                        span: self.span_from(start),
                    });
                }
                "option" => options.push(self.parse_option_decl()?),
                "message" => {
                    let id = self.parse_message(None)?;
                    top_level.push(id);
                }
                "enum" => {
                    let id = self.parse_enum(None)?;
                    top_level.push(id);
                }
                "service" => {
                    let id = self.parse_service(None)?;
                    top_level.push(id);
                }
                "extend" => {
                    let id = self.parse_extend(None)?;
                    top_level.push(id);
                }
                other => {
                    return Err(self.err_here(format!("unexpected {other:?} at file scope")));
                }
            }
        }

        Ok(File {
            name: self.file.to_string(),
            syntax,
            syntax_span,
            package,
            imports,
            options,
            top_level,
            arena: self.arena,
        })
    }

    fn parse_message(&mut self, parent: Option<NodeId>) -> Result<NodeId, ParseError> {
        let start = self.raw_pos();
        self.expect_ident("message")?;
        let (name, name_token) = self.expect_any_ident("message name")?;
        let id = self.arena.alloc(
            parent,
            NodeKind::Message(Message {
                name,
                name_token,
                elements: Vec::new(),
            }),
        );
        let elements = self.parse_message_body(id)?;
        let span = self.span_from(start);
        let node = self.arena.get_mut(id);
        node.span = span;
        match &mut node.kind {
            NodeKind::Message(m) => m.elements = elements,
            _ => unreachable!(),
        }
        Ok(id)
    }

    fn parse_message_body(&mut self, parent: NodeId) -> Result<Vec<MessageElement>, ParseError> {
        self.expect_symbol('{')?;
        let mut elements = Vec::new();
        loop {
            let Some(tok) = self.peek() else {
                return Err(self.err_here("unexpected end of file in message body"));
            };
            if tok.is_symbol('}') {
                self.bump();
                break;
            }
            if tok.is_symbol(';') {
                self.bump();
                continue;
            }
            if tok.kind != TokenKind::Ident {
                return Err(self.err_at(tok, format!("unexpected token {:?}", tok.text)));
            }
            match tok.text.as_str() {
                "option" => elements.push(MessageElement::Option(self.parse_option_decl()?)),
                "reserved" => elements.push(MessageElement::Reserved(self.parse_reserved()?)),
                "extensions" => {
                    elements.push(MessageElement::Extensions(self.parse_extensions()?))
                }
                "oneof" => {
                    let id = self.parse_oneof(parent)?;
                    elements.push(MessageElement::Oneof(id));
                }
                "message" => {
                    let id = self.parse_message(Some(parent))?;
                    elements.push(MessageElement::Message(id));
                }
                "enum" => {
                    let id = self.parse_enum(Some(parent))?;
                    elements.push(MessageElement::Enum(id));
                }
                "extend" => {
                    let id = self.parse_extend(Some(parent))?;
                    elements.push(MessageElement::Extend(id));
                }
                _ => {
                    let id = self.parse_field(parent, true)?;
                    elements.push(MessageElement::Field(id));
                }
            }
        }
        Ok(elements)
    }

    /// A normal, map, or group field. `allow_label` is false inside
    /// oneofs, where fields carry no label.
    fn parse_field(&mut self, parent: NodeId, allow_label: bool) -> Result<NodeId, ParseError> {
        let start = self.raw_pos();
        let mut label = FieldLabel::None;
        if allow_label {
            if self.peek_ident("optional") {
                self.bump();
                label = FieldLabel::Optional;
            } else if self.peek_ident("required") {
                self.bump();
                label = FieldLabel::Required;
            } else if self.peek_ident("repeated") {
                self.bump();
                label = FieldLabel::Repeated;
            }
        }

        if self.peek_ident("group") {
            return self.parse_group(parent, label, start);
        }

        let field_type = if self.peek_ident("map") && self.peek_nth_is_symbol(1, '<') {
            self.bump();
            self.expect_symbol('<')?;
            let (key, _) = self.expect_any_ident("map key type")?;
            self.expect_symbol(',')?;
            let value = self.parse_type_name()?;
            self.expect_symbol('>')?;
            FieldType::Map { key, value }
        } else {
            FieldType::Named(self.parse_type_name()?)
        };

        let (name, name_token) = self.expect_any_ident("field name")?;
        self.expect_symbol('=')?;
        let (number, number_token) = self.parse_int("field number")?;
        let options = if self.peek_is_symbol('[') {
            self.parse_bracket_options()?
        } else {
            Vec::new()
        };
        self.expect_symbol(';')?;

        let id = self.arena.alloc(
            Some(parent),
            NodeKind::Field(Field {
                label,
                field_type,
                name,
                name_token,
                number,
                number_token,
                options,
                group: None,
            }),
        );
        self.arena.get_mut(id).span = self.span_from(start);
        Ok(id)
    }

    fn parse_group(
        &mut self,
        parent: NodeId,
        label: FieldLabel,
        start: usize,
    ) -> Result<NodeId, ParseError> {
        self.expect_ident("group")?;
        let (name, name_token) = self.expect_any_ident("group name")?;
        self.expect_symbol('=')?;
        let (number, number_token) = self.parse_int("group field number")?;

        let field_id = self.arena.alloc(
            Some(parent),
            NodeKind::Field(Field {
                label,
                field_type: FieldType::Named("group".to_string()),
                name: name.clone(),
                name_token,
                number,
                number_token,
                options: Vec::new(),
                group: None,
            }),
        );
        let body_id = self.arena.alloc(
            Some(field_id),
            NodeKind::Message(Message {
                name,
                name_token,
                elements: Vec::new(),
            }),
        );
        let elements = self.parse_message_body(body_id)?;
        let span = self.span_from(start);

        let body = self.arena.get_mut(body_id);
        body.span = span;
        match &mut body.kind {
            NodeKind::Message(m) => m.elements = elements,
            _ => unreachable!(),
        }
        let field = self.arena.get_mut(field_id);
        field.span = span;
        match &mut field.kind {
            NodeKind::Field(f) => f.group = Some(body_id),
            _ => unreachable!(),
        }
        Ok(field_id)
    }

    fn parse_oneof(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        let start = self.raw_pos();
        self.expect_ident("oneof")?;
        let (name, name_token) = self.expect_any_ident("oneof name")?;
        let id = self.arena.alloc(
            Some(parent),
            NodeKind::Oneof(Oneof {
                name,
                name_token,
                fields: Vec::new(),
                options: Vec::new(),
            }),
        );

        self.expect_symbol('{')?;
        let mut fields = Vec::new();
        let mut options = Vec::new();
        loop {
            let Some(tok) = self.peek() else {
                return Err(self.err_here("unexpected end of file in oneof"));
            };
            if tok.is_symbol('}') {
                self.bump();
                break;
            }
            if tok.is_symbol(';') {
                self.bump();
                continue;
            }
            if self.peek_ident("option") {
                options.push(self.parse_option_decl()?);
            } else {
                fields.push(self.parse_field(id, false)?);
            }
        }

        let span = self.span_from(start);
        let node = self.arena.get_mut(id);
        node.span = span;
        match &mut node.kind {
            NodeKind::Oneof(o) => {
                o.fields = fields;
                o.options = options;
            }
            _ => unreachable!(),
        }
        Ok(id)
    }

    fn parse_enum(&mut self, parent: Option<NodeId>) -> Result<NodeId, ParseError> {
        let start = self.raw_pos();
        self.expect_ident("enum")?;
        let (name, name_token) = self.expect_any_ident("enum name")?;
        let id = self.arena.alloc(
            parent,
            NodeKind::Enum(EnumDecl {
                name,
                name_token,
                elements: Vec::new(),
            }),
        );

        self.expect_symbol('{')?;
        let mut elements = Vec::new();
        loop {
            let Some(tok) = self.peek() else {
                return Err(self.err_here("unexpected end of file in enum body"));
            };
            if tok.is_symbol('}') {
                self.bump();
                break;
            }
            if tok.is_symbol(';') {
                self.bump();
                continue;
            }
            if self.peek_ident("option") {
                elements.push(EnumElement::Option(self.parse_option_decl()?));
                continue;
            }
            if self.peek_ident("reserved") {
                elements.push(EnumElement::Reserved(self.parse_reserved()?));
                continue;
            }
            let value_start = self.raw_pos();
            let (value_name, value_name_token) = self.expect_any_ident("enum value name")?;
            self.expect_symbol('=')?;
            let (number, number_token) = self.parse_int("enum value number")?;
            let options = if self.peek_is_symbol('[') {
                self.parse_bracket_options()?
            } else {
                Vec::new()
            };
            self.expect_symbol(';')?;
            elements.push(EnumElement::Value(EnumValue {
                name: value_name,
                name_token: value_name_token,
                number,
                number_token,
                options,
                span: self.span_from(value_start),
            }));
        }

        let span = self.span_from(start);
        let node = self.arena.get_mut(id);
        node.span = span;
        match &mut node.kind {
            NodeKind::Enum(e) => e.elements = elements,
            _ => unreachable!(),
        }
        Ok(id)
    }

    fn parse_service(&mut self, parent: Option<NodeId>) -> Result<NodeId, ParseError> {
        let start = self.raw_pos();
        self.expect_ident("service")?;
        let (name, name_token) = self.expect_any_ident("service name")?;
        let id = self.arena.alloc(
            parent,
            NodeKind::Service(Service {
                name,
                name_token,
                elements: Vec::new(),
            }),
        );

        self.expect_symbol('{')?;
        let mut elements = Vec::new();
        loop {
            let Some(tok) = self.peek() else {
                return Err(self.err_here("unexpected end of file in service body"));
            };
            if tok.is_symbol('}') {
                self.bump();
                break;
            }
            if tok.is_symbol(';') {
                self.bump();
                continue;
            }
            if self.peek_ident("option") {
                elements.push(ServiceElement::Option(self.parse_option_decl()?));
                continue;
            }
            let rpc = self.parse_rpc(id)?;
            elements.push(ServiceElement::Rpc(rpc));
        }

        let span = self.span_from(start);
        let node = self.arena.get_mut(id);
        node.span = span;
        match &mut node.kind {
            NodeKind::Service(s) => s.elements = elements,
            _ => unreachable!(),
        }
        Ok(id)
    }

    fn parse_rpc(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        let start = self.raw_pos();
        self.expect_ident("rpc")?;
        let (name, name_token) = self.expect_any_ident("rpc name")?;

        self.expect_symbol('(')?;
        let request_streaming = if self.peek_ident("stream") {
            self.bump();
            true
        } else {
            false
        };
        let request_type = self.parse_type_name()?;
        self.expect_symbol(')')?;

        self.expect_ident("returns")?;
        self.expect_symbol('(')?;
        let response_streaming = if self.peek_ident("stream") {
            self.bump();
            true
        } else {
            false
        };
        let response_type = self.parse_type_name()?;
        self.expect_symbol(')')?;

        let mut options = Vec::new();
        if self.peek_is_symbol('{') {
            self.bump();
            loop {
                let Some(tok) = self.peek() else {
                    return Err(self.err_here("unexpected end of file in rpc body"));
                };
                if tok.is_symbol('}') {
                    self.bump();
                    break;
                }
                if tok.is_symbol(';') {
                    self.bump();
                    continue;
                }
                if self.peek_ident("option") {
                    options.push(self.parse_option_decl()?);
                } else {
                    return Err(self.err_at(tok, "expected option in rpc body"));
                }
            }
        } else {
            self.expect_symbol(';')?;
        }

        let id = self.arena.alloc(
            Some(parent),
            NodeKind::Rpc(Rpc {
                name,
                name_token,
                request_type,
                request_streaming,
                response_type,
                response_streaming,
                options,
            }),
        );
        self.arena.get_mut(id).span = self.span_from(start);
        Ok(id)
    }

    fn parse_extend(&mut self, parent: Option<NodeId>) -> Result<NodeId, ParseError> {
        let start = self.raw_pos();
        self.expect_ident("extend")?;
        let extendee = self.parse_type_name()?;
        let id = self.arena.alloc(
            parent,
            NodeKind::Extend(Extend {
                extendee,
                fields: Vec::new(),
            }),
        );

        self.expect_symbol('{')?;
        let mut fields = Vec::new();
        loop {
            let Some(tok) = self.peek() else {
                return Err(self.err_here("unexpected end of file in extend body"));
            };
            if tok.is_symbol('}') {
                self.bump();
                break;
            }
            if tok.is_symbol(';') {
                self.bump();
                continue;
            }
            fields.push(self.parse_field(id, true)?);
        }

        let span = self.span_from(start);
        let node = self.arena.get_mut(id);
        node.span = span;
        match &mut node.kind {
            NodeKind::Extend(e) => e.fields = fields,
            _ => unreachable!(),
        }
        Ok(id)
    }

    fn parse_reserved(&mut self) -> Result<ReservedDecl, ParseError> {
        let start = self.raw_pos();
        self.expect_ident("reserved")?;
        let mut ranges = Vec::new();
        let mut names = Vec::new();
        if self.peek().is_some_and(|t| t.kind == TokenKind::StrLit) {
            loop {
                let tok = self.expect_kind(TokenKind::StrLit, "reserved name")?;
                names.push(str_lit_value(&tok));
                if self.peek_is_symbol(',') {
                    self.bump();
                } else {
                    break;
                }
            }
        } else {
            ranges = self.parse_tag_ranges()?;
        }
        self.expect_symbol(';')?;
        Ok(ReservedDecl {
            ranges,
            names,
            span: self.span_from(start),
        })
    }

    fn parse_extensions(&mut self) -> Result<ExtensionsDecl, ParseError> {
        let start = self.raw_pos();
        self.expect_ident("extensions")?;
        let ranges = self.parse_tag_ranges()?;
        self.expect_symbol(';')?;
        Ok(ExtensionsDecl {
            ranges,
            span: self.span_from(start),
        })
    }

    fn parse_tag_ranges(&mut self) -> Result<Vec<TagRange>, ParseError> {
        let mut ranges = Vec::new();
        loop {
            let (range_start, _) = self.parse_int("range start")?;
            let end = if self.peek_ident("to") {
                self.bump();
                if self.peek_ident("max") {
                    self.bump();
                    i64::MAX
                } else {
                    self.parse_int("range end")?.0
                }
            } else {
                range_start
            };
            ranges.push(TagRange {
                start: range_start,
                end,
            });
            if self.peek_is_symbol(',') {
                self.bump();
            } else {
                break;
            }
        }
        Ok(ranges)
    }

    fn parse_option_decl(&mut self) -> Result<OptionDecl, ParseError> {
        let start = self.raw_pos();
        self.expect_ident("option")?;
        let name = self.parse_option_name()?;
        self.expect_symbol('=')?;
        let value = self.parse_option_value()?;
        self.expect_symbol(';')?;
        Ok(OptionDecl {
            name,
            value,
            span: self.span_from(start),
        })
    }

    fn parse_bracket_options(&mut self) -> Result<Vec<OptionDecl>, ParseError> {
        self.expect_symbol('[')?;
        let mut options = Vec::new();
        loop {
            let start = self.raw_pos();
            let name = self.parse_option_name()?;
            self.expect_symbol('=')?;
            let value = self.parse_option_value()?;
            options.push(OptionDecl {
                name,
                value,
                span: self.span_from(start),
            });
            if self.peek_is_symbol(',') {
                self.bump();
            } else {
                break;
            }
        }
        self.expect_symbol(']')?;
        Ok(options)
    }

    fn parse_option_name(&mut self) -> Result<String, ParseError> {
        let mut name = String::new();
        loop {
            if self.peek_is_symbol('(') {
                self.bump();
                name.push('(');
                if self.peek_is_symbol('.') {
                    self.bump();
                    name.push('.');
                }
                name.push_str(&self.parse_full_ident()?);
                self.expect_symbol(')')?;
                name.push(')');
            } else {
                let (part, _) = self.expect_any_ident("option name")?;
                name.push_str(&part);
            }
            if self.peek_is_symbol('.') {
                self.bump();
                name.push('.');
            } else {
                break;
            }
        }
        Ok(name)
    }

    fn parse_option_value(&mut self) -> Result<OptionValue, ParseError> {
        let Some(tok) = self.peek() else {
            return Err(self.err_here("expected option value"));
        };
        match tok.kind {
            TokenKind::StrLit => {
                let mut value = String::new();
                // Adjacent string literals concatenate.
                while self.peek().is_some_and(|t| t.kind == TokenKind::StrLit) {
                    let tok = self.expect_kind(TokenKind::StrLit, "string")?;
                    if !value.is_empty() {
                        value.push(' ');
                    }
                    value.push_str(&tok.text);
                }
                Ok(OptionValue::Str(value))
            }
            TokenKind::IntLit => {
                let (n, _) = self.parse_int("option value")?;
                Ok(OptionValue::Int(n))
            }
            TokenKind::FloatLit => {
                let text = tok.text.clone();
                self.bump();
                Ok(OptionValue::Float(text))
            }
            TokenKind::Ident => {
                let (ident, _) = self.expect_any_ident("option value")?;
                Ok(OptionValue::Ident(ident))
            }
            TokenKind::Symbol if tok.is_symbol('-') || tok.is_symbol('+') => {
                let negative = tok.is_symbol('-');
                self.bump();
                let Some(tok) = self.peek() else {
                    return Err(self.err_here("expected number after sign"));
                };
                match tok.kind {
                    TokenKind::IntLit => {
                        let (n, _) = self.parse_int("option value")?;
                        Ok(OptionValue::Int(if negative { -n } else { n }))
                    }
                    TokenKind::FloatLit => {
                        let text = tok.text.clone();
                        self.bump();
                        let sign = if negative { "-" } else { "+" };
                        Ok(OptionValue::Float(format!("{sign}{text}")))
                    }
                    _ => Err(self.err_at(tok, "expected number after sign")),
                }
            }
            TokenKind::Symbol if tok.is_symbol('{') => {
                let open_raw = self.raw_pos();
                self.bump();
                let mut depth = 1usize;
                while depth > 0 {
                    let Some(tok) = self.peek() else {
                        return Err(self.err_here("unterminated aggregate option value"));
                    };
                    if tok.is_symbol('{') {
                        depth += 1;
                    } else if tok.is_symbol('}') {
                        depth -= 1;
                    }
                    self.bump();
                }
                let text: String = self.stream.tokens()[open_raw..=self.last_raw]
                    .iter()
                    .map(|t| t.text.as_str())
                    .collect();
                Ok(OptionValue::Aggregate(text))
            }
            _ => Err(self.err_at(tok, format!("unexpected option value {:?}", tok.text))),
        }
    }

    fn parse_full_ident(&mut self) -> Result<String, ParseError> {
        let (mut name, _) = self.expect_any_ident("identifier")?;
        while self.peek_is_symbol('.') {
            self.bump();
            let (part, _) = self.expect_any_ident("identifier")?;
            name.push('.');
            name.push_str(&part);
        }
        Ok(name)
    }

    /// A possibly leading-dot-qualified dotted type name.
    fn parse_type_name(&mut self) -> Result<String, ParseError> {
        let mut name = String::new();
        if self.peek_is_symbol('.') {
            self.bump();
            name.push('.');
        }
        name.push_str(&self.parse_full_ident()?);
        Ok(name)
    }

    fn parse_int(&mut self, what: &str) -> Result<(i64, usize), ParseError> {
        let negative = if self.peek_is_symbol('-') {
            self.bump();
            true
        } else {
            false
        };
        let Some(tok) = self.peek() else {
            return Err(self.err_here(format!("expected {what}")));
        };
        if tok.kind != TokenKind::IntLit {
            return Err(self.err_at(tok, format!("expected {what}, found {:?}", tok.text)));
        }
        let text = tok.text.clone();
        let raw = self.raw_pos();
        self.bump();
        let value = parse_int_text(&text)
            .ok_or_else(|| self.err_here(format!("malformed {what} {text:?}")))?;
        Ok((if negative { -value } else { value }, raw))
    }

    // Token plumbing.

    fn peek(&self) -> Option<&'a Token> {
        self.stream.significant(self.pos)
    }

    fn peek_ident(&self, text: &str) -> bool {
        self.peek()
            .is_some_and(|t| t.kind == TokenKind::Ident && t.text == text)
    }

    fn peek_is_symbol(&self, c: char) -> bool {
        self.peek().is_some_and(|t| t.is_symbol(c))
    }

    fn peek_nth_is_symbol(&self, n: usize, c: char) -> bool {
        self.stream
            .significant(self.pos + n)
            .is_some_and(|t| t.is_symbol(c))
    }

    fn raw_pos(&self) -> usize {
        self.stream
            .significant_index(self.pos)
            .unwrap_or(self.stream.tokens().len())
    }

    fn bump(&mut self) {
        if let Some(raw) = self.stream.significant_index(self.pos) {
            self.last_raw = raw;
            self.pos += 1;
        }
    }

    fn span_from(&self, start_raw: usize) -> Span {
        Span::new(start_raw, self.last_raw + 1)
    }

    fn expect_symbol(&mut self, c: char) -> Result<(), ParseError> {
        match self.peek() {
            Some(tok) if tok.is_symbol(c) => {
                self.bump();
                Ok(())
            }
            Some(tok) => Err(self.err_at(tok, format!("expected {c:?}, found {:?}", tok.text))),
            None => Err(self.err_here(format!("expected {c:?}, found end of file"))),
        }
    }

    fn expect_ident(&mut self, keyword: &str) -> Result<(), ParseError> {
        match self.peek() {
            Some(tok) if tok.kind == TokenKind::Ident && tok.text == keyword => {
                self.bump();
                Ok(())
            }
            Some(tok) => Err(self.err_at(
                tok,
                format!("expected {keyword:?}, found {:?}", tok.text),
            )),
            None => Err(self.err_here(format!("expected {keyword:?}, found end of file"))),
        }
    }

    fn expect_any_ident(&mut self, what: &str) -> Result<(String, usize), ParseError> {
        match self.peek() {
            Some(tok) if tok.kind == TokenKind::Ident => {
                let text = tok.text.clone();
                let raw = self.raw_pos();
                self.bump();
                Ok((text, raw))
            }
            Some(tok) => Err(self.err_at(tok, format!("expected {what}, found {:?}", tok.text))),
            None => Err(self.err_here(format!("expected {what}, found end of file"))),
        }
    }

    fn expect_kind(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        match self.peek() {
            Some(tok) if tok.kind == kind => {
                let tok = tok.clone();
                self.bump();
                Ok(tok)
            }
            Some(tok) => Err(self.err_at(tok, format!("expected {what}, found {:?}", tok.text))),
            None => Err(self.err_here(format!("expected {what}, found end of file"))),
        }
    }

    fn err_at(&self, tok: &Token, message: impl Into<String>) -> ParseError {
        ParseError::syntax(self.file, tok.location.line, tok.location.column, message)
    }

    fn err_here(&self, message: impl Into<String>) -> ParseError {
        match self.peek() {
            Some(tok) => {
                ParseError::syntax(self.file, tok.location.line, tok.location.column, message)
            }
            None => {
                let (line, column) = self
                    .stream
                    .tokens()
                    .last()
                    .map(|t| (t.location.line, t.location.column))
                    .unwrap_or((1, 1));
                ParseError::syntax(self.file, line, column, message)
            }
        }
    }
}

fn parse_int_text(text: &str) -> Option<i64> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else if text.len() > 1 && text.starts_with('0') {
        i64::from_str_radix(text, 8).ok()
    } else {
        text.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_src(src: &str) -> File {
        let stream = lex("test.proto", src).unwrap();
        parse("test.proto", &stream).unwrap()
    }

    #[test]
    fn parses_a_proto3_file() {
        let file = parse_src(
            r#"syntax = "proto3";

package uber.trip.v1;

import "google/protobuf/timestamp.proto";
import public "other.proto";

option java_package = "com.uber.trip.v1";

message Trip {
  string id = 1;
  repeated Leg legs = 2;
  map<string, int64> counters = 3;
  reserved 4, 6 to 8;
  reserved "old_name";

  oneof payment {
    string card_token = 9;
    bytes cash_receipt = 10;
  }

  message Leg {
    string start = 1;
  }

  enum Status {
    STATUS_INVALID = 0;
    STATUS_ACTIVE = 1;
  }
}

service TripService {
  rpc GetTrip(GetTripRequest) returns (GetTripResponse);
  rpc WatchTrips(stream WatchRequest) returns (stream WatchResponse) {
    option deadline = "30s";
  }
}

message GetTripRequest {}
message GetTripResponse {}
message WatchRequest {}
message WatchResponse {}
"#,
        );

        assert_eq!(file.syntax, Syntax::Proto3);
        assert_eq!(file.package.as_ref().unwrap().name, "uber.trip.v1");
        assert_eq!(file.imports.len(), 2);
        assert_eq!(file.imports[1].kind, ImportKind::Public);
        assert_eq!(file.options.len(), 1);

        let trip = file.arena.message(file.top_level[0]).unwrap();
        assert_eq!(trip.name, "Trip");
        let fields: Vec<_> = trip.fields().collect();
        assert_eq!(fields.len(), 3);
        let counters = file.arena.field(fields[2]).unwrap();
        assert!(matches!(counters.field_type, FieldType::Map { .. }));
        assert_eq!(trip.reserved_ranges().count(), 2);
        assert_eq!(trip.reserved_names().count(), 1);

        let service_id = file.services().next().unwrap();
        let service = file.arena.service(service_id).unwrap();
        let rpcs: Vec<_> = service.rpcs().collect();
        assert_eq!(rpcs.len(), 2);
        let watch = file.arena.rpc(rpcs[1]).unwrap();
        assert!(watch.request_streaming);
        assert!(watch.response_streaming);
        assert_eq!(watch.options.len(), 1);
    }

    #[test]
    fn parent_back_references() {
        let file = parse_src(
            "syntax = \"proto3\";\nmessage Outer { message Inner { string a = 1; } }\n",
        );
        let outer_id = file.top_level[0];
        let outer = file.arena.message(outer_id).unwrap();
        let inner_id = match outer.elements[0] {
            MessageElement::Message(id) => id,
            _ => panic!("expected nested message"),
        };
        assert_eq!(file.arena.get(inner_id).parent, Some(outer_id));
        let inner = file.arena.message(inner_id).unwrap();
        let field_id = inner.fields().next().unwrap();
        assert_eq!(file.arena.get(field_id).parent, Some(inner_id));
        assert_eq!(file.arena.get(outer_id).parent, None);
    }

    #[test]
    fn proto2_groups_and_extensions() {
        let file = parse_src(
            r#"syntax = "proto2";
message Legacy {
  required int32 id = 1;
  optional group Details = 2 {
    optional string note = 1;
  }
  extensions 100 to max;
}
extend Legacy {
  optional string extra = 100;
}
"#,
        );
        let legacy = file.arena.message(file.top_level[0]).unwrap();
        let fields: Vec<_> = legacy.fields().collect();
        assert_eq!(fields.len(), 2);
        let group = file.arena.field(fields[1]).unwrap();
        assert!(group.group.is_some());
        let body = file.arena.message(group.group.unwrap()).unwrap();
        assert_eq!(body.fields().count(), 1);
        let ext = legacy
            .elements
            .iter()
            .find_map(|e| match e {
                MessageElement::Extensions(x) => Some(x),
                _ => None,
            })
            .unwrap();
        assert_eq!(ext.ranges[0].start, 100);
        assert_eq!(ext.ranges[0].end, i64::MAX);
    }

    #[test]
    fn custom_options_with_parenthesized_paths() {
        let file = parse_src(
            r#"syntax = "proto3";
option (my.custom).nested = "x";
message M {
  string a = 1 [(validate.rules).string.min_len = 1, deprecated = true];
}
"#,
        );
        assert_eq!(file.options[0].name, "(my.custom).nested");
        let m = file.arena.message(file.top_level[0]).unwrap();
        let field = file.arena.field(m.fields().next().unwrap()).unwrap();
        assert_eq!(field.options.len(), 2);
        assert_eq!(field.options[0].name, "(validate.rules).string.min_len");
    }

    #[test]
    fn aggregate_option_values() {
        let file = parse_src(
            "syntax = \"proto3\";\nmessage M { string a = 1 [(foo) = { bar: 1 baz: \"x\" }]; }\n",
        );
        let m = file.arena.message(file.top_level[0]).unwrap();
        let field = file.arena.field(m.fields().next().unwrap()).unwrap();
        match &field.options[0].value {
            OptionValue::Aggregate(text) => assert!(text.contains("bar: 1")),
            other => panic!("expected aggregate, got {other:?}"),
        }
    }

    #[test]
    fn missing_syntax_defaults_to_proto2() {
        let file = parse_src("message M { optional string a = 1; }\n");
        assert_eq!(file.syntax, Syntax::Proto2);
        assert!(file.syntax_span.is_none());
    }

    #[test]
    fn negative_enum_values() {
        let file = parse_src(
            "syntax = \"proto2\";\nenum Signed { NEGATIVE = -1; ZERO = 0; }\n",
        );
        let e = file.arena.enum_decl(file.top_level[0]).unwrap();
        let values: Vec<_> = e.values().collect();
        assert_eq!(values[0].number, -1);
    }

    #[test]
    fn syntax_errors_carry_location() {
        let stream = lex("bad.proto", "syntax = \"proto3\";\nmessage {}\n").unwrap();
        let err = parse("bad.proto", &stream).unwrap_err();
        let failure = err.to_failure();
        assert_eq!(failure.line, 2);
        assert!(failure.message.contains("message name"));
    }
}
