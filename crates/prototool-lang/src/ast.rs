//! Arena-backed AST for proto2/proto3 files.
//!
//! Nodes live in a single [`Arena`] and refer to each other by index,
//! parents included, so the tree has no ownership cycles and is freed
//! in bulk with the arena. Spans are raw indices into the file's full
//! token stream (trivia included), which lets consumers map any node
//! back to exact source bytes and attached comments.

pub type NodeId = usize;

/// Half-open range of raw token indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Proto2,
    Proto3,
}

impl Syntax {
    pub fn as_str(self) -> &'static str {
        match self {
            Syntax::Proto2 => "proto2",
            Syntax::Proto3 => "proto3",
        }
    }
}

/// A parsed file. Top-level declarations are node ids; everything
/// else hangs off the arena.
#[derive(Debug)]
pub struct File {
    /// Display name used in diagnostics.
    pub name: String,
    pub syntax: Syntax,
    /// Raw token index of the `syntax` keyword, if declared.
    pub syntax_span: Option<Span>,
    pub package: Option<PackageDecl>,
    pub imports: Vec<ImportDecl>,
    pub options: Vec<OptionDecl>,
    pub top_level: Vec<NodeId>,
    pub arena: Arena,
}

impl File {
    pub fn messages(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.top_level
            .iter()
            .copied()
            .filter(|&id| matches!(self.arena.get(id).kind, NodeKind::Message(_)))
    }

    pub fn enums(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.top_level
            .iter()
            .copied()
            .filter(|&id| matches!(self.arena.get(id).kind, NodeKind::Enum(_)))
    }

    pub fn services(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.top_level
            .iter()
            .copied()
            .filter(|&id| matches!(self.arena.get(id).kind, NodeKind::Service(_)))
    }
}

#[derive(Debug, Clone)]
pub struct PackageDecl {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Plain,
    Public,
    Weak,
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub path: String,
    pub kind: ImportKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct OptionDecl {
    /// Option name exactly as written, including any parenthesized
    /// custom option path, e.g. `(gogoproto.marshaler)` or
    /// `java_package`.
    pub name: String,
    pub value: OptionValue,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum OptionValue {
    /// String literal(s) exactly as written, quotes included;
    /// adjacent literals are joined with one space.
    Str(String),
    /// `true`, `false`, or an enum constant.
    Ident(String),
    Int(i64),
    /// Raw text of the literal.
    Float(String),
    /// Raw text of a `{ ... }` aggregate.
    Aggregate(String),
}

/// All nodes carry their parent id; `None` marks a top-level node.
#[derive(Debug)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub span: Span,
    pub kind: NodeKind,
}

#[derive(Debug)]
pub enum NodeKind {
    Message(Message),
    Enum(EnumDecl),
    Service(Service),
    Rpc(Rpc),
    Field(Field),
    Oneof(Oneof),
    Extend(Extend),
}

#[derive(Debug, Default)]
pub struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    pub fn alloc(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            parent,
            span: Span::new(0, 0),
            kind,
        });
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate()
    }

    pub fn message(&self, id: NodeId) -> Option<&Message> {
        match &self.get(id).kind {
            NodeKind::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn enum_decl(&self, id: NodeId) -> Option<&EnumDecl> {
        match &self.get(id).kind {
            NodeKind::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn service(&self, id: NodeId) -> Option<&Service> {
        match &self.get(id).kind {
            NodeKind::Service(s) => Some(s),
            _ => None,
        }
    }

    pub fn field(&self, id: NodeId) -> Option<&Field> {
        match &self.get(id).kind {
            NodeKind::Field(f) => Some(f),
            _ => None,
        }
    }

    pub fn rpc(&self, id: NodeId) -> Option<&Rpc> {
        match &self.get(id).kind {
            NodeKind::Rpc(r) => Some(r),
            _ => None,
        }
    }

    pub fn oneof(&self, id: NodeId) -> Option<&Oneof> {
        match &self.get(id).kind {
            NodeKind::Oneof(o) => Some(o),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Message {
    pub name: String,
    /// Raw token index of the name.
    pub name_token: usize,
    /// Body elements in source order.
    pub elements: Vec<MessageElement>,
}

impl Message {
    pub fn fields<'a>(&'a self) -> impl Iterator<Item = NodeId> + 'a {
        self.elements.iter().filter_map(|e| match e {
            MessageElement::Field(id) => Some(*id),
            _ => None,
        })
    }

    pub fn reserved_ranges(&self) -> impl Iterator<Item = &TagRange> {
        self.elements
            .iter()
            .filter_map(|e| match e {
                MessageElement::Reserved(r) => Some(r.ranges.iter()),
                _ => None,
            })
            .flatten()
    }

    pub fn reserved_names(&self) -> impl Iterator<Item = &String> {
        self.elements
            .iter()
            .filter_map(|e| match e {
                MessageElement::Reserved(r) => Some(r.names.iter()),
                _ => None,
            })
            .flatten()
    }
}

#[derive(Debug)]
pub enum MessageElement {
    Field(NodeId),
    Oneof(NodeId),
    Message(NodeId),
    Enum(NodeId),
    Extend(NodeId),
    Option(OptionDecl),
    Reserved(ReservedDecl),
    Extensions(ExtensionsDecl),
}

/// Inclusive tag range; `end` is `i64::MAX` for `to max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagRange {
    pub start: i64,
    pub end: i64,
}

impl TagRange {
    pub fn contains(&self, n: i64) -> bool {
        n >= self.start && n <= self.end
    }
}

#[derive(Debug, Clone)]
pub struct ReservedDecl {
    pub ranges: Vec<TagRange>,
    pub names: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ExtensionsDecl {
    pub ranges: Vec<TagRange>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLabel {
    None,
    Optional,
    Required,
    Repeated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// Scalar or named type, exactly as written (possibly dotted or
    /// leading-dot qualified).
    Named(String),
    Map { key: String, value: String },
}

impl FieldType {
    pub fn is_scalar(&self) -> bool {
        match self {
            FieldType::Named(n) => is_scalar_type(n),
            FieldType::Map { .. } => false,
        }
    }
}

pub fn is_scalar_type(name: &str) -> bool {
    matches!(
        name,
        "double"
            | "float"
            | "int32"
            | "int64"
            | "uint32"
            | "uint64"
            | "sint32"
            | "sint64"
            | "fixed32"
            | "fixed64"
            | "sfixed32"
            | "sfixed64"
            | "bool"
            | "string"
            | "bytes"
    )
}

#[derive(Debug)]
pub struct Field {
    pub label: FieldLabel,
    pub field_type: FieldType,
    pub name: String,
    pub name_token: usize,
    pub number: i64,
    pub number_token: usize,
    pub options: Vec<OptionDecl>,
    /// Body message for proto2 `group` fields.
    pub group: Option<NodeId>,
}

#[derive(Debug)]
pub struct Oneof {
    pub name: String,
    pub name_token: usize,
    pub fields: Vec<NodeId>,
    pub options: Vec<OptionDecl>,
}

#[derive(Debug)]
pub struct EnumDecl {
    pub name: String,
    pub name_token: usize,
    pub elements: Vec<EnumElement>,
}

impl EnumDecl {
    pub fn values(&self) -> impl Iterator<Item = &EnumValue> {
        self.elements.iter().filter_map(|e| match e {
            EnumElement::Value(v) => Some(v),
            _ => None,
        })
    }
}

#[derive(Debug)]
pub enum EnumElement {
    Value(EnumValue),
    Option(OptionDecl),
    Reserved(ReservedDecl),
}

#[derive(Debug, Clone)]
pub struct EnumValue {
    pub name: String,
    pub name_token: usize,
    pub number: i64,
    pub number_token: usize,
    pub options: Vec<OptionDecl>,
    pub span: Span,
}

#[derive(Debug)]
pub struct Service {
    pub name: String,
    pub name_token: usize,
    pub elements: Vec<ServiceElement>,
}

impl Service {
    pub fn rpcs<'a>(&'a self) -> impl Iterator<Item = NodeId> + 'a {
        self.elements.iter().filter_map(|e| match e {
            ServiceElement::Rpc(id) => Some(*id),
            _ => None,
        })
    }
}

#[derive(Debug)]
pub enum ServiceElement {
    Rpc(NodeId),
    Option(OptionDecl),
}

#[derive(Debug)]
pub struct Rpc {
    pub name: String,
    pub name_token: usize,
    pub request_type: String,
    pub request_streaming: bool,
    pub response_type: String,
    pub response_streaming: bool,
    pub options: Vec<OptionDecl>,
}

#[derive(Debug)]
pub struct Extend {
    /// The extended type name as written.
    pub extendee: String,
    pub fields: Vec<NodeId>,
}
