//! Arena-backed syntax tree.
//!
//! Nodes live in a single `Vec` owned by [`Ast`] and refer to their
//! children by [`NodeId`]. The parser pushes children before parents,
//! so a well-formed tree attaches every id to exactly one parent.

use std::fmt;

use crate::token::Span;

/// Index of a node inside its [`Ast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Binary operators, displayed as their source symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    BitXor,
}

impl BinaryOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Power => "**",
            Self::Less => "<",
            Self::Greater => ">",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::Equal => "==",
            Self::BitXor => "^",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Negate,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negate => f.write_str("-"),
        }
    }
}

/// What a node is, plus the scalar data that kind carries.
///
/// The doc on each variant lists its children in order; `?` marks an
/// optional child and `*` a repeated one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// `[statement*]`
    Program,
    /// `[path]`
    Package,
    /// `[path]` where the path is a name chain or a string literal.
    Import,
    /// `[Identifier, Parameters, ReturnType?, Block]`
    Function,
    /// `[Parameter*]`
    Parameters,
    /// `[type?]`
    Parameter(String),
    /// `[type]`
    ReturnType,
    /// `[value?]`
    Return,
    /// `[condition, Block, Elif*, Else?]`
    If,
    /// `[condition, Block]`
    Elif,
    /// `[Block]`
    Else,
    /// `[subject, Case*, Default?]`
    Switch,
    /// `[value, Block]`
    Case,
    /// `[Block]`
    Default,
    /// `[Identifier, iterable, Block]`
    For,
    /// `[statement*]`
    Block,
    /// `[target, value]`
    Assign,
    Identifier(String),
    /// Literal text, not validated beyond the lexer's single-dot rule.
    Number(String),
    StringLiteral(String),
    Boolean(bool),
    /// `[lhs, rhs]`
    Binary(BinaryOp),
    /// `[operand]`
    Unary(UnaryOp),
    /// `[start, end]`
    Range,
    /// `[callee, argument*]`
    Call,
    /// `[object]`
    Member(String),
    /// `[inner]`
    Group,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Program => f.write_str("Program"),
            Self::Package => f.write_str("Package"),
            Self::Import => f.write_str("Import"),
            Self::Function => f.write_str("Function"),
            Self::Parameters => f.write_str("Parameters"),
            Self::Parameter(name) => write!(f, "Parameter({name})"),
            Self::ReturnType => f.write_str("ReturnType"),
            Self::Return => f.write_str("Return"),
            Self::If => f.write_str("If"),
            Self::Elif => f.write_str("Elif"),
            Self::Else => f.write_str("Else"),
            Self::Switch => f.write_str("Switch"),
            Self::Case => f.write_str("Case"),
            Self::Default => f.write_str("Default"),
            Self::For => f.write_str("For"),
            Self::Block => f.write_str("Block"),
            Self::Assign => f.write_str("Assign"),
            Self::Identifier(name) => write!(f, "Identifier({name})"),
            Self::Number(text) => write!(f, "Number({text})"),
            Self::StringLiteral(text) => write!(f, "String({text:?})"),
            Self::Boolean(value) => write!(f, "Boolean({value})"),
            Self::Binary(op) => write!(f, "Binary({op})"),
            Self::Unary(op) => write!(f, "Unary({op})"),
            Self::Range => f.write_str("Range"),
            Self::Call => f.write_str("Call"),
            Self::Member(name) => write!(f, "Member({name})"),
            Self::Group => f.write_str("Group"),
        }
    }
}

/// A single tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<NodeId>,
    /// From the first to the last token consumed for this node.
    pub span: Span,
}

/// Syntax tree produced by the parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ast {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Ast {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
        }
    }

    /// Append a node and return its id.
    pub fn push(&mut self, kind: NodeKind, span: Span, children: Vec<NodeId>) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(Node {
            kind,
            children,
            span,
        });
        id
    }

    /// Append `child` to `parent`'s child list.
    ///
    /// No acyclicity check is made: linking a node under one of its own
    /// descendants produces a cyclic graph. The printer tolerates that;
    /// the parser never does it.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(parent.index()) {
            node.children.push(child);
        }
    }

    /// Drop every node created after the first `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
    }

    pub const fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    /// The `Program` node, once parsing has finished.
    #[must_use]
    pub const fn root(&self) -> Option<NodeId> {
        self.root
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// # Panics
    ///
    /// Panics if `id` does not belong to this tree.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    #[must_use]
    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).span
    }

    /// Top-level statements under the root.
    #[must_use]
    pub fn statements(&self) -> &[NodeId] {
        match self.root {
            Some(root) => self.children(root),
            None => &[],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All ids in creation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).filter_map(|index| u32::try_from(index).ok().map(NodeId))
    }
}
