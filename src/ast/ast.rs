//! Untyped syntax tree definitions.
//!
//! The tree is produced by an external parser. Every node carries a kind
//! tag, a child list, and an optional token for diagnostics; nodes whose
//! declared type was already computed while building the tree (casts,
//! declarations, class definitions) additionally carry a `Type`.
//!
//! The checker never mutates this tree; it mirrors it into a
//! `SemanticNode` tree that carries resolved types, lvalue flags, and
//! compilation tags.

use crate::types::types::Type;
use crate::{Position, Token};

/// Node kinds for every construct the checker understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    // expressions
    Literal,
    StringLiteral,
    True,
    False,
    Sizeof,
    Identifier,
    BinaryOp,
    UnaryOp,
    PostfixOp,
    Dereference,
    AddressOf,
    Cast,
    ArrayReference,
    FunctionCall,
    FieldGet,
    MethodCall,
    ConstructorCall,
    Ternary,
    Sequence,
    Super,
    Empty,

    // statements
    Assignment,
    Declarations,
    Declaration,
    InitializedDeclaration,
    FunctionDescription,
    CompoundStatement,
    If,
    While,
    DoWhile,
    For,
    Return,

    // declarations
    FunctionDefinition,
    ConstructorDefinition,
    ConstructorChain,
    ClassDefinition,
    ClassLevelDeclaration,
    ParameterList,
    Inherit,
    Virtual,
    Typedef,
    NamespaceBlock,
    UsingDirective,

    // type syntax
    TypeName,
    PointerTo,
    ArrayOf,
    QualifiersAndSpecifiers,
    Specifier,
    Qualifier,
    CompoundTypeReference,
}

/// A node of the untyped syntax tree.
#[derive(Debug, Clone)]
pub struct AstNode {
    pub kind: NodeKind,
    pub token: Option<Token>,
    pub children: Vec<AstNode>,
    pub declared_type: Option<Type>,
}

impl AstNode {
    pub fn new(kind: NodeKind) -> Self {
        AstNode {
            kind,
            token: None,
            children: Vec::new(),
            declared_type: None,
        }
    }

    pub fn with_token(mut self, token: Token) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_children(mut self, children: Vec<AstNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_type(mut self, declared_type: Type) -> Self {
        self.declared_type = Some(declared_type);
        self
    }

    pub fn empty() -> Self {
        AstNode::new(NodeKind::Empty)
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        AstNode::new(NodeKind::Identifier).with_token(Token::synthetic(name))
    }

    pub fn literal(image: impl Into<String>) -> Self {
        AstNode::new(NodeKind::Literal).with_token(Token::synthetic(image))
    }

    pub fn sequence(children: Vec<AstNode>) -> Self {
        AstNode::new(NodeKind::Sequence).with_children(children)
    }

    /// A declaration node with its type already resolved, as the parser
    /// attaches them.
    pub fn declaration(declared_type: Type, name: impl Into<String>) -> Self {
        AstNode::new(NodeKind::Declaration)
            .with_type(declared_type)
            .with_children(vec![AstNode::identifier(name)])
    }

    pub fn token_value(&self) -> Option<&str> {
        self.token.as_ref().map(|t| t.value.as_str())
    }

    pub fn child(&self, index: usize) -> &AstNode {
        &self.children[index]
    }

    pub fn find_child(&self, kind: NodeKind) -> Option<&AstNode> {
        self.children.iter().find(|c| c.kind == kind)
    }

    pub fn has_child(&self, kind: NodeKind) -> bool {
        self.find_child(kind).is_some()
    }

    pub fn children_of(&self, kind: NodeKind) -> Vec<&AstNode> {
        self.children.iter().filter(|c| c.kind == kind).collect()
    }

    /// First token reachable from this node, depth first. Used to anchor
    /// diagnostics.
    pub fn find_first_token(&self) -> Option<&Token> {
        if let Some(token) = &self.token {
            return Some(token);
        }
        self.children.iter().find_map(|c| c.find_first_token())
    }

    pub fn position(&self) -> Position {
        self.find_first_token()
            .map(|t| t.position())
            .unwrap_or_else(Position::null)
    }

    pub fn is_empty(&self) -> bool {
        self.kind == NodeKind::Empty
    }
}
