//! The typed mirror of the syntax tree.
//!
//! Checking does not mutate the parser's tree; it builds a
//! `SemanticNode` tree of the same shape in which every node
//! additionally carries a resolved type, an lvalue flag, and the
//! compilation tags that communicate non-type decisions to the code
//! generator.

use crate::ast::ast::{AstNode, NodeKind};
use crate::type_checker::tags::CompilationTag;
use crate::types::types::Type;
use crate::{Position, Token};

#[derive(Debug, Clone)]
pub struct SemanticNode {
    pub kind: NodeKind,
    pub token: Option<Token>,
    pub declared_type: Option<Type>,
    pub children: Vec<SemanticNode>,

    pub resolved_type: Option<Type>,
    pub lvalue: bool,
    pub tags: Vec<CompilationTag>,
    pub failure_point: bool,
}

impl SemanticNode {
    pub fn from_ast(ast: &AstNode) -> Self {
        SemanticNode {
            kind: ast.kind,
            token: ast.token.clone(),
            declared_type: ast.declared_type.clone(),
            children: ast.children.iter().map(SemanticNode::from_ast).collect(),
            resolved_type: None,
            lvalue: false,
            tags: Vec::new(),
            failure_point: false,
        }
    }

    pub fn set_type(&mut self, resolved: Type) {
        self.resolved_type = Some(resolved);
    }

    pub fn resolved_type(&self) -> Option<&Type> {
        self.resolved_type.as_ref()
    }

    pub fn is_typed(&self) -> bool {
        self.resolved_type.is_some()
    }

    pub fn add_tag(&mut self, tag: CompilationTag) {
        self.tags.push(tag);
    }

    pub fn has_tag(&self, tag: &CompilationTag) -> bool {
        self.tags.contains(tag)
    }

    pub fn token_value(&self) -> Option<&str> {
        self.token.as_ref().map(|t| t.value.as_str())
    }

    pub fn child(&self, index: usize) -> &SemanticNode {
        &self.children[index]
    }

    pub fn child_mut(&mut self, index: usize) -> &mut SemanticNode {
        &mut self.children[index]
    }

    pub fn find_child(&self, kind: NodeKind) -> Option<&SemanticNode> {
        self.children.iter().find(|c| c.kind == kind)
    }

    pub fn find_child_mut(&mut self, kind: NodeKind) -> Option<&mut SemanticNode> {
        self.children.iter_mut().find(|c| c.kind == kind)
    }

    pub fn has_child(&self, kind: NodeKind) -> bool {
        self.find_child(kind).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.kind == NodeKind::Empty
    }

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

    /// Anchor token of the innermost node marked as a failure point,
    /// used when converting a panic-free error into a diagnostic.
    pub fn find_failure_token(&self) -> Option<&Token> {
        if self.failure_point {
            if let Some(found) = self
                .children
                .iter()
                .find_map(|c| c.find_failure_token())
            {
                return Some(found);
            }
            return self.find_first_token();
        }
        self.children.iter().find_map(|c| c.find_failure_token())
    }
}
