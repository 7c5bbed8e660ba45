//! Utility macros for the semantic core.
//!
//! This module defines helper macros used when synthesizing syntax:
//!
//! - `MK_ID!` - Creates an identifier node
//! - `MK_ASSIGN!` - Creates a plain assignment node
//! - `MK_FIELD_GET!` - Creates a field access node
//! - `MK_DEREF!` - Creates a dereference node
//!
//! These macros reduce boilerplate in the object model's generated
//! method bodies (super trampolines, the init method) and in tests.

/// Creates an identifier node from a string.
///
/// # Example
///
/// ```ignore
/// let node = MK_ID!("output");
/// ```
#[macro_export]
macro_rules! MK_ID {
    ($name:expr) => {
        $crate::ast::ast::AstNode::identifier($name)
    };
}

/// Creates a plain (`=`) assignment node.
///
/// # Example
///
/// ```ignore
/// let node = MK_ASSIGN!(MK_ID!("output"), MK_ID!("old"));
/// ```
#[macro_export]
macro_rules! MK_ASSIGN {
    ($lhs:expr, $rhs:expr) => {
        $crate::ast::ast::AstNode::new($crate::ast::ast::NodeKind::Assignment)
            .with_token($crate::Token::synthetic("="))
            .with_children(vec![$lhs, $rhs])
    };
}

/// Creates a field access node (`object.field`).
///
/// # Example
///
/// ```ignore
/// let node = MK_FIELD_GET!(MK_DEREF!(MK_ID!("this")), "vtable");
/// ```
#[macro_export]
macro_rules! MK_FIELD_GET {
    ($object:expr, $field:expr) => {
        $crate::ast::ast::AstNode::new($crate::ast::ast::NodeKind::FieldGet)
            .with_children(vec![$object, $crate::ast::ast::AstNode::identifier($field)])
    };
}

/// Creates a dereference node (`*expression`).
#[macro_export]
macro_rules! MK_DEREF {
    ($expression:expr) => {
        $crate::ast::ast::AstNode::new($crate::ast::ast::NodeKind::Dereference)
            .with_children(vec![$expression])
    };
}
