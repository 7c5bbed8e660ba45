/// AST (Abstract Syntax Tree) module
/// Contains all definitions related to the untyped syntax tree the
/// checker consumes
///
/// Submodules:
/// - ast: Node kinds, node structure, and construction helpers
pub mod ast;
