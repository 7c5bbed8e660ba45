//! The per-declaration checking entry point.
//!
//! `TypeChecker::check_program` walks the top-level declarations in
//! order. Each declaration is checked independently: a typed error is
//! caught here, recorded, and the declaration marked failed without
//! halting the batch, so the caller gets a full error list. After every
//! declaration is processed, any named compound type that was
//! referenced but never defined is a compilation-fatal error.

use log::debug;

use crate::ast::ast::{AstNode, NodeKind};
use crate::environment::environment::TypeEnvironment;
use crate::errors::errors::{Error, ErrorImpl};
use crate::type_checker::context::{CompilationContext, CompilationSettings};
use crate::type_checker::decl;
use crate::type_checker::semantic_node::SemanticNode;
use crate::type_checker::stmt;
use crate::types::types::Type;
use crate::Position;

pub struct TypeChecker {
    pub context: CompilationContext,
}

impl TypeChecker {
    pub fn new(environment: TypeEnvironment) -> Self {
        TypeChecker::with_settings(environment, CompilationSettings::default())
    }

    pub fn with_settings(environment: TypeEnvironment, settings: CompilationSettings) -> Self {
        TypeChecker {
            context: CompilationContext::new(environment, settings),
        }
    }

    /// Checks a whole compilation unit. Returns the typed mirror of
    /// every declaration and whether the unit as a whole checked clean.
    pub fn check_program(&mut self, declarations: &[AstNode]) -> (Vec<SemanticNode>, bool) {
        let mut output = Vec::new();
        let mut success = true;

        for declaration in declarations {
            let (node, resolved) = self.check_declaration(declaration);
            if !resolved {
                success = false;
            }
            output.push(node);
        }

        if !self.context.environment.no_type_errors() {
            let names = self
                .context
                .environment
                .unresolved_reference_names()
                .join(", ");
            self.context.errors.push(Error::new(
                ErrorImpl::UnresolvedForwardReferences { names },
                Position::null(),
            ));
            success = false;
        }

        (output, success)
    }

    /// Checks one top-level declaration, catching definite rule
    /// violations at this boundary.
    pub fn check_declaration(&mut self, declaration: &AstNode) -> (SemanticNode, bool) {
        let mut node = SemanticNode::from_ast(declaration);
        match self.dispatch(declaration, &mut node) {
            Ok(true) => (node, true),
            Ok(false) => {
                node.failure_point = true;
                (node, false)
            }
            Err(error) => {
                debug!(
                    "declaration failed: {} ({})",
                    error.get_error_name(),
                    error.get_error()
                );
                self.context.errors.push(error);
                node.failure_point = true;
                (node, false)
            }
        }
    }

    fn dispatch(
        &mut self,
        declaration: &AstNode,
        node: &mut SemanticNode,
    ) -> Result<bool, Error> {
        match declaration.kind {
            NodeKind::ClassDefinition => {
                if node.declared_type.is_none() {
                    let id = self.context.environment.define_class_from_ast(declaration)?;
                    node.declared_type = Some(Type::Class(id));
                }
                decl::check_class_definition(&mut self.context, node)
            }

            NodeKind::FunctionDefinition => {
                // registered before the body so recursion resolves
                let return_type = stmt::declared_type_of(&self.context, node)?;
                let name = stmt::identifier_of(node)?;
                let parameters = stmt::parameter_types_of(&self.context, node)?;
                self.context.tracker.add_function(
                    &name,
                    Type::FunctionPointer {
                        return_type: Box::new(return_type),
                        parameters,
                    },
                    true,
                )?;
                decl::check_function_definition(&mut self.context, node, None)
            }

            NodeKind::Declarations => {
                stmt::determine_declarations(&mut self.context, node, true)
            }

            NodeKind::FunctionDescription => {
                let return_type = stmt::declared_type_of(&self.context, node)?;
                let name = stmt::identifier_of(node)?;
                let parameters = stmt::parameter_types_of(&self.context, node)?;
                let pointer = Type::FunctionPointer {
                    return_type: Box::new(return_type),
                    parameters,
                };
                self.context.tracker.add_function(&name, pointer.clone(), false)?;
                node.set_type(pointer);
                Ok(true)
            }

            NodeKind::Typedef => {
                let definition = self.context.environment.get_type(declaration.child(0))?;
                let name = declaration.token_value().unwrap_or_default().to_string();
                self.context
                    .environment
                    .add_type_definition(definition, &name)?;
                node.set_type(Type::void());
                Ok(true)
            }

            NodeKind::NamespaceBlock => {
                let name = declaration.token_value().unwrap_or_default().to_string();
                self.context.environment.push_namespace(&name);
                let mut resolved = true;
                for (index, child) in declaration.children.iter().enumerate() {
                    match self.dispatch(child, node.child_mut(index)) {
                        Ok(true) => {}
                        Ok(false) => resolved = false,
                        Err(error) => {
                            self.context.errors.push(error);
                            resolved = false;
                        }
                    }
                }
                self.context.environment.pop_namespace();
                Ok(resolved)
            }

            NodeKind::UsingDirective => {
                let path = declaration.token_value().unwrap_or_default().to_string();
                self.context.environment.use_namespace(&path);
                Ok(true)
            }

            NodeKind::Empty => Ok(true),

            _ => Ok(false),
        }
    }
}
