//! Statement checking.
//!
//! `StatementChecker` carries the declared return type of the enclosing
//! function (or the constructor marker) and tracks whether the
//! statement it just checked returns on every path, which the function
//! rule needs for missing-return analysis and the block rule needs for
//! unreachable-code detection.

use log::trace;

use crate::ast::ast::NodeKind;
use crate::errors::errors::{Error, ErrorImpl};
use crate::type_checker::context::CompilationContext;
use crate::type_checker::expr;
use crate::type_checker::semantic_node::SemanticNode;
use crate::type_checker::tags::CompilationTag;
use crate::types::types::Type;

pub struct StatementChecker {
    return_type: Type,
    in_constructor: bool,
    returns: bool,
}

impl StatementChecker {
    pub fn new(return_type: Type) -> Self {
        StatementChecker {
            return_type,
            in_constructor: false,
            returns: false,
        }
    }

    /// Constructor bodies check like void functions, except any valued
    /// return is illegal.
    pub fn for_constructor() -> Self {
        StatementChecker {
            return_type: Type::void(),
            in_constructor: true,
            returns: false,
        }
    }

    pub fn returns(&self) -> bool {
        self.returns
    }

    fn nested(&self) -> StatementChecker {
        StatementChecker {
            return_type: self.return_type.clone(),
            in_constructor: self.in_constructor,
            returns: false,
        }
    }

    pub fn determine_types(
        &mut self,
        ctx: &mut CompilationContext,
        node: &mut SemanticNode,
    ) -> Result<bool, Error> {
        match node.kind {
            NodeKind::Declarations => determine_declarations(ctx, node, false),

            NodeKind::Assignment => determine_assignment(ctx, node),

            // expressions legal in statement position
            NodeKind::MethodCall
            | NodeKind::FunctionCall
            | NodeKind::ConstructorCall
            | NodeKind::PostfixOp
            | NodeKind::UnaryOp => expr::determine_types(ctx, node),

            NodeKind::If => {
                if !expr::determine_types(ctx, node.child_mut(0))? {
                    return Ok(false);
                }
                let mut true_returns = false;
                let mut false_returns = false;

                if !node.child(1).is_empty() {
                    let mut then_checker = self.nested();
                    if !then_checker.determine_types(ctx, node.child_mut(1))? {
                        return Ok(false);
                    }
                    true_returns = then_checker.returns();
                }
                if node.children.len() == 3 && !node.child(2).is_empty() {
                    node.add_tag(CompilationTag::HasElse);
                    let mut else_checker = self.nested();
                    if !else_checker.determine_types(ctx, node.child_mut(2))? {
                        return Ok(false);
                    }
                    false_returns = else_checker.returns();
                }
                if true_returns && false_returns {
                    self.returns = true;
                }
                Ok(true)
            }

            NodeKind::While => {
                if !expr::determine_types(ctx, node.child_mut(0))? {
                    return Ok(false);
                }
                let mut body_checker = self.nested();
                body_checker.determine_types(ctx, node.child_mut(1))
            }

            NodeKind::DoWhile => {
                let mut body_checker = self.nested();
                if !body_checker.determine_types(ctx, node.child_mut(0))? {
                    return Ok(false);
                }
                if body_checker.returns() {
                    self.returns = true;
                }
                expr::determine_types(ctx, node.child_mut(1))
            }

            NodeKind::For => {
                ctx.tracker.push_scope();
                for index in 0..3 {
                    if node.child(index).is_empty() {
                        continue;
                    }
                    let resolved = if node.child(index).kind == NodeKind::Declarations {
                        determine_declarations(ctx, node.child_mut(index), false)?
                    } else {
                        expr::determine_types(ctx, node.child_mut(index))?
                    };
                    if !resolved {
                        ctx.tracker.pop_scope();
                        return Ok(false);
                    }
                }
                let mut body_checker = self.nested();
                let resolved = body_checker.determine_types(ctx, node.child_mut(3))?;
                ctx.tracker.pop_scope();
                Ok(resolved)
            }

            NodeKind::Return => {
                let valued = !node.children.is_empty() && !node.child(0).is_empty();
                if !valued {
                    if self.in_constructor {
                        // a bare return merely leaves the constructor
                    } else if !self.return_type.is_void() {
                        return Err(Error::new(
                            ErrorImpl::IncorrectReturnType {
                                expected: ctx.type_display(&self.return_type),
                                received: String::from("void"),
                            },
                            node.position(),
                        ));
                    }
                    node.add_tag(CompilationTag::VoidReturn);
                } else {
                    if self.in_constructor {
                        return Err(Error::new(
                            ErrorImpl::IllegalReturnInConstructor,
                            node.position(),
                        ));
                    }
                    if !expr::determine_types(ctx, node.child_mut(0))? {
                        return Ok(false);
                    }
                    let value = node.child(0).resolved_type().unwrap().clone();
                    if node.child(0).token_value() == Some("nullptr") {
                        trace!("returning nullptr bypasses the type system");
                    } else if self.return_type.is_void() || !ctx.is(&value, &self.return_type) {
                        return Err(Error::new(
                            ErrorImpl::IncorrectReturnType {
                                expected: ctx.type_display(&self.return_type),
                                received: ctx.type_display(&value),
                            },
                            node.position(),
                        ));
                    }
                }
                self.returns = true;
                Ok(true)
            }

            NodeKind::CompoundStatement => self.check_block(ctx, node, true),

            NodeKind::Empty => Ok(true),

            _ => Err(Error::new(ErrorImpl::IllegalStatement, node.position())),
        }
    }

    /// Checks the statements of a block in order. Statements after one
    /// that returned are unreachable.
    pub fn check_block(
        &mut self,
        ctx: &mut CompilationContext,
        node: &mut SemanticNode,
        new_scope: bool,
    ) -> Result<bool, Error> {
        if new_scope {
            ctx.tracker.push_scope();
        }
        let result = self.check_block_inner(ctx, node);
        if new_scope {
            ctx.tracker.pop_scope();
        }
        result
    }

    fn check_block_inner(
        &mut self,
        ctx: &mut CompilationContext,
        node: &mut SemanticNode,
    ) -> Result<bool, Error> {
        let mut returned = false;
        let mut output = true;
        for child in node.children.iter_mut() {
            if returned {
                return Err(Error::new(ErrorImpl::UnreachableCode, child.position()));
            }
            let mut statement_checker = self.nested();
            if !statement_checker.determine_types(ctx, child)? {
                child.failure_point = true;
                output = false;
            }
            if statement_checker.returns() {
                returned = true;
            }
        }
        if returned {
            self.returns = true;
        }
        Ok(output)
    }
}

/// Assignment checking. Chained assignment (`a = b = c`) checks the
/// inner assignment first and takes its target's type as the value.
pub fn determine_assignment(
    ctx: &mut CompilationContext,
    node: &mut SemanticNode,
) -> Result<bool, Error> {
    if !expr::determine_types(ctx, node.child_mut(0))? {
        node.child_mut(0).failure_point = true;
        return Ok(false);
    }
    let target = node.child(0).resolved_type().unwrap().clone();
    trace!("determining validity of assigning to a {}", target);

    if matches!(target.unaliased(), Type::Constant(_)) {
        let name = match node.child(0).kind {
            NodeKind::Identifier => node.child(0).token_value().unwrap_or_default().to_string(),
            _ => ctx.type_display(&target),
        };
        return Err(Error::new(
            ErrorImpl::ConstModification { name },
            node.position(),
        ));
    }

    let value_type = if node.child(1).kind == NodeKind::Assignment {
        if !determine_assignment(ctx, node.child_mut(1))? {
            return Ok(false);
        }
        node.child(1).child(0).resolved_type().unwrap().clone()
    } else {
        if !expr::determine_types(ctx, node.child_mut(1))? {
            node.child_mut(1).failure_point = true;
            return Ok(false);
        }
        node.child(1).resolved_type().unwrap().clone()
    };

    if !node.child(0).lvalue {
        return Err(Error::new(ErrorImpl::IllegalLValue, node.position()));
    }

    let operator = node.token_value().unwrap_or("=").to_string();
    if operator == "=" {
        if node.child(1).token_value() == Some("nullptr") {
            trace!("assigning nullptr bypasses the type system");
        } else if !ctx.is(&value_type, &target) {
            node.child_mut(1).failure_point = true;
            return Err(Error::new(
                ErrorImpl::IncompatibleTypes {
                    expected: ctx.type_display(&target),
                    received: ctx.type_display(&value_type),
                },
                node.position(),
            ));
        }
    } else {
        // compound assignment is tagged for the generator; the operand
        // check above is all the typing it gets
        node.add_tag(CompilationTag::OperatorAssignment);
    }

    node.set_type(Type::void());
    Ok(true)
}

/// Declaration-list checking, shared by statement position (`global`
/// false) and the top level (`global` true).
pub fn determine_declarations(
    ctx: &mut CompilationContext,
    node: &mut SemanticNode,
    global: bool,
) -> Result<bool, Error> {
    for declaration in node.children.iter_mut() {
        match declaration.kind {
            NodeKind::Declaration => {
                let declared = declared_type_of(ctx, declaration)?;
                if declared.is_void() {
                    return Err(Error::new(ErrorImpl::VoidType, declaration.position()));
                }
                let name = identifier_of(declaration)?;
                register_variable(ctx, &name, declared.clone(), global, declaration)?;
                if matches!(declared.unaliased(), Type::Array { length: Some(_), .. }) {
                    declaration.add_tag(CompilationTag::ConstantSize);
                }
                declaration.set_type(declared);
                declaration.lvalue = true;
            }

            NodeKind::InitializedDeclaration => {
                let declared = declared_type_of(ctx, declaration.child_mut(0))?;
                if declared.is_void() {
                    return Err(Error::new(ErrorImpl::VoidType, declaration.position()));
                }
                let name = identifier_of(declaration.child(0))?;

                if !expr::determine_types(ctx, declaration.child_mut(1))? {
                    declaration.child_mut(1).failure_point = true;
                    return Ok(false);
                }
                let initializer = declaration.child(1).resolved_type().unwrap().clone();
                if declaration.child(1).token_value() == Some("nullptr") {
                    trace!("initializing from nullptr bypasses the type system");
                } else if !ctx.is(&initializer, &declared) {
                    return Err(Error::new(
                        ErrorImpl::IncompatibleTypes {
                            expected: ctx.type_display(&declared),
                            received: ctx.type_display(&initializer),
                        },
                        declaration.position(),
                    ));
                }

                register_variable(ctx, &name, declared.clone(), global, declaration)?;
                declaration.child_mut(0).set_type(declared.clone());
                declaration.set_type(declared);
                declaration.lvalue = true;
            }

            NodeKind::FunctionDescription => {
                let return_type = declared_type_of(ctx, declaration)?;
                let name = identifier_of(declaration)?;
                let parameters = parameter_types_of(ctx, declaration)?;
                let pointer = Type::FunctionPointer {
                    return_type: Box::new(return_type),
                    parameters,
                };
                ctx.tracker.add_function(&name, pointer.clone(), false)?;
                declaration.set_type(pointer);
            }

            _ => return Ok(false),
        }
    }
    Ok(true)
}

/// The declared type of a pre-typed node, with pending named references
/// resolved through the environment.
pub fn declared_type_of(
    ctx: &CompilationContext,
    node: &SemanticNode,
) -> Result<Type, Error> {
    let declared = node.declared_type.clone().ok_or_else(|| {
        Error::new(
            ErrorImpl::TypeDoesNotExist {
                type_name: String::from("<missing type>"),
            },
            node.position(),
        )
    })?;
    Ok(match &declared {
        Type::NamedIndirection { kind, name } => ctx
            .environment
            .resolve_indirection(*kind, name)
            .unwrap_or(declared),
        _ => declared,
    })
}

pub fn identifier_of(node: &SemanticNode) -> Result<String, Error> {
    node.find_child(NodeKind::Identifier)
        .and_then(|id| id.token_value())
        .map(|name| name.to_string())
        .ok_or_else(|| {
            Error::new(
                ErrorImpl::IdentifierDoesNotExist {
                    identifier: String::from("<missing>"),
                },
                node.position(),
            )
        })
}

pub fn parameter_types_of(
    ctx: &CompilationContext,
    node: &SemanticNode,
) -> Result<Vec<Type>, Error> {
    let mut parameters = Vec::new();
    if let Some(list) = node.find_child(NodeKind::ParameterList) {
        for declaration in &list.children {
            if declaration.kind == NodeKind::Declaration {
                parameters.push(declared_type_of(ctx, declaration)?);
            }
        }
    }
    Ok(parameters)
}

fn register_variable(
    ctx: &mut CompilationContext,
    name: &str,
    declared: Type,
    global: bool,
    node: &SemanticNode,
) -> Result<(), Error> {
    let result = if global {
        ctx.tracker.add_global_variable(name, declared)
    } else {
        ctx.tracker.add_local_variable(name, declared)
    };
    result.map_err(|error| {
        // re-anchor the tracker's positionless error to the declaration
        Error::new(error.get_error().clone(), node.position())
    })
}
