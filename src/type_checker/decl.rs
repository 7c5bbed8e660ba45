//! Declaration-level checking: function definitions, constructor
//! definitions, and the two-pass class rule.

use log::debug;

use crate::ast::ast::NodeKind;
use crate::errors::errors::{Error, ErrorImpl};
use crate::type_checker::context::CompilationContext;
use crate::type_checker::expr;
use crate::type_checker::semantic_node::SemanticNode;
use crate::type_checker::stmt::{self, StatementChecker};
use crate::type_checker::tags::CompilationTag;
use crate::types::methods::{ConstructorRef, ParameterTypeList};
use crate::types::types::{ClassId, Type};

/// Function (or method) definition: binds `this`/`super` and the
/// parameters in a fresh scope, checks the body, and requires a
/// non-`void` function to return on every path.
pub fn check_function_definition(
    ctx: &mut CompilationContext,
    node: &mut SemanticNode,
    owner: Option<ClassId>,
) -> Result<bool, Error> {
    let return_type = stmt::declared_type_of(ctx, node)?;
    let name = stmt::identifier_of(node)?;
    debug!("checking function {}", name);

    ctx.tracker.push_scope();
    let result = check_function_inner(ctx, node, owner, &return_type, &name);
    ctx.tracker.pop_scope();
    result
}

fn check_function_inner(
    ctx: &mut CompilationContext,
    node: &mut SemanticNode,
    owner: Option<ClassId>,
    return_type: &Type,
    name: &str,
) -> Result<bool, Error> {
    if let Some(owner_id) = owner {
        ctx.tracker
            .add_local_variable("this", Type::Class(owner_id).pointer_to())?;
        if ctx.environment.class(owner_id).parent.is_some() {
            // `super` aliases the receiver; super calls re-dispatch
            // through the generated trampolines
            ctx.tracker
                .add_local_variable("super", Type::Class(owner_id).pointer_to())?;
        }
    }

    bind_parameters(ctx, node)?;

    let mut body_checker = StatementChecker::new(return_type.clone());
    let body = node
        .find_child_mut(NodeKind::CompoundStatement)
        .ok_or_else(|| {
            Error::new(
                ErrorImpl::IllegalStatement,
                crate::Position::null(),
            )
        })?;
    if !body_checker.check_block(ctx, body, false)? {
        return Ok(false);
    }

    if !return_type.is_void() && !body_checker.returns() {
        node.failure_point = true;
        return Err(Error::new(
            ErrorImpl::MissingReturn {
                function: name.to_string(),
            },
            node.position(),
        ));
    }

    let parameters = stmt::parameter_types_of(ctx, node)?;
    node.set_type(Type::FunctionPointer {
        return_type: Box::new(return_type.clone()),
        parameters,
    });
    Ok(true)
}

/// Constructor definition: binds `this` and the parameters, resolves an
/// optional `this(...)`/`super(...)` chain by overload lookup, and
/// forbids valued returns in the body.
pub fn check_constructor_definition(
    ctx: &mut CompilationContext,
    node: &mut SemanticNode,
    owner: ClassId,
) -> Result<bool, Error> {
    ctx.tracker.push_scope();
    let result = check_constructor_inner(ctx, node, owner);
    ctx.tracker.pop_scope();
    result
}

fn check_constructor_inner(
    ctx: &mut CompilationContext,
    node: &mut SemanticNode,
    owner: ClassId,
) -> Result<bool, Error> {
    ctx.tracker
        .add_local_variable("this", Type::Class(owner).pointer_to())?;
    bind_parameters(ctx, node)?;

    let own_parameters = ParameterTypeList::new(stmt::parameter_types_of(ctx, node)?);
    let own_index = ctx
        .environment
        .class(owner)
        .get_constructor(&own_parameters, &ctx.environment, true)
        .ok_or_else(|| {
            Error::new(
                ErrorImpl::NoConstructor {
                    owner: ctx.environment.class(owner).name.clone(),
                    parameters: format!("{}", own_parameters),
                },
                node.position(),
            )
        })?;

    if node.has_child(NodeKind::ConstructorChain) {
        let target = {
            let chain = node.find_child(NodeKind::ConstructorChain).unwrap();
            match chain.token_value() {
                Some("this") => owner,
                Some("super") => ctx.environment.class(owner).parent.ok_or_else(|| {
                    Error::new(
                        ErrorImpl::TypeDoesNotExist {
                            type_name: String::from("super"),
                        },
                        chain.position(),
                    )
                })?,
                _ => return Ok(false),
            }
        };

        {
            let chain = node.find_child_mut(NodeKind::ConstructorChain).unwrap();
            let sequence = chain.find_child_mut(NodeKind::Sequence).unwrap();
            if !expr::determine_types_in_sequence(ctx, sequence)? {
                return Ok(false);
            }
        }
        let chain = node.find_child(NodeKind::ConstructorChain).unwrap();
        let arguments = ParameterTypeList::new(expr::sequence_types(
            chain.find_child(NodeKind::Sequence).unwrap(),
        ));

        if !ctx
            .tracker
            .constructor_visible(&ctx.environment, target, &arguments)
        {
            return Err(Error::new(
                ErrorImpl::NoConstructor {
                    owner: ctx.environment.class(target).name.clone(),
                    parameters: format!("{}", arguments),
                },
                chain.position(),
            ));
        }
        let target_index = ctx
            .environment
            .class(target)
            .get_constructor(&arguments, &ctx.environment, false)
            .ok_or_else(|| {
                Error::new(
                    ErrorImpl::NoConstructor {
                        owner: ctx.environment.class(target).name.clone(),
                        parameters: format!("{}", arguments),
                    },
                    chain.position(),
                )
            })?;

        let prior = ConstructorRef {
            class: target,
            index: target_index,
        };
        ctx.environment
            .class_mut(owner)
            .constructor_mut(own_index)
            .prior_constructor = Some(prior);
        node.find_child_mut(NodeKind::ConstructorChain)
            .unwrap()
            .add_tag(CompilationTag::PriorConstructorCall(prior));
    }

    if let Some(body) = node.find_child_mut(NodeKind::CompoundStatement) {
        let mut body_checker = StatementChecker::for_constructor();
        if !body_checker.check_block(ctx, body, false)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Class definition, two passes: register every field, method
/// signature, and constructor overload in the tracker (detecting
/// overrides, visibilities, and shadowing), then check every method and
/// constructor body.
pub fn check_class_definition(
    ctx: &mut CompilationContext,
    node: &mut SemanticNode,
) -> Result<bool, Error> {
    let class_id = match node.declared_type.as_ref().map(|t| t.value_type().clone()) {
        Some(Type::Class(id)) => id,
        _ => return Ok(false),
    };

    let vtable_field = ctx.settings.vtable_field_name.clone();
    // trampolines must exist before any body mentions `super.m(...)`
    ctx.environment
        .generate_super_methods(class_id, &vtable_field);

    let parent = ctx.environment.class(class_id).parent;
    ctx.tracker.push_class_scope(class_id, parent);
    let result = check_class_inner(ctx, node, class_id, parent, &vtable_field);
    ctx.tracker.pop_scope();
    result
}

fn check_class_inner(
    ctx: &mut CompilationContext,
    node: &mut SemanticNode,
    class_id: ClassId,
    parent: Option<ClassId>,
    vtable_field: &str,
) -> Result<bool, Error> {
    let class = ctx.environment.class(class_id).clone();

    // pass 1: fields and signatures into the tracker
    for field in class.fields() {
        if let Some(parent_id) = parent {
            if ctx
                .tracker
                .field_visible(&ctx.environment, &Type::Class(parent_id), &field.name)
            {
                tag_shadowing_field(node, &field.name);
            }
        }
        ctx.tracker
            .add_field(
                field.visibility,
                class_id,
                &field.name,
                field.field_type.clone(),
            )
            .map_err(|error| Error::new(error.get_error().clone(), node.position()))?;
    }

    for method in class.instance_methods() {
        let parameters = method.parameter_types();
        if method.is_virtual
            && ctx
                .tracker
                .method_visible(&ctx.environment, class_id, &method.name, &parameters)
        {
            // an override: the slot was replaced in place when the class
            // was built; here the visible slot's return type constrains
            // the override's
            let existing = ctx
                .tracker
                .method_type(&ctx.environment, class_id, &method.name, &parameters)
                .unwrap();
            if !ctx.is(&method.return_type, &existing) {
                return Err(Error::new(
                    ErrorImpl::IncompatibleReturnType {
                        method: method.name.clone(),
                        expected: ctx.type_display(&existing),
                        received: ctx.type_display(&method.return_type),
                    },
                    node.position(),
                ));
            }
        } else {
            debug!(
                "added {:?} {} to {}",
                method.visibility, method.name, class.name
            );
            ctx.tracker
                .add_method(
                    method.visibility,
                    class_id,
                    &method.name,
                    method.return_type.clone(),
                    parameters,
                    &ctx.environment,
                )
                .map_err(|error| Error::new(error.get_error().clone(), node.position()))?;
        }
    }

    for constructor in class.constructors() {
        ctx.tracker
            .add_constructor(
                constructor.visibility,
                class_id,
                constructor.parameter_types(),
                &ctx.environment,
            )
            .map_err(|error| Error::new(error.get_error().clone(), node.position()))?;
    }

    // pass 2: bodies
    for class_level in node.children.iter_mut() {
        if class_level.kind != NodeKind::ClassLevelDeclaration {
            continue;
        }
        for member in class_level.children.iter_mut() {
            match member.kind {
                NodeKind::FunctionDefinition => {
                    if !check_function_definition(ctx, member, Some(class_id))? {
                        member.failure_point = true;
                        return Ok(false);
                    }
                }
                NodeKind::ConstructorDefinition => {
                    if !check_constructor_definition(ctx, member, class_id)? {
                        member.failure_point = true;
                        return Ok(false);
                    }
                }
                _ => {}
            }
        }
    }

    ctx.environment.seal_class(class_id, vtable_field)?;
    node.set_type(Type::Class(class_id));
    Ok(true)
}

fn bind_parameters(ctx: &mut CompilationContext, node: &mut SemanticNode) -> Result<(), Error> {
    if let Some(list) = node.find_child_mut(NodeKind::ParameterList) {
        for declaration in list.children.iter_mut() {
            if declaration.kind != NodeKind::Declaration {
                continue;
            }
            let parameter_type = stmt::declared_type_of(ctx, declaration)?;
            let name = stmt::identifier_of(declaration)?;
            ctx.tracker
                .add_local_variable(&name, parameter_type.clone())
                .map_err(|error| {
                    Error::new(error.get_error().clone(), declaration.position())
                })?;
            declaration.set_type(parameter_type);
            declaration.lvalue = true;
        }
    }
    Ok(())
}

/// Marks the field declaration named `name` as shadowing a parent
/// field, for the generator.
fn tag_shadowing_field(node: &mut SemanticNode, name: &str) {
    for class_level in node.children.iter_mut() {
        for member in class_level.children.iter_mut() {
            if member.kind != NodeKind::Declarations {
                continue;
            }
            for declaration in member.children.iter_mut() {
                let matches = declaration
                    .find_child(NodeKind::Identifier)
                    .and_then(|id| id.token_value())
                    == Some(name);
                if matches {
                    declaration.add_tag(CompilationTag::ShadowingFieldName);
                    return;
                }
            }
        }
    }
}
