//! Expression checking: one rule per expression node kind.
//!
//! Every rule assigns the node a type and an lvalue flag, or reports
//! why it cannot. `Ok(false)` means "this subtree is not resolvable
//! here"; definite rule violations return `Err`.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::ast::ast::NodeKind;
use crate::errors::errors::{Error, ErrorImpl};
use crate::type_checker::context::CompilationContext;
use crate::type_checker::semantic_node::SemanticNode;
use crate::type_checker::stmt;
use crate::type_checker::tags::CompilationTag;
use crate::types::methods::{ConstructorRef, ParameterTypeList};
use crate::types::types::Type;

lazy_static! {
    static ref FLOATING: Regex = Regex::new(r"^(-?\d+\.\d*|\d*\.\d+)$").unwrap();
    static ref INTEGER: Regex = Regex::new(r"^(\d+|0b[01]+|0x[0-9a-fA-F]+)$").unwrap();
    static ref CHARACTER: Regex = Regex::new(r"(?s)^'(\\.|.)'$").unwrap();
}

pub fn determine_types(
    ctx: &mut CompilationContext,
    node: &mut SemanticNode,
) -> Result<bool, Error> {
    // pre-typed subtrees are already done
    if node.is_typed() {
        return Ok(true);
    }

    match node.kind {
        NodeKind::Literal => {
            let image = node.token_value().unwrap_or_default().to_string();
            if FLOATING.is_match(&image) {
                node.set_type(Type::double());
            } else if INTEGER.is_match(&image) {
                node.set_type(Type::long_int());
            } else if CHARACTER.is_match(&image) {
                node.set_type(Type::char_type());
            } else {
                node.failure_point = true;
                return Err(Error::new(
                    ErrorImpl::UnrecognizedLiteral { literal: image },
                    node.position(),
                ));
            }
            Ok(true)
        }

        NodeKind::True | NodeKind::False => {
            let boolean = ctx
                .environment
                .boolean_type()
                .unwrap_or_else(Type::unsigned_char);
            node.set_type(boolean);
            Ok(true)
        }

        NodeKind::StringLiteral => {
            node.set_type(Type::char_type().pointer_to());
            Ok(true)
        }

        NodeKind::Sizeof => {
            node.set_type(Type::unsigned_long());
            Ok(true)
        }

        NodeKind::Identifier | NodeKind::Super => {
            let name = match node.kind {
                NodeKind::Super => String::from("super"),
                _ => node.token_value().unwrap_or_default().to_string(),
            };
            if !ctx.tracker.variable_exists(&name) {
                return Err(Error::new(
                    ErrorImpl::IdentifierDoesNotExist { identifier: name },
                    node.position(),
                ));
            }
            // typedef aliases are transparent to further checking
            let resolved = match ctx.tracker.variable_type(&name).unwrap() {
                Type::Alias { inner, .. } => *inner,
                other => other,
            };
            node.set_type(resolved);
            node.lvalue = true;
            Ok(true)
        }

        NodeKind::BinaryOp => {
            let operator = node.token_value().unwrap_or_default().to_string();
            for index in 0..2 {
                if !determine_types(ctx, node.child_mut(index))? {
                    node.child_mut(index).failure_point = true;
                    return Ok(false);
                }
            }
            let lhs = node.child(0).resolved_type().unwrap().clone();
            let rhs = node.child(1).resolved_type().unwrap().clone();

            if !can_binary_op(&lhs, &rhs) {
                return Err(Error::new(
                    ErrorImpl::IllegalTypesForOperation { operator },
                    node.position(),
                ));
            }

            if is_comparison(&operator) {
                node.set_type(boolean_result(ctx));
            } else {
                if is_pointer(&rhs) {
                    node.set_type(rhs.clone());
                } else {
                    node.set_type(lhs.clone());
                }
                node.lvalue = is_pointer_or_array(&lhs) || is_pointer_or_array(&rhs);
                if let Some(Type::Constant(inner)) = node.resolved_type.clone() {
                    node.set_type(*inner);
                }
            }
            Ok(true)
        }

        NodeKind::UnaryOp | NodeKind::PostfixOp => {
            if !determine_types(ctx, node.child_mut(0))? {
                node.child_mut(0).failure_point = true;
                return Ok(false);
            }
            single_op(node)
        }

        NodeKind::Dereference => {
            if !determine_types(ctx, node.child_mut(0))? {
                node.child_mut(0).failure_point = true;
                return Ok(false);
            }
            let operand = node.child(0).resolved_type().unwrap().clone();
            let pointee = match operand.value_type() {
                Type::Pointer(pointee) => (**pointee).clone(),
                _ => {
                    return Err(Error::new(
                        ErrorImpl::IllegalDereference {
                            type_name: ctx.type_display(&operand),
                        },
                        node.position(),
                    ))
                }
            };
            if pointee.is_void() {
                return Err(Error::new(ErrorImpl::VoidDereference, node.position()));
            }
            let pointee = resolve_indirection(ctx, pointee)?;
            if node.child(0).kind == NodeKind::ConstructorCall {
                node.add_tag(CompilationTag::NewObjectDereference);
            }
            node.lvalue = node.child(0).lvalue;
            node.set_type(pointee);
            Ok(true)
        }

        NodeKind::AddressOf => {
            if !determine_types(ctx, node.child_mut(0))? {
                node.child_mut(0).failure_point = true;
                return Ok(false);
            }
            if !node.child(0).lvalue {
                return Err(Error::new(ErrorImpl::IllegalLValue, node.position()));
            }
            let operand = node.child(0).resolved_type().unwrap().clone();
            node.set_type(operand.pointer_to());
            node.lvalue = true;
            Ok(true)
        }

        NodeKind::Cast => {
            let target = match &node.declared_type {
                Some(target) => target.clone(),
                None => return Ok(false),
            };
            if !determine_types(ctx, node.child_mut(0))? {
                node.child_mut(0).failure_point = true;
                return Ok(false);
            }
            let source = node.child(0).resolved_type().unwrap().clone();
            if !target.is_void_pointer() && !ctx.is(&target, &source) {
                return Err(Error::new(
                    ErrorImpl::IllegalCast {
                        from: ctx.type_display(&source),
                        to: ctx.type_display(&target),
                    },
                    node.position(),
                ));
            }
            node.lvalue = node.child(0).lvalue;
            node.set_type(target);
            Ok(true)
        }

        NodeKind::ArrayReference => {
            for index in 0..2 {
                if !determine_types(ctx, node.child_mut(index))? {
                    node.child_mut(index).failure_point = true;
                    return Ok(false);
                }
            }
            let base = node.child(0).resolved_type().unwrap().clone();
            let index_type = node.child(1).resolved_type().unwrap().clone();

            let (stripped, is_constant) = match base.unaliased() {
                Type::Constant(inner) => ((**inner).clone(), true),
                other => (other.clone(), false),
            };
            if !(can_binary_op(&stripped, &index_type) || is_pointer_or_array(&stripped)) {
                return Err(Error::new(
                    ErrorImpl::IllegalTypesForOperation {
                        operator: String::from("[]"),
                    },
                    node.position(),
                ));
            }
            let element = match stripped.unaliased() {
                Type::Pointer(pointee) => (**pointee).clone(),
                Type::Array { element, .. } => (**element).clone(),
                other => {
                    return Err(Error::new(
                        ErrorImpl::IllegalDereference {
                            type_name: ctx.type_display(other),
                        },
                        node.position(),
                    ))
                }
            };
            let mut element = resolve_indirection(ctx, element)?;
            if is_constant {
                element = element.constant();
            }
            node.lvalue = node.child(0).lvalue || node.child(1).lvalue;
            node.set_type(element);
            Ok(true)
        }

        NodeKind::FunctionCall => {
            let callee_resolved = if node.child(0).kind == NodeKind::Identifier {
                let name = node.child(0).token_value().unwrap_or_default().to_string();
                match ctx.tracker.function_type(&name) {
                    Some(function_type) => {
                        node.child_mut(0).set_type(function_type.clone());
                        function_type
                    }
                    None => {
                        if !ctx.tracker.variable_exists(&name) {
                            return Err(Error::new(
                                ErrorImpl::IdentifierDoesNotExist { identifier: name },
                                node.position(),
                            ));
                        }
                        let variable = ctx.tracker.variable_type(&name).unwrap();
                        if !matches!(variable.value_type(), Type::FunctionPointer { .. }) {
                            return Err(Error::new(
                                ErrorImpl::IdentifierNotFunction { identifier: name },
                                node.position(),
                            ));
                        }
                        node.child_mut(0).set_type(variable.clone());
                        node.child_mut(0).lvalue = true;
                        variable
                    }
                }
            } else {
                if !determine_types(ctx, node.child_mut(0))? {
                    node.child_mut(0).failure_point = true;
                    return Ok(false);
                }
                node.child(0).resolved_type().unwrap().clone()
            };

            let (return_type, parameters) = match callee_resolved.value_type() {
                Type::FunctionPointer {
                    return_type,
                    parameters,
                } => ((**return_type).clone(), parameters.clone()),
                other => {
                    return Err(Error::new(
                        ErrorImpl::IdentifierNotFunction {
                            identifier: ctx.type_display(other),
                        },
                        node.position(),
                    ))
                }
            };

            let arguments = if node.has_child(NodeKind::Sequence) {
                let sequence = node.find_child_mut(NodeKind::Sequence).unwrap();
                if !determine_types_in_sequence(ctx, sequence)? {
                    return Ok(false);
                }
                sequence_types(node.find_child(NodeKind::Sequence).unwrap())
            } else {
                Vec::new()
            };

            if arguments.len() != parameters.len() {
                return Err(Error::new(
                    ErrorImpl::IncorrectArgumentCount {
                        expected: parameters.len(),
                        received: arguments.len(),
                    },
                    node.position(),
                ));
            }
            for (argument, parameter) in arguments.iter().zip(parameters.iter()) {
                if !ctx.is(argument, parameter) {
                    return Err(Error::new(
                        ErrorImpl::IncompatibleTypes {
                            expected: ctx.type_display(parameter),
                            received: ctx.type_display(argument),
                        },
                        node.position(),
                    ));
                }
            }

            node.set_type(resolve_indirection(ctx, return_type)?);
            node.lvalue = false;
            Ok(true)
        }

        NodeKind::FieldGet => {
            if !determine_types(ctx, node.child_mut(0))? {
                node.child_mut(0).failure_point = true;
                return Ok(false);
            }
            let base = node.child(0).resolved_type().unwrap().clone();
            let name = node.child(1).token_value().unwrap_or_default().to_string();
            debug!("checking if {} has field {}", ctx.type_display(&base), name);

            if !ctx.tracker.field_visible(&ctx.environment, &base, &name) {
                return Err(Error::new(
                    ErrorImpl::FieldNotVisible {
                        owner: ctx.type_display(&base),
                        field: name,
                    },
                    node.position(),
                ));
            }
            let field_type = ctx
                .tracker
                .field_type(&ctx.environment, &base, &name)
                .ok_or_else(|| {
                    Error::new(
                        ErrorImpl::FieldNotVisible {
                            owner: ctx.type_display(&base),
                            field: name.clone(),
                        },
                        node.position(),
                    )
                })?;
            let field_type = resolve_indirection(ctx, field_type)?;

            if node.child(0).kind == NodeKind::Dereference {
                node.add_tag(CompilationTag::IndirectFieldGet);
            }
            node.child_mut(1).set_type(field_type.clone());
            node.lvalue = node.child(0).lvalue;
            node.set_type(field_type);
            Ok(true)
        }

        NodeKind::MethodCall => {
            if !determine_types(ctx, node.child_mut(0))? {
                node.child_mut(0).failure_point = true;
                return Ok(false);
            }
            let is_indirect = node.child(0).kind == NodeKind::Dereference;
            let is_super_call =
                is_indirect && node.child(0).child(0).kind == NodeKind::Super;
            if is_indirect {
                node.add_tag(CompilationTag::IndirectMethodCall);
            }

            let name = node.child(1).token_value().unwrap_or_default().to_string();
            {
                let sequence = node.find_child_mut(NodeKind::Sequence).unwrap();
                if !determine_types_in_sequence(ctx, sequence)? {
                    return Ok(false);
                }
            }
            let arguments = ParameterTypeList::new(sequence_types(
                node.find_child(NodeKind::Sequence).unwrap(),
            ));

            let base = node.child(0).resolved_type().unwrap().clone();

            // a call through a function-pointer-typed expression
            if let Type::FunctionPointer {
                return_type,
                parameters,
            } = base.value_type()
            {
                let expected = ParameterTypeList::new(parameters.clone());
                if !arguments.equals(&expected, &ctx.environment) {
                    return Err(Error::new(
                        ErrorImpl::IncompatibleTypes {
                            expected: format!("{}", expected),
                            received: format!("{}", arguments),
                        },
                        node.position(),
                    ));
                }
                node.set_type((**return_type).clone());
                return Ok(true);
            }

            let class_id = match base.value_type() {
                Type::Class(id) => Some(*id),
                Type::NamedIndirection { kind, name } => {
                    match ctx.environment.resolve_indirection(*kind, name) {
                        Some(Type::Class(id)) => Some(id),
                        _ => None,
                    }
                }
                _ => None,
            };

            let visible = class_id
                .map(|id| {
                    ctx.tracker
                        .method_visible(&ctx.environment, id, &name, &arguments)
                })
                .unwrap_or(false);

            if !visible {
                // fall back to a function-pointer field of the same name
                if ctx.tracker.field_visible(&ctx.environment, &base, &name) {
                    let field_type = ctx
                        .tracker
                        .field_type(&ctx.environment, &base, &name)
                        .unwrap();
                    if let Type::FunctionPointer { return_type, .. } = field_type.value_type() {
                        node.add_tag(CompilationTag::CompileAsFieldGet);
                        node.set_type((**return_type).clone());
                        return Ok(true);
                    }
                }
                return Err(Error::new(
                    ErrorImpl::MethodNotVisible {
                        owner: ctx.type_display(&base),
                        method: name,
                    },
                    node.position(),
                ));
            }

            let class_id = class_id.unwrap();
            let return_type = ctx
                .tracker
                .method_type(&ctx.environment, class_id, &name, &arguments)
                .unwrap();

            if is_super_call {
                if let Some(super_method) =
                    ctx.environment
                        .class(class_id)
                        .get_super_method(&name, &arguments, &ctx.environment)
                {
                    let tag = CompilationTag::SuperCall {
                        class: class_id,
                        name: super_method.name.clone(),
                    };
                    node.add_tag(tag);
                }
            } else if let Some((_, is_virtual)) =
                ctx.environment
                    .class(class_id)
                    .get_method(&name, &arguments, &ctx.environment)
            {
                if is_virtual {
                    node.add_tag(CompilationTag::VirtualMethodCall);
                }
                node.add_tag(CompilationTag::MethodCall {
                    class: class_id,
                    name: name.clone(),
                });
            }

            node.set_type(resolve_indirection(ctx, return_type)?);
            Ok(true)
        }

        NodeKind::ConstructorCall => {
            let constructed = match &node.declared_type {
                Some(declared) => declared.clone(),
                None => return Ok(false),
            };
            let class_id = match constructed.value_type() {
                Type::Pointer(pointee) => match pointee.value_type() {
                    Type::Class(id) => *id,
                    _ => return Ok(false),
                },
                Type::Class(id) => *id,
                _ => return Ok(false),
            };

            {
                let sequence = node.find_child_mut(NodeKind::Sequence).unwrap();
                if !determine_types_in_sequence(ctx, sequence)? {
                    return Ok(false);
                }
            }
            let arguments = ParameterTypeList::new(sequence_types(
                node.find_child(NodeKind::Sequence).unwrap(),
            ));

            if !ctx
                .tracker
                .constructor_visible(&ctx.environment, class_id, &arguments)
            {
                return Err(no_constructor(ctx, class_id, &arguments, node));
            }
            let index = ctx
                .environment
                .class(class_id)
                .get_constructor(&arguments, &ctx.environment, false)
                .ok_or_else(|| no_constructor(ctx, class_id, &arguments, node))?;

            node.add_tag(CompilationTag::ConstructorCall(ConstructorRef {
                class: class_id,
                index,
            }));
            node.set_type(Type::Class(class_id).pointer_to());
            Ok(true)
        }

        NodeKind::Ternary => {
            for index in 0..3 {
                if !determine_types(ctx, node.child_mut(index))? {
                    node.child_mut(index).failure_point = true;
                    return Ok(false);
                }
            }
            let condition = node.child(0).resolved_type().unwrap().clone();
            if !condition.is_primitive() {
                return Err(Error::new(
                    ErrorImpl::IllegalTypesForOperation {
                        operator: String::from("?:"),
                    },
                    node.position(),
                ));
            }
            let lhs = node.child(1).resolved_type().unwrap().clone();
            let rhs = node.child(2).resolved_type().unwrap().clone();
            // the more general of the two branch types wins
            let output = if ctx.is(&lhs, &rhs) {
                rhs
            } else if ctx.is(&rhs, &lhs) {
                lhs
            } else {
                return Err(Error::new(
                    ErrorImpl::IncompatibleTypes {
                        expected: ctx.type_display(&lhs),
                        received: ctx.type_display(&rhs),
                    },
                    node.position(),
                ));
            };
            node.lvalue = node.child(1).lvalue && node.child(2).lvalue;
            node.set_type(output);
            Ok(true)
        }

        NodeKind::Assignment => stmt::determine_assignment(ctx, node),

        NodeKind::Sequence => determine_types_in_sequence(ctx, node),

        NodeKind::Empty => Ok(true),

        _ => Ok(false),
    }
}

/// Prefix and postfix single-operand operators share one rule.
fn single_op(node: &mut SemanticNode) -> Result<bool, Error> {
    let operator = node.token_value().unwrap_or_default().to_string();
    let operand = node.child(0).resolved_type().unwrap().clone();
    if !operand.is_primitive() {
        return Err(Error::new(
            ErrorImpl::IllegalTypesForOperation { operator },
            node.position(),
        ));
    }
    match operator.as_str() {
        "++" | "--" => {
            if !can_increment_or_decrement(&operand) {
                return Err(Error::new(
                    ErrorImpl::IllegalTypesForOperation { operator },
                    node.position(),
                ));
            }
            node.set_type(operand);
        }
        "!" => node.set_type(Type::int()),
        _ => node.set_type(operand),
    }
    node.lvalue = node.child(0).lvalue;
    Ok(true)
}

pub fn determine_types_in_sequence(
    ctx: &mut CompilationContext,
    sequence: &mut SemanticNode,
) -> Result<bool, Error> {
    for child in sequence.children.iter_mut() {
        if !determine_types(ctx, child)? {
            child.failure_point = true;
            return Ok(false);
        }
    }
    Ok(true)
}

pub fn sequence_types(sequence: &SemanticNode) -> Vec<Type> {
    sequence
        .children
        .iter()
        .filter_map(|child| child.resolved_type().cloned())
        .collect()
}

fn no_constructor(
    ctx: &CompilationContext,
    class: crate::types::types::ClassId,
    arguments: &ParameterTypeList,
    node: &SemanticNode,
) -> Error {
    Error::new(
        ErrorImpl::NoConstructor {
            owner: ctx.environment.class(class).name.clone(),
            parameters: format!("{}", arguments),
        },
        node.position(),
    )
}

fn resolve_indirection(ctx: &CompilationContext, ty: Type) -> Result<Type, Error> {
    match &ty {
        Type::NamedIndirection { kind, name } => {
            match ctx.environment.resolve_indirection(*kind, name) {
                Some(resolved) => Ok(resolved),
                None => Ok(ty),
            }
        }
        _ => Ok(ty),
    }
}

fn boolean_result(ctx: &CompilationContext) -> Type {
    ctx.environment
        .boolean_type()
        .unwrap_or_else(Type::unsigned_short)
}

fn is_comparison(operator: &str) -> bool {
    matches!(operator, "==" | "!=" | "<" | "<=" | ">" | ">=" | "&&" | "||")
}

fn can_binary_op(left: &Type, right: &Type) -> bool {
    left.is_primitive() && right.is_primitive()
}

fn is_pointer(ty: &Type) -> bool {
    matches!(ty.value_type(), Type::Pointer(_))
}

fn is_pointer_or_array(ty: &Type) -> bool {
    matches!(ty.value_type(), Type::Pointer(_) | Type::Array { .. })
}

fn can_increment_or_decrement(ty: &Type) -> bool {
    match ty.value_type() {
        Type::Pointer(_) => true,
        Type::Primitive(primitive) => primitive.is_integral(),
        _ => false,
    }
}
