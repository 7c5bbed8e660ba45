//! Unit tests for the type-checking walker: expression and statement
//! rules against hand-built syntax trees.

use crate::ast::ast::{AstNode, NodeKind};
use crate::environment::environment::TypeEnvironment;
use crate::errors::errors::ErrorImpl;
use crate::type_checker::context::{CompilationContext, CompilationSettings};
use crate::type_checker::expr;
use crate::type_checker::semantic_node::SemanticNode;
use crate::type_checker::stmt;
use crate::type_checker::type_checker::TypeChecker;
use crate::types::types::Type;
use crate::Token;

fn context() -> CompilationContext {
    CompilationContext::new(TypeEnvironment::standard(), CompilationSettings::default())
}

fn check_expression(ctx: &mut CompilationContext, ast: AstNode) -> SemanticNode {
    let mut node = SemanticNode::from_ast(&ast);
    expr::determine_types(ctx, &mut node).unwrap();
    node
}

fn binary(operator: &str, lhs: AstNode, rhs: AstNode) -> AstNode {
    AstNode::new(NodeKind::BinaryOp)
        .with_token(Token::synthetic(operator))
        .with_children(vec![lhs, rhs])
}

fn assignment(lhs: AstNode, rhs: AstNode) -> AstNode {
    AstNode::new(NodeKind::Assignment)
        .with_token(Token::synthetic("="))
        .with_children(vec![lhs, rhs])
}

#[test]
fn test_literal_classification() {
    let mut ctx = context();

    let integer = check_expression(&mut ctx, AstNode::literal("42"));
    assert!(ctx.is_strict(integer.resolved_type().unwrap(), &Type::long_int()));

    let floating = check_expression(&mut ctx, AstNode::literal("3.14"));
    assert!(ctx.is_strict(floating.resolved_type().unwrap(), &Type::double()));

    let character = check_expression(&mut ctx, AstNode::literal("'a'"));
    assert!(ctx.is_strict(character.resolved_type().unwrap(), &Type::char_type()));

    let hex = check_expression(&mut ctx, AstNode::literal("0xff"));
    assert!(ctx.is_strict(hex.resolved_type().unwrap(), &Type::long_int()));
}

#[test]
fn test_unrecognized_literal() {
    let mut ctx = context();
    let mut node = SemanticNode::from_ast(&AstNode::literal("12abc#"));
    let error = expr::determine_types(&mut ctx, &mut node).unwrap_err();
    assert!(matches!(
        error.get_error(),
        ErrorImpl::UnrecognizedLiteral { .. }
    ));
}

#[test]
fn test_identifier_resolution() {
    let mut ctx = context();
    ctx.tracker.add_local_variable("count", Type::int()).unwrap();

    let node = check_expression(&mut ctx, AstNode::identifier("count"));
    assert!(node.lvalue);
    assert!(ctx.is_strict(node.resolved_type().unwrap(), &Type::int()));

    let mut unknown = SemanticNode::from_ast(&AstNode::identifier("missing"));
    let error = expr::determine_types(&mut ctx, &mut unknown).unwrap_err();
    assert!(matches!(
        error.get_error(),
        ErrorImpl::IdentifierDoesNotExist { .. }
    ));
}

#[test]
fn test_comparison_yields_boolean() {
    let mut ctx = context();
    let node = check_expression(
        &mut ctx,
        binary("<", AstNode::literal("1"), AstNode::literal("2")),
    );
    // the registered boolean typedef, which unwraps to unsigned short
    assert!(ctx.is_strict(node.resolved_type().unwrap(), &Type::unsigned_short()));
    assert!(!node.lvalue);
}

#[test]
fn test_arithmetic_takes_left_operand_type() {
    let mut ctx = context();
    ctx.tracker.add_local_variable("c", Type::char_type()).unwrap();
    let node = check_expression(
        &mut ctx,
        binary("+", AstNode::identifier("c"), AstNode::literal("1")),
    );
    assert!(ctx.is_strict(node.resolved_type().unwrap(), &Type::char_type()));
}

#[test]
fn test_pointer_arithmetic_keeps_pointer_type_and_lvalue() {
    let mut ctx = context();
    ctx.tracker
        .add_local_variable("p", Type::char_type().pointer_to())
        .unwrap();
    let node = check_expression(
        &mut ctx,
        binary("+", AstNode::identifier("p"), AstNode::literal("1")),
    );
    assert!(matches!(node.resolved_type().unwrap(), Type::Pointer(_)));
    assert!(node.lvalue);
}

#[test]
fn test_dereference_rules() {
    let mut ctx = context();
    ctx.tracker
        .add_local_variable("p", Type::int().pointer_to())
        .unwrap();
    ctx.tracker
        .add_local_variable("v", Type::void().pointer_to())
        .unwrap();
    ctx.tracker.add_local_variable("n", Type::int()).unwrap();

    let deref = |name: &str| {
        AstNode::new(NodeKind::Dereference).with_children(vec![AstNode::identifier(name)])
    };

    let node = check_expression(&mut ctx, deref("p"));
    assert!(ctx.is_strict(node.resolved_type().unwrap(), &Type::int()));
    assert!(node.lvalue);

    let mut void_deref = SemanticNode::from_ast(&deref("v"));
    let error = expr::determine_types(&mut ctx, &mut void_deref).unwrap_err();
    assert!(matches!(error.get_error(), ErrorImpl::VoidDereference));

    let mut non_pointer = SemanticNode::from_ast(&deref("n"));
    let error = expr::determine_types(&mut ctx, &mut non_pointer).unwrap_err();
    assert!(matches!(
        error.get_error(),
        ErrorImpl::IllegalDereference { .. }
    ));
}

#[test]
fn test_address_of_requires_lvalue() {
    let mut ctx = context();
    ctx.tracker.add_local_variable("x", Type::int()).unwrap();

    let node = check_expression(
        &mut ctx,
        AstNode::new(NodeKind::AddressOf).with_children(vec![AstNode::identifier("x")]),
    );
    assert!(matches!(node.resolved_type().unwrap(), Type::Pointer(_)));

    let mut of_literal = SemanticNode::from_ast(
        &AstNode::new(NodeKind::AddressOf).with_children(vec![AstNode::literal("5")]),
    );
    let error = expr::determine_types(&mut ctx, &mut of_literal).unwrap_err();
    assert!(matches!(error.get_error(), ErrorImpl::IllegalLValue));
}

#[test]
fn test_cast_rules() {
    let mut ctx = context();

    let node = check_expression(
        &mut ctx,
        AstNode::new(NodeKind::Cast)
            .with_type(Type::int())
            .with_children(vec![AstNode::literal("5")]),
    );
    assert!(ctx.is_strict(node.resolved_type().unwrap(), &Type::int()));

    let mut illegal = SemanticNode::from_ast(
        &AstNode::new(NodeKind::Cast)
            .with_type(Type::char_type().pointer_to())
            .with_children(vec![AstNode::literal("5")]),
    );
    let error = expr::determine_types(&mut ctx, &mut illegal).unwrap_err();
    assert!(matches!(error.get_error(), ErrorImpl::IllegalCast { .. }));

    // casting to void* always goes through
    let node = check_expression(
        &mut ctx,
        AstNode::new(NodeKind::Cast)
            .with_type(Type::void().pointer_to())
            .with_children(vec![AstNode::literal("5")]),
    );
    assert!(node.resolved_type().unwrap().is_void_pointer());
}

#[test]
fn test_ternary_takes_more_general_branch() {
    let mut ctx = context();
    ctx.tracker.add_local_variable("a", Type::int()).unwrap();
    ctx.tracker.add_local_variable("b", Type::int()).unwrap();

    let node = check_expression(
        &mut ctx,
        AstNode::new(NodeKind::Ternary).with_children(vec![
            AstNode::literal("1"),
            AstNode::identifier("a"),
            AstNode::identifier("b"),
        ]),
    );
    assert!(node.lvalue, "both branches are lvalues");

    let not_lvalue = check_expression(
        &mut ctx,
        AstNode::new(NodeKind::Ternary).with_children(vec![
            AstNode::literal("1"),
            AstNode::identifier("a"),
            AstNode::literal("2"),
        ]),
    );
    assert!(!not_lvalue.lvalue);
}

#[test]
fn test_function_call_checks_arguments() {
    let mut ctx = context();
    let signature = Type::FunctionPointer {
        return_type: Box::new(Type::int()),
        parameters: vec![Type::int()],
    };
    ctx.tracker.add_function("twice", signature, false).unwrap();

    let call = |arguments: Vec<AstNode>| {
        AstNode::new(NodeKind::FunctionCall).with_children(vec![
            AstNode::identifier("twice"),
            AstNode::sequence(arguments),
        ])
    };

    let node = check_expression(&mut ctx, call(vec![AstNode::literal("2")]));
    assert!(ctx.is_strict(node.resolved_type().unwrap(), &Type::int()));
    assert!(!node.lvalue);

    let mut too_many = SemanticNode::from_ast(&call(vec![
        AstNode::literal("1"),
        AstNode::literal("2"),
    ]));
    let error = expr::determine_types(&mut ctx, &mut too_many).unwrap_err();
    assert!(matches!(
        error.get_error(),
        ErrorImpl::IncorrectArgumentCount { .. }
    ));

    let mut not_function = SemanticNode::from_ast(
        &AstNode::new(NodeKind::FunctionCall).with_children(vec![
            AstNode::identifier("missing"),
            AstNode::sequence(Vec::new()),
        ]),
    );
    let error = expr::determine_types(&mut ctx, &mut not_function).unwrap_err();
    assert!(matches!(
        error.get_error(),
        ErrorImpl::IdentifierDoesNotExist { .. }
    ));
}

#[test]
fn test_assignment_rules() {
    let mut ctx = context();
    ctx.tracker.add_local_variable("x", Type::int()).unwrap();
    ctx.tracker
        .add_local_variable("frozen", Type::int().constant())
        .unwrap();

    let mut ok = SemanticNode::from_ast(&assignment(
        AstNode::identifier("x"),
        AstNode::literal("5"),
    ));
    assert!(stmt::determine_assignment(&mut ctx, &mut ok).unwrap());
    assert!(ok.resolved_type().unwrap().is_void());

    let mut to_const = SemanticNode::from_ast(&assignment(
        AstNode::identifier("frozen"),
        AstNode::literal("5"),
    ));
    let error = stmt::determine_assignment(&mut ctx, &mut to_const).unwrap_err();
    assert!(matches!(
        error.get_error(),
        ErrorImpl::ConstModification { .. }
    ));

    let mut to_literal = SemanticNode::from_ast(&assignment(
        AstNode::literal("1"),
        AstNode::literal("5"),
    ));
    let error = stmt::determine_assignment(&mut ctx, &mut to_literal).unwrap_err();
    assert!(matches!(error.get_error(), ErrorImpl::IllegalLValue));
}

#[test]
fn test_chained_assignment() {
    let mut ctx = context();
    ctx.tracker.add_local_variable("a", Type::int()).unwrap();
    ctx.tracker.add_local_variable("b", Type::int()).unwrap();

    let mut chained = SemanticNode::from_ast(&assignment(
        AstNode::identifier("a"),
        assignment(AstNode::identifier("b"), AstNode::literal("3")),
    ));
    assert!(stmt::determine_assignment(&mut ctx, &mut chained).unwrap());
    assert!(chained.resolved_type().unwrap().is_void());
}

#[test]
fn test_compound_assignment_is_tagged() {
    use crate::type_checker::tags::CompilationTag;

    let mut ctx = context();
    ctx.tracker.add_local_variable("x", Type::int()).unwrap();

    let mut node = SemanticNode::from_ast(
        &AstNode::new(NodeKind::Assignment)
            .with_token(Token::synthetic("+="))
            .with_children(vec![AstNode::identifier("x"), AstNode::literal("1")]),
    );
    assert!(stmt::determine_assignment(&mut ctx, &mut node).unwrap());
    assert!(node.has_tag(&CompilationTag::OperatorAssignment));
}

#[test]
fn test_missing_return() {
    let mut checker = TypeChecker::new(TypeEnvironment::standard());
    let function = AstNode::new(NodeKind::FunctionDefinition)
        .with_type(Type::int())
        .with_children(vec![
            AstNode::identifier("get"),
            AstNode::new(NodeKind::ParameterList),
            AstNode::new(NodeKind::CompoundStatement),
        ]);

    let (_, resolved) = checker.check_declaration(&function);
    assert!(!resolved);
    assert!(checker
        .context
        .errors
        .iter()
        .any(|e| matches!(e.get_error(), ErrorImpl::MissingReturn { .. })));
}

#[test]
fn test_void_function_needs_no_return() {
    let mut checker = TypeChecker::new(TypeEnvironment::standard());
    let function = AstNode::new(NodeKind::FunctionDefinition)
        .with_type(Type::void())
        .with_children(vec![
            AstNode::identifier("noop"),
            AstNode::new(NodeKind::ParameterList),
            AstNode::new(NodeKind::CompoundStatement),
        ]);

    let (_, resolved) = checker.check_declaration(&function);
    assert!(resolved, "{:?}", checker.context.errors);
}

#[test]
fn test_return_on_both_branches_satisfies_missing_return() {
    let mut checker = TypeChecker::new(TypeEnvironment::standard());
    let returning = |value: &str| {
        AstNode::new(NodeKind::Return).with_children(vec![AstNode::literal(value)])
    };
    let body = AstNode::new(NodeKind::CompoundStatement).with_children(vec![AstNode::new(
        NodeKind::If,
    )
    .with_children(vec![
        AstNode::literal("1"),
        AstNode::new(NodeKind::CompoundStatement).with_children(vec![returning("1")]),
        AstNode::new(NodeKind::CompoundStatement).with_children(vec![returning("2")]),
    ])]);
    let function = AstNode::new(NodeKind::FunctionDefinition)
        .with_type(Type::int())
        .with_children(vec![
            AstNode::identifier("pick"),
            AstNode::new(NodeKind::ParameterList),
            body,
        ]);

    let (_, resolved) = checker.check_declaration(&function);
    assert!(resolved, "{:?}", checker.context.errors);
}

#[test]
fn test_unreachable_code_after_return() {
    let mut checker = TypeChecker::new(TypeEnvironment::standard());
    let body = AstNode::new(NodeKind::CompoundStatement).with_children(vec![
        AstNode::new(NodeKind::Return).with_children(vec![AstNode::literal("1")]),
        AstNode::new(NodeKind::Return).with_children(vec![AstNode::literal("2")]),
    ]);
    let function = AstNode::new(NodeKind::FunctionDefinition)
        .with_type(Type::int())
        .with_children(vec![
            AstNode::identifier("get"),
            AstNode::new(NodeKind::ParameterList),
            body,
        ]);

    let (_, resolved) = checker.check_declaration(&function);
    assert!(!resolved);
    assert!(checker
        .context
        .errors
        .iter()
        .any(|e| matches!(e.get_error(), ErrorImpl::UnreachableCode)));
}

#[test]
fn test_return_type_must_match() {
    let mut checker = TypeChecker::new(TypeEnvironment::standard());
    let body = AstNode::new(NodeKind::CompoundStatement).with_children(vec![AstNode::new(
        NodeKind::Return,
    )
    .with_children(vec![
        AstNode::new(NodeKind::StringLiteral).with_token(Token::synthetic("\"hi\"")),
    ])]);
    let function = AstNode::new(NodeKind::FunctionDefinition)
        .with_type(Type::int())
        .with_children(vec![
            AstNode::identifier("get"),
            AstNode::new(NodeKind::ParameterList),
            body,
        ]);

    let (_, resolved) = checker.check_declaration(&function);
    assert!(!resolved);
    assert!(checker
        .context
        .errors
        .iter()
        .any(|e| matches!(e.get_error(), ErrorImpl::IncorrectReturnType { .. })));
}

#[test]
fn test_void_declaration_is_rejected() {
    let mut checker = TypeChecker::new(TypeEnvironment::standard());
    let declarations = AstNode::new(NodeKind::Declarations)
        .with_children(vec![AstNode::declaration(Type::void(), "nothing")]);

    let (_, resolved) = checker.check_declaration(&declarations);
    assert!(!resolved);
    assert!(checker
        .context
        .errors
        .iter()
        .any(|e| matches!(e.get_error(), ErrorImpl::VoidType)));
}

#[test]
fn test_initialized_declaration_checks_initializer() {
    let mut checker = TypeChecker::new(TypeEnvironment::standard());
    let bad = AstNode::new(NodeKind::Declarations).with_children(vec![AstNode::new(
        NodeKind::InitializedDeclaration,
    )
    .with_children(vec![
        AstNode::declaration(Type::int().pointer_to(), "p"),
        AstNode::literal("5"),
    ])]);

    let (_, resolved) = checker.check_declaration(&bad);
    assert!(!resolved);
    assert!(checker
        .context
        .errors
        .iter()
        .any(|e| matches!(e.get_error(), ErrorImpl::IncompatibleTypes { .. })));
}

#[test]
fn test_boolean_literals_are_fixed() {
    let mut ctx = context();
    let node = check_expression(&mut ctx, AstNode::new(NodeKind::True));
    assert!(ctx.is(node.resolved_type().unwrap(), &Type::unsigned_short()));

    // the tracker entries backing `true`/`false` cannot be shadowed
    assert!(ctx.tracker.add_local_variable("true", Type::int()).is_err());
}

#[test]
fn test_struct_field_access() {
    use crate::types::compound::{CompoundType, FieldDeclaration};
    use std::rc::Rc;

    let mut ctx = context();
    let point = Type::Compound(Rc::new(CompoundType::new_struct(
        Some(String::from("point")),
        vec![FieldDeclaration::new(Type::int(), "x")],
    )));
    ctx.tracker.add_local_variable("p", point).unwrap();

    let access = |field: &str| {
        AstNode::new(NodeKind::FieldGet)
            .with_children(vec![AstNode::identifier("p"), AstNode::identifier(field)])
    };

    let node = check_expression(&mut ctx, access("x"));
    assert!(ctx.is_strict(node.resolved_type().unwrap(), &Type::int()));
    assert!(node.lvalue, "field access keeps the base's lvalue-ness");

    let mut missing = SemanticNode::from_ast(&access("y"));
    let error = expr::determine_types(&mut ctx, &mut missing).unwrap_err();
    assert!(matches!(
        error.get_error(),
        ErrorImpl::FieldNotVisible { .. }
    ));
}

#[test]
fn test_array_reference_propagates_const() {
    let mut ctx = context();
    ctx.tracker
        .add_local_variable("values", Type::int().pointer_to().constant())
        .unwrap();

    let node = check_expression(
        &mut ctx,
        AstNode::new(NodeKind::ArrayReference).with_children(vec![
            AstNode::identifier("values"),
            AstNode::literal("0"),
        ]),
    );
    assert!(matches!(node.resolved_type().unwrap(), Type::Constant(_)));
    assert!(node.lvalue);
}

#[test]
fn test_sizeof_and_string_literals() {
    let mut ctx = context();
    let size = check_expression(&mut ctx, AstNode::new(NodeKind::Sizeof));
    assert!(ctx.is_strict(size.resolved_type().unwrap(), &Type::unsigned_long()));

    let string = check_expression(
        &mut ctx,
        AstNode::new(NodeKind::StringLiteral).with_token(Token::synthetic("\"text\"")),
    );
    assert!(matches!(string.resolved_type().unwrap(), Type::Pointer(_)));
}
