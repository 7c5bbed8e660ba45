//! Unit tests for the type environment: typedefs, specifier
//! canonicalization, forward references, and namespaces.

use crate::ast::ast::{AstNode, NodeKind};
use crate::environment::environment::TypeEnvironment;
use crate::errors::errors::ErrorImpl;
use crate::types::compound::{CompoundType, FieldDeclaration};
use crate::types::types::{NamedKind, Type};
use crate::Token;

fn specifier(word: &str) -> AstNode {
    AstNode::new(NodeKind::Specifier).with_token(Token::synthetic(word))
}

fn qualifier(word: &str) -> AstNode {
    AstNode::new(NodeKind::Qualifier).with_token(Token::synthetic(word))
}

fn specifier_list(specifiers: &[&str], qualifiers: &[&str]) -> AstNode {
    let mut children: Vec<AstNode> = specifiers.iter().map(|word| specifier(word)).collect();
    children.extend(qualifiers.iter().map(|word| qualifier(word)));
    AstNode::new(NodeKind::QualifiersAndSpecifiers).with_children(children)
}

fn struct_reference(name: &str) -> AstNode {
    AstNode::new(NodeKind::CompoundTypeReference)
        .with_children(vec![specifier("struct"), AstNode::identifier(name)])
}

#[test]
fn test_specifier_order_canonicalizes() {
    let mut environment = TypeEnvironment::new();
    let a = environment
        .get_type(&specifier_list(&["unsigned", "long", "int"], &[]))
        .unwrap();
    let b = environment
        .get_type(&specifier_list(&["long", "int", "unsigned"], &[]))
        .unwrap();
    let c = environment
        .get_type(&specifier_list(&["int", "unsigned", "long"], &[]))
        .unwrap();

    assert!(a.is_exact(&b, &environment));
    assert!(b.is_exact(&c, &environment));
    assert!(a.is_exact(&Type::unsigned_long(), &environment));
}

#[test]
fn test_specifier_round_trip_is_idempotent() {
    let mut environment = TypeEnvironment::new();
    let built = environment
        .get_type(&specifier_list(&["long", "unsigned"], &["const"]))
        .unwrap();

    // re-derive the specifier/qualifier set from the built type
    let (inner, qualifiers) = match &built {
        Type::Constant(inner) => ((**inner).clone(), vec!["const"]),
        other => (other.clone(), Vec::new()),
    };
    let words = match &inner {
        Type::Primitive(primitive) => primitive.specifiers(),
        other => panic!("expected a primitive, got {}", other),
    };
    let word_refs: Vec<&str> = words.iter().map(|word| word.as_str()).collect();

    let rebuilt = environment
        .get_type(&specifier_list(&word_refs, &qualifiers))
        .unwrap();
    assert!(built.is_exact(&rebuilt, &environment));
}

#[test]
fn test_invalid_modifier_combinations() {
    let mut environment = TypeEnvironment::new();
    assert!(environment
        .get_type(&specifier_list(&["unsigned", "double"], &[]))
        .is_err());
    assert!(environment
        .get_type(&specifier_list(&["short", "char"], &[]))
        .is_err());
}

#[test]
fn test_typedef_is_transparent() {
    let mut environment = TypeEnvironment::new();
    environment
        .add_type_definition(Type::unsigned_short(), "word_t")
        .unwrap();

    let alias = environment
        .get_type(&AstNode::new(NodeKind::TypeName).with_token(Token::synthetic("word_t")))
        .unwrap();
    assert!(environment.is(&alias, &Type::unsigned_short()));
    assert!(environment.is_strict(&Type::unsigned_short(), &alias));
}

#[test]
fn test_typedef_collision_rules() {
    let mut environment = TypeEnvironment::new();
    environment
        .add_type_definition(Type::int(), "ssize_t")
        .unwrap();
    // redefining to the exact same type is fine
    assert!(environment
        .add_type_definition(Type::int(), "ssize_t")
        .is_ok());
    // redefining to a different type is not
    let error = environment
        .add_type_definition(Type::char_type(), "ssize_t")
        .unwrap_err();
    assert!(matches!(
        error.get_error(),
        ErrorImpl::TypeDefinitionAlreadyExists { .. }
    ));
    // primitives cannot be redefined at all
    assert!(environment
        .add_type_definition(Type::char_type(), "int")
        .is_err());
    assert!(environment
        .add_type_definition(Type::int(), "void")
        .is_err());
}

#[test]
fn test_named_compound_collision() {
    let mut environment = TypeEnvironment::new();
    environment
        .add_named_compound_type(CompoundType::new_struct(
            Some(String::from("vec")),
            vec![FieldDeclaration::new(Type::int(), "length")],
        ))
        .unwrap();
    let error = environment
        .add_named_compound_type(CompoundType::new_struct(
            Some(String::from("vec")),
            Vec::new(),
        ))
        .unwrap_err();
    assert!(matches!(
        error.get_error(),
        ErrorImpl::TypeAlreadyExists { .. }
    ));
}

#[test]
fn test_forward_reference_lifecycle() {
    let mut environment = TypeEnvironment::new();
    let pending = environment.get_type(&struct_reference("node")).unwrap();
    assert!(matches!(pending, Type::NamedIndirection { .. }));
    assert!(!environment.no_type_errors());
    assert_eq!(environment.unresolved_reference_names(), vec!["node"]);

    environment
        .add_named_compound_type(CompoundType::new_struct(
            Some(String::from("node")),
            vec![FieldDeclaration::new(Type::int(), "value")],
        ))
        .unwrap();
    assert!(environment.no_type_errors());
    assert!(environment
        .resolve_indirection(NamedKind::Struct, "node")
        .is_some());

    // the placeholder now compares equal to the real definition
    let real = environment.get_named_compound_type("node").unwrap();
    assert!(environment.is(&pending, &real));
}

#[test]
fn test_class_definition_from_syntax() {
    let mut environment = TypeEnvironment::new();
    let class_ast = AstNode::new(NodeKind::ClassDefinition)
        .with_token(Token::synthetic("Point"))
        .with_children(vec![AstNode::new(NodeKind::ClassLevelDeclaration)
            .with_token(Token::synthetic("public"))
            .with_children(vec![AstNode::new(NodeKind::Declarations).with_children(
                vec![
                    AstNode::declaration(Type::int(), "x"),
                    AstNode::declaration(Type::int(), "y"),
                ],
            )])]);

    let id = environment.define_class_from_ast(&class_ast).unwrap();
    let class = environment.class(id);
    assert_eq!(class.name, "Point");
    assert_eq!(class.fields().len(), 2);
    assert!(class.field("x").is_some());

    // a bare class name now denotes a pointer to the class
    let reference = environment
        .get_type(&AstNode::new(NodeKind::TypeName).with_token(Token::synthetic("Point")))
        .unwrap();
    assert!(matches!(reference, Type::Pointer(_)));
}

#[test]
fn test_namespace_resolution_and_ambiguity() {
    let mut environment = TypeEnvironment::new();

    environment.push_namespace("collections");
    environment
        .add_named_compound_type(CompoundType::new_struct(
            Some(String::from("item")),
            Vec::new(),
        ))
        .unwrap();
    environment.pop_namespace();

    environment.push_namespace("graphics");
    environment
        .add_named_compound_type(CompoundType::new_struct(
            Some(String::from("item")),
            Vec::new(),
        ))
        .unwrap();
    environment.pop_namespace();

    // not reachable without a using directive
    assert!(environment.resolve_compound_name("item").unwrap().is_none());

    environment.use_namespace("collections");
    assert!(environment.resolve_compound_name("item").unwrap().is_some());

    environment.use_namespace("graphics");
    let error = environment.resolve_compound_name("item").unwrap_err();
    assert!(matches!(
        error.get_error(),
        ErrorImpl::AmbiguousIdentifier { .. }
    ));

    environment.stop_use_namespace("graphics");
    assert!(environment.resolve_compound_name("item").unwrap().is_some());
}
