//! Unit tests for the scoped symbol tracker.

use crate::environment::environment::TypeEnvironment;
use crate::errors::errors::ErrorImpl;
use crate::tracker::tracker::VariableTracker;
use crate::types::methods::{ParameterTypeList, Visibility};
use crate::types::types::{ClassId, Type};

fn hierarchy() -> (TypeEnvironment, ClassId, ClassId) {
    let mut environment = TypeEnvironment::standard();
    let base = environment
        .define_class("Base", None, Vec::new(), Vec::new(), Vec::new())
        .unwrap();
    let derived = environment
        .define_class("Derived", Some(base), Vec::new(), Vec::new(), Vec::new())
        .unwrap();
    (environment, base, derived)
}

#[test]
fn test_redeclaration_in_same_scope() {
    let mut tracker = VariableTracker::new();
    tracker.add_local_variable("x", Type::int()).unwrap();
    let error = tracker.add_local_variable("x", Type::int()).unwrap_err();
    assert!(matches!(error.get_error(), ErrorImpl::Redeclaration { .. }));
}

#[test]
fn test_shadowing_across_scopes() {
    let mut tracker = VariableTracker::new();
    tracker.add_local_variable("x", Type::int()).unwrap();

    tracker.push_scope();
    // the outer entry reads as demoted, so shadowing is legitimate
    tracker
        .add_local_variable("x", Type::char_type().pointer_to())
        .unwrap();
    assert!(matches!(
        tracker.variable_type("x"),
        Some(Type::Pointer(_))
    ));
    tracker.pop_scope();

    assert!(matches!(
        tracker.variable_type("x"),
        Some(Type::Primitive(_))
    ));
}

#[test]
fn test_fixed_entries_can_never_be_replaced() {
    let mut tracker = VariableTracker::new();
    tracker
        .add_fixed_variable("true", Type::unsigned_short().constant())
        .unwrap();

    assert!(tracker.add_local_variable("true", Type::int()).is_err());
    tracker.push_scope();
    // fixed status survives the frame chain undemoted
    assert!(tracker.add_local_variable("true", Type::int()).is_err());
    tracker.pop_scope();
}

#[test]
fn test_function_registration() {
    let mut tracker = VariableTracker::new();
    let signature = Type::FunctionPointer {
        return_type: Box::new(Type::int()),
        parameters: vec![Type::int()],
    };
    tracker.add_function("twice", signature.clone(), false).unwrap();
    // a second description is fine, a second definition is not
    tracker.add_function("twice", signature.clone(), false).unwrap();
    assert!(tracker.add_function("twice", signature, true).is_err());
    assert!(tracker.function_exists("twice"));
    assert!(tracker.variable_exists("twice"));
}

#[test]
fn test_visibility_tiers() {
    let (environment, base, _) = hierarchy();
    let mut tracker = VariableTracker::new();

    tracker.push_class_scope(base, None);
    tracker
        .add_field(Visibility::Public, base, "value", Type::int())
        .unwrap();
    tracker
        .add_field(Visibility::Internal, base, "secret", Type::int())
        .unwrap();
    tracker
        .add_field(Visibility::Private, base, "hidden", Type::int())
        .unwrap();

    let base_type = Type::Class(base);
    assert!(tracker.field_visible(&environment, &base_type, "value"));
    assert!(tracker.field_visible(&environment, &base_type, "secret"));
    assert!(tracker.field_visible(&environment, &base_type, "hidden"));
    tracker.pop_scope();

    // outside the class body only public members remain visible
    assert!(tracker.field_visible(&environment, &base_type, "value"));
    assert!(!tracker.field_visible(&environment, &base_type, "secret"));
    assert!(!tracker.field_visible(&environment, &base_type, "hidden"));
}

#[test]
fn test_internal_members_are_inherited_but_private_are_not() {
    let (environment, base, derived) = hierarchy();
    let mut tracker = VariableTracker::new();

    tracker.push_class_scope(base, None);
    tracker
        .add_field(Visibility::Internal, base, "secret", Type::int())
        .unwrap();
    tracker
        .add_field(Visibility::Private, base, "hidden", Type::int())
        .unwrap();
    tracker.pop_scope();

    tracker.push_class_scope(derived, Some(base));
    let derived_type = Type::Class(derived);
    assert!(tracker.field_visible(&environment, &derived_type, "secret"));
    assert!(!tracker.field_visible(&environment, &derived_type, "hidden"));
    tracker.pop_scope();
}

#[test]
fn test_field_redeclaration_at_same_level() {
    let (_, base, _) = hierarchy();
    let mut tracker = VariableTracker::new();

    tracker.push_class_scope(base, None);
    tracker
        .add_field(Visibility::Public, base, "value", Type::int())
        .unwrap();
    let error = tracker
        .add_field(Visibility::Private, base, "value", Type::char_type())
        .unwrap_err();
    assert!(matches!(error.get_error(), ErrorImpl::Redeclaration { .. }));
    tracker.pop_scope();
}

#[test]
fn test_derived_field_shadows_in_resolution() {
    let (environment, base, derived) = hierarchy();
    let mut tracker = VariableTracker::new();

    tracker.push_class_scope(base, None);
    tracker
        .add_field(Visibility::Public, base, "value", Type::int())
        .unwrap();
    tracker.pop_scope();

    tracker.push_class_scope(derived, Some(base));
    tracker
        .add_field(Visibility::Public, derived, "value", Type::char_type())
        .unwrap();
    tracker.pop_scope();

    // most-derived entry wins even though the inherited one still exists
    let resolved = tracker
        .field_type(&environment, &Type::Class(derived), "value")
        .unwrap();
    assert!(environment.is_strict(&resolved, &Type::char_type()));
    let through_base = tracker
        .field_type(&environment, &Type::Class(base), "value")
        .unwrap();
    assert!(environment.is_strict(&through_base, &Type::int()));
}

#[test]
fn test_method_overloads_and_redeclaration() {
    let (environment, base, _) = hierarchy();
    let mut tracker = VariableTracker::new();

    tracker.push_class_scope(base, None);
    tracker
        .add_method(
            Visibility::Public,
            base,
            "get",
            Type::int(),
            ParameterTypeList::new(Vec::new()),
            &environment,
        )
        .unwrap();
    let error = tracker
        .add_method(
            Visibility::Public,
            base,
            "get",
            Type::int(),
            ParameterTypeList::new(Vec::new()),
            &environment,
        )
        .unwrap_err();
    assert!(matches!(error.get_error(), ErrorImpl::Redeclaration { .. }));

    let return_type = tracker
        .method_type(
            &environment,
            base,
            "get",
            &ParameterTypeList::new(Vec::new()),
        )
        .unwrap();
    assert!(environment.is_strict(&return_type, &Type::int()));
    tracker.pop_scope();
}

#[test]
fn test_constructor_overload_sets() {
    let (environment, base, derived) = hierarchy();
    let mut tracker = VariableTracker::new();

    tracker.push_class_scope(base, None);
    tracker
        .add_constructor(
            Visibility::Public,
            base,
            ParameterTypeList::new(vec![Type::int()]),
            &environment,
        )
        .unwrap();
    tracker.pop_scope();

    // loose matching: an integer-literal argument (long) finds the
    // int-taking overload
    assert!(tracker.constructor_visible(
        &environment,
        base,
        &ParameterTypeList::new(vec![Type::long_int()])
    ));
    assert!(!tracker.constructor_visible(
        &environment,
        base,
        &ParameterTypeList::new(vec![Type::char_type().pointer_to()])
    ));
    assert!(!tracker.constructor_visible(
        &environment,
        derived,
        &ParameterTypeList::new(vec![Type::int()])
    ));
}

#[test]
fn test_struct_fields_resolve_structurally() {
    use crate::types::compound::{CompoundType, FieldDeclaration};
    use std::rc::Rc;

    let environment = TypeEnvironment::new();
    let tracker = VariableTracker::new();
    let point = Type::Compound(Rc::new(CompoundType::new_struct(
        Some(String::from("point")),
        vec![FieldDeclaration::new(Type::int(), "x")],
    )));

    assert!(tracker.field_visible(&environment, &point, "x"));
    assert!(!tracker.field_visible(&environment, &point, "y"));
    let resolved = tracker.field_type(&environment, &point, "x").unwrap();
    assert!(environment.is_strict(&resolved, &Type::int()));
}
