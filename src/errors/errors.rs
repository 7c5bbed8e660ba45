use std::fmt::Display;

use thiserror::Error;

use crate::Position;

#[derive(Debug, Clone)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
        }
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    pub fn get_error(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::IdentifierDoesNotExist { .. } => "IdentifierDoesNotExist",
            ErrorImpl::TypeDoesNotExist { .. } => "TypeDoesNotExist",
            ErrorImpl::FieldNotVisible { .. } => "FieldNotVisible",
            ErrorImpl::MethodNotVisible { .. } => "MethodNotVisible",
            ErrorImpl::NoConstructor { .. } => "NoConstructor",
            ErrorImpl::IdentifierNotFunction { .. } => "IdentifierNotFunction",
            ErrorImpl::Redeclaration { .. } => "Redeclaration",
            ErrorImpl::TypeAlreadyExists { .. } => "TypeAlreadyExists",
            ErrorImpl::TypeDefinitionAlreadyExists { .. } => "TypeDefinitionAlreadyExists",
            ErrorImpl::IncompatibleTypes { .. } => "IncompatibleTypes",
            ErrorImpl::IllegalCast { .. } => "IllegalCast",
            ErrorImpl::IncompatibleReturnType { .. } => "IncompatibleReturnType",
            ErrorImpl::IncorrectReturnType { .. } => "IncorrectReturnType",
            ErrorImpl::IncorrectArgumentCount { .. } => "IncorrectArgumentCount",
            ErrorImpl::MissingReturn { .. } => "MissingReturn",
            ErrorImpl::IllegalReturnInConstructor => "IllegalReturnInConstructor",
            ErrorImpl::IllegalLValue => "IllegalLValue",
            ErrorImpl::ConstModification { .. } => "ConstModification",
            ErrorImpl::AmbiguousIdentifier { .. } => "AmbiguousIdentifier",
            ErrorImpl::VoidType => "VoidType",
            ErrorImpl::VoidDereference => "VoidDereference",
            ErrorImpl::IllegalDereference { .. } => "IllegalDereference",
            ErrorImpl::IllegalTypesForOperation { .. } => "IllegalTypesForOperation",
            ErrorImpl::UnrecognizedLiteral { .. } => "UnrecognizedLiteral",
            ErrorImpl::UnreachableCode => "UnreachableCode",
            ErrorImpl::InvalidPrimitive { .. } => "InvalidPrimitive",
            ErrorImpl::PrimitiveTypeDefinition { .. } => "PrimitiveTypeDefinition",
            ErrorImpl::UnresolvedForwardReferences { .. } => "UnresolvedForwardReferences",
            ErrorImpl::ClassNotDefined { .. } => "ClassNotDefined",
            ErrorImpl::IllegalStatement => "IllegalStatement",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::IdentifierDoesNotExist { identifier } => ErrorTip::Suggestion(format!(
                "Identifier `{}` does not exist in this scope",
                identifier
            )),
            ErrorImpl::TypeDoesNotExist { type_name } => {
                ErrorTip::Suggestion(format!("Type `{}` has not been declared", type_name))
            }
            ErrorImpl::FieldNotVisible { owner, field } => ErrorTip::Suggestion(format!(
                "`{}` has no field `{}` visible from here",
                owner, field
            )),
            ErrorImpl::MethodNotVisible { owner, method } => ErrorTip::Suggestion(format!(
                "`{}` has no method `{}` visible from here",
                owner, method
            )),
            ErrorImpl::NoConstructor { owner, parameters } => ErrorTip::Suggestion(format!(
                "No constructor of `{}` accepts arguments {}",
                owner, parameters
            )),
            ErrorImpl::IdentifierNotFunction { identifier } => ErrorTip::Suggestion(format!(
                "`{}` is a variable, not a function",
                identifier
            )),
            ErrorImpl::Redeclaration { name } => {
                ErrorTip::Suggestion(format!("`{}` is already declared", name))
            }
            ErrorImpl::TypeAlreadyExists { name } => {
                ErrorTip::Suggestion(format!("A type named `{}` already exists", name))
            }
            ErrorImpl::TypeDefinitionAlreadyExists { name } => ErrorTip::Suggestion(format!(
                "`{}` is already defined as a different type",
                name
            )),
            ErrorImpl::IncompatibleTypes { expected, received } => ErrorTip::Suggestion(format!(
                "Expected type `{}`, received `{}`",
                expected, received
            )),
            ErrorImpl::IllegalCast { from, to } => {
                ErrorTip::Suggestion(format!("Cannot cast `{}` to `{}`", from, to))
            }
            ErrorImpl::IncompatibleReturnType {
                method,
                expected,
                received,
            } => ErrorTip::Suggestion(format!(
                "Override of `{}` must return `{}` (or a subtype), not `{}`",
                method, expected, received
            )),
            ErrorImpl::IncorrectReturnType { expected, received } => ErrorTip::Suggestion(format!(
                "Expected return type `{}`, received `{}`",
                expected, received
            )),
            ErrorImpl::IncorrectArgumentCount { expected, received } => ErrorTip::Suggestion(
                format!("Expected {} arguments, received {}", expected, received),
            ),
            ErrorImpl::MissingReturn { function } => ErrorTip::Suggestion(format!(
                "`{}` must return a value on every path",
                function
            )),
            ErrorImpl::IllegalReturnInConstructor => ErrorTip::Suggestion(String::from(
                "Constructors cannot return a value",
            )),
            ErrorImpl::IllegalLValue => ErrorTip::Suggestion(String::from(
                "This expression does not denote a storage location",
            )),
            ErrorImpl::ConstModification { name } => {
                ErrorTip::Suggestion(format!("`{}` is const-qualified and cannot be assigned", name))
            }
            ErrorImpl::AmbiguousIdentifier { identifier } => ErrorTip::Suggestion(format!(
                "`{}` resolves through more than one used namespace",
                identifier
            )),
            ErrorImpl::VoidType => {
                ErrorTip::Suggestion(String::from("`void` cannot be used here"))
            }
            ErrorImpl::VoidDereference => {
                ErrorTip::Suggestion(String::from("Cannot dereference a `void*`"))
            }
            ErrorImpl::IllegalDereference { type_name } => {
                ErrorTip::Suggestion(format!("`{}` is not a pointer", type_name))
            }
            ErrorImpl::IllegalTypesForOperation { operator } => {
                ErrorTip::Suggestion(format!("Operands of `{}` have unusable types", operator))
            }
            ErrorImpl::UnrecognizedLiteral { literal } => {
                ErrorTip::Suggestion(format!("`{}` is not a recognized literal", literal))
            }
            ErrorImpl::UnreachableCode => ErrorTip::Suggestion(String::from(
                "Statement is unreachable; the block already returned",
            )),
            ErrorImpl::InvalidPrimitive { modifier, base } => ErrorTip::Suggestion(format!(
                "`{}` cannot modify `{}`",
                modifier, base
            )),
            ErrorImpl::PrimitiveTypeDefinition { name } => ErrorTip::Suggestion(format!(
                "`{}` is a primitive and cannot be redefined",
                name
            )),
            ErrorImpl::UnresolvedForwardReferences { names } => ErrorTip::Suggestion(format!(
                "These types were referenced but never defined: {}",
                names
            )),
            ErrorImpl::ClassNotDefined { name } => {
                ErrorTip::Suggestion(format!("Class `{}` has not been processed yet", name))
            }
            ErrorImpl::IllegalStatement => ErrorTip::None,
        }
    }
}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum ErrorImpl {
    #[error("identifier {identifier:?} does not exist")]
    IdentifierDoesNotExist { identifier: String },
    #[error("type {type_name:?} does not exist")]
    TypeDoesNotExist { type_name: String },
    #[error("field {field:?} of {owner:?} is not visible")]
    FieldNotVisible { owner: String, field: String },
    #[error("method {method:?} of {owner:?} is not visible")]
    MethodNotVisible { owner: String, method: String },
    #[error("no constructor of {owner:?} matches {parameters}")]
    NoConstructor { owner: String, parameters: String },
    #[error("identifier {identifier:?} is not a function")]
    IdentifierNotFunction { identifier: String },
    #[error("{name:?} is already declared")]
    Redeclaration { name: String },
    #[error("type {name:?} already exists")]
    TypeAlreadyExists { name: String },
    #[error("type definition {name:?} already exists")]
    TypeDefinitionAlreadyExists { name: String },
    #[error("types do not match: expected {expected:?}, received {received:?}")]
    IncompatibleTypes { expected: String, received: String },
    #[error("illegal cast from {from:?} to {to:?}")]
    IllegalCast { from: String, to: String },
    #[error("override of {method:?} has incompatible return type: expected {expected:?}, received {received:?}")]
    IncompatibleReturnType {
        method: String,
        expected: String,
        received: String,
    },
    #[error("incorrect return type: expected {expected:?}, received {received:?}")]
    IncorrectReturnType { expected: String, received: String },
    #[error("incorrect argument count: expected {expected:?}, received {received:?}")]
    IncorrectArgumentCount { expected: usize, received: usize },
    #[error("function {function:?} is missing a return")]
    MissingReturn { function: String },
    #[error("constructors cannot return a value")]
    IllegalReturnInConstructor,
    #[error("expression is not an lvalue")]
    IllegalLValue,
    #[error("cannot modify const-qualified {name:?}")]
    ConstModification { name: String },
    #[error("identifier {identifier:?} is ambiguous")]
    AmbiguousIdentifier { identifier: String },
    #[error("void type is not allowed here")]
    VoidType,
    #[error("cannot dereference void pointer")]
    VoidDereference,
    #[error("cannot dereference {type_name:?}")]
    IllegalDereference { type_name: String },
    #[error("illegal types for operator {operator:?}")]
    IllegalTypesForOperation { operator: String },
    #[error("unrecognized literal {literal:?}")]
    UnrecognizedLiteral { literal: String },
    #[error("unreachable code")]
    UnreachableCode,
    #[error("{modifier:?} cannot modify {base:?}")]
    InvalidPrimitive { modifier: String, base: String },
    #[error("cannot redefine primitive {name:?}")]
    PrimitiveTypeDefinition { name: String },
    #[error("unresolved forward references: {names}")]
    UnresolvedForwardReferences { names: String },
    #[error("class {name:?} is not defined")]
    ClassNotDefined { name: String },
    #[error("illegal statement")]
    IllegalStatement,
}
