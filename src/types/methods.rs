//! Methods, constructors, parameters, and overload keys.

use std::fmt::{self, Display};

use crate::ast::ast::AstNode;
use crate::environment::environment::TypeEnvironment;
use crate::types::types::{ClassId, Type};
use crate::{MK_ASSIGN, MK_DEREF, MK_FIELD_GET, MK_ID};

/// Per-member access tier controlling which scopes may resolve a field
/// or method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Internal,
    Private,
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub param_type: Type,
    pub name: String,
}

impl Parameter {
    pub fn new(param_type: Type, name: impl Into<String>) -> Self {
        Parameter {
            param_type,
            name: name.into(),
        }
    }
}

/// The ordered parameter-type tuple used as an overload-resolution key.
#[derive(Debug, Clone)]
pub struct ParameterTypeList(pub Vec<Type>);

impl ParameterTypeList {
    pub fn new(types: Vec<Type>) -> Self {
        ParameterTypeList(types)
    }

    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// Loose comparison: each argument type must be usable where the
    /// parameter is expected.
    pub fn equals(&self, other: &ParameterTypeList, env: &TypeEnvironment) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| env.is(a, b))
    }

    /// Exact comparison: each pair must be the same type in both
    /// directions. Used for override matching.
    pub fn equals_exact(&self, other: &ParameterTypeList, env: &TypeEnvironment) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| a.is_exact(b, env))
    }
}

impl Display for ParameterTypeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, parameter) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", parameter)?;
        }
        write!(f, ")")
    }
}

#[derive(Debug, Clone)]
pub struct Method {
    /// Name of the class this method belongs to, set when the class is
    /// built. Used for function-name mangling.
    pub owner: Option<String>,
    pub name: String,
    pub visibility: Visibility,
    pub is_virtual: bool,
    pub return_type: Type,
    pub parameters: Vec<Parameter>,
    pub body: Option<AstNode>,
}

impl Method {
    pub fn new(
        name: impl Into<String>,
        visibility: Visibility,
        is_virtual: bool,
        return_type: Type,
        parameters: Vec<Parameter>,
        body: Option<AstNode>,
    ) -> Self {
        Method {
            owner: None,
            name: name.into(),
            visibility,
            is_virtual,
            return_type,
            parameters,
            body,
        }
    }

    pub fn parameter_types(&self) -> ParameterTypeList {
        ParameterTypeList::new(self.parameters.iter().map(|p| p.param_type.clone()).collect())
    }

    /// The function-pointer type of this method as it appears in vtable
    /// and struct-equivalent fields. The receiver is passed as a leading
    /// `void*` so one pointer type serves every level of a hierarchy.
    pub fn function_pointer(&self) -> Type {
        let mut parameters = vec![Type::void().pointer_to()];
        parameters.extend(self.parameters.iter().map(|p| p.param_type.clone()));
        Type::FunctionPointer {
            return_type: Box::new(self.return_type.clone()),
            parameters,
        }
    }

    /// Flattened name of the generated C-level function implementing
    /// this method, unique per (class, name, parameters).
    pub fn mangled_name(&self) -> String {
        let owner = self.owner.as_deref().unwrap_or("");
        format!("{}_{}{}", owner, self.name, self.parameter_mangle())
    }

    fn parameter_mangle(&self) -> String {
        self.parameters
            .iter()
            .map(|p| {
                let safe = format!("{}", p.param_type)
                    .replace(' ', "")
                    .replace('*', "p")
                    .replace('(', "L")
                    .replace(')', "")
                    .replace('[', "R")
                    .replace(']', "");
                format!("_{}", safe)
            })
            .collect()
    }

    /// Builds the trampoline that lets a subclass body explicitly reach
    /// this (shadowed) implementation after `replacement` took over the
    /// vtable slot. The body swaps the slot back to this implementation
    /// around a normal virtual call, so this-adjustment keeps working:
    ///
    /// ```text
    /// super_f(...) {
    ///     <slot fn ptr> old;
    ///     old = (*(*this).<vtable>).f;
    ///     (*(*this).<vtable>).f = <parent impl>;
    ///     output = (*this).f(...);        // dispatches to the parent
    ///     (*(*this).<vtable>).f = old;
    ///     return output;
    /// }
    /// ```
    ///
    /// The body is emitted unchecked.
    pub fn create_super_method(
        &self,
        child_class: &str,
        vtable_field: &str,
        replacement: &Method,
    ) -> Method {
        let slot = || {
            MK_FIELD_GET!(
                MK_DEREF!(MK_FIELD_GET!(MK_DEREF!(MK_ID!("this")), vtable_field)),
                replacement.name.as_str()
            )
        };

        let old_declaration = AstNode::new(crate::ast::ast::NodeKind::Declarations).with_children(
            vec![AstNode::declaration(replacement.function_pointer(), "old")],
        );
        let save_old = MK_ASSIGN!(MK_ID!("old"), slot());
        let reassign = MK_ASSIGN!(slot(), MK_ID!(self.mangled_name()));

        let mut call_arguments = vec![MK_ID!("this")];
        call_arguments.extend(self.parameters.iter().map(|p| MK_ID!(p.name.as_str())));
        let dispatch = AstNode::new(crate::ast::ast::NodeKind::MethodCall).with_children(vec![
            MK_DEREF!(MK_ID!("this")),
            MK_ID!(replacement.name.as_str()),
            AstNode::sequence(call_arguments),
        ]);

        let restore = MK_ASSIGN!(slot(), MK_ID!("old"));

        let mut statements = vec![old_declaration, save_old, reassign];
        if self.return_type.is_void() {
            statements.push(dispatch);
            statements.push(restore);
        } else {
            statements.push(
                AstNode::new(crate::ast::ast::NodeKind::Declarations).with_children(vec![
                    AstNode::declaration(self.return_type.clone(), "output"),
                ]),
            );
            statements.push(MK_ASSIGN!(MK_ID!("output"), dispatch));
            statements.push(restore);
            statements.push(
                AstNode::new(crate::ast::ast::NodeKind::Return)
                    .with_children(vec![MK_ID!("output")]),
            );
        }

        let body =
            AstNode::new(crate::ast::ast::NodeKind::CompoundStatement).with_children(statements);

        let mut method = Method::new(
            format!("super_{}", self.name),
            Visibility::Private,
            false,
            self.return_type.clone(),
            self.parameters.clone(),
            Some(body),
        );
        method.owner = Some(child_class.to_string());
        method
    }
}

/// Identifies a constructor as (class, overload index).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstructorRef {
    pub class: ClassId,
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct Constructor {
    pub visibility: Visibility,
    pub parameters: Vec<Parameter>,
    pub body: Option<AstNode>,
    /// The `this(...)`/`super(...)` chain target, resolved during body
    /// analysis.
    pub prior_constructor: Option<ConstructorRef>,
}

impl Constructor {
    pub fn new(visibility: Visibility, parameters: Vec<Parameter>, body: Option<AstNode>) -> Self {
        Constructor {
            visibility,
            parameters,
            body,
            prior_constructor: None,
        }
    }

    pub fn parameter_types(&self) -> ParameterTypeList {
        ParameterTypeList::new(self.parameters.iter().map(|p| p.param_type.clone()).collect())
    }
}
