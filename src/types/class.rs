//! The class object model: single inheritance, visibility-tagged
//! members, virtual-method-table synthesis, and super-method
//! trampolines.
//!
//! A class is built in two passes. Construction here is the signature
//! pass: fields, method and constructor signatures, and override
//! detection. Body analysis happens later in the walker. Sealing
//! registers the synthesized vtable struct and the struct equivalent in
//! the environment, once.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::ast::ast::{AstNode, NodeKind};
use crate::environment::environment::TypeEnvironment;
use crate::errors::errors::{Error, ErrorImpl};
use crate::types::compound::{CompoundType, FieldDeclaration};
use crate::types::methods::{Constructor, Method, ParameterTypeList, Visibility};
use crate::types::types::{ClassId, Type};
use crate::{MK_ASSIGN, MK_DEREF, MK_FIELD_GET, MK_ID};
use crate::{Position, Token};

#[derive(Debug, Clone)]
pub struct ClassFieldDeclaration {
    pub field_type: Type,
    pub name: String,
    pub visibility: Visibility,
}

impl ClassFieldDeclaration {
    pub fn new(field_type: Type, name: impl Into<String>, visibility: Visibility) -> Self {
        ClassFieldDeclaration {
            field_type,
            name: name.into(),
            visibility,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassType {
    pub id: ClassId,
    pub name: String,
    pub parent: Option<ClassId>,
    fields: Vec<ClassFieldDeclaration>,
    /// Slot order. The inherited prefix is preserved; overridden entries
    /// replace in place.
    virtual_method_order: Vec<Method>,
    concrete_method_order: Vec<Method>,
    /// The methods declared in this class body, in declaration order.
    instance_methods: Vec<Method>,
    constructors: Vec<Constructor>,
    visibility_map: HashMap<String, Visibility>,
    /// `(old, new)` override pairs queued for trampoline generation.
    supers_to_create: Vec<(Method, Method)>,
    generated_supers: Vec<Method>,
    init_method: Option<Method>,
    sealed: bool,
}

impl ClassType {
    /// Signature pass. `parent` must already live in the environment.
    pub fn build(
        env: &TypeEnvironment,
        id: ClassId,
        name: impl Into<String>,
        parent: Option<ClassId>,
        fields: Vec<ClassFieldDeclaration>,
        methods: Vec<Method>,
    ) -> Result<ClassType, Error> {
        let name = name.into();
        debug!("creating class {}", name);

        let (virtual_method_order, visibility_map) = match parent {
            Some(parent_id) => {
                let parent_class = env.class(parent_id);
                (
                    parent_class.virtual_method_order.clone(),
                    parent_class.visibility_map.clone(),
                )
            }
            None => (Vec::new(), HashMap::new()),
        };

        let mut class = ClassType {
            id,
            name: name.clone(),
            parent,
            fields: Vec::new(),
            virtual_method_order,
            concrete_method_order: Vec::new(),
            instance_methods: Vec::new(),
            constructors: Vec::new(),
            visibility_map,
            supers_to_create: Vec::new(),
            generated_supers: Vec::new(),
            init_method: None,
            sealed: false,
        };

        // names the parent lineage already uses, split by what may and
        // may not be shadowed
        let mut lineage_field_names = HashSet::new();
        let mut lineage_concrete_names = HashSet::new();
        if let Some(parent_id) = parent {
            for ancestor in env.lineage(parent_id) {
                let ancestor_class = env.class(ancestor);
                lineage_field_names.extend(ancestor_class.fields.iter().map(|f| f.name.clone()));
                lineage_concrete_names.extend(
                    ancestor_class
                        .concrete_method_order
                        .iter()
                        .map(|m| m.name.clone()),
                );
            }
        }

        let mut own_names: HashSet<String> = HashSet::new();

        for field in fields {
            // a field may shadow a parent field, but a name may only be
            // declared once per class body
            if own_names.contains(&field.name) {
                return Err(redeclare(&field.name));
            }
            own_names.insert(field.name.clone());
            class
                .visibility_map
                .insert(field.name.clone(), field.visibility);
            class.fields.push(field);
        }

        let mut explored: Vec<(String, ParameterTypeList)> = Vec::new();

        for mut method in methods {
            method.owner = Some(name.clone());
            class.instance_methods.push(method.clone());
            let parameter_types = method.parameter_types();

            if explored
                .iter()
                .any(|(n, p)| *n == method.name && p.equals_exact(&parameter_types, env))
            {
                return Err(redeclare(&method.name));
            }
            explored.push((method.name.clone(), parameter_types.clone()));

            if method.is_virtual {
                let slot = class.virtual_method_order.iter().position(|existing| {
                    existing.name == method.name
                        && existing
                            .parameter_types()
                            .equals_exact(&parameter_types, env)
                });
                if let Some(index) = slot {
                    let old = class.virtual_method_order[index].clone();
                    // covariance on the return type only
                    if !env.is(&method.return_type, &old.return_type) {
                        return Err(Error::new(
                            ErrorImpl::IncompatibleReturnType {
                                method: method.name.clone(),
                                expected: env.type_display(&old.return_type),
                                received: env.type_display(&method.return_type),
                            },
                            Position::null(),
                        ));
                    }
                    if old.visibility != method.visibility {
                        class
                            .visibility_map
                            .insert(method.name.clone(), method.visibility);
                    }
                    debug!(
                        "{}: virtual slot {} replaced in place by override",
                        name, method.name
                    );
                    class.virtual_method_order[index] = method.clone();
                    class.supers_to_create.push((old, method));
                    continue;
                }
                // not an override: the name must be entirely fresh
                let name_taken = own_names.contains(&method.name)
                    || lineage_field_names.contains(&method.name)
                    || lineage_concrete_names.contains(&method.name)
                    || class
                        .virtual_method_order
                        .iter()
                        .any(|m| m.name == method.name);
                if name_taken {
                    return Err(redeclare(&method.name));
                }
                own_names.insert(method.name.clone());
                class
                    .visibility_map
                    .insert(method.name.clone(), method.visibility);
                class.virtual_method_order.push(method);
            } else {
                // concrete members are never override targets: any
                // lineage-visible name collides
                let name_taken = own_names.contains(&method.name)
                    || class.visibility_map.contains_key(&method.name)
                    || lineage_field_names.contains(&method.name)
                    || lineage_concrete_names.contains(&method.name);
                if name_taken {
                    return Err(redeclare(&method.name));
                }
                own_names.insert(method.name.clone());
                class
                    .visibility_map
                    .insert(method.name.clone(), method.visibility);
                class.concrete_method_order.push(method);
            }
        }

        Ok(class)
    }

    pub fn add_constructors(&mut self, constructors: Vec<Constructor>) {
        self.constructors.extend(constructors);
    }

    pub fn fields(&self) -> &[ClassFieldDeclaration] {
        &self.fields
    }

    pub fn virtual_methods(&self) -> &[Method] {
        &self.virtual_method_order
    }

    pub fn concrete_methods(&self) -> &[Method] {
        &self.concrete_method_order
    }

    pub fn instance_methods(&self) -> &[Method] {
        &self.instance_methods
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    pub fn constructor_mut(&mut self, index: usize) -> &mut Constructor {
        &mut self.constructors[index]
    }

    pub fn generated_supers(&self) -> &[Method] {
        &self.generated_supers
    }

    pub fn visibility_of(&self, name: &str) -> Option<Visibility> {
        self.visibility_map.get(name).copied()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn mark_sealed(&mut self) {
        self.sealed = true;
    }

    pub fn field(&self, name: &str) -> Option<&ClassFieldDeclaration> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Resolves a constructor overload. `exact` selects the comparison:
    /// chain calls and `new` expressions resolve loosely, while a
    /// constructor identifying its own definition matches exactly.
    pub fn get_constructor(
        &self,
        arguments: &ParameterTypeList,
        env: &TypeEnvironment,
        exact: bool,
    ) -> Option<usize> {
        self.constructors.iter().position(|constructor| {
            let parameters = constructor.parameter_types();
            if exact {
                arguments.equals_exact(&parameters, env)
            } else {
                arguments.equals(&parameters, env)
            }
        })
    }

    /// Finds a method by name and argument types, virtual slots first.
    /// Returns the method and whether it dispatches virtually.
    pub fn get_method(
        &self,
        name: &str,
        arguments: &ParameterTypeList,
        env: &TypeEnvironment,
    ) -> Option<(Method, bool)> {
        // prefer an exact virtual match, then a loose one
        for exact in [true, false] {
            for method in &self.virtual_method_order {
                if method.name == name {
                    let parameters = method.parameter_types();
                    let matched = if exact {
                        arguments.equals_exact(&parameters, env)
                    } else {
                        arguments.equals(&parameters, env)
                    };
                    if matched {
                        return Some((method.clone(), true));
                    }
                }
            }
        }
        for ancestor in env.lineage(self.id).into_iter().rev() {
            for method in &env.class(ancestor).concrete_method_order {
                if method.name == name && arguments.equals(&method.parameter_types(), env) {
                    return Some((method.clone(), false));
                }
            }
        }
        None
    }

    /// Generates one trampoline per recorded override pair. Must run
    /// before the class body is type-checked so the trampolines join the
    /// analyzable-method set.
    pub fn generate_super_methods(&mut self, vtable_field: &str) {
        self.generated_supers = self
            .supers_to_create
            .iter()
            .map(|(old, new)| old.create_super_method(&self.name, vtable_field, new))
            .collect();
    }

    pub fn get_super_method(
        &self,
        name: &str,
        arguments: &ParameterTypeList,
        env: &TypeEnvironment,
    ) -> Option<&Method> {
        self.generated_supers.iter().find(|generated| {
            generated.name == format!("super_{}", name)
                && arguments.equals(&generated.parameter_types(), env)
        })
    }

    pub fn vtable_name(&self) -> String {
        format!("{}_vtable", self.struct_name())
    }

    pub fn struct_name(&self) -> String {
        format!("class_{}", self.name)
    }

    /// The synthesized vtable type: an `offset` slot for base-offset
    /// this-adjustment, then one function-pointer field per virtual
    /// slot, in declaration order.
    pub fn vtable_type(&self) -> CompoundType {
        let mut fields = vec![FieldDeclaration::new(Type::int(), "offset")];
        for method in &self.virtual_method_order {
            fields.push(FieldDeclaration::new(
                method.function_pointer(),
                method.name.clone(),
            ));
        }
        CompoundType::new_struct(Some(self.vtable_name()), fields)
    }

    /// The plain-struct layout of an instance: the vtable pointer, then
    /// every lineage field root-first, then one function pointer per
    /// concrete method.
    pub fn struct_equivalent(&self, env: &TypeEnvironment, vtable_field: &str) -> CompoundType {
        let vtable_pointer =
            Type::Compound(std::rc::Rc::new(self.vtable_type())).pointer_to();
        let mut fields = vec![FieldDeclaration::new(vtable_pointer, vtable_field)];
        for ancestor in env.lineage(self.id) {
            let ancestor_class = env.class(ancestor);
            for field in &ancestor_class.fields {
                fields.push(FieldDeclaration::new(
                    field.field_type.clone(),
                    field.name.clone(),
                ));
            }
            for method in &ancestor_class.concrete_method_order {
                fields.push(FieldDeclaration::new(
                    method.function_pointer(),
                    method.name.clone(),
                ));
            }
        }
        CompoundType::new_struct(Some(self.struct_name()), fields)
    }

    pub fn cached_init_method(&self) -> Option<&Method> {
        self.init_method.as_ref()
    }

    pub fn set_init_method(&mut self, method: Method) {
        self.init_method = Some(method);
    }
}

fn redeclare(name: &str) -> Error {
    Error::new(
        ErrorImpl::Redeclaration {
            name: name.to_string(),
        },
        Position::null(),
    )
}

/// Builds the allocation/initializer body for a class. This is the only
/// place the object model emits executable syntax rather than types:
///
/// ```text
/// class_X* X_init() {
///     class_X* output;
///     output = calloc(1, sizeof(struct class_X));
///     class_X_vtable* <vtable>;
///     <vtable> = malloc(sizeof(struct class_X_vtable));
///     (*output).<vtable> = <vtable>;
///     (*<vtable>).offset = 0;
///     (*<vtable>).f = <most derived impl of f>;   // per virtual slot
///     (*output).g = <impl of g>;                  // per concrete method
///     (*output).field = (T) {0};                  // per field
///     return output;
/// }
/// ```
///
/// The body is emitted unchecked; `calloc`/`malloc` appear as raw
/// identifiers the generator lowers directly.
pub fn build_init_method(
    class: &ClassType,
    all_fields: &[ClassFieldDeclaration],
    all_concrete: &[Method],
    vtable_field: &str,
) -> Method {
    let vtable_type = class.vtable_type();
    let mut statements = Vec::new();

    statements.push(
        AstNode::new(NodeKind::Declarations).with_children(vec![AstNode::declaration(
            Type::Class(class.id).pointer_to(),
            "output",
        )]),
    );
    statements.push(MK_ASSIGN!(
        MK_ID!("output"),
        MK_ID!(format!(
            "calloc(1, sizeof(struct {}))",
            class.struct_name()
        ))
    ));

    statements.push(
        AstNode::new(NodeKind::Declarations).with_children(vec![AstNode::declaration(
            Type::Compound(std::rc::Rc::new(vtable_type)).pointer_to(),
            vtable_field,
        )]),
    );
    statements.push(MK_ASSIGN!(
        MK_ID!(vtable_field),
        MK_ID!(format!("malloc(sizeof(struct {}))", class.vtable_name()))
    ));

    statements.push(MK_ASSIGN!(
        MK_FIELD_GET!(MK_DEREF!(MK_ID!("output")), vtable_field),
        MK_ID!(vtable_field)
    ));
    statements.push(MK_ASSIGN!(
        MK_FIELD_GET!(MK_DEREF!(MK_ID!(vtable_field)), "offset"),
        AstNode::literal("0")
    ));

    for method in class.virtual_methods() {
        statements.push(MK_ASSIGN!(
            MK_FIELD_GET!(MK_DEREF!(MK_ID!(vtable_field)), method.name.as_str()),
            MK_ID!(method.mangled_name())
        ));
    }
    for method in all_concrete {
        statements.push(MK_ASSIGN!(
            MK_FIELD_GET!(MK_DEREF!(MK_ID!("output")), method.name.as_str()),
            MK_ID!(method.mangled_name())
        ));
    }
    for field in all_fields {
        let zero = AstNode::new(NodeKind::Cast)
            .with_type(field.field_type.clone())
            .with_children(vec![AstNode::new(NodeKind::Identifier)
                .with_token(Token::synthetic("{0}"))]);
        statements.push(MK_ASSIGN!(
            MK_FIELD_GET!(MK_DEREF!(MK_ID!("output")), field.name.as_str()),
            zero
        ));
    }

    statements.push(AstNode::new(NodeKind::Return).with_children(vec![MK_ID!("output")]));

    let body = AstNode::new(NodeKind::CompoundStatement).with_children(statements);
    let mut method = Method::new(
        format!("{}_init", class.struct_name()),
        Visibility::Public,
        false,
        Type::Class(class.id).pointer_to(),
        Vec::new(),
        Some(body),
    );
    method.owner = Some(class.name.clone());
    method
}
