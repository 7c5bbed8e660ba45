use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use log::{debug, info, trace};

use crate::ast::ast::{AstNode, NodeKind};
use crate::errors::errors::{Error, ErrorImpl};
use crate::types::class::{
    build_init_method, ClassFieldDeclaration, ClassType,
};
use crate::types::compound::{CompoundKind, CompoundType};
use crate::types::methods::{Constructor, Method, Parameter, Visibility};
use crate::types::types::{ClassId, NamedKind, Primitive, PrimitiveKind, Type, Width};
use crate::Position;

const PRIMITIVE_NAMES: &[&str] = &[
    "char", "short", "int", "long", "unsigned", "float", "double",
];

/// The registry of named types for one compilation run.
pub struct TypeEnvironment {
    type_definitions: HashMap<String, Type>,
    named_compound_types: HashMap<String, Type>,
    classes: Vec<ClassType>,
    /// Forward references that have not yet seen a real definition.
    late_bound_references: HashSet<(NamedKind, String)>,

    current_namespace: Vec<String>,
    namespaces: HashMap<String, Vec<String>>,
    used_namespaces: Vec<String>,

    pointer_size: u64,
    char_size: u64,
    short_size: u64,
    int_size: u64,
    long_size: u64,
    long_long_size: u64,
    float_size: u64,
    double_size: u64,
    long_double_size: u64,

    standard_boolean_defined: bool,
}

impl Default for TypeEnvironment {
    fn default() -> Self {
        TypeEnvironment::new()
    }
}

impl TypeEnvironment {
    pub fn new() -> Self {
        info!("type environment created");
        TypeEnvironment {
            type_definitions: HashMap::new(),
            named_compound_types: HashMap::new(),
            classes: Vec::new(),
            late_bound_references: HashSet::new(),
            current_namespace: Vec::new(),
            namespaces: HashMap::new(),
            used_namespaces: Vec::new(),
            pointer_size: 8,
            char_size: 1,
            short_size: 2,
            int_size: 4,
            long_size: 8,
            long_long_size: 8,
            float_size: 4,
            double_size: 8,
            long_double_size: 10,
            standard_boolean_defined: false,
        }
    }

    /// The standard environment pre-registers `boolean` as an alias for
    /// `unsigned short`, the type comparison operators produce.
    pub fn standard() -> Self {
        let mut environment = TypeEnvironment::new();
        environment
            .add_type_definition(Type::unsigned_short(), "boolean")
            .unwrap();
        environment.standard_boolean_defined = true;
        environment
    }

    pub fn is_standard_boolean_defined(&self) -> bool {
        self.standard_boolean_defined
    }

    /// The registered boolean typedef, if any.
    pub fn boolean_type(&self) -> Option<Type> {
        self.type_definitions.get("boolean").cloned()
    }

    // ------------------------------------------------------------------
    // typedefs

    pub fn add_type_definition(
        &mut self,
        definition: Type,
        name: &str,
    ) -> Result<Type, Error> {
        if PRIMITIVE_NAMES.contains(&name) {
            return Err(Error::new(
                ErrorImpl::PrimitiveTypeDefinition {
                    name: name.to_string(),
                },
                Position::null(),
            ));
        }
        if name == "void" {
            return Err(Error::new(ErrorImpl::VoidType, Position::null()));
        }
        if let Some(existing) = self.type_definitions.get(name) {
            if !definition.is_exact(existing, self) {
                return Err(Error::new(
                    ErrorImpl::TypeDefinitionAlreadyExists {
                        name: name.to_string(),
                    },
                    Position::null(),
                ));
            }
        }
        let alias = Type::Alias {
            name: name.to_string(),
            inner: Box::new(definition.clone()),
        };
        self.type_definitions.insert(name.to_string(), alias);
        Ok(definition)
    }

    pub fn remove_type_definition(&mut self, name: &str) {
        self.type_definitions.remove(name);
    }

    pub fn typedef_exists(&self, name: &str) -> bool {
        self.type_definitions.contains_key(name)
    }

    pub fn get_type_definition(&self, name: &str) -> Option<&Type> {
        self.type_definitions.get(name)
    }

    // ------------------------------------------------------------------
    // named compound types

    pub fn add_named_compound_type(&mut self, compound: CompoundType) -> Result<(), Error> {
        let name = match &compound.name {
            Some(name) => name.clone(),
            // anonymous aggregates are not registered
            None => return Ok(()),
        };
        let kind = match compound.kind {
            CompoundKind::Struct => NamedKind::Struct,
            CompoundKind::Union => NamedKind::Union,
        };
        self.register_named(&name, Type::Compound(Rc::new(compound)))?;
        self.late_bound_references.remove(&(kind, name));
        Ok(())
    }

    fn register_named(&mut self, name: &str, entry: Type) -> Result<(), Error> {
        let key = self.qualified(name);
        if self.named_compound_types.contains_key(&key) {
            return Err(Error::new(
                ErrorImpl::TypeAlreadyExists {
                    name: name.to_string(),
                },
                Position::null(),
            ));
        }
        self.named_compound_types.insert(key, entry);
        self.namespaces
            .entry(self.current_namespace.join("::"))
            .or_default()
            .push(name.to_string());
        Ok(())
    }

    pub fn named_compound_type_exists(&self, name: &str) -> bool {
        matches!(self.resolve_compound_name(name), Ok(Some(_)))
    }

    pub fn get_named_compound_type(&self, name: &str) -> Option<Type> {
        self.resolve_compound_name(name).ok().flatten()
    }

    /// Walks namespaces innermost-outward, then the `using`d ones.
    /// Finding the name through more than one used namespace is
    /// ambiguous.
    pub fn resolve_compound_name(&self, name: &str) -> Result<Option<Type>, Error> {
        if let Some(entry) = self.named_compound_types.get(name) {
            return Ok(Some(entry.clone()));
        }
        let mut prefix = self.current_namespace.clone();
        while !prefix.is_empty() {
            let key = format!("{}::{}", prefix.join("::"), name);
            if let Some(entry) = self.named_compound_types.get(&key) {
                return Ok(Some(entry.clone()));
            }
            prefix.pop();
        }
        let mut hits = Vec::new();
        for used in &self.used_namespaces {
            let key = format!("{}::{}", used, name);
            if let Some(entry) = self.named_compound_types.get(&key) {
                hits.push(entry.clone());
            }
        }
        if hits.len() > 1 {
            return Err(Error::new(
                ErrorImpl::AmbiguousIdentifier {
                    identifier: name.to_string(),
                },
                Position::null(),
            ));
        }
        Ok(hits.into_iter().next())
    }

    pub fn resolve_indirection(&self, kind: NamedKind, name: &str) -> Option<Type> {
        let resolved = self.resolve_compound_name(name).ok().flatten()?;
        match (&resolved, kind) {
            (Type::Class(_), NamedKind::Class) => Some(resolved),
            (Type::Compound(compound), NamedKind::Struct)
                if compound.kind == CompoundKind::Struct =>
            {
                Some(resolved)
            }
            (Type::Compound(compound), NamedKind::Union)
                if compound.kind == CompoundKind::Union =>
            {
                Some(resolved)
            }
            _ => None,
        }
    }

    /// No pending forward references may survive the compilation unit.
    pub fn no_type_errors(&self) -> bool {
        self.late_bound_references.is_empty()
    }

    pub fn unresolved_reference_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .late_bound_references
            .iter()
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        names
    }

    // ------------------------------------------------------------------
    // namespaces

    pub fn push_namespace(&mut self, name: &str) {
        self.current_namespace.push(name.to_string());
        self.namespaces
            .entry(self.current_namespace.join("::"))
            .or_default();
    }

    pub fn pop_namespace(&mut self) {
        self.current_namespace.pop();
    }

    pub fn use_namespace(&mut self, path: &str) {
        if !self.used_namespaces.iter().any(|used| used == path) {
            self.used_namespaces.push(path.to_string());
        }
    }

    pub fn stop_use_namespace(&mut self, path: &str) {
        self.used_namespaces.retain(|used| used != path);
    }

    fn qualified(&self, name: &str) -> String {
        if self.current_namespace.is_empty() {
            name.to_string()
        } else {
            format!("{}::{}", self.current_namespace.join("::"), name)
        }
    }

    // ------------------------------------------------------------------
    // classes

    pub fn class(&self, id: ClassId) -> &ClassType {
        &self.classes[id.0]
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassType {
        &mut self.classes[id.0]
    }

    /// Ordered list of a class and all its ancestors, root first.
    pub fn lineage(&self, id: ClassId) -> Vec<ClassId> {
        let mut output = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            output.insert(0, current);
            cursor = self.classes[current.0].parent;
        }
        output
    }

    pub fn class_data_size(&self, id: ClassId) -> u64 {
        self.class(id)
            .struct_equivalent(self, "vtable")
            .data_size(self)
    }

    /// Registers a new class: runs the signature pass (override
    /// detection included) and enters the name into the registry.
    pub fn define_class(
        &mut self,
        name: &str,
        parent: Option<ClassId>,
        fields: Vec<ClassFieldDeclaration>,
        methods: Vec<Method>,
        constructors: Vec<Constructor>,
    ) -> Result<ClassId, Error> {
        let id = ClassId(self.classes.len());
        let mut class = ClassType::build(self, id, name, parent, fields, methods)?;
        class.add_constructors(constructors);
        info!(
            "created class {}{}",
            name,
            match parent {
                Some(parent_id) => format!(" : {}", self.class(parent_id).name),
                None => String::new(),
            }
        );
        self.classes.push(class);
        self.register_named(name, Type::Class(id))?;
        self.late_bound_references
            .remove(&(NamedKind::Class, name.to_string()));
        Ok(id)
    }

    pub fn generate_super_methods(&mut self, id: ClassId, vtable_field: &str) {
        self.classes[id.0].generate_super_methods(vtable_field);
    }

    /// Lazily builds (and caches) the allocation/initializer method.
    pub fn init_method(&mut self, id: ClassId, vtable_field: &str) -> Method {
        if let Some(cached) = self.class(id).cached_init_method() {
            return cached.clone();
        }
        let mut all_fields = Vec::new();
        let mut all_concrete = Vec::new();
        for ancestor in self.lineage(id) {
            let ancestor_class = self.class(ancestor);
            all_fields.extend(ancestor_class.fields().to_vec());
            all_concrete.extend(ancestor_class.concrete_methods().to_vec());
        }
        let method = build_init_method(self.class(id), &all_fields, &all_concrete, vtable_field);
        self.classes[id.0].set_init_method(method.clone());
        method
    }

    /// Seals a class: registers the synthesized vtable struct and the
    /// struct equivalent. Runs at most once per class.
    pub fn seal_class(&mut self, id: ClassId, vtable_field: &str) -> Result<(), Error> {
        if self.class(id).is_sealed() {
            return Ok(());
        }
        let vtable = self.class(id).vtable_type();
        let struct_equivalent = self.class(id).struct_equivalent(self, vtable_field);
        self.classes[id.0].mark_sealed();
        self.add_named_compound_type(vtable)?;
        self.add_named_compound_type(struct_equivalent)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // the `is` relation

    /// Checks if a value of type `a` may be used where `b` is expected,
    /// with const stripping for going from non-const to const.
    pub fn is(&self, a: &Type, b: &Type) -> bool {
        a.is(b, self, false)
    }

    /// Same as [`TypeEnvironment::is`] with strict primitive checking:
    /// width and signedness coercion are forbidden.
    pub fn is_strict(&self, a: &Type, b: &Type) -> bool {
        a.is(b, self, true)
    }

    /// Human-readable type name with class ids resolved.
    pub fn type_display(&self, ty: &Type) -> String {
        match ty {
            Type::Class(id) => self.class(*id).name.clone(),
            Type::Pointer(pointee) => format!("{}*", self.type_display(pointee)),
            Type::Constant(inner) => format!("const {}", self.type_display(inner)),
            Type::Array { element, length } => match length {
                Some(n) => format!("{}[{}]", self.type_display(element), n),
                None => format!("{}[]", self.type_display(element)),
            },
            Type::FunctionPointer {
                return_type,
                parameters,
            } => format!(
                "{}({})",
                self.type_display(return_type),
                parameters
                    .iter()
                    .map(|p| self.type_display(p))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            other => format!("{}", other),
        }
    }

    // ------------------------------------------------------------------
    // building types from syntax

    /// Folds a type-denoting syntax node into a `Type`. Pre-typed nodes
    /// short-circuit; specifiers are canonicalized before folding so
    /// `unsigned long` and `long unsigned` normalize identically.
    pub fn get_type(&mut self, ast: &AstNode) -> Result<Type, Error> {
        if let Some(declared) = &ast.declared_type {
            return Ok(declared.clone());
        }
        trace!("resolving type syntax {:?}", ast.kind);

        match ast.kind {
            NodeKind::TypeName => {
                let token = ast.token.clone().ok_or_else(|| {
                    Error::new(
                        ErrorImpl::TypeDoesNotExist {
                            type_name: String::from("<missing>"),
                        },
                        ast.position(),
                    )
                })?;
                self.resolve_type_name(&token.value, ast.position())
            }
            NodeKind::PointerTo => Ok(self.get_type(ast.child(0))?.pointer_to()),
            NodeKind::ArrayOf => {
                let element = self.get_type(ast.child(0))?;
                let length = ast
                    .token_value()
                    .and_then(|image| image.parse::<u64>().ok());
                Ok(Type::Array {
                    element: Box::new(element),
                    length,
                })
            }
            NodeKind::QualifiersAndSpecifiers => self.fold_specifiers(ast),
            NodeKind::Specifier => self.specifier_type(ast),
            NodeKind::CompoundTypeReference => self.compound_reference(ast),
            NodeKind::ClassDefinition => {
                let id = self.define_class_from_ast(ast)?;
                Ok(Type::Class(id))
            }
            _ => Err(Error::new(
                ErrorImpl::TypeDoesNotExist {
                    type_name: format!("{:?}", ast.kind),
                },
                ast.position(),
            )),
        }
    }

    fn resolve_type_name(&self, name: &str, position: Position) -> Result<Type, Error> {
        if let Some(primitive) = primitive_word(name) {
            return Ok(primitive);
        }
        if let Some(definition) = self.type_definitions.get(name) {
            return Ok(definition.clone());
        }
        match self.resolve_compound_name(name)? {
            // a bare class name denotes an object reference
            Some(Type::Class(id)) => Ok(Type::Class(id).pointer_to()),
            Some(other) => Ok(other),
            None => Err(Error::new(
                ErrorImpl::TypeDoesNotExist {
                    type_name: name.to_string(),
                },
                position,
            )),
        }
    }

    /// Canonical specifier order: typenames and compound references
    /// first, then base primitives, then `short`/`long`, then
    /// `unsigned`.
    fn specifier_order(node: &AstNode) -> u8 {
        match node.token_value() {
            Some("char") | Some("int") | Some("float") | Some("double") | Some("void") => 1,
            Some("short") | Some("long") => 2,
            Some("unsigned") => 3,
            _ => 0,
        }
    }

    fn fold_specifiers(&mut self, ast: &AstNode) -> Result<Type, Error> {
        let mut specifiers: Vec<&AstNode> = ast
            .children
            .iter()
            .filter(|c| c.kind == NodeKind::Specifier || c.kind == NodeKind::CompoundTypeReference)
            .collect();
        specifiers.sort_by_key(|node| Self::specifier_order(node));

        let mut folded: Option<Type> = None;
        for specifier in specifiers {
            match folded.take() {
                None => {
                    folded = Some(self.specifier_type(specifier)?);
                }
                Some(base) => {
                    let word = specifier.token_value().unwrap_or_default().to_string();
                    folded = Some(apply_modifier(base, &word, specifier.position())?);
                }
            }
        }
        let mut result = folded.ok_or_else(|| {
            Error::new(
                ErrorImpl::TypeDoesNotExist {
                    type_name: String::from("<empty specifier list>"),
                },
                ast.position(),
            )
        })?;

        for qualifier in ast.children_of(NodeKind::Qualifier) {
            match qualifier.token_value() {
                Some("const") => result = result.constant(),
                other => {
                    return Err(Error::new(
                        ErrorImpl::InvalidPrimitive {
                            modifier: other.unwrap_or_default().to_string(),
                            base: self.type_display(&result),
                        },
                        qualifier.position(),
                    ))
                }
            }
        }
        Ok(result)
    }

    fn specifier_type(&mut self, ast: &AstNode) -> Result<Type, Error> {
        if ast.kind == NodeKind::CompoundTypeReference {
            return self.compound_reference(ast);
        }
        if let Some(reference) = ast.find_child(NodeKind::CompoundTypeReference) {
            return self.compound_reference(reference);
        }
        match ast.token_value() {
            Some(name) => self.resolve_type_name(name, ast.position()),
            None => Err(Error::new(
                ErrorImpl::TypeDoesNotExist {
                    type_name: String::from("<missing specifier>"),
                },
                ast.position(),
            )),
        }
    }

    /// A `struct X`/`union X`/`class X` reference. Naming a
    /// not-yet-declared type produces a late-bound placeholder that is
    /// transparently resolved once the real declaration registers.
    fn compound_reference(&mut self, ast: &AstNode) -> Result<Type, Error> {
        let kind = match ast.child(0).token_value() {
            Some("struct") => NamedKind::Struct,
            Some("union") => NamedKind::Union,
            Some("class") => NamedKind::Class,
            other => {
                return Err(Error::new(
                    ErrorImpl::TypeDoesNotExist {
                        type_name: other.unwrap_or_default().to_string(),
                    },
                    ast.position(),
                ))
            }
        };
        let name = ast
            .child(1)
            .token_value()
            .unwrap_or_default()
            .to_string();

        if let Some(resolved) = self.resolve_indirection(kind, &name) {
            return Ok(resolved);
        }
        debug!("late-bound reference to {:?} {}", kind, name);
        self.late_bound_references.insert((kind, name.clone()));
        Ok(Type::NamedIndirection { kind, name })
    }

    /// Recursive descent over a class-definition node: collects fields,
    /// method and constructor signatures (with visibilities), resolves
    /// the parent, and runs the signature pass.
    pub fn define_class_from_ast(&mut self, ast: &AstNode) -> Result<ClassId, Error> {
        let name = ast
            .token_value()
            .ok_or_else(|| {
                Error::new(
                    ErrorImpl::TypeDoesNotExist {
                        type_name: String::from("<anonymous class>"),
                    },
                    ast.position(),
                )
            })?
            .to_string();

        let parent = match ast.find_child(NodeKind::Inherit) {
            Some(inherit) => {
                let parent_type = self.get_type(inherit.child(0))?;
                match parent_type.value_type() {
                    Type::Class(id) => Some(*id),
                    Type::Pointer(pointee) => match pointee.value_type() {
                        Type::Class(id) => Some(*id),
                        _ => {
                            return Err(Error::new(
                                ErrorImpl::TypeDoesNotExist {
                                    type_name: self.type_display(&parent_type),
                                },
                                inherit.position(),
                            ))
                        }
                    },
                    _ => {
                        return Err(Error::new(
                            ErrorImpl::TypeDoesNotExist {
                                type_name: self.type_display(&parent_type),
                            },
                            inherit.position(),
                        ))
                    }
                }
            }
            None => None,
        };

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        let mut constructors = Vec::new();

        for declaration in ast.children_of(NodeKind::ClassLevelDeclaration) {
            let visibility = parse_visibility(declaration.token_value())?;
            for member in &declaration.children {
                match member.kind {
                    NodeKind::Declarations => {
                        for field in &member.children {
                            let field_type = self.get_type(field)?;
                            let field_name = field
                                .find_child(NodeKind::Identifier)
                                .and_then(|id| id.token_value())
                                .unwrap_or_default()
                                .to_string();
                            fields.push(ClassFieldDeclaration::new(
                                field_type, field_name, visibility,
                            ));
                        }
                    }
                    NodeKind::FunctionDefinition | NodeKind::FunctionDescription => {
                        methods.push(self.method_from_ast(member, visibility)?);
                    }
                    NodeKind::ConstructorDefinition => {
                        let parameters = self
                            .parameters_from_ast(member.find_child(NodeKind::ParameterList))?;
                        let body = member.find_child(NodeKind::CompoundStatement).cloned();
                        constructors.push(Constructor::new(visibility, parameters, body));
                    }
                    _ => {}
                }
            }
        }

        self.define_class(&name, parent, fields, methods, constructors)
    }

    fn method_from_ast(&mut self, ast: &AstNode, visibility: Visibility) -> Result<Method, Error> {
        let return_type = match &ast.declared_type {
            Some(declared) => declared.clone(),
            None => {
                return Err(Error::new(
                    ErrorImpl::TypeDoesNotExist {
                        type_name: String::from("<missing return type>"),
                    },
                    ast.position(),
                ))
            }
        };
        let name = ast
            .find_child(NodeKind::Identifier)
            .and_then(|id| id.token_value())
            .unwrap_or_default()
            .to_string();
        let is_virtual = ast.has_child(NodeKind::Virtual);
        let parameters = self.parameters_from_ast(ast.find_child(NodeKind::ParameterList))?;
        let body = ast.find_child(NodeKind::CompoundStatement).cloned();
        Ok(Method::new(
            name,
            visibility,
            is_virtual,
            return_type,
            parameters,
            body,
        ))
    }

    fn parameters_from_ast(&mut self, ast: Option<&AstNode>) -> Result<Vec<Parameter>, Error> {
        let mut parameters = Vec::new();
        if let Some(list) = ast {
            for declaration in list.children_of(NodeKind::Declaration) {
                let param_type = self.get_type(declaration)?;
                let param_name = declaration
                    .find_child(NodeKind::Identifier)
                    .and_then(|id| id.token_value())
                    .unwrap_or_default()
                    .to_string();
                parameters.push(Parameter::new(param_type, param_name));
            }
        }
        Ok(parameters)
    }

    // ------------------------------------------------------------------
    // configured widths

    pub fn pointer_size(&self) -> u64 {
        self.pointer_size
    }

    pub fn char_size(&self) -> u64 {
        self.char_size
    }

    pub fn short_size(&self) -> u64 {
        self.short_size
    }

    pub fn int_size(&self) -> u64 {
        self.int_size
    }

    pub fn long_size(&self) -> u64 {
        self.long_size
    }

    pub fn long_long_size(&self) -> u64 {
        self.long_long_size
    }

    pub fn float_size(&self) -> u64 {
        self.float_size
    }

    pub fn double_size(&self) -> u64 {
        self.double_size
    }

    pub fn long_double_size(&self) -> u64 {
        self.long_double_size
    }

    pub fn set_pointer_size(&mut self, size: u64) {
        self.pointer_size = size;
    }

    pub fn set_char_size(&mut self, size: u64) {
        self.char_size = size;
    }

    pub fn set_short_size(&mut self, size: u64) {
        self.short_size = size;
    }

    pub fn set_int_size(&mut self, size: u64) {
        self.int_size = size;
    }

    pub fn set_long_size(&mut self, size: u64) {
        self.long_size = size;
    }

    pub fn set_long_long_size(&mut self, size: u64) {
        self.long_long_size = size;
    }

    pub fn set_float_size(&mut self, size: u64) {
        self.float_size = size;
    }

    pub fn set_double_size(&mut self, size: u64) {
        self.double_size = size;
    }

    pub fn set_long_double_size(&mut self, size: u64) {
        self.long_double_size = size;
    }
}

fn primitive_word(name: &str) -> Option<Type> {
    match name {
        "void" => Some(Type::void()),
        "char" => Some(Type::char_type()),
        "int" => Some(Type::int()),
        "float" => Some(Type::Primitive(Primitive::FLOAT)),
        "double" => Some(Type::double()),
        "unsigned" => Some(Type::Primitive(Primitive::INT.unsigned())),
        "long" => Some(Type::long_int()),
        "short" => Some(Type::Primitive(Primitive::INT.with_width(Width::Short))),
        _ => None,
    }
}

fn parse_visibility(word: Option<&str>) -> Result<Visibility, Error> {
    match word {
        Some("public") => Ok(Visibility::Public),
        Some("internal") => Ok(Visibility::Internal),
        Some("private") => Ok(Visibility::Private),
        other => Err(Error::new(
            ErrorImpl::TypeDoesNotExist {
                type_name: format!("<visibility {:?}>", other),
            },
            Position::null(),
        )),
    }
}

/// Applies a width or signedness modifier to an already-folded base.
fn apply_modifier(base: Type, word: &str, position: Position) -> Result<Type, Error> {
    let invalid = |base: &Type| {
        Error::new(
            ErrorImpl::InvalidPrimitive {
                modifier: word.to_string(),
                base: format!("{}", base),
            },
            position.clone(),
        )
    };
    let mut primitive = match base {
        Type::Primitive(primitive) => primitive,
        other => return Err(invalid(&other)),
    };
    match word {
        "long" => match (primitive.kind, primitive.width) {
            (PrimitiveKind::Int, Width::Default) => primitive.width = Width::Long,
            (PrimitiveKind::Int, Width::Long) => primitive.width = Width::LongLong,
            (PrimitiveKind::Double, Width::Default) => primitive.width = Width::Long,
            _ => return Err(invalid(&Type::Primitive(primitive))),
        },
        "short" => match (primitive.kind, primitive.width) {
            (PrimitiveKind::Int, Width::Default) => primitive.width = Width::Short,
            _ => return Err(invalid(&Type::Primitive(primitive))),
        },
        "unsigned" => {
            if !primitive.is_integral() || primitive.unsigned {
                return Err(invalid(&Type::Primitive(primitive)));
            }
            primitive.unsigned = true;
        }
        _ => return Err(invalid(&Type::Primitive(primitive))),
    }
    Ok(Type::Primitive(primitive))
}
