//! The closed type representation and the `is` relation.
//!
//! `a.is(b, env)` reads "a value of type `a` may be used where `b` is
//! expected". The environment participates because class subtyping walks
//! the class table and late-bound names resolve through the registry.
//! Prefer `TypeEnvironment::is`/`is_strict`, which unwrap typedefs and
//! strip right-hand `const` before delegating here.

use std::fmt::{self, Display};
use std::rc::Rc;

use crate::environment::environment::TypeEnvironment;
use crate::types::compound::{CompoundKind, CompoundType};

/// Index of a class in the environment's class table. Classes are
/// addressed by id so types stay cheap to clone while the object model
/// keeps appending synthesized members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub usize);

/// Which flavor of aggregate a late-bound name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKind {
    Struct,
    Union,
    Class,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Void,
    Char,
    Int,
    Float,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Default,
    Short,
    Long,
    LongLong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Primitive {
    pub kind: PrimitiveKind,
    pub unsigned: bool,
    pub width: Width,
}

impl Primitive {
    pub const fn new(kind: PrimitiveKind) -> Self {
        Primitive {
            kind,
            unsigned: false,
            width: Width::Default,
        }
    }

    pub const VOID: Primitive = Primitive::new(PrimitiveKind::Void);
    pub const CHAR: Primitive = Primitive::new(PrimitiveKind::Char);
    pub const INT: Primitive = Primitive::new(PrimitiveKind::Int);
    pub const FLOAT: Primitive = Primitive::new(PrimitiveKind::Float);
    pub const DOUBLE: Primitive = Primitive::new(PrimitiveKind::Double);

    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    pub fn with_width(mut self, width: Width) -> Self {
        self.width = width;
        self
    }

    pub fn is_integral(&self) -> bool {
        matches!(self.kind, PrimitiveKind::Char | PrimitiveKind::Int)
    }

    pub fn is_floating_point(&self) -> bool {
        matches!(self.kind, PrimitiveKind::Float | PrimitiveKind::Double)
    }

    /// The specifier/qualifier words that denote this primitive, in
    /// canonical order (base first, then width, then signedness).
    pub fn specifiers(&self) -> Vec<String> {
        let mut output = vec![match self.kind {
            PrimitiveKind::Void => "void",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
        .to_string()];
        match self.width {
            Width::Default => {}
            Width::Short => output.push("short".to_string()),
            Width::Long => output.push("long".to_string()),
            Width::LongLong => {
                output.push("long".to_string());
                output.push("long".to_string());
            }
        }
        if self.unsigned {
            output.push("unsigned".to_string());
        }
        output
    }
}

impl Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unsigned {
            write!(f, "unsigned ")?;
        }
        match self.width {
            Width::Default => {}
            Width::Short => write!(f, "short ")?,
            Width::Long => write!(f, "long ")?,
            Width::LongLong => write!(f, "long long ")?,
        }
        match self.kind {
            PrimitiveKind::Void => write!(f, "void"),
            PrimitiveKind::Char => write!(f, "char"),
            PrimitiveKind::Int => write!(f, "int"),
            PrimitiveKind::Float => write!(f, "float"),
            PrimitiveKind::Double => write!(f, "double"),
        }
    }
}

/// Every kind of type usable in the language.
#[derive(Debug, Clone)]
pub enum Type {
    Primitive(Primitive),
    Pointer(Box<Type>),
    Array {
        element: Box<Type>,
        length: Option<u64>,
    },
    /// Qualifies another type as non-assignable.
    Constant(Box<Type>),
    FunctionPointer {
        return_type: Box<Type>,
        parameters: Vec<Type>,
    },
    /// A struct or union aggregate.
    Compound(Rc<CompoundType>),
    Class(ClassId),
    /// A reference to a compound type by name before its definition has
    /// been registered.
    NamedIndirection {
        kind: NamedKind,
        name: String,
    },
    /// A typedef. Transparent to `is`, opaque to display.
    Alias {
        name: String,
        inner: Box<Type>,
    },
}

impl Type {
    pub fn void() -> Type {
        Type::Primitive(Primitive::VOID)
    }

    pub fn char_type() -> Type {
        Type::Primitive(Primitive::CHAR)
    }

    pub fn int() -> Type {
        Type::Primitive(Primitive::INT)
    }

    pub fn long_int() -> Type {
        Type::Primitive(Primitive::INT.with_width(Width::Long))
    }

    pub fn unsigned_short() -> Type {
        Type::Primitive(Primitive::INT.with_width(Width::Short).unsigned())
    }

    pub fn unsigned_char() -> Type {
        Type::Primitive(Primitive::CHAR.unsigned())
    }

    pub fn unsigned_long() -> Type {
        Type::Primitive(Primitive::INT.with_width(Width::Long).unsigned())
    }

    pub fn double() -> Type {
        Type::Primitive(Primitive::DOUBLE)
    }

    pub fn pointer_to(self) -> Type {
        Type::Pointer(Box::new(self))
    }

    pub fn constant(self) -> Type {
        Type::Constant(Box::new(self))
    }

    /// Strips typedef aliases.
    pub fn unaliased(&self) -> &Type {
        match self {
            Type::Alias { inner, .. } => inner.unaliased(),
            other => other,
        }
    }

    /// Strips typedef aliases and a `const` qualifier.
    pub fn value_type(&self) -> &Type {
        match self.unaliased() {
            Type::Constant(inner) => inner.value_type(),
            other => other,
        }
    }

    /// Whether the type is primitive in the C sense: a scalar, pointer,
    /// or array, possibly const-qualified or typedef'd.
    pub fn is_primitive(&self) -> bool {
        match self {
            Type::Primitive(_) | Type::Pointer(_) | Type::Array { .. } => true,
            Type::Constant(inner) => inner.is_primitive(),
            Type::Alias { inner, .. } => inner.is_primitive(),
            _ => false,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(
            self.unaliased(),
            Type::Primitive(Primitive {
                kind: PrimitiveKind::Void,
                ..
            })
        )
    }

    pub fn is_void_pointer(&self) -> bool {
        match self.unaliased() {
            Type::Pointer(inner) => inner.is_void(),
            _ => false,
        }
    }

    /// Returns whether this "is" another type, where "is" reads as
    /// usability: `self` may be used where `other` is expected.
    pub fn is(&self, other: &Type, env: &TypeEnvironment, strict: bool) -> bool {
        // typedef aliases are transparent on either side
        if let Type::Alias { inner, .. } = self {
            return inner.is(other, env, strict);
        }
        if let Type::Alias { inner, .. } = other {
            return self.is(inner, env, strict);
        }
        // a non-const value may always be used where a const is expected
        if let Type::Constant(inner) = other {
            if !matches!(self, Type::Constant(_)) {
                return self.is(inner, env, strict);
            }
        }

        match (self, other) {
            (Type::Constant(a), Type::Constant(b)) => a.is(b, env, strict),
            // a const scalar is readable as a plain value
            (Type::Constant(a), _) => {
                matches!(a.unaliased(), Type::Primitive(_)) && a.is(other, env, strict)
            }
            (Type::Pointer(pointee), Type::Pointer(_) | Type::Array { .. }) => {
                Type::pointer_is(pointee, other, env, strict)
            }
            (Type::Array { element, .. }, Type::Pointer(_) | Type::Array { .. }) => {
                Type::pointer_is(element, other, env, strict)
            }
            (
                Type::FunctionPointer {
                    return_type: r1,
                    parameters: p1,
                },
                Type::FunctionPointer {
                    return_type: r2,
                    parameters: p2,
                },
            ) => {
                r1.is_exact(r2, env)
                    && p1.len() == p2.len()
                    && p1.iter().zip(p2.iter()).all(|(a, b)| a.is_exact(b, env))
            }
            (Type::Compound(a), Type::Compound(b)) => {
                a.kind == b.kind
                    && match (&a.name, &b.name) {
                        (Some(n1), Some(n2)) => n1 == n2,
                        // anonymous aggregates are never equal to anything
                        _ => false,
                    }
            }
            (Type::Compound(a), Type::NamedIndirection { kind, name }) => {
                compound_matches_kind(a.kind, *kind) && a.name.as_deref() == Some(name.as_str())
            }
            (Type::Class(a), Type::Class(b)) => env.lineage(*a).contains(b),
            (
                Type::Class(_),
                Type::NamedIndirection {
                    kind: NamedKind::Class,
                    name,
                },
            ) => match env.resolve_indirection(NamedKind::Class, name) {
                Some(resolved) => self.is(&resolved, env, strict),
                None => false,
            },
            (Type::NamedIndirection { kind, name }, _) => {
                match env.resolve_indirection(*kind, name) {
                    Some(resolved) => resolved.is(other, env, strict),
                    None => match other {
                        Type::NamedIndirection {
                            kind: other_kind,
                            name: other_name,
                        } => kind == other_kind && name == other_name,
                        _ => false,
                    },
                }
            }
            (_, Type::NamedIndirection { kind, name }) => {
                match env.resolve_indirection(*kind, name) {
                    Some(resolved) => self.is(&resolved, env, strict),
                    None => false,
                }
            }
            (Type::Primitive(a), Type::Primitive(b)) => {
                if strict {
                    a == b
                } else {
                    Type::primitive_is(a, b)
                }
            }
            _ => false,
        }
    }

    /// Pointer/array usability. The two are mutually substitutable at
    /// the top level (array-to-pointer decay) but nested pointees must
    /// match exactly.
    fn pointer_is(pointee: &Type, other: &Type, env: &TypeEnvironment, strict: bool) -> bool {
        let other_pointee = match other.unaliased() {
            Type::Pointer(sub) => sub,
            Type::Array { element, .. } => element,
            _ => return false,
        };
        // void* is a universal pointer value and target
        if pointee.is_void() || other_pointee.is_void() {
            return true;
        }
        if matches!(pointee.unaliased(), Type::Pointer(_))
            && matches!(other_pointee.unaliased(), Type::Pointer(_))
        {
            return pointee.is_exact(other_pointee, env);
        }
        pointee.is(other_pointee, env, strict)
    }

    /// Loose primitive usability: integral widths and signedness coerce
    /// freely, integrals promote to floating point, and `void` only
    /// matches itself.
    fn primitive_is(a: &Primitive, b: &Primitive) -> bool {
        match (a.kind, b.kind) {
            (PrimitiveKind::Void, PrimitiveKind::Void) => true,
            (PrimitiveKind::Void, _) | (_, PrimitiveKind::Void) => false,
            _ => {
                if a.is_integral() {
                    b.is_integral() || b.is_floating_point()
                } else {
                    b.is_floating_point()
                }
            }
        }
    }

    /// Whether two types are exactly the same: each strictly is the
    /// other.
    pub fn is_exact(&self, other: &Type, env: &TypeEnvironment) -> bool {
        env.is_strict(self, other) && env.is_strict(other, self)
    }

    /// Byte size of a value of this type, as later phases will lay it
    /// out. A pure function of the environment's configured widths;
    /// unresolved forward references report zero.
    pub fn data_size(&self, env: &TypeEnvironment) -> u64 {
        match self {
            Type::Primitive(primitive) => match primitive.kind {
                PrimitiveKind::Void => 0,
                PrimitiveKind::Char => env.char_size(),
                PrimitiveKind::Int => match primitive.width {
                    Width::Default => env.int_size(),
                    Width::Short => env.short_size(),
                    Width::Long => env.long_size(),
                    Width::LongLong => env.long_long_size(),
                },
                PrimitiveKind::Float => env.float_size(),
                PrimitiveKind::Double => match primitive.width {
                    Width::Long | Width::LongLong => env.long_double_size(),
                    _ => env.double_size(),
                },
            },
            Type::Pointer(_) | Type::FunctionPointer { .. } => env.pointer_size(),
            Type::Array { element, length } => match length {
                Some(n) => n * element.data_size(env),
                None => env.pointer_size(),
            },
            Type::Constant(inner) => inner.data_size(env),
            Type::Alias { inner, .. } => inner.data_size(env),
            Type::Compound(compound) => compound.data_size(env),
            Type::Class(id) => env.class_data_size(*id),
            Type::NamedIndirection { kind, name } => env
                .resolve_indirection(*kind, name)
                .map(|resolved| resolved.data_size(env))
                .unwrap_or(0),
        }
    }
}

fn compound_matches_kind(kind: CompoundKind, named: NamedKind) -> bool {
    matches!(
        (kind, named),
        (CompoundKind::Struct, NamedKind::Struct) | (CompoundKind::Union, NamedKind::Union)
    )
}

impl Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(primitive) => write!(f, "{}", primitive),
            Type::Pointer(pointee) => write!(f, "{}*", pointee),
            Type::Array { element, length } => match length {
                Some(n) => write!(f, "{}[{}]", element, n),
                None => write!(f, "{}[]", element),
            },
            Type::Constant(inner) => write!(f, "const {}", inner),
            Type::FunctionPointer {
                return_type,
                parameters,
            } => {
                write!(f, "{}(", return_type)?;
                for (i, parameter) in parameters.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", parameter)?;
                }
                write!(f, ")")
            }
            Type::Compound(compound) => write!(f, "{}", compound),
            Type::Class(id) => write!(f, "<class #{}>", id.0),
            Type::NamedIndirection { kind, name } => {
                let keyword = match kind {
                    NamedKind::Struct => "struct",
                    NamedKind::Union => "union",
                    NamedKind::Class => "class",
                };
                write!(f, "{} {}", keyword, name)
            }
            Type::Alias { name, .. } => write!(f, "{}", name),
        }
    }
}
