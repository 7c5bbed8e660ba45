//! Struct and union aggregates.

use std::fmt::{self, Display};

use crate::environment::environment::TypeEnvironment;
use crate::types::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundKind {
    Struct,
    Union,
}

#[derive(Debug, Clone)]
pub struct FieldDeclaration {
    pub field_type: Type,
    pub name: String,
}

impl FieldDeclaration {
    pub fn new(field_type: Type, name: impl Into<String>) -> Self {
        FieldDeclaration {
            field_type,
            name: name.into(),
        }
    }
}

/// A named (or anonymous) aggregate: an ordered list of fields.
///
/// Two named compound types are equal iff their names match; anonymous
/// ones are never equal to anything. Immutable once registered.
#[derive(Debug, Clone)]
pub struct CompoundType {
    pub kind: CompoundKind,
    pub name: Option<String>,
    pub fields: Vec<FieldDeclaration>,
}

impl CompoundType {
    pub fn new_struct(name: Option<String>, fields: Vec<FieldDeclaration>) -> Self {
        CompoundType {
            kind: CompoundKind::Struct,
            name,
            fields,
        }
    }

    pub fn new_union(name: Option<String>, fields: Vec<FieldDeclaration>) -> Self {
        CompoundType {
            kind: CompoundKind::Union,
            name,
            fields,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_none()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDeclaration> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Struct size is the sum of the field sizes, union size the
    /// maximum. No padding model; later phases share this assumption.
    pub fn data_size(&self, env: &TypeEnvironment) -> u64 {
        match self.kind {
            CompoundKind::Struct => self
                .fields
                .iter()
                .map(|f| f.field_type.data_size(env))
                .sum(),
            CompoundKind::Union => self
                .fields
                .iter()
                .map(|f| f.field_type.data_size(env))
                .max()
                .unwrap_or(0),
        }
    }
}

impl Display for CompoundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self.kind {
            CompoundKind::Struct => "struct",
            CompoundKind::Union => "union",
        };
        match &self.name {
            Some(name) => write!(f, "{} {}", keyword, name),
            None => write!(f, "{} <anonymous>", keyword),
        }
    }
}
