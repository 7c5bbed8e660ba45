//! Compilation tags.
//!
//! Tags are the only channel through which the walker communicates
//! non-type decisions to the code generator: which constructor a chain
//! call resolved to, whether a call dispatches virtually, whether a
//! field name shadows a parent field, and so on.

use crate::types::methods::ConstructorRef;
use crate::types::types::ClassId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilationTag {
    /// Call dispatches through the vtable.
    VirtualMethodCall,
    /// Field access through a dereference (`(*p).x`).
    IndirectFieldGet,
    /// Method call through a dereference (`(*p).m()`).
    IndirectMethodCall,
    /// Compound assignment (`+=` and friends).
    OperatorAssignment,
    /// `return;` in a void function.
    VoidReturn,
    /// An `if` with an else branch.
    HasElse,
    /// A subclass field shadows a public/internal parent field.
    ShadowingFieldName,
    /// A "method call" that is really a call through a function-pointer
    /// field.
    CompileAsFieldGet,
    /// Dereference of a freshly constructed object.
    NewObjectDereference,
    /// An array declaration with a compile-time length.
    ConstantSize,
    /// Which method a call resolved to.
    MethodCall { class: ClassId, name: String },
    /// A `super.m(...)` call, resolved to the generated trampoline.
    SuperCall { class: ClassId, name: String },
    /// Which constructor a `new` expression resolved to.
    ConstructorCall(ConstructorRef),
    /// Which constructor a `this(...)`/`super(...)` chain resolved to.
    PriorConstructorCall(ConstructorRef),
}
