//! Per-run compilation state.
//!
//! One `CompilationContext` exists per compilation run and is passed by
//! mutable borrow through the walker and the object model. It replaces
//! any notion of process-wide registries: the type environment, the
//! symbol tracker (including the per-class member snapshots), the
//! settings, and the collected errors all live here and die with the
//! run.

use crate::environment::environment::TypeEnvironment;
use crate::errors::errors::Error;
use crate::tracker::tracker::VariableTracker;
use crate::types::types::Type;

#[derive(Debug, Clone)]
pub struct CompilationSettings {
    /// Name of the synthesized vtable pointer field on every class
    /// instance.
    pub vtable_field_name: String,
}

impl Default for CompilationSettings {
    fn default() -> Self {
        CompilationSettings {
            vtable_field_name: String::from("vtable"),
        }
    }
}

pub struct CompilationContext {
    pub environment: TypeEnvironment,
    pub tracker: VariableTracker,
    pub settings: CompilationSettings,
    pub errors: Vec<Error>,
}

impl CompilationContext {
    pub fn new(environment: TypeEnvironment, settings: CompilationSettings) -> Self {
        let mut tracker = VariableTracker::new();
        // built-in boolean literals; these entries can never be replaced
        if let Some(boolean) = environment.boolean_type() {
            tracker
                .add_fixed_variable("true", boolean.clone().constant())
                .unwrap();
            tracker
                .add_fixed_variable("false", boolean.constant())
                .unwrap();
        }
        CompilationContext {
            environment,
            tracker,
            settings,
            errors: Vec::new(),
        }
    }

    pub fn is(&self, a: &Type, b: &Type) -> bool {
        self.environment.is(a, b)
    }

    pub fn is_strict(&self, a: &Type, b: &Type) -> bool {
        self.environment.is_strict(a, b)
    }

    pub fn type_display(&self, ty: &Type) -> String {
        self.environment.type_display(ty)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
