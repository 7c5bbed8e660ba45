//! The visibility-layered symbol tracker.
//!
//! Lookup disciplines:
//!
//! - Local variables follow the `New`/`Old`/`Fixed` status rules: an
//!   entry found through an enclosing frame reads as demoted (`Old`),
//!   so redeclaring it in a nested scope is legitimate shadowing while
//!   redeclaring a `New` entry in its own scope is an error. `Fixed`
//!   entries (built-in constants) can never be replaced.
//! - Globals, functions, and public members are append-only and
//!   namespace-wide; they live at the tracker root and are shared by
//!   every frame.
//! - Internal and private members live in the frame of the class body
//!   that declared them. Pushing a class scope imports the parent
//!   class's internal members from the per-class snapshots, so they are
//!   reachable without qualification; private members are never
//!   inherited.

use std::collections::HashMap;

use log::trace;

use crate::environment::environment::TypeEnvironment;
use crate::errors::errors::{Error, ErrorImpl};
use crate::types::methods::{ParameterTypeList, Visibility};
use crate::types::types::{ClassId, Type};
use crate::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Old,
    New,
    Fixed,
}

#[derive(Debug, Clone)]
pub struct TrackerEntry {
    pub status: EntryStatus,
    pub entry_type: Type,
}

impl TrackerEntry {
    fn new(status: EntryStatus, entry_type: Type) -> Self {
        TrackerEntry { status, entry_type }
    }
}

/// Key of a method entry: owner class, name, and overload parameters.
#[derive(Debug, Clone)]
pub struct MethodKey {
    pub class: ClassId,
    pub name: String,
    pub parameters: ParameterTypeList,
}

#[derive(Debug, Clone, Default)]
struct MemberTables {
    fields: HashMap<(ClassId, String), TrackerEntry>,
    methods: Vec<(MethodKey, TrackerEntry)>,
    constructors: Vec<(ClassId, ParameterTypeList)>,
}

impl MemberTables {
    fn import(&mut self, other: &MemberTables) {
        for (key, entry) in &other.fields {
            let mut demoted = entry.clone();
            if demoted.status == EntryStatus::New {
                demoted.status = EntryStatus::Old;
            }
            self.fields.insert(key.clone(), demoted);
        }
        for (key, entry) in &other.methods {
            let mut demoted = entry.clone();
            if demoted.status == EntryStatus::New {
                demoted.status = EntryStatus::Old;
            }
            self.methods.push((key.clone(), demoted));
        }
        self.constructors.extend(other.constructors.clone());
    }
}

#[derive(Debug, Default)]
struct ScopeFrame {
    variables: HashMap<String, TrackerEntry>,
    internal: MemberTables,
    private: MemberTables,
    class_scope: Option<ClassId>,
}

/// The scoped, visibility-layered symbol tracker used during checking.
#[derive(Debug)]
pub struct VariableTracker {
    frames: Vec<ScopeFrame>,
    global_variables: HashMap<String, TrackerEntry>,
    functions: HashMap<String, TrackerEntry>,
    public: MemberTables,
    /// Internal-member snapshots per class, consulted when a subclass
    /// body's scope is pushed.
    class_members: HashMap<ClassId, MemberTables>,
}

impl Default for VariableTracker {
    fn default() -> Self {
        VariableTracker::new()
    }
}

impl VariableTracker {
    pub fn new() -> Self {
        VariableTracker {
            frames: vec![ScopeFrame::default()],
            global_variables: HashMap::new(),
            functions: HashMap::new(),
            public: MemberTables::default(),
            class_members: HashMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // scope nesting

    /// Pushes a nested lexical scope.
    pub fn push_scope(&mut self) {
        self.frames.push(ScopeFrame::default());
        trace!("scope level {}", self.frames.len());
    }

    /// Pushes a class-body scope. The parent class's internal members
    /// (if any) become reachable without qualification; private members
    /// are never inherited.
    pub fn push_class_scope(&mut self, class: ClassId, parent: Option<ClassId>) {
        let mut frame = ScopeFrame {
            class_scope: Some(class),
            ..ScopeFrame::default()
        };
        if let Some(parent_id) = parent {
            if let Some(snapshot) = self.class_members.get(&parent_id) {
                frame.internal.import(snapshot);
            }
        }
        // seed this class's snapshot with the inherited chain so
        // grandchildren see it too
        let seeded = frame.internal.clone();
        self.class_members.insert(class, seeded);
        self.frames.push(frame);
        trace!(
            "scope level {} (class scope {:?})",
            self.frames.len(),
            class
        );
    }

    pub fn pop_scope(&mut self) {
        self.frames.pop();
        trace!("scope level {}", self.frames.len());
    }

    pub fn is_base_scope(&self) -> bool {
        self.frames.len() == 1
    }

    fn current_frame_mut(&mut self) -> &mut ScopeFrame {
        self.frames.last_mut().expect("tracker has no open scope")
    }

    fn current_class(&self) -> Option<ClassId> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.class_scope)
    }

    // ------------------------------------------------------------------
    // local variables

    /// Status of `name` as seen from the current scope: its own entries
    /// keep their status, entries through enclosing frames are demoted
    /// to `Old` (`Fixed` survives the chain unchanged).
    fn visible_status(&self, name: &str) -> Option<EntryStatus> {
        let mut frames = self.frames.iter().rev();
        if let Some(current) = frames.next() {
            if let Some(entry) = current.variables.get(name) {
                return Some(entry.status);
            }
        }
        for frame in frames {
            if let Some(entry) = frame.variables.get(name) {
                return Some(match entry.status {
                    EntryStatus::Fixed => EntryStatus::Fixed,
                    _ => EntryStatus::Old,
                });
            }
        }
        None
    }

    pub fn add_local_variable(&mut self, name: &str, entry_type: Type) -> Result<(), Error> {
        match self.visible_status(name) {
            Some(EntryStatus::New) | Some(EntryStatus::Fixed) => Err(Error::new(
                ErrorImpl::Redeclaration {
                    name: name.to_string(),
                },
                Position::null(),
            )),
            _ => {
                self.current_frame_mut().variables.insert(
                    name.to_string(),
                    TrackerEntry::new(EntryStatus::New, entry_type),
                );
                Ok(())
            }
        }
    }

    /// Registers a built-in constant that can never be replaced.
    pub fn add_fixed_variable(&mut self, name: &str, entry_type: Type) -> Result<(), Error> {
        if self.visible_status(name).is_some() {
            return Err(Error::new(
                ErrorImpl::Redeclaration {
                    name: name.to_string(),
                },
                Position::null(),
            ));
        }
        self.current_frame_mut().variables.insert(
            name.to_string(),
            TrackerEntry::new(EntryStatus::Fixed, entry_type),
        );
        Ok(())
    }

    pub fn local_variable_exists(&self, name: &str) -> bool {
        self.frames
            .iter()
            .rev()
            .any(|frame| frame.variables.contains_key(name))
    }

    pub fn variable_exists(&self, name: &str) -> bool {
        self.local_variable_exists(name)
            || self.functions.contains_key(name)
            || self.global_variables.contains_key(name)
    }

    /// Resolves a name: locals (innermost first), then functions, then
    /// globals.
    pub fn variable_type(&self, name: &str) -> Option<Type> {
        for frame in self.frames.iter().rev() {
            if let Some(entry) = frame.variables.get(name) {
                return Some(entry.entry_type.clone());
            }
        }
        if let Some(entry) = self.functions.get(name) {
            return Some(entry.entry_type.clone());
        }
        self.global_variables
            .get(name)
            .map(|entry| entry.entry_type.clone())
    }

    // ------------------------------------------------------------------
    // globals and functions

    pub fn add_global_variable(&mut self, name: &str, entry_type: Type) -> Result<(), Error> {
        if self.global_variables.contains_key(name) {
            return Err(Error::new(
                ErrorImpl::Redeclaration {
                    name: name.to_string(),
                },
                Position::null(),
            ));
        }
        self.global_variables.insert(
            name.to_string(),
            TrackerEntry::new(EntryStatus::New, entry_type),
        );
        Ok(())
    }

    pub fn global_variable_exists(&self, name: &str) -> bool {
        self.global_variables.contains_key(name)
    }

    /// Registers a function. Re-describing an existing function is
    /// allowed; re-defining it is a redeclaration.
    pub fn add_function(
        &mut self,
        name: &str,
        function_type: Type,
        is_definition: bool,
    ) -> Result<(), Error> {
        if self.functions.contains_key(name) {
            if is_definition {
                return Err(Error::new(
                    ErrorImpl::Redeclaration {
                        name: name.to_string(),
                    },
                    Position::null(),
                ));
            }
            return Ok(());
        }
        trace!("added function {}", name);
        self.functions.insert(
            name.to_string(),
            TrackerEntry::new(EntryStatus::New, function_type),
        );
        Ok(())
    }

    pub fn function_exists(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn function_type(&self, name: &str) -> Option<Type> {
        self.functions.get(name).map(|entry| entry.entry_type.clone())
    }

    // ------------------------------------------------------------------
    // class members

    fn tables_for(&mut self, visibility: Visibility) -> &mut MemberTables {
        match visibility {
            Visibility::Public => &mut self.public,
            Visibility::Internal => &mut self.current_frame_mut().internal,
            Visibility::Private => &mut self.current_frame_mut().private,
        }
    }

    /// Records a field of `class`. A collision with a member already
    /// declared at the same class level is a redeclaration; a parent
    /// field of the same name is legitimate shadowing (the walker tags
    /// it).
    pub fn add_field(
        &mut self,
        visibility: Visibility,
        class: ClassId,
        name: &str,
        entry_type: Type,
    ) -> Result<(), Error> {
        if self.field_declared_at(class, name) || self.method_name_declared_at(class, name) {
            return Err(Error::new(
                ErrorImpl::Redeclaration {
                    name: name.to_string(),
                },
                Position::null(),
            ));
        }
        let entry = TrackerEntry::new(EntryStatus::New, entry_type);
        let key = (class, name.to_string());
        self.tables_for(visibility)
            .fields
            .insert(key.clone(), entry.clone());
        if visibility == Visibility::Internal {
            if let Some(open_class) = self.current_class() {
                if let Some(snapshot) = self.class_members.get_mut(&open_class) {
                    snapshot.fields.insert(key, entry);
                }
            }
        }
        Ok(())
    }

    /// Records a method of `class`. Any lineage-visible method of the
    /// same name and parameters collides.
    pub fn add_method(
        &mut self,
        visibility: Visibility,
        class: ClassId,
        name: &str,
        return_type: Type,
        parameters: ParameterTypeList,
        env: &TypeEnvironment,
    ) -> Result<(), Error> {
        if self.method_visible(env, class, name, &parameters) {
            return Err(Error::new(
                ErrorImpl::Redeclaration {
                    name: name.to_string(),
                },
                Position::null(),
            ));
        }
        let key = MethodKey {
            class,
            name: name.to_string(),
            parameters,
        };
        let entry = TrackerEntry::new(EntryStatus::New, return_type);
        self.tables_for(visibility)
            .methods
            .push((key.clone(), entry.clone()));
        if visibility == Visibility::Internal {
            if let Some(open_class) = self.current_class() {
                if let Some(snapshot) = self.class_members.get_mut(&open_class) {
                    snapshot.methods.push((key, entry));
                }
            }
        }
        Ok(())
    }

    pub fn add_constructor(
        &mut self,
        visibility: Visibility,
        class: ClassId,
        parameters: ParameterTypeList,
        env: &TypeEnvironment,
    ) -> Result<(), Error> {
        if self.constructor_visible(env, class, &parameters) {
            return Err(Error::new(
                ErrorImpl::Redeclaration {
                    name: format!("constructor {}", parameters),
                },
                Position::null(),
            ));
        }
        self.tables_for(visibility)
            .constructors
            .push((class, parameters.clone()));
        if visibility == Visibility::Internal {
            if let Some(open_class) = self.current_class() {
                if let Some(snapshot) = self.class_members.get_mut(&open_class) {
                    snapshot.constructors.push((class, parameters));
                }
            }
        }
        Ok(())
    }

    /// Whether a field of `class` (exactly that level) is already
    /// declared in any visibility table.
    fn field_declared_at(&self, class: ClassId, name: &str) -> bool {
        let key = (class, name.to_string());
        if self.public.fields.contains_key(&key) {
            return true;
        }
        self.frames
            .iter()
            .any(|frame| frame.internal.fields.contains_key(&key) || frame.private.fields.contains_key(&key))
    }

    fn method_name_declared_at(&self, class: ClassId, name: &str) -> bool {
        let matches = |methods: &[(MethodKey, TrackerEntry)]| {
            methods
                .iter()
                .any(|(key, _)| key.class == class && key.name == name)
        };
        if matches(&self.public.methods) {
            return true;
        }
        self.frames
            .iter()
            .any(|frame| matches(&frame.internal.methods) || matches(&frame.private.methods))
    }

    // ------------------------------------------------------------------
    // inheritance-ordered lookup

    /// Whether a field is visible from the current scope. For a class,
    /// the lineage is walked most-derived-first through all three
    /// visibility tables; for a non-class compound only the (all-public)
    /// field list is consulted.
    pub fn field_visible(&self, env: &TypeEnvironment, base: &Type, name: &str) -> bool {
        match base.value_type() {
            Type::Class(id) => self.class_field_entry(env, *id, name).is_some(),
            Type::Compound(compound) => compound.field(name).is_some(),
            Type::NamedIndirection { kind, name: type_name } => env
                .resolve_indirection(*kind, type_name)
                .map(|resolved| self.field_visible(env, &resolved, name))
                .unwrap_or(false),
            _ => false,
        }
    }

    fn class_field_entry(
        &self,
        env: &TypeEnvironment,
        class: ClassId,
        name: &str,
    ) -> Option<Type> {
        for level in env.lineage(class).into_iter().rev() {
            let key = (level, name.to_string());
            if let Some(entry) = self.public.fields.get(&key) {
                return Some(entry.entry_type.clone());
            }
            for frame in self.frames.iter().rev() {
                if let Some(entry) = frame.internal.fields.get(&key) {
                    return Some(entry.entry_type.clone());
                }
                if let Some(entry) = frame.private.fields.get(&key) {
                    return Some(entry.entry_type.clone());
                }
            }
        }
        None
    }

    /// First visible field type walking the lineage most-derived-first,
    /// so a derived-class member shadows the inherited one.
    pub fn field_type(&self, env: &TypeEnvironment, base: &Type, name: &str) -> Option<Type> {
        match base.value_type() {
            Type::Class(id) => self.class_field_entry(env, *id, name),
            Type::Compound(compound) => compound.field(name).map(|f| f.field_type.clone()),
            Type::NamedIndirection { kind, name: type_name } => env
                .resolve_indirection(*kind, type_name)
                .and_then(|resolved| self.field_type(env, &resolved, name)),
            _ => None,
        }
    }

    pub fn method_visible(
        &self,
        env: &TypeEnvironment,
        class: ClassId,
        name: &str,
        arguments: &ParameterTypeList,
    ) -> bool {
        self.method_type(env, class, name, arguments).is_some()
    }

    /// First visible method's return type walking the lineage
    /// most-derived-first. A derived-class override is what resolution
    /// returns even though the inherited slot still physically exists
    /// for vtable purposes.
    pub fn method_type(
        &self,
        env: &TypeEnvironment,
        class: ClassId,
        name: &str,
        arguments: &ParameterTypeList,
    ) -> Option<Type> {
        let search = |methods: &[(MethodKey, TrackerEntry)], level: ClassId| {
            methods.iter().find_map(|(key, entry)| {
                if key.class == level && key.name == name && arguments.equals(&key.parameters, env)
                {
                    Some(entry.entry_type.clone())
                } else {
                    None
                }
            })
        };
        for level in env.lineage(class).into_iter().rev() {
            if let Some(found) = search(&self.public.methods, level) {
                return Some(found);
            }
            for frame in self.frames.iter().rev() {
                if let Some(found) = search(&frame.internal.methods, level) {
                    return Some(found);
                }
                if let Some(found) = search(&frame.private.methods, level) {
                    return Some(found);
                }
            }
        }
        None
    }

    pub fn constructor_visible(
        &self,
        env: &TypeEnvironment,
        class: ClassId,
        arguments: &ParameterTypeList,
    ) -> bool {
        let search = |constructors: &[(ClassId, ParameterTypeList)]| {
            constructors
                .iter()
                .any(|(owner, parameters)| *owner == class && arguments.equals(parameters, env))
        };
        if search(&self.public.constructors) {
            return true;
        }
        self.frames
            .iter()
            .rev()
            .any(|frame| search(&frame.internal.constructors) || search(&frame.private.constructors))
    }
}
