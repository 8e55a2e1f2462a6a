//! The universe scope: predeclared types, constants and functions

use crate::object::ObjId;
use crate::types::TypeId;
use rustc_hash::FxHashMap;
use rv_intern::Symbol;

/// Predeclared objects shared by every package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    /// Name to predeclared object
    pub scope: FxHashMap<Symbol, ObjId>,
    /// `true`
    pub true_const: ObjId,
    /// `false`
    pub false_const: ObjId,
    /// `nil`
    pub nil: ObjId,
    /// The `error` interface type
    pub error_type: TypeId,
    /// `error.Error`
    pub error_method: ObjId,
    /// Built-in function objects in declaration order
    pub builtins: Vec<ObjId>,
}

impl Universe {
    /// Looks up a predeclared name
    pub fn lookup(&self, name: Symbol) -> Option<ObjId> {
        self.scope.get(&name).copied()
    }
}
