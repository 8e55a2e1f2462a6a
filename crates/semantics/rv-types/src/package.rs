//! Semantic packages

use crate::object::ObjId;
use indexmap::IndexMap;
use la_arena::Idx;
use rv_intern::Symbol;

/// Package ID
pub type PkgId = Idx<PackageData>;

/// A type-checked package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageData {
    /// Import path
    pub path: String,
    /// Package name from the package clause
    pub name: Symbol,
    /// Package scope in declaration order
    pub scope: IndexMap<Symbol, ObjId>,
    /// Directly imported packages
    pub imports: Vec<PkgId>,
    /// Set once type checking finished without errors
    pub complete: bool,
}

impl PackageData {
    /// Looks up a package-scope name
    pub fn lookup(&self, name: Symbol) -> Option<ObjId> {
        self.scope.get(&name).copied()
    }

    /// Package-scope objects in declaration order
    pub fn members(&self) -> impl Iterator<Item = ObjId> + '_ {
        self.scope.values().copied()
    }
}
