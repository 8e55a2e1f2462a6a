//! Type representation

use crate::object::ObjId;
use la_arena::{Arena, Idx};
use rustc_hash::FxHashMap;

/// Type ID for arena allocation
pub type TypeId = Idx<Type>;

/// A type in the type system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    /// Type kind
    pub kind: TypeKind,
}

/// Kind of type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// Predeclared basic type
    Basic(BasicKind),
    /// `*elem`
    Pointer(TypeId),
    /// `[]elem`
    Slice(TypeId),
    /// `[len]elem`
    Array {
        /// Element type
        elem: TypeId,
        /// Length
        len: u64,
    },
    /// `map[key]elem`
    Map {
        /// Key type
        key: TypeId,
        /// Element type
        elem: TypeId,
    },
    /// `struct { fields }`
    Struct {
        /// Field variables in declaration order
        fields: Vec<ObjId>,
    },
    /// `interface { methods }`
    Interface {
        /// Explicitly declared methods
        methods: Vec<ObjId>,
        /// Embedded interfaces
        embedded: Vec<TypeId>,
    },
    /// Function or method signature
    Signature(Signature),
    /// Defined type
    Named {
        /// Type name object
        obj: ObjId,
        /// Underlying type, unset while the declaration is being resolved
        underlying: Option<TypeId>,
        /// Declared methods
        methods: Vec<ObjId>,
    },
}

/// Function signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Receiver variable, for methods
    pub recv: Option<ObjId>,
    /// Parameter variables
    pub params: Vec<ObjId>,
    /// Result variables
    pub results: Vec<ObjId>,
    /// Whether the last parameter is `...T`
    pub variadic: bool,
}

/// Predeclared basic types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicKind {
    /// Type of erroneous or built-in operands
    Invalid,
    /// `bool`
    Bool,
    /// `int`
    Int,
    /// `int64`
    Int64,
    /// `uint8`
    Uint8,
    /// `float64`
    Float64,
    /// `string`
    String,
    /// Type of untyped boolean constants and comparisons
    UntypedBool,
    /// Type of untyped integer constants
    UntypedInt,
    /// Type of untyped rune constants
    UntypedRune,
    /// Type of untyped string constants
    UntypedString,
    /// Type of `nil`
    UntypedNil,
}

impl BasicKind {
    /// All basic kinds
    pub const ALL: [Self; 12] = [
        Self::Invalid,
        Self::Bool,
        Self::Int,
        Self::Int64,
        Self::Uint8,
        Self::Float64,
        Self::String,
        Self::UntypedBool,
        Self::UntypedInt,
        Self::UntypedRune,
        Self::UntypedString,
        Self::UntypedNil,
    ];

    /// Source spelling
    pub fn name(self) -> &'static str {
        match self {
            Self::Invalid => "invalid type",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Int64 => "int64",
            Self::Uint8 => "uint8",
            Self::Float64 => "float64",
            Self::String => "string",
            Self::UntypedBool => "untyped bool",
            Self::UntypedInt => "untyped int",
            Self::UntypedRune => "untyped rune",
            Self::UntypedString => "untyped string",
            Self::UntypedNil => "untyped nil",
        }
    }

    /// Whether this is the type of an untyped constant
    pub fn is_untyped(self) -> bool {
        matches!(
            self,
            Self::UntypedBool
                | Self::UntypedInt
                | Self::UntypedRune
                | Self::UntypedString
                | Self::UntypedNil
        )
    }

    /// Whether the kind is usable as a name in the universe scope
    pub fn is_predeclared_name(self) -> bool {
        !self.is_untyped() && self != Self::Invalid
    }
}

/// Type arena with interned basic and pointer types
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TypeStore {
    arena: Arena<Type>,
    basics: FxHashMap<BasicKind, TypeId>,
    pointers: FxHashMap<TypeId, TypeId>,
}

impl TypeStore {
    /// Create a store with every basic type allocated
    pub fn new() -> Self {
        let mut store = Self::default();
        for kind in BasicKind::ALL {
            let id = store.alloc(TypeKind::Basic(kind));
            store.basics.insert(kind, id);
        }
        store
    }

    /// Allocate a type
    pub fn alloc(&mut self, kind: TypeKind) -> TypeId {
        self.arena.alloc(Type { kind })
    }

    /// Get a type by ID
    pub fn get(&self, id: TypeId) -> &Type {
        &self.arena[id]
    }

    pub(crate) fn get_mut(&mut self, id: TypeId) -> &mut Type {
        &mut self.arena[id]
    }

    /// The interned basic type
    pub fn basic(&self, kind: BasicKind) -> TypeId {
        // Every kind is allocated by `new`; fall back to the first type otherwise.
        self.basics
            .get(&kind)
            .copied()
            .unwrap_or_else(|| TypeId::from_raw(0u32.into()))
    }

    /// The interned `*elem`
    pub fn pointer_to(&mut self, elem: TypeId) -> TypeId {
        if let Some(&ptr) = self.pointers.get(&elem) {
            return ptr;
        }
        let ptr = self.alloc(TypeKind::Pointer(elem));
        self.pointers.insert(elem, ptr);
        ptr
    }

    /// `*elem`, if it has been interned before
    pub fn lookup_pointer(&self, elem: TypeId) -> Option<TypeId> {
        self.pointers.get(&elem).copied()
    }

    /// Number of allocated types
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Whether no type has been allocated
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basics_are_interned() {
        let store = TypeStore::new();
        assert_eq!(store.basic(BasicKind::Int), store.basic(BasicKind::Int));
        assert_ne!(store.basic(BasicKind::Int), store.basic(BasicKind::Bool));
        assert_eq!(
            store.get(store.basic(BasicKind::String)).kind,
            TypeKind::Basic(BasicKind::String)
        );
    }

    #[test]
    fn test_pointers_are_interned() {
        let mut store = TypeStore::new();
        let int = store.basic(BasicKind::Int);
        assert_eq!(store.lookup_pointer(int), None);
        let ptr = store.pointer_to(int);
        assert_eq!(store.pointer_to(int), ptr);
        assert_eq!(store.lookup_pointer(int), Some(ptr));
        assert_eq!(store.get(ptr).kind, TypeKind::Pointer(int));
    }
}
