//! IR values

use crate::function::FunctionId;
use crate::wrapper::Wrapper;
use la_arena::Idx;
use rv_span::Pos;
use rv_types::{ConstValue, ObjId, PkgId, TypeId};
use std::fmt;
use std::sync::Arc;

/// ID of a value stored in the program's value arena
pub type ValueId = Idx<ValueData>;

/// A value stored in the program's value arena
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueData {
    /// Origin of the value
    pub kind: ValueKind,
    /// Static type; pointer-typed for storage locations
    pub ty: TypeId,
    /// Source position of the originating syntax, `Pos::NONE` if synthetic
    pub pos: Pos,
    /// Name used when printing
    pub name: String,
}

/// What produced a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    /// A declared function or method
    Function(FunctionId),
    /// Address of a package-level variable
    Global {
        /// The variable
        object: ObjId,
        /// Declaring package
        pkg: PkgId,
    },
    /// A predeclared built-in function
    Builtin {
        /// The builtin's object in the universe
        object: ObjId,
    },
    /// A function parameter (or receiver)
    Parameter {
        /// Declared parameter, `None` for unnamed ones
        object: Option<ObjId>,
        /// Function the parameter belongs to
        parent: FunctionId,
    },
    /// A package-level named constant
    Const(Const),
    /// Result of an instruction
    Instr {
        /// Function holding the instruction
        parent: FunctionId,
    },
}

/// A constant with its type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Const {
    /// Exact value
    pub value: ConstValue,
    /// Type, possibly untyped
    pub ty: TypeId,
}

impl Const {
    /// Pairs a value with its type
    pub fn new(value: ConstValue, ty: TypeId) -> Self {
        Self { value, ty }
    }
}

/// Handle to an IR value.
///
/// `PartialEq` compares contents; use [`Value::same`] for identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A value in the program arena
    Node(ValueId),
    /// A constant created on the spot, with no identity of its own
    Const(Const),
    /// A method wrapper synthesized on demand
    Wrapper(Arc<Wrapper>),
}

impl Value {
    /// Identity comparison: same arena value or same wrapper.
    ///
    /// Inline constants are never identical to anything.
    pub fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Node(a), Self::Node(b)) => a == b,
            (Self::Wrapper(a), Self::Wrapper(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Arena id, unless this is an inline constant or a wrapper
    pub fn as_node(&self) -> Option<ValueId> {
        match self {
            Self::Node(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<ValueId> for Value {
    fn from(id: ValueId) -> Self {
        Self::Node(id)
    }
}

impl From<Const> for Value {
    fn from(constant: Const) -> Self {
        Self::Const(constant)
    }
}

impl fmt::Display for Const {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.value)
    }
}
