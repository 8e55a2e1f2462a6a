//! Semantic objects: resolved declarations

use crate::constant::ConstValue;
use crate::package::PkgId;
use crate::types::TypeId;
use la_arena::Idx;
use rv_intern::Symbol;
use rv_span::Pos;

/// Object ID
pub type ObjId = Idx<Object>;

/// A resolved declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    /// Declared name
    pub name: Symbol,
    /// Position of the declaring identifier, `Pos::NONE` for predeclared objects
    pub pos: Pos,
    /// Owning package; `None` for predeclared objects
    pub pkg: Option<PkgId>,
    /// Type of the object (a signature for functions)
    pub ty: TypeId,
    /// What kind of entity this is
    pub kind: ObjectKind,
    /// Scope the object was declared in
    pub level: ObjLevel,
}

impl Object {
    /// Whether the object lives in the universe scope
    pub fn is_universal(&self) -> bool {
        self.level == ObjLevel::Universe
    }

    /// Whether the object is declared at package scope
    pub fn is_package_level(&self) -> bool {
        self.level == ObjLevel::Package
    }

    /// Whether the object is a function or method
    pub fn is_func(&self) -> bool {
        matches!(self.kind, ObjectKind::Func)
    }

    /// Whether the object is a variable, parameter or field
    pub fn is_var(&self) -> bool {
        matches!(self.kind, ObjectKind::Var(_))
    }

    /// Constant value, for constants
    pub fn const_value(&self) -> Option<&ConstValue> {
        match &self.kind {
            ObjectKind::Const(value) => Some(value),
            _ => None,
        }
    }
}

/// Kind of object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    /// Function or method (concrete or interface)
    Func,
    /// Named constant
    Const(ConstValue),
    /// Variable, parameter, result, receiver or struct field
    Var(VarKind),
    /// Type name
    TypeName,
    /// Imported package name
    PkgName(PkgId),
    /// Predeclared built-in function
    Builtin(BuiltinKind),
}

/// Kind of variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// Ordinary variable
    Plain,
    /// Function parameter
    Param,
    /// Named result
    Result,
    /// Method receiver
    Receiver,
    /// Struct field
    Field {
        /// Anonymous (embedded) field
        embedded: bool,
    },
}

/// Declaration scope of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjLevel {
    /// Predeclared
    Universe,
    /// Package scope
    Package,
    /// Function-local scope, parameters, fields and methods
    Local,
}

/// Predeclared built-in functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
    /// `append`
    Append,
    /// `cap`
    Cap,
    /// `close`
    Close,
    /// `copy`
    Copy,
    /// `delete`
    Delete,
    /// `len`
    Len,
    /// `make`
    Make,
    /// `new`
    New,
    /// `panic`
    Panic,
    /// `print`
    Print,
    /// `println`
    Println,
    /// `recover`
    Recover,
}

impl BuiltinKind {
    /// All built-ins in declaration order
    pub const ALL: [Self; 12] = [
        Self::Append,
        Self::Cap,
        Self::Close,
        Self::Copy,
        Self::Delete,
        Self::Len,
        Self::Make,
        Self::New,
        Self::Panic,
        Self::Print,
        Self::Println,
        Self::Recover,
    ];

    /// Source name of the built-in
    pub fn name(self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Cap => "cap",
            Self::Close => "close",
            Self::Copy => "copy",
            Self::Delete => "delete",
            Self::Len => "len",
            Self::Make => "make",
            Self::New => "new",
            Self::Panic => "panic",
            Self::Print => "print",
            Self::Println => "println",
            Self::Recover => "recover",
        }
    }
}
