//! Compile-time constant values

use std::fmt;

/// Exact value of a constant expression or named constant
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstValue {
    /// Boolean constant
    Bool(bool),
    /// Integer constant
    Int(i64),
    /// Rune constant
    Rune(char),
    /// String constant
    String(String),
    /// The predeclared `nil`
    Nil,
}

impl ConstValue {
    /// Whether this is the `nil` value
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(formatter, "{value}"),
            Self::Int(value) => write!(formatter, "{value}"),
            Self::Rune(value) => write!(formatter, "{value:?}"),
            Self::String(value) => write!(formatter, "{value:?}"),
            Self::Nil => write!(formatter, "nil"),
        }
    }
}
