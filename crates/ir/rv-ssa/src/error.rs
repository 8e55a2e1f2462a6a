//! Error types for IR construction and source queries

use crate::function::FunctionId;
use rv_ast::ChainError;
use rv_span::Pos;
use thiserror::Error;

/// Invalid input to a source query.
///
/// Missing IR or debug information is never an error; queries report
/// it as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The reference path does not start at an identifier
    #[error("reference path must start at an identifier")]
    NotAnIdentifier,

    /// The chain itself is malformed
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Broken IR invariant found by the sanity checker
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanityError {
    /// Two literals of one function were given the same position
    #[error("function {func:?}: anonymous functions share position {pos}")]
    DuplicateAnonFunc {
        /// Enclosing function
        func: FunctionId,
        /// Shared position
        pos: Pos,
    },

    /// A listed literal names some other function as its parent
    #[error("function {func:?}: anonymous function {anon:?} has a different parent")]
    ForeignAnonFunc {
        /// Function listing the literal
        func: FunctionId,
        /// The literal's function
        anon: FunctionId,
    },

    /// Debug reference in a function built without debug info
    #[error("function {func:?}: debug reference without debug info")]
    UnexpectedDebugRef {
        /// Offending function
        func: FunctionId,
    },

    /// Block stored out of order
    #[error("function {func:?}: block {block} is stored at index {index}")]
    BlockIndex {
        /// Offending function
        func: FunctionId,
        /// Index the block claims
        block: usize,
        /// Index it is stored at
        index: usize,
    },

    /// Instruction result owned by another function
    #[error("function {func:?}: instruction in block {block} defines a value of another function")]
    ForeignValue {
        /// Offending function
        func: FunctionId,
        /// Block holding the instruction
        block: usize,
    },

    /// Jump or branch to a block that does not exist
    #[error("function {func:?}: block {block} jumps to missing block {target}")]
    MissingBlock {
        /// Offending function
        func: FunctionId,
        /// Block holding the jump
        block: usize,
        /// Missing target
        target: usize,
    },
}

/// Unknown letter in a builder mode string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown builder mode flag '{flag}' in \"{input}\"")]
pub struct ModeError {
    /// The unrecognized letter
    pub flag: char,
    /// Whole mode string
    pub input: String,
}
