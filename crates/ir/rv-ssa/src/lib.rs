//! IR graph and source correlation
//!
//! A [`Program`] owns the semantic model and the IR of every package
//! created in it: functions made of basic blocks, the values they compute,
//! and optional debug references tying source expressions to values. The
//! [`source`] module answers the navigational queries on top of it: which
//! function encloses a syntax node, and which IR value an expression or a
//! semantic object denotes.

pub mod builder;
pub mod error;
pub mod function;
pub mod mode;
pub mod print;
pub mod program;
pub mod sanity;
pub mod source;
pub mod value;
pub mod wrapper;

pub use builder::FunctionBuilder;
pub use error::{ModeError, SanityError, SourceError};
pub use function::{BasicBlock, DebugRef, Function, FunctionId, Instr};
pub use mode::BuilderMode;
pub use print::FunctionDisplay;
pub use program::{Member, Package, Program};
pub use source::{EnclosingTopLevel, classify_enclosing_top_level, has_enclosing_function};
pub use value::{Const, Value, ValueData, ValueId, ValueKind};
pub use wrapper::{Wrapper, WrapperTarget};
