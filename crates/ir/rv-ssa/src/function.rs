//! IR functions, blocks and instructions

use crate::value::{Value, ValueId};
use la_arena::Idx;
use rv_ast::{BinaryOp, ExprId, UnaryOp};
use rv_span::{FileId, Pos, Span};
use rv_types::{ObjId, PkgId, TypeId};

/// Function ID
pub type FunctionId = Idx<Function>;

/// An IR function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// Qualified name, `parent$N` for literals
    pub name: String,
    /// Declared function or method object, `None` for literals and `init`
    pub object: Option<ObjId>,
    /// Name position for declared functions, `func` keyword for literals
    pub pos: Pos,
    /// Source extent of the declaration or literal
    pub span: Option<Span>,
    /// Signature type
    pub signature: TypeId,
    /// Owning package
    pub pkg: PkgId,
    /// Parameter values, receiver first
    pub params: Vec<ValueId>,
    /// Body; empty until built
    pub blocks: Vec<BasicBlock>,
    /// Functions of literals nested directly inside this one
    pub anon_funcs: Vec<FunctionId>,
    /// Enclosing function, for literals
    pub parent: Option<FunctionId>,
    /// Whether debug references are recorded while building the body
    pub debug_info: bool,
    /// Why the function was synthesized, if it has no source declaration
    pub synthetic: Option<&'static str>,
}

impl Function {
    /// Debug references of all blocks, in block order
    pub fn debug_refs(&self) -> impl Iterator<Item = &DebugRef> {
        self.blocks
            .iter()
            .flat_map(|block| block.instrs.iter())
            .filter_map(|instr| match instr {
                Instr::DebugRef(debug_ref) => Some(debug_ref),
                _ => None,
            })
    }

    /// Whether a body has been built
    pub fn has_body(&self) -> bool {
        !self.blocks.is_empty()
    }
}

/// Basic block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    /// Index within the function's block list
    pub index: usize,
    /// Instructions, terminator last
    pub instrs: Vec<Instr>,
}

/// Links a non-constant source expression to its value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugRef {
    /// File of the expression
    pub file: FileId,
    /// The expression, unparenthesized
    pub expr: ExprId,
    /// Position of the expression
    pub pos: Pos,
    /// Value or address of the expression
    pub x: Value,
    /// Whether `x` is the address of the expression rather than its value
    pub is_addr: bool,
}

/// IR instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    /// Allocate a variable; `result` is its address
    Alloc {
        /// Address of the new variable
        result: ValueId,
        /// Escapes the function
        heap: bool,
        /// Name of the allocated variable, for printing
        comment: String,
    },
    /// Binary operation
    BinOp {
        /// Computed value
        result: ValueId,
        /// Operator
        op: BinaryOp,
        /// Left operand
        x: Value,
        /// Right operand
        y: Value,
    },
    /// Unary operation
    UnOp {
        /// Computed value
        result: ValueId,
        /// Operator
        op: UnaryOp,
        /// Operand
        x: Value,
    },
    /// Load through a pointer
    Load {
        /// Loaded value
        result: ValueId,
        /// Address loaded from
        addr: Value,
    },
    /// Store through a pointer
    Store {
        /// Address stored to
        addr: Value,
        /// Stored value
        value: Value,
    },
    /// Static or dynamic call
    Call {
        /// Call result, `None` for calls without results
        result: Option<ValueId>,
        /// Callee
        func: Value,
        /// Arguments in order
        args: Vec<Value>,
    },
    /// Closure over an anonymous function
    MakeClosure {
        /// The closure
        result: ValueId,
        /// The literal's function
        func: FunctionId,
    },
    /// Address of a struct field
    FieldAddr {
        /// Field address
        result: ValueId,
        /// Struct address
        base: Value,
        /// Field index
        field: usize,
    },
    /// Address of a slice or array element
    IndexAddr {
        /// Element address
        result: ValueId,
        /// Slice or array address
        base: Value,
        /// Element index
        index: Value,
    },
    /// Source correlation record; has no runtime effect
    DebugRef(DebugRef),
    /// Unconditional jump
    Jump {
        /// Target block index
        target: usize,
    },
    /// Two-way branch
    If {
        /// Branch condition
        cond: Value,
        /// Taken when `cond` holds
        then_block: usize,
        /// Taken otherwise
        else_block: usize,
    },
    /// Return from the function
    Return {
        /// Returned values
        results: Vec<Value>,
    },
}

impl Instr {
    /// Value defined by the instruction
    pub fn result(&self) -> Option<ValueId> {
        match self {
            Self::Alloc { result, .. }
            | Self::BinOp { result, .. }
            | Self::UnOp { result, .. }
            | Self::Load { result, .. }
            | Self::MakeClosure { result, .. }
            | Self::FieldAddr { result, .. }
            | Self::IndexAddr { result, .. } => Some(*result),
            Self::Call { result, .. } => *result,
            Self::Store { .. }
            | Self::DebugRef(_)
            | Self::Jump { .. }
            | Self::If { .. }
            | Self::Return { .. } => None,
        }
    }

    /// Successor blocks of a terminator
    pub fn successors(&self) -> Vec<usize> {
        match self {
            Self::Jump { target } => vec![*target],
            Self::If {
                then_block,
                else_block,
                ..
            } => vec![*then_block, *else_block],
            _ => Vec::new(),
        }
    }
}
