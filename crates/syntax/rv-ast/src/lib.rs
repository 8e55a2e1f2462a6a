//! Syntax tree for source files
//!
//! The tree is stored in per-file arenas. Nodes are referred to by arena
//! index, which gives every syntactic occurrence a stable identity that the
//! IR can point back to (debug references hold an [`ExprId`]).
//!
//! Spans follow source order: a node's span encloses the spans of all of
//! its children, and the position of a node is the start of its span. For a
//! function literal that is the position of its `func` keyword.

pub mod builder;
pub mod path;

pub use builder::AstBuilder;
pub use path::{AncestorChain, ChainError, path_enclosing, unparen};

use la_arena::{Arena, Idx};
use rv_intern::{Interner, Symbol};
use rv_span::{FileId, Pos, Span};

/// Expression node ID
pub type ExprId = Idx<Expr>;
/// Statement node ID
pub type StmtId = Idx<Stmt>;
/// Top-level or local declaration ID
pub type DeclId = Idx<Decl>;
/// Specification (inside a general declaration) ID
pub type SpecId = Idx<Spec>;
/// Parameter, result, or receiver field ID
pub type FieldId = Idx<Field>;

/// Reference to any node of a [`SourceFile`]
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum NodeRef {
    /// The file root
    File,
    /// A declaration
    Decl(DeclId),
    /// A spec of a general declaration
    Spec(SpecId),
    /// A receiver, parameter or result field
    Field(FieldId),
    /// A statement
    Stmt(StmtId),
    /// An expression
    Expr(ExprId),
}

/// Expression
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// Expression kind
    pub kind: ExprKind,
    /// Source extent
    pub span: Span,
}

impl Expr {
    /// Position of the expression (start of its extent)
    pub fn pos(&self) -> Pos {
        self.span.start
    }
}

/// Kind of expression
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Identifier
    Ident(Symbol),
    /// Literal value
    BasicLit(LitKind),
    /// Anonymous function
    FuncLit {
        /// Parameter fields
        params: Vec<FieldId>,
        /// Result type expressions
        results: Vec<ExprId>,
        /// Body block
        body: StmtId,
    },
    /// Parenthesized expression
    Paren(ExprId),
    /// `base.sel`
    Selector {
        /// Operand
        base: ExprId,
        /// Selected identifier
        sel: ExprId,
    },
    /// `base[index]`
    Index {
        /// Indexed operand
        base: ExprId,
        /// Index
        index: ExprId,
    },
    /// `base[low:high]`
    Slice {
        /// Sliced operand
        base: ExprId,
        /// Lower bound
        low: Option<ExprId>,
        /// Upper bound
        high: Option<ExprId>,
    },
    /// Function call or conversion
    Call {
        /// Callee
        func: ExprId,
        /// Arguments
        args: Vec<ExprId>,
    },
    /// Prefix operator, including address-of
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: ExprId,
    },
    /// `*x`: pointer indirection, or a pointer type in type position
    Star(ExprId),
    /// Binary operator
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        left: ExprId,
        /// Right operand
        right: ExprId,
    },
    /// `T{elts}`
    CompositeLit {
        /// Literal type, absent when elided
        ty: Option<ExprId>,
        /// Elements
        elts: Vec<ExprId>,
    },
    /// `key: value` inside a composite literal
    KeyValue {
        /// Key
        key: ExprId,
        /// Value
        value: ExprId,
    },
}

/// Literal kinds
#[derive(Debug, Clone, PartialEq)]
pub enum LitKind {
    /// Integer literal
    Int(i64),
    /// String literal
    String(String),
    /// Character literal
    Char(char),
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `!x`
    Not,
    /// `^x`
    BitNot,
    /// `&x`
    Addr,
}

impl UnaryOp {
    /// Source spelling of the operator
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "!",
            Self::BitNot => "^",
            Self::Addr => "&",
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `&&`
    LogAnd,
    /// `||`
    LogOr,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl BinaryOp {
    /// Comparisons produce an untyped boolean regardless of operand type
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }

    /// Source spelling of the operator
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::LogAnd => "&&",
            Self::LogOr => "||",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// Statement
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    /// Statement kind
    pub kind: StmtKind,
    /// Source extent
    pub span: Span,
}

/// Kind of statement
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `{ ... }`
    Block(Vec<StmtId>),
    /// Expression statement
    Expr(ExprId),
    /// Assignment or short variable declaration
    Assign {
        /// Targets
        lhs: Vec<ExprId>,
        /// `=`, `:=` or `op=`
        token: AssignToken,
        /// Assigned values
        rhs: Vec<ExprId>,
    },
    /// `x++` / `x--`
    IncDec {
        /// Target
        target: ExprId,
        /// `++` if true
        inc: bool,
    },
    /// Local declaration
    Decl(DeclId),
    /// `return`
    Return(Vec<ExprId>),
    /// `if`
    If {
        /// Init statement
        init: Option<StmtId>,
        /// Condition
        cond: ExprId,
        /// Then block
        then_branch: StmtId,
        /// Else block or nested `if`
        else_branch: Option<StmtId>,
    },
    /// `for`
    For {
        /// Init statement
        init: Option<StmtId>,
        /// Condition
        cond: Option<ExprId>,
        /// Post statement
        post: Option<StmtId>,
        /// Loop body
        body: StmtId,
    },
}

/// Assignment tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignToken {
    /// `=`
    Assign,
    /// `:=`
    Define,
    /// `op=`
    Op(BinaryOp),
}

/// Receiver, parameter or result field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Declared names (empty for anonymous fields)
    pub names: Vec<ExprId>,
    /// Field type
    pub ty: ExprId,
    /// Source extent
    pub span: Span,
}

/// Declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    /// Declaration kind
    pub kind: DeclKind,
    /// Source extent
    pub span: Span,
}

/// Kind of declaration
#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    /// Function or method declaration
    Func(FuncDecl),
    /// `import`, `const`, `type` or `var` group
    Gen(GenDecl),
}

/// Function or method declaration
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    /// Receiver field, for methods
    pub recv: Option<FieldId>,
    /// Name identifier
    pub name: ExprId,
    /// Parameter fields
    pub params: Vec<FieldId>,
    /// Result type expressions
    pub results: Vec<ExprId>,
    /// Body, absent for external declarations
    pub body: Option<StmtId>,
}

/// General declaration: a keyword followed by one or more specs
#[derive(Debug, Clone, PartialEq)]
pub struct GenDecl {
    /// Declaration keyword
    pub token: DeclToken,
    /// Specs in source order
    pub specs: Vec<SpecId>,
}

/// Keyword of a general declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclToken {
    /// `import`
    Import,
    /// `const`
    Const,
    /// `type`
    Type,
    /// `var`
    Var,
}

/// Spec inside a general declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Spec {
    /// Spec kind
    pub kind: SpecKind,
    /// Source extent
    pub span: Span,
}

/// Kind of spec
#[derive(Debug, Clone, PartialEq)]
pub enum SpecKind {
    /// `import name "path"`
    Import {
        /// Local name
        name: Option<ExprId>,
        /// Import path
        path: String,
    },
    /// `names type = values` in `var` and `const` groups
    Value {
        /// Declared names
        names: Vec<ExprId>,
        /// Declared type
        ty: Option<ExprId>,
        /// Initializers
        values: Vec<ExprId>,
    },
    /// `name type`
    Type {
        /// Type name
        name: ExprId,
        /// Type expression
        ty: ExprId,
    },
}

/// A parsed source file
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// File identity
    pub id: FileId,
    /// Package clause name
    pub package: ExprId,
    /// Top-level declarations in source order
    pub decls: Vec<DeclId>,
    /// Extent of the whole file
    pub span: Span,
    /// Expression arena
    pub exprs: Arena<Expr>,
    /// Statement arena
    pub stmts: Arena<Stmt>,
    /// Declaration arena (top-level and local)
    pub decl_arena: Arena<Decl>,
    /// Spec arena
    pub specs: Arena<Spec>,
    /// Field arena
    pub fields: Arena<Field>,
    interner: Interner,
}

impl SourceFile {
    /// Interner that spells this file's identifiers
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Name of an identifier expression
    pub fn ident_name(&self, expr: ExprId) -> Option<Symbol> {
        match self.exprs[expr].kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// Function declaration behind `decl`, if it is one
    pub fn func_decl(&self, decl: DeclId) -> Option<&FuncDecl> {
        match &self.decl_arena[decl].kind {
            DeclKind::Func(func) => Some(func),
            DeclKind::Gen(_) => None,
        }
    }

    /// Whether `node` indexes into this file's arenas
    pub fn contains(&self, node: NodeRef) -> bool {
        fn in_bounds<T>(arena: &Arena<T>, idx: Idx<T>) -> bool {
            (u32::from(idx.into_raw()) as usize) < arena.len()
        }
        match node {
            NodeRef::File => true,
            NodeRef::Decl(id) => in_bounds(&self.decl_arena, id),
            NodeRef::Spec(id) => in_bounds(&self.specs, id),
            NodeRef::Field(id) => in_bounds(&self.fields, id),
            NodeRef::Stmt(id) => in_bounds(&self.stmts, id),
            NodeRef::Expr(id) => in_bounds(&self.exprs, id),
        }
    }

    /// Source extent of a node
    pub fn span_of(&self, node: NodeRef) -> Span {
        match node {
            NodeRef::File => self.span,
            NodeRef::Decl(id) => self.decl_arena[id].span,
            NodeRef::Spec(id) => self.specs[id].span,
            NodeRef::Field(id) => self.fields[id].span,
            NodeRef::Stmt(id) => self.stmts[id].span,
            NodeRef::Expr(id) => self.exprs[id].span,
        }
    }

    /// Position of a node
    pub fn pos_of(&self, node: NodeRef) -> Pos {
        self.span_of(node).start
    }

    /// Direct children of a node, in source order
    pub fn children(&self, node: NodeRef) -> Vec<NodeRef> {
        let mut out = Vec::new();
        match node {
            NodeRef::File => {
                out.push(NodeRef::Expr(self.package));
                out.extend(self.decls.iter().map(|&decl| NodeRef::Decl(decl)));
            }
            NodeRef::Decl(id) => match &self.decl_arena[id].kind {
                DeclKind::Func(func) => {
                    out.extend(func.recv.map(NodeRef::Field));
                    out.push(NodeRef::Expr(func.name));
                    out.extend(func.params.iter().map(|&field| NodeRef::Field(field)));
                    out.extend(func.results.iter().map(|&ty| NodeRef::Expr(ty)));
                    out.extend(func.body.map(NodeRef::Stmt));
                }
                DeclKind::Gen(gen_decl) => {
                    out.extend(gen_decl.specs.iter().map(|&spec| NodeRef::Spec(spec)));
                }
            },
            NodeRef::Spec(id) => match &self.specs[id].kind {
                SpecKind::Import { name, .. } => out.extend(name.map(NodeRef::Expr)),
                SpecKind::Value { names, ty, values } => {
                    out.extend(names.iter().map(|&name| NodeRef::Expr(name)));
                    out.extend(ty.map(NodeRef::Expr));
                    out.extend(values.iter().map(|&value| NodeRef::Expr(value)));
                }
                SpecKind::Type { name, ty } => {
                    out.push(NodeRef::Expr(*name));
                    out.push(NodeRef::Expr(*ty));
                }
            },
            NodeRef::Field(id) => {
                let field = &self.fields[id];
                out.extend(field.names.iter().map(|&name| NodeRef::Expr(name)));
                out.push(NodeRef::Expr(field.ty));
            }
            NodeRef::Stmt(id) => self.stmt_children(id, &mut out),
            NodeRef::Expr(id) => self.expr_children(id, &mut out),
        }
        out
    }

    fn stmt_children(&self, id: StmtId, out: &mut Vec<NodeRef>) {
        match &self.stmts[id].kind {
            StmtKind::Block(stmts) => out.extend(stmts.iter().map(|&stmt| NodeRef::Stmt(stmt))),
            StmtKind::Expr(expr) => out.push(NodeRef::Expr(*expr)),
            StmtKind::Assign { lhs, rhs, .. } => {
                out.extend(lhs.iter().map(|&expr| NodeRef::Expr(expr)));
                out.extend(rhs.iter().map(|&expr| NodeRef::Expr(expr)));
            }
            StmtKind::IncDec { target, .. } => out.push(NodeRef::Expr(*target)),
            StmtKind::Decl(decl) => out.push(NodeRef::Decl(*decl)),
            StmtKind::Return(results) => out.extend(results.iter().map(|&expr| NodeRef::Expr(expr))),
            StmtKind::If {
                init,
                cond,
                then_branch,
                else_branch,
            } => {
                out.extend(init.map(NodeRef::Stmt));
                out.push(NodeRef::Expr(*cond));
                out.push(NodeRef::Stmt(*then_branch));
                out.extend(else_branch.map(NodeRef::Stmt));
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                out.extend(init.map(NodeRef::Stmt));
                out.extend(cond.map(NodeRef::Expr));
                out.extend(post.map(NodeRef::Stmt));
                out.push(NodeRef::Stmt(*body));
            }
        }
    }

    fn expr_children(&self, id: ExprId, out: &mut Vec<NodeRef>) {
        match &self.exprs[id].kind {
            ExprKind::Ident(_) | ExprKind::BasicLit(_) => {}
            ExprKind::FuncLit {
                params,
                results,
                body,
            } => {
                out.extend(params.iter().map(|&field| NodeRef::Field(field)));
                out.extend(results.iter().map(|&ty| NodeRef::Expr(ty)));
                out.push(NodeRef::Stmt(*body));
            }
            ExprKind::Paren(inner) | ExprKind::Star(inner) => out.push(NodeRef::Expr(*inner)),
            ExprKind::Selector { base, sel } => {
                out.push(NodeRef::Expr(*base));
                out.push(NodeRef::Expr(*sel));
            }
            ExprKind::Index { base, index } => {
                out.push(NodeRef::Expr(*base));
                out.push(NodeRef::Expr(*index));
            }
            ExprKind::Slice { base, low, high } => {
                out.push(NodeRef::Expr(*base));
                out.extend(low.map(NodeRef::Expr));
                out.extend(high.map(NodeRef::Expr));
            }
            ExprKind::Call { func, args } => {
                out.push(NodeRef::Expr(*func));
                out.extend(args.iter().map(|&arg| NodeRef::Expr(arg)));
            }
            ExprKind::Unary { operand, .. } => out.push(NodeRef::Expr(*operand)),
            ExprKind::Binary { left, right, .. } => {
                out.push(NodeRef::Expr(*left));
                out.push(NodeRef::Expr(*right));
            }
            ExprKind::CompositeLit { ty, elts } => {
                out.extend(ty.map(NodeRef::Expr));
                out.extend(elts.iter().map(|&elt| NodeRef::Expr(elt)));
            }
            ExprKind::KeyValue { key, value } => {
                out.push(NodeRef::Expr(*key));
                out.push(NodeRef::Expr(*value));
            }
        }
    }
}
