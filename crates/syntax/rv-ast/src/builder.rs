//! Incremental construction of source files
//!
//! The builder hands out positions in source order. Callers allocate nodes
//! in the order they appear in the text; constructors join child extents
//! and allocate the closing token of bracketed constructs, so every parent
//! span encloses its children and no two occurrences share a position.

use crate::{
    AssignToken, BinaryOp, Decl, DeclId, DeclKind, DeclToken, Expr, ExprId, ExprKind, Field,
    FieldId, FuncDecl, GenDecl, LitKind, SourceFile, Spec, SpecId, SpecKind, Stmt, StmtId,
    StmtKind, UnaryOp,
};
use la_arena::Arena;
use rv_intern::Interner;
use rv_span::{FileId, Pos, Span};

/// Builder for a [`SourceFile`]
#[derive(Debug)]
pub struct AstBuilder {
    interner: Interner,
    id: FileId,
    start: Pos,
    cursor: Pos,
    package: ExprId,
    decls: Vec<DeclId>,
    exprs: Arena<Expr>,
    stmts: Arena<Stmt>,
    decl_arena: Arena<Decl>,
    specs: Arena<Spec>,
    fields: Arena<Field>,
}

impl AstBuilder {
    /// Starts a file at offset `base` with the clause `package <package>`.
    ///
    /// Offsets of distinct files in one compiled unit must not overlap.
    pub fn new(interner: Interner, id: FileId, base: u32, package: &str) -> Self {
        let start = Pos(base.max(1));
        let mut builder = Self {
            interner,
            id,
            start,
            cursor: start,
            package: ExprId::from_raw(0u32.into()),
            decls: Vec::new(),
            exprs: Arena::new(),
            stmts: Arena::new(),
            decl_arena: Arena::new(),
            specs: Arena::new(),
            fields: Arena::new(),
        };
        builder.token("package");
        builder.package = builder.ident(package);
        builder
    }

    /// Next position that will be handed out
    pub fn cursor(&self) -> Pos {
        self.cursor
    }

    /// Allocates the extent of a token followed by one space
    pub fn token(&mut self, text: &str) -> Span {
        let len = u32::try_from(text.len()).unwrap_or(1).max(1);
        let span = Span::new(self.cursor, self.cursor.advance(len));
        self.cursor = span.end.advance(1);
        span
    }

    fn expr(&mut self, kind: ExprKind, span: Span) -> ExprId {
        self.exprs.alloc(Expr { kind, span })
    }

    fn stmt(&mut self, kind: StmtKind, span: Span) -> StmtId {
        self.stmts.alloc(Stmt { kind, span })
    }

    fn expr_span(&self, id: ExprId) -> Span {
        self.exprs[id].span
    }

    fn stmt_span(&self, id: StmtId) -> Span {
        self.stmts[id].span
    }

    fn join_exprs(&self, span: Span, exprs: &[ExprId]) -> Span {
        exprs
            .iter()
            .fold(span, |acc, &expr| acc.join(self.expr_span(expr)))
    }

    /// Identifier
    pub fn ident(&mut self, name: &str) -> ExprId {
        let span = self.token(name);
        let sym = self.interner.intern(name);
        self.expr(ExprKind::Ident(sym), span)
    }

    /// Integer literal
    pub fn int(&mut self, value: i64) -> ExprId {
        let span = self.token(&value.to_string());
        self.expr(ExprKind::BasicLit(LitKind::Int(value)), span)
    }

    /// String literal
    pub fn string(&mut self, value: &str) -> ExprId {
        let span = self.token(&format!("{value:?}"));
        self.expr(ExprKind::BasicLit(LitKind::String(value.to_string())), span)
    }

    /// `(inner)`; `lparen` is the opening token
    pub fn paren(&mut self, lparen: Span, inner: ExprId) -> ExprId {
        let rparen = self.token(")");
        let span = lparen.join(self.expr_span(inner)).join(rparen);
        self.expr(ExprKind::Paren(inner), span)
    }

    /// `base.name`
    pub fn selector(&mut self, base: ExprId, name: &str) -> ExprId {
        self.token(".");
        let sel = self.ident(name);
        let span = self.expr_span(base).join(self.expr_span(sel));
        self.expr(ExprKind::Selector { base, sel }, span)
    }

    /// `base[index]`
    pub fn index(&mut self, base: ExprId, index: ExprId) -> ExprId {
        let rbrack = self.token("]");
        let span = self.expr_span(base).join(self.expr_span(index)).join(rbrack);
        self.expr(ExprKind::Index { base, index }, span)
    }

    /// `base[low:high]`
    pub fn slice(&mut self, base: ExprId, low: Option<ExprId>, high: Option<ExprId>) -> ExprId {
        let rbrack = self.token("]");
        let bounds: Vec<ExprId> = low.into_iter().chain(high).collect();
        let span = self.join_exprs(self.expr_span(base), &bounds).join(rbrack);
        self.expr(ExprKind::Slice { base, low, high }, span)
    }

    /// `func(args)`
    pub fn call(&mut self, func: ExprId, args: Vec<ExprId>) -> ExprId {
        let rparen = self.token(")");
        let span = self.join_exprs(self.expr_span(func), &args).join(rparen);
        self.expr(ExprKind::Call { func, args }, span)
    }

    /// Prefix operator; `op_token` is the operator's extent
    pub fn unary(&mut self, op_token: Span, op: UnaryOp, operand: ExprId) -> ExprId {
        let span = op_token.join(self.expr_span(operand));
        self.expr(ExprKind::Unary { op, operand }, span)
    }

    /// `*operand`
    pub fn star(&mut self, star: Span, operand: ExprId) -> ExprId {
        let span = star.join(self.expr_span(operand));
        self.expr(ExprKind::Star(operand), span)
    }

    /// `left op right`
    pub fn binary(&mut self, left: ExprId, op: BinaryOp, right: ExprId) -> ExprId {
        let span = self.expr_span(left).join(self.expr_span(right));
        self.expr(ExprKind::Binary { op, left, right }, span)
    }

    /// `ty{elts}`; `lbrace` is the opening brace
    pub fn composite(&mut self, ty: Option<ExprId>, lbrace: Span, elts: Vec<ExprId>) -> ExprId {
        let rbrace = self.token("}");
        let start = ty.map_or(lbrace, |ty| self.expr_span(ty).join(lbrace));
        let span = self.join_exprs(start, &elts).join(rbrace);
        self.expr(ExprKind::CompositeLit { ty, elts }, span)
    }

    /// `key: value`
    pub fn key_value(&mut self, key: ExprId, value: ExprId) -> ExprId {
        let span = self.expr_span(key).join(self.expr_span(value));
        self.expr(ExprKind::KeyValue { key, value }, span)
    }

    /// `func(params) results body`; `func_kw` is the `func` keyword
    pub fn func_lit(
        &mut self,
        func_kw: Span,
        params: Vec<FieldId>,
        results: Vec<ExprId>,
        body: StmtId,
    ) -> ExprId {
        let span = func_kw.join(self.stmt_span(body));
        self.expr(
            ExprKind::FuncLit {
                params,
                results,
                body,
            },
            span,
        )
    }

    /// `names ty` in a parameter, result or receiver list
    pub fn field(&mut self, names: Vec<ExprId>, ty: ExprId) -> FieldId {
        let span = self.join_exprs(self.expr_span(ty), &names);
        self.fields.alloc(Field { names, ty, span })
    }

    /// `{ stmts }`; `lbrace` is the opening brace
    pub fn block(&mut self, lbrace: Span, stmts: Vec<StmtId>) -> StmtId {
        let rbrace = self.token("}");
        let span = stmts
            .iter()
            .fold(lbrace, |acc, &stmt| acc.join(self.stmt_span(stmt)))
            .join(rbrace);
        self.stmt(StmtKind::Block(stmts), span)
    }

    /// Expression statement
    pub fn expr_stmt(&mut self, expr: ExprId) -> StmtId {
        let span = self.expr_span(expr);
        self.stmt(StmtKind::Expr(expr), span)
    }

    /// `lhs token rhs`
    pub fn assign(&mut self, lhs: Vec<ExprId>, token: AssignToken, rhs: Vec<ExprId>) -> StmtId {
        let all: Vec<ExprId> = lhs.iter().chain(&rhs).copied().collect();
        let first = match all.first() {
            Some(&expr) => self.expr_span(expr),
            None => self.token(";"),
        };
        let span = self.join_exprs(first, &all);
        self.stmt(StmtKind::Assign { lhs, token, rhs }, span)
    }

    /// `target++` / `target--`
    pub fn inc_dec(&mut self, target: ExprId, inc: bool) -> StmtId {
        let op = self.token(if inc { "++" } else { "--" });
        let span = self.expr_span(target).join(op);
        self.stmt(StmtKind::IncDec { target, inc }, span)
    }

    /// `return results`; `return_kw` is the keyword
    pub fn ret(&mut self, return_kw: Span, results: Vec<ExprId>) -> StmtId {
        let span = self.join_exprs(return_kw, &results);
        self.stmt(StmtKind::Return(results), span)
    }

    /// `if init; cond then else`
    pub fn if_stmt(
        &mut self,
        if_kw: Span,
        init: Option<StmtId>,
        cond: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    ) -> StmtId {
        let mut span = if_kw.join(self.expr_span(cond)).join(self.stmt_span(then_branch));
        for stmt in init.into_iter().chain(else_branch) {
            span = span.join(self.stmt_span(stmt));
        }
        self.stmt(
            StmtKind::If {
                init,
                cond,
                then_branch,
                else_branch,
            },
            span,
        )
    }

    /// `for init; cond; post body`
    pub fn for_stmt(
        &mut self,
        for_kw: Span,
        init: Option<StmtId>,
        cond: Option<ExprId>,
        post: Option<StmtId>,
        body: StmtId,
    ) -> StmtId {
        let mut span = for_kw.join(self.stmt_span(body));
        for stmt in init.into_iter().chain(post) {
            span = span.join(self.stmt_span(stmt));
        }
        if let Some(cond) = cond {
            span = span.join(self.expr_span(cond));
        }
        self.stmt(
            StmtKind::For {
                init,
                cond,
                post,
                body,
            },
            span,
        )
    }

    /// Statement wrapping a local declaration
    pub fn decl_stmt(&mut self, decl: DeclId) -> StmtId {
        let span = self.decl_arena[decl].span;
        self.stmt(StmtKind::Decl(decl), span)
    }

    /// `names ty = values`
    pub fn value_spec(
        &mut self,
        names: Vec<ExprId>,
        ty: Option<ExprId>,
        values: Vec<ExprId>,
    ) -> SpecId {
        let all: Vec<ExprId> = names.iter().chain(&ty).chain(&values).copied().collect();
        let first = match all.first() {
            Some(&expr) => self.expr_span(expr),
            None => self.token("_"),
        };
        let span = self.join_exprs(first, &all);
        self.specs.alloc(Spec {
            kind: SpecKind::Value { names, ty, values },
            span,
        })
    }

    /// `name ty`
    pub fn type_spec(&mut self, name: ExprId, ty: ExprId) -> SpecId {
        let span = self.expr_span(name).join(self.expr_span(ty));
        self.specs.alloc(Spec {
            kind: SpecKind::Type { name, ty },
            span,
        })
    }

    /// `name "path"`
    pub fn import_spec(&mut self, name: Option<ExprId>, path: &str) -> SpecId {
        let path_span = self.token(&format!("{path:?}"));
        let span = name.map_or(path_span, |name| self.expr_span(name).join(path_span));
        self.specs.alloc(Spec {
            kind: SpecKind::Import {
                name,
                path: path.to_string(),
            },
            span,
        })
    }

    /// `keyword specs`; `keyword` is the extent of `var`, `const`, ...
    pub fn gen_decl(&mut self, keyword: Span, token: DeclToken, specs: Vec<SpecId>) -> DeclId {
        let span = specs
            .iter()
            .fold(keyword, |acc, &spec| acc.join(self.specs[spec].span));
        self.decl_arena.alloc(Decl {
            kind: DeclKind::Gen(GenDecl { token, specs }),
            span,
        })
    }

    /// Function or method declaration; `func_kw` is the `func` keyword
    pub fn func_decl(&mut self, func_kw: Span, func: FuncDecl) -> DeclId {
        let mut span = func_kw.join(self.expr_span(func.name));
        for field in func.recv.iter().chain(&func.params) {
            span = span.join(self.fields[*field].span);
        }
        span = self.join_exprs(span, &func.results);
        if let Some(body) = func.body {
            span = span.join(self.stmt_span(body));
        }
        self.decl_arena.alloc(Decl {
            kind: DeclKind::Func(func),
            span,
        })
    }

    /// Appends a declaration to the file's top level
    pub fn push_decl(&mut self, decl: DeclId) {
        self.decls.push(decl);
    }

    /// Finishes the file
    pub fn finish(self) -> SourceFile {
        SourceFile {
            id: self.id,
            package: self.package,
            decls: self.decls,
            span: Span::new(self.start, self.cursor),
            exprs: self.exprs,
            stmts: self.stmts,
            decl_arena: self.decl_arena,
            specs: self.specs,
            fields: self.fields,
            interner: self.interner,
        }
    }
}
