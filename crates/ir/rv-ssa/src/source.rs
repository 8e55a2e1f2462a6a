//! Mapping between source syntax, semantic objects and IR values
//!
//! Syntax, semantic objects and IR are built by separate passes and hold no
//! pointers to each other. The queries here correlate them by position: a
//! function declaration's name position identifies its IR function, a
//! literal's `func` keyword identifies its anonymous function, and an
//! identifier's position identifies its debug reference.
//!
//! All queries are read-only. Missing IR (package not created, literal not
//! built, debug info not requested) yields `None`; only malformed input is
//! an error.

use crate::error::SourceError;
use crate::function::FunctionId;
use crate::program::{Member, Program};
use crate::value::{Const, Value, ValueKind};
use rv_ast::{AncestorChain, DeclKind, DeclToken, ExprId, ExprKind, NodeRef, SourceFile, unparen};
use rv_span::Pos;
use rv_types::{ConstValue, MethodSetKey, ObjId, PkgId};
use tracing::trace;

/// Top-level declaration enclosing a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnclosingTopLevel {
    /// A package-level `var` initializer or an explicit `init` function
    PackageInit,
    /// A named function or method
    Named {
        /// Position of the declaration's name identifier
        name_pos: Pos,
        /// Whether the declaration is a method
        has_receiver: bool,
    },
    /// Not inside any function
    None,
}

/// Classifies the top-level declaration a chain runs through.
///
/// Needs no IR, so tools can filter inputs before anything is built.
pub fn classify_enclosing_top_level(file: &SourceFile, chain: &AncestorChain) -> EnclosingTopLevel {
    let Some(NodeRef::Decl(decl)) = chain.top_level() else {
        return EnclosingTopLevel::None;
    };
    match &file.decl_arena[decl].kind {
        DeclKind::Gen(gen_decl) if gen_decl.token == DeclToken::Var && chain.len() >= 3 => {
            EnclosingTopLevel::PackageInit
        }
        DeclKind::Gen(_) => EnclosingTopLevel::None,
        DeclKind::Func(func) => {
            let is_init = file
                .ident_name(func.name)
                .is_some_and(|name| file.interner().is(name, "init"));
            if func.recv.is_none() && is_init {
                EnclosingTopLevel::PackageInit
            } else {
                EnclosingTopLevel::Named {
                    name_pos: file.exprs[func.name].pos(),
                    has_receiver: func.recv.is_some(),
                }
            }
        }
    }
}

/// Whether the chain lies inside a function or package-level variable
/// declaration
pub fn has_enclosing_function(file: &SourceFile, chain: &AncestorChain) -> bool {
    classify_enclosing_top_level(file, chain) != EnclosingTopLevel::None
}

impl Program {
    /// Innermost built function of `pkg` containing the chain's target.
    ///
    /// Package-level `var` initializers belong to the package initializer.
    /// Returns `None` when the node is outside any function, when the
    /// package has not been created, or when a function literal on the way
    /// has no IR (not built yet, or dropped as dead code).
    pub fn enclosing_function(
        &self,
        pkg: PkgId,
        file: &SourceFile,
        chain: &AncestorChain,
    ) -> Option<FunctionId> {
        let classification = classify_enclosing_top_level(file, chain);
        trace!(?classification, "classified enclosing declaration");
        let package = self.package(pkg)?;
        let mut current = match classification {
            EnclosingTopLevel::PackageInit => package.init(),
            EnclosingTopLevel::Named {
                name_pos,
                has_receiver: false,
            } => package.members().find_map(|(_, member)| match member {
                Member::Function(func) if self.function(func).pos == name_pos => Some(func),
                _ => None,
            })?,
            EnclosingTopLevel::Named {
                name_pos,
                has_receiver: true,
            } => self.declared_method_at(pkg, name_pos)?,
            EnclosingTopLevel::None => return None,
        };

        for node in chain.outermost_first() {
            let NodeRef::Expr(expr) = node else {
                continue;
            };
            let literal = &file.exprs[expr];
            if !matches!(literal.kind, ExprKind::FuncLit { .. }) {
                continue;
            }
            let pos = literal.pos();
            let Some(anon) = self.anon_func_at(current, pos) else {
                trace!(pos = %pos, parent = %self.function(current).name, "literal has no function");
                return None;
            };
            current = anon;
        }
        Some(current)
    }

    /// The anonymous function of `func` whose literal starts at `pos`
    pub fn anon_func_at(&self, func: FunctionId, pos: Pos) -> Option<FunctionId> {
        self.function(func)
            .anon_funcs
            .iter()
            .copied()
            .find(|&anon| self.function(anon).pos == pos)
    }

    /// Declared method of a named type of `pkg` whose name is at `pos`.
    ///
    /// Searches the method sets of `*T`, which include every method of `T`,
    /// and maps the declared method object through the value table without
    /// creating wrappers.
    fn declared_method_at(&self, pkg: PkgId, pos: Pos) -> Option<FunctionId> {
        let package = self.package(pkg)?;
        let model = self.model();
        package.members().find_map(|(_, member)| {
            let Member::Type(type_name) = member else {
                return None;
            };
            let key = MethodSetKey::pointer(model.object(type_name).ty);
            let set = self.method_sets().method_set(model, key);
            let method = set
                .iter()
                .map(|entry| entry.binding.func())
                .find(|&method| model.object(method).pos == pos)?;
            self.value_function(package.value(method)?)
        })
    }

    /// Value of the non-constant expression `expr` inside `func`.
    ///
    /// Parentheses are ignored. Returns `None` if `func` has no debug info,
    /// if the expression is not in `func`, or if its value was optimized
    /// away. Constant expressions never have a value here; their values are
    /// in the type checker's [`Info`](rv_types::Info).
    pub fn value_for_expr(&self, func: FunctionId, file: &SourceFile, expr: ExprId) -> Option<Value> {
        let function = self.function(func);
        if !function.debug_info {
            return None;
        }
        let expr = unparen(file, expr);
        let found = function
            .debug_refs()
            .find(|debug_ref| debug_ref.file == file.id && debug_ref.expr == expr)
            .map(|debug_ref| debug_ref.x.clone());
        trace!(function = %function.name, found = found.is_some(), "value for expression");
        found
    }

    /// Value of a function or method object.
    ///
    /// Built-ins come from the program's built-in table and declared
    /// functions from their package. Interface methods resolve through the
    /// receiver's method set to a wrapper.
    pub fn func_value(&self, obj: ObjId) -> Option<Value> {
        if let Some(builtin) = self.builtin(obj) {
            return Some(Value::Node(builtin));
        }
        if let Some(value) = self.package_level_value(obj) {
            return Some(value);
        }
        let model = self.model();
        let recv = model.recv_type(obj)?;
        let key = MethodSetKey::of(model, recv);
        let set = self.method_sets().method_set(model, key);
        let object = model.object(obj);
        let entry = set.lookup(model, object.pkg, object.name)?;
        self.method(key, &entry.binding)
    }

    /// Value of a named constant; never fails.
    ///
    /// Package-level constants of created packages return their declared
    /// value, so repeated calls are identical. Every other constant,
    /// including `true`, `false` and `nil`, yields a fresh [`Const`].
    pub fn const_value(&self, obj: ObjId) -> Value {
        let object = self.model().object(obj);
        if !object.is_universal() {
            if let Some(value) = self.package_level_value(obj) {
                let is_const = value
                    .as_node()
                    .is_some_and(|id| matches!(self.value(id).kind, ValueKind::Const(_)));
                if is_const {
                    return value;
                }
            }
        }
        let value = object.const_value().cloned().unwrap_or(ConstValue::Nil);
        Value::Const(Const::new(value, object.ty))
    }

    /// Value of the variable `obj` at the identifier `chain` starts at.
    ///
    /// `pkg` is the package containing the reference. Package-level
    /// variables yield their global, whose type is a pointer to the
    /// variable's type. For locals the result is the value of the
    /// identifier, or its address when it occurs as an assignment target,
    /// an operand of `&`, and in similar addressable positions; compare the
    /// result's type against the variable's to tell them apart.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NotAnIdentifier`] if the chain does not
    /// start at an identifier.
    pub fn var_value(
        &self,
        obj: ObjId,
        pkg: PkgId,
        file: &SourceFile,
        chain: &AncestorChain,
    ) -> Result<Option<Value>, SourceError> {
        let NodeRef::Expr(ident) = chain.target() else {
            return Err(SourceError::NotAnIdentifier);
        };
        if !matches!(file.exprs[ident].kind, ExprKind::Ident(_)) {
            return Err(SourceError::NotAnIdentifier);
        }

        if let Some(global) = self.package_level_value(obj) {
            return Ok(Some(global));
        }

        let Some(func) = self.enclosing_function(pkg, file, chain) else {
            return Ok(None);
        };
        let function = self.function(func);
        let pos = file.exprs[ident].pos();

        if pos == self.model().object(obj).pos {
            let param = function.params.iter().copied().find(|&param| {
                matches!(
                    self.value(param).kind,
                    ValueKind::Parameter { object: Some(object), .. } if object == obj
                )
            });
            if let Some(param) = param {
                return Ok(Some(Value::Node(param)));
            }
        }

        let found = function
            .debug_refs()
            .find(|debug_ref| debug_ref.pos == pos)
            .map(|debug_ref| debug_ref.x.clone());
        trace!(function = %function.name, pos = %pos, found = found.is_some(), "variable value");
        Ok(found)
    }

    /// [`var_value`](Self::var_value) for a caller-assembled path, innermost
    /// node first.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Chain`] if `path` is not an ancestor chain of
    /// `file`, and [`SourceError::NotAnIdentifier`] as `var_value` does.
    pub fn var_value_in_path(
        &self,
        obj: ObjId,
        pkg: PkgId,
        file: &SourceFile,
        path: Vec<NodeRef>,
    ) -> Result<Option<Value>, SourceError> {
        let chain = AncestorChain::new(file, path)?;
        self.var_value(obj, pkg, file, &chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::BuilderMode;
    use rv_ast::{AstBuilder, ChainError, FuncDecl, StmtId, path_enclosing};
    use rv_intern::Interner;
    use rv_span::FileId;
    use rv_types::{BasicKind, SemanticModel};

    /// `package p; const c = 1; func f() { }`
    struct Fixture {
        program: Program,
        pkg: PkgId,
        file: SourceFile,
        const_name: ExprId,
        const_obj: ObjId,
        func_body: StmtId,
    }

    fn fixture() -> Fixture {
        let interner = Interner::new();
        let mut ast = AstBuilder::new(interner.clone(), FileId(0), 1, "p");
        let const_kw = ast.token("const");
        let const_name = ast.ident("c");
        let one = ast.int(1);
        let spec = ast.value_spec(vec![const_name], None, vec![one]);
        let const_decl = ast.gen_decl(const_kw, DeclToken::Const, vec![spec]);
        ast.push_decl(const_decl);
        let func_kw = ast.token("func");
        let name = ast.ident("f");
        let lbrace = ast.token("{");
        let func_body = ast.block(lbrace, Vec::new());
        let decl = ast.func_decl(
            func_kw,
            FuncDecl {
                recv: None,
                name,
                params: Vec::new(),
                results: Vec::new(),
                body: Some(func_body),
            },
        );
        ast.push_decl(decl);
        let file = ast.finish();

        let mut model = SemanticModel::new(interner);
        let pkg = model.new_package("p", "p");
        let int = model.basic(BasicKind::UntypedInt);
        let const_obj = model.new_const(pkg, "c", file.exprs[const_name].pos(), int, ConstValue::Int(1));
        model.declare(pkg, const_obj);
        let program = Program::new(model, BuilderMode::empty());
        Fixture {
            program,
            pkg,
            file,
            const_name,
            const_obj,
            func_body,
        }
    }

    #[test]
    fn test_const_decl_has_no_enclosing_function() {
        let fx = fixture();
        let pos = fx.file.exprs[fx.const_name].pos();
        let chain = path_enclosing(&fx.file, pos, pos).unwrap();
        assert_eq!(
            classify_enclosing_top_level(&fx.file, &chain),
            EnclosingTopLevel::None
        );
        assert!(!has_enclosing_function(&fx.file, &chain));
    }

    #[test]
    fn test_named_function_needs_created_package() {
        let mut fx = fixture();
        let pos = fx.file.stmts[fx.func_body].span.start;
        let chain = path_enclosing(&fx.file, pos, pos).unwrap();
        assert!(matches!(
            classify_enclosing_top_level(&fx.file, &chain),
            EnclosingTopLevel::Named {
                has_receiver: false,
                ..
            }
        ));
        assert_eq!(fx.program.enclosing_function(fx.pkg, &fx.file, &chain), None);
        fx.program.create_package(fx.pkg);
        assert_eq!(fx.program.enclosing_function(fx.pkg, &fx.file, &chain), None);
    }

    #[test]
    fn test_const_value_caching() {
        let mut fx = fixture();
        let fresh = fx.program.const_value(fx.const_obj);
        assert!(matches!(fresh, Value::Const(_)));
        assert!(!fresh.same(&fx.program.const_value(fx.const_obj)));

        fx.program.create_package(fx.pkg);
        fx.program.declare_const(fx.pkg, fx.const_obj).unwrap();
        let cached = fx.program.const_value(fx.const_obj);
        assert!(cached.same(&fx.program.const_value(fx.const_obj)));

        let nil = fx.program.model().universe().nil;
        let Value::Const(constant) = fx.program.const_value(nil) else {
            panic!("universal constants are synthesized");
        };
        assert_eq!(constant.value, ConstValue::Nil);
    }

    #[test]
    fn test_var_value_rejects_non_identifiers() {
        let fx = fixture();
        let pos = fx.file.stmts[fx.func_body].span.start;
        let chain = path_enclosing(&fx.file, pos, pos).unwrap();
        assert_eq!(
            fx.program.var_value(fx.const_obj, fx.pkg, &fx.file, &chain),
            Err(SourceError::NotAnIdentifier)
        );
    }

    #[test]
    fn test_var_value_validates_paths() {
        let fx = fixture();
        let body = NodeRef::Stmt(fx.func_body);
        assert_eq!(
            fx.program
                .var_value_in_path(fx.const_obj, fx.pkg, &fx.file, vec![body]),
            Err(SourceError::Chain(ChainError::NotRootedAtFile { last: body }))
        );
        let path = vec![NodeRef::Expr(fx.const_name), NodeRef::File];
        assert_eq!(
            fx.program
                .var_value_in_path(fx.const_obj, fx.pkg, &fx.file, path),
            Ok(None)
        );
    }
}
