//! A small package built by hand: syntax, semantic model and IR
//!
//! ```text
//! package p
//!
//! var x = 1
//! var g int
//! const k = 2
//! type T struct{}
//! type I interface{M()}
//! func (t *T) M() { _ = t; _ = t.V }
//! func (t T) V() {}
//! func f(a int) {
//!     y := 0
//!     _ = func() { _ = y }
//!     z := a
//!     z = 0
//!     _ = z + 1
//!     _ = (z)
//!     _ = z < a
//! }
//! ```
//!
//! The IR is what a builder with debug info would produce for it; the
//! literal's function sees `y` through a parameter standing in for the
//! captured variable. The method value `t.V` is only resolved by the type
//! checker; its IR is left out.

use anyhow::{Context, Result};
use rv_ast::{
    AncestorChain, AssignToken, AstBuilder, BinaryOp, DeclToken, ExprId, FuncDecl, NodeRef,
    SourceFile, StmtId, path_enclosing,
};
use rv_intern::Interner;
use rv_span::{FileId, Pos, Span};
use rv_ssa::{BuilderMode, Const, FunctionId, Program, Value};
use rv_types::{
    BasicKind, ConstValue, Info, ObjId, PkgId, Selection, SelectionKind, SemanticModel, TypeId,
    VarKind,
};
use tracing::debug;

/// How much of the package's IR exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Package created and members declared; no bodies
    Declared,
    /// All bodies built, but `f` has no function for its literal
    WithoutLiteral,
    /// Everything built
    Complete,
}

/// Syntax nodes of interest
#[derive(Debug, Clone, Copy)]
pub struct Nodes {
    /// `x` in `var x = 1`
    pub x_name: ExprId,
    /// `1` in `var x = 1`
    pub x_init: ExprId,
    /// `g` in `var g int`
    pub g_name: ExprId,
    /// `k` in `const k = 2`
    pub k_name: ExprId,
    /// Name of type `T`
    pub t_name: ExprId,
    /// Name of type `I`
    pub i_name: ExprId,
    /// Name of method `M`
    pub m_name: ExprId,
    /// Body block of `M`
    pub m_body: StmtId,
    /// `t` in `_ = t`
    pub m_use_t: ExprId,
    /// `t` in `_ = t.V`
    pub m_sel_t: ExprId,
    /// The method value `t.V`
    pub m_sel: ExprId,
    /// Name of method `V`
    pub v_name: ExprId,
    /// Name of function `f`
    pub f_name: ExprId,
    /// Parameter `a` of `f`
    pub a_name: ExprId,
    /// `y` in `y := 0`
    pub y_def: ExprId,
    /// The function literal in `f`
    pub lit: ExprId,
    /// `y` inside the literal
    pub y_use: ExprId,
    /// `z` in `z := a`
    pub z_def: ExprId,
    /// `a` in `z := a`
    pub a_use: ExprId,
    /// `z` in `z = 0`
    pub z_target: ExprId,
    /// `z` in `z + 1`
    pub z_use: ExprId,
    /// `z + 1`
    pub sum: ExprId,
    /// `1` in `z + 1`
    pub one: ExprId,
    /// `(z)`
    pub paren: ExprId,
    /// `z` inside `(z)`
    pub z_paren: ExprId,
    /// `z` in `z < a`
    pub z_cmp: ExprId,
    /// `a` in `z < a`
    pub a_cmp: ExprId,
    /// `z < a`
    pub cmp: ExprId,
}

/// Semantic objects of the package
#[derive(Debug, Clone, Copy)]
pub struct Objects {
    /// Package variable `x`
    pub x: ObjId,
    /// Package variable `g`
    pub g: ObjId,
    /// Constant `k`
    pub k: ObjId,
    /// Type name `T`
    pub t_name: ObjId,
    /// Named type `T`
    pub t: TypeId,
    /// Type name `I`
    pub i_name: ObjId,
    /// Named interface type `I`
    pub i: TypeId,
    /// Method `M` of interface `I`
    pub i_m: ObjId,
    /// Method `M` of `*T`
    pub m: ObjId,
    /// Method `V` of `T`
    pub v: ObjId,
    /// Function `f`
    pub f: ObjId,
    /// Signature of the literal in `f`
    pub lit_sig: TypeId,
    /// Parameter `a`
    pub a: ObjId,
    /// Local `y`
    pub y: ObjId,
    /// Local `z`
    pub z: ObjId,
}

/// IR functions, where built
#[derive(Debug, Clone, Copy)]
pub struct Functions {
    /// Package initializer
    pub init: FunctionId,
    /// Method `M`
    pub m: FunctionId,
    /// Method `V`
    pub v: FunctionId,
    /// Function `f`
    pub f: FunctionId,
    /// The literal in `f`, unless left out
    pub lit: Option<FunctionId>,
}

/// Extents of the function declarations
#[derive(Debug, Clone, Copy)]
struct DeclSpans {
    m: Span,
    v: Span,
    f: Span,
    lit: Span,
}

/// The package with its program
#[derive(Debug)]
pub struct PackageFixture {
    /// The program holding the package
    pub program: Program,
    /// The fixture package
    pub pkg: PkgId,
    /// A package known to the type checker but never created in the program
    pub other: PkgId,
    /// Its only source file
    pub file: SourceFile,
    /// Type-checker output for `file`
    pub info: Info,
    /// Syntax nodes
    pub nodes: Nodes,
    /// Declared objects
    pub objects: Objects,
    /// Built functions
    pub functions: Functions,
}

impl PackageFixture {
    /// Builds the package up to `stage`
    ///
    /// # Errors
    ///
    /// Returns an error if the IR fails its sanity check
    pub fn build(mode: BuilderMode, stage: Stage) -> Result<Self> {
        let interner = Interner::new();
        let (file, nodes, spans) = parse(interner.clone());
        let mut model = SemanticModel::new(interner);
        let pkg = model.new_package("example.com/p", "p");
        let other = model.new_package("example.com/q", "q");
        let objects = declare(&mut model, pkg, &file, &nodes);
        let info = record(&model, &file, &nodes, &objects);

        let mut program = Program::new(model, mode);
        program.add_builtins();
        let functions = lower(&mut program, pkg, &file, &nodes, &objects, stage, spans)?;
        program.mark_built(pkg);
        debug!(?stage, functions = program.functions().count(), "built fixture package");

        Ok(Self {
            program,
            pkg,
            other,
            file,
            info,
            nodes,
            objects,
            functions,
        })
    }

    /// Position of an expression
    pub fn pos(&self, expr: ExprId) -> Pos {
        self.file.exprs[expr].pos()
    }

    /// Ancestor chain from an expression out to the file
    ///
    /// # Errors
    ///
    /// Returns an error if the expression is not in the file
    pub fn chain_to(&self, expr: ExprId) -> Result<AncestorChain> {
        let pos = self.pos(expr);
        let chain = path_enclosing(&self.file, pos, pos).context("position outside the file")?;
        anyhow::ensure!(
            chain.target() == NodeRef::Expr(expr),
            "innermost node at {pos} is {:?}",
            chain.target()
        );
        Ok(chain)
    }

    /// Type with the given basic kind
    pub fn basic(&self, kind: BasicKind) -> TypeId {
        self.program.model().basic(kind)
    }
}

fn parse(interner: Interner) -> (SourceFile, Nodes, DeclSpans) {
    let mut ast = AstBuilder::new(interner, FileId(0), 1, "p");

    let var_kw = ast.token("var");
    let x_name = ast.ident("x");
    ast.token("=");
    let x_init = ast.int(1);
    let spec = ast.value_spec(vec![x_name], None, vec![x_init]);
    let decl = ast.gen_decl(var_kw, DeclToken::Var, vec![spec]);
    ast.push_decl(decl);

    let var_kw = ast.token("var");
    let g_name = ast.ident("g");
    let g_ty = ast.ident("int");
    let spec = ast.value_spec(vec![g_name], Some(g_ty), Vec::new());
    let decl = ast.gen_decl(var_kw, DeclToken::Var, vec![spec]);
    ast.push_decl(decl);

    let const_kw = ast.token("const");
    let k_name = ast.ident("k");
    ast.token("=");
    let k_init = ast.int(2);
    let spec = ast.value_spec(vec![k_name], None, vec![k_init]);
    let decl = ast.gen_decl(const_kw, DeclToken::Const, vec![spec]);
    ast.push_decl(decl);

    let type_kw = ast.token("type");
    let t_name = ast.ident("T");
    let t_ty = ast.ident("struct{}");
    let spec = ast.type_spec(t_name, t_ty);
    let decl = ast.gen_decl(type_kw, DeclToken::Type, vec![spec]);
    ast.push_decl(decl);

    let type_kw = ast.token("type");
    let i_name = ast.ident("I");
    let i_ty = ast.ident("interface{M()}");
    let spec = ast.type_spec(i_name, i_ty);
    let decl = ast.gen_decl(type_kw, DeclToken::Type, vec![spec]);
    ast.push_decl(decl);

    // func (t *T) M() { _ = t; _ = t.V }
    let func_kw = ast.token("func");
    ast.token("(");
    let recv_name = ast.ident("t");
    let star = ast.token("*");
    let recv_type = ast.ident("T");
    let recv_ty = ast.star(star, recv_type);
    let recv = ast.field(vec![recv_name], recv_ty);
    ast.token(")");
    let m_name = ast.ident("M");
    ast.token("()");
    let lbrace = ast.token("{");
    let blank = ast.ident("_");
    ast.token("=");
    let m_use_t = ast.ident("t");
    let stmt = ast.assign(vec![blank], AssignToken::Assign, vec![m_use_t]);
    ast.token(";");
    let blank = ast.ident("_");
    ast.token("=");
    let m_sel_t = ast.ident("t");
    let m_sel = ast.selector(m_sel_t, "V");
    let sel_stmt = ast.assign(vec![blank], AssignToken::Assign, vec![m_sel]);
    let m_body = ast.block(lbrace, vec![stmt, sel_stmt]);
    let m_decl = ast.func_decl(
        func_kw,
        FuncDecl {
            recv: Some(recv),
            name: m_name,
            params: Vec::new(),
            results: Vec::new(),
            body: Some(m_body),
        },
    );
    ast.push_decl(m_decl);

    // func (t T) V() {}
    let func_kw = ast.token("func");
    ast.token("(");
    let recv_name = ast.ident("t");
    let recv_ty = ast.ident("T");
    let recv = ast.field(vec![recv_name], recv_ty);
    ast.token(")");
    let v_name = ast.ident("V");
    ast.token("()");
    let lbrace = ast.token("{");
    let v_body = ast.block(lbrace, Vec::new());
    let v_decl = ast.func_decl(
        func_kw,
        FuncDecl {
            recv: Some(recv),
            name: v_name,
            params: Vec::new(),
            results: Vec::new(),
            body: Some(v_body),
        },
    );
    ast.push_decl(v_decl);

    // func f(a int) { ... }
    let func_kw = ast.token("func");
    let f_name = ast.ident("f");
    ast.token("(");
    let a_name = ast.ident("a");
    let a_ty = ast.ident("int");
    let param = ast.field(vec![a_name], a_ty);
    ast.token(")");
    let lbrace = ast.token("{");

    let y_def = ast.ident("y");
    ast.token(":=");
    let zero = ast.int(0);
    let define_y = ast.assign(vec![y_def], AssignToken::Define, vec![zero]);

    let blank = ast.ident("_");
    ast.token("=");
    let lit_kw = ast.token("func");
    ast.token("()");
    let lit_lbrace = ast.token("{");
    let inner_blank = ast.ident("_");
    ast.token("=");
    let y_use = ast.ident("y");
    let inner = ast.assign(vec![inner_blank], AssignToken::Assign, vec![y_use]);
    let lit_body = ast.block(lit_lbrace, vec![inner]);
    let lit = ast.func_lit(lit_kw, Vec::new(), Vec::new(), lit_body);
    let assign_lit = ast.assign(vec![blank], AssignToken::Assign, vec![lit]);

    let z_def = ast.ident("z");
    ast.token(":=");
    let a_use = ast.ident("a");
    let define_z = ast.assign(vec![z_def], AssignToken::Define, vec![a_use]);

    let z_target = ast.ident("z");
    ast.token("=");
    let zero_again = ast.int(0);
    let assign_z = ast.assign(vec![z_target], AssignToken::Assign, vec![zero_again]);

    let blank = ast.ident("_");
    ast.token("=");
    let z_use = ast.ident("z");
    ast.token("+");
    let one = ast.int(1);
    let sum = ast.binary(z_use, BinaryOp::Add, one);
    let assign_sum = ast.assign(vec![blank], AssignToken::Assign, vec![sum]);

    let blank = ast.ident("_");
    ast.token("=");
    let lparen = ast.token("(");
    let z_paren = ast.ident("z");
    let paren = ast.paren(lparen, z_paren);
    let assign_paren = ast.assign(vec![blank], AssignToken::Assign, vec![paren]);

    let blank = ast.ident("_");
    ast.token("=");
    let z_cmp = ast.ident("z");
    ast.token("<");
    let a_cmp = ast.ident("a");
    let cmp = ast.binary(z_cmp, BinaryOp::Lt, a_cmp);
    let assign_cmp = ast.assign(vec![blank], AssignToken::Assign, vec![cmp]);

    let f_body = ast.block(
        lbrace,
        vec![
            define_y,
            assign_lit,
            define_z,
            assign_z,
            assign_sum,
            assign_paren,
            assign_cmp,
        ],
    );
    let f_decl = ast.func_decl(
        func_kw,
        FuncDecl {
            recv: None,
            name: f_name,
            params: vec![param],
            results: Vec::new(),
            body: Some(f_body),
        },
    );
    ast.push_decl(f_decl);
    let file = ast.finish();

    let spans = DeclSpans {
        m: file.decl_arena[m_decl].span,
        v: file.decl_arena[v_decl].span,
        f: file.decl_arena[f_decl].span,
        lit: file.exprs[lit].span,
    };
    let nodes = Nodes {
        x_name,
        x_init,
        g_name,
        k_name,
        t_name,
        i_name,
        m_name,
        m_body,
        m_use_t,
        m_sel_t,
        m_sel,
        v_name,
        f_name,
        a_name,
        y_def,
        lit,
        y_use,
        z_def,
        a_use,
        z_target,
        z_use,
        sum,
        one,
        paren,
        z_paren,
        z_cmp,
        a_cmp,
        cmp,
    };
    (file, nodes, spans)
}

fn declare(model: &mut SemanticModel, pkg: PkgId, file: &SourceFile, nodes: &Nodes) -> Objects {
    let pos = |expr: ExprId| file.exprs[expr].pos();
    let int = model.basic(BasicKind::Int);
    let untyped_int = model.basic(BasicKind::UntypedInt);

    let x = model.new_var(pkg, "x", pos(nodes.x_name), int, VarKind::Plain);
    let g = model.new_var(pkg, "g", pos(nodes.g_name), int, VarKind::Plain);
    let k = model.new_const(pkg, "k", pos(nodes.k_name), untyped_int, ConstValue::Int(2));

    let (t_name, t) = model.new_type_name(pkg, "T", pos(nodes.t_name));
    let empty = model.new_struct(Vec::new());
    model.set_underlying(t, empty);
    let t_ptr = model.pointer_to(t);
    let m = model.new_method(pkg, "M", pos(nodes.m_name), t_ptr, Vec::new(), Vec::new());
    model.add_method(t, m);
    let v = model.new_method(pkg, "V", pos(nodes.v_name), t, Vec::new(), Vec::new());
    model.add_method(t, v);

    let (i_name, i) = model.new_type_name(pkg, "I", pos(nodes.i_name));
    let i_m = model.new_method(pkg, "M", pos(nodes.i_name), i, Vec::new(), Vec::new());
    let iface = model.new_interface(vec![i_m], Vec::new());
    model.set_underlying(i, iface);

    let a = model.new_var(pkg, "a", pos(nodes.a_name), int, VarKind::Param);
    let f_sig = model.new_signature(None, vec![a], Vec::new(), false);
    let f = model.new_func(pkg, "f", pos(nodes.f_name), f_sig);
    let lit_sig = model.new_signature(None, Vec::new(), Vec::new(), false);
    let y = model.new_var(pkg, "y", pos(nodes.y_def), int, VarKind::Plain);
    let z = model.new_var(pkg, "z", pos(nodes.z_def), int, VarKind::Plain);

    for obj in [x, g, k, t_name, i_name, f] {
        model.declare(pkg, obj);
    }
    model.mark_complete(pkg);

    Objects {
        x,
        g,
        k,
        t_name,
        t,
        i_name,
        i,
        i_m,
        m,
        v,
        f,
        lit_sig,
        a,
        y,
        z,
    }
}

fn record(model: &SemanticModel, file: &SourceFile, nodes: &Nodes, objects: &Objects) -> Info {
    let int = model.basic(BasicKind::Int);
    let untyped_int = model.basic(BasicKind::UntypedInt);
    let untyped_bool = model.basic(BasicKind::UntypedBool);
    let mut info = Info::new(file.id);

    info.record_def(nodes.x_name, objects.x);
    info.record_constant(nodes.x_init, untyped_int, ConstValue::Int(1));
    info.record_def(nodes.g_name, objects.g);
    info.record_def(nodes.k_name, objects.k);
    info.record_def(nodes.t_name, objects.t_name);
    info.record_def(nodes.i_name, objects.i_name);
    info.record_def(nodes.m_name, objects.m);
    info.record_def(nodes.v_name, objects.v);
    info.record_def(nodes.f_name, objects.f);
    info.record_def(nodes.a_name, objects.a);

    if let Some(recv) = model.signature(objects.m).and_then(|sig| sig.recv) {
        let recv_ty = model.object(recv).ty;
        for ident in [nodes.m_use_t, nodes.m_sel_t] {
            info.record_use(ident, recv);
            info.record_type(ident, recv_ty);
        }
        // V has a value receiver, so `t.V` dereferences t
        info.record_selection(
            nodes.m_sel,
            Selection {
                kind: SelectionKind::MethodVal,
                recv: recv_ty,
                obj: objects.v,
                index: Vec::new(),
                indirect: true,
            },
        );
        info.record_type(nodes.m_sel, model.object(objects.v).ty);
    }

    for (def, obj) in [(nodes.y_def, objects.y), (nodes.z_def, objects.z)] {
        info.record_def(def, obj);
        info.record_type(def, int);
    }
    for (ident, obj) in [
        (nodes.y_use, objects.y),
        (nodes.a_use, objects.a),
        (nodes.z_target, objects.z),
        (nodes.z_use, objects.z),
        (nodes.z_paren, objects.z),
        (nodes.z_cmp, objects.z),
        (nodes.a_cmp, objects.a),
    ] {
        info.record_use(ident, obj);
        info.record_type(ident, int);
    }
    info.record_type(nodes.lit, objects.lit_sig);
    info.record_type(nodes.sum, int);
    info.record_constant(nodes.one, int, ConstValue::Int(1));
    info.record_type(nodes.paren, int);
    info.record_type(nodes.cmp, untyped_bool);
    info
}

fn lower(
    program: &mut Program,
    pkg: PkgId,
    file: &SourceFile,
    nodes: &Nodes,
    objects: &Objects,
    stage: Stage,
    spans: DeclSpans,
) -> Result<Functions> {
    let pos = |expr: ExprId| file.exprs[expr].pos();
    let int = program.model().basic(BasicKind::Int);
    let bool_ty = program.model().basic(BasicKind::Bool);
    let int_ptr = program.model_mut().pointer_to(int);
    let t_ptr = program.model_mut().pointer_to(objects.t);
    let int_const = |value| Value::Const(Const::new(ConstValue::Int(value), int));

    let init = program.create_package(pkg);
    let x = program.declare_global(pkg, objects.x).context("declare x")?;
    program.declare_global(pkg, objects.g).context("declare g")?;
    program.declare_const(pkg, objects.k).context("declare k")?;
    program.declare_type(pkg, objects.t_name);
    program.declare_type(pkg, objects.i_name);
    let m = program
        .declare_function(pkg, objects.m, spans.m)
        .context("declare M")?;
    let v = program
        .declare_function(pkg, objects.v, spans.v)
        .context("declare V")?;
    let f = program
        .declare_function(pkg, objects.f, spans.f)
        .context("declare f")?;

    let mut functions = Functions {
        init,
        m,
        v,
        f,
        lit: None,
    };
    if stage == Stage::Declared {
        return Ok(functions);
    }

    let mut body = program.build_function(init);
    body.store(Value::Node(x), int_const(1));
    body.ret(Vec::new());
    body.finish()?;

    let recv = program
        .model()
        .signature(objects.m)
        .and_then(|sig| sig.recv)
        .context("M has a receiver")?;
    let mut body = program.build_function(m);
    let t = body.add_param(Some(recv), "t", t_ptr, pos(nodes.m_name));
    body.debug_ref(file, nodes.m_use_t, Value::Node(t), false);
    body.ret(Vec::new());
    body.finish()?;

    let recv = program
        .model()
        .signature(objects.v)
        .and_then(|sig| sig.recv)
        .context("V has a receiver")?;
    let mut body = program.build_function(v);
    body.add_param(Some(recv), "t", objects.t, pos(nodes.v_name));
    body.ret(Vec::new());
    body.finish()?;

    let mut body = program.build_function(f);
    let a = body.add_param(Some(objects.a), "a", int, pos(nodes.a_name));

    let y = body.alloc(int, pos(nodes.y_def), "y", true);
    body.store(Value::Node(y), int_const(0));
    body.debug_ref(file, nodes.y_def, Value::Node(y), true);

    if stage == Stage::Complete {
        let lit = body.anon_func(pos(nodes.lit), spans.lit, objects.lit_sig);
        let closure = body.make_closure(lit, pos(nodes.lit));
        body.debug_ref(file, nodes.lit, Value::Node(closure), false);
        functions.lit = Some(lit);
    }

    let z = body.alloc(int, pos(nodes.z_def), "z", false);
    body.store(Value::Node(z), Value::Node(a));
    body.debug_ref(file, nodes.a_use, Value::Node(a), false);
    body.debug_ref(file, nodes.z_def, Value::Node(z), true);

    body.store(Value::Node(z), int_const(0));
    body.debug_ref(file, nodes.z_target, Value::Node(z), true);

    let loaded = body.load(Value::Node(z), pos(nodes.z_use));
    body.debug_ref(file, nodes.z_use, Value::Node(loaded), false);
    let sum = body.bin_op(BinaryOp::Add, Value::Node(loaded), int_const(1), int, pos(nodes.sum));
    body.debug_ref(file, nodes.sum, Value::Node(sum), false);

    let loaded = body.load(Value::Node(z), pos(nodes.z_paren));
    body.debug_ref(file, nodes.paren, Value::Node(loaded), false);

    let loaded = body.load(Value::Node(z), pos(nodes.z_cmp));
    body.debug_ref(file, nodes.z_cmp, Value::Node(loaded), false);
    body.debug_ref(file, nodes.a_cmp, Value::Node(a), false);
    let cmp = body.bin_op(BinaryOp::Lt, Value::Node(loaded), Value::Node(a), bool_ty, pos(nodes.cmp));
    body.debug_ref(file, nodes.cmp, Value::Node(cmp), false);
    body.ret(Vec::new());
    body.finish()?;

    if let Some(lit) = functions.lit {
        let mut body = program.build_function(lit);
        let captured = body.add_param(None, "y", int_ptr, pos(nodes.y_def));
        let loaded = body.load(Value::Node(captured), pos(nodes.y_use));
        body.debug_ref(file, nodes.y_use, Value::Node(loaded), false);
        body.ret(Vec::new());
        body.finish()?;
    }

    Ok(functions)
}
