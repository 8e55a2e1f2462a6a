//! Function body construction

use crate::error::SanityError;
use crate::function::{BasicBlock, DebugRef, Function, FunctionId, Instr};
use crate::mode::BuilderMode;
use crate::program::Program;
use crate::value::{Value, ValueId, ValueKind};
use rv_ast::{BinaryOp, ExprId, SourceFile, UnaryOp, unparen};
use rv_span::{Pos, Span};
use rv_types::{ObjId, TypeId};
use tracing::{debug, trace};

/// Builder for the body of one function
#[derive(Debug)]
pub struct FunctionBuilder<'p> {
    program: &'p mut Program,
    func: FunctionId,
    current_block: Option<usize>,
    next_temp: usize,
}

impl Program {
    /// Starts building the body of `func`.
    ///
    /// Whether the function records debug references is decided here, from
    /// its package's debug mode.
    pub fn build_function(&mut self, func: FunctionId) -> FunctionBuilder<'_> {
        let pkg = self.function(func).pkg;
        let debug_info = self.package(pkg).is_some_and(|package| package.debug_mode());
        let function = self.function_mut(func);
        function.debug_info = debug_info;
        let next_temp = function.blocks.iter().map(|block| block.instrs.len()).sum();
        FunctionBuilder {
            program: self,
            func,
            current_block: None,
            next_temp,
        }
    }
}

impl FunctionBuilder<'_> {
    /// The function being built
    pub fn func(&self) -> FunctionId {
        self.func
    }

    /// The program being extended
    pub fn program(&self) -> &Program {
        self.program
    }

    fn function(&mut self) -> &mut Function {
        self.program.function_mut(self.func)
    }

    /// Adds a parameter (or receiver) to the function
    pub fn add_param(&mut self, object: Option<ObjId>, name: &str, ty: TypeId, pos: Pos) -> ValueId {
        let parent = self.func;
        let param =
            self.program
                .alloc_value(ValueKind::Parameter { object, parent }, ty, pos, name.to_string());
        self.function().params.push(param);
        param
    }

    /// Creates a new basic block and returns its index
    pub fn new_block(&mut self) -> usize {
        let function = self.function();
        let index = function.blocks.len();
        function.blocks.push(BasicBlock {
            index,
            instrs: Vec::new(),
        });
        if self.current_block.is_none() {
            self.current_block = Some(index);
        }
        index
    }

    /// Sets the block that receives new instructions
    pub fn set_current_block(&mut self, block: usize) {
        self.current_block = Some(block);
    }

    fn emit(&mut self, instr: Instr) {
        let block = match self.current_block {
            Some(block) => block,
            None => self.new_block(),
        };
        self.function().blocks[block].instrs.push(instr);
    }

    fn temp(&mut self, ty: TypeId, pos: Pos) -> ValueId {
        let name = format!("t{}", self.next_temp);
        self.next_temp += 1;
        let parent = self.func;
        self.program
            .alloc_value(ValueKind::Instr { parent }, ty, pos, name)
    }

    /// Allocates a variable of type `elem`; the result is its address
    pub fn alloc(&mut self, elem: TypeId, pos: Pos, comment: &str, heap: bool) -> ValueId {
        let ty = self.program.model_mut().pointer_to(elem);
        let result = self.temp(ty, pos);
        self.emit(Instr::Alloc {
            result,
            heap,
            comment: comment.to_string(),
        });
        result
    }

    /// Emits `x op y` as a fresh temporary of type `ty`
    pub fn bin_op(&mut self, op: BinaryOp, x: Value, y: Value, ty: TypeId, pos: Pos) -> ValueId {
        let result = self.temp(ty, pos);
        self.emit(Instr::BinOp { result, op, x, y });
        result
    }

    /// Emits `op x`
    pub fn un_op(&mut self, op: UnaryOp, x: Value, ty: TypeId, pos: Pos) -> ValueId {
        let result = self.temp(ty, pos);
        self.emit(Instr::UnOp { result, op, x });
        result
    }

    /// Loads through `addr`; the result has the pointee type
    pub fn load(&mut self, addr: Value, pos: Pos) -> ValueId {
        let (ty, _) = self.program.model().deref(self.program.value_type(&addr));
        let result = self.temp(ty, pos);
        self.emit(Instr::Load { result, addr });
        result
    }

    /// Stores `value` through `addr`
    pub fn store(&mut self, addr: Value, value: Value) {
        self.emit(Instr::Store { addr, value });
    }

    /// Calls `func`; returns the result value for non-void calls
    pub fn call(
        &mut self,
        func: Value,
        args: Vec<Value>,
        result_ty: Option<TypeId>,
        pos: Pos,
    ) -> Option<ValueId> {
        let result = result_ty.map(|ty| self.temp(ty, pos));
        self.emit(Instr::Call { result, func, args });
        result
    }

    /// Address of field `field` of the struct `base` points to
    pub fn field_addr(&mut self, base: Value, field: usize, field_ty: TypeId, pos: Pos) -> ValueId {
        let ty = self.program.model_mut().pointer_to(field_ty);
        let result = self.temp(ty, pos);
        self.emit(Instr::FieldAddr {
            result,
            base,
            field,
        });
        result
    }

    /// Address of element `index` of the array or slice `base`
    pub fn index_addr(&mut self, base: Value, index: Value, elem_ty: TypeId, pos: Pos) -> ValueId {
        let ty = self.program.model_mut().pointer_to(elem_ty);
        let result = self.temp(ty, pos);
        self.emit(Instr::IndexAddr {
            result,
            base,
            index,
        });
        result
    }

    /// Creates the function of a literal nested in this one.
    ///
    /// `pos` is the position of the literal's `func` keyword. The new
    /// function's body is built separately with
    /// [`Program::build_function`].
    pub fn anon_func(&mut self, pos: Pos, span: Span, signature: TypeId) -> FunctionId {
        let parent = self.func;
        let (name, pkg) = {
            let function = self.function();
            (
                format!("{}${}", function.name, function.anon_funcs.len() + 1),
                function.pkg,
            )
        };
        let anon = self.program.alloc_function(Function {
            name,
            object: None,
            pos,
            span: Some(span),
            signature,
            pkg,
            params: Vec::new(),
            blocks: Vec::new(),
            anon_funcs: Vec::new(),
            parent: Some(parent),
            debug_info: false,
            synthetic: None,
        });
        self.function().anon_funcs.push(anon);
        anon
    }

    /// Closure value of an anonymous function
    pub fn make_closure(&mut self, func: FunctionId, pos: Pos) -> ValueId {
        let ty = self.program.function(func).signature;
        let result = self.temp(ty, pos);
        self.emit(Instr::MakeClosure { result, func });
        result
    }

    /// Records that expression `expr` of `file` evaluates to `x`.
    ///
    /// Parentheses around `expr` are stripped. Nothing is recorded unless
    /// the function was built with debug info. Callers must not record
    /// constant expressions.
    pub fn debug_ref(&mut self, file: &SourceFile, expr: ExprId, x: Value, is_addr: bool) {
        if !self.program.function(self.func).debug_info {
            return;
        }
        let expr = unparen(file, expr);
        let pos = file.exprs[expr].pos();
        if self.program.mode().contains(BuilderMode::LOG_SOURCE) {
            debug!(pos = %pos, is_addr, "debug reference");
        }
        self.emit(Instr::DebugRef(DebugRef {
            file: file.id,
            expr,
            pos,
            x,
            is_addr,
        }));
    }

    /// Ends the current block with a jump
    pub fn jump(&mut self, target: usize) {
        self.emit(Instr::Jump { target });
    }

    /// Ends the current block with a two-way branch on `cond`
    pub fn branch(&mut self, cond: Value, then_block: usize, else_block: usize) {
        self.emit(Instr::If {
            cond,
            then_block,
            else_block,
        });
    }

    /// Ends the current block with a return
    pub fn ret(&mut self, results: Vec<Value>) {
        self.emit(Instr::Return { results });
    }

    /// Completes the body.
    ///
    /// # Errors
    ///
    /// With [`BuilderMode::SANITY_CHECK_FUNCTIONS`], returns the first
    /// broken invariant of the function.
    pub fn finish(self) -> Result<FunctionId, SanityError> {
        let program = &*self.program;
        if program.mode().contains(BuilderMode::SANITY_CHECK_FUNCTIONS) {
            program.sanity_check(self.func)?;
        }
        if program.mode().contains(BuilderMode::PRINT_FUNCTIONS) {
            debug!("\n{}", program.display_function(self.func));
        } else {
            let function = program.function(self.func);
            trace!(
                function = %function.name,
                blocks = function.blocks.len(),
                debug_info = function.debug_info,
                "built function"
            );
        }
        Ok(self.func)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rv_ast::AstBuilder;
    use rv_intern::Interner;
    use rv_span::FileId;
    use rv_types::{BasicKind, SemanticModel};

    fn setup(mode: BuilderMode) -> (Program, FunctionId, SourceFile, ExprId) {
        let interner = Interner::new();
        let mut ast = AstBuilder::new(interner.clone(), FileId(0), 1, "p");
        let lparen = ast.token("(");
        let ident = ast.ident("x");
        let paren = ast.paren(lparen, ident);
        let file = ast.finish();

        let mut model = SemanticModel::new(interner);
        let pkg = model.new_package("p", "p");
        let mut program = Program::new(model, mode);
        let init = program.create_package(pkg);
        (program, init, file, paren)
    }

    #[test]
    fn test_debug_refs_need_debug_info() {
        let (mut program, init, file, paren) = setup(BuilderMode::empty());
        let int = program.model().basic(BasicKind::Int);
        let mut builder = program.build_function(init);
        let addr = builder.alloc(int, Pos(1), "x", false);
        builder.debug_ref(&file, paren, Value::Node(addr), true);
        builder.ret(Vec::new());
        builder.finish().unwrap();
        assert_eq!(program.function(init).debug_refs().count(), 0);
    }

    #[test]
    fn test_debug_refs_are_unparenthesized() {
        let (mut program, init, file, paren) = setup(BuilderMode::GLOBAL_DEBUG);
        let int = program.model().basic(BasicKind::Int);
        let mut builder = program.build_function(init);
        let addr = builder.alloc(int, Pos(1), "x", false);
        let value = builder.load(Value::Node(addr), Pos(1));
        builder.debug_ref(&file, paren, Value::Node(value), false);
        builder.ret(Vec::new());
        builder.finish().unwrap();

        let function = program.function(init);
        assert!(function.debug_info);
        let refs: Vec<_> = function.debug_refs().collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].expr, unparen(&file, paren));
        assert_ne!(refs[0].expr, paren);
        assert_eq!(program.value_type(&refs[0].x), int);
        assert_eq!(program.value(value).name, "t1");
    }

    #[test]
    fn test_anon_funcs_are_named_after_parent() {
        let (mut program, init, _, _) = setup(BuilderMode::SANITY_CHECK_FUNCTIONS);
        let sig = program
            .model_mut()
            .new_signature(None, Vec::new(), Vec::new(), false);
        let mut builder = program.build_function(init);
        let first = builder.anon_func(Pos(10), Span::new(Pos(10), Pos(20)), sig);
        let second = builder.anon_func(Pos(30), Span::new(Pos(30), Pos(40)), sig);
        builder.make_closure(first, Pos(10));
        builder.ret(Vec::new());
        builder.finish().unwrap();

        assert_eq!(program.function(first).name, "init$1");
        assert_eq!(program.function(second).name, "init$2");
        assert_eq!(program.function(second).parent, Some(init));
        assert_eq!(program.function(init).anon_funcs, vec![first, second]);
    }
}
