//! Textual form of IR functions

use crate::function::{FunctionId, Instr};
use crate::program::Program;
use crate::value::{Value, ValueId};
use rv_types::TypeKind;
use std::fmt;

impl Program {
    /// Renders a function for logs and snapshot tests
    pub fn display_function(&self, func: FunctionId) -> FunctionDisplay<'_> {
        FunctionDisplay {
            program: self,
            func,
        }
    }

    fn display_value(&self, value: &Value) -> String {
        match value {
            Value::Node(id) => self.value(*id).name.clone(),
            Value::Const(constant) => {
                format!("{}:{}", constant.value, self.model().display_type(constant.ty))
            }
            Value::Wrapper(wrapper) => wrapper.name.clone(),
        }
    }

    fn display_values(&self, values: &[Value]) -> String {
        values
            .iter()
            .map(|value| self.display_value(value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// [`fmt::Display`] adapter for functions
pub struct FunctionDisplay<'a> {
    program: &'a Program,
    func: FunctionId,
}

impl FunctionDisplay<'_> {
    fn write_instr(&self, formatter: &mut fmt::Formatter<'_>, instr: &Instr) -> fmt::Result {
        let program = self.program;
        let model = program.model();
        let name = |id: ValueId| program.value(id).name.as_str();
        let value = |value: &Value| program.display_value(value);
        match instr {
            Instr::Alloc {
                result,
                heap,
                comment,
            } => {
                let (elem, _) = model.deref(program.value(*result).ty);
                let verb = if *heap { "new" } else { "local" };
                write!(
                    formatter,
                    "{} = {verb} {} ({comment})",
                    name(*result),
                    model.display_type(elem)
                )
            }
            Instr::BinOp { result, op, x, y } => write!(
                formatter,
                "{} = {} {} {}",
                name(*result),
                value(x),
                op.as_str(),
                value(y)
            ),
            Instr::UnOp { result, op, x } => {
                write!(formatter, "{} = {}{}", name(*result), op.as_str(), value(x))
            }
            Instr::Load { result, addr } => {
                write!(formatter, "{} = *{}", name(*result), value(addr))
            }
            Instr::Store { addr, value: stored } => {
                write!(formatter, "*{} = {}", value(addr), value(stored))
            }
            Instr::Call { result, func, args } => {
                if let Some(result) = result {
                    write!(formatter, "{} = ", name(*result))?;
                }
                write!(
                    formatter,
                    "{}({})",
                    value(func),
                    program.display_values(args)
                )
            }
            Instr::MakeClosure { result, func } => write!(
                formatter,
                "{} = make closure {}",
                name(*result),
                program.function(*func).name
            ),
            Instr::FieldAddr {
                result,
                base,
                field,
            } => write!(formatter, "{} = &{}.#{field}", name(*result), value(base)),
            Instr::IndexAddr {
                result,
                base,
                index,
            } => write!(
                formatter,
                "{} = &{}[{}]",
                name(*result),
                value(base),
                value(index)
            ),
            Instr::DebugRef(debug_ref) => write!(
                formatter,
                "; {}expr {} = {}",
                if debug_ref.is_addr { "&" } else { "" },
                debug_ref.pos,
                value(&debug_ref.x)
            ),
            Instr::Jump { target } => write!(formatter, "jump {target}"),
            Instr::If {
                cond,
                then_block,
                else_block,
            } => write!(
                formatter,
                "if {} goto {then_block} else {else_block}",
                value(cond)
            ),
            Instr::Return { results } if results.is_empty() => write!(formatter, "return"),
            Instr::Return { results } => {
                write!(formatter, "return {}", program.display_values(results))
            }
        }
    }
}

impl fmt::Display for FunctionDisplay<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let program = self.program;
        let model = program.model();
        let function = program.function(self.func);

        writeln!(formatter, "# Name: {}", function.name)?;
        writeln!(formatter, "# Package: {}", model.package(function.pkg).path)?;
        if let Some(synthetic) = function.synthetic {
            writeln!(formatter, "# Synthetic: {synthetic}")?;
        }
        if function.pos.is_valid() {
            writeln!(formatter, "# Location: {}", function.pos)?;
        }
        if let Some(parent) = function.parent {
            writeln!(formatter, "# Parent: {}", program.function(parent).name)?;
        }
        if !function.anon_funcs.is_empty() {
            let names: Vec<&str> = function
                .anon_funcs
                .iter()
                .map(|&anon| program.function(anon).name.as_str())
                .collect();
            writeln!(formatter, "# Anonymous functions: {}", names.join(" "))?;
        }
        let params: Vec<String> = function
            .params
            .iter()
            .map(|&param| {
                let data = program.value(param);
                format!("{} {}", data.name, model.display_type(data.ty))
            })
            .collect();
        let results = match &model.ty(function.signature).kind {
            TypeKind::Signature(sig) => match sig.results.as_slice() {
                [] => String::new(),
                [single] if model.object_name(*single).is_empty() => {
                    format!(" {}", model.display_type(model.object(*single).ty))
                }
                results => {
                    let vars: Vec<String> = results
                        .iter()
                        .map(|&var| {
                            format!(
                                "{} {}",
                                model.object_name(var),
                                model.display_type(model.object(var).ty)
                            )
                        })
                        .collect();
                    format!(" ({})", vars.join(", "))
                }
            },
            _ => String::new(),
        };
        writeln!(formatter, "func {}({}){results}:", function.name, params.join(", "))?;
        for block in &function.blocks {
            writeln!(formatter, "{}:", block.index)?;
            for instr in &block.instrs {
                write!(formatter, "  ")?;
                self.write_instr(formatter, instr)?;
                writeln!(formatter)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::BuilderMode;
    use crate::value::Const;
    use expect_test::expect;
    use rv_ast::BinaryOp;
    use rv_intern::Interner;
    use rv_span::{Pos, Span};
    use rv_types::{BasicKind, ConstValue, SemanticModel, VarKind};

    #[test]
    fn test_display_function() {
        let mut model = SemanticModel::new(Interner::new());
        let pkg = model.new_package("example.com/p", "p");
        let int = model.basic(BasicKind::Int);
        let param = model.new_var(pkg, "n", Pos(12), int, VarKind::Param);
        let result = model.new_var(pkg, "", Pos(16), int, VarKind::Result);
        let sig = model.new_signature(None, vec![param], vec![result], false);
        let func = model.new_func(pkg, "inc", Pos(8), sig);
        model.declare(pkg, func);

        let mut program = Program::new(model, BuilderMode::empty());
        program.create_package(pkg);
        let id = program
            .declare_function(pkg, func, Span::new(Pos(3), Pos(40)))
            .unwrap();
        let closure_sig = program.model().object(func).ty;
        let mut builder = program.build_function(id);
        let n = builder.add_param(Some(param), "n", int, Pos(12));
        let local = builder.alloc(int, Pos(20), "m", false);
        builder.store(Value::Node(local), Value::Node(n));
        let loaded = builder.load(Value::Node(local), Pos(24));
        let sum = builder.bin_op(
            BinaryOp::Add,
            Value::Node(loaded),
            Value::Const(Const::new(ConstValue::Int(1), int)),
            int,
            Pos(26),
        );
        let anon = builder.anon_func(Pos(30), Span::new(Pos(30), Pos(35)), closure_sig);
        builder.make_closure(anon, Pos(30));
        builder.ret(vec![Value::Node(sum)]);
        builder.finish().unwrap();

        expect![[r#"
            # Name: inc
            # Package: example.com/p
            # Location: @8
            # Anonymous functions: inc$1
            func inc(n int) int:
            0:
              t0 = local int (m)
              *t0 = n
              t1 = *t0
              t2 = t1 + 1:int
              t3 = make closure inc$1
              return t2
        "#]]
        .assert_eq(&program.display_function(id).to_string());
    }
}
