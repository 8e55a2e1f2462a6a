//! Structural checks of built functions

use crate::error::SanityError;
use crate::function::{FunctionId, Instr};
use crate::program::Program;
use crate::value::ValueKind;
use rustc_hash::FxHashSet;

impl Program {
    /// Checks the invariants of one function.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn sanity_check(&self, func: FunctionId) -> Result<(), SanityError> {
        let function = self.function(func);

        let mut positions = FxHashSet::default();
        for &anon in &function.anon_funcs {
            let child = self.function(anon);
            if child.parent != Some(func) {
                return Err(SanityError::ForeignAnonFunc { func, anon });
            }
            if !positions.insert(child.pos) {
                return Err(SanityError::DuplicateAnonFunc {
                    func,
                    pos: child.pos,
                });
            }
        }

        for (index, block) in function.blocks.iter().enumerate() {
            if block.index != index {
                return Err(SanityError::BlockIndex {
                    func,
                    block: block.index,
                    index,
                });
            }
            for instr in &block.instrs {
                if matches!(instr, Instr::DebugRef(_)) && !function.debug_info {
                    return Err(SanityError::UnexpectedDebugRef { func });
                }
                if let Some(result) = instr.result() {
                    if self.value(result).kind != (ValueKind::Instr { parent: func }) {
                        return Err(SanityError::ForeignValue { func, block: index });
                    }
                }
                if let Some(&target) = instr
                    .successors()
                    .iter()
                    .find(|&&target| target >= function.blocks.len())
                {
                    return Err(SanityError::MissingBlock {
                        func,
                        block: index,
                        target,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::BuilderMode;
    use rv_intern::Interner;
    use rv_span::{Pos, Span};
    use rv_types::SemanticModel;

    fn program() -> (Program, FunctionId) {
        let mut model = SemanticModel::new(Interner::new());
        let pkg = model.new_package("p", "p");
        let mut program = Program::new(model, BuilderMode::SANITY_CHECK_FUNCTIONS);
        let init = program.create_package(pkg);
        (program, init)
    }

    #[test]
    fn test_duplicate_anon_positions() {
        let (mut program, init) = program();
        let sig = program
            .model_mut()
            .new_signature(None, Vec::new(), Vec::new(), false);
        let mut builder = program.build_function(init);
        builder.anon_func(Pos(10), Span::new(Pos(10), Pos(12)), sig);
        builder.anon_func(Pos(10), Span::new(Pos(10), Pos(12)), sig);
        assert_eq!(
            builder.finish(),
            Err(SanityError::DuplicateAnonFunc {
                func: init,
                pos: Pos(10)
            })
        );
    }

    #[test]
    fn test_missing_jump_target() {
        let (mut program, init) = program();
        let mut builder = program.build_function(init);
        builder.new_block();
        builder.jump(3);
        assert_eq!(
            builder.finish(),
            Err(SanityError::MissingBlock {
                func: init,
                block: 0,
                target: 3
            })
        );
    }

    #[test]
    fn test_well_formed_function() {
        let (mut program, init) = program();
        let mut builder = program.build_function(init);
        let entry = builder.new_block();
        let exit = builder.new_block();
        builder.set_current_block(entry);
        builder.jump(exit);
        builder.set_current_block(exit);
        builder.ret(Vec::new());
        assert_eq!(builder.finish(), Ok(init));
        assert_eq!(program.sanity_check(init), Ok(()));
    }
}
