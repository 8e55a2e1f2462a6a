//! Per-file facts recorded by type checking

use crate::constant::ConstValue;
use crate::object::ObjId;
use crate::types::TypeId;
use rustc_hash::FxHashMap;
use rv_ast::ExprId;
use rv_span::FileId;

/// Resolved type of an expression plus its value if it is constant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAndValue {
    /// Type of the expression
    pub ty: TypeId,
    /// Value, for constant expressions
    pub value: Option<ConstValue>,
}

/// How a selector expression `x.f` was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    /// `x.f` is a struct field
    FieldVal,
    /// `x.f` is a method bound to `x`
    MethodVal,
    /// `T.f` is a method expression
    MethodExpr,
}

/// A resolved selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// What was selected
    pub kind: SelectionKind,
    /// Type of `x`
    pub recv: TypeId,
    /// The selected field or method
    pub obj: ObjId,
    /// Path of embedded field indices leading to `obj`
    pub index: Vec<usize>,
    /// Whether a pointer indirection was needed along the path
    pub indirect: bool,
}

/// Type-checker output for one source file.
///
/// Expression IDs are only meaningful together with the file they were
/// allocated in, hence one `Info` per file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Info {
    /// The file the expression IDs belong to
    pub file: FileId,
    /// Types of typed expressions
    pub types: FxHashMap<ExprId, TypeAndValue>,
    /// Identifier to the object it declares
    pub defs: FxHashMap<ExprId, ObjId>,
    /// Identifier to the object it refers to
    pub uses: FxHashMap<ExprId, ObjId>,
    /// Selector expressions to what they select
    pub selections: FxHashMap<ExprId, Selection>,
}

impl Info {
    /// Empty facts for `file`
    pub fn new(file: FileId) -> Self {
        Self {
            file,
            types: FxHashMap::default(),
            defs: FxHashMap::default(),
            uses: FxHashMap::default(),
            selections: FxHashMap::default(),
        }
    }

    /// Records the type of a non-constant expression
    pub fn record_type(&mut self, expr: ExprId, ty: TypeId) {
        self.types.insert(expr, TypeAndValue { ty, value: None });
    }

    /// Records a constant expression with its value
    pub fn record_constant(&mut self, expr: ExprId, ty: TypeId, value: ConstValue) {
        self.types.insert(
            expr,
            TypeAndValue {
                ty,
                value: Some(value),
            },
        );
    }

    /// Records the object an identifier declares
    pub fn record_def(&mut self, ident: ExprId, obj: ObjId) {
        self.defs.insert(ident, obj);
    }

    /// Records the object an identifier refers to
    pub fn record_use(&mut self, ident: ExprId, obj: ObjId) {
        self.uses.insert(ident, obj);
    }

    /// Records how a selector expression was resolved
    pub fn record_selection(&mut self, expr: ExprId, selection: Selection) {
        self.selections.insert(expr, selection);
    }

    /// Type of an expression, if it was checked
    pub fn type_of(&self, expr: ExprId) -> Option<TypeId> {
        self.types.get(&expr).map(|tv| tv.ty)
    }

    /// Constant value of an expression
    pub fn value_of(&self, expr: ExprId) -> Option<&ConstValue> {
        self.types.get(&expr)?.value.as_ref()
    }

    /// Whether the expression is a compile-time constant
    pub fn is_constant(&self, expr: ExprId) -> bool {
        self.value_of(expr).is_some()
    }

    /// Object defined or used by an identifier
    pub fn object_of(&self, ident: ExprId) -> Option<ObjId> {
        self.defs
            .get(&ident)
            .or_else(|| self.uses.get(&ident))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SemanticModel;
    use crate::object::VarKind;
    use crate::types::BasicKind;
    use rv_ast::AstBuilder;
    use rv_intern::Interner;
    use rv_span::Pos;

    #[test]
    fn test_constant_and_object_facts() {
        let interner = Interner::new();
        let mut builder = AstBuilder::new(interner.clone(), FileId(0), 1, "p");
        let x = builder.ident("x");
        let one = builder.int(1);
        let mut model = SemanticModel::new(interner);
        let pkg = model.new_package("p", "p");
        let int = model.basic(BasicKind::Int);
        let obj = model.new_var(pkg, "x", Pos(9), int, VarKind::Plain);

        let mut info = Info::new(FileId(0));
        info.record_def(x, obj);
        info.record_type(x, int);
        info.record_constant(one, model.basic(BasicKind::UntypedInt), ConstValue::Int(1));

        assert_eq!(info.object_of(x), Some(obj));
        assert_eq!(info.object_of(one), None);
        assert!(!info.is_constant(x));
        assert!(info.is_constant(one));
        assert_eq!(info.value_of(one), Some(&ConstValue::Int(1)));
        assert_eq!(info.type_of(x), Some(int));
    }
}
