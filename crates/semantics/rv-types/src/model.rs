//! The semantic model: objects, types and packages of a program

use crate::constant::ConstValue;
use crate::object::{BuiltinKind, ObjId, ObjLevel, Object, ObjectKind, VarKind};
use crate::package::{PackageData, PkgId};
use crate::types::{BasicKind, Signature, Type, TypeId, TypeKind, TypeStore};
use crate::universe::Universe;
use indexmap::IndexMap;
use la_arena::Arena;
use rustc_hash::FxHashMap;
use rv_intern::{Interner, Symbol};
use rv_span::Pos;
use std::fmt;

/// Resolved declarations and types of every package in a program
#[derive(Debug, Clone)]
pub struct SemanticModel {
    interner: Interner,
    objects: Arena<Object>,
    types: TypeStore,
    packages: Arena<PackageData>,
    universe: Universe,
}

impl SemanticModel {
    /// Creates a model holding only the universe scope
    pub fn new(interner: Interner) -> Self {
        let mut objects = Arena::new();
        let mut types = TypeStore::new();
        let mut scope = FxHashMap::default();

        let mut predeclare = |objects: &mut Arena<Object>,
                              name: &str,
                              ty: TypeId,
                              kind: ObjectKind| {
            let sym = interner.intern(name);
            let id = objects.alloc(Object {
                name: sym,
                pos: Pos::NONE,
                pkg: None,
                ty,
                kind,
                level: ObjLevel::Universe,
            });
            scope.insert(sym, id);
            id
        };

        for kind in BasicKind::ALL.into_iter().filter(|kind| kind.is_predeclared_name()) {
            predeclare(&mut objects, kind.name(), types.basic(kind), ObjectKind::TypeName);
        }
        let untyped_bool = types.basic(BasicKind::UntypedBool);
        let true_const = predeclare(
            &mut objects,
            "true",
            untyped_bool,
            ObjectKind::Const(ConstValue::Bool(true)),
        );
        let false_const = predeclare(
            &mut objects,
            "false",
            untyped_bool,
            ObjectKind::Const(ConstValue::Bool(false)),
        );
        let nil = predeclare(
            &mut objects,
            "nil",
            types.basic(BasicKind::UntypedNil),
            ObjectKind::Const(ConstValue::Nil),
        );
        let invalid = types.basic(BasicKind::Invalid);
        let builtins = BuiltinKind::ALL
            .into_iter()
            .map(|kind| predeclare(&mut objects, kind.name(), invalid, ObjectKind::Builtin(kind)))
            .collect();

        // type error interface { Error() string }
        let error_name = predeclare(&mut objects, "error", invalid, ObjectKind::TypeName);
        let error_type = types.alloc(TypeKind::Named {
            obj: error_name,
            underlying: None,
            methods: Vec::new(),
        });
        objects[error_name].ty = error_type;
        let error_recv = objects.alloc(Object {
            name: interner.intern(""),
            pos: Pos::NONE,
            pkg: None,
            ty: error_type,
            kind: ObjectKind::Var(VarKind::Receiver),
            level: ObjLevel::Local,
        });
        let error_result = objects.alloc(Object {
            name: interner.intern(""),
            pos: Pos::NONE,
            pkg: None,
            ty: types.basic(BasicKind::String),
            kind: ObjectKind::Var(VarKind::Result),
            level: ObjLevel::Local,
        });
        let error_sig = types.alloc(TypeKind::Signature(Signature {
            recv: Some(error_recv),
            params: Vec::new(),
            results: vec![error_result],
            variadic: false,
        }));
        let error_method = objects.alloc(Object {
            name: interner.intern("Error"),
            pos: Pos::NONE,
            pkg: None,
            ty: error_sig,
            kind: ObjectKind::Func,
            level: ObjLevel::Universe,
        });
        let error_iface = types.alloc(TypeKind::Interface {
            methods: vec![error_method],
            embedded: Vec::new(),
        });
        types.get_mut(error_type).kind = TypeKind::Named {
            obj: error_name,
            underlying: Some(error_iface),
            methods: Vec::new(),
        };

        Self {
            interner,
            objects,
            types,
            packages: Arena::new(),
            universe: Universe {
                scope,
                true_const,
                false_const,
                nil,
                error_type,
                error_method,
                builtins,
            },
        }
    }

    /// Interner shared with the syntax tree
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Predeclared objects and types
    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Get an object by ID
    pub fn object(&self, id: ObjId) -> &Object {
        &self.objects[id]
    }

    /// Get a type by ID
    pub fn ty(&self, id: TypeId) -> &Type {
        self.types.get(id)
    }

    /// Get a package by ID
    pub fn package(&self, id: PkgId) -> &PackageData {
        &self.packages[id]
    }

    /// All packages with their IDs
    pub fn packages(&self) -> impl Iterator<Item = (PkgId, &PackageData)> {
        self.packages.iter()
    }

    /// Resolves a symbol to its spelling
    pub fn name(&self, sym: Symbol) -> &str {
        self.interner.resolve(&sym)
    }

    /// Name of an object
    pub fn object_name(&self, id: ObjId) -> &str {
        self.name(self.objects[id].name)
    }

    /// The interned basic type
    pub fn basic(&self, kind: BasicKind) -> TypeId {
        self.types.basic(kind)
    }

    /// The interned `*elem`
    pub fn pointer_to(&mut self, elem: TypeId) -> TypeId {
        self.types.pointer_to(elem)
    }

    /// `*elem`, if some earlier pass created it
    pub fn lookup_pointer(&self, elem: TypeId) -> Option<TypeId> {
        self.types.lookup_pointer(elem)
    }

    /// `[]elem`
    pub fn slice_of(&mut self, elem: TypeId) -> TypeId {
        self.types.alloc(TypeKind::Slice(elem))
    }

    /// `[len]elem`
    pub fn array_of(&mut self, elem: TypeId, len: u64) -> TypeId {
        self.types.alloc(TypeKind::Array { elem, len })
    }

    /// `map[key]elem`
    pub fn map_of(&mut self, key: TypeId, elem: TypeId) -> TypeId {
        self.types.alloc(TypeKind::Map { key, elem })
    }

    /// Creates a package with an empty scope
    pub fn new_package(&mut self, path: &str, name: &str) -> PkgId {
        let name = self.interner.intern(name);
        self.packages.alloc(PackageData {
            path: path.to_string(),
            name,
            scope: IndexMap::new(),
            imports: Vec::new(),
            complete: false,
        })
    }

    /// Records that `pkg` imports `imported`
    pub fn add_import(&mut self, pkg: PkgId, imported: PkgId) {
        self.packages[pkg].imports.push(imported);
    }

    /// Marks a package as fully type-checked
    pub fn mark_complete(&mut self, pkg: PkgId) {
        self.packages[pkg].complete = true;
    }

    fn alloc_object(
        &mut self,
        pkg: Option<PkgId>,
        name: &str,
        pos: Pos,
        ty: TypeId,
        kind: ObjectKind,
    ) -> ObjId {
        let name = self.interner.intern(name);
        self.objects.alloc(Object {
            name,
            pos,
            pkg,
            ty,
            kind,
            level: ObjLevel::Local,
        })
    }

    /// New variable of the given kind; local until [`declare`](Self::declare)d
    pub fn new_var(&mut self, pkg: PkgId, name: &str, pos: Pos, ty: TypeId, kind: VarKind) -> ObjId {
        self.alloc_object(Some(pkg), name, pos, ty, ObjectKind::Var(kind))
    }

    /// New named constant
    pub fn new_const(
        &mut self,
        pkg: PkgId,
        name: &str,
        pos: Pos,
        ty: TypeId,
        value: ConstValue,
    ) -> ObjId {
        self.alloc_object(Some(pkg), name, pos, ty, ObjectKind::Const(value))
    }

    /// New function whose type is `sig`
    pub fn new_func(&mut self, pkg: PkgId, name: &str, pos: Pos, sig: TypeId) -> ObjId {
        self.alloc_object(Some(pkg), name, pos, sig, ObjectKind::Func)
    }

    /// New signature
    pub fn new_signature(
        &mut self,
        recv: Option<ObjId>,
        params: Vec<ObjId>,
        results: Vec<ObjId>,
        variadic: bool,
    ) -> TypeId {
        self.types.alloc(TypeKind::Signature(Signature {
            recv,
            params,
            results,
            variadic,
        }))
    }

    /// New method `recv_ty.name(params) results`.
    ///
    /// The receiver variable is unnamed; its type is `recv_ty`, which is
    /// a named type, a pointer to one, or an interface for interface methods.
    pub fn new_method(
        &mut self,
        pkg: PkgId,
        name: &str,
        pos: Pos,
        recv_ty: TypeId,
        params: Vec<ObjId>,
        results: Vec<ObjId>,
    ) -> ObjId {
        let recv = self.new_var(pkg, "", pos, recv_ty, VarKind::Receiver);
        let sig = self.new_signature(Some(recv), params, results, false);
        self.new_func(pkg, name, pos, sig)
    }

    /// New type name bound to a fresh named type without underlying type
    pub fn new_type_name(&mut self, pkg: PkgId, name: &str, pos: Pos) -> (ObjId, TypeId) {
        let invalid = self.basic(BasicKind::Invalid);
        let obj = self.alloc_object(Some(pkg), name, pos, invalid, ObjectKind::TypeName);
        let named = self.types.alloc(TypeKind::Named {
            obj,
            underlying: None,
            methods: Vec::new(),
        });
        self.objects[obj].ty = named;
        (obj, named)
    }

    /// Completes a named type's declaration
    pub fn set_underlying(&mut self, named: TypeId, ty: TypeId) {
        if let TypeKind::Named { underlying, .. } = &mut self.types.get_mut(named).kind {
            *underlying = Some(ty);
        }
    }

    /// Attaches a declared method to a named type
    pub fn add_method(&mut self, named: TypeId, method: ObjId) {
        if let TypeKind::Named { methods, .. } = &mut self.types.get_mut(named).kind {
            methods.push(method);
        }
    }

    /// New struct type with the given field variables
    pub fn new_struct(&mut self, fields: Vec<ObjId>) -> TypeId {
        self.types.alloc(TypeKind::Struct { fields })
    }

    /// New interface type
    pub fn new_interface(&mut self, methods: Vec<ObjId>, embedded: Vec<TypeId>) -> TypeId {
        self.types.alloc(TypeKind::Interface { methods, embedded })
    }

    /// Inserts `obj` into the scope of `pkg`, making it package-level.
    ///
    /// Returns the previously declared object of the same name, if any.
    pub fn declare(&mut self, pkg: PkgId, obj: ObjId) -> Option<ObjId> {
        let object = &mut self.objects[obj];
        object.level = ObjLevel::Package;
        self.packages[pkg].scope.insert(object.name, obj)
    }

    /// Looks up a package-scope name by spelling
    pub fn lookup(&self, pkg: PkgId, name: &str) -> Option<ObjId> {
        let sym = self.interner.get(name)?;
        self.packages[pkg].lookup(sym)
    }

    /// Underlying type of `ty`; named types without one are their own underlying
    pub fn underlying(&self, ty: TypeId) -> TypeId {
        match &self.types.get(ty).kind {
            TypeKind::Named {
                underlying: Some(underlying),
                ..
            } => *underlying,
            _ => ty,
        }
    }

    /// Strips one pointer: `(elem, true)` for `*elem`, `(ty, false)` otherwise
    pub fn deref(&self, ty: TypeId) -> (TypeId, bool) {
        match self.types.get(ty).kind {
            TypeKind::Pointer(elem) => (elem, true),
            _ => (ty, false),
        }
    }

    /// Whether the underlying type is an interface
    pub fn is_interface(&self, ty: TypeId) -> bool {
        matches!(
            self.types.get(self.underlying(ty)).kind,
            TypeKind::Interface { .. }
        )
    }

    /// Whether `ty` is a named type
    pub fn is_named(&self, ty: TypeId) -> bool {
        matches!(self.types.get(ty).kind, TypeKind::Named { .. })
    }

    /// Signature of a function object
    pub fn signature(&self, func: ObjId) -> Option<&Signature> {
        match &self.types.get(self.objects[func].ty).kind {
            TypeKind::Signature(sig) => Some(sig),
            _ => None,
        }
    }

    /// Receiver type of a method, `None` for plain functions
    pub fn recv_type(&self, func: ObjId) -> Option<TypeId> {
        let recv = self.signature(func)?.recv?;
        Some(self.objects[recv].ty)
    }

    /// Whether a method is declared on `*T` rather than `T`
    pub fn has_pointer_recv(&self, func: ObjId) -> bool {
        self.recv_type(func)
            .is_some_and(|recv| self.deref(recv).1)
    }

    /// All methods of an interface type, including embedded interfaces
    pub fn interface_methods(&self, ty: TypeId) -> Vec<ObjId> {
        let mut out = Vec::new();
        let mut stack = vec![ty];
        let mut visited = Vec::new();
        while let Some(current) = stack.pop() {
            let under = self.underlying(current);
            if visited.contains(&under) {
                continue;
            }
            visited.push(under);
            if let TypeKind::Interface { methods, embedded } = &self.types.get(under).kind {
                for &method in methods {
                    let name = self.objects[method].name;
                    if !out.iter().any(|&seen: &ObjId| self.objects[seen].name == name) {
                        out.push(method);
                    }
                }
                stack.extend(embedded.iter().rev().copied());
            }
        }
        out
    }

    /// Whether a name is visible outside its package
    pub fn is_exported(&self, name: Symbol) -> bool {
        self.name(name)
            .chars()
            .next()
            .is_some_and(char::is_uppercase)
    }

    /// Renders a type in source syntax
    pub fn display_type(&self, ty: TypeId) -> TypeDisplay<'_> {
        TypeDisplay { model: self, ty }
    }
}

/// [`fmt::Display`] adapter for types
pub struct TypeDisplay<'a> {
    model: &'a SemanticModel,
    ty: TypeId,
}

impl TypeDisplay<'_> {
    fn with(&self, ty: TypeId) -> Self {
        Self {
            model: self.model,
            ty,
        }
    }

    fn write_vars(&self, formatter: &mut fmt::Formatter<'_>, vars: &[ObjId]) -> fmt::Result {
        for (idx, &var) in vars.iter().enumerate() {
            if idx > 0 {
                write!(formatter, ", ")?;
            }
            let object = self.model.object(var);
            let name = self.model.name(object.name);
            if !name.is_empty() {
                write!(formatter, "{name} ")?;
            }
            write!(formatter, "{}", self.with(object.ty))?;
        }
        Ok(())
    }

    fn write_signature(&self, formatter: &mut fmt::Formatter<'_>, sig: &Signature) -> fmt::Result {
        write!(formatter, "(")?;
        self.write_vars(formatter, &sig.params)?;
        write!(formatter, ")")?;
        match sig.results.as_slice() {
            [] => Ok(()),
            [single] if self.model.object_name(*single).is_empty() => {
                write!(formatter, " {}", self.with(self.model.object(*single).ty))
            }
            results => {
                write!(formatter, " (")?;
                self.write_vars(formatter, results)?;
                write!(formatter, ")")
            }
        }
    }
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let model = self.model;
        match &model.ty(self.ty).kind {
            TypeKind::Basic(kind) => write!(formatter, "{}", kind.name()),
            TypeKind::Pointer(elem) => write!(formatter, "*{}", self.with(*elem)),
            TypeKind::Slice(elem) => write!(formatter, "[]{}", self.with(*elem)),
            TypeKind::Array { elem, len } => write!(formatter, "[{len}]{}", self.with(*elem)),
            TypeKind::Map { key, elem } => {
                write!(formatter, "map[{}]{}", self.with(*key), self.with(*elem))
            }
            TypeKind::Struct { fields } => {
                write!(formatter, "struct{{")?;
                for (idx, &field) in fields.iter().enumerate() {
                    if idx > 0 {
                        write!(formatter, "; ")?;
                    }
                    let object = model.object(field);
                    if !matches!(object.kind, ObjectKind::Var(VarKind::Field { embedded: true })) {
                        write!(formatter, "{} ", model.name(object.name))?;
                    }
                    write!(formatter, "{}", self.with(object.ty))?;
                }
                write!(formatter, "}}")
            }
            TypeKind::Interface { methods, embedded } => {
                write!(formatter, "interface{{")?;
                let mut first = true;
                for &method in methods {
                    if !first {
                        write!(formatter, "; ")?;
                    }
                    first = false;
                    write!(formatter, "{}", model.object_name(method))?;
                    if let Some(sig) = model.signature(method) {
                        self.write_signature(formatter, sig)?;
                    }
                }
                for &ty in embedded {
                    if !first {
                        write!(formatter, "; ")?;
                    }
                    first = false;
                    write!(formatter, "{}", self.with(ty))?;
                }
                write!(formatter, "}}")
            }
            TypeKind::Signature(sig) => {
                write!(formatter, "func")?;
                self.write_signature(formatter, sig)
            }
            TypeKind::Named { obj, .. } => {
                let object = model.object(*obj);
                if let Some(pkg) = object.pkg {
                    write!(formatter, "{}.", model.name(model.package(pkg).name))?;
                }
                write!(formatter, "{}", model.name(object.name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_universe() {
        let interner = Interner::new();
        let model = SemanticModel::new(interner.clone());
        let universe = model.universe();
        let true_obj = model.object(universe.true_const);
        assert!(true_obj.is_universal());
        assert_eq!(true_obj.pkg, None);
        assert_eq!(true_obj.const_value(), Some(&ConstValue::Bool(true)));
        assert_eq!(
            universe.lookup(interner.intern("len")),
            Some(universe.builtins[5])
        );
        assert_eq!(model.display_type(universe.error_type).to_string(), "error");
        assert!(model.is_interface(universe.error_type));
        assert_eq!(
            model.recv_type(universe.error_method),
            Some(universe.error_type)
        );
        assert_eq!(
            model
                .display_type(model.object(universe.error_method).ty)
                .to_string(),
            "func() string"
        );
    }

    #[test]
    fn test_declare_and_lookup() {
        let mut model = SemanticModel::new(Interner::new());
        let pkg = model.new_package("example.com/p", "p");
        let int = model.basic(BasicKind::Int);
        let var = model.new_var(pkg, "x", Pos(10), int, VarKind::Plain);
        assert!(!model.object(var).is_package_level());
        assert_eq!(model.declare(pkg, var), None);
        assert!(model.object(var).is_package_level());
        assert_eq!(model.lookup(pkg, "x"), Some(var));
        assert_eq!(model.lookup(pkg, "y"), None);
    }

    #[test]
    fn test_methods_and_display() {
        let mut model = SemanticModel::new(Interner::new());
        let pkg = model.new_package("p", "p");
        let (_, named) = model.new_type_name(pkg, "T", Pos(5));
        let int = model.basic(BasicKind::Int);
        let field = model.new_var(pkg, "n", Pos(7), int, VarKind::Field { embedded: false });
        let strukt = model.new_struct(vec![field]);
        model.set_underlying(named, strukt);
        let ptr = model.pointer_to(named);
        let method = model.new_method(pkg, "Inc", Pos(20), ptr, Vec::new(), Vec::new());
        model.add_method(named, method);

        assert!(model.has_pointer_recv(method));
        assert_eq!(model.recv_type(method), Some(ptr));
        assert_eq!(model.underlying(named), strukt);
        assert_eq!(model.display_type(ptr).to_string(), "*p.T");
        assert_eq!(model.display_type(strukt).to_string(), "struct{n int}");
        assert!(model.is_exported(model.object(method).name));
        assert!(!model.is_exported(model.object(field).name));
    }
}
