//! Programs and packages

use crate::function::{Function, FunctionId};
use crate::mode::BuilderMode;
use crate::value::{Const, Value, ValueData, ValueId, ValueKind};
use crate::wrapper::{Wrapper, WrapperKey};
use dashmap::DashMap;
use indexmap::IndexMap;
use la_arena::Arena;
use rustc_hash::FxHashMap;
use rv_intern::Symbol;
use rv_span::{Pos, Span};
use rv_types::{MethodSetCache, ObjId, ObjectKind, PkgId, SemanticModel, TypeId};
use std::sync::Arc;
use tracing::{debug, trace};

/// A whole program: the semantic model plus the IR of every created package
#[derive(Debug)]
pub struct Program {
    model: SemanticModel,
    mode: BuilderMode,
    packages: FxHashMap<PkgId, Package>,
    builtins: FxHashMap<ObjId, ValueId>,
    values: Arena<ValueData>,
    functions: Arena<Function>,
    method_sets: MethodSetCache,
    pub(crate) wrappers: DashMap<WrapperKey, Arc<Wrapper>>,
}

/// IR of one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pkg: PkgId,
    members: IndexMap<Symbol, Member>,
    values: FxHashMap<ObjId, ValueId>,
    init: FunctionId,
    debug: bool,
    built: bool,
}

/// A package-level declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Member {
    /// Declared function, or the package initializer for `init`
    Function(FunctionId),
    /// Address of a package-level variable
    Global(ValueId),
    /// Named constant
    Const(ValueId),
    /// Named type; its methods live in the package value table
    Type(ObjId),
}

impl Package {
    /// The semantic package this IR belongs to
    pub fn id(&self) -> PkgId {
        self.pkg
    }

    /// Package members in declaration order
    pub fn members(&self) -> impl Iterator<Item = (Symbol, Member)> + '_ {
        self.members.iter().map(|(name, member)| (*name, *member))
    }

    /// Member declared under `name`
    pub fn member(&self, name: Symbol) -> Option<Member> {
        self.members.get(&name).copied()
    }

    /// IR value of a package-level object or declared method
    pub fn value(&self, obj: ObjId) -> Option<ValueId> {
        self.values.get(&obj).copied()
    }

    /// The synthesized package initializer
    pub fn init(&self) -> FunctionId {
        self.init
    }

    /// Whether bodies built from now on record debug references
    pub fn debug_mode(&self) -> bool {
        self.debug
    }

    /// Turns debug references on or off for bodies built after this call
    pub fn set_debug_mode(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Whether every function body of the package has been built
    pub fn is_built(&self) -> bool {
        self.built
    }
}

impl Program {
    /// Creates an empty program over a semantic model
    pub fn new(model: SemanticModel, mode: BuilderMode) -> Self {
        Self {
            model,
            mode,
            packages: FxHashMap::default(),
            builtins: FxHashMap::default(),
            values: Arena::new(),
            functions: Arena::new(),
            method_sets: MethodSetCache::new(),
            wrappers: DashMap::new(),
        }
    }

    /// The semantic model the IR was built from
    pub fn model(&self) -> &SemanticModel {
        &self.model
    }

    /// Mutable access for declaring objects while the program is built
    pub fn model_mut(&mut self) -> &mut SemanticModel {
        &mut self.model
    }

    /// Builder flags the program was created with
    pub fn mode(&self) -> BuilderMode {
        self.mode
    }

    /// Shared method set cache
    pub fn method_sets(&self) -> &MethodSetCache {
        &self.method_sets
    }

    /// IR package of a semantic package, if it has been created
    pub fn package(&self, pkg: PkgId) -> Option<&Package> {
        self.packages.get(&pkg)
    }

    /// Mutable IR package, if it has been created
    pub fn package_mut(&mut self, pkg: PkgId) -> Option<&mut Package> {
        self.packages.get_mut(&pkg)
    }

    /// Created packages, in no particular order
    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }

    /// Function data
    ///
    /// # Panics
    ///
    /// If `func` was allocated by another program.
    pub fn function(&self, func: FunctionId) -> &Function {
        &self.functions[func]
    }

    pub(crate) fn function_mut(&mut self, func: FunctionId) -> &mut Function {
        &mut self.functions[func]
    }

    /// All functions, including literals and the package initializers
    pub fn functions(&self) -> impl Iterator<Item = (FunctionId, &Function)> {
        self.functions.iter()
    }

    /// Value data
    pub fn value(&self, value: ValueId) -> &ValueData {
        &self.values[value]
    }

    pub(crate) fn alloc_value(&mut self, kind: ValueKind, ty: TypeId, pos: Pos, name: String) -> ValueId {
        self.values.alloc(ValueData {
            kind,
            ty,
            pos,
            name,
        })
    }

    pub(crate) fn alloc_function(&mut self, function: Function) -> FunctionId {
        trace!(function = %function.name, pos = %function.pos, "created function");
        self.functions.alloc(function)
    }

    /// Static type of a value
    pub fn value_type(&self, value: &Value) -> TypeId {
        match value {
            Value::Node(id) => self.values[*id].ty,
            Value::Const(constant) => constant.ty,
            Value::Wrapper(wrapper) => wrapper.ty,
        }
    }

    /// Registers a value for every predeclared built-in function
    pub fn add_builtins(&mut self) {
        let builtins = self.model.universe().builtins.clone();
        for object in builtins {
            if self.builtins.contains_key(&object) {
                continue;
            }
            let data = self.model.object(object);
            let (ty, name) = (data.ty, self.model.object_name(object).to_string());
            let value = self.alloc_value(ValueKind::Builtin { object }, ty, Pos::NONE, name);
            self.builtins.insert(object, value);
        }
    }

    /// Value of a predeclared built-in function
    pub fn builtin(&self, obj: ObjId) -> Option<ValueId> {
        self.builtins.get(&obj).copied()
    }

    /// Creates the IR package for `pkg` together with its initializer.
    ///
    /// Creating a package twice returns the existing initializer.
    pub fn create_package(&mut self, pkg: PkgId) -> FunctionId {
        if let Some(existing) = self.packages.get(&pkg) {
            return existing.init;
        }
        let signature = self.model.new_signature(None, Vec::new(), Vec::new(), false);
        let init = self.alloc_function(Function {
            name: "init".to_string(),
            object: None,
            pos: Pos::NONE,
            span: None,
            signature,
            pkg,
            params: Vec::new(),
            blocks: Vec::new(),
            anon_funcs: Vec::new(),
            parent: None,
            debug_info: false,
            synthetic: Some("package initializer"),
        });
        let global_debug = self.mode.contains(BuilderMode::GLOBAL_DEBUG);
        let mut members = IndexMap::new();
        members.insert(self.model.interner().intern("init"), Member::Function(init));
        self.packages.insert(
            pkg,
            Package {
                pkg,
                members,
                values: FxHashMap::default(),
                init,
                debug: global_debug,
                built: false,
            },
        );
        debug!(package = %self.model.package(pkg).path, debug = global_debug, "created package");
        init
    }

    /// Declares a function or method.
    ///
    /// An explicit `init` function is merged into the package initializer,
    /// which is returned in its place. Returns `None` if the package has not
    /// been created or `obj` is not a function.
    pub fn declare_function(&mut self, pkg: PkgId, obj: ObjId, span: Span) -> Option<FunctionId> {
        let package = self.packages.get(&pkg)?;
        let object = self.model.object(obj);
        if !object.is_func() {
            return None;
        }
        let recv = self.model.recv_type(obj);
        let plain_name = self.model.object_name(obj).to_string();
        if recv.is_none() && plain_name == "init" {
            return Some(package.init);
        }
        let name = match recv {
            Some(recv) => format!("({}).{plain_name}", self.model.display_type(recv)),
            None => plain_name,
        };
        let (pos, signature) = (object.pos, object.ty);
        let func = self.alloc_function(Function {
            name: name.clone(),
            object: Some(obj),
            pos,
            span: Some(span),
            signature,
            pkg,
            params: Vec::new(),
            blocks: Vec::new(),
            anon_funcs: Vec::new(),
            parent: None,
            debug_info: false,
            synthetic: None,
        });
        let value = self.alloc_value(ValueKind::Function(func), signature, pos, name);
        let member_name = self.model.object(obj).name;
        let package = self.packages.get_mut(&pkg)?;
        package.values.insert(obj, value);
        if recv.is_none() {
            package.members.insert(member_name, Member::Function(func));
        }
        Some(func)
    }

    /// Declares a package-level variable; its value is the variable's address
    pub fn declare_global(&mut self, pkg: PkgId, obj: ObjId) -> Option<ValueId> {
        if !self.packages.contains_key(&pkg) || !self.model.object(obj).is_var() {
            return None;
        }
        let (name, pos, ty) = {
            let object = self.model.object(obj);
            (object.name, object.pos, object.ty)
        };
        let ty = self.model.pointer_to(ty);
        let text = self.model.name(name).to_string();
        let value = self.alloc_value(ValueKind::Global { object: obj, pkg }, ty, pos, text);
        let package = self.packages.get_mut(&pkg)?;
        package.values.insert(obj, value);
        package.members.insert(name, Member::Global(value));
        Some(value)
    }

    /// Declares a package-level named constant
    pub fn declare_const(&mut self, pkg: PkgId, obj: ObjId) -> Option<ValueId> {
        if !self.packages.contains_key(&pkg) {
            return None;
        }
        let object = self.model.object(obj);
        let constant = Const::new(object.const_value()?.clone(), object.ty);
        let (name, pos, ty) = (object.name, object.pos, object.ty);
        let text = self.model.name(name).to_string();
        let value = self.alloc_value(ValueKind::Const(constant), ty, pos, text);
        let package = self.packages.get_mut(&pkg)?;
        package.values.insert(obj, value);
        package.members.insert(name, Member::Const(value));
        Some(value)
    }

    /// Declares a named type; its methods are declared with
    /// [`declare_function`](Self::declare_function)
    pub fn declare_type(&mut self, pkg: PkgId, obj: ObjId) -> bool {
        let object = self.model.object(obj);
        if !matches!(object.kind, ObjectKind::TypeName) {
            return false;
        }
        let name = object.name;
        let Some(package) = self.packages.get_mut(&pkg) else {
            return false;
        };
        package.members.insert(name, Member::Type(obj));
        true
    }

    /// Records that every function of the package has been built
    pub fn mark_built(&mut self, pkg: PkgId) {
        let Some(package) = self.packages.get_mut(&pkg) else {
            return;
        };
        package.built = true;
        if self.mode.contains(BuilderMode::PRINT_PACKAGES) {
            let package = &self.packages[&pkg];
            let members: Vec<&str> = package
                .members
                .keys()
                .map(|name| self.model.name(*name))
                .collect();
            debug!(
                package = %self.model.package(pkg).path,
                members = ?members,
                "built package"
            );
        }
    }

    /// IR value of a package-level object or declared method of a created
    /// package
    pub fn package_level_value(&self, obj: ObjId) -> Option<Value> {
        let pkg = self.model.object(obj).pkg?;
        self.packages.get(&pkg)?.value(obj).map(Value::Node)
    }

    /// Function behind a value, if it is a declared function
    pub fn value_function(&self, value: ValueId) -> Option<FunctionId> {
        match self.values[value].kind {
            ValueKind::Function(func) => Some(func),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rv_intern::Interner;
    use rv_types::{BasicKind, ConstValue, VarKind};

    fn program(mode: BuilderMode) -> (Program, PkgId) {
        let mut model = SemanticModel::new(Interner::new());
        let pkg = model.new_package("example.com/p", "p");
        (Program::new(model, mode), pkg)
    }

    #[test]
    fn test_create_package_is_idempotent() {
        let (mut program, pkg) = program(BuilderMode::GLOBAL_DEBUG);
        let init = program.create_package(pkg);
        assert_eq!(program.create_package(pkg), init);
        let package = program.package(pkg).unwrap();
        assert!(package.debug_mode());
        assert!(!package.is_built());
        assert_eq!(program.function(init).synthetic, Some("package initializer"));
    }

    #[test]
    fn test_declarations_fill_value_table() {
        let (mut program, pkg) = program(BuilderMode::empty());
        let model = program.model_mut();
        let int = model.basic(BasicKind::Int);
        let var = model.new_var(pkg, "v", Pos(10), int, VarKind::Plain);
        let constant = model.new_const(pkg, "c", Pos(20), int, ConstValue::Int(7));
        let sig = model.new_signature(None, Vec::new(), Vec::new(), false);
        let func = model.new_func(pkg, "f", Pos(30), sig);
        for obj in [var, constant, func] {
            model.declare(pkg, obj);
        }

        assert_eq!(program.declare_global(pkg, var), None);
        program.create_package(pkg);
        let global = program.declare_global(pkg, var).unwrap();
        let cvalue = program.declare_const(pkg, constant).unwrap();
        let function = program
            .declare_function(pkg, func, Span::new(Pos(25), Pos(40)))
            .unwrap();

        assert_eq!(program.package_level_value(var), Some(Value::Node(global)));
        assert_eq!(program.package_level_value(constant), Some(Value::Node(cvalue)));
        let fvalue = program.package_level_value(func).unwrap();
        assert_eq!(program.value_function(fvalue.as_node().unwrap()), Some(function));
        let ptr = program.model().lookup_pointer(int).unwrap();
        assert_eq!(program.value_type(&Value::Node(global)), ptr);
        assert_eq!(program.function(function).pos, Pos(30));
    }

    #[test]
    fn test_explicit_init_merges_into_initializer() {
        let (mut program, pkg) = program(BuilderMode::empty());
        let model = program.model_mut();
        let sig = model.new_signature(None, Vec::new(), Vec::new(), false);
        let init_obj = model.new_func(pkg, "init", Pos(5), sig);
        let init = program.create_package(pkg);
        assert_eq!(
            program.declare_function(pkg, init_obj, Span::new(Pos(4), Pos(9))),
            Some(init)
        );
    }

    #[test]
    fn test_builtins() {
        let (mut program, _) = program(BuilderMode::empty());
        program.add_builtins();
        let len = program.model().universe().builtins[5];
        let value = program.builtin(len).unwrap();
        assert_eq!(program.value(value).name, "len");
    }
}
