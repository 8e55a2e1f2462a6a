//! Method sets and their cache
//!
//! The method set of a type lists every method callable on a value of that
//! type, together with how the call reaches the declared method body:
//! directly, through a compiler-synthesized wrapper (pointer indirection or
//! embedded-field promotion), or by interface dispatch.

use crate::model::SemanticModel;
use crate::object::{ObjId, ObjectKind, VarKind};
use crate::package::PkgId;
use crate::types::{TypeId, TypeKind};
use dashmap::DashMap;
use rustc_hash::{FxHashMap, FxHashSet};
use rv_intern::Symbol;
use std::sync::Arc;
use tracing::debug;

/// Receiver type of a method set: `T` or `*T`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodSetKey {
    /// `T`
    pub ty: TypeId,
    /// Whether the set is for `*T`
    pub pointer: bool,
}

impl MethodSetKey {
    /// Key for the method set of `T`
    pub fn value(ty: TypeId) -> Self {
        Self { ty, pointer: false }
    }

    /// Key for the method set of `*T`
    pub fn pointer(ty: TypeId) -> Self {
        Self { ty, pointer: true }
    }

    /// Normalizes a receiver type; `*T` becomes `(T, pointer)` unless `T`
    /// is an interface, whose pointers have no methods.
    pub fn of(model: &SemanticModel, ty: TypeId) -> Self {
        match model.deref(ty) {
            (elem, true) if !model.is_interface(elem) => Self::pointer(elem),
            _ => Self::value(ty),
        }
    }
}

/// Kind of synthesized method wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapperKind {
    /// `(*T).m` calling the value-receiver method `T.m`
    Indirection,
    /// `S.m` calling `m` of an embedded field
    Promotion,
}

/// How a method set entry reaches its method
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MethodBinding {
    /// The receiver type declares the method itself
    Declared(ObjId),
    /// A wrapper adapts the receiver before calling `method`
    Wrapper {
        /// Indirection or promotion
        kind: WrapperKind,
        /// The method finally called
        method: ObjId,
        /// Embedded field indices from the receiver to the method's owner
        path: Vec<usize>,
        /// Whether a pointer is followed along the path
        indirect: bool,
    },
    /// Method of an interface type, called by dynamic dispatch
    Interface(ObjId),
}

impl MethodBinding {
    /// The method object this binding eventually calls.
    ///
    /// Always a declared (or interface) method, never another wrapper.
    pub fn func(&self) -> ObjId {
        match self {
            Self::Declared(func) | Self::Interface(func) => *func,
            Self::Wrapper { method, .. } => *method,
        }
    }

    /// Whether the receiver type declares the method
    pub fn is_declared(&self) -> bool {
        matches!(self, Self::Declared(_))
    }

    /// Whether a wrapper is needed
    pub fn is_wrapper(&self) -> bool {
        matches!(self, Self::Wrapper { .. })
    }
}

/// One method of a method set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodEntry {
    /// Method name
    pub name: Symbol,
    /// Declaring package for unexported names, `None` for exported ones
    pub pkg: Option<PkgId>,
    /// How the method is reached
    pub binding: MethodBinding,
}

/// Methods of a receiver type, sorted by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSet {
    entries: Vec<MethodEntry>,
}

impl MethodSet {
    /// Finds the method `name` as seen from package `pkg`.
    ///
    /// Unexported names only match methods declared in `pkg`.
    pub fn lookup(
        &self,
        model: &SemanticModel,
        pkg: Option<PkgId>,
        name: Symbol,
    ) -> Option<&MethodEntry> {
        let qualifier = if model.is_exported(name) { None } else { pkg };
        self.entries
            .iter()
            .find(|entry| entry.name == name && entry.pkg == qualifier)
    }

    /// Entries sorted by name
    pub fn iter(&self) -> impl Iterator<Item = &MethodEntry> {
        self.entries.iter()
    }

    /// Number of methods
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set has no methods
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct MethodName {
    pkg: Option<PkgId>,
    name: Symbol,
}

impl MethodName {
    fn of(model: &SemanticModel, obj: ObjId) -> Self {
        let object = model.object(obj);
        let pkg = if model.is_exported(object.name) {
            None
        } else {
            object.pkg
        };
        Self {
            pkg,
            name: object.name,
        }
    }
}

/// A type reached through zero or more embedded fields
#[derive(Debug, Clone)]
struct Embedding {
    ty: TypeId,
    path: Vec<usize>,
    /// Pointer-receiver methods are callable
    addressable: bool,
    indirect: bool,
    /// Reached along more than one path at the same depth
    multiples: bool,
}

/// Merges repeated occurrences of a named type at one depth and drops types
/// already searched at a shallower depth
fn consolidate(
    model: &SemanticModel,
    level: Vec<Embedding>,
    visited: &FxHashSet<TypeId>,
) -> Vec<Embedding> {
    let mut merged: Vec<Embedding> = Vec::with_capacity(level.len());
    let mut seen: FxHashMap<TypeId, usize> = FxHashMap::default();
    for embedding in level {
        if !model.is_named(embedding.ty) {
            merged.push(embedding);
            continue;
        }
        if visited.contains(&embedding.ty) {
            continue;
        }
        match seen.get(&embedding.ty) {
            Some(&slot) => merged[slot].multiples = true,
            None => {
                seen.insert(embedding.ty, merged.len());
                merged.push(embedding);
            }
        }
    }
    merged
}

/// Computes the method set of `T` or `*T`
pub fn compute_method_set(model: &SemanticModel, key: MethodSetKey) -> MethodSet {
    let mut entries = if model.is_interface(key.ty) && !key.pointer {
        model
            .interface_methods(key.ty)
            .into_iter()
            .map(|method| {
                let name = MethodName::of(model, method);
                MethodEntry {
                    name: name.name,
                    pkg: name.pkg,
                    binding: MethodBinding::Interface(method),
                }
            })
            .collect()
    } else if matches!(model.ty(key.ty).kind, TypeKind::Pointer(_)) {
        Vec::new()
    } else {
        collect_concrete(model, key)
    };
    entries.sort_by(|a, b| model.name(a.name).cmp(model.name(b.name)));
    MethodSet { entries }
}

/// Breadth-first search over embedded fields; shallower names shadow
/// deeper ones, and names found twice at the same depth cancel out. A type
/// embedded along several paths at one depth makes all of its names
/// ambiguous, including those promoted from below it.
fn collect_concrete(model: &SemanticModel, key: MethodSetKey) -> Vec<MethodEntry> {
    let mut entries = Vec::new();
    let mut decided: FxHashSet<MethodName> = FxHashSet::default();
    let mut visited: FxHashSet<TypeId> = FxHashSet::default();
    let mut current = vec![Embedding {
        ty: key.ty,
        path: Vec::new(),
        addressable: key.pointer,
        indirect: false,
        multiples: false,
    }];

    while !current.is_empty() {
        current = consolidate(model, current, &visited);
        visited.extend(
            current
                .iter()
                .map(|embedding| embedding.ty)
                .filter(|&ty| model.is_named(ty)),
        );
        let mut candidates: FxHashMap<MethodName, Vec<(ObjId, usize, bool)>> =
            FxHashMap::default();
        let mut order = Vec::new();
        let mut fields = FxHashSet::default();
        let mut collisions = FxHashSet::default();
        let mut next = Vec::new();

        for (slot, embedding) in current.iter().enumerate() {
            let multiples = embedding.multiples;
            let mut add = |obj: ObjId, from_interface: bool| {
                let name = MethodName::of(model, obj);
                if multiples {
                    collisions.insert(name);
                }
                let list = candidates.entry(name).or_default();
                if list.is_empty() {
                    order.push(name);
                }
                list.push((obj, slot, from_interface));
            };
            if let TypeKind::Named { methods, .. } = &model.ty(embedding.ty).kind {
                for &method in methods {
                    add(method, false);
                }
            }
            let under = model.underlying(embedding.ty);
            match &model.ty(under).kind {
                TypeKind::Struct { fields: vars } => {
                    for (index, &field) in vars.iter().enumerate() {
                        fields.insert(MethodName::of(model, field));
                        if !matches!(
                            model.object(field).kind,
                            ObjectKind::Var(VarKind::Field { embedded: true })
                        ) {
                            continue;
                        }
                        let (ty, through_pointer) = model.deref(model.object(field).ty);
                        let mut path = embedding.path.clone();
                        path.push(index);
                        next.push(Embedding {
                            ty,
                            path,
                            addressable: embedding.addressable || through_pointer,
                            indirect: embedding.indirect || through_pointer,
                            multiples,
                        });
                    }
                }
                TypeKind::Interface { .. } if !embedding.path.is_empty() => {
                    for method in model.interface_methods(under) {
                        add(method, true);
                    }
                }
                _ => {}
            }
        }

        for name in order {
            if decided.contains(&name) {
                continue;
            }
            decided.insert(name);
            let found = &candidates[&name];
            if found.len() > 1 || fields.contains(&name) || collisions.contains(&name) {
                continue;
            }
            let (method, slot, from_interface) = found[0];
            let embedding = &current[slot];
            if let Some(binding) = bind(model, key, embedding, method, from_interface) {
                entries.push(MethodEntry {
                    name: name.name,
                    pkg: name.pkg,
                    binding,
                });
            }
        }
        decided.extend(fields);
        current = next;
    }
    entries
}

fn bind(
    model: &SemanticModel,
    key: MethodSetKey,
    embedding: &Embedding,
    method: ObjId,
    from_interface: bool,
) -> Option<MethodBinding> {
    if embedding.path.is_empty() {
        let pointer_recv = model.has_pointer_recv(method);
        return match (pointer_recv, key.pointer) {
            (true, false) => None,
            (false, true) => Some(MethodBinding::Wrapper {
                kind: WrapperKind::Indirection,
                method,
                path: Vec::new(),
                indirect: true,
            }),
            _ => Some(MethodBinding::Declared(method)),
        };
    }
    if !from_interface && model.has_pointer_recv(method) && !embedding.addressable {
        return None;
    }
    Some(MethodBinding::Wrapper {
        kind: WrapperKind::Promotion,
        method,
        path: embedding.path.clone(),
        indirect: embedding.indirect,
    })
}

/// Concurrent per-type cache of method sets.
///
/// Lookups compute outside of any lock; when two threads race on the same
/// key both compute, and the first insertion wins. Both results are equal.
#[derive(Debug, Default)]
pub struct MethodSetCache {
    sets: DashMap<MethodSetKey, Arc<MethodSet>>,
}

impl MethodSetCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// The method set for `key`, computing it on first use
    pub fn method_set(&self, model: &SemanticModel, key: MethodSetKey) -> Arc<MethodSet> {
        if let Some(set) = self.sets.get(&key) {
            return Arc::clone(set.value());
        }
        let computed = Arc::new(compute_method_set(model, key));
        let entry = self.sets.entry(key).or_insert_with(|| {
            debug!(
                ty = %model.display_type(key.ty),
                pointer = key.pointer,
                methods = computed.len(),
                "computed method set"
            );
            Arc::clone(&computed)
        });
        Arc::clone(entry.value())
    }

    /// Method set of an arbitrary receiver type
    pub fn method_set_of(&self, model: &SemanticModel, ty: TypeId) -> Arc<MethodSet> {
        self.method_set(model, MethodSetKey::of(model, ty))
    }

    /// Number of cached sets
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Whether no set has been computed yet
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BasicKind;
    use rv_intern::Interner;
    use rv_span::Pos;

    struct Fixture {
        model: SemanticModel,
        pkg: PkgId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut model = SemanticModel::new(Interner::new());
            let pkg = model.new_package("example.com/p", "p");
            Self { model, pkg }
        }

        fn named(&mut self, name: &str, pos: u32) -> TypeId {
            let (_, ty) = self.model.new_type_name(self.pkg, name, Pos(pos));
            ty
        }

        fn method(&mut self, recv: TypeId, name: &str, pos: u32, pointer: bool) -> ObjId {
            let recv_ty = if pointer {
                self.model.pointer_to(recv)
            } else {
                recv
            };
            let method = self
                .model
                .new_method(self.pkg, name, Pos(pos), recv_ty, Vec::new(), Vec::new());
            self.model.add_method(recv, method);
            method
        }

        fn embed(&mut self, ty: TypeId, pos: u32) -> ObjId {
            let name = self.model.display_type(ty).to_string();
            self.model.new_var(
                self.pkg,
                name.rsplit('.').next().unwrap_or(&name),
                Pos(pos),
                ty,
                VarKind::Field { embedded: true },
            )
        }

        fn lookup(&self, set: &MethodSet, name: &str) -> Option<MethodBinding> {
            let sym = self.model.interner().get(name)?;
            set.lookup(&self.model, Some(self.pkg), sym)
                .map(|entry| entry.binding.clone())
        }
    }

    #[test]
    fn test_value_and_pointer_receivers() {
        let mut fx = Fixture::new();
        let t = fx.named("T", 1);
        let empty = fx.model.new_struct(Vec::new());
        fx.model.set_underlying(t, empty);
        let get = fx.method(t, "Get", 10, false);
        let set = fx.method(t, "set", 20, true);

        let value_set = compute_method_set(&fx.model, MethodSetKey::value(t));
        assert_eq!(value_set.len(), 1);
        assert_eq!(fx.lookup(&value_set, "Get"), Some(MethodBinding::Declared(get)));
        assert_eq!(fx.lookup(&value_set, "set"), None);

        let pointer_set = compute_method_set(&fx.model, MethodSetKey::pointer(t));
        assert_eq!(pointer_set.len(), 2);
        assert_eq!(fx.lookup(&pointer_set, "set"), Some(MethodBinding::Declared(set)));
        let wrapper = fx.lookup(&pointer_set, "Get");
        assert!(matches!(
            wrapper,
            Some(MethodBinding::Wrapper {
                kind: WrapperKind::Indirection,
                method,
                ..
            }) if method == get
        ));
        assert_eq!(wrapper.map(|binding| binding.func()), Some(get));
    }

    #[test]
    fn test_unexported_lookup_is_package_qualified() {
        let mut fx = Fixture::new();
        let other = fx.model.new_package("example.com/q", "q");
        let t = fx.named("T", 1);
        let empty = fx.model.new_struct(Vec::new());
        fx.model.set_underlying(t, empty);
        fx.method(t, "hidden", 10, false);
        let set = compute_method_set(&fx.model, MethodSetKey::value(t));
        let Some(sym) = fx.model.interner().get("hidden") else {
            panic!("name was interned");
        };
        assert!(set.lookup(&fx.model, Some(fx.pkg), sym).is_some());
        assert!(set.lookup(&fx.model, Some(other), sym).is_none());
    }

    #[test]
    fn test_promotion_and_shadowing() {
        let mut fx = Fixture::new();
        let inner = fx.named("Inner", 1);
        let empty = fx.model.new_struct(Vec::new());
        fx.model.set_underlying(inner, empty);
        let m = fx.method(inner, "M", 10, false);
        let p = fx.method(inner, "P", 11, true);
        fx.method(inner, "N", 12, false);

        let outer = fx.named("Outer", 20);
        let field = fx.embed(inner, 21);
        let body = fx.model.new_struct(vec![field]);
        fx.model.set_underlying(outer, body);
        let n = fx.method(outer, "N", 30, false);

        let value_set = compute_method_set(&fx.model, MethodSetKey::value(outer));
        assert!(matches!(
            fx.lookup(&value_set, "M"),
            Some(MethodBinding::Wrapper { kind: WrapperKind::Promotion, method, ref path, .. })
                if method == m && path == &[0]
        ));
        // pointer receiver methods of a value field need an addressable receiver
        assert_eq!(fx.lookup(&value_set, "P"), None);
        assert_eq!(fx.lookup(&value_set, "N"), Some(MethodBinding::Declared(n)));

        let pointer_set = compute_method_set(&fx.model, MethodSetKey::pointer(outer));
        assert_eq!(fx.lookup(&pointer_set, "P").map(|b| b.func()), Some(p));
    }

    #[test]
    fn test_same_depth_collision_cancels() {
        let mut fx = Fixture::new();
        let empty = fx.model.new_struct(Vec::new());
        let a = fx.named("A", 1);
        fx.model.set_underlying(a, empty);
        fx.method(a, "M", 2, false);
        let b = fx.named("B", 3);
        fx.model.set_underlying(b, empty);
        fx.method(b, "M", 4, false);
        let s = fx.named("S", 5);
        let fa = fx.embed(a, 6);
        let fb = fx.embed(b, 7);
        let body = fx.model.new_struct(vec![fa, fb]);
        fx.model.set_underlying(s, body);

        let set = compute_method_set(&fx.model, MethodSetKey::value(s));
        assert_eq!(fx.lookup(&set, "M"), None);
    }

    #[test]
    fn test_diamond_embedding_is_ambiguous() {
        let mut fx = Fixture::new();
        let empty = fx.model.new_struct(Vec::new());
        let c = fx.named("C", 1);
        fx.model.set_underlying(c, empty);
        fx.method(c, "M", 2, false);
        let a = fx.named("A", 3);
        let ac = fx.embed(c, 4);
        let a_body = fx.model.new_struct(vec![ac]);
        fx.model.set_underlying(a, a_body);
        let b = fx.named("B", 5);
        let bc = fx.embed(c, 6);
        let b_body = fx.model.new_struct(vec![bc]);
        fx.model.set_underlying(b, b_body);
        let s = fx.named("S", 7);
        let sa = fx.embed(a, 8);
        let sb = fx.embed(b, 9);
        let body = fx.model.new_struct(vec![sa, sb]);
        fx.model.set_underlying(s, body);

        let set = compute_method_set(&fx.model, MethodSetKey::value(s));
        assert_eq!(fx.lookup(&set, "M"), None);
        let set = compute_method_set(&fx.model, MethodSetKey::pointer(s));
        assert_eq!(fx.lookup(&set, "M"), None);
    }

    #[test]
    fn test_shallower_embedding_wins_over_repeat() {
        let mut fx = Fixture::new();
        let empty = fx.model.new_struct(Vec::new());
        let c = fx.named("C", 1);
        fx.model.set_underlying(c, empty);
        let m = fx.method(c, "M", 2, false);
        let a = fx.named("A", 3);
        let ac = fx.embed(c, 4);
        let a_body = fx.model.new_struct(vec![ac]);
        fx.model.set_underlying(a, a_body);
        // S{A; C}: C at depth one shadows the copy reached through A
        let s = fx.named("S", 5);
        let sa = fx.embed(a, 6);
        let sc = fx.embed(c, 7);
        let body = fx.model.new_struct(vec![sa, sc]);
        fx.model.set_underlying(s, body);

        let set = compute_method_set(&fx.model, MethodSetKey::value(s));
        assert!(matches!(
            fx.lookup(&set, "M"),
            Some(MethodBinding::Wrapper { kind: WrapperKind::Promotion, method, ref path, .. })
                if method == m && path == &[1]
        ));
    }

    #[test]
    fn test_interface_methods() {
        let fx = Fixture::new();
        let error = fx.model.universe().error_type;
        let set = compute_method_set(&fx.model, MethodSetKey::of(&fx.model, error));
        assert_eq!(
            fx.lookup(&set, "Error"),
            Some(MethodBinding::Interface(fx.model.universe().error_method))
        );
    }

    #[test]
    fn test_cache_returns_shared_set() {
        let mut fx = Fixture::new();
        let t = fx.named("T", 1);
        let int = fx.model.basic(BasicKind::Int);
        fx.model.set_underlying(t, int);
        fx.method(t, "M", 2, false);
        let ptr = fx.model.pointer_to(t);

        let cache = MethodSetCache::new();
        let first = cache.method_set_of(&fx.model, ptr);
        let second = cache.method_set(&fx.model, MethodSetKey::pointer(t));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_is_shared_across_threads() {
        let mut fx = Fixture::new();
        let t = fx.named("T", 1);
        let int = fx.model.basic(BasicKind::Int);
        fx.model.set_underlying(t, int);
        fx.method(t, "M", 2, false);
        fx.method(t, "N", 3, true);
        let key = MethodSetKey::pointer(t);

        let cache = MethodSetCache::new();
        let sets: Vec<Arc<MethodSet>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| cache.method_set(&fx.model, key)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("worker finished"))
                .collect()
        });

        assert_eq!(cache.len(), 1);
        let stored = cache.method_set(&fx.model, key);
        for set in &sets {
            assert_eq!(**set, *stored);
            assert!(Arc::ptr_eq(set, &stored));
        }
    }
}
