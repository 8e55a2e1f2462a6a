//! Method wrappers synthesized on demand

use crate::program::Program;
use crate::value::{Value, ValueId};
use rv_types::{MethodBinding, MethodSetKey, ObjId, TypeId, WrapperKind};
use std::sync::Arc;
use tracing::debug;

pub(crate) type WrapperKey = (MethodSetKey, ObjId);

/// A synthesized method value adapting a receiver to a method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wrapper {
    /// Printed name, e.g. `(*p.T).M`
    pub name: String,
    /// How the method is reached
    pub kind: WrapperTarget,
    /// Receiver type the wrapper is a method of
    pub recv: MethodSetKey,
    /// Method object called by the wrapper
    pub method: ObjId,
    /// Signature type
    pub ty: TypeId,
    /// Declared function value called by the wrapper, `None` for dynamic
    /// dispatch through an interface
    pub target: Option<ValueId>,
}

/// How a wrapper reaches its method
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WrapperTarget {
    /// Dereferences the receiver
    Indirection,
    /// Selects an embedded field
    Promotion {
        /// Field indices from the receiver to the embedded method owner
        path: Vec<usize>,
        /// Whether any step of the path goes through a pointer
        indirect: bool,
    },
    /// Calls through an interface
    Interface,
}

impl Program {
    /// Value of a method set entry of `recv`.
    ///
    /// Declared methods resolve through their package's value table.
    /// Wrappers are created on first use and cached per receiver and method,
    /// so repeated calls return the same wrapper. A wrapper always targets
    /// the declared method directly. Returns `None` while the declaring
    /// package has not been created.
    pub fn method(&self, recv: MethodSetKey, binding: &MethodBinding) -> Option<Value> {
        match binding {
            MethodBinding::Declared(func) => self.package_level_value(*func),
            MethodBinding::Wrapper {
                kind,
                method,
                path,
                indirect,
            } => {
                let target = self.package_level_value(*method).and_then(|value| value.as_node());
                let through_interface = self.model().recv_type(*method).is_some_and(|recv_ty| {
                    self.model().is_interface(recv_ty)
                });
                if target.is_none() && !through_interface {
                    return None;
                }
                let kind = match kind {
                    WrapperKind::Indirection => WrapperTarget::Indirection,
                    WrapperKind::Promotion => WrapperTarget::Promotion {
                        path: path.clone(),
                        indirect: *indirect,
                    },
                };
                Some(self.wrapper(recv, *method, kind, target))
            }
            MethodBinding::Interface(method) => {
                Some(self.wrapper(recv, *method, WrapperTarget::Interface, None))
            }
        }
    }

    fn wrapper(
        &self,
        recv: MethodSetKey,
        method: ObjId,
        kind: WrapperTarget,
        target: Option<ValueId>,
    ) -> Value {
        let key = (recv, method);
        if let Some(existing) = self.wrappers.get(&key) {
            return Value::Wrapper(Arc::clone(existing.value()));
        }
        let model = self.model();
        let name = format!(
            "({}{}).{}",
            if recv.pointer { "*" } else { "" },
            model.display_type(recv.ty),
            model.object_name(method)
        );
        let wrapper = Arc::new(Wrapper {
            name,
            kind,
            recv,
            method,
            ty: model.object(method).ty,
            target,
        });
        let entry = self.wrappers.entry(key).or_insert_with(|| {
            debug!(wrapper = %wrapper.name, kind = ?wrapper.kind, "synthesized wrapper");
            Arc::clone(&wrapper)
        });
        Value::Wrapper(Arc::clone(entry.value()))
    }
}
