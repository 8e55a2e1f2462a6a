//! Semantic model consumed by the IR and the source-correlation queries
//!
//! Type checking itself lives elsewhere; this crate only stores its results:
//! the objects every declaration resolves to, the types they have, the
//! packages owning them, and per-file expression facts ([`Info`]). Method
//! sets are derived on demand and cached in a [`MethodSetCache`].

pub mod constant;
pub mod info;
pub mod methodset;
pub mod model;
pub mod object;
pub mod package;
pub mod types;
pub mod universe;

pub use constant::ConstValue;
pub use info::{Info, Selection, SelectionKind, TypeAndValue};
pub use methodset::{
    MethodBinding, MethodEntry, MethodSet, MethodSetCache, MethodSetKey, WrapperKind,
    compute_method_set,
};
pub use model::{SemanticModel, TypeDisplay};
pub use object::{BuiltinKind, ObjId, ObjLevel, Object, ObjectKind, VarKind};
pub use package::{PackageData, PkgId};
pub use types::{BasicKind, Signature, Type, TypeId, TypeKind, TypeStore};
pub use universe::Universe;
