use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use super::MemberRef;

/// Describes a type: its name, its kind and the members it exposes.
pub trait TypeData: Send + Sync + 'static {
    /// Identifier for the type
    fn name(&self) -> &str;

    /// What role instances of this type play in the step graph
    fn kind(&self) -> TypeKind;

    /// The type this one extends or wraps, if any
    fn base_type(&self) -> Option<TypeRef>;

    /// All members, in declaration order
    fn members(&self) -> Vec<MemberRef>;

    /// Upcast for downcasting to the concrete descriptor
    fn as_any(&self) -> &dyn Any;

    /// The member with the given name
    fn member(&self, name: &str) -> Option<MemberRef> {
        self.members().into_iter().find(|m| m.name() == name)
    }
}

/// Shared handle to a type descriptor
pub type TypeRef = Arc<dyn TypeData>;

impl fmt::Debug for dyn TypeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.name(), self.kind())
    }
}

impl fmt::Display for dyn TypeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Role of a type in the step graph
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
#[non_exhaustive]
pub enum TypeKind {
    /// Anything that is not a step
    #[default]
    Plain,

    /// A test step
    Step,

    /// The root of a step hierarchy
    Plan,
}

impl TypeKind {
    /// Steps and plans get synthetic members
    pub fn is_step_like(self) -> bool {
        matches!(self, TypeKind::Step | TypeKind::Plan)
    }
}

/// Returns true if `ty` or one of its base types is named `name`.
pub fn descends_to(ty: &TypeRef, name: &str) -> bool {
    let mut current = Some(ty.clone());
    while let Some(ty) = current {
        if ty.name() == name {
            return true;
        }
        current = ty.base_type();
    }
    false
}

/// Reference identity of two type descriptors
#[inline]
pub fn same_type(l: &TypeRef, r: &TypeRef) -> bool {
    Arc::ptr_eq(l, r)
}
