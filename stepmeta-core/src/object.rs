use alloc::string::String;
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use crate::{BreakConditions, MemberRef, TypeRef};

/// An object of the step graph that can be reflected on.
///
/// Besides its declared type, an object may expose native storage for some of
/// the synthetic members the engine adds to step types. When it does, those
/// members read and write the native field instead of their side table.
pub trait Object: Any + Send + Sync {
    /// The declared (base) type of this object
    fn type_data(&self) -> TypeRef;

    /// Upcast for downcasting to the concrete type
    fn as_any(&self) -> &dyn Any;

    /// Native break condition storage, if any
    fn break_condition_field(&self) -> Option<&dyn BreakConditionField> {
        None
    }

    /// Native description storage, if any
    fn description_field(&self) -> Option<&dyn DescriptionField> {
        None
    }

    /// Native dynamic member list storage, if any
    fn dynamic_member_field(&self) -> Option<&dyn DynamicMemberField> {
        None
    }
}

/// Shared handle to an object
pub type ObjectRef = Arc<dyn Object>;

/// Non-owning handle to an object
pub type WeakObjectRef = Weak<dyn Object>;

impl fmt::Debug for dyn Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "⟨{}⟩", self.type_data().name())
    }
}

/// Identity of an object: the address of its allocation.
///
/// Only meaningful while the object is alive; side tables pair it with a
/// [`WeakObjectRef`] to tell a live owner from a reused address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ObjectId(usize);

impl ObjectId {
    /// Identity of a live object
    #[inline]
    pub fn of(obj: &ObjectRef) -> Self {
        Self(Arc::as_ptr(obj) as *const () as usize)
    }

    /// Identity of a possibly dead object
    #[inline]
    pub fn of_weak(obj: &WeakObjectRef) -> Self {
        Self(Weak::as_ptr(obj) as *const () as usize)
    }
}

/// Native break condition field
pub trait BreakConditionField {
    /// Current break conditions
    fn break_conditions(&self) -> BreakConditions;

    /// Replaces the break conditions
    fn set_break_conditions(&self, conditions: BreakConditions);
}

/// Native description field
pub trait DescriptionField {
    /// Current description
    fn description(&self) -> String;

    /// Replaces the description
    fn set_description(&self, description: String);
}

/// Native storage for the members attached to an object at runtime
pub trait DynamicMemberField {
    /// Members currently attached
    fn dynamic_members(&self) -> Vec<MemberRef>;

    /// Replaces the attached members
    fn set_dynamic_members(&self, members: Vec<MemberRef>);
}
