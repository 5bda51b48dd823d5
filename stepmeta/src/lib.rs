#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
//! Dynamic members and parameters for hierarchies of test steps.
//!
//! Objects keep their declared types; [`Reflector`] layers runtime members on
//! top of them. Steps and plans always expose their break conditions and
//! description, and any object can carry parameters forwarding to members of
//! other objects.
//!
//! ```
//! use stepmeta::{Reflector, TypeKind, StructType, StaticMember, TypeRegistry, ValueType};
//!
//! let delay = StructType::builder("DelayStep")
//!     .kind(TypeKind::Step)
//!     .member(StaticMember::builder("DelaySecs", ValueType::Float))
//!     .build();
//! let reflector = Reflector::builder()
//!     .base(TypeRegistry::new().with(delay))
//!     .build();
//!
//! let composed = reflector.type_by_name("DelayStep").unwrap();
//! assert!(composed.member("BreakConditions").is_some());
//! assert!(composed.member("DelaySecs").is_some());
//! ```

pub use stepmeta_core::*;

#[cfg(feature = "reflect")]
pub use stepmeta_reflect::*;

static_assertions::assert_impl_all!(TypeRegistry: Send, Sync);
static_assertions::assert_obj_safe!(MemberData, TypeData, Object);

#[cfg(feature = "reflect")]
static_assertions::assert_impl_all!(Reflector: Send, Sync);
#[cfg(feature = "reflect")]
static_assertions::assert_impl_all!(ParameterMember: Send, Sync);
