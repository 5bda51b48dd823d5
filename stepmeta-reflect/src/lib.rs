#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![forbid(unsafe_code)]
//! Dynamic members and parameters for step objects.
//!
//! A [`Reflector`] answers "what type is this object?" through a chain of
//! providers. For steps and plans the answer is a composed descriptor that
//! adds break conditions, a description and the list of members attached to
//! the object at runtime. Those dynamic members keep their values in weak side
//! tables, so nothing outlives the object it belongs to.
//!
//! A [`ParameterMember`] is a dynamic member that forwards to members of other
//! objects: reads come from its primary member, writes reach all of them.

extern crate alloc;

mod error;
pub use error::*;

mod owner_table;
pub use owner_table::*;

mod dynamic;
pub use dynamic::*;

pub mod synthetic;
pub use synthetic::{BreakConditionMember, DescriptionMember, DynamicMembersMember};

mod clone;
pub use clone::*;

mod parameter;
pub use parameter::*;

mod provider;
pub use provider::*;

mod validator;
pub use validator::*;

mod composer;
pub use composer::*;

mod reflector;
pub use reflector::*;
