//! Member and type descriptors

mod attribute;
pub use attribute::*;

mod member;
pub use member::*;

mod type_data;
pub use type_data::*;

mod struct_;
pub use struct_::*;

mod registry;
pub use registry::*;
