#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![forbid(unsafe_code)]
//! Core types for the stepmeta dynamic member model.
//!
//! A [`TypeData`] describes a type and the [`MemberData`] it exposes. Objects
//! of the step graph implement [`Object`]; members read and write them as
//! dynamically typed [`Value`]s checked against a [`ValueType`].
//!
//! The engine that attaches members at runtime lives in `stepmeta-reflect`.

extern crate alloc;

mod value;
pub use value::*;

mod object;
pub use object::*;

mod types;
pub use types::*;
