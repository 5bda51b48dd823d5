use alloc::string::String;
use alloc::sync::Arc;
use core::any::Any;
use core::fmt;

use bitflags::bitflags;
use owo_colors::OwoColorize;

use super::{DisplayAttribute, MemberAttribute};
use crate::{ObjectRef, Value, ValueType};

/// Describes one named property of a type.
///
/// Descriptors created by the engine are compared by reference: two members
/// with identical fields are not interchangeable.
pub trait MemberData: Send + Sync + 'static {
    /// Name of the member, unique within its type
    fn name(&self) -> &str;

    /// Name of the type declaring the member
    fn declaring_type(&self) -> &str;

    /// Declared type of the member's value
    fn value_type(&self) -> ValueType;

    /// Readability, writability and storage flags
    fn flags(&self) -> MemberFlags;

    /// Metadata tags, in declaration order
    fn attributes(&self) -> &[MemberAttribute];

    /// Reads the member on `owner`
    fn get_value(&self, owner: &ObjectRef) -> Result<Value, MemberError>;

    /// Writes the member on `owner`
    fn set_value(&self, owner: &ObjectRef, value: Value) -> Result<(), MemberError>;

    /// Upcast for downcasting to the concrete descriptor
    fn as_any(&self) -> &dyn Any;

    /// Upcast for downcasting a shared descriptor
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// Whether the member can be read
    fn readable(&self) -> bool {
        self.flags().contains(MemberFlags::READABLE)
    }

    /// Whether the member can be written
    fn writable(&self) -> bool {
        self.flags().contains(MemberFlags::WRITABLE)
    }

    /// Whether the value lives in dynamic storage rather than a declared field
    fn is_dynamic(&self) -> bool {
        self.flags().contains(MemberFlags::DYNAMIC)
    }

    /// See [`MemberAttribute::Display`]
    fn display(&self) -> Option<&DisplayAttribute> {
        self.attributes().iter().find_map(|attr| match attr {
            MemberAttribute::Display(d) => Some(d),
            _ => None,
        })
    }

    /// See [`MemberAttribute::NonParameterizable`]
    fn is_parameterizable(&self) -> bool {
        !self
            .attributes()
            .contains(&MemberAttribute::NonParameterizable)
    }
}

/// Shared handle to a member descriptor
pub type MemberRef = Arc<dyn MemberData>;

impl fmt::Debug for dyn MemberData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{}: {}",
            self.declaring_type(),
            self.name(),
            self.value_type()
        )
    }
}

/// Identity of a member descriptor, for hashing pairs
#[inline]
pub fn member_addr(member: &MemberRef) -> usize {
    Arc::as_ptr(member) as *const () as usize
}

bitflags! {
    /// Flags describing how a member can be accessed
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemberFlags: u32 {
        /// An empty set of flags
        const EMPTY = 0;

        /// The value can be read
        const READABLE = 1 << 0;

        /// The value can be written
        const WRITABLE = 1 << 1;

        /// The value is stored outside the owner's declared fields
        const DYNAMIC = 1 << 2;

        /// Readable and writable
        const READ_WRITE = Self::READABLE.bits() | Self::WRITABLE.bits();
    }
}

impl Default for MemberFlags {
    #[inline(always)]
    fn default() -> Self {
        Self::READ_WRITE
    }
}

/// Errors encountered when reading or writing a member
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum MemberError {
    /// The value is not assignable to the member's declared type
    TypeMismatch {
        /// the member being written
        member: String,

        /// the declared type of the member
        expected: ValueType,

        /// the kind of value someone tried to write
        actual: &'static str,
    },

    /// The member cannot be written
    ReadOnly {
        /// the member being written
        member: String,
    },

    /// The member cannot be read
    WriteOnly {
        /// the member being read
        member: String,
    },

    /// The owner is not an instance of the declaring type
    WrongOwner {
        /// the member being accessed
        member: String,

        /// the declaring type
        expected: String,

        /// the owner's type
        actual: String,
    },
}

impl core::error::Error for MemberError {}

impl fmt::Display for MemberError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberError::TypeMismatch {
                member,
                expected,
                actual,
            } => write!(
                f,
                "Type mismatch on '{}': expected {}, got {}",
                member.yellow(),
                expected.green(),
                actual.red()
            ),
            MemberError::ReadOnly { member } => {
                write!(f, "Member '{}' is read-only", member.yellow())
            }
            MemberError::WriteOnly { member } => {
                write!(f, "Member '{}' is write-only", member.yellow())
            }
            MemberError::WrongOwner {
                member,
                expected,
                actual,
            } => write!(
                f,
                "Member '{}' belongs to {}, but the owner is a {}",
                member.yellow(),
                expected.green(),
                actual.red()
            ),
        }
    }
}
