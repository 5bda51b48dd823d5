use alloc::string::String;

use owo_colors::OwoColorize;
use stepmeta_core::MemberError;

/// Errors raised by the parameterization API and by parameter writes.
#[derive(Debug, PartialEq, Clone)]
#[non_exhaustive]
pub enum ReflectError {
    /// A required argument was absent, or refers to an object that no longer exists
    ArgumentMissing {
        /// Name of the argument
        argument: &'static str,
    },

    /// An argument was present but unusable
    ArgumentInvalid {
        /// Name of the argument
        argument: &'static str,

        /// Why it was rejected
        reason: String,
    },

    /// The target already has a member with that name, and it is not a parameter
    NameCollision {
        /// The requested parameter name
        name: String,

        /// The type declaring the existing member
        existing_type: String,
    },

    /// The (source, member) pair is already aggregated by the parameter
    DuplicateParameterMember {
        /// The parameter
        parameter: String,

        /// The member that was added a second time
        member: String,
    },

    /// Tried to unparameterize from a member that is not a parameter
    NotAParameter {
        /// The member that was passed
        member: String,
    },

    /// Reading or writing an underlying member failed
    Member(MemberError),
}

impl ReflectError {
    /// Shorthand for [`ReflectError::ArgumentInvalid`]
    pub fn invalid(argument: &'static str, reason: impl Into<String>) -> Self {
        ReflectError::ArgumentInvalid {
            argument,
            reason: reason.into(),
        }
    }
}

impl From<MemberError> for ReflectError {
    fn from(err: MemberError) -> Self {
        ReflectError::Member(err)
    }
}

impl core::fmt::Display for ReflectError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ReflectError::ArgumentMissing { argument } => {
                write!(f, "Argument '{}' is missing", argument.red())
            }
            ReflectError::ArgumentInvalid { argument, reason } => {
                write!(f, "Argument '{}' is invalid: {}", argument.red(), reason)
            }
            ReflectError::NameCollision {
                name,
                existing_type,
            } => write!(
                f,
                "A member named '{}' already exists on {} and is not a parameter",
                name.yellow(),
                existing_type.blue()
            ),
            ReflectError::DuplicateParameterMember { parameter, member } => write!(
                f,
                "Member '{}' is already parameterized by '{}'",
                member.yellow(),
                parameter.blue()
            ),
            ReflectError::NotAParameter { member } => {
                write!(f, "Member '{}' is not a parameter", member.red())
            }
            ReflectError::Member(err) => write!(f, "{err}"),
        }
    }
}

impl core::error::Error for ReflectError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            ReflectError::Member(err) => Some(err),
            _ => None,
        }
    }
}
