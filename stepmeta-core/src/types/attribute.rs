use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// Separator used in parameter names to denote display groups, unless configured otherwise
pub const DEFAULT_GROUP_SEPARATOR: char = '\\';

/// Metadata tag attached to a member
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum MemberAttribute {
    /// How the member is presented
    Display(DisplayAttribute),

    /// The member may not be parameterized
    NonParameterizable,

    /// The member is excluded from sweeps
    Unsweepable,

    /// The member is ignored when annotating objects
    AnnotationIgnore,

    /// The member is not shown to users
    Hidden,

    /// Custom attribute containing arbitrary text
    Arbitrary(String),
}

/// Display metadata: label, description, group path and ordering
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayAttribute {
    /// Label shown to users
    pub name: String,

    /// Longer description
    pub description: Option<String>,

    /// Group path, outermost first
    pub groups: Vec<String>,

    /// Relative ordering inside the group
    pub order: f64,
}

impl DisplayAttribute {
    /// A display attribute with just a label
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            groups: Vec::new(),
            order: 0.0,
        }
    }

    /// Sets the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the group path
    pub fn groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the order
    pub fn order(mut self, order: f64) -> Self {
        self.order = order;
        self
    }

    /// Builds a display attribute from a path such as `Group\Sub\Label`.
    ///
    /// The last segment becomes the label, the preceding segments the group
    /// path. Segments are trimmed and empty groups dropped.
    pub fn from_path(path: &str, separator: char) -> Self {
        let mut segments: Vec<&str> = path.split(separator).map(str::trim).collect();
        let name = segments.pop().unwrap_or_default().to_string();
        let groups = segments
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect();
        Self {
            name,
            description: None,
            groups,
            order: 0.0,
        }
    }
}
