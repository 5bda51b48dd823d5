//! Members the composer adds to every step-like type.
//!
//! Each one keeps its value in a side table, unless the owner carries a
//! native field for it, in which case the native field is used directly.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;

use stepmeta_core::{
    BreakConditions, DisplayAttribute, MemberAttribute, MemberData, MemberError, MemberFlags,
    MemberRef, ObjectRef, Value, ValueType,
};

use crate::DynamicMember;

/// Name of the break condition member
pub const BREAK_CONDITIONS: &str = "BreakConditions";

/// Name of the description member
pub const DESCRIPTION: &str = "Description";

/// Name of the member listing an object's attached dynamic members
pub const FORWARDED_MEMBERS: &str = "ForwardedMembers";

/// Declaring type name used for synthetic members
pub const SYNTHETIC_TYPE: &str = "TestStep";

macro_rules! delegate_member_data {
    () => {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn declaring_type(&self) -> &str {
            self.inner.declaring_type()
        }

        fn value_type(&self) -> ValueType {
            self.inner.value_type()
        }

        fn flags(&self) -> MemberFlags {
            self.inner.flags()
        }

        fn attributes(&self) -> &[MemberAttribute] {
            self.inner.attributes()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    };
}

/// Break conditions of a step or plan
pub struct BreakConditionMember {
    inner: DynamicMember,
}

impl BreakConditionMember {
    /// The member steps get
    pub fn for_steps() -> Self {
        let display = DisplayAttribute::new("Break Conditions")
            .description("When enabled, specify new break conditions. When disabled, conditions are inherited from the parent.")
            .groups(["Common"])
            .order(20000.0);
        Self {
            inner: Self::builder(display).build(),
        }
    }

    /// The member plans get. Shares its values with `steps`.
    pub fn for_plans(steps: &BreakConditionMember) -> Self {
        let display = DisplayAttribute::new("Break Conditions")
            .description("Specifies the conditions under which the plan stops running.")
            .order(1.0);
        Self {
            inner: Self::builder(display).aliasing(&steps.inner).build(),
        }
    }

    fn builder(display: DisplayAttribute) -> crate::DynamicMemberBuilder {
        DynamicMember::builder(BREAK_CONDITIONS, ValueType::BreakConditions)
            .declaring_type(SYNTHETIC_TYPE)
            .default_value(Value::BreakConditions(BreakConditions::INHERIT))
            .attribute(MemberAttribute::Display(display))
            .attribute(MemberAttribute::Unsweepable)
    }

    /// The dynamic member holding values for owners without a native field
    pub fn dynamic(&self) -> &DynamicMember {
        &self.inner
    }
}

impl MemberData for BreakConditionMember {
    delegate_member_data!();

    fn get_value(&self, owner: &ObjectRef) -> Result<Value, MemberError> {
        match owner.break_condition_field() {
            Some(field) => Ok(Value::BreakConditions(field.break_conditions())),
            None => self.inner.get_value(owner),
        }
    }

    fn set_value(&self, owner: &ObjectRef, value: Value) -> Result<(), MemberError> {
        match (owner.break_condition_field(), &value) {
            (Some(field), Value::BreakConditions(bc)) => {
                field.set_break_conditions(*bc);
                Ok(())
            }
            (Some(_), _) => Err(self.inner.type_mismatch(&value)),
            (None, _) => self.inner.set_value(owner, value),
        }
    }
}

/// Free-form description of a step
pub struct DescriptionMember {
    inner: DynamicMember,
}

impl DescriptionMember {
    /// Creates the member
    pub fn new() -> Self {
        let inner = DynamicMember::builder(DESCRIPTION, ValueType::Text)
            .declaring_type(SYNTHETIC_TYPE)
            .default_value(Value::Text(String::new()))
            .attribute(MemberAttribute::Display(
                DisplayAttribute::new("Description")
                    .groups(["Common"])
                    .order(20001.0),
            ))
            .attribute(MemberAttribute::Unsweepable)
            .build();
        Self { inner }
    }
}

impl Default for DescriptionMember {
    fn default() -> Self {
        Self::new()
    }
}

impl MemberData for DescriptionMember {
    delegate_member_data!();

    fn get_value(&self, owner: &ObjectRef) -> Result<Value, MemberError> {
        match owner.description_field() {
            Some(field) => Ok(Value::Text(field.description())),
            None => self.inner.get_value(owner),
        }
    }

    fn set_value(&self, owner: &ObjectRef, value: Value) -> Result<(), MemberError> {
        match (owner.description_field(), value) {
            (Some(field), Value::Text(text)) => {
                field.set_description(text);
                Ok(())
            }
            (Some(_), value) => Err(self.inner.type_mismatch(&value)),
            (None, value) => self.inner.set_value(owner, value),
        }
    }
}

/// The list of members attached to an object at runtime
pub struct DynamicMembersMember {
    inner: DynamicMember,
}

impl DynamicMembersMember {
    /// Creates the member
    pub fn new() -> Self {
        let inner = DynamicMember::builder(FORWARDED_MEMBERS, ValueType::Members)
            .declaring_type(SYNTHETIC_TYPE)
            .default_value(Value::Members(Vec::new()))
            .attribute(MemberAttribute::Hidden)
            .attribute(MemberAttribute::Unsweepable)
            .attribute(MemberAttribute::AnnotationIgnore)
            .attribute(MemberAttribute::NonParameterizable)
            .build();
        Self { inner }
    }

    /// Members currently attached to `owner`
    pub fn members_of(&self, owner: &ObjectRef) -> Vec<MemberRef> {
        match owner.dynamic_member_field() {
            Some(field) => field.dynamic_members(),
            None => match self.inner.read_stored(owner) {
                Value::Members(members) => members,
                _ => Vec::new(),
            },
        }
    }

    /// Replaces the members attached to `owner`
    pub fn set_members_of(&self, owner: &ObjectRef, members: Vec<MemberRef>) {
        match owner.dynamic_member_field() {
            Some(field) => field.set_dynamic_members(members),
            None => {
                // a member list is always accepted by this member's own type
                let _ = self.inner.write_stored(owner, Value::Members(members));
            }
        }
    }
}

impl Default for DynamicMembersMember {
    fn default() -> Self {
        Self::new()
    }
}

impl MemberData for DynamicMembersMember {
    delegate_member_data!();

    fn get_value(&self, owner: &ObjectRef) -> Result<Value, MemberError> {
        Ok(Value::Members(self.members_of(owner)))
    }

    fn set_value(&self, owner: &ObjectRef, value: Value) -> Result<(), MemberError> {
        match value {
            Value::Members(members) => {
                self.set_members_of(owner, members);
                Ok(())
            }
            other => Err(self.inner.type_mismatch(&other)),
        }
    }
}
