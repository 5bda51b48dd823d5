use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;

use stepmeta_core::{
    MemberAttribute, MemberData, MemberError, MemberFlags, ObjectRef, Value, ValueType,
};

use crate::OwnerTable;

/// A member whose value is kept in a side table keyed by owner.
///
/// Owners without an entry read the default value. Writing the default
/// removes the entry, so the table only holds owners that differ from it.
pub struct DynamicMember {
    name: String,
    declaring_type: String,
    value_type: ValueType,
    default: Value,
    flags: MemberFlags,
    attributes: Vec<MemberAttribute>,
    storage: Arc<OwnerTable<Value>>,
}

impl DynamicMember {
    /// Returns a builder for DynamicMember
    pub fn builder(name: impl Into<String>, value_type: ValueType) -> DynamicMemberBuilder {
        DynamicMemberBuilder {
            name: name.into(),
            declaring_type: String::new(),
            value_type,
            default: Value::Null,
            flags: MemberFlags::READ_WRITE,
            attributes: Vec::new(),
            storage: None,
        }
    }

    /// Value read by owners that have nothing stored
    pub fn default_value(&self) -> &Value {
        &self.default
    }

    /// The side table backing this member
    pub fn storage(&self) -> &Arc<OwnerTable<Value>> {
        &self.storage
    }

    /// Whether both members read and write the same side table
    pub fn shares_storage_with(&self, other: &DynamicMember) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage)
    }

    /// Number of live owners holding a non-default value
    pub fn stored_owner_count(&self) -> usize {
        self.storage.len()
    }

    /// Whether `owner` holds a non-default value
    pub fn has_stored_value(&self, owner: &ObjectRef) -> bool {
        self.storage.contains(owner)
    }

    pub(crate) fn type_mismatch(&self, value: &Value) -> MemberError {
        MemberError::TypeMismatch {
            member: self.name.clone(),
            expected: self.value_type.clone(),
            actual: value.kind_name(),
        }
    }

    pub(crate) fn read_stored(&self, owner: &ObjectRef) -> Value {
        self.storage
            .get(owner)
            .unwrap_or_else(|| self.default.clone())
    }

    pub(crate) fn write_stored(&self, owner: &ObjectRef, value: Value) -> Result<(), MemberError> {
        if !self.value_type.accepts(&value) {
            return Err(self.type_mismatch(&value));
        }
        if value == self.default {
            self.storage.remove(owner);
        } else {
            self.storage.insert(owner, value);
        }
        Ok(())
    }
}

impl MemberData for DynamicMember {
    fn name(&self) -> &str {
        &self.name
    }

    fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    fn value_type(&self) -> ValueType {
        self.value_type.clone()
    }

    fn flags(&self) -> MemberFlags {
        self.flags
    }

    fn attributes(&self) -> &[MemberAttribute] {
        &self.attributes
    }

    fn get_value(&self, owner: &ObjectRef) -> Result<Value, MemberError> {
        Ok(self.read_stored(owner))
    }

    fn set_value(&self, owner: &ObjectRef, value: Value) -> Result<(), MemberError> {
        if !self.flags.contains(MemberFlags::WRITABLE) {
            return Err(MemberError::ReadOnly {
                member: self.name.clone(),
            });
        }
        self.write_stored(owner, value)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Builder for [`DynamicMember`]
pub struct DynamicMemberBuilder {
    name: String,
    declaring_type: String,
    value_type: ValueType,
    default: Value,
    flags: MemberFlags,
    attributes: Vec<MemberAttribute>,
    storage: Option<Arc<OwnerTable<Value>>>,
}

impl DynamicMemberBuilder {
    /// Sets the name of the declaring type
    pub fn declaring_type(mut self, name: impl Into<String>) -> Self {
        self.declaring_type = name.into();
        self
    }

    /// Sets the default value
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = value;
        self
    }

    /// Sets the access flags. [`MemberFlags::DYNAMIC`] is always added.
    pub fn flags(mut self, flags: MemberFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Adds an attribute
    pub fn attribute(mut self, attribute: MemberAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Replaces all attributes
    pub fn attributes(mut self, attributes: Vec<MemberAttribute>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Reads and writes an existing side table instead of a fresh one
    pub fn storage(mut self, storage: Arc<OwnerTable<Value>>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Shares the side table of `other`
    pub fn aliasing(self, other: &DynamicMember) -> Self {
        self.storage(other.storage.clone())
    }

    /// Builds the DynamicMember
    pub fn build(self) -> DynamicMember {
        DynamicMember {
            name: self.name,
            declaring_type: self.declaring_type,
            value_type: self.value_type,
            default: self.default,
            flags: self.flags | MemberFlags::DYNAMIC,
            attributes: self.attributes,
            storage: self.storage.unwrap_or_else(OwnerTable::shared),
        }
    }
}
