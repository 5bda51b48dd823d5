use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;

use super::{
    MemberAttribute, MemberData, MemberError, MemberFlags, MemberRef, TypeData, TypeKind, TypeRef,
};
use crate::{Object, ObjectRef, Value, ValueType};

type GetFn = Box<dyn Fn(&dyn Object) -> Option<Value> + Send + Sync>;
type SetFn = Box<dyn Fn(&dyn Object, Value) -> bool + Send + Sync>;

/// A type whose members are declared fields of a concrete Rust type.
///
/// This is the stand-in for a static reflection system: each member carries
/// accessor closures that downcast the owner to the concrete type.
pub struct StructType {
    name: String,
    kind: TypeKind,
    base: Option<TypeRef>,
    members: Vec<MemberRef>,
}

impl StructType {
    /// Returns a builder for StructType
    pub fn builder(name: impl Into<String>) -> StructBuilder {
        StructBuilder::new(name.into())
    }

    /// Members declared by this type itself, excluding inherited ones
    pub fn own_members(&self) -> &[MemberRef] {
        &self.members
    }
}

impl TypeData for StructType {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> TypeKind {
        self.kind
    }

    fn base_type(&self) -> Option<TypeRef> {
        self.base.clone()
    }

    fn members(&self) -> Vec<MemberRef> {
        let mut members = match &self.base {
            Some(base) => base
                .members()
                .into_iter()
                .filter(|m| !self.members.iter().any(|own| own.name() == m.name()))
                .collect(),
            None => Vec::new(),
        };
        members.extend(self.members.iter().cloned());
        members
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Builder for [`StructType`]
pub struct StructBuilder {
    name: String,
    kind: TypeKind,
    base: Option<TypeRef>,
    members: Vec<MemberRef>,
}

impl StructBuilder {
    fn new(name: String) -> Self {
        Self {
            name,
            kind: TypeKind::Plain,
            base: None,
            members: Vec::new(),
        }
    }

    /// Sets the kind for the StructType
    pub fn kind(mut self, kind: TypeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the base type; its members are inherited unless redeclared
    pub fn base(mut self, base: TypeRef) -> Self {
        self.base = Some(base);
        self
    }

    /// Declares a member
    pub fn member(mut self, member: StaticMemberBuilder) -> Self {
        let member = member.declaring_type(self.name.clone()).build();
        self.members.push(Arc::new(member));
        self
    }

    /// Builds the StructType
    pub fn build(self) -> TypeRef {
        Arc::new(StructType {
            name: self.name,
            kind: self.kind,
            base: self.base,
            members: self.members,
        })
    }
}

/// A member backed by a declared field of its owner
pub struct StaticMember {
    name: String,
    declaring_type: String,
    value_type: ValueType,
    flags: MemberFlags,
    attributes: Vec<MemberAttribute>,
    get: Option<GetFn>,
    set: Option<SetFn>,
}

impl StaticMember {
    /// Returns a builder for StaticMember
    pub fn builder(name: impl Into<String>, value_type: ValueType) -> StaticMemberBuilder {
        StaticMemberBuilder {
            name: name.into(),
            declaring_type: String::new(),
            value_type,
            attributes: Vec::new(),
            get: None,
            set: None,
        }
    }

    fn wrong_owner(&self, owner: &ObjectRef) -> MemberError {
        MemberError::WrongOwner {
            member: self.name.clone(),
            expected: self.declaring_type.clone(),
            actual: owner.type_data().name().to_string(),
        }
    }
}

impl MemberData for StaticMember {
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
        let get = self.get.as_ref().ok_or_else(|| MemberError::WriteOnly {
            member: self.name.clone(),
        })?;
        get(owner.as_ref()).ok_or_else(|| self.wrong_owner(owner))
    }

    fn set_value(&self, owner: &ObjectRef, value: Value) -> Result<(), MemberError> {
        let set = self.set.as_ref().ok_or_else(|| MemberError::ReadOnly {
            member: self.name.clone(),
        })?;
        if !self.value_type.accepts(&value) {
            return Err(MemberError::TypeMismatch {
                member: self.name.clone(),
                expected: self.value_type.clone(),
                actual: value.kind_name(),
            });
        }
        if set(owner.as_ref(), value) {
            Ok(())
        } else {
            Err(self.wrong_owner(owner))
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Builder for [`StaticMember`]
pub struct StaticMemberBuilder {
    name: String,
    declaring_type: String,
    value_type: ValueType,
    attributes: Vec<MemberAttribute>,
    get: Option<GetFn>,
    set: Option<SetFn>,
}

impl StaticMemberBuilder {
    /// Sets the declaring type name. [`StructBuilder::member`] does this for you.
    pub fn declaring_type(mut self, name: impl Into<String>) -> Self {
        self.declaring_type = name.into();
        self
    }

    /// Adds an attribute
    pub fn attribute(mut self, attribute: MemberAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Sets the accessor used to read the field from a `T` owner
    pub fn getter<T, F>(mut self, get: F) -> Self
    where
        T: Object,
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        self.get = Some(Box::new(move |owner: &dyn Object| {
            owner.as_any().downcast_ref::<T>().map(&get)
        }));
        self
    }

    /// Sets the accessor used to write the field on a `T` owner
    pub fn setter<T, F>(mut self, set: F) -> Self
    where
        T: Object,
        F: Fn(&T, Value) + Send + Sync + 'static,
    {
        self.set = Some(Box::new(move |owner: &dyn Object, value: Value| {
            match owner.as_any().downcast_ref::<T>() {
                Some(owner) => {
                    set(owner, value);
                    true
                }
                None => false,
            }
        }));
        self
    }

    /// Builds the StaticMember
    pub fn build(self) -> StaticMember {
        let mut flags = MemberFlags::EMPTY;
        if self.get.is_some() {
            flags |= MemberFlags::READABLE;
        }
        if self.set.is_some() {
            flags |= MemberFlags::WRITABLE;
        }
        StaticMember {
            name: self.name,
            declaring_type: self.declaring_type,
            value_type: self.value_type,
            flags,
            attributes: self.attributes,
            get: self.get,
            set: self.set,
        }
    }
}
