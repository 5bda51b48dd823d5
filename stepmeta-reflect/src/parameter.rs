use alloc::string::ToString;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;
use core::hash::{Hash, Hasher};

use indexmap::IndexSet;
use parking_lot::RwLock;
use stepmeta_core::{
    DisplayAttribute, MemberAttribute, MemberData, MemberError, MemberFlags, MemberRef, ObjectId,
    ObjectRef, Value, ValueType, WeakObjectRef, member_addr,
};

use crate::{DynamicMember, ReflectError, ValueCloner};

/// One aggregated (source object, member) pair.
///
/// The source is held weakly; pairs compare by the identity of both halves.
#[derive(Clone)]
pub struct MemberPair {
    source: WeakObjectRef,
    source_id: ObjectId,
    member: MemberRef,
}

impl MemberPair {
    /// Pairs `member` with the object owning it
    pub fn new(source: &ObjectRef, member: &MemberRef) -> Self {
        Self {
            source: Arc::downgrade(source),
            source_id: ObjectId::of(source),
            member: member.clone(),
        }
    }

    /// The source object, if it is still alive
    pub fn source(&self) -> Option<ObjectRef> {
        self.source.upgrade()
    }

    /// The member on the source
    pub fn member(&self) -> &MemberRef {
        &self.member
    }

    /// Whether this pair is (`source`, `member`)
    pub fn is(&self, source: &ObjectRef, member: &MemberRef) -> bool {
        self.source_id == ObjectId::of(source)
            && self.source.strong_count() > 0
            && Arc::ptr_eq(&self.member, member)
    }
}

impl PartialEq for MemberPair {
    fn eq(&self, other: &Self) -> bool {
        self.source_id == other.source_id && Arc::ptr_eq(&self.member, &other.member)
    }
}

impl Eq for MemberPair {}

impl Hash for MemberPair {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source_id.hash(state);
        member_addr(&self.member).hash(state);
    }
}

impl core::fmt::Debug for MemberPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemberPair")
            .field("source", &self.source_id)
            .field("member", &self.member.name())
            .finish()
    }
}

/// Outcome of [`ParameterMember::remove_member`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Removal {
    /// The last pair was removed; the parameter must be detached from its target
    Emptied,

    /// Pairs remain; the parameter stays attached
    Retained,

    /// The pair was not aggregated by this parameter
    NotAggregated,
}

struct PairSet {
    primary: Option<MemberPair>,
    additional: IndexSet<MemberPair>,
    dynamic_members: usize,
}

/// A dynamic member forwarding to one or more members of other objects.
///
/// Reads come from the primary pair. Writes go to every pair, each one
/// receiving its own clone of the value. Writes are not transactional: when an
/// underlying member rejects its value, members written before it keep theirs.
pub struct ParameterMember {
    inner: DynamicMember,
    target: WeakObjectRef,
    pairs: RwLock<PairSet>,
    cloner: Arc<dyn ValueCloner>,
}

impl ParameterMember {
    /// Creates a parameter named `name` on `target`, forwarding to `member` of `source`.
    ///
    /// The display label and group come from `name` split on `separator`; every
    /// other attribute is copied from `member`.
    pub fn new(
        target: &ObjectRef,
        source: &ObjectRef,
        member: &MemberRef,
        name: &str,
        separator: char,
        cloner: Arc<dyn ValueCloner>,
    ) -> Self {
        let mut display = DisplayAttribute::from_path(name, separator);
        let mut attributes: Vec<MemberAttribute> = member.attributes().to_vec();
        match attributes
            .iter_mut()
            .find(|attr| matches!(attr, MemberAttribute::Display(_)))
        {
            Some(slot) => {
                if let MemberAttribute::Display(original) = slot {
                    display.description = original.description.clone();
                    display.order = original.order;
                }
                *slot = MemberAttribute::Display(display);
            }
            None => attributes.push(MemberAttribute::Display(display)),
        }

        let access = member.flags() & MemberFlags::READ_WRITE;
        let inner = DynamicMember::builder(name, member.value_type())
            .declaring_type(target.type_data().name().to_string())
            .flags(access)
            .attributes(attributes)
            .build();

        let primary = MemberPair::new(source, member);
        Self {
            inner,
            target: Arc::downgrade(target),
            pairs: RwLock::new(PairSet {
                primary: Some(primary),
                additional: IndexSet::new(),
                dynamic_members: usize::from(member.is_dynamic()),
            }),
            cloner,
        }
    }

    /// The object this parameter is attached to, if it is still alive
    pub fn target(&self) -> Option<ObjectRef> {
        self.target.upgrade()
    }

    /// Whether `obj` is the object this parameter is attached to
    pub fn is_attached_to(&self, obj: &ObjectRef) -> bool {
        self.target.strong_count() > 0 && ObjectId::of_weak(&self.target) == ObjectId::of(obj)
    }

    /// The pair reads come from
    pub fn primary(&self) -> Option<MemberPair> {
        self.pairs.read().primary.clone()
    }

    /// All aggregated pairs, primary first
    pub fn parameterized_members(&self) -> Vec<MemberPair> {
        let pairs = self.pairs.read();
        pairs
            .primary
            .iter()
            .chain(pairs.additional.iter())
            .cloned()
            .collect()
    }

    /// Number of aggregated pairs whose member is itself dynamic
    pub fn dynamic_member_count(&self) -> usize {
        self.pairs.read().dynamic_members
    }

    /// Whether any aggregated member is itself dynamic
    pub fn has_dynamic_members(&self) -> bool {
        self.dynamic_member_count() > 0
    }

    /// Whether (`source`, `member`) is aggregated by this parameter
    pub fn contains_member(&self, member: &MemberRef, source: &ObjectRef) -> bool {
        let pairs = self.pairs.read();
        pairs.primary.as_ref().is_some_and(|p| p.is(source, member))
            || pairs.additional.iter().any(|p| p.is(source, member))
    }

    /// Aggregates another pair.
    pub fn add_additional_member(
        &self,
        source: &ObjectRef,
        member: &MemberRef,
    ) -> Result<(), ReflectError> {
        let pair = MemberPair::new(source, member);
        let mut pairs = self.pairs.write();
        if pairs.primary.as_ref() == Some(&pair) || !pairs.additional.insert(pair) {
            return Err(ReflectError::DuplicateParameterMember {
                parameter: self.inner.name().to_string(),
                member: member.name().to_string(),
            });
        }
        if member.is_dynamic() {
            pairs.dynamic_members += 1;
        }
        Ok(())
    }

    /// Stops aggregating (`source`, `member`).
    ///
    /// Removing the primary pair promotes the oldest additional pair.
    pub fn remove_member(&self, member: &MemberRef, source: &ObjectRef) -> Removal {
        let mut pairs = self.pairs.write();
        let removed_dynamic = member.is_dynamic();

        let is_primary = pairs.primary.as_ref().is_some_and(|p| p.is(source, member));
        let outcome = if is_primary {
            pairs.primary = pairs.additional.shift_remove_index(0);
            if pairs.primary.is_some() {
                Removal::Retained
            } else {
                Removal::Emptied
            }
        } else {
            let key = MemberPair::new(source, member);
            if pairs.additional.shift_remove(&key) {
                Removal::Retained
            } else {
                return Removal::NotAggregated;
            }
        };

        if removed_dynamic {
            pairs.dynamic_members = pairs.dynamic_members.saturating_sub(1);
        }
        outcome
    }

    /// Keeps only the pairs whose source is alive and for which `keep` returns
    /// true, returning how many pairs were dropped.
    ///
    /// Surviving pairs keep their order; the first of them becomes the primary.
    /// Check [`ParameterMember::is_empty`] afterwards to know whether the
    /// parameter must be detached.
    pub fn retain_members(&self, mut keep: impl FnMut(&ObjectRef, &MemberRef) -> bool) -> usize {
        // `keep` may query this parameter, so it runs on a snapshot without the lock
        let rejected: Vec<MemberPair> = self
            .parameterized_members()
            .into_iter()
            .filter(|pair| !pair.source().is_some_and(|source| keep(&source, &pair.member)))
            .collect();

        let mut guard = self.pairs.write();
        let pairs = &mut *guard;
        let before = usize::from(pairs.primary.is_some()) + pairs.additional.len();

        let mut survivors: IndexSet<MemberPair> = pairs
            .primary
            .take()
            .into_iter()
            .chain(pairs.additional.drain(..))
            .filter(|pair| pair.source.strong_count() > 0 && !rejected.contains(pair))
            .collect();
        pairs.dynamic_members = survivors.iter().filter(|p| p.member.is_dynamic()).count();
        pairs.primary = survivors.shift_remove_index(0);
        pairs.additional = survivors;

        let after = usize::from(pairs.primary.is_some()) + pairs.additional.len();
        before - after
    }

    /// Whether no pair is left
    pub fn is_empty(&self) -> bool {
        self.pairs.read().primary.is_none()
    }
}

impl MemberData for ParameterMember {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn declaring_type(&self) -> &str {
        self.inner.declaring_type()
    }

    fn value_type(&self) -> ValueType {
        match &self.pairs.read().primary {
            Some(pair) => pair.member.value_type(),
            None => self.inner.value_type(),
        }
    }

    fn flags(&self) -> MemberFlags {
        self.inner.flags()
    }

    fn attributes(&self) -> &[MemberAttribute] {
        self.inner.attributes()
    }

    fn get_value(&self, _owner: &ObjectRef) -> Result<Value, MemberError> {
        let Some(primary) = self.primary() else {
            return Ok(self.inner.default_value().clone());
        };
        match primary.source() {
            Some(source) => primary.member.get_value(&source),
            None => Ok(self.inner.default_value().clone()),
        }
    }

    fn set_value(&self, _owner: &ObjectRef, value: Value) -> Result<(), MemberError> {
        let (primary, additional) = {
            let pairs = self.pairs.read();
            (
                pairs.primary.clone(),
                pairs.additional.iter().cloned().collect::<Vec<_>>(),
            )
        };

        if let Some(pair) = primary {
            if let Some(source) = pair.source() {
                let cloned = self
                    .cloner
                    .clone_value(&value, true, &source, &pair.member.value_type())
                    .unwrap_or_else(|| value.clone());
                pair.member.set_value(&source, cloned)?;
            }
        }

        for pair in additional {
            let Some(source) = pair.source() else {
                continue;
            };
            let Some(cloned) =
                self.cloner
                    .clone_value(&value, false, &source, &pair.member.value_type())
            else {
                continue;
            };
            pair.member.set_value(&source, cloned)?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Downcasts a member to a parameter
pub fn as_parameter(member: &MemberRef) -> Option<Arc<ParameterMember>> {
    member.clone().into_any().downcast::<ParameterMember>().ok()
}

impl core::fmt::Debug for ParameterMember {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ParameterMember")
            .field("name", &self.inner.name())
            .field("pairs", &self.parameterized_members())
            .finish_non_exhaustive()
    }
}
