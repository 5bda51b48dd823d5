//! Composition of step type descriptors.
//!
//! Step-like declared types get a composed descriptor adding the synthetic
//! members. Objects that carry dynamic members additionally get a
//! per-instance descriptor listing them.

use alloc::string::{String, ToString};
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use core::any::Any;

use log::{debug, trace};
use owo_colors::OwoColorize;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use stepmeta_core::{
    MemberData, MemberRef, ObjectRef, TypeData, TypeKind, TypeRef, WeakObjectRef, member_addr,
};

use crate::{
    BreakConditionMember, DescriptionMember, DynamicMembersMember, HierarchyValidator,
    ProviderStack, StackedTypeDataProvider,
};

const MIN_SWEEP_THRESHOLD: usize = 16;

struct CacheEntry<T> {
    base: Weak<dyn TypeData>,
    composed: Arc<T>,
}

/// Maps base descriptors to the descriptor composed from them.
///
/// Entries are keyed by the identity of the base descriptor, which is held
/// weakly. The composed descriptor is held strongly for as long as its base
/// is alive, so a base always maps to the same composed descriptor. Entries
/// whose base is gone are swept whenever the cache doubles in size.
///
/// Composed descriptors must not hold their base strongly, or neither would
/// ever be released.
pub struct IdentityCache<T> {
    inner: RwLock<CacheInner<T>>,
}

struct CacheInner<T> {
    entries: FxHashMap<usize, CacheEntry<T>>,
    sweep_at: usize,
}

fn base_key(base: &TypeRef) -> usize {
    Arc::as_ptr(base) as *const () as usize
}

impl<T> Default for IdentityCache<T> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(CacheInner {
                entries: FxHashMap::default(),
                sweep_at: MIN_SWEEP_THRESHOLD,
            }),
        }
    }
}

impl<T> IdentityCache<T> {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(entries: &FxHashMap<usize, CacheEntry<T>>, base: &TypeRef) -> Option<Arc<T>> {
        let entry = entries.get(&base_key(base))?;
        if entry.base.strong_count() == 0 {
            return None;
        }
        Some(entry.composed.clone())
    }

    /// The descriptor composed from `base`, built with `build` on a miss
    pub fn get_or_insert_with(&self, base: &TypeRef, build: impl FnOnce() -> Arc<T>) -> Arc<T> {
        if let Some(hit) = Self::lookup(&self.inner.read().entries, base) {
            trace!("identity cache hit for {}", base.name().blue());
            return hit;
        }

        let mut inner = self.inner.write();
        // another thread may have built it between the two locks
        if let Some(hit) = Self::lookup(&inner.entries, base) {
            return hit;
        }
        if inner.entries.len() >= inner.sweep_at {
            let before = inner.entries.len();
            inner.entries.retain(|_, e| e.base.strong_count() > 0);
            let after = inner.entries.len();
            inner.sweep_at = (after * 2).max(MIN_SWEEP_THRESHOLD);
            trace!("identity cache swept {} entries", before - after);
        }

        trace!("identity cache miss for {}", base.name().blue());
        let composed = build();
        inner.entries.insert(
            base_key(base),
            CacheEntry {
                base: Arc::downgrade(base),
                composed: composed.clone(),
            },
        );
        composed
    }

    /// Number of entries whose base descriptor is still alive
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .entries
            .values()
            .filter(|e| e.base.strong_count() > 0)
            .count()
    }

    /// Whether no base descriptor is alive
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A step-like declared type extended with the synthetic members.
///
/// The declared type is held weakly; its name and kind are copied.
pub struct StepTypeData {
    base: Weak<dyn TypeData>,
    name: String,
    kind: TypeKind,
    members: Vec<MemberRef>,
}

impl StepTypeData {
    fn new(base: &TypeRef, members: Vec<MemberRef>) -> Self {
        Self {
            base: Arc::downgrade(base),
            name: base.name().to_string(),
            kind: base.kind(),
            members,
        }
    }

    /// The declared type this descriptor extends, if it is still alive
    pub fn base(&self) -> Option<TypeRef> {
        self.base.upgrade()
    }
}

impl TypeData for StepTypeData {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> TypeKind {
        self.kind
    }

    fn base_type(&self) -> Option<TypeRef> {
        self.base()
    }

    fn members(&self) -> Vec<MemberRef> {
        self.members.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The descriptor of one object carrying dynamic members.
///
/// Its members are those of the type-level descriptor plus the object's
/// dynamic members, which win over type members of the same name.
pub struct StepInstanceTypeData {
    inner: Arc<StepTypeData>,
    instance: WeakObjectRef,
    forwarded: Arc<DynamicMembersMember>,
    validator: Arc<dyn HierarchyValidator>,
}

impl StepInstanceTypeData {
    /// The type-level descriptor shared by all instances of the type
    pub fn type_data(&self) -> &Arc<StepTypeData> {
        &self.inner
    }

    /// The object described, if it is still alive
    pub fn instance(&self) -> Option<ObjectRef> {
        self.instance.upgrade()
    }

    fn dynamic_members(&self, instance: &ObjectRef) -> Vec<MemberRef> {
        let mut members = self.forwarded.members_of(instance);
        let before: Vec<usize> = members.iter().map(member_addr).collect();
        self.validator.validate(instance, &mut members);

        let changed = before.len() != members.len()
            || before.iter().zip(&members).any(|(a, m)| *a != member_addr(m));
        if !changed {
            return members;
        }
        debug!(
            "validator changed the dynamic members of {} ({} -> {})",
            self.inner.name().blue(),
            before.len(),
            members.len()
        );
        self.forwarded.set_members_of(instance, members);
        self.forwarded.members_of(instance)
    }
}

impl TypeData for StepInstanceTypeData {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn kind(&self) -> TypeKind {
        self.inner.kind()
    }

    fn base_type(&self) -> Option<TypeRef> {
        Some(self.inner.clone())
    }

    fn members(&self) -> Vec<MemberRef> {
        let Some(instance) = self.instance.upgrade() else {
            return self.inner.members();
        };
        let dynamic = self.dynamic_members(&instance);
        let mut members: Vec<MemberRef> = self
            .inner
            .members
            .iter()
            .filter(|m| dynamic.iter().all(|d| d.name() != m.name()))
            .cloned()
            .collect();
        members.extend(dynamic);
        members
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Stacked provider adding synthetic and per-instance dynamic members to step types
pub struct DynamicMemberTypeDataProvider {
    step_break_conditions: MemberRef,
    plan_break_conditions: MemberRef,
    description: MemberRef,
    forwarded: Arc<DynamicMembersMember>,
    cache: IdentityCache<StepTypeData>,
    validator: Arc<dyn HierarchyValidator>,
}

impl DynamicMemberTypeDataProvider {
    /// Priority of this provider in the chain
    pub const PRIORITY: f64 = 1.0;

    /// Creates the provider. `validator` runs whenever an instance's member list is read.
    pub fn new(validator: Arc<dyn HierarchyValidator>) -> Self {
        let step_break_conditions = BreakConditionMember::for_steps();
        let plan_break_conditions = BreakConditionMember::for_plans(&step_break_conditions);
        Self {
            step_break_conditions: Arc::new(step_break_conditions),
            plan_break_conditions: Arc::new(plan_break_conditions),
            description: Arc::new(DescriptionMember::new()),
            forwarded: Arc::new(DynamicMembersMember::new()),
            cache: IdentityCache::new(),
            validator,
        }
    }

    /// The member listing each object's dynamic members
    pub fn forwarded(&self) -> &Arc<DynamicMembersMember> {
        &self.forwarded
    }

    /// The composition cache
    pub fn cache(&self) -> &IdentityCache<StepTypeData> {
        &self.cache
    }

    /// The composed descriptor for `base`, or `None` when `base` is not step-like
    pub fn compose(&self, base: &TypeRef) -> Option<Arc<StepTypeData>> {
        if !base.kind().is_step_like() {
            return None;
        }
        Some(self.cache.get_or_insert_with(base, || {
            let break_conditions = match base.kind() {
                TypeKind::Plan => &self.plan_break_conditions,
                _ => &self.step_break_conditions,
            };
            let mut members = base.members();
            for synthetic in [break_conditions, &self.description] {
                if members.iter().all(|m| m.name() != synthetic.name()) {
                    members.push(synthetic.clone());
                }
            }
            let forwarded: MemberRef = self.forwarded.clone();
            if members.iter().all(|m| m.name() != forwarded.name()) {
                members.push(forwarded);
            }
            Arc::new(StepTypeData::new(base, members))
        }))
    }
}

impl StackedTypeDataProvider for DynamicMemberTypeDataProvider {
    fn priority(&self) -> f64 {
        Self::PRIORITY
    }

    fn type_of_object(&self, obj: &ObjectRef, next: ProviderStack<'_>) -> Option<TypeRef> {
        let composed = self.compose(&next.type_of(obj))?;
        if self.forwarded.members_of(obj).is_empty() {
            return Some(composed);
        }
        Some(Arc::new(StepInstanceTypeData {
            inner: composed,
            instance: Arc::downgrade(obj),
            forwarded: self.forwarded.clone(),
            validator: self.validator.clone(),
        }))
    }

    fn type_by_name(&self, name: &str, next: ProviderStack<'_>) -> Option<TypeRef> {
        let base = next.type_by_name(name)?;
        match self.compose(&base) {
            Some(composed) => Some(composed),
            None => Some(base),
        }
    }
}
