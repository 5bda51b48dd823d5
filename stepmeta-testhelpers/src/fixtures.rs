//! Objects with declared types, standing in for a real step hierarchy.
//!
//! | fixture        | type           | kind    | members                                  |
//! |----------------|----------------|---------|------------------------------------------|
//! | `delay()`      | `DelayStep`    | step    | `Name`, `DelaySecs`                      |
//! | `log()`        | `LogStep`      | step    | `Name`, `Message`, `Count`, `Verbosity`  |
//! | `sequence()`   | `SequenceStep` | step    | `Name`, `Iterations`                     |
//! | `plan()`       | `TestPlan`     | plan    | `Name`                                   |
//! | `instrument()` | `Instrument`   | plain   | `Address`                                |
//!
//! `native_sequence()` is a sequence that stores break conditions,
//! description and dynamic members in its own fields. `Verbosity` is not
//! parameterizable.

use core::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use stepmeta_core::{
    BreakConditionField, BreakConditions, DescriptionField, DisplayAttribute, DynamicMemberField,
    MemberAttribute, MemberRef, Object, ObjectRef, StaticMember, StaticMemberBuilder, StructType,
    TypeKind, TypeRef, TypeRegistry, Value, ValueType,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn field(name: &'static str, value_type: ValueType) -> StaticMemberBuilder {
    StaticMember::builder(name, value_type)
        .getter(move |step: &StepFixture| step.field(name))
        .setter(move |step: &StepFixture, value| step.set_field(name, value))
}

static STEP_BASE: LazyLock<TypeRef> = LazyLock::new(|| {
    StructType::builder("StepBase")
        .kind(TypeKind::Step)
        .member(
            field("Name", ValueType::Text).attribute(MemberAttribute::Display(
                DisplayAttribute::new("Step Name").order(-1.0),
            )),
        )
        .build()
});

static DELAY: LazyLock<TypeRef> = LazyLock::new(|| {
    StructType::builder("DelayStep")
        .kind(TypeKind::Step)
        .base(STEP_BASE.clone())
        .member(
            field("DelaySecs", ValueType::Float).attribute(MemberAttribute::Display(
                DisplayAttribute::new("Time Delay")
                    .description("Seconds to wait")
                    .order(2.0),
            )),
        )
        .build()
});

static LOG: LazyLock<TypeRef> = LazyLock::new(|| {
    StructType::builder("LogStep")
        .kind(TypeKind::Step)
        .base(STEP_BASE.clone())
        .member(field("Message", ValueType::Text))
        .member(field("Count", ValueType::Int))
        .member(field("Verbosity", ValueType::Int).attribute(MemberAttribute::NonParameterizable))
        .build()
});

static SEQUENCE: LazyLock<TypeRef> = LazyLock::new(|| {
    StructType::builder("SequenceStep")
        .kind(TypeKind::Step)
        .base(STEP_BASE.clone())
        .member(field("Iterations", ValueType::Int))
        .build()
});

static PLAN: LazyLock<TypeRef> = LazyLock::new(|| {
    StructType::builder("TestPlan")
        .kind(TypeKind::Plan)
        .member(field("Name", ValueType::Text))
        .build()
});

static INSTRUMENT: LazyLock<TypeRef> = LazyLock::new(|| {
    StructType::builder("Instrument")
        .member(field("Address", ValueType::Text))
        .build()
});

/// Registry holding every fixture type
pub fn registry() -> TypeRegistry {
    TypeRegistry::new()
        .with(STEP_BASE.clone())
        .with(DELAY.clone())
        .with(LOG.clone())
        .with(SEQUENCE.clone())
        .with(PLAN.clone())
        .with(INSTRUMENT.clone())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Delay,
    Log,
    Sequence,
    Plan,
    Instrument,
}

#[derive(Default)]
struct NativeFields {
    break_conditions: Mutex<BreakConditions>,
    description: Mutex<String>,
    dynamic_members: Mutex<Vec<MemberRef>>,
}

impl BreakConditionField for NativeFields {
    fn break_conditions(&self) -> BreakConditions {
        *lock(&self.break_conditions)
    }

    fn set_break_conditions(&self, conditions: BreakConditions) {
        *lock(&self.break_conditions) = conditions;
    }
}

impl DescriptionField for NativeFields {
    fn description(&self) -> String {
        lock(&self.description).clone()
    }

    fn set_description(&self, description: String) {
        *lock(&self.description) = description;
    }
}

impl DynamicMemberField for NativeFields {
    fn dynamic_members(&self) -> Vec<MemberRef> {
        lock(&self.dynamic_members).clone()
    }

    fn set_dynamic_members(&self, members: Vec<MemberRef>) {
        *lock(&self.dynamic_members) = members;
    }
}

/// A step, plan or instrument with a declared type and child steps
pub struct StepFixture {
    kind: Kind,
    fields: Mutex<BTreeMap<&'static str, Value>>,
    children: Mutex<Vec<ObjectRef>>,
    native: Option<NativeFields>,
}

impl StepFixture {
    fn new(kind: Kind, native: bool) -> Arc<Self> {
        let mut fields = BTreeMap::new();
        let name = match kind {
            Kind::Delay => "Delay",
            Kind::Log => "Log",
            Kind::Sequence => "Sequence",
            Kind::Plan => "Plan",
            Kind::Instrument => "",
        };
        match kind {
            Kind::Delay => {
                fields.insert("DelaySecs", Value::Float(0.0));
            }
            Kind::Log => {
                fields.insert("Message", Value::Text(String::new()));
                fields.insert("Count", Value::Int(0));
                fields.insert("Verbosity", Value::Int(0));
            }
            Kind::Sequence => {
                fields.insert("Iterations", Value::Int(1));
            }
            Kind::Plan => {}
            Kind::Instrument => {
                fields.insert("Address", Value::Text("GPIB0::1".into()));
            }
        }
        if kind != Kind::Instrument {
            fields.insert("Name", Value::Text(name.into()));
        }
        Arc::new(Self {
            kind,
            fields: Mutex::new(fields),
            children: Mutex::new(Vec::new()),
            native: native.then(NativeFields::default),
        })
    }

    /// A `DelayStep`
    pub fn delay() -> Arc<Self> {
        Self::new(Kind::Delay, false)
    }

    /// A `LogStep`
    pub fn log() -> Arc<Self> {
        Self::new(Kind::Log, false)
    }

    /// A `SequenceStep`
    pub fn sequence() -> Arc<Self> {
        Self::new(Kind::Sequence, false)
    }

    /// A `SequenceStep` with native break condition, description and dynamic member fields
    pub fn native_sequence() -> Arc<Self> {
        Self::new(Kind::Sequence, true)
    }

    /// A `TestPlan`
    pub fn plan() -> Arc<Self> {
        Self::new(Kind::Plan, false)
    }

    /// An `Instrument`, which is not a step
    pub fn instrument() -> Arc<Self> {
        Self::new(Kind::Instrument, false)
    }

    /// Upcasts to an object handle
    pub fn into_object(self: Arc<Self>) -> ObjectRef {
        self
    }

    /// Downcasts an object handle created by this module
    pub fn of(obj: &ObjectRef) -> Option<&StepFixture> {
        obj.as_any().downcast_ref::<StepFixture>()
    }

    /// Current value of a declared field
    pub fn field(&self, name: &str) -> Value {
        lock(&self.fields).get(name).cloned().unwrap_or_default()
    }

    /// Overwrites a declared field
    pub fn set_field(&self, name: &'static str, value: Value) {
        lock(&self.fields).insert(name, value);
    }

    /// Appends a child step
    pub fn add_child(&self, child: ObjectRef) {
        lock(&self.children).push(child);
    }

    /// Removes a child step, returning whether it was present
    pub fn remove_child(&self, child: &ObjectRef) -> bool {
        let mut children = lock(&self.children);
        let before = children.len();
        children.retain(|c| !Arc::ptr_eq(c, child));
        children.len() != before
    }

    /// Child steps, in order
    pub fn children(&self) -> Vec<ObjectRef> {
        lock(&self.children).clone()
    }

    /// Whether `obj` is this step or one of its descendants
    pub fn contains(&self, obj: &ObjectRef) -> bool {
        core::ptr::addr_eq(self as *const Self, Arc::as_ptr(obj))
            || self.children().iter().any(|child| {
                Arc::ptr_eq(child, obj) || Self::of(child).is_some_and(|c| c.contains(obj))
            })
    }

    /// Break conditions held in the native field, if there is one
    pub fn native_break_conditions(&self) -> Option<BreakConditions> {
        self.native.as_ref().map(|n| n.break_conditions())
    }

    /// Description held in the native field, if there is one
    pub fn native_description(&self) -> Option<String> {
        self.native.as_ref().map(|n| n.description())
    }

    /// Dynamic members held in the native field, if there is one
    pub fn native_dynamic_members(&self) -> Option<Vec<MemberRef>> {
        self.native.as_ref().map(|n| n.dynamic_members())
    }
}

impl Object for StepFixture {
    fn type_data(&self) -> TypeRef {
        match self.kind {
            Kind::Delay => DELAY.clone(),
            Kind::Log => LOG.clone(),
            Kind::Sequence => SEQUENCE.clone(),
            Kind::Plan => PLAN.clone(),
            Kind::Instrument => INSTRUMENT.clone(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn break_condition_field(&self) -> Option<&dyn BreakConditionField> {
        self.native.as_ref().map(|n| n as &dyn BreakConditionField)
    }

    fn description_field(&self) -> Option<&dyn DescriptionField> {
        self.native.as_ref().map(|n| n as &dyn DescriptionField)
    }

    fn dynamic_member_field(&self) -> Option<&dyn DynamicMemberField> {
        self.native.as_ref().map(|n| n as &dyn DynamicMemberField)
    }
}
