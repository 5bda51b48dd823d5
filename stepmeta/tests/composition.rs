use std::sync::Arc;

use stepmeta::{
    BreakConditionMember, BreakConditions, DynamicMember, MemberRef, ObjectRef, Reflector,
    StepInstanceTypeData, StepTypeData, TypeRef, Value, ValueType, same_type, synthetic,
};
use stepmeta_testhelpers::fixtures::{self, StepFixture};
use stepmeta_testhelpers::test;

fn reflector() -> Reflector {
    Reflector::builder().base(fixtures::registry()).build()
}

fn instance_part(ty: &TypeRef) -> &Arc<StepTypeData> {
    ty.as_any()
        .downcast_ref::<StepInstanceTypeData>()
        .expect("an instance descriptor")
        .type_data()
}

#[test]
fn composing_the_same_base_twice_gives_the_same_descriptor() {
    let reflector = reflector();
    let first = StepFixture::delay().into_object();
    let second = StepFixture::delay().into_object();

    let a = reflector.type_of(&first);
    let b = reflector.type_of(&second);
    assert!(same_type(&a, &b));
    assert!(same_type(&a, &reflector.type_by_name("DelayStep").unwrap()));
    assert!(a.as_any().is::<StepTypeData>());
}

#[test]
fn the_composed_descriptor_survives_while_its_base_lives() {
    let reflector = reflector();
    let first = reflector.type_by_name("DelayStep").unwrap();
    let weak = Arc::downgrade(&first);
    drop(first);

    let delay = StepFixture::delay().into_object();
    let again = reflector.type_of(&delay);
    assert!(std::sync::Weak::ptr_eq(&weak, &Arc::downgrade(&again)));
}

#[test]
fn instances_with_dynamic_members_share_the_type_level_part() {
    let reflector = reflector();
    let plan_a = StepFixture::plan().into_object();
    let plan_b = StepFixture::plan().into_object();
    let delay = StepFixture::delay().into_object();
    let secs = delay.type_data().member("DelaySecs").unwrap();
    reflector.parameterize(&secs, &plan_a, &delay, "A")?;
    reflector.parameterize(&secs, &plan_b, &delay, "B")?;

    let ty_a = reflector.type_of(&plan_a);
    let ty_b = reflector.type_of(&plan_b);
    assert!(!same_type(&ty_a, &ty_b));
    assert!(Arc::ptr_eq(instance_part(&ty_a), instance_part(&ty_b)));

    assert!(ty_a.member("A").is_some());
    assert!(ty_a.member("B").is_none());
    assert!(ty_b.member("B").is_some());
    assert_eq!(ty_a.name(), "TestPlan");
}

#[test]
fn plain_objects_keep_their_declared_type() {
    let reflector = reflector();
    let instrument = StepFixture::instrument().into_object();
    let ty = reflector.type_of(&instrument);
    assert!(same_type(&ty, &instrument.type_data()));
    assert!(ty.member(synthetic::BREAK_CONDITIONS).is_none());
}

#[test]
fn break_conditions_default_to_inherit_and_stay_sparse() {
    let reflector = reflector();
    let delay = StepFixture::delay().into_object();
    let bc = reflector
        .type_of(&delay)
        .member(synthetic::BREAK_CONDITIONS)
        .unwrap();
    let inherit = Value::BreakConditions(BreakConditions::INHERIT);
    assert_eq!(bc.get_value(&delay)?, inherit);

    let fail = Value::BreakConditions(BreakConditions::BREAK_ON_FAIL);
    bc.set_value(&delay, fail.clone())?;
    assert_eq!(bc.get_value(&delay)?, fail);

    let storage = bc
        .as_any()
        .downcast_ref::<BreakConditionMember>()
        .unwrap()
        .dynamic();
    assert!(storage.has_stored_value(&delay));

    bc.set_value(&delay, inherit.clone())?;
    assert_eq!(bc.get_value(&delay)?, inherit);
    assert!(!storage.has_stored_value(&delay));
}

#[test]
fn plan_and_step_break_conditions_share_storage() {
    let reflector = reflector();
    let plan = StepFixture::plan().into_object();
    let step_member = reflector
        .type_by_name("DelayStep")
        .and_then(|t| t.member(synthetic::BREAK_CONDITIONS))
        .unwrap();
    let plan_member = reflector
        .type_of(&plan)
        .member(synthetic::BREAK_CONDITIONS)
        .unwrap();
    assert!(!Arc::ptr_eq(&step_member, &plan_member));

    let pass = Value::BreakConditions(BreakConditions::BREAK_ON_PASS);
    plan_member.set_value(&plan, pass.clone())?;
    assert_eq!(step_member.get_value(&plan)?, pass);
}

#[test]
fn native_fields_are_used_directly() {
    let reflector = reflector();
    let native = StepFixture::native_sequence();
    let seq = native.clone().into_object();
    let ty = reflector.type_of(&seq);

    ty.member(synthetic::BREAK_CONDITIONS)
        .unwrap()
        .set_value(&seq, Value::BreakConditions(BreakConditions::BREAK_ON_ERROR))?;
    ty.member(synthetic::DESCRIPTION)
        .unwrap()
        .set_value(&seq, Value::Text("repeat three times".into()))?;
    assert_eq!(
        native.native_break_conditions(),
        Some(BreakConditions::BREAK_ON_ERROR)
    );
    assert_eq!(native.native_description().as_deref(), Some("repeat three times"));

    let extra: MemberRef = Arc::new(DynamicMember::builder("Extra", ValueType::Int).build());
    reflector.add_dynamic_member(&seq, extra.clone())?;
    assert_eq!(native.native_dynamic_members().map(|m| m.len()), Some(1));
    assert!(reflector.type_of(&seq).member("Extra").is_some());
}

#[test]
fn dynamic_members_shadow_declared_ones() {
    let reflector = reflector();
    let delay = StepFixture::delay().into_object();
    let shadow: MemberRef = Arc::new(
        DynamicMember::builder("DelaySecs", ValueType::Text)
            .default_value(Value::Text("later".into()))
            .build(),
    );
    reflector.add_dynamic_member(&delay, shadow.clone())?;

    let ty = reflector.type_of(&delay);
    let secs = ty.member("DelaySecs").unwrap();
    assert!(Arc::ptr_eq(&secs, &shadow));
    assert_eq!(secs.get_value(&delay)?, Value::Text("later".into()));
    assert_eq!(
        ty.members()
            .iter()
            .filter(|m| m.name() == "DelaySecs")
            .count(),
        1
    );
}

#[test]
fn dynamic_values_do_not_outlive_their_owner() {
    let reflector = reflector();
    let member = Arc::new(
        DynamicMember::builder("Tag", ValueType::Text)
            .default_value(Value::Text(String::new()))
            .build(),
    );
    let delay: ObjectRef = StepFixture::delay().into_object();
    let as_ref: MemberRef = member.clone();
    reflector.add_dynamic_member(&delay, as_ref.clone())?;
    as_ref.set_value(&delay, Value::Text("slow".into()))?;
    assert_eq!(member.stored_owner_count(), 1);

    as_ref.set_value(&delay, Value::Text(String::new()))?;
    assert!(!member.has_stored_value(&delay));

    as_ref.set_value(&delay, Value::Text("again".into()))?;
    drop(delay);
    assert_eq!(member.stored_owner_count(), 0);
}
