use std::sync::Arc;

use stepmeta::{
    MemberData, MemberError, MemberRef, ObjectRef, ParameterMember, ReflectError, Reflector, Removal, Value,
    prune_parameters,
};
use stepmeta_testhelpers::fixtures::{self, StepFixture};
use stepmeta_testhelpers::test;

fn reflector() -> Reflector {
    Reflector::builder().base(fixtures::registry()).build()
}

fn member(obj: &ObjectRef, name: &str) -> MemberRef {
    obj.type_data().member(name).unwrap()
}

fn as_member(parameter: &Arc<ParameterMember>) -> MemberRef {
    parameter.clone()
}

#[test]
fn removing_the_last_pair_detaches_the_parameter() {
    let reflector = reflector();
    let plan = StepFixture::plan().into_object();
    let delay = StepFixture::delay().into_object();
    let secs = member(&delay, "DelaySecs");

    let param = reflector.parameterize(&secs, &plan, &delay, "Delay")?;
    assert_eq!(param.parameterized_members().len(), 1);
    assert!(reflector.type_of(&plan).member("Delay").is_some());

    let removal = reflector.unparameterize(&as_member(&param), &secs, &delay)?;
    assert_eq!(removal, Removal::Emptied);
    assert!(reflector.type_of(&plan).member("Delay").is_none());
    assert!(reflector.parameters_of(&plan).is_empty());
}

#[test]
fn parameterizing_the_same_pair_twice_fails() {
    let reflector = reflector();
    let plan = StepFixture::plan().into_object();
    let delay = StepFixture::delay().into_object();
    let secs = member(&delay, "DelaySecs");

    reflector.parameterize(&secs, &plan, &delay, "Delay")?;
    let err = reflector
        .parameterize(&secs, &plan, &delay, "Delay")
        .unwrap_err();
    assert!(matches!(err, ReflectError::DuplicateParameterMember { .. }));
    assert_eq!(reflector.parameters_of(&plan).len(), 1);
}

#[test]
fn the_value_comes_from_the_first_pair() {
    let reflector = reflector();
    let plan = StepFixture::plan().into_object();
    let a = StepFixture::delay().into_object();
    let b = StepFixture::delay().into_object();
    let secs = member(&a, "DelaySecs");
    secs.set_value(&a, Value::Float(1.0))?;
    secs.set_value(&b, Value::Float(2.0))?;

    let first = reflector.parameterize(&secs, &plan, &a, "Delay")?;
    let second = reflector.parameterize(&secs, &plan, &b, "Delay")?;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.parameterized_members().len(), 2);

    let through_type = reflector.type_of(&plan).member("Delay").unwrap();
    assert_eq!(through_type.get_value(&plan)?, Value::Float(1.0));
}

#[test]
fn removing_the_primary_promotes_the_remaining_pair() {
    let reflector = reflector();
    let plan = StepFixture::plan().into_object();
    let a = StepFixture::delay().into_object();
    let b = StepFixture::delay().into_object();
    let secs = member(&a, "DelaySecs");
    secs.set_value(&a, Value::Float(1.0))?;
    secs.set_value(&b, Value::Float(2.0))?;

    let param = reflector.parameterize(&secs, &plan, &a, "Delay")?;
    reflector.parameterize(&secs, &plan, &b, "Delay")?;

    let removal = reflector.unparameterize(&as_member(&param), &secs, &a)?;
    assert_eq!(removal, Removal::Retained);
    assert_eq!(param.parameterized_members().len(), 1);
    assert!(param.primary().unwrap().is(&b, &secs));
    assert_eq!(param.get_value(&plan)?, Value::Float(2.0));
    assert!(reflector.get_parameter(&secs, &plan, &a).is_none());
    assert!(reflector.get_parameter(&secs, &plan, &b).is_some());
}

#[test]
fn writes_reach_every_member_until_one_rejects_the_value() {
    let reflector = reflector();
    let plan = StepFixture::plan().into_object();
    let a = StepFixture::delay().into_object();
    let b = StepFixture::delay().into_object();
    let log = StepFixture::log().into_object();
    let secs = member(&a, "DelaySecs");
    let message = member(&log, "Message");

    let param = reflector.parameterize(&secs, &plan, &a, "Delay")?;
    reflector.parameterize(&secs, &plan, &b, "Delay")?;
    param.set_value(&plan, Value::Float(0.5))?;
    assert_eq!(secs.get_value(&a)?, Value::Float(0.5));
    assert_eq!(secs.get_value(&b)?, Value::Float(0.5));

    // text accepts the converted number; a list does not convert
    reflector.parameterize(&message, &plan, &log, "Delay")?;
    param.set_value(&plan, Value::Float(1.5))?;
    assert_eq!(message.get_value(&log)?, Value::Text("1.5".into()));

    let err = param
        .set_value(&plan, Value::List(vec![Value::Float(3.0)]))
        .unwrap_err();
    assert!(matches!(err, MemberError::TypeMismatch { .. }));
    assert_eq!(secs.get_value(&a)?, Value::Float(1.5));
}

#[test]
fn a_mismatch_midway_keeps_earlier_writes() {
    let reflector = reflector();
    let plan = StepFixture::plan().into_object();
    let a = StepFixture::delay().into_object();
    let log = StepFixture::log().into_object();
    let b = StepFixture::delay().into_object();
    let secs = member(&a, "DelaySecs");
    let count = member(&log, "Count");

    let param = reflector.parameterize(&secs, &plan, &a, "Delay")?;
    reflector.parameterize(&count, &plan, &log, "Delay")?;
    reflector.parameterize(&secs, &plan, &b, "Delay")?;

    let err = param.set_value(&plan, Value::Float(2.5)).unwrap_err();
    assert_eq!(
        err,
        MemberError::TypeMismatch {
            member: "Count".into(),
            expected: stepmeta::ValueType::Int,
            actual: "float",
        }
    );
    assert_eq!(secs.get_value(&a)?, Value::Float(2.5));
    assert_eq!(count.get_value(&log)?, Value::Int(0));
    assert_eq!(secs.get_value(&b)?, Value::Float(0.0));
}

#[test]
fn non_parameterizable_members_are_refused() {
    let reflector = reflector();
    let plan = StepFixture::plan().into_object();
    let log = StepFixture::log().into_object();
    let verbosity = member(&log, "Verbosity");
    let before = reflector.type_of(&plan).members().len();

    let err = reflector
        .parameterize(&verbosity, &plan, &log, "Verbosity")
        .unwrap_err();
    assert!(matches!(
        err,
        ReflectError::ArgumentInvalid {
            argument: "member",
            ..
        }
    ));
    assert!(reflector.dynamic_members_of(&plan).is_empty());
    assert_eq!(reflector.type_of(&plan).members().len(), before);
}

#[test]
fn invalid_arguments_are_reported() {
    let reflector = reflector();
    let plan = StepFixture::plan().into_object();
    let delay = StepFixture::delay().into_object();
    let log = StepFixture::log().into_object();
    let instrument = StepFixture::instrument().into_object();
    let secs = member(&delay, "DelaySecs");

    assert!(matches!(
        reflector.parameterize(&secs, &plan, &delay, "  "),
        Err(ReflectError::ArgumentInvalid { argument: "name", .. })
    ));
    assert!(matches!(
        reflector.parameterize(&secs, &plan, &log, "Delay"),
        Err(ReflectError::ArgumentInvalid {
            argument: "member",
            ..
        })
    ));
    assert!(matches!(
        reflector.parameterize(&secs, &instrument, &delay, "Delay"),
        Err(ReflectError::ArgumentInvalid {
            argument: "target",
            ..
        })
    ));
    assert!(reflector.dynamic_members_of(&plan).is_empty());
}

#[test]
fn names_taken_by_other_members_collide() {
    let reflector = reflector();
    let plan = StepFixture::plan().into_object();
    let delay = StepFixture::delay().into_object();
    let secs = member(&delay, "DelaySecs");

    let err = reflector
        .parameterize(&secs, &plan, &delay, "Name")
        .unwrap_err();
    assert_eq!(
        err,
        ReflectError::NameCollision {
            name: "Name".into(),
            existing_type: "TestPlan".into(),
        }
    );
    assert!(matches!(
        reflector.parameterize(&secs, &plan, &delay, "BreakConditions"),
        Err(ReflectError::NameCollision { .. })
    ));
}

#[test]
fn only_parameters_can_be_unparameterized() {
    let reflector = reflector();
    let delay = StepFixture::delay().into_object();
    let secs = member(&delay, "DelaySecs");
    assert!(matches!(
        reflector.unparameterize(&secs, &secs, &delay),
        Err(ReflectError::NotAParameter { .. })
    ));
}

#[test]
fn a_dropped_target_is_a_missing_argument() {
    let reflector = reflector();
    let plan = StepFixture::plan().into_object();
    let delay = StepFixture::delay().into_object();
    let secs = member(&delay, "DelaySecs");
    let param = reflector.parameterize(&secs, &plan, &delay, "Delay")?;
    drop(plan);

    assert_eq!(
        reflector.unparameterize(&as_member(&param), &secs, &delay),
        Err(ReflectError::ArgumentMissing { argument: "target" })
    );
}

#[test]
fn parameter_names_carry_display_groups() {
    let reflector = reflector();
    let plan = StepFixture::plan().into_object();
    let delay = StepFixture::delay().into_object();
    let secs = member(&delay, "DelaySecs");

    let param = reflector.parameterize(&secs, &plan, &delay, r"Timing \ Waits \ Delay")?;
    let display = param.display().unwrap();
    assert_eq!(display.name, "Delay");
    assert_eq!(display.groups, vec!["Timing".to_string(), "Waits".to_string()]);
    assert_eq!(display.description.as_deref(), Some("Seconds to wait"));
    assert_eq!(param.name(), r"Timing \ Waits \ Delay");
}

#[test]
fn the_validator_drops_pairs_whose_source_left_the_hierarchy() {
    let reflector = Reflector::builder()
        .base(fixtures::registry())
        .validator(|instance: &ObjectRef, members: &mut Vec<MemberRef>| {
            let Some(parent) = StepFixture::of(instance) else {
                return;
            };
            prune_parameters(members, |source, _| parent.contains(source));
        })
        .build();
    let plan_fixture = StepFixture::plan();
    let plan = plan_fixture.clone().into_object();
    let a = StepFixture::delay().into_object();
    let b = StepFixture::delay().into_object();
    plan_fixture.add_child(a.clone());
    plan_fixture.add_child(b.clone());
    let secs = member(&a, "DelaySecs");

    reflector.parameterize(&secs, &plan, &a, "Delay")?;
    let param = reflector.parameterize(&secs, &plan, &b, "Delay")?;
    assert_eq!(param.parameterized_members().len(), 2);

    plan_fixture.remove_child(&b);
    assert!(reflector.type_of(&plan).member("Delay").is_some());
    assert_eq!(param.parameterized_members().len(), 1);
    assert!(param.primary().unwrap().is(&a, &secs));

    plan_fixture.remove_child(&a);
    assert!(reflector.type_of(&plan).member("Delay").is_none());
    assert!(reflector.dynamic_members_of(&plan).is_empty());
}

#[test]
fn pruning_forgets_dropped_sources() {
    let reflector = reflector();
    let plan = StepFixture::plan().into_object();
    let a = StepFixture::delay().into_object();
    let b = StepFixture::delay().into_object();
    let secs = member(&a, "DelaySecs");
    let param = reflector.parameterize(&secs, &plan, &a, "Delay")?;
    reflector.parameterize(&secs, &plan, &b, "Delay")?;

    drop(a);
    assert_eq!(reflector.prune_parameters(&plan), 1);
    assert!(param.primary().unwrap().is(&b, &secs));

    drop(b);
    assert_eq!(reflector.prune_parameters(&plan), 1);
    assert!(reflector.parameters_of(&plan).is_empty());
}
