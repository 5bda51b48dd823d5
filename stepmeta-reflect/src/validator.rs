use alloc::vec::Vec;

use log::debug;
use owo_colors::OwoColorize;
use stepmeta_core::{MemberData, MemberRef, ObjectRef};

use crate::as_parameter;

/// Hook called before an instance's member list is handed out.
///
/// `members` holds the dynamic members currently attached to `instance`. The
/// validator may remove entries, typically parameters whose sources left the
/// hierarchy. Any change is written back to the instance.
///
/// Implementations must not resolve the type of `instance` through the same
/// reflector, since that would call the validator again.
pub trait HierarchyValidator: Send + Sync {
    /// Brings `members` up to date with the hierarchy around `instance`
    fn validate(&self, instance: &ObjectRef, members: &mut Vec<MemberRef>);
}

impl<F> HierarchyValidator for F
where
    F: Fn(&ObjectRef, &mut Vec<MemberRef>) + Send + Sync,
{
    fn validate(&self, instance: &ObjectRef, members: &mut Vec<MemberRef>) {
        self(instance, members)
    }
}

/// Leaves every member list as it is
#[derive(Clone, Copy, Debug, Default)]
pub struct NoValidation;

impl HierarchyValidator for NoValidation {
    fn validate(&self, _instance: &ObjectRef, _members: &mut Vec<MemberRef>) {}
}

/// Drops parameter pairs whose source is gone or rejected by `keep`, then
/// drops the parameters left without pairs from `members`.
///
/// Meant to be called from a [`HierarchyValidator`], with `keep` deciding
/// whether a source is still part of the instance's hierarchy. Returns the
/// number of pairs dropped.
pub fn prune_parameters(
    members: &mut Vec<MemberRef>,
    mut keep: impl FnMut(&ObjectRef, &MemberRef) -> bool,
) -> usize {
    let mut dropped = 0;
    members.retain(|member| {
        let Some(parameter) = as_parameter(member) else {
            return true;
        };
        dropped += parameter.retain_members(&mut keep);
        if parameter.is_empty() {
            debug!("detaching emptied parameter {}", parameter.name().yellow());
            return false;
        }
        true
    });
    dropped
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc;
    use stepmeta_core::ValueType;
    use stepmeta_testhelpers::fixtures::StepFixture;
    use stepmeta_testhelpers::test;

    use crate::{DeepCloner, DynamicMember, ParameterMember};

    #[test]
    fn pruning_drops_pairs_and_emptied_parameters() {
        let plan = StepFixture::plan().into_object();
        let kept = StepFixture::delay().into_object();
        let gone = StepFixture::delay().into_object();
        let secs = kept.type_data().member("DelaySecs").unwrap();

        let both = Arc::new(ParameterMember::new(
            &plan,
            &kept,
            &secs,
            "Both",
            '\\',
            Arc::new(DeepCloner),
        ));
        both.add_additional_member(&gone, &secs)?;
        let only_gone: MemberRef = Arc::new(ParameterMember::new(
            &plan,
            &gone,
            &secs,
            "OnlyGone",
            '\\',
            Arc::new(DeepCloner),
        ));
        let plain: MemberRef = Arc::new(DynamicMember::builder("Plain", ValueType::Int).build());
        let both_member: MemberRef = both.clone();
        let mut members = vec![both_member, only_gone, plain];

        let dropped = prune_parameters(&mut members, |source, _| !Arc::ptr_eq(source, &gone));
        assert_eq!(dropped, 2);
        assert_eq!(
            members.iter().map(|m| m.name()).collect::<Vec<_>>(),
            vec!["Both", "Plain"]
        );
        assert_eq!(both.parameterized_members().len(), 1);
        assert!(both.primary().unwrap().is(&kept, &secs));
    }

    #[test]
    fn dead_sources_are_always_dropped() {
        let plan = StepFixture::plan().into_object();
        let delay = StepFixture::delay().into_object();
        let secs = delay.type_data().member("DelaySecs").unwrap();
        let param: MemberRef = Arc::new(ParameterMember::new(
            &plan,
            &delay,
            &secs,
            "Delay",
            '\\',
            Arc::new(DeepCloner),
        ));
        let mut members = vec![param];
        drop(delay);

        assert_eq!(prune_parameters(&mut members, |_, _| true), 1);
        assert!(members.is_empty());
    }
}
