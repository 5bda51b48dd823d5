use alloc::boxed::Box;
use alloc::format;
use alloc::string::ToString;
use alloc::sync::Arc;
use alloc::vec::Vec;

use log::debug;
use owo_colors::OwoColorize;
use stepmeta_core::{
    DEFAULT_GROUP_SEPARATOR, MemberData, MemberRef, ObjectRef, TypeData, TypeRef, TypeRegistry,
};

use crate::{
    BaseTypeProvider, DeepCloner, DynamicMemberTypeDataProvider, HierarchyValidator, NoValidation,
    ParameterMember, ProviderStack, ReflectError, Removal, StackedTypeDataProvider, ValueCloner,
    as_parameter, prune_parameters,
};

/// Entry point for type lookups and parameterization.
///
/// Holds the provider chain, which always includes the provider adding
/// dynamic members to step types.
///
/// ```
/// use stepmeta_reflect::Reflector;
///
/// let reflector = Reflector::new();
/// assert!(reflector.type_by_name("DoesNotExist").is_none());
/// ```
pub struct Reflector {
    base: Box<dyn BaseTypeProvider>,
    providers: Vec<Arc<dyn StackedTypeDataProvider>>,
    dynamic: Arc<DynamicMemberTypeDataProvider>,
    cloner: Arc<dyn ValueCloner>,
    separator: char,
}

impl Default for Reflector {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Reflector {
    /// A reflector using declared types, deep cloning and no hierarchy validation
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a builder for Reflector
    pub fn builder() -> ReflectorBuilder {
        ReflectorBuilder::default()
    }

    fn stack(&self) -> ProviderStack<'_> {
        ProviderStack::new(&self.providers, self.base.as_ref())
    }

    /// The descriptor of `obj`, as seen through the whole provider chain
    pub fn type_of(&self, obj: &ObjectRef) -> TypeRef {
        self.stack().type_of(obj)
    }

    /// The descriptor of the type called `name`
    pub fn type_by_name(&self, name: &str) -> Option<TypeRef> {
        self.stack().type_by_name(name)
    }

    /// The separator splitting parameter names into group path and label
    pub fn group_separator(&self) -> char {
        self.separator
    }

    /// The provider adding dynamic members to step types
    pub fn dynamic_provider(&self) -> &Arc<DynamicMemberTypeDataProvider> {
        &self.dynamic
    }

    /// Members attached to `obj` at runtime, without validation
    pub fn dynamic_members_of(&self, obj: &ObjectRef) -> Vec<MemberRef> {
        self.dynamic.forwarded().members_of(obj)
    }

    /// Attaches `member` to `obj`.
    ///
    /// Fails with [`ReflectError::NameCollision`] when a member with the same
    /// name is already attached.
    pub fn add_dynamic_member(
        &self,
        obj: &ObjectRef,
        member: MemberRef,
    ) -> Result<(), ReflectError> {
        let mut members = self.dynamic_members_of(obj);
        if let Some(existing) = members.iter().find(|m| m.name() == member.name()) {
            return Err(ReflectError::NameCollision {
                name: member.name().to_string(),
                existing_type: existing.declaring_type().to_string(),
            });
        }
        members.push(member);
        self.dynamic.forwarded().set_members_of(obj, members);
        Ok(())
    }

    /// Detaches `member` from `obj`, returning whether it was attached
    pub fn remove_dynamic_member(&self, obj: &ObjectRef, member: &MemberRef) -> bool {
        let mut members = self.dynamic_members_of(obj);
        let before = members.len();
        members.retain(|m| !Arc::ptr_eq(m, member));
        if members.len() == before {
            return false;
        }
        self.dynamic.forwarded().set_members_of(obj, members);
        true
    }

    /// Exposes `member` of `source` on `target` as the parameter `name`.
    ///
    /// Creates the parameter when `target` has no member called `name`, and
    /// adds the pair to it when it is already a parameter. Nothing changes on
    /// error.
    pub fn parameterize(
        &self,
        member: &MemberRef,
        target: &ObjectRef,
        source: &ObjectRef,
        name: &str,
    ) -> Result<Arc<ParameterMember>, ReflectError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ReflectError::invalid("name", "must not be empty"));
        }

        let source_type = self.type_of(source);
        if !source_type.members().iter().any(|m| Arc::ptr_eq(m, member)) {
            return Err(ReflectError::invalid(
                "member",
                format!("'{}' is not a member of {}", member.name(), source_type.name()),
            ));
        }
        if !member.is_parameterizable() {
            return Err(ReflectError::invalid(
                "member",
                format!("'{}' cannot be parameterized", member.name()),
            ));
        }

        let target_type = self.type_of(target);
        if !target_type.kind().is_step_like() {
            return Err(ReflectError::invalid(
                "target",
                format!("{} cannot hold parameters", target_type.name()),
            ));
        }

        if let Some(existing) = target_type.member(name) {
            return match as_parameter(&existing) {
                Some(parameter) if parameter.is_attached_to(target) => {
                    parameter.add_additional_member(source, member)?;
                    debug!(
                        "parameter {} now aggregates {} pairs",
                        name.yellow(),
                        parameter.parameterized_members().len()
                    );
                    Ok(parameter)
                }
                _ => Err(ReflectError::NameCollision {
                    name: name.to_string(),
                    existing_type: existing.declaring_type().to_string(),
                }),
            };
        }

        let parameter = Arc::new(ParameterMember::new(
            target,
            source,
            member,
            name,
            self.separator,
            self.cloner.clone(),
        ));
        let mut members = self.dynamic_members_of(target);
        members.push(parameter.clone());
        self.dynamic.forwarded().set_members_of(target, members);
        debug!(
            "parameterized {}.{} as {} on {}",
            source_type.name().blue(),
            member.name(),
            name.yellow(),
            target_type.name().blue()
        );
        Ok(parameter)
    }

    /// Stops `parameter` from aggregating `member` of `source`.
    ///
    /// When that was the last pair, the parameter is detached from its target
    /// and [`Removal::Emptied`] is returned.
    pub fn unparameterize(
        &self,
        parameter: &MemberRef,
        member: &MemberRef,
        source: &ObjectRef,
    ) -> Result<Removal, ReflectError> {
        let Some(param) = as_parameter(parameter) else {
            return Err(ReflectError::NotAParameter {
                member: parameter.name().to_string(),
            });
        };
        let Some(target) = param.target() else {
            return Err(ReflectError::ArgumentMissing { argument: "target" });
        };

        let removal = param.remove_member(member, source);
        if removal == Removal::Emptied {
            self.remove_dynamic_member(&target, parameter);
            debug!("removed the last pair of {}, detached", param.name().yellow());
        }
        Ok(removal)
    }

    /// The parameter on `target` aggregating `member` of `source`, if any
    pub fn get_parameter(
        &self,
        member: &MemberRef,
        target: &ObjectRef,
        source: &ObjectRef,
    ) -> Option<Arc<ParameterMember>> {
        self.parameters_of(target)
            .into_iter()
            .find(|p| p.contains_member(member, source))
    }

    /// Parameters attached to `target`, in attachment order
    pub fn parameters_of(&self, target: &ObjectRef) -> Vec<Arc<ParameterMember>> {
        self.dynamic_members_of(target)
            .iter()
            .filter_map(as_parameter)
            .collect()
    }

    /// Drops parameter pairs whose source object is gone, detaching the
    /// parameters left empty. Returns the number of pairs dropped.
    pub fn prune_parameters(&self, target: &ObjectRef) -> usize {
        let mut members = self.dynamic_members_of(target);
        let before = members.len();
        let dropped = prune_parameters(&mut members, |_, _| true);
        if dropped > 0 || members.len() != before {
            self.dynamic.forwarded().set_members_of(target, members);
        }
        dropped
    }
}

/// Builder for [`Reflector`]
pub struct ReflectorBuilder {
    base: Box<dyn BaseTypeProvider>,
    providers: Vec<Arc<dyn StackedTypeDataProvider>>,
    cloner: Arc<dyn ValueCloner>,
    validator: Arc<dyn HierarchyValidator>,
    separator: char,
}

impl Default for ReflectorBuilder {
    fn default() -> Self {
        Self {
            base: Box::new(TypeRegistry::new()),
            providers: Vec::new(),
            cloner: Arc::new(DeepCloner),
            validator: Arc::new(NoValidation),
            separator: DEFAULT_GROUP_SEPARATOR,
        }
    }
}

impl ReflectorBuilder {
    /// Sets the provider of declared types. Defaults to an empty [`TypeRegistry`],
    /// which answers object lookups from [`stepmeta_core::Object::type_data`].
    pub fn base(mut self, base: impl BaseTypeProvider + 'static) -> Self {
        self.base = Box::new(base);
        self
    }

    /// Adds a stacked provider. Providers are ordered by descending priority.
    pub fn provider(mut self, provider: Arc<dyn StackedTypeDataProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Sets the cloner producing the value written to each parameterized member
    pub fn cloner(mut self, cloner: impl ValueCloner + 'static) -> Self {
        self.cloner = Arc::new(cloner);
        self
    }

    /// Sets the hook run before an instance's member list is handed out
    pub fn validator(mut self, validator: impl HierarchyValidator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    /// Sets the separator splitting parameter names into group path and label
    pub fn group_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Builds the Reflector
    pub fn build(self) -> Reflector {
        let dynamic = Arc::new(DynamicMemberTypeDataProvider::new(self.validator));
        let mut providers = self.providers;
        providers.push(dynamic.clone());
        // stable, so equal priorities keep insertion order
        providers.sort_by(|a, b| b.priority().total_cmp(&a.priority()));
        Reflector {
            base: self.base,
            providers,
            dynamic,
            cloner: self.cloner,
            separator: self.separator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepmeta_core::MemberAttribute;
    use stepmeta_testhelpers::fixtures::{self, StepFixture};
    use stepmeta_testhelpers::test;

    struct Fixed(f64);

    impl StackedTypeDataProvider for Fixed {
        fn priority(&self) -> f64 {
            self.0
        }

        fn type_of_object(&self, _obj: &ObjectRef, _next: ProviderStack<'_>) -> Option<TypeRef> {
            None
        }

        fn type_by_name(&self, _name: &str, _next: ProviderStack<'_>) -> Option<TypeRef> {
            None
        }
    }

    #[test]
    fn providers_are_ordered_by_descending_priority() {
        let reflector = Reflector::builder()
            .provider(Arc::new(Fixed(-5.0)))
            .provider(Arc::new(Fixed(10.0)))
            .build();
        let priorities: Vec<f64> = reflector.providers.iter().map(|p| p.priority()).collect();
        assert_eq!(
            priorities,
            vec![10.0, DynamicMemberTypeDataProvider::PRIORITY, -5.0]
        );
    }

    #[test]
    fn the_group_separator_is_configurable() {
        let reflector = Reflector::builder()
            .base(fixtures::registry())
            .group_separator('/')
            .build();
        let plan = StepFixture::plan().into_object();
        let delay = StepFixture::delay().into_object();
        let secs = delay.type_data().member("DelaySecs").unwrap();

        let param = reflector.parameterize(&secs, &plan, &delay, "Timing/Delay")?;
        let display = param.display().unwrap();
        assert_eq!(display.name, "Delay");
        assert_eq!(display.groups, vec!["Timing".to_string()]);
    }

    #[test]
    fn dynamic_members_cannot_share_a_name() {
        let reflector = Reflector::new();
        let delay = StepFixture::delay().into_object();
        let member = |name: &str| -> MemberRef {
            Arc::new(
                crate::DynamicMember::builder(name, stepmeta_core::ValueType::Int)
                    .attribute(MemberAttribute::Hidden)
                    .build(),
            )
        };
        let first = member("Extra");
        reflector.add_dynamic_member(&delay, first.clone())?;
        assert!(matches!(
            reflector.add_dynamic_member(&delay, member("Extra")),
            Err(ReflectError::NameCollision { .. })
        ));
        assert!(reflector.remove_dynamic_member(&delay, &first));
        assert!(!reflector.remove_dynamic_member(&delay, &first));
        assert!(reflector.dynamic_members_of(&delay).is_empty());
    }
}
