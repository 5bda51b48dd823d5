//! The chain of type descriptor providers.
//!
//! Lookups start at the highest priority [`StackedTypeDataProvider`]. Each
//! provider receives the rest of the chain as a [`ProviderStack`] and either
//! answers (usually by wrapping what the rest of the chain returns) or passes.
//! The chain always ends at a [`BaseTypeProvider`].

use alloc::sync::Arc;

use stepmeta_core::{ObjectRef, TypeRef, TypeRegistry};

/// Produces declared types. The last link of every provider chain.
pub trait BaseTypeProvider: Send + Sync {
    /// The declared type of `obj`
    fn type_of(&self, obj: &ObjectRef) -> TypeRef;

    /// The declared type called `name`
    fn type_by_name(&self, name: &str) -> Option<TypeRef>;
}

impl BaseTypeProvider for TypeRegistry {
    fn type_of(&self, obj: &ObjectRef) -> TypeRef {
        obj.type_data()
    }

    fn type_by_name(&self, name: &str) -> Option<TypeRef> {
        self.get(name)
    }
}

/// A provider that can augment the descriptors produced further down the chain.
pub trait StackedTypeDataProvider: Send + Sync {
    /// Providers with a higher priority are asked first
    fn priority(&self) -> f64;

    /// The descriptor for `obj`, or `None` to let the rest of the chain answer
    fn type_of_object(&self, obj: &ObjectRef, next: ProviderStack<'_>) -> Option<TypeRef>;

    /// The descriptor for the type called `name`, or `None` to pass
    fn type_by_name(&self, name: &str, next: ProviderStack<'_>) -> Option<TypeRef>;
}

/// The part of a provider chain below some provider
#[derive(Clone, Copy)]
pub struct ProviderStack<'a> {
    providers: &'a [Arc<dyn StackedTypeDataProvider>],
    base: &'a dyn BaseTypeProvider,
}

impl<'a> ProviderStack<'a> {
    /// A chain over `providers`, which must already be sorted by descending priority
    pub fn new(
        providers: &'a [Arc<dyn StackedTypeDataProvider>],
        base: &'a dyn BaseTypeProvider,
    ) -> Self {
        Self { providers, base }
    }

    /// Number of stacked providers left before the base provider
    pub fn depth(&self) -> usize {
        self.providers.len()
    }

    /// Resolves the descriptor of `obj`
    pub fn type_of(&self, obj: &ObjectRef) -> TypeRef {
        match self.providers.split_first() {
            Some((provider, rest)) => {
                let next = ProviderStack::new(rest, self.base);
                provider
                    .type_of_object(obj, next)
                    .unwrap_or_else(|| next.type_of(obj))
            }
            None => self.base.type_of(obj),
        }
    }

    /// Resolves the descriptor of the type called `name`
    pub fn type_by_name(&self, name: &str) -> Option<TypeRef> {
        match self.providers.split_first() {
            Some((provider, rest)) => {
                let next = ProviderStack::new(rest, self.base);
                provider
                    .type_by_name(name, next)
                    .or_else(|| next.type_by_name(name))
            }
            None => self.base.type_by_name(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use alloc::vec::Vec;
    use core::any::Any;
    use stepmeta_core::{MemberRef, TypeData, TypeKind, same_type};
    use stepmeta_testhelpers::fixtures::{self, StepFixture};
    use stepmeta_testhelpers::test;

    /// Renames whatever the rest of the chain returns
    struct Tagged {
        name: String,
        inner: TypeRef,
    }

    impl TypeData for Tagged {
        fn name(&self) -> &str {
            &self.name
        }

        fn kind(&self) -> TypeKind {
            self.inner.kind()
        }

        fn base_type(&self) -> Option<TypeRef> {
            Some(self.inner.clone())
        }

        fn members(&self) -> Vec<MemberRef> {
            self.inner.members()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct Tagger {
        tag: &'static str,
        priority: f64,
    }

    impl StackedTypeDataProvider for Tagger {
        fn priority(&self) -> f64 {
            self.priority
        }

        fn type_of_object(&self, obj: &ObjectRef, next: ProviderStack<'_>) -> Option<TypeRef> {
            let inner = next.type_of(obj);
            Some(Arc::new(Tagged {
                name: alloc::format!("{}<{}>", self.tag, inner.name()),
                inner,
            }))
        }

        fn type_by_name(&self, _name: &str, _next: ProviderStack<'_>) -> Option<TypeRef> {
            None
        }
    }

    #[test]
    fn an_empty_chain_asks_the_base_provider() {
        let registry = fixtures::registry();
        let stack = ProviderStack::new(&[], &registry);
        let delay = StepFixture::delay().into_object();
        assert!(same_type(&stack.type_of(&delay), &delay.type_data()));
        assert_eq!(
            stack.type_by_name("LogStep").map(|t| t.name().to_owned()),
            Some("LogStep".into())
        );
        assert!(stack.type_by_name("Nope").is_none());
    }

    #[test]
    fn providers_wrap_the_rest_of_the_chain_in_order() {
        let registry = fixtures::registry();
        let providers: Vec<Arc<dyn StackedTypeDataProvider>> = vec![
            Arc::new(Tagger {
                tag: "outer",
                priority: 2.0,
            }),
            Arc::new(Tagger {
                tag: "inner",
                priority: 1.0,
            }),
        ];
        let stack = ProviderStack::new(&providers, &registry);
        let delay = StepFixture::delay().into_object();
        assert_eq!(stack.type_of(&delay).name(), "outer<inner<DelayStep>>");
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn passing_providers_fall_through_by_name() {
        let registry = fixtures::registry();
        let providers: Vec<Arc<dyn StackedTypeDataProvider>> = vec![Arc::new(Tagger {
            tag: "t",
            priority: 0.0,
        })];
        let stack = ProviderStack::new(&providers, &registry);
        assert_eq!(
            stack.type_by_name("TestPlan").map(|t| t.kind()),
            Some(TypeKind::Plan)
        );
    }
}
