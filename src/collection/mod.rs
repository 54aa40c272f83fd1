//! Service collection module for dependency injection.
//!
//! [`ServiceCollection`] is the registration store a [`Container`] is built
//! from. Every `add_*` method returns a [`RegistrationBuilder`] that declares
//! the disposal contracts of the implementation, ownership and diagnostic
//! suppressions.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::diagnostics::DiagnosticKind;
use crate::error::DiResult;
use crate::internal::{dispose_async_hook, dispose_sync_hook};
use crate::key::{key_of_trait, key_of_type, Key};
use crate::lifestyle::Lifestyle;
use crate::options::ContainerOptions;
use crate::provider::{Container, ResolverContext};
use crate::registration::{ImplementationType, Instance, Registration, Registry};
use crate::scoping::ScopedLifestyle;
use crate::traits::{AsyncDispose, Dispose};

/// Registration store for services and their lifestyles.
///
/// Registering a second producer for the same service replaces the first one.
///
/// # Examples
///
/// ```
/// use ferrous_lifestyle::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String {
///         "hello".to_string()
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(42usize);
/// services.add_transient_trait_factory::<dyn Greeter, English, _>(|_| English, |g| g);
///
/// let container = services.build();
/// assert_eq!(*container.get_required::<usize>(), 42);
/// assert_eq!(container.get_required_trait::<dyn Greeter>().greet(), "hello");
/// ```
#[derive(Default)]
pub struct ServiceCollection {
    registrations: Vec<Registration>,
    options: ContainerOptions,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ContainerOptions) -> Self {
        Self { registrations: Vec::new(), options }
    }

    pub fn options_mut(&mut self) -> &mut ContainerOptions {
        &mut self.options
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Registers a pre-built singleton.
    ///
    /// The container owns the value: when it is declared disposable it is
    /// disposed with the container unless marked
    /// [`externally_owned`](RegistrationBuilder::externally_owned).
    pub fn add_singleton<T: Send + Sync + 'static>(&mut self, value: T) -> RegistrationBuilder<'_, T> {
        let value = Arc::new(value);
        self.add_factory_with(Lifestyle::Singleton, key_of_type::<T>(), move |_| {
            let value = value.clone();
            Instance::of(value)
        })
    }

    /// Registers a singleton created on first request.
    pub fn add_singleton_factory<T, F>(&mut self, factory: F) -> RegistrationBuilder<'_, T>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifestyle::Singleton, factory)
    }

    /// Registers a component created once per scope.
    pub fn add_scoped_factory<T, F>(&mut self, factory: F) -> RegistrationBuilder<'_, T>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifestyle::Scoped, factory)
    }

    /// Registers a component created on every resolution.
    pub fn add_transient_factory<T, F>(&mut self, factory: F) -> RegistrationBuilder<'_, T>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifestyle::Transient, factory)
    }

    pub fn add_factory<T, F>(&mut self, lifestyle: Lifestyle, factory: F) -> RegistrationBuilder<'_, T>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.add_factory_with(lifestyle, key_of_type::<T>(), move |r| Instance::of(Arc::new(factory(r))))
    }

    pub fn add_singleton_trait_factory<Tr, I, F>(&mut self, factory: F, upcast: fn(Arc<I>) -> Arc<Tr>) -> RegistrationBuilder<'_, I>
    where
        Tr: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> I + Send + Sync + 'static,
    {
        self.add_trait_factory(Lifestyle::Singleton, factory, upcast)
    }

    pub fn add_scoped_trait_factory<Tr, I, F>(&mut self, factory: F, upcast: fn(Arc<I>) -> Arc<Tr>) -> RegistrationBuilder<'_, I>
    where
        Tr: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> I + Send + Sync + 'static,
    {
        self.add_trait_factory(Lifestyle::Scoped, factory, upcast)
    }

    pub fn add_transient_trait_factory<Tr, I, F>(&mut self, factory: F, upcast: fn(Arc<I>) -> Arc<Tr>) -> RegistrationBuilder<'_, I>
    where
        Tr: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> I + Send + Sync + 'static,
    {
        self.add_trait_factory(Lifestyle::Transient, factory, upcast)
    }

    /// Registers implementation `I` under the trait object `Tr`.
    ///
    /// `upcast` performs the unsizing coercion; `|c| c` is enough at call sites.
    /// The implementation type, not the trait, decides which disposal contracts
    /// apply.
    pub fn add_trait_factory<Tr, I, F>(
        &mut self,
        lifestyle: Lifestyle,
        factory: F,
        upcast: fn(Arc<I>) -> Arc<Tr>,
    ) -> RegistrationBuilder<'_, I>
    where
        Tr: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> I + Send + Sync + 'static,
    {
        self.add_factory_with(lifestyle, key_of_trait::<Tr>(), move |r| {
            let component = Arc::new(factory(r));
            let service = upcast(component.clone());
            Instance::bound(component, service)
        })
    }

    fn add_factory_with<I, F>(&mut self, lifestyle: Lifestyle, service: Key, make: F) -> RegistrationBuilder<'_, I>
    where
        I: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> Instance + Send + Sync + 'static,
    {
        let registration = Registration::new(
            service,
            lifestyle,
            ImplementationType::of::<I>(),
            Arc::new(move |r: &ResolverContext| -> DiResult<Instance> { Ok(make(r)) }),
        );
        RegistrationBuilder {
            registration: self.insert(registration),
            _component: PhantomData,
        }
    }

    fn insert(&mut self, registration: Registration) -> &mut Registration {
        let position = match self.registrations.iter().position(|r| r.service == registration.service) {
            Some(position) => {
                self.registrations[position] = registration;
                position
            }
            None => {
                self.registrations.push(registration);
                self.registrations.len() - 1
            }
        };
        &mut self.registrations[position]
    }

    /// Freezes the registrations into a [`Container`].
    pub fn build(self) -> Container {
        Container::new(Registry::finalize(self.registrations), self.options)
    }
}

/// Declares properties of a registration right after it was added.
///
/// `T` is the implementation type, so the disposal declarations only compile
/// when the implementation really has the contract.
///
/// ```
/// use ferrous_lifestyle::{
///     AsyncDispose, DiagnosticKind, Dispose, DisposeError, ServiceCollection,
/// };
/// use async_trait::async_trait;
///
/// struct Channel;
/// impl Dispose for Channel {
///     fn dispose(&self) -> Result<(), DisposeError> {
///         Ok(())
///     }
/// }
/// #[async_trait]
/// impl AsyncDispose for Channel {
///     async fn dispose_async(&self) -> Result<(), DisposeError> {
///         Ok(())
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services
///     .add_transient_factory::<Channel, _>(|_| Channel)
///     .disposable()
///     .async_disposable()
///     .suppress(DiagnosticKind::DisposableTransientComponent, "callers close channels");
/// ```
pub struct RegistrationBuilder<'a, T> {
    registration: &'a mut Registration,
    _component: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> RegistrationBuilder<'_, T> {
    /// Declares that the implementation implements [`Dispose`].
    pub fn disposable(self) -> Self
    where
        T: Dispose,
    {
        self.registration.implementation.capabilities.synchronous = true;
        self.registration.hooks.sync = Some(dispose_sync_hook::<T>);
        self
    }

    /// Declares that the implementation implements [`AsyncDispose`].
    pub fn async_disposable(self) -> Self
    where
        T: AsyncDispose,
    {
        self.registration.implementation.capabilities.asynchronous = true;
        self.registration.hooks.asynchronous = Some(dispose_async_hook::<T>);
        self
    }

    /// Created instances are never registered for disposal.
    pub fn externally_owned(self) -> Self {
        self.registration.externally_owned = true;
        self
    }

    /// Silences `kind` for this registration, recording why.
    pub fn suppress(self, kind: DiagnosticKind, justification: impl Into<String>) -> Self {
        self.registration.suppressions.add(kind, justification);
        self
    }

    /// Binds this scoped registration to `lifestyle` instead of the container default.
    pub fn scoped_by(self, lifestyle: impl ScopedLifestyle) -> Self {
        self.registration.scoped_by = Some(Arc::new(lifestyle));
        self
    }

    pub fn registration(&self) -> &Registration {
        self.registration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Resolver;
    use crate::DisposeError;

    struct Pool;
    impl Dispose for Pool {
        fn dispose(&self) -> Result<(), DisposeError> {
            Ok(())
        }
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let mut services = ServiceCollection::new();
        services.add_singleton(1u32);
        services.add_singleton(2u32);
        assert_eq!(services.len(), 1);
        assert_eq!(*services.build().get_required::<u32>(), 2);
    }

    #[test]
    fn builder_records_capabilities_and_ownership() {
        let mut services = ServiceCollection::new();
        let builder = services.add_singleton(Pool).disposable().externally_owned();
        let registration = builder.registration();

        assert!(registration.implementation().capabilities.synchronous);
        assert!(!registration.implementation().capabilities.asynchronous);
        assert!(registration.is_externally_owned());
        assert!(registration.is_self_bound());
        assert!(!registration.tracks_disposal());
    }
}
