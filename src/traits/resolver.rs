//! Resolver traits for service resolution.

use std::any::Any;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::internal::Disposable;
use crate::key::{key_of_trait, key_of_type, Key};
use crate::traits::{AsyncDispose, Dispose};

/// Object-safe resolution core implemented by [`Container`](crate::Container),
/// [`Scope`](crate::Scope) and [`ResolverContext`](crate::ResolverContext).
pub trait ResolverCore: Send + Sync {
    /// Resolves the type-erased service registered under `key`.
    fn resolve_any(&self, key: &Key) -> DiResult<Arc<dyn Any + Send + Sync>>;

    /// Appends `disposable` to the disposal list this resolver owns.
    ///
    /// Fails with [`DiError::InvalidOperation`] once that owner has been disposed.
    fn register_for_disposal(&self, disposable: Disposable) -> DiResult<()>;
}

/// Typed resolution helpers on top of [`ResolverCore`].
pub trait Resolver: ResolverCore {
    fn get<T: 'static + Send + Sync>(&self) -> DiResult<Arc<T>> {
        let any = self.resolve_any(&key_of_type::<T>())?;
        any.downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    fn get_trait<T: ?Sized + 'static + Send + Sync>(&self) -> DiResult<Arc<T>>
    where
        Arc<T>: 'static,
    {
        // Trait registrations are stored as Arc<Arc<dyn Trait>>
        let any = self.resolve_any(&key_of_trait::<T>())?;
        any.downcast::<Arc<T>>()
            .map(|boxed| (*boxed).clone())
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    fn get_required<T: 'static + Send + Sync>(&self) -> Arc<T> {
        self.get::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve {}: {}", std::any::type_name::<T>(), e))
    }

    fn get_required_trait<T: ?Sized + 'static + Send + Sync>(&self) -> Arc<T>
    where
        Arc<T>: 'static,
    {
        self.get_trait::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve trait {}: {}", std::any::type_name::<T>(), e))
    }

    /// Hands an externally created component to this resolver for synchronous disposal.
    fn register_disposer<T: Dispose>(&self, service: Arc<T>) -> DiResult<()> {
        self.register_for_disposal(Disposable::from_sync(service))
    }

    /// Hands an externally created component to this resolver for asynchronous disposal.
    fn register_async_disposer<T: AsyncDispose>(&self, service: Arc<T>) -> DiResult<()> {
        self.register_for_disposal(Disposable::from_async(service))
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
