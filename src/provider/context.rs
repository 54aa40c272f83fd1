//! The resolver handed to factories.

use std::any::Any;
use std::sync::Arc;

use crate::error::DiResult;
use crate::internal::Disposable;
use crate::key::Key;
use crate::traits::ResolverCore;

/// Context passed to factory functions for resolving dependencies.
///
/// Wraps the resolver that triggered construction: the container for
/// singletons, the owning [`Scope`](crate::Scope) for scoped components, and
/// whichever of the two asked for a transient. Dependencies resolved through it
/// therefore land in the right cache, and components registered through
/// [`register_disposer`](crate::Resolver::register_disposer) are owned by it.
///
/// # Examples
///
/// ```
/// use ferrous_lifestyle::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Settings { url: String }
/// struct Repository { settings: Arc<Settings> }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Settings { url: "postgres://localhost".to_string() });
/// services.add_transient_factory::<Repository, _>(|resolver| Repository {
///     settings: resolver.get_required::<Settings>(),
/// });
///
/// let container = services.build();
/// assert_eq!(container.get_required::<Repository>().settings.url, "postgres://localhost");
/// ```
pub struct ResolverContext<'a> {
    resolver: &'a dyn ResolverCore,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new<T: ResolverCore>(resolver: &'a T) -> Self {
        Self { resolver }
    }
}

impl ResolverCore for ResolverContext<'_> {
    fn resolve_any(&self, key: &Key) -> DiResult<Arc<dyn Any + Send + Sync>> {
        self.resolver.resolve_any(key)
    }

    fn register_for_disposal(&self, disposable: Disposable) -> DiResult<()> {
        self.resolver.register_for_disposal(disposable)
    }
}
