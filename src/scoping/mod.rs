//! Scoped lifestyles: which execution context a scope is bound to.
//!
//! A [`ScopedLifestyle`] only decides *where* the current scope of a container
//! is stored (the calling thread, the current async task). Caching and disposal
//! are shared by every lifestyle and live in [`Scope`].
//!
//! # Examples
//!
//! ```
//! use ferrous_lifestyle::{ServiceCollection, ContainerOptions, Resolver, ScopedLifestyle, ThreadScopedLifestyle};
//! use std::sync::Arc;
//!
//! struct UnitOfWork;
//!
//! let lifestyle = ThreadScopedLifestyle::new();
//! let mut services = ServiceCollection::with_options(
//!     ContainerOptions::default().with_default_scoped_lifestyle(lifestyle.clone()),
//! );
//! services.add_scoped_factory::<UnitOfWork, _>(|_| UnitOfWork);
//! let container = services.build();
//!
//! let outer = lifestyle.begin_scope(&container).unwrap();
//! let a = container.get_required::<UnitOfWork>();
//!
//! let inner = lifestyle.begin_scope(&container).unwrap();
//! let b = container.get_required::<UnitOfWork>();
//! assert!(!Arc::ptr_eq(&a, &b));
//! inner.dispose().unwrap();
//!
//! // the outer scope is current again
//! assert!(Arc::ptr_eq(&a, &container.get_required::<UnitOfWork>()));
//! outer.dispose().unwrap();
//! assert!(lifestyle.current_scope(&container).is_none());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::provider::{Container, Scope};

mod manager;
mod thread;
#[cfg(feature = "async")]
mod async_local;

pub use manager::ScopeManager;
pub use thread::ThreadScopedLifestyle;
#[cfg(feature = "async")]
pub use async_local::AsyncScopedLifestyle;

/// Returns the ambient scope at the moment it is called.
pub type CurrentScopeProvider = Arc<dyn Fn() -> Option<Scope> + Send + Sync>;

/// Process-unique identity of one scoped lifestyle instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LifestyleId(u64);

impl LifestyleId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Key of one "current scope" slot in context-local storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextKey {
    pub container: u64,
    pub lifestyle: LifestyleId,
}

impl ContextKey {
    pub fn new(container: &Container, lifestyle: LifestyleId) -> Self {
        Self { container: container.id(), lifestyle }
    }
}

/// A policy binding scopes to an execution context.
///
/// Implementors provide the storage hooks; the provided methods implement
/// begin/end with nesting on top of them and are shared by every lifestyle.
pub trait ScopedLifestyle: Send + Sync + fmt::Debug + 'static {
    fn name(&self) -> &'static str;

    fn id(&self) -> LifestyleId;

    /// Reads the current scope for `key` in the calling execution context.
    fn get_current_scope(&self, key: ContextKey) -> Option<Scope>;

    /// Replaces (or clears, with `None`) the current scope for `key` in the
    /// calling execution context.
    fn set_current_scope(&self, key: ContextKey, scope: Option<Scope>) -> DiResult<()>;

    /// A shared handle to this lifestyle, kept by the scope manager.
    fn to_shared(&self) -> Arc<dyn ScopedLifestyle>;

    /// Begins a scope nested in the current one and makes it current.
    fn begin_scope(&self, container: &Container) -> DiResult<Scope> {
        container.scope_manager(self)?.begin_scope(container)
    }

    /// The innermost active scope of this lifestyle in the calling context.
    fn current_scope(&self, container: &Container) -> Option<Scope> {
        self.get_current_scope(ContextKey::new(container, self.id()))
    }

    /// A function the resolution path calls to fetch the ambient scope.
    fn current_scope_provider(&self, container: &Container) -> CurrentScopeProvider {
        provider_for(self.to_shared(), ContextKey::new(container, self.id()))
    }

    /// Ends `scope`: restores its parent as current, then disposes it.
    fn end_scope(&self, scope: &Scope) -> DiResult<()> {
        if scope.lifestyle_id() != Some(self.id()) {
            return Err(DiError::Argument {
                name: "scope",
                message: format!("scope {} was not begun by this {} lifestyle", scope.id(), self.name()),
            });
        }
        scope.dispose()
    }

    /// Runs `f` inside a new scope and always ends the scope afterwards,
    /// also when `f` panics.
    fn using<R>(&self, container: &Container, f: impl FnOnce(&Scope) -> R) -> DiResult<R>
    where
        Self: Sized,
    {
        let guard = ScopeGuard::new(self.begin_scope(container)?);
        let result = f(guard.scope());
        guard.end()?;
        Ok(result)
    }
}

/// Ends a scope on drop unless [`end`](Self::end) or
/// [`end_async`](Self::end_async) already did.
///
/// Unwinding panics and dropped futures would otherwise leave a dead scope
/// current in its execution context. Teardown on drop is synchronous.
pub(crate) struct ScopeGuard {
    scope: Scope,
    armed: bool,
}

impl ScopeGuard {
    pub(crate) fn new(scope: Scope) -> Self {
        Self { scope, armed: true }
    }

    pub(crate) fn scope(&self) -> &Scope {
        &self.scope
    }

    pub(crate) fn end(mut self) -> DiResult<()> {
        self.armed = false;
        self.scope.dispose()
    }

    #[cfg(feature = "async")]
    pub(crate) async fn end_async(mut self) -> DiResult<()> {
        // stays armed until teardown returns, a cancelled end is finished on drop
        let result = self.scope.dispose_async().await;
        self.armed = false;
        result
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::debug!(scope = self.scope.id(), "ending scope left by a panic or a dropped future");
        if let Err(error) = self.scope.dispose() {
            tracing::warn!(scope = self.scope.id(), %error, "failed to end abandoned scope");
        }
    }
}

pub(crate) fn provider_for(lifestyle: Arc<dyn ScopedLifestyle>, key: ContextKey) -> CurrentScopeProvider {
    Arc::new(move || lifestyle.get_current_scope(key))
}
