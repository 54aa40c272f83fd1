//! Scoped service resolution and lifecycle management.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use super::{Container, ResolverContext};
use crate::error::{DiError, DiResult};
use crate::internal::{
    dispose_all_reverse, dispose_all_reverse_async, track_created, with_resolution_guard, Disposable, DisposeBag,
};
use crate::key::Key;
use crate::lifestyle::Lifestyle;
use crate::registration::{AnyArc, Registration};
use crate::scoping::{LifestyleId, ScopeManager, ScopedLifestyle};
use crate::traits::ResolverCore;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// A bounded lifetime region that caches scoped components and owns their disposal.
///
/// A `Scope` is a cheap handle; clones refer to the same region. Scopes come
/// in two flavours that share all caching and disposal mechanics:
///
/// - **ambient** scopes, begun through a [`ScopedLifestyle`], become the
///   current scope of the calling execution context until they are ended;
/// - **explicit** scopes, from [`Container::create_scope`] or
///   [`Scope::create_child`], are never current anywhere and are resolved
///   from directly.
///
/// Within a scope:
///
/// - **Singleton** resolves from the container (shared across all scopes)
/// - **Scoped** is created at most once and cached in this scope
/// - **Transient** is created on every resolution and never tracked
///
/// Disposal runs once, in reverse order of registration, and attempts every
/// disposable even when some of them fail.
///
/// # Examples
///
/// ```
/// use ferrous_lifestyle::{Dispose, DisposeError, Resolver, ServiceCollection};
/// use std::sync::Arc;
///
/// struct Connection;
/// impl Dispose for Connection {
///     fn dispose(&self) -> Result<(), DisposeError> {
///         Ok(())
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_scoped_factory::<Connection, _>(|_| Connection).disposable();
/// let container = services.build();
///
/// let scope = container.create_scope();
/// let a = scope.get_required::<Connection>();
/// let b = scope.get_required::<Connection>();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// scope.dispose().unwrap();
/// assert!(scope.is_disposed());
/// ```
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    id: u64,
    container: Container,
    parent: Option<Weak<ScopeInner>>,
    // Set for ambient scopes only
    manager: Option<Arc<ScopeManager>>,
    slots: Box<[OnceCell<AnyArc>]>,
    disposables: Mutex<DisposeBag>,
}

impl Scope {
    pub(crate) fn new(container: Container, parent: Option<&Scope>, manager: Option<Arc<ScopeManager>>) -> Self {
        let slots = (0..container.scoped_slot_count()).map(|_| OnceCell::new()).collect();
        Self {
            inner: Arc::new(ScopeInner {
                id: NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed),
                container,
                parent: parent.map(|p| Arc::downgrade(&p.inner)),
                manager,
                slots,
                disposables: Mutex::new(DisposeBag::default()),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The scope that was current when this one was begun, while it is alive.
    pub fn parent(&self) -> Option<Scope> {
        self.inner
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Scope { inner })
    }

    pub fn container(&self) -> &Container {
        &self.inner.container
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposables.lock().is_disposed()
    }

    /// Whether both handles refer to the same scope.
    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The lifestyle that began this scope; `None` for explicit scopes.
    pub fn lifestyle(&self) -> Option<&Arc<dyn ScopedLifestyle>> {
        self.inner.manager.as_ref().map(|m| m.lifestyle())
    }

    pub(crate) fn lifestyle_id(&self) -> Option<LifestyleId> {
        self.lifestyle().map(|l| l.id())
    }

    /// Creates an explicit child scope of this one.
    pub fn create_child(&self) -> Scope {
        Scope::new(self.inner.container.clone(), Some(self), None)
    }

    /// Number of components waiting to be disposed with this scope.
    pub fn pending_disposals(&self) -> usize {
        self.inner.disposables.lock().len()
    }

    /// Resolves a scoped registration in this scope, creating it at most once.
    pub(crate) fn resolve_scoped(&self, reg: &Registration) -> DiResult<AnyArc> {
        let cell = &self.inner.slots[reg.slot];
        if let Some(value) = cell.get() {
            return Ok(value.clone());
        }

        if self.is_disposed() {
            return Err(DiError::invalid_operation(format!(
                "cannot resolve {} from scope {}: the scope has been disposed",
                reg.service.display_name(),
                self.inner.id
            )));
        }

        cell.get_or_try_init(|| -> DiResult<AnyArc> {
            let ctx = ResolverContext::new(self);
            let instance = (reg.ctor)(&ctx)?;
            if let Some(disposable) = Disposable::for_instance(reg, &instance) {
                track_created(&self.inner.disposables, disposable).map_err(|name| {
                    DiError::invalid_operation(format!(
                        "scope {} was disposed while {name} was being created; the new instance has been disposed",
                        self.inner.id
                    ))
                })?;
            }
            Ok(instance.service)
        })
        .cloned()
    }

    fn resolve_registration(&self, reg: &Registration) -> DiResult<AnyArc> {
        self.inner.container.ensure_not_disposed()?;
        match reg.lifestyle {
            Lifestyle::Singleton => self.inner.container.resolve_singleton(reg),
            Lifestyle::Scoped => self.resolve_scoped(reg),
            Lifestyle::Transient => {
                let ctx = ResolverContext::new(self);
                (reg.ctor)(&ctx).map(|instance| instance.service)
            }
        }
    }

    /// Ends the scope (ambient scopes hand "current" back to their parent
    /// first) and disposes everything registered with it in reverse order.
    ///
    /// Disposing an already disposed scope is a no-op. Failures of individual
    /// disposables are collected into [`DiError::Disposal`] after all of them
    /// have been attempted.
    pub fn dispose(&self) -> DiResult<()> {
        if let Some(entries) = self.begin_teardown()? {
            dispose_all_reverse(entries)?;
        }
        Ok(())
    }

    /// Asynchronous counterpart of [`dispose`](Self::dispose); components
    /// implementing [`AsyncDispose`](crate::AsyncDispose) are awaited.
    pub async fn dispose_async(&self) -> DiResult<()> {
        if let Some(entries) = self.begin_teardown()? {
            dispose_all_reverse_async(entries).await?;
        }
        Ok(())
    }

    fn begin_teardown(&self) -> DiResult<Option<Vec<Disposable>>> {
        if self.is_disposed() {
            tracing::debug!(scope = self.inner.id, "scope already disposed");
            return Ok(None);
        }
        if let Some(manager) = &self.inner.manager {
            manager.end_scope(self)?;
        }

        let entries = self.inner.disposables.lock().take_for_disposal();
        if let Some(entries) = &entries {
            tracing::debug!(scope = self.inner.id, disposables = entries.len(), "disposing scope");
        }
        Ok(entries)
    }
}

impl ResolverCore for Scope {
    fn resolve_any(&self, key: &Key) -> DiResult<Arc<dyn Any + Send + Sync>> {
        let container = &self.inner.container;
        let reg = container.registration(key).ok_or(DiError::NotFound(key.display_name()))?;
        let max_depth = container.options().max_resolution_depth;
        with_resolution_guard(container.id(), key.display_name(), max_depth, || self.resolve_registration(reg))
    }

    fn register_for_disposal(&self, disposable: Disposable) -> DiResult<()> {
        self.inner.disposables.lock().push(disposable).map_err(|rejected| {
            DiError::invalid_operation(format!(
                "cannot register {} for disposal: scope {} has already been disposed",
                rejected.name(),
                self.inner.id
            ))
        })
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.inner.id)
            .field("container", &self.inner.container.id())
            .field("parent", &self.parent().map(|p| p.id()))
            .field("lifestyle", &self.lifestyle().map(|l| l.name()))
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        let bag = self.disposables.get_mut();
        if !bag.is_disposed() && !bag.is_empty() && self.container.options().warn_on_undisposed {
            tracing::warn!(
                scope = self.id,
                pending = bag.len(),
                "scope dropped without being disposed; its disposables will not run"
            );
        }
    }
}
