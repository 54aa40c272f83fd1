//! The built container and its scopes.
//!
//! [`Container`] resolves registrations according to their lifestyle and owns
//! the disposal of singletons; [`Scope`] caches scoped components and owns
//! their disposal.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::diagnostics::{self, DiagnosticSeverity};
use crate::error::{DiError, DiResult};
use crate::internal::{
    dispose_all_reverse, dispose_all_reverse_async, track_created, with_resolution_guard, Disposable, DisposeBag,
};
use crate::key::Key;
use crate::lifestyle::Lifestyle;
use crate::options::{ContainerOptions, VerificationOption};
use crate::registration::{AnyArc, Registration, Registry};
use crate::scoping::{provider_for, ContextKey, CurrentScopeProvider, LifestyleId, ScopeManager, ScopedLifestyle};
use crate::traits::ResolverCore;

mod context;
mod scope;

pub use context::ResolverContext;
pub use scope::Scope;

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(1);

/// How a scoped registration finds its ambient scope.
struct ScopedActivation {
    lifestyle: &'static str,
    current_scope: CurrentScopeProvider,
}

/// A built dependency injection container.
///
/// Resolves services according to their registered [`Lifestyle`]:
///
/// - **Singleton**: created once, cached lock-free in a per-registration slot
///   and, when disposable, disposed with the container
/// - **Scoped**: cached in the ambient scope of the registration's scoped
///   lifestyle, or in an explicit [`Scope`] when resolved through one
/// - **Transient**: created on every resolution and never tracked
///
/// `Container` is a cheap handle (it uses `Arc` internally) and can be shared
/// across threads.
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
/// services.add_transient_factory::<Repository, _>(|r| Repository {
///     settings: r.get_required::<Settings>(),
/// });
///
/// let container = services.build();
/// let a = container.get_required::<Repository>();
/// let b = container.get_required::<Repository>();
/// assert!(Arc::ptr_eq(&a.settings, &b.settings));
/// container.dispose().unwrap();
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

struct ContainerInner {
    id: u64,
    registry: Registry,
    options: ContainerOptions,
    singletons: Box<[OnceCell<AnyArc>]>,
    // Indexed by scoped slot; None when no scoped lifestyle applies
    scoped_activations: Box<[Option<ScopedActivation>]>,
    managers: Mutex<HashMap<LifestyleId, Arc<ScopeManager>>>,
    root_disposables: Mutex<DisposeBag>,
    verified: AtomicBool,
    disposed: AtomicBool,
}

impl Container {
    pub(crate) fn new(registry: Registry, options: ContainerOptions) -> Self {
        let id = NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed);

        let mut scoped_activations: Vec<Option<ScopedActivation>> =
            (0..registry.scoped_count).map(|_| None).collect();
        for reg in registry.iter().filter(|r| r.lifestyle == Lifestyle::Scoped) {
            let lifestyle = reg.scoped_by.as_ref().or(options.default_scoped_lifestyle.as_ref());
            scoped_activations[reg.slot] = lifestyle.map(|lifestyle| ScopedActivation {
                lifestyle: lifestyle.name(),
                current_scope: provider_for(lifestyle.clone(), ContextKey { container: id, lifestyle: lifestyle.id() }),
            });
        }

        let singletons = (0..registry.singleton_count).map(|_| OnceCell::new()).collect();

        tracing::debug!(container = id, registrations = registry.as_slice().len(), "container built");

        Self {
            inner: Arc::new(ContainerInner {
                id,
                registry,
                options,
                singletons,
                scoped_activations: scoped_activations.into_boxed_slice(),
                managers: Mutex::new(HashMap::new()),
                root_disposables: Mutex::new(DisposeBag::default()),
                verified: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Process-unique identity of this container.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.inner.options
    }

    /// The scoped lifestyle used by registrations without their own.
    pub fn default_scoped_lifestyle(&self) -> Option<&Arc<dyn ScopedLifestyle>> {
        self.inner.options.default_scoped_lifestyle.as_ref()
    }

    /// All registrations, in registration order.
    pub fn registrations(&self) -> &[Arc<Registration>] {
        self.inner.registry.as_slice()
    }

    pub fn registration(&self, key: &Key) -> Option<&Arc<Registration>> {
        self.inner.registry.get(key)
    }

    pub(crate) fn scoped_slot_count(&self) -> usize {
        self.inner.registry.scoped_count
    }

    /// Creates an explicit scope, not bound to any execution context.
    pub fn create_scope(&self) -> Scope {
        Scope::new(self.clone(), None, None)
    }

    /// The scope manager for `lifestyle` in this container, created on first use.
    ///
    /// Concurrent first calls all observe the same manager.
    pub fn scope_manager<L: ScopedLifestyle + ?Sized>(&self, lifestyle: &L) -> DiResult<Arc<ScopeManager>> {
        let mut managers = self.inner.managers.lock();
        // Checked under the lock so dispose() cannot race a late insertion
        self.ensure_not_disposed()?;
        let manager = managers.entry(lifestyle.id()).or_insert_with(|| {
            tracing::debug!(container = self.inner.id, lifestyle = lifestyle.name(), "created scope manager");
            Arc::new(ScopeManager::new(
                ContextKey::new(self, lifestyle.id()),
                lifestyle.to_shared(),
            ))
        });
        Ok(manager.clone())
    }

    /// Instantiates every registration once inside a temporary scope, then
    /// optionally runs the diagnostic analyzer.
    ///
    /// Singletons created while verifying stay cached. The temporary scope is
    /// disposed synchronously; use [`verify_async`](Self::verify_async) when
    /// scoped components only implement [`AsyncDispose`](crate::AsyncDispose).
    pub fn verify(&self, option: VerificationOption) -> DiResult<()> {
        let scope = self.verification_scope()?;
        let resolved = self.instantiate_all(&scope);
        let disposed = scope.dispose();
        resolved?;
        disposed?;
        self.complete_verification(option)
    }

    pub async fn verify_async(&self, option: VerificationOption) -> DiResult<()> {
        let scope = self.verification_scope()?;
        let resolved = self.instantiate_all(&scope);
        let disposed = scope.dispose_async().await;
        resolved?;
        disposed?;
        self.complete_verification(option)
    }

    pub fn is_verified(&self) -> bool {
        self.inner.verified.load(Ordering::Acquire)
    }

    fn verification_scope(&self) -> DiResult<Scope> {
        self.ensure_not_disposed()?;
        if let Some(reg) = self
            .registrations()
            .iter()
            .find(|r| r.lifestyle == Lifestyle::Scoped && self.inner.scoped_activations[r.slot].is_none())
        {
            return Err(DiError::NoScopedLifestyle(reg.service.display_name()));
        }
        Ok(self.create_scope())
    }

    fn instantiate_all(&self, scope: &Scope) -> DiResult<()> {
        self.registrations()
            .iter()
            .try_for_each(|reg| scope.resolve_any(&reg.service).map(drop))
    }

    fn complete_verification(&self, option: VerificationOption) -> DiResult<()> {
        if option == VerificationOption::VerifyAndDiagnose {
            let findings = diagnostics::analyze(self);
            if findings.iter().any(|f| f.severity >= DiagnosticSeverity::Warning) {
                return Err(DiError::Diagnostics(findings));
            }
        }
        self.inner.verified.store(true, Ordering::Release);
        tracing::info!(
            container = self.inner.id,
            registrations = self.registrations().len(),
            ?option,
            "container verified"
        );
        Ok(())
    }

    /// Disposes owned singletons in reverse creation order and releases every
    /// scope manager. Later resolutions fail with [`DiError::InvalidOperation`].
    ///
    /// Idempotent; scopes still alive are not disposed by this call.
    pub fn dispose(&self) -> DiResult<()> {
        if let Some(entries) = self.begin_teardown() {
            dispose_all_reverse(entries)?;
        }
        Ok(())
    }

    pub async fn dispose_async(&self) -> DiResult<()> {
        if let Some(entries) = self.begin_teardown() {
            dispose_all_reverse_async(entries).await?;
        }
        Ok(())
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    fn begin_teardown(&self) -> Option<Vec<Disposable>> {
        {
            let mut managers = self.inner.managers.lock();
            if self.inner.disposed.swap(true, Ordering::AcqRel) {
                tracing::debug!(container = self.inner.id, "container already disposed");
                return None;
            }
            managers.clear();
        }
        let entries = self.inner.root_disposables.lock().take_for_disposal();
        if let Some(entries) = &entries {
            tracing::debug!(container = self.inner.id, disposables = entries.len(), "disposing container");
        }
        entries
    }

    pub(crate) fn ensure_not_disposed(&self) -> DiResult<()> {
        if self.is_disposed() {
            return Err(DiError::invalid_operation(format!(
                "container {} has been disposed",
                self.inner.id
            )));
        }
        Ok(())
    }

    /// Singleton resolution: lock-free once cached, created at most once.
    pub(crate) fn resolve_singleton(&self, reg: &Registration) -> DiResult<AnyArc> {
        let cell = &self.inner.singletons[reg.slot];
        if let Some(value) = cell.get() {
            return Ok(value.clone());
        }
        self.ensure_not_disposed()?;

        cell.get_or_try_init(|| -> DiResult<AnyArc> {
            let ctx = ResolverContext::new(self);
            let instance = (reg.ctor)(&ctx)?;
            if let Some(disposable) = Disposable::for_instance(reg, &instance) {
                track_created(&self.inner.root_disposables, disposable).map_err(|name| {
                    DiError::invalid_operation(format!(
                        "container {} was disposed while {name} was being created; the new instance has been disposed",
                        self.inner.id
                    ))
                })?;
            }
            Ok(instance.service)
        })
        .cloned()
    }

    fn resolve_registration(&self, reg: &Registration) -> DiResult<AnyArc> {
        self.ensure_not_disposed()?;
        match reg.lifestyle {
            Lifestyle::Singleton => self.resolve_singleton(reg),
            Lifestyle::Scoped => {
                let activation = self.inner.scoped_activations[reg.slot]
                    .as_ref()
                    .ok_or(DiError::NoScopedLifestyle(reg.service.display_name()))?;
                let scope = (activation.current_scope)().ok_or(DiError::NoActiveScope {
                    service: reg.service.display_name(),
                    lifestyle: activation.lifestyle,
                })?;
                scope.resolve_scoped(reg)
            }
            Lifestyle::Transient => {
                let ctx = ResolverContext::new(self);
                (reg.ctor)(&ctx).map(|instance| instance.service)
            }
        }
    }
}

impl ResolverCore for Container {
    fn resolve_any(&self, key: &Key) -> DiResult<Arc<dyn Any + Send + Sync>> {
        let reg = self.registration(key).ok_or(DiError::NotFound(key.display_name()))?;
        let max_depth = self.inner.options.max_resolution_depth;
        with_resolution_guard(self.inner.id, key.display_name(), max_depth, || self.resolve_registration(reg))
    }

    /// Registers with the container root; disposed by [`Container::dispose`].
    fn register_for_disposal(&self, disposable: Disposable) -> DiResult<()> {
        self.inner.root_disposables.lock().push(disposable).map_err(|rejected| {
            DiError::invalid_operation(format!(
                "cannot register {} for disposal: container {} has already been disposed",
                rejected.name(),
                self.inner.id
            ))
        })
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.inner.id)
            .field("registrations", &self.registrations().len())
            .field("verified", &self.is_verified())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        let bag = self.root_disposables.get_mut();
        if !bag.is_disposed() && !bag.is_empty() && self.options.warn_on_undisposed {
            tracing::warn!(
                container = self.id,
                pending = bag.len(),
                "container dropped without being disposed; singleton disposables will not run"
            );
        }
    }
}
