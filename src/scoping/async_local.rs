//! Scopes bound to the logical flow of an async task.
//!
//! Current scopes live in `tokio::task_local!` storage, so they survive `.await`
//! points and moves between worker threads of a multi-thread runtime. A flow is
//! opened with [`AsyncScopedLifestyle::context`]; tasks spawned from inside it
//! start without one and do not see the scopes of the spawning task.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use super::{ContextKey, LifestyleId, ScopeGuard, ScopedLifestyle};
use crate::error::{DiError, DiResult};
use crate::provider::{Container, Scope};

tokio::task_local! {
    static TASK_SCOPES: RefCell<HashMap<ContextKey, Scope>>;
}

/// Binds scopes to the async flow that began them.
///
/// # Examples
///
/// ```
/// use ferrous_lifestyle::{AsyncScopedLifestyle, ContainerOptions, Resolver, ServiceCollection};
///
/// struct Request(u32);
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let lifestyle = AsyncScopedLifestyle::new();
/// let mut services = ServiceCollection::with_options(
///     ContainerOptions::default().with_default_scoped_lifestyle(lifestyle.clone()),
/// );
/// services.add_scoped_factory::<Request, _>(|_| Request(7));
/// let container = services.build();
///
/// let id = lifestyle
///     .run_in_scope(&container, |_scope| {
///         let container = container.clone();
///         async move {
///             tokio::task::yield_now().await;
///             container.get_required::<Request>().0
///         }
///     })
///     .await
///     .unwrap();
/// assert_eq!(id, 7);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AsyncScopedLifestyle {
    id: LifestyleId,
}

impl AsyncScopedLifestyle {
    pub fn new() -> Self {
        Self { id: LifestyleId::next() }
    }

    /// Runs `future` as a fresh async flow with no current scopes.
    ///
    /// Scopes can only be begun inside such a flow.
    pub fn context<F: Future>(future: F) -> impl Future<Output = F::Output> {
        TASK_SCOPES.scope(RefCell::new(HashMap::new()), future)
    }

    /// Whether the caller runs inside a flow opened by [`context`](Self::context).
    pub fn in_context() -> bool {
        TASK_SCOPES.try_with(|_| ()).is_ok()
    }

    /// Begins a scope, runs `f` in it and disposes the scope asynchronously.
    ///
    /// If the returned future is dropped before completion the scope is still
    /// ended synchronously when the future is dropped.
    ///
    /// Opens a flow first when the caller is not already inside one.
    pub async fn run_in_scope<F, Fut, R>(&self, container: &Container, f: F) -> DiResult<R>
    where
        F: FnOnce(Scope) -> Fut,
        Fut: Future<Output = R>,
    {
        let body = async {
            let guard = ScopeGuard::new(self.begin_scope(container)?);
            let result = f(guard.scope().clone()).await;
            guard.end_async().await?;
            Ok::<R, DiError>(result)
        };

        if Self::in_context() {
            body.await
        } else {
            Self::context(body).await
        }
    }
}

impl Default for AsyncScopedLifestyle {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopedLifestyle for AsyncScopedLifestyle {
    fn name(&self) -> &'static str {
        "async"
    }

    fn id(&self) -> LifestyleId {
        self.id
    }

    fn get_current_scope(&self, key: ContextKey) -> Option<Scope> {
        TASK_SCOPES
            .try_with(|scopes| scopes.borrow().get(&key).cloned())
            .ok()
            .flatten()
    }

    fn set_current_scope(&self, key: ContextKey, scope: Option<Scope>) -> DiResult<()> {
        let replaced = TASK_SCOPES
            .try_with(|scopes| {
                let mut scopes = scopes.borrow_mut();
                match scope {
                    Some(scope) => scopes.insert(key, scope),
                    None => scopes.remove(&key),
                }
            })
            .map_err(|_| {
                DiError::invalid_operation(
                    "no async scope context is active; run the calling future inside \
                     AsyncScopedLifestyle::context or use run_in_scope",
                )
            })?;
        drop(replaced);
        Ok(())
    }

    fn to_shared(&self) -> Arc<dyn ScopedLifestyle> {
        Arc::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_scope_is_none_outside_a_flow() {
        let lifestyle = AsyncScopedLifestyle::new();
        let container = crate::ServiceCollection::new().build();
        assert!(!AsyncScopedLifestyle::in_context());
        assert!(lifestyle.current_scope(&container).is_none());
        assert!(matches!(
            lifestyle.begin_scope(&container),
            Err(DiError::InvalidOperation(_))
        ));
    }
}
