//! Disposal bookkeeping shared by scopes and the container root.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;

use crate::error::{AggregateDisposalError, DisposalFailure, DisposeError};
use crate::registration::{AnyArc, Instance, Registration};
use crate::traits::{AsyncDispose, Dispose};

/// Future type for disposal operations.
pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

pub(crate) type SyncDisposeFn = fn(&AnyArc) -> Result<(), DisposeError>;
pub(crate) type AsyncDisposeFn = fn(AnyArc) -> BoxFuture<Result<(), DisposeError>>;

/// Disposal entry points for one implementation type, monomorphized at
/// registration time so teardown never has to rediscover capabilities.
#[derive(Clone, Copy, Default)]
pub(crate) struct DisposalHooks {
    pub(crate) sync: Option<SyncDisposeFn>,
    pub(crate) asynchronous: Option<AsyncDisposeFn>,
}

impl DisposalHooks {
    pub(crate) fn is_empty(&self) -> bool {
        self.sync.is_none() && self.asynchronous.is_none()
    }
}

pub(crate) fn dispose_sync_hook<T: Dispose>(component: &AnyArc) -> Result<(), DisposeError> {
    match (**component).downcast_ref::<T>() {
        Some(component) => Dispose::dispose(component),
        None => Err(format!("component is not a {}", std::any::type_name::<T>()).into()),
    }
}

pub(crate) fn dispose_async_hook<T: AsyncDispose>(component: AnyArc) -> BoxFuture<Result<(), DisposeError>> {
    Box::pin(async move {
        match component.downcast::<T>() {
            Ok(component) => component.dispose_async().await,
            Err(_) => Err(format!("component is not a {}", std::any::type_name::<T>()).into()),
        }
    })
}

/// A component registered with a scope (or the container root) for disposal.
///
/// Created by the container right after a disposable scoped or singleton
/// instance is built, or by
/// [`Resolver::register_disposer`](crate::Resolver::register_disposer) for
/// components created elsewhere.
pub struct Disposable {
    name: &'static str,
    component: AnyArc,
    hooks: DisposalHooks,
}

impl Disposable {
    pub fn from_sync<T: Dispose>(component: Arc<T>) -> Self {
        Self {
            name: std::any::type_name::<T>(),
            component,
            hooks: DisposalHooks { sync: Some(dispose_sync_hook::<T>), asynchronous: None },
        }
    }

    pub fn from_async<T: AsyncDispose>(component: Arc<T>) -> Self {
        Self {
            name: std::any::type_name::<T>(),
            component,
            hooks: DisposalHooks { sync: None, asynchronous: Some(dispose_async_hook::<T>) },
        }
    }

    /// Both contracts; asynchronous teardown prefers `dispose_async`.
    pub fn from_dual<T: Dispose + AsyncDispose>(component: Arc<T>) -> Self {
        Self {
            name: std::any::type_name::<T>(),
            component,
            hooks: DisposalHooks {
                sync: Some(dispose_sync_hook::<T>),
                asynchronous: Some(dispose_async_hook::<T>),
            },
        }
    }

    /// The entry for a freshly created instance, if its registration owns disposal.
    pub(crate) fn for_instance(registration: &Registration, instance: &Instance) -> Option<Self> {
        if !registration.tracks_disposal() {
            return None;
        }
        Some(Self {
            name: registration.implementation().name,
            component: instance.component.clone(),
            hooks: registration.hooks,
        })
    }

    /// Implementation type name of the component.
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn failure(&self, error: DisposeError) -> DisposalFailure {
        tracing::warn!(component = self.name, error = %error, "disposal failed");
        DisposalFailure { component: self.name, error }
    }

    fn dispose_sync(self) -> Result<(), DisposalFailure> {
        let Some(hook) = self.hooks.sync else {
            return Err(self.failure(
                "implements only AsyncDispose and cannot be disposed synchronously; dispose the owner asynchronously".into(),
            ));
        };
        match panic::catch_unwind(AssertUnwindSafe(|| hook(&self.component))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(self.failure(error)),
            Err(payload) => Err(self.failure(panic_message(payload).into())),
        }
    }

    async fn dispose_async(self) -> Result<(), DisposalFailure> {
        let Some(hook) = self.hooks.asynchronous else {
            return self.dispose_sync();
        };
        match AssertUnwindSafe(hook(self.component.clone())).catch_unwind().await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(self.failure(error)),
            Err(payload) => Err(self.failure(panic_message(payload).into())),
        }
    }
}

impl fmt::Debug for Disposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposable")
            .field("name", &self.name)
            .field("sync", &self.hooks.sync.is_some())
            .field("async", &self.hooks.asynchronous.is_some())
            .finish()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

/// Append-only disposal list with a terminal flag.
///
/// Entries keep creation order; teardown walks them in reverse (LIFO). The owner
/// holds this behind a lock only long enough to push or to take the entries, so
/// no lock is held while disposables run.
#[derive(Default)]
pub(crate) struct DisposeBag {
    entries: Vec<Disposable>,
    disposed: bool,
}

impl DisposeBag {
    /// Appends an entry; a terminal bag refuses it and hands it back.
    pub(crate) fn push(&mut self, disposable: Disposable) -> Result<(), Disposable> {
        if self.disposed {
            return Err(disposable);
        }
        self.entries.push(disposable);
        Ok(())
    }

    /// Marks the bag terminal and returns its entries; `None` if it already was.
    pub(crate) fn take_for_disposal(&mut self) -> Option<Vec<Disposable>> {
        if self.disposed {
            return None;
        }
        self.disposed = true;
        Some(std::mem::take(&mut self.entries))
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Appends a freshly created component to `bag`.
///
/// A terminal bag can no longer own the component, so it is disposed on the
/// spot and its name returned as the error.
pub(crate) fn track_created(bag: &Mutex<DisposeBag>, disposable: Disposable) -> Result<(), &'static str> {
    let rejected = match bag.lock().push(disposable) {
        Ok(()) => return Ok(()),
        Err(rejected) => rejected,
    };
    let name = rejected.name();
    // failures are logged by the hook
    let _ = rejected.dispose_sync();
    Err(name)
}

/// Disposes `entries` in reverse order, attempting every one of them.
pub(crate) fn dispose_all_reverse(entries: Vec<Disposable>) -> Result<(), AggregateDisposalError> {
    let attempted = entries.len();
    let failures = entries
        .into_iter()
        .rev()
        .filter_map(|d| d.dispose_sync().err())
        .collect();
    AggregateDisposalError::check(attempted, failures)
}

/// Asynchronous counterpart of [`dispose_all_reverse`]; entries are awaited one at a time.
pub(crate) async fn dispose_all_reverse_async(entries: Vec<Disposable>) -> Result<(), AggregateDisposalError> {
    let attempted = entries.len();
    let mut failures = Vec::new();
    for disposable in entries.into_iter().rev() {
        if let Err(failure) = disposable.dispose_async().await {
            failures.push(failure);
        }
    }
    AggregateDisposalError::check(attempted, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    impl Dispose for Recorder {
        fn dispose(&self) -> Result<(), DisposeError> {
            self.log.lock().push(self.name);
            if self.fail {
                Err(format!("{} refused", self.name).into())
            } else {
                Ok(())
            }
        }
    }

    fn recorder(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>, fail: bool) -> Disposable {
        Disposable::from_sync(Arc::new(Recorder { name, log: log.clone(), fail }))
    }

    #[test]
    fn disposes_in_reverse_and_continues_after_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let entries = vec![
            recorder("d1", &log, false),
            recorder("d2", &log, true),
            recorder("d3", &log, false),
        ];

        let err = dispose_all_reverse(entries).unwrap_err();
        assert_eq!(*log.lock(), vec!["d3", "d2", "d1"]);
        assert_eq!(err.attempted(), 3);
        assert_eq!(err.succeeded(), 2);
        assert_eq!(err.failures().len(), 1);
        assert!(err.failures()[0].to_string().contains("d2 refused"));
    }

    #[test]
    fn terminal_bag_rejects_new_entries() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bag = DisposeBag::default();
        assert!(bag.push(recorder("a", &log, false)).is_ok());
        assert_eq!(bag.take_for_disposal().map(|e| e.len()), Some(1));
        assert!(bag.take_for_disposal().is_none());
        assert!(bag.push(recorder("b", &log, false)).is_err());
        assert!(bag.is_disposed());
    }

    #[test]
    fn panicking_disposal_is_captured() {
        struct Bomb;
        impl Dispose for Bomb {
            fn dispose(&self) -> Result<(), DisposeError> {
                panic!("boom");
            }
        }

        let err = dispose_all_reverse(vec![Disposable::from_sync(Arc::new(Bomb))]).unwrap_err();
        assert!(err.failures()[0].error.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn dual_disposable_prefers_async_when_awaited() {
        struct Both {
            log: Arc<Mutex<Vec<&'static str>>>,
        }
        impl Dispose for Both {
            fn dispose(&self) -> Result<(), DisposeError> {
                self.log.lock().push("sync");
                Ok(())
            }
        }
        #[async_trait::async_trait]
        impl AsyncDispose for Both {
            async fn dispose_async(&self) -> Result<(), DisposeError> {
                self.log.lock().push("async");
                Ok(())
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let both = || Disposable::from_dual(Arc::new(Both { log: log.clone() }));

        dispose_all_reverse_async(vec![both()]).await.unwrap();
        dispose_all_reverse(vec![both()]).unwrap();
        assert_eq!(*log.lock(), vec!["async", "sync"]);
    }
}
