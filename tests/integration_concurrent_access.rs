/// Concurrent access integration tests
///
/// These tests verify at-most-one creation of cached components under
/// concurrent first access, race-free scope manager creation and isolation of
/// ambient scopes between threads.

use ferrous_lifestyle::{
    ContainerOptions, Dispose, DisposeError, Resolver, ScopedLifestyle, ServiceCollection, ThreadScopedLifestyle,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const THREADS: usize = 16;

struct Expensive {
    serial: u32,
}

impl Dispose for Expensive {
    fn dispose(&self) -> Result<(), DisposeError> {
        Ok(())
    }
}

fn slow_factory(created: &Arc<AtomicU32>) -> impl Fn(&ferrous_lifestyle::ResolverContext) -> Expensive + Send + Sync + 'static {
    let created = created.clone();
    move |_| {
        thread::sleep(Duration::from_millis(5));
        Expensive { serial: created.fetch_add(1, Ordering::SeqCst) }
    }
}

#[test]
fn test_scoped_component_created_once_under_contention() {
    let created = Arc::new(AtomicU32::new(0));
    let mut services = ServiceCollection::new();
    services.add_scoped_factory::<Expensive, _>(slow_factory(&created)).disposable();
    let container = services.build();
    let scope = container.create_scope();

    let barrier = Barrier::new(THREADS);
    let serials: Vec<u32> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    scope.get_required::<Expensive>().serial
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(serials.iter().all(|&s| s == 0));
    assert_eq!(scope.pending_disposals(), 1);
    scope.dispose().unwrap();
}

#[test]
fn test_singleton_created_once_under_contention() {
    let created = Arc::new(AtomicU32::new(0));
    let mut services = ServiceCollection::new();
    services.add_singleton_factory::<Expensive, _>(slow_factory(&created)).disposable();
    let container = services.build();

    let barrier = Barrier::new(THREADS);
    let instances: Vec<Arc<Expensive>> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    container.get_required::<Expensive>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(instances.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    container.dispose().unwrap();
}

#[test]
fn test_scope_manager_initialization_is_race_free() {
    let lifestyle = ThreadScopedLifestyle::new();
    let container = ServiceCollection::new().build();

    let barrier = Barrier::new(THREADS);
    let managers: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    container.scope_manager(&lifestyle).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(managers.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}

#[test]
fn test_ambient_scopes_are_isolated_between_threads() {
    let lifestyle = ThreadScopedLifestyle::new();
    let created = Arc::new(AtomicU32::new(0));
    let mut services = ServiceCollection::with_options(
        ContainerOptions::default().with_default_scoped_lifestyle(lifestyle.clone()),
    );
    services.add_scoped_factory::<Expensive, _>(slow_factory(&created)).disposable();
    let container = services.build();

    let barrier = Barrier::new(THREADS);
    let mut serials: Vec<u32> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    lifestyle
                        .using(&container, |_| {
                            barrier.wait();
                            let a = container.get_required::<Expensive>();
                            let b = container.get_required::<Expensive>();
                            assert!(Arc::ptr_eq(&a, &b));
                            a.serial
                        })
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    serials.sort_unstable();
    serials.dedup();
    assert_eq!(serials.len(), THREADS);
    assert_eq!(created.load(Ordering::SeqCst), THREADS as u32);
}

#[test]
fn test_concurrent_registration_for_disposal() {
    struct Counted(Arc<AtomicU32>);
    impl Dispose for Counted {
        fn dispose(&self) -> Result<(), DisposeError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let disposed = Arc::new(AtomicU32::new(0));
    let container = ServiceCollection::new().build();
    let scope = container.create_scope();

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..10 {
                    scope.register_disposer(Arc::new(Counted(disposed.clone()))).unwrap();
                }
            });
        }
    });

    assert_eq!(scope.pending_disposals(), THREADS * 10);
    scope.dispose().unwrap();
    assert_eq!(disposed.load(Ordering::SeqCst), (THREADS * 10) as u32);
}
