use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ferrous_lifestyle::*;
use std::sync::Arc;

struct Connection;

impl Dispose for Connection {
    fn dispose(&self) -> Result<(), DisposeError> {
        Ok(())
    }
}

fn thread_container() -> (ThreadScopedLifestyle, Container) {
    let lifestyle = ThreadScopedLifestyle::new();
    let mut services = ServiceCollection::with_options(
        ContainerOptions::default().with_default_scoped_lifestyle(lifestyle.clone()),
    );
    services.add_singleton(42u64);
    services.add_scoped_factory::<Connection, _>(|_| Connection).disposable();
    (lifestyle, services.build())
}

fn bench_singleton_hit(c: &mut Criterion) {
    let (_, container) = thread_container();
    let _ = container.get::<u64>().unwrap();

    c.bench_function("singleton_hit_u64", |b| {
        b.iter(|| black_box(container.get::<u64>().unwrap()))
    });
}

fn bench_current_scope(c: &mut Criterion) {
    let (lifestyle, container) = thread_container();
    let scope = lifestyle.begin_scope(&container).unwrap();

    c.bench_function("current_scope_lookup", |b| {
        b.iter(|| black_box(lifestyle.current_scope(&container)))
    });

    scope.dispose().unwrap();
}

fn bench_scoped_hit(c: &mut Criterion) {
    let (lifestyle, container) = thread_container();
    let scope = lifestyle.begin_scope(&container).unwrap();
    let _ = container.get::<Connection>().unwrap();

    c.bench_function("ambient_scoped_hit", |b| {
        b.iter(|| black_box(container.get::<Connection>().unwrap()))
    });

    scope.dispose().unwrap();
}

fn bench_scope_lifecycle(c: &mut Criterion) {
    let (lifestyle, container) = thread_container();

    c.bench_function("begin_resolve_dispose", |b| {
        b.iter(|| {
            lifestyle
                .using(&container, |_| black_box(container.get::<Connection>().unwrap()))
                .unwrap()
        })
    });
}

fn bench_disposal_fan_in(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispose_registered");
    for count in [1usize, 16, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let (_, container) = thread_container();
            b.iter(|| {
                let scope = container.create_scope();
                for _ in 0..count {
                    scope.register_disposer(Arc::new(Connection)).unwrap();
                }
                scope.dispose().unwrap();
            })
        });
    }
    group.finish();
}

fn bench_analyze(c: &mut Criterion) {
    let (_, container) = thread_container();

    c.bench_function("analyze_registrations", |b| {
        b.iter(|| black_box(diagnostics::analyze(&container)))
    });
}

criterion_group!(
    benches,
    bench_singleton_hit,
    bench_current_scope,
    bench_scoped_hit,
    bench_scope_lifecycle,
    bench_disposal_fan_in,
    bench_analyze
);
criterion_main!(benches);
