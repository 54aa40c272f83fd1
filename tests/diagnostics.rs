use async_trait::async_trait;
use ferrous_lifestyle::{
    diagnostics, Analyzer, AsyncDispose, DiError, DiagnosticKind, DiagnosticResult, DiagnosticRule,
    DiagnosticSeverity, Dispose, DisposeError, Lifestyle, Registration, ServiceCollection, VerificationOption,
};
use std::sync::Arc;

struct Connection;

impl Dispose for Connection {
    fn dispose(&self) -> Result<(), DisposeError> {
        Ok(())
    }
}

trait IPlugin: Send + Sync {
    fn name(&self) -> &'static str;
}

trait IService: Send + Sync {}

struct DisposablePlugin;

impl IPlugin for DisposablePlugin {
    fn name(&self) -> &'static str {
        "disposable"
    }
}

impl IService for DisposablePlugin {}

impl Dispose for DisposablePlugin {
    fn dispose(&self) -> Result<(), DisposeError> {
        Ok(())
    }
}

struct Streamer;

#[async_trait]
impl AsyncDispose for Streamer {
    async fn dispose_async(&self) -> Result<(), DisposeError> {
        Ok(())
    }
}

struct Channel;

impl Dispose for Channel {
    fn dispose(&self) -> Result<(), DisposeError> {
        Ok(())
    }
}

#[async_trait]
impl AsyncDispose for Channel {
    async fn dispose_async(&self) -> Result<(), DisposeError> {
        Ok(())
    }
}

#[test]
fn test_self_bound_disposable_transient_is_reported() {
    let mut services = ServiceCollection::new();
    services.add_transient_factory::<Connection, _>(|_| Connection).disposable();
    let container = services.build();

    let findings = diagnostics::analyze(&container);
    assert_eq!(findings.len(), 1);

    let finding = &findings[0];
    assert_eq!(finding.kind, DiagnosticKind::DisposableTransientComponent);
    assert_eq!(finding.severity, DiagnosticSeverity::Warning);
    assert_eq!(finding.description, "Connection is registered as transient, but implements Dispose.");
    assert_eq!(finding.registrations.len(), 1);
    assert_eq!(finding.registrations[0].lifestyle(), Lifestyle::Transient);
}

#[test]
fn test_abstraction_bound_disposable_transient_names_the_service() {
    let mut services = ServiceCollection::new();
    services
        .add_transient_trait_factory::<dyn IPlugin, DisposablePlugin, _>(|_| DisposablePlugin, |p| p)
        .disposable();
    let container = services.build();

    let findings = diagnostics::analyze(&container);
    assert_eq!(findings.len(), 1);
    assert_eq!(
        findings[0].description,
        "DisposablePlugin is registered for IPlugin as transient, but implements Dispose."
    );
}

#[test]
fn test_suppressed_registration_is_not_reported() {
    let mut services = ServiceCollection::new();
    services
        .add_transient_factory::<Connection, _>(|_| Connection)
        .disposable()
        .suppress(DiagnosticKind::DisposableTransientComponent, "callers dispose connections themselves");
    let container = services.build();

    assert!(diagnostics::analyze(&container).is_empty());

    let registration = &container.registrations()[0];
    assert_eq!(
        registration.suppressions().justification(DiagnosticKind::DisposableTransientComponent),
        Some("callers dispose connections themselves")
    );
}

#[test]
fn test_scoped_and_singleton_disposables_are_not_reported() {
    let mut services = ServiceCollection::new();
    services.add_scoped_factory::<Connection, _>(|_| Connection).disposable();
    services.add_singleton(Channel).disposable().async_disposable();
    let container = services.build();

    assert!(diagnostics::analyze(&container).is_empty());
}

#[test]
fn test_non_disposable_transient_is_not_reported() {
    struct Plain;

    let mut services = ServiceCollection::new();
    services.add_transient_factory::<Plain, _>(|_| Plain);
    let container = services.build();

    assert!(diagnostics::analyze(&container).is_empty());
}

#[test]
fn test_dual_contract_is_named_dispose() {
    let mut services = ServiceCollection::new();
    services
        .add_transient_factory::<Channel, _>(|_| Channel)
        .async_disposable()
        .disposable();
    let container = services.build();

    let findings = diagnostics::analyze(&container);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].description, "Channel is registered as transient, but implements Dispose.");
}

#[test]
fn test_async_only_contract_is_named_async_dispose() {
    let mut services = ServiceCollection::new();
    services.add_transient_factory::<Streamer, _>(|_| Streamer).async_disposable();
    let container = services.build();

    let findings = diagnostics::analyze(&container);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].description, "Streamer is registered as transient, but implements AsyncDispose.");
}

#[test]
fn test_each_abstraction_gets_its_own_finding() {
    let mut services = ServiceCollection::new();
    services
        .add_transient_trait_factory::<dyn IPlugin, DisposablePlugin, _>(|_| DisposablePlugin, |p| p)
        .disposable();
    services
        .add_transient_trait_factory::<dyn IService, DisposablePlugin, _>(|_| DisposablePlugin, |p| p)
        .disposable();
    let container = services.build();

    let findings = diagnostics::analyze(&container);
    assert_eq!(findings.len(), 2);
    assert!(findings[0].description.contains("registered for IPlugin"));
    assert!(findings[1].description.contains("registered for IService"));
    assert!(!Arc::ptr_eq(&findings[0].registrations[0], &findings[1].registrations[0]));
}

#[test]
fn test_suppression_applies_per_registration() {
    let mut services = ServiceCollection::new();
    services
        .add_transient_trait_factory::<dyn IPlugin, DisposablePlugin, _>(|_| DisposablePlugin, |p| p)
        .disposable()
        .suppress(DiagnosticKind::DisposableTransientComponent, "plugin host disposes plugins");
    services
        .add_transient_trait_factory::<dyn IService, DisposablePlugin, _>(|_| DisposablePlugin, |p| p)
        .disposable();
    let container = services.build();

    let findings = diagnostics::analyze(&container);
    assert_eq!(findings.len(), 1);
    assert!(findings[0].description.contains("IService"));
}

#[test]
fn test_analysis_is_repeatable_and_read_only() {
    let mut services = ServiceCollection::new();
    services.add_transient_factory::<Connection, _>(|_| Connection).disposable();
    let container = services.build();

    let first = diagnostics::analyze(&container);
    let second = diagnostics::analyze(&container);
    assert_eq!(first.len(), second.len());
    assert_eq!(first[0].description, second[0].description);
    assert!(!container.is_verified());
}

#[test]
fn test_finding_display() {
    let mut services = ServiceCollection::new();
    services.add_transient_factory::<Connection, _>(|_| Connection).disposable();
    let container = services.build();

    let findings = diagnostics::analyze(&container);
    assert_eq!(
        findings[0].to_string(),
        "[Warning] Disposable Transient Component: Connection is registered as transient, but implements Dispose."
    );
}

#[test]
fn test_verify_and_diagnose_fails_on_warnings() {
    let mut services = ServiceCollection::new();
    services.add_transient_factory::<Connection, _>(|_| Connection).disposable();
    let container = services.build();

    match container.verify(VerificationOption::VerifyAndDiagnose) {
        Err(DiError::Diagnostics(findings)) => assert_eq!(findings.len(), 1),
        other => panic!("expected diagnostics error, got {:?}", other),
    }
    assert!(!container.is_verified());

    container.verify(VerificationOption::VerifyOnly).unwrap();
    assert!(container.is_verified());
}

struct EverythingIsSuspicious;

impl DiagnosticRule for EverythingIsSuspicious {
    fn kind(&self) -> DiagnosticKind {
        DiagnosticKind::DisposableTransientComponent
    }

    fn analyze(&self, registrations: &[Arc<Registration>]) -> Vec<DiagnosticResult> {
        registrations
            .iter()
            .map(|r| DiagnosticResult::new(self.kind(), r.implementation().friendly_name(), vec![r.clone()]))
            .collect()
    }
}

#[test]
fn test_custom_rules_are_filtered_by_suppressions() {
    struct Quiet;

    let mut services = ServiceCollection::new();
    services.add_singleton(Connection);
    services
        .add_singleton(Quiet)
        .suppress(DiagnosticKind::DisposableTransientComponent, "known");
    let container = services.build();

    let findings = Analyzer::empty().with_rule(EverythingIsSuspicious).analyze(&container);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].description, "Connection");
}
