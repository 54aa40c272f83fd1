//! Read-only analysis of a container's registration graph.
//!
//! Analysis never fails and never mutates the container: it returns advisory
//! [`DiagnosticResult`]s, computed fresh on every call. A registration opts out
//! of a finding with [`RegistrationBuilder::suppress`](crate::RegistrationBuilder::suppress).
//!
//! # Examples
//!
//! ```
//! use ferrous_lifestyle::{diagnostics, Dispose, DisposeError, ServiceCollection, DiagnosticSeverity};
//!
//! struct Connection;
//! impl Dispose for Connection {
//!     fn dispose(&self) -> Result<(), DisposeError> {
//!         Ok(())
//!     }
//! }
//!
//! let mut services = ServiceCollection::new();
//! services.add_transient_factory::<Connection, _>(|_| Connection).disposable();
//!
//! let container = services.build();
//! let findings = diagnostics::analyze(&container);
//! assert_eq!(findings.len(), 1);
//! assert_eq!(findings[0].severity, DiagnosticSeverity::Warning);
//! assert_eq!(
//!     findings[0].description,
//!     "Connection is registered as transient, but implements Dispose."
//! );
//! ```

use std::fmt;
use std::sync::Arc;

use crate::provider::Container;
use crate::registration::Registration;

mod disposable_transient;
mod suppression;

pub use disposable_transient::DisposableTransientComponentRule;
pub use suppression::{Suppression, Suppressions};

/// The kinds of defects the analyzer can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DiagnosticKind {
    /// A transient registration whose implementation has a disposal contract
    DisposableTransientComponent,
}

impl DiagnosticKind {
    pub fn severity(self) -> DiagnosticSeverity {
        match self {
            DiagnosticKind::DisposableTransientComponent => DiagnosticSeverity::Warning,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticKind::DisposableTransientComponent => "Disposable Transient Component",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticSeverity {
    Information,
    Warning,
    Error,
}

/// One finding about the registration graph.
#[derive(Debug, Clone)]
pub struct DiagnosticResult {
    pub kind: DiagnosticKind,
    pub severity: DiagnosticSeverity,
    pub description: String,
    /// The offending registration(s)
    pub registrations: Vec<Arc<Registration>>,
}

impl DiagnosticResult {
    pub fn new(kind: DiagnosticKind, description: impl Into<String>, registrations: Vec<Arc<Registration>>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            description: description.into(),
            registrations,
        }
    }
}

impl fmt::Display for DiagnosticResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}: {}", self.severity, self.kind, self.description)
    }
}

/// A pluggable analysis pass over the verified registrations.
pub trait DiagnosticRule: Send + Sync {
    fn kind(&self) -> DiagnosticKind;

    /// Reports every registration that exhibits the defect, ignoring suppressions.
    fn analyze(&self, registrations: &[Arc<Registration>]) -> Vec<DiagnosticResult>;
}

/// Runs a set of [`DiagnosticRule`]s and applies suppressions.
pub struct Analyzer {
    rules: Vec<Box<dyn DiagnosticRule>>,
}

impl Analyzer {
    /// An analyzer carrying the built-in rules.
    pub fn new() -> Self {
        Self {
            rules: vec![Box::new(DisposableTransientComponentRule)],
        }
    }

    /// An analyzer with no rules.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule(mut self, rule: impl DiagnosticRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn analyze(&self, container: &Container) -> Vec<DiagnosticResult> {
        let registrations = container.registrations();
        let findings: Vec<DiagnosticResult> = self
            .rules
            .iter()
            .flat_map(|rule| rule.analyze(registrations))
            .filter(|finding| !finding.registrations.iter().any(|r| r.is_suppressed(finding.kind)))
            .collect();

        tracing::debug!(
            container = container.id(),
            registrations = registrations.len(),
            findings = findings.len(),
            "analyzed registrations"
        );
        findings
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Analyzes `container` with the built-in rules.
pub fn analyze(container: &Container) -> Vec<DiagnosticResult> {
    Analyzer::new().analyze(container)
}
