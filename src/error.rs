//! Error types for scope management, disposal and verification.

use thiserror::Error;

use crate::diagnostics::DiagnosticResult;

/// Error returned by a [`Dispose`](crate::Dispose) or
/// [`AsyncDispose`](crate::AsyncDispose) implementation.
pub type DisposeError = Box<dyn std::error::Error + Send + Sync>;

/// Container and scope errors.
///
/// Diagnostic findings are never reported through this type during analysis; they
/// only surface here when [`Container::verify`](crate::Container::verify) is asked
/// to diagnose and the configuration carries warnings.
///
/// # Examples
///
/// ```rust
/// use ferrous_lifestyle::{DiError, ServiceCollection, Resolver};
///
/// let container = ServiceCollection::new().build();
/// match container.get::<String>() {
///     Err(DiError::NotFound(name)) => assert_eq!(name, "alloc::string::String"),
///     _ => unreachable!(),
/// }
///
/// let circular = DiError::Circular(vec!["ServiceA", "ServiceB", "ServiceA"]);
/// assert_eq!(circular.to_string(), "Circular dependency: ServiceA -> ServiceB -> ServiceA");
/// ```
#[derive(Debug, Error)]
pub enum DiError {
    /// Service not registered
    #[error("Service not found: {0}")]
    NotFound(&'static str),
    /// Type downcast failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),
    /// Circular dependency detected (includes path)
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<&'static str>),
    /// Maximum recursion depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// A scoped service was requested outside of any active scope
    #[error("{service} is registered as scoped, but it was requested outside of an active ({lifestyle}) scope")]
    NoActiveScope {
        service: &'static str,
        lifestyle: &'static str,
    },
    /// A scoped service was registered but no scoped lifestyle governs it
    #[error("{0} is registered as scoped, but no scoped lifestyle is configured for the container")]
    NoScopedLifestyle(&'static str),
    /// A required input was missing or does not belong to the receiver
    #[error("Invalid argument `{name}`: {message}")]
    Argument {
        name: &'static str,
        message: String,
    },
    /// Scope nesting discipline was violated or a terminal object was used
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    /// One or more disposables failed during teardown
    #[error(transparent)]
    Disposal(#[from] AggregateDisposalError),
    /// Verification found diagnostic warnings
    #[error("Verification reported {} diagnostic warning(s): {}", .0.len(), join_findings(.0))]
    Diagnostics(Vec<DiagnosticResult>),
    /// Container options could not be read
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl DiError {
    pub(crate) fn invalid_operation(message: impl Into<String>) -> Self {
        DiError::InvalidOperation(message.into())
    }
}

fn join_findings(findings: &[DiagnosticResult]) -> String {
    findings
        .iter()
        .map(|f| f.description.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A single disposable that failed during teardown.
#[derive(Debug, Error)]
#[error("{component}: {error}")]
pub struct DisposalFailure {
    /// Implementation type name of the failing component
    pub component: &'static str,
    /// What the component's disposal reported
    #[source]
    pub error: DisposeError,
}

/// Failures collected while tearing down a scope or container.
///
/// Teardown never stops at the first failure: every registered disposable is
/// attempted, and only afterwards are the failures reported together.
///
/// ```rust
/// use ferrous_lifestyle::{AggregateDisposalError, DisposalFailure};
///
/// let err = AggregateDisposalError::new(3, vec![DisposalFailure {
///     component: "Connection",
///     error: "socket already closed".into(),
/// }]);
/// assert_eq!(err.succeeded(), 2);
/// assert_eq!(
///     err.to_string(),
///     "1 of 3 disposable(s) failed during teardown: Connection: socket already closed",
/// );
/// ```
#[derive(Debug, Error)]
#[error("{} of {attempted} disposable(s) failed during teardown: {}", .failures.len(), join_failures(.failures))]
pub struct AggregateDisposalError {
    attempted: usize,
    failures: Vec<DisposalFailure>,
}

impl AggregateDisposalError {
    pub fn new(attempted: usize, failures: Vec<DisposalFailure>) -> Self {
        Self { attempted, failures }
    }

    /// Returns `Ok(())` when nothing failed.
    pub(crate) fn check(attempted: usize, failures: Vec<DisposalFailure>) -> Result<(), Self> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Self::new(attempted, failures))
        }
    }

    /// Number of disposables that were attempted.
    pub fn attempted(&self) -> usize {
        self.attempted
    }

    /// Number of disposables that completed without error.
    pub fn succeeded(&self) -> usize {
        self.attempted.saturating_sub(self.failures.len())
    }

    /// The failures, in the order they occurred (reverse creation order).
    pub fn failures(&self) -> &[DisposalFailure] {
        &self.failures
    }
}

fn join_failures(failures: &[DisposalFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for DI operations
pub type DiResult<T> = Result<T, DiError>;
