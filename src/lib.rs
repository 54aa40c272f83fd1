//! # ferrous-lifestyle
//!
//! Scoped lifestyles, deterministic disposal and configuration diagnostics for a
//! dependency injection container.
//!
//! ## Features
//!
//! - **Lifestyles**: Singleton, Scoped and Transient registrations
//! - **Ambient scopes**: scopes bound to the calling thread
//!   ([`ThreadScopedLifestyle`]) or to an async flow ([`AsyncScopedLifestyle`]),
//!   nested with parent restoration
//! - **Deterministic disposal**: every scope disposes what it created in reverse
//!   order, attempts every disposable and reports failures as one
//!   [`AggregateDisposalError`]
//! - **Diagnostics**: read-only analysis of the registrations, e.g. transients that
//!   are disposable but would never be disposed, with per-registration suppression
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_lifestyle::{
//!     ContainerOptions, Dispose, DisposeError, Resolver, ScopedLifestyle, ServiceCollection,
//!     ThreadScopedLifestyle, VerificationOption,
//! };
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Transaction {
//!     closed: AtomicBool,
//! }
//!
//! impl Dispose for Transaction {
//!     fn dispose(&self) -> Result<(), DisposeError> {
//!         self.closed.store(true, Ordering::SeqCst);
//!         Ok(())
//!     }
//! }
//!
//! let lifestyle = ThreadScopedLifestyle::new();
//! let mut services = ServiceCollection::with_options(
//!     ContainerOptions::default().with_default_scoped_lifestyle(lifestyle.clone()),
//! );
//! services.add_scoped_factory::<Transaction, _>(|_| Transaction::default()).disposable();
//!
//! let container = services.build();
//! container.verify(VerificationOption::VerifyAndDiagnose).unwrap();
//!
//! let tx = lifestyle
//!     .using(&container, |_scope| container.get_required::<Transaction>())
//!     .unwrap();
//! assert!(tx.closed.load(Ordering::SeqCst));
//! ```
//!
//! ## Lifestyles
//!
//! - **Singleton**: created once per container, disposed by [`Container::dispose`]
//! - **Scoped**: created once per [`Scope`], disposed when the scope ends
//! - **Transient**: created on every resolution, never disposed by the container
//!
//! Disposal contracts are declared at registration time with
//! [`RegistrationBuilder::disposable`] and
//! [`RegistrationBuilder::async_disposable`]; both only compile when the
//! implementation type implements [`Dispose`] or [`AsyncDispose`].

pub mod collection;
pub mod diagnostics;
pub mod error;
pub mod key;
pub mod lifestyle;
pub mod options;
pub mod provider;
pub mod scoping;
pub mod traits;

// Internal modules
mod internal;
mod registration;

pub use collection::{RegistrationBuilder, ServiceCollection};
pub use diagnostics::{
    Analyzer, DiagnosticKind, DiagnosticResult, DiagnosticRule, DiagnosticSeverity,
    DisposableTransientComponentRule, Suppression, Suppressions,
};
pub use error::{AggregateDisposalError, DiError, DiResult, DisposalFailure, DisposeError};
pub use internal::Disposable;
pub use key::{key_of_trait, key_of_type, Key};
pub use lifestyle::Lifestyle;
pub use options::{ContainerOptions, VerificationOption};
pub use provider::{Container, ResolverContext, Scope};
pub use registration::{DisposalCapabilities, ImplementationType, Registration};
#[cfg(feature = "async")]
pub use scoping::AsyncScopedLifestyle;
pub use scoping::{
    ContextKey, CurrentScopeProvider, LifestyleId, ScopeManager, ScopedLifestyle, ThreadScopedLifestyle,
};
pub use traits::{AsyncDispose, Dispose, Resolver, ResolverCore};
