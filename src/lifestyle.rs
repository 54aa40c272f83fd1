//! Lifestyle definitions.

use std::fmt;

/// How long a created instance is cached and who disposes it.
///
/// # Lifestyle Characteristics
///
/// - **Singleton**: cached for the container's full lifetime, disposed with the container
/// - **Scoped**: cached per [`Scope`](crate::Scope), disposed when the scope ends
/// - **Transient**: never cached and never disposed by the container
///
/// The last point is why a disposable transient is reported by
/// [`DiagnosticKind::DisposableTransientComponent`](crate::DiagnosticKind).
///
/// ```rust
/// use ferrous_lifestyle::Lifestyle;
///
/// assert_eq!(Lifestyle::Transient.to_string(), "transient");
/// assert!(!Lifestyle::Transient.is_tracked_for_disposal());
/// assert!(Lifestyle::Scoped.is_tracked_for_disposal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifestyle {
    /// Single instance per container, cached forever
    Singleton,
    /// Single instance per scope, cached for the scope's lifetime
    Scoped,
    /// New instance per resolution, never cached
    Transient,
}

impl Lifestyle {
    /// Whether instances of this lifestyle have an owner that disposes them.
    pub fn is_tracked_for_disposal(self) -> bool {
        !matches!(self, Lifestyle::Transient)
    }
}

impl fmt::Display for Lifestyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lifestyle::Singleton => "singleton",
            Lifestyle::Scoped => "scoped",
            Lifestyle::Transient => "transient",
        })
    }
}
