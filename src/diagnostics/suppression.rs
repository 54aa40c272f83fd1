//! Per-registration diagnostic suppressions.

use smallvec::SmallVec;

use super::DiagnosticKind;

/// One explicit opt-out, kept with its justification for audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suppression {
    pub kind: DiagnosticKind,
    pub justification: String,
}

/// The diagnostic kinds silenced for a single registration.
///
/// Justifications are recorded as given; their content is not validated.
///
/// ```rust
/// use ferrous_lifestyle::{DiagnosticKind, Suppressions};
///
/// let mut suppressions = Suppressions::default();
/// suppressions.add(DiagnosticKind::DisposableTransientComponent, "disposed by the caller");
/// assert!(suppressions.contains(DiagnosticKind::DisposableTransientComponent));
/// assert_eq!(
///     suppressions.justification(DiagnosticKind::DisposableTransientComponent),
///     Some("disposed by the caller"),
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct Suppressions {
    entries: SmallVec<[Suppression; 1]>,
}

impl Suppressions {
    /// Silences `kind`; a repeated kind replaces the earlier justification.
    pub fn add(&mut self, kind: DiagnosticKind, justification: impl Into<String>) {
        let justification = justification.into();
        match self.entries.iter_mut().find(|s| s.kind == kind) {
            Some(existing) => existing.justification = justification,
            None => self.entries.push(Suppression { kind, justification }),
        }
    }

    pub fn contains(&self, kind: DiagnosticKind) -> bool {
        self.entries.iter().any(|s| s.kind == kind)
    }

    pub fn justification(&self, kind: DiagnosticKind) -> Option<&str> {
        self.entries
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.justification.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Suppression> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_kind_keeps_latest_justification() {
        let mut suppressions = Suppressions::default();
        suppressions.add(DiagnosticKind::DisposableTransientComponent, "first");
        suppressions.add(DiagnosticKind::DisposableTransientComponent, "second");
        assert_eq!(suppressions.iter().count(), 1);
        assert_eq!(
            suppressions.justification(DiagnosticKind::DisposableTransientComponent),
            Some("second")
        );
    }

    #[test]
    fn empty_justification_is_accepted() {
        let mut suppressions = Suppressions::default();
        suppressions.add(DiagnosticKind::DisposableTransientComponent, "");
        assert!(suppressions.contains(DiagnosticKind::DisposableTransientComponent));
    }
}
