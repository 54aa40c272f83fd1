//! Per-container, per-lifestyle scope manager.

use std::fmt;
use std::sync::Arc;

use super::{ContextKey, ScopedLifestyle};
use crate::error::{DiError, DiResult};
use crate::provider::{Container, Scope};

/// Begins and ends ambient scopes for one (container, lifestyle) pair.
///
/// The manager holds no stack: each scope links to its parent, becomes current
/// when begun and hands "current" back to its parent when ended. Created lazily
/// by [`Container::scope_manager`]; exactly one exists per pair until the
/// container is disposed.
pub struct ScopeManager {
    key: ContextKey,
    lifestyle: Arc<dyn ScopedLifestyle>,
}

impl ScopeManager {
    pub(crate) fn new(key: ContextKey, lifestyle: Arc<dyn ScopedLifestyle>) -> Self {
        Self { key, lifestyle }
    }

    pub fn key(&self) -> ContextKey {
        self.key
    }

    pub fn lifestyle(&self) -> &Arc<dyn ScopedLifestyle> {
        &self.lifestyle
    }

    pub fn current_scope(&self) -> Option<Scope> {
        self.lifestyle.get_current_scope(self.key)
    }

    pub(crate) fn begin_scope(self: &Arc<Self>, container: &Container) -> DiResult<Scope> {
        let parent = self.current_scope();
        let scope = Scope::new(container.clone(), parent.as_ref(), Some(self.clone()));
        self.lifestyle.set_current_scope(self.key, Some(scope.clone()))?;
        tracing::debug!(
            scope = scope.id(),
            parent = parent.as_ref().map(Scope::id),
            lifestyle = self.lifestyle.name(),
            "began scope"
        );
        Ok(scope)
    }

    /// Hands "current" back to the parent of `scope`, which must be innermost.
    pub(crate) fn end_scope(&self, scope: &Scope) -> DiResult<()> {
        match self.current_scope() {
            Some(current) if current.ptr_eq(scope) => {}
            Some(current) => {
                return Err(DiError::invalid_operation(format!(
                    "scope {} cannot be ended while scope {} is the innermost active {} scope; \
                     scopes must be ended in the reverse order in which they were begun",
                    scope.id(),
                    current.id(),
                    self.lifestyle.name()
                )))
            }
            None => {
                return Err(DiError::invalid_operation(format!(
                    "scope {} is not active in the calling {} context",
                    scope.id(),
                    self.lifestyle.name()
                )))
            }
        }

        let parent = scope.parent();
        tracing::debug!(
            scope = scope.id(),
            restored = parent.as_ref().map(Scope::id),
            lifestyle = self.lifestyle.name(),
            "ending scope"
        );
        self.lifestyle.set_current_scope(self.key, parent)
    }
}

impl fmt::Debug for ScopeManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeManager")
            .field("key", &self.key)
            .field("lifestyle", &self.lifestyle.name())
            .finish()
    }
}
