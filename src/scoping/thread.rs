//! Scopes bound to the calling thread.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use super::{ContextKey, LifestyleId, ScopedLifestyle};
use crate::error::{DiError, DiResult};
use crate::provider::Scope;

thread_local! {
    static THREAD_SCOPES: RefCell<HashMap<ContextKey, Scope>> = RefCell::new(HashMap::new());
}

/// Binds scopes to the thread that began them.
///
/// A scope begun on one thread is invisible to every other thread and must be
/// ended on the thread that began it. Clones share the same identity.
#[derive(Debug, Clone)]
pub struct ThreadScopedLifestyle {
    id: LifestyleId,
}

impl ThreadScopedLifestyle {
    pub fn new() -> Self {
        Self { id: LifestyleId::next() }
    }
}

impl Default for ThreadScopedLifestyle {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopedLifestyle for ThreadScopedLifestyle {
    fn name(&self) -> &'static str {
        "thread"
    }

    fn id(&self) -> LifestyleId {
        self.id
    }

    fn get_current_scope(&self, key: ContextKey) -> Option<Scope> {
        THREAD_SCOPES
            .try_with(|scopes| scopes.borrow().get(&key).cloned())
            .ok()
            .flatten()
    }

    fn set_current_scope(&self, key: ContextKey, scope: Option<Scope>) -> DiResult<()> {
        let replaced = THREAD_SCOPES
            .try_with(|scopes| {
                let mut scopes = scopes.borrow_mut();
                match scope {
                    Some(scope) => scopes.insert(key, scope),
                    None => scopes.remove(&key),
                }
            })
            .map_err(|_| DiError::invalid_operation("thread-local scope storage is no longer available"))?;
        // dropped after the borrow is released
        drop(replaced);
        Ok(())
    }

    fn to_shared(&self) -> Arc<dyn ScopedLifestyle> {
        Arc::new(self.clone())
    }
}
