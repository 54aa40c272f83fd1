//! Circular dependency detection infrastructure.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};

// Per-thread stack of (container id, service) pairs currently being constructed
thread_local! {
    static RESOLUTION_STACK: RefCell<Vec<(u64, &'static str)>> = const { RefCell::new(Vec::new()) };
}

/// Guard for one frame of the thread-local resolution stack.
///
/// Entering fails instead of pushing when `name` is already being resolved by
/// the same container on this thread, or when the stack is `max_depth` frames
/// deep. Dropping the guard pops the frame.
pub(crate) struct ResolutionGuard {
    frame: (u64, &'static str),
}

impl ResolutionGuard {
    pub(crate) fn enter(container: u64, name: &'static str, max_depth: usize) -> DiResult<Self> {
        let frame = (container, name);
        RESOLUTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();

            if let Some(start) = stack.iter().position(|f| *f == frame) {
                let mut path: Vec<&'static str> = stack[start..].iter().map(|&(_, n)| n).collect();
                path.push(name);
                return Err(DiError::Circular(path));
            }

            if stack.len() >= max_depth {
                return Err(DiError::DepthExceeded(stack.len()));
            }

            stack.push(frame);
            Ok(Self { frame })
        })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            debug_assert_eq!(popped, Some(self.frame));
        });
    }
}

/// Runs `f` with `name`, resolved by `container`, pushed on the resolution stack.
pub(crate) fn with_resolution_guard<T, F>(container: u64, name: &'static str, max_depth: usize, f: F) -> DiResult<T>
where
    F: FnOnce() -> DiResult<T>,
{
    let _guard = ResolutionGuard::enter(container, name, max_depth)?;
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_reentry_reports_full_path() {
        let result = with_resolution_guard(1, "A", 16, || {
            with_resolution_guard(1, "B", 16, || with_resolution_guard(1, "A", 16, || Ok(())))
        });
        match result {
            Err(DiError::Circular(path)) => assert_eq!(path, vec!["A", "B", "A"]),
            other => panic!("expected circular error, got {:?}", other),
        }
        // stack fully unwound
        assert!(with_resolution_guard(1, "A", 16, || Ok(())).is_ok());
    }

    #[test]
    fn path_starts_at_the_repeated_frame() {
        let result = with_resolution_guard(1, "Root", 16, || {
            with_resolution_guard(1, "A", 16, || {
                with_resolution_guard(1, "B", 16, || with_resolution_guard(1, "A", 16, || Ok(())))
            })
        });
        assert!(matches!(result, Err(DiError::Circular(path)) if path == vec!["A", "B", "A"]));
    }

    #[test]
    fn same_service_in_another_container_is_not_a_cycle() {
        let result = with_resolution_guard(1, "A", 16, || with_resolution_guard(2, "A", 16, || Ok(7)));
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn depth_limit_is_enforced() {
        let result = with_resolution_guard(1, "A", 1, || with_resolution_guard(1, "B", 1, || Ok(())));
        assert!(matches!(result, Err(DiError::DepthExceeded(1))));
    }
}
