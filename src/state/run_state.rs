use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Process-wide Idle/Running flag for indexing runs
///
/// The active run is identified by a generation number (0 means idle), so a
/// finishing run can only clear the flag if it is still the current one. All
/// transitions use compare-and-set.
#[derive(Debug, Default)]
pub struct RunState {
    active: AtomicU64,
    generation: AtomicU64,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transitions Idle -> Running and returns the new run's generation
    ///
    /// Returns None if a run is already active.
    pub fn try_begin(&self) -> Option<u64> {
        let id = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.active
            .compare_exchange(0, id, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| id)
    }

    /// Transitions Running -> Idle if `id` is still the active run
    pub fn finish(&self, id: u64) -> bool {
        self.active
            .compare_exchange(id, 0, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Unconditionally returns to Idle
    pub fn clear(&self) {
        self.active.store(0, Ordering::SeqCst);
    }

    /// Generation of the active run, if any
    pub fn current(&self) -> Option<u64> {
        match self.active.load(Ordering::SeqCst) {
            0 => None,
            id => Some(id),
        }
    }

    pub fn is_running(&self) -> bool {
        self.current().is_some()
    }
}

/// Clears the run flag when dropped, unless the run was already replaced
///
/// Held by the run task so that completion, errors and panics all return the
/// coordinator to Idle.
pub struct RunGuard {
    state: Arc<RunState>,
    id: u64,
}

impl RunGuard {
    pub fn new(state: Arc<RunState>, id: u64) -> Self {
        Self { state, id }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.state.finish(self.id);
    }
}

/// Per-run context handed to every site task and crawler
///
/// Stopping a run cancels its token; crawl workers observe the cancellation
/// before each fetch and at every loop iteration.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub generation: u64,
    token: CancellationToken,
}

impl RunContext {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            token: CancellationToken::new(),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_rejects_second_run() {
        let state = RunState::new();
        let first = state.try_begin();
        assert!(first.is_some());
        assert!(state.try_begin().is_none());
        assert_eq!(state.current(), first);
    }

    #[test]
    fn test_finish_only_clears_matching_run() {
        let state = RunState::new();
        let first = state.try_begin().unwrap();
        state.clear();
        let second = state.try_begin().unwrap();

        assert!(!state.finish(first));
        assert!(state.is_running());
        assert!(state.finish(second));
        assert!(!state.is_running());
    }

    #[test]
    fn test_guard_clears_on_drop() {
        let state = Arc::new(RunState::new());
        let id = state.try_begin().unwrap();
        {
            let _guard = RunGuard::new(Arc::clone(&state), id);
        }
        assert!(!state.is_running());
    }

    #[test]
    fn test_context_cancel_propagates_to_clones() {
        let ctx = RunContext::new(1);
        let clone = ctx.clone();
        ctx.cancel();
        assert!(clone.is_cancelled());
    }
}
