use crate::types::ProgressState;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Observer for export progress. Purely informational: implementations
/// must not affect control flow.
pub trait ProgressObserver: Send {
    fn progress(&mut self, state: &ProgressState);
}

/// Observer that discards all updates
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ProgressObserver for NullObserver {
    fn progress(&mut self, _state: &ProgressState) {}
}

/// Cooperative cancellation flag.
///
/// The driver checks it only between capture units; a capture in flight
/// cannot be interrupted without leaving the tree mutated. Cancellation
/// triggers the same unconditional restoration path as failure.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
