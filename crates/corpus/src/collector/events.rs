/// Progress events emitted by the executor.
///
/// Callers bridge these to their own display (progress bars, logs); the
/// executor never depends on a UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectorEvent {
    Started {
        total_backends: usize,
    },
    BackendStarted {
        backend: String,
    },
    BackendCompleted {
        backend: String,
        items: usize,
    },
    BackendFailed {
        backend: String,
        error: String,
    },
    Finished {
        succeeded: usize,
        failed: usize,
    },
}
