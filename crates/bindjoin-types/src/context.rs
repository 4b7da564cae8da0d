use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Query-wide cancellation flag shared by every operator of one execution.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Per-execution state handed to operators and predicate evaluation.
#[derive(Debug, Clone)]
pub struct ExecContext {
    label: Arc<str>,
    cancel: CancelSignal,
}

impl ExecContext {
    /// Create a context; `label` names the execution in tracing output.
    pub fn new(label: impl AsRef<str>) -> Self {
        Self {
            label: Arc::from(label.as_ref()),
            cancel: CancelSignal::default(),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Handle that can cancel this execution from elsewhere.
    #[must_use]
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Default for ExecContext {
    fn default() -> Self {
        Self::new("query")
    }
}
