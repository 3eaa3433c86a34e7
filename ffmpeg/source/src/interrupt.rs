/*!
    Cooperative cancellation for blocking demux and decode calls.
*/

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

/**
    Caller-supplied cancellation predicate.
*/
pub type InterruptCallback = Arc<dyn Fn() -> bool + Send + Sync>;

struct GateInner {
    triggered: AtomicBool,
    callback: RwLock<Option<InterruptCallback>>,
}

/**
    Shared cancellation flag polled at every blocking step of the pipeline.

    Cloning yields another handle to the same gate, so a control thread can
    keep a clone while the decode thread polls. The gate reads as interrupted
    when it has been triggered manually or when the attached predicate
    returns true.

    The gate is installed as FFmpeg's I/O interrupt callback when a source is
    opened, so slow network reads abort as soon as it fires.
*/
#[derive(Clone)]
pub struct InterruptGate {
    inner: Arc<GateInner>,
}

impl InterruptGate {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(GateInner {
                triggered: AtomicBool::new(false),
                callback: RwLock::new(None),
            }),
        }
    }

    /**
        Create a gate that consults the given predicate.
    */
    pub fn with_callback<F>(callback: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        let gate = Self::new();
        gate.set_callback(Some(callback));
        gate
    }

    /**
        Replace (or remove) the cancellation predicate.
    */
    pub fn set_callback<F>(&self, callback: Option<F>)
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        *self.inner.callback.write() = callback.map(|f| Arc::new(f) as InterruptCallback);
    }

    /**
        Force the gate to read as interrupted.

        Returns true if this call raised the interrupt, false if one was
        already pending.
    */
    pub fn interrupt(&self) -> bool {
        !self.inner.triggered.swap(true, Ordering::Relaxed)
    }

    /**
        Clear a manual interrupt. The predicate, if any, is left in place.
    */
    pub fn clear(&self) {
        self.inner.triggered.store(false, Ordering::Relaxed);
    }

    /**
        True if [`interrupt`](Self::interrupt) was called and not yet cleared.
    */
    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::Relaxed)
    }

    /**
        Poll the gate.
    */
    pub fn is_interrupted(&self) -> bool {
        if self.is_triggered() {
            return true;
        }

        // Clone out of the lock so a predicate may itself touch the gate
        let callback = self.inner.callback.read().clone();
        callback.is_some_and(|f| f())
    }
}

impl Default for InterruptGate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InterruptGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterruptGate")
            .field("triggered", &self.is_triggered())
            .field("has_callback", &self.inner.callback.read().is_some())
            .finish()
    }
}
