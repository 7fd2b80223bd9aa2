use std::sync::Mutex;

/// A typed, thread-safe event queue drained exactly once per frame in
/// Pre-Sim (§5). Transport adapters and callbacks running on arbitrary
/// threads push into it; the simulation thread is the sole drainer.
pub struct EventQueue<T> {
    inner: Mutex<Vec<T>>,
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
        }
    }
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue an event. Safe to call from any thread.
    pub fn push(&self, event: T) {
        self.inner.lock().unwrap().push(event);
    }

    /// Drain every queued event, in FIFO order. Intended to be called once
    /// per frame from the simulation thread.
    pub fn drain(&self) -> Vec<T> {
        std::mem::take(&mut *self.inner.lock().unwrap())
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}
