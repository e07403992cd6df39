use async_trait::async_trait;
use coachline_shared::Signal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Downstream consumer of booking signals (notifications, payout, scoring, analytics).
#[async_trait]
pub trait SignalListener: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, signal: &Signal) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[derive(Default)]
struct Dispatch {
    listeners: RwLock<Vec<Arc<dyn SignalListener>>>,
    in_flight: AtomicUsize,
    idle: Notify,
}

/// Held by each spawned delivery; the last one out wakes `settled` waiters.
struct Delivery(Arc<Dispatch>);

impl Drop for Delivery {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Fire-and-forget fan-out of signals to independent listeners.
///
/// Emission happens after the originating state change has committed. Each
/// listener runs in its own task, so a slow or failing listener never holds
/// up the caller or the other listeners. Failures are logged and dropped.
#[derive(Clone, Default)]
pub struct SignalBus {
    inner: Arc<Dispatch>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn SignalListener>) {
        self.inner
            .listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Hand `signal` to every listener without waiting for any of them.
    /// Must be called from within a tokio runtime.
    pub fn emit(&self, signal: Signal) {
        let listeners = self
            .inner
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        debug!("Emitting {} to {} listeners", signal.name(), listeners.len());

        let signal = Arc::new(signal);
        for listener in listeners {
            self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
            let delivery = Delivery(self.inner.clone());
            let signal = signal.clone();

            tokio::spawn(async move {
                let _delivery = delivery;
                if let Err(e) = listener.handle(&signal).await {
                    warn!(
                        "Listener {} failed on {} for {}: {}",
                        listener.name(),
                        signal.name(),
                        signal.subject_id(),
                        e
                    );
                }
            });
        }
    }

    /// Wait until every delivery has finished, including signals emitted by
    /// listeners while handling. Used by tests and on shutdown.
    pub async fn settled(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.inner.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Keeps every signal it sees. Useful for tests and local runs.
#[derive(Default)]
pub struct SignalRecorder {
    seen: Mutex<Vec<Signal>>,
}

impl SignalRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.signals().iter().filter(|s| s.name() == name).count()
    }
}

#[async_trait]
impl SignalListener for SignalRecorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    async fn handle(&self, signal: &Signal) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(signal.clone());
        Ok(())
    }
}
