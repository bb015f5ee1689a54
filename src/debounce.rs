/// Trailing-edge debouncer for bursty input streams.
///
/// Emits a settled value once the input has been quiet for the configured
/// delay; every new input restarts the window. At most one timer is armed
/// at any instant, and exactly one settled value is produced per quiet
/// period, equal to the last input received before quiescence.
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

struct Inner<T> {
    raw: T,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

struct Shared<T> {
    inner: Mutex<Inner<T>>,
    settled_tx: watch::Sender<T>,
}

pub struct Debouncer<T> {
    shared: Arc<Shared<T>>,
    settled_rx: watch::Receiver<T>,
    delay: Duration,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(initial: T, delay: Duration) -> Self {
        let (settled_tx, settled_rx) = watch::channel(initial.clone());
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    raw: initial,
                    generation: 0,
                    timer: None,
                }),
                settled_tx,
            }),
            settled_rx,
            delay,
        }
    }

    /// Accept a new raw value and restart the quiet-period timer.
    ///
    /// The previously armed timer is aborted; a generation counter guards
    /// the rare case where it was already past its abort point.
    pub fn input(&self, value: T) {
        let mut inner = self.shared.inner.lock();
        inner.raw = value;
        inner.generation += 1;
        let generation = inner.generation;

        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }

        let shared = Arc::clone(&self.shared);
        let delay = self.delay;
        inner.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let settled = {
                let mut inner = shared.inner.lock();
                if inner.generation != generation {
                    return;
                }
                inner.timer = None;
                inner.raw.clone()
            };
            shared.settled_tx.send_replace(settled);
        }));
    }

    /// The most recent raw input, before any debouncing.
    pub fn raw(&self) -> T {
        self.shared.inner.lock().raw.clone()
    }

    /// The last settled value.
    pub fn settled(&self) -> T {
        self.settled_rx.borrow().clone()
    }

    /// True while a quiet-period timer is outstanding, i.e. the raw input
    /// has moved ahead of the settled value.
    pub fn is_pending(&self) -> bool {
        let raw = self.raw();
        raw != *self.settled_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.shared.settled_tx.subscribe()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}
