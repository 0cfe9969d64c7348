use std::sync::{Mutex, MutexGuard, PoisonError};

use futures_util::Stream;
use scout_core::ResultSnapshot;
use scout_logging::scout_warn;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

const SNAPSHOT_CAPACITY: usize = 64;

struct HubInner {
    latest: Option<ResultSnapshot>,
    tx: broadcast::Sender<ResultSnapshot>,
}

/// Broadcast of result snapshots that replays the most recent one to new subscribers.
pub struct SnapshotHub {
    inner: Mutex<HubInner>,
}

impl Default for SnapshotHub {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(SNAPSHOT_CAPACITY);
        Self {
            inner: Mutex::new(HubInner { latest: None, tx }),
        }
    }
}

impl SnapshotHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retains `snapshot` and delivers it to every current subscriber. Never waits on them.
    pub fn publish(&self, snapshot: ResultSnapshot) {
        let mut inner = self.lock();
        inner.latest = Some(snapshot.clone());
        // No receivers is fine; the value is retained for later subscribers.
        let _ = inner.tx.send(snapshot);
    }

    pub fn subscribe(&self) -> SnapshotStream {
        let inner = self.lock();
        SnapshotStream {
            pending: inner.latest.clone(),
            rx: inner.tx.subscribe(),
        }
    }

    pub fn latest(&self) -> Option<ResultSnapshot> {
        self.lock().latest.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().tx.receiver_count()
    }

    // Publish and subscribe share this lock so a new subscriber sees the
    // retained value exactly once.
    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One subscriber's view of a [`SnapshotHub`].
pub struct SnapshotStream {
    pending: Option<ResultSnapshot>,
    rx: broadcast::Receiver<ResultSnapshot>,
}

impl SnapshotStream {
    /// Waits for the next snapshot. Returns `None` once the hub is gone.
    ///
    /// A subscriber that falls behind skips to the oldest snapshot still buffered.
    pub async fn next(&mut self) -> Option<ResultSnapshot> {
        if let Some(snapshot) = self.pending.take() {
            return Some(snapshot);
        }
        loop {
            match self.rx.recv().await {
                Ok(snapshot) => return Some(snapshot),
                Err(RecvError::Lagged(skipped)) => {
                    scout_warn!("snapshot subscriber lagged, skipped {} snapshots", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns a snapshot that is already available, without waiting.
    pub fn try_next(&mut self) -> Option<ResultSnapshot> {
        if let Some(snapshot) = self.pending.take() {
            return Some(snapshot);
        }
        loop {
            match self.rx.try_recv() {
                Ok(snapshot) => return Some(snapshot),
                Err(TryRecvError::Lagged(skipped)) => {
                    scout_warn!("snapshot subscriber lagged, skipped {} snapshots", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = ResultSnapshot> + Send {
        futures_util::stream::unfold(self, |mut stream| async move {
            stream.next().await.map(|snapshot| (snapshot, stream))
        })
    }
}
