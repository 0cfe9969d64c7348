use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use scout_core::{Admission, FetchKind, FetchOutcome, FetchTicket, ResultSnapshot, SessionState};
use scout_logging::{scout_debug, scout_info, scout_warn};
use tokio::task::JoinHandle;

use crate::{
    GithubSearchService, SearchError, SearchService, SearchSettings, SnapshotHub, SnapshotStream,
};

struct SessionInner {
    service: Arc<dyn SearchService>,
    page_size: u32,
    state: Mutex<SessionState>,
    hub: SnapshotHub,
}

/// Paginated search over one query at a time, publishing every update as a snapshot.
///
/// Cheap to clone; all clones drive the same session. Operations may be called
/// from any task. At most one service call is outstanding for the active query;
/// `load_more` and `retry` issued while one is running are dropped.
#[derive(Clone)]
pub struct SearchSession {
    inner: Arc<SessionInner>,
}

impl SearchSession {
    pub fn new(service: Arc<dyn SearchService>, page_size: u32) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                service,
                page_size,
                state: Mutex::new(SessionState::new()),
                hub: SnapshotHub::new(),
            }),
        }
    }

    /// Session backed by the GitHub search API.
    pub fn with_github(settings: SearchSettings) -> Result<Self, SearchError> {
        let page_size = settings.page_size;
        let service = GithubSearchService::new(settings)?;
        Ok(Self::new(Arc::new(service), page_size))
    }

    /// Starts a new session for `query`, fetches its first page and returns a
    /// subscription whose first item is the resulting snapshot.
    pub async fn start_session(&self, query: &str) -> SnapshotStream {
        self.start(query).await;
        self.inner.hub.subscribe()
    }

    /// Starts a new session for `query` and fetches its first page.
    pub async fn start(&self, query: &str) -> FetchOutcome {
        let ticket = self.lock_state().start(query);
        scout_info!(
            "session started query={:?} generation={}",
            query,
            ticket.generation
        );
        self.run(ticket).await
    }

    /// Fetches the page at the cursor and advances the cursor if it arrives.
    pub async fn load_more(&self, query: &str) -> FetchOutcome {
        self.fetch(FetchKind::LoadMore, query).await
    }

    /// Fetches the page at the cursor again without advancing it.
    pub async fn retry(&self, query: &str) -> FetchOutcome {
        self.fetch(FetchKind::Retry, query).await
    }

    pub fn spawn_load_more(&self, query: impl Into<String>) -> JoinHandle<FetchOutcome> {
        let session = self.clone();
        let query = query.into();
        tokio::spawn(async move { session.load_more(&query).await })
    }

    pub fn spawn_retry(&self, query: impl Into<String>) -> JoinHandle<FetchOutcome> {
        let session = self.clone();
        let query = query.into();
        tokio::spawn(async move { session.retry(&query).await })
    }

    pub fn subscribe(&self) -> SnapshotStream {
        self.inner.hub.subscribe()
    }

    pub fn latest(&self) -> Option<ResultSnapshot> {
        self.inner.hub.latest()
    }

    pub fn query(&self) -> Option<String> {
        self.lock_state().query().map(ToOwned::to_owned)
    }

    pub fn cursor(&self) -> u32 {
        self.lock_state().cursor()
    }

    pub fn is_fetching(&self) -> bool {
        self.lock_state().is_fetching()
    }

    pub fn cached_len(&self) -> usize {
        self.lock_state().cached_len()
    }

    async fn fetch(&self, kind: FetchKind, query: &str) -> FetchOutcome {
        let admission = self.lock_state().admit(kind, query);
        match admission {
            Admission::Admitted(ticket) => self.run(ticket).await,
            Admission::Busy => {
                scout_debug!("{:?} dropped, fetch already outstanding", kind);
                FetchOutcome::Skipped
            }
            Admission::Rejected(reason) => {
                scout_warn!("{:?} rejected: {}", kind, reason);
                FetchOutcome::Rejected
            }
        }
    }

    async fn run(&self, ticket: FetchTicket) -> FetchOutcome {
        let mut release = ReleaseOnDrop {
            state: &self.inner.state,
            ticket: &ticket,
            armed: true,
        };

        let service_query = self.inner.service.augment_query(&ticket.query);
        scout_debug!(
            "{:?} fetching page={} query={:?}",
            ticket.kind,
            ticket.page,
            service_query
        );
        let result = self
            .inner
            .service
            .search(&service_query, ticket.page, self.inner.page_size)
            .await;
        release.armed = false;

        let mut state = self.lock_state();
        let completion = state.complete(&ticket, result);
        if let Some(snapshot) = completion.snapshot {
            // Published under the state lock so a superseded session can never
            // overwrite the snapshot of the one that replaced it.
            self.inner.hub.publish(snapshot);
        }
        scout_info!(
            "{:?} page={} {:?} cursor={} cached={}",
            ticket.kind,
            ticket.page,
            completion.outcome,
            state.cursor(),
            state.cached_len()
        );
        completion.outcome
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Frees the in-flight guard if the service call is abandoned or panics.
struct ReleaseOnDrop<'a> {
    state: &'a Mutex<SessionState>,
    ticket: &'a FetchTicket,
    armed: bool,
}

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            scout_warn!("{:?} page={} abandoned", self.ticket.kind, self.ticket.page);
            self.state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .release(self.ticket);
        }
    }
}
