use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use pretty_assertions::assert_eq;
use scout_engine::{
    FetchOutcome, Repo, ResultSnapshot, SearchError, SearchPage, SearchService, SearchSession,
};
use tokio::sync::Notify;

const PAGE_SIZE: u32 = 30;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(scout_logging::initialize_for_tests);
}

enum Step {
    Ready(Result<SearchPage, SearchError>),
    Gated(Arc<Notify>, Result<SearchPage, SearchError>),
    Panic,
}

/// Service that replays scripted responses in call order and records each call.
#[derive(Default)]
struct ScriptedService {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<(String, u32, u32)>>,
    qualifier: Option<String>,
}

impl ScriptedService {
    fn new() -> Self {
        Self::default()
    }

    fn with_qualifier(qualifier: &str) -> Self {
        Self {
            qualifier: Some(qualifier.to_string()),
            ..Self::default()
        }
    }

    fn push_page(&self, repos: Vec<Repo>) {
        self.push(Step::Ready(Ok(page(repos))));
    }

    fn push_error(&self, err: SearchError) {
        self.push(Step::Ready(Err(err)));
    }

    fn push_gated(&self, repos: Vec<Repo>) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.push(Step::Gated(gate.clone(), Ok(page(repos))));
        gate
    }

    fn push_panic(&self) {
        self.push(Step::Panic);
    }

    fn push(&self, step: Step) {
        self.steps.lock().unwrap().push_back(step);
    }

    fn calls(&self) -> Vec<(String, u32, u32)> {
        self.calls.lock().unwrap().clone()
    }

    fn pages_requested(&self) -> Vec<u32> {
        self.calls().into_iter().map(|(_, page, _)| page).collect()
    }
}

#[async_trait::async_trait]
impl SearchService for ScriptedService {
    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<SearchPage, SearchError> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), page, page_size));
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected search call");
        match step {
            Step::Ready(result) => result,
            Step::Gated(gate, result) => {
                gate.notified().await;
                result
            }
            Step::Panic => panic!("search backend crashed"),
        }
    }

    fn augment_query(&self, query: &str) -> String {
        match &self.qualifier {
            Some(qualifier) => format!("{query} {qualifier}"),
            None => query.to_string(),
        }
    }
}

fn page(items: Vec<Repo>) -> SearchPage {
    SearchPage {
        total_count: items.len() as u64,
        items,
    }
}

fn session_with(service: &Arc<ScriptedService>) -> SearchSession {
    SearchSession::new(service.clone(), PAGE_SIZE)
}

async fn wait_until_fetching(session: &SearchSession) {
    for _ in 0..200 {
        if session.is_fetching() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session never started fetching");
}

#[tokio::test]
async fn start_session_emits_filtered_and_sorted_results() {
    init_logging();
    let service = Arc::new(ScriptedService::new());
    service.push_page(vec![
        Repo::new("foobar", None, 5),
        Repo::new("baz", Some("a foo thing"), 10),
        Repo::new("unrelated", Some("nothing"), 50),
    ]);
    let session = session_with(&service);

    let mut stream = session.start_session("foo").await;

    assert_eq!(
        stream.next().await,
        Some(ResultSnapshot::Success(vec![
            Repo::new("baz", Some("a foo thing"), 10),
            Repo::new("foobar", None, 5),
        ]))
    );
    assert_eq!(service.calls(), vec![("foo".to_string(), 1, PAGE_SIZE)]);
    assert_eq!(session.cursor(), 1);
    assert_eq!(session.cached_len(), 3);
    assert!(!session.is_fetching());
}

#[tokio::test]
async fn failure_is_reported_and_retry_recovers_without_moving_cursor() {
    init_logging();
    let service = Arc::new(ScriptedService::new());
    service.push_error(SearchError::network("connection refused"));
    service.push_page(vec![Repo::new("x-one", None, 1)]);
    service.push_page(vec![Repo::new("x-two", None, 2)]);
    service.push_page(vec![Repo::new("x-three", None, 3)]);
    let session = session_with(&service);

    let mut stream = session.start_session("x").await;
    match stream.next().await {
        Some(ResultSnapshot::Failure(message)) => assert!(message.contains("connection refused")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(session.cached_len(), 0);
    assert!(!session.is_fetching());

    let retried = session.spawn_retry("x");
    assert_eq!(retried.await.unwrap(), FetchOutcome::Succeeded);
    assert_eq!(
        stream.next().await,
        Some(ResultSnapshot::Success(vec![Repo::new("x-one", None, 1)]))
    );
    assert_eq!(session.cursor(), 1);

    assert_eq!(session.load_more("x").await, FetchOutcome::Succeeded);
    assert_eq!(session.cursor(), 2);
    assert_eq!(session.load_more("x").await, FetchOutcome::Succeeded);
    assert_eq!(session.cursor(), 3);

    assert_eq!(service.pages_requested(), vec![1, 1, 1, 2]);
    assert_eq!(
        stream.next().await.and_then(|s| s.repos().map(|r| r.len())),
        Some(2)
    );
}

#[tokio::test]
async fn failed_load_more_keeps_cursor_and_cache() {
    init_logging();
    let service = Arc::new(ScriptedService::new());
    service.push_page(vec![Repo::new("x", None, 1)]);
    service.push_page(vec![Repo::new("x2", None, 1)]);
    service.push_error(SearchError::status(503, "Service Unavailable"));
    service.push_page(vec![Repo::new("x3", None, 1)]);
    let session = session_with(&service);

    session.start("x").await;
    session.load_more("x").await;
    assert_eq!(session.cursor(), 2);

    assert_eq!(session.load_more("x").await, FetchOutcome::Failed);
    assert_eq!(session.cursor(), 2);
    assert_eq!(session.cached_len(), 2);
    assert!(matches!(session.latest(), Some(ResultSnapshot::Failure(_))));

    assert_eq!(session.retry("x").await, FetchOutcome::Succeeded);
    assert_eq!(session.cursor(), 2);
    assert_eq!(session.cached_len(), 3);
    assert_eq!(service.pages_requested(), vec![1, 1, 2, 2]);
}

#[tokio::test]
async fn requests_while_fetching_are_dropped() {
    init_logging();
    let service = Arc::new(ScriptedService::new());
    service.push_page(vec![Repo::new("rust", None, 1)]);
    let gate = service.push_gated(vec![Repo::new("rust-2", None, 2)]);
    let session = session_with(&service);

    let mut stream = session.start_session("rust").await;
    assert!(stream.next().await.is_some());

    let pending = session.spawn_load_more("rust");
    wait_until_fetching(&session).await;

    assert_eq!(session.load_more("rust").await, FetchOutcome::Skipped);
    assert_eq!(session.retry("rust").await, FetchOutcome::Skipped);
    assert_eq!(stream.try_next(), None);
    assert_eq!(session.cursor(), 1);
    assert_eq!(session.cached_len(), 1);

    gate.notify_one();
    assert_eq!(pending.await.unwrap(), FetchOutcome::Succeeded);
    assert_eq!(session.cursor(), 2);
    assert_eq!(session.cached_len(), 2);
    assert_eq!(service.pages_requested(), vec![1, 1]);
    assert!(stream.try_next().is_some());
    assert_eq!(stream.try_next(), None);
}

#[tokio::test]
async fn concurrent_load_more_admits_exactly_one() {
    init_logging();
    let service = Arc::new(ScriptedService::new());
    service.push_page(Vec::new());
    let gate = service.push_gated(vec![Repo::new("go", None, 1)]);
    let session = session_with(&service);
    session.start("go").await;

    let handles: Vec<_> = (0..8).map(|_| session.spawn_load_more("go")).collect();
    wait_until_fetching(&session).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    gate.notify_one();

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }
    let succeeded = outcomes
        .iter()
        .filter(|outcome| **outcome == FetchOutcome::Succeeded)
        .count();
    assert_eq!(succeeded, 1);
    assert_eq!(outcomes.len() - succeeded, 7);
    assert!(outcomes
        .iter()
        .all(|o| matches!(o, FetchOutcome::Succeeded | FetchOutcome::Skipped)));
    assert_eq!(session.cursor(), 2);
    assert_eq!(service.calls().len(), 2);
}

#[tokio::test]
async fn duplicates_across_pages_are_kept() {
    init_logging();
    let service = Arc::new(ScriptedService::new());
    service.push_page(vec![
        Repo::new("react", Some("page one"), 200),
        Repo::new("vue", None, 300),
    ]);
    service.push_page(vec![Repo::new("react", Some("page two"), 200)]);
    let session = session_with(&service);

    session.start("react").await;
    session.load_more("react").await;

    let view = match session.latest() {
        Some(ResultSnapshot::Success(view)) => view,
        other => panic!("expected success, got {other:?}"),
    };
    assert_eq!(
        view,
        vec![
            Repo::new("react", Some("page one"), 200),
            Repo::new("react", Some("page two"), 200),
        ]
    );
    assert_eq!(session.cached_len(), 3);
}

#[tokio::test]
async fn new_session_replaces_previous_results() {
    init_logging();
    let service = Arc::new(ScriptedService::new());
    service.push_page(vec![Repo::new("alpha", None, 1)]);
    service.push_page(vec![Repo::new("alpha-2", None, 1)]);
    service.push_page(vec![Repo::new("beta", None, 2)]);
    let session = session_with(&service);

    session.start("alpha").await;
    session.load_more("alpha").await;
    assert_eq!(session.cursor(), 2);

    let mut stream = session.start_session("beta").await;
    assert_eq!(
        stream.next().await,
        Some(ResultSnapshot::Success(vec![Repo::new("beta", None, 2)]))
    );
    assert_eq!(session.cursor(), 1);
    assert_eq!(session.cached_len(), 1);
    assert_eq!(session.query().as_deref(), Some("beta"));
    assert_eq!(service.calls()[2], ("beta".to_string(), 1, PAGE_SIZE));
}

#[tokio::test]
async fn stale_fetch_does_not_leak_into_new_session() {
    init_logging();
    let service = Arc::new(ScriptedService::new());
    let gate = service.push_gated(vec![Repo::new("old", Some("new"), 9)]);
    service.push_page(vec![Repo::new("new", None, 1)]);
    let session = session_with(&service);

    let old = {
        let session = session.clone();
        tokio::spawn(async move { session.start("old").await })
    };
    wait_until_fetching(&session).await;

    assert_eq!(session.start("new").await, FetchOutcome::Succeeded);
    gate.notify_one();
    assert_eq!(old.await.unwrap(), FetchOutcome::Superseded);

    assert_eq!(
        session.latest(),
        Some(ResultSnapshot::Success(vec![Repo::new("new", None, 1)]))
    );
    assert_eq!(session.cached_len(), 1);
    assert!(!session.is_fetching());
}

#[tokio::test]
async fn mismatched_query_is_rejected() {
    init_logging();
    let service = Arc::new(ScriptedService::new());
    service.push_page(vec![Repo::new("a", None, 1)]);
    let session = session_with(&service);

    assert_eq!(session.load_more("a").await, FetchOutcome::Rejected);
    session.start("a").await;
    let mut stream = session.subscribe();
    assert!(stream.try_next().is_some());

    assert_eq!(session.load_more("b").await, FetchOutcome::Rejected);
    assert_eq!(session.retry("b").await, FetchOutcome::Rejected);
    assert_eq!(stream.try_next(), None);
    assert_eq!(service.calls().len(), 1);
    assert_eq!(session.cursor(), 1);
}

#[tokio::test]
async fn abandoned_fetch_frees_the_guard() {
    init_logging();
    let service = Arc::new(ScriptedService::new());
    service.push_page(vec![Repo::new("slow", None, 1)]);
    let _never = service.push_gated(Vec::new());
    service.push_page(vec![Repo::new("slow-2", None, 1)]);
    let session = session_with(&service);
    session.start("slow").await;

    let timed_out =
        tokio::time::timeout(Duration::from_millis(50), session.load_more("slow")).await;
    assert!(timed_out.is_err());
    assert!(!session.is_fetching());
    assert_eq!(session.cursor(), 1);

    assert_eq!(session.retry("slow").await, FetchOutcome::Succeeded);
    assert_eq!(session.cursor(), 1);
    assert_eq!(session.cached_len(), 2);
}

#[tokio::test]
async fn service_sees_augmented_query_but_filter_uses_original() {
    init_logging();
    let service = Arc::new(ScriptedService::with_qualifier("in:name,description"));
    service.push_page(vec![
        Repo::new("tokio", None, 10),
        Repo::new("name-only", Some("in:name"), 99),
    ]);
    let session = session_with(&service);

    let mut stream = session.start_session("tokio").await;

    assert_eq!(
        stream.next().await,
        Some(ResultSnapshot::Success(vec![Repo::new("tokio", None, 10)]))
    );
    assert_eq!(service.calls()[0].0, "tokio in:name,description");
}

#[tokio::test]
async fn late_subscribers_receive_latest_snapshot_once() {
    init_logging();
    let service = Arc::new(ScriptedService::new());
    service.push_page(vec![Repo::new("a", None, 1)]);
    service.push_page(vec![Repo::new("ab", None, 2)]);
    let session = session_with(&service);

    let mut early = session.start_session("a").await;
    session.load_more("a").await;

    let mut late = session.subscribe();
    let latest = session.latest();
    assert_eq!(late.try_next(), latest);
    assert_eq!(late.try_next(), None);

    assert_eq!(early.try_next().and_then(|s| s.repos().map(<[Repo]>::len)), Some(1));
    assert_eq!(early.try_next(), latest);
    assert_eq!(early.try_next(), None);
}

#[tokio::test]
async fn panicking_service_call_frees_the_guard() {
    init_logging();
    let service = Arc::new(ScriptedService::new());
    service.push_page(vec![Repo::new("crash", None, 1)]);
    service.push_panic();
    service.push_page(vec![Repo::new("crash-2", None, 2)]);
    let session = session_with(&service);
    session.start("crash").await;
    let before = session.latest();

    let joined = session.spawn_load_more("crash").await;
    assert!(joined.unwrap_err().is_panic());
    assert!(!session.is_fetching());
    assert_eq!(session.cursor(), 1);
    assert_eq!(session.cached_len(), 1);
    assert_eq!(session.latest(), before);

    assert_eq!(session.load_more("crash").await, FetchOutcome::Succeeded);
    assert_eq!(session.cursor(), 2);
    assert_eq!(session.cached_len(), 2);
    assert_eq!(service.pages_requested(), vec![1, 1, 1]);
}
