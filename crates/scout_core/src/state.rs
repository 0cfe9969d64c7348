use std::fmt;

use crate::{filter_and_sort, Repo, ResultSnapshot, SearchPage};

/// First page index of every session.
pub const STARTING_PAGE: u32 = 1;

/// Why a fetch was issued. Only `LoadMore` advances the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Start,
    LoadMore,
    Retry,
}

/// Permission to run one service call, handed out by the session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub id: u64,
    pub generation: u64,
    pub query: String,
    pub page: u32,
    pub kind: FetchKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    NoSession,
    QueryMismatch { active: String, requested: String },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NoSession => write!(f, "no active session"),
            RejectReason::QueryMismatch { active, requested } => {
                write!(f, "query {requested:?} does not match active query {active:?}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Admitted(FetchTicket),
    /// A fetch is already outstanding; the request is dropped.
    Busy,
    Rejected(RejectReason),
}

/// What a session operation ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Succeeded,
    Failed,
    Skipped,
    Rejected,
    /// A newer session started while the fetch was in flight; its result was dropped.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub outcome: FetchOutcome,
    pub snapshot: Option<ResultSnapshot>,
}

/// Accumulated results, pagination cursor and in-flight guard of one query session.
///
/// Pure state: the caller runs the service call between [`SessionState::admit`]
/// (or [`SessionState::start`]) and [`SessionState::complete`], and is responsible
/// for serializing access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    query: Option<String>,
    cache: Vec<Repo>,
    cursor: u32,
    generation: u64,
    next_fetch_id: u64,
    in_flight: Option<u64>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            query: None,
            cache: Vec::new(),
            cursor: STARTING_PAGE,
            generation: 0,
            next_fetch_id: 1,
            in_flight: None,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a new session for `query`, discarding everything from the previous one.
    ///
    /// Never refused: a fetch still outstanding for an older session becomes stale.
    pub fn start(&mut self, query: &str) -> FetchTicket {
        self.generation += 1;
        self.cursor = STARTING_PAGE;
        self.cache.clear();
        self.query = Some(query.to_string());
        self.issue(FetchKind::Start, query.to_string())
    }

    /// Checks the guard and, if free, claims it for a `LoadMore` or `Retry` fetch.
    ///
    /// Check and claim happen in one call so two callers cannot both pass.
    pub fn admit(&mut self, kind: FetchKind, query: &str) -> Admission {
        if self.is_fetching() {
            return Admission::Busy;
        }
        match self.query.as_deref() {
            None => Admission::Rejected(RejectReason::NoSession),
            Some(active) if active != query => Admission::Rejected(RejectReason::QueryMismatch {
                active: active.to_string(),
                requested: query.to_string(),
            }),
            Some(active) => {
                let active = active.to_string();
                Admission::Admitted(self.issue(kind, active))
            }
        }
    }

    /// Applies the result of the service call made for `ticket`.
    pub fn complete<E: fmt::Display>(
        &mut self,
        ticket: &FetchTicket,
        result: Result<SearchPage, E>,
    ) -> Completion {
        if ticket.generation != self.generation {
            return Completion {
                outcome: FetchOutcome::Superseded,
                snapshot: None,
            };
        }
        self.release(ticket);

        match result {
            Ok(page) => {
                self.cache.extend(page.items);
                if ticket.kind == FetchKind::LoadMore {
                    self.cursor += 1;
                }
                Completion {
                    outcome: FetchOutcome::Succeeded,
                    snapshot: Some(ResultSnapshot::Success(filter_and_sort(
                        &self.cache,
                        &ticket.query,
                    ))),
                }
            }
            Err(err) => Completion {
                outcome: FetchOutcome::Failed,
                snapshot: Some(ResultSnapshot::Failure(err.to_string())),
            },
        }
    }

    /// Clears the guard if `ticket` still holds it. Used when a call is abandoned.
    pub fn release(&mut self, ticket: &FetchTicket) {
        if self.in_flight == Some(ticket.id) {
            self.in_flight = None;
        }
    }

    /// Current filtered and ordered view over the accumulated results.
    pub fn visible(&self) -> Vec<Repo> {
        match self.query.as_deref() {
            Some(query) => filter_and_sort(&self.cache, query),
            None => Vec::new(),
        }
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    fn issue(&mut self, kind: FetchKind, query: String) -> FetchTicket {
        let id = self.next_fetch_id;
        self.next_fetch_id += 1;
        self.in_flight = Some(id);
        FetchTicket {
            id,
            generation: self.generation,
            query,
            page: self.cursor,
            kind,
        }
    }
}
