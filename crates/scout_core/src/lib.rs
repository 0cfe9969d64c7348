//! Reposcout core: search data model, result ordering and the pure session state machine.
mod filter;
mod repo;
mod snapshot;
mod state;

pub use filter::filter_and_sort;
pub use repo::{Repo, SearchPage};
pub use snapshot::ResultSnapshot;
pub use state::{
    Admission, Completion, FetchKind, FetchOutcome, FetchTicket, RejectReason, SessionState,
    STARTING_PAGE,
};
