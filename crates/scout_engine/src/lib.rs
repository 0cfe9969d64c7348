//! Reposcout engine: search service access and the paginated search session.
mod github;
mod hub;
mod service;
mod session;

pub use github::GithubSearchService;
pub use hub::{SnapshotHub, SnapshotStream};
pub use scout_core::{FetchOutcome, Repo, ResultSnapshot, SearchPage};
pub use service::{SearchError, SearchService, SearchSettings};
pub use session::SearchSession;
