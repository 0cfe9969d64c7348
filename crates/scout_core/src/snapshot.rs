use crate::Repo;

/// One published state of the visible result list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultSnapshot {
    /// Filtered and ordered view over everything fetched for the active query.
    Success(Vec<Repo>),
    /// A fetch failed; the description is meant for display.
    Failure(String),
}

impl ResultSnapshot {
    pub fn is_success(&self) -> bool {
        matches!(self, ResultSnapshot::Success(_))
    }

    pub fn repos(&self) -> Option<&[Repo]> {
        match self {
            ResultSnapshot::Success(repos) => Some(repos),
            ResultSnapshot::Failure(_) => None,
        }
    }
}
