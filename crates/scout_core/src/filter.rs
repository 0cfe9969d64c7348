use std::cmp::Ordering;

use crate::Repo;

/// Selects the repos whose name or description mentions `query` (ignoring case)
/// and orders them by stars, most starred first, then by name.
///
/// Always computed over the whole slice; the sort is stable, so repos that
/// compare equal keep their arrival order.
pub fn filter_and_sort(repos: &[Repo], query: &str) -> Vec<Repo> {
    let needle = query.to_lowercase();
    let mut matching: Vec<Repo> = repos
        .iter()
        .filter(|repo| mentions(repo, &needle))
        .cloned()
        .collect();
    matching.sort_by(by_stars_then_name);
    matching
}

fn mentions(repo: &Repo, needle: &str) -> bool {
    repo.name.to_lowercase().contains(needle)
        || repo
            .description
            .as_deref()
            .is_some_and(|description| description.to_lowercase().contains(needle))
}

fn by_stars_then_name(a: &Repo, b: &Repo) -> Ordering {
    b.stars.cmp(&a.stars).then_with(|| a.name.cmp(&b.name))
}
