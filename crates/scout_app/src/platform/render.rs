use scout_engine::{Repo, ResultSnapshot};

/// Number of repos listed per snapshot; the rest are summarized.
const MAX_ROWS: usize = 10;

pub fn render(snapshot: &ResultSnapshot) -> Vec<String> {
    match snapshot {
        ResultSnapshot::Success(repos) if repos.is_empty() => {
            vec!["no matching repositories".to_string()]
        }
        ResultSnapshot::Success(repos) => {
            let mut lines = Vec::with_capacity(repos.len().min(MAX_ROWS) + 2);
            lines.push(format!("{} matching repositories", repos.len()));
            lines.extend(repos.iter().take(MAX_ROWS).map(render_row));
            if repos.len() > MAX_ROWS {
                lines.push(format!("  ... {} more", repos.len() - MAX_ROWS));
            }
            lines
        }
        ResultSnapshot::Failure(message) => vec![format!("error: {message}")],
    }
}

fn render_row(repo: &Repo) -> String {
    let title = if repo.full_name.is_empty() {
        &repo.name
    } else {
        &repo.full_name
    };
    let mut row = format!("{:>8} \u{2605}  {}", repo.stars, title);
    if let Some(language) = &repo.language {
        row.push_str(&format!(" [{language}]"));
    }
    if let Some(description) = repo.description.as_deref().filter(|d| !d.is_empty()) {
        row.push_str(&format!(" - {description}"));
    }
    row
}
