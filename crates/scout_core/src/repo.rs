use serde::Deserialize;

/// A repository record as returned by the search service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Repo {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub html_url: String,
    #[serde(rename = "stargazers_count", default)]
    pub stars: u64,
    #[serde(rename = "forks_count", default)]
    pub forks: u64,
    #[serde(default)]
    pub language: Option<String>,
}

impl Repo {
    /// Minimal record with only the fields the result ordering looks at.
    pub fn new(name: impl Into<String>, description: Option<&str>, stars: u64) -> Self {
        let name = name.into();
        Self {
            full_name: name.clone(),
            name,
            description: description.map(ToOwned::to_owned),
            stars,
            ..Self::default()
        }
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub total_count: u64,
    pub items: Vec<Repo>,
}
