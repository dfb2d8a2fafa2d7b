use serde::{Deserialize, Serialize};

/// A commit from a branch comparison, flattened to the fields the export needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Full commit SHA
    pub sha: String,
    /// Git author name
    pub author_name: String,
    /// Git author date, kept as the API's ISO 8601 string
    pub author_date: String,
    /// Full commit message (only the first line is exported)
    pub message: String,
    /// Web URL of the commit
    pub html_url: String,
}

impl Commit {
    /// First line of the commit message, or an empty string for an empty message.
    ///
    /// CRLF messages lose the trailing `\r` too, so a `(#N)` reference before
    /// `\r\n` is still detected and no `\r` reaches the CSV cell.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

/// Opaque API credential sent as `Authorization: token <value>`.
///
/// Never empty. `Debug` output is redacted so tokens stay out of logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a token, trimming surrounding whitespace. Returns `None` for blank input.
    pub fn new(value: impl AsRef<str>) -> Option<Self> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Response of `GET /repos/{owner}/{repo}/compare/{base}...{head}`.
#[derive(Debug, Deserialize)]
pub(crate) struct CompareResponse {
    pub commits: Vec<CommitEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitEntry {
    pub sha: String,
    #[serde(default)]
    pub html_url: String,
    pub commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitDetail {
    #[serde(default)]
    pub message: String,
    pub author: Option<GitActor>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitActor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub date: String,
}

impl From<CommitEntry> for Commit {
    fn from(entry: CommitEntry) -> Self {
        let (author_name, author_date) = entry
            .commit
            .author
            .map(|actor| (actor.name, actor.date))
            .unwrap_or_default();
        Commit {
            sha: entry.sha,
            author_name,
            author_date,
            message: entry.commit.message,
            html_url: entry.html_url,
        }
    }
}

/// Response of `GET /repos/{owner}/{repo}/pulls/{number}`; only the description matters.
#[derive(Debug, Deserialize)]
pub(crate) struct PullRequestResponse {
    pub body: Option<String>,
}

/// Body of `POST /authorizations`.
#[derive(Debug, Serialize)]
pub(crate) struct AuthorizationRequest<'a> {
    pub scopes: [&'a str; 2],
    pub note: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthorizationResponse {
    pub token: Option<String>,
}
