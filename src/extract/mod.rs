pub mod types;

pub use types::{FieldExtractionSpec, FieldPattern, PullRequestFields};

use regex::{Regex, RegexBuilder};
use std::collections::HashSet;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::RunConfig;
use crate::github::{GitHubApi, GitHubError};

/// Trailing `(#123)` reference that squash merges append to the commit title.
static PULL_REQUEST_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(#([0-9]+)\)\n?$").expect("PR reference pattern is valid")
});

#[derive(Debug, Error)]
pub enum FieldSpecError {
    #[error("Invalid field mapping JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Field mapping must be a JSON object of column name to regex")]
    NotAnObject,

    #[error("Pattern for field '{field}' must be a string")]
    NotAString { field: String },

    #[error("Invalid regex for field '{field}': {source}")]
    InvalidRegex {
        field: String,
        #[source]
        source: regex::Error,
    },

    #[error("Field '{0}' is listed more than once")]
    Duplicate(String),
}

impl FieldExtractionSpec {
    /// Compile `(name, pattern)` pairs in order. Fails on the first bad regex.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, FieldSpecError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut seen = HashSet::new();
        let mut fields = Vec::new();
        for (name, pattern) in pairs {
            if !seen.insert(name.clone()) {
                return Err(FieldSpecError::Duplicate(name));
            }
            let pattern = compile_field_pattern(&pattern).map_err(|source| {
                FieldSpecError::InvalidRegex {
                    field: name.clone(),
                    source,
                }
            })?;
            fields.push(FieldPattern { name, pattern });
        }
        Ok(Self { fields })
    }

    /// Parse a JSON object literal such as `{"Summary": "Summary:\\s*(.+)"}`.
    /// Key order is kept.
    pub fn from_json(json: &str) -> Result<Self, FieldSpecError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let object = value.as_object().ok_or(FieldSpecError::NotAnObject)?;
        let pairs = object
            .iter()
            .map(|(name, pattern)| match pattern.as_str() {
                Some(pattern) => Ok((name.clone(), pattern.to_string())),
                None => Err(FieldSpecError::NotAString {
                    field: name.clone(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_pairs(pairs)
    }
}

/// Field patterns run over whole PR descriptions: `^`/`$` match at line
/// boundaries and `.` also matches newlines.
fn compile_field_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .multi_line(true)
        .dot_matches_new_line(true)
        .build()
}

/// Pull request number referenced at the end of a commit message, if any.
pub fn pull_request_number(message: &str) -> Option<u64> {
    PULL_REQUEST_REFERENCE
        .captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// First capture group of the first match, cleaned up; empty when the
/// pattern does not match or has no capture group.
pub fn extract_field(pattern: &Regex, description: &str) -> String {
    pattern
        .captures(description)
        .and_then(|caps| caps.get(1))
        .map(|m| clean_extracted_text(m.as_str()))
        .unwrap_or_default()
}

/// Drop leading line breaks and a trailing run of line breaks and hyphens
/// (markdown separators often follow a section).
///
/// Only the two ends of the value are trimmed; blank lines and hyphens inside
/// a multi-line value are left as they are.
pub fn clean_extracted_text(text: &str) -> String {
    text.trim_start_matches(['\r', '\n'])
        .trim_end_matches(['\r', '\n', '-'])
        .to_string()
}

/// Resolves the pull-request columns of commits, one API call per reference.
pub struct PullRequestExtractor<'a, A: GitHubApi + ?Sized> {
    api: &'a A,
    config: &'a RunConfig,
}

impl<'a, A: GitHubApi + ?Sized> PullRequestExtractor<'a, A> {
    pub fn new(api: &'a A, config: &'a RunConfig) -> Self {
        Self { api, config }
    }

    /// Fields for the commit whose exported message is `message`.
    ///
    /// The PR description is fetched on every call; repeated references are
    /// not cached.
    #[instrument(skip(self))]
    pub async fn resolve(&self, message: &str) -> Result<PullRequestFields, GitHubError> {
        let fields = &self.config.fields;
        let Some(number) = pull_request_number(message) else {
            debug!("no pull request reference");
            return Ok(PullRequestFields::not_applicable(fields.len()));
        };

        let description = self
            .api
            .fetch_pull_request_description(
                number,
                &self.config.repo_owner,
                &self.config.repo,
                &self.config.token,
            )
            .await?
            .unwrap_or_default();

        let values = fields
            .iter()
            .map(|field| {
                let value = extract_field(&field.pattern, &description);
                debug!(pr = number, field = %field.name, value = %value, "extracted field");
                value
            })
            .collect();

        Ok(PullRequestFields {
            number: Some(number),
            url: self.config.pull_request_url(number),
            values,
        })
    }
}
