use crate::extract::{FieldExtractionSpec, PullRequestFields};
use crate::github::Commit;

const LEADING_COLUMNS: [&str; 3] = ["Author", "Date", "Commit message"];
const TRAILING_COLUMNS: [&str; 3] = ["Pull request url", "Commit url", "SHA"];

/// Header row: fixed leading columns, one column per field in mapping order,
/// fixed trailing columns.
pub fn header(fields: &FieldExtractionSpec) -> Vec<String> {
    let mut columns: Vec<String> = LEADING_COLUMNS.iter().map(|c| c.to_string()).collect();
    columns.extend(fields.names().map(str::to_string));
    columns.extend(TRAILING_COLUMNS.iter().map(|c| c.to_string()));
    columns
}

/// Number of columns in every row for a given mapping.
pub fn row_width(fields: &FieldExtractionSpec) -> usize {
    LEADING_COLUMNS.len() + fields.len() + TRAILING_COLUMNS.len()
}

/// One data row of the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub author: String,
    pub date: String,
    /// First line of the commit message
    pub message: String,
    pub fields: Vec<String>,
    pub pull_request_url: String,
    pub commit_url: String,
    pub sha: String,
}

impl ExportRow {
    pub fn new(commit: &Commit, pull_request: PullRequestFields) -> Self {
        Self {
            author: commit.author_name.clone(),
            date: commit.author_date.clone(),
            message: commit.summary().to_string(),
            fields: pull_request.values,
            pull_request_url: pull_request.url,
            commit_url: commit.html_url.clone(),
            sha: commit.sha.clone(),
        }
    }

    /// Cells in header order.
    pub fn cells(&self) -> Vec<&str> {
        [self.author.as_str(), self.date.as_str(), self.message.as_str()]
            .into_iter()
            .chain(self.fields.iter().map(String::as_str))
            .chain([
                self.pull_request_url.as_str(),
                self.commit_url.as_str(),
                self.sha.as_str(),
            ])
            .collect()
    }
}
