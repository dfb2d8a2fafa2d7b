pub mod types;

pub use types::{header, row_width, ExportRow};

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::RunConfig;
use crate::extract::{FieldExtractionSpec, PullRequestExtractor};
use crate::github::{Commit, GitHubApi, GitHubError};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write export file: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    GitHub(#[from] GitHubError),
}

/// Counts reported once the export file is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub commits: usize,
    pub with_pull_request: usize,
}

/// Sequential CSV writer. The header goes out on construction; every row
/// must have the header's width.
pub struct CsvExporter<W: Write> {
    writer: csv::Writer<W>,
    width: usize,
}

impl CsvExporter<File> {
    /// Create (or truncate) the file at `path` and write the header row.
    pub fn create(path: &Path, fields: &FieldExtractionSpec) -> Result<Self, ExportError> {
        let file = File::create(path)?;
        Self::new(file, fields)
    }
}

impl<W: Write> CsvExporter<W> {
    pub fn new(inner: W, fields: &FieldExtractionSpec) -> Result<Self, ExportError> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(inner);
        writer.write_record(header(fields))?;
        Ok(Self {
            writer,
            width: row_width(fields),
        })
    }

    pub fn write_row(&mut self, row: &ExportRow) -> Result<(), ExportError> {
        let cells = row.cells();
        debug_assert_eq!(cells.len(), self.width, "row width differs from header");
        self.writer.write_record(cells)?;
        Ok(())
    }

    /// Flush buffered rows and hand back the underlying writer.
    pub fn finish(self) -> Result<W, ExportError> {
        self.writer
            .into_inner()
            .map_err(|err| ExportError::Io(err.into_error()))
    }
}

/// Resolve the pull-request columns of each commit in order and write one
/// row per commit. Stops at the first failed API call.
pub async fn write_commits<W, A>(
    exporter: &mut CsvExporter<W>,
    extractor: &PullRequestExtractor<'_, A>,
    commits: &[Commit],
) -> Result<usize, ExportError>
where
    W: Write,
    A: GitHubApi + ?Sized,
{
    let mut with_pull_request = 0;
    for commit in commits {
        debug!(sha = %commit.sha, "processing commit");
        let pull_request = extractor.resolve(commit.summary()).await?;
        if pull_request.number.is_some() {
            with_pull_request += 1;
        }
        exporter.write_row(&ExportRow::new(commit, pull_request))?;
    }
    Ok(with_pull_request)
}

/// Write `commits` to `config.export_path`, overwriting any existing file.
#[instrument(skip_all, fields(path = %config.export_path.display(), commits = commits.len()))]
pub async fn export_commits<A: GitHubApi + ?Sized>(
    api: &A,
    config: &RunConfig,
    commits: &[Commit],
) -> Result<ExportSummary, ExportError> {
    let mut exporter = CsvExporter::create(&config.export_path, &config.fields)?;
    let extractor = PullRequestExtractor::new(api, config);
    let with_pull_request = write_commits(&mut exporter, &extractor, commits).await?;
    let mut file = exporter.finish()?;
    file.flush()?;
    info!(with_pull_request, "export written");

    Ok(ExportSummary {
        path: config.export_path.clone(),
        commits: commits.len(),
        with_pull_request,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::tests::{summary_spec, test_run_config, FakeGitHub};
    use std::collections::HashMap;

    fn commit(sha: &str, author: &str, message: &str) -> Commit {
        Commit {
            sha: sha.to_string(),
            author_name: author.to_string(),
            author_date: "2023-01-01T00:00:00Z".to_string(),
            message: message.to_string(),
            html_url: format!("https://github.com/o/r/commit/{sha}"),
        }
    }

    fn fake_api() -> FakeGitHub {
        FakeGitHub {
            descriptions: HashMap::from([(42, Some("Summary: fixes the bug\n".to_string()))]),
            ..Default::default()
        }
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|record| record.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[tokio::test]
    async fn test_export_scenario_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_run_config(summary_spec());
        config.export_path = dir.path().join("changelog.csv");
        let commits = vec![
            commit("abc123", "Jane", "Fix bug (#42)"),
            commit("def456", "Joe", "Update docs\n\nMore words"),
        ];

        let summary = export_commits(&fake_api(), &config, &commits).await.unwrap();
        assert_eq!(summary.commits, 2);
        assert_eq!(summary.with_pull_request, 1);

        let rows = read_rows(&config.export_path);
        assert_eq!(
            rows[0],
            vec!["Author", "Date", "Commit message", "Summary", "Pull request url", "Commit url", "SHA"]
        );
        assert_eq!(
            rows[1],
            vec![
                "Jane",
                "2023-01-01T00:00:00Z",
                "Fix bug (#42)",
                "fixes the bug",
                "https://github.com/o/r/pull/42",
                "https://github.com/o/r/commit/abc123",
                "abc123",
            ]
        );
        assert_eq!(rows[2][2], "Update docs");
        assert_eq!(rows[2][3], "n/a");
        assert_eq!(rows[2][4], "n/a");
        assert!(rows.iter().all(|row| row.len() == 3 + 1 + 3));
    }

    #[tokio::test]
    async fn test_empty_commit_list_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_run_config(FieldExtractionSpec::default());
        config.export_path = dir.path().join("empty.csv");

        export_commits(&fake_api(), &config, &[]).await.unwrap();
        let content = std::fs::read_to_string(&config.export_path).unwrap();
        assert_eq!(content, "Author,Date,Commit message,Pull request url,Commit url,SHA\n");
    }

    #[tokio::test]
    async fn test_export_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_run_config(summary_spec());
        config.export_path = dir.path().join("changelog.csv");
        let commits = vec![
            commit("abc123", "Jane", "Fix bug (#42)"),
            commit("def456", "Joe, Jr.", "Quote \"this\""),
        ];

        export_commits(&fake_api(), &config, &commits).await.unwrap();
        let first = std::fs::read(&config.export_path).unwrap();
        export_commits(&fake_api(), &config, &commits).await.unwrap();
        let second = std::fs::read(&config.export_path).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_export_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_run_config(FieldExtractionSpec::default());
        config.export_path = dir.path().join("changelog.csv");
        std::fs::write(&config.export_path, "stale content that is much longer than a header\n".repeat(10))
            .unwrap();

        export_commits(&fake_api(), &config, &[]).await.unwrap();
        assert_eq!(read_rows(&config.export_path).len(), 1);
    }

    #[tokio::test]
    async fn test_export_to_invalid_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_run_config(FieldExtractionSpec::default());
        config.export_path = dir.path().join("missing").join("changelog.csv");

        let err = export_commits(&fake_api(), &config, &[]).await.unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
    }

    #[tokio::test]
    async fn test_api_error_aborts_export() {
        let config = test_run_config(summary_spec());
        let api = fake_api();
        let extractor = PullRequestExtractor::new(&api, &config);
        let mut exporter = CsvExporter::new(Vec::new(), &config.fields).unwrap();
        let commits = vec![
            commit("abc123", "Jane", "Fix bug (#42)"),
            commit("fff000", "Joe", "Unknown PR (#404)"),
        ];

        let err = write_commits(&mut exporter, &extractor, &commits).await.unwrap_err();
        assert!(matches!(err, ExportError::GitHub(GitHubError::Status { status: 404, .. })));
    }

    #[test]
    fn test_exporter_quotes_cells() {
        let mut exporter = CsvExporter::new(Vec::new(), &FieldExtractionSpec::default()).unwrap();
        exporter
            .write_row(&ExportRow {
                author: "Doe, Jane".to_string(),
                date: "2023-01-01T00:00:00Z".to_string(),
                message: "Say \"hi\"".to_string(),
                fields: vec![],
                pull_request_url: "n/a".to_string(),
                commit_url: "u".to_string(),
                sha: "s".to_string(),
            })
            .unwrap();
        let bytes = exporter.finish().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.ends_with("\"Doe, Jane\",2023-01-01T00:00:00Z,\"Say \"\"hi\"\"\",n/a,u,s\n"));
    }
}
