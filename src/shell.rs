use clap::Args;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::auth::{self, AuthError, TokenSources};
use crate::config::{FileConfig, RunConfig, TOKEN_ENV_VAR};
use crate::extract::{FieldExtractionSpec, FieldSpecError};
use crate::github::GitHubApi;
use crate::prompt::Prompter;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Fields(#[from] FieldSpecError),

    #[error("Failed to read input: {0}")]
    Prompt(#[from] std::io::Error),

    #[error("A {0} is required")]
    EmptyValue(&'static str),
}

/// Run parameters accepted on the command line. Anything omitted is taken
/// from the config file or asked for interactively.
#[derive(Args, Debug, Default, Clone)]
pub struct Flags {
    /// GitHub API token (falls back to $COMMIT_PARSER_API_TOKEN, then interactive login)
    #[arg(long = "api_token", value_name = "TOKEN")]
    pub api_token: Option<String>,

    /// Repository owner (github.com/<repo_owner>/<repo>)
    #[arg(long = "repo_owner", value_name = "REPO_OWNER")]
    pub repo_owner: Option<String>,

    /// Repository name
    #[arg(long = "repo", value_name = "REPO")]
    pub repo: Option<String>,

    /// CSV file to write, or a directory to write it into
    #[arg(long = "export_CSV_path", value_name = "EXPORT_CSV_PATH")]
    pub export_csv_path: Option<String>,

    /// Base branch of the comparison
    #[arg(long = "branch_1", value_name = "BRANCH_1")]
    pub branch_1: Option<String>,

    /// Head branch of the comparison
    #[arg(long = "branch_2", value_name = "BRANCH_2")]
    pub branch_2: Option<String>,

    /// JSON object mapping CSV column name to a regex over the PR description,
    /// e.g. '{"Summary": "Summary:\\s*(.+)"}'
    #[arg(long = "pull_request_regex_by_field", value_name = "PR_REGEX_BY_FIELD")]
    pub pull_request_regex_by_field: Option<String>,
}

/// Process environment the shell consults, captured once at startup.
#[derive(Debug, Default, Clone)]
pub struct Environment {
    pub token: Option<String>,
    pub home: Option<PathBuf>,
}

impl Environment {
    pub fn from_process() -> Self {
        Self {
            token: std::env::var(TOKEN_ENV_VAR).ok(),
            home: std::env::var_os("HOME").map(PathBuf::from),
        }
    }
}

/// Turn flags, config file, environment and prompts into a complete `RunConfig`.
///
/// Field patterns compile before anything is asked, so a bad regex fails
/// without a login round-trip.
pub async fn resolve_run_config<A, P>(
    flags: Flags,
    file: &FileConfig,
    env: &Environment,
    api: &A,
    prompter: &mut P,
) -> Result<RunConfig, ShellError>
where
    A: GitHubApi + ?Sized,
    P: Prompter + ?Sized,
{
    let fields = resolve_fields(flags.pull_request_regex_by_field.as_deref(), file)?;
    if fields.is_empty() {
        debug!("no pull request field patterns, exporting fixed columns only");
    } else {
        debug!(fields = fields.len(), "compiled field patterns");
    }

    let sources = TokenSources {
        flag: flags.api_token,
        config_file: file.github.token.clone(),
        environment: env.token.clone(),
    };
    let token = auth::resolve_token(&sources, api, prompter).await?;

    let repo_owner = value_or_prompt(
        flags.repo_owner,
        &file.repository.owner,
        "repo owner",
        "Repo owner (repository url is 'repo_owner/repo'): ",
        prompter,
    )?;
    let repo = value_or_prompt(
        flags.repo,
        &file.repository.name,
        "repo",
        "Repo (repository url is 'repo_owner/repo'): ",
        prompter,
    )?;
    let configured_path = file
        .export
        .path
        .as_ref()
        .map(|path| path.to_string_lossy().into_owned());
    let raw_export_path = value_or_prompt(
        flags.export_csv_path,
        &configured_path,
        "export path",
        "Path to export CSV (e.g. ~/Desktop): ",
        prompter,
    )?;
    let branch_from = value_or_prompt(
        flags.branch_1,
        &file.repository.branch_from,
        "from branch",
        "From branch: ",
        prompter,
    )?;
    let branch_to = value_or_prompt(
        flags.branch_2,
        &file.repository.branch_to,
        "to branch",
        "To branch: ",
        prompter,
    )?;

    let export_path = resolve_export_path(
        &raw_export_path,
        env.home.as_deref(),
        &repo,
        &branch_from,
        &branch_to,
    );
    info!(owner = %repo_owner, repo = %repo, from = %branch_from, to = %branch_to, path = %export_path.display(), "parameters resolved");

    Ok(RunConfig {
        token,
        repo_owner,
        repo,
        branch_from,
        branch_to,
        export_path,
        fields,
        web_base_url: file.web_base_url().to_string(),
    })
}

/// The JSON flag replaces the config file's field list entirely.
fn resolve_fields(json: Option<&str>, file: &FileConfig) -> Result<FieldExtractionSpec, FieldSpecError> {
    match json.filter(|json| !json.trim().is_empty()) {
        Some(json) => FieldExtractionSpec::from_json(json),
        None => FieldExtractionSpec::from_pairs(
            file.export
                .fields
                .iter()
                .map(|entry| (entry.name.clone(), entry.pattern.clone())),
        ),
    }
}

fn value_or_prompt<P: Prompter + ?Sized>(
    flag: Option<String>,
    configured: &Option<String>,
    name: &'static str,
    label: &str,
    prompter: &mut P,
) -> Result<String, ShellError> {
    let stored = flag
        .into_iter()
        .chain(configured.iter().cloned())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty());
    if let Some(value) = stored {
        return Ok(value);
    }

    let answer = prompter.line(label)?.trim().to_string();
    if answer.is_empty() {
        return Err(ShellError::EmptyValue(name));
    }
    Ok(answer)
}

/// Expand a leading `~/`, and when the path is an existing directory place
/// `<repo>-<from>-<to>.csv` inside it.
pub fn resolve_export_path(
    raw: &str,
    home: Option<&Path>,
    repo: &str,
    branch_from: &str,
    branch_to: &str,
) -> PathBuf {
    let path = match (raw.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ if raw == "~" => home.map_or_else(|| PathBuf::from(raw), Path::to_path_buf),
        _ => PathBuf::from(raw),
    };
    if path.is_dir() {
        path.join(default_file_name(repo, branch_from, branch_to))
    } else {
        path
    }
}

fn default_file_name(repo: &str, branch_from: &str, branch_to: &str) -> String {
    format!("{repo}-{branch_from}-{branch_to}.csv").replace('/', "-")
}
