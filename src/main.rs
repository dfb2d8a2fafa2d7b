mod auth;
mod config;
mod export;
mod extract;
mod github;
mod prompt;
mod shell;

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use tracing::{info, info_span};
use tracing_subscriber::EnvFilter;

use github::{GitHubApi, GitHubClient};

/// changelog-csv — exports the commits between two GitHub branches to CSV,
/// with extra columns pulled out of each commit's pull request description.
#[derive(Parser, Debug)]
#[command(name = "changelog-csv", version, about)]
struct Cli {
    #[command(flatten)]
    flags: shell::Flags,

    /// Config file with defaults for any of the above
    #[arg(long, value_name = "PATH", default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(Cli::parse()).await {
        eprintln!("{} {err}", "error:".red().bold());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    info!(path = %cli.config.display(), "loading configuration");
    let file_config = config::FileConfig::load(&cli.config)?;
    let client = GitHubClient::new(file_config.api_base_url());

    let run_config = shell::resolve_run_config(
        cli.flags,
        &file_config,
        &shell::Environment::from_process(),
        &client,
        &mut prompt::TerminalPrompter,
    )
    .await?;

    let _main_span = info_span!(
        "export",
        owner = %run_config.repo_owner,
        repo = %run_config.repo,
        from = %run_config.branch_from,
        to = %run_config.branch_to
    )
    .entered();

    info!("fetching commits between branches");
    let commits = client
        .fetch_commits_between_branches(
            &run_config.repo_owner,
            &run_config.repo,
            &run_config.branch_from,
            &run_config.branch_to,
            &run_config.token,
        )
        .await?;
    info!(commits = commits.len(), "fetched commits");

    info!("exporting commits");
    let summary = export::export_commits(&client, &run_config, &commits).await?;
    println!(
        "{} {} commits ({} with a pull request) to {}",
        "Exported".green().bold(),
        summary.commits,
        summary.with_pull_request,
        summary.path.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_run_exports_compare_result_through_client() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/compare/main...release"))
            .and(header("Authorization", "token ghp_flag"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "commits": [
                    {
                        "sha": "abc123",
                        "html_url": "https://github.com/o/r/commit/abc123",
                        "commit": {
                            "message": "Fix bug (#42)",
                            "author": { "name": "Jane", "date": "2023-01-01T00:00:00Z" }
                        }
                    },
                    {
                        "sha": "def456",
                        "html_url": "https://github.com/o/r/commit/def456",
                        "commit": {
                            "message": "Update docs",
                            "author": { "name": "Joe", "date": "2023-01-02T00:00:00Z" }
                        }
                    }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/pulls/42"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"body": "Summary: fixes the bug\n"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("changelog.toml");
        std::fs::write(
            &config_path,
            format!(
                "[github]\napi_base_url = \"{}\"\nweb_base_url = \"https://github.com\"\n",
                server.uri()
            ),
        )
        .unwrap();
        let export_path = dir.path().join("out.csv");

        let cli = Cli {
            flags: shell::Flags {
                api_token: Some("ghp_flag".to_string()),
                repo_owner: Some("o".to_string()),
                repo: Some("r".to_string()),
                export_csv_path: Some(export_path.to_string_lossy().into_owned()),
                branch_1: Some("main".to_string()),
                branch_2: Some("release".to_string()),
                pull_request_regex_by_field: Some(
                    r#"{"Summary": "Summary:\\s*(.+)"}"#.to_string(),
                ),
            },
            config: config_path,
        };
        run(cli).await.unwrap();

        let content = std::fs::read_to_string(&export_path).unwrap();
        assert_eq!(
            content,
            "Author,Date,Commit message,Summary,Pull request url,Commit url,SHA\n\
             Jane,2023-01-01T00:00:00Z,Fix bug (#42),fixes the bug,https://github.com/o/r/pull/42,https://github.com/o/r/commit/abc123,abc123\n\
             Joe,2023-01-02T00:00:00Z,Update docs,n/a,n/a,https://github.com/o/r/commit/def456,def456\n"
        );
    }

    #[tokio::test]
    async fn test_run_fails_on_compare_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/compare/main...missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("changelog.toml");
        std::fs::write(
            &config_path,
            format!("[github]\napi_base_url = \"{}\"\n", server.uri()),
        )
        .unwrap();
        let export_path = dir.path().join("out.csv");

        let cli = Cli {
            flags: shell::Flags {
                api_token: Some("ghp_flag".to_string()),
                repo_owner: Some("o".to_string()),
                repo: Some("r".to_string()),
                export_csv_path: Some(export_path.to_string_lossy().into_owned()),
                branch_1: Some("main".to_string()),
                branch_2: Some("missing".to_string()),
                pull_request_regex_by_field: None,
            },
            config: config_path,
        };
        let err = run(cli).await.unwrap_err();
        assert!(err.to_string().starts_with("Network error: 404"));
        assert!(!export_path.exists());
    }
}
