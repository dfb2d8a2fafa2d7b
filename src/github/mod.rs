pub mod types;

pub use types::{AccessToken, Commit};

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use types::{
    AuthorizationRequest, AuthorizationResponse, CompareResponse, PullRequestResponse,
};

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Note attached to tokens minted through `POST /authorizations`, so users can
/// find them again at https://github.com/settings/tokens.
pub const AUTHORIZATION_NOTE: &str = "Github commit parser.";

const AUTHORIZATION_SCOPES: [&str; 2] = ["repo", "user"];
const OTP_HEADER: &str = "X-GitHub-OTP";
const USER_AGENT: &str = "changelog-csv";

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Network error: {status} from {url}")]
    Status { status: u16, url: String },
}

/// The source-control operations the export pipeline depends on.
///
/// Every call blocks the run until it completes; implementations must not
/// retry or cache.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// POST an authorization request with basic auth. Returns true iff the
    /// API answered 401 and asked for a one-time passcode.
    async fn request_one_time_passcode_challenge(
        &self,
        username: &str,
        password: &str,
    ) -> Result<bool, GitHubError>;

    /// Repeat the authorization request with the passcode header and return
    /// the minted token, if the response carried one.
    async fn create_token_with_passcode(
        &self,
        username: &str,
        password: &str,
        passcode: &str,
    ) -> Result<Option<AccessToken>, GitHubError>;

    /// Commits on `branch_to` that are not on `branch_from`, in API order.
    async fn fetch_commits_between_branches(
        &self,
        owner: &str,
        repo: &str,
        branch_from: &str,
        branch_to: &str,
        token: &AccessToken,
    ) -> Result<Vec<Commit>, GitHubError>;

    /// Description of a pull request; `None` when the PR has no body.
    async fn fetch_pull_request_description(
        &self,
        number: u64,
        owner: &str,
        repo: &str,
        token: &AccessToken,
    ) -> Result<Option<String>, GitHubError>;
}

/// `GitHubApi` over the REST API using reqwest.
pub struct GitHubClient {
    http: reqwest::Client,
    api_base_url: String,
}

impl GitHubClient {
    pub fn new(api_base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Authenticated GET with `Authorization: token <token>`.
    pub async fn http_get(&self, url: &str, token: &AccessToken) -> Result<Response, GitHubError> {
        let response = self
            .http
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("token {}", token.as_str()))
            .send()
            .await?;
        Ok(response)
    }

    /// POST a JSON body with basic auth, adding the one-time passcode header when given.
    pub async fn http_post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        username: &str,
        password: &str,
        body: &B,
        passcode: Option<&str>,
    ) -> Result<Response, GitHubError> {
        let mut request: RequestBuilder = self
            .http
            .post(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json")
            .basic_auth(username, Some(password))
            .json(body);
        if let Some(passcode) = passcode {
            request = request.header(OTP_HEADER, passcode);
        }
        Ok(request.send().await?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path)
    }

    fn authorization_request() -> AuthorizationRequest<'static> {
        AuthorizationRequest {
            scopes: AUTHORIZATION_SCOPES,
            note: AUTHORIZATION_NOTE,
        }
    }
}

/// Reject anything but 200 OK, carrying the status code.
fn expect_ok(response: Response) -> Result<Response, GitHubError> {
    if response.status() == StatusCode::OK {
        Ok(response)
    } else {
        Err(GitHubError::Status {
            status: response.status().as_u16(),
            url: response.url().to_string(),
        })
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    #[instrument(skip(self, password))]
    async fn request_one_time_passcode_challenge(
        &self,
        username: &str,
        password: &str,
    ) -> Result<bool, GitHubError> {
        let url = self.url("authorizations");
        let response = self
            .http_post(&url, username, password, &Self::authorization_request(), None)
            .await?;
        let has_otp_header = response.headers().contains_key(OTP_HEADER);
        let status = response.status();
        debug!(status = status.as_u16(), has_otp_header, "authorization challenge answered");
        Ok(has_otp_header && status == StatusCode::UNAUTHORIZED)
    }

    #[instrument(skip(self, password, passcode))]
    async fn create_token_with_passcode(
        &self,
        username: &str,
        password: &str,
        passcode: &str,
    ) -> Result<Option<AccessToken>, GitHubError> {
        let url = self.url("authorizations");
        let response = self
            .http_post(
                &url,
                username,
                password,
                &Self::authorization_request(),
                Some(passcode),
            )
            .await?;
        // The API answers 201 Created for a new authorization.
        if !response.status().is_success() {
            return Err(GitHubError::Status {
                status: response.status().as_u16(),
                url,
            });
        }
        let body = response.json::<AuthorizationResponse>().await?;
        Ok(body.token.and_then(AccessToken::new))
    }

    #[instrument(skip(self, token))]
    async fn fetch_commits_between_branches(
        &self,
        owner: &str,
        repo: &str,
        branch_from: &str,
        branch_to: &str,
        token: &AccessToken,
    ) -> Result<Vec<Commit>, GitHubError> {
        let url = self.url(&format!(
            "repos/{owner}/{repo}/compare/{branch_from}...{branch_to}"
        ));
        debug!("fetching branch comparison from GitHub API");
        let response = expect_ok(self.http_get(&url, token).await?)?;
        let body = response.json::<CompareResponse>().await?;
        debug!(commits = body.commits.len(), "received branch comparison");
        Ok(body.commits.into_iter().map(Commit::from).collect())
    }

    #[instrument(skip(self, token))]
    async fn fetch_pull_request_description(
        &self,
        number: u64,
        owner: &str,
        repo: &str,
        token: &AccessToken,
    ) -> Result<Option<String>, GitHubError> {
        let url = self.url(&format!("repos/{owner}/{repo}/pulls/{number}"));
        debug!("fetching pull request from GitHub API");
        let response = expect_ok(self.http_get(&url, token).await?)?;
        let body = response.json::<PullRequestResponse>().await?;
        debug!(body_bytes = body.body.as_ref().map_or(0, String::len), "received pull request");
        Ok(body.body)
    }
}
