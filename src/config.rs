use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::extract::FieldExtractionSpec;
use crate::github::{AccessToken, DEFAULT_API_BASE_URL};

pub const DEFAULT_CONFIG_FILE: &str = ".changelog-csv.toml";
pub const DEFAULT_WEB_BASE_URL: &str = "https://github.com";

/// Environment variable holding a previously minted access token.
pub const TOKEN_ENV_VAR: &str = "COMMIT_PARSER_API_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Optional defaults loaded from `.changelog-csv.toml`.
///
/// All fields are optional; the tool works with no file at all. CLI flags
/// override anything set here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub repository: RepositoryConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubConfig {
    /// API token. Takes precedence over the environment variable.
    pub token: Option<String>,
    /// REST API root, e.g. `https://ghe.example.com/api/v3` for Enterprise.
    pub api_base_url: Option<String>,
    /// Web root used to build pull request URLs.
    pub web_base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepositoryConfig {
    pub owner: Option<String>,
    pub name: Option<String>,
    pub branch_from: Option<String>,
    pub branch_to: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportConfig {
    pub path: Option<PathBuf>,
    /// Extra columns, in output order.
    #[serde(default)]
    pub fields: Vec<FieldEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldEntry {
    pub name: String,
    pub pattern: String,
}

impl FileConfig {
    /// Load from `path`, or return the default config if the file doesn't exist.
    pub fn load(path: &Path) -> Result<FileConfig, ConfigError> {
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(FileConfig::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn api_base_url(&self) -> &str {
        self.github
            .api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
    }

    pub fn web_base_url(&self) -> &str {
        self.github
            .web_base_url
            .as_deref()
            .unwrap_or(DEFAULT_WEB_BASE_URL)
    }
}

/// Fully resolved parameters for one export run.
///
/// Built once by the shell before any commit is fetched; nothing downstream
/// prompts or reads the environment.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub token: AccessToken,
    pub repo_owner: String,
    pub repo: String,
    pub branch_from: String,
    pub branch_to: String,
    pub export_path: PathBuf,
    pub fields: FieldExtractionSpec,
    pub web_base_url: String,
}

impl RunConfig {
    /// Web URL of a pull request in the configured repository.
    pub fn pull_request_url(&self, number: u64) -> String {
        format!(
            "{}/{}/{}/pull/{}",
            self.web_base_url.trim_end_matches('/'),
            self.repo_owner,
            self.repo,
            number
        )
    }
}
