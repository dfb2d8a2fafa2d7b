use colored::Colorize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::TOKEN_ENV_VAR;
use crate::github::{AccessToken, GitHubApi, AUTHORIZATION_NOTE};
use crate::prompt::Prompter;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Sorry, we need a token to proceed. Please try again.")]
    MissingToken,

    #[error("Failed to read credentials: {0}")]
    Prompt(#[from] std::io::Error),
}

/// Non-interactive places a token may already be stored, highest precedence first.
#[derive(Debug, Default, Clone)]
pub struct TokenSources {
    /// `--api_token`
    pub flag: Option<String>,
    /// `[github] token` in the config file
    pub config_file: Option<String>,
    /// Value of `COMMIT_PARSER_API_TOKEN`
    pub environment: Option<String>,
}

impl TokenSources {
    fn first_stored(&self) -> Option<(&'static str, AccessToken)> {
        [
            ("flag", &self.flag),
            ("config file", &self.config_file),
            ("environment", &self.environment),
        ]
        .into_iter()
        .find_map(|(source, value)| {
            value
                .as_deref()
                .and_then(AccessToken::new)
                .map(|token| (source, token))
        })
    }
}

/// Produce an access token or fail with `AuthError::MissingToken`.
///
/// Stored tokens win. Otherwise the user logs in with username, password and
/// one-time passcode to mint a token, and as a last resort pastes one.
pub async fn resolve_token<A, P>(
    sources: &TokenSources,
    api: &A,
    prompter: &mut P,
) -> Result<AccessToken, AuthError>
where
    A: GitHubApi + ?Sized,
    P: Prompter + ?Sized,
{
    if let Some((source, token)) = sources.first_stored() {
        debug!(source, "using stored access token");
        return Ok(token);
    }

    info!("no stored access token, starting interactive login");
    let token = match mint_token(api, prompter).await? {
        Some(token) => Some(token),
        None => {
            prompter.notice(&format!(
                "Please check for access token for entry with '{AUTHORIZATION_NOTE}' at \
                 https://github.com/settings/tokens and regenerate access token if already exists."
            ));
            let pasted = prompter.secret("Your personal token for GithubCommitParser: ")?;
            AccessToken::new(pasted)
        }
    };

    let token = token.ok_or(AuthError::MissingToken)?;
    print_saving_guidance(&token, prompter);
    Ok(token)
}

/// Username/password login with a one-time passcode. `None` when no token
/// came out of it; API failures are logged and treated the same way.
async fn mint_token<A, P>(api: &A, prompter: &mut P) -> Result<Option<AccessToken>, AuthError>
where
    A: GitHubApi + ?Sized,
    P: Prompter + ?Sized,
{
    let username = prompter.line("Your GitHub username: ")?;
    let password = prompter.secret("Your GitHub password: ")?;

    let passcode_required = match api
        .request_one_time_passcode_challenge(&username, &password)
        .await
    {
        Ok(required) => required,
        Err(err) => {
            warn!(error = %err, "authorization request failed");
            return Ok(None);
        }
    };
    if !passcode_required {
        warn!("account did not ask for a one-time passcode, cannot mint a token");
        return Ok(None);
    }

    let passcode = prompter.line("Your GitHub One-Time Password: ")?;
    match api
        .create_token_with_passcode(&username, &password, &passcode)
        .await
    {
        Ok(Some(token)) => {
            prompter.notice(&format!(
                "{} Your token is: {}",
                "🔑 Token fetched!".green().bold(),
                token.as_str()
            ));
            Ok(Some(token))
        }
        Ok(None) => {
            warn!("authorization response carried no token");
            Ok(None)
        }
        Err(err) => {
            warn!(error = %err, "token creation failed");
            Ok(None)
        }
    }
}

fn print_saving_guidance<P: Prompter + ?Sized>(token: &AccessToken, prompter: &mut P) {
    prompter.notice(
        "This is like a password and please save it safely like in 1Password for future access to Github API.",
    );
    prompter.notice(
        "Next time running this, you can provide this token via --api_token option, \
         or you can save it to your environment variable via command line by running:",
    );
    prompter.notice(&format!("export {TOKEN_ENV_VAR}={}", token.as_str()));
    prompter.notice("(If using zsh, add this export to the zshrc file.)");
}
