//! GitHub App Authentication and REST Client
//!
//! Git operations authenticate as a GitHub App installation: a short-lived
//! RS256 JWT signed with the app's private key is exchanged for an
//! installation access token scoped to the repositories the app can reach.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use agent_core::error::{AgentError, Result};
use agent_core::session::GithubAppCredentials;

const API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "devops-remediation-agent";

#[derive(Serialize)]
struct Claims {
    iat: i64,
    exp: i64,
    iss: String,
}

/// Sign a short-lived app JWT. Issued-at is backdated a minute to absorb
/// clock skew; GitHub caps validity at ten minutes.
pub fn app_jwt(creds: &GithubAppCredentials) -> Result<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        iat: now - 60,
        exp: now + 540,
        iss: creds.app_id.clone(),
    };
    let key = jsonwebtoken::EncodingKey::from_rsa_pem(creds.private_key.as_bytes())
        .map_err(|e| AgentError::Auth(format!("invalid GitHub App private key: {}", e)))?;
    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256),
        &claims,
        &key,
    )
    .map_err(|e| AgentError::Auth(format!("failed to sign app JWT: {}", e)))
}

/// Minimal GitHub REST API surface used by the git tools
#[async_trait]
pub trait GithubApi: Send + Sync {
    /// Exchange an app JWT for an installation access token
    async fn installation_token(
        &self,
        creds: &GithubAppCredentials,
        installation_id: u64,
    ) -> Result<String>;

    /// Close any open pull request with the given head and base branches
    async fn close_matching_pull(
        &self,
        full_name: &str,
        token: &str,
        head: &str,
        base: &str,
    ) -> Result<()>;

    /// Open a pull request, returning its HTML URL
    async fn create_pull(
        &self,
        full_name: &str,
        token: &str,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<String>;
}

pub struct GithubClient {
    client: reqwest::Client,
}

impl Default for GithubClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GithubClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn request(&self, method: reqwest::Method, url: String, token: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Deserialize)]
struct BranchRef {
    #[serde(rename = "ref")]
    name: String,
}

#[derive(Deserialize)]
struct PullSummary {
    number: u64,
    head: BranchRef,
    base: BranchRef,
}

#[derive(Deserialize)]
struct CreatedPull {
    html_url: String,
}

#[async_trait]
impl GithubApi for GithubClient {
    async fn installation_token(
        &self,
        creds: &GithubAppCredentials,
        installation_id: u64,
    ) -> Result<String> {
        let jwt = app_jwt(creds)?;
        let url = format!("{}/app/installations/{}/access_tokens", API_BASE, installation_id);
        let response = self
            .request(reqwest::Method::POST, url, &jwt)
            .send()
            .await
            .map_err(|e| AgentError::Auth(format!("installation token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Auth(format!(
                "installation token request returned {}: {}",
                status, body
            )));
        }
        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Auth(format!("malformed token response: {}", e)))?;
        Ok(parsed.token)
    }

    async fn close_matching_pull(
        &self,
        full_name: &str,
        token: &str,
        head: &str,
        base: &str,
    ) -> Result<()> {
        let url = format!("{}/repos/{}/pulls?state=open", API_BASE, full_name);
        let response = self
            .request(reqwest::Method::GET, url, token)
            .send()
            .await
            .map_err(|e| AgentError::Provider(format!("pull request listing failed: {}", e)))?;
        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), repo = %full_name, "could not list open pull requests");
            return Ok(());
        }

        let pulls: Vec<PullSummary> = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("malformed pull listing: {}", e)))?;

        for pull in pulls {
            if pull.head.name == head && pull.base.name == base {
                let url = format!("{}/repos/{}/pulls/{}", API_BASE, full_name, pull.number);
                let close = self
                    .request(reqwest::Method::PATCH, url, token)
                    .json(&serde_json::json!({"state": "closed"}))
                    .send()
                    .await;
                match close {
                    Ok(r) if r.status().is_success() => {
                        tracing::info!(number = pull.number, repo = %full_name, "closed superseded pull request");
                    }
                    Ok(r) => {
                        tracing::warn!(number = pull.number, status = %r.status(), "failed to close existing pull request");
                    }
                    Err(e) => {
                        tracing::warn!(number = pull.number, error = %e, "failed to close existing pull request");
                    }
                }
                break;
            }
        }
        Ok(())
    }

    async fn create_pull(
        &self,
        full_name: &str,
        token: &str,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<String> {
        let url = format!("{}/repos/{}/pulls", API_BASE, full_name);
        let response = self
            .request(reqwest::Method::POST, url, token)
            .json(&serde_json::json!({
                "title": title,
                "body": body,
                "head": head,
                "base": base,
            }))
            .send()
            .await
            .map_err(|e| AgentError::Provider(format!("pull request creation failed: {}", e)))?;

        let status = response.status();
        if status != reqwest::StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Provider(format!(
                "pull request creation returned {}: {}",
                status, body
            )));
        }
        let created: CreatedPull = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("malformed pull response: {}", e)))?;
        Ok(created.html_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_jwt_rejects_garbage_key() {
        let creds = GithubAppCredentials {
            app_id: "12345".to_string(),
            private_key: "not a pem key".to_string(),
        };
        let err = app_jwt(&creds).unwrap_err();
        assert!(matches!(err, AgentError::Auth(_)));
    }
}
