//! Authenticated Jira session shared by the worklog client and the issue resolver.

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client as HttpClient, Method, RequestBuilder, StatusCode};
use tracing::debug;

use crate::config::JiraConfig;
use crate::error::{Result, SyncError};
use crate::models::JiraUser;

/// Jira REST session using basic auth (account email + API token).
///
/// `login` is the only operation that mutates the session: it records the
/// authenticated account. Everything else reads it.
#[derive(Clone)]
pub struct JiraSession {
    http: HttpClient,
    config: JiraConfig,
    user: Option<JiraUser>,
}

impl JiraSession {
    pub fn new(config: JiraConfig) -> Result<Self> {
        let http = build_http_client(&config)?;
        Ok(Self {
            http,
            config,
            user: None,
        })
    }

    /// Root of the Jira REST API, e.g. `https://acme.atlassian.net/rest/api/3/`.
    pub fn base_url(&self) -> String {
        self.config.api_root()
    }

    pub fn user(&self) -> Option<&JiraUser> {
        self.user.as_ref()
    }

    pub fn account_id(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.account_id.as_str())
    }

    /// Verifies the credentials against `/myself` and remembers the account.
    pub async fn login(&mut self) -> Result<&JiraUser> {
        let url = self.url_for("myself");
        let response = self.request(Method::GET, "myself").send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Authentication(format!(
                "Jira rejected credentials ({}) - {}",
                status, body
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::http(url, status, body));
        }

        let user = response.json::<JiraUser>().await?;
        debug!(account_id = %user.account_id, "jira login succeeded");
        Ok(&*self.user.insert(user))
    }

    /// Starts an authenticated request against a path below the REST root.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.url_for(path))
            .basic_auth(&self.config.email, Some(&self.config.api_token))
    }

    pub fn url_for(&self, path: &str) -> String {
        let mut base = self.base_url();
        base.push_str(path.trim_start_matches('/'));
        base
    }
}

fn build_http_client(config: &JiraConfig) -> Result<HttpClient> {
    let mut headers = HeaderMap::new();
    let user_agent = HeaderValue::from_str(&config.user_agent)
        .map_err(|err| SyncError::InvalidConfig(err.to_string()))?;
    headers.insert(USER_AGENT, user_agent);

    HttpClient::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .build()
        .map_err(|err| SyncError::Other(err.to_string()))
}
