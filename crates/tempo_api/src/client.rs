use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client as HttpClient, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::TempoConfig;
use crate::error::{Result, SyncError};
use crate::models::{WorklogCreated, WorklogPayload};
use crate::resolver::IssueKeyResolver;
use crate::session::JiraSession;
use crate::translate::{self, IssueAssociation};
use crate::worklog::{IssueRef, WorkLog};

/// Records requested per page of the worklog listing.
pub const PAGE_SIZE: i64 = 50;

const WORKLOGS_PATH: &str = "worklogs";

/// Tempo worklog client layered on an authenticated Jira session.
///
/// Reads return `Result` and abort on the first failed page. Writes return
/// `bool` and log failures so batch callers can keep going. Nothing is
/// retried here.
pub struct TempoClient {
    http: HttpClient,
    config: TempoConfig,
    session: JiraSession,
    resolver: IssueKeyResolver,
    auth: Option<HeaderValue>,
}

impl TempoClient {
    pub fn new(session: JiraSession, config: TempoConfig) -> Result<Self> {
        let http = build_http_client(&config)?;
        let resolver = IssueKeyResolver::new(config.issue_cache_capacity);
        Ok(Self {
            http,
            config,
            session,
            resolver,
            auth: None,
        })
    }

    pub fn config(&self) -> &TempoConfig {
        &self.config
    }

    pub fn session(&self) -> &JiraSession {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some() && self.session.account_id().is_some()
    }

    /// Logs into Jira first and, only if that succeeds, arms the Tempo bearer token.
    pub async fn login(&mut self) -> bool {
        if let Err(err) = self.session.login().await {
            error!("login: {err}");
            return false;
        }

        match HeaderValue::from_str(&format!("Bearer {}", self.config.token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                self.auth = Some(value);
                true
            }
            Err(err) => {
                error!("login: tempo token is not a valid header value: {err}");
                false
            }
        }
    }

    /// Fetches every worklog of the logged-in account between two dates, inclusive.
    ///
    /// Pages of [`PAGE_SIZE`] are requested until one reports fewer records.
    pub async fn get_worklogs(&self, start_date: NaiveDate, end_date: NaiveDate) -> Result<Vec<WorkLog>> {
        let account_id = self.account_id()?;
        let from = translate::format_wire_date(start_date);
        let to = translate::format_wire_date(end_date);
        let limit = PAGE_SIZE.to_string();

        let mut page_index: i64 = 0;
        let mut worklogs = Vec::new();

        loop {
            let offset = (page_index * PAGE_SIZE).to_string();
            let params = [
                ("from", from.as_str()),
                ("to", to.as_str()),
                ("offset", offset.as_str()),
                ("limit", limit.as_str()),
                ("userId", account_id),
            ];
            let request = self.request(Method::GET, WORKLOGS_PATH)?.query(&params).build()?;
            let url = request.url().to_string();

            let response = self.http.execute(request).await?;
            let status = response.status();
            if status != StatusCode::OK {
                let body = response.text().await.unwrap_or_default();
                let err = SyncError::http(url, status, body);
                error!("get_worklogs: {err}");
                return Err(err);
            }

            let report: Value = response.json().await?;
            let page = translate::parse_page(&report, self.config.wire_time_zone)?;
            debug!(page = page_index, count = page.count, "worklog page fetched");

            worklogs.extend(page.worklogs);
            page_index += 1;

            if page.count < PAGE_SIZE {
                break;
            }
        }

        Ok(worklogs)
    }

    /// Creates the worklog remotely and stores the assigned id in `second_id`.
    pub async fn create(&self, worklog: &mut WorkLog) -> bool {
        self.send_worklog(Method::POST, WORKLOGS_PATH.to_string(), worklog, "create")
            .await
    }

    /// Replaces the remote worklog addressed by `second_id`, then takes the id from the response.
    pub async fn update(&self, worklog: &mut WorkLog) -> bool {
        let Some(id) = worklog.second_id else {
            error!("update: worklog has no Tempo id to address");
            return false;
        };
        self.send_worklog(Method::PUT, format!("{WORKLOGS_PATH}/{id}"), worklog, "update")
            .await
    }

    pub async fn delete(&self, worklog: &WorkLog) -> bool {
        let Some(id) = worklog.second_id else {
            error!("delete: worklog has no Tempo id to address");
            return false;
        };
        let path = format!("{WORKLOGS_PATH}/{id}");
        let url = self.url_for(&path);

        let request = match self.request(Method::DELETE, &path) {
            Ok(request) => request,
            Err(err) => {
                error!("delete: {err}");
                return false;
            }
        };

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    warn!("delete: url: {url} status {status}");
                }
                status.is_success()
            }
            Err(err) => {
                error!("delete: url: {url} failed: {err}");
                false
            }
        }
    }

    /// Builds the write body for a worklog, resolving its issue association.
    pub async fn payload_for(&self, worklog: &WorkLog) -> Result<WorklogPayload> {
        let account_id = self.account_id()?;
        let association = self.issue_association(worklog).await;
        Ok(translate::to_payload(
            worklog,
            account_id,
            association,
            self.config.wire_time_zone,
        ))
    }

    pub async fn resolve_issue_id(&self, issue_key: &str) -> Option<i64> {
        self.resolver.resolve(&self.session, issue_key).await
    }

    async fn issue_association(&self, worklog: &WorkLog) -> Option<IssueAssociation> {
        match &worklog.issue {
            Some(IssueRef::Id(id)) => Some(IssueAssociation::Id(*id)),
            Some(IssueRef::Key(key)) => match self.resolve_issue_id(key).await {
                Some(id) => Some(IssueAssociation::Id(id)),
                None => {
                    warn!("Could not resolve issue ID for key {key}. Falling back to issueKey which may not work.");
                    Some(IssueAssociation::LegacyKey(key.clone()))
                }
            },
            None => {
                error!("No issue key available for worklog");
                None
            }
        }
    }

    async fn send_worklog(
        &self,
        method: Method,
        path: String,
        worklog: &mut WorkLog,
        operation: &str,
    ) -> bool {
        let url = self.url_for(&path);

        let payload = match self.payload_for(worklog).await {
            Ok(payload) => payload,
            Err(err) => {
                error!("{operation}: {err}");
                return false;
            }
        };

        let request = match self.request(method, &path) {
            Ok(request) => request.json(&payload),
            Err(err) => {
                error!("{operation}: {err}");
                return false;
            }
        };

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                error!("{operation}: url: {url} failed: {err}");
                return false;
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!("{operation}: url: {url} status {status}, error {body}");
            return false;
        }

        match response.json::<WorklogCreated>().await {
            Ok(created) => {
                worklog.second_id = Some(created.tempo_worklog_id);
                true
            }
            Err(err) => {
                error!("{operation}: url: {url} answered without a usable tempoWorklogId: {err}");
                false
            }
        }
    }

    fn account_id(&self) -> Result<&str> {
        self.session.account_id().ok_or_else(|| {
            SyncError::Authentication("login must succeed before using the worklog API".into())
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let auth = self.auth.clone().ok_or_else(|| {
            SyncError::Authentication("no Tempo bearer token; call login first".into())
        })?;
        Ok(self
            .http
            .request(method, self.url_for(path))
            .header(AUTHORIZATION, auth))
    }

    fn url_for(&self, path: &str) -> String {
        let mut base = self.config.api_root();
        base.push_str(path.trim_start_matches('/'));
        base
    }
}

fn build_http_client(config: &TempoConfig) -> Result<HttpClient> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, header_value(&config.user_agent)?);

    HttpClient::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .build()
        .map_err(|err| SyncError::Other(err.to_string()))
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|err| SyncError::InvalidConfig(err.to_string()))
}
