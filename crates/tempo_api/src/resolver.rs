//! Issue key to issue id resolution through the Jira issue endpoint.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use reqwest::{Method, StatusCode};
use tracing::{debug, warn};

use crate::models::JiraIssue;
use crate::session::JiraSession;

/// Maps issue keys such as `OPS-12` to numeric Jira issue ids.
///
/// Lookups never fail hard: any problem is logged and reported as `None`.
/// With a non-zero capacity, successful lookups are kept in an LRU cache.
pub struct IssueKeyResolver {
    cache: Option<Mutex<LruCache<String, i64>>>,
}

impl IssueKeyResolver {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            cache: NonZeroUsize::new(cache_capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    pub async fn resolve(&self, session: &JiraSession, issue_key: &str) -> Option<i64> {
        let issue_key = issue_key.trim();
        if issue_key.is_empty() {
            return None;
        }

        if let Some(id) = self.cached(issue_key) {
            debug!(issue_key, issue_id = id, "issue id served from cache");
            return Some(id);
        }

        let id = lookup(session, issue_key).await?;
        if let Some(cache) = &self.cache {
            if let Ok(mut guard) = cache.lock() {
                guard.put(issue_key.to_string(), id);
            }
        }
        Some(id)
    }

    fn cached(&self, issue_key: &str) -> Option<i64> {
        let cache = self.cache.as_ref()?;
        let mut guard = cache.lock().ok()?;
        guard.get(issue_key).copied()
    }
}

async fn lookup(session: &JiraSession, issue_key: &str) -> Option<i64> {
    let path = format!("issue/{}", urlencoding::encode(issue_key));
    let response = match session.request(Method::GET, &path).send().await {
        Ok(response) => response,
        Err(err) => {
            warn!("Could not get issue ID for key {issue_key}: {err}");
            return None;
        }
    };

    let status = response.status();
    if status != StatusCode::OK {
        let body = response.text().await.unwrap_or_default();
        warn!("Could not get issue ID for key {issue_key}: {status} - {body}");
        return None;
    }

    match response.json::<JiraIssue>().await {
        Ok(JiraIssue { id: Some(id), .. }) => Some(id),
        Ok(_) => {
            warn!("Issue {issue_key} response carries no numeric id");
            None
        }
        Err(err) => {
            warn!("Could not decode issue {issue_key}: {err}");
            None
        }
    }
}
