//! User models returned by Jira identity endpoints.

use serde::Deserialize;

/// Represents the authenticated Jira account; its `account_id` scopes worklog reads and authors worklog writes.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JiraUser {
    pub account_id: String,
    pub display_name: Option<String>,
    pub email_address: Option<String>,
}
