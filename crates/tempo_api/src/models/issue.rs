use serde::Deserialize;

use super::id::deserialize_optional_id;

/// Subset of the Jira issue resource needed to map a key to its numeric id.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JiraIssue {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub id: Option<i64>,
    #[serde(default)]
    pub key: Option<String>,
}
