//! Wire representations of Tempo v4 worklogs.

use serde::{Deserialize, Serialize};

use super::id::{deserialize_id, deserialize_optional_id};

/// A worklog record as returned inside the `results` array of a worklog page.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TempoWorklog {
    #[serde(deserialize_with = "deserialize_id")]
    pub tempo_worklog_id: i64,
    #[serde(default)]
    pub issue: Option<IssueReference>,
    pub description: String,
    pub time_spent_seconds: u32,
    pub start_date: String,
    pub start_time: String,
    #[serde(default)]
    pub attributes: Option<WorklogAttributes>,
}

/// Issue link embedded in a worklog. v4 payloads usually carry only `id`.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct IssueReference {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub id: Option<i64>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WorklogAttributes {
    #[serde(default)]
    pub values: Vec<AttributeValue>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AttributeValue {
    pub key: String,
    pub value: String,
}

/// Request body for creating (POST) or updating (PUT) a worklog.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorklogPayload {
    pub time_spent_seconds: u32,
    pub start_date: String,
    pub start_time: String,
    pub description: String,
    pub author_account_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<AttributeValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_key: Option<String>,
}

/// Portion of a create/update response the client relies on.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WorklogCreated {
    #[serde(deserialize_with = "deserialize_id")]
    pub tempo_worklog_id: i64,
}
