//! Canonical worklog entity shared by both sides of a sync pass.

use std::fmt;

use chrono::{DateTime, FixedOffset, TimeDelta};
use serde::{Deserialize, Serialize};

/// Reference to the issue a worklog is booked against.
///
/// Tempo v4 often returns only the numeric issue id; such records carry
/// `Id` until something resolves the human-readable key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IssueRef {
    Key(String),
    Id(i64),
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueRef::Key(key) => f.write_str(key),
            IssueRef::Id(id) => write!(f, "issue #{id}"),
        }
    }
}

/// A single logged time entry.
///
/// `second_id` is the Tempo worklog id and is present only once the record
/// exists remotely. The end time is always derived from `start_time` and
/// `duration`, so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkLog {
    #[serde(default)]
    pub primary_id: Option<String>,
    #[serde(default)]
    pub second_id: Option<i64>,
    #[serde(default)]
    pub issue: Option<IssueRef>,
    pub description: String,
    pub start_time: DateTime<FixedOffset>,
    /// Seconds spent.
    pub duration: u32,
    #[serde(default)]
    pub activity: Option<String>,
}

impl WorkLog {
    pub fn new(
        issue: Option<IssueRef>,
        description: impl Into<String>,
        start_time: DateTime<FixedOffset>,
        duration: u32,
    ) -> Self {
        Self {
            primary_id: None,
            second_id: None,
            issue,
            description: description.into(),
            start_time,
            duration,
            activity: None,
        }
    }

    pub fn with_second_id(mut self, id: i64) -> Self {
        self.second_id = Some(id);
        self
    }

    pub fn with_activity(mut self, activity: impl Into<String>) -> Self {
        self.activity = Some(activity.into());
        self
    }

    pub fn end_time(&self) -> DateTime<FixedOffset> {
        self.start_time + TimeDelta::seconds(i64::from(self.duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-03-14T09:00:00+02:00").expect("valid timestamp")
    }

    #[test]
    fn end_time_is_start_plus_duration() {
        let wl = WorkLog::new(Some(IssueRef::Key("OPS-1".into())), "standup", start(), 5400);
        assert_eq!((wl.end_time() - wl.start_time).num_seconds(), 5400);
        assert!(wl.second_id.is_none());
    }

    #[test]
    fn issue_ref_serializes_untagged() {
        let key = serde_json::to_string(&IssueRef::Key("OPS-1".into())).unwrap();
        let id = serde_json::to_string(&IssueRef::Id(10001)).unwrap();
        assert_eq!(key, "\"OPS-1\"");
        assert_eq!(id, "10001");

        let back: IssueRef = serde_json::from_str("10001").unwrap();
        assert_eq!(back, IssueRef::Id(10001));
    }

    #[test]
    fn worklog_deserializes_with_optional_fields_missing() {
        let json = r#"{
            "description": "review",
            "start_time": "2024-03-14T09:00:00+02:00",
            "duration": 600
        }"#;
        let wl: WorkLog = serde_json::from_str(json).unwrap();
        assert_eq!(wl.duration, 600);
        assert!(wl.issue.is_none());
        assert!(wl.second_id.is_none());
    }
}
