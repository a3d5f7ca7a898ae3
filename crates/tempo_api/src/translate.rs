//! Mapping between Tempo wire records and [`WorkLog`] entities.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use serde_json::Value;

use crate::config::WireTimeZone;
use crate::error::{Result, SyncError};
use crate::models::{AttributeValue, TempoWorklog, WorklogPayload};
use crate::worklog::{IssueRef, WorkLog};

/// Work attribute key under which the activity category is stored.
pub const ACTIVITY_ATTRIBUTE: &str = "_Activity_";

const WIRE_DATE_FORMAT: &str = "%Y-%m-%d";

/// One decoded page of the worklog listing.
#[derive(Debug, Clone)]
pub struct WorklogPage {
    /// Number of records the server reports for this page. Any value below
    /// [`crate::PAGE_SIZE`], negative ones included, ends paging.
    pub count: i64,
    pub worklogs: Vec<WorkLog>,
}

/// How a write request names its issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueAssociation {
    Id(i64),
    /// Raw key under the pre-v4 `issueKey` field. Newer Tempo instances may reject it.
    LegacyKey(String),
}

/// Decodes a worklog page report. Any malformed record fails the whole page.
pub fn parse_page(report: &Value, zone: WireTimeZone) -> Result<WorklogPage> {
    let count = report
        .pointer("/metadata/count")
        .ok_or_else(|| SyncError::Schema("page metadata has no count".into()))?
        .as_i64()
        .ok_or_else(|| SyncError::Schema("page count metadata must be an integer".into()))?;

    let results = report
        .get("results")
        .ok_or_else(|| SyncError::Schema("page has no results".into()))?;
    let records: Vec<TempoWorklog> = serde_json::from_value(results.clone())
        .map_err(|err| SyncError::Schema(format!("invalid worklog record: {err}")))?;

    let worklogs = records
        .into_iter()
        .map(|record| from_wire(record, zone))
        .collect::<Result<Vec<_>>>()?;

    Ok(WorklogPage { count, worklogs })
}

pub fn from_wire(record: TempoWorklog, zone: WireTimeZone) -> Result<WorkLog> {
    let issue = record.issue.and_then(|issue| {
        match (issue.key.filter(|key| !key.trim().is_empty()), issue.id) {
            (Some(key), _) => Some(IssueRef::Key(key)),
            (None, Some(id)) => Some(IssueRef::Id(id)),
            (None, None) => None,
        }
    });

    let start_time = parse_wire_datetime(&record.start_date, &record.start_time, zone)?;

    let activity = record
        .attributes
        .and_then(|attributes| {
            attributes
                .values
                .into_iter()
                .find(|attribute| attribute.key == ACTIVITY_ATTRIBUTE)
        })
        .map(|attribute| decode_activity(&attribute.value));

    Ok(WorkLog {
        primary_id: None,
        second_id: Some(record.tempo_worklog_id),
        issue,
        description: record.description,
        start_time,
        duration: record.time_spent_seconds,
        activity,
    })
}

/// Builds the create/update body. The start time is truncated to whole minutes.
pub fn to_payload(
    worklog: &WorkLog,
    author_account_id: &str,
    association: Option<IssueAssociation>,
    zone: WireTimeZone,
) -> WorklogPayload {
    let wire_start = zone.to_wire(&worklog.start_time);

    let attributes = worklog.activity.as_deref().map(|activity| {
        vec![AttributeValue {
            key: ACTIVITY_ATTRIBUTE.to_string(),
            value: encode_activity(activity),
        }]
    });

    let (issue_id, issue_key) = match association {
        Some(IssueAssociation::Id(id)) => (Some(id), None),
        Some(IssueAssociation::LegacyKey(key)) => (None, Some(key)),
        None => (None, None),
    };

    WorklogPayload {
        time_spent_seconds: worklog.duration,
        start_date: wire_start.format(WIRE_DATE_FORMAT).to_string(),
        start_time: wire_start.format("%H:%M:00").to_string(),
        description: worklog.description.clone(),
        author_account_id: author_account_id.to_string(),
        attributes,
        issue_id,
        issue_key,
    }
}

/// Formats a date the way the worklog listing expects its `from`/`to` bounds.
pub fn format_wire_date(date: NaiveDate) -> String {
    date.format(WIRE_DATE_FORMAT).to_string()
}

/// Percent-encodes every byte outside the unreserved set.
pub fn encode_activity(activity: &str) -> String {
    urlencoding::encode(activity).into_owned()
}

pub fn decode_activity(value: &str) -> String {
    match urlencoding::decode(value) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(value.as_bytes())).into_owned(),
    }
}

fn parse_wire_datetime(date: &str, time: &str, zone: WireTimeZone) -> Result<DateTime<FixedOffset>> {
    let day = NaiveDate::parse_from_str(date.trim(), WIRE_DATE_FORMAT)
        .map_err(|err| SyncError::Schema(format!("invalid startDate '{date}': {err}")))?;
    let clock = NaiveTime::parse_from_str(time.trim(), "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(time.trim(), "%H:%M"))
        .map_err(|err| SyncError::Schema(format!("invalid startTime '{time}': {err}")))?;

    zone.localize(day.and_time(clock)).ok_or_else(|| {
        SyncError::Schema(format!("{date}T{time} does not exist in the {zone} time zone"))
    })
}
