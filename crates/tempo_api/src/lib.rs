//! Tempo worklog synchronization client: paginated reads, record translation,
//! issue-key resolution through Jira, and create/update/delete writes.

pub mod client;
pub mod config;
pub mod deadline;
pub mod error;
pub mod models;
pub mod resolver;
pub mod session;
pub mod translate;
pub mod worklog;

pub use client::{TempoClient, PAGE_SIZE};
pub use config::{JiraConfig, TempoConfig, WireTimeZone};
pub use error::{Result, SyncError};
pub use models::{JiraIssue, JiraUser, WorklogPayload};
pub use resolver::IssueKeyResolver;
pub use session::JiraSession;
pub use translate::IssueAssociation;
pub use worklog::{IssueRef, WorkLog};
