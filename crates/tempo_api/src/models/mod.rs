mod id;
mod issue;
mod user;
mod worklog;

pub use issue::JiraIssue;
pub use user::JiraUser;
pub use worklog::{
    AttributeValue, IssueReference, TempoWorklog, WorklogAttributes, WorklogCreated,
    WorklogPayload,
};
