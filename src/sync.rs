//! One-way sync of a source worklog set onto Tempo.
//!
//! The planner pairs source records with the Tempo records fetched for the
//! same range and emits create/update/delete actions; the source always
//! wins. The executor applies those actions one at a time and keeps going
//! past failures.

use chrono::{DateTime, FixedOffset};
use log::{info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tempo_api::deadline::within;
use tempo_api::{IssueRef, TempoClient, WorkLog};

#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    /// Source record with no remote counterpart.
    Create(WorkLog),
    /// Source content addressed to the paired remote id.
    Update(WorkLog),
    /// Remote record with no source counterpart.
    Delete(WorkLog),
    Unchanged(WorkLog),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan {
    pub actions: Vec<SyncAction>,
}

impl SyncPlan {
    pub fn pending(&self) -> usize {
        self.actions
            .iter()
            .filter(|action| !matches!(action, SyncAction::Unchanged(_)))
            .count()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub dry_run: bool,
    pub call_deadline: Option<Duration>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedAction {
    pub operation: &'static str,
    pub worklog: WorkLog,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: Vec<FailedAction>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Write side of a sync pass. Implemented by [`TempoClient`].
#[allow(async_fn_in_trait)]
pub trait WorklogTarget {
    async fn create(&self, worklog: &mut WorkLog) -> bool;
    async fn update(&self, worklog: &mut WorkLog) -> bool;
    async fn delete(&self, worklog: &WorkLog) -> bool;
}

impl WorklogTarget for TempoClient {
    async fn create(&self, worklog: &mut WorkLog) -> bool {
        TempoClient::create(self, worklog).await
    }

    async fn update(&self, worklog: &mut WorkLog) -> bool {
        TempoClient::update(self, worklog).await
    }

    async fn delete(&self, worklog: &WorkLog) -> bool {
        TempoClient::delete(self, worklog).await
    }
}

pub fn plan(source: &[WorkLog], target: &[WorkLog]) -> SyncPlan {
    let by_remote_id: HashMap<i64, usize> = target
        .iter()
        .enumerate()
        .filter_map(|(index, worklog)| worklog.second_id.map(|id| (id, index)))
        .collect();
    let mut claimed = vec![false; target.len()];
    let mut pairing: Vec<Option<usize>> = vec![None; source.len()];

    // Remote ids bind before any start-time match can claim a record.
    for (slot, worklog) in pairing.iter_mut().zip(source) {
        let by_id = worklog
            .second_id
            .and_then(|id| by_remote_id.get(&id).copied())
            .filter(|&index| !claimed[index]);
        if let Some(index) = by_id {
            claimed[index] = true;
            *slot = Some(index);
        }
    }

    for (slot, worklog) in pairing.iter_mut().zip(source) {
        if slot.is_some() {
            continue;
        }
        let by_time = target.iter().enumerate().position(|(index, remote)| {
            !claimed[index]
                && same_minute(&remote.start_time, &worklog.start_time)
                && issues_compatible(&remote.issue, &worklog.issue)
        });
        if let Some(index) = by_time {
            claimed[index] = true;
            *slot = Some(index);
        }
    }

    let mut actions = Vec::with_capacity(source.len() + target.len());
    for (worklog, paired) in source.iter().zip(pairing) {
        let mut next = worklog.clone();
        match paired {
            Some(index) => {
                let remote = &target[index];
                next.second_id = remote.second_id;
                if same_content(worklog, remote) {
                    actions.push(SyncAction::Unchanged(next));
                } else {
                    actions.push(SyncAction::Update(next));
                }
            }
            None => {
                next.second_id = None;
                actions.push(SyncAction::Create(next));
            }
        }
    }

    actions.extend(
        target
            .iter()
            .zip(claimed)
            .filter(|(_, claimed)| !claimed)
            .map(|(remote, _)| SyncAction::Delete(remote.clone())),
    );

    SyncPlan { actions }
}

pub async fn execute<T: WorklogTarget>(target: &T, plan: SyncPlan, options: SyncOptions) -> SyncReport {
    let mut report = SyncReport::default();

    for action in plan.actions {
        let (operation, worklog, ok) = match action {
            SyncAction::Unchanged(_) => {
                report.unchanged += 1;
                continue;
            }
            _ if options.dry_run => {
                report.skipped += 1;
                continue;
            }
            SyncAction::Create(mut worklog) => {
                let ok = bounded("create", options.call_deadline, target.create(&mut worklog)).await;
                if ok {
                    report.created += 1;
                }
                ("create", worklog, ok)
            }
            SyncAction::Update(mut worklog) => {
                let ok = bounded("update", options.call_deadline, target.update(&mut worklog)).await;
                if ok {
                    report.updated += 1;
                }
                ("update", worklog, ok)
            }
            SyncAction::Delete(worklog) => {
                let ok = bounded("delete", options.call_deadline, target.delete(&worklog)).await;
                if ok {
                    report.deleted += 1;
                }
                ("delete", worklog, ok)
            }
        };

        if !ok {
            warn!(
                "{} failed for worklog starting {} ({})",
                operation,
                worklog.start_time,
                worklog
                    .issue
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "no issue".to_string())
            );
            report.failed.push(FailedAction { operation, worklog });
        }
    }

    info!(
        "sync finished: {} created, {} updated, {} deleted, {} unchanged, {} skipped, {} failed",
        report.created,
        report.updated,
        report.deleted,
        report.unchanged,
        report.skipped,
        report.failed.len()
    );
    report
}

async fn bounded<F>(operation: &str, deadline: Option<Duration>, call: F) -> bool
where
    F: std::future::Future<Output = bool>,
{
    within(deadline, operation, call).await.unwrap_or_else(|err| {
        warn!("{operation}: {err}");
        false
    })
}

/// Tempo stores start times with minute precision.
fn same_minute(a: &DateTime<FixedOffset>, b: &DateTime<FixedOffset>) -> bool {
    a.timestamp().div_euclid(60) == b.timestamp().div_euclid(60)
}

/// A key and a numeric id cannot be compared without a lookup, so they never conflict.
fn issues_compatible(a: &Option<IssueRef>, b: &Option<IssueRef>) -> bool {
    match (a, b) {
        (Some(IssueRef::Key(x)), Some(IssueRef::Key(y))) => x == y,
        (Some(IssueRef::Id(x)), Some(IssueRef::Id(y))) => x == y,
        (Some(_), Some(_)) => true,
        (None, None) => true,
        _ => false,
    }
}

fn same_content(source: &WorkLog, remote: &WorkLog) -> bool {
    source.description == remote.description
        && source.duration == remote.duration
        && same_minute(&source.start_time, &remote.start_time)
        && source.activity == remote.activity
        && issues_compatible(&source.issue, &remote.issue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn at(time: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(&format!("2024-03-04T{time}+00:00")).expect("valid time")
    }

    fn remote(id: i64, time: &str, issue: i64, description: &str) -> WorkLog {
        WorkLog::new(Some(IssueRef::Id(issue)), description, at(time), 1800).with_second_id(id)
    }

    fn local(time: &str, key: &str, description: &str) -> WorkLog {
        WorkLog::new(Some(IssueRef::Key(key.into())), description, at(time), 1800)
    }

    #[test]
    fn new_source_records_are_created_and_stale_remote_records_deleted() {
        let source = vec![local("09:00:00", "OPS-1", "standup")];
        let target = vec![remote(5, "14:00:00", 10001, "old")];

        let plan = plan(&source, &target);

        assert_eq!(plan.actions.len(), 2);
        assert!(matches!(&plan.actions[0], SyncAction::Create(wl) if wl.second_id.is_none()));
        assert!(matches!(&plan.actions[1], SyncAction::Delete(wl) if wl.second_id == Some(5)));
        assert_eq!(plan.pending(), 2);
    }

    #[test]
    fn records_pair_by_remote_id_first() {
        let source = vec![local("11:00:00", "OPS-1", "moved").with_second_id(7)];
        let target = vec![remote(7, "09:00:00", 10001, "moved")];

        let plan = plan(&source, &target);

        assert_eq!(plan.actions.len(), 1);
        assert!(matches!(&plan.actions[0], SyncAction::Update(wl) if wl.second_id == Some(7)));
    }

    #[test]
    fn remote_id_wins_over_earlier_start_time_match() {
        let source = vec![
            local("09:00:00", "OPS-1", "A new"),
            local("09:00:00", "OPS-1", "B edited").with_second_id(7),
        ];
        let target = vec![remote(7, "09:00:00", 10001, "B")];

        let plan = plan(&source, &target);

        assert_eq!(plan.actions.len(), 2);
        assert!(matches!(
            &plan.actions[0],
            SyncAction::Create(wl) if wl.second_id.is_none() && wl.description == "A new"
        ));
        assert!(matches!(
            &plan.actions[1],
            SyncAction::Update(wl) if wl.second_id == Some(7) && wl.description == "B edited"
        ));
    }

    #[test]
    fn identical_records_matched_by_start_time_are_unchanged() {
        let mut source = local("09:00:30", "OPS-1", "standup");
        source.duration = 1800;
        let target = vec![remote(3, "09:00:00", 10001, "standup")];

        let plan = plan(&[source], &target);

        assert_eq!(plan.actions.len(), 1);
        assert!(matches!(&plan.actions[0], SyncAction::Unchanged(wl) if wl.second_id == Some(3)));
        assert_eq!(plan.pending(), 0);
    }

    #[test]
    fn changed_description_becomes_update() {
        let source = vec![local("09:00:00", "OPS-1", "standup + retro")];
        let target = vec![remote(3, "09:00:00", 10001, "standup")];

        let plan = plan(&source, &target);
        assert!(matches!(&plan.actions[0], SyncAction::Update(wl) if wl.second_id == Some(3)));
    }

    #[test]
    fn different_issue_ids_do_not_pair() {
        let source = vec![WorkLog::new(Some(IssueRef::Id(1)), "a", at("09:00:00"), 60)];
        let target = vec![remote(3, "09:00:00", 2, "a")];

        let plan = plan(&source, &target);
        assert!(matches!(plan.actions[0], SyncAction::Create(_)));
        assert!(matches!(plan.actions[1], SyncAction::Delete(_)));
    }

    #[test]
    fn stale_remote_id_on_source_is_cleared() {
        let source = vec![local("09:00:00", "OPS-1", "a").with_second_id(999)];
        let plan = plan(&source, &[]);
        assert!(matches!(&plan.actions[0], SyncAction::Create(wl) if wl.second_id.is_none()));
    }

    #[derive(Default)]
    struct FakeTarget {
        fail_updates: bool,
        calls: RefCell<Vec<&'static str>>,
    }

    impl WorklogTarget for FakeTarget {
        async fn create(&self, worklog: &mut WorkLog) -> bool {
            self.calls.borrow_mut().push("create");
            worklog.second_id = Some(100);
            true
        }

        async fn update(&self, _worklog: &mut WorkLog) -> bool {
            self.calls.borrow_mut().push("update");
            !self.fail_updates
        }

        async fn delete(&self, _worklog: &WorkLog) -> bool {
            self.calls.borrow_mut().push("delete");
            true
        }
    }

    fn mixed_plan() -> SyncPlan {
        SyncPlan {
            actions: vec![
                SyncAction::Update(remote(1, "08:00:00", 1, "u")),
                SyncAction::Create(local("09:00:00", "OPS-1", "c")),
                SyncAction::Unchanged(remote(2, "10:00:00", 1, "same")),
                SyncAction::Delete(remote(3, "11:00:00", 1, "d")),
            ],
        }
    }

    #[tokio::test]
    async fn executor_continues_past_failures() {
        let target = FakeTarget {
            fail_updates: true,
            ..FakeTarget::default()
        };

        let report = execute(&target, mixed_plan(), SyncOptions::default()).await;

        assert_eq!(*target.calls.borrow(), vec!["update", "create", "delete"]);
        assert_eq!(report.created, 1);
        assert_eq!(report.updated, 0);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].operation, "update");
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn dry_run_touches_nothing() {
        let target = FakeTarget::default();
        let options = SyncOptions {
            dry_run: true,
            call_deadline: None,
        };

        let report = execute(&target, mixed_plan(), options).await;

        assert!(target.calls.borrow().is_empty());
        assert_eq!(report.skipped, 3);
        assert_eq!(report.unchanged, 1);
        assert!(report.is_success());
    }
}
