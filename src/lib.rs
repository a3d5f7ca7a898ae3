use chrono::NaiveDate;
use log::{info, warn};
use std::time::Duration;
use tempo_api::deadline::within;
use tempo_api::{JiraSession, TempoClient, WorkLog};

pub mod config;
pub mod secrets;
pub mod sync;

use config::Config;
use secrets::{SecretsManager, TokenKind};
use sync::{SyncOptions, SyncReport};

/// Initializes `env_logger` with an `info` default; `RUST_LOG` overrides it.
pub fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init();
}

/// Builds a logged-in Tempo client from the stored configuration and tokens.
pub async fn connect(config: &Config, secrets: &SecretsManager) -> Result<TempoClient, String> {
    let jira_token = secrets.require_token(TokenKind::Jira)?;
    let tempo_token = secrets.require_token(TokenKind::Tempo)?;

    let session = JiraSession::new(config.jira_config(&jira_token)?).map_err(|err| err.to_string())?;
    let mut client =
        TempoClient::new(session, config.tempo_config(&tempo_token)?).map_err(|err| err.to_string())?;

    let logged_in = within(config.call_deadline(), "login", client.login())
        .await
        .map_err(|err| err.to_string())?;
    if !logged_in {
        return Err("Login failed; check the Jira host, email and tokens".into());
    }

    if let Some(user) = client.session().user() {
        info!(
            "Logged in as {}",
            user.display_name.as_deref().unwrap_or(&user.account_id)
        );
    }
    Ok(client)
}

pub async fn pull(
    client: &TempoClient,
    from: NaiveDate,
    to: NaiveDate,
    deadline: Option<Duration>,
) -> Result<Vec<WorkLog>, String> {
    if from > to {
        return Err(format!("Start date {from} is after end date {to}"));
    }
    let worklogs = within(deadline, "get_worklogs", client.get_worklogs(from, to))
        .await
        .and_then(|result| result)
        .map_err(|err| err.to_string())?;
    info!("Fetched {} worklogs between {} and {}", worklogs.len(), from, to);
    Ok(worklogs)
}

/// Mirrors `source` onto Tempo for the given range. Source records starting outside the range are ignored.
pub async fn push(
    client: &TempoClient,
    source: Vec<WorkLog>,
    from: NaiveDate,
    to: NaiveDate,
    options: SyncOptions,
) -> Result<SyncReport, String> {
    let zone = client.config().wire_time_zone;
    let total = source.len();
    let in_range: Vec<WorkLog> = source
        .into_iter()
        .filter(|worklog| {
            let day = zone.to_wire(&worklog.start_time).date();
            day >= from && day <= to
        })
        .collect();
    if in_range.len() < total {
        warn!(
            "Ignoring {} source worklogs outside {}..={}",
            total - in_range.len(),
            from,
            to
        );
    }

    let target = pull(client, from, to, options.call_deadline).await?;
    let plan = sync::plan(&in_range, &target);
    info!("{} of {} planned actions need changes", plan.pending(), plan.actions.len());

    Ok(sync::execute(client, plan, options).await)
}
