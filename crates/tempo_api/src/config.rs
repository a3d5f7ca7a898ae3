use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local, LocalResult, NaiveDateTime, TimeDelta, TimeZone, Utc};

use crate::error::SyncError;

pub const DEFAULT_TEMPO_API_BASE: &str = "https://api.tempo.io";
pub const DEFAULT_TEMPO_API_VERSION: &str = "4";
pub const DEFAULT_USER_AGENT: &str = "tempo-sync";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_ISSUE_CACHE_CAPACITY: usize = 0;

/// Time zone in which worklog dates and times are exchanged on the wire.
///
/// Tempo sends naive `startDate`/`startTime` strings; this setting decides
/// which zone those strings belong to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WireTimeZone {
    #[default]
    Local,
    Utc,
    Fixed(FixedOffset),
}

impl WireTimeZone {
    /// Attaches this zone to a naive wire timestamp.
    ///
    /// Wall-clock times skipped by a DST transition keep the offset in effect
    /// before the transition, so they land the length of the gap later.
    /// Repeated wall-clock times take the earlier instant.
    pub fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            WireTimeZone::Local => resolve_wall_clock(naive, |wall| {
                Local.from_local_datetime(wall).map(|dt| dt.fixed_offset())
            }),
            WireTimeZone::Utc => Some(Utc.from_utc_datetime(&naive).fixed_offset()),
            WireTimeZone::Fixed(offset) => offset.from_local_datetime(&naive).single(),
        }
    }

    /// Converts an instant into the naive wall-clock time sent on the wire.
    pub fn to_wire(&self, instant: &DateTime<FixedOffset>) -> NaiveDateTime {
        match self {
            WireTimeZone::Local => instant.with_timezone(&Local).naive_local(),
            WireTimeZone::Utc => instant.naive_utc(),
            WireTimeZone::Fixed(offset) => instant.with_timezone(offset).naive_local(),
        }
    }
}

fn resolve_wall_clock<F>(naive: NaiveDateTime, map: F) -> Option<DateTime<FixedOffset>>
where
    F: Fn(&NaiveDateTime) -> LocalResult<DateTime<FixedOffset>>,
{
    map(&naive).earliest().or_else(|| {
        let before = map(&(naive - TimeDelta::days(1))).earliest()?;
        before.offset().from_local_datetime(&naive).single()
    })
}

impl FromStr for WireTimeZone {
    type Err = SyncError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        match trimmed.to_lowercase().as_str() {
            "local" => Ok(WireTimeZone::Local),
            "utc" | "z" => Ok(WireTimeZone::Utc),
            _ => trimmed
                .parse::<FixedOffset>()
                .map(WireTimeZone::Fixed)
                .map_err(|err| {
                    SyncError::InvalidConfig(format!("unknown wire time zone '{trimmed}': {err}"))
                }),
        }
    }
}

impl fmt::Display for WireTimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireTimeZone::Local => f.write_str("local"),
            WireTimeZone::Utc => f.write_str("utc"),
            WireTimeZone::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

/// Connection settings for the Jira REST API used by login and issue lookups.
#[derive(Clone, Debug)]
pub struct JiraConfig {
    pub host: String,
    pub email: String,
    pub api_token: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl JiraConfig {
    pub fn new(
        host: impl Into<String>,
        email: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            email: email.into(),
            api_token: api_token.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    pub fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    pub fn with_connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = duration;
        self
    }

    /// Root of the Jira platform REST API, always ending with a slash.
    pub fn api_root(&self) -> String {
        format!("{}/rest/api/3/", self.host.trim_end_matches('/'))
    }
}

/// Connection settings for the Tempo worklog API.
#[derive(Clone, Debug)]
pub struct TempoConfig {
    pub base_url: String,
    pub api_version: String,
    pub token: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub issue_cache_capacity: usize,
    pub wire_time_zone: WireTimeZone,
}

impl TempoConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_TEMPO_API_BASE.to_string(),
            api_version: DEFAULT_TEMPO_API_VERSION.to_string(),
            token: token.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            issue_cache_capacity: DEFAULT_ISSUE_CACHE_CAPACITY,
            wire_time_zone: WireTimeZone::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    pub fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    pub fn with_connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = duration;
        self
    }

    pub fn with_issue_cache_capacity(mut self, capacity: usize) -> Self {
        self.issue_cache_capacity = capacity;
        self
    }

    pub fn with_wire_time_zone(mut self, zone: WireTimeZone) -> Self {
        self.wire_time_zone = zone;
        self
    }

    pub fn api_root(&self) -> String {
        format!(
            "{}/{}/",
            self.base_url.trim_end_matches('/'),
            self.api_version.trim_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn naive(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 14)
            .and_then(|d| d.and_hms_opt(h, m, 0))
            .expect("valid timestamp")
    }

    #[test]
    fn parses_named_and_offset_zones() {
        assert_eq!("local".parse::<WireTimeZone>().unwrap(), WireTimeZone::Local);
        assert_eq!(" UTC ".parse::<WireTimeZone>().unwrap(), WireTimeZone::Utc);
        let plus_three = FixedOffset::east_opt(3 * 3600).unwrap();
        assert_eq!(
            "+03:00".parse::<WireTimeZone>().unwrap(),
            WireTimeZone::Fixed(plus_three)
        );
        assert!("mars/olympus".parse::<WireTimeZone>().is_err());
    }

    #[test]
    fn fixed_zone_round_trips_wall_clock() {
        let zone = WireTimeZone::Fixed(FixedOffset::east_opt(3 * 3600).unwrap());
        let instant = zone.localize(naive(9, 30)).expect("fixed zone never skips");
        assert_eq!(instant.offset().local_minus_utc(), 3 * 3600);
        assert_eq!(zone.to_wire(&instant), naive(9, 30));
    }

    #[test]
    fn utc_zone_converts_other_offsets() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let instant = plus_two.from_local_datetime(&naive(12, 0)).single().unwrap();
        assert_eq!(WireTimeZone::Utc.to_wire(&instant).hour(), 10);
    }

    /// Europe/Berlin on 2024-03-31: 02:00-03:00 does not exist.
    fn berlin_spring_forward(wall: &NaiveDateTime) -> LocalResult<DateTime<FixedOffset>> {
        let gap_start = NaiveDate::from_ymd_opt(2024, 3, 31)
            .and_then(|d| d.and_hms_opt(2, 0, 0))
            .unwrap();
        let offset = if *wall < gap_start {
            FixedOffset::east_opt(3600).unwrap()
        } else if *wall < gap_start + TimeDelta::hours(1) {
            return LocalResult::None;
        } else {
            FixedOffset::east_opt(2 * 3600).unwrap()
        };
        offset.from_local_datetime(wall)
    }

    #[test]
    fn skipped_wall_clock_time_moves_past_the_gap() {
        let skipped = NaiveDate::from_ymd_opt(2024, 3, 31)
            .and_then(|d| d.and_hms_opt(2, 30, 0))
            .unwrap();

        let instant = resolve_wall_clock(skipped, berlin_spring_forward).expect("gap is resolved");

        assert_eq!(instant.naive_utc().hour(), 1);
        assert_eq!(instant.naive_utc().minute(), 30);
        let after = berlin_spring_forward(&(skipped + TimeDelta::hours(1))).single().unwrap();
        assert_eq!(instant, after);
    }

    #[test]
    fn existing_wall_clock_time_is_unchanged() {
        let before_gap = NaiveDate::from_ymd_opt(2024, 3, 31)
            .and_then(|d| d.and_hms_opt(1, 15, 0))
            .unwrap();
        let instant = resolve_wall_clock(before_gap, berlin_spring_forward).unwrap();
        assert_eq!(instant.offset().local_minus_utc(), 3600);
        assert_eq!(instant.naive_local(), before_gap);
    }

    #[test]
    fn api_roots_are_normalized() {
        let tempo = TempoConfig::new("t").with_base_url("http://localhost:1234/");
        assert_eq!(tempo.api_root(), "http://localhost:1234/4/");

        let jira = JiraConfig::new("https://acme.atlassian.net/", "me@acme.test", "secret");
        assert_eq!(jira.api_root(), "https://acme.atlassian.net/rest/api/3/");
    }
}
