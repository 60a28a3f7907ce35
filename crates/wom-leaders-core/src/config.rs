use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::AppError;
use crate::metric::{self, Metric};
use crate::reconciler::ReconcilerConfig;
use crate::scheduler::SchedulerConfig;
use crate::throttle::ThrottleConfig;

pub const DEFAULT_BASE_URL: &str = "https://secure.runescape.com";
pub const DEFAULT_WOM_BASE_URL: &str = "https://api.wiseoldman.net/v2";
pub const DEFAULT_WOM_LEAGUE_BASE_URL: &str = "https://api.wiseoldman.net/league";
pub const DEFAULT_WOM_USER_AGENT: &str = "WOM Leagues Scraper";
pub const DEFAULT_BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/119.0";
pub const DEFAULT_LEADER_LIMIT: usize = 25;
pub const DEFAULT_LEADER_GROUP_NAME: &str = "League Leaders";

/// Longest group name prefix. WOM caps names at 30 characters and every
/// submission appends a space and 8 hex chars.
const MAX_GROUP_NAME_LEN: usize = 21;

/// Static runtime configuration. Loaded once at startup.
#[derive(Clone)]
pub struct Config {
    /// Hiscores root, e.g. `https://secure.runescape.com`.
    pub base_url: Url,
    /// Pause between cycles.
    pub delay: Duration,
    /// Minimum gap between two hiscore requests.
    pub request_delay: Duration,
    /// Per-request timeout for both remote services.
    pub http_timeout: Duration,
    /// Number of metrics tracked; `None` tracks the whole catalogue.
    pub metric_limit: Option<usize>,
    /// Top-N players tracked per metric.
    pub leader_limit: usize,
    pub enable_seasonal: bool,
    pub wom_api_key: Option<String>,
    pub wom_user_agent: String,
    /// Overrides the WOM API root picked from `enable_seasonal`.
    pub wom_base_url: Option<Url>,
    pub browser_user_agent: String,
    pub leader_group_name: String,
    pub log_level: tracing::Level,
}

impl Config {
    /// Read configuration from environment variables.
    ///
    /// - `BASE_URL` (optional, defaults to the official hiscores)
    /// - `DELAY` (optional, seconds between cycles, defaults to 5)
    /// - `REQUEST_DELAY` (optional, seconds between hiscore requests, defaults to 5)
    /// - `HTTP_TIMEOUT` (optional, seconds, defaults to 30)
    /// - `METRIC_LIMIT` (optional, unset or `none` tracks every metric)
    /// - `LEADER_LIMIT` (optional, defaults to 25)
    /// - `ENABLE_SEASONAL` (optional, defaults to false)
    /// - `WOM_API_KEY` (optional)
    /// - `WOM_USER_AGENT`, `BROWSER_USER_AGENT` (optional)
    /// - `WOM_BASE_URL` (optional)
    /// - `LEADER_GROUP_NAME` (optional, defaults to `League Leaders`)
    /// - `LOG_LEVEL` (optional, defaults to `info`)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let base_url = parse_url(
            "BASE_URL",
            get("BASE_URL").as_deref().unwrap_or(DEFAULT_BASE_URL),
        )?;
        let wom_base_url = get("WOM_BASE_URL")
            .map(|raw| parse_url("WOM_BASE_URL", &raw))
            .transpose()?;

        let delay = parse_secs("DELAY", get("DELAY"), 5, 1)?;
        let request_delay = parse_secs("REQUEST_DELAY", get("REQUEST_DELAY"), 5, 0)?;
        let http_timeout = parse_secs("HTTP_TIMEOUT", get("HTTP_TIMEOUT"), 30, 1)?;

        let metric_limit = match get("METRIC_LIMIT") {
            None => None,
            Some(raw) if raw.eq_ignore_ascii_case("none") => None,
            Some(raw) => Some(parse_positive("METRIC_LIMIT", &raw)?),
        };
        let leader_limit = match get("LEADER_LIMIT") {
            None => DEFAULT_LEADER_LIMIT,
            Some(raw) => parse_positive("LEADER_LIMIT", &raw)?,
        };

        let enable_seasonal = match get("ENABLE_SEASONAL") {
            None => false,
            Some(raw) => parse_bool("ENABLE_SEASONAL", &raw)?,
        };

        let leader_group_name = get("LEADER_GROUP_NAME")
            .unwrap_or_else(|| DEFAULT_LEADER_GROUP_NAME.to_string());
        if leader_group_name.chars().count() > MAX_GROUP_NAME_LEN {
            return Err(AppError::ConfigError(format!(
                "LEADER_GROUP_NAME '{leader_group_name}' is longer than \
                 {MAX_GROUP_NAME_LEN} characters"
            )));
        }

        let log_level = match get("LOG_LEVEL") {
            None => tracing::Level::INFO,
            Some(raw) => tracing::Level::from_str(&raw).map_err(|_| {
                AppError::ConfigError(format!(
                    "Invalid LOG_LEVEL '{raw}': expected trace, debug, info, warn or error"
                ))
            })?,
        };

        Ok(Self {
            base_url,
            delay,
            request_delay,
            http_timeout,
            metric_limit,
            leader_limit,
            enable_seasonal,
            wom_api_key: get("WOM_API_KEY"),
            wom_user_agent: get("WOM_USER_AGENT")
                .unwrap_or_else(|| DEFAULT_WOM_USER_AGENT.to_string()),
            wom_base_url,
            browser_user_agent: get("BROWSER_USER_AGENT")
                .unwrap_or_else(|| DEFAULT_BROWSER_USER_AGENT.to_string()),
            leader_group_name,
            log_level,
        })
    }

    /// Metrics polled every cycle.
    pub fn tracked_metrics(&self) -> Vec<Metric> {
        metric::tracked_metrics(self.enable_seasonal, self.metric_limit)
    }

    /// The hiscore mode path segment (`m=<mode>`).
    pub fn hiscore_mode(&self) -> &'static str {
        if self.enable_seasonal {
            "hiscore_oldschool_seasonal"
        } else {
            "hiscore_oldschool"
        }
    }

    /// WOM API root: the explicit override, else the league API in seasonal
    /// mode, else the main API.
    pub fn wom_api_url(&self) -> String {
        match &self.wom_base_url {
            Some(url) => url.as_str().trim_end_matches('/').to_string(),
            None if self.enable_seasonal => DEFAULT_WOM_LEAGUE_BASE_URL.to_string(),
            None => DEFAULT_WOM_BASE_URL.to_string(),
        }
    }

    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            group_name: self.leader_group_name.clone(),
            leader_limit: self.leader_limit,
            metrics: self.tracked_metrics(),
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::default().with_delay(self.delay)
    }

    pub fn throttle_config(&self) -> ThrottleConfig {
        ThrottleConfig::new(self.request_delay)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url.as_str())
            .field("delay", &self.delay)
            .field("request_delay", &self.request_delay)
            .field("http_timeout", &self.http_timeout)
            .field("metric_limit", &self.metric_limit)
            .field("leader_limit", &self.leader_limit)
            .field("enable_seasonal", &self.enable_seasonal)
            .field("wom_api_key", &self.wom_api_key.as_ref().map(|_| "<redacted>"))
            .field("wom_user_agent", &self.wom_user_agent)
            .field("wom_base_url", &self.wom_base_url.as_ref().map(Url::as_str))
            .field("browser_user_agent", &self.browser_user_agent)
            .field("leader_group_name", &self.leader_group_name)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn parse_url(key: &str, raw: &str) -> Result<Url, AppError> {
    let url = Url::parse(raw)
        .map_err(|e| AppError::ConfigError(format!("Invalid {key} '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(AppError::ConfigError(format!(
            "Invalid {key} '{raw}': scheme '{scheme}' is not http/https"
        ))),
    }
}

fn parse_secs(
    key: &str,
    raw: Option<String>,
    default: u64,
    min: u64,
) -> Result<Duration, AppError> {
    let Some(raw) = raw else {
        return Ok(Duration::from_secs(default));
    };
    let secs: u64 = raw.parse().map_err(|_| {
        AppError::ConfigError(format!("Invalid {key} '{raw}': must be a whole number of seconds"))
    })?;
    if secs < min {
        return Err(AppError::ConfigError(format!("{key} must be at least {min}")));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_positive(key: &str, raw: &str) -> Result<usize, AppError> {
    let parsed: usize = raw.parse().map_err(|_| {
        AppError::ConfigError(format!("Invalid {key} '{raw}': must be a positive integer"))
    })?;
    if parsed == 0 {
        return Err(AppError::ConfigError(format!("{key} must be at least 1")));
    }
    Ok(parsed)
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, AppError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::ConfigError(format!(
            "Invalid {key} '{raw}': expected true or false"
        ))),
    }
}
