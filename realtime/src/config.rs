//! Client configuration
//!
//! Values load from `REALTIME_*` environment variables (a `.env` file is
//! honored by the binary) and can be overridden from the command line.

use std::time::Duration;
use url::Url;

use crate::core::backoff::ReconnectPolicy;
use crate::error::{RealtimeError, RealtimeResult};

pub const ENV_API_BASE: &str = "REALTIME_API_BASE";
pub const ENV_API_TOKEN: &str = "REALTIME_API_TOKEN";
pub const ENV_RECONNECT_DELAYS_MS: &str = "REALTIME_RECONNECT_DELAYS_MS";
pub const ENV_RECOVERABLE_CODES: &str = "REALTIME_RECOVERABLE_CODES";
pub const ENV_TERMINAL_CODES: &str = "REALTIME_TERMINAL_CODES";
pub const ENV_HISTORY_LIMIT: &str = "REALTIME_HISTORY_LIMIT";
pub const ENV_MAX_MESSAGES: &str = "REALTIME_MAX_MESSAGES";
pub const ENV_PROGRESS_CEILING: &str = "REALTIME_PROGRESS_CEILING";
pub const ENV_PROGRESS_MULTIPLIER: &str = "REALTIME_PROGRESS_MULTIPLIER";
pub const ENV_PROGRESS_TICK_MS: &str = "REALTIME_PROGRESS_TICK_MS";
pub const ENV_PROGRESS_TIMEOUT_SECS: &str = "REALTIME_PROGRESS_TIMEOUT_SECS";

const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Socket client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// HTTP origin of the console API; rewritten to ws/wss for sockets
    pub api_base: Url,
    pub reconnect: ReconnectPolicy,
    pub history_limit: u32,
    /// Ask for recent history right after every successful open
    pub request_history_on_open: bool,
    pub max_messages: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: Url::parse(DEFAULT_API_BASE).expect("default API base is a valid URL"),
            reconnect: ReconnectPolicy::default(),
            history_limit: 50,
            request_history_on_open: true,
            max_messages: 500,
        }
    }
}

impl ClientConfig {
    pub fn new(api_base: Url) -> Self {
        Self { api_base, ..Self::default() }
    }

    pub fn from_env() -> RealtimeResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> RealtimeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base = match lookup(ENV_API_BASE) {
            Some(raw) => Url::parse(raw.trim())
                .map_err(|e| RealtimeError::config(format!("{ENV_API_BASE}: {e}")))?,
            None => defaults.api_base,
        };

        let delays = match lookup(ENV_RECONNECT_DELAYS_MS) {
            Some(raw) => parse_list::<u64>(ENV_RECONNECT_DELAYS_MS, &raw)?
                .into_iter()
                .map(Duration::from_millis)
                .collect(),
            None => defaults.reconnect.delays().to_vec(),
        };
        let recoverable = match lookup(ENV_RECOVERABLE_CODES) {
            Some(raw) => parse_list::<u16>(ENV_RECOVERABLE_CODES, &raw)?,
            None => defaults.reconnect.recoverable_codes().collect(),
        };
        let terminal = match lookup(ENV_TERMINAL_CODES) {
            Some(raw) => parse_list::<u16>(ENV_TERMINAL_CODES, &raw)?,
            None => defaults.reconnect.terminal_codes().collect(),
        };
        let reconnect = ReconnectPolicy::new(delays, recoverable, terminal)
            .ok_or_else(|| RealtimeError::config(format!("{ENV_RECONNECT_DELAYS_MS} must list at least one delay")))?;

        let config = Self {
            api_base,
            reconnect,
            history_limit: parse_or(&lookup, ENV_HISTORY_LIMIT, defaults.history_limit)?,
            request_history_on_open: defaults.request_history_on_open,
            max_messages: parse_or(&lookup, ENV_MAX_MESSAGES, defaults.max_messages)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RealtimeResult<()> {
        match self.api_base.scheme() {
            "http" | "https" | "ws" | "wss" => {}
            other => return Err(RealtimeError::config(format!("unsupported API scheme '{other}'"))),
        }
        if self.max_messages == 0 {
            return Err(RealtimeError::config("max_messages must be at least 1"));
        }
        Ok(())
    }
}

/// Hybrid progress estimator configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressConfig {
    /// Percentage where simulated progress hands off to the server
    pub ceiling: u8,
    /// Safety factor applied to the caller's duration estimate
    pub duration_multiplier: f64,
    pub tick_interval: Duration,
    /// Hard limit on the server phase; `None` waits indefinitely
    pub stream_timeout: Option<Duration>,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            ceiling: 70,
            duration_multiplier: 2.5,
            tick_interval: Duration::from_millis(250),
            stream_timeout: Some(Duration::from_secs(15 * 60)),
        }
    }
}

impl ProgressConfig {
    pub fn from_env() -> RealtimeResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> RealtimeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let tick_ms: u64 = parse_or(&lookup, ENV_PROGRESS_TICK_MS, defaults.tick_interval.as_millis() as u64)?;
        let stream_timeout = match lookup(ENV_PROGRESS_TIMEOUT_SECS) {
            // 0 disables the timeout
            Some(raw) => match parse_value::<u64>(ENV_PROGRESS_TIMEOUT_SECS, &raw)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            None => defaults.stream_timeout,
        };

        let config = Self {
            ceiling: parse_or(&lookup, ENV_PROGRESS_CEILING, defaults.ceiling)?,
            duration_multiplier: parse_or(&lookup, ENV_PROGRESS_MULTIPLIER, defaults.duration_multiplier)?,
            tick_interval: Duration::from_millis(tick_ms),
            stream_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RealtimeResult<()> {
        if self.ceiling >= 100 {
            return Err(RealtimeError::config(format!("progress ceiling must be below 100, got {}", self.ceiling)));
        }
        if !(self.duration_multiplier.is_finite() && self.duration_multiplier > 0.0) {
            return Err(RealtimeError::config(format!(
                "duration multiplier must be positive, got {}",
                self.duration_multiplier
            )));
        }
        if self.tick_interval.is_zero() {
            return Err(RealtimeError::config("tick interval must be non-zero"));
        }
        Ok(())
    }

    /// Length of the simulated phase for a caller estimate
    pub fn simulation_duration(&self, estimated: Duration) -> Duration {
        estimated.mul_f64(self.duration_multiplier)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> RealtimeResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| RealtimeError::config(format!("{key}: cannot parse '{raw}'")))
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> RealtimeResult<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_list<T: std::str::FromStr>(key: &str, raw: &str) -> RealtimeResult<Vec<T>> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| parse_value(key, item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.api_base.as_str(), "http://localhost:8000/");

        let progress = ProgressConfig::from_lookup(|_| None).unwrap();
        assert_eq!(progress, ProgressConfig::default());
    }

    #[test]
    fn test_client_overrides() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            (ENV_API_BASE, "https://radio.example.org"),
            (ENV_RECONNECT_DELAYS_MS, "100, 500,2000"),
            (ENV_TERMINAL_CODES, "4001"),
            (ENV_HISTORY_LIMIT, "20"),
        ]))
        .unwrap();

        assert_eq!(config.api_base.scheme(), "https");
        assert_eq!(config.reconnect.delay_for(0), Duration::from_millis(100));
        assert_eq!(config.reconnect.delay_for(9), Duration::from_secs(2));
        assert_eq!(config.reconnect.terminal_codes().collect::<Vec<_>>(), vec![4001]);
        assert_eq!(config.history_limit, 20);
    }

    #[test]
    fn test_invalid_client_values() {
        assert!(ClientConfig::from_lookup(lookup_from(&[(ENV_API_BASE, "not a url")])).is_err());
        assert!(ClientConfig::from_lookup(lookup_from(&[(ENV_API_BASE, "ftp://host")])).is_err());
        assert!(ClientConfig::from_lookup(lookup_from(&[(ENV_RECONNECT_DELAYS_MS, " , ")])).is_err());
        assert!(ClientConfig::from_lookup(lookup_from(&[(ENV_RECOVERABLE_CODES, "1000,abc")])).is_err());
        assert!(ClientConfig::from_lookup(lookup_from(&[(ENV_MAX_MESSAGES, "0")])).is_err());
    }

    #[test]
    fn test_progress_overrides_and_validation() {
        let config = ProgressConfig::from_lookup(lookup_from(&[
            (ENV_PROGRESS_CEILING, "60"),
            (ENV_PROGRESS_MULTIPLIER, "2"),
            (ENV_PROGRESS_TICK_MS, "100"),
            (ENV_PROGRESS_TIMEOUT_SECS, "0"),
        ]))
        .unwrap();
        assert_eq!(config.ceiling, 60);
        assert_eq!(config.tick_interval, Duration::from_millis(100));
        assert_eq!(config.stream_timeout, None);
        assert_eq!(config.simulation_duration(Duration::from_secs(10)), Duration::from_secs(20));

        assert!(ProgressConfig::from_lookup(lookup_from(&[(ENV_PROGRESS_CEILING, "100")])).is_err());
        assert!(ProgressConfig::from_lookup(lookup_from(&[(ENV_PROGRESS_MULTIPLIER, "-1")])).is_err());
        assert!(ProgressConfig::from_lookup(lookup_from(&[(ENV_PROGRESS_TICK_MS, "0")])).is_err());
    }

    #[test]
    fn test_default_simulation_duration() {
        let config = ProgressConfig::default();
        assert_eq!(config.simulation_duration(Duration::from_secs(10)), Duration::from_secs(25));
    }
}
