//! Configuration types.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// HTTP server and session store configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    pub bind: IpAddr,
    pub port: u16,
    /// Serve canned agent responses instead of a language-model backend.
    pub mock_responses: bool,
    /// Sessions idle for longer than this are pruned.
    pub session_idle_timeout: Duration,
    /// How often the idle sweeper runs.
    pub sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8000,
            mock_responses: true,
            session_idle_timeout: Duration::from_secs(3600), // 1 hour
            sweep_interval: Duration::from_secs(60),         // 1 minute
        }
    }
}

impl ServerConfig {
    /// Load from `INTERVIEW_*` environment variables, falling back to defaults
    /// for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bind = parse_or(&lookup, "INTERVIEW_BIND", defaults.bind)?;
        let port = parse_or(&lookup, "INTERVIEW_PORT", defaults.port)?;
        let mock_responses = parse_or(&lookup, "INTERVIEW_MOCK", defaults.mock_responses)?;
        let idle_secs = parse_or(
            &lookup,
            "INTERVIEW_SESSION_IDLE_SECS",
            defaults.session_idle_timeout.as_secs(),
        )?;
        let sweep_secs = parse_or(
            &lookup,
            "INTERVIEW_SWEEP_INTERVAL_SECS",
            defaults.sweep_interval.as_secs(),
        )?;

        if sweep_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "INTERVIEW_SWEEP_INTERVAL_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            bind,
            port,
            mock_responses,
            session_idle_timeout: Duration::from_secs(idle_secs),
            sweep_interval: Duration::from_secs(sweep_secs),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Idle timeout as a wall-clock delta, for comparison with session timestamps.
    pub fn session_idle_delta(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.session_idle_timeout).unwrap_or(chrono::Duration::MAX)
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("{raw:?}: {e}"),
                })
        }
        _ => Ok(default),
    }
}
