use std::time::Duration;

use crate::errors::ThrottleError;

pub const DEFAULT_MAX_CALLS: u32 = 8;
pub const DEFAULT_TIME_FRAME: Duration = Duration::from_secs(1);
pub const DEFAULT_PORT: u16 = 3000;

pub const MAX_CALLS_VAR: &str = "THROTTLE_MAX_CALLS";
pub const TIME_FRAME_VAR: &str = "THROTTLE_TIME_FRAME_SECS";
pub const PORT_VAR: &str = "PORT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleConfig {
    pub max_calls: u32,
    pub time_frame: Duration,
    pub port: u16,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_calls: DEFAULT_MAX_CALLS,
            time_frame: DEFAULT_TIME_FRAME,
            port: DEFAULT_PORT,
        }
    }
}

impl ThrottleConfig {
    pub fn from_env() -> Result<Self, ThrottleError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, falling back to defaults for unset keys.
    /// Limits that are present but unusable are an error, never clamped.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ThrottleError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_calls = match lookup(MAX_CALLS_VAR) {
            Some(raw) => parse_max_calls(&raw)?,
            None => DEFAULT_MAX_CALLS,
        };

        let time_frame = match lookup(TIME_FRAME_VAR) {
            Some(raw) => parse_time_frame(&raw)?,
            None => DEFAULT_TIME_FRAME,
        };

        let port = lookup(PORT_VAR)
            .and_then(|s| s.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        Ok(Self {
            max_calls,
            time_frame,
            port,
        })
    }
}

fn parse_max_calls(raw: &str) -> Result<u32, ThrottleError> {
    let value: i64 = raw.trim().parse().map_err(|e| {
        ThrottleError::InvalidConfiguration(format!("{MAX_CALLS_VAR}={raw:?}: {e}"))
    })?;
    if value <= 0 {
        return Err(ThrottleError::InvalidConfiguration(format!(
            "{MAX_CALLS_VAR} must be positive, got {value}"
        )));
    }
    u32::try_from(value).map_err(|_| {
        ThrottleError::InvalidConfiguration(format!("{MAX_CALLS_VAR}={value} is too large"))
    })
}

fn parse_time_frame(raw: &str) -> Result<Duration, ThrottleError> {
    let secs: f64 = raw.trim().parse().map_err(|e| {
        ThrottleError::InvalidConfiguration(format!("{TIME_FRAME_VAR}={raw:?}: {e}"))
    })?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ThrottleError::InvalidConfiguration(format!(
            "{TIME_FRAME_VAR} must be a positive number of seconds, got {raw}"
        )));
    }
    let time_frame = Duration::try_from_secs_f64(secs).map_err(|e| {
        ThrottleError::InvalidConfiguration(format!("{TIME_FRAME_VAR}={raw}: {e}"))
    })?;
    // Sub-nanosecond values round down to nothing
    if time_frame.is_zero() {
        return Err(ThrottleError::InvalidConfiguration(format!(
            "{TIME_FRAME_VAR}={raw} is shorter than one nanosecond"
        )));
    }
    Ok(time_frame)
}
