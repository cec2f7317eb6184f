//! services/documents_api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chrono::{FixedOffset, NaiveTime};
use document_history_core::retention::{DEFAULT_ARCHIVE_RETENTION_DAYS, DEFAULT_TRASH_RETENTION_DAYS};
use document_history_core::{RetentionPolicy, TimelineOrder};
use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub cors_origin: String,
    /// Offset applied to UTC timestamps when formatting history for display.
    pub display_offset: FixedOffset,
    pub timeline_order: TimelineOrder,
    pub retention: RetentionPolicy,
    /// UTC time of day the archive sweep runs.
    pub archive_sweep_at: NaiveTime,
    /// UTC time of day the trash purge sweep runs.
    pub trash_sweep_at: NaiveTime,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str = var_or("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| invalid("BIND_ADDRESS", e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            invalid("RUST_LOG", format!("'{}' is not a valid log level", log_level_str))
        })?;

        let cors_origin = var_or("CORS_ORIGIN", "http://localhost:3000");

        // --- Load History Display Settings ---
        let offset_str = var_or("DISPLAY_UTC_OFFSET", "+00:00");
        let display_offset = parse_utc_offset(&offset_str).ok_or_else(|| {
            invalid("DISPLAY_UTC_OFFSET", format!("'{}' is not an offset like +05:30", offset_str))
        })?;

        let order_str = var_or("TIMELINE_ORDER", "newest_first");
        let timeline_order = TimelineOrder::parse(&order_str).ok_or_else(|| {
            invalid("TIMELINE_ORDER", format!("'{}' is not newest_first or oldest_first", order_str))
        })?;

        // --- Load Retention Settings ---
        let retention = RetentionPolicy {
            trash_retention: chrono::Duration::days(days_var(
                "TRASH_RETENTION_DAYS",
                DEFAULT_TRASH_RETENTION_DAYS,
            )?),
            archive_retention: chrono::Duration::days(days_var(
                "ARCHIVE_RETENTION_DAYS",
                DEFAULT_ARCHIVE_RETENTION_DAYS,
            )?),
        };
        let archive_sweep_at = time_var("ARCHIVE_SWEEP_AT", "01:00")?;
        let trash_sweep_at = time_var("TRASH_SWEEP_AT", "02:00")?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_origin,
            display_offset,
            timeline_order,
            retention,
            archive_sweep_at,
            trash_sweep_at,
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn invalid(name: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue(name.to_string(), reason)
}

/// Longest accepted retention window, one hundred years.
const MAX_RETENTION_DAYS: i64 = 36_500;

fn days_var(name: &str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => parse_days(&raw).ok_or_else(|| {
            invalid(
                name,
                format!("'{}' is not a number of days between 1 and {}", raw, MAX_RETENTION_DAYS),
            )
        }),
    }
}

fn parse_days(raw: &str) -> Option<i64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|days| (1..=MAX_RETENTION_DAYS).contains(days))
}

fn time_var(name: &str, default: &str) -> Result<NaiveTime, ConfigError> {
    let raw = var_or(name, default);
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| invalid(name, format!("'{}' is not a time like 02:00", raw)))
}

/// Parses `Z`, `+HH:MM` or `-HH:MM`.
pub fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = if let Some(rest) = raw.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = raw.strip_prefix('-') {
        (-1, rest)
    } else {
        return None;
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
