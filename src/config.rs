//! Service configuration from the environment

use chrono::{Duration, FixedOffset, Offset, Utc};
use std::str::FromStr;

/// Settings read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotlineConfig {
    pub port: u16,
    pub db_path: String,
    pub signing_secret: Option<String>,
    /// Canonical external base URL, used when checking signatures
    pub public_url: String,
    pub require_signature: bool,
    pub max_connections: usize,
    pub idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
    /// Pause between a final utterance and the stream `end` message
    pub end_delay_ms: u64,
    pub utc_offset_minutes: i32,
}

impl Default for HotlineConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            db_path: "/tmp/.raider-hotline/hotline.db".to_string(),
            signing_secret: None,
            public_url: "http://localhost:8000".to_string(),
            require_signature: false,
            max_connections: 100,
            idle_timeout_secs: 900,
            sweep_interval_secs: 60,
            end_delay_ms: 1500,
            utc_offset_minutes: 0,
        }
    }
}

impl HotlineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = parse_or(&get, "HOTLINE_PORT", defaults.port);
        let db_path = get("HOTLINE_DB_PATH").unwrap_or_else(|| {
            let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
            format!("{home}/.raider-hotline/hotline.db")
        });
        let signing_secret = get("HOTLINE_SIGNING_SECRET");
        let public_url = get("HOTLINE_PUBLIC_URL").map_or_else(
            || format!("http://localhost:{port}"),
            |url| url.trim_end_matches('/').to_string(),
        );
        let require_signature = match get("HOTLINE_REQUIRE_SIGNATURE") {
            Some(flag) => parse_flag(&flag).unwrap_or_else(|| {
                tracing::warn!(value = %flag, "Unrecognized HOTLINE_REQUIRE_SIGNATURE; requiring signatures");
                true
            }),
            None => signing_secret.is_some(),
        };

        Self {
            port,
            db_path,
            signing_secret,
            public_url,
            require_signature,
            max_connections: parse_or(&get, "HOTLINE_MAX_CONNECTIONS", defaults.max_connections),
            idle_timeout_secs: parse_or(&get, "HOTLINE_IDLE_TIMEOUT_SECS", defaults.idle_timeout_secs),
            sweep_interval_secs: parse_or(
                &get,
                "HOTLINE_SWEEP_INTERVAL_SECS",
                defaults.sweep_interval_secs,
            )
            .max(1),
            end_delay_ms: parse_or(&get, "HOTLINE_END_DELAY_MS", defaults.end_delay_ms),
            utc_offset_minutes: parse_or(
                &get,
                "HOTLINE_UTC_OFFSET_MINUTES",
                defaults.utc_offset_minutes,
            ),
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        let secs = i64::try_from(self.idle_timeout_secs).unwrap_or(i64::MAX);
        Duration::seconds(secs.min(i64::MAX / 1000))
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn end_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.end_delay_ms)
    }

    /// Caller wall-clock offset; out-of-range values fall back to UTC
    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| {
                tracing::warn!(minutes = self.utc_offset_minutes, "UTC offset out of range, using UTC");
                Utc.fix()
            })
    }

    /// Full URL a provider signed for `path`
    pub fn canonical_url(&self, path_and_query: &str) -> String {
        format!("{}{path_and_query}", self.public_url)
    }
}

fn parse_or<T: FromStr + Copy>(get: &dyn Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match get(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Unparseable setting, using default");
            default
        }),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
