// Runtime settings: everything the client needs to know before it talks to
// the gateway. Values come from environment variables with defaults that
// target a local emulator on port 4566.

use anyhow::{bail, Context, Result};
use std::time::Duration;

pub const DEFAULT_CONTROL_PLANE_URL: &str = "http://localhost:4566";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_ACCESS_KEY_ID: &str = "test";
pub const DEFAULT_EXECUTE_API_HOST: &str = "execute-api.localhost.localstack.cloud:4566";
pub const DEFAULT_STAGE: &str = "dev";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings shared by the resolver and the entry transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Gateway control-plane endpoint override.
    pub control_plane_url: String,
    pub region: String,
    pub access_key_id: String,
    /// Optional REST API id or name. Without it the first listed API wins.
    pub api_selector: Option<String>,
    /// Host (and port) that follows `<apiId>.` in the invoke URL.
    pub execute_api_host: String,
    pub stage: String,
    pub request_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            control_plane_url: DEFAULT_CONTROL_PLANE_URL.into(),
            region: DEFAULT_REGION.into(),
            access_key_id: DEFAULT_ACCESS_KEY_ID.into(),
            api_selector: None,
            execute_api_host: DEFAULT_EXECUTE_API_HOST.into(),
            stage: DEFAULT_STAGE.into(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Settings::default();

        let request_timeout = match get("ENTRIES_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .parse()
                    .with_context(|| format!("ENTRIES_TIMEOUT_SECS is not a number: {raw}"))?;
                if secs == 0 {
                    bail!("ENTRIES_TIMEOUT_SECS must be greater than zero");
                }
                Duration::from_secs(secs)
            }
            None => defaults.request_timeout,
        };

        Ok(Settings {
            control_plane_url: get("AWS_ENDPOINT_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.control_plane_url),
            region: get("AWS_REGION").unwrap_or(defaults.region),
            access_key_id: get("AWS_ACCESS_KEY_ID").unwrap_or(defaults.access_key_id),
            api_selector: get("ENTRIES_API"),
            execute_api_host: get("ENTRIES_EXECUTE_API_HOST").unwrap_or(defaults.execute_api_host),
            stage: get("ENTRIES_STAGE")
                .map(|stage| stage.trim_matches('/').to_string())
                .unwrap_or(defaults.stage),
            request_timeout,
        })
    }
}
