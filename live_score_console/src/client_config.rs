use std::path::Path;
use std::time::Duration;

use anyhow::{Context, ensure};
use live_score::ReconnectPolicy;
use serde::{Deserialize, Serialize};

use crate::network::MAX_POLL_INTERVAL;


pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// Optional YAML file tuning the terminal client. Every field may be omitted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub reconnect: ReconnectPolicy,
    // How long the socket thread blocks in a read before checking for outgoing frames.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        ClientSettings {
            reconnect: ReconnectPolicy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

pub fn read_config_file(path: &Path) -> anyhow::Result<ClientSettings> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'.", path.display()))?;
    parse_config(&contents)
        .with_context(|| format!("Failed to parse config file '{}'.", path.display()))
}

pub fn parse_config(contents: &str) -> anyhow::Result<ClientSettings> {
    // An empty file is a valid "all defaults" config.
    if contents.trim().is_empty() {
        return Ok(ClientSettings::default());
    }
    let settings: ClientSettings = serde_yaml::from_str(contents)?;
    ensure!(
        !settings.poll_interval.is_zero() && settings.poll_interval <= MAX_POLL_INTERVAL,
        "poll_interval must be between 1ms and {}",
        humantime::format_duration(MAX_POLL_INTERVAL)
    );
    Ok(settings)
}
