use std::{str::FromStr, time::Duration};

use chrono::NaiveDate;
use envconfig::Envconfig;
use thiserror::Error;

#[derive(Envconfig, Clone)]
pub struct Config {
    // EU projects need https://data-eu.mixpanel.com/api/2.0
    #[envconfig(from = "MIXPANEL_API_URL", default = "https://data.mixpanel.com/api/2.0")]
    pub mixpanel_api_url: String,

    #[envconfig(from = "MIXPANEL_PROJECT_ID")]
    pub mixpanel_project_id: String,

    // Service account credentials
    #[envconfig(from = "MIXPANEL_USERNAME")]
    pub mixpanel_username: String,

    #[envconfig(from = "MIXPANEL_PASSWORD")]
    pub mixpanel_password: String,

    // Only needed when sending to capture
    #[envconfig(from = "POSTHOG_PROJECT_KEY", default = "")]
    pub posthog_project_key: String,

    #[envconfig(from = "POSTHOG_ENDPOINT", default = "https://us.i.posthog.com")]
    pub posthog_endpoint: String,

    // Inclusive, YYYY-MM-DD
    #[envconfig(from = "FROM_DATE")]
    pub from_date: NaiveDate,

    #[envconfig(from = "TO_DATE")]
    pub to_date: NaiveDate,

    #[envconfig(from = "CHUNK_SIZE_DAYS", default = "7")]
    pub chunk_size_days: u32,

    #[envconfig(from = "ENQUEUE_DELAY_MS", default = "1")]
    pub enqueue_delay_ms: u64,

    #[envconfig(from = "EXPORT_TIMEOUT_SECS", default = "3600")]
    pub export_timeout_secs: u64,

    #[envconfig(from = "CAPTURE_BATCH_SIZE", default = "100")]
    pub capture_batch_size: usize,

    #[envconfig(from = "IMPORT_TAG", default = "prod-import-1")]
    pub import_tag: String,

    #[envconfig(from = "SINK", default = "capture")]
    pub sink: SinkKind,

    // How long to keep the process around after the last batch so capture can catch up. 0 exits
    // right away
    #[envconfig(from = "DRAIN_WAIT_SECS", default = "60")]
    pub drain_wait_secs: u64,
}

impl Config {
    pub fn enqueue_delay(&self) -> Duration {
        Duration::from_millis(self.enqueue_delay_ms)
    }

    pub fn export_timeout(&self) -> Duration {
        Duration::from_secs(self.export_timeout_secs)
    }

    pub fn drain_wait(&self) -> Duration {
        Duration::from_secs(self.drain_wait_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Capture,
    Stdout { as_json: bool },
    NoOp,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown sink {0:?}, expected one of capture, stdout, stdout-json, noop")]
pub struct UnknownSink(String);

impl FromStr for SinkKind {
    type Err = UnknownSink;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "capture" => Ok(SinkKind::Capture),
            "stdout" => Ok(SinkKind::Stdout { as_json: false }),
            "stdout-json" => Ok(SinkKind::Stdout { as_json: true }),
            "noop" => Ok(SinkKind::NoOp),
            _ => Err(UnknownSink(s.to_string())),
        }
    }
}
