// Whole-device configuration with the dry-run validate/apply workflow.
//
// A full configuration is submitted as raw text with a `dryrun` mode flag;
// the device checks or applies it asynchronously and exposes the result on
// a status resource that is polled a fixed number of times.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, info};

use crate::client::{SwitchClient, decode_object};
use crate::error::Error;
use crate::types::Attributes;

/// Maximum status GETs per dry-run submission.
const DRYRUN_POLL_ATTEMPTS: u32 = 10;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Terminal and transient states of a dry-run job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DryRunState {
    /// Not finished yet (also covers any state string the device adds).
    Pending,
    Success,
    Error,
}

impl DryRunState {
    fn from_attrs(attrs: &Attributes) -> Self {
        match attrs.get("state").and_then(Value::as_str) {
            Some("success") => Self::Success,
            Some("error") => Self::Error,
            _ => Self::Pending,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// One line-scoped error reported by the device for a rejected config.
#[derive(Debug, Clone)]
pub struct ConfigLineError {
    pub line: u64,
    pub message: String,
}

/// Result of one dry-run submission after polling.
#[derive(Debug, Clone)]
pub struct DryRunOutcome {
    pub state: DryRunState,
    pub errors: Vec<ConfigLineError>,
    /// The last raw status body, terminal or not.
    pub raw: Attributes,
}

impl DryRunOutcome {
    fn from_attrs(raw: Attributes) -> Self {
        let state = DryRunState::from_attrs(&raw);
        let errors = raw
            .get("errors")
            .and_then(Value::as_array)
            .map_or_else(Vec::new, |entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let entry = entry.as_object()?;
                        Some(ConfigLineError {
                            line: entry.get("line").and_then(Value::as_u64).unwrap_or(0),
                            message: entry
                                .get("message")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_owned(),
                        })
                    })
                    .collect()
            });
        Self { state, errors, raw }
    }

    /// Device errors formatted as `line N | message` entries, one per line.
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("line {} | {}", e.line, e.message))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Full device configuration as a text blob.
#[derive(Debug, Clone)]
pub struct FullConfig {
    pub config: String,
    poll_interval: Duration,
}

impl Default for FullConfig {
    fn default() -> Self {
        Self {
            config: String::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl FullConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the fixed delay between dry-run status polls.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn set_config(&mut self, config: impl Into<String>) {
        self.config = config.into();
    }

    /// Load the configuration text from a file.
    pub fn read_from_file(&mut self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        self.config = std::fs::read_to_string(path).map_err(|source| Error::ConfigFile {
            path: PathBuf::from(path),
            source,
        })?;
        Ok(())
    }

    /// Fetch the running configuration into `config`.
    pub async fn get(&mut self, client: &SwitchClient) -> Result<(), Error> {
        let path = client.rest_path("configs/running-config");
        let (status, body) = client.get_text(&path).await?;
        if status != StatusCode::OK {
            return Err(Error::remote(status, "failed to fetch running config"));
        }
        self.config = body;
        Ok(())
    }

    /// Fetch the running configuration and write it to a file.
    pub async fn download_to(
        &mut self,
        client: &SwitchClient,
        path: impl AsRef<Path>,
    ) -> Result<(), Error> {
        self.get(client).await?;
        let path = path.as_ref();
        std::fs::write(path, &self.config).map_err(|source| Error::ConfigFile {
            path: PathBuf::from(path),
            source,
        })
    }

    /// Syntax/semantics-check the configuration without applying it.
    pub async fn validate_config(&self, client: &SwitchClient) -> Result<DryRunOutcome, Error> {
        self.dryrun(client, "validate").await
    }

    /// Apply the configuration to the running config.
    pub async fn apply_config(&self, client: &SwitchClient) -> Result<DryRunOutcome, Error> {
        self.dryrun(client, "apply").await
    }

    async fn dryrun(&self, client: &SwitchClient, mode: &str) -> Result<DryRunOutcome, Error> {
        let base = client.rest_path("configs/running-config");
        let submit = format!("{base}?dryrun={mode}");

        debug!(mode, "submitting config dry-run");
        let (status, _) = client.post_text(&submit, self.config.clone()).await?;
        if status != StatusCode::OK && status != StatusCode::ACCEPTED {
            return Err(Error::remote(
                status,
                format!("dry-run {mode} submission rejected"),
            ));
        }

        self.poll(client, &base).await
    }

    /// Poll the dry-run status resource, at most `DRYRUN_POLL_ATTEMPTS`
    /// GETs with a fixed delay between them, stopping early on a terminal
    /// state. A never-terminal run returns the last body as-is.
    async fn poll(&self, client: &SwitchClient, base: &str) -> Result<DryRunOutcome, Error> {
        let status_path = format!("{base}?dryrun");
        let mut attempt = 0;
        loop {
            let (status, body) = client.get(&status_path).await?;
            if status != StatusCode::OK {
                return Err(Error::remote(status, "failed to poll dry-run status"));
            }
            let outcome = DryRunOutcome::from_attrs(decode_object(&body)?);

            attempt += 1;
            if outcome.state.is_terminal() || attempt >= DRYRUN_POLL_ATTEMPTS {
                debug!(attempt, state = ?outcome.state, "dry-run poll finished");
                return Ok(outcome);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Full commit workflow: read the configuration from a file, validate
    /// it, apply it, then refresh `config` from the device. Any
    /// non-success stage fails with the device's line errors aggregated
    /// into the error detail.
    pub async fn apply_from_file(
        &mut self,
        client: &SwitchClient,
        path: impl AsRef<Path>,
    ) -> Result<(), Error> {
        self.read_from_file(path)?;

        let validated = self.validate_config(client).await?;
        if validated.state != DryRunState::Success {
            return Err(Error::Remote {
                status: format!("dry-run validate ended in state {:?}", validated.state),
                detail: validated.error_summary(),
            });
        }

        let applied = self.apply_config(client).await?;
        if applied.state != DryRunState::Success {
            return Err(Error::Remote {
                status: format!("dry-run apply ended in state {:?}", applied.state),
                detail: applied.error_summary(),
            });
        }

        info!("new configuration applied");
        self.get(client).await
    }
}
