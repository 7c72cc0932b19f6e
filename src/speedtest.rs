use std::process::Command;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use crate::config::SpeedtestConfig;

/// Result of one speed measurement, as emitted by `speedtest-cli --json`.
/// Every field is optional; consumers substitute placeholders.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeasurementResult {
    /// Download throughput in bits per second
    #[serde(default, deserialize_with = "lenient_f64")]
    pub download: Option<f64>,
    /// Upload throughput in bits per second
    #[serde(default, deserialize_with = "lenient_f64")]
    pub upload: Option<f64>,
    /// Round trip in milliseconds
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ping: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub bytes_sent: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub bytes_received: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub server: ServerInfo,
    #[serde(default, deserialize_with = "null_as_default")]
    pub client: ClientInfo,
    /// URL of the generated result image, when sharing succeeded
    #[serde(default, deserialize_with = "lenient_string")]
    pub share: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerInfo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub country: Option<String>,
    #[serde(default, rename = "cc", deserialize_with = "lenient_string")]
    pub country_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sponsor: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub latency: Option<f64>,
    #[serde(default, rename = "lat", deserialize_with = "lenient_string")]
    pub latitude: Option<String>,
    #[serde(default, rename = "lon", deserialize_with = "lenient_string")]
    pub longitude: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientInfo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub ip: Option<String>,
    #[serde(default, rename = "lat", deserialize_with = "lenient_string")]
    pub latitude: Option<String>,
    #[serde(default, rename = "lon", deserialize_with = "lenient_string")]
    pub longitude: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub isp: Option<String>,
    #[serde(default, rename = "isprating", deserialize_with = "lenient_string")]
    pub isp_rating: Option<String>,
}

/// speedtest-cli reports coordinates and ratings as strings, other tools as
/// numbers. Accept either; empty strings and null become `None`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Numbers may arrive as JSON numbers or numeric strings. Anything else,
/// including unparseable strings, becomes `None`.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

/// Byte counts, truncated to whole bytes. Same leniency as `lenient_f64`.
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_f64(deserializer)?.map(|v| v as i64))
}

/// A `null` or malformed section reads as an empty one.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + serde::de::DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default())
}

impl MeasurementResult {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse speedtest output")
    }
}

/// A blocking speed measurement. Implementations may take tens of seconds
/// and are always called from a worker thread, never from the event loop.
pub trait MeasurementEngine: Send + Sync {
    fn run(&self) -> Result<MeasurementResult>;
}

/// Runs an external speedtest program and parses its JSON report.
pub struct CliEngine {
    command: String,
    args: Vec<String>,
}

impl CliEngine {
    pub fn new(config: &SpeedtestConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }
}

impl MeasurementEngine for CliEngine {
    fn run(&self) -> Result<MeasurementResult> {
        debug!("Running {} {:?}", self.command, self.args);

        let output = Command::new(&self.command)
            .args(&self.args)
            .output()
            .with_context(|| format!("Failed to start {}", self.command))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            if stderr.is_empty() {
                anyhow::bail!(
                    "{} exited with code {}",
                    self.command,
                    output.status.code().unwrap_or(-1)
                );
            }
            anyhow::bail!("{}", stderr);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        MeasurementResult::from_json(stdout.trim())
    }
}

/// Run the engine on tokio's blocking pool and wait for it.
/// The calling task is suspended; other handlers keep running.
pub async fn measure(engine: Arc<dyn MeasurementEngine>) -> Result<MeasurementResult> {
    info!("Starting speed measurement");
    tokio::task::spawn_blocking(move || engine.run())
        .await
        .context("Measurement worker did not complete")?
}
