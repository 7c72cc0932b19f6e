use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::platform::{CommandEvent, OutgoingReply, TextFormat};
use crate::report;
use crate::speedtest::{self, MeasurementEngine};

pub const TRIGGER: &str = "/speedtest";

const PROGRESS_TEXT: &str = "Running speedtest... please wait 30–60 seconds.";

/// True for `/speedtest`, `/speedtest@BotName` and either followed by
/// whitespace and ignored arguments.
pub fn is_trigger(text: &str) -> bool {
    let Some(rest) = text.strip_prefix(TRIGGER) else {
        return false;
    };
    let rest = match rest.strip_prefix('@') {
        Some(addressed) => addressed.trim_start_matches(|c: char| !c.is_whitespace()),
        None => rest,
    };
    rest.is_empty() || rest.starts_with(char::is_whitespace)
}

/// How an invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Result sent with HTML formatting
    Delivered,
    /// Result sent as plain text after the formatted reply failed
    DeliveredPlain,
    /// The measurement failed and the error was reported
    Failed,
    /// Nothing could be delivered at all
    Undelivered,
}

/// Handles `/speedtest`: acknowledge, measure off the event loop, reply
/// with the formatted result and remove the acknowledgement.
pub struct SpeedtestCommand {
    engine: Arc<dyn MeasurementEngine>,
}

impl SpeedtestCommand {
    pub fn new(engine: Arc<dyn MeasurementEngine>) -> Self {
        Self { engine }
    }

    pub async fn handle(&self, event: &dyn CommandEvent) -> Outcome {
        let started = Instant::now();

        let progress = match event.reply(OutgoingReply::plain(PROGRESS_TEXT)).await {
            Ok(sent) => Some(sent),
            Err(e) => {
                warn!("Failed to send progress message: {:#}", e);
                None
            }
        };

        let outcome = match speedtest::measure(self.engine.clone()).await {
            Ok(result) => {
                info!(
                    "Speedtest finished: download={:?} upload={:?} ping={:?}",
                    result.download, result.upload, result.ping
                );
                let elapsed = started.elapsed().as_secs();
                let reply = OutgoingReply {
                    text: report::render(&result, elapsed, TextFormat::Html),
                    format: TextFormat::Html,
                    attachment: result.share.clone(),
                };

                match event.reply(reply).await {
                    Ok(_) => Outcome::Delivered,
                    Err(e) => {
                        warn!("Formatted reply failed, falling back to plain text: {:#}", e);
                        let plain = OutgoingReply::plain(report::render(
                            &result,
                            elapsed,
                            TextFormat::Plain,
                        ));
                        match event.reply(plain).await {
                            Ok(_) => Outcome::DeliveredPlain,
                            Err(e) => {
                                error!("Plain-text reply failed: {:#}", e);
                                Outcome::Undelivered
                            }
                        }
                    }
                }
            }
            Err(e) => {
                error!("Speedtest failed: {:#}", e);
                match event
                    .reply(OutgoingReply::plain(format!("Speedtest failed: {:#}", e)))
                    .await
                {
                    Ok(_) => Outcome::Failed,
                    Err(e) => {
                        error!("Failed to report speedtest failure: {:#}", e);
                        Outcome::Undelivered
                    }
                }
            }
        };

        if let Some(progress) = progress {
            if let Err(e) = event.delete(progress).await {
                debug!("Could not delete progress message: {:#}", e);
            }
        }

        outcome
    }
}
