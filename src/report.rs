use crate::format::{bytes_to_readable, duration_to_readable, rate_to_readable};
use crate::platform::TextFormat;
use crate::speedtest::MeasurementResult;

const PLACEHOLDER: &str = "N/A";

/// Escape engine-provided text for Telegram's HTML parse mode
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Writes report lines in either HTML or plain text
struct Writer {
    format: TextFormat,
    out: String,
}

impl Writer {
    fn new(format: TextFormat) -> Self {
        Self {
            format,
            out: String::new(),
        }
    }

    fn header(&mut self, title: &str) {
        match self.format {
            TextFormat::Html => self.out.push_str(&format!("<b>{}</b>\n", title)),
            TextFormat::Plain => self.out.push_str(&format!("{}\n", title)),
        }
    }

    /// `Label: value`, with the value in inline code when `code` is set
    fn field(&mut self, label: &str, value: &str, code: bool) {
        match self.format {
            TextFormat::Html => {
                let value = escape_html(value);
                if code {
                    self.out
                        .push_str(&format!("<b>{}:</b> <code>{}</code>\n", label, value));
                } else {
                    self.out.push_str(&format!("<b>{}:</b> {}\n", label, value));
                }
            }
            TextFormat::Plain => self.out.push_str(&format!("{}: {}\n", label, value)),
        }
    }

    fn footer(&mut self, text: &str) {
        match self.format {
            TextFormat::Html => self.out.push_str(&format!("<i>{}</i>", text)),
            TextFormat::Plain => self.out.push_str(text),
        }
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }
}

fn or_placeholder(value: Option<&str>) -> &str {
    value.unwrap_or(PLACEHOLDER)
}

fn number_or_placeholder(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{} {}", (v * 100.0).round() / 100.0, unit),
        None => PLACEHOLDER.to_string(),
    }
}

fn coordinates(lat: Option<&str>, lon: Option<&str>) -> String {
    format!("{}, {}", or_placeholder(lat), or_placeholder(lon))
}

/// Build the result message: a speed section, a server section and a client
/// section, followed by the wall time of the invocation.
pub fn render(result: &MeasurementResult, elapsed_secs: u64, format: TextFormat) -> String {
    let server = &result.server;
    let client = &result.client;
    let mut w = Writer::new(format);

    w.header("🚀 SPEEDTEST RESULT");
    w.blank();

    w.header("⚡ Speed");
    w.field(
        "Download",
        &rate_to_readable(result.download.unwrap_or(0.0), false),
        true,
    );
    w.field(
        "Upload",
        &rate_to_readable(result.upload.unwrap_or(0.0), false),
        true,
    );
    w.field("Ping", &number_or_placeholder(result.ping, "ms"), true);
    w.field("Time", or_placeholder(result.timestamp.as_deref()), true);
    w.field("Data Sent", &bytes_to_readable(result.bytes_sent), true);
    w.field("Data Received", &bytes_to_readable(result.bytes_received), true);
    w.blank();

    w.header("🌐 Server");
    w.field("Name", or_placeholder(server.name.as_deref()), false);
    let country = match (server.country.as_deref(), server.country_code.as_deref()) {
        (Some(country), Some(cc)) => format!("{} ({})", country, cc),
        (country, cc) => or_placeholder(country.or(cc)).to_string(),
    };
    w.field("Country", &country, false);
    w.field("Sponsor", or_placeholder(server.sponsor.as_deref()), false);
    w.field("Latency", &number_or_placeholder(server.latency, "ms"), true);
    w.field(
        "Coordinates",
        &coordinates(server.latitude.as_deref(), server.longitude.as_deref()),
        true,
    );
    w.blank();

    w.header("👤 Client");
    w.field("IP", or_placeholder(client.ip.as_deref()), true);
    w.field(
        "Coordinates",
        &coordinates(client.latitude.as_deref(), client.longitude.as_deref()),
        true,
    );
    w.field("Country", or_placeholder(client.country.as_deref()), false);
    w.field("ISP", or_placeholder(client.isp.as_deref()), false);
    w.field("ISP Rating", or_placeholder(client.isp_rating.as_deref()), false);
    w.blank();

    w.footer(&format!("Completed in {}", duration_to_readable(elapsed_secs)));
    w.out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speedtest::{ClientInfo, ServerInfo};

    fn sample() -> MeasurementResult {
        MeasurementResult {
            download: Some(50_000_000.0),
            upload: Some(10_000_000.0),
            ping: Some(15.0),
            timestamp: Some("2026-10-18T09:00:00Z".to_string()),
            bytes_sent: Some(1_048_576),
            bytes_received: Some(5 * 1_048_576),
            server: ServerInfo {
                name: Some("TestServer".to_string()),
                country: Some("United States".to_string()),
                country_code: Some("US".to_string()),
                sponsor: Some("AT&T <Labs>".to_string()),
                latency: Some(15.0),
                latitude: Some("40.7".to_string()),
                longitude: Some("-74.0".to_string()),
            },
            client: ClientInfo {
                ip: Some("1.2.3.4".to_string()),
                isp: Some("TestISP".to_string()),
                ..Default::default()
            },
            share: None,
        }
    }

    #[test]
    fn test_html_sections_in_order() {
        let text = render(&sample(), 42, TextFormat::Html);
        let speed = text.find("⚡ Speed").unwrap();
        let server = text.find("🌐 Server").unwrap();
        let client = text.find("👤 Client").unwrap();
        assert!(text.starts_with("<b>🚀 SPEEDTEST RESULT</b>\n"));
        assert!(speed < server && server < client);

        assert!(text.contains("<b>Download:</b> <code>5.96 MB/s</code>"));
        assert!(text.contains("<b>Upload:</b> <code>1.19 MB/s</code>"));
        assert!(text.contains("<b>Ping:</b> <code>15 ms</code>"));
        assert!(text.contains("<b>Data Sent:</b> <code>1MB</code>"));
        assert!(text.contains("<b>Data Received:</b> <code>5MB</code>"));
        assert!(text.contains("<b>Country:</b> United States (US)"));
        assert!(text.contains("<b>Coordinates:</b> <code>40.7, -74.0</code>"));
        assert!(text.contains("<b>IP:</b> <code>1.2.3.4</code>"));
        assert!(text.ends_with("<i>Completed in 42s</i>"));
    }

    #[test]
    fn test_html_escapes_engine_strings() {
        let text = render(&sample(), 0, TextFormat::Html);
        assert!(text.contains("<b>Sponsor:</b> AT&amp;T &lt;Labs&gt;"));
    }

    #[test]
    fn test_plain_has_no_markup() {
        let text = render(&sample(), 61, TextFormat::Plain);
        assert!(!text.contains("<b>"));
        assert!(!text.contains("<code>"));
        assert!(text.contains("Download: 5.96 MB/s"));
        assert!(text.contains("Sponsor: AT&T <Labs>"));
        assert!(text.ends_with("Completed in 1m1s"));
    }

    #[test]
    fn test_missing_fields_use_placeholders() {
        let text = render(&MeasurementResult::default(), 0, TextFormat::Plain);
        assert!(text.contains("Download: 0 B/s"));
        assert!(text.contains("Ping: N/A"));
        assert!(text.contains("Data Sent: 0B"));
        assert!(text.contains("Name: N/A"));
        assert!(text.contains("Country: N/A"));
        assert!(text.contains("Coordinates: N/A, N/A"));
        assert!(text.contains("ISP Rating: N/A"));
    }

    #[test]
    fn test_country_without_code() {
        let mut result = sample();
        result.server.country = None;
        let text = render(&result, 0, TextFormat::Plain);
        assert!(text.contains("Country: US\n"));
    }
}
