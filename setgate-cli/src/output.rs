//! Output formatting for the setgate CLI.

use std::borrow::Cow;
use std::path::Path;

use colored::{Color, Colorize};
use setgate::{GateResponse, SessionRecord, StoreStats};

use crate::cli::OutputFormat;

pub struct OutputManager {
    colored: bool,
}

impl OutputManager {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    fn colorize<'a>(&self, text: &'a str, color: Color, bold: bool) -> Cow<'a, str> {
        if !self.colored {
            return Cow::Borrowed(text);
        }
        let styled = if bold {
            text.color(color).bold()
        } else {
            text.color(color)
        };
        Cow::Owned(styled.to_string())
    }

    /// Render a fetched response. With `body_file` set the body has already
    /// been written there and only the location is reported.
    pub fn render_response(
        &self,
        response: &GateResponse,
        format: OutputFormat,
        body_file: Option<&Path>,
    ) -> String {
        match format {
            OutputFormat::Pretty => self.render_response_pretty(response, body_file),
            OutputFormat::Json => self.render_response_json(response, body_file, true),
            OutputFormat::JsonCompact => self.render_response_json(response, body_file, false),
        }
    }

    fn render_response_pretty(&self, response: &GateResponse, body_file: Option<&Path>) -> String {
        let mut out = String::new();
        let status_color = if response.is_success() {
            Color::Green
        } else {
            Color::Red
        };
        out.push_str(&format!(
            "{} {}\n",
            self.colorize("Status: ", Color::Yellow, false),
            self.colorize(&response.status.to_string(), status_color, true),
        ));
        out.push_str(&format!(
            "{} {}\n",
            self.colorize("URL:    ", Color::Yellow, false),
            response.final_url,
        ));
        out.push_str(&format!(
            "{} {} ms, {}\n",
            self.colorize("Elapsed:", Color::Yellow, false),
            response.elapsed.as_millis(),
            format_bytes(response.body.len() as u64),
        ));
        match body_file {
            Some(path) => {
                out.push_str(&format!(
                    "{} Body written to {}\n",
                    self.colorize("✓", Color::Green, true),
                    path.display(),
                ));
            }
            None => {
                out.push('\n');
                out.push_str(&response.text());
            }
        }
        out
    }

    fn render_response_json(
        &self,
        response: &GateResponse,
        body_file: Option<&Path>,
        pretty: bool,
    ) -> String {
        let mut doc = serde_json::json!({
            "status": response.status.as_u16(),
            "final_url": response.final_url,
            "elapsed_ms": response.elapsed.as_millis() as u64,
        });
        match body_file {
            Some(path) => {
                doc["body_file"] = serde_json::Value::String(path.display().to_string());
            }
            None => {
                // Embed JSON bodies as JSON; anything else as a string.
                doc["body"] = serde_json::from_slice(&response.body)
                    .unwrap_or_else(|_| serde_json::Value::String(response.text()));
            }
        }
        render_json(&doc, pretty)
    }

    pub fn render_record(&self, record: &SessionRecord, format: OutputFormat) -> String {
        match format {
            OutputFormat::Pretty => format!(
                "{} Session for {} ready (profile {}, {} cookies, expires in {})",
                self.colorize("✓", Color::Green, true),
                self.colorize(&record.site, Color::Cyan, false),
                record.profile,
                cookie_count(&record.cookie_payload),
                human_secs(record.remaining_secs()),
            ),
            OutputFormat::Json => render_json(&serde_json::json!(record), true),
            OutputFormat::JsonCompact => render_json(&serde_json::json!(record), false),
        }
    }

    pub fn render_sessions(
        &self,
        records: &[SessionRecord],
        stats: &StoreStats,
        format: OutputFormat,
    ) -> String {
        match format {
            OutputFormat::Pretty => {
                if records.is_empty() {
                    return "No cached sessions.".to_string();
                }
                let mut out = String::new();
                out.push_str(&format!(
                    "{} ({}, {})\n",
                    self.colorize("Cached sessions", Color::Green, true),
                    plural(stats.entry_count, "entry", "entries"),
                    format_bytes(stats.total_bytes),
                ));
                for record in records {
                    let freshness = if record.is_expired() {
                        self.colorize("expired", Color::Red, false).into_owned()
                    } else {
                        format!("expires in {}", human_secs(record.remaining_secs()))
                    };
                    out.push_str(&format!(
                        "  {} captured {} ago, {}, {} cookies\n",
                        self.colorize(&format!("{:<24}", record.key()), Color::Cyan, false),
                        human_secs(record.age_secs()),
                        freshness,
                        cookie_count(&record.cookie_payload),
                    ));
                }
                out.trim_end().to_string()
            }
            OutputFormat::Json | OutputFormat::JsonCompact => {
                let doc = serde_json::json!({
                    "stats": stats,
                    "sessions": records,
                });
                render_json(&doc, format == OutputFormat::Json)
            }
        }
    }
}

fn render_json(doc: &serde_json::Value, pretty: bool) -> String {
    if pretty {
        serde_json::to_string_pretty(doc).unwrap_or_default()
    } else {
        doc.to_string()
    }
}

fn cookie_count(payload: &str) -> usize {
    payload.split("; ").filter(|part| !part.is_empty()).count()
}

pub fn human_secs(secs: i64) -> String {
    let secs = secs.max(0);
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn plural(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}
