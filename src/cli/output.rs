use clap::ValueEnum;
use linkpilot_core_types::ProgressEvent;
use serde_json::{json, Value};

#[derive(Clone, Debug, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// One stdout line (or block) for a progress event.
pub fn render_event(event: &ProgressEvent, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Json => json!({
            "event": event.kind().as_str(),
            "data": event.payload(),
        })
        .to_string(),
        OutputFormat::Human => match event {
            ProgressEvent::Status(text) => format!("... {text}"),
            ProgressEvent::Error(text) => format!("error: {text}"),
            ProgressEvent::Result(payload) => render_result(payload),
        },
    }
}

pub fn print_event(event: &ProgressEvent, format: &OutputFormat) {
    println!("{}", render_event(event, format));
}

fn render_result(payload: &Value) -> String {
    let headline = payload
        .get("message")
        .filter(|_| payload.get("status").is_none())
        .or_else(|| payload.get("status"))
        .and_then(Value::as_str)
        .unwrap_or("Done");
    let mut out = format!("ok: {headline}");
    if let Some(note) = payload.get("personalized_note").and_then(Value::as_str) {
        out.push_str(&format!("\n    note: {note}"));
    }
    if let Some(command) = payload.get("command") {
        out.push_str(&format!("\n    command: {command}"));
    }
    out
}
