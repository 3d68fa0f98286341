use super::*;
use std::fmt::Debug;

/// Trait for formatting capture events.
///
/// A `LogFormatter` defines how a [`CaptureEvent`] is converted into the
/// output type a logger publishes.
pub trait LogFormatter: Send + Sync + 'static {
    type Output: Send + Sync + 'static + Clone + Debug;

    fn format(&self, event: &CaptureEvent) -> Self::Output;
}

/// Formats events as structured Rust types (`CaptureEvent`).
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredFormatter;
/// Formats events as single-line JSON strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormatter;

impl LogFormatter for StructuredFormatter {
    type Output = CaptureEvent;

    fn format(&self, event: &CaptureEvent) -> Self::Output {
        event.clone()
    }
}

impl LogFormatter for JsonFormatter {
    type Output = String;

    fn format(&self, event: &CaptureEvent) -> Self::Output {
        serde_json::to_string(event).unwrap_or_else(|e| {
            serde_json::json!({
                "event": event.event,
                "serialize_error": e.to_string(),
            })
            .to_string()
        })
    }
}
