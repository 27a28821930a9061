use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use tracing::field::{Field, Visit};
use tracing::Event;

/// A single value to be rendered into a record message.
///
/// The set is closed: text goes out verbatim, structured values as compact
/// JSON, everything else through its pre-rendered fallback text.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Text(String),
    Structured(Value),
    Other(String),
}

impl Arg {
    pub fn text(value: impl fmt::Display) -> Self {
        Arg::Text(value.to_string())
    }

    /// Serialize `value` to JSON. A value that cannot be represented as
    /// JSON becomes [`Arg::Other`] carrying the serializer's complaint.
    pub fn structured<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => Arg::Structured(v),
            Err(e) => Arg::Other(format!("[unserializable: {}]", e)),
        }
    }

    pub fn debug(value: &dyn fmt::Debug) -> Self {
        Arg::Other(format!("{:?}", value))
    }

    pub fn render(&self) -> String {
        match self {
            Arg::Text(s) | Arg::Other(s) => s.clone(),
            // A bare JSON string prints like a console would print it.
            Arg::Structured(Value::String(s)) => s.clone(),
            Arg::Structured(v) => v.to_string(),
        }
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Text(s.to_string())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Text(s)
    }
}

impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        Arg::Structured(v)
    }
}

/// Render all arguments and join them with single spaces.
pub fn render_args(args: &[Arg]) -> String {
    args.iter().map(Arg::render).collect::<Vec<_>>().join(" ")
}

/// Collects the fields of a `tracing` event as console-style arguments:
/// the `message` first, then every other field as one JSON object.
#[derive(Default)]
pub struct EventArgs {
    message: Option<String>,
    fields: Map<String, Value>,
}

impl EventArgs {
    pub fn from_event(event: &Event<'_>) -> Self {
        let mut args = EventArgs::default();
        event.record(&mut args);
        args
    }

    pub fn into_args(self) -> Vec<Arg> {
        let mut args = Vec::with_capacity(2);
        if let Some(message) = self.message {
            args.push(Arg::Text(message));
        }
        if !self.fields.is_empty() {
            args.push(Arg::Structured(Value::Object(self.fields)));
        }
        args
    }

    pub fn render(self) -> String {
        render_args(&self.into_args())
    }

    fn insert(&mut self, field: &Field, value: Value) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for EventArgs {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.insert(field, Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        // NaN and infinities have no JSON form and become `null`.
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.insert(field, Value::String(format!("{:?}", value)));
        }
    }
}
