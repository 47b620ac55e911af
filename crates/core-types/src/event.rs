use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder used whenever a performance figure or trade field is absent.
pub const UNKNOWN: &str = "unknown";

/// An inbound webhook payload.
///
/// No schema is enforced: the event is kept as the raw JSON document so it can be
/// persisted verbatim, and every field the pipeline cares about is read through an
/// accessor that falls back to a default instead of failing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WebhookEvent(Value);

impl WebhookEvent {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Parses a request body. Any well-formed JSON document is accepted.
    pub fn from_slice(body: &[u8]) -> Result<Self, CoreError> {
        Ok(Self(serde_json::from_slice(body)?))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Returns the top-level field `key` rendered as text, or `default` when it is
    /// missing or null. Strings are returned as-is; any other JSON value is rendered
    /// as its JSON text.
    pub fn text_or(&self, key: &str, default: &str) -> String {
        render_or(self.0.get(key), default)
    }

    /// The `performance` object, or an empty object when absent or not an object.
    pub fn performance(&self) -> Value {
        match self.0.get("performance") {
            Some(Value::Object(map)) => Value::Object(map.clone()),
            _ => Value::Object(Map::new()),
        }
    }

    /// A single `performance.<field>` figure rendered as text, defaulting to [`UNKNOWN`].
    pub fn performance_field(&self, field: &str) -> String {
        render_or(
            self.0.get("performance").and_then(|p| p.get(field)),
            UNKNOWN,
        )
    }

    /// The `recent_trades` array; anything else yields an empty list.
    pub fn recent_trades(&self) -> Vec<Value> {
        match self.0.get("recent_trades") {
            Some(Value::Array(trades)) => trades.clone(),
            _ => Vec::new(),
        }
    }

    /// Pretty-printed JSON of the whole event.
    pub fn to_pretty_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(&self.0)?)
    }
}

impl From<Value> for WebhookEvent {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Renders an optional JSON value as text for prompt substitution.
pub fn render_or(value: Option<&Value>, default: &str) -> String {
    match value {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let event = WebhookEvent::new(json!({ "unrelated": true }));

        assert_eq!(event.text_or("trading_problem", "fallback"), "fallback");
        assert_eq!(event.performance_field("win_rate"), UNKNOWN);
        assert_eq!(event.performance(), json!({}));
        assert!(event.recent_trades().is_empty());
    }

    #[test]
    fn non_object_events_are_accepted() {
        let event = WebhookEvent::from_slice(b"[1, 2, 3]").unwrap();

        assert_eq!(event.text_or("trading_problem", "fallback"), "fallback");
        assert_eq!(event.as_value(), &json!([1, 2, 3]));
    }

    #[test]
    fn non_string_values_render_as_json_text() {
        let event = WebhookEvent::new(json!({
            "trading_problem": null,
            "performance": { "profit_factor": 1.35, "win_rate": "55%" },
            "recent_trades": [{ "direction": "long" }]
        }));

        assert_eq!(event.text_or("trading_problem", "fallback"), "fallback");
        assert_eq!(event.performance_field("profit_factor"), "1.35");
        assert_eq!(event.performance_field("win_rate"), "55%");
        assert_eq!(event.recent_trades().len(), 1);
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(WebhookEvent::from_slice(b"{not json").is_err());
    }
}
