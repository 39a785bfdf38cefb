//! Inbound trading signal payloads

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Trading instruction carried by a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalAction {
    Buy,
    Sell,
    Close,
}

impl SignalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalAction::Buy => "BUY",
            SignalAction::Sell => "SELL",
            SignalAction::Close => "CLOSE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Some(SignalAction::Buy),
            "SELL" => Some(SignalAction::Sell),
            "CLOSE" => Some(SignalAction::Close),
            _ => None,
        }
    }
}

impl std::fmt::Display for SignalAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A validated signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub action: SignalAction,
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Sender-supplied timestamp, or receipt time in epoch seconds
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// Parse and validate a raw signal payload.
///
/// Returns `None` for anything that is not a usable signal.
pub fn parse_signal(raw: &str) -> Option<Signal> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "Signal payload is not valid JSON");
            return None;
        }
    };

    let Some(object) = value.as_object() else {
        warn!("Signal payload is not a JSON object");
        return None;
    };

    let action = object
        .get("action")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    let symbol = object
        .get("symbol")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();

    if action.is_empty() || symbol.is_empty() {
        warn!("Signal payload is missing action or symbol");
        return None;
    }

    let Some(action) = SignalAction::from_str(action) else {
        warn!(action = %action, "Signal payload has an unknown action");
        return None;
    };

    let price = match object.get("price") {
        None | Some(Value::Null) => None,
        Some(raw_price) => match number_field(raw_price) {
            Some(p) if p.is_finite() => Some(p),
            _ => {
                warn!(price = %raw_price, "Signal payload has an invalid price");
                return None;
            }
        },
    };

    let timestamp = match object.get("timestamp") {
        None | Some(Value::Null) => Utc::now().timestamp(),
        Some(raw_ts) => match number_field(raw_ts) {
            Some(ts) if ts.is_finite() => ts as i64,
            _ => {
                warn!(timestamp = %raw_ts, "Signal payload has an invalid timestamp");
                return None;
            }
        },
    };

    let signature = object
        .get("signature")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Some(Signal {
        action,
        symbol: symbol.to_string(),
        price,
        timestamp,
        signature,
    })
}

/// Alerting tools often send numbers as strings
fn number_field(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
