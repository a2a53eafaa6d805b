//! Response/event envelope shapes shared by the session endpoint and the
//! daemon control plane. Both listeners speak the same frame shapes even
//! though the command sets they dispatch differ (§6).

use serde::Serialize;
use serde_json::Value;

/// `{ type: "response", command, success, data?, error?, id? }`
#[derive(Debug, Clone, Serialize)]
pub struct ResponseFrame {
    #[serde(rename = "type")]
    pub frame_type: &'static str,
    pub command: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ResponseFrame {
    pub fn ok(command: impl Into<String>, data: Option<Value>, id: Option<String>) -> Self {
        Self {
            frame_type: "response",
            command: command.into(),
            success: true,
            data,
            error: None,
            id,
        }
    }

    pub fn err(command: impl Into<String>, error: impl Into<String>, id: Option<String>) -> Self {
        Self {
            frame_type: "response",
            command: command.into(),
            success: false,
            data: None,
            error: Some(error.into()),
            id,
        }
    }

    pub fn to_line(&self) -> String {
        serde_json::to_string(self).expect("ResponseFrame always serializes")
    }
}

/// `{ type: "event", event, data?, subscriptionId? }`
#[derive(Debug, Clone, Serialize)]
pub struct EventFrame {
    #[serde(rename = "type")]
    pub frame_type: &'static str,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(rename = "subscriptionId", skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
}

impl EventFrame {
    pub fn new(event: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            frame_type: "event",
            event: event.into(),
            data,
            subscription_id: None,
        }
    }

    pub fn with_subscription(mut self, subscription_id: impl Into<String>) -> Self {
        self.subscription_id = Some(subscription_id.into());
        self
    }

    pub fn to_line(&self) -> String {
        serde_json::to_string(self).expect("EventFrame always serializes")
    }
}

/// The bare `{ type: "error", error }` frame written once before closing a
/// connection that sent an oversized line — it carries no `command`/`success`
/// because framing failed before a command could even be parsed.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorFrame {
    #[serde(rename = "type")]
    pub frame_type: &'static str,
    pub error: String,
}

impl ErrorFrame {
    pub fn size_exceeded() -> Self {
        Self {
            frame_type: "error",
            error: format!(
                "Message size exceeds {} bytes",
                super::framing::MAX_FRAME_BYTES
            ),
        }
    }

    pub fn to_line(&self) -> String {
        serde_json::to_string(self).expect("ErrorFrame always serializes")
    }
}

#[cfg(test)]
#[path = "tests/envelope_tests.rs"]
mod envelope_tests;
