//! Host/view message protocol
//!
//! Messages are JSON objects tagged by a `command` field. Each direction has
//! its own closed set of variants; delivery is fire-and-forget.

use serde::{Deserialize, Serialize};

/// Errors encoding or decoding protocol messages
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProtocolError {
    #[error("Failed to encode message: {0}")]
    Encode(String),

    #[error("Failed to decode message: {0}")]
    Decode(String),
}

/// Display settings as transmitted: every value is a string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorsPayload {
    pub camera_radius: String,
    pub background_color: String,
    pub grid_line_color: String,
    pub grid_main_color: String,
    pub grid_minor_opacity: String,
    pub major_unit_frequency: String,
    pub grid_ratio: String,
    #[serde(rename = "debugUI")]
    pub debug_ui: String,
}

/// Host to view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum HostMessage {
    PreviewFile {
        #[serde(rename = "previewFile")]
        preview_file: String,
    },
    Urdf { urdf: String },
    Colors(ColorsPayload),
}

/// View to host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum ViewMessage {
    Ready,
    Info { text: String },
    Error { text: String },
    Trace { text: String },
}

impl ViewMessage {
    pub fn trace(text: impl Into<String>) -> Self {
        Self::Trace { text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::Error { text: text.into() }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::Info { text: text.into() }
    }
}

/// State a view persists so it can be rebound after a host restart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub preview_file: String,
}

/// Sending half of one direction of the channel
///
/// Posting never blocks and never reports delivery; a closed channel drops
/// the message.
pub trait MessageSink<M>: Send + Sync {
    fn post(&self, message: M);
}

impl<M: Send + std::fmt::Debug> MessageSink<M> for tokio::sync::mpsc::UnboundedSender<M> {
    fn post(&self, message: M) {
        if let Err(e) = self.send(message) {
            tracing::debug!("Dropping message on closed channel: {:?}", e.0);
        }
    }
}

impl<M: Send + std::fmt::Debug> MessageSink<M> for std::sync::mpsc::Sender<M> {
    fn post(&self, message: M) {
        if let Err(e) = self.send(message) {
            tracing::debug!("Dropping message on closed channel: {:?}", e.0);
        }
    }
}

macro_rules! json_codec {
    ($ty:ty) => {
        impl $ty {
            pub fn to_json(&self) -> Result<String, ProtocolError> {
                serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
            }

            pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
                serde_json::from_str(text).map_err(|e| ProtocolError::Decode(e.to_string()))
            }
        }
    };
}

json_codec!(HostMessage);
json_codec!(ViewMessage);
json_codec!(ViewState);
