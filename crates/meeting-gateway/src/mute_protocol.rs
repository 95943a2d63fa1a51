//! In-band mute control messages
//!
//! Requests and responses travel as JSON application payloads over a leg's
//! signaling channel:
//!
//! ```text
//! {"type":"muteRequest","id":"<token>","data":{"audio":true}}
//! {"type":"muteResponse","id":"<token>","status":"OK","data":{"audio":true}}
//! ```
//!
//! Every request is answered with exactly one response carrying the same
//! correlation token. Messages with any other `type` decode to
//! [`ControlMessage::Unknown`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::InfoPayload;

/// Errors raised while decoding control messages
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Unsupported mime type: {0}")]
    UnsupportedMimeType(String),

    #[error("Malformed control message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Mute flag carried by both message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuteData {
    /// `true` means audio is (to be) muted
    pub audio: bool,
}

/// Outcome reported in a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MuteStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "FAILED")]
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlMessage {
    MuteRequest {
        id: String,
        data: MuteData,
    },
    MuteResponse {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<MuteStatus>,
        data: MuteData,
    },
    #[serde(other)]
    Unknown,
}

impl ControlMessage {
    /// Build a request with a fresh correlation token
    pub fn new_request(audio: bool) -> Self {
        ControlMessage::MuteRequest {
            id: uuid::Uuid::new_v4().to_string(),
            data: MuteData { audio },
        }
    }

    /// Build the accepting response for a request token
    pub fn accepted(id: impl Into<String>, audio: bool) -> Self {
        ControlMessage::MuteResponse {
            id: id.into(),
            status: Some(MuteStatus::Ok),
            data: MuteData { audio },
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            ControlMessage::MuteRequest { id, .. } | ControlMessage::MuteResponse { id, .. } => {
                Some(id)
            }
            ControlMessage::Unknown => None,
        }
    }

    /// Decode a received payload
    pub fn decode(payload: &InfoPayload) -> Result<Self, ProtocolError> {
        if !payload.is_json() {
            return Err(ProtocolError::UnsupportedMimeType(payload.mime_type.clone()));
        }
        Ok(serde_json::from_str(&payload.body)?)
    }

    /// Encode as an `application/json` payload
    pub fn to_payload(&self) -> InfoPayload {
        // Serializing these plain enums cannot fail
        let body = serde_json::to_string(self).unwrap_or_default();
        InfoPayload::json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_wire_format() {
        let message = ControlMessage::MuteRequest {
            id: "abc".to_string(),
            data: MuteData { audio: true },
        };
        let value: serde_json::Value = serde_json::from_str(&message.to_payload().body).unwrap();
        assert_eq!(value, json!({"type": "muteRequest", "id": "abc", "data": {"audio": true}}));
    }

    #[test]
    fn response_wire_format() {
        let message = ControlMessage::accepted("abc", false);
        let value: serde_json::Value = serde_json::from_str(&message.to_payload().body).unwrap();
        assert_eq!(
            value,
            json!({"type": "muteResponse", "id": "abc", "status": "OK", "data": {"audio": false}})
        );
    }

    #[test]
    fn decodes_failed_response() {
        let payload = InfoPayload::json(
            r#"{"type":"muteResponse","id":"x1","status":"FAILED","data":{"audio":true}}"#,
        );
        assert_eq!(
            ControlMessage::decode(&payload).unwrap(),
            ControlMessage::MuteResponse {
                id: "x1".to_string(),
                status: Some(MuteStatus::Failed),
                data: MuteData { audio: true },
            }
        );
    }

    #[test]
    fn unknown_type_is_not_an_error() {
        let payload = InfoPayload::json(r#"{"type":"raiseHand","id":"1","data":{}}"#);
        assert_eq!(ControlMessage::decode(&payload).unwrap(), ControlMessage::Unknown);
    }

    #[test]
    fn rejects_non_json_payloads() {
        let payload = InfoPayload {
            mime_type: "text/plain".to_string(),
            body: "hello".to_string(),
            headers: Default::default(),
        };
        assert!(matches!(
            ControlMessage::decode(&payload),
            Err(ProtocolError::UnsupportedMimeType(_))
        ));
    }

    #[test]
    fn rejects_request_without_data() {
        let payload = InfoPayload::json(r#"{"type":"muteRequest","id":"1"}"#);
        assert!(matches!(ControlMessage::decode(&payload), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn fresh_requests_get_distinct_tokens() {
        let a = ControlMessage::new_request(true);
        let b = ControlMessage::new_request(true);
        assert_ne!(a.id(), b.id());
    }
}
