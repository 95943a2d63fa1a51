//! Core types shared by the session state machine and its runtime
//!
//! Identifiers, leg lifecycle events and the value types passed to the
//! telephony platform.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Session ID type
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(format!("session-{}", uuid::Uuid::new_v4()))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side of a session a leg represents
///
/// The human leg carries the interactive prompts (the dial-in caller, or the
/// PSTN party on a dial-out). The gateway leg is the conference mixer and the
/// peer of the mute protocol.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum LegRole {
    Human,
    Gateway,
}

impl fmt::Display for LegRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegRole::Human => write!(f, "human"),
            LegRole::Gateway => write!(f, "gateway"),
        }
    }
}

/// Who started the session
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum CallDirection {
    /// A caller dialled in and is routed into a conference
    Inbound,
    /// The gateway asked for a phone number to be dialled
    Outbound,
}

/// Lifecycle state of one telephony connection
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum LegState {
    Ringing,
    Connected,
    Failed,
    Disconnected,
}

impl LegState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LegState::Failed | LegState::Disconnected)
    }
}

/// Events delivered by the platform for a single leg, in order
#[derive(Debug, Clone, PartialEq)]
pub enum LegEvent {
    Ringing,
    Connected,
    /// Application message received on the signaling channel
    InfoReceived(InfoPayload),
    /// A prompt finished playing or was stopped; not sent for a prompt
    /// replaced by the next one
    PlaybackFinished,
    /// A DTMF key or recognised spoken digit
    Digit(char),
    /// Terminal: the leg could not be established or broke
    Failed(String),
    /// Terminal: the far end hung up
    Disconnected,
}

impl LegEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LegEvent::Failed(_) | LegEvent::Disconnected)
    }
}

/// Structured application payload carried over a leg's signaling channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoPayload {
    pub mime_type: String,
    pub body: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl InfoPayload {
    pub const JSON_MIME: &'static str = "application/json";

    pub fn json(body: impl Into<String>) -> Self {
        Self {
            mime_type: Self::JSON_MIME.to_string(),
            body: body.into(),
            headers: BTreeMap::new(),
        }
    }

    pub fn is_json(&self) -> bool {
        self.mime_type.eq_ignore_ascii_case(Self::JSON_MIME)
    }
}

/// Options used when answering an alerting leg
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnswerOptions {
    /// Ask the platform to mix all media streams into one
    pub mix_streams: bool,
    /// Request audio-level RTP header extension metadata
    pub audio_level_extension: bool,
}

/// Text-to-speech voice selection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Voice(pub String);

impl Voice {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Request to place the internal leg towards the conference gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCallRequest {
    /// Platform user the gateway is registered as
    pub username: String,
    pub caller_id: String,
    pub display_name: Option<String>,
    /// Routing headers understood by the gateway
    pub extra_headers: BTreeMap<String, String>,
    pub mix_streams: bool,
    pub audio_level_extension: bool,
}

/// Header naming the conference room to join
pub const HEADER_ROOM_NAME: &str = "X-Room-Name";
/// Header telling the gateway the room name is a full address
pub const HEADER_DOMAIN_BASE: &str = "X-Domain-Base";
/// Header bounding the gateway leg duration, in seconds
pub const HEADER_CALL_TIMEOUT: &str = "VI-CallTimeout";
/// Header carrying the conference password
pub const HEADER_ROOM_PASSWORD: &str = "Jitsi-Conference-Room-Pass";

impl GatewayCallRequest {
    pub fn password(&self) -> Option<&str> {
        self.extra_headers.get(HEADER_ROOM_PASSWORD).map(String::as_str)
    }

    pub fn room_name(&self) -> Option<&str> {
        self.extra_headers.get(HEADER_ROOM_NAME).map(String::as_str)
    }
}
