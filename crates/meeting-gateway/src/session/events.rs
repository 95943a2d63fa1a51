use std::fmt;
use std::time::Duration;

use crate::directory::{DirectoryError, Resolution};
use crate::types::{AnswerOptions, GatewayCallRequest, InfoPayload, LegEvent, LegRole};

/// Timers a session can arm
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum TimerKind {
    /// Input timeout of the current IVR state
    Input,
    /// Maximum call duration
    CallLimit,
}

/// Everything that can drive a session forward
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The first leg is alerting and must be answered
    Alerting,
    /// Lifecycle event of one of the legs
    Leg { role: LegRole, event: LegEvent },
    /// A directory lookup requested with [`Action::Resolve`] finished
    LookupFinished {
        identifier: String,
        outcome: Result<Resolution, DirectoryError>,
    },
    /// A timer armed with [`Action::ArmTimer`] expired
    TimerFired { kind: TimerKind, generation: u64 },
}

impl SessionEvent {
    pub fn leg(role: LegRole, event: LegEvent) -> Self {
        SessionEvent::Leg { role, event }
    }
}

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// The caller never entered a meeting id
    NoInput,
    /// Maximum call duration reached
    TimeLimit,
    /// A leg hung up
    LegDisconnected(LegRole),
    /// A leg could not be established or broke
    LegFailed { role: LegRole, reason: String },
    /// No caller id is configured for dialling out
    NoOrigin,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::NoInput => write!(f, "no input"),
            TerminationReason::TimeLimit => write!(f, "time limit exceeded"),
            TerminationReason::LegDisconnected(role) => write!(f, "{} leg disconnected", role),
            TerminationReason::LegFailed { role, reason } => {
                write!(f, "{} leg failed: {}", role, reason)
            }
            TerminationReason::NoOrigin => write!(f, "no origin number configured"),
        }
    }
}

/// Side effects requested by a transition, executed in order by the runtime
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Answer { role: LegRole, options: AnswerOptions },
    /// Speak `text` on a leg, replacing whatever is playing
    Say { role: LegRole, text: String },
    StopPrompt { role: LegRole },
    /// Relay ring-back to a leg
    Ring { role: LegRole },
    SendInfo { role: LegRole, payload: InfoPayload },
    /// Connect the audio of the human and gateway legs
    BridgeMedia,
    /// Look up a meeting identifier in the directory
    Resolve { identifier: String },
    /// Place the internal leg towards the conference gateway
    PlaceGatewayCall(GatewayCallRequest),
    /// Place the PSTN leg of a dial-out
    PlacePstnCall { destination: String, origin: String },
    /// Arm a one-shot timer, replacing any armed timer of the same kind
    ArmTimer {
        kind: TimerKind,
        duration: Duration,
        generation: u64,
    },
    /// Hang up every leg and discard the session
    Terminate(TerminationReason),
}
