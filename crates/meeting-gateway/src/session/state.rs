use crate::ivr::IvrMachine;
use crate::types::{CallDirection, LegRole, LegState, SessionId};

use super::events::TerminationReason;

/// Coarse progress of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Alerting leg answered, waiting for it to connect
    Answering,
    /// Collecting the meeting id
    MeetingId,
    /// Waiting for the directory
    Resolving,
    /// Collecting the password
    Password,
    /// An announcement is playing and a continuation is pending
    Announcing,
    /// Second leg placed, waiting for it to connect
    Dialing,
    /// Both legs connected, mute prompts active
    InCall,
    /// Final announcement playing before hangup
    Ending,
    Terminated,
}

/// What happens once an announcement finishes playing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AfterPlayback {
    ReturnToMeetingId,
    PlaceGatewayCall,
    PlacePstnCall,
    Terminate(TerminationReason),
}

/// Prompt playback on one leg
///
/// The platform reports the end of every prompt that finished or was stopped.
/// A prompt replaced by a new one is not reported. Reports for stopped prompts
/// can arrive after the next prompt started, so they are counted and skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Playback {
    pub playing: bool,
    /// Stopped prompts whose report is still outstanding
    pub stopped: u32,
}

impl Playback {
    pub fn started(&mut self) {
        self.playing = true;
    }

    /// Record a stop; returns whether a prompt was playing
    pub fn stop(&mut self) -> bool {
        if !self.playing {
            return false;
        }
        self.playing = false;
        self.stopped += 1;
        true
    }

    /// Record a playback report; returns whether it belongs to the current prompt
    pub fn finished(&mut self) -> bool {
        if self.stopped > 0 {
            self.stopped -= 1;
            return false;
        }
        std::mem::replace(&mut self.playing, false)
    }
}

/// Identity of the leg that started the session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegInfo {
    /// Number the leg is addressed to (the dial-out destination for gateway calls)
    pub number: String,
    pub caller_id: String,
    pub display_name: Option<String>,
}

/// Mutable state of one call pair, owned by a single session
#[derive(Debug)]
pub struct SessionState {
    pub id: SessionId,
    pub direction: CallDirection,
    pub phase: Phase,

    /// Identifier confirmed by the directory
    pub conference_id: Option<String>,
    /// Address the identifier resolved to
    pub conference_address: Option<String>,
    /// `None` until the password step completed; may be empty
    pub password: Option<String>,
    /// Consecutive meeting-id timeouts
    pub no_input_retries: u32,

    pub muted: bool,
    pub mute_loop_active: bool,
    /// Token of the last mute request sent to the gateway
    pub pending_toggle: Option<String>,

    pub human: Option<LegState>,
    pub gateway: Option<LegState>,

    pub ivr: IvrMachine,
    pub human_playback: Playback,
    pub gateway_playback: Playback,
    pub after_human_playback: Option<AfterPlayback>,
    pub after_gateway_playback: Option<AfterPlayback>,
    pub call_limit_generation: u64,
}

impl SessionState {
    pub fn new(direction: CallDirection) -> Self {
        Self {
            id: SessionId::new(),
            direction,
            phase: Phase::Answering,
            conference_id: None,
            conference_address: None,
            password: None,
            no_input_retries: 0,
            muted: false,
            mute_loop_active: false,
            pending_toggle: None,
            human: None,
            gateway: None,
            ivr: IvrMachine::new(),
            human_playback: Playback::default(),
            gateway_playback: Playback::default(),
            after_human_playback: None,
            after_gateway_playback: None,
            call_limit_generation: 0,
        }
    }

    pub fn leg_state(&self, role: LegRole) -> Option<LegState> {
        match role {
            LegRole::Human => self.human,
            LegRole::Gateway => self.gateway,
        }
    }

    pub fn set_leg_state(&mut self, role: LegRole, state: LegState) {
        match role {
            LegRole::Human => self.human = Some(state),
            LegRole::Gateway => self.gateway = Some(state),
        }
    }

    pub fn is_connected(&self, role: LegRole) -> bool {
        self.leg_state(role) == Some(LegState::Connected)
    }

    pub fn playback(&self, role: LegRole) -> Playback {
        match role {
            LegRole::Human => self.human_playback,
            LegRole::Gateway => self.gateway_playback,
        }
    }

    pub fn playback_mut(&mut self, role: LegRole) -> &mut Playback {
        match role {
            LegRole::Human => &mut self.human_playback,
            LegRole::Gateway => &mut self.gateway_playback,
        }
    }

    pub fn after_playback_mut(&mut self, role: LegRole) -> &mut Option<AfterPlayback> {
        match role {
            LegRole::Human => &mut self.after_human_playback,
            LegRole::Gateway => &mut self.after_gateway_playback,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.phase == Phase::Terminated
    }
}
