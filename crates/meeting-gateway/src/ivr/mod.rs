//! Interactive input states
//!
//! An IVR state is immutable configuration: a prompt, an input policy, a
//! timeout and what to do when the timeout expires. [`IvrCatalog`] builds the
//! four states the gateway uses from [`GatewayConfig`]; [`IvrMachine`] tracks
//! which one is current on the human leg and collects keys for it.

mod machine;

pub use machine::{DigitOutcome, IvrMachine};

use std::time::Duration;

use crate::config::{GatewayConfig, MUTE_INPUT_LENGTH};

/// Named interactive states
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum IvrStateId {
    /// Collect the meeting identifier
    MeetingId,
    /// Collect the (possibly empty) conference password
    Password,
    /// In call, audio muted
    Muted,
    /// In call, audio flowing
    Unmuted,
}

impl IvrStateId {
    pub fn name(&self) -> &'static str {
        match self {
            IvrStateId::MeetingId => "conferencenumber",
            IvrStateId::Password => "confgetpassword",
            IvrStateId::Muted => "muteToggle",
            IvrStateId::Unmuted => "unMuteToggle",
        }
    }

    /// The in-call state matching a mute flag
    pub fn for_mute(muted: bool) -> Self {
        if muted {
            IvrStateId::Muted
        } else {
            IvrStateId::Unmuted
        }
    }
}

/// How keys are collected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPolicy {
    /// Any number of keys ended by `terminator`, which is not part of the input
    Terminated { terminator: char },
    /// Exactly `length` keys
    Fixed { length: usize },
}

/// What an input timeout leads to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// Re-enter the state indefinitely
    Reprompt,
    /// Re-enter until `max_retries` timeouts have been exceeded, then give up
    Bounded { max_retries: u32 },
}

/// Decision taken after a timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutDecision {
    Reenter,
    GiveUp,
}

impl TimeoutPolicy {
    /// `retries` is the number of timeouts counted so far, including this one
    pub fn decide(&self, retries: u32) -> TimeoutDecision {
        match self {
            TimeoutPolicy::Reprompt => TimeoutDecision::Reenter,
            TimeoutPolicy::Bounded { max_retries } if retries > *max_retries => {
                TimeoutDecision::GiveUp
            }
            TimeoutPolicy::Bounded { .. } => TimeoutDecision::Reenter,
        }
    }
}

/// Static definition of one state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IvrStateSpec {
    pub id: IvrStateId,
    pub prompt: String,
    pub input: InputPolicy,
    pub timeout: Duration,
    pub on_timeout: TimeoutPolicy,
}

/// The states available to a session
#[derive(Debug, Clone)]
pub struct IvrCatalog {
    meeting_id: IvrStateSpec,
    password: IvrStateSpec,
    muted: IvrStateSpec,
    unmuted: IvrStateSpec,
}

impl IvrCatalog {
    pub fn from_config(config: &GatewayConfig) -> Self {
        let terminated = InputPolicy::Terminated {
            terminator: config.input_terminator,
        };
        let in_call = InputPolicy::Fixed {
            length: MUTE_INPUT_LENGTH,
        };
        Self {
            meeting_id: IvrStateSpec {
                id: IvrStateId::MeetingId,
                prompt: config.prompts.meeting_id.clone(),
                input: terminated,
                timeout: config.input_timeout(),
                on_timeout: TimeoutPolicy::Bounded {
                    max_retries: config.max_no_input_prompts,
                },
            },
            password: IvrStateSpec {
                id: IvrStateId::Password,
                prompt: config.prompts.password.clone(),
                input: terminated,
                timeout: config.input_timeout(),
                on_timeout: TimeoutPolicy::Reprompt,
            },
            muted: IvrStateSpec {
                id: IvrStateId::Muted,
                prompt: config.prompts.muted.clone(),
                input: in_call,
                timeout: config.reprompt_interval(),
                on_timeout: TimeoutPolicy::Reprompt,
            },
            unmuted: IvrStateSpec {
                id: IvrStateId::Unmuted,
                prompt: config.prompts.unmuted.clone(),
                input: in_call,
                timeout: config.reprompt_interval(),
                on_timeout: TimeoutPolicy::Reprompt,
            },
        }
    }

    pub fn get(&self, id: IvrStateId) -> &IvrStateSpec {
        match id {
            IvrStateId::MeetingId => &self.meeting_id,
            IvrStateId::Password => &self.password,
            IvrStateId::Muted => &self.muted,
            IvrStateId::Unmuted => &self.unmuted,
        }
    }
}
