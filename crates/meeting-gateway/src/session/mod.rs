//! Call orchestration state machine
//!
//! A [`Session`] covers one call pair from the first alerting leg until
//! termination. It never performs I/O: [`Session::handle`] takes one
//! [`SessionEvent`], updates the session state and returns the [`Action`]s the
//! runtime must execute, in order.
//!
//! ```text
//! inbound:  Answering -> MeetingId -> Resolving -> Password -> Announcing
//!                ^            |  ^         |                      |
//!                |            |  +---------+ (unknown / error)    v
//!                |            v                                Dialing -> InCall -> Ending
//!                |        (no input) --------------------------------------------> Terminated
//!
//! outbound: Answering -> Announcing -> Dialing -> InCall -> Ending -> Terminated
//! ```
//!
//! Direction specific transitions live in `inbound` and `outbound`, the mute
//! negotiation in `mute` and the duration limit in `timer`.

mod events;
mod inbound;
mod mute;
mod outbound;
mod state;
mod timer;

pub use events::{Action, SessionEvent, TerminationReason, TimerKind};
pub use state::{AfterPlayback, LegInfo, Phase, Playback, SessionState};

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::ivr::{DigitOutcome, IvrCatalog, IvrStateId, TimeoutDecision, TimeoutPolicy};
use crate::types::{CallDirection, LegEvent, LegRole, LegState, SessionId};

/// One call pair and its orchestration state
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    config: Arc<GatewayConfig>,
    catalog: IvrCatalog,
    /// Identity of the alerting leg
    origin: LegInfo,
}

impl Session {
    pub fn new(direction: CallDirection, config: Arc<GatewayConfig>, origin: LegInfo) -> Self {
        let catalog = IvrCatalog::from_config(&config);
        Self {
            state: SessionState::new(direction),
            config,
            catalog,
            origin,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.state.id
    }

    pub fn direction(&self) -> CallDirection {
        self.state.direction
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state.is_terminated()
    }

    /// Apply one event and return the resulting actions
    pub fn handle(&mut self, event: SessionEvent) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.state.is_terminated() {
            debug!(session = %self.state.id, ?event, "Ignoring event for terminated session");
            return actions;
        }

        match event {
            SessionEvent::Alerting => self.on_alerting(&mut actions),
            SessionEvent::Leg { role, event } => self.on_leg_event(role, event, &mut actions),
            SessionEvent::LookupFinished {
                identifier,
                outcome,
            } => self.on_lookup_finished(identifier, outcome, &mut actions),
            SessionEvent::TimerFired { kind, generation } => match kind {
                TimerKind::Input => self.on_input_timeout(generation, &mut actions),
                TimerKind::CallLimit => self.on_call_limit(generation, &mut actions),
            },
        }
        actions
    }

    fn on_alerting(&mut self, actions: &mut Vec<Action>) {
        if self.state.phase != Phase::Answering
            || self.state.human.is_some()
            || self.state.gateway.is_some()
        {
            warn!(session = %self.state.id, "Duplicate alerting event");
            return;
        }
        match self.state.direction {
            CallDirection::Inbound => self.inbound_alerting(actions),
            CallDirection::Outbound => self.outbound_alerting(actions),
        }
    }

    fn on_leg_event(&mut self, role: LegRole, event: LegEvent, actions: &mut Vec<Action>) {
        match event {
            LegEvent::Failed(reason) => {
                self.state.set_leg_state(role, LegState::Failed);
                warn!(session = %self.state.id, %role, %reason, "Leg failed");
                self.terminate(TerminationReason::LegFailed { role, reason }, actions);
            }
            LegEvent::Disconnected => {
                self.state.set_leg_state(role, LegState::Disconnected);
                info!(session = %self.state.id, %role, "Leg disconnected");
                self.terminate(TerminationReason::LegDisconnected(role), actions);
            }
            LegEvent::Ringing => {
                if self.state.leg_state(role).is_none() {
                    self.state.set_leg_state(role, LegState::Ringing);
                }
                if self.state.direction == CallDirection::Outbound && role == LegRole::Human {
                    actions.push(Action::Ring { role: LegRole::Gateway });
                }
            }
            LegEvent::Connected => {
                if self.state.is_connected(role) {
                    debug!(session = %self.state.id, %role, "Leg already connected");
                    return;
                }
                self.state.set_leg_state(role, LegState::Connected);
                match self.state.direction {
                    CallDirection::Inbound => self.inbound_connected(role, actions),
                    CallDirection::Outbound => self.outbound_connected(role, actions),
                }
            }
            LegEvent::InfoReceived(payload) => match role {
                LegRole::Gateway => {
                    if !self.on_gateway_info(&payload, actions) {
                        self.unclaimed_gateway_info(payload, actions);
                    }
                }
                LegRole::Human => self.human_info(payload, actions),
            },
            LegEvent::PlaybackFinished => self.on_playback_finished(role, actions),
            LegEvent::Digit(digit) => {
                if role == LegRole::Human {
                    self.on_digit(digit, actions);
                } else {
                    debug!(session = %self.state.id, %digit, "Ignoring key pressed on gateway leg");
                }
            }
        }
    }

    fn on_playback_finished(&mut self, role: LegRole, actions: &mut Vec<Action>) {
        if self.state.playback_mut(role).finished() {
            if let Some(next) = self.state.after_playback_mut(role).take() {
                self.continue_after_playback(next, actions);
                return;
            }
        } else {
            debug!(session = %self.state.id, %role, "Playback report for a stopped prompt");
        }
        if role == LegRole::Human && !self.state.playback(role).playing {
            self.state.ivr.prompt_finished();
            // In-call prompts interrupt the bridge; restore it once they end
            if self.state.mute_loop_active {
                actions.push(Action::BridgeMedia);
            }
        }
    }

    fn continue_after_playback(&mut self, next: AfterPlayback, actions: &mut Vec<Action>) {
        match next {
            AfterPlayback::ReturnToMeetingId => self.return_to_meeting_id(actions),
            AfterPlayback::PlaceGatewayCall => self.place_gateway_call(actions),
            AfterPlayback::PlacePstnCall => self.place_pstn_call(actions),
            AfterPlayback::Terminate(reason) => self.terminate(reason, actions),
        }
    }

    fn on_digit(&mut self, digit: char, actions: &mut Vec<Action>) {
        match self.state.ivr.on_digit(digit) {
            DigitOutcome::Ignored => {
                debug!(
                    session = %self.state.id,
                    %digit,
                    "Key pressed while no prompt is listening"
                );
            }
            DigitOutcome::Pending {
                generation,
                stop_prompt,
            } => {
                if stop_prompt {
                    self.stop_prompt(LegRole::Human, actions);
                }
                if let Some(id) = self.state.ivr.current() {
                    actions.push(Action::ArmTimer {
                        kind: TimerKind::Input,
                        duration: self.catalog.get(id).timeout,
                        generation,
                    });
                }
            }
            DigitOutcome::Complete {
                state,
                input,
                stop_prompt,
            } => {
                if stop_prompt {
                    self.stop_prompt(LegRole::Human, actions);
                }
                debug!(session = %self.state.id, state = state.name(), "IVR input complete");
                match state {
                    IvrStateId::MeetingId => self.meeting_id_entered(input, actions),
                    IvrStateId::Password => self.password_entered(input, actions),
                    IvrStateId::Muted | IvrStateId::Unmuted => {
                        self.toggle_input(state, input, actions)
                    }
                }
            }
        }
    }

    fn on_input_timeout(&mut self, generation: u64, actions: &mut Vec<Action>) {
        let Some(id) = self.state.ivr.on_timeout(generation) else {
            return;
        };
        let policy = self.catalog.get(id).on_timeout;
        let decision = match policy {
            TimeoutPolicy::Reprompt => policy.decide(0),
            TimeoutPolicy::Bounded { .. } => {
                self.state.no_input_retries += 1;
                policy.decide(self.state.no_input_retries)
            }
        };
        debug!(
            session = %self.state.id,
            state = id.name(),
            retries = self.state.no_input_retries,
            "IVR input timeout"
        );
        match decision {
            TimeoutDecision::Reenter => self.enter_ivr(id, actions),
            TimeoutDecision::GiveUp => {
                info!(session = %self.state.id, "No input received, ending call");
                self.state.phase = Phase::Ending;
                let text = self.config.prompts.no_input.clone();
                let then = AfterPlayback::Terminate(TerminationReason::NoInput);
                self.announce(LegRole::Human, text, then, actions);
            }
        }
    }

    /// Make `id` the current IVR state: prompt once and arm its timeout
    fn enter_ivr(&mut self, id: IvrStateId, actions: &mut Vec<Action>) {
        let spec = self.catalog.get(id);
        let generation = self.state.ivr.enter(spec);
        let (prompt, timeout) = (spec.prompt.clone(), spec.timeout);
        debug!(session = %self.state.id, state = id.name(), "Entering IVR state");
        self.say(LegRole::Human, prompt, actions);
        actions.push(Action::ArmTimer {
            kind: TimerKind::Input,
            duration: timeout,
            generation,
        });
    }

    /// Keep the current IVR state listening without replaying its prompt
    fn resume_ivr(&mut self, id: IvrStateId, actions: &mut Vec<Action>) {
        let spec = self.catalog.get(id);
        let generation = self.state.ivr.listen(spec);
        actions.push(Action::ArmTimer {
            kind: TimerKind::Input,
            duration: spec.timeout,
            generation,
        });
    }

    /// Play a message and run `then` once it finished
    fn announce(
        &mut self,
        role: LegRole,
        text: String,
        then: AfterPlayback,
        actions: &mut Vec<Action>,
    ) {
        if role == LegRole::Human {
            self.state.ivr.leave();
        }
        *self.state.after_playback_mut(role) = Some(then);
        self.say(role, text, actions);
    }

    fn say(&mut self, role: LegRole, text: String, actions: &mut Vec<Action>) {
        self.state.playback_mut(role).started();
        actions.push(Action::Say { role, text });
    }

    fn stop_prompt(&mut self, role: LegRole, actions: &mut Vec<Action>) {
        self.state.playback_mut(role).stop();
        actions.push(Action::StopPrompt { role });
    }

    fn terminate(&mut self, reason: TerminationReason, actions: &mut Vec<Action>) {
        info!(session = %self.state.id, %reason, "Terminating session");
        self.state.phase = Phase::Terminated;
        self.state.mute_loop_active = false;
        self.state.ivr.leave();
        actions.push(Action::Terminate(reason));
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn events_after_termination_are_ignored() {
        let mut session = in_call(config());
        let actions = session.handle(SessionEvent::leg(LegRole::Gateway, LegEvent::Disconnected));
        assert_eq!(
            actions,
            vec![Action::Terminate(TerminationReason::LegDisconnected(LegRole::Gateway))]
        );
        assert!(session.is_terminated());

        assert!(session
            .handle(SessionEvent::leg(LegRole::Human, LegEvent::Digit('*')))
            .is_empty());
        assert!(session
            .handle(SessionEvent::TimerFired {
                kind: TimerKind::CallLimit,
                generation: 1,
            })
            .is_empty());
    }

    #[test]
    fn human_failure_ends_the_session() {
        let mut session = Session::new(CallDirection::Inbound, config(), caller());
        session.handle(SessionEvent::Alerting);
        let failed = LegEvent::Failed("486".to_string());
        let actions = session.handle(SessionEvent::leg(LegRole::Human, failed));
        assert_eq!(
            actions,
            vec![Action::Terminate(TerminationReason::LegFailed {
                role: LegRole::Human,
                reason: "486".to_string(),
            })]
        );
    }

    #[test]
    fn in_call_prompt_end_restores_bridge() {
        let mut session = in_call(config());
        let actions = session.handle(SessionEvent::leg(LegRole::Human, LegEvent::PlaybackFinished));
        assert_eq!(actions, vec![Action::BridgeMedia]);
    }

    #[test]
    fn stopped_in_call_prompt_restores_bridge() {
        let mut session = in_call(config());
        let actions = session.handle(SessionEvent::leg(LegRole::Human, LegEvent::Digit('*')));
        assert_eq!(actions[0], Action::StopPrompt { role: LegRole::Human });
        assert_eq!(session.state().human_playback.stopped, 1);

        let actions = session.handle(SessionEvent::leg(LegRole::Human, LegEvent::PlaybackFinished));
        assert_eq!(actions, vec![Action::BridgeMedia]);
        assert_eq!(session.state().human_playback, Playback::default());
    }

    #[test]
    fn first_key_stops_the_prompt() {
        let mut session = Session::new(CallDirection::Inbound, config(), caller());
        session.handle(SessionEvent::Alerting);
        session.handle(SessionEvent::leg(LegRole::Human, LegEvent::Connected));
        let actions = keys(&mut session, "12");
        assert_eq!(actions.first(), Some(&Action::StopPrompt { role: LegRole::Human }));
        assert_eq!(
            actions
                .iter()
                .filter(|a| matches!(a, Action::StopPrompt { .. }))
                .count(),
            1
        );
    }
}
