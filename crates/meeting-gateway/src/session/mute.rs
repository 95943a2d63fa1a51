//! Mute negotiation with the gateway leg
//!
//! The gateway asks for a mute state with `muteRequest`; the session always
//! accepts and adopts the flag. A caller pressing the toggle sequence sends a
//! `muteRequest` of its own and only flips the local state once the matching
//! `muteResponse` reports `OK`.

use tracing::{debug, info, warn};

use super::{Action, Session};
use crate::ivr::IvrStateId;
use crate::mute_protocol::{ControlMessage, MuteData, MuteStatus, ProtocolError};
use crate::types::{InfoPayload, LegRole};

impl Session {
    /// Handle an application message from the gateway leg.
    ///
    /// Returns `false` when the message is not a mute control message and
    /// should be treated as ordinary traffic.
    pub(super) fn on_gateway_info(
        &mut self,
        payload: &InfoPayload,
        actions: &mut Vec<Action>,
    ) -> bool {
        let message = match ControlMessage::decode(payload) {
            Ok(message) => message,
            Err(ProtocolError::UnsupportedMimeType(mime_type)) => {
                debug!(session = %self.state.id, %mime_type, "Not a control message");
                return false;
            }
            Err(e) => {
                warn!(
                    session = %self.state.id,
                    error = %e,
                    body = %payload.body,
                    "Undecodable control message"
                );
                return false;
            }
        };

        match message {
            ControlMessage::MuteRequest { id, data } => {
                self.on_mute_request(id, data, actions);
                true
            }
            ControlMessage::MuteResponse { id, status, data } => {
                self.on_mute_response(id, status, data, actions);
                true
            }
            ControlMessage::Unknown => {
                debug!(
                    session = %self.state.id,
                    body = %payload.body,
                    "Unknown control message type"
                );
                false
            }
        }
    }

    fn on_mute_request(&mut self, id: String, data: MuteData, actions: &mut Vec<Action>) {
        actions.push(Action::SendInfo {
            role: LegRole::Gateway,
            payload: ControlMessage::accepted(id.clone(), data.audio).to_payload(),
        });

        if self.state.is_connected(LegRole::Human) {
            info!(
                session = %self.state.id,
                token = %id,
                muted = data.audio,
                "Mute state set by gateway"
            );
            self.state.muted = data.audio;
            if self.state.mute_loop_active {
                self.enter_ivr(IvrStateId::for_mute(self.state.muted), actions);
            }
        } else {
            info!(
                session = %self.state.id,
                token = %id,
                "Mute request before destination answered, starting muted"
            );
            self.state.muted = true;
        }
    }

    fn on_mute_response(
        &mut self,
        id: String,
        status: Option<MuteStatus>,
        data: MuteData,
        actions: &mut Vec<Action>,
    ) {
        if status != Some(MuteStatus::Ok) {
            warn!(
                session = %self.state.id,
                token = %id,
                ?status,
                "Mute toggle rejected by gateway"
            );
            return;
        }

        if self.state.pending_toggle.as_deref() == Some(id.as_str()) {
            self.state.pending_toggle = None;
        } else {
            warn!(
                session = %self.state.id,
                token = %id,
                pending = ?self.state.pending_toggle,
                "Mute response does not match the last request"
            );
        }

        // The response confirms the toggle requested earlier
        self.state.muted = !self.state.muted;
        info!(
            session = %self.state.id,
            token = %id,
            muted = self.state.muted,
            requested = data.audio,
            "Mute toggled"
        );
        if self.state.mute_loop_active {
            self.enter_ivr(IvrStateId::for_mute(self.state.muted), actions);
        }
    }

    /// Keys collected by one of the in-call states
    pub(super) fn toggle_input(
        &mut self,
        state: IvrStateId,
        input: String,
        actions: &mut Vec<Action>,
    ) {
        if input == self.config.mute_toggle_sequence {
            let desired = state == IvrStateId::Unmuted;
            let request = ControlMessage::new_request(desired);
            debug!(
                session = %self.state.id,
                token = ?request.id(),
                desired,
                "Requesting mute toggle"
            );
            self.state.pending_toggle = request.id().map(str::to_string);
            actions.push(Action::SendInfo {
                role: LegRole::Gateway,
                payload: request.to_payload(),
            });
        } else {
            debug!(session = %self.state.id, %input, "Ignoring in-call keys");
        }
        self.resume_ivr(state, actions);
    }

    /// Bridge both legs and start the in-call mute prompts
    pub(super) fn activate_mute_loop(&mut self, actions: &mut Vec<Action>) {
        if self.state.mute_loop_active {
            return;
        }
        self.state.mute_loop_active = true;
        actions.push(Action::BridgeMedia);
        self.enter_ivr(IvrStateId::for_mute(self.state.muted), actions);
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::{SessionEvent, TimerKind};
    use super::*;
    use crate::config::GatewayConfig;
    use crate::session::LegInfo;
    use crate::types::{CallDirection, LegEvent};
    use pretty_assertions::assert_eq;

    fn sent_to_gateway(actions: &[Action]) -> Vec<ControlMessage> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::SendInfo {
                    role: LegRole::Gateway,
                    payload,
                } => ControlMessage::decode(payload).ok(),
                _ => None,
            })
            .collect()
    }

    fn request(id: &str, audio: bool) -> SessionEvent {
        let payload = ControlMessage::MuteRequest {
            id: id.to_string(),
            data: MuteData { audio },
        }
        .to_payload();
        SessionEvent::leg(LegRole::Gateway, LegEvent::InfoReceived(payload))
    }

    fn response(id: &str, status: MuteStatus, audio: bool) -> SessionEvent {
        let payload = ControlMessage::MuteResponse {
            id: id.to_string(),
            status: Some(status),
            data: MuteData { audio },
        }
        .to_payload();
        SessionEvent::leg(LegRole::Gateway, LegEvent::InfoReceived(payload))
    }

    /// Press the toggle keys and return the token of the request sent
    fn toggle(session: &mut Session) -> (String, bool) {
        let actions = keys(session, "*6");
        match sent_to_gateway(&actions).as_slice() {
            [ControlMessage::MuteRequest { id, data }] => (id.clone(), data.audio),
            other => panic!("expected one mute request, got {:?}", other),
        }
    }

    #[test]
    fn request_is_answered_and_adopted() {
        let mut session = in_call(config());
        let actions = session.handle(request("r1", true));

        assert_eq!(
            sent_to_gateway(&actions),
            vec![ControlMessage::accepted("r1", true)]
        );
        assert!(session.state().muted);
        assert_eq!(said(&actions), vec![GatewayConfig::default().prompts.muted]);
        assert_eq!(session.state().ivr.current(), Some(IvrStateId::Muted));
    }

    #[test]
    fn every_request_is_answered() {
        let mut session = in_call(config());
        let first = session.handle(request("r1", true));
        let second = session.handle(request("r2", true));
        assert_eq!(sent_to_gateway(&first), vec![ControlMessage::accepted("r1", true)]);
        assert_eq!(sent_to_gateway(&second), vec![ControlMessage::accepted("r2", true)]);
        assert!(session.state().muted);
    }

    #[test]
    fn request_before_human_connects_forces_mute() {
        let destination = LegInfo {
            number: "+12025550123".to_string(),
            ..Default::default()
        };
        let mut session = Session::new(CallDirection::Outbound, config(), destination);
        session.handle(SessionEvent::Alerting);
        session.handle(SessionEvent::leg(LegRole::Gateway, LegEvent::Connected));

        let actions = session.handle(request("r1", false));
        assert_eq!(sent_to_gateway(&actions), vec![ControlMessage::accepted("r1", false)]);
        assert!(session.state().muted);

        session.handle(SessionEvent::leg(LegRole::Gateway, LegEvent::PlaybackFinished));
        let actions = session.handle(SessionEvent::leg(LegRole::Human, LegEvent::Connected));
        assert_eq!(said(&actions), vec![GatewayConfig::default().prompts.muted]);
    }

    #[test]
    fn toggle_waits_for_response() {
        let mut session = in_call(config());
        let (token, desired) = toggle(&mut session);
        assert!(desired);
        assert!(!session.state().muted);
        assert_eq!(session.state().pending_toggle.as_deref(), Some(token.as_str()));

        let actions = session.handle(response(&token, MuteStatus::Ok, true));
        assert!(session.state().muted);
        assert_eq!(session.state().pending_toggle, None);
        assert_eq!(said(&actions), vec![GatewayConfig::default().prompts.muted]);
    }

    #[test]
    fn toggle_round_trips_are_symmetric() {
        let mut session = in_call(config());

        let (token, desired) = toggle(&mut session);
        let actions = session.handle(response(&token, MuteStatus::Ok, desired));
        assert!(session.state().muted);
        assert_eq!(said(&actions), vec![GatewayConfig::default().prompts.muted]);

        let (token, desired) = toggle(&mut session);
        assert!(!desired);
        let actions = session.handle(response(&token, MuteStatus::Ok, desired));
        assert!(!session.state().muted);
        assert_eq!(said(&actions), vec![GatewayConfig::default().prompts.unmuted]);
        assert_eq!(session.state().ivr.current(), Some(IvrStateId::Unmuted));
    }

    #[test]
    fn lost_response_leaves_state_unchanged() {
        let mut session = in_call(config());
        let (first, _) = toggle(&mut session);
        let (second, _) = toggle(&mut session);
        assert_ne!(first, second);
        assert!(!session.state().muted);
        assert_eq!(session.state().pending_toggle.as_deref(), Some(second.as_str()));
    }

    #[test]
    fn failed_response_has_no_effect() {
        let mut session = in_call(config());
        let (token, _) = toggle(&mut session);
        let actions = session.handle(response(&token, MuteStatus::Failed, true));
        assert!(actions.is_empty());
        assert!(!session.state().muted);
    }

    #[test]
    fn other_keys_keep_listening_silently() {
        let mut session = in_call(config());
        let actions = keys(&mut session, "12");
        assert!(sent_to_gateway(&actions).is_empty());
        assert!(said(&actions).is_empty());
        assert_eq!(session.state().ivr.current(), Some(IvrStateId::Unmuted));
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::ArmTimer {
                kind: TimerKind::Input,
                ..
            }
        )));
    }

    #[test]
    fn in_call_prompt_repeats_on_timeout() {
        let mut session = in_call(config());
        let generation = session.state().ivr.generation();
        let actions = session.handle(SessionEvent::TimerFired {
            kind: TimerKind::Input,
            generation,
        });
        assert_eq!(said(&actions), vec![GatewayConfig::default().prompts.unmuted]);
        assert!(!session.is_terminated());
    }

    #[test]
    fn unknown_message_type_is_not_claimed() {
        let mut session = in_call(config());
        let mut actions = Vec::new();
        let stats = InfoPayload::json(r#"{"type":"stats","id":"x"}"#);
        let claimed = session.on_gateway_info(&stats, &mut actions);
        assert!(!claimed);
        assert!(actions.is_empty());

        let claimed = session.on_gateway_info(
            &InfoPayload {
                mime_type: "text/plain".to_string(),
                body: "muteRequest".to_string(),
                headers: Default::default(),
            },
            &mut actions,
        );
        assert!(!claimed);
    }
}
