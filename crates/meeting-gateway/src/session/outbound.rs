//! Dial-out: the gateway calls in and asks for a phone number to be dialled

use tracing::{debug, info, warn};

use super::{Action, AfterPlayback, Phase, Session, TerminationReason};
use crate::region::select_origin;
use crate::types::{AnswerOptions, CallDirection, InfoPayload, LegRole};

impl Session {
    pub(super) fn outbound_alerting(&mut self, actions: &mut Vec<Action>) {
        info!(
            session = %self.state.id,
            destination = %self.origin.number,
            "Answering dial-out request"
        );
        actions.push(Action::Answer {
            role: LegRole::Gateway,
            options: AnswerOptions {
                mix_streams: true,
                audio_level_extension: true,
            },
        });
    }

    pub(super) fn outbound_connected(&mut self, role: LegRole, actions: &mut Vec<Action>) {
        match role {
            LegRole::Gateway => {
                if self.state.phase != Phase::Answering {
                    return;
                }
                self.state.phase = Phase::Announcing;
                let notice = self
                    .config
                    .prompts
                    .render_outbound_notice(&self.origin.number, self.config.outbound_call_limit());
                self.announce(LegRole::Gateway, notice, AfterPlayback::PlacePstnCall, actions);
            }
            LegRole::Human => {
                info!(
                    session = %self.state.id,
                    destination = %self.origin.number,
                    "Destination answered"
                );
                self.state.phase = Phase::InCall;
                self.arm_call_limit(self.config.outbound_call_limit(), actions);
                self.activate_mute_loop(actions);
            }
        }
    }

    pub(super) fn place_pstn_call(&mut self, actions: &mut Vec<Action>) {
        let destination = self.origin.number.clone();
        let Some(origin) =
            select_origin(&destination, &self.config.origin_numbers).map(str::to_string)
        else {
            warn!(
                session = %self.state.id,
                %destination,
                "No origin number available for dial-out"
            );
            self.terminate(TerminationReason::NoOrigin, actions);
            return;
        };
        info!(session = %self.state.id, %destination, %origin, "Placing dial-out leg");
        self.state.phase = Phase::Dialing;
        actions.push(Action::PlacePstnCall { destination, origin });
    }

    /// Application message from the human leg
    pub(super) fn human_info(&mut self, payload: InfoPayload, actions: &mut Vec<Action>) {
        match self.state.direction {
            CallDirection::Outbound => {
                debug!(
                    session = %self.state.id,
                    mime_type = %payload.mime_type,
                    "Relaying message to gateway"
                );
                actions.push(Action::SendInfo {
                    role: LegRole::Gateway,
                    payload,
                });
            }
            CallDirection::Inbound => self.inbound_info(LegRole::Human, &payload),
        }
    }

    /// Gateway message the mute protocol did not claim
    pub(super) fn unclaimed_gateway_info(
        &mut self,
        payload: InfoPayload,
        actions: &mut Vec<Action>,
    ) {
        match self.state.direction {
            CallDirection::Outbound => match self.state.human {
                Some(state) if !state.is_terminal() => {
                    debug!(
                        session = %self.state.id,
                        mime_type = %payload.mime_type,
                        "Relaying message to destination"
                    );
                    actions.push(Action::SendInfo {
                        role: LegRole::Human,
                        payload,
                    });
                }
                _ => {
                    debug!(
                        session = %self.state.id,
                        "Dropping gateway message, destination leg not placed yet"
                    );
                }
            },
            CallDirection::Inbound => self.inbound_info(LegRole::Gateway, &payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::test_support::*;
    use super::super::{SessionEvent, TimerKind};
    use super::*;
    use crate::config::GatewayConfig;
    use crate::mute_protocol::ControlMessage;
    use crate::session::LegInfo;
    use crate::types::LegEvent;
    use pretty_assertions::assert_eq;

    fn destination(number: &str) -> LegInfo {
        LegInfo {
            number: number.to_string(),
            caller_id: "jigasi".to_string(),
            display_name: None,
        }
    }

    fn answered(config: Arc<GatewayConfig>, number: &str) -> (Session, Vec<Action>) {
        let mut session = Session::new(CallDirection::Outbound, config, destination(number));
        session.handle(SessionEvent::Alerting);
        let actions = session.handle(SessionEvent::leg(LegRole::Gateway, LegEvent::Connected));
        (session, actions)
    }

    fn notice_finished() -> SessionEvent {
        SessionEvent::leg(LegRole::Gateway, LegEvent::PlaybackFinished)
    }

    fn dialled(number: &str) -> (Session, Vec<Action>) {
        let (mut session, _) = answered(config(), number);
        let actions = session.handle(notice_finished());
        (session, actions)
    }

    #[test]
    fn answers_gateway_with_mixing() {
        let mut session =
            Session::new(CallDirection::Outbound, config(), destination("+12025550123"));
        let actions = session.handle(SessionEvent::Alerting);
        assert_eq!(
            actions,
            vec![Action::Answer {
                role: LegRole::Gateway,
                options: AnswerOptions {
                    mix_streams: true,
                    audio_level_extension: true,
                },
            }]
        );
    }

    #[test]
    fn announces_destination_and_limit() {
        let (_, actions) = answered(config(), "+1202");
        assert_eq!(
            actions,
            vec![Action::Say {
                role: LegRole::Gateway,
                text: "Calling 1 2 0 2. Your call will be automatically ended in 5 minutes."
                    .to_string(),
            }]
        );
    }

    #[test]
    fn dials_from_origin_in_same_region() {
        let (session, actions) = dialled("+447700900123");
        assert_eq!(
            actions,
            vec![Action::PlacePstnCall {
                destination: "+447700900123".to_string(),
                origin: "442071838750".to_string(),
            }]
        );
        assert_eq!(session.state().phase, Phase::Dialing);
    }

    #[test]
    fn falls_back_to_first_origin() {
        let config = Arc::new(GatewayConfig {
            origin_numbers: vec!["442071838750".to_string()],
            ..Default::default()
        });
        let (mut session, _) = answered(config, "+12025550123");
        let actions = session.handle(notice_finished());
        assert_eq!(
            actions,
            vec![Action::PlacePstnCall {
                destination: "+12025550123".to_string(),
                origin: "442071838750".to_string(),
            }]
        );
    }

    #[test]
    fn no_origin_ends_the_session() {
        let config = Arc::new(GatewayConfig {
            origin_numbers: Vec::new(),
            ..Default::default()
        });
        let (mut session, _) = answered(config, "+12025550123");
        let actions = session.handle(notice_finished());
        assert_eq!(actions, vec![Action::Terminate(TerminationReason::NoOrigin)]);
    }

    #[test]
    fn relays_ringback_to_gateway() {
        let (mut session, _) = dialled("+12025550123");
        let actions = session.handle(SessionEvent::leg(LegRole::Human, LegEvent::Ringing));
        assert_eq!(actions, vec![Action::Ring { role: LegRole::Gateway }]);
    }

    #[test]
    fn destination_answer_bridges_and_starts_limit() {
        let (mut session, _) = dialled("+12025550123");
        let actions = session.handle(SessionEvent::leg(LegRole::Human, LegEvent::Connected));
        assert!(matches!(
            actions[0],
            Action::ArmTimer {
                kind: TimerKind::CallLimit,
                ..
            }
        ));
        assert_eq!(actions[1], Action::BridgeMedia);
        assert_eq!(said(&actions), vec![GatewayConfig::default().prompts.unmuted]);
        assert_eq!(session.state().phase, Phase::InCall);
    }

    #[test]
    fn destination_failure_ends_the_session() {
        let (mut session, _) = dialled("+12025550123");
        let failed = LegEvent::Failed("busy".to_string());
        let actions = session.handle(SessionEvent::leg(LegRole::Human, failed));
        assert!(matches!(actions.as_slice(), [Action::Terminate(_)]));
    }

    #[test]
    fn relays_info_in_both_directions() {
        let (mut session, _) = dialled("+12025550123");
        session.handle(SessionEvent::leg(LegRole::Human, LegEvent::Connected));

        let mut from_human = InfoPayload::json(r#"{"type":"chat"}"#);
        from_human.headers.insert("X-Custom".to_string(), "1".to_string());
        let received = LegEvent::InfoReceived(from_human.clone());
        let actions = session.handle(SessionEvent::leg(LegRole::Human, received));
        assert_eq!(
            actions,
            vec![Action::SendInfo {
                role: LegRole::Gateway,
                payload: from_human,
            }]
        );

        let from_gateway = InfoPayload {
            mime_type: "text/plain".to_string(),
            body: "hello".to_string(),
            headers: Default::default(),
        };
        let received = LegEvent::InfoReceived(from_gateway.clone());
        let actions = session.handle(SessionEvent::leg(LegRole::Gateway, received));
        assert_eq!(
            actions,
            vec![Action::SendInfo {
                role: LegRole::Human,
                payload: from_gateway,
            }]
        );
    }

    #[test]
    fn mute_messages_are_not_relayed() {
        let (mut session, _) = dialled("+12025550123");
        session.handle(SessionEvent::leg(LegRole::Human, LegEvent::Connected));
        let request = LegEvent::InfoReceived(ControlMessage::new_request(true).to_payload());
        let actions = session.handle(SessionEvent::leg(LegRole::Gateway, request));
        assert!(actions.iter().all(|a| !matches!(
            a,
            Action::SendInfo {
                role: LegRole::Human,
                ..
            }
        )));
    }

    #[test]
    fn gateway_info_before_dialling_is_dropped() {
        let (mut session, _) = answered(config(), "+12025550123");
        let payload = LegEvent::InfoReceived(InfoPayload::json(r#"{"type":"somethingElse"}"#));
        let actions = session.handle(SessionEvent::leg(LegRole::Gateway, payload));
        assert!(actions.is_empty());
    }
}
