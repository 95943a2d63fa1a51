//! Dial-in: meeting id, directory lookup, password, bridge to the gateway

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use super::{Action, AfterPlayback, Phase, Session};
use crate::directory::{DirectoryError, Resolution};
use crate::ivr::IvrStateId;
use crate::types::{
    AnswerOptions, GatewayCallRequest, HEADER_CALL_TIMEOUT, HEADER_DOMAIN_BASE, HEADER_ROOM_NAME,
    HEADER_ROOM_PASSWORD, InfoPayload, LegRole,
};

impl Session {
    pub(super) fn inbound_alerting(&mut self, actions: &mut Vec<Action>) {
        info!(session = %self.state.id, caller = %self.origin.caller_id, "Answering dial-in call");
        actions.push(Action::Answer {
            role: LegRole::Human,
            options: AnswerOptions {
                mix_streams: false,
                audio_level_extension: true,
            },
        });
    }

    pub(super) fn inbound_connected(&mut self, role: LegRole, actions: &mut Vec<Action>) {
        match role {
            LegRole::Human => {
                if self.state.phase != Phase::Answering {
                    return;
                }
                self.return_to_meeting_id(actions);
            }
            LegRole::Gateway => {
                info!(
                    session = %self.state.id,
                    "Gateway leg connected, caller is in the conference"
                );
                self.state.phase = Phase::InCall;
                self.arm_call_limit(self.config.inbound_call_limit(), actions);
                self.activate_mute_loop(actions);
            }
        }
    }

    pub(super) fn return_to_meeting_id(&mut self, actions: &mut Vec<Action>) {
        self.state.phase = Phase::MeetingId;
        self.state.no_input_retries = 0;
        self.enter_ivr(IvrStateId::MeetingId, actions);
    }

    pub(super) fn meeting_id_entered(&mut self, identifier: String, actions: &mut Vec<Action>) {
        debug!(session = %self.state.id, %identifier, "Meeting id entered");
        self.state.phase = Phase::Resolving;
        actions.push(Action::Resolve { identifier });
    }

    pub(super) fn on_lookup_finished(
        &mut self,
        identifier: String,
        outcome: Result<Resolution, DirectoryError>,
        actions: &mut Vec<Action>,
    ) {
        if self.state.phase != Phase::Resolving {
            debug!(
                session = %self.state.id,
                %identifier,
                "Discarding lookup result outside of resolution"
            );
            return;
        }

        let announcement = match outcome {
            Ok(Resolution::Resolved(address)) => {
                info!(session = %self.state.id, %identifier, %address, "Meeting id resolved");
                self.state.conference_id = Some(identifier);
                self.state.conference_address = Some(address);
                self.state.no_input_retries = 0;
                self.state.phase = Phase::Password;
                self.enter_ivr(IvrStateId::Password, actions);
                return;
            }
            Ok(Resolution::NotFound) => {
                info!(session = %self.state.id, %identifier, "Unknown meeting id");
                self.config.prompts.unknown_conference.clone()
            }
            Err(e) => {
                warn!(
                    session = %self.state.id,
                    %identifier,
                    error = %e,
                    "Meeting id lookup failed"
                );
                self.config.prompts.lookup_error.clone()
            }
        };
        self.state.phase = Phase::Announcing;
        self.announce(LegRole::Human, announcement, AfterPlayback::ReturnToMeetingId, actions);
    }

    pub(super) fn password_entered(&mut self, password: String, actions: &mut Vec<Action>) {
        debug!(
            session = %self.state.id,
            with_password = !password.is_empty(),
            "Password step complete"
        );
        self.state.password = Some(password);
        self.state.phase = Phase::Announcing;
        let text = self.config.prompts.connecting.clone();
        self.announce(LegRole::Human, text, AfterPlayback::PlaceGatewayCall, actions);
    }

    pub(super) fn place_gateway_call(&mut self, actions: &mut Vec<Action>) {
        let Some(address) = self.state.conference_address.clone() else {
            warn!(session = %self.state.id, "Bridge requested without a resolved conference");
            self.state.phase = Phase::Announcing;
            let text = self.config.prompts.connection_error.clone();
            self.announce(LegRole::Human, text, AfterPlayback::ReturnToMeetingId, actions);
            return;
        };

        let mut extra_headers = BTreeMap::new();
        extra_headers.insert(HEADER_ROOM_NAME.to_string(), address);
        extra_headers.insert(HEADER_DOMAIN_BASE.to_string(), "true".to_string());
        extra_headers.insert(
            HEADER_CALL_TIMEOUT.to_string(),
            self.config.gateway_call_timeout_secs.to_string(),
        );
        if let Some(password) = self.state.password.as_deref().filter(|p| !p.is_empty()) {
            extra_headers.insert(HEADER_ROOM_PASSWORD.to_string(), password.to_string());
        }

        let display_name =
            annotated_display_name(self.origin.display_name.as_deref(), &self.origin.caller_id);
        let request = GatewayCallRequest {
            username: self.config.gateway_user.clone(),
            caller_id: self.origin.caller_id.clone(),
            display_name,
            extra_headers,
            mix_streams: true,
            audio_level_extension: true,
        };

        info!(
            session = %self.state.id,
            room = request.room_name().unwrap_or_default(),
            "Placing gateway leg"
        );
        self.state.phase = Phase::Dialing;
        self.stop_prompt(LegRole::Human, actions);
        actions.push(Action::PlaceGatewayCall(request));
    }

    pub(super) fn inbound_info(&self, role: LegRole, payload: &InfoPayload) {
        debug!(
            session = %self.state.id,
            %role,
            mime_type = %payload.mime_type,
            "Ignoring application message on dial-in session"
        );
    }
}

/// `"<name> (+<caller id>)"`, unless the caller is anonymous
fn annotated_display_name(name: Option<&str>, caller_id: &str) -> Option<String> {
    match name.map(str::trim) {
        None | Some("") => None,
        Some(name) if name.eq_ignore_ascii_case("anonymous") => Some(name.to_string()),
        Some(name) => Some(format!("{} (+{})", name, caller_id)),
    }
}
