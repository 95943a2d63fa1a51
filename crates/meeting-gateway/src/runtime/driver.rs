//! Runs one session: feeds events into the state machine and executes the
//! resulting actions against the legs, the directory and the timers.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::leg::{CallLeg, LegEventSender, Telephony};
use super::timers::SessionTimers;
use crate::directory::DirectoryLookup;
use crate::errors::{GatewayError, Result};
use crate::session::{Action, Session, SessionEvent};
use crate::types::{CallDirection, LegEvent, LegRole, SessionId, Voice};

pub struct SessionDriver {
    session: Session,
    voice: Voice,
    telephony: Arc<dyn Telephony>,
    directory: Arc<dyn DirectoryLookup>,
    human: Option<Arc<dyn CallLeg>>,
    gateway: Option<Arc<dyn CallLeg>>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    timers: SessionTimers,
}

impl SessionDriver {
    /// Create a driver for a session whose first leg is `alerting`.
    ///
    /// Returns the sender the platform must use for that leg's events.
    pub fn new(
        session: Session,
        alerting: Arc<dyn CallLeg>,
        voice: Voice,
        telephony: Arc<dyn Telephony>,
        directory: Arc<dyn DirectoryLookup>,
    ) -> (Self, LegEventSender) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let role = match session.direction() {
            CallDirection::Inbound => LegRole::Human,
            CallDirection::Outbound => LegRole::Gateway,
        };
        let (human, gateway) = match role {
            LegRole::Human => (Some(alerting), None),
            LegRole::Gateway => (None, Some(alerting)),
        };
        let sender = LegEventSender::new(role, events_tx.clone());
        let driver = Self {
            session,
            voice,
            telephony,
            directory,
            human,
            gateway,
            timers: SessionTimers::new(events_tx.clone()),
            events_tx,
            events_rx,
        };
        (driver, sender)
    }

    pub fn session_id(&self) -> &SessionId {
        self.session.id()
    }

    /// Drive the session until it terminates
    pub async fn run(mut self) -> SessionId {
        info!(
            session = %self.session.id(),
            direction = ?self.session.direction(),
            "Session started"
        );
        self.dispatch(SessionEvent::Alerting).await;

        while !self.session.is_terminated() {
            let Some(event) = self.events_rx.recv().await else {
                break;
            };
            self.dispatch(event).await;
        }

        self.timers.cancel_all();
        info!(session = %self.session.id(), "Session finished");
        self.session.id().clone()
    }

    async fn dispatch(&mut self, event: SessionEvent) {
        debug!(session = %self.session.id(), ?event, "Session event");
        for action in self.session.handle(event) {
            if let Err(e) = self.execute(action).await {
                warn!(session = %self.session.id(), error = %e, "Action failed");
            }
        }
    }

    async fn execute(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Answer { role, options } => {
                if let Err(e) = self.leg(role)?.answer(options).await {
                    self.fail_leg(role, &e);
                    return Err(e);
                }
            }
            Action::Say { role, text } => {
                let said = match self.leg(role) {
                    Ok(leg) => leg.say(&text, &self.voice).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = said {
                    // A prompt that never started is never reported by the platform
                    let finished = SessionEvent::leg(role, LegEvent::PlaybackFinished);
                    let _ = self.events_tx.send(finished);
                    return Err(e);
                }
            }
            Action::StopPrompt { role } => self.leg(role)?.stop_prompt().await?,
            Action::Ring { role } => self.leg(role)?.ring().await?,
            Action::SendInfo { role, payload } => self.leg(role)?.send_info(payload).await?,
            Action::BridgeMedia => {
                let human = self.leg(LegRole::Human)?;
                let gateway = self.leg(LegRole::Gateway)?;
                human.bridge_media_with(gateway.as_ref()).await?;
            }
            Action::Resolve { identifier } => {
                let directory = self.directory.clone();
                let tx = self.events_tx.clone();
                tokio::spawn(async move {
                    let outcome = directory.resolve(&identifier).await;
                    let _ = tx.send(SessionEvent::LookupFinished { identifier, outcome });
                });
            }
            Action::PlaceGatewayCall(request) => {
                let events = LegEventSender::new(LegRole::Gateway, self.events_tx.clone());
                match self.telephony.call_user(request, events.clone()).await {
                    Ok(leg) => self.gateway = Some(leg),
                    Err(e) => {
                        error!(
                            session = %self.session.id(),
                            error = %e,
                            "Failed to place gateway leg"
                        );
                        events.send(LegEvent::Failed(e.to_string()));
                    }
                }
            }
            Action::PlacePstnCall { destination, origin } => {
                let events = LegEventSender::new(LegRole::Human, self.events_tx.clone());
                match self.telephony.call_pstn(&destination, &origin, events.clone()).await {
                    Ok(leg) => self.human = Some(leg),
                    Err(e) => {
                        error!(
                            session = %self.session.id(),
                            %destination,
                            error = %e,
                            "Failed to dial out"
                        );
                        events.send(LegEvent::Failed(e.to_string()));
                    }
                }
            }
            Action::ArmTimer {
                kind,
                duration,
                generation,
            } => self.timers.arm(kind, duration, generation),
            Action::Terminate(reason) => {
                self.timers.cancel_all();
                let legs = [
                    (LegRole::Human, self.human.take()),
                    (LegRole::Gateway, self.gateway.take()),
                ];
                for (role, leg) in legs {
                    let Some(leg) = leg else { continue };
                    if let Err(e) = leg.hangup().await {
                        debug!(session = %self.session.id(), %role, error = %e, "Hangup failed");
                    }
                }
                info!(session = %self.session.id(), %reason, "Session terminated");
            }
        }
        Ok(())
    }

    fn leg(&self, role: LegRole) -> Result<Arc<dyn CallLeg>> {
        let leg = match role {
            LegRole::Human => self.human.as_ref(),
            LegRole::Gateway => self.gateway.as_ref(),
        };
        leg.cloned()
            .ok_or_else(|| GatewayError::invalid_state(format!("no {} leg", role)))
    }

    fn fail_leg(&self, role: LegRole, cause: &GatewayError) {
        let _ = self
            .events_tx
            .send(SessionEvent::leg(role, LegEvent::Failed(cause.to_string())));
    }
}
