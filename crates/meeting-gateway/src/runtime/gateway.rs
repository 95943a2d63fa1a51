//! Process-level entry point
//!
//! [`MeetingGateway`] receives every alerting call from the platform, decides
//! whether it is a dial-in or a dial-out request and runs a session for it on
//! its own task.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use super::driver::SessionDriver;
use super::leg::{CallLeg, LegEventSender, Telephony};
use crate::config::GatewayConfig;
use crate::directory::{DirectoryLookup, HttpDirectory};
use crate::errors::Result;
use crate::session::{LegInfo, Session};
use crate::types::{CallDirection, SessionId};

pub struct MeetingGateway {
    config: Arc<GatewayConfig>,
    telephony: Arc<dyn Telephony>,
    directory: Arc<dyn DirectoryLookup>,
    sessions: Arc<DashMap<SessionId, CallDirection>>,
}

impl MeetingGateway {
    pub fn new(
        config: GatewayConfig,
        telephony: Arc<dyn Telephony>,
        directory: Arc<dyn DirectoryLookup>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            telephony,
            directory,
            sessions: Arc::new(DashMap::new()),
        })
    }

    /// Gateway resolving meeting ids against the configured HTTP directory
    pub fn with_http_directory(
        config: GatewayConfig,
        telephony: Arc<dyn Telephony>,
    ) -> Result<Self> {
        let directory = HttpDirectory::new(config.directory_url.clone(), config.lookup_timeout())?;
        Self::new(config, telephony, Arc::new(directory))
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Calls from the gateway user are dial-out requests, everything else is a dial-in
    pub fn classify(&self, leg: &dyn CallLeg) -> CallDirection {
        if leg.caller_id() == self.config.gateway_user {
            CallDirection::Outbound
        } else {
            CallDirection::Inbound
        }
    }

    /// Take over an alerting call.
    ///
    /// Must be called from within a tokio runtime. The returned sender is
    /// where the platform reports the lifecycle of `leg`.
    pub fn on_call_alerting(&self, leg: Arc<dyn CallLeg>) -> LegEventSender {
        let direction = self.classify(leg.as_ref());
        self.accept(leg, direction)
    }

    /// Take over an alerting call with a known direction
    pub fn accept(&self, leg: Arc<dyn CallLeg>, direction: CallDirection) -> LegEventSender {
        let origin = LegInfo {
            number: leg.number().to_string(),
            caller_id: leg.caller_id().to_string(),
            display_name: leg.display_name().map(str::to_string),
        };
        let session = Session::new(direction, self.config.clone(), origin);
        let (driver, sender) = SessionDriver::new(
            session,
            leg,
            self.config.voice(),
            self.telephony.clone(),
            self.directory.clone(),
        );

        let id = driver.session_id().clone();
        info!(session = %id, ?direction, "Accepted alerting call");
        self.sessions.insert(id, direction);

        let sessions = self.sessions.clone();
        tokio::spawn(async move {
            let id = driver.run().await;
            sessions.remove(&id);
        });
        sender
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}
