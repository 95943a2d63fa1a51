//! Call leg abstraction over the telephony platform
//!
//! The platform owns the actual connections. It hands the gateway a
//! [`CallLeg`] for every alerting or placed call and reports that leg's
//! lifecycle through the [`LegEventSender`] it was given.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::Result;
use crate::session::SessionEvent;
use crate::types::{AnswerOptions, GatewayCallRequest, InfoPayload, LegEvent, LegRole, Voice};

/// One telephony connection
#[async_trait]
pub trait CallLeg: Send + Sync {
    /// Number the call is addressed to
    fn number(&self) -> &str;

    fn caller_id(&self) -> &str;

    fn display_name(&self) -> Option<&str>;

    async fn answer(&self, options: AnswerOptions) -> Result<()>;

    /// Play ring-back towards this leg
    async fn ring(&self) -> Result<()>;

    /// Speak `text`, replacing anything currently playing.
    ///
    /// The end of the prompt is reported with [`LegEvent::PlaybackFinished`].
    /// A prompt replaced by the next `say` is not reported.
    async fn say(&self, text: &str, voice: &Voice) -> Result<()>;

    /// Stop the current prompt; a stopped prompt reports
    /// [`LegEvent::PlaybackFinished`] like one that played to the end
    async fn stop_prompt(&self) -> Result<()>;

    /// Send this leg's audio to `other` and the other way round
    async fn bridge_media_with(&self, other: &dyn CallLeg) -> Result<()>;

    async fn send_info(&self, payload: InfoPayload) -> Result<()>;

    async fn hangup(&self) -> Result<()>;
}

/// Places new calls
#[async_trait]
pub trait Telephony: Send + Sync {
    /// Call a platform user, used for the leg towards the conference gateway
    async fn call_user(
        &self,
        request: GatewayCallRequest,
        events: LegEventSender,
    ) -> Result<Arc<dyn CallLeg>>;

    /// Dial a phone number presenting `origin` as caller id
    async fn call_pstn(
        &self,
        destination: &str,
        origin: &str,
        events: LegEventSender,
    ) -> Result<Arc<dyn CallLeg>>;
}

/// Delivers one leg's lifecycle events to its session
///
/// After `Failed` or `Disconnected` the leg is over: later events are dropped
/// so the session never sees anything past a terminal event.
#[derive(Clone)]
pub struct LegEventSender {
    role: LegRole,
    tx: mpsc::UnboundedSender<SessionEvent>,
    terminated: Arc<AtomicBool>,
}

impl LegEventSender {
    pub(crate) fn new(role: LegRole, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            role,
            tx,
            terminated: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn role(&self) -> LegRole {
        self.role
    }

    /// Whether a terminal event was already delivered
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Deliver an event; returns `false` if it was dropped
    pub fn send(&self, event: LegEvent) -> bool {
        if event.is_terminal() {
            if self.terminated.swap(true, Ordering::AcqRel) {
                debug!(role = %self.role, ?event, "Dropping second terminal event");
                return false;
            }
        } else if self.is_terminated() {
            debug!(role = %self.role, ?event, "Dropping event after leg ended");
            return false;
        }
        self.tx.send(SessionEvent::leg(self.role, event)).is_ok()
    }
}

impl fmt::Debug for LegEventSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegEventSender")
            .field("role", &self.role)
            .field("terminated", &self.is_terminated())
            .finish()
    }
}
