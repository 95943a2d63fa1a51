//! # Meeting Gateway - telephone access to online meetings
//!
//! This crate orchestrates phone calls into and out of a conference:
//! - **Dial-in**: a caller enters a meeting id and an optional password, the
//!   id is confirmed against a conference directory and the caller is bridged
//!   to the media-mixing gateway of that conference.
//! - **Dial-out**: the gateway asks for a phone number to be dialled; the
//!   call is placed from a caller id in the destination's region and bridged.
//! - **Mute control**: while bridged, mute state is negotiated with the
//!   gateway through in-band `muteRequest`/`muteResponse` messages and can be
//!   toggled by the caller with `*6`.
//! - **Duration limit**: every call ends with an announcement once its
//!   configured limit is reached.
//!
//! ## Architecture
//!
//! The orchestration core is [`session::Session`], a synchronous state
//! machine turning [`SessionEvent`]s into [`Action`]s. The [`runtime`] module
//! drives sessions on tokio tasks, executing actions against a telephony
//! platform supplied through the [`CallLeg`] and [`Telephony`] traits.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rvoip_meeting_gateway::{GatewayConfig, MeetingGateway, Telephony};
//!
//! # fn platform() -> Arc<dyn Telephony> { unimplemented!() }
//! # fn main() -> rvoip_meeting_gateway::Result<()> {
//! let config = GatewayConfig::from_file("gateway.toml")?;
//! let gateway = MeetingGateway::with_http_directory(config, platform())?;
//! // for every alerting call:
//! // let events = gateway.on_call_alerting(leg);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod directory;
pub mod errors;
pub mod ivr;
pub mod logging;
pub mod mute_protocol;
pub mod region;
pub mod runtime;
pub mod session;
pub mod types;

pub use config::{GatewayConfig, Prompts};
pub use directory::{DirectoryError, DirectoryLookup, HttpDirectory, Resolution};
pub use errors::{GatewayError, Result};
pub use logging::{setup_logging, LoggingConfig};
pub use mute_protocol::{ControlMessage, MuteStatus};
pub use runtime::{CallLeg, LegEventSender, MeetingGateway, Telephony};
pub use session::{Action, LegInfo, Session, SessionEvent, TerminationReason, TimerKind};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
