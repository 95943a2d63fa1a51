//! Async runtime around the session state machine

mod driver;
mod gateway;
mod leg;
mod timers;

pub use driver::SessionDriver;
pub use gateway::MeetingGateway;
pub use leg::{CallLeg, LegEventSender, Telephony};
pub use timers::SessionTimers;
