//! Maximum call duration

use std::time::Duration;

use tracing::{debug, info};

use super::{Action, AfterPlayback, Phase, Session, TerminationReason, TimerKind};
use crate::types::LegRole;

impl Session {
    pub(super) fn arm_call_limit(&mut self, limit: Duration, actions: &mut Vec<Action>) {
        self.state.call_limit_generation += 1;
        debug!(session = %self.state.id, limit_secs = limit.as_secs(), "Arming call limit");
        actions.push(Action::ArmTimer {
            kind: TimerKind::CallLimit,
            duration: limit,
            generation: self.state.call_limit_generation,
        });
    }

    pub(super) fn on_call_limit(&mut self, generation: u64, actions: &mut Vec<Action>) {
        if generation != self.state.call_limit_generation || self.state.phase == Phase::Ending {
            return;
        }
        info!(session = %self.state.id, "Call limit reached");
        self.state.phase = Phase::Ending;
        self.state.mute_loop_active = false;
        let text = self.config.prompts.time_limit.clone();
        self.announce(
            LegRole::Human,
            text,
            AfterPlayback::Terminate(TerminationReason::TimeLimit),
            actions,
        );
    }
}
