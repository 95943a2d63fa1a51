use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{mpsc::UnboundedSender, oneshot};

use crate::session::{SessionEvent, TimerKind};

/// One-shot timers of a single session
///
/// Every armed timer posts [`SessionEvent::TimerFired`] into the session's
/// event channel unless it is cancelled first. Arming a kind again cancels the
/// previous timer of that kind.
pub struct SessionTimers {
    tx: UnboundedSender<SessionEvent>,
    stops: HashMap<TimerKind, oneshot::Sender<()>>,
}

impl SessionTimers {
    pub fn new(tx: UnboundedSender<SessionEvent>) -> Self {
        Self {
            tx,
            stops: HashMap::new(),
        }
    }

    pub fn arm(&mut self, kind: TimerKind, duration: Duration, generation: u64) {
        self.cancel(kind);
        let (stop_tx, mut stop_rx) = oneshot::channel();
        self.stops.insert(kind, stop_tx);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {
                    let _ = tx.send(SessionEvent::TimerFired { kind, generation });
                }
                _ = &mut stop_rx => {}
            }
        });
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        if let Some(stop) = self.stops.remove(&kind) {
            let _ = stop.send(());
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, stop) in self.stops.drain() {
            let _ = stop.send(());
        }
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.stops.get(&kind).is_some_and(|stop| !stop.is_closed())
    }
}

impl Drop for SessionTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
