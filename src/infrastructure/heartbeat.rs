use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Outcome of a heartbeat tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Beat {
    /// Send a ping frame
    SendPing,
    /// Nothing arrived since the previous ping; treat the transport as dead
    TimedOut,
}

/// Keepalive bookkeeping for one session.
///
/// Every tick either requests a ping or reports a timeout when no inbound
/// frame was seen since the last ping.
pub struct Heartbeat {
    interval: Interval,
    awaiting_reply: bool,
}

impl Heartbeat {
    pub fn new(period: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            interval,
            awaiting_reply: false,
        }
    }

    pub async fn tick(&mut self) -> Beat {
        self.interval.tick().await;
        if self.awaiting_reply {
            Beat::TimedOut
        } else {
            self.awaiting_reply = true;
            Beat::SendPing
        }
    }

    /// Any inbound frame proves the peer is alive
    pub fn record_activity(&mut self) {
        self.awaiting_reply = false;
    }

    /// Ticks if a heartbeat is configured, otherwise never resolves
    pub async fn tick_opt(heartbeat: &mut Option<Heartbeat>) -> Beat {
        match heartbeat {
            Some(heartbeat) => heartbeat.tick().await,
            None => std::future::pending().await,
        }
    }
}
