//! Cooperative timer queue on a logical millisecond clock.
//!
//! Every periodic activity of the app (display refresh, readout poll, countdown,
//! calibration sampling) is a timer here. Stopping a timer means cancelling its
//! token; a cancelled token never fires again, so a late completion cannot slip
//! through after a reset.
use log::debug;
/// Longest period any single timer may be armed with.
pub const MAX_TIMER_INTERVAL_MS: u64 = 60_000;
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerKind {
    DisplayTick,
    UiRefresh,
    CountdownTick,
    SamplingTick,
    SamplingFinished,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fired {
    pub token: TimerToken,
    pub kind: TimerKind,
    pub at_ms: u64,
}
#[derive(Debug)]
struct Timer {
    token: TimerToken,
    kind: TimerKind,
    due_ms: u64,
    interval_ms: Option<u64>,
}
pub struct Scheduler {
    timers: Vec<Timer>,
    next_token: u64,
    now_ms: u64,
    max_lag_ms: u64,
}
impl Scheduler {
    pub fn new(max_lag_ms: u64) -> Self {
        Self {
            timers: Vec::new(),
            next_token: 0,
            now_ms: 0,
            max_lag_ms,
        }
    }
    #[cfg(test)]
    pub fn now(&self) -> u64 {
        self.now_ms
    }
    /// Fires every `interval_ms`, first one `interval_ms` from now.
    pub fn schedule_repeating(&mut self, kind: TimerKind, interval_ms: u64) -> TimerToken {
        let interval_ms = interval_ms.max(1);
        self.insert(kind, self.now_ms.saturating_add(interval_ms), Some(interval_ms))
    }
    pub fn schedule_once(&mut self, kind: TimerKind, delay_ms: u64) -> TimerToken {
        self.insert(kind, self.now_ms.saturating_add(delay_ms), None)
    }
    /// Returns whether the token was still pending.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.token != token);
        before != self.timers.len()
    }
    #[cfg(test)]
    pub fn is_pending(&self, token: TimerToken) -> bool {
        self.timers.iter().any(|t| t.token == token)
    }
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.timers.len()
    }
    /// Next timer due at or before `now_ms`, earliest deadline first, ties in
    /// creation order. Moves the logical clock to the firing instant.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<Fired> {
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= now_ms)
            .min_by_key(|(_, t)| (t.due_ms, t.token))
            .map(|(i, _)| i);
        let Some(idx) = idx else {
            self.now_ms = self.now_ms.max(now_ms);
            return None;
        };
        let timer = &mut self.timers[idx];
        let fired_at = match timer.interval_ms {
            Some(interval) if now_ms - timer.due_ms > self.max_lag_ms => {
                debug!(
                    "{:?} lagging by {} ms, coalescing missed ticks",
                    timer.kind,
                    now_ms - timer.due_ms
                );
                timer.due_ms = now_ms.saturating_add(interval);
                now_ms
            }
            Some(interval) => {
                let at = timer.due_ms;
                timer.due_ms = timer.due_ms.saturating_add(interval);
                at
            }
            None => timer.due_ms,
        };
        let fired = Fired {
            token: timer.token,
            kind: timer.kind,
            at_ms: fired_at,
        };
        if timer.interval_ms.is_none() {
            self.timers.swap_remove(idx);
        }
        self.now_ms = self.now_ms.max(fired_at);
        Some(fired)
    }
    fn insert(&mut self, kind: TimerKind, due_ms: u64, interval_ms: Option<u64>) -> TimerToken {
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        self.timers.push(Timer {
            token,
            kind,
            due_ms,
            interval_ms,
        });
        token
    }
}
