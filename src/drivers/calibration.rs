use std::sync::mpsc::Sender;
use log::{debug, info, warn};
use crate::drivers::scheduler::{Fired, Scheduler, TimerKind, TimerToken, MAX_TIMER_INTERVAL_MS};
use crate::drivers::{DisplayBuffer, DriverError};
use crate::types::{BeltMessage, StatusText};
pub const MAX_COUNTDOWN_STEPS: u32 = 60;
/// Cap on `sampling_duration / sampling_interval`.
pub const MAX_CALIBRATION_SAMPLES: u64 = 10_000;
/// Durations of one zero-point calibration run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalibrationTiming {
    pub countdown_steps: u32,
    pub countdown_interval_ms: u64,
    pub sampling_interval_ms: u64,
    pub sampling_duration_ms: u64,
}
impl CalibrationTiming {
    pub fn new(
        countdown_steps: u32,
        countdown_interval_ms: u64,
        sampling_interval_ms: u64,
        sampling_duration_ms: u64,
    ) -> Result<Self, DriverError> {
        if countdown_interval_ms == 0 || sampling_interval_ms == 0 {
            return Err(DriverError::InvalidCalibrationTiming(
                "intervals must be greater than zero".into(),
            ));
        }
        if countdown_interval_ms > MAX_TIMER_INTERVAL_MS || sampling_interval_ms > MAX_TIMER_INTERVAL_MS {
            return Err(DriverError::InvalidCalibrationTiming(format!(
                "intervals must not exceed {MAX_TIMER_INTERVAL_MS} ms"
            )));
        }
        if countdown_steps > MAX_COUNTDOWN_STEPS {
            return Err(DriverError::InvalidCalibrationTiming(format!(
                "countdown of {countdown_steps} steps exceeds {MAX_COUNTDOWN_STEPS}"
            )));
        }
        if sampling_interval_ms > sampling_duration_ms {
            return Err(DriverError::InvalidCalibrationTiming(format!(
                "sampling interval {sampling_interval_ms} ms exceeds duration {sampling_duration_ms} ms"
            )));
        }
        let samples = sampling_duration_ms / sampling_interval_ms;
        if samples > MAX_CALIBRATION_SAMPLES {
            return Err(DriverError::InvalidCalibrationTiming(format!(
                "{samples} samples per run exceeds {MAX_CALIBRATION_SAMPLES}"
            )));
        }
        Ok(Self {
            countdown_steps,
            countdown_interval_ms,
            sampling_interval_ms,
            sampling_duration_ms,
        })
    }
    /// Samples collected by an undisturbed run.
    pub fn nominal_samples(&self) -> u64 {
        self.sampling_duration_ms / self.sampling_interval_ms
    }
}
impl Default for CalibrationTiming {
    fn default() -> Self {
        Self {
            countdown_steps: 3,
            countdown_interval_ms: 1000,
            sampling_interval_ms: 50,
            sampling_duration_ms: 2000,
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CalibrationPhase {
    Idle,
    Countdown { remaining: u32 },
    Sampling { elapsed_ms: u64 },
    /// Transient: offset is being computed and pushed to the display buffer.
    Committing,
}
#[derive(Clone, Debug, PartialEq)]
pub enum CalibrationEvent {
    CountdownStarted(u32),
    CountdownTick(u32),
    SamplingStarted,
    Progress(u8),
    Completed { offset: f64, samples: usize },
    Reset,
}
/// Snapshot for the calibration page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalibrationStatus {
    pub phase: CalibrationPhase,
    pub countdown_remaining: Option<u32>,
    pub last_offset: Option<f64>,
}
impl CalibrationStatus {
    pub fn is_busy(&self) -> bool {
        self.phase != CalibrationPhase::Idle
    }
}
/// Countdown, timed sampling of the raw signal, then the mean becomes the new offset.
pub struct CalibrationController {
    timing: CalibrationTiming,
    phase: CalibrationPhase,
    accumulator: Vec<f64>,
    countdown_token: Option<TimerToken>,
    sample_token: Option<TimerToken>,
    finish_token: Option<TimerToken>,
    last_offset: Option<f64>,
    status_text: Option<StatusText>,
    tx: Sender<BeltMessage>,
}
impl CalibrationController {
    pub fn new(timing: CalibrationTiming, tx: Sender<BeltMessage>) -> Self {
        Self {
            timing,
            phase: CalibrationPhase::Idle,
            accumulator: Vec::with_capacity(
                timing.nominal_samples().min(MAX_CALIBRATION_SAMPLES) as usize + 1,
            ),
            countdown_token: None,
            sample_token: None,
            finish_token: None,
            last_offset: None,
            status_text: None,
            tx,
        }
    }
    #[cfg(test)]
    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }
    /// Last status this controller announced, `None` before the first run or reset.
    pub fn status_text(&self) -> Option<StatusText> {
        self.status_text
    }
    pub fn status(&self) -> CalibrationStatus {
        let countdown_remaining = match self.phase {
            CalibrationPhase::Countdown { remaining } => Some(remaining),
            _ => None,
        };
        CalibrationStatus {
            phase: self.phase,
            countdown_remaining,
            last_offset: self.last_offset,
        }
    }
    /// Begins a run. Ignored (returns false) unless idle.
    pub fn start(&mut self, scheduler: &mut Scheduler) -> bool {
        if self.phase != CalibrationPhase::Idle {
            debug!("calibration start ignored, already in {:?}", self.phase);
            return false;
        }
        info!("calibration started, countdown {}", self.timing.countdown_steps);
        if self.timing.countdown_steps == 0 {
            self.begin_sampling(scheduler);
            return true;
        }
        self.phase = CalibrationPhase::Countdown {
            remaining: self.timing.countdown_steps,
        };
        self.countdown_token = Some(
            scheduler.schedule_repeating(TimerKind::CountdownTick, self.timing.countdown_interval_ms),
        );
        self.emit(CalibrationEvent::CountdownStarted(self.timing.countdown_steps));
        true
    }
    /// Routes a fired calibration timer. Timers whose token is no longer ours are dropped.
    pub fn handle(&mut self, fired: Fired, scheduler: &mut Scheduler, buffer: &mut DisplayBuffer) {
        let current = match fired.kind {
            TimerKind::CountdownTick => self.countdown_token,
            TimerKind::SamplingTick => self.sample_token,
            TimerKind::SamplingFinished => self.finish_token,
            TimerKind::DisplayTick | TimerKind::UiRefresh => return,
        };
        if current != Some(fired.token) {
            debug!("stale {:?} at {} ms ignored", fired.kind, fired.at_ms);
            return;
        }
        match fired.kind {
            TimerKind::CountdownTick => self.on_countdown_tick(scheduler),
            TimerKind::SamplingTick => self.on_sample_tick(buffer),
            TimerKind::SamplingFinished => self.commit(scheduler, buffer),
            TimerKind::DisplayTick | TimerKind::UiRefresh => {}
        }
    }
    /// Cancels any run in flight and clears the offset.
    pub fn reset(&mut self, scheduler: &mut Scheduler, buffer: &mut DisplayBuffer) {
        self.cancel_timers(scheduler);
        self.accumulator.clear();
        buffer.reset_offset();
        self.phase = CalibrationPhase::Idle;
        self.last_offset = None;
        info!("offset reset");
        self.emit(CalibrationEvent::Reset);
        self.announce(StatusText::OffsetReset);
        self.tx.send(BeltMessage::Log("Offset zurückgesetzt".to_owned())).ok();
    }
    fn on_countdown_tick(&mut self, scheduler: &mut Scheduler) {
        let CalibrationPhase::Countdown { remaining } = self.phase else {
            return;
        };
        let remaining = remaining.saturating_sub(1);
        debug!("calibration countdown {remaining}");
        if remaining > 0 {
            self.phase = CalibrationPhase::Countdown { remaining };
            self.emit(CalibrationEvent::CountdownTick(remaining));
            return;
        }
        if let Some(token) = self.countdown_token.take() {
            scheduler.cancel(token);
        }
        self.begin_sampling(scheduler);
    }
    fn begin_sampling(&mut self, scheduler: &mut Scheduler) {
        self.accumulator.clear();
        self.phase = CalibrationPhase::Sampling { elapsed_ms: 0 };
        self.sample_token = Some(
            scheduler.schedule_repeating(TimerKind::SamplingTick, self.timing.sampling_interval_ms),
        );
        self.finish_token = Some(
            scheduler.schedule_once(TimerKind::SamplingFinished, self.timing.sampling_duration_ms),
        );
        self.emit(CalibrationEvent::SamplingStarted);
        self.announce(StatusText::Calibrating);
    }
    fn on_sample_tick(&mut self, buffer: &DisplayBuffer) {
        let CalibrationPhase::Sampling { elapsed_ms } = self.phase else {
            return;
        };
        self.accumulator.push(buffer.last_raw());
        let elapsed_ms = elapsed_ms + self.timing.sampling_interval_ms;
        self.phase = CalibrationPhase::Sampling { elapsed_ms };
        let pct = self.percent(elapsed_ms);
        debug!("calibration sample {} ({pct}%)", self.accumulator.len());
        self.emit(CalibrationEvent::Progress(pct));
    }
    fn commit(&mut self, scheduler: &mut Scheduler, buffer: &mut DisplayBuffer) {
        self.cancel_timers(scheduler);
        self.phase = CalibrationPhase::Committing;
        let samples = self.accumulator.len();
        let offset = if samples > 0 {
            self.accumulator.iter().sum::<f64>() / samples as f64
        } else {
            warn!("calibration captured no samples, using current raw value");
            buffer.last_raw()
        };
        buffer.set_offset(offset);
        self.accumulator.clear();
        self.last_offset = Some(offset);
        self.phase = CalibrationPhase::Idle;
        info!("calibration committed offset {offset:.4} from {samples} samples");
        self.emit(CalibrationEvent::Completed { offset, samples });
        self.announce(StatusText::Calibrated);
        self.tx
            .send(BeltMessage::Log(format!("Nullpunkt: {offset:.3} ({samples} Werte)")))
            .ok();
    }
    fn cancel_timers(&mut self, scheduler: &mut Scheduler) {
        for token in [
            self.countdown_token.take(),
            self.sample_token.take(),
            self.finish_token.take(),
        ]
        .into_iter()
        .flatten()
        {
            scheduler.cancel(token);
        }
    }
    fn percent(&self, elapsed_ms: u64) -> u8 {
        (elapsed_ms * 100 / self.timing.sampling_duration_ms.max(1)).min(100) as u8
    }
    fn announce(&mut self, status: StatusText) {
        self.status_text = Some(status);
        self.tx.send(BeltMessage::Status(status)).ok();
    }
    fn emit(&self, event: CalibrationEvent) {
        self.tx.send(BeltMessage::Calibration(event)).ok();
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::{channel, Receiver};
    struct Rig {
        ctl: CalibrationController,
        sched: Scheduler,
        buf: DisplayBuffer,
        rx: Receiver<BeltMessage>,
    }
    impl Rig {
        fn new() -> Self {
            let (tx, rx) = channel();
            Self {
                ctl: CalibrationController::new(CalibrationTiming::default(), tx),
                sched: Scheduler::new(1000),
                buf: DisplayBuffer::with_window(10.0, 20.0, 50).unwrap(),
                rx,
            }
        }
        fn run_until(&mut self, now: u64) {
            while let Some(fired) = self.sched.pop_due(now) {
                self.ctl.handle(fired, &mut self.sched, &mut self.buf);
            }
        }
        fn calibration_events(&self) -> Vec<CalibrationEvent> {
            self.rx
                .try_iter()
                .filter_map(|m| match m {
                    BeltMessage::Calibration(ev) => Some(ev),
                    _ => None,
                })
                .collect()
        }
    }
    #[test]
    fn timing_validation() {
        assert!(CalibrationTiming::new(3, 1000, 0, 2000).is_err());
        assert!(CalibrationTiming::new(3, 1000, 3000, 2000).is_err());
        assert_eq!(CalibrationTiming::default().nominal_samples(), 40);
    }
    #[test]
    fn timing_rejects_unbounded_runs() {
        assert!(CalibrationTiming::new(3, 1000, 50, u64::MAX).is_err());
        assert!(CalibrationTiming::new(3, 1000, 1, 10_001).is_err());
        assert!(CalibrationTiming::new(3, 1000, 1, 10_000).is_ok());
        assert!(CalibrationTiming::new(3, u64::MAX, 50, 2000).is_err());
        assert!(CalibrationTiming::new(61, 1000, 50, 2000).is_err());
    }
    #[test]
    fn accumulator_reservation_is_bounded() {
        let (tx, _rx) = channel();
        let timing = CalibrationTiming {
            sampling_duration_ms: u64::MAX,
            ..CalibrationTiming::default()
        };
        let ctl = CalibrationController::new(timing, tx);
        assert!(ctl.accumulator.capacity() <= MAX_CALIBRATION_SAMPLES as usize + 1);
    }
    #[test]
    fn full_run_commits_mean_of_samples() {
        let mut rig = Rig::new();
        rig.buf.ingest(0.5);
        assert!(rig.ctl.start(&mut rig.sched));
        assert_eq!(rig.ctl.status().countdown_remaining, Some(3));
        rig.run_until(1000);
        assert_eq!(rig.ctl.phase(), CalibrationPhase::Countdown { remaining: 2 });
        rig.run_until(3000);
        assert_eq!(rig.ctl.phase(), CalibrationPhase::Sampling { elapsed_ms: 0 });
        rig.run_until(4000);
        let early = rig.calibration_events();
        assert_eq!(early[0], CalibrationEvent::CountdownStarted(3));
        assert_eq!(early[1], CalibrationEvent::CountdownTick(2));
        assert_eq!(early[2], CalibrationEvent::CountdownTick(1));
        assert_eq!(early[3], CalibrationEvent::SamplingStarted);
        let progress: Vec<_> = early
            .into_iter()
            .filter_map(|e| match e {
                CalibrationEvent::Progress(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(progress.len(), 20);
        assert_eq!(progress.last(), Some(&50));
        assert_eq!(rig.ctl.status_text(), Some(StatusText::Calibrating));
        rig.run_until(5000);
        assert_eq!(rig.ctl.phase(), CalibrationPhase::Idle);
        assert_eq!(rig.buf.offset(), 0.5);
        assert!(rig.buf.is_empty());
        assert_eq!(rig.ctl.status().last_offset, Some(0.5));
        assert_eq!(rig.sched.pending(), 0);
        assert_eq!(rig.ctl.status_text(), Some(StatusText::Calibrated));
        let events = rig.calibration_events();
        let progress = events.iter().filter(|e| matches!(e, CalibrationEvent::Progress(_))).count();
        assert_eq!(progress, 20);
        assert_eq!(events[events.len() - 2], CalibrationEvent::Progress(100));
        assert_eq!(
            events.last(),
            Some(&CalibrationEvent::Completed { offset: 0.5, samples: 40 })
        );
    }
    #[test]
    fn mean_follows_changing_raw_values() {
        let mut rig = Rig::new();
        rig.ctl.start(&mut rig.sched);
        rig.run_until(3000);
        let mut expected = Vec::new();
        let mut now = 3000;
        let mut i = 0;
        while rig.ctl.phase() != CalibrationPhase::Idle {
            now += 50;
            let raw = (i as f64) * 0.1;
            rig.buf.ingest(raw);
            expected.push(raw);
            i += 1;
            rig.run_until(now);
        }
        let mean = expected.iter().sum::<f64>() / expected.len() as f64;
        assert_eq!(expected.len(), 40);
        assert!((rig.buf.offset() - mean).abs() < 1e-9);
    }
    #[test]
    fn start_is_rejected_while_busy() {
        let mut rig = Rig::new();
        assert!(rig.ctl.start(&mut rig.sched));
        assert!(!rig.ctl.start(&mut rig.sched));
        rig.run_until(3500);
        assert!(!rig.ctl.start(&mut rig.sched));
        assert_eq!(rig.sched.pending(), 2);
    }
    #[test]
    fn reset_during_sampling_prevents_late_commit() {
        let mut rig = Rig::new();
        rig.buf.set_offset(0.3);
        rig.buf.ingest(0.9);
        rig.ctl.start(&mut rig.sched);
        rig.run_until(4000);
        assert!(matches!(rig.ctl.phase(), CalibrationPhase::Sampling { .. }));
        rig.ctl.reset(&mut rig.sched, &mut rig.buf);
        assert_eq!(rig.ctl.phase(), CalibrationPhase::Idle);
        assert_eq!(rig.ctl.status_text(), Some(StatusText::OffsetReset));
        assert_eq!(rig.sched.pending(), 0);
        rig.buf.ingest(0.9);
        rig.run_until(60_000);
        assert_eq!(rig.buf.offset(), 0.0);
        assert_eq!(rig.buf.len(), 1);
        let events = rig.calibration_events();
        assert_eq!(events.last(), Some(&CalibrationEvent::Reset));
        assert!(!events.iter().any(|e| matches!(e, CalibrationEvent::Completed { .. })));
    }
    #[test]
    fn reset_during_countdown_stops_countdown() {
        let mut rig = Rig::new();
        rig.ctl.start(&mut rig.sched);
        rig.run_until(1500);
        rig.ctl.reset(&mut rig.sched, &mut rig.buf);
        rig.run_until(10_000);
        assert_eq!(rig.ctl.phase(), CalibrationPhase::Idle);
        assert_eq!(rig.ctl.status().countdown_remaining, None);
    }
    #[test]
    fn empty_accumulator_falls_back_to_current_raw() {
        let (tx, _rx) = channel();
        let timing = CalibrationTiming::new(0, 1000, 50, 2000).unwrap();
        let mut ctl = CalibrationController::new(timing, tx);
        let mut sched = Scheduler::new(1000);
        let mut buf = DisplayBuffer::with_window(10.0, 20.0, 50).unwrap();
        buf.ingest(0.42);
        ctl.start(&mut sched);
        assert!(matches!(ctl.phase(), CalibrationPhase::Sampling { .. }));
        // Drop every sampling tick so only the finish timer remains.
        while let Some(fired) = sched.pop_due(2000) {
            if fired.kind == TimerKind::SamplingFinished {
                ctl.handle(fired, &mut sched, &mut buf);
            }
        }
        assert_eq!(ctl.phase(), CalibrationPhase::Idle);
        assert_eq!(buf.offset(), 0.42);
    }
    #[test]
    fn stale_tokens_are_ignored() {
        let mut rig = Rig::new();
        let foreign = rig.sched.schedule_once(TimerKind::SamplingFinished, 10);
        rig.ctl.start(&mut rig.sched);
        let fired = rig.sched.pop_due(10).unwrap();
        assert_eq!(fired.token, foreign);
        rig.ctl.handle(fired, &mut rig.sched, &mut rig.buf);
        assert_eq!(rig.ctl.phase(), CalibrationPhase::Countdown { remaining: 3 });
    }
}
