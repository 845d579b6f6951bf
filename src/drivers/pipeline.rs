use std::sync::mpsc::Sender;
use log::info;
use crate::config::AppConfig;
use crate::drivers::calibration::{CalibrationController, CalibrationStatus, CalibrationTiming};
use crate::drivers::error::DriverError;
use crate::drivers::scheduler::{Scheduler, TimerKind};
use crate::drivers::source::SignalSource;
use crate::drivers::DisplayBuffer;
use crate::types::{BeltMessage, GuiCommand, StatusText};
/// Raw value and offset as shown next to the calibration controls.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Readout {
    pub raw: f64,
    pub offset: f64,
}
/// Single-threaded tick loop: source -> offset correction -> display buffer,
/// with the calibration controller running on its own timers.
pub struct BreathPipeline<S: SignalSource> {
    source: S,
    buffer: DisplayBuffer,
    calibration: CalibrationController,
    scheduler: Scheduler,
    readout: Readout,
    connected: bool,
    tx: Sender<BeltMessage>,
}
impl<S: SignalSource> BreathPipeline<S> {
    pub fn new(source: S, config: &AppConfig, tx: Sender<BeltMessage>) -> Result<Self, DriverError> {
        let buffer = DisplayBuffer::with_window(
            config.window_seconds,
            config.retention_seconds,
            config.tick_interval_ms,
        )?;
        let timing = CalibrationTiming::new(
            config.countdown_steps,
            config.countdown_interval_ms,
            config.sampling_interval_ms,
            config.sampling_duration_ms,
        )?;
        if config.ui_refresh_ms == 0 {
            return Err(DriverError::InvalidTickInterval);
        }
        let mut scheduler = Scheduler::new(config.max_timer_lag_ms);
        scheduler.schedule_repeating(TimerKind::DisplayTick, config.tick_interval_ms);
        scheduler.schedule_repeating(TimerKind::UiRefresh, config.ui_refresh_ms);
        info!(
            "pipeline ready: {} ms ticks, {:.1} s window",
            config.tick_interval_ms, config.window_seconds
        );
        Ok(Self {
            source,
            buffer,
            calibration: CalibrationController::new(timing, tx.clone()),
            scheduler,
            readout: Readout::default(),
            connected: false,
            tx,
        })
    }
    /// Runs every timer due up to `now_ms` (milliseconds since start).
    pub fn advance_to(&mut self, now_ms: u64) {
        while let Some(fired) = self.scheduler.pop_due(now_ms) {
            match fired.kind {
                TimerKind::DisplayTick => {
                    let raw = self.source.next_sample();
                    self.buffer.ingest(raw);
                }
                TimerKind::UiRefresh => {
                    self.readout = Readout {
                        raw: self.buffer.last_raw(),
                        offset: self.buffer.offset(),
                    };
                }
                TimerKind::CountdownTick
                | TimerKind::SamplingTick
                | TimerKind::SamplingFinished => {
                    self.calibration
                        .handle(fired, &mut self.scheduler, &mut self.buffer);
                }
            }
        }
    }
    pub fn apply(&mut self, cmd: GuiCommand) {
        match cmd {
            GuiCommand::StartCalibration => {
                if self.calibration.start(&mut self.scheduler) {
                    self.tx
                        .send(BeltMessage::Log("Kalibrierung gestartet".to_owned()))
                        .ok();
                }
            }
            GuiCommand::ResetOffset => {
                self.calibration.reset(&mut self.scheduler, &mut self.buffer);
                self.readout.offset = self.buffer.offset();
            }
        }
    }
    pub fn is_connected(&self) -> bool {
        self.connected
    }
    /// Latest status for the top bar: the last calibration announcement, else
    /// the connection state.
    pub fn status_text(&self) -> StatusText {
        self.calibration.status_text().unwrap_or(if self.connected {
            StatusText::Connected
        } else {
            StatusText::Offline
        })
    }
    pub fn buffer(&self) -> &DisplayBuffer {
        &self.buffer
    }
    pub fn calibration_status(&self) -> CalibrationStatus {
        self.calibration.status()
    }
    pub fn readout(&self) -> Readout {
        self.readout
    }
}
