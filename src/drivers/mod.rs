// src/drivers/mod.rs
// 声明同级目录下的子模块文件
pub mod buffer;
pub mod calibration;
pub mod error;
pub mod offset;
pub mod pipeline;
pub mod scheduler;
pub mod source;
// 公开导出这些模块里的结构体，方便外部调用
pub use buffer::{padded_range, DisplayBuffer, SamplePoint, MAX_WINDOW_SECONDS};
pub use calibration::{
    CalibrationController, CalibrationEvent, CalibrationPhase, CalibrationStatus,
    CalibrationTiming,
};
pub use error::DriverError;
pub use offset::corrected;
pub use pipeline::{BreathPipeline, Readout};
pub use scheduler::{Fired, Scheduler, TimerKind, TimerToken};
pub use source::{FakeBreathSource, ManualSource, SignalSource};
