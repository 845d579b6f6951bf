use thiserror::Error;
#[derive(Debug, Error, PartialEq)]
pub enum DriverError {
    #[error("tick interval must be between 1 and 60000 ms")]
    InvalidTickInterval,
    #[error("display window must be a positive number of seconds up to six hours, got {0}")]
    InvalidWindow(f64),
    #[error("retention must be a finite number of seconds up to six hours, got {0}")]
    InvalidRetention(f64),
    #[error("calibration timing invalid: {0}")]
    InvalidCalibrationTiming(String),
}
