use thiserror::Error;

/// Errors produced by the offline analysis pass and configuration handling.
///
/// Runtime anomalies (saturated placement, full pool, empty schedule) are not errors;
/// they are reported through `TickReport` and the logs.
#[derive(Debug, Error)]
pub enum Error {
    #[error("insufficient audio: {samples} samples, calibration needs {required}")]
    InsufficientAudio { samples: usize, required: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("audio output error: {0}")]
    Playback(String),

    #[error("analysis worker exited without a result")]
    AnalysisAborted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
