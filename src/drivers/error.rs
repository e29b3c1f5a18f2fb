use thiserror::Error;

/// Failure while pulling a sample from a running source.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("i/o error while reading source: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed frame: {0:?}")]
    MalformedFrame(String),
    #[error("source disconnected")]
    Disconnected,
}

#[derive(Debug, Error)]
pub enum PlotterError {
    #[error("source {source_id:?} unavailable: {reason}")]
    SourceUnavailable { source_id: String, reason: String },
    #[error("read failed: {0}")]
    Read(#[from] ReadError),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("an acquisition run is already active")]
    AlreadyRunning,
    #[error("unknown transform {0:?}")]
    UnknownTransform(String),
    #[error("unknown waveform function {0:?}")]
    UnknownFunction(String),
    #[error("failed to spawn acquisition thread: {0}")]
    Spawn(std::io::Error),
    #[error("failed to render plot: {0}")]
    Plot(String),
}

impl PlotterError {
    pub fn unavailable(source_id: impl Into<String>, reason: impl ToString) -> Self {
        PlotterError::SourceUnavailable {
            source_id: source_id.into(),
            reason: reason.to_string(),
        }
    }
}

impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for PlotterError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        PlotterError::Plot(format!("{value:?}"))
    }
}

impl From<image::ImageError> for PlotterError {
    fn from(value: image::ImageError) -> Self {
        PlotterError::Plot(value.to_string())
    }
}
