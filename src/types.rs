use crate::drivers::{ReadError, SourceSpec};

/// Identifies one Start-to-Stop lifecycle of the acquisition loop.
pub type RunId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    /// Stop requested; waiting for the acquisition thread to acknowledge.
    Stopping,
}

/// Front end -> engine.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Start(SourceSpec),
    Stop,
    Clear,
}

/// Acquisition thread -> engine. Every event carries the run that produced it.
#[derive(Debug)]
pub enum AcquisitionEvent {
    Sample { run: RunId, value: f32 },
    Failed { run: RunId, error: ReadError },
    Finished { run: RunId },
}

impl AcquisitionEvent {
    pub fn run(&self) -> RunId {
        match self {
            AcquisitionEvent::Sample { run, .. }
            | AcquisitionEvent::Failed { run, .. }
            | AcquisitionEvent::Finished { run } => *run,
        }
    }
}

/// Which kind of source the front end is configured for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SourceKind {
    Dummy,
    Serial,
}

impl SourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Dummy => "Dummy",
            SourceKind::Serial => "Serial",
        }
    }
}
