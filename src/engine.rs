use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use crate::drivers::{
    Acquisition, AxisRange, PlotterError, ReadError, RefreshHook, SampleSource, Scene,
    SceneStyle, Series, SeriesStore, SourceSpec, Transformer, Viewport,
};
use crate::types::{AcquisitionEvent, Command, RunId, RunState};

/// Owns the series and drives acquisition runs.
///
/// All store mutation happens in `pump`, on whichever thread owns the engine.
/// The acquisition thread only ever sends events.
pub struct PlotEngine {
    store: SeriesStore,
    transformer: Box<dyn Transformer>,
    state: RunState,
    active: Option<Acquisition>,
    events_tx: Sender<AcquisitionEvent>,
    events_rx: Receiver<AcquisitionEvent>,
    next_run: RunId,
    refresh: Option<RefreshHook>,
    style: SceneStyle,
}

impl PlotEngine {
    pub fn new(transformer: Box<dyn Transformer>) -> Self {
        let (events_tx, events_rx) = channel();
        Self {
            store: SeriesStore::new(),
            transformer,
            state: RunState::Idle,
            active: None,
            events_tx,
            events_rx,
            next_run: 1,
            refresh: None,
            style: SceneStyle::default(),
        }
    }

    pub fn with_style(mut self, style: SceneStyle) -> Self {
        self.style = style;
        self
    }

    /// Installed hook is handed to every run started afterwards.
    pub fn set_refresh_hook(&mut self, hook: impl Fn() + Send + Sync + 'static) {
        self.refresh = Some(Arc::new(hook));
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn values(&self) -> &[f32] {
        self.store.values()
    }

    pub fn snapshot(&self) -> Series {
        self.store.snapshot()
    }

    pub fn transformer_name(&self) -> &str {
        self.transformer.name()
    }

    /// Swaps the transformer. The new one starts from its own initial state.
    pub fn set_transformer(&mut self, transformer: Box<dyn Transformer>) {
        log::debug!(
            "transform {} -> {}",
            self.transformer.name(),
            transformer.name()
        );
        self.transformer = transformer;
    }

    pub fn apply(&mut self, command: Command) -> Result<(), PlotterError> {
        match command {
            Command::Start(spec) => self.start(&spec),
            Command::Stop => {
                self.stop();
                Ok(())
            }
            Command::Clear => {
                self.clear();
                Ok(())
            }
        }
    }

    pub fn start(&mut self, spec: &SourceSpec) -> Result<(), PlotterError> {
        if self.state == RunState::Running {
            return Err(PlotterError::AlreadyRunning);
        }
        let source = spec.open()?;
        self.start_source(source)
    }

    /// Starts a run on an already opened source.
    pub fn start_source(&mut self, source: Box<dyn SampleSource>) -> Result<(), PlotterError> {
        if self.state == RunState::Running {
            return Err(PlotterError::AlreadyRunning);
        }
        if let Some(previous) = self.active.take() {
            if previous.is_finished() {
                log::debug!("run {} exited; dropping its pending events", previous.run());
            } else {
                log::warn!(
                    "abandoning run {} ({}) before it acknowledged stop",
                    previous.run(),
                    previous.description()
                );
            }
        }
        let run = self.next_run;
        self.next_run += 1;
        let acquisition = Acquisition::spawn(
            run,
            source,
            self.events_tx.clone(),
            self.refresh.clone(),
        )?;
        log::info!("run {run} started on {}", acquisition.description());
        self.active = Some(acquisition);
        self.state = RunState::Running;
        Ok(())
    }

    /// Asks the current run to stop; the engine turns Idle once it has.
    pub fn stop(&mut self) {
        if let Some(acquisition) = &self.active {
            if self.state == RunState::Running {
                log::info!("stopping run {}", acquisition.run());
                acquisition.request_stop();
                self.state = RunState::Stopping;
            }
        }
    }

    pub fn clear(&mut self) {
        log::debug!("clearing {} samples", self.store.len());
        self.store.clear();
        if let Some(refresh) = &self.refresh {
            refresh();
        }
    }

    /// Applies every queued event without blocking. Returns how many values
    /// were appended, or the read error that ended the current run.
    pub fn pump(&mut self) -> Result<usize, PlotterError> {
        self.drain(None)
    }

    /// Like `pump`, but waits up to `timeout` for the first event.
    pub fn pump_timeout(&mut self, timeout: Duration) -> Result<usize, PlotterError> {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => self.drain(Some(event)),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => Ok(0),
        }
    }

    pub fn axis(&self, viewport: Viewport) -> AxisRange {
        AxisRange::compute(self.store.values(), viewport)
    }

    pub fn scene(&self, viewport: Viewport) -> Option<Scene> {
        Scene::build(self.store.values(), viewport, &self.style)
    }

    fn drain(&mut self, first: Option<AcquisitionEvent>) -> Result<usize, PlotterError> {
        let mut appended = 0;
        let mut failure = None;
        let mut pending = first;
        loop {
            let event = match pending.take() {
                Some(event) => event,
                None => match self.events_rx.try_recv() {
                    Ok(event) => event,
                    Err(_) => break,
                },
            };
            if let Some(error) = self.handle(event, &mut appended) {
                failure = Some(error);
            }
        }
        match failure {
            Some(error) => Err(PlotterError::Read(error)),
            None => Ok(appended),
        }
    }

    fn handle(&mut self, event: AcquisitionEvent, appended: &mut usize) -> Option<ReadError> {
        let current = self.active.as_ref().map(Acquisition::run);
        if current != Some(event.run()) {
            log::debug!("discarding event from stale run {}", event.run());
            return None;
        }
        match event {
            AcquisitionEvent::Sample { value, .. } => {
                let emitted = self.transformer.compute(self.store.values(), value);
                self.store.append(emitted);
                *appended += 1;
                None
            }
            AcquisitionEvent::Finished { run } => {
                log::info!("run {run} finished with {} samples", self.store.len());
                self.active = None;
                self.state = RunState::Idle;
                None
            }
            AcquisitionEvent::Failed { run, error } => {
                log::error!("run {run} failed: {error}");
                self.active = None;
                self.state = RunState::Idle;
                Some(error)
            }
        }
    }
}
