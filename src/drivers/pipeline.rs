use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;

use crate::drivers::source::SampleSource;
use crate::drivers::{PlotterError, ReadError};
use crate::types::{AcquisitionEvent, RunId};

/// Called by the acquisition thread whenever it has handed something over.
pub type RefreshHook = Arc<dyn Fn() + Send + Sync>;

/// Cooperative stop flag shared with an acquisition thread.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Handle to one acquisition run.
///
/// The thread owns the source. Stopping is advisory: the flag is checked
/// between reads, so a read that is blocked inside the source is abandoned
/// rather than interrupted. Dropping the handle requests a stop and detaches.
pub struct Acquisition {
    run: RunId,
    stop: StopSignal,
    handle: Option<thread::JoinHandle<()>>,
    description: String,
}

impl Acquisition {
    pub fn spawn(
        run: RunId,
        mut source: Box<dyn SampleSource>,
        events: Sender<AcquisitionEvent>,
        refresh: Option<RefreshHook>,
    ) -> Result<Self, PlotterError> {
        let stop = StopSignal::default();
        let thread_stop = stop.clone();
        let description = source.describe();
        let name = description.clone();
        let handle = thread::Builder::new()
            .name(format!("acquisition-{run}"))
            .spawn(move || {
                log::info!("[run {run}] acquiring from {name}");
                let outcome = pump_source(run, source.as_mut(), &thread_stop, &events, &refresh);
                if let Err(err) = source.close() {
                    log::warn!("[run {run}] failed to close {name}: {err}");
                }
                let last = match outcome {
                    Ok(()) => {
                        log::info!("[run {run}] stopped");
                        AcquisitionEvent::Finished { run }
                    }
                    Err(error) => {
                        log::error!("[run {run}] read from {name} failed: {error}");
                        AcquisitionEvent::Failed { run, error }
                    }
                };
                // The engine may already be gone; nothing left to report to.
                let _ = events.send(last);
                if let Some(refresh) = &refresh {
                    refresh();
                }
            })
            .map_err(PlotterError::Spawn)?;
        Ok(Self {
            run,
            stop,
            handle: Some(handle),
            description,
        })
    }

    pub fn run(&self) -> RunId {
        self.run
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn request_stop(&self) {
        self.stop.request();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }
}

impl Drop for Acquisition {
    fn drop(&mut self) {
        self.stop.request();
        // Detach: a source blocked in `next` must not block whoever drops us.
        self.handle.take();
    }
}

fn pump_source(
    run: RunId,
    source: &mut dyn SampleSource,
    stop: &StopSignal,
    events: &Sender<AcquisitionEvent>,
    refresh: &Option<RefreshHook>,
) -> Result<(), ReadError> {
    while !stop.is_requested() {
        let Some(value) = source.next()? else {
            continue;
        };
        if stop.is_requested() {
            log::debug!("[run {run}] dropping sample read after stop request");
            break;
        }
        if events.send(AcquisitionEvent::Sample { run, value }).is_err() {
            log::debug!("[run {run}] consumer hung up");
            break;
        }
        if let Some(refresh) = refresh {
            refresh();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::source::ManualSource;
    use std::sync::mpsc::channel;
    use std::time::Duration;

    fn collect_run(rx: &std::sync::mpsc::Receiver<AcquisitionEvent>) -> Vec<AcquisitionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.recv_timeout(Duration::from_secs(5)) {
            let done = !matches!(event, AcquisitionEvent::Sample { .. });
            events.push(event);
            if done {
                break;
            }
        }
        events
    }

    #[test]
    fn forwards_samples_then_reports_failure() {
        let (tx, rx) = channel();
        let source = ManualSource::scripted([Ok(Some(1.0)), Ok(None), Ok(Some(2.0))]);
        let closed = source.closed_flag();
        let _acq = Acquisition::spawn(7, Box::new(source), tx, None).unwrap();
        let events = collect_run(&rx);
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], AcquisitionEvent::Sample { run: 7, value } if value == 1.0));
        assert!(matches!(events[1], AcquisitionEvent::Sample { run: 7, value } if value == 2.0));
        assert!(matches!(
            events[2],
            AcquisitionEvent::Failed {
                run: 7,
                error: ReadError::Disconnected
            }
        ));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn stop_signal_ends_the_run() {
        let (tx, rx) = channel();
        let source = crate::drivers::DummySource::new(
            Duration::from_millis(1),
            crate::drivers::WaveFunction::Constant,
        );
        let acq = Acquisition::spawn(1, Box::new(source), tx, None).unwrap();
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            AcquisitionEvent::Sample { .. }
        ));
        acq.request_stop();
        let events = collect_run(&rx);
        assert!(matches!(events.last(), Some(AcquisitionEvent::Finished { run: 1 })));
        for _ in 0..100 {
            if acq.is_finished() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(acq.is_finished());
    }

    #[test]
    fn refresh_hook_fires_per_sample() {
        use std::sync::atomic::AtomicUsize;
        let (tx, rx) = channel();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let hook: RefreshHook = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let source = ManualSource::new([1.0, 2.0, 3.0]);
        let _acq = Acquisition::spawn(2, Box::new(source), tx, Some(hook)).unwrap();
        collect_run(&rx);
        // The final hook call happens after the last event is sent.
        for _ in 0..100 {
            if hits.load(Ordering::SeqCst) >= 4 {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }
}
