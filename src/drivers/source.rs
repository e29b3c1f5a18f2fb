use std::collections::VecDeque;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::drivers::serial::SerialSource;
use crate::drivers::{PlotterError, ReadError};

/// Something that yields scalar samples one at a time.
///
/// `next` may block. `Ok(None)` means nothing arrived within the source's own
/// poll interval; callers are expected to poll again.
pub trait SampleSource: Send {
    fn next(&mut self) -> Result<Option<f32>, ReadError>;

    /// Release the underlying resource. Further reads are not expected.
    fn close(&mut self) -> Result<(), ReadError> {
        Ok(())
    }

    fn describe(&self) -> String;
}

/// How to open a source when a run starts.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceSpec {
    Dummy {
        function: WaveFunction,
        delay: Duration,
    },
    Serial {
        port: String,
        baud: u32,
        timeout: Duration,
    },
}

impl SourceSpec {
    pub fn open(&self) -> Result<Box<dyn SampleSource>, PlotterError> {
        match self {
            SourceSpec::Dummy { function, delay } => {
                Ok(Box::new(DummySource::new(*delay, *function)))
            }
            SourceSpec::Serial {
                port,
                baud,
                timeout,
            } => Ok(Box::new(SerialSource::open(port, *baud, *timeout)?)),
        }
    }
}

/// Synthetic waveforms evaluated at the sample index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaveFunction {
    Sine,
    Square,
    Sawtooth,
    Constant,
    XSinX,
    Neg100X,
}

impl WaveFunction {
    pub const ALL: [WaveFunction; 6] = [
        WaveFunction::Sine,
        WaveFunction::Square,
        WaveFunction::Sawtooth,
        WaveFunction::Constant,
        WaveFunction::XSinX,
        WaveFunction::Neg100X,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            WaveFunction::Sine => "Sine",
            WaveFunction::Square => "Square",
            WaveFunction::Sawtooth => "Sawtooth",
            WaveFunction::Constant => "Constant",
            WaveFunction::XSinX => "X Sin X",
            WaveFunction::Neg100X => "-100 X",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, PlotterError> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.display_name().eq_ignore_ascii_case(name))
            .ok_or_else(|| PlotterError::UnknownFunction(name.to_owned()))
    }

    pub fn evaluate(&self, index: usize) -> f32 {
        let x = index as f64;
        match self {
            WaveFunction::Sine => (10.0 * (x * 2.0 * PI / 30.0).sin()) as f32,
            WaveFunction::Square => {
                let period = 50.0;
                if (x * 2.0 * PI / period).sin() > 0.0 {
                    10.0
                } else {
                    -10.0
                }
            }
            WaveFunction::Sawtooth => {
                let period = 10.0;
                let percent = x / period;
                10.0 * (2.0 * (percent - (0.5 + percent).floor())) as f32
            }
            WaveFunction::Constant => 8.0,
            WaveFunction::XSinX => (0.25 * x * (x * PI / 15.0).sin()) as f32,
            WaveFunction::Neg100X => -100.0 * index as f32,
        }
    }
}

/// Generator source: sleeps `delay` and then emits `function(index)`.
pub struct DummySource {
    index: usize,
    delay: Duration,
    function: WaveFunction,
}

impl DummySource {
    pub fn new(delay: Duration, function: WaveFunction) -> Self {
        Self {
            index: 0,
            delay,
            function,
        }
    }

    pub fn reset_index(&mut self) {
        self.index = 0;
    }
}

impl SampleSource for DummySource {
    fn next(&mut self) -> Result<Option<f32>, ReadError> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let value = self.function.evaluate(self.index);
        self.index += 1;
        Ok(Some(value))
    }

    fn describe(&self) -> String {
        format!("dummy:{}", self.function.display_name())
    }
}

/// Scripted source useful for tests and deterministic playback.
///
/// Reports `ReadError::Disconnected` once the script runs out.
pub struct ManualSource {
    queue: VecDeque<Result<Option<f32>, ReadError>>,
    closed: Arc<AtomicBool>,
}

impl ManualSource {
    pub fn new(values: impl IntoIterator<Item = f32>) -> Self {
        Self::scripted(values.into_iter().map(|v| Ok(Some(v))))
    }

    pub fn scripted(steps: impl IntoIterator<Item = Result<Option<f32>, ReadError>>) -> Self {
        Self {
            queue: steps.into_iter().collect(),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag flipped once the source has been closed.
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }
}

impl SampleSource for ManualSource {
    fn next(&mut self) -> Result<Option<f32>, ReadError> {
        self.queue.pop_front().unwrap_or(Err(ReadError::Disconnected))
    }

    fn close(&mut self) -> Result<(), ReadError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "manual".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_source_walks_the_index() {
        let mut source = DummySource::new(Duration::ZERO, WaveFunction::Neg100X);
        let values: Vec<f32> = (0..3).map(|_| source.next().unwrap().unwrap()).collect();
        assert_eq!(values, vec![0.0, -100.0, -200.0]);
        source.reset_index();
        assert_eq!(source.next().unwrap(), Some(0.0));
    }

    #[test]
    fn waveforms_match_their_shapes() {
        assert_eq!(WaveFunction::Constant.evaluate(42), 8.0);
        assert_eq!(WaveFunction::Sine.evaluate(0), 0.0);
        assert!((WaveFunction::Sine.evaluate(15)).abs() < 1e-5);
        assert!((WaveFunction::Sine.evaluate(7) - 9.945219).abs() < 1e-4);
        assert_eq!(WaveFunction::Square.evaluate(1), 10.0);
        assert_eq!(WaveFunction::Square.evaluate(26), -10.0);
        assert_eq!(WaveFunction::Sawtooth.evaluate(0), 0.0);
        assert!((WaveFunction::Sawtooth.evaluate(4) - 8.0).abs() < 1e-5);
        assert!((WaveFunction::Sawtooth.evaluate(6) + 8.0).abs() < 1e-5);
    }

    #[test]
    fn function_names_round_trip() {
        for f in WaveFunction::ALL {
            assert_eq!(WaveFunction::from_name(f.display_name()).unwrap(), f);
        }
        assert!(matches!(
            WaveFunction::from_name("Triangle"),
            Err(PlotterError::UnknownFunction(_))
        ));
    }

    #[test]
    fn manual_source_disconnects_when_exhausted() {
        let mut source = ManualSource::new([1.0, 2.0]);
        let closed = source.closed_flag();
        assert_eq!(source.next().unwrap(), Some(1.0));
        assert_eq!(source.next().unwrap(), Some(2.0));
        assert!(matches!(source.next(), Err(ReadError::Disconnected)));
        source.close().unwrap();
        assert!(closed.load(Ordering::SeqCst));
    }
}
