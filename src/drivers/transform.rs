use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::drivers::PlotterError;

/// Maps each incoming sample to the value that gets appended to the series.
///
/// `history` is the full emitted sequence so far. Implementations may keep
/// private state; it lives as long as the instance does.
pub trait Transformer: Send {
    fn compute(&mut self, history: &[f32], incoming: f32) -> f32;

    fn name(&self) -> &str;
}

pub struct Passthrough;

impl Transformer for Passthrough {
    fn compute(&mut self, _history: &[f32], incoming: f32) -> f32 {
        incoming
    }

    fn name(&self) -> &str {
        PASSTHROUGH
    }
}

/// Recurrent simple moving average.
///
/// The previous emitted value is the running estimate. Each step adds the new
/// sample and subtracts the oldest value still inside the window, both scaled
/// by the current effective window size. It is never re-summed, so it drifts
/// from the exact windowed mean over time.
pub struct MovingAverage {
    window: usize,
}

impl MovingAverage {
    pub fn new(window: usize) -> Result<Self, PlotterError> {
        if window == 0 {
            return Err(PlotterError::InvalidConfiguration(
                "moving average window must be at least 1".into(),
            ));
        }
        Ok(Self { window })
    }
}

impl Transformer for MovingAverage {
    fn compute(&mut self, history: &[f32], incoming: f32) -> f32 {
        let Some(&prev) = history.last() else {
            return incoming;
        };
        let len = history.len();
        let m = self.window.min(len + 1);
        // A one-wide window holds only the newest sample.
        if m == 1 {
            return incoming;
        }
        prev + 1.0 / m as f32 * (incoming - history[len + 1 - m])
    }

    fn name(&self) -> &str {
        MOVING_AVERAGE
    }
}

/// Adds normally distributed noise to every sample.
pub struct GaussianNoise {
    distribution: Normal<f64>,
    rng: StdRng,
}

impl GaussianNoise {
    pub fn new(mean: f32, std_dev: f32) -> Result<Self, PlotterError> {
        Self::with_rng(mean, std_dev, StdRng::from_entropy())
    }

    pub fn with_seed(mean: f32, std_dev: f32, seed: u64) -> Result<Self, PlotterError> {
        Self::with_rng(mean, std_dev, StdRng::seed_from_u64(seed))
    }

    fn with_rng(mean: f32, std_dev: f32, rng: StdRng) -> Result<Self, PlotterError> {
        if !mean.is_finite() || !std_dev.is_finite() {
            return Err(PlotterError::InvalidConfiguration(format!(
                "noise parameters must be finite (mean {mean}, std dev {std_dev})"
            )));
        }
        let distribution = Normal::new(mean as f64, std_dev as f64).map_err(|err| {
            PlotterError::InvalidConfiguration(format!("invalid noise std dev {std_dev}: {err}"))
        })?;
        Ok(Self { distribution, rng })
    }
}

impl Transformer for GaussianNoise {
    fn compute(&mut self, _history: &[f32], incoming: f32) -> f32 {
        incoming + self.distribution.sample(&mut self.rng) as f32
    }

    fn name(&self) -> &str {
        GAUSSIAN_NOISE
    }
}

pub const PASSTHROUGH: &str = "None";
pub const MOVING_AVERAGE: &str = "Simple Moving Average";
pub const GAUSSIAN_NOISE: &str = "Gaussian Noise";

type Constructor = Box<dyn Fn() -> Result<Box<dyn Transformer>, PlotterError> + Send + Sync>;

/// Display name -> transformer constructor.
pub struct TransformRegistry {
    entries: Vec<(String, Constructor)>,
}

impl TransformRegistry {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The three built-in transforms, parameterised by the caller.
    pub fn with_defaults(sma_window: usize, noise_mean: f32, noise_std_dev: f32) -> Self {
        let mut registry = Self::empty();
        registry.register(PASSTHROUGH, || Ok(Box::new(Passthrough)));
        registry.register(MOVING_AVERAGE, move || {
            Ok(Box::new(MovingAverage::new(sma_window)?))
        });
        registry.register(GAUSSIAN_NOISE, move || {
            Ok(Box::new(GaussianNoise::new(noise_mean, noise_std_dev)?))
        });
        registry
    }

    /// Adds or replaces the constructor registered under `name`.
    pub fn register<F>(&mut self, name: &str, constructor: F)
    where
        F: Fn() -> Result<Box<dyn Transformer>, PlotterError> + Send + Sync + 'static,
    {
        let constructor: Constructor = Box::new(constructor);
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = constructor,
            None => self.entries.push((name.to_owned(), constructor)),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn build(&self, name: &str) -> Result<Box<dyn Transformer>, PlotterError> {
        let (_, constructor) = self
            .entries
            .iter()
            .find(|(n, _)| n == name)
            .ok_or_else(|| PlotterError::UnknownTransform(name.to_owned()))?;
        constructor()
    }
}
