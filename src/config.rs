use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::drivers::{
    parse_baud, GaussianNoise, MovingAverage, PlotterError, SourceSpec, TransformRegistry,
    WaveFunction, DEFAULT_BAUD,
};
use crate::types::SourceKind;

/// Start-up settings for the plotter. Every field has a default, so an empty
/// JSON object is a valid config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotterConfig {
    pub source: SourceKind,
    pub port: String,
    /// Kept as text so a bad value in the file is reported, not rejected by serde.
    pub baud: String,
    pub read_timeout_ms: u64,
    pub function: String,
    pub dummy_delay_ms: u64,
    pub transform: String,
    pub sma_window: usize,
    pub noise_mean: f32,
    pub noise_stddev: f32,
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for PlotterConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Dummy,
            port: String::new(),
            baud: DEFAULT_BAUD.to_string(),
            read_timeout_ms: 100,
            function: WaveFunction::Sine.display_name().to_owned(),
            dummy_delay_ms: 250,
            transform: crate::drivers::PASSTHROUGH.to_owned(),
            sma_window: 3,
            noise_mean: 0.0,
            noise_stddev: 1.0,
            window_width: 800.0,
            window_height: 800.0,
        }
    }
}

impl PlotterConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Checks everything that can be checked before a run starts.
    pub fn validate(&self) -> Result<(), PlotterError> {
        parse_baud(&self.baud)?;
        WaveFunction::from_name(&self.function)?;
        if !(self.window_width > 0.0 && self.window_height > 0.0) {
            return Err(PlotterError::InvalidConfiguration(format!(
                "window size {}x{} has no area",
                self.window_width, self.window_height
            )));
        }
        MovingAverage::new(self.sma_window)?;
        GaussianNoise::with_seed(self.noise_mean, self.noise_stddev, 0)?;
        if !self.registry().contains(&self.transform) {
            return Err(PlotterError::UnknownTransform(self.transform.clone()));
        }
        Ok(())
    }

    pub fn registry(&self) -> TransformRegistry {
        TransformRegistry::with_defaults(self.sma_window, self.noise_mean, self.noise_stddev)
    }

    pub fn source_spec(&self) -> Result<SourceSpec, PlotterError> {
        Ok(match self.source {
            SourceKind::Dummy => SourceSpec::Dummy {
                function: WaveFunction::from_name(&self.function)?,
                delay: Duration::from_millis(self.dummy_delay_ms),
            },
            SourceKind::Serial => SourceSpec::Serial {
                port: self.port.clone(),
                baud: parse_baud(&self.baud)?,
                timeout: Duration::from_millis(self.read_timeout_ms),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PlotterConfig::default();
        config.validate().unwrap();
        assert_eq!(
            config.source_spec().unwrap(),
            SourceSpec::Dummy {
                function: WaveFunction::Sine,
                delay: Duration::from_millis(250),
            }
        );
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: PlotterConfig =
            serde_json::from_str(r#"{"source":"Serial","port":"/dev/ttyUSB0","baud":"115200"}"#)
                .unwrap();
        assert_eq!(config.sma_window, 3);
        assert_eq!(
            config.source_spec().unwrap(),
            SourceSpec::Serial {
                port: "/dev/ttyUSB0".into(),
                baud: 115200,
                timeout: Duration::from_millis(100),
            }
        );
    }

    #[test]
    fn rejects_bad_values() {
        let bad_baud = PlotterConfig {
            baud: "fast".into(),
            ..PlotterConfig::default()
        };
        assert!(matches!(
            bad_baud.validate(),
            Err(PlotterError::InvalidConfiguration(_))
        ));

        let bad_function = PlotterConfig {
            function: "Triangle".into(),
            ..PlotterConfig::default()
        };
        assert!(matches!(
            bad_function.validate(),
            Err(PlotterError::UnknownFunction(_))
        ));

        let bad_transform = PlotterConfig {
            transform: "Kalman".into(),
            ..PlotterConfig::default()
        };
        assert!(matches!(
            bad_transform.validate(),
            Err(PlotterError::UnknownTransform(_))
        ));

        let bad_noise = PlotterConfig {
            noise_stddev: -1.0,
            ..PlotterConfig::default()
        };
        assert!(bad_noise.validate().is_err());

        let no_window = PlotterConfig {
            window_width: 0.0,
            ..PlotterConfig::default()
        };
        assert!(no_window.validate().is_err());
    }

    #[test]
    fn one_wide_moving_average_is_accepted() {
        let config = PlotterConfig {
            transform: "Simple Moving Average".into(),
            sma_window: 1,
            ..PlotterConfig::default()
        };
        config.validate().unwrap();
        let mut sma = config.registry().build(&config.transform).unwrap();
        assert_eq!(sma.compute(&[3.0], 7.0), 7.0);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = PlotterConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }

    #[test]
    fn load_reads_json_file() {
        let name = format!("plotter-config-{}.json", std::process::id());
        let path = std::env::temp_dir().join(name);
        fs::write(&path, r#"{"transform":"Simple Moving Average","sma_window":5}"#).unwrap();
        let config = PlotterConfig::load(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(config.sma_window, 5);
        let transformer = config.registry().build(&config.transform).unwrap();
        assert_eq!(transformer.name(), "Simple Moving Average");
    }
}
