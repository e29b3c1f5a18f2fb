pub mod config;
pub mod drivers;
pub mod engine;
pub mod gui;
pub mod types;

pub use config::PlotterConfig;
pub use engine::PlotEngine;
