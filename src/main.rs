#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
use anyhow::{anyhow, Context, Result};
use eframe::egui;
use serial_plotter::gui::PlotterApp;
use serial_plotter::PlotterConfig;

fn load_config() -> Result<PlotterConfig> {
    let config = match std::env::args_os().nth(1) {
        Some(path) => PlotterConfig::load(path)?,
        None => PlotterConfig::default(),
    };
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::init();
    let config = load_config()?;
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([config.window_width, config.window_height])
        .with_title("Serial Plotter");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    let mut app = PlotterApp::new(config)?;
    eframe::run_native(
        "Serial Plotter",
        options,
        Box::new(move |cc| {
            app.attach(&cc.egui_ctx);
            Box::new(app)
        }),
    )
    .map_err(|err| anyhow!("failed to run the plotter window: {err}"))
}
