use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use eframe::egui;
use egui::{Align2, Color32, FontId, Pos2, Stroke};

use crate::config::PlotterConfig;
use crate::drivers::{
    list_ports, render_scene_png, Anchor, PlotStyle, PlotterError, Point, Scene, SceneStyle,
    TransformRegistry, Viewport, WaveFunction, BAUD_OPTIONS,
};
use crate::engine::PlotEngine;
use crate::types::{Command, RunState, SourceKind};

const LOG_LINES: usize = 8;
const TRACE_COLOR: Color32 = Color32::from_rgb(0, 255, 255);
const FRAME_COLOR: Color32 = Color32::from_gray(200);
const LABEL_FONT_SIZE: f32 = 12.0;

/// Scene layout sized for egui's monospace label font.
fn scene_style() -> SceneStyle {
    SceneStyle {
        glyph_width: LABEL_FONT_SIZE * 0.6,
        ..SceneStyle::default()
    }
}

pub struct PlotterApp {
    engine: PlotEngine,
    registry: TransformRegistry,
    /// Current selections; starts as the loaded config.
    settings: PlotterConfig,
    ports: Vec<String>,
    viewport: Viewport,
    log_messages: Vec<String>,
    error: Option<String>,
}

impl PlotterApp {
    pub fn new(config: PlotterConfig) -> Result<Self, PlotterError> {
        let registry = config.registry();
        let transformer = registry.build(&config.transform)?;
        let mut app = Self {
            engine: PlotEngine::new(transformer).with_style(scene_style()),
            registry,
            viewport: Viewport::new(config.window_width, config.window_height),
            settings: config,
            ports: list_ports(),
            log_messages: Vec::new(),
            error: None,
        };
        app.log("Serial Plotter ready.");
        Ok(app)
    }

    /// Lets the acquisition thread wake the UI when new samples arrive.
    pub fn attach(&mut self, ctx: &egui::Context) {
        let ctx = ctx.clone();
        self.engine.set_refresh_hook(move || ctx.request_repaint());
    }

    fn log(&mut self, msg: &str) {
        self.log_messages.push(format!("> {msg}"));
        if self.log_messages.len() > LOG_LINES {
            self.log_messages.remove(0);
        }
    }

    fn report(&mut self, msg: String) {
        self.log(&msg);
        self.error = Some(msg);
    }

    fn toggle_run(&mut self) {
        let command = match self.engine.state() {
            RunState::Running => Command::Stop,
            RunState::Idle | RunState::Stopping => match self.settings.source_spec() {
                Ok(spec) => Command::Start(spec),
                Err(err) => return self.report(err.to_string()),
            },
        };
        let starting = matches!(command, Command::Start(_));
        match self.engine.apply(command) {
            Ok(()) if starting => self.log("Started."),
            Ok(()) => self.log("Stopping..."),
            Err(err) => self.report(err.to_string()),
        }
    }

    fn switch_transform(&mut self) {
        match self.registry.build(&self.settings.transform) {
            Ok(transformer) => {
                self.engine.set_transformer(transformer);
                let msg = format!("Transform: {}", self.settings.transform);
                self.log(&msg);
            }
            Err(err) => self.report(err.to_string()),
        }
    }

    fn save_png(&mut self) {
        let Some(scene) = self.engine.scene(self.viewport) else {
            return self.report("nothing to save: plot area is empty".into());
        };
        let path = snapshot_path();
        let result = render_scene_png(&scene, PlotStyle::default())
            .map_err(|err| err.to_string())
            .and_then(|png| fs::write(&path, png).map_err(|err| err.to_string()));
        match result {
            Ok(()) => {
                log::info!("saved snapshot to {}", path.display());
                self.log(&format!("Saved {}", path.display()));
            }
            Err(err) => self.report(format!("failed to save {}: {err}", path.display())),
        }
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        let idle = self.engine.state() == RunState::Idle;

        ui.add_enabled_ui(idle, |ui| {
            ui.horizontal(|ui| {
                for kind in [SourceKind::Dummy, SourceKind::Serial] {
                    ui.selectable_value(&mut self.settings.source, kind, kind.label());
                }
            });

            match self.settings.source {
                SourceKind::Dummy => {
                    let mut function = WaveFunction::from_name(&self.settings.function)
                        .unwrap_or(WaveFunction::Sine);
                    egui::ComboBox::from_label("Waveform")
                        .selected_text(function.display_name())
                        .show_ui(ui, |ui| {
                            for f in WaveFunction::ALL {
                                ui.selectable_value(&mut function, f, f.display_name());
                            }
                        });
                    self.settings.function = function.display_name().to_owned();
                }
                SourceKind::Serial => {
                    ui.horizontal(|ui| {
                        let shown = if self.settings.port.is_empty() {
                            "(none)"
                        } else {
                            self.settings.port.as_str()
                        };
                        egui::ComboBox::from_label("Port")
                            .selected_text(shown.to_owned())
                            .show_ui(ui, |ui| {
                                for port in &self.ports {
                                    ui.selectable_value(
                                        &mut self.settings.port,
                                        port.clone(),
                                        port.as_str(),
                                    );
                                }
                            });
                        if ui.button("Refresh").clicked() {
                            self.ports = list_ports();
                        }
                    });
                    egui::ComboBox::from_label("Baud")
                        .selected_text(self.settings.baud.clone())
                        .show_ui(ui, |ui| {
                            for baud in BAUD_OPTIONS {
                                ui.selectable_value(
                                    &mut self.settings.baud,
                                    baud.to_string(),
                                    baud.to_string(),
                                );
                            }
                        });
                }
            }
        });

        let before = self.settings.transform.clone();
        let names: Vec<String> = self.registry.names().map(str::to_owned).collect();
        egui::ComboBox::from_label("Transform")
            .selected_text(self.settings.transform.clone())
            .show_ui(ui, |ui| {
                for name in names {
                    ui.selectable_value(&mut self.settings.transform, name.clone(), name);
                }
            });
        if self.settings.transform != before {
            self.switch_transform();
        }

        ui.add_space(10.0);
        ui.horizontal(|ui| {
            let label = match self.engine.state() {
                RunState::Running => "Stop",
                RunState::Stopping => "Stopping...",
                RunState::Idle => "Start",
            };
            if ui.button(label).clicked() {
                self.toggle_run();
            }
            if ui.button("Clear").clicked() {
                self.engine.apply(Command::Clear).ok();
                self.log("Cleared.");
            }
            if ui.button("Save PNG").clicked() {
                self.save_png();
            }
        });
        ui.label(format!("{} samples", self.engine.values().len()));

        ui.add_space(10.0);
        egui::ScrollArea::vertical().max_height(140.0).show(ui, |ui| {
            for m in &self.log_messages {
                ui.monospace(m);
            }
        });
    }
}

impl eframe::App for PlotterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Err(err) = self.engine.pump() {
            self.report(err.to_string());
        }
        if self.engine.state() != RunState::Idle {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        egui::SidePanel::left("controls").min_width(260.0).show(ctx, |ui| {
            ui.add_space(10.0);
            ui.heading("Serial Plotter");
            ui.separator();
            self.controls(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::hover());
            let rect = response.rect;
            self.viewport = Viewport::new(rect.width(), rect.height());
            if let Some(scene) = self.engine.scene(self.viewport) {
                paint_scene(&painter, rect.min, &scene);
            }
        });

        if let Some(msg) = self.error.clone() {
            let mut open = true;
            egui::Window::new("Error")
                .collapsible(false)
                .resizable(false)
                .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
                .open(&mut open)
                .show(ctx, |ui| {
                    ui.colored_label(Color32::LIGHT_RED, msg);
                });
            if !open {
                self.error = None;
            }
        }
    }
}

fn paint_scene(painter: &egui::Painter, origin: Pos2, scene: &Scene) {
    let at = |p: Point| Pos2::new(origin.x + p.x, origin.y + p.y);
    let frame = Stroke::new(1.0, FRAME_COLOR);
    for segment in scene.frame_segments() {
        painter.line_segment([at(segment.from), at(segment.to)], frame);
    }
    let trace = Stroke::new(1.5, TRACE_COLOR);
    for segment in &scene.trace {
        painter.line_segment([at(segment.from), at(segment.to)], trace);
    }
    for label in scene.labels() {
        let align = match label.anchor {
            Anchor::LeftCenter => Align2::LEFT_CENTER,
            Anchor::CenterTop => Align2::CENTER_TOP,
        };
        painter.text(
            at(label.position),
            align,
            &label.text,
            FontId::monospace(LABEL_FONT_SIZE),
            FRAME_COLOR,
        );
    }
}

fn snapshot_path() -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    PathBuf::from(format!("plot-{stamp}.png"))
}
