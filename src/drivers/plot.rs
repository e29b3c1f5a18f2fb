use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::drivers::error::PlotterError;
use crate::drivers::render::{Anchor, Point, Scene};

#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub background: RGBColor,
    /// Axes, ticks and labels.
    pub foreground: RGBColor,
    pub trace: RGBColor,
    /// Labels need a system font; headless exports can turn them off.
    pub draw_labels: bool,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            background: RGBColor(10, 10, 10),
            foreground: WHITE,
            trace: RGBColor(80, 160, 255),
            draw_labels: true,
        }
    }
}

/// Draws `scene` at its own viewport size and encodes it as PNG.
pub fn render_scene_png(scene: &Scene, style: PlotStyle) -> Result<Vec<u8>, PlotterError> {
    if !scene.viewport.is_drawable() {
        return Err(PlotterError::Plot("scene has an empty viewport".into()));
    }
    let width = scene.viewport.width.round().max(1.0) as u32;
    let height = scene.viewport.height.round().max(1.0) as u32;
    let mut buffer = vec![0u8; (width * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&style.background)?;
        for segment in scene.frame_segments() {
            root.draw(&PathElement::new(
                vec![pixel(segment.from), pixel(segment.to)],
                &style.foreground,
            ))?;
        }
        if !scene.trace.is_empty() {
            let mut path = Vec::with_capacity(scene.trace.len() + 1);
            path.push(pixel(scene.trace[0].from));
            path.extend(scene.trace.iter().map(|s| pixel(s.to)));
            root.draw(&PathElement::new(path, &style.trace))?;
        }
        if style.draw_labels {
            for label in scene.labels() {
                let pos = match label.anchor {
                    Anchor::LeftCenter => Pos::new(HPos::Left, VPos::Center),
                    Anchor::CenterTop => Pos::new(HPos::Center, VPos::Top),
                };
                let font = ("sans-serif", 12)
                    .into_font()
                    .color(&style.foreground)
                    .pos(pos);
                root.draw(&Text::new(label.text.clone(), pixel(label.position), font))?;
            }
        }
        root.present()?;
    }
    encode_png(&buffer, width, height)
}

fn pixel(point: Point) -> (i32, i32) {
    (point.x.round() as i32, point.y.round() as i32)
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, PlotterError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| PlotterError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    DynamicImage::ImageRgb8(image).write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
