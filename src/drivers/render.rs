use crate::drivers::axis::{label_stride, linear_map, AxisRange, Viewport};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
}

impl Segment {
    pub fn new(from: Point, to: Point) -> Self {
        Self { from, to }
    }
}

/// Which point of the label's box sits on `Label::position`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    LeftCenter,
    CenterTop,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub text: String,
    pub position: Point,
    pub anchor: Anchor,
}

/// Layout constants that depend on the display surface's font.
#[derive(Clone, Copy, Debug)]
pub struct SceneStyle {
    /// Approximate advance of one label character.
    pub glyph_width: f32,
    /// Space between the widest Y label and the Y axis.
    pub label_gap: f32,
    /// Tick length as a fraction of the larger viewport side.
    pub tick_ratio: f32,
    /// Extra space between an X tick and its label.
    pub label_drop: f32,
}

impl Default for SceneStyle {
    fn default() -> Self {
        Self {
            glyph_width: 7.0,
            label_gap: 10.0,
            tick_ratio: 0.0125,
            label_drop: 3.0,
        }
    }
}

/// Everything needed to draw one frame of the chart.
#[derive(Clone, Debug)]
pub struct Scene {
    pub viewport: Viewport,
    pub axis: AxisRange,
    pub x_axis: Segment,
    pub y_axis: Segment,
    pub y_ticks: Vec<Segment>,
    pub y_labels: Vec<Label>,
    pub x_ticks: Vec<Segment>,
    pub x_labels: Vec<Label>,
    /// One segment per pair of consecutive samples.
    pub trace: Vec<Segment>,
}

impl Scene {
    /// Lays out the whole chart for `values` inside `viewport`.
    ///
    /// Returns `None` when the viewport has no area.
    pub fn build(values: &[f32], viewport: Viewport, style: &SceneStyle) -> Option<Scene> {
        if !viewport.is_drawable() {
            return None;
        }
        let axis = AxisRange::compute(values, viewport);
        let Viewport { width, height } = viewport;
        let offset = y_axis_offset(&axis, style);
        let tick_length = style.tick_ratio * width.max(height);

        let x_axis = Segment::new(
            Point::new(offset, axis.zero_row),
            Point::new(width, axis.zero_row),
        );
        let y_axis = Segment::new(Point::new(offset, 0.0), Point::new(offset, height));

        let mut y_ticks = Vec::with_capacity(axis.tick_count);
        let mut y_labels = Vec::with_capacity(axis.tick_count);
        for value in axis.ticks() {
            let row = axis.row_of(value, height);
            y_ticks.push(Segment::new(
                Point::new(offset + tick_length, row),
                Point::new(offset, row),
            ));
            y_labels.push(Label {
                text: format!("{}", value.round() as i64),
                position: Point::new(0.0, row),
                anchor: Anchor::LeftCenter,
            });
        }

        let count = values.len();
        let x_of = |index: usize| linear_map(index as f32, 0.0, count as f32, offset, width);
        let mut x_ticks = Vec::new();
        let mut x_labels = Vec::new();
        if count > 0 {
            let stride = label_stride(count, width);
            for index in (0..count).step_by(stride) {
                let x = x_of(index);
                x_ticks.push(Segment::new(
                    Point::new(x, axis.zero_row + tick_length / 2.0),
                    Point::new(x, axis.zero_row - tick_length / 2.0),
                ));
                // Index 0 is the origin; it only gets a tick.
                if index != 0 {
                    x_labels.push(Label {
                        text: index.to_string(),
                        position: Point::new(
                            x,
                            axis.zero_row + tick_length / 2.0 + style.label_drop,
                        ),
                        anchor: Anchor::CenterTop,
                    });
                }
            }
        }

        let trace = values
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                Segment::new(
                    Point::new(x_of(i), axis.row_of(pair[0], height)),
                    Point::new(x_of(i + 1), axis.row_of(pair[1], height)),
                )
            })
            .collect();

        Some(Scene {
            viewport,
            axis,
            x_axis,
            y_axis,
            y_ticks,
            y_labels,
            x_ticks,
            x_labels,
            trace,
        })
    }

    /// Axis lines followed by every tick mark.
    pub fn frame_segments(&self) -> impl Iterator<Item = &Segment> {
        [&self.x_axis, &self.y_axis]
            .into_iter()
            .chain(self.y_ticks.iter())
            .chain(self.x_ticks.iter())
    }

    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.y_labels.iter().chain(self.x_labels.iter())
    }
}

fn y_axis_offset(axis: &AxisRange, style: &SceneStyle) -> f32 {
    let widest = [axis.tick_min, axis.tick_max]
        .iter()
        .map(|v| (*v as i64).to_string().chars().count())
        .max()
        .unwrap_or(1);
    widest as f32 * style.glyph_width + style.label_gap
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEW: Viewport = Viewport {
        width: 800.0,
        height: 400.0,
    };

    #[test]
    fn empty_viewport_skips_rendering() {
        let style = SceneStyle::default();
        assert!(Scene::build(&[1.0, 2.0], Viewport::new(0.0, 300.0), &style).is_none());
        assert!(Scene::build(&[1.0, 2.0], Viewport::new(300.0, 0.0), &style).is_none());
        assert!(Scene::build(&[], Viewport::new(f32::NAN, 300.0), &style).is_none());
    }

    #[test]
    fn empty_series_draws_default_frame() {
        let scene = Scene::build(&[], VIEW, &SceneStyle::default()).unwrap();
        let labels: Vec<&str> = scene.y_labels.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(labels, vec!["-10", "0", "10"]);
        assert!(scene.trace.is_empty());
        assert!(scene.x_ticks.is_empty());
        assert!((scene.x_axis.from.y - 200.0).abs() < 1e-3);
        assert_eq!(scene.frame_segments().count(), 2 + 3);
    }

    #[test]
    fn trace_has_one_segment_per_step() {
        let values = [1.0, 4.0, -2.0, 3.5, 0.0];
        let scene = Scene::build(&values, VIEW, &SceneStyle::default()).unwrap();
        assert_eq!(scene.trace.len(), values.len() - 1);
        for pair in scene.trace.windows(2) {
            assert_eq!(pair[0].to, pair[1].from);
        }
    }

    #[test]
    fn single_sample_has_no_segments() {
        let scene = Scene::build(&[3.0], VIEW, &SceneStyle::default()).unwrap();
        assert!(scene.trace.is_empty());
        assert_eq!(scene.x_ticks.len(), 1);
        assert!(scene.x_labels.is_empty());
    }

    #[test]
    fn origin_index_is_never_labeled() {
        let values: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let scene = Scene::build(&values, VIEW, &SceneStyle::default()).unwrap();
        assert_eq!(scene.x_ticks.len(), 10);
        assert_eq!(scene.x_labels.len(), 9);
        assert_eq!(scene.x_labels[0].text, "1");
        assert!(scene.x_labels.iter().all(|l| l.anchor == Anchor::CenterTop));
    }

    #[test]
    fn x_labels_follow_the_stride() {
        let values = vec![0.5f32; 1000];
        let scene = Scene::build(&values, Viewport::new(500.0, 300.0), &SceneStyle::default())
            .unwrap();
        assert_eq!(scene.x_ticks.len(), 10);
        let texts: Vec<&str> = scene.x_labels.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts[0], "100");
        assert_eq!(texts.last(), Some(&"900"));
    }

    #[test]
    fn trace_and_ticks_share_the_mapping() {
        let values = [2.0, 8.0, 5.0];
        let scene = Scene::build(&values, VIEW, &SceneStyle::default()).unwrap();
        for (i, tick) in scene.x_ticks.iter().enumerate().skip(1) {
            assert_eq!(tick.from.x, scene.trace[i - 1].to.x);
        }
        let top = scene.axis.row_of(8.0, VIEW.height);
        assert_eq!(scene.trace[0].to.y, top);
        assert!(scene.trace.iter().all(|s| s.from.y >= 0.0 && s.from.y <= VIEW.height));
    }

    #[test]
    fn y_labels_are_rounded_integers() {
        let values = [-3.0, 97.0];
        let scene = Scene::build(&values, VIEW, &SceneStyle::default()).unwrap();
        let labels: Vec<&str> = scene.y_labels.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(labels.first(), Some(&"0"));
        assert_eq!(labels.last(), Some(&"100"));
        assert_eq!(labels.len(), 11);
    }

    #[test]
    fn y_axis_makes_room_for_labels() {
        let style = SceneStyle::default();
        let scene = Scene::build(&[-12345.0, 5.0], VIEW, &style).unwrap();
        let expected = "-10000".len() as f32 * style.glyph_width + style.label_gap;
        assert_eq!(scene.y_axis.from.x, expected);
        assert_eq!(scene.x_axis.from.x, expected);
        assert_eq!(scene.x_axis.to.x, VIEW.width);
    }
}
