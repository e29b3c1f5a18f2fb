//! Auto-scaling axis model.
//!
//! Everything here is recomputed from the full series on every render. The
//! value axis grows upward while pixel rows grow downward, so values are
//! always mapped onto `[height, 0]`.

/// Domain used while the series is empty.
pub const DEFAULT_DOMAIN: (f32, f32) = (-10.0, 10.0);

/// Upper bound on horizontal label density, in labels per pixel.
pub const MAX_LABEL_DENSITY: f32 = 0.02;

// 10^38 is the largest power of ten an f32 can hold.
const MAX_UNIT_EXPONENT: u32 = 38;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Whether anything can be drawn into this viewport without dividing by zero.
    pub fn is_drawable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Maps `value` from `[in_min, in_max]` onto `[out_min, out_max]`. No rounding.
pub fn linear_map(value: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    out_min + (out_max - out_min) / (in_max - in_min) * (value - in_min)
}

/// Smallest stride keeping horizontal labels at or below one per ~50 px.
///
/// Returns 1 for an empty series or a viewport with no width.
pub fn label_stride(sample_count: usize, width: f32) -> usize {
    if sample_count == 0 || !(width > 0.0) || !width.is_finite() {
        return 1;
    }
    let density = |stride: usize| sample_count as f32 / stride as f32 / width;
    let estimate = (sample_count as f32 / (MAX_LABEL_DENSITY * width)).floor() as usize;
    let mut stride = estimate.saturating_sub(1).max(1);
    while density(stride) > MAX_LABEL_DENSITY {
        stride += 1;
    }
    stride
}

/// Derived coordinate system for one render.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisRange {
    /// Observed minimum (or the default domain's).
    pub min: f32,
    pub max: f32,
    /// Bounds actually mapped onto the plot height, padded by half a unit.
    pub realized_min: f32,
    pub realized_max: f32,
    /// Power-of-ten tick spacing.
    pub unit: f32,
    pub tick_count: usize,
    pub tick_min: f32,
    pub tick_max: f32,
    /// Pixel row of value 0.
    pub zero_row: f32,
}

impl AxisRange {
    pub fn compute(values: &[f32], viewport: Viewport) -> Self {
        let (min, max) = observed_bounds(values).unwrap_or(DEFAULT_DOMAIN);
        let unit = tick_unit(min, max);
        let realized_min = min - unit / 2.0;
        let realized_max = max + unit / 2.0;
        let zero_row = linear_map(0.0, realized_min, realized_max, viewport.height, 0.0);
        let tick_min = round_to_unit(min, unit);
        let tick_max = round_to_unit(max, unit);
        let tick_count = (span(min, max) / unit as f64).round() as usize + 1;
        Self {
            min,
            max,
            realized_min,
            realized_max,
            unit,
            tick_count,
            tick_min,
            tick_max,
            zero_row,
        }
    }

    /// Pixel row for `value` in a plot `height` units tall.
    pub fn row_of(&self, value: f32, height: f32) -> f32 {
        linear_map(value, self.realized_min, self.realized_max, height, 0.0)
    }

    /// Tick values from `tick_min` to `tick_max`, evenly spread over `tick_count`.
    pub fn ticks(&self) -> Vec<f32> {
        if self.tick_count <= 1 {
            return vec![self.tick_min];
        }
        let last = (self.tick_count - 1) as f32;
        (0..self.tick_count)
            .map(|i| linear_map(i as f32, 0.0, last, self.tick_min, self.tick_max))
            .collect()
    }
}

fn observed_bounds(values: &[f32]) -> Option<(f32, f32)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// `|max - min|`, falling back to f64 arithmetic when the f32 difference overflows.
fn span(min: f32, max: f32) -> f64 {
    let narrow = (max - min).abs();
    if narrow.is_finite() {
        narrow as f64
    } else {
        (max as f64 - min as f64).abs()
    }
}

fn tick_unit(min: f32, max: f32) -> f32 {
    let mut magnitude = span(min, max);
    let mut unit = 1.0f64;
    let mut exponent = 0;
    while magnitude / 10.0 > 1.0 && exponent < MAX_UNIT_EXPONENT {
        magnitude /= 10.0;
        unit *= 10.0;
        exponent += 1;
    }
    unit as f32
}

fn round_to_unit(value: f32, unit: f32) -> f32 {
    ((value / unit) as f64).round() as f32 * unit
}
