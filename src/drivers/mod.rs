pub mod axis;
pub mod buffer;
pub mod error;
pub mod pipeline;
pub mod plot;
pub mod render;
pub mod serial;
pub mod source;
pub mod transform;

pub use axis::{label_stride, linear_map, AxisRange, Viewport};
pub use buffer::{Series, SeriesStore};
pub use error::{PlotterError, ReadError};
pub use pipeline::{Acquisition, RefreshHook, StopSignal};
pub use plot::{render_scene_png, PlotStyle};
pub use render::{Anchor, Label, Point, Scene, SceneStyle, Segment};
pub use serial::{list_ports, parse_baud, SerialSource, BAUD_OPTIONS, DEFAULT_BAUD};
pub use source::{DummySource, ManualSource, SampleSource, SourceSpec, WaveFunction};
pub use transform::{
    GaussianNoise, MovingAverage, Passthrough, TransformRegistry, Transformer, GAUSSIAN_NOISE,
    MOVING_AVERAGE, PASSTHROUGH,
};
