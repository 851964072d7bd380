//! Common types and utilities shared across the frame rendering crates.

pub mod bbox;
pub mod config;
pub mod error;
pub mod metadata;
pub mod time;

pub use bbox::BoundingBox;
pub use config::{
    AnimateConfig, CanvasConfig, FontConfig, LayerConfig, LayerType, LegendConfig, MapFormat,
    PaddingConfig, PanelConfig, PositionConfig, RegionConfig, RenderConfig, TextConfig,
    TrueColourVariable, VariableConfig, NULL_VALUE,
};
pub use config::{scale_f32, scale_px};
pub use error::{FrameError, FrameResult};
pub use metadata::{
    FrameTimetable, FrameTimetableMap, InputFrame, InputMetadata, VariableMetadata,
};
pub use time::TimeRange;
