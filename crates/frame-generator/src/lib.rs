//! Animated map frame generation.
//!
//! A [`FrameSequenceDriver`] walks every region, depth and time of a product
//! and hands each frame to the [`FrameCompositor`], which lays out panels of
//! data layers and writes the frame in every configured format. Layer
//! generators live in a [`LayerGeneratorCache`] for the whole run so
//! datasets, palettes and overlay images are loaded once.

pub mod cache;
pub mod compositor;
pub mod context;
pub mod dataset;
pub mod driver;
pub mod fetch;
pub mod layers;
pub mod template;

pub use cache::{CacheStats, LayerGeneratorCache, LayerIdentity};
pub use compositor::{FrameCompositor, FrameOutcome};
pub use context::{FrameContext, FrameRequest, Services};
pub use dataset::{DatasetOpener, GridDataset, JsonDatasetOpener, JsonGridDataset, PlottingDomain};
pub use driver::{FrameSequenceDriver, RunSummary};
pub use fetch::{DirectoryUploader, FrameUploader, HttpFetcher, InputFetcher, LocalFetcher, TileFetcher};
pub use layers::{DataLayerGenerator, LayerGenerator};
