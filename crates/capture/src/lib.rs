//! Tile capture: network fetching, grid orchestration and the end-to-end
//! snapshot pipeline.
//!
//! ```ignore
//! let pipeline = SnapshotPipeline::with_http(FetchConfig::default(), TileUrlTemplate::default())?;
//! let image = pipeline.capture(&bbox, ScaleFactor::new(2)?).await?;
//! ```

pub mod assembly;
pub mod fetcher;
pub mod orchestrator;
pub mod pipeline;

pub use assembly::{assemble, gate};
pub use fetcher::{FetchConfig, HttpTileSource, TileFetcher, TileSource};
pub use orchestrator::{fetch_all, FetchOutcome};
pub use pipeline::SnapshotPipeline;
