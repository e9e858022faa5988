//! Overlay a translucent stepped block pyramid on chessboard frames.
//!
//! This crate ties the workspace together:
//! - re-exports of the geometry (`core`), pose (`pose`) and compositing
//!   (`render`) crates
//! - [`OverlayConfig`], the JSON configuration loaded once at startup
//! - [`FramePipeline`], the per-frame loop over a [`FrameSource`] and a
//!   [`FrameSink`], with image-sequence implementations of both
//! - the `pyramid-overlay` command-line tool (feature `cli`)
//!
//! ## Quickstart
//!
//! ```no_run
//! use pyramid_overlay::{FramePipeline, ImageSequenceSink, ImageSequenceSource, OverlayConfig};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), pyramid_overlay::Error> {
//! let cfg = OverlayConfig::load_json("overlay.json")?;
//! let pipeline = FramePipeline::from_config(&cfg)?;
//! let mut source = ImageSequenceSource::open("frames", Some(Path::new("detections")))?;
//! let mut sink = ImageSequenceSink::create("out")?;
//! let summary = pipeline.run(&mut source, &mut sink)?;
//! println!("{} of {} frames rendered", summary.rendered, summary.frames);
//! # Ok(())
//! # }
//! ```
//!
//! Frames whose pose cannot be recovered are written out unchanged.

pub use pyramid_overlay_core as core;
pub use pyramid_overlay_pose as pose;
pub use pyramid_overlay_render as render;

pub use pyramid_overlay_core::{generate, CameraIntrinsics, Color, Pose, Structure};
pub use pyramid_overlay_pose::{BoardLayout, Detection, PlanarPnp, PoseEstimator};
pub use pyramid_overlay_render::{Compositor, RenderStyle};

mod config;
mod pipeline;
mod report;

pub use config::{ConfigError, OverlayConfig, MAX_LINE_THICKNESS, MAX_TEXT_SCALE};
pub use pipeline::{
    load_detection, Frame, FrameOutcome, FramePipeline, FrameSink, FrameSource,
    ImageSequenceSink, ImageSequenceSource, PipelineError, RunSummary, SkipReason,
};
pub use report::{BlockReport, StructureReport};

/// Any error surfaced by the facade.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Structure(#[from] pyramid_overlay_core::StructureError),
    #[error(transparent)]
    Projection(#[from] pyramid_overlay_core::ProjectionError),
    #[error(transparent)]
    Pose(#[from] pyramid_overlay_pose::PoseError),
    #[error(transparent)]
    Render(#[from] pyramid_overlay_render::RenderError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
