//! Frame loop: detection -> pose -> projection -> compositing -> output.
//!
//! Frames are processed strictly in order, one at a time. A frame without a
//! usable pose is written out unchanged.

use std::{
    cmp::Ordering,
    fs,
    path::{Path, PathBuf},
};

use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use pyramid_overlay_core::{project, CameraIntrinsics, Pose, ProjectionError, Structure};
use pyramid_overlay_pose::{
    BoardLayout, Detection, PlanarPnp, PoseError, PoseEstimator, PoseFailure,
};
use pyramid_overlay_render::{Compositor, RenderError};

use crate::config::{ConfigError, OverlayConfig};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// One input frame with its (optional) corner detection.
#[derive(Clone, Debug)]
pub struct Frame {
    pub index: usize,
    /// File stem; output files reuse it.
    pub name: String,
    pub image: RgbImage,
    pub detection: Option<Detection>,
}

/// Produces frames in playback order.
pub trait FrameSource {
    /// `None` once the sequence is exhausted.
    fn next_frame(&mut self) -> Option<Result<Frame, PipelineError>>;
}

/// Consumes frames after compositing; `frame.image` is the final output.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), PipelineError>;
}

impl FrameSink for Vec<Frame> {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), PipelineError> {
        self.push(frame.clone());
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SkipReason {
    NoDetection,
    PoseNotFound(PoseFailure),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FrameOutcome {
    Rendered { pose: Pose },
    Skipped(SkipReason),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub frames: usize,
    pub rendered: usize,
    pub skipped: usize,
}

/// Per-frame driver holding everything built at startup.
pub struct FramePipeline<E = PlanarPnp> {
    structure: Structure,
    board: BoardLayout,
    intrinsics: CameraIntrinsics,
    estimator: E,
    compositor: Compositor,
    max_frames: Option<usize>,
}

impl FramePipeline<PlanarPnp> {
    /// Validate every section of `cfg` and build the pipeline.
    pub fn from_config(cfg: &OverlayConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            cfg.build_structure()?,
            cfg.build_board()?,
            cfg.build_camera()?,
            cfg.build_estimator(),
            cfg.build_compositor()?,
        ))
    }
}

impl<E: PoseEstimator> FramePipeline<E> {
    pub fn new(
        structure: Structure,
        board: BoardLayout,
        intrinsics: CameraIntrinsics,
        estimator: E,
        compositor: Compositor,
    ) -> Self {
        Self {
            structure,
            board,
            intrinsics,
            estimator,
            compositor,
            max_frames: None,
        }
    }

    /// Stop after `max` frames (`None` runs to the end of the source).
    pub fn with_max_frames(mut self, max: Option<usize>) -> Self {
        self.max_frames = max;
        self
    }

    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    /// Composite the overlay onto `frame.image` if a pose can be recovered.
    ///
    /// `PoseNotFound` is not an error here: the frame is left untouched and
    /// reported as skipped.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(frame = frame.index))
    )]
    pub fn process_frame(&self, frame: &mut Frame) -> Result<FrameOutcome, PipelineError> {
        let Some(detection) = frame.detection.as_ref() else {
            log::debug!("frame {} ({}): no detection", frame.index, frame.name);
            return Ok(FrameOutcome::Skipped(SkipReason::NoDetection));
        };

        let corr = self.board.correspondences(&detection.corners);
        let pose = match self.estimator.estimate(
            &corr.object_points,
            &corr.image_points,
            &self.intrinsics,
        ) {
            Ok(pose) => pose,
            Err(PoseError::PoseNotFound { reason }) => {
                log::debug!("frame {} ({}): {reason}", frame.index, frame.name);
                return Ok(FrameOutcome::Skipped(SkipReason::PoseNotFound(reason)));
            }
        };

        let projected = project(self.structure.points(), &pose, &self.intrinsics)?;
        self.compositor
            .render_frame(&mut frame.image, &self.structure, &projected, &pose)?;
        Ok(FrameOutcome::Rendered { pose })
    }

    /// Drain `source` through the pipeline into `sink`.
    pub fn run<S, K>(&self, source: &mut S, sink: &mut K) -> Result<RunSummary, PipelineError>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let mut summary = RunSummary::default();
        while self.max_frames.is_none_or(|max| summary.frames < max) {
            let Some(next) = source.next_frame() else {
                break;
            };
            let mut frame = next?;
            match self.process_frame(&mut frame)? {
                FrameOutcome::Rendered { .. } => summary.rendered += 1,
                FrameOutcome::Skipped(_) => summary.skipped += 1,
            }
            sink.write_frame(&frame)?;
            summary.frames += 1;
        }
        log::info!(
            "processed {} frames: {} rendered, {} passed through",
            summary.frames,
            summary.rendered,
            summary.skipped
        );
        Ok(summary)
    }
}

/// Detection files are either a bare detection or a detector report that
/// nests it under `detection`.
#[derive(Deserialize)]
#[serde(untagged)]
enum DetectionFile {
    Bare(Detection),
    Report { detection: Option<Detection> },
}

/// Read `<path>` as a detection; a missing file means "no detection".
///
/// Read and parse failures are returned. [`ImageSequenceSource`] downgrades
/// them to a frame without detection.
pub fn load_detection(path: &Path) -> Result<Option<Detection>, PipelineError> {
    if !path.is_file() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)?;
    Ok(match serde_json::from_str(&raw)? {
        DetectionFile::Bare(d) => Some(d),
        DetectionFile::Report { detection } => detection,
    })
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// Compare names with embedded digit runs by numeric value, so `frame_2`
/// sorts before `frame_10`.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut a_rest, mut b_rest) = (a, b);
    loop {
        let (Some(ca), Some(cb)) = (a_rest.chars().next(), b_rest.chars().next()) else {
            break;
        };
        let ord = if ca.is_ascii_digit() && cb.is_ascii_digit() {
            let (da, ra) = split_digits(a_rest);
            let (db, rb) = split_digits(b_rest);
            a_rest = ra;
            b_rest = rb;
            let (ta, tb) = (da.trim_start_matches('0'), db.trim_start_matches('0'));
            ta.len()
                .cmp(&tb.len())
                .then_with(|| ta.cmp(tb))
                .then_with(|| da.len().cmp(&db.len()))
        } else {
            a_rest = &a_rest[ca.len_utf8()..];
            b_rest = &b_rest[cb.len_utf8()..];
            ca.cmp(&cb)
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a_rest.len().cmp(&b_rest.len()).then_with(|| a.cmp(b))
}

fn split_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Image files of a directory in natural name order (`frame_2` before
/// `frame_10`), with detections looked up as `<detections_dir>/<stem>.json`.
///
/// A detection file that cannot be read or parsed is logged and the frame
/// is delivered without detection, so it passes through unchanged.
#[derive(Debug)]
pub struct ImageSequenceSource {
    frames: Vec<PathBuf>,
    detections_dir: Option<PathBuf>,
    next: usize,
}

impl ImageSequenceSource {
    pub fn open(
        frames_dir: impl AsRef<Path>,
        detections_dir: Option<&Path>,
    ) -> Result<Self, PipelineError> {
        let frames_dir = frames_dir.as_ref();
        if !frames_dir.is_dir() {
            return Err(PipelineError::NotADirectory(frames_dir.to_path_buf()));
        }
        let mut frames = Vec::new();
        for entry in fs::read_dir(frames_dir)? {
            let path = entry?.path();
            if path.is_file() && has_image_extension(&path) {
                frames.push(path);
            }
        }
        frames.sort_by(|a, b| {
            let name = |p: &PathBuf| {
                p.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            };
            natural_cmp(&name(a), &name(b))
        });
        log::info!("found {} frames in {}", frames.len(), frames_dir.display());

        Ok(Self {
            frames,
            detections_dir: detections_dir.map(Path::to_path_buf),
            next: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn load(&self, index: usize, path: &Path) -> Result<Frame, PipelineError> {
        let name = file_stem(path);
        let image = image::open(path)?.to_rgb8();
        let detection = match &self.detections_dir {
            Some(dir) => {
                let path = dir.join(format!("{name}.json"));
                load_detection(&path).unwrap_or_else(|err| {
                    log::warn!("frame {index} ({name}): ignoring {}: {err}", path.display());
                    None
                })
            }
            None => None,
        };
        Ok(Frame {
            index,
            name,
            image,
            detection,
        })
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Option<Result<Frame, PipelineError>> {
        let index = self.next;
        let path = self.frames.get(index)?;
        self.next += 1;
        Some(self.load(index, path))
    }
}

/// Writes each frame as `<output_dir>/<name>.png`.
#[derive(Debug)]
pub struct ImageSequenceSink {
    dir: PathBuf,
}

impl ImageSequenceSink {
    /// Create (if needed) and target `dir`.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, frame: &Frame) -> PathBuf {
        self.dir.join(format!("{}.png", frame.name))
    }
}

impl FrameSink for ImageSequenceSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), PipelineError> {
        frame
            .image
            .save_with_format(self.path_for(frame), ImageFormat::Png)?;
        Ok(())
    }
}
