use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};
use nalgebra::Vector3;
use pyramid_overlay::core::{project_point_f64, CameraIntrinsics, Pose};
use pyramid_overlay::pose::{BoardLayout, DetectedCorner, Detection};
use pyramid_overlay::{
    FramePipeline, ImageSequenceSink, ImageSequenceSource, OverlayConfig, RunSummary,
};

fn small_camera_config() -> OverlayConfig {
    OverlayConfig {
        camera: CameraIntrinsics::new(520.0, 520.0, 320.0, 240.0),
        ..OverlayConfig::default()
    }
}

fn synthetic_detection(board: &BoardLayout, pose: &Pose, cam: &CameraIntrinsics) -> Detection {
    let cols = board.cols as usize;
    let corners = board
        .object_points()
        .iter()
        .enumerate()
        .map(|(k, p)| {
            let q = project_point_f64(p, pose, cam);
            DetectedCorner {
                x: q.x as f32,
                y: q.y as f32,
                grid: Some([(k % cols) as i32, (k / cols) as i32]),
                id: None,
                confidence: Some(1.0),
            }
        })
        .collect();
    Detection {
        kind: Some("chessboard".to_string()),
        corners,
    }
}

fn write_frame(dir: &Path, name: &str) -> RgbImage {
    let img = RgbImage::from_fn(640, 480, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
    img.save(dir.join(format!("{name}.png"))).expect("save frame");
    img
}

fn load_rgb(path: &Path) -> RgbImage {
    image::open(path).expect("open output").to_rgb8()
}

#[test]
fn renders_detected_frames_and_passes_others_through() {
    let root = tempfile::tempdir().expect("tempdir");
    let frames = root.path().join("frames");
    let detections = root.path().join("detections");
    let output = root.path().join("out");
    fs::create_dir_all(&frames).expect("frames dir");
    fs::create_dir_all(&detections).expect("detections dir");

    let cfg = small_camera_config();
    let pose = Pose::from_rvec_tvec(
        Vector3::new(0.25, 0.15, 0.0),
        Vector3::new(-0.1, -0.07, 0.45),
    );
    let det = synthetic_detection(&cfg.board, &pose, &cfg.camera);

    let inputs: Vec<RgbImage> = ["f000", "f001", "f002"]
        .iter()
        .map(|n| write_frame(&frames, n))
        .collect();
    fs::write(frames.join("notes.txt"), "not a frame").expect("write noise");

    // f000: bare detection, f001: none, f002: wrapped in a detector report
    fs::write(
        detections.join("f000.json"),
        serde_json::to_string(&det).expect("json"),
    )
    .expect("write detection");
    let report = serde_json::json!({ "image_path": "f002.png", "detection": det });
    fs::write(detections.join("f002.json"), report.to_string()).expect("write report");

    let pipeline = FramePipeline::from_config(&cfg).expect("pipeline");
    let mut source =
        ImageSequenceSource::open(&frames, Some(detections.as_path())).expect("source");
    assert_eq!(source.len(), 3);
    let mut sink = ImageSequenceSink::create(&output).expect("sink");
    let summary = pipeline.run(&mut source, &mut sink).expect("run");

    assert_eq!(
        summary,
        RunSummary {
            frames: 3,
            rendered: 2,
            skipped: 1
        }
    );

    let out0 = load_rgb(&output.join("f000.png"));
    let out1 = load_rgb(&output.join("f001.png"));
    let out2 = load_rgb(&output.join("f002.png"));
    assert_ne!(out0, inputs[0]);
    assert_eq!(out1, inputs[1]);
    assert_eq!(out0, out2);
}

#[test]
fn unusable_detection_leaves_frame_identical() {
    let root = tempfile::tempdir().expect("tempdir");
    let frames = root.path().join("frames");
    let detections = root.path().join("detections");
    fs::create_dir_all(&frames).expect("frames dir");
    fs::create_dir_all(&detections).expect("detections dir");

    let input = write_frame(&frames, "only");
    // every corner on one board row: no planar pose
    let corners: Vec<DetectedCorner> = (0..8)
        .map(|i| DetectedCorner {
            x: 100.0 + 20.0 * i as f32,
            y: 200.0,
            grid: Some([i, 0]),
            id: None,
            confidence: None,
        })
        .collect();
    let det = Detection {
        kind: None,
        corners,
    };
    fs::write(
        detections.join("only.json"),
        serde_json::to_string(&det).expect("json"),
    )
    .expect("write detection");

    let pipeline = FramePipeline::from_config(&small_camera_config()).expect("pipeline");
    let mut source =
        ImageSequenceSource::open(&frames, Some(detections.as_path())).expect("source");
    let mut sink: Vec<pyramid_overlay::Frame> = Vec::new();
    let summary = pipeline.run(&mut source, &mut sink).expect("run");

    assert_eq!(summary.skipped, 1);
    assert_eq!(sink.len(), 1);
    assert_eq!(sink[0].image, input);
}

#[test]
fn missing_frames_directory_is_an_error() {
    let root = tempfile::tempdir().expect("tempdir");
    let err = ImageSequenceSource::open(root.path().join("nope"), None).unwrap_err();
    assert!(err.to_string().contains("not a directory"));
}

#[test]
fn corrupt_detection_file_skips_only_its_frame() {
    let root = tempfile::tempdir().expect("tempdir");
    let frames = root.path().join("frames");
    let detections = root.path().join("detections");
    let output = root.path().join("out");
    fs::create_dir_all(&frames).expect("frames dir");
    fs::create_dir_all(&detections).expect("detections dir");

    let cfg = small_camera_config();
    let pose = Pose::from_rvec_tvec(
        Vector3::new(0.25, 0.15, 0.0),
        Vector3::new(-0.1, -0.07, 0.45),
    );
    let det = serde_json::to_string(&synthetic_detection(&cfg.board, &pose, &cfg.camera))
        .expect("json");

    let inputs: Vec<RgbImage> = ["a", "b", "c"]
        .iter()
        .map(|n| write_frame(&frames, n))
        .collect();
    // truncated mid-write
    fs::write(detections.join("a.json"), r#"{"corners": ["#).expect("write a");
    fs::write(detections.join("b.json"), &det).expect("write b");
    fs::write(detections.join("c.json"), &det).expect("write c");

    let pipeline = FramePipeline::from_config(&cfg).expect("pipeline");
    let mut source =
        ImageSequenceSource::open(&frames, Some(detections.as_path())).expect("source");
    let mut sink = ImageSequenceSink::create(&output).expect("sink");
    let summary = pipeline.run(&mut source, &mut sink).expect("run");

    assert_eq!(
        summary,
        RunSummary {
            frames: 3,
            rendered: 2,
            skipped: 1
        }
    );
    assert_eq!(load_rgb(&output.join("a.png")), inputs[0]);
    assert_ne!(load_rgb(&output.join("b.png")), inputs[1]);
    assert_ne!(load_rgb(&output.join("c.png")), inputs[2]);
}

#[test]
fn frames_play_in_numeric_name_order() {
    let root = tempfile::tempdir().expect("tempdir");
    for name in ["frame_10", "frame_2", "frame_1"] {
        write_frame(root.path(), name);
    }

    let mut source = ImageSequenceSource::open(root.path(), None).expect("source");
    let mut sink: Vec<pyramid_overlay::Frame> = Vec::new();
    FramePipeline::from_config(&small_camera_config())
        .expect("pipeline")
        .run(&mut source, &mut sink)
        .expect("run");

    let order: Vec<(usize, &str)> = sink.iter().map(|f| (f.index, f.name.as_str())).collect();
    assert_eq!(order, [(0, "frame_1"), (1, "frame_2"), (2, "frame_10")]);
}
