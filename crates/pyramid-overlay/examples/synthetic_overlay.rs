use nalgebra::Vector3;
use pyramid_overlay::core::project_point_f64;
use pyramid_overlay::pose::DetectedCorner;
use pyramid_overlay::{Detection, Frame, FramePipeline, FrameOutcome, OverlayConfig, Pose};

#[cfg(feature = "tracing")]
use pyramid_overlay::core::init_tracing;

/// Renders the overlay for a board seen under a known pose onto a blank frame.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "tracing")]
    init_tracing(false, log::LevelFilter::Info);

    let out_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "synthetic_overlay.png".to_string());

    let cfg = OverlayConfig::default();
    let pose = Pose::from_rvec_tvec(
        Vector3::new(0.4, -0.3, 0.1),
        Vector3::new(-0.1, -0.06, 0.45),
    );

    let cols = cfg.board.cols as usize;
    let corners = cfg
        .board
        .object_points()
        .iter()
        .enumerate()
        .map(|(k, p)| {
            let q = project_point_f64(p, &pose, &cfg.camera);
            DetectedCorner {
                x: q.x as f32,
                y: q.y as f32,
                grid: Some([(k % cols) as i32, (k / cols) as i32]),
                id: None,
                confidence: None,
            }
        })
        .collect();

    let mut frame = Frame {
        index: 0,
        name: "synthetic".to_string(),
        image: image::RgbImage::from_pixel(1280, 720, image::Rgb([235, 235, 235])),
        detection: Some(Detection {
            kind: Some("chessboard".to_string()),
            corners,
        }),
    };

    let pipeline = FramePipeline::from_config(&cfg)?;
    match pipeline.process_frame(&mut frame)? {
        FrameOutcome::Rendered { pose } => {
            let c = pose.camera_position();
            println!("camera at [{:.3} {:.3} {:.3}]", c.x, c.y, c.z);
        }
        FrameOutcome::Skipped(reason) => println!("frame skipped: {reason:?}"),
    }
    frame.image.save(&out_path)?;
    println!("wrote {out_path}");
    Ok(())
}
