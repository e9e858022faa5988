//! Integer rasterization on `image::RgbImage` with per-pixel clipping.
//!
//! Vertex coordinates are pixel centers. Inputs may lie far outside the
//! frame (projector output is not clipped), so lines are clipped to the
//! frame before stepping and polygon scanlines only visit visible rows.

use image::{Rgb, RgbImage};
use nalgebra::Point2;

use crate::error::RenderError;

#[inline]
fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x < 0 || y < 0 || x >= img.width() as i64 || y >= img.height() as i64 {
        return;
    }
    img.put_pixel(x as u32, y as u32, color);
}

fn stamp(img: &mut RgbImage, x: i64, y: i64, radius: i64, color: Rgb<u8>) {
    if radius == 0 {
        put(img, x, y, color);
        return;
    }
    let r2 = radius * radius + radius;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= r2 {
                put(img, x + dx, y + dy, color);
            }
        }
    }
}

/// Liang-Barsky clip of `a -> b` against `[lo, hi]` on both axes.
fn clip_segment(
    a: (f64, f64),
    b: (f64, f64),
    lo: (f64, f64),
    hi: (f64, f64),
) -> Option<((f64, f64), (f64, f64))> {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    for (p, q) in [
        (-dx, a.0 - lo.0),
        (dx, hi.0 - a.0),
        (-dy, a.1 - lo.1),
        (dy, hi.1 - a.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    Some((
        (a.0 + t0 * dx, a.1 + t0 * dy),
        (a.0 + t1 * dx, a.1 + t1 * dy),
    ))
}

/// Draw a straight line of `thickness` pixels between two pixel centers.
pub fn draw_line(
    img: &mut RgbImage,
    a: Point2<i32>,
    b: Point2<i32>,
    color: Rgb<u8>,
    thickness: u32,
) {
    if img.width() == 0 || img.height() == 0 {
        return;
    }
    let radius = (thickness.max(1) as i64 - 1) / 2;
    let margin = radius as f64 + 1.0;
    let lo = (-margin, -margin);
    let hi = (
        img.width() as f64 - 1.0 + margin,
        img.height() as f64 - 1.0 + margin,
    );
    let Some((ca, cb)) = clip_segment(
        (a.x as f64, a.y as f64),
        (b.x as f64, b.y as f64),
        lo,
        hi,
    ) else {
        return;
    };

    let (mut x0, mut y0) = (ca.0.round() as i64, ca.1.round() as i64);
    let (x1, y1) = (cb.0.round() as i64, cb.1.round() as i64);
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        stamp(img, x0, y0, radius, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Fill a polygon (even-odd rule, sampled at pixel centers) and its outline.
///
/// The outline makes edge-on polygons still cover their boundary pixels.
pub fn fill_polygon(img: &mut RgbImage, pts: &[Point2<i32>], color: Rgb<u8>) {
    if pts.is_empty() || img.width() == 0 || img.height() == 0 {
        return;
    }
    let n = pts.len();
    if n >= 3 {
        let min_y = pts.iter().map(|p| p.y as i64).min().unwrap_or(0).max(0);
        let max_y = pts
            .iter()
            .map(|p| p.y as i64)
            .max()
            .unwrap_or(-1)
            .min(img.height() as i64 - 1);
        let width = img.width() as i64;
        let mut xs: Vec<f64> = Vec::with_capacity(n);

        for y in min_y..=max_y {
            xs.clear();
            let yc = y as f64;
            for k in 0..n {
                let a = pts[k];
                let b = pts[(k + 1) % n];
                let (ay, by) = (a.y as f64, b.y as f64);
                if (ay <= yc && yc < by) || (by <= yc && yc < ay) {
                    let t = (yc - ay) / (by - ay);
                    xs.push(a.x as f64 + t * (b.x as f64 - a.x as f64));
                }
            }
            xs.sort_by(|l, r| l.total_cmp(r));
            for pair in xs.chunks_exact(2) {
                let x0 = (pair[0].ceil() as i64).max(0);
                let x1 = (pair[1].floor() as i64).min(width - 1);
                for x in x0..=x1 {
                    img.put_pixel(x as u32, y as u32, color);
                }
            }
        }
    }

    for k in 0..n {
        draw_line(img, pts[k], pts[(k + 1) % n], color, 1);
    }
}

/// `frame = round(overlay * alpha + frame * (1 - alpha))`, per channel.
pub fn blend_into(frame: &mut RgbImage, overlay: &RgbImage, alpha: f32) -> Result<(), RenderError> {
    if frame.dimensions() != overlay.dimensions() {
        return Err(RenderError::DimensionMismatch {
            frame: frame.dimensions(),
            overlay: overlay.dimensions(),
        });
    }
    if !alpha.is_finite() || !(0.0..=1.0).contains(&alpha) {
        return Err(RenderError::InvalidAlpha(alpha));
    }
    let beta = 1.0 - alpha;
    for (f, &o) in frame.iter_mut().zip(overlay.iter()) {
        let v = o as f32 * alpha + *f as f32 * beta;
        *f = v.round().clamp(0.0, 255.0) as u8;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    fn count(img: &RgbImage, color: Rgb<u8>) -> usize {
        img.pixels().filter(|&&p| p == color).count()
    }

    #[test]
    fn horizontal_line_covers_endpoints() {
        let mut img = RgbImage::new(10, 5);
        draw_line(&mut img, Point2::new(1, 2), Point2::new(8, 2), WHITE, 1);
        assert_eq!(count(&img, WHITE), 8);
        assert_eq!(*img.get_pixel(1, 2), WHITE);
        assert_eq!(*img.get_pixel(8, 2), WHITE);
    }

    #[test]
    fn far_away_line_is_clipped_quickly() {
        let mut img = RgbImage::new(16, 16);
        draw_line(
            &mut img,
            Point2::new(i32::MIN, 8),
            Point2::new(i32::MAX, 8),
            WHITE,
            1,
        );
        assert_eq!(count(&img, WHITE), 16);
        let mut img = RgbImage::new(16, 16);
        draw_line(&mut img, Point2::new(-50, -50), Point2::new(-10, 100), WHITE, 3);
        assert_eq!(count(&img, WHITE), 0);
    }

    #[test]
    fn thick_line_is_wider() {
        let mut thin = RgbImage::new(20, 20);
        let mut thick = RgbImage::new(20, 20);
        draw_line(&mut thin, Point2::new(2, 10), Point2::new(17, 10), WHITE, 1);
        draw_line(&mut thick, Point2::new(2, 10), Point2::new(17, 10), WHITE, 3);
        assert!(count(&thick, WHITE) > count(&thin, WHITE));
    }

    #[test]
    fn square_fill_is_inclusive() {
        let mut img = RgbImage::new(10, 10);
        let square = [
            Point2::new(2, 2),
            Point2::new(5, 2),
            Point2::new(5, 5),
            Point2::new(2, 5),
        ];
        fill_polygon(&mut img, &square, WHITE);
        assert_eq!(count(&img, WHITE), 16);
    }

    #[test]
    fn degenerate_polygon_draws_outline() {
        let mut img = RgbImage::new(10, 10);
        let flat = [
            Point2::new(1, 4),
            Point2::new(6, 4),
            Point2::new(6, 4),
            Point2::new(1, 4),
        ];
        fill_polygon(&mut img, &flat, WHITE);
        assert_eq!(count(&img, WHITE), 6);
    }

    #[test]
    fn offscreen_polygon_leaves_frame_untouched() {
        let mut img = RgbImage::new(8, 8);
        let quad = [
            Point2::new(-100, -100),
            Point2::new(-50, -100),
            Point2::new(-50, -50),
            Point2::new(-100, -50),
        ];
        fill_polygon(&mut img, &quad, WHITE);
        assert_eq!(count(&img, WHITE), 0);
    }

    #[test]
    fn partially_visible_polygon_is_clipped() {
        let mut img = RgbImage::new(8, 8);
        let quad = [
            Point2::new(-20, -20),
            Point2::new(20, -20),
            Point2::new(20, 20),
            Point2::new(-20, 20),
        ];
        fill_polygon(&mut img, &quad, WHITE);
        assert_eq!(count(&img, WHITE), 64);
    }

    #[test]
    fn blend_mixes_and_keeps_identical_pixels() {
        let mut frame = RgbImage::from_pixel(2, 1, Rgb([100, 100, 100]));
        let mut overlay = frame.clone();
        overlay.put_pixel(0, 0, Rgb([200, 0, 100]));
        blend_into(&mut frame, &overlay, 0.4).expect("blend");
        assert_eq!(*frame.get_pixel(0, 0), Rgb([140, 60, 100]));
        assert_eq!(*frame.get_pixel(1, 0), Rgb([100, 100, 100]));
    }

    #[test]
    fn blend_rejects_bad_inputs() {
        let mut frame = RgbImage::new(2, 2);
        let overlay = RgbImage::new(3, 2);
        assert!(matches!(
            blend_into(&mut frame, &overlay, 0.5),
            Err(RenderError::DimensionMismatch { .. })
        ));
        let overlay = RgbImage::new(2, 2);
        assert!(matches!(
            blend_into(&mut frame, &overlay, 1.5),
            Err(RenderError::InvalidAlpha(_))
        ));
    }
}
