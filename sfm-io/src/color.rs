//! Point colors sampled from the source images.

use crate::snapshot::Snapshot;
use image::{Rgb, RgbImage};
use log::*;
use sfm_core::TrackId;
use std::collections::{HashMap, HashSet};
use std::path::Path;

fn blend_cubic(px0: &Rgb<u8>, px1: &Rgb<u8>, px2: &Rgb<u8>, px3: &Rgb<u8>, x: f32) -> [f32; 3] {
    let mut out = [0.0; 3];
    for (i, value) in out.iter_mut().enumerate() {
        let p0 = f32::from(px0[i]);
        let p1 = f32::from(px1[i]);
        let p2 = f32::from(px2[i]);
        let p3 = f32::from(px3[i]);
        #[rustfmt::skip]
        let pval = p1 + 0.5 * x * (p2 - p0 + x * (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3 + x * (3.0 * (p1 - p2) + p3 - p0)));
        *value = pval;
    }
    out
}

fn blend_cubic_rows(rows: &[[f32; 3]; 4], y: f32) -> [f32; 3] {
    let mut out = [0.0; 3];
    for (i, value) in out.iter_mut().enumerate() {
        let [p0, p1, p2, p3] = [rows[0][i], rows[1][i], rows[2][i], rows[3][i]];
        #[rustfmt::skip]
        let pval = p1 + 0.5 * y * (p2 - p0 + y * (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3 + y * (3.0 * (p1 - p2) + p3 - p0)));
        *value = pval.clamp(0.0, 255.0);
    }
    out
}

/// Bicubic sample at pixel coordinates where `(0, 0)` is the center of the
/// top-left pixel. `None` when the 4x4 neighborhood leaves the image.
pub fn interpolate_bicubic(image: &RgbImage, x: f32, y: f32) -> Option<[f32; 3]> {
    let left = x.floor() - 1.0;
    let right = left + 4.0;
    let top = y.floor() - 1.0;
    let bottom = top + 4.0;

    let x_weight = x - (left + 1.0);
    let y_weight = y - (top + 1.0);

    let (width, height) = image.dimensions();
    if !(left >= 0.0 && right <= width as f32 && top >= 0.0 && bottom <= height as f32) {
        return None;
    }
    let (left, top) = (left as u32, top as u32);
    let mut rows = [[0.0; 3]; 4];
    for (r, row) in rows.iter_mut().enumerate() {
        let y = top + r as u32;
        *row = blend_cubic(
            image.get_pixel(left, y),
            image.get_pixel(left + 1, y),
            image.get_pixel(left + 2, y),
            image.get_pixel(left + 3, y),
            x_weight,
        );
    }
    Some(blend_cubic_rows(&rows, y_weight))
}

/// Bilinear sample with the same convention as [`interpolate_bicubic`].
pub fn interpolate_bilinear(image: &RgbImage, x: f32, y: f32) -> Option<[f32; 3]> {
    let (width, height) = image.dimensions();
    let (x0, y0) = (x.floor(), y.floor());
    if !(x0 >= 0.0 && y0 >= 0.0 && x0 + 1.0 < width as f32 && y0 + 1.0 < height as f32) {
        return None;
    }
    let (dx, dy) = (x - x0, y - y0);
    let (x0, y0) = (x0 as u32, y0 as u32);
    let mut out = [0.0; 3];
    for (i, value) in out.iter_mut().enumerate() {
        let top = f32::from(image.get_pixel(x0, y0)[i]) * (1.0 - dx)
            + f32::from(image.get_pixel(x0 + 1, y0)[i]) * dx;
        let bottom = f32::from(image.get_pixel(x0, y0 + 1)[i]) * (1.0 - dx)
            + f32::from(image.get_pixel(x0 + 1, y0 + 1)[i]) * dx;
        *value = top * (1.0 - dy) + bottom * dy;
    }
    Some(out)
}

/// Samples the color at a feature location, where `(0.5, 0.5)` is the center
/// of the top-left pixel.
pub fn sample_color(image: &RgbImage, x: f64, y: f64) -> Option<[f32; 3]> {
    let (x, y) = ((x - 0.5) as f32, (y - 0.5) as f32);
    interpolate_bicubic(image, x, y).or_else(|| interpolate_bilinear(image, x, y))
}

#[derive(Default)]
struct ColorSum {
    sum: [f32; 3],
    count: u32,
}

/// Sets the color of every 3d point to the mean color of its observations.
///
/// Images are loaded from `image_root` joined with their name. Unreadable
/// images are skipped with a warning. With an allow-list only images whose
/// names are listed are sampled. Points that received no sample become black.
/// Returns the number of images sampled.
pub fn extract_colors(
    snapshot: &mut Snapshot,
    image_root: &Path,
    allow_list: Option<&HashSet<String>>,
) -> usize {
    let mut sums: HashMap<TrackId, ColorSum> = HashMap::new();
    let mut num_sampled = 0;
    for image in snapshot.images.values() {
        if allow_list.map_or(false, |list| !list.contains(&image.name)) {
            continue;
        }
        let path = image_root.join(&image.name);
        let bitmap = match image::open(&path) {
            Ok(bitmap) => bitmap.to_rgb8(),
            Err(e) => {
                warn!("failed to read image {}: {}", path.display(), e);
                continue;
            }
        };
        num_sampled += 1;
        for point in &image.points2d {
            let track_id = match point.track_id {
                Some(track_id) => track_id,
                None => continue,
            };
            if let Some(color) = sample_color(&bitmap, point.xy.x, point.xy.y) {
                let entry = sums.entry(track_id).or_default();
                for (sum, value) in entry.sum.iter_mut().zip(color) {
                    *sum += value;
                }
                entry.count += 1;
            }
        }
    }

    for (track_id, point) in snapshot.points3d.iter_mut() {
        point.color = match sums.get(track_id) {
            Some(ColorSum { sum, count }) if *count > 0 => {
                sum.map(|channel| (channel / *count as f32).round().clamp(0.0, 255.0) as u8)
            }
            _ => [0, 0, 0],
        };
    }
    for point in snapshot.points3d.values().take(3) {
        debug!("point {} color {:?}", point.track_id, point.color);
    }
    num_sampled
}
