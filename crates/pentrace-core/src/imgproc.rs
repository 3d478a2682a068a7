//! Grayscale image operations backing the tracking pipeline.
//!
//! Thin wrappers over `imageproc` plus the handful of primitives it does not
//! provide in the required form: subtractive-offset adaptive thresholding,
//! unsharp sharpening, 5-tap pyramid downsampling and affine warping with a
//! constant border.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::distance_transform::Norm;

use crate::affine::{AffineError, AffineTransform};
use crate::geometry::Rect;

type GrayF32 = ImageBuffer<Luma<f32>, Vec<f32>>;

fn to_f32(img: &GrayImage) -> GrayF32 {
    GrayF32::from_fn(img.width(), img.height(), |x, y| {
        Luma([img.get_pixel(x, y)[0] as f32])
    })
}

/// Copy out a sub-image. The rectangle is clipped to the image bounds first.
pub fn crop(img: &GrayImage, rect: Rect) -> GrayImage {
    let r = rect.clip_to(img.width(), img.height());
    if r.is_empty() {
        return GrayImage::new(0, 0);
    }
    image::imageops::crop_imm(img, r.x as u32, r.y as u32, r.width as u32, r.height as u32)
        .to_image()
}

/// Mean-box blur with a `(2r+1)²` kernel.
pub fn box_blur(img: &GrayImage, radius: u32) -> GrayImage {
    imageproc::filter::box_filter(img, radius, radius)
}

/// Gaussian blur computed in f32 to avoid intermediate quantisation.
pub fn gaussian_blur(img: &GrayImage, sigma: f32) -> GrayImage {
    let blurred = imageproc::filter::gaussian_blur_f32(&to_f32(img), sigma);
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        Luma([blurred.get_pixel(x, y)[0].round().clamp(0.0, 255.0) as u8])
    })
}

/// Unsharp mask: `(1 + weight)·src − weight·blur(src)`, clamped to `[0, 255]`.
pub fn sharpen(img: &GrayImage, weight: f32, sigma: f32) -> GrayImage {
    let blurred = imageproc::filter::gaussian_blur_f32(&to_f32(img), sigma);
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let s = img.get_pixel(x, y)[0] as f32;
        let b = blurred.get_pixel(x, y)[0];
        let v = (1.0 + weight) * s - weight * b;
        Luma([v.round().clamp(0.0, 255.0) as u8])
    })
}

/// Stretch intensities so the darkest pixel maps to 0 and the brightest to
/// 255. A flat image maps to all zeros.
pub fn normalize_minmax(img: &GrayImage) -> GrayImage {
    let mut lo = u8::MAX;
    let mut hi = u8::MIN;
    for p in img.pixels() {
        lo = lo.min(p[0]);
        hi = hi.max(p[0]);
    }
    if hi <= lo {
        return GrayImage::new(img.width(), img.height());
    }
    let range = (hi - lo) as f32;
    imageproc::map::map_colors(img, |p| {
        Luma([((p[0] - lo) as f32 * 255.0 / range).round() as u8])
    })
}

/// Otsu global threshold: pixels above the computed level become 255.
pub fn otsu_binarize(img: &GrayImage) -> GrayImage {
    let level = imageproc::contrast::otsu_level(img);
    imageproc::contrast::threshold(img, level, imageproc::contrast::ThresholdType::Binary)
}

/// Inverted adaptive mean threshold: a pixel becomes 255 (foreground) when
/// it is darker than its local mean by more than `offset`. Picks out dark
/// ink on an unevenly lit background.
pub fn adaptive_threshold_inv(img: &GrayImage, block_radius: u32, offset: i16) -> GrayImage {
    let local_mean = imageproc::filter::box_filter(img, block_radius, block_radius);
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let p = img.get_pixel(x, y)[0] as i16;
        let m = local_mean.get_pixel(x, y)[0] as i16;
        Luma([if p < m - offset { 255 } else { 0 }])
    })
}

/// Grow white regions by `radius` pixels (square structuring element).
pub fn dilate(img: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return img.clone();
    }
    imageproc::morphology::dilate(img, Norm::LInf, radius)
}

/// Shrink white regions by `radius` pixels (square structuring element).
pub fn erode(img: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return img.clone();
    }
    imageproc::morphology::erode(img, Norm::LInf, radius)
}

pub fn invert(img: &GrayImage) -> GrayImage {
    imageproc::map::map_colors(img, |p| Luma([255 - p[0]]))
}

/// Canny edge detection; edges are 255 on a zero background.
pub fn canny(img: &GrayImage, low: f32, high: f32) -> GrayImage {
    imageproc::edges::canny(img, low, high)
}

pub fn mean(img: &GrayImage) -> f64 {
    let n = (img.width() as u64 * img.height() as u64).max(1);
    let sum: u64 = img.pixels().map(|p| p[0] as u64).sum();
    sum as f64 / n as f64
}

// ── Pyramid downsampling ─────────────────────────────────────────────────

const PYR_KERNEL: [u32; 5] = [1, 4, 6, 4, 1];

fn reflect101(i: i64, n: i64) -> i64 {
    let mut v = i;
    if v < 0 {
        v = -v;
    }
    if v >= n {
        v = 2 * n - 2 - v;
    }
    v.clamp(0, n - 1)
}

/// Halve an image: 5-tap Gaussian smoothing (`[1 4 6 4 1]/16` separable,
/// reflected borders) followed by decimation of odd rows and columns.
pub fn pyr_down(img: &GrayImage) -> GrayImage {
    let (w, h) = (img.width() as i64, img.height() as i64);
    let ow = ((w + 1) / 2) as u32;
    let oh = ((h + 1) / 2) as u32;
    if w == 0 || h == 0 {
        return GrayImage::new(0, 0);
    }
    GrayImage::from_fn(ow, oh, |ox, oy| {
        let cx = 2 * ox as i64;
        let cy = 2 * oy as i64;
        let mut acc: u32 = 0;
        for (j, kj) in PYR_KERNEL.iter().enumerate() {
            let sy = reflect101(cy + j as i64 - 2, h) as u32;
            for (i, ki) in PYR_KERNEL.iter().enumerate() {
                let sx = reflect101(cx + i as i64 - 2, w) as u32;
                acc += kj * ki * img.get_pixel(sx, sy)[0] as u32;
            }
        }
        Luma([((acc + 128) / 256) as u8])
    })
}

// ── Warping and sampling ─────────────────────────────────────────────────

/// Warp an image through an affine transform mapping source coordinates to
/// destination coordinates, sampling bilinearly and filling uncovered pixels
/// with `border`.
pub fn warp_affine(
    img: &GrayImage,
    t: &AffineTransform,
    border: u8,
) -> Result<GrayImage, AffineError> {
    let h = t.to_homogeneous();
    let m = [
        h[(0, 0)] as f32,
        h[(0, 1)] as f32,
        h[(0, 2)] as f32,
        h[(1, 0)] as f32,
        h[(1, 1)] as f32,
        h[(1, 2)] as f32,
        0.0,
        0.0,
        1.0,
    ];
    let projection = imageproc::geometric_transformations::Projection::from_matrix(m)
        .ok_or(AffineError::Singular)?;
    Ok(imageproc::geometric_transformations::warp(
        img,
        &projection,
        imageproc::geometric_transformations::Interpolation::Bilinear,
        Luma([border]),
    ))
}

/// Bilinear sample with clamped coordinates.
pub fn sample_bilinear(img: &GrayImage, x: f32, y: f32) -> f32 {
    let (w, h) = (img.width() as i64, img.height() as i64);
    if w == 0 || h == 0 {
        return 0.0;
    }
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let sample = |sx: i64, sy: i64| -> f32 {
        let cx = sx.clamp(0, w - 1) as u32;
        let cy = sy.clamp(0, h - 1) as u32;
        img.get_pixel(cx, cy)[0] as f32
    };

    let tl = sample(x0, y0);
    let tr = sample(x0 + 1, y0);
    let bl = sample(x0, y0 + 1);
    let br = sample(x0 + 1, y0 + 1);
    tl * (1.0 - fx) * (1.0 - fy) + tr * fx * (1.0 - fy) + bl * (1.0 - fx) * fy + br * fx * fy
}
