use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, ImageResult};
use std::io::Cursor;
use std::path::Path;

use crate::models::settings::{FitMode, ResizeProfile};

/// Decode an image from disk, detecting the format from its content.
pub fn load_image(path: &Path) -> ImageResult<DynamicImage> {
    Ok(ImageReader::open(path)?.with_guessed_format()?.decode()?)
}

/// Resize `img` to exactly the profile's box.
pub fn resize_for_profile(img: &DynamicImage, profile: &ResizeProfile) -> DynamicImage {
    let filter = FilterType::Lanczos3;

    match profile.fit {
        FitMode::Cover => {
            // Crop before scaling so the work is bounded by the target box, not the source.
            let (x, y, w, h) = cover_crop(img.width(), img.height(), profile.width, profile.height);
            img.crop_imm(x, y, w, h)
                .resize_exact(profile.width, profile.height, filter)
        }
    }
}

/// Centered region of a `src_w`x`src_h` image with the aspect ratio of `dst_w`x`dst_h`.
fn cover_crop(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> (u32, u32, u32, u32) {
    if src_w == 0 || src_h == 0 || dst_w == 0 || dst_h == 0 {
        return (0, 0, src_w, src_h);
    }
    let (sw, sh, dw, dh) = (src_w as u64, src_h as u64, dst_w as u64, dst_h as u64);

    let (w, h) = if sw * dh > sh * dw {
        ((sh * dw / dh).clamp(1, sw), sh)
    } else {
        (sw, (sw * dh / dw).clamp(1, sh))
    };

    let (w, h) = (w as u32, h as u32);
    ((src_w - w) / 2, (src_h - h) / 2, w, h)
}

/// Encode `img` as `format` into memory.
pub fn encode(img: DynamicImage, format: ImageFormat) -> ImageResult<Vec<u8>> {
    // The JPEG encoder has no alpha channel.
    let img = if format == ImageFormat::Jpeg && img.color().has_alpha() {
        DynamicImage::ImageRgb8(img.to_rgb8())
    } else {
        img
    };

    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, format)?;
    Ok(buffer.into_inner())
}
