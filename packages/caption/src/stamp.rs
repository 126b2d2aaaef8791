//! Drawing captions onto images.

use std::path::Path;

use image::{ImageFormat, ImageReader, Rgb, RgbImage};

use crate::CaptionError;
use crate::font::{self, GLYPH_HEIGHT, GLYPH_WIDTH, SCALE};

/// Caption colour.
pub const CAPTION_COLOR: Rgb<u8> = Rgb([255, 255, 0]);

/// Gap in pixels between the caption and the right and bottom edges.
pub const PADDING: u32 = 10;

/// Draws `text` in [`CAPTION_COLOR`] with its bottom-right corner
/// [`PADDING`] pixels in from the image's bottom-right corner.
///
/// Text that does not fit is clipped at the image edges.
pub fn draw_caption(image: &mut RgbImage, text: &str) {
    let (text_width, text_height) = font::text_size(text);
    let origin_x = i64::from(image.width()) - i64::from(text_width) - i64::from(PADDING);
    let origin_y = i64::from(image.height()) - i64::from(text_height) - i64::from(PADDING);

    let mut glyph_x = origin_x;
    for ch in text.chars() {
        if let Some(glyph) = font::glyph(ch) {
            for row in 0..GLYPH_HEIGHT {
                for col in 0..GLYPH_WIDTH {
                    if font::is_set(glyph, col, row) {
                        fill_block(
                            image,
                            glyph_x + i64::from(col * SCALE),
                            origin_y + i64::from(row * SCALE),
                        );
                    }
                }
            }
        }
        glyph_x += i64::from(font::advance());
    }
}

/// Paints one `SCALE`x`SCALE` font pixel, skipping anything off-canvas.
fn fill_block(image: &mut RgbImage, x: i64, y: i64) {
    let width = i64::from(image.width());
    let height = i64::from(image.height());
    let scale = i64::from(SCALE);

    for py in y.max(0)..(y + scale).min(height) {
        for px in x.max(0)..(x + scale).min(width) {
            if let (Ok(px), Ok(py)) = (u32::try_from(px), u32::try_from(py)) {
                image.put_pixel(px, py, CAPTION_COLOR);
            }
        }
    }
}

/// Re-opens the image at `path`, draws `text` onto it, and overwrites it
/// as JPEG.
///
/// # Errors
///
/// Returns [`CaptionError`] if the file cannot be read, decoded, or
/// re-encoded.
pub fn stamp_caption(path: &Path, text: &str) -> Result<(), CaptionError> {
    let mut image = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?
        .to_rgb8();

    draw_caption(&mut image, text);
    image.save_with_format(path, ImageFormat::Jpeg)?;

    log::debug!("Added caption {text:?} to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    #[test]
    fn draws_in_the_bottom_right_corner() {
        let mut image = RgbImage::from_pixel(200, 100, BLACK);
        draw_caption(&mut image, "1");

        // "1" is 20x28: occupies x 170..190, y 62..90
        // Centre stroke column 2 → x 178..182; row 3 → y 74..78
        assert_eq!(*image.get_pixel(179, 75), CAPTION_COLOR);
        // Column 0 of row 3 is blank
        assert_eq!(*image.get_pixel(171, 75), BLACK);
        // Padding strip stays untouched
        assert_eq!(*image.get_pixel(195, 95), BLACK);
        assert_eq!(*image.get_pixel(0, 0), BLACK);
    }

    #[test]
    fn clips_text_wider_than_the_image() {
        let mut image = RgbImage::from_pixel(40, 20, BLACK);
        draw_caption(&mut image, "2024-01-02");

        let yellow = image.pixels().filter(|p| **p == CAPTION_COLOR).count();
        assert!(yellow > 0);
        assert!(yellow < 40 * 20);
    }

    #[test]
    fn stamps_a_saved_jpeg() {
        let dir = std::env::temp_dir().join("pic_extract_caption_stamp_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let path = dir.join("plain.jpg");
        RgbImage::from_pixel(320, 240, BLACK)
            .save_with_format(&path, ImageFormat::Jpeg)
            .unwrap();
        let before = std::fs::read(&path).unwrap();

        stamp_caption(&path, "2024-01-02").unwrap();

        let after = std::fs::read(&path).unwrap();
        assert_ne!(before, after);

        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (320, 240));
        // Somewhere in the caption box red and green are now bright.
        let bright = decoded
            .enumerate_pixels()
            .filter(|(x, y, p)| *x > 74 && *y > 200 && p.0[0] > 150 && p.0[1] > 150)
            .count();
        assert!(bright > 0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn undecodable_file_is_an_error() {
        let dir = std::env::temp_dir().join("pic_extract_caption_bad_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let path = dir.join("broken.jpg");
        std::fs::write(&path, b"not an image").unwrap();

        assert!(stamp_caption(&path, "2024-01-02").is_err());
        // The file is left as written.
        assert_eq!(std::fs::read(&path).unwrap(), b"not an image");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
