//! Image download and save.
//!
//! One GET with no retry. On 200 the raw bytes are written to
//! `save_folder/<sanitized filename>`, replacing any file already there,
//! and the caption date (when given and parseable) is stamped on.

use std::path::{Path, PathBuf};

use crate::client::{HttpClient, HttpRequest};
use crate::filename::sanitize_filename;
use crate::FetchOptions;

/// Downloads `image_url` into `save_folder` under the sanitized
/// `filename`, optionally stamping `caption_date` onto it.
///
/// Returns the saved path, or `None` if nothing was written. A caption
/// that cannot be parsed or drawn is logged and skipped; the image is
/// kept uncaptioned and still counts as saved. Never returns an error.
pub async fn download_image<C: HttpClient + ?Sized>(
    client: &C,
    image_url: &str,
    filename: &str,
    save_folder: &Path,
    caption_date: Option<&str>,
    options: &FetchOptions,
) -> Option<PathBuf> {
    let request = HttpRequest::new(image_url, options.timeout);

    let response = match client.get(&request).await {
        Ok(response) => response,
        Err(e) => {
            log::error!("Error downloading {image_url}: {e}");
            return None;
        }
    };

    if !response.is_ok() {
        log::warn!("Failed to download {image_url}: Status {}", response.status);
        return None;
    }

    let save_path = save_folder.join(sanitize_filename(filename));
    if let Err(e) = tokio::fs::write(&save_path, &response.body).await {
        log::error!("Error saving {image_url} to {}: {e}", save_path.display());
        return None;
    }
    log::debug!("Saved image: {}", save_path.display());

    if let Some(raw) = caption_date.filter(|d| !d.trim().is_empty()) {
        add_caption(&save_path, filename, raw).await;
    }

    Some(save_path)
}

/// Stamps the formatted `raw` date onto the image at `path`, logging any
/// failure.
async fn add_caption(path: &Path, filename: &str, raw: &str) {
    let Some(text) = pic_extract_caption::format_caption_date(raw) else {
        log::warn!("Invalid date format for {filename}: {raw}");
        return;
    };

    let target = path.to_path_buf();
    let result =
        tokio::task::spawn_blocking(move || pic_extract_caption::stamp_caption(&target, &text))
            .await;

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::error!("Error adding date to {}: {e}", path.display()),
        Err(e) => log::error!("Caption task for {} failed: {e}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgb, RgbImage};

    use super::*;
    use crate::testing::MockClient;

    const IMAGE: &str = "http://a.test/pic.jpg";

    fn jpeg_bytes() -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        RgbImage::from_pixel(320, 240, Rgb([20, 40, 60]))
            .write_to(&mut bytes, ImageFormat::Jpeg)
            .unwrap();
        bytes.into_inner()
    }

    fn temp_folder(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pic_extract_download_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn saves_bytes_under_sanitized_name() {
        let dir = temp_folder("plain");
        let bytes = jpeg_bytes();
        let client = MockClient::new().bytes(IMAGE, &bytes);

        let saved = download_image(
            &client,
            IMAGE,
            "shot #1",
            &dir,
            None,
            &FetchOptions::default(),
        )
        .await;

        assert_eq!(saved, Some(dir.join("shot _1.jpg")));
        assert_eq!(std::fs::read(dir.join("shot _1.jpg")).unwrap(), bytes);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn overwrites_an_existing_file() {
        let dir = temp_folder("overwrite");
        std::fs::write(dir.join("img1.jpg"), b"stale").unwrap();
        let bytes = jpeg_bytes();
        let client = MockClient::new().bytes(IMAGE, &bytes);

        let saved =
            download_image(&client, IMAGE, "img1", &dir, None, &FetchOptions::default()).await;

        assert!(saved.is_some());
        assert_eq!(std::fs::read(dir.join("img1.jpg")).unwrap(), bytes);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn stamps_a_parseable_caption() {
        let dir = temp_folder("caption");
        let bytes = jpeg_bytes();
        let client = MockClient::new().bytes(IMAGE, &bytes);

        let saved = download_image(
            &client,
            IMAGE,
            "img1",
            &dir,
            Some("2024-01-02"),
            &FetchOptions::default(),
        )
        .await;

        let path = saved.unwrap();
        let written = std::fs::read(&path).unwrap();
        assert_ne!(written, bytes);
        let decoded = image::load_from_memory(&written).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (320, 240));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn unparseable_caption_keeps_the_image() {
        let dir = temp_folder("bad_caption");
        let bytes = jpeg_bytes();
        let client = MockClient::new().bytes(IMAGE, &bytes);

        let saved = download_image(
            &client,
            IMAGE,
            "img3",
            &dir,
            Some("not-a-date"),
            &FetchOptions::default(),
        )
        .await;

        assert_eq!(saved, Some(dir.join("img3.jpg")));
        assert_eq!(std::fs::read(dir.join("img3.jpg")).unwrap(), bytes);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn non_image_body_is_saved_uncaptioned() {
        let dir = temp_folder("not_image");
        let client = MockClient::new().bytes(IMAGE, b"<html>oops</html>");

        let saved = download_image(
            &client,
            IMAGE,
            "img",
            &dir,
            Some("2024-01-02"),
            &FetchOptions::default(),
        )
        .await;

        assert!(saved.is_some());
        assert_eq!(
            std::fs::read(dir.join("img.jpg")).unwrap(),
            b"<html>oops</html>"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn non_200_writes_nothing() {
        let dir = temp_folder("status");
        let client = MockClient::new().status(IMAGE, 403);

        let saved =
            download_image(&client, IMAGE, "img", &dir, None, &FetchOptions::default()).await;

        assert_eq!(saved, None);
        assert!(!dir.join("img.jpg").exists());
        assert_eq!(client.call_count(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn missing_folder_is_absorbed() {
        let dir = std::env::temp_dir().join("pic_extract_download_missing_folder/nested");
        let _ = std::fs::remove_dir_all(&dir);
        let client = MockClient::new().bytes(IMAGE, &jpeg_bytes());

        let saved =
            download_image(&client, IMAGE, "img", &dir, None, &FetchOptions::default()).await;

        assert_eq!(saved, None);
    }

    #[tokio::test]
    async fn transport_error_is_not_retried() {
        let dir = temp_folder("transport");
        let client = MockClient::new().transport_error(IMAGE, "connection refused");

        let saved =
            download_image(&client, IMAGE, "img", &dir, None, &FetchOptions::default()).await;

        assert_eq!(saved, None);
        assert_eq!(client.call_count(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
