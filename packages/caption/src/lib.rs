#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Date captions for downloaded images.
//!
//! A row's raw date string is normalised with [`format_caption_date`],
//! then [`stamp_caption`] re-opens the saved image, draws the caption in
//! yellow in the bottom-right corner using a fixed bitmap font, and
//! re-saves it as JPEG.

pub mod date;
pub mod font;
pub mod stamp;

pub use date::{format_caption_date, parse_caption_date};
pub use stamp::{draw_caption, stamp_caption};

/// Errors that can occur while stamping a caption.
#[derive(Debug, thiserror::Error)]
pub enum CaptionError {
    /// Decoding or encoding the image failed.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Reading the saved image failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
