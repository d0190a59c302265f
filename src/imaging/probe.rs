//! Content-based format sniffing and dimension probing.
//!
//! The extension of a source file is only used to pick candidates during the
//! directory listing. Before a file is staged its leading bytes are matched
//! against known signatures, and the header is decoded far enough to read the
//! pixel dimensions. No full decode happens here.

use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("not a recognizable image")]
    Unrecognized,
    #[error("{0:?} is not a supported format (JPEG, PNG, or WebP)")]
    Unsupported(ImageFormat),
    #[error("could not read image header: {0}")]
    Decode(#[from] image::ImageError),
}

/// The formats a post may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SniffedFormat {
    Jpeg,
    Png,
    WebP,
}

impl SniffedFormat {
    pub fn mime(self) -> &'static str {
        match self {
            SniffedFormat::Jpeg => "image/jpeg",
            SniffedFormat::Png => "image/png",
            SniffedFormat::WebP => "image/webp",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            SniffedFormat::Jpeg => ImageFormat::Jpeg,
            SniffedFormat::Png => ImageFormat::Png,
            SniffedFormat::WebP => ImageFormat::WebP,
        }
    }
}

impl TryFrom<ImageFormat> for SniffedFormat {
    type Error = ProbeError;

    fn try_from(format: ImageFormat) -> Result<Self, Self::Error> {
        match format {
            ImageFormat::Jpeg => Ok(SniffedFormat::Jpeg),
            ImageFormat::Png => Ok(SniffedFormat::Png),
            ImageFormat::WebP => Ok(SniffedFormat::WebP),
            other => Err(ProbeError::Unsupported(other)),
        }
    }
}

/// Result of probing an in-memory image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: SniffedFormat,
    pub width: u32,
    pub height: u32,
}

/// Identify the format from magic bytes, ignoring any filename.
pub fn sniff(bytes: &[u8]) -> Result<SniffedFormat, ProbeError> {
    let format = image::guess_format(bytes).map_err(|_| ProbeError::Unrecognized)?;
    SniffedFormat::try_from(format)
}

/// Sniff the format and read width/height from the image header.
pub fn probe(bytes: &[u8]) -> Result<ImageInfo, ProbeError> {
    let format = sniff(bytes)?;
    let (width, height) =
        ImageReader::with_format(Cursor::new(bytes), format.image_format()).into_dimensions()?;
    Ok(ImageInfo {
        format,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{encode_image, gif_bytes};

    #[test]
    fn probe_png_reads_dimensions() {
        let bytes = encode_image(ImageFormat::Png, 30, 20);
        let info = probe(&bytes).unwrap();
        assert_eq!(info.format, SniffedFormat::Png);
        assert_eq!((info.width, info.height), (30, 20));
        assert_eq!(info.format.mime(), "image/png");
    }

    #[test]
    fn probe_jpeg_reads_dimensions() {
        let bytes = encode_image(ImageFormat::Jpeg, 64, 48);
        let info = probe(&bytes).unwrap();
        assert_eq!(info.format, SniffedFormat::Jpeg);
        assert_eq!((info.width, info.height), (64, 48));
    }

    #[test]
    fn probe_webp_reads_dimensions() {
        let bytes = encode_image(ImageFormat::WebP, 12, 34);
        let info = probe(&bytes).unwrap();
        assert_eq!(info.format, SniffedFormat::WebP);
        assert_eq!((info.width, info.height), (12, 34));
    }

    #[test]
    fn sniff_ignores_what_the_name_claims() {
        // PNG bytes are PNG no matter what the file was called
        let bytes = encode_image(ImageFormat::Png, 2, 2);
        assert_eq!(sniff(&bytes).unwrap(), SniffedFormat::Png);
    }

    #[test]
    fn sniff_rejects_gif() {
        let result = sniff(&gif_bytes());
        assert!(matches!(result, Err(ProbeError::Unsupported(ImageFormat::Gif))));
    }

    #[test]
    fn sniff_rejects_text() {
        let result = sniff(b"definitely not an image");
        assert!(matches!(result, Err(ProbeError::Unrecognized)));
    }

    #[test]
    fn probe_truncated_png_is_decode_error() {
        let bytes = encode_image(ImageFormat::Png, 8, 8);
        let result = probe(&bytes[..12]);
        assert!(matches!(result, Err(ProbeError::Decode(_))));
    }
}
