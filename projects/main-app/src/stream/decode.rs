use std::io::Cursor;

use bytes::Bytes;
use image::{DynamicImage, ImageFormat, imageops::FilterType};

use crate::core::errors::StreamError;

/// A frame the codec accepted, kept alongside its original JPEG bytes so it can
/// be served as-is or re-rendered at another size.
#[derive(Debug)]
pub struct DecodedFrame {
    image: DynamicImage,
    jpeg: Bytes,
}

impl DecodedFrame {
    pub fn decode(jpeg: Vec<u8>) -> Result<Self, StreamError> {
        let image = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg)?;
        Ok(Self {
            image,
            jpeg: Bytes::from(jpeg),
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn jpeg(&self) -> Bytes {
        self.jpeg.clone()
    }

    /// Re-encodes the frame scaled to fit inside `max_width` x `max_height`,
    /// keeping the aspect ratio. Frames that already fit are returned unchanged.
    pub fn fit_within(&self, max_width: u32, max_height: u32) -> Result<Bytes, StreamError> {
        if max_width == 0 || max_height == 0 {
            return Err(StreamError::InvalidInput(format!(
                "cannot scale to {max_width}x{max_height}"
            )));
        }
        if self.width() <= max_width && self.height() <= max_height {
            return Ok(self.jpeg());
        }

        let scaled = self
            .image
            .resize(max_width, max_height, FilterType::Triangle);
        let rgb = DynamicImage::ImageRgb8(scaled.to_rgb8());
        let mut out = Cursor::new(Vec::new());
        rgb.write_to(&mut out, ImageFormat::Jpeg)?;
        Ok(Bytes::from(out.into_inner()))
    }
}
