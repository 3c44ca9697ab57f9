use base64::{engine::general_purpose::STANDARD, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::shared::constants::SNAPSHOT_JPEG_QUALITY;
use crate::shared::frame::Frame;

const DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("frame has no pixels")]
    EmptyFrame,
    #[error("unsupported frame layout: {0} channels")]
    UnsupportedChannels(u8),
    #[error("JPEG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Encodes a frame at native resolution as a JPEG `data:` URL.
pub fn encode_data_url(frame: &Frame) -> Result<String, SnapshotError> {
    let jpeg = encode_jpeg(frame, SNAPSHOT_JPEG_QUALITY)?;
    Ok(format!("{DATA_URL_PREFIX}{}", STANDARD.encode(jpeg)))
}

pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>, SnapshotError> {
    if frame.is_empty() {
        return Err(SnapshotError::EmptyFrame);
    }
    let color = match frame.channels() {
        1 => ExtendedColorType::L8,
        3 => ExtendedColorType::Rgb8,
        n => return Err(SnapshotError::UnsupportedChannels(n)),
    };

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality).encode(
        frame.data(),
        frame.width(),
        frame.height(),
        color,
    )?;
    Ok(out)
}

/// Inverse of [`encode_data_url`]'s framing: returns the JPEG bytes.
pub fn decode_data_url(url: &str) -> Option<Vec<u8>> {
    let payload = url.strip_prefix(DATA_URL_PREFIX)?;
    STANDARD.decode(payload).ok()
}
