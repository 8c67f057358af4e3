//! Inline payload shrinking before Local writes
//!
//! Images wider than the configured maximum are scaled down, and every
//! decodable payload is re-encoded as JPEG. Payloads that do not decode as an
//! image are stored unchanged.

use crate::config::OptimizeConfig;
use crate::error::Result;
use crate::model::{DataUri, MediaReference, MediaSource};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::debug;

/// Re-encodes inline payloads for the local cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadOptimizer {
    enabled: bool,
    max_width: u32,
    quality: u8,
    small_quality: u8,
    small_payload_chars: usize,
}

impl Default for PayloadOptimizer {
    fn default() -> Self {
        Self::from_config(&OptimizeConfig::default())
    }
}

impl PayloadOptimizer {
    pub fn from_config(config: &OptimizeConfig) -> Self {
        Self {
            enabled: config.enabled,
            max_width: config.max_width.max(1),
            quality: config.quality.clamp(1, 100),
            small_quality: config.small_quality.clamp(1, 100),
            small_payload_chars: config.small_payload_chars,
        }
    }

    /// Optimizer that passes every payload through untouched
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// JPEG quality used for this payload
    pub fn quality_for(&self, uri: &DataUri) -> u8 {
        if uri.encoded_len() <= self.small_payload_chars {
            self.small_quality
        } else {
            self.quality
        }
    }

    /// Shrunk copy of the payload, or the payload itself when it cannot be
    /// decoded.
    pub fn optimize(&self, uri: &DataUri) -> DataUri {
        if !self.enabled {
            return uri.clone();
        }
        match self.reencode(uri) {
            Ok(optimized) => {
                debug!(
                    before = uri.encoded_len(),
                    after = optimized.encoded_len(),
                    "Optimized inline payload"
                );
                optimized
            }
            Err(e) => {
                debug!(mime = %uri.mime_type(), error = %e, "Keeping inline payload as is");
                uri.clone()
            }
        }
    }

    /// Optimize the reference's payload if it is inline.
    pub fn optimize_reference(&self, mut reference: MediaReference) -> MediaReference {
        let optimized = match &reference.source {
            MediaSource::Inline(uri) => Some(self.optimize(uri)),
            _ => None,
        };
        if let Some(uri) = optimized {
            reference.source = MediaSource::Inline(uri);
        }
        reference
    }

    fn reencode(&self, uri: &DataUri) -> Result<DataUri> {
        let bytes = uri.decode()?;
        let mut image = image::load_from_memory(&bytes)?;
        if image.width() > self.max_width {
            let height = scaled_height(image.width(), image.height(), self.max_width);
            image = image.resize_exact(self.max_width, height, FilterType::Triangle);
        }

        let mut encoded = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut encoded, self.quality_for(uri));
        DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)?;
        Ok(DataUri::from_bytes("image/jpeg", &encoded))
    }
}

fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    let scaled = (u64::from(height) * u64::from(target_width) + u64::from(width) / 2) / u64::from(width);
    scaled.clamp(1, u64::from(u32::MAX)) as u32
}
