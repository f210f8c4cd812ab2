//! Image decoding and the resize/crop/normalize transform

use candle_core::{DType, Device, Tensor};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, Limits};
use serde::{Deserialize, Serialize};
use snapclass_core::{Error, Result};
use std::io::Cursor;

/// ImageNet channel means (RGB)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations (RGB)
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Largest accepted width or height of a decoded upload
pub const MAX_DECODE_DIMENSION: u32 = 16_384;

/// Ceiling on decoder allocations for a single upload
pub const MAX_DECODE_ALLOC: u64 = 512 * 1024 * 1024;

/// Preprocessing parameters bound to a model's training regime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocess {
    /// Target length of the shorter image side before cropping
    pub resize: u32,

    /// Side of the square center crop fed to the model
    pub crop: u32,

    pub mean: [f32; 3],

    pub std: [f32; 3],
}

impl Default for Preprocess {
    fn default() -> Self {
        Self::imagenet()
    }
}

impl Preprocess {
    /// Standard ImageNet evaluation transform: resize 256, center crop 224
    pub fn imagenet() -> Self {
        Self {
            resize: 256,
            crop: 224,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
    }

    /// Decode raw bytes into an image, guessing the format from its contents.
    ///
    /// Dimensions and decoder allocations are capped, so a small compressed
    /// upload cannot expand into an unbounded pixel buffer.
    pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
        let mut limits = Limits::default();
        limits.max_image_width = Some(MAX_DECODE_DIMENSION);
        limits.max_image_height = Some(MAX_DECODE_DIMENSION);
        limits.max_alloc = Some(MAX_DECODE_ALLOC);

        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| Error::decode(e.to_string()))?;
        reader.limits(limits);
        reader.decode().map_err(|e| Error::decode(e.to_string()))
    }

    /// Produce a `[1, 3, crop, crop]` f32 tensor on `device`
    pub fn apply(&self, image: &DynamicImage, device: &Device) -> Result<Tensor> {
        if self.crop == 0 || self.crop > self.resize {
            return Err(Error::transform(format!(
                "crop size {} must be in 1..={}",
                self.crop, self.resize
            )));
        }

        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(Error::transform("image has no pixels"));
        }

        // Same pixels as a shorter-side resize then center crop, with the
        // resized buffer bounded to resize x resize
        let side = width.min(height);
        let square = image.crop_imm((width - side) / 2, (height - side) / 2, side, side);
        let resized = square.resize_exact(self.resize, self.resize, FilterType::Triangle);

        let offset = (self.resize - self.crop) / 2;
        let cropped = resized.crop_imm(offset, offset, self.crop, self.crop).to_rgb8();

        self.to_tensor(cropped.into_raw(), self.crop as usize, device)
            .map_err(|e| Error::transform(e.to_string()))
    }

    fn to_tensor(
        &self,
        pixels: Vec<u8>,
        side: usize,
        device: &Device,
    ) -> candle_core::Result<Tensor> {
        let mean = Tensor::new(&self.mean, device)?.reshape((3, 1, 1))?;
        let std = Tensor::new(&self.std, device)?.reshape((3, 1, 1))?;

        Tensor::from_vec(pixels, (side, side, 3), device)?
            .permute((2, 0, 1))?
            .to_dtype(DType::F32)?
            .affine(1.0 / 255.0, 0.0)?
            .broadcast_sub(&mean)?
            .broadcast_div(&std)?
            .unsqueeze(0)
    }
}
