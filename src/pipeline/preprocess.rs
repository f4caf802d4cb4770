//! Leaf-image preprocessing for the disease classifier.
//!
//! Must reproduce the training-time pipeline exactly: force RGB, resize to
//! 128×128 with a bicubic filter, keep raw `[0, 255]` pixel values as `f32`.
//! No rescaling or enhancement; a different scale silently degrades accuracy.

use image::imageops::FilterType;
use image::DynamicImage;

use super::PipelineError;

/// Square edge length the classifier was trained on.
pub const IMAGE_SIZE: u32 = 128;
pub const CHANNELS: usize = 3;
/// Catmull-Rom is the bicubic kernel the training-time resize used.
pub const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

const TENSOR_LEN: usize = (IMAGE_SIZE as usize) * (IMAGE_SIZE as usize) * CHANNELS;

/// Preprocessed image, `[1, 128, 128, 3]` NHWC, unnormalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Vec<f32>,
}

impl ImageTensor {
    pub fn shape(&self) -> [usize; 4] {
        [1, IMAGE_SIZE as usize, IMAGE_SIZE as usize, CHANNELS]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

/// Decode uploaded bytes; format is whatever the decoder recognizes.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::InvalidImage("empty upload".into()));
    }
    image::load_from_memory(bytes).map_err(|e| PipelineError::InvalidImage(e.to_string()))
}

pub fn preprocess(image: &DynamicImage) -> ImageTensor {
    let rgb = image.to_rgb8();
    let resized = image::imageops::resize(&rgb, IMAGE_SIZE, IMAGE_SIZE, RESIZE_FILTER);
    let data: Vec<f32> = resized.into_raw().into_iter().map(f32::from).collect();
    debug_assert_eq!(data.len(), TENSOR_LEN);
    ImageTensor { data }
}

pub fn preprocess_bytes(bytes: &[u8]) -> Result<ImageTensor, PipelineError> {
    let image = decode(bytes)?;
    Ok(preprocess(&image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{encode_png, solid_rgb};

    fn assert_first_pixel(tensor: &ImageTensor, expected: [f32; 3]) {
        for (got, want) in tensor.as_slice()[..3].iter().zip(expected) {
            assert!((got - want).abs() <= 1.0, "got {got}, want {want}");
        }
    }

    #[test]
    fn solid_color_yields_full_size_finite_tensor() {
        let bytes = encode_png(&solid_rgb(64, 64, [34, 139, 34]));
        let tensor = preprocess_bytes(&bytes).unwrap();

        assert_eq!(tensor.shape(), [1, 128, 128, 3]);
        assert_eq!(tensor.as_slice().len(), 128 * 128 * 3);
        assert!(tensor.as_slice().iter().all(|v| v.is_finite()));
        // no rescaling: raw channel values survive
        assert_first_pixel(&tensor, [34.0, 139.0, 34.0]);
    }

    #[test]
    fn non_rgb_inputs_are_forced_to_three_channels() {
        let gray = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
            20,
            40,
            image::Luma([200]),
        ));
        let tensor = preprocess(&gray);
        assert_eq!(tensor.as_slice().len(), 128 * 128 * 3);
        assert_first_pixel(&tensor, [200.0, 200.0, 200.0]);

        let rgba = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            300,
            200,
            image::Rgba([10, 20, 30, 0]),
        ));
        let tensor = preprocess(&rgba);
        assert_first_pixel(&tensor, [10.0, 20.0, 30.0]);
    }

    #[test]
    fn preprocessing_is_deterministic() {
        let bytes = encode_png(&solid_rgb(77, 51, [1, 2, 3]));
        assert_eq!(
            preprocess_bytes(&bytes).unwrap(),
            preprocess_bytes(&bytes).unwrap()
        );
    }

    #[test]
    fn malformed_bytes_are_invalid_image() {
        let err = preprocess_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidImage(_)));

        // truncated PNG header
        let bytes = encode_png(&solid_rgb(8, 8, [0, 0, 0]));
        let err = preprocess_bytes(&bytes[..20]).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidImage(_)));

        assert!(matches!(
            preprocess_bytes(&[]),
            Err(PipelineError::InvalidImage(_))
        ));
    }
}
