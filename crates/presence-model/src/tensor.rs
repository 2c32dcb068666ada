use image::RgbImage;
use ndarray::Array4;
use presence_core::AnalyzerError;

/// Convert an RGB image into a 1×3×H×W float tensor, normalizing each
/// channel as `(pixel - mean) / std`.
pub(crate) fn image_to_nchw(img: &RgbImage, mean: f32, std: f32) -> Array4<f32> {
    let (w, h) = img.dimensions();
    let mut tensor = Array4::<f32>::zeros((1, 3, h as usize, w as usize));
    for (x, y, pixel) in img.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 - mean) / std;
        }
    }
    tensor
}

pub(crate) fn ort_err(e: ort::Error) -> AnalyzerError {
    AnalyzerError::InferenceFailed(e.to_string())
}
