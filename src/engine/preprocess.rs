//! Image preprocessing for the issue classifier

use image::DynamicImage;
use ndarray::Array4;
use anyhow::Result;

/// Classifier input size (MobileNetV3 trained at 224x224)
pub const CLASSIFIER_INPUT_SIZE: (u32, u32) = (224, 224);

/// ImageNet channel statistics used at training time (RGB order)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Preprocess an image for the classifier
///
/// Resizes to 224x224 ignoring aspect ratio, scales to [0, 1] and applies
/// ImageNet normalization. Output is NCHW with batch size 1.
pub fn preprocess_for_classification(image: &DynamicImage) -> Array4<f32> {
    let (target_w, target_h) = CLASSIFIER_INPUT_SIZE;
    let resized = image.resize_exact(target_w, target_h, image::imageops::FilterType::Triangle);
    image_to_nchw(&resized)
}

/// Convert image to a normalized RGB NCHW tensor
fn image_to_nchw(image: &DynamicImage) -> Array4<f32> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            let value = pixel[c] as f32 / 255.0;
            tensor[[0, c, y as usize, x as usize]] = (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }

    tensor
}

/// Decode image from bytes with EXIF orientation handling
/// Phone cameras usually store rotation in EXIF instead of rotating pixels
pub fn decode_image(data: &[u8]) -> Result<DynamicImage> {
    let image = image::load_from_memory(data)?;
    Ok(apply_exif_orientation(data, image))
}

/// Apply EXIF orientation to correct image rotation
fn apply_exif_orientation(data: &[u8], image: DynamicImage) -> DynamicImage {
    use std::io::Cursor;

    let orientation = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif_data) => exif_data
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .unwrap_or(1),
        Err(_) => 1,
    };

    // See https://exiftool.org/TagNames/EXIF.html (Orientation)
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}
