use image::DynamicImage;
use log::{debug, error, info};
use std::path::Path;

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

pub fn read_image_from_file(path: &Path) -> Result<DynamicImage, image::ImageError> {
    debug!("loading image from file: {}", path.display());
    let img = image::open(path).map_err(|e| {
        error!("failed to open image: {}", e);
        e
    })?;
    info!("loaded image ({}x{})", img.width(), img.height());
    Ok(img)
}
