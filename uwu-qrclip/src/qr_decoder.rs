use image::DynamicImage;
use log::{debug, warn};
use thiserror::Error;

pub const QR_SYMBOLOGY: &str = "QRCODE";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("qr code {index} could not be read: {source}")]
    Grid {
        index: usize,
        #[source]
        source: rqrr::DeQRError,
    },
    #[error("qr code {index} does not hold utf-8 text ({len} bytes)")]
    NotUtf8 { index: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSymbol {
    pub symbology: &'static str,
    pub payload: String,
    pub version: usize,
    pub ecc_level: u16,
}

/// Finds every QR code in `img`, in the order rqrr detects them. An image
/// without codes gives an empty vector.
pub fn decode_qr_codes(img: &DynamicImage) -> Vec<Result<DecodedSymbol, DecodeError>> {
    debug!("converting image to grayscale for QR detection");
    let gray_img = img.to_luma8();

    let mut prepared_img = rqrr::PreparedImage::prepare(gray_img);

    let grids = prepared_img.detect_grids();

    if grids.is_empty() {
        warn!("no QR codes found in image");
        return Vec::new();
    }

    debug!("detected {} grid(s)", grids.len());

    grids
        .iter()
        .enumerate()
        .map(|(i, grid)| {
            let index = i + 1;
            let mut raw = Vec::new();
            let meta = grid
                .decode_to(&mut raw)
                .map_err(|source| DecodeError::Grid { index, source })?;

            debug!(
                "decoded QR code {}: ecc {} version {}",
                index, meta.ecc_level, meta.version.0
            );

            let len = raw.len();
            let payload = String::from_utf8(raw).map_err(|_| DecodeError::NotUtf8 { index, len })?;

            Ok(DecodedSymbol {
                symbology: QR_SYMBOLOGY,
                payload,
                version: meta.version.0,
                ecc_level: meta.ecc_level,
            })
        })
        .inspect(|outcome| {
            if let Err(e) = outcome {
                warn!("{}", e);
            }
        })
        .collect()
}
