use image::{DynamicImage, Rgb, RgbImage};
use log::{debug, info};
use qrcode::bits::Bits;
use qrcode::types::QrError;
use qrcode::{Color, EcLevel, QrCode, Version};
use std::fmt;
use thiserror::Error;

const MAX_VERSION: i16 = 40;
pub const MAX_BORDER: u32 = 64;
pub const MAX_MODULE_PX: u32 = 100;
const MAX_SIDE_PX: u32 = 8192;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("nothing to encode")]
    Empty,
    #[error("qr version must be between 1 and 40, got {0}")]
    InvalidVersion(i16),
    #[error("border must be at most 64 modules, got {0}")]
    InvalidBorder(u32),
    #[error("pixels per module must be between 1 and 100, got {0}")]
    InvalidScale(u32),
    #[error("qr image would be {side} pixels wide, the limit is 8192")]
    ImageTooLarge { side: u64 },
    #[error("{bytes} bytes do not fit in a qr code at {ec_level:?} error correction")]
    Capacity { bytes: usize, ec_level: EcLevel },
    #[error("qr encoder rejected the text: {0}")]
    Qr(QrError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct QrConfig {
    // quiet zone, in modules
    pub border: u32,
    pub ec_level: EcLevel,
    pub version: Option<i16>,
    pub module_px: u32,
    pub dark: Rgb<u8>,
    pub light: Rgb<u8>,
    pub invert: bool,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            border: 2,
            ec_level: EcLevel::M,
            version: None,
            module_px: 10,
            dark: Rgb([0, 0, 0]),
            light: Rgb([255, 255, 255]),
            invert: true,
        }
    }
}

pub struct EncodedQr {
    text: String,
    code: QrCode,
    config: QrConfig,
    side: u32,
}

impl fmt::Debug for EncodedQr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedQr")
            .field("text", &self.text)
            .field("version", &self.code.version())
            .field("width", &self.code.width())
            .field("config", &self.config)
            .finish()
    }
}

impl EncodedQr {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn config(&self) -> &QrConfig {
        &self.config
    }

    pub fn version(&self) -> Version {
        self.code.version()
    }

    // in modules, without the border
    pub fn width(&self) -> usize {
        self.code.width()
    }

    // anything outside the symbol is light
    pub fn is_dark(&self, x: i64, y: i64) -> bool {
        let width = self.code.width() as i64;
        if x < 0 || y < 0 || x >= width || y >= width {
            return false;
        }
        self.code[(x as usize, y as usize)] == Color::Dark
    }

    pub fn to_image(&self) -> DynamicImage {
        let border = i64::from(self.config.border);
        let px = self.config.module_px;
        let side = self.side;

        let img = RgbImage::from_fn(side, side, |x, y| {
            let mx = i64::from(x / px) - border;
            let my = i64::from(y / px) - border;
            if self.is_dark(mx, my) {
                self.config.dark
            } else {
                self.config.light
            }
        });

        debug!("rasterized qr code to {}x{} pixels", side, side);
        DynamicImage::ImageRgb8(img)
    }
}

pub fn encode(text: &str, config: &QrConfig) -> Result<EncodedQr, EncodeError> {
    if text.is_empty() {
        return Err(EncodeError::Empty);
    }
    if config.border > MAX_BORDER {
        return Err(EncodeError::InvalidBorder(config.border));
    }
    if !(1..=MAX_MODULE_PX).contains(&config.module_px) {
        return Err(EncodeError::InvalidScale(config.module_px));
    }
    if let Some(v) = config.version {
        if !(1..=MAX_VERSION).contains(&v) {
            return Err(EncodeError::InvalidVersion(v));
        }
    }

    let data = text.as_bytes();
    let ec_level = config.ec_level;
    let code = if text.is_ascii() {
        match config.version {
            Some(v) => QrCode::with_version(data, Version::Normal(v), ec_level),
            None => QrCode::with_error_correction_level(data, ec_level),
        }
    } else {
        // the segment optimizer may pick kanji mode for utf-8 byte pairs,
        // which scanners then read as shift-jis
        encode_bytes(data, config.version, ec_level)
    }
    .map_err(|e| match e {
        QrError::DataTooLong => EncodeError::Capacity {
            bytes: data.len(),
            ec_level,
        },
        other => EncodeError::Qr(other),
    })?;

    let side = raster_side(code.width(), config.border, config.module_px)?;

    info!(
        "encoded {} bytes as {:?} ({}x{} modules)",
        data.len(),
        code.version(),
        code.width(),
        code.width()
    );

    Ok(EncodedQr {
        text: text.to_owned(),
        code,
        config: config.clone(),
        side,
    })
}

fn raster_side(width: usize, border: u32, module_px: u32) -> Result<u32, EncodeError> {
    let side = u64::try_from(width)
        .ok()
        .and_then(|w| w.checked_add(2 * u64::from(border)))
        .and_then(|modules| modules.checked_mul(u64::from(module_px)))
        .unwrap_or(u64::MAX);

    match u32::try_from(side) {
        Ok(side) if side <= MAX_SIDE_PX => Ok(side),
        _ => Err(EncodeError::ImageTooLarge { side }),
    }
}

fn encode_bytes(data: &[u8], version: Option<i16>, ec_level: EcLevel) -> Result<QrCode, QrError> {
    let candidates = match version {
        Some(v) => v..=v,
        None => 1..=MAX_VERSION,
    };

    for v in candidates {
        let mut bits = Bits::new(Version::Normal(v));
        let fits = bits
            .push_byte_data(data)
            .and_then(|()| bits.push_terminator(ec_level));
        match fits {
            Ok(()) => return QrCode::with_bits(bits, ec_level),
            Err(QrError::DataTooLong) => continue,
            Err(e) => return Err(e),
        }
    }

    Err(QrError::DataTooLong)
}
